//! Classification of resolved call sites.
//!
//! Responsibilities:
//! - Map one `CallSite` to exactly one verdict
//! - Record which rule produced it (`Basis`)
//!
//! Non-responsibilities:
//! - Finding call sites (handled in `python::scan`)
//! - Resolving argument values (handled in `python::resolve`)
//! - Folding verdicts per file (handled in `aggregate::file`)
//!
//! Rules, first match wins:
//!
//!   - local identifier, trust flag set, or 40-hex revision → SAFE
//!   - literal revision that is not a commit hash            → PARTIAL
//!   - no revision                                           → UNSAFE
//!   - revision present but not a literal                    → policy (UNSAFE by default)

use serde::{Deserialize, Serialize};

use crate::report::model::Verdict;
use crate::sites::model::{CallSite, Literal, Resolved};

/// Why a call site received its verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Basis {
    LocalPath,
    TrustFlag { flag: String },
    CommitPin,
    MutableReference { revision: String },
    MissingRevision,
    UnresolvedRevision,
}

/// Verdict applied to a revision that is present but not a literal.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedRevision {
    #[default]
    Unsafe,
    Partial,
}

/// Tunable classification knobs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifyPolicy {
    pub unresolved_revision: UnresolvedRevision,
}

/// Verdict plus the rule that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub verdict: Verdict,
    pub basis: Basis,
}

impl Classification {
    fn new(verdict: Verdict, basis: Basis) -> Self {
        Self { verdict, basis }
    }
}

/// Classify one resolved call site. Never returns `Verdict::Unknown`.
pub fn classify(site: &CallSite, policy: &ClassifyPolicy) -> Classification {
    if site.identifier.as_str().is_some_and(is_local_reference) {
        return Classification::new(Verdict::Safe, Basis::LocalPath);
    }

    if let Some((flag, _)) = site.trust_flags.iter().find(|(_, v)| v.is_true()) {
        return Classification::new(Verdict::Safe, Basis::TrustFlag { flag: flag.clone() });
    }

    match &site.revision {
        Resolved::Literal(Literal::Str(rev)) if is_commit_hash(rev) => {
            Classification::new(Verdict::Safe, Basis::CommitPin)
        }
        Resolved::Absent | Resolved::Literal(Literal::None) => {
            Classification::new(Verdict::Unsafe, Basis::MissingRevision)
        }
        Resolved::Literal(Literal::Str(rev)) if rev.is_empty() => {
            Classification::new(Verdict::Unsafe, Basis::MissingRevision)
        }
        Resolved::Literal(lit) => Classification::new(
            Verdict::Partial,
            Basis::MutableReference {
                revision: literal_text(lit),
            },
        ),
        Resolved::Unresolved => {
            let verdict = match policy.unresolved_revision {
                UnresolvedRevision::Unsafe => Verdict::Unsafe,
                UnresolvedRevision::Partial => Verdict::Partial,
            };
            Classification::new(verdict, Basis::UnresolvedRevision)
        }
    }
}

fn literal_text(lit: &Literal) -> String {
    match lit {
        Literal::Str(s) | Literal::Number(s) => s.clone(),
        Literal::Bool(true) => "True".to_string(),
        Literal::Bool(false) => "False".to_string(),
        Literal::None => "None".to_string(),
    }
}

/// A full commit hash: exactly 40 lowercase hexadecimal characters.
pub fn is_commit_hash(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Whether an identifier points at the local filesystem rather than the hub.
///
/// Hub identifiers are `name` or `namespace/name`; anything path-like or
/// outside that shape is treated as local.
pub fn is_local_reference(id: &str) -> bool {
    const LOCAL_PREFIXES: [&str; 5] = ["./", "../", "/", "~", ".\\"];
    if id.is_empty() {
        return false;
    }
    if LOCAL_PREFIXES.iter().any(|p| id.starts_with(p)) || id.contains('\\') {
        return true;
    }
    if has_drive_prefix(id) {
        return true;
    }
    !is_hub_identifier(id)
}

fn has_drive_prefix(id: &str) -> bool {
    let b = id.as_bytes();
    b.len() >= 3 && b[0].is_ascii_alphabetic() && b[1] == b':' && matches!(b[2], b'/' | b'\\')
}

fn is_hub_identifier(id: &str) -> bool {
    let segments: Vec<&str> = id.split('/').collect();
    if segments.len() > 2 {
        return false;
    }
    segments.iter().all(|seg| {
        !seg.is_empty()
            && *seg != "."
            && *seg != ".."
            && seg
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "5d0f2e8a7f1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d";

    fn site(identifier: Resolved, revision: Resolved) -> CallSite {
        CallSite {
            path: "f.py".into(),
            line: 1,
            api: "AutoModel.from_pretrained".into(),
            identifier,
            revision,
            trust_flags: vec![
                ("use_auth_token".into(), Resolved::Absent),
                ("token".into(), Resolved::Absent),
            ],
        }
    }

    fn verdict(s: &CallSite) -> Verdict {
        classify(s, &ClassifyPolicy::default()).verdict
    }

    #[test]
    fn commit_hash_shape() {
        assert!(is_commit_hash(SHA));
        assert!(is_commit_hash("abcdef1234567890abcdef1234567890abcdef12"));

        assert!(!is_commit_hash("main"));
        assert!(!is_commit_hash("v1.0"));
        assert!(!is_commit_hash(&SHA[..39]));
        assert!(!is_commit_hash(&format!("{SHA}1")));
        assert!(!is_commit_hash(&SHA.to_uppercase()));
        assert!(!is_commit_hash("5g0f2e8a7f1b2c3d4e5f6a7b8c9d0e1f2a3b4c5d"));
    }

    #[test]
    fn local_references() {
        for local in [
            "./local_model",
            "../models/bert",
            "/path/to/model",
            "~/models/bert",
            ".\\model",
            "C:\\models\\bert",
            "D:/models",
            "models/bert/base",
            "my model",
        ] {
            assert!(is_local_reference(local), "{local:?} should be local");
        }
    }

    #[test]
    fn hub_identifiers_are_not_local() {
        for hub in [
            "bert-base-uncased",
            "imdb",
            "google/flan-t5-base",
            "meta-llama/Llama-3.1-8B-Instruct",
            "org/model_v2.0",
        ] {
            assert!(!is_local_reference(hub), "{hub:?} should be a hub id");
        }
    }

    #[test]
    fn missing_revision_is_unsafe() {
        let c = classify(&site(Resolved::str("org/model"), Resolved::Absent), &Default::default());
        assert_eq!(c.verdict, Verdict::Unsafe);
        assert_eq!(c.basis, Basis::MissingRevision);
    }

    #[test]
    fn none_or_empty_revision_counts_as_missing() {
        let none = site(Resolved::str("org/model"), Resolved::Literal(Literal::None));
        let empty = site(Resolved::str("org/model"), Resolved::str(""));
        assert_eq!(verdict(&none), Verdict::Unsafe);
        assert_eq!(verdict(&empty), Verdict::Unsafe);
    }

    #[test]
    fn branch_or_tag_is_partial() {
        for rev in ["main", "v1.0", "develop", "release-1.0", "staging"] {
            let c = classify(&site(Resolved::str("org/model"), Resolved::str(rev)), &Default::default());
            assert_eq!(c.verdict, Verdict::Partial, "{rev}");
            assert_eq!(
                c.basis,
                Basis::MutableReference {
                    revision: rev.into()
                }
            );
        }
    }

    #[test]
    fn non_string_literal_revision_is_partial() {
        let s = site(
            Resolved::str("org/model"),
            Resolved::Literal(Literal::Number("2".into())),
        );
        assert_eq!(verdict(&s), Verdict::Partial);
    }

    #[test]
    fn commit_pin_is_safe() {
        let c = classify(&site(Resolved::str("org/model"), Resolved::str(SHA)), &Default::default());
        assert_eq!(c.verdict, Verdict::Safe);
        assert_eq!(c.basis, Basis::CommitPin);
    }

    #[test]
    fn local_path_wins_over_missing_revision() {
        let c = classify(&site(Resolved::str("./local"), Resolved::Absent), &Default::default());
        assert_eq!(c.verdict, Verdict::Safe);
        assert_eq!(c.basis, Basis::LocalPath);
    }

    #[test]
    fn trust_flag_true_is_safe() {
        let mut s = site(Resolved::str("private/model"), Resolved::Absent);
        s.trust_flags[1].1 = Resolved::Literal(Literal::Bool(true));
        let c = classify(&s, &Default::default());
        assert_eq!(c.verdict, Verdict::Safe);
        assert_eq!(
            c.basis,
            Basis::TrustFlag {
                flag: "token".into()
            }
        );
    }

    #[test]
    fn non_literal_or_false_trust_flag_is_ignored() {
        let mut s = site(Resolved::str("private/model"), Resolved::Absent);
        s.trust_flags[0].1 = Resolved::Unresolved;
        s.trust_flags[1].1 = Resolved::Literal(Literal::Bool(false));
        assert_eq!(verdict(&s), Verdict::Unsafe);
    }

    #[test]
    fn unresolved_revision_follows_policy() {
        let s = site(Resolved::str("org/model"), Resolved::Unresolved);

        let default = classify(&s, &ClassifyPolicy::default());
        assert_eq!(default.verdict, Verdict::Unsafe);
        assert_eq!(default.basis, Basis::UnresolvedRevision);

        let lenient = ClassifyPolicy {
            unresolved_revision: UnresolvedRevision::Partial,
        };
        assert_eq!(classify(&s, &lenient).verdict, Verdict::Partial);
    }

    #[test]
    fn unresolved_identifier_is_not_local() {
        let s = site(Resolved::Unresolved, Resolved::Absent);
        assert_eq!(verdict(&s), Verdict::Unsafe);
    }

    #[test]
    fn classification_is_deterministic_for_same_input() {
        let s = site(Resolved::str("org/model"), Resolved::str("main"));
        let policy = ClassifyPolicy::default();
        assert_eq!(classify(&s, &policy), classify(&s, &policy));
    }
}
