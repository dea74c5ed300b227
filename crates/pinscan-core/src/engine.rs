//! Batch driver: source units in, file records and failures out.
//!
//! Units are dispatched in windows of at most `max_in_flight`. Each window is
//! scanned on the rayon pool; text is read inside the worker so that at most
//! one window of sources is resident at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregate::file::FileRecord;
use crate::python;
use crate::report::model::{FileFailure, Finding};
use crate::rules::catalog::Catalog;
use crate::rules::classify::{ClassifyPolicy, classify};
use crate::source::SourceUnit;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Upper bound on units scanned concurrently. Zero is treated as one.
    pub max_in_flight: usize,
    pub policy: ClassifyPolicy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            policy: ClassifyPolicy::default(),
        }
    }
}

/// Shared flag that stops dispatch of further units.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of scanning one unit.
#[derive(Debug, Clone)]
pub struct FileScan {
    pub record: FileRecord,
    pub sha256: String,
    /// Classified call sites in source order.
    pub findings: Vec<Finding>,
}

/// Everything a batch produced. Order of `files` and `failures` is unspecified.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub files: Vec<FileScan>,
    pub failures: Vec<FileFailure>,
    /// Set when the batch stopped early; `files` then covers a prefix of windows.
    pub cancelled: bool,
}

pub struct Engine {
    catalog: Catalog,
    options: ScanOptions,
}

impl Engine {
    pub fn new(catalog: Catalog, options: ScanOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Read, parse, resolve and classify one unit.
    ///
    /// Unreadable or unparseable units become a `FileFailure`; they never
    /// produce a partial record.
    pub fn scan_unit(&self, unit: &SourceUnit) -> Result<FileScan, FileFailure> {
        let source = unit.read().map_err(|e| failure(unit, e.to_string()))?;
        let sites = python::call_sites(&unit.path, &source.text, &self.catalog)
            .map_err(|e| failure(unit, e.to_string()))?;

        let findings: Vec<Finding> = sites
            .iter()
            .map(|site| {
                let c = classify(site, &self.options.policy);
                Finding {
                    line: site.line,
                    api: site.api.clone(),
                    verdict: c.verdict,
                    basis: c.basis,
                }
            })
            .collect();

        let record = FileRecord::fold(
            &unit.org,
            &unit.repo,
            &unit.path,
            findings.iter().map(|f| f.verdict),
        );
        debug!(
            org = %unit.org,
            repo = %unit.repo,
            file = %unit.path,
            safe = record.safe_usages,
            partial = record.partial_usages,
            unsafe_ = record.unsafe_usages,
            "scanned file"
        );

        Ok(FileScan {
            record,
            sha256: source.sha256,
            findings,
        })
    }

    /// Scan every unit, honouring `max_in_flight` and `cancel`.
    pub fn scan_all(&self, units: &[SourceUnit], cancel: &CancelToken) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();
        let window = self.options.max_in_flight.max(1);

        for chunk in units.chunks(window) {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            let results: Vec<Option<Result<FileScan, FileFailure>>> = chunk
                .par_iter()
                .map(|unit| (!cancel.is_cancelled()).then(|| self.scan_unit(unit)))
                .collect();
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            for result in results.into_iter().flatten() {
                match result {
                    Ok(scan) => outcome.files.push(scan),
                    Err(f) => outcome.failures.push(f),
                }
            }
        }

        if outcome.cancelled {
            warn!(
                scanned = outcome.files.len(),
                total = units.len(),
                "scan cancelled"
            );
        }
        info!(
            files = outcome.files.len(),
            failures = outcome.failures.len(),
            "scan finished"
        );
        outcome
    }
}

fn failure(unit: &SourceUnit, reason: String) -> FileFailure {
    warn!(org = %unit.org, repo = %unit.repo, file = %unit.path, %reason, "skipping file");
    FileFailure {
        org: unit.org.clone(),
        repo: unit.repo.clone(),
        file: unit.path.clone(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::model::Verdict;
    use crate::rules::classify::{Basis, UnresolvedRevision};

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    fn engine() -> Engine {
        Engine::new(Catalog::builtin().unwrap(), ScanOptions::default())
    }

    fn unit(file: &str, text: &str) -> SourceUnit {
        SourceUnit::inline("acme", "models", file, text)
    }

    #[test]
    fn classifies_each_call_and_folds_counts() {
        let src = format!(
            "AutoModel.from_pretrained('org/m', revision='{SHA}')\n\
             AutoTokenizer.from_pretrained('org/m', revision='main')\n\
             load_dataset('imdb')\n"
        );
        let scan = engine().scan_unit(&unit("a.py", &src)).unwrap();

        assert_eq!(scan.record.safe_usages, 1);
        assert_eq!(scan.record.partial_usages, 1);
        assert_eq!(scan.record.unsafe_usages, 1);
        assert_eq!(scan.record.status(), Verdict::Unsafe);
        assert_eq!(scan.sha256.len(), 64);

        let bases: Vec<&Basis> = scan.findings.iter().map(|f| &f.basis).collect();
        assert_eq!(
            bases,
            vec![
                &Basis::CommitPin,
                &Basis::MutableReference {
                    revision: "main".into()
                },
                &Basis::MissingRevision
            ]
        );
        assert_eq!(scan.findings[2].line, 3);
    }

    #[test]
    fn file_without_calls_is_unknown() {
        let scan = engine().scan_unit(&unit("util.py", "import os\nprint(os.getcwd())\n")).unwrap();
        assert_eq!(scan.record.total(), 0);
        assert_eq!(scan.record.status(), Verdict::Unknown);
    }

    #[test]
    fn syntax_error_becomes_failure() {
        let err = engine().scan_unit(&unit("bad.py", "def f(:\n")).unwrap_err();
        assert_eq!(err.file, "bad.py");
        assert!(err.reason.contains("syntax error"), "{}", err.reason);
    }

    #[test]
    fn policy_controls_unresolved_revisions() {
        let src = "AutoModel.from_pretrained('org/m', revision=REV)\n";
        let lenient = Engine::new(
            Catalog::builtin().unwrap(),
            ScanOptions {
                policy: ClassifyPolicy {
                    unresolved_revision: UnresolvedRevision::Partial,
                },
                ..Default::default()
            },
        );
        assert_eq!(engine().scan_unit(&unit("a.py", src)).unwrap().record.unsafe_usages, 1);
        assert_eq!(lenient.scan_unit(&unit("a.py", src)).unwrap().record.partial_usages, 1);
    }

    #[test]
    fn scan_all_separates_failures_from_records() {
        let units = vec![
            unit("a.py", "load_dataset('imdb', revision='main')\n"),
            unit("b.py", "load_dataset(\n"),
            unit("c.py", "x = 1\n"),
        ];
        let outcome = engine().scan_all(&units, &CancelToken::new());

        assert!(!outcome.cancelled);
        assert_eq!(outcome.files.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].file, "b.py");
    }

    #[test]
    fn window_size_does_not_change_results() {
        let units: Vec<SourceUnit> = (0..20)
            .map(|i| {
                let rev = if i % 2 == 0 { "main" } else { SHA };
                unit(&format!("{i}.py"), &format!("load_dataset('d{i}', revision='{rev}')\n"))
            })
            .collect();

        let tiny = Engine::new(
            Catalog::builtin().unwrap(),
            ScanOptions {
                max_in_flight: 1,
                ..Default::default()
            },
        );
        let mut a: Vec<FileRecord> = tiny
            .scan_all(&units, &CancelToken::new())
            .files
            .into_iter()
            .map(|f| f.record)
            .collect();
        let mut b: Vec<FileRecord> = engine()
            .scan_all(&units, &CancelToken::new())
            .files
            .into_iter()
            .map(|f| f.record)
            .collect();
        a.sort_by(|x, y| x.file.cmp(&y.file));
        b.sort_by(|x, y| x.file.cmp(&y.file));
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn cancelled_token_stops_before_dispatch() {
        let units = vec![unit("a.py", "load_dataset('imdb')\n")];
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = engine().scan_all(&units, &cancel);

        assert!(outcome.cancelled);
        assert!(outcome.files.is_empty());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
