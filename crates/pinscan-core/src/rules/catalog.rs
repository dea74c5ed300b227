//! Catalog of artifact-loading APIs recognised by the scanner.
//!
//! Each entry names a call shape and the arguments that matter for
//! reproducibility. Adding an API is a data change: append an entry to
//! `builtin_entries` or to the `[[catalog.entries]]` table of a config file.
//!
//! The catalog is validated once when it is built. Any inconsistency is a
//! `CatalogError` and the engine refuses to run.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Where an argument can appear in a call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgSlot {
    /// Zero-based positional index, if the argument may be passed positionally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// Keyword name, if the argument may be passed by keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

impl ArgSlot {
    pub fn new(position: Option<usize>, keyword: Option<&str>) -> Self {
        Self {
            position,
            keyword: keyword.map(str::to_string),
        }
    }

    pub fn keyword(keyword: &str) -> Self {
        Self::new(None, Some(keyword))
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.keyword.is_none()
    }
}

/// `Receiver.function` or a bare `function`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub receiver: Option<String>,
    pub function: String,
}

impl QualifiedName {
    pub fn parse(name: &str) -> Result<Self, CatalogError> {
        let invalid = |reason| CatalogError::InvalidName {
            name: name.to_string(),
            reason,
        };

        let segments: Vec<&str> = name.split('.').collect();
        if segments.len() > 2 {
            return Err(invalid("expected `function` or `Receiver.function`"));
        }
        for segment in &segments {
            if !is_python_identifier(segment) {
                return Err(invalid("segment is not a Python identifier"));
            }
        }

        Ok(match segments.as_slice() {
            [function] => Self {
                receiver: None,
                function: function.to_string(),
            },
            [receiver, function] => Self {
                receiver: Some(receiver.to_string()),
                function: function.to_string(),
            },
            _ => return Err(invalid("empty name")),
        })
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.receiver {
            Some(receiver) => write!(f, "{receiver}.{}", self.function),
            None => f.write_str(&self.function),
        }
    }
}

fn is_python_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// One recognisable call signature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiEntry {
    /// Qualified call name, e.g. `AutoModel.from_pretrained` or `load_dataset`.
    pub name: String,
    /// Argument carrying the hub identifier or local path.
    pub identifier: ArgSlot,
    /// Argument carrying the revision.
    pub revision: ArgSlot,
    /// Boolean keywords that, when literally `True`, mark the call as trusted.
    #[serde(default)]
    pub trust_flags: Vec<String>,
}

struct BuiltinEntry {
    name: &'static str,
    identifier: (Option<usize>, &'static str),
    trust_flags: &'static [&'static str],
}

const HUB_TRUST: &[&str] = &["use_auth_token", "token", "local_files_only"];
const DATASET_TRUST: &[&str] = &["use_auth_token", "token"];

const PRETRAINED_CLASSES: &[&str] = &[
    "AutoModel",
    "AutoTokenizer",
    "AutoConfig",
    "AutoProcessor",
    "AutoFeatureExtractor",
    "AutoImageProcessor",
    "AutoModelForCausalLM",
    "AutoModelForMaskedLM",
    "AutoModelForSeq2SeqLM",
    "AutoModelForSequenceClassification",
    "AutoModelForTokenClassification",
    "AutoModelForQuestionAnswering",
];

const BUILTIN_FUNCTIONS: &[BuiltinEntry] = &[
    BuiltinEntry {
        name: "load_dataset",
        identifier: (Some(0), "path"),
        trust_flags: DATASET_TRUST,
    },
    BuiltinEntry {
        name: "hf_hub_download",
        identifier: (Some(0), "repo_id"),
        trust_flags: HUB_TRUST,
    },
    BuiltinEntry {
        name: "snapshot_download",
        identifier: (Some(0), "repo_id"),
        trust_flags: HUB_TRUST,
    },
];

/// Entries shipped with the tool.
pub fn builtin_entries() -> Vec<ApiEntry> {
    let pretrained = PRETRAINED_CLASSES.iter().map(|class| ApiEntry {
        name: format!("{class}.from_pretrained"),
        identifier: ArgSlot::new(Some(0), Some("pretrained_model_name_or_path")),
        revision: ArgSlot::keyword("revision"),
        trust_flags: HUB_TRUST.iter().map(|s| s.to_string()).collect(),
    });

    let functions = BUILTIN_FUNCTIONS.iter().map(|b| ApiEntry {
        name: b.name.to_string(),
        identifier: ArgSlot::new(b.identifier.0, Some(b.identifier.1)),
        revision: ArgSlot::keyword("revision"),
        trust_flags: b.trust_flags.iter().map(|s| s.to_string()).collect(),
    });

    pretrained.chain(functions).collect()
}

/// Validated, immutable set of API entries with a lookup index.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ApiEntry>,
    index: HashMap<(Option<String>, String), usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate or self-contradictory entries.
    pub fn new(entries: Vec<ApiEntry>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(entries.len());

        for (i, entry) in entries.iter().enumerate() {
            validate_entry(entry)?;
            let qn = QualifiedName::parse(&entry.name)?;
            if index.insert((qn.receiver, qn.function), i).is_some() {
                return Err(CatalogError::Duplicate {
                    name: entry.name.clone(),
                });
            }
        }

        Ok(Self { entries, index })
    }

    /// The builtin catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(builtin_entries())
    }

    /// Builtin entries followed by `extra`. Redefining a builtin is a duplicate.
    pub fn with_extra(extra: Vec<ApiEntry>) -> Result<Self, CatalogError> {
        let mut entries = builtin_entries();
        entries.extend(extra);
        Self::new(entries)
    }

    pub fn entries(&self) -> &[ApiEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a call shape to an entry.
    ///
    /// `Recv.function` is tried first; a receiver-less `function` entry also
    /// matches module-qualified calls such as `datasets.load_dataset(...)`.
    pub fn lookup(&self, receiver: Option<&str>, function: &str) -> Option<&ApiEntry> {
        if let Some(receiver) = receiver {
            let key = (Some(receiver.to_string()), function.to_string());
            if let Some(&i) = self.index.get(&key) {
                return Some(&self.entries[i]);
            }
        }
        self.index
            .get(&(None, function.to_string()))
            .map(|&i| &self.entries[i])
    }
}

fn validate_entry(entry: &ApiEntry) -> Result<(), CatalogError> {
    let name = || entry.name.clone();

    if entry.identifier.is_empty() {
        return Err(CatalogError::EmptySlot {
            name: name(),
            role: "identifier",
        });
    }
    if entry.revision.is_empty() {
        return Err(CatalogError::EmptySlot {
            name: name(),
            role: "revision",
        });
    }

    if let (Some(a), Some(b)) = (entry.identifier.position, entry.revision.position) {
        if a == b {
            return Err(CatalogError::OverlappingSlots {
                name: name(),
                detail: format!("both at position {a}"),
            });
        }
    }
    if let (Some(a), Some(b)) = (&entry.identifier.keyword, &entry.revision.keyword) {
        if a == b {
            return Err(CatalogError::OverlappingSlots {
                name: name(),
                detail: format!("both use keyword {a:?}"),
            });
        }
    }

    let mut seen = HashSet::new();
    for flag in &entry.trust_flags {
        let collides = [&entry.identifier.keyword, &entry.revision.keyword]
            .into_iter()
            .flatten()
            .any(|k| k == flag);
        if collides {
            return Err(CatalogError::TrustFlagCollision {
                name: name(),
                flag: flag.clone(),
            });
        }
        if !seen.insert(flag.as_str()) {
            return Err(CatalogError::DuplicateTrustFlag {
                name: name(),
                flag: flag.clone(),
            });
        }
    }

    Ok(())
}
