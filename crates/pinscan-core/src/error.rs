//! Error types for pinscan-core.
//!
//! Only catalog and configuration errors are fatal. Per-file problems
//! (`SourceError`, `ParseError`) are turned into `FileFailure` entries by the
//! engine and never abort a scan.

use std::path::PathBuf;

/// A catalog entry that would make classifications silently wrong.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate catalog entry: {name}")]
    Duplicate { name: String },

    #[error("malformed qualified name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("{name}: {role} argument has neither a position nor a keyword")]
    EmptySlot { name: String, role: &'static str },

    #[error("{name}: identifier and revision arguments overlap ({detail})")]
    OverlappingSlots { name: String, detail: String },

    #[error("{name}: trust flag {flag:?} collides with an argument keyword")]
    TrustFlagCollision { name: String, flag: String },

    #[error("{name}: trust flag {flag:?} listed twice")]
    DuplicateTrustFlag { name: String, flag: String },
}

/// Failure to load a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Failure to obtain the text of one source unit.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8")]
    Encoding { path: PathBuf },
}

/// Failure to turn source text into a usable syntax tree.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("failed to load the Python grammar: {0}")]
    Grammar(String),

    #[error("parser produced no tree")]
    NoTree,

    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}
