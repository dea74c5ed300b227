use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use pinscan_core::rules::classify::UnresolvedRevision;

#[derive(Debug, Parser)]
#[command(
    name = "pinscan",
    version,
    about = "Check that Hugging Face model and dataset loads are pinned to a commit"
)]
pub struct Args {
    /// Root directory laid out as <org>/<repo>/...
    pub root: PathBuf,

    /// Output format
    #[arg(long, default_value = "json")]
    pub format: OutputFormat,

    /// Write output to a file instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Additionally write the per-file CSV to this path
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Include findings and per-repository status
    #[arg(long)]
    pub detailed: bool,

    /// Omit files without recognised calls from the report and all sums
    #[arg(long)]
    pub skip_unknown: bool,

    /// TOML config file (scan settings and extra catalog entries)
    #[arg(long, visible_alias = "catalog")]
    pub config: Option<PathBuf>,

    /// Verdict for a revision that is present but not a literal
    #[arg(long, value_enum)]
    pub unresolved_revision: Option<RevisionPolicy>,

    /// Worker threads (default: one per core)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Maximum number of files scanned concurrently
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Emit log lines as JSON
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Csv,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RevisionPolicy {
    Unsafe,
    Partial,
}

impl From<RevisionPolicy> for UnresolvedRevision {
    fn from(p: RevisionPolicy) -> Self {
        match p {
            RevisionPolicy::Unsafe => UnresolvedRevision::Unsafe,
            RevisionPolicy::Partial => UnresolvedRevision::Partial,
        }
    }
}
