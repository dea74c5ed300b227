use std::path::{Component, Path};

use pinscan_core::source::SourceUnit;
use walkdir::{DirEntry, WalkDir};

const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".mypy_cache",
    ".venv",
    "venv",
    ".env",
];

const UNKNOWN: &str = "unknown";

fn is_excluded(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && EXCLUDED_DIRS
            .iter()
            .any(|d| entry.file_name().to_string_lossy() == *d)
}

/// Every `*.py` file under `root`, sorted by path, as lazily-read units.
///
/// Unreadable directory entries are skipped.
pub fn discover(root: &Path) -> Vec<SourceUnit> {
    let mut units: Vec<SourceUnit> = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.path().extension().is_some_and(|x| x == "py"))
        .map(|e| unit_for(root, e.path()))
        .collect();
    units.sort_by(|a, b| a.path.cmp(&b.path));
    units
}

fn unit_for(root: &Path, path: &Path) -> SourceUnit {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let (org, repo) = match parts.as_slice() {
        [org, repo, _, ..] => (org.as_str(), repo.as_str()),
        _ => (UNKNOWN, UNKNOWN),
    };
    SourceUnit::disk(org, repo, &parts.join("/"), path)
}
