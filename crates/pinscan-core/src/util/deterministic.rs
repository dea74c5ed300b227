//! Deterministic ordering helpers.
//!
//! Parallel scanning finishes files in arbitrary order. These helpers restore
//! a stable order so identical inputs always produce identical reports.

use crate::report::model::{FileFailure, FileReport};

/// Sort file reports by `(org, repo, file)`.
pub fn sort_file_reports(files: &mut [FileReport]) {
    files.sort_by(|a, b| {
        (a.record.org.as_str(), a.record.repo.as_str(), a.record.file.as_str()).cmp(&(
            b.record.org.as_str(),
            b.record.repo.as_str(),
            b.record.file.as_str(),
        ))
    });
}

/// Sort failures by `(org, repo, file)`.
pub fn sort_failures(failures: &mut [FileFailure]) {
    failures.sort_by(|a, b| {
        (a.org.as_str(), a.repo.as_str(), a.file.as_str()).cmp(&(
            b.org.as_str(),
            b.repo.as_str(),
            b.file.as_str(),
        ))
    });
}
