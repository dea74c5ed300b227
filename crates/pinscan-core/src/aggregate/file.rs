//! File Aggregator: folds the verdicts of one file into a `FileRecord`.

use serde::{Deserialize, Serialize};

use crate::report::model::Verdict;

/// Per-file usage counts. This is the unit handed to reporting.
///
/// The status is always derived from the counts, never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FileRecord {
    pub org: String,
    pub repo: String,
    pub file: String,
    pub safe_usages: u64,
    pub partial_usages: u64,
    pub unsafe_usages: u64,
}

impl FileRecord {
    /// Fold call-site verdicts, in source order, into a record.
    ///
    /// `Verdict::Unknown` never comes out of the classifier; if one is passed
    /// in it is not counted.
    pub fn fold<I>(org: &str, repo: &str, file: &str, verdicts: I) -> Self
    where
        I: IntoIterator<Item = Verdict>,
    {
        let mut record = FileRecord {
            org: org.to_string(),
            repo: repo.to_string(),
            file: file.to_string(),
            ..Default::default()
        };
        for verdict in verdicts {
            match verdict {
                Verdict::Safe => record.safe_usages += 1,
                Verdict::Partial => record.partial_usages += 1,
                Verdict::Unsafe => record.unsafe_usages += 1,
                Verdict::Unknown => {}
            }
        }
        record
    }

    /// Number of recognised call sites.
    pub fn total(&self) -> u64 {
        self.safe_usages + self.partial_usages + self.unsafe_usages
    }

    pub fn status(&self) -> Verdict {
        worst_case(self.safe_usages, self.partial_usages, self.unsafe_usages)
    }
}

/// Worst-case precedence: UNSAFE > PARTIAL > SAFE > UNKNOWN.
///
/// One unsafe usage marks the whole unit unsafe regardless of how many safe
/// usages sit next to it.
pub fn worst_case(safe: u64, partial: u64, unsafe_: u64) -> Verdict {
    if unsafe_ > 0 {
        Verdict::Unsafe
    } else if partial > 0 {
        Verdict::Partial
    } else if safe > 0 {
        Verdict::Safe
    } else {
        Verdict::Unknown
    }
}
