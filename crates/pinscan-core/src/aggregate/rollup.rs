//! Repository and organization roll-ups.
//!
//! Everything here is a pure reduction over `FileRecord`s. `Tally` and
//! `Rollup` form monoids (identity = `Default`), so partial results computed
//! on any partition of the file set merge into the same totals.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregate::file::{FileRecord, worst_case};
use crate::report::model::Verdict;

/// Summed usage counts over a set of files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tally {
    pub safe_usages: u64,
    pub partial_usages: u64,
    pub unsafe_usages: u64,
    pub files: u64,
}

impl Tally {
    pub fn total_usages(&self) -> u64 {
        self.safe_usages + self.partial_usages + self.unsafe_usages
    }

    pub fn status(&self) -> Verdict {
        worst_case(self.safe_usages, self.partial_usages, self.unsafe_usages)
    }
}

impl From<&FileRecord> for Tally {
    fn from(r: &FileRecord) -> Self {
        Tally {
            safe_usages: r.safe_usages,
            partial_usages: r.partial_usages,
            unsafe_usages: r.unsafe_usages,
            files: 1,
        }
    }
}

impl Add for Tally {
    type Output = Tally;

    fn add(self, rhs: Tally) -> Tally {
        Tally {
            safe_usages: self.safe_usages + rhs.safe_usages,
            partial_usages: self.partial_usages + rhs.partial_usages,
            unsafe_usages: self.unsafe_usages + rhs.unsafe_usages,
            files: self.files + rhs.files,
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Tally) {
        *self = *self + rhs;
    }
}

impl Sum for Tally {
    fn sum<I: Iterator<Item = Tally>>(iter: I) -> Tally {
        iter.fold(Tally::default(), Add::add)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepositoryAggregate {
    pub org: String,
    pub repo: String,
    #[serde(flatten)]
    pub tally: Tally,
    pub status: Verdict,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationAggregate {
    pub org: String,
    #[serde(flatten)]
    pub tally: Tally,
    pub status: Verdict,
}

/// Per-repository tallies keyed by `(org, repo)`.
///
/// Organization views and grand totals are derived from it on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rollup {
    repos: BTreeMap<(String, String), Tally>,
}

impl Rollup {
    /// Fold step: account for one more file.
    pub fn with(mut self, record: &FileRecord) -> Self {
        *self
            .repos
            .entry((record.org.clone(), record.repo.clone()))
            .or_default() += Tally::from(record);
        self
    }

    /// Combine step: sum matching keys.
    pub fn merge(mut self, other: Rollup) -> Self {
        for (key, tally) in other.repos {
            *self.repos.entry(key).or_default() += tally;
        }
        self
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        records.into_iter().fold(Rollup::default(), Rollup::with)
    }

    /// Same result as `from_records`, computed on the rayon pool.
    pub fn par_from_records(records: &[FileRecord]) -> Self {
        records
            .par_iter()
            .fold(Rollup::default, Rollup::with)
            .reduce(Rollup::default, Rollup::merge)
    }

    pub fn repository(&self, org: &str, repo: &str) -> Tally {
        self.repos
            .get(&(org.to_string(), repo.to_string()))
            .copied()
            .unwrap_or_default()
    }

    /// Repository views, ordered by `(org, repo)`.
    pub fn repositories(&self) -> Vec<RepositoryAggregate> {
        self.repos
            .iter()
            .map(|((org, repo), tally)| RepositoryAggregate {
                org: org.clone(),
                repo: repo.clone(),
                tally: *tally,
                status: tally.status(),
            })
            .collect()
    }

    /// Organization views, ordered by name.
    pub fn organizations(&self) -> Vec<OrganizationAggregate> {
        let mut orgs: BTreeMap<&str, Tally> = BTreeMap::new();
        for ((org, _), tally) in &self.repos {
            *orgs.entry(org.as_str()).or_default() += *tally;
        }
        orgs.into_iter()
            .map(|(org, tally)| OrganizationAggregate {
                org: org.to_string(),
                tally,
                status: tally.status(),
            })
            .collect()
    }

    pub fn totals(&self) -> Tally {
        self.repos.values().copied().sum()
    }
}
