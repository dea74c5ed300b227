use serde::{Deserialize, Serialize};

use crate::SCHEMA_VERSION;
use crate::aggregate::file::FileRecord;
use crate::aggregate::rollup::{OrganizationAggregate, RepositoryAggregate, Rollup, Tally};
use crate::engine::{FileScan, ScanOutcome};
use crate::rules::catalog::Catalog;
use crate::rules::classify::{Basis, ClassifyPolicy};
use crate::util::deterministic::{sort_failures, sort_file_reports};

/// Safety verdict for a call site, a file, or an aggregate.
///
/// Call sites are only ever `Safe`, `Partial` or `Unsafe`; `Unknown` means a
/// parsed unit contained no recognised calls.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    Partial,
    Unsafe,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Partial => "PARTIAL",
            Verdict::Unsafe => "UNSAFE",
            Verdict::Unknown => "UNKNOWN",
        }
    }

    /// Lowercase status label used in tabular output.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Safe => "safe",
            Verdict::Partial => "partially_safe",
            Verdict::Unsafe => "unsafe",
            Verdict::Unknown => "unknown",
        }
    }

    /// CI exit code: SAFE/UNKNOWN → 0, PARTIAL → 1, UNSAFE → 2.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Safe | Verdict::Unknown => 0,
            Verdict::Partial => 1,
            Verdict::Unsafe => 2,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified call site kept for detailed output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub line: usize,
    pub api: String,
    pub verdict: Verdict,
    pub basis: Basis,
}

/// A unit that could not be scanned. Excluded from every count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileFailure {
    pub org: String,
    pub repo: String,
    pub file: String,
    pub reason: String,
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// Catalog metadata bound to this report.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogInfo {
    pub catalog_version: String,
    pub apis: Vec<String>,
}

impl CatalogInfo {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            catalog_version: crate::CATALOG_VERSION.to_string(),
            apis: catalog.entries().iter().map(|e| e.name.clone()).collect(),
        }
    }
}

/// One scanned file as it appears in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    #[serde(flatten)]
    pub record: FileRecord,
    pub status: Verdict,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Finding>,
}

/// Shaping options applied when assembling a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Keep per-call-site findings.
    pub detailed: bool,
    /// Drop files without recognised calls from the file list and all sums.
    pub skip_unknown: bool,
}

/// Top-level scan report.
///
/// Deterministic for identical inputs: files are ordered by
/// `(org, repo, file)` and failures by the same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub catalog: CatalogInfo,
    pub policy: ClassifyPolicy,
    pub files: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    pub repositories: Vec<RepositoryAggregate>,
    pub organizations: Vec<OrganizationAggregate>,
    pub totals: Tally,
    pub status: Verdict,
    pub exit_code: i32,
    pub cancelled: bool,
}

impl ScanReport {
    /// Assemble a report from engine output.
    pub fn new(
        tool: ToolInfo,
        catalog: CatalogInfo,
        policy: ClassifyPolicy,
        outcome: ScanOutcome,
        options: ReportOptions,
    ) -> Self {
        let ScanOutcome {
            files,
            mut failures,
            cancelled,
        } = outcome;

        let mut files: Vec<FileReport> = files
            .into_iter()
            .filter(|f| !(options.skip_unknown && f.record.total() == 0))
            .map(|f| FileReport::from_scan(f, options.detailed))
            .collect();
        sort_file_reports(&mut files);
        sort_failures(&mut failures);

        let records: Vec<FileRecord> = files.iter().map(|f| f.record.clone()).collect();
        let rollup = Rollup::par_from_records(&records);
        let totals = rollup.totals();
        let status = totals.status();

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            tool,
            catalog,
            policy,
            files,
            failures,
            repositories: rollup.repositories(),
            organizations: rollup.organizations(),
            totals,
            status,
            exit_code: status.exit_code(),
            cancelled,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().map(|f| &f.record)
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self).map(|s| s + "\n")
    }
}

impl FileReport {
    fn from_scan(scan: FileScan, detailed: bool) -> Self {
        let status = scan.record.status();
        Self {
            record: scan.record,
            status,
            sha256: scan.sha256,
            findings: if detailed { scan.findings } else { Vec::new() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(org: &str, file: &str, s: u64, p: u64, u: u64) -> FileScan {
        FileScan {
            record: FileRecord {
                org: org.into(),
                repo: "r".into(),
                file: file.into(),
                safe_usages: s,
                partial_usages: p,
                unsafe_usages: u,
            },
            sha256: "abc".into(),
            findings: vec![Finding {
                line: 3,
                api: "load_dataset".into(),
                verdict: Verdict::Safe,
                basis: Basis::CommitPin,
            }],
        }
    }

    fn build(options: ReportOptions) -> ScanReport {
        let outcome = ScanOutcome {
            files: vec![
                scan("zeta", "b.py", 1, 0, 0),
                scan("acme", "a.py", 0, 1, 0),
                scan("acme", "empty.py", 0, 0, 0),
            ],
            failures: vec![FileFailure {
                org: "acme".into(),
                repo: "r".into(),
                file: "broken.py".into(),
                reason: "syntax error at line 1, column 4".into(),
            }],
            cancelled: false,
        };
        ScanReport::new(
            ToolInfo {
                name: "pinscan".into(),
                version: "0.0.0-test".into(),
            },
            CatalogInfo::default(),
            ClassifyPolicy::default(),
            outcome,
            options,
        )
    }

    #[test]
    fn verdict_serializes_as_screaming_case() {
        assert_eq!(serde_json::to_string(&Verdict::Partial).unwrap(), "\"PARTIAL\"");
        assert_eq!(Verdict::Unsafe.to_string(), "UNSAFE");
        assert_eq!(Verdict::Partial.label(), "partially_safe");
    }

    #[test]
    fn exit_codes() {
        assert_eq!(Verdict::Safe.exit_code(), 0);
        assert_eq!(Verdict::Unknown.exit_code(), 0);
        assert_eq!(Verdict::Partial.exit_code(), 1);
        assert_eq!(Verdict::Unsafe.exit_code(), 2);
    }

    #[test]
    fn report_orders_files_and_sums_them() {
        let report = build(ReportOptions::default());

        let order: Vec<&str> = report.records().map(|r| r.file.as_str()).collect();
        assert_eq!(order, vec!["a.py", "empty.py", "b.py"]);
        assert_eq!(report.totals.files, 3);
        assert_eq!(report.status, Verdict::Partial);
        assert_eq!(report.exit_code, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.files.iter().all(|f| f.findings.is_empty()));
    }

    #[test]
    fn skip_unknown_drops_empty_files_from_sums() {
        let report = build(ReportOptions {
            skip_unknown: true,
            ..Default::default()
        });
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.totals.files, 2);
    }

    #[test]
    fn detailed_keeps_findings() {
        let report = build(ReportOptions {
            detailed: true,
            ..Default::default()
        });
        assert!(report.files.iter().all(|f| f.findings.len() == 1));
    }

    #[test]
    fn file_report_flattens_record_fields() {
        let report = build(ReportOptions::default());
        let json = serde_json::to_value(&report.files[0]).unwrap();
        assert_eq!(json["org"], "acme");
        assert_eq!(json["partial_usages"], 1);
        assert_eq!(json["status"], "PARTIAL");
        assert!(json.get("findings").is_none());
    }
}
