use crate::TOOL_NAME;
use crate::report::model::{ScanReport, Verdict};

/// Exact header of the per-file CSV.
pub const CSV_HEADER: &str = "org,repo,file,safe_usages,partial_usages,unsafe_usages";

pub fn render_text(report: &ScanReport, detailed: bool) -> String {
    let totals = &report.totals;
    let repo_count = |v: Verdict| report.repositories.iter().filter(|r| r.status == v).count();

    let mut out = String::new();
    out.push_str(&format!("{} {}\n", TOOL_NAME, report.tool.version));
    out.push_str("====== Scan Summary ======\n");
    out.push_str(&format!("Files scanned: {}\n", totals.files));
    out.push_str(&format!(
        "Safe usages (with commit SHA): {}\n",
        totals.safe_usages
    ));
    out.push_str(&format!(
        "Partially safe usages (with tag/branch): {}\n",
        totals.partial_usages
    ));
    out.push_str(&format!(
        "Unsafe usages (no revision): {}\n",
        totals.unsafe_usages
    ));
    out.push_str(&format!("Safe projects: {}\n", repo_count(Verdict::Safe)));
    out.push_str(&format!(
        "Partially safe projects: {}\n",
        repo_count(Verdict::Partial)
    ));
    out.push_str(&format!("Unsafe projects: {}\n", repo_count(Verdict::Unsafe)));
    out.push_str(&format!("Overall status: {}\n", report.status));

    if !report.failures.is_empty() {
        out.push_str(&format!("Skipped files: {}\n", report.failures.len()));
    }
    if report.cancelled {
        out.push_str("Scan was cancelled; results are incomplete.\n");
    }

    if detailed {
        out.push_str("\n====== Project Status ======\n");
        for repo in &report.repositories {
            out.push_str(&format!(
                "{:<20}/{:<20} {}\n",
                repo.org,
                repo.repo,
                repo.status.label()
            ));
        }

        let flagged: Vec<_> = report
            .files
            .iter()
            .flat_map(|f| f.findings.iter().map(move |x| (&f.record.file, x)))
            .filter(|(_, x)| x.verdict != Verdict::Safe)
            .collect();
        if !flagged.is_empty() {
            out.push_str("\n====== Findings ======\n");
            for (file, finding) in flagged {
                out.push_str(&format!(
                    "  {}:{} {} [{}]\n",
                    file, finding.line, finding.api, finding.verdict
                ));
            }
        }

        if !report.failures.is_empty() {
            out.push_str("\n====== Skipped ======\n");
            for f in &report.failures {
                out.push_str(&format!("  {}: {}\n", f.file, f.reason));
            }
        }
    }
    out
}

/// One row per scanned file, in report order.
pub fn render_csv(report: &ScanReport) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in report.records() {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            format_csv_field(&r.org),
            format_csv_field(&r.repo),
            format_csv_field(&r.file),
            r.safe_usages,
            r.partial_usages,
            r.unsafe_usages
        ));
    }
    out
}

/// RFC 4180: quote fields containing a comma, quote or line break; double inner quotes.
pub fn format_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
