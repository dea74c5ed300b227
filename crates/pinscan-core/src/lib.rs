pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod python;
pub mod report;
pub mod rules;
pub mod sites;
pub mod source;
pub mod util;

use engine::{CancelToken, Engine};
use report::model::{CatalogInfo, ReportOptions, ScanReport, ToolInfo};
use source::SourceUnit;

pub const TOOL_NAME: &str = "pinscan";

/// JSON schema version of pinscan reports.
/// Bump only when the report shape changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Version of the builtin API catalog and classification rules.
pub const CATALOG_VERSION: &str = "0.1.0";

/// Scan `units` and assemble the report.
pub fn scan(
    engine: &Engine,
    units: &[SourceUnit],
    cancel: &CancelToken,
    tool: ToolInfo,
    options: ReportOptions,
) -> ScanReport {
    let outcome = engine.scan_all(units, cancel);
    ScanReport::new(
        tool,
        CatalogInfo::from_catalog(engine.catalog()),
        engine.options().policy,
        outcome,
        options,
    )
}
