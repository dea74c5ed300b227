//! Python front-end: parse, locate catalog calls, resolve their arguments.

pub mod parse;
pub mod resolve;
pub mod scan;

use crate::error::ParseError;
use crate::rules::catalog::Catalog;
use crate::sites::model::CallSite;

/// Every catalog call site in `source`, in source order.
///
/// Fails only when the source does not parse; a file without matching calls
/// yields an empty list.
pub fn call_sites(path: &str, source: &str, catalog: &Catalog) -> Result<Vec<CallSite>, ParseError> {
    let tree = parse::parse_python(source)?;
    let sites = scan::scan_calls(&tree, source, catalog)
        .iter()
        .map(|raw| resolve::resolve_call(raw, source, path))
        .collect();
    Ok(sites)
}
