use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. Logs go to stderr; stdout carries the report.
///
/// `RUST_LOG`, when set, overrides the level picked from the flags.
pub fn init_tracing(verbose: bool, quiet: bool, json_output: bool) -> Result<()> {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false);

    let result = if json_output {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    result.map_err(|e| anyhow!("tracing initialization error: {e}"))
}
