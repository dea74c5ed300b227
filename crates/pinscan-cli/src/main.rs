use anyhow::{Context, Result, ensure};
use clap::Parser;
use tracing::info;

use pinscan_core::config::{PinscanConfig, load_config};
use pinscan_core::engine::{CancelToken, Engine};
use pinscan_core::report::model::{ReportOptions, ToolInfo};
use pinscan_core::report::render;

mod args;
mod discover;
mod logging;

/// Exit code for configuration and I/O errors.
const EXIT_ERROR: i32 = 3;

fn main() {
    let args = args::Args::parse();
    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(EXIT_ERROR);
        }
    }
}

fn run(args: args::Args) -> Result<i32> {
    logging::init_tracing(args.verbose, args.quiet, args.log_json)?;

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => PinscanConfig::default(),
    };
    if let Some(n) = args.max_in_flight {
        config.scan.max_in_flight = n;
    }
    if let Some(n) = args.threads {
        config.scan.threads = Some(n);
    }
    if let Some(policy) = args.unresolved_revision {
        config.scan.unresolved_revision = policy.into();
    }
    config.scan.skip_unknown |= args.skip_unknown;

    if let Some(threads) = config.scan.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure worker threads")?;
    }

    let catalog = config.build_catalog().context("invalid API catalog")?;

    ensure!(
        args.root.is_dir(),
        "{} is not a directory",
        args.root.display()
    );
    let units = discover::discover(&args.root);
    info!(root = %args.root.display(), files = units.len(), "discovered python files");

    let engine = Engine::new(catalog, config.scan_options());
    let tool = ToolInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let options = ReportOptions {
        detailed: args.detailed,
        skip_unknown: config.scan.skip_unknown,
    };
    let report = pinscan_core::scan(&engine, &units, &CancelToken::new(), tool, options);

    let output = match args.format {
        args::OutputFormat::Json => report.to_json()?,
        args::OutputFormat::Text => render::render_text(&report, args.detailed),
        args::OutputFormat::Csv => render::render_csv(&report),
    };

    match &args.out {
        Some(path) => std::fs::write(path, &output)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{output}"),
    }

    if let Some(path) = &args.csv {
        std::fs::write(path, render::render_csv(&report))
            .with_context(|| format!("failed to write CSV to {}", path.display()))?;
        info!(path = %path.display(), "CSV written");
    }

    Ok(report.exit_code)
}
