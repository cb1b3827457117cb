mod commands;
mod logging;
mod progress;
mod prompt;

use std::fs;
use std::process;
use std::sync::Arc;

use clap::Parser;
use colored::*;
use commands::Cli;
use dotenv::dotenv;
use folder_dater_core::report::log_file_name;
use folder_dater_core::{
    load_configuration, MissingMetadataPolicy, RenameEngine, RunConfig, RunResult,
};
use progress::CliReporter;
use prompt::StdinDateProvider;
use tracing::{error, info, warn};

const SKIPPED_SAMPLE: usize = 5;

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args = Cli::parse();

    let settings = match load_configuration() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };
    let mut config = match args.apply_to(settings).into_run_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            process::exit(1);
        }
    };

    let target = fs::canonicalize(&args.target).unwrap_or_else(|_| args.target.clone());
    let _guard = logging::init_logger(
        &config.output_dir.join("logs"),
        &log_file_name(&target),
        args.debug,
    );

    if config.missing_metadata == MissingMetadataPolicy::Manual && !console::user_attended() {
        warn!("No terminal attached; folders without metadata will be skipped");
        config.missing_metadata = MissingMetadataPolicy::Skip;
    }

    let reporter = Arc::new(CliReporter::new());
    let ask_for_dates = config.missing_metadata == MissingMetadataPolicy::Manual;
    let mut engine = RenameEngine::new(config);
    if ask_for_dates {
        engine = engine.with_manual_provider(Arc::new(StdinDateProvider::new(Arc::clone(
            &reporter,
        ))));
    }

    print_capabilities(&engine);

    let result = match engine.run(&target, reporter.as_ref()) {
        Ok(result) => result,
        Err(err) => {
            error!("Fatal: {}", err);
            process::exit(1);
        }
    };

    print_summary(engine.config(), &result);
    Ok(())
}

fn print_capabilities(engine: &RenameEngine) {
    let caps = engine.capabilities();
    let mark = |present: bool| {
        if present {
            "available".green()
        } else {
            "missing".yellow()
        }
    };
    info!(
        "Capabilities: images {}, HEIC {}, video {}",
        mark(true),
        mark(caps.heic),
        mark(caps.video),
    );
}

fn print_summary(config: &RunConfig, result: &RunResult) {
    let summary = &result.report.summary;

    println!();
    info!(
        "Tree scan: {}, processing: {}",
        format!("{:.2}s", result.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.dispatch_duration.as_secs_f64()).green(),
    );
    info!(
        "{} folders: {} renamed, {} dry run, {} unchanged, {} skipped, {} errors",
        summary.total,
        format!("{}", summary.renamed).green(),
        format!("{}", summary.dry_run).cyan(),
        summary.unchanged,
        format!("{}", summary.skipped).yellow(),
        format!("{}", summary.errored).red(),
    );

    let skipped = result.report.skipped_samples(SKIPPED_SAMPLE);
    if !skipped.is_empty() {
        info!("Skipped (first {}):", skipped.len());
        for record in skipped {
            info!(
                "  {} ({})",
                record.original_path.display(),
                record.reason.as_deref().unwrap_or("unknown").yellow()
            );
        }
    }

    info!("Report: {}", result.artifacts.report_json.display());
    info!("Undo: {}", result.artifacts.undo_sh.display());
    info!("Undo (PowerShell): {}", result.artifacts.undo_ps1.display());

    if !config.live_mode {
        info!("{}", "Dry run: nothing was renamed. Re-run with --live to apply.".cyan());
    }
}
