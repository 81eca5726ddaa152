//! imgblob - main entry point

use clap::Parser;
use colored::Colorize;
use imgblob_common::logging::{init_logging, LogConfig, LogLevel};
use imgblob_migrate::{
    config::AppConfig,
    coordinator::{BatchCoordinator, RunMode},
    report::RunReport,
    store::SqlStoreConnector,
    Cli, MigrateError, ReportFormat,
};
use std::process;
use std::sync::Arc;
use tracing::error;

/// Settings could not be loaded or failed validation
const EXIT_CONFIG: i32 = 1;
/// The run completed with errors and `--fail-on-errors` was given
const EXIT_RUN_ERRORS: i32 = 3;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    let defaults = LogConfig::builder().level(level).build();
    let log_config = defaults.clone().with_env_overrides().unwrap_or_else(|e| {
        eprintln!("Warning: ignoring invalid logging environment: {}", e);
        defaults
    });

    // The tool still works without logging
    let guard = init_logging(&log_config).unwrap_or_else(|e| {
        eprintln!("Warning: logging disabled: {}", e);
        None
    });

    let code = run(&cli).await;

    // Flush file logs before exiting
    drop(guard);
    process::exit(code);
}

async fn run(cli: &Cli) -> i32 {
    let config = match AppConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => return fatal(&e),
    };

    let settings = match config.validated_settings() {
        Ok(settings) => settings,
        Err(e) => return fatal(&e),
    };

    let database_url = match config.database_url(cli.database_url.as_deref()) {
        Ok(url) => url,
        Err(e) => return fatal(&e),
    };

    let mode = if cli.sequential {
        RunMode::Sequential
    } else {
        RunMode::Parallel
    };

    let report = BatchCoordinator::new(
        settings,
        Arc::new(SqlStoreConnector::new(database_url)),
        config.compression.build(),
    )
    .with_mode(mode)
    .run()
    .await;

    print_report(&report, cli.format);

    if cli.fail_on_errors && report.has_errors() {
        EXIT_RUN_ERRORS
    } else {
        0
    }
}

fn fatal(err: &MigrateError) -> i32 {
    error!(error = %err, "Run aborted before processing");

    match err {
        MigrateError::Validation(errors) => {
            eprintln!("{}", "Validation failed, with errors:".red().bold());
            for message in errors {
                eprintln!("{}", format!("- {}", message).red());
            }
        },
        other => eprintln!("{} {}", "Error:".red().bold(), other),
    }

    EXIT_CONFIG
}

fn print_report(report: &RunReport, format: ReportFormat) {
    match format {
        ReportFormat::Text => {
            if report.has_errors() {
                println!("\nErrors encountered during processing:");
                for err in &report.errors {
                    println!("{}", err.message.red());
                }
            }
            println!("{}", report.summary_text());
        },
        ReportFormat::Json => match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize report: {}", e),
        },
    }
}
