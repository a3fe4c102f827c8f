//! subtrans - batch subtitle translation
//!
//! Entry point: parses arguments, sets up logging, loads configuration and
//! credentials, then runs the requested command.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subtrans::api::Credentials;
use subtrans::cli::{Args, Commands};
use subtrans::config::{Config, TranslationMode};
use subtrans::pipeline::{default_output_path, simplify_file, Pipeline};

const DEFAULT_CONFIG: &str = "subtrans.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Keep the guard alive so the file writer flushes on exit
    let _log_guard = setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG);
                Config::from_file(DEFAULT_CONFIG)?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Translate {
            input,
            output,
            batch,
            source,
            target,
            mode,
            concurrency,
            key_file,
        } => {
            if let Some(batch) = batch {
                config.translate.batch_size = batch;
            }
            if let Some(source) = source {
                config.translate.source_language = source;
            }
            if let Some(target) = target {
                config.translate.target_language = target;
            }
            if let Some(mode) = mode {
                config.translate.mode = TranslationMode::parse(&mode)?;
            }
            if let Some(concurrency) = concurrency {
                config.translate.concurrency = concurrency;
            }
            config.validate()?;

            let credentials = Credentials::resolve(&key_file)?;
            let output = output.unwrap_or_else(|| default_output_path(&input, "tc_translated"));

            let pipeline = Pipeline::new(config, credentials)?;
            let summary = pipeline.run(&input, &output).await?;

            if summary.degraded_batches > 0 || summary.shortfall_entries > 0 {
                println!(
                    "{} of {} batches kept original text, {} entries were not aligned",
                    summary.degraded_batches, summary.batches, summary.shortfall_entries
                );
            }
            println!("Translation complete! Saved to {}", display_path(&summary.output));
        }
        Commands::Simplify { input, output } => {
            let output = output.unwrap_or_else(|| default_output_path(&input, "simplified"));
            let count = simplify_file(&input, &output).await?;
            println!("Simplified {} entries. Saved to {}", count, display_path(&output));
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".subtrans").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "subtrans.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Console goes to stderr so it does not fight with the progress bar on stdout
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - level: {}, file: {}",
          log_level, log_dir.join("subtrans.log").display());

    Ok(guard)
}

fn display_path(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
