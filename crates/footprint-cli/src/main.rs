//! footprint - Fetch and load Global Footprint Network data
//!
//! Downloads one JSON dataset per year from the footprint API under a strict
//! concurrency limit, then loads the artifacts into DuckDB.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "footprint")]
#[command(about = "Fetch and load Global Footprint Network data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./footprint.toml or ~/.config/footprint/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch yearly datasets from the API
    Fetch(cmd::fetch::FetchArgs),
    /// Load fetched artifacts into DuckDB
    Ingest(cmd::ingest::IngestArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // .env before config so ${VAR} references resolve
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {e}");
        }
    }

    // Progress context (TTY auto-detect)
    let progress = Arc::new(footprint_core::ProgressContext::new());

    // TTY: warn unless --debug, progress lines show activity.
    // Non-TTY: info unless --debug.
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = if is_tty { !cli.debug } else { false };
    footprint_core::init_logging(quiet, cli.debug, multi)?;

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Fetch(args) => cmd::fetch::run(args, &config, &progress),
        Command::Ingest(args) => {
            cmd::ingest::run(args, &config)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            use comfy_table::{
                Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "API URL",
                config.api.base_url.as_deref().unwrap_or("not set"),
            ]);
            table.add_row(vec![
                "API key",
                if config.api.api_key.is_some() {
                    "configured"
                } else {
                    "not set"
                },
            ]);
            table.add_row(vec![
                "Output directory",
                &config.fetch.output_dir.display().to_string(),
            ]);
            table.add_row(vec![
                "Years",
                &format!("{}..={}", config.fetch.first_year, config.fetch.last_year),
            ]);
            table.add_row(vec![
                "Max concurrent",
                &config.fetch.max_concurrent.to_string(),
            ]);
            table.add_row(vec!["Max retries", &config.fetch.max_retries.to_string()]);
            table.add_row(vec![
                "Initial delay",
                &format!("{}ms", config.fetch.initial_delay_ms),
            ]);
            table.add_row(vec!["Timeout", &format!("{}s", config.fetch.timeout)]);
            table.add_row(vec![
                "Database",
                &config.ingest.database.display().to_string(),
            ]);
            table.add_row(vec!["Country", &config.ingest.country]);

            eprintln!("\n{table}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
