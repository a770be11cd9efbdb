//! Ingest subcommand - load fetched artifacts into DuckDB

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Directory containing data_all_<year>.json artifacts
    #[arg(long)]
    pub raw_dir: Option<PathBuf>,

    /// DuckDB database file
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Country for the per-year carbon check
    #[arg(long)]
    pub country: Option<String>,
}

pub fn run(args: IngestArgs, config: &Config) -> Result<()> {
    let ingest_config = footprint_ingest::IngestConfig {
        raw_dir: args
            .raw_dir
            .unwrap_or_else(|| config.fetch.output_dir.clone()),
        database_path: args
            .database
            .unwrap_or_else(|| config.ingest.database.clone()),
        country: args
            .country
            .unwrap_or_else(|| config.ingest.country.clone()),
    };

    let summary = footprint_ingest::run(&ingest_config)?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Ingest").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    table.add_row(vec![
        Cell::new("Files"),
        Cell::new(format!(
            "{}/{} ({} failed)",
            summary.files_loaded, summary.files_found, summary.files_failed
        )),
    ]);
    table.add_row(vec![Cell::new("Rows"), Cell::new(summary.total_rows)]);
    for (year, avg) in &summary.yearly_carbon {
        let value = avg.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"));
        table.add_row(vec![
            Cell::new(format!("{} carbon {year}", summary.country)),
            Cell::new(value),
        ]);
    }
    eprintln!("\n{table}");

    if summary.files_failed > 0 {
        log::warn!(
            "{} artifact files could not be read; loaded the rest",
            summary.files_failed
        );
    }
    Ok(())
}
