//! footprint-ingest: load fetched yearly artifacts into DuckDB
//!
//! Reads every `*.json` artifact in the raw directory, maps the API's
//! camelCase fields onto the `carbon_footprint` table, and runs a few
//! verification queries over the result.

mod config;
mod sql;

pub use config::{DEFAULT_COUNTRY, IngestConfig};

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use duckdb::{Connection, params};
use serde::Deserialize;

/// One API record as stored in an artifact.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FootprintRow {
    pub year: Option<i32>,
    pub country_code: Option<i32>,
    pub country_name: Option<String>,
    pub short_name: Option<String>,
    pub isoa2: Option<String>,
    pub record: Option<String>,
    pub crop_land: Option<f64>,
    pub grazing_land: Option<f64>,
    pub forest_land: Option<f64>,
    pub fishing_ground: Option<f64>,
    pub builtup_land: Option<f64>,
    pub carbon: Option<f64>,
    pub value: Option<f64>,
    pub score: Option<String>,
}

/// Summary statistics from one ingest run.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub rows_inserted: usize,
    /// Row count reported by the table after loading
    pub total_rows: u64,
    pub country: String,
    /// `(year, average carbon)` for `country`, ascending by year
    pub yearly_carbon: Vec<(i32, Option<f64>)>,
}

/// Run the ingest pipeline.
pub fn run(config: &IngestConfig) -> Result<IngestSummary> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database dir: {}", parent.display())
            })?;
        }
    }

    let conn = Connection::open(&config.database_path).with_context(|| {
        format!("Failed to open DuckDB at {}", config.database_path.display())
    })?;
    log::info!("Connected to DuckDB at {}", config.database_path.display());

    conn.execute_batch(sql::create_and_truncate())
        .context("Failed to create/truncate carbon_footprint")?;
    log::info!("Table '{}' is ready (truncated for clean reload)", sql::TABLE);

    let mut summary = IngestSummary {
        country: config.country.clone(),
        ..Default::default()
    };

    let files = collect_json_files(&config.raw_dir)?;
    summary.files_found = files.len();
    if files.is_empty() {
        log::warn!("No JSON files found in {}", config.raw_dir.display());
        return Ok(summary);
    }

    let mut rows = Vec::new();
    for path in &files {
        log::info!("Processing {}...", file_name(path));
        match read_rows(path) {
            Ok(mut batch) => {
                summary.files_loaded += 1;
                rows.append(&mut batch);
            }
            Err(e) => {
                log::error!("Failed to read {}: {e:#}", path.display());
                summary.files_failed += 1;
            }
        }
    }
    anyhow::ensure!(
        summary.files_loaded > 0,
        "No JSON data could be read from {} ({} files failed)",
        config.raw_dir.display(),
        summary.files_failed
    );

    summary.rows_inserted = insert_rows(&conn, &rows)?;
    log::info!("Loaded {} records into DuckDB", summary.rows_inserted);

    if let Err(e) = verify(&conn, &mut summary) {
        log::error!("Failed during verification queries: {e:#}");
    }

    log::info!(
        "Data successfully loaded into {}",
        config.database_path.display()
    );
    Ok(summary)
}

/// `*.json` files in `dir`, sorted by name
fn collect_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("*.json");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("Non-UTF-8 raw dir: {}", dir.display()))?;
    let mut files: Vec<PathBuf> = glob::glob(pattern)
        .with_context(|| format!("Invalid glob pattern: {pattern}"))?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();
    Ok(files)
}

/// Decode one artifact: a JSON array of records
pub fn read_rows(path: &Path) -> Result<Vec<FootprintRow>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn insert_rows(conn: &Connection, rows: &[FootprintRow]) -> Result<usize> {
    let mut appender = conn
        .appender(sql::TABLE)
        .context("Failed to open appender")?;
    for row in rows {
        appender
            .append_row(params![
                row.year,
                row.country_code,
                row.country_name,
                row.short_name,
                row.isoa2,
                row.record,
                row.crop_land,
                row.grazing_land,
                row.forest_land,
                row.fishing_ground,
                row.builtup_land,
                row.carbon,
                row.value,
                row.score,
            ])
            .context("Failed to insert data into DuckDB")?;
    }
    appender.flush().context("Failed to flush appender")?;
    Ok(rows.len())
}

fn verify(conn: &Connection, summary: &mut IngestSummary) -> Result<()> {
    summary.total_rows = conn
        .query_row(sql::count_rows(), [], |row| row.get::<_, i64>(0))
        .context("Failed to count rows")? as u64;
    log::info!("Total records: {}", summary.total_rows);

    let mut stmt = conn
        .prepare(sql::sample_rows())
        .context("Failed to prepare sample query")?;
    let sample = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<i32>>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, Option<f64>>(4)?,
            ))
        })
        .context("Failed to run sample query")?;
    log::info!("Sample records:");
    for row in sample {
        let (year, country, record, carbon, value) = row?;
        log::info!("  {year:?} {country:?} {record:?} carbon={carbon:?} value={value:?}");
    }

    let mut stmt = conn
        .prepare(sql::yearly_carbon())
        .context("Failed to prepare yearly carbon query")?;
    summary.yearly_carbon = stmt
        .query_map(params![summary.country], |row| {
            Ok((row.get::<_, i32>(0)?, row.get::<_, Option<f64>>(1)?))
        })
        .context("Failed to run yearly carbon query")?
        .collect::<Result<Vec<_>, _>>()?;
    log::info!("{} carbon footprint evolution:", summary.country);
    for (year, avg) in &summary.yearly_carbon {
        match avg {
            Some(avg) => log::info!("  {year}: {avg:.4}"),
            None => log::info!("  {year}: n/a"),
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_camel_case_fields() {
        let row: FootprintRow = serde_json::from_str(
            r#"{"year":2010,"countryCode":21,"countryName":"Brazil","shortName":"Brazil",
                "isoa2":"BR","record":"EFConsPerCap","cropLand":0.5,"grazingLand":0.7,
                "forestLand":0.3,"fishingGround":0.1,"builtupLand":0.05,"carbon":0.9,
                "value":2.8,"score":"3A"}"#,
        )
        .unwrap();
        assert_eq!(row.country_code, Some(21));
        assert_eq!(row.builtup_land, Some(0.05));
        assert_eq!(row.score.as_deref(), Some("3A"));
    }

    #[test]
    fn missing_and_null_fields_are_none() {
        let row: FootprintRow =
            serde_json::from_str(r#"{"year":2010,"carbon":null,"extra":"ignored"}"#).unwrap();
        assert_eq!(row.year, Some(2010));
        assert_eq!(row.carbon, None);
        assert_eq!(row.country_name, None);
    }

    #[test]
    fn verify_reports_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        let mut summary = IngestSummary {
            country: DEFAULT_COUNTRY.to_string(),
            ..Default::default()
        };
        assert!(verify(&conn, &mut summary).is_err());
        assert_eq!(summary.total_rows, 0);
        assert!(summary.yearly_carbon.is_empty());
    }

    #[test]
    fn json_files_sorted_and_filtered() {
        let dir = tempfile::TempDir::new().unwrap();
        for name in ["data_all_2002.json", "data_all_2001.json", "notes.txt", "x.json.tmp"] {
            std::fs::write(dir.path().join(name), "[]").unwrap();
        }
        let files = collect_json_files(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["data_all_2001.json", "data_all_2002.json"]);
    }
}
