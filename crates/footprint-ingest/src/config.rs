use std::path::PathBuf;

pub const DEFAULT_COUNTRY: &str = "Brazil";

/// Configuration for loading fetched artifacts into DuckDB.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Directory containing `data_all_<year>.json` artifacts
    pub raw_dir: PathBuf,
    /// DuckDB database file (created if missing)
    pub database_path: PathBuf,
    /// Country whose per-year carbon average is reported after loading
    pub country: String,
}

impl IngestConfig {
    pub fn new(raw_dir: impl Into<PathBuf>, database_path: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            database_path: database_path.into(),
            country: DEFAULT_COUNTRY.to_string(),
        }
    }
}
