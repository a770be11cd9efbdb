//! Fetch subcommand - download yearly datasets from the footprint API

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use footprint_core::{
    FetchConfig, HttpTransport, JsonDirStore, LogEvents, Pipeline, SharedProgress, Shutdown,
    cleanup_tmp_files,
};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// First year of the range to fetch
    #[arg(long)]
    pub first_year: Option<u16>,

    /// Last year of the range to fetch (inclusive)
    #[arg(long)]
    pub last_year: Option<u16>,

    /// Explicit years to fetch (comma-separated, overrides the range)
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["first_year", "last_year"])]
    pub years: Vec<u16>,

    /// Output directory for data_all_<year>.json artifacts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum requests in flight at once
    #[arg(short = 'j', long)]
    pub max_concurrent: Option<usize>,

    /// Attempts per year, including the first
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Seed for backoff jitter (reproducible delays)
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Merge config file values and CLI overrides into a run configuration.
pub fn build_config(args: &FetchArgs, config: &Config) -> Result<FetchConfig> {
    let file = &config.fetch;
    let mut fc = FetchConfig::new(
        config.api.base_url.clone().unwrap_or_default(),
        config.api.api_key.clone().unwrap_or_default(),
        args.output.clone().unwrap_or_else(|| file.output_dir.clone()),
    );
    fc.max_concurrent = args.max_concurrent.unwrap_or(file.max_concurrent);
    fc.max_retries = args.max_retries.unwrap_or(file.max_retries);
    fc.initial_delay = Duration::from_millis(file.initial_delay_ms);
    fc.request_timeout = Duration::from_secs(args.timeout.unwrap_or(file.timeout));
    fc.seed = args.seed.or(file.seed);

    fc.years = if args.years.is_empty() {
        let first = args.first_year.unwrap_or(file.first_year);
        let last = args.last_year.unwrap_or(file.last_year);
        anyhow::ensure!(
            first <= last,
            "first year {first} is after last year {last}"
        );
        (first..=last).collect()
    } else {
        args.years.clone()
    };

    fc.validate()?;
    Ok(fc)
}

pub fn run(args: FetchArgs, config: &Config, progress: &SharedProgress) -> Result<ExitCode> {
    let fetch_config = build_config(&args, config)?;

    log::info!("Fetching footprint data");
    log::info!("  API: {}", fetch_config.base_url);
    log::info!("  Output: {}", fetch_config.output_dir.display());
    log::info!(
        "  Years: {}..={} ({} total)",
        fetch_config.years.iter().min().copied().unwrap_or_default(),
        fetch_config.years.iter().max().copied().unwrap_or_default(),
        fetch_config.years.len()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(fetch(fetch_config, progress))
}

async fn fetch(fetch_config: FetchConfig, progress: &SharedProgress) -> Result<ExitCode> {
    let store = JsonDirStore::new(&fetch_config.output_dir).with_context(|| {
        format!(
            "Failed to create output dir: {}",
            fetch_config.output_dir.display()
        )
    })?;
    let removed = cleanup_tmp_files(store.dir()).context("Failed to clean stale tmp files")?;
    if removed > 0 {
        log::info!("Removed {removed} stale tmp files");
    }

    let transport = HttpTransport::new(&fetch_config).context("Failed to build HTTP client")?;
    let events = LogEvents::with_progress(progress.clone());
    let shutdown = Shutdown::new();
    let listener = shutdown.listen();

    let pipeline = Pipeline::new(
        fetch_config,
        Arc::new(transport),
        Arc::new(store),
        Arc::new(events),
        shutdown,
    )?;
    let summary = pipeline.run().await;
    listener.abort();

    if progress.is_tty() {
        eprintln!("{}", summary.format_table());
    } else {
        summary.log();
    }

    Ok(ExitCode::from(summary.exit_code()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: FetchArgs,
    }

    fn parse(argv: &[&str]) -> FetchArgs {
        TestCli::parse_from(std::iter::once("fetch").chain(argv.iter().copied())).args
    }

    fn config_with_api() -> Config {
        let mut config = Config::default();
        config.api.base_url = Some("https://api.example.org/v1/".into());
        config.api.api_key = Some("secret".into());
        config
    }

    #[test]
    fn defaults_from_config_file() {
        let fc = build_config(&parse(&[]), &config_with_api()).unwrap();
        assert_eq!(fc.base_url, "https://api.example.org/v1");
        assert_eq!(fc.years.len(), 25);
        assert_eq!(fc.max_concurrent, 2);
        assert_eq!(fc.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn cli_overrides_win() {
        let args = parse(&[
            "--first-year",
            "2010",
            "--last-year",
            "2012",
            "-j",
            "4",
            "--max-retries",
            "3",
            "--timeout",
            "5",
            "--seed",
            "9",
        ]);
        let fc = build_config(&args, &config_with_api()).unwrap();
        assert_eq!(fc.years, vec![2010, 2011, 2012]);
        assert_eq!(fc.max_concurrent, 4);
        assert_eq!(fc.max_retries, 3);
        assert_eq!(fc.request_timeout, Duration::from_secs(5));
        assert_eq!(fc.seed, Some(9));
    }

    #[test]
    fn explicit_year_list() {
        let fc = build_config(&parse(&["--years", "2019,2005"]), &config_with_api()).unwrap();
        assert_eq!(fc.years, vec![2019, 2005]);
    }

    #[test]
    fn inverted_range_rejected() {
        let args = parse(&["--first-year", "2020", "--last-year", "2010"]);
        assert!(build_config(&args, &config_with_api()).is_err());
    }

    #[test]
    fn missing_key_fails_fast() {
        let mut config = config_with_api();
        config.api.api_key = None;
        let err = build_config(&parse(&[]), &config).unwrap_err();
        assert_eq!(err.to_string(), "API_KEY not set");
    }
}
