//! Logging: `env_logger` filtering, rendered above unit spinners in a TTY

use std::io::Write;

use indicatif::MultiProgress;

/// HTTP stack crates that are chatty at `debug`; kept at `warn` unless
/// `RUST_LOG` says otherwise.
const QUIET_DEPS: &[&str] = &["hyper", "hyper_util", "reqwest", "native_tls", "wiremock"];

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(quiet: bool, debug: bool) -> String {
    let level = match (debug, quiet) {
        (true, _) => "debug",
        (false, true) => "warn",
        (false, false) => "info",
    };
    QUIET_DEPS
        .iter()
        .fold(level.to_string(), |acc, dep| format!("{acc},{dep}=warn"))
}

/// One log line: `[LEVEL] message`, the level colored when `color` is set.
fn render(record: &log::Record, color: bool) -> String {
    let label = match record.level() {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return format!("[{label}] {}", record.args());
    }
    let ansi = match record.level() {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    format!("[{ansi}{label}\x1b[0m] {}", record.args())
}

/// Logger for TTY runs: filters through `env_logger` and prints via
/// `MultiProgress::suspend` so year spinners are redrawn below each line.
pub struct SpinnerAwareLogger {
    filter: env_logger::Logger,
    lines: MultiProgress,
}

impl SpinnerAwareLogger {
    pub fn new(filter: env_logger::Logger, lines: MultiProgress) -> Self {
        Self { filter, lines }
    }
}

impl log::Log for SpinnerAwareLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.filter.matches(record) {
            return;
        }
        let line = render(record, true);
        self.lines.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {}
}

/// Install the global logger. Pass `multi` in TTY mode to keep log lines
/// from tearing progress output.
pub fn init_logging(
    quiet: bool,
    debug: bool,
    multi: Option<&MultiProgress>,
) -> Result<(), log::SetLoggerError> {
    let env = env_logger::Env::default().default_filter_or(default_filter(quiet, debug));
    let mut builder = env_logger::Builder::from_env(env);

    match multi {
        Some(multi) => {
            let filter = builder.build();
            let max_level = filter.filter();
            log::set_boxed_logger(Box::new(SpinnerAwareLogger::new(filter, multi.clone())))?;
            log::set_max_level(max_level);
            Ok(())
        }
        None => builder
            .format(|buf, record| writeln!(buf, "{}", render(record, false)))
            .try_init(),
    }
}
