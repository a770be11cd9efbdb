//! Footprint Core - Concurrent, rate-limit-aware fetch engine
//!
//! Pulls one JSON dataset per year from the footprint API with a bounded
//! number of requests in flight, retries transient failures with jittered
//! exponential backoff, and skips years whose artifact already exists.

pub mod backoff;
pub mod classify;
pub mod config;
pub mod error;
pub mod events;
pub mod fetcher;
pub mod gate;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod shutdown;
pub mod store;
pub mod summary;
pub mod task;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use backoff::{BackoffPolicy, DEFAULT_JITTER, MAX_DELAY};
pub use classify::{Classification, StatusClass, classify, classify_status};
pub use config::FetchConfig;
pub use error::{AttemptError, ConfigError};
pub use events::{FetchEvent, FetchEvents, LogEvents};
pub use fetcher::{FetchContext, Outcome, RetryState, UnitReport, fetch_unit};
pub use gate::{Gate, GateClosed, GatePermit};
pub use logging::{SpinnerAwareLogger, init_logging};
pub use pipeline::Pipeline;
pub use progress::{ProgressContext, SharedProgress};
pub use shutdown::Shutdown;
pub use store::{ArtifactStore, JsonDirStore, Record, cleanup_tmp_files};
pub use summary::RunSummary;
pub use task::{UnitTask, artifact_name};
pub use transport::{HttpTransport, Transport};
