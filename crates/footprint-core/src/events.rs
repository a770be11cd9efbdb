//! Structured progress events emitted by unit fetchers.
//!
//! The fetch engine reports every state transition to an injected
//! [`FetchEvents`] sink instead of logging directly. Sinks must tolerate
//! concurrent calls from many units.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use indicatif::ProgressBar;

use crate::progress::SharedProgress;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchEvent {
    /// Artifact already present; no request issued
    Skipped,
    /// Permit acquired, request about to go out
    AttemptStarted { attempt: u32, max: u32 },
    /// Transient failure; sleeping `delay` before the next attempt
    BackoffScheduled {
        attempt: u32,
        max: u32,
        reason: String,
        delay: Duration,
    },
    /// Payload persisted
    Saved { path: PathBuf, records: usize },
    /// Non-retryable failure
    PermanentFailure { attempt: u32, reason: String },
    /// Transient failures used up the attempt budget
    RetriesExhausted { attempts: u32, last_error: String },
    /// Shutdown requested before the unit finished
    Cancelled,
}

impl FetchEvent {
    /// Whether the unit is done after this event
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Skipped
                | Self::Saved { .. }
                | Self::PermanentFailure { .. }
                | Self::RetriesExhausted { .. }
                | Self::Cancelled
        )
    }
}

/// Receiver of per-unit events
pub trait FetchEvents: Send + Sync {
    fn emit(&self, year: u16, event: FetchEvent);
}

/// Production sink: forwards events to the `log` facade and, when a progress
/// context is attached, keeps one status line per unit.
#[derive(Default)]
pub struct LogEvents {
    progress: Option<SharedProgress>,
    lines: Mutex<HashMap<u16, ProgressBar>>,
}

impl LogEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(progress: SharedProgress) -> Self {
        Self {
            progress: Some(progress),
            lines: Mutex::default(),
        }
    }

    fn update_line(&self, year: u16, event: &FetchEvent) {
        let Some(progress) = &self.progress else {
            return;
        };
        let Ok(mut lines) = self.lines.lock() else {
            return;
        };
        let pb = lines
            .entry(year)
            .or_insert_with(|| progress.unit_line(year))
            .clone();
        pb.set_message(status_text(event));
        if event.is_terminal() {
            pb.finish_and_clear();
            lines.remove(&year);
        }
    }
}

impl std::fmt::Debug for LogEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEvents")
            .field("progress", &self.progress.is_some())
            .finish_non_exhaustive()
    }
}

impl FetchEvents for LogEvents {
    fn emit(&self, year: u16, event: FetchEvent) {
        match &event {
            FetchEvent::Skipped => log::info!("{year} already exists, skipping"),
            FetchEvent::AttemptStarted { attempt, max } => {
                log::debug!("Year {year}: attempt {attempt}/{max}");
            }
            FetchEvent::BackoffScheduled {
                attempt,
                max,
                reason,
                delay,
            } => log::warn!(
                "Year {year}: attempt {attempt}/{max} failed: {reason}, retrying in {:.1}s",
                delay.as_secs_f64()
            ),
            FetchEvent::Saved { path, records } => {
                log::info!("Fetched {year}: {records} records saved to {}", path.display());
            }
            FetchEvent::PermanentFailure { attempt, reason } => {
                log::error!("Year {year}: attempt {attempt} failed permanently: {reason}");
            }
            FetchEvent::RetriesExhausted {
                attempts,
                last_error,
            } => log::warn!(
                "Failed to fetch year {year} after {attempts} attempts: {last_error}"
            ),
            FetchEvent::Cancelled => log::info!("Year {year}: cancelled"),
        }
        self.update_line(year, &event);
    }
}

fn status_text(event: &FetchEvent) -> String {
    match event {
        FetchEvent::Skipped => "skipped".to_string(),
        FetchEvent::AttemptStarted { attempt, max } => format!("attempt {attempt}/{max}"),
        FetchEvent::BackoffScheduled { delay, .. } => {
            format!("backoff {:.1}s", delay.as_secs_f64())
        }
        FetchEvent::Saved { records, .. } => format!("saved {records} records"),
        FetchEvent::PermanentFailure { reason, .. } => format!("failed: {reason}"),
        FetchEvent::RetriesExhausted { .. } => "retries exhausted".to_string(),
        FetchEvent::Cancelled => "cancelled".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressContext;
    use std::sync::Arc;

    #[test]
    fn terminal_events() {
        assert!(FetchEvent::Skipped.is_terminal());
        assert!(FetchEvent::Cancelled.is_terminal());
        assert!(!FetchEvent::AttemptStarted { attempt: 1, max: 5 }.is_terminal());
        assert!(
            !FetchEvent::BackoffScheduled {
                attempt: 1,
                max: 5,
                reason: "HTTP 503".into(),
                delay: Duration::from_secs(1),
            }
            .is_terminal()
        );
    }

    #[test]
    fn status_text_backoff() {
        let text = status_text(&FetchEvent::BackoffScheduled {
            attempt: 2,
            max: 5,
            reason: "HTTP 429".into(),
            delay: Duration::from_millis(2_140),
        });
        assert_eq!(text, "backoff 2.1s");
    }

    #[test]
    fn lines_dropped_on_terminal_event() {
        let events = LogEvents::with_progress(Arc::new(ProgressContext::with_tty(true)));
        events.emit(2001, FetchEvent::AttemptStarted { attempt: 1, max: 5 });
        assert_eq!(events.lines.lock().unwrap().len(), 1);
        events.emit(2001, FetchEvent::Skipped);
        assert!(events.lines.lock().unwrap().is_empty());
    }

    #[test]
    fn log_only_sink_tracks_nothing() {
        let events = LogEvents::new();
        events.emit(2001, FetchEvent::AttemptStarted { attempt: 1, max: 5 });
        assert!(events.lines.lock().unwrap().is_empty());
    }
}
