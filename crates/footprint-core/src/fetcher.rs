//! Unit fetcher: the per-year retry state machine.
//!
//! ```text
//! Init → Checking ─┬─ exists ──→ Skipped
//!                  └─ missing ─→ Attempting ─┬─ Success ───→ Saved (+ pacing)
//!                                ▲           ├─ Permanent ─→ Done(reason)
//!                                │           └─ Transient ─┬─ budget left ─→ BackoffSleep
//!                                └────────────────────────── │
//!                                                           └─ exhausted ──→ Done
//! ```
//!
//! The gate permit covers exactly one request; it is dropped before any
//! sleep so a unit in backoff never holds a slot.

use std::io;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::backoff::BackoffPolicy;
use crate::classify::{Classification, classify};
use crate::config::FetchConfig;
use crate::events::{FetchEvent, FetchEvents};
use crate::gate::Gate;
use crate::shutdown::Shutdown;
use crate::store::ArtifactStore;
use crate::task::UnitTask;
use crate::transport::Transport;

/// Terminal result of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Artifact was already present
    Skipped,
    /// Fetched and persisted
    Success { records: usize },
    /// Non-retryable failure, reason captured verbatim
    PermanentFailure(String),
    /// Transient failures used up the attempt budget
    ExhaustedRetries { last_error: String },
    /// Shutdown requested before the unit finished
    Cancelled,
}

impl Outcome {
    /// Counts toward the succeeded side of the run summary
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Skipped | Self::Success { .. })
    }

    /// Human-readable failure reason, `None` for ok outcomes
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::Skipped | Self::Success { .. } => None,
            Self::PermanentFailure(reason) => Some(reason.clone()),
            Self::ExhaustedRetries { last_error } => {
                Some(format!("max retries exceeded (last error: {last_error})"))
            }
            Self::Cancelled => Some("cancelled".to_string()),
        }
    }
}

/// Outcome of one unit plus how many requests it issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub year: u16,
    pub outcome: Outcome,
    pub attempts: u32,
}

/// Per-unit mutable retry state; owned by a single fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// 1-based attempt about to run (or just run)
    pub attempt: u32,
    /// Delay to sleep after the next transient failure
    pub delay: Duration,
}

impl RetryState {
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            attempt: 1,
            delay: initial_delay,
        }
    }

    /// Move to the next attempt and grow the delay
    pub fn advance<R: Rng + ?Sized>(&mut self, policy: &BackoffPolicy, rng: &mut R) {
        self.attempt += 1;
        self.delay = policy.next(self.delay, rng);
    }
}

/// Everything a unit fetcher needs, shared read-only across units.
pub struct FetchContext {
    pub config: FetchConfig,
    pub policy: BackoffPolicy,
    pub gate: Gate,
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn ArtifactStore>,
    pub events: Arc<dyn FetchEvents>,
    pub shutdown: Shutdown,
}

impl FetchContext {
    pub fn new(
        config: FetchConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ArtifactStore>,
        events: Arc<dyn FetchEvents>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            policy: BackoffPolicy::new(config.max_delay, config.jitter.clone()),
            gate: Gate::new(config.max_concurrent),
            config,
            transport,
            store,
            events,
            shutdown,
        }
    }
}

impl std::fmt::Debug for FetchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchContext")
            .field("policy", &self.policy)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

/// Run one unit to a terminal outcome. Never fails: every error is encoded
/// in the returned [`Outcome`].
pub async fn fetch_unit<R>(ctx: &FetchContext, task: &UnitTask, rng: &mut R) -> UnitReport
where
    R: Rng + Send + ?Sized,
{
    let year = task.year;
    let report = |outcome, attempts| UnitReport {
        year,
        outcome,
        attempts,
    };

    // a single metadata lookup; cheap enough to run inline
    if ctx.store.exists(&task.artifact) {
        ctx.events.emit(year, FetchEvent::Skipped);
        return report(Outcome::Skipped, 0);
    }

    let max = ctx.config.max_retries;
    let mut state = RetryState::new(ctx.config.initial_delay);

    loop {
        let attempts_so_far = state.attempt - 1;
        if ctx.shutdown.is_requested() {
            ctx.events.emit(year, FetchEvent::Cancelled);
            return report(Outcome::Cancelled, attempts_so_far);
        }

        let result = {
            let permit = tokio::select! {
                biased;
                _ = ctx.shutdown.requested() => None,
                permit = ctx.gate.acquire() => permit.ok(),
            };
            let Some(_permit) = permit else {
                ctx.events.emit(year, FetchEvent::Cancelled);
                return report(Outcome::Cancelled, attempts_so_far);
            };
            ctx.events.emit(
                year,
                FetchEvent::AttemptStarted {
                    attempt: state.attempt,
                    max,
                },
            );
            ctx.transport.fetch(task).await
        };

        match classify(result) {
            Classification::Success(records) => {
                let outcome = persist(ctx, task, records, state.attempt).await;
                if outcome.is_ok() {
                    let pause = draw_pause(&ctx.config.pacing, rng);
                    sleep_unless_shutdown(&ctx.shutdown, pause).await;
                }
                return report(outcome, state.attempt);
            }
            Classification::Permanent(reason) => {
                ctx.events.emit(
                    year,
                    FetchEvent::PermanentFailure {
                        attempt: state.attempt,
                        reason: reason.clone(),
                    },
                );
                return report(Outcome::PermanentFailure(reason), state.attempt);
            }
            Classification::Transient(reason) => {
                if state.attempt >= max {
                    ctx.events.emit(
                        year,
                        FetchEvent::RetriesExhausted {
                            attempts: state.attempt,
                            last_error: reason.clone(),
                        },
                    );
                    return report(
                        Outcome::ExhaustedRetries { last_error: reason },
                        state.attempt,
                    );
                }
                ctx.events.emit(
                    year,
                    FetchEvent::BackoffScheduled {
                        attempt: state.attempt,
                        max,
                        reason,
                        delay: state.delay,
                    },
                );
                if !sleep_unless_shutdown(&ctx.shutdown, state.delay).await {
                    ctx.events.emit(year, FetchEvent::Cancelled);
                    return report(Outcome::Cancelled, state.attempt);
                }
                state.advance(&ctx.policy, rng);
            }
        }
    }
}

/// Write the payload; a local write failure is permanent for this run.
///
/// The write (and its fsync) runs on the blocking pool so it cannot stall
/// sibling units' timers or requests.
async fn persist(
    ctx: &FetchContext,
    task: &UnitTask,
    records: Vec<crate::store::Record>,
    attempt: u32,
) -> Outcome {
    let count = records.len();
    let store = ctx.store.clone();
    let name = task.artifact.clone();
    let written = tokio::task::spawn_blocking(move || store.write(&name, &records))
        .await
        .unwrap_or_else(|e| Err(io::Error::new(io::ErrorKind::Other, e)));

    match written {
        Ok(path) => {
            ctx.events.emit(
                task.year,
                FetchEvent::Saved {
                    path,
                    records: count,
                },
            );
            Outcome::Success { records: count }
        }
        Err(e) => {
            let reason = format!("write {}: {e}", task.artifact);
            ctx.events.emit(
                task.year,
                FetchEvent::PermanentFailure {
                    attempt,
                    reason: reason.clone(),
                },
            );
            Outcome::PermanentFailure(reason)
        }
    }
}

fn draw_pause<R: Rng + ?Sized>(range: &Range<Duration>, rng: &mut R) -> Duration {
    if range.is_empty() {
        range.start
    } else {
        rng.gen_range(range.clone())
    }
}

/// Sleep for `delay`; returns `false` if shutdown cut the sleep short.
async fn sleep_unless_shutdown(shutdown: &Shutdown, delay: Duration) -> bool {
    if delay.is_zero() {
        return !shutdown.is_requested();
    }
    tokio::select! {
        _ = shutdown.requested() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
