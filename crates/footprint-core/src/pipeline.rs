//! Run orchestrator: one task per year, all sharing a single gate.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinSet;

use crate::config::FetchConfig;
use crate::error::ConfigError;
use crate::events::FetchEvents;
use crate::fetcher::{FetchContext, Outcome, UnitReport, fetch_unit};
use crate::gate::Gate;
use crate::shutdown::Shutdown;
use crate::store::ArtifactStore;
use crate::summary::RunSummary;
use crate::task::UnitTask;
use crate::transport::Transport;

/// Owns the shared fetch context and drives a full run.
#[derive(Debug)]
pub struct Pipeline {
    ctx: Arc<FetchContext>,
}

impl Pipeline {
    /// Validate `config` and wire up the collaborators. Fails before any
    /// unit is scheduled.
    pub fn new(
        config: FetchConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ArtifactStore>,
        events: Arc<dyn FetchEvents>,
        shutdown: Shutdown,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ctx = FetchContext::new(config, transport, store, events, shutdown);
        Ok(Self { ctx: Arc::new(ctx) })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.ctx.config
    }

    pub fn gate(&self) -> &Gate {
        &self.ctx.gate
    }

    /// Fetch every configured year and aggregate the outcomes.
    ///
    /// All units launch at once; the gate bounds how many requests are in
    /// flight. One unit's failure or panic never affects its siblings.
    pub async fn run(&self) -> RunSummary {
        let start = Instant::now();
        let tasks = UnitTask::worklist(&self.ctx.config);
        log::info!(
            "Fetching {} years with up to {} concurrent requests",
            tasks.len(),
            self.ctx.gate.capacity()
        );

        let mut set = JoinSet::new();
        for task in tasks.iter().cloned() {
            let ctx = self.ctx.clone();
            let mut rng = unit_rng(ctx.config.seed, task.year);
            set.spawn(async move {
                let year = task.year;
                AssertUnwindSafe(async { fetch_unit(&ctx, &task, &mut rng).await })
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        log::error!("Year {year}: unit task panicked");
                        UnitReport {
                            year,
                            outcome: Outcome::PermanentFailure("unit task panicked".into()),
                            attempts: 0,
                        }
                    })
            });
        }

        let mut reports = BTreeMap::new();
        let mut gate_closed = false;
        loop {
            tokio::select! {
                joined = set.join_next() => match joined {
                    Some(Ok(report)) => {
                        reports.insert(report.year, report);
                    }
                    Some(Err(e)) => log::error!("Unit task failed to join: {e}"),
                    None => break,
                },
                _ = self.ctx.shutdown.requested(), if !gate_closed => {
                    self.ctx.gate.close();
                    gate_closed = true;
                }
            }
        }

        // A unit that never reported still counts toward the total.
        for task in &tasks {
            reports.entry(task.year).or_insert_with(|| UnitReport {
                year: task.year,
                outcome: Outcome::PermanentFailure("unit task aborted".into()),
                attempts: 0,
            });
        }

        let mut summary = RunSummary::from_reports(&reports);
        summary.interrupted = self.ctx.shutdown.is_requested();
        summary.elapsed = start.elapsed();
        summary
    }
}

/// Per-unit RNG: deterministic under a seed, entropy-backed otherwise
fn unit_rng(seed: Option<u64>, year: u16) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ u64::from(year)),
        None => StdRng::from_entropy(),
    }
}
