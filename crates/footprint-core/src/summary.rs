//! Run-level aggregation of unit outcomes.

use std::collections::BTreeMap;
use std::time::Duration;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::fetcher::{Outcome, UnitReport};

/// Aggregate of every unit's outcome for one run.
///
/// `succeeded + failed == total` holds by construction: every scheduled unit
/// contributes exactly one report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    /// Fetched or skipped
    pub succeeded: usize,
    /// Subset of `succeeded` whose artifact already existed
    pub skipped: usize,
    pub failed: usize,
    /// Records persisted during this run
    pub records: usize,
    /// Requests issued across all units
    pub attempts: u64,
    /// `(year, reason)` ordered by year
    pub failures: Vec<(u16, String)>,
    /// Shutdown was requested before the run finished
    pub interrupted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Build from per-year reports (one per scheduled unit)
    pub fn from_reports(reports: &BTreeMap<u16, UnitReport>) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Default::default()
        };
        for (year, report) in reports {
            summary.record(*year, report);
        }
        summary
    }

    fn record(&mut self, year: u16, report: &UnitReport) {
        self.attempts += u64::from(report.attempts);
        match &report.outcome {
            Outcome::Skipped => {
                self.succeeded += 1;
                self.skipped += 1;
            }
            Outcome::Success { records } => {
                self.succeeded += 1;
                self.records += records;
            }
            other => {
                self.failed += 1;
                let reason = other.failure_reason().unwrap_or_default();
                self.failures.push((year, reason));
            }
        }
    }

    /// Units fetched over the network in this run
    pub fn fetched(&self) -> usize {
        self.succeeded - self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }

    /// Process exit status: 130 after an interrupt, 1 on any failure, else 0
    pub fn exit_code(&self) -> u8 {
        if self.interrupted {
            130
        } else if self.failed > 0 {
            1
        } else {
            0
        }
    }

    /// Format summary table as a string.
    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Fetch")
                    .fg(Color::Cyan)
                    .add_attribute(comfy_table::Attribute::Bold),
                Cell::new("Value").fg(Color::Cyan),
            ]);

        table.add_row(vec![Cell::new("Years"), Cell::new(self.total)]);
        table.add_row(vec![
            Cell::new("Fetched").fg(Color::Green),
            Cell::new(self.fetched()).fg(Color::Green),
        ]);
        table.add_row(vec![Cell::new("Skipped"), Cell::new(self.skipped)]);
        let failed_color = if self.failed > 0 {
            Color::Red
        } else {
            Color::Reset
        };
        table.add_row(vec![
            Cell::new("Failed").fg(failed_color),
            Cell::new(self.failed).fg(failed_color),
        ]);
        table.add_row(vec![Cell::new("Records"), Cell::new(self.records)]);
        table.add_row(vec![Cell::new("Requests"), Cell::new(self.attempts)]);
        table.add_row(vec![
            Cell::new("Elapsed"),
            Cell::new(format!("{:.1}s", self.elapsed.as_secs_f64())),
        ]);

        let mut out = format!("\n{table}");
        if !self.failures.is_empty() {
            let mut failures = Table::new();
            failures
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Year").fg(Color::Red),
                    Cell::new("Reason").fg(Color::Red),
                ]);
            for (year, reason) in &self.failures {
                failures.add_row(vec![Cell::new(year), Cell::new(reason)]);
            }
            out.push_str(&format!("\n{failures}"));
        }
        out
    }

    /// Log summary lines (non-TTY mode).
    pub fn log(&self) {
        log::info!(
            "Done: {} years, {} fetched, {} skipped, {} failed [{:.1}s]",
            self.total,
            self.fetched(),
            self.skipped,
            self.failed,
            self.elapsed.as_secs_f64()
        );
        for (year, reason) in &self.failures {
            log::error!("  {year}: {reason}");
        }
        if self.interrupted {
            log::warn!("Run interrupted; rerun to resume from existing artifacts");
        }
    }
}
