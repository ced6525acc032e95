//! # Statistics Aggregator
//!
//! Recomputes the daily statistics wholesale from the store after every
//! successful ingestion. Full recompute over incremental patching: it keeps
//! the served values consistent with the authoritative store across
//! restarts, manual data edits and missed updates.

use std::sync::Arc;

use crate::core::state::DashboardState;
use crate::model::DailyStatistics;
use crate::store::{CycleStore, StoreError};

pub struct StatsAggregator {
    store: Arc<dyn CycleStore>,
    state: Arc<DashboardState>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn CycleStore>, state: Arc<DashboardState>) -> Self {
        Self { store, state }
    }

    /// Runs the two current-day queries and replaces the shared statistics.
    ///
    /// On a query error the prior values are left untouched — stale but
    /// available beats crashing — and the error is returned so the caller
    /// can skip dependent steps for this ingestion.
    pub async fn recompute(&self) -> Result<(), StoreError> {
        let summary = match self.store.daily_summary().await {
            Ok(s) => s,
            Err(e) => {
                log::error!("Daily statistics query failed, keeping prior values: {}", e);
                return Err(e);
            }
        };
        let current_output = match self.store.latest_count_today().await {
            Ok(v) => v.unwrap_or(0),
            Err(e) => {
                log::error!("Latest-output query failed, keeping prior values: {}", e);
                return Err(e);
            }
        };

        self.state
            .set_stats(DailyStatistics {
                total_ok: summary.ok_count,
                total_ng: summary.ng_count,
                avg_cycle_time: format!("{:.2}", summary.avg_cycle_time.unwrap_or(0.0)),
                current_output,
            })
            .await;
        Ok(())
    }
}
