//! # NG Trend Builder
//!
//! Rebuilds the cumulative NG-count series for the current day whenever a
//! new NG event lands. The whole series is recomputed and replaced, never
//! appended to: O(daily NG count) per NG event buys correctness after any
//! gap, restart or out-of-order delivery, and NG volume is small relative to
//! OK volume in this domain.
//!
//! The ordering key is the event's bare end-time-of-day label, which is
//! ambiguous across a midnight rollover. That is an accepted limitation of
//! the "current day only" scope, not something this module tries to repair.

use std::sync::Arc;

use crate::core::state::DashboardState;
use crate::model::NgTrendPoint;
use crate::store::{CycleStore, StoreError};

pub struct TrendBuilder {
    store: Arc<dyn CycleStore>,
    state: Arc<DashboardState>,
}

impl TrendBuilder {
    pub fn new(store: Arc<dyn CycleStore>, state: Arc<DashboardState>) -> Self {
        Self { store, state }
    }

    /// Queries today's NG end-times (ascending) and replaces the series
    /// with the cumulative walk. Prior series retained on query error.
    pub async fn recompute(&self) -> Result<(), StoreError> {
        let end_times = match self.store.ng_end_times_today().await {
            Ok(t) => t,
            Err(e) => {
                log::error!("NG trend query failed, keeping prior series: {}", e);
                return Err(e);
            }
        };

        let series: Vec<NgTrendPoint> = end_times
            .into_iter()
            .enumerate()
            .map(|(i, time)| NgTrendPoint {
                time,
                value: (i + 1) as i64,
            })
            .collect();

        log::debug!("NG trend recomputed: {} points", series.len());
        self.state.set_trend(series).await;
        Ok(())
    }
}
