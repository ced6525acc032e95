//! # Dashboard State
//!
//! The single owned aggregate of shared mutable state: current daily
//! statistics, the NG trend series and the recent-record cache. Mutation is
//! serialized through the ingestion pipeline (single-writer discipline);
//! viewer-facing paths only ever take snapshots, so a reader can never
//! observe a half-applied update.

use tokio::sync::RwLock;

use crate::core::cache::RecentCache;
use crate::model::{DailyStatistics, InitialData, NgTrendPoint};

/// Shared state consumed by the broadcast and viewer-facing components.
#[derive(Default)]
pub struct DashboardState {
    stats: RwLock<DailyStatistics>,
    trend: RwLock<Vec<NgTrendPoint>>,
    /// Bounded window of recent records plus the latest one.
    pub cache: RecentCache,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current daily statistics.
    pub async fn stats(&self) -> DailyStatistics {
        self.stats.read().await.clone()
    }

    /// Replaces the daily statistics wholesale.
    pub async fn set_stats(&self, stats: DailyStatistics) {
        *self.stats.write().await = stats;
    }

    /// Snapshot of the current NG trend series.
    pub async fn trend(&self) -> Vec<NgTrendPoint> {
        self.trend.read().await.clone()
    }

    /// Replaces the entire trend series atomically.
    pub async fn set_trend(&self, series: Vec<NgTrendPoint>) {
        *self.trend.write().await = series;
    }

    /// Builds the full-state snapshot a newly connected viewer receives.
    /// All fields are zero/empty before the first ingestion.
    pub async fn initial_snapshot(&self) -> InitialData {
        let stats = self.stats().await;
        InitialData {
            total_parts: stats.total_ok + stats.total_ng,
            total_ok: stats.total_ok,
            total_ng: stats.total_ng,
            current_output: stats.current_output,
            avg_cycle_time: stats.avg_cycle_time,
            ng_trend_data: self.trend().await,
            latest_cycle_data: self.cache.latest().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initial_snapshot_is_all_zero_before_any_ingestion() {
        let state = DashboardState::new();
        let snapshot = state.initial_snapshot().await;
        assert_eq!(snapshot.total_ok, 0);
        assert_eq!(snapshot.total_ng, 0);
        assert_eq!(snapshot.total_parts, 0);
        assert_eq!(snapshot.current_output, 0);
        assert_eq!(snapshot.avg_cycle_time, "0.00");
        assert!(snapshot.ng_trend_data.is_empty());
        assert!(snapshot.latest_cycle_data.is_none());
    }
}
