//! # Ingestion Pipeline
//!
//! Drives one inbound payload through the full chain:
//! decode → store append → statistics recompute → trend recompute (NG only)
//! → cache insert → broadcast delta.
//!
//! The ordering is a contract: no event's broadcast is sent before its own
//! write is durable. Ingestion is serialized upstream (the subscribe channel
//! delivers one message at a time), so the pipeline is the single writer of
//! the shared dashboard state.
//!
//! No failure here is fatal. Malformed input is discarded with a log line; a
//! store failure skips the remaining steps for that event and the dashboard
//! keeps serving its last known good state.

use std::sync::Arc;

use crate::core::dispatcher::Dispatcher;
use crate::core::state::DashboardState;
use crate::core::stats::StatsAggregator;
use crate::core::trend::TrendBuilder;
use crate::decoder;
use crate::model::{Outcome, RealTimeUpdate, RecentRecord, ServerMessage};
use crate::store::CycleStore;

pub struct IngestPipeline {
    store: Arc<dyn CycleStore>,
    state: Arc<DashboardState>,
    dispatcher: Arc<Dispatcher>,
    stats: StatsAggregator,
    trend: TrendBuilder,
}

impl IngestPipeline {
    pub fn new(
        store: Arc<dyn CycleStore>,
        state: Arc<DashboardState>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        let stats = StatsAggregator::new(store.clone(), state.clone());
        let trend = TrendBuilder::new(store.clone(), state.clone());
        Self {
            store,
            state,
            dispatcher,
            stats,
            trend,
        }
    }

    pub fn state(&self) -> &Arc<DashboardState> {
        &self.state
    }

    /// Primes statistics, trend and the recent-record cache from the store.
    /// Called once at startup, before the first event arrives; recompute is
    /// idempotent so a partial failure here only delays freshness.
    pub async fn warm_up(&self) {
        let _ = self.stats.recompute().await;
        let _ = self.trend.recompute().await;
        if let Err(e) = self.state.cache.load_recent(self.store.as_ref()).await {
            log::error!("Initial cache load failed: {}", e);
        }
        log::info!("Pipeline warmed up and waiting for cycle events");
    }

    /// Processes one raw subscribe-channel payload end to end.
    pub async fn ingest(&self, raw: &[u8]) {
        let event = match decoder::decode(raw) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("Discarding malformed cycle event: {}", e);
                return;
            }
        };

        // The write must be durable before anything downstream runs.
        let id = match self.store.append(&event).await {
            Ok(id) => id,
            Err(e) => {
                log::error!(
                    "Store append failed for cycle #{}, skipping downstream steps: {}",
                    event.count,
                    e
                );
                return;
            }
        };

        if self.stats.recompute().await.is_err() {
            // Logged by the aggregator; the event is persisted, so the next
            // successful recompute will pick it up.
            return;
        }

        let is_ng = event.outcome == Outcome::NG;
        // A failed trend refresh keeps the prior series; the delta then
        // simply omits the trend so viewers keep what they have.
        let trend_fresh = is_ng && self.trend.recompute().await.is_ok();

        let record = RecentRecord::from_event(id, &event);
        self.state.cache.insert_new(record.clone()).await;

        let stats = self.state.stats().await;
        let update = RealTimeUpdate {
            total_parts: stats.total_ok + stats.total_ng,
            total_ok: stats.total_ok,
            total_ng: stats.total_ng,
            current_output: stats.current_output,
            avg_cycle_time: stats.avg_cycle_time,
            latest_cycle_data: Some(record),
            ng_trend_data: if trend_fresh {
                Some(self.state.trend().await)
            } else {
                None
            },
        };

        let delivered = self
            .dispatcher
            .broadcast(&ServerMessage::RealTimeUpdate(update));
        log::info!(
            "Cycle #{} ({}) processed; update pushed to {} viewers",
            event.count,
            event.outcome.as_str(),
            delivered
        );
    }
}
