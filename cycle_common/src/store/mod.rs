//! # Persistence Gateway
//!
//! The durable store is a black box behind the [`CycleStore`] trait: an
//! append-only log of cycle events plus the handful of aggregate reads the
//! dashboard needs. Production uses [`postgres::PgCycleStore`]; tests and
//! local development use [`memory::MemoryCycleStore`] with identical query
//! semantics.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{CycleEvent, Period, RecentRecord};

/// Serving cap for recent-record queries. The cache mirrors this bound.
pub const RECENT_LIMIT: usize = 1000;

/// Failures from the persistence gateway. Callers log these and retain the
/// prior cached state rather than crash.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to reach database: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Result of the current-day aggregate query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySummary {
    pub ok_count: i64,
    pub ng_count: i64,
    /// `None` when no record exists for the current day.
    pub avg_cycle_time: Option<f64>,
}

/// Query interface to the external relational store.
///
/// All "today" queries are scoped to records whose recording timestamp falls
/// on the current calendar day.
#[async_trait]
pub trait CycleStore: Send + Sync {
    /// Appends one event, returning the store-assigned identity.
    async fn append(&self, event: &CycleEvent) -> Result<i64, StoreError>;

    /// OK count, NG count and average cycle duration for the current day.
    async fn daily_summary(&self) -> Result<DailySummary, StoreError>;

    /// Controller counter of the most recent record today, ordered by
    /// timestamp descending then identity descending. The identity
    /// tie-break keeps the result deterministic when several records share
    /// a timestamp.
    async fn latest_count_today(&self) -> Result<Option<i64>, StoreError>;

    /// End-time labels of today's NG records, ordered ascending by
    /// time-of-day.
    async fn ng_end_times_today(&self) -> Result<Vec<String>, StoreError>;

    /// The most recent records, newest first, capped at [`RECENT_LIMIT`],
    /// optionally restricted to a period.
    async fn recent_records(&self, period: Period) -> Result<Vec<RecentRecord>, StoreError>;
}
