//! # Test Fixtures
//!
//! Shared helpers for the integration tests: payload builders that stamp
//! today's date (the statistics are day-scoped, so fixed dates would make
//! the assertions time-dependent), a fully wired pipeline over the
//! in-memory store, and a store wrapper whose failures can be switched on
//! to exercise the degradation path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cycle_common::model::{CycleEvent, Period, RecentRecord};
use cycle_common::store::memory::MemoryCycleStore;
use cycle_common::store::DailySummary;
use cycle_common::{CycleStore, DashboardState, Dispatcher, IngestPipeline, StoreError};

/// Pipeline over an in-memory store, with handles to every piece the tests
/// want to inspect afterwards.
pub struct Harness {
    pub pipeline: IngestPipeline,
    pub store: Arc<dyn CycleStore>,
    pub state: Arc<DashboardState>,
    pub dispatcher: Arc<Dispatcher>,
}

pub fn harness() -> Harness {
    harness_with(Arc::new(MemoryCycleStore::new()))
}

/// Harness over a caller-supplied store.
pub fn harness_with(store: Arc<dyn CycleStore>) -> Harness {
    let state = Arc::new(DashboardState::new());
    let dispatcher = Arc::new(Dispatcher::new());
    let pipeline = IngestPipeline::new(store.clone(), state.clone(), dispatcher.clone());
    Harness {
        pipeline,
        store,
        state,
        dispatcher,
    }
}

/// In-memory store whose writes and reads can be made to fail on demand,
/// simulating a database outage mid-stream.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryCycleStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_writes_failing(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn set_reads_failing(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store offline".to_string()));
        }
        Ok(())
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Connection("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CycleStore for FlakyStore {
    async fn append(&self, event: &CycleEvent) -> Result<i64, StoreError> {
        self.check_writes()?;
        self.inner.append(event).await
    }

    async fn daily_summary(&self) -> Result<DailySummary, StoreError> {
        self.check_reads()?;
        self.inner.daily_summary().await
    }

    async fn latest_count_today(&self) -> Result<Option<i64>, StoreError> {
        self.check_reads()?;
        self.inner.latest_count_today().await
    }

    async fn ng_end_times_today(&self) -> Result<Vec<String>, StoreError> {
        self.check_reads()?;
        self.inner.ng_end_times_today().await
    }

    async fn recent_records(&self, period: Period) -> Result<Vec<RecentRecord>, StoreError> {
        self.check_reads()?;
        self.inner.recent_records(period).await
    }
}

/// Today's date in `YYYY-MM-DD` form.
pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Strict-JSON payload for a cycle ending today at `end` (`HH:MM:SS`).
pub fn payload(start: &str, end: &str, cycle_time: f64, count: i64, status: &str) -> Vec<u8> {
    format!(
        r#"{{"startTime":"{start}","endTime":"{end}","cycleTime":{cycle_time},"count":{count},"status":"{status}","timestamp":"{}T{end}"}}"#,
        today()
    )
    .into_bytes()
}

/// The legacy bare-key form of the same payload.
pub fn bare_payload(start: &str, end: &str, cycle_time: f64, count: i64, status: &str) -> Vec<u8> {
    format!(
        "{{startTime:{start},endTime:{end},cycleTime:{cycle_time},count:{count},status:{status},timestamp:{}T{end}}}",
        today()
    )
    .into_bytes()
}
