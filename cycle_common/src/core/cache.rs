//! # Recent-Record Cache
//!
//! Bounded, newest-first window over the most recent cycle records, plus the
//! single latest record. It exists so viewer requests are served from memory
//! instead of round-tripping to the store on every request.
//!
//! The window is an approximation, not a replica: `insert_new` prepends
//! without consulting the store, and any drift self-corrects at the next
//! `load_recent` (startup or full refresh).

use std::collections::VecDeque;

use tokio::sync::RwLock;

use crate::model::{Period, RecentRecord};
use crate::store::{CycleStore, StoreError, RECENT_LIMIT};

/// Bounded cache of recent records (cap [`RECENT_LIMIT`], newest first).
#[derive(Default)]
pub struct RecentCache {
    records: RwLock<VecDeque<RecentRecord>>,
    latest: RwLock<Option<RecentRecord>>,
}

impl RecentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole window from the store (one capped query, newest
    /// first). Used at startup and for full refreshes.
    pub async fn load_recent(&self, store: &dyn CycleStore) -> Result<(), StoreError> {
        let rows = store.recent_records(Period::All).await?;
        let mut records = self.records.write().await;
        *records = rows.into();
        log::info!("Recent-record cache loaded: {} records", records.len());
        Ok(())
    }

    /// Prepends a newly ingested record and evicts the oldest beyond the
    /// cap. Also tracks it as the latest record.
    pub async fn insert_new(&self, record: RecentRecord) {
        *self.latest.write().await = Some(record.clone());
        let mut records = self.records.write().await;
        records.push_front(record);
        records.truncate(RECENT_LIMIT);
    }

    /// Copy of the current window, newest first.
    pub async fn snapshot(&self) -> Vec<RecentRecord> {
        self.records.read().await.iter().cloned().collect()
    }

    /// The most recently ingested record, if any since startup.
    pub async fn latest(&self) -> Option<RecentRecord> {
        self.latest.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Outcome;

    fn record(no: i64) -> RecentRecord {
        RecentRecord {
            id: no,
            no,
            start_time: "08:00:00".to_string(),
            end_time: "08:00:10".to_string(),
            cycle_time: "10.00".to_string(),
            status: Outcome::OK,
            created_at: "2024-01-01 08:00:10".to_string(),
        }
    }

    #[tokio::test]
    async fn newest_record_goes_first() {
        let cache = RecentCache::new();
        cache.insert_new(record(1)).await;
        cache.insert_new(record(2)).await;

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot[0].no, 2);
        assert_eq!(snapshot[1].no, 1);
        assert_eq!(cache.latest().await.unwrap().no, 2);
    }

    #[tokio::test]
    async fn capacity_is_bounded_and_oldest_is_evicted_first() {
        let cache = RecentCache::new();
        for no in 1..=(RECENT_LIMIT as i64 + 1) {
            cache.insert_new(record(no)).await;
        }

        assert_eq!(cache.len().await, RECENT_LIMIT);
        let snapshot = cache.snapshot().await;
        // Record 1 (the oldest) was evicted; record 2 is now the tail.
        assert_eq!(snapshot.last().unwrap().no, 2);
        assert_eq!(snapshot.first().unwrap().no, RECENT_LIMIT as i64 + 1);
    }
}
