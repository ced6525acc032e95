//! # In-Memory Cycle Store
//!
//! [`CycleStore`] over a plain `Vec`, mirroring the PostgreSQL query
//! semantics. Used by the integration tests and for running the gateway
//! without a database.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveTime};

use crate::model::{CycleEvent, Outcome, Period, RecentRecord};
use crate::store::{CycleStore, DailySummary, StoreError, RECENT_LIMIT};

struct StoredEvent {
    id: i64,
    event: CycleEvent,
}

#[derive(Default)]
struct Inner {
    rows: Vec<StoredEvent>,
    next_id: i64,
}

/// Append-only in-memory store.
#[derive(Default)]
pub struct MemoryCycleStore {
    inner: Mutex<Inner>,
}

impl MemoryCycleStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock poisoned")
    }
}

#[async_trait]
impl CycleStore for MemoryCycleStore {
    async fn append(&self, event: &CycleEvent) -> Result<i64, StoreError> {
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(StoredEvent {
            id,
            event: event.clone(),
        });
        Ok(id)
    }

    async fn daily_summary(&self) -> Result<DailySummary, StoreError> {
        let today = Self::today();
        let inner = self.lock();
        let todays: Vec<&StoredEvent> = inner
            .rows
            .iter()
            .filter(|r| r.event.recorded_at.date() == today)
            .collect();

        let ok_count = todays.iter().filter(|r| r.event.outcome == Outcome::OK).count() as i64;
        let ng_count = todays.iter().filter(|r| r.event.outcome == Outcome::NG).count() as i64;
        let avg_cycle_time = if todays.is_empty() {
            None
        } else {
            let sum: f64 = todays.iter().map(|r| r.event.cycle_time).sum();
            Some(sum / todays.len() as f64)
        };

        Ok(DailySummary {
            ok_count,
            ng_count,
            avg_cycle_time,
        })
    }

    async fn latest_count_today(&self) -> Result<Option<i64>, StoreError> {
        let today = Self::today();
        let inner = self.lock();
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.event.recorded_at.date() == today)
            .max_by_key(|r| (r.event.recorded_at, r.id))
            .map(|r| r.event.count))
    }

    async fn ng_end_times_today(&self) -> Result<Vec<String>, StoreError> {
        let today = Self::today();
        let inner = self.lock();
        let mut times: Vec<String> = inner
            .rows
            .iter()
            .filter(|r| r.event.recorded_at.date() == today && r.event.outcome == Outcome::NG)
            .map(|r| r.event.end_time.clone())
            .collect();
        // Order by time-of-day, like the SQL cast; unparseable labels sort first.
        times.sort_by_key(|t| {
            NaiveTime::parse_from_str(t, "%H:%M:%S").unwrap_or(NaiveTime::MIN)
        });
        Ok(times)
    }

    async fn recent_records(&self, period: Period) -> Result<Vec<RecentRecord>, StoreError> {
        let today = Self::today();
        let inner = self.lock();
        let mut matching: Vec<&StoredEvent> = inner
            .rows
            .iter()
            .filter(|r| {
                let date = r.event.recorded_at.date();
                match period {
                    Period::Today => date == today,
                    Period::Last7days => date >= today - chrono::Duration::days(7),
                    Period::Thismonth => {
                        use chrono::Datelike;
                        date.year() == today.year() && date.month() == today.month()
                    }
                    Period::All => true,
                }
            })
            .collect();
        matching.sort_by_key(|r| std::cmp::Reverse((r.event.recorded_at, r.id)));
        Ok(matching
            .into_iter()
            .take(RECENT_LIMIT)
            .map(|r| RecentRecord::from_event(r.id, &r.event))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn event_at(ts: NaiveDateTime, count: i64, outcome: Outcome) -> CycleEvent {
        CycleEvent {
            start_time: "08:00:00".to_string(),
            end_time: ts.format("%H:%M:%S").to_string(),
            cycle_time: 10.0,
            count,
            outcome,
            recorded_at: ts,
        }
    }

    fn today_at(hms: &str) -> NaiveDateTime {
        let date = Local::now().date_naive();
        date.and_time(NaiveTime::parse_from_str(hms, "%H:%M:%S").unwrap())
    }

    #[tokio::test]
    async fn latest_count_breaks_timestamp_ties_by_id() {
        let store = MemoryCycleStore::new();
        let ts = today_at("09:00:00");
        store.append(&event_at(ts, 5, Outcome::OK)).await.unwrap();
        store.append(&event_at(ts, 6, Outcome::OK)).await.unwrap();
        // Same timestamp: the later append (higher id) wins.
        assert_eq!(store.latest_count_today().await.unwrap(), Some(6));
    }

    #[tokio::test]
    async fn ng_end_times_are_ordered_by_time_of_day() {
        let store = MemoryCycleStore::new();
        for hms in ["10:30:00", "08:15:00", "09:45:00"] {
            store
                .append(&event_at(today_at(hms), 1, Outcome::NG))
                .await
                .unwrap();
        }
        let times = store.ng_end_times_today().await.unwrap();
        assert_eq!(times, vec!["08:15:00", "09:45:00", "10:30:00"]);
    }

    #[tokio::test]
    async fn yesterdays_records_are_excluded_from_daily_summary() {
        let store = MemoryCycleStore::new();
        let yesterday = today_at("12:00:00") - chrono::Duration::days(1);
        store.append(&event_at(yesterday, 1, Outcome::OK)).await.unwrap();
        store
            .append(&event_at(today_at("12:00:00"), 2, Outcome::NG))
            .await
            .unwrap();

        let summary = store.daily_summary().await.unwrap();
        assert_eq!(summary.ok_count, 0);
        assert_eq!(summary.ng_count, 1);
    }
}
