//! # Domain Model
//!
//! Types shared across the pipeline: the persisted cycle event, the derived
//! dashboard values and the wire shapes exchanged with viewers. Field names
//! on the wire follow the dashboard's existing JSON contract (`totalOK`,
//! `ngTrendData`, ...), so serde renames are explicit where camelCase alone
//! does not match.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Outcome of one production cycle as reported by the sensor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Successful cycle.
    OK,
    /// "Not good" — a failed or defective cycle.
    NG,
}

impl Outcome {
    /// Text form used in the relational store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::OK => "OK",
            Outcome::NG => "NG",
        }
    }

    /// Parses the stored text form. Anything but `OK`/`NG` is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OK" => Some(Outcome::OK),
            "NG" => Some(Outcome::NG),
            _ => None,
        }
    }
}

/// One completed production cycle, immutable after ingestion.
///
/// `count` is the controller-supplied sequence number. It is non-decreasing
/// within a controller session but not guaranteed unique; the store assigns
/// the authoritative identity on append.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleEvent {
    /// Wall-clock start of the cycle (`HH:MM:SS`).
    pub start_time: String,
    /// Wall-clock end of the cycle (`HH:MM:SS`).
    pub end_time: String,
    /// Cycle duration in seconds. Zero is a valid duration.
    pub cycle_time: f64,
    /// Controller output counter at this cycle.
    pub count: i64,
    /// OK or NG.
    pub outcome: Outcome,
    /// When the controller recorded the event.
    pub recorded_at: NaiveDateTime,
}

/// Daily statistics derived from the store. Never persisted; recomputed
/// wholesale after every successful ingestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatistics {
    #[serde(rename = "totalOK")]
    pub total_ok: i64,
    #[serde(rename = "totalNG")]
    pub total_ng: i64,
    /// Average cycle duration in seconds, two-decimal formatted, `"0.00"`
    /// when no record exists for the current day.
    pub avg_cycle_time: String,
    /// Sequence number of the most recent record today, 0 when none.
    pub current_output: i64,
}

impl Default for DailyStatistics {
    fn default() -> Self {
        Self {
            total_ok: 0,
            total_ng: 0,
            avg_cycle_time: "0.00".to_string(),
            current_output: 0,
        }
    }
}

/// One point of the cumulative NG trend: the NG event's own end-time label
/// and the running NG count at that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgTrendPoint {
    pub time: String,
    pub value: i64,
}

/// Denormalized view of a cycle event for fast serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentRecord {
    /// Store-assigned identity.
    pub id: i64,
    /// Display sequence (the controller counter).
    pub no: i64,
    pub start_time: String,
    pub end_time: String,
    /// Duration formatted to two decimals.
    pub cycle_time: String,
    pub status: Outcome,
    /// Recording timestamp, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
}

impl RecentRecord {
    /// Builds the serving view from a persisted event and its assigned id.
    pub fn from_event(id: i64, event: &CycleEvent) -> Self {
        Self {
            id,
            no: event.count,
            start_time: event.start_time.clone(),
            end_time: event.end_time.clone(),
            cycle_time: format!("{:.2}", event.cycle_time),
            status: event.outcome,
            created_at: event.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Historical period a viewer may scope a `REQUEST_ALL_DATA` request to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Today,
    Last7days,
    Thismonth,
    All,
}

/// Full-state snapshot sent to a viewer immediately after it connects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    #[serde(rename = "totalOK")]
    pub total_ok: i64,
    #[serde(rename = "totalNG")]
    pub total_ng: i64,
    pub total_parts: i64,
    pub current_output: i64,
    pub avg_cycle_time: String,
    pub ng_trend_data: Vec<NgTrendPoint>,
    pub latest_cycle_data: Option<RecentRecord>,
}

/// Delta broadcast to every viewer after a successful ingestion.
///
/// `ng_trend_data` is present only when the triggering event was NG; the
/// trend changes on no other occasion, so omitting it saves bandwidth.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealTimeUpdate {
    #[serde(rename = "totalOK")]
    pub total_ok: i64,
    #[serde(rename = "totalNG")]
    pub total_ng: i64,
    pub total_parts: i64,
    pub current_output: i64,
    pub avg_cycle_time: String,
    pub latest_cycle_data: Option<RecentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ng_trend_data: Option<Vec<NgTrendPoint>>,
}

/// Server→viewer push-channel messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    #[serde(rename = "INITIAL_DATA")]
    InitialData(InitialData),
    #[serde(rename = "REAL_TIME_UPDATE")]
    RealTimeUpdate(RealTimeUpdate),
    #[serde(rename = "ALL_CYCLE_DATA")]
    AllCycleData(Vec<RecentRecord>),
}

/// Viewer→server push-channel messages. Exactly one request kind exists.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "REQUEST_ALL_DATA")]
    RequestAllData {
        #[serde(default)]
        payload: Option<AllDataRequest>,
    },
}

/// Optional scoping of a history request.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AllDataRequest {
    pub period: Period,
}
