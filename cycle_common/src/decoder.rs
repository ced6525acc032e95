//! # Event Decoder
//!
//! Turns a raw subscribe-channel payload into a validated [`CycleEvent`].
//!
//! The sensor controller's serialization is not fully standardized and
//! varies by firmware revision: some firmwares wrap the whole payload in an
//! extra layer of quotes, and older ones emit a bare-key pseudo-JSON
//! notation (`{startTime:08:00:00,...}`) with unquoted field names and
//! unquoted string values. [`normalize_bare_keys`] is the compatibility shim
//! for that known set of legacy shapes — it is not a general parser, and its
//! test suite pins the exact before/after pairs it supports.
//!
//! Validation checks field *presence*, not truthiness: a numeric duration of
//! zero is a valid cycle time, while an empty string for a required field is
//! not. Any failure is returned as a [`DecodeError`]; callers log and
//! discard the message with no further action.

use std::borrow::Cow;

use chrono::NaiveDateTime;
use regex::{Captures, Regex};
use serde::Deserialize;
use static_init::dynamic;
use thiserror::Error;

use crate::model::{CycleEvent, Outcome};

/// Rewrites bare field names (`startTime:`) into quoted JSON keys.
#[dynamic]
static KEY_RE: Regex =
    Regex::new(r"\b(startTime|endTime|cycleTime|count|status|timestamp)\s*:")
        .expect("key regex is valid");

/// Wraps the unquoted values of the string-typed fields in quotes.
/// Numeric fields (`cycleTime`, `count`) are left as-is.
#[dynamic]
static STR_VAL_RE: Regex =
    Regex::new(r#""(startTime|endTime|status|timestamp)":\s*([^,}"]+)"#)
        .expect("value regex is valid");

/// Why a raw payload was rejected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8")]
    NotUtf8,
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("missing or empty field: {0}")]
    MissingField(&'static str),
    #[error("cycle time must be a non-negative number, got {0}")]
    InvalidCycleTime(f64),
    #[error("unknown outcome '{0}', expected OK or NG")]
    UnknownOutcome(String),
    #[error("unparseable timestamp '{0}'")]
    BadTimestamp(String),
}

/// Inbound message shape after normalization, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCycleMessage {
    start_time: String,
    end_time: String,
    cycle_time: f64,
    count: i64,
    status: String,
    timestamp: String,
}

/// Decodes one raw subscribe-channel payload into a validated event.
pub fn decode(raw: &[u8]) -> Result<CycleEvent, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|_| DecodeError::NotUtf8)?;
    let text = strip_enclosing_quotes(text.trim());
    let normalized = normalize_bare_keys(text);

    let raw_msg: RawCycleMessage = serde_json::from_str(&normalized)?;
    validate(raw_msg)
}

/// Removes one layer of enclosing single quotes, then one of double quotes.
/// Some firmware revisions forward the JSON body wrapped in either.
fn strip_enclosing_quotes(s: &str) -> &str {
    let s = s
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or(s);
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}

/// Rewrites the legacy bare-key notation into strict JSON.
///
/// Applied only when the payload contains a bare `startTime:` key and no
/// quoted one, so already-standard payloads pass through untouched.
///
/// Before: `{startTime:08:00:00,cycleTime:12.5,status:OK,...}`
/// After:  `{"startTime":"08:00:00","cycleTime":12.5,"status":"OK",...}`
pub fn normalize_bare_keys(payload: &str) -> Cow<'_, str> {
    if !payload.contains("startTime:") || payload.contains("\"startTime\"") {
        return Cow::Borrowed(payload);
    }

    let keyed = KEY_RE.replace_all(payload, "\"$1\":");
    let quoted = STR_VAL_RE.replace_all(&keyed, |caps: &Captures<'_>| {
        format!("\"{}\":\"{}\"", &caps[1], caps[2].trim())
    });
    Cow::Owned(quoted.into_owned())
}

fn validate(raw: RawCycleMessage) -> Result<CycleEvent, DecodeError> {
    if raw.start_time.is_empty() {
        return Err(DecodeError::MissingField("startTime"));
    }
    if raw.end_time.is_empty() {
        return Err(DecodeError::MissingField("endTime"));
    }
    if raw.status.is_empty() {
        return Err(DecodeError::MissingField("status"));
    }
    if raw.timestamp.is_empty() {
        return Err(DecodeError::MissingField("timestamp"));
    }
    if !raw.cycle_time.is_finite() || raw.cycle_time < 0.0 {
        return Err(DecodeError::InvalidCycleTime(raw.cycle_time));
    }

    let outcome =
        Outcome::parse(&raw.status).ok_or_else(|| DecodeError::UnknownOutcome(raw.status.clone()))?;
    let recorded_at = parse_timestamp(&raw.timestamp)
        .ok_or_else(|| DecodeError::BadTimestamp(raw.timestamp.clone()))?;

    Ok(CycleEvent {
        start_time: raw.start_time,
        end_time: raw.end_time,
        cycle_time: raw.cycle_time,
        count: raw.count,
        outcome,
        recorded_at,
    })
}

/// Accepts the controller's `T`-separated form and the space-separated form,
/// with or without fractional seconds.
fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_key_notation() {
        let before = "{startTime:08:00:00,endTime:08:00:12,cycleTime:12.5,count:1,status:OK,timestamp:2024-01-01T08:00:12}";
        let after = normalize_bare_keys(before);
        assert_eq!(
            after,
            r#"{"startTime":"08:00:00","endTime":"08:00:12","cycleTime":12.5,"count":1,"status":"OK","timestamp":"2024-01-01T08:00:12"}"#
        );
    }

    #[test]
    fn leaves_strict_json_untouched() {
        let strict = r#"{"startTime":"08:00:00","endTime":"08:00:12","cycleTime":12.5,"count":1,"status":"OK","timestamp":"2024-01-01T08:00:12"}"#;
        assert!(matches!(normalize_bare_keys(strict), Cow::Borrowed(_)));
    }

    #[test]
    fn decodes_bare_key_payload() {
        let raw = b"{startTime:08:00:00,endTime:08:00:12,cycleTime:12.5,count:1,status:OK,timestamp:2024-01-01T08:00:12}";
        let event = decode(raw).unwrap();
        assert_eq!(event.start_time, "08:00:00");
        assert_eq!(event.end_time, "08:00:12");
        assert_eq!(event.cycle_time, 12.5);
        assert_eq!(event.count, 1);
        assert_eq!(event.outcome, Outcome::OK);
    }

    #[test]
    fn strips_enclosing_quote_layers() {
        let raw = br#"'{"startTime":"08:00:00","endTime":"08:00:12","cycleTime":12,"count":1,"status":"NG","timestamp":"2024-01-01T08:00:12"}'"#;
        let event = decode(raw).unwrap();
        assert_eq!(event.outcome, Outcome::NG);
    }

    #[test]
    fn zero_cycle_time_is_valid() {
        let raw = br#"{"startTime":"08:00:00","endTime":"08:00:00","cycleTime":0,"count":7,"status":"OK","timestamp":"2024-01-01T08:00:00"}"#;
        let event = decode(raw).unwrap();
        assert_eq!(event.cycle_time, 0.0);
    }

    #[test]
    fn rejects_missing_status() {
        let raw = br#"{"startTime":"08:00:00","endTime":"08:00:12","cycleTime":12,"count":1,"timestamp":"2024-01-01T08:00:12"}"#;
        assert!(matches!(decode(raw), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn rejects_empty_start_time() {
        let raw = br#"{"startTime":"","endTime":"08:00:12","cycleTime":12,"count":1,"status":"OK","timestamp":"2024-01-01T08:00:12"}"#;
        assert!(matches!(
            decode(raw),
            Err(DecodeError::MissingField("startTime"))
        ));
    }

    #[test]
    fn rejects_negative_cycle_time() {
        let raw = br#"{"startTime":"08:00:00","endTime":"08:00:12","cycleTime":-1,"count":1,"status":"OK","timestamp":"2024-01-01T08:00:12"}"#;
        assert!(matches!(decode(raw), Err(DecodeError::InvalidCycleTime(_))));
    }

    #[test]
    fn rejects_unknown_outcome() {
        let raw = br#"{"startTime":"08:00:00","endTime":"08:00:12","cycleTime":12,"count":1,"status":"MAYBE","timestamp":"2024-01-01T08:00:12"}"#;
        assert!(matches!(decode(raw), Err(DecodeError::UnknownOutcome(_))));
    }
}
