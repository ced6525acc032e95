//! End-to-end pipeline tests: raw payload in, state and broadcast out,
//! over the in-memory store.

use std::sync::Arc;

use project_tests::{bare_payload, harness, harness_with, payload, today, FlakyStore};

#[tokio::test]
async fn ok_then_ng_produces_the_expected_dashboard_state() {
    let h = harness();

    h.pipeline.ingest(&payload("08:00:00", "08:00:12", 12.0, 1, "OK")).await;
    h.pipeline.ingest(&payload("08:00:12", "08:00:25", 13.0, 2, "NG")).await;

    let stats = h.state.stats().await;
    assert_eq!(stats.total_ok, 1);
    assert_eq!(stats.total_ng, 1);
    assert_eq!(stats.avg_cycle_time, "12.50");
    assert_eq!(stats.current_output, 2);

    let trend = h.state.trend().await;
    assert_eq!(trend.len(), 1);
    assert_eq!(trend[0].time, "08:00:25");
    assert_eq!(trend[0].value, 1);
}

#[tokio::test]
async fn totals_are_conserved_regardless_of_outcome_order() {
    let h = harness();

    let outcomes = ["NG", "OK", "OK", "NG", "OK", "NG", "NG", "OK"];
    for (i, status) in outcomes.iter().enumerate() {
        let end = format!("09:{:02}:00", i + 1);
        h.pipeline
            .ingest(&payload("09:00:00", &end, 10.0, (i + 1) as i64, status))
            .await;
    }

    let stats = h.state.stats().await;
    assert_eq!(stats.total_ok, 4);
    assert_eq!(stats.total_ng, 4);
    assert_eq!(stats.total_ok + stats.total_ng, outcomes.len() as i64);
}

#[tokio::test]
async fn trend_is_cumulative_and_strictly_increasing() {
    let h = harness();

    for (i, status) in ["NG", "OK", "NG", "NG"].iter().enumerate() {
        let end = format!("10:0{}:00", i);
        h.pipeline
            .ingest(&payload("10:00:00", &end, 10.0, (i + 1) as i64, status))
            .await;
    }

    let trend = h.state.trend().await;
    assert_eq!(trend.len(), 3);
    let values: Vec<i64> = trend.iter().map(|p| p.value).collect();
    assert_eq!(values, vec![1, 2, 3]);
    // Points are ordered by the NG event's time of day.
    assert_eq!(trend[0].time, "10:00:00");
    assert_eq!(trend[2].time, "10:03:00");
}

#[tokio::test]
async fn malformed_payload_changes_nothing() {
    let h = harness();
    h.pipeline.ingest(&payload("08:00:00", "08:00:12", 12.0, 1, "OK")).await;
    let before = h.state.stats().await;

    // Missing status field
    h.pipeline
        .ingest(br#"{"startTime":"08:00:12","endTime":"08:00:25","cycleTime":13,"count":2,"timestamp":"2024-01-01T08:00:25"}"#)
        .await;
    // Not even JSON
    h.pipeline.ingest(b"definitely not json").await;

    assert_eq!(h.state.stats().await, before);
    assert_eq!(h.state.cache.len().await, 1);
    assert!(h.state.trend().await.is_empty());
}

#[tokio::test]
async fn bare_key_payload_is_ingested_like_strict_json() {
    let h = harness();
    h.pipeline
        .ingest(&bare_payload("08:00:00", "08:00:12", 12.5, 1, "OK"))
        .await;

    let stats = h.state.stats().await;
    assert_eq!(stats.total_ok, 1);
    assert_eq!(stats.avg_cycle_time, "12.50");

    let records = h.state.cache.snapshot().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].cycle_time, "12.50");
    assert_eq!(records[0].created_at, format!("{} 08:00:12", today()));
}

#[tokio::test]
async fn subscribers_receive_updates_with_trend_only_on_ng() {
    let h = harness();
    let mut rx = h.dispatcher.add_client("test-viewer");

    h.pipeline.ingest(&payload("08:00:00", "08:00:12", 12.0, 1, "OK")).await;
    h.pipeline.ingest(&payload("08:00:12", "08:00:25", 13.0, 2, "NG")).await;

    let first: serde_json::Value =
        serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(first["type"], "REAL_TIME_UPDATE");
    assert_eq!(first["data"]["totalOK"], 1);
    assert_eq!(first["data"]["totalParts"], 1);
    assert!(first["data"].get("ngTrendData").is_none());

    let second: serde_json::Value =
        serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(second["data"]["totalNG"], 1);
    assert_eq!(second["data"]["totalParts"], 2);
    assert_eq!(second["data"]["ngTrendData"][0]["value"], 1);
    assert_eq!(second["data"]["latestCycleData"]["no"], 2);
}

#[tokio::test]
async fn cache_serves_newest_first_and_snapshot_matches_store() {
    let h = harness();
    for i in 1..=5 {
        let end = format!("11:00:{:02}", i);
        h.pipeline
            .ingest(&payload("11:00:00", &end, 10.0, i, "OK"))
            .await;
    }

    let records = h.state.cache.snapshot().await;
    assert_eq!(records.len(), 5);
    assert_eq!(records[0].no, 5);
    assert_eq!(records[4].no, 1);

    let stored = h
        .store
        .recent_records(cycle_common::model::Period::All)
        .await
        .unwrap();
    assert_eq!(stored, records);
}

#[tokio::test]
async fn append_failure_keeps_prior_state_and_sends_nothing() {
    let store = Arc::new(FlakyStore::new());
    let h = harness_with(store.clone());
    h.pipeline.ingest(&payload("08:00:00", "08:00:12", 12.0, 1, "OK")).await;
    let before = h.state.stats().await;
    let mut rx = h.dispatcher.add_client("viewer");

    // Store goes down: the event's write fails, so everything downstream
    // is skipped for that event.
    store.set_writes_failing(true);
    h.pipeline.ingest(&payload("08:00:12", "08:00:25", 13.0, 2, "NG")).await;

    assert_eq!(h.state.stats().await, before);
    assert!(h.state.trend().await.is_empty());
    assert_eq!(h.state.cache.len().await, 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn stats_query_failure_skips_broadcast_until_the_store_recovers() {
    let store = Arc::new(FlakyStore::new());
    let h = harness_with(store.clone());
    h.pipeline.ingest(&payload("08:00:00", "08:00:12", 12.0, 1, "OK")).await;
    let before = h.state.stats().await;
    let mut rx = h.dispatcher.add_client("viewer");

    // Writes still land but the recompute queries fail: the event is
    // persisted, prior served values stay, and no delta goes out.
    store.set_reads_failing(true);
    h.pipeline.ingest(&payload("08:00:12", "08:00:25", 13.0, 2, "NG")).await;

    assert_eq!(h.state.stats().await, before);
    assert_eq!(h.state.cache.len().await, 1);
    assert!(rx.try_recv().is_err());

    // Recovery: the next ingestion's full recompute picks up the event
    // that was persisted during the outage.
    store.set_reads_failing(false);
    h.pipeline.ingest(&payload("08:00:25", "08:00:37", 12.0, 3, "OK")).await;

    let after = h.state.stats().await;
    assert_eq!(after.total_ok, 2);
    assert_eq!(after.total_ng, 1);
    assert_eq!(after.current_output, 3);

    let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(frame["data"]["totalParts"], 3);
}

#[tokio::test]
async fn warm_up_primes_state_from_existing_records() {
    let h = harness();
    h.pipeline.ingest(&payload("08:00:00", "08:00:12", 12.0, 1, "OK")).await;
    h.pipeline.ingest(&payload("08:00:12", "08:00:25", 13.0, 2, "NG")).await;

    // A second process over the same store starts cold and warms up.
    let fresh = cycle_common::IngestPipeline::new(
        h.store.clone(),
        std::sync::Arc::new(cycle_common::DashboardState::new()),
        std::sync::Arc::new(cycle_common::Dispatcher::new()),
    );
    fresh.warm_up().await;

    let snapshot = fresh.state().initial_snapshot().await;
    assert_eq!(snapshot.total_ok, 1);
    assert_eq!(snapshot.total_ng, 1);
    assert_eq!(snapshot.total_parts, 2);
    assert_eq!(snapshot.ng_trend_data.len(), 1);
    assert_eq!(snapshot.latest_cycle_data.unwrap().no, 2);
}
