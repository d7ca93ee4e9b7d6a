//! Unit tests for usage accounting

use chrono::{Days, NaiveDate, Utc};
use genai_gateway::gateway::usage::{period_start, rank_actors};
use genai_gateway::gateway::UsageAccountant;
use genai_gateway::storage::{MemoryUsageStore, UsageAggregate, UsageStore};
use std::sync::Arc;

fn setup() -> (Arc<MemoryUsageStore>, UsageAccountant) {
    let store = Arc::new(MemoryUsageStore::new());
    let accountant = UsageAccountant::new(store.clone());
    (store, accountant)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn days_ago(n: u64) -> NaiveDate {
    today().checked_sub_days(Days::new(n)).unwrap()
}

fn row(actor: &str, day: NaiveDate, requests: u64) -> UsageAggregate {
    UsageAggregate {
        actor_id: actor.to_string(),
        day,
        requests_count: requests,
        tokens_used: 0,
        successful_requests: requests,
        failed_requests: 0,
        avg_processing_time_ms: 0.0,
    }
}

#[tokio::test]
async fn test_running_average_over_two_requests() {
    let (store, accountant) = setup();

    accountant.record("u1", 10, true, 100).await;
    accountant.record("u1", 20, true, 300).await;

    let row = store.get("u1", today()).await.unwrap().unwrap();
    assert_eq!(row.requests_count, 2);
    assert_eq!(row.tokens_used, 30);
    assert_eq!(row.successful_requests, 2);
    assert_eq!(row.failed_requests, 0);
    assert!((row.avg_processing_time_ms - 200.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_failures_count_without_tokens() {
    let (store, accountant) = setup();

    accountant.record("u1", 15, true, 120).await;
    accountant.record("u1", 0, false, 40).await;

    let row = store.get("u1", today()).await.unwrap().unwrap();
    assert_eq!(row.requests_count, 2);
    assert_eq!(row.tokens_used, 15);
    assert_eq!(row.successful_requests, 1);
    assert_eq!(row.failed_requests, 1);
    assert_eq!(
        row.requests_count,
        row.successful_requests + row.failed_requests
    );
    assert!((row.avg_processing_time_ms - 80.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_rows_are_per_actor_and_day() {
    let (store, accountant) = setup();

    accountant.record_on("u1", days_ago(1), 5, true, 10).await;
    accountant.record_on("u1", today(), 5, true, 10).await;
    accountant.record_on("u2", today(), 5, true, 10).await;

    assert_eq!(store.get("u1", days_ago(1)).await.unwrap().unwrap().requests_count, 1);
    assert_eq!(store.get("u1", today()).await.unwrap().unwrap().requests_count, 1);
    assert_eq!(store.get("u2", today()).await.unwrap().unwrap().requests_count, 1);
    assert!(store.get("u2", days_ago(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_actor_history_newest_first() {
    let (_, accountant) = setup();

    accountant.record_on("u1", days_ago(3), 1, true, 10).await;
    accountant.record_on("u1", today(), 1, true, 10).await;
    accountant.record_on("u1", days_ago(1), 1, true, 10).await;
    accountant.record_on("other", today(), 1, true, 10).await;

    let history = accountant.actor_history("u1").await.unwrap();
    let days: Vec<_> = history.iter().map(|r| r.day).collect();
    assert_eq!(days, vec![today(), days_ago(1), days_ago(3)]);
}

#[tokio::test]
async fn test_totals_respect_period() {
    let (_, accountant) = setup();

    accountant.record_on("u1", today(), 100, true, 10).await;
    accountant.record_on("u1", days_ago(6), 50, true, 10).await;
    accountant.record_on("u2", days_ago(7), 25, true, 10).await;

    // Seven days means today plus the six before it
    assert_eq!(accountant.total_requests(7).await.unwrap(), 2);
    assert_eq!(accountant.total_tokens(7).await.unwrap(), 150);
    assert_eq!(accountant.total_requests(8).await.unwrap(), 3);
    assert_eq!(accountant.total_tokens(1).await.unwrap(), 100);
}

#[tokio::test]
async fn test_empty_period_totals_are_zero() {
    let (_, accountant) = setup();

    assert_eq!(accountant.total_requests(7).await.unwrap(), 0);
    assert_eq!(accountant.total_tokens(7).await.unwrap(), 0);
    assert!(accountant.top_actors(30).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_top_actors_sums_across_days() {
    let (_, accountant) = setup();

    for _ in 0..3 {
        accountant.record_on("alice", today(), 1, true, 10).await;
    }
    accountant.record_on("bob", today(), 1, true, 10).await;
    accountant.record_on("bob", days_ago(2), 1, true, 10).await;
    accountant.record_on("bob", days_ago(2), 1, false, 10).await;
    accountant.record_on("carol", today(), 1, true, 10).await;

    let top = accountant.top_actors(30).await.unwrap();
    let ranked: Vec<_> = top.iter().map(|a| (a.actor_id.as_str(), a.requests)).collect();
    assert_eq!(ranked, vec![("alice", 3), ("bob", 3), ("carol", 1)]);
}

#[test]
fn test_rank_actors_tie_break_by_id() {
    let day = today();
    let rows = vec![row("zed", day, 2), row("amy", day, 2), row("max", day, 5)];

    let ranked = rank_actors(&rows);
    let ids: Vec<_> = ranked.iter().map(|a| a.actor_id.as_str()).collect();
    assert_eq!(ids, vec!["max", "amy", "zed"]);
}

#[test]
fn test_period_start() {
    let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();

    assert_eq!(period_start(day, 1), day);
    assert_eq!(period_start(day, 7), NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
    assert_eq!(period_start(day, 0), day);
}

#[tokio::test]
async fn test_concurrent_merges_are_not_lost() {
    let (store, accountant) = setup();
    let accountant = Arc::new(accountant);

    let tasks = (0..50).map(|i| {
        let accountant = accountant.clone();
        tokio::spawn(async move { accountant.record("busy", 2, i % 5 != 0, 10).await })
    });
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    let row = store.get("busy", today()).await.unwrap().unwrap();
    assert_eq!(row.requests_count, 50);
    assert_eq!(row.tokens_used, 100);
    assert_eq!(row.failed_requests, 10);
    assert_eq!(row.successful_requests, 40);
}
