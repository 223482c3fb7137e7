// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use galera::domain::models::session_summary::SkipReason;
use galera::engines::traits::FetchError;
use galera::queue::url_queue::InMemoryUrlQueue;
use galera::workers::manager::WorkerManager;
use std::sync::Arc;
use tokio::sync::watch;

use super::helpers::fixture_engine::{paginated_page, FixtureEngine};
use super::helpers::HarnessBuilder;

fn catalogue(count: usize) -> (FixtureEngine, Vec<String>) {
    let urls: Vec<String> = (0..count)
        .map(|i| format!("https://site.test/item/{}", i))
        .collect();
    let engine = urls.iter().fold(FixtureEngine::new(), |engine, url| {
        engine.with_page(url, paginated_page(url, None))
    });
    (engine, urls)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicates_are_fetched_once() {
    let (engine, urls) = catalogue(10);
    let engine = Arc::new(engine);
    let harness = HarnessBuilder::new(engine.clone()).concurrency(4).build();

    let mut batch = urls.clone();
    batch.extend(urls.iter().cloned());
    batch.push(format!("{}?utm_campaign=dup", urls[0]));

    let summary = harness.session.scrape_many(batch).await;

    for url in &urls {
        assert_eq!(engine.fetch_count(url), 1, "{} fetched more than once", url);
    }
    assert_eq!(summary.fetched.len(), 10);
    assert_eq!(summary.skipped.len(), 11);
    assert!(summary
        .skipped
        .iter()
        .all(|s| s.reason == SkipReason::AlreadySeen));
    assert!(summary.failed.is_empty());
}

#[tokio::test]
async fn test_failures_do_not_stop_the_batch() {
    let (engine, urls) = catalogue(3);
    let engine = Arc::new(engine.with_failure(
        "https://site.test/broken",
        FetchError::InvalidRequest("bad".into()),
    ));
    let harness = HarnessBuilder::new(engine.clone()).concurrency(2).build();

    let mut batch = urls.clone();
    batch.push("https://site.test/broken".to_string());
    batch.push("not a url".to_string());

    let summary = harness.session.scrape_many(batch).await;

    assert_eq!(summary.fetched.len(), 3);
    assert_eq!(summary.failed.len(), 2);
    assert!(!harness.ledger.seen("https://site.test/broken"));
    assert!(summary.records_emitted > 0);
}

#[tokio::test]
async fn test_cancelled_session_starts_no_fetches() {
    let (engine, urls) = catalogue(5);
    let engine = Arc::new(engine);
    let harness = HarnessBuilder::new(engine.clone()).build();

    harness.session.handle().cancel();
    let summary = harness.session.scrape_many(urls).await;

    assert!(engine.fetches().is_empty());
    assert_eq!(summary.skipped.len(), 5);
    assert!(summary
        .skipped
        .iter()
        .all(|s| s.reason == SkipReason::Cancelled));
}

#[tokio::test]
async fn test_empty_pool_fails_every_url() {
    let (engine, urls) = catalogue(2);
    let engine = Arc::new(engine);
    let harness = HarnessBuilder::new(engine.clone()).pool_size(0).build();

    let summary = harness.session.scrape_many(urls).await;

    assert!(engine.fetches().is_empty());
    assert_eq!(summary.failed.len(), 2);
    assert!(summary.failed.iter().all(|f| f.error.contains("exhausted")));
}

#[tokio::test]
async fn test_rejected_submissions_are_reported_as_failed() {
    let (engine, urls) = catalogue(2);
    let harness = HarnessBuilder::new(Arc::new(engine)).build();
    let pipeline = harness.session.pipeline();

    let queue = Arc::new(InMemoryUrlQueue::new());
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let mut manager = WorkerManager::new(queue.clone(), pipeline.clone(), cancel_rx);

    manager
        .submit(pipeline.template.request_for(urls[0].as_str()))
        .await;
    queue.close();
    manager
        .submit(pipeline.template.request_for(urls[1].as_str()))
        .await;
    manager.start_workers(1);
    let summary = manager.join().await;

    assert_eq!(summary.fetched, vec![urls[0].clone()]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].url, urls[1]);
    assert!(summary.failed[0].error.contains("closed"));
}

#[tokio::test]
async fn test_crashed_worker_keeps_completed_results() {
    let (engine, urls) = catalogue(3);
    let engine = Arc::new(engine.with_panic(&urls[1]));
    let harness = HarnessBuilder::new(engine.clone()).concurrency(1).build();

    let summary = harness.session.scrape_many(urls.clone()).await;

    assert_eq!(summary.fetched, vec![urls[0].clone()]);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].url, urls[1]);
    assert!(summary.failed[0].error.contains("panicked"));
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].url, urls[2]);
    assert_eq!(summary.skipped[0].reason, SkipReason::Cancelled);
    // the crashed URL can be retried by a later session
    assert!(!harness.ledger.seen(&urls[1]));
    assert!(summary.records_emitted > 0);
}

#[tokio::test]
async fn test_batch_summary_starts_when_the_batch_is_created() {
    let (engine, urls) = catalogue(1);
    let harness = HarnessBuilder::new(Arc::new(engine)).build();
    let pipeline = harness.session.pipeline();

    let before = Utc::now();
    let queue = Arc::new(InMemoryUrlQueue::new());
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let mut manager = WorkerManager::new(queue.clone(), pipeline.clone(), cancel_rx);
    manager
        .submit(pipeline.template.request_for(urls[0].as_str()))
        .await;
    queue.close();
    manager.start_workers(1);

    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
    let joined_at = Utc::now();
    let summary = manager.join().await;

    assert!(summary.started_at >= before);
    assert!(summary.started_at < joined_at);
    assert!(summary.finished_at.is_some_and(|finished| finished >= joined_at));
}
