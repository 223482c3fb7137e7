// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::StreamExt;
use galera::application::use_cases::pagination_walker::WalkState;
use galera::application::use_cases::scrape_session::SessionError;
use galera::domain::models::session_summary::SkipReason;
use galera::domain::repositories::storage_repository::RecordRepository;
use galera::engines::traits::FetchError;
use std::sync::Arc;

use super::helpers::fixture_engine::{chain, paginated_page, FixtureEngine};
use super::helpers::HarnessBuilder;

const BASE: &str = "https://site.test";

#[tokio::test]
async fn test_five_page_chain_ends_done_after_five_fetches() {
    let engine = Arc::new(chain(FixtureEngine::new(), BASE, 5));
    let harness = HarnessBuilder::new(engine.clone()).build();

    let outcome = harness
        .session
        .paginate("https://site.test/page/1")
        .await
        .unwrap();

    assert_eq!(outcome.state, WalkState::Done);
    assert_eq!(outcome.pages.len(), 5);
    assert_eq!(engine.fetches().len(), 5);
    let urls: Vec<&str> = outcome.pages.iter().map(|p| p.final_url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://site.test/page/1",
            "https://site.test/page/2",
            "https://site.test/page/3",
            "https://site.test/page/4",
            "https://site.test/page/5",
        ]
    );
    assert_eq!(outcome.summary.fetched.len(), 5);
    assert!(outcome.summary.is_clean());
    assert!(outcome.summary.finished_at.is_some());
}

#[tokio::test]
async fn test_walker_never_transitions_to_failed_on_clean_chain() {
    let engine = Arc::new(chain(FixtureEngine::new(), BASE, 5));
    let harness = HarnessBuilder::new(engine).build();

    let mut walker = harness.session.walker("https://site.test/page/1");
    let mut pages = 0;
    while walker.next_page().await.is_some() {
        pages += 1;
    }

    assert_eq!(pages, 5);
    assert_eq!(walker.state(), WalkState::Done);
    assert!(!walker.history().contains(&WalkState::Failed));
    assert_eq!(walker.history().first(), Some(&WalkState::Idle));
    assert_eq!(
        walker
            .history()
            .iter()
            .filter(|s| **s == WalkState::FetchingPage)
            .count(),
        5
    );
}

#[tokio::test]
async fn test_records_are_emitted_for_every_page() {
    let engine = Arc::new(chain(FixtureEngine::new(), BASE, 3));
    let harness = HarnessBuilder::new(engine).build();

    let outcome = harness
        .session
        .paginate("https://site.test/page/1")
        .await
        .unwrap();

    // text + image per page, plus a next link on the first two
    let stored = harness.repository.load().await.unwrap();
    assert_eq!(stored.len(), 3 * 2 + 2);
    assert_eq!(outcome.summary.records_emitted, stored.len());
}

#[tokio::test]
async fn test_page_limit_stops_walk() {
    let engine = Arc::new(chain(FixtureEngine::new(), BASE, 5));
    let harness = HarnessBuilder::new(engine.clone()).max_pages(2).build();

    let outcome = harness
        .session
        .paginate("https://site.test/page/1")
        .await
        .unwrap();

    assert_eq!(outcome.state, WalkState::Done);
    assert_eq!(outcome.pages.len(), 2);
    assert_eq!(engine.fetches().len(), 2);
    assert_eq!(outcome.summary.skipped.len(), 1);
    assert_eq!(outcome.summary.skipped[0].url, "https://site.test/page/3");
    assert_eq!(outcome.summary.skipped[0].reason, SkipReason::PageLimit);
}

#[tokio::test]
async fn test_link_back_to_visited_page_ends_walk() {
    let engine = Arc::new(
        FixtureEngine::new()
            .with_page(
                "https://site.test/page/1",
                paginated_page("Page 1", Some("/page/2")),
            )
            .with_page(
                "https://site.test/page/2",
                paginated_page("Page 2", Some("/page/1?utm_source=loop")),
            ),
    );
    let harness = HarnessBuilder::new(engine.clone()).build();

    let outcome = harness
        .session
        .paginate("https://site.test/page/1")
        .await
        .unwrap();

    assert_eq!(outcome.state, WalkState::Done);
    assert_eq!(outcome.pages.len(), 2);
    assert_eq!(engine.fetch_count("https://site.test/page/1"), 1);
    assert_eq!(outcome.summary.skipped[0].reason, SkipReason::AlreadySeen);
}

#[tokio::test]
async fn test_mid_chain_failure_keeps_partial_results() {
    let engine = Arc::new(
        chain(FixtureEngine::new(), BASE, 5)
            .with_failure("https://site.test/page/3", FetchError::Network("reset".into())),
    );
    let harness = HarnessBuilder::new(engine.clone()).retry_limit(2).build();

    let outcome = harness
        .session
        .paginate("https://site.test/page/1")
        .await
        .unwrap();

    assert_eq!(outcome.state, WalkState::Failed);
    assert_eq!(outcome.pages.len(), 2);
    assert_eq!(engine.fetch_count("https://site.test/page/3"), 2);
    assert_eq!(outcome.summary.failed.len(), 1);
    assert_eq!(outcome.summary.failed[0].url, "https://site.test/page/3");
    // failed URLs are released so a later session retries them
    assert!(!harness.ledger.seen("https://site.test/page/3"));
    assert!(harness.ledger.seen("https://site.test/page/2"));
}

#[tokio::test]
async fn test_seed_failure_is_session_error() {
    let engine = Arc::new(FixtureEngine::new().with_failure(
        "https://site.test/page/1",
        FetchError::Blocked {
            status: 403,
            reason: "HTTP 403 Forbidden".into(),
        },
    ));
    let harness = HarnessBuilder::new(engine.clone()).retry_limit(3).build();

    let err = harness
        .session
        .paginate("https://site.test/page/1")
        .await
        .unwrap_err();

    match err {
        SessionError::SeedFailed { url, source } => {
            assert_eq!(url, "https://site.test/page/1");
            assert!(matches!(source, FetchError::FetchFailed { attempts: 3, .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(engine.fetches().len(), 3);
    // one initial selection plus one rotation per block before the last attempt
    assert_eq!(harness.rotator.selections(), 3);
}

#[tokio::test]
async fn test_seed_already_seen_is_skipped() {
    let engine = Arc::new(chain(FixtureEngine::new(), BASE, 2));
    let harness = HarnessBuilder::new(engine.clone()).build();
    harness.ledger.mark("https://site.test/page/1").unwrap();

    let outcome = harness
        .session
        .paginate("https://site.test/page/1")
        .await
        .unwrap();

    assert_eq!(outcome.state, WalkState::Done);
    assert!(outcome.pages.is_empty());
    assert!(engine.fetches().is_empty());
    assert_eq!(outcome.summary.skipped[0].reason, SkipReason::AlreadySeen);
}

#[tokio::test]
async fn test_stream_is_lazy() {
    let engine = Arc::new(chain(FixtureEngine::new(), BASE, 5));
    let harness = HarnessBuilder::new(engine.clone()).build();

    let stream = harness.session.walker("https://site.test/page/1").into_stream();
    let first_two: Vec<_> = stream.take(2).collect().await;

    assert_eq!(first_two.len(), 2);
    assert_eq!(engine.fetches().len(), 2);
}

#[tokio::test]
async fn test_cancelled_walk_does_not_advance() {
    let engine = Arc::new(chain(FixtureEngine::new(), BASE, 5));
    let harness = HarnessBuilder::new(engine.clone()).build();

    let mut walker = harness.session.walker("https://site.test/page/1");
    assert!(walker.next_page().await.is_some());
    harness.session.handle().cancel();
    assert!(walker.next_page().await.is_none());

    assert_eq!(walker.state(), WalkState::Done);
    assert_eq!(engine.fetches().len(), 1);
    assert_eq!(walker.summary().skipped[0].reason, SkipReason::Cancelled);
}

#[tokio::test]
async fn test_extraction_error_does_not_stop_the_walk() {
    let engine = Arc::new(
        chain(FixtureEngine::new(), BASE, 5)
            .with_content_type("https://site.test/page/3", "application/octet-stream"),
    );
    let harness = HarnessBuilder::new(engine.clone()).build();

    let outcome = harness
        .session
        .paginate("https://site.test/page/1")
        .await
        .unwrap();

    assert_eq!(outcome.state, WalkState::Done);
    assert_eq!(outcome.pages.len(), 5);
    assert_eq!(engine.fetches().len(), 5);
    assert_eq!(outcome.summary.extraction_errors.len(), 1);
    assert_eq!(
        outcome.summary.extraction_errors[0].url,
        "https://site.test/page/3"
    );
    assert!(outcome.summary.failed.is_empty());

    // the other four pages still reach storage
    let stored = harness.repository.load().await.unwrap();
    assert_eq!(stored.len(), 4 * 2 + 3);
}
