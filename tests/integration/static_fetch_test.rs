// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use galera::application::use_cases::pagination_walker::WalkState;
use galera::domain::repositories::storage_repository::RecordRepository;
use galera::engines::static_engine::StaticFetch;
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::fixture_engine::paginated_page;
use super::helpers::HarnessBuilder;

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

#[tokio::test]
async fn test_static_walk_over_http() {
    let server = MockServer::start().await;
    for i in 1..=5 {
        let next = (i < 5).then(|| format!("/page/{}", i + 1));
        Mock::given(method("GET"))
            .and(path(format!("/page/{}", i)))
            .respond_with(html(paginated_page(&format!("Page {}", i), next.as_deref())))
            .expect(1)
            .mount(&server)
            .await;
    }

    let harness = HarnessBuilder::new(Arc::new(StaticFetch::new())).build();
    let outcome = harness
        .session
        .paginate(&format!("{}/page/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.state, WalkState::Done);
    assert_eq!(outcome.pages.len(), 5);
    assert!(outcome.pages.iter().all(|p| p.status_code == 200));
    assert!(!harness.repository.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limited_page_rotates_identity_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page/1"))
        .and(header("user-agent", "GaleraTest/0"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/1"))
        .and(header("user-agent", "GaleraTest/1"))
        .respond_with(html(paginated_page("Page 1", None)))
        .expect(1)
        .mount(&server)
        .await;

    let harness = HarnessBuilder::new(Arc::new(StaticFetch::new())).build();
    let outcome = harness
        .session
        .paginate(&format!("{}/page/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(outcome.state, WalkState::Done);
    assert_eq!(outcome.pages.len(), 1);
    assert_eq!(harness.rotator.selections(), 2);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
