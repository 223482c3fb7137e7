// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use galera::config::settings::{BrowserType, Settings};
use galera::domain::models::fetch_request::FetchMode;
use galera::infrastructure::storage::build_repository;

#[test]
fn test_default_settings_build_a_pipeline_configuration() {
    let settings = Settings::defaults().unwrap();

    assert_eq!(settings.scraping.mode, FetchMode::Static);
    assert_eq!(settings.scraping.browser_type, BrowserType::Chrome);
    assert!(settings.scraping.simulate_human);
    assert!(!settings.scraping.use_proxies);
    assert!(!settings.identity.user_agents.is_empty());
    assert!(build_repository(&settings.storage).is_ok());
}

#[tokio::test]
async fn test_session_from_default_settings() {
    use galera::application::use_cases::scrape_session::ScrapeSession;

    let settings = Settings::defaults().unwrap();
    let repository = build_repository(&settings.storage).unwrap();
    let session = ScrapeSession::from_settings(&settings, repository)
        .await
        .unwrap();
    assert!(session.ledger().is_empty());
    assert!(!session.handle().is_cancelled());
}

#[tokio::test]
async fn test_firefox_is_accepted_by_config_but_not_by_dynamic_mode() {
    use galera::application::use_cases::scrape_session::{ScrapeSession, SessionError};
    use galera::engines::traits::FetchError;

    let mut settings = Settings::defaults().unwrap();
    settings.scraping.browser_type = BrowserType::Firefox;

    // static mode never launches a browser
    let repository = build_repository(&settings.storage).unwrap();
    assert!(ScrapeSession::from_settings(&settings, repository).await.is_ok());

    settings.scraping.mode = FetchMode::Dynamic;
    let repository = build_repository(&settings.storage).unwrap();
    let result = ScrapeSession::from_settings(&settings, repository).await;
    assert!(matches!(
        result,
        Err(SessionError::Engine(FetchError::InvalidRequest(_)))
    ));
}

#[test]
fn test_configured_weights_drive_weighted_random_rotation() {
    use galera::domain::services::identity_rotator::{IdentityRotator, RotationStrategy};

    let mut settings = Settings::defaults().unwrap();
    settings.identity.user_agents = vec!["ua-0".into(), "ua-1".into(), "ua-2".into()];
    settings.identity.strategy = RotationStrategy::WeightedRandom;
    settings.identity.reuse_window = Some(1);
    settings.identity.weights = vec![1000, 1];

    let rotator = IdentityRotator::from_settings(&settings.identity, false);
    let heavy = (0..300)
        .filter(|_| rotator.next().unwrap().user_agent == "ua-0")
        .count();
    assert!(heavy > 250, "heavy identity picked only {} times", heavy);
}
