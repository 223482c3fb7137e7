// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use galera::config::settings::Settings;
use galera::domain::models::identity::Identity;
use galera::domain::services::identity_rotator::{IdentityRotator, RotationStrategy};
use std::collections::HashSet;

#[test]
fn test_round_robin_window_over_configured_pool() {
    let mut settings = Settings::defaults().unwrap();
    settings.identity.user_agents = (0..3).map(|i| format!("ua-{}", i)).collect();
    settings.identity.proxies = (0..4).map(|i| format!("http://10.0.0.{}:3128", i)).collect();

    let rotator = IdentityRotator::from_settings(&settings.identity, true);
    let size = rotator.pool_len();
    assert_eq!(size, 4);

    let picks: Vec<Identity> = (0..size * 10).map(|_| rotator.next().unwrap()).collect();
    for window in picks.windows(size) {
        let distinct: HashSet<&Identity> = window.iter().collect();
        assert_eq!(distinct.len(), size, "identity reused inside window");
    }
}

#[test]
fn test_proxies_ignored_when_disabled() {
    let mut settings = Settings::defaults().unwrap();
    settings.identity.user_agents = vec!["ua-0".to_string(), "ua-1".to_string()];
    settings.identity.proxies = vec!["http://10.0.0.1:3128".to_string()];

    let rotator = IdentityRotator::from_settings(&settings.identity, false);
    assert_eq!(rotator.pool_len(), 2);
    assert!(rotator.next().unwrap().proxy.is_none());
}

#[test]
fn test_weighted_random_never_returns_disabled_identity() {
    let pool: Vec<Identity> = (0..4)
        .map(|i| Identity::new(format!("ua-{}", i), None))
        .collect();
    let rotator = IdentityRotator::new(pool.clone(), RotationStrategy::WeightedRandom)
        .with_max_failures(1)
        .with_weights(&[100, 1, 1, 1]);

    rotator.report_failure(&pool[0]);
    for _ in 0..200 {
        assert_ne!(rotator.next().unwrap(), pool[0]);
    }
}
