// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use galera::domain::services::dedup_ledger::DedupLedger;
use std::time::Duration;

#[test]
fn test_marked_urls_are_seen_within_ttl() {
    let ledger = DedupLedger::new(Some(Duration::from_secs(600)));
    let urls = [
        "https://site.test/",
        "https://site.test/page/2?b=2&a=1",
        "http://other.test:8080/x",
    ];
    for url in urls {
        ledger.mark(url).unwrap();
    }
    for url in urls {
        assert!(ledger.seen(url), "{} not seen", url);
    }
    assert!(ledger.seen("https://site.test/page/2?a=1&b=2&utm_term=x"));
}

#[tokio::test]
async fn test_ledger_survives_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.json");

    let first = DedupLedger::new(None);
    assert!(first.try_claim("https://site.test/a").unwrap());
    first.persist(&path).await.unwrap();

    let second = DedupLedger::load(&path, None).await.unwrap();
    assert!(!second.try_claim("https://site.test/a").unwrap());
    assert!(second.try_claim("https://site.test/b").unwrap());
}
