// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::fake_session::{FakePage, FakeRow, FakeSession, NextControl};
use super::helpers::{fast_tuning, market_url, test_profile};
use p2pcrawl::domain::models::listing::TargetSpec;
use p2pcrawl::domain::services::crawl_service::CrawlService;

#[tokio::test(start_paused = true)]
async fn test_failure_mid_crawl_keeps_earlier_pages() {
    let url = market_url("USD");
    let session = FakeSession::new().with_market(
        &url,
        vec![
            FakePage::numbered(1),
            FakePage::numbered(2),
            FakePage::numbered(3).failing(),
            FakePage::numbered(4),
            FakePage::numbered(5).with_next(NextControl::Disabled),
        ],
    );
    session.open(&url);
    let profile = test_profile();
    let tuning = fast_tuning();
    let target = TargetSpec::new("USD", &url).unwrap();

    let result = CrawlService::new(&session, &profile, &tuning)
        .crawl(&target)
        .await;

    assert!(result.is_partial());
    assert_eq!(result.code, "USD");
    assert_eq!(result.pages_visited, 2);
    assert!(result.termination.is_none());
    let names: Vec<_> = result.records.iter().map(|r| r.advertiser.as_str()).collect();
    assert_eq!(names, vec!["seller-1", "seller-2"]);
}

#[tokio::test(start_paused = true)]
async fn test_pages_concatenate_in_visit_order() {
    let url = market_url("EUR");
    let session = FakeSession::new().with_market(
        &url,
        vec![
            FakePage::new(vec![
                FakeRow::listing("a", "0.91", "10", &[]),
                FakeRow::listing("b", "0.92", "20", &[]),
            ]),
            FakePage::new(vec![FakeRow::empty(), FakeRow::listing("c", "0.93", "30", &[])])
                .with_next(NextControl::Missing),
        ],
    );
    session.open(&url);
    let profile = test_profile();
    let tuning = fast_tuning();
    let target = TargetSpec::new("EUR", &url).unwrap();

    let result = CrawlService::new(&session, &profile, &tuning)
        .crawl(&target)
        .await;

    assert!(!result.is_partial());
    assert_eq!(result.pages_visited, 2);
    let prices: Vec<_> = result.records.iter().map(|r| r.price).collect();
    assert_eq!(prices, vec![0.91, 0.92, 0.93]);
}

#[tokio::test(start_paused = true)]
async fn test_closed_session_yields_empty_partial_result() {
    let url = market_url("USD");
    let session = FakeSession::new().with_market(&url, vec![FakePage::numbered(1)]);
    session.open(&url);
    p2pcrawl::engines::traits::BrowserSession::close(&session)
        .await
        .unwrap();
    let profile = test_profile();
    let tuning = fast_tuning();
    let target = TargetSpec::new("USD", &url).unwrap();

    let result = CrawlService::new(&session, &profile, &tuning)
        .crawl(&target)
        .await;

    assert!(result.records.is_empty());
    assert_eq!(result.pages_visited, 0);
    assert!(result
        .failure
        .as_deref()
        .is_some_and(|f| f.contains("closed")));
}
