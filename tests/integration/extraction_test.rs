// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::fake_session::{FakeElement, FakePage, FakeRow, FakeSession};
use super::helpers::{market_url, test_profile};
use p2pcrawl::domain::models::listing::UNKNOWN_ADVERTISER;
use p2pcrawl::domain::services::extraction_service::{PageExtractor, RowExtractor};

async fn extract_row(row: FakeRow) -> Option<p2pcrawl::domain::models::listing::ListingRecord> {
    let profile = test_profile();
    let session = FakeSession::new();
    RowExtractor::new(&profile.fields)
        .extract(&session, &FakeElement::Row(row))
        .await
}

#[tokio::test]
async fn test_row_with_every_field() {
    let record = extract_row(FakeRow::listing(
        "CryptoKing",
        "3.672",
        "Available 12,500.50 USDT",
        &["Bank Transfer", "Wise"],
    ))
    .await
    .unwrap();

    assert_eq!(record.advertiser, "CryptoKing");
    assert_eq!(record.price, 3.672);
    assert_eq!(record.available_quantity, 12500.5);
    assert_eq!(record.payment_methods, vec!["Bank Transfer", "Wise"]);
}

#[tokio::test]
async fn test_row_without_any_field_is_dropped() {
    assert!(extract_row(FakeRow::empty()).await.is_none());

    // 只有0和无法解析的文本也不算取到值
    let zeros = FakeRow {
        price_a: Some("0.00".into()),
        texts: vec!["0".into(), "n/a".into()],
        quantity: Some("none".into()),
        ..Default::default()
    };
    assert!(extract_row(zeros).await.is_none());
}

#[tokio::test]
async fn test_zero_price_falls_back_to_candidate_search() {
    let row = FakeRow {
        advertiser: Some("bob".into()),
        price_a: Some("0.00".into()),
        texts: vec!["Limit 0".into(), "Price 18.25 EGP".into()],
        ..Default::default()
    };
    let record = extract_row(row).await.unwrap();
    assert_eq!(record.price, 18.25);
}

#[tokio::test]
async fn test_second_strategy_used_when_first_unparseable() {
    let row = FakeRow {
        price_a: Some("--".into()),
        price_b: Some("3.67 AED".into()),
        texts: vec!["99.99".into()],
        ..Default::default()
    };
    let record = extract_row(row).await.unwrap();
    assert_eq!(record.price, 3.67);
    assert_eq!(record.advertiser, UNKNOWN_ADVERTISER);
}

#[tokio::test]
async fn test_single_field_yields_record_with_defaults() {
    let row = FakeRow {
        quantity: Some("~ 7,000 USDT".into()),
        ..Default::default()
    };
    let record = extract_row(row).await.unwrap();

    assert_eq!(record.advertiser, UNKNOWN_ADVERTISER);
    assert_eq!(record.price, 0.0);
    assert_eq!(record.available_quantity, 7000.0);
    assert!(record.payment_methods.is_empty());
}

#[tokio::test]
async fn test_seller_literally_named_unknown_is_kept() {
    let row = FakeRow {
        advertiser: Some(UNKNOWN_ADVERTISER.into()),
        ..Default::default()
    };
    let record = extract_row(row).await.unwrap();

    assert_eq!(record.advertiser, "unknown");
    assert_eq!(record.price, 0.0);
    assert!(record.payment_methods.is_empty());
}

#[tokio::test]
async fn test_page_drops_empty_row_and_keeps_order() {
    let url = market_url("USD");
    let session = FakeSession::new().with_market(
        &url,
        vec![FakePage::new(vec![
            FakeRow::listing("first", "1.10", "10", &["Wise"]),
            FakeRow::empty(),
            FakeRow::listing("third", "1.30", "30", &["SEPA"]),
        ])],
    );
    session.open(&url);

    let profile = test_profile();
    let batch = PageExtractor::new(&profile)
        .extract_page(&session, 1)
        .await
        .unwrap();

    assert_eq!(batch.rows_seen, 3);
    assert_eq!(batch.dropped(), 1);
    let names: Vec<_> = batch.records.iter().map(|r| r.advertiser.as_str()).collect();
    assert_eq!(names, vec!["first", "third"]);
}

#[tokio::test]
async fn test_page_without_rows_is_empty_batch() {
    let url = market_url("USD");
    let session = FakeSession::new().with_market(&url, vec![FakePage::new(Vec::new())]);
    session.open(&url);

    let profile = test_profile();
    let batch = PageExtractor::new(&profile)
        .extract_page(&session, 4)
        .await
        .unwrap();

    assert_eq!(batch.page_index, 4);
    assert_eq!(batch.rows_seen, 0);
    assert!(batch.records.is_empty());
}

#[tokio::test]
async fn test_header_rows_are_skipped() {
    let url = market_url("EUR");
    let header = FakeRow {
        advertiser: Some("Advertisers".into()),
        ..Default::default()
    };
    let session = FakeSession::new().with_market(
        &url,
        vec![FakePage::new(vec![
            header,
            FakeRow::listing("alice", "0.93", "500", &[]),
        ])],
    );
    session.open(&url);

    let mut profile = test_profile();
    profile.skip_leading_rows = 1;
    let batch = PageExtractor::new(&profile)
        .extract_page(&session, 1)
        .await
        .unwrap();

    assert_eq!(batch.rows_seen, 1);
    assert_eq!(batch.records[0].advertiser, "alice");
}

#[tokio::test]
async fn test_row_query_failure_is_reported() {
    let url = market_url("USD");
    let session = FakeSession::new().with_market(&url, vec![FakePage::numbered(1).failing()]);
    session.open(&url);

    let profile = test_profile();
    let result = PageExtractor::new(&profile).extract_page(&session, 1).await;
    assert!(result.is_err());
}
