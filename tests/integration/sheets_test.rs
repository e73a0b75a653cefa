// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use p2pcrawl::domain::models::listing::{ListingRecord, SHEET_HEADER};
use p2pcrawl::domain::models::site::SummaryLocation;
use p2pcrawl::domain::repositories::sheet_repository::{
    RowRange, SinkError, TableHandle, TabularSink,
};
use p2pcrawl::infrastructure::google_sheets::GoogleSheetsSink;
use p2pcrawl::utils::retry_policy::RetryPolicy;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const SHEET: &str = "sheet-1";

fn sink(server: &MockServer) -> GoogleSheetsSink {
    let retry = RetryPolicy {
        max_retries: 2,
        initial_backoff: Duration::from_millis(10),
        enable_jitter: false,
        ..RetryPolicy::default()
    };
    GoogleSheetsSink::new(
        &server.uri(),
        SHEET,
        "test-token".to_string(),
        Duration::from_secs(5),
        retry,
    )
    .unwrap()
}

fn body_json(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap()
}

async fn requests_to(server: &MockServer, fragment: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path().contains(fragment))
        .collect()
}

#[tokio::test]
async fn test_existing_sheet_is_reused() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/spreadsheets/{}", SHEET)))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [
                { "properties": { "sheetId": 0, "title": "Main" } },
                { "properties": { "sheetId": 41, "title": "EUR" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/spreadsheets/{}:batchUpdate", SHEET)))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let handle = sink(&server).ensure_table("EUR").await.unwrap();

    assert_eq!(handle.title, "EUR");
    assert_eq!(handle.sheet_id, Some(41));
}

#[tokio::test]
async fn test_missing_sheet_is_created() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/spreadsheets/{}", SHEET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sheets": [{ "properties": { "sheetId": 0, "title": "Main" } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/spreadsheets/{}:batchUpdate", SHEET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "replies": [{ "addSheet": { "properties": { "sheetId": 77, "title": "AED" } } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = sink(&server).ensure_table("AED").await.unwrap();
    assert_eq!(handle.sheet_id, Some(77));

    let requests = requests_to(&server, "batchUpdate").await;
    let add = &body_json(&requests[0])["requests"][0]["addSheet"]["properties"];
    assert_eq!(add["title"], "AED");
    assert_eq!(add["gridProperties"]["rowCount"], 1000);
    assert_eq!(add["gridProperties"]["columnCount"], 10);
}

#[tokio::test]
async fn test_rows_are_written_raw_and_formatted() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(format!("^/spreadsheets/{}/values/.+", SHEET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updatedRows": 3 })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/spreadsheets/{}:batchUpdate", SHEET)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "replies": [{}] })))
        .expect(1)
        .mount(&server)
        .await;

    let handle = TableHandle {
        title: "USD".into(),
        sheet_id: Some(12),
    };
    let rows = vec![
        ListingRecord {
            advertiser: "alice".into(),
            price: 1.02,
            available_quantity: 2500.0,
            payment_methods: vec!["Zelle".into(), "Wise".into()],
        },
        ListingRecord {
            advertiser: "bob".into(),
            price: 1.03,
            available_quantity: 80.5,
            payment_methods: vec![],
        },
    ];

    sink(&server)
        .write_rows(&handle, &SHEET_HEADER, &rows)
        .await
        .unwrap();

    let writes = requests_to(&server, "/values/").await;
    let input_option = writes[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "valueInputOption")
        .map(|(_, v)| v.to_string());
    assert_eq!(input_option.as_deref(), Some("RAW"));
    let body = body_json(&writes[0]);
    assert_eq!(body["range"], "'USD'!A1:D3");
    assert_eq!(body["values"][0][0], "Advertiser Name");
    assert_eq!(body["values"][1][1], json!(1.02));
    assert_eq!(body["values"][1][3], "Zelle, Wise");
    assert_eq!(body["values"][2][3], "");

    let formats = requests_to(&server, "batchUpdate").await;
    let repeat = &body_json(&formats[0])["requests"][0]["repeatCell"];
    assert_eq!(repeat["range"]["sheetId"], 12);
    assert_eq!(repeat["range"]["endRowIndex"], 3);
    assert_eq!(
        repeat["cell"]["userEnteredFormat"]["numberFormat"]["pattern"],
        "#,##0.00"
    );
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let range = RowRange::covering(2, 3).unwrap();
    sink(&server)
        .stamp_completion(&SummaryLocation::default(), range, "2025-06-01 12:00:00")
        .await
        .unwrap();

    let stamps = requests_to(&server, "/values/").await;
    let body = body_json(stamps.last().unwrap());
    assert_eq!(body["range"], "Main!D2:D4");
    assert_eq!(
        body["values"],
        json!([["2025-06-01 12:00:00"], ["2025-06-01 12:00:00"], ["2025-06-01 12:00:00"]])
    );
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Unable to parse range"))
        .expect(1)
        .mount(&server)
        .await;

    let handle = TableHandle {
        title: "USD".into(),
        sheet_id: Some(1),
    };
    let err = sink(&server).clear(&handle).await.unwrap_err();

    match err {
        SinkError::Http { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("Unable to parse range"));
        }
        other => panic!("unexpected error: {}", other),
    }
}
