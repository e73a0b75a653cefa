// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::fake_session::{FakePage, FakeSession, NextControl};
use super::helpers::{fast_tuning, market_url, test_profile};
use p2pcrawl::domain::models::listing::{CrawlResult, TargetSpec};
use p2pcrawl::domain::services::crawl_service::CrawlService;
use p2pcrawl::domain::services::pagination_service::{
    AdvanceOutcome, PageLoad, PaginationController, PaginationPhase, TerminationReason,
};

fn pages(count: usize) -> Vec<FakePage> {
    (1..=count).map(FakePage::numbered).collect()
}

async fn crawl_market(session: &FakeSession, code: &str) -> CrawlResult {
    let profile = test_profile();
    let tuning = fast_tuning();
    let target = TargetSpec::new(code, market_url(code)).unwrap();
    session.open(target.url());
    CrawlService::new(session, &profile, &tuning)
        .crawl(&target)
        .await
}

#[tokio::test(start_paused = true)]
async fn test_known_page_count_limits_visits() {
    let mut market = pages(5);
    market[0] = FakePage::numbered(1).with_page_numbers(&["1", "2", "3"]);
    let session = FakeSession::new().with_market(&market_url("USD"), market);

    let result = crawl_market(&session, "USD").await;

    assert_eq!(result.pages_visited, 3);
    assert_eq!(
        result.termination,
        Some(TerminationReason::MaxPageReached(3))
    );
    assert_eq!(session.current_page(), Some(3));
}

#[tokio::test(start_paused = true)]
async fn test_ellipsis_items_are_ignored_in_page_count() {
    let mut market = pages(6);
    market[0] = FakePage::numbered(1).with_page_numbers(&["1", "2", "...", "4"]);
    let session = FakeSession::new().with_market(&market_url("USD"), market);

    let result = crawl_market(&session, "USD").await;

    assert_eq!(result.pages_visited, 4);
    assert_eq!(
        result.termination,
        Some(TerminationReason::MaxPageReached(4))
    );
}

#[tokio::test(start_paused = true)]
async fn test_missing_page_count_paginates_until_disabled() {
    let mut market = pages(4);
    market[3] = FakePage::numbered(4).with_next(NextControl::Disabled);
    let session = FakeSession::new().with_market(&market_url("EUR"), market);

    let result = crawl_market(&session, "EUR").await;

    assert_eq!(result.pages_visited, 4);
    assert_eq!(
        result.termination,
        Some(TerminationReason::NextControlDisabled)
    );
    let names: Vec<_> = result.records.iter().map(|r| r.advertiser.as_str()).collect();
    assert_eq!(names, vec!["seller-1", "seller-2", "seller-3", "seller-4"]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_next_control_ends_pagination() {
    let session = FakeSession::new().with_market(
        &market_url("AED"),
        vec![FakePage::numbered(1).with_next(NextControl::Missing)],
    );

    let result = crawl_market(&session, "AED").await;

    assert_eq!(result.pages_visited, 1);
    assert_eq!(
        result.termination,
        Some(TerminationReason::NextControlMissing)
    );
    assert_eq!(session.clicks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_intercepted_click_falls_back_to_script_click() {
    let session = FakeSession::new().with_market(
        &market_url("USD"),
        vec![
            FakePage::numbered(1).with_next(NextControl::Intercepted { forced_ok: true }),
            FakePage::numbered(2).with_next(NextControl::Disabled),
        ],
    );

    let result = crawl_market(&session, "USD").await;

    assert_eq!(result.pages_visited, 2);
    assert_eq!(session.forced_clicks(), 1);
    assert_eq!(
        result.termination,
        Some(TerminationReason::NextControlDisabled)
    );
}

#[tokio::test(start_paused = true)]
async fn test_permanently_obstructed_control_terminates() {
    let session = FakeSession::new().with_market(
        &market_url("USD"),
        vec![
            FakePage::numbered(1).with_next(NextControl::Intercepted { forced_ok: false }),
            FakePage::numbered(2),
        ],
    );

    let result = crawl_market(&session, "USD").await;

    assert_eq!(result.pages_visited, 1);
    assert_eq!(session.clicks(), 1);
    assert_eq!(session.forced_clicks(), 1);
    assert!(matches!(
        result.termination,
        Some(TerminationReason::AdvanceFailed(_))
    ));
    assert!(!result.is_partial());
}

#[tokio::test(start_paused = true)]
async fn test_non_intercept_click_error_skips_fallback() {
    let session = FakeSession::new().with_market(
        &market_url("USD"),
        vec![FakePage::numbered(1).with_next(NextControl::Broken), FakePage::numbered(2)],
    );

    let result = crawl_market(&session, "USD").await;

    assert_eq!(result.pages_visited, 1);
    assert_eq!(session.forced_clicks(), 0);
    assert!(matches!(
        result.termination,
        Some(TerminationReason::AdvanceFailed(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_detached_next_control_terminates_normally() {
    let session = FakeSession::new().with_market(
        &market_url("USD"),
        vec![
            FakePage::numbered(1),
            FakePage::numbered(2).with_next(NextControl::Detached),
            FakePage::numbered(3),
        ],
    );

    let result = crawl_market(&session, "USD").await;

    assert!(!result.is_partial());
    assert!(result.failure.is_none());
    assert_eq!(result.pages_visited, 2);
    assert_eq!(result.records.len(), 2);
    assert!(matches!(
        result.termination,
        Some(TerminationReason::AdvanceFailed(ref reason)) if reason.contains("detached")
    ));
    assert_eq!(session.clicks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stuck_control_is_bounded_by_page_cap() {
    let session = FakeSession::new().with_market(
        &market_url("USD"),
        vec![FakePage::numbered(1).with_next(NextControl::Stuck)],
    );
    let profile = test_profile();
    let mut tuning = fast_tuning();
    tuning.max_pages_per_target = 5;
    let target = TargetSpec::new("USD", market_url("USD")).unwrap();
    session.open(target.url());

    let result = CrawlService::new(&session, &profile, &tuning)
        .crawl(&target)
        .await;

    assert_eq!(result.pages_visited, 5);
    assert_eq!(
        result.termination,
        Some(TerminationReason::PageCapReached(5))
    );
}

#[tokio::test(start_paused = true)]
async fn test_first_load_timeout_still_extracts() {
    let session = FakeSession::new().with_market(
        &market_url("USD"),
        vec![FakePage::numbered(1)
            .without_marker()
            .with_next(NextControl::Missing)],
    );
    session.open(&market_url("USD"));
    let profile = test_profile();
    let tuning = fast_tuning();

    let mut controller = PaginationController::new(&session, &profile, &tuning);
    assert_eq!(controller.phase(), &PaginationPhase::AwaitingFirstLoad);
    assert_eq!(controller.start().await, PageLoad::TimedOut);
    assert_eq!(controller.phase(), &PaginationPhase::HasPage(1));
    assert_eq!(controller.state().known_max_page, None);

    let result = crawl_market(&session, "USD").await;
    assert_eq!(result.records.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_obstructions_dismissed_before_advance() {
    let session = FakeSession::new()
        .with_obstruction(".ad-close", "×")
        .with_obstruction("button.confirm", "Confirm")
        .with_market(
            &market_url("USD"),
            vec![
                FakePage::numbered(1),
                FakePage::numbered(2).with_next(NextControl::Disabled),
            ],
        );

    let result = crawl_market(&session, "USD").await;

    assert_eq!(session.obstructions_remaining(), 0);
    assert_eq!(result.pages_visited, 2);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_dialog_requires_matching_text() {
    let session = FakeSession::new()
        .with_obstruction("button.confirm", "Cancel")
        .with_market(
            &market_url("USD"),
            vec![FakePage::numbered(1).with_next(NextControl::Missing)],
        );

    crawl_market(&session, "USD").await;

    assert_eq!(session.obstructions_remaining(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_advance_after_termination_is_stable() {
    let session = FakeSession::new().with_market(
        &market_url("USD"),
        vec![FakePage::numbered(1).with_next(NextControl::Disabled)],
    );
    session.open(&market_url("USD"));
    let profile = test_profile();
    let tuning = fast_tuning();

    let mut controller = PaginationController::new(&session, &profile, &tuning);
    controller.start().await;

    let first = controller.advance().await;
    let second = controller.advance().await;
    assert_eq!(
        first,
        AdvanceOutcome::Terminated(TerminationReason::NextControlDisabled)
    );
    assert_eq!(first, second);
    assert!(controller.state().terminated);
    assert_eq!(controller.state().current_page_index, 1);
}
