//! Unit tests for PaginationHelper against scripted page sources

use async_trait::async_trait;
use market_data_collector::fetcher::binance_config::{FUNDING_RATE, KLINES, OPEN_INTEREST_HIST};
use market_data_collector::fetcher::pagination::{
    PageQuery, PaginationHelper, PaginationState, TimestampKey,
};
use market_data_collector::fetcher::{FetcherError, FetcherResult, JsonFetcher, QueryParams};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Returns queued pages in order, then `None`
struct ScriptedFetcher {
    pages: Mutex<VecDeque<FetcherResult<Option<Value>>>>,
    requests: Mutex<Vec<QueryParams>>,
}

impl ScriptedFetcher {
    fn new(pages: Vec<FetcherResult<Option<Value>>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn with_pages(pages: Vec<Value>) -> Self {
        Self::new(pages.into_iter().map(|p| Ok(Some(p))).collect())
    }

    fn requests(&self) -> Vec<QueryParams> {
        self.requests.lock().unwrap().clone()
    }

    fn cursor_of(&self, request: usize) -> Option<String> {
        self.requests()[request]
            .iter()
            .find(|(k, _)| *k == "endTime")
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl JsonFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        _path: &str,
        params: &[(&'static str, String)],
    ) -> FetcherResult<Option<Value>> {
        self.requests.lock().unwrap().push(params.to_vec());
        self.pages.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

/// Kline query with a tiny page size
fn kline_query(limit: usize, earliest_ms: i64) -> PageQuery {
    PageQuery::new(&KLINES, "BTCUSDT", limit, earliest_ms, TimestampKey::Index(0))
        .with_param("interval", "15m")
}

fn timestamps(rows: &[Value]) -> Vec<i64> {
    rows.iter()
        .map(|r| TimestampKey::Index(0).extract(r).unwrap())
        .collect()
}

#[tokio::test]
async fn test_full_page_walks_backwards_then_stops_on_partial_page() {
    let fetcher = ScriptedFetcher::with_pages(vec![json!([[100], [200]]), json!([[50]])]);

    let rows = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();

    assert_eq!(timestamps(&rows), vec![50, 100, 200]);
    assert_eq!(fetcher.requests().len(), 2);
    assert_eq!(fetcher.cursor_of(0), None);
    assert_eq!(fetcher.cursor_of(1), Some("99".to_string()));
}

#[tokio::test]
async fn test_request_params_order() {
    let fetcher = ScriptedFetcher::with_pages(vec![json!([[100], [200]]), json!([])]);

    PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();

    let keys: Vec<Vec<&str>> = fetcher
        .requests()
        .iter()
        .map(|r| r.iter().map(|(k, _)| *k).collect())
        .collect();
    assert_eq!(keys[0], vec!["symbol", "limit", "interval"]);
    assert_eq!(keys[1], vec!["symbol", "limit", "endTime", "interval"]);
}

#[tokio::test]
async fn test_partial_page_stops_even_if_window_remains() {
    let fetcher = ScriptedFetcher::with_pages(vec![json!([[100]]), json!([[50]])]);

    let rows = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();

    assert_eq!(timestamps(&rows), vec![100]);
    assert_eq!(fetcher.requests().len(), 1);
}

#[tokio::test]
async fn test_rows_before_window_filtered_and_walk_stops() {
    let fetcher = ScriptedFetcher::with_pages(vec![json!([[100], [150], [200]])]);

    let rows = PaginationHelper::paginate(&fetcher, &kline_query(3, 150))
        .await
        .unwrap();

    assert_eq!(timestamps(&rows), vec![150, 200]);
    assert_eq!(fetcher.requests().len(), 1);
}

#[tokio::test]
async fn test_duplicate_timestamps_across_pages_keep_last() {
    let fetcher = ScriptedFetcher::with_pages(vec![
        json!([[100, "a"], [200, "b"]]),
        json!([[50, "c"], [100, "d"]]),
        json!([]),
    ]);

    let rows = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();

    assert_eq!(timestamps(&rows), vec![50, 100, 200]);
    assert_eq!(rows[1], json!([100, "d"]));
    assert_eq!(fetcher.cursor_of(2), Some("49".to_string()));
}

#[tokio::test]
async fn test_results_strictly_ascending_within_window() {
    let fetcher = ScriptedFetcher::with_pages(vec![
        json!([[400], [300], [500]]),
        json!([[100], [250], [260]]),
    ]);

    let rows = PaginationHelper::paginate(&fetcher, &kline_query(3, 200))
        .await
        .unwrap();

    let ts = timestamps(&rows);
    assert!(ts.windows(2).all(|w| w[0] < w[1]));
    assert!(ts.iter().all(|t| *t >= 200));
    assert_eq!(ts, vec![250, 260, 300, 400, 500]);
}

#[tokio::test]
async fn test_none_and_empty_payloads_stop() {
    let fetcher = ScriptedFetcher::new(vec![Ok(None)]);
    let rows = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(fetcher.requests().len(), 1);

    let fetcher = ScriptedFetcher::with_pages(vec![json!([])]);
    let rows = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_api_error_object_stops_and_keeps_accumulated_rows() {
    let fetcher = ScriptedFetcher::with_pages(vec![
        json!([[100], [200]]),
        json!({"code": -1003, "msg": "Too many requests"}),
    ]);

    let rows = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();

    assert_eq!(timestamps(&rows), vec![100, 200]);
    assert_eq!(fetcher.requests().len(), 2);
}

#[tokio::test]
async fn test_non_array_payload_stops() {
    let fetcher = ScriptedFetcher::with_pages(vec![json!({"rows": [[1]]})]);
    let rows = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_fetch_error_propagates() {
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Some(json!([[100], [200]]))),
        Err(FetcherError::HttpStatus {
            status: 500,
            body: "oops".to_string(),
        }),
    ]);

    let err = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, FetcherError::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn test_row_without_timestamp_is_parse_error() {
    let fetcher = ScriptedFetcher::with_pages(vec![json!([{"sumOpenInterest": "1"}])]);
    let query = PageQuery::new(
        &OPEN_INTEREST_HIST,
        "BTCUSDT",
        500,
        0,
        TimestampKey::Field("timestamp"),
    );

    let err = PaginationHelper::paginate(&fetcher, &query).await.unwrap_err();
    assert!(matches!(err, FetcherError::ParseError(_)));
}

#[tokio::test]
async fn test_ignored_cursor_does_not_loop() {
    // Same full page every time, as if endTime were ignored
    let page = json!([[100], [200]]);
    let fetcher = ScriptedFetcher::with_pages(vec![page.clone(), page.clone(), page]);

    let rows = PaginationHelper::paginate(&fetcher, &kline_query(2, 0))
        .await
        .unwrap();

    assert_eq!(timestamps(&rows), vec![100, 200]);
    assert_eq!(fetcher.requests().len(), 2);
}

#[tokio::test]
async fn test_funding_keyed_rows_with_string_timestamps() {
    let fetcher = ScriptedFetcher::with_pages(vec![json!([
        {"symbol": "BTCUSDT", "fundingTime": "1000", "fundingRate": "0.0001"},
        {"symbol": "BTCUSDT", "fundingTime": 2000, "fundingRate": "0.0002"}
    ])]);
    let query = PageQuery::new(
        &FUNDING_RATE,
        "BTCUSDT",
        500,
        1000,
        TimestampKey::Field("fundingTime"),
    )
    .with_param("startTime", 1000);

    let rows = PaginationHelper::paginate(&fetcher, &query).await.unwrap();

    assert_eq!(rows.len(), 2);
    let keys: Vec<&str> = fetcher.requests()[0].iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec!["symbol", "limit", "startTime"]);
}

#[test]
fn test_state_machine_cursor() {
    assert_eq!(PaginationState::AwaitingFirstPage.cursor(), None);
    assert_eq!(PaginationState::Done.cursor(), None);
    assert_eq!(
        PaginationState::next_state(500, 500, 1_000, 0).cursor(),
        Some(999)
    );
    assert_eq!(
        PaginationState::next_state(499, 500, 1_000, 0),
        PaginationState::Done
    );
}
