//! Series adapters end to end over a scripted page source

use async_trait::async_trait;
use market_data_collector::fetcher::binance_config::{
    FUNDING_RATE, INDEX_PRICE_KLINES, KLINES, TAKER_BUY_SELL_VOLUME,
};
use market_data_collector::fetcher::{FetcherResult, JsonFetcher, QueryParams};
use market_data_collector::series::{
    fetch_series, SeriesKind, KLINE_COLUMNS, PRICE_KLINE_COLUMNS,
};
use market_data_collector::{Interval, TimeWindow, DAY_MS};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Mutex;

struct ScriptedFetcher {
    pages: Mutex<VecDeque<Value>>,
    requests: Mutex<Vec<(String, QueryParams)>>,
}

impl ScriptedFetcher {
    fn new(pages: Vec<Value>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<(String, QueryParams)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl JsonFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> FetcherResult<Option<Value>> {
        self.requests
            .lock()
            .unwrap()
            .push((path.to_string(), params.to_vec()));
        Ok(self.pages.lock().unwrap().pop_front())
    }
}

const NOW_MS: i64 = 100 * DAY_MS;

fn window() -> TimeWindow {
    TimeWindow {
        now_ms: NOW_MS,
        lookback_days: 1,
    }
}

fn param<'a>(params: &'a QueryParams, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
}

#[tokio::test]
async fn test_klines_table() {
    let t = NOW_MS - 3_600_000;
    let fetcher = ScriptedFetcher::new(vec![json!([
        [t, "1.0", "2.0", "0.5", "1.5", "10", t + 899_999, "15", 7, "4", "6", "0"],
        [t + 900_000, "1.5", "2.5", "1.0", "2.0", "12", t + 1_799_999, "20", 9, "5", "8", "0"]
    ])]);
    let kind = SeriesKind::Candle {
        columns: KLINE_COLUMNS,
        interval: Interval::FifteenMinutes,
    };

    let table = fetch_series(&fetcher, kind, &KLINES, "BTCUSDT", 1500, &window())
        .await
        .unwrap();

    assert_eq!(table.columns[0], "open_time");
    assert_eq!(table.columns[11], "ignore");
    assert_eq!(table.len(), 2);
    assert_eq!(table.rows[0][0], t.to_string());
    assert_eq!(table.rows[1][4], "2.0");

    let requests = fetcher.requests();
    let (path, params) = &requests[0];
    assert_eq!(path, "/fapi/v1/klines");
    assert_eq!(param(params, "interval"), Some("15m"));
    assert_eq!(param(params, "limit"), Some("1500"));
}

#[tokio::test]
async fn test_index_klines_use_pair_and_nine_columns() {
    let t = NOW_MS - 60_000;
    let fetcher = ScriptedFetcher::new(vec![json!([
        [t, "1", "1", "1", "1", "0", t + 59_999, "0", 60, "0", "0", "0"]
    ])]);
    let kind = SeriesKind::Candle {
        columns: PRICE_KLINE_COLUMNS,
        interval: Interval::OneMinute,
    };

    let table = fetch_series(&fetcher, kind, &INDEX_PRICE_KLINES, "ETHUSDT", 1500, &window())
        .await
        .unwrap();

    assert_eq!(table.columns.len(), 9);
    assert_eq!(table.rows[0].len(), 9);
    assert_eq!(table.rows[0][8], "60");

    let requests = fetcher.requests();
    let (_, params) = &requests[0];
    assert_eq!(param(params, "pair"), Some("ETHUSDT"));
    assert_eq!(param(params, "symbol"), None);
}

#[tokio::test]
async fn test_stat_series_table() {
    let t = NOW_MS - 7_200_000;
    let fetcher = ScriptedFetcher::new(vec![json!([
        {"buySellRatio": "1.1", "buyVol": "10", "sellVol": "9", "timestamp": t},
        {"buySellRatio": "0.9", "buyVol": "9", "sellVol": "10", "timestamp": t + 3_600_000}
    ])]);
    let kind = SeriesKind::PeriodStatistic {
        period: Some(Interval::OneHour),
    };

    let table = fetch_series(&fetcher, kind, &TAKER_BUY_SELL_VOLUME, "BTCUSDT", 500, &window())
        .await
        .unwrap();

    assert_eq!(
        table.columns,
        vec!["buySellRatio", "buyVol", "sellVol", "timestamp"]
    );
    assert_eq!(table.rows[1][0], "0.9");
    assert_eq!(table.rows[1][3], (t + 3_600_000).to_string());

    let requests = fetcher.requests();
    let (path, params) = &requests[0];
    assert_eq!(path, "/futures/data/takerBuySellVol");
    assert_eq!(param(params, "period"), Some("1h"));
    assert_eq!(param(params, "startTime"), None);
}

#[tokio::test]
async fn test_funding_table_and_floor() {
    let earliest = NOW_MS - DAY_MS;
    let fetcher = ScriptedFetcher::new(vec![json!([
        {"symbol": "BTCUSDT", "fundingTime": earliest, "fundingRate": "0.00010000", "markPrice": "42000.1"},
        {"symbol": "BTCUSDT", "fundingTime": earliest + 28_800_000, "fundingRate": "-0.00002000", "markPrice": ""}
    ])]);

    let table = fetch_series(
        &fetcher,
        SeriesKind::FundingRate,
        &FUNDING_RATE,
        "BTCUSDT",
        500,
        &window(),
    )
    .await
    .unwrap();

    assert_eq!(
        table.columns,
        vec!["symbol", "fundingTime", "fundingRate", "markPrice"]
    );
    assert_eq!(table.rows[0][2], "0.00010000");
    assert_eq!(table.rows[1][3], "");

    let requests = fetcher.requests();
    let (_, params) = &requests[0];
    assert_eq!(param(params, "startTime"), Some(earliest.to_string().as_str()));
    assert_eq!(param(params, "period"), None);
}

#[tokio::test]
async fn test_empty_source_gives_empty_table() {
    let fetcher = ScriptedFetcher::new(vec![json!([])]);
    let table = fetch_series(
        &fetcher,
        SeriesKind::PeriodStatistic { period: None },
        &TAKER_BUY_SELL_VOLUME,
        "BTCUSDT",
        500,
        &window(),
    )
    .await
    .unwrap();
    assert!(table.is_empty());
}
