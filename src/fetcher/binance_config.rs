//! Binance USDS-M futures endpoint descriptors
//!
//! Every dataset the collector pulls is described by a static
//! [`EndpointDescriptor`]; the differences between endpoints (symbol key,
//! page cap, how the lower edge is bounded) are configuration, not code.
//!
//! - Kline-like endpoints (`/fapi/v1/*Klines`): page cap 1500
//! - Statistics endpoints (`/futures/data/*`): page cap 500
//! - Funding rate history (`/fapi/v1/fundingRate`): page cap 500, `startTime` floor

/// USDT-margined futures REST base URL
pub const USDT_FUTURES_BASE_URL: &str = "https://fapi.binance.com";

/// Backward pagination cursor parameter
pub const END_TIME_PARAM: &str = "endTime";

/// How the oldest edge of the window is enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowerBound {
    /// Only by the backward cursor walk and the per-page filter
    Cursor,
    /// The endpoint also receives a `startTime` floor
    StartTimeFloor,
}

/// Immutable description of one paginated endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Path relative to the base URL
    pub path: &'static str,
    /// Query key carrying the symbol (`symbol` or `pair`)
    pub symbol_param: &'static str,
    /// Largest page the endpoint serves
    pub max_limit: usize,
    /// Query key for the backward cursor; `None` means single page only
    pub cursor_param: Option<&'static str>,
    /// Lower edge policy
    pub lower_bound: LowerBound,
}

impl EndpointDescriptor {
    const fn kline_like(path: &'static str, symbol_param: &'static str) -> Self {
        Self {
            path,
            symbol_param,
            max_limit: 1500,
            cursor_param: Some(END_TIME_PARAM),
            lower_bound: LowerBound::Cursor,
        }
    }

    const fn statistic(path: &'static str) -> Self {
        Self {
            path,
            symbol_param: "symbol",
            max_limit: 500,
            cursor_param: Some(END_TIME_PARAM),
            lower_bound: LowerBound::Cursor,
        }
    }

    /// Clamp a requested page size to what the endpoint serves
    pub fn page_limit(&self, requested: usize) -> usize {
        requested.clamp(1, self.max_limit)
    }
}

/// Futures klines
pub const KLINES: EndpointDescriptor = EndpointDescriptor::kline_like("/fapi/v1/klines", "symbol");

/// Index price klines (keyed by `pair`)
pub const INDEX_PRICE_KLINES: EndpointDescriptor =
    EndpointDescriptor::kline_like("/fapi/v1/indexPriceKlines", "pair");

/// Mark price klines
pub const MARK_PRICE_KLINES: EndpointDescriptor =
    EndpointDescriptor::kline_like("/fapi/v1/markPriceKlines", "symbol");

/// Premium index klines
pub const PREMIUM_INDEX_KLINES: EndpointDescriptor =
    EndpointDescriptor::kline_like("/fapi/v1/premiumIndexKlines", "symbol");

/// Open interest statistics
pub const OPEN_INTEREST_HIST: EndpointDescriptor =
    EndpointDescriptor::statistic("/futures/data/openInterestHist");

/// Global long/short account ratio
pub const GLOBAL_LONG_SHORT_ACCOUNT_RATIO: EndpointDescriptor =
    EndpointDescriptor::statistic("/futures/data/globalLongShortAccountRatio");

/// Top trader long/short ratio (accounts)
pub const TOP_LONG_SHORT_ACCOUNT_RATIO: EndpointDescriptor =
    EndpointDescriptor::statistic("/futures/data/topLongShortAccountRatio");

/// Top trader long/short ratio (positions)
pub const TOP_LONG_SHORT_POSITION_RATIO: EndpointDescriptor =
    EndpointDescriptor::statistic("/futures/data/topLongShortPositionRatio");

/// Taker buy/sell volume
pub const TAKER_BUY_SELL_VOLUME: EndpointDescriptor =
    EndpointDescriptor::statistic("/futures/data/takerBuySellVol");

/// Funding rate history
pub const FUNDING_RATE: EndpointDescriptor = EndpointDescriptor {
    path: "/fapi/v1/fundingRate",
    symbol_param: "symbol",
    max_limit: 500,
    cursor_param: Some(END_TIME_PARAM),
    lower_bound: LowerBound::StartTimeFloor,
};
