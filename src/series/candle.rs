//! Positional kline rows

use serde_json::Value;

use super::{cell_text, Table};
use crate::fetcher::{FetcherError, FetcherResult};

/// `/fapi/v1/klines` columns
pub const KLINE_COLUMNS: &[&str] = &[
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "close_time",
    "quote_asset_volume",
    "trades",
    "taker_base_volume",
    "taker_quote_volume",
    "ignore",
];

/// Index, mark and premium index kline columns
pub const PRICE_KLINE_COLUMNS: &[&str] = &[
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "close_time",
    "base_asset_volume",
    "trades",
];

/// Map each array row onto `columns`.
///
/// Elements past the last column are dropped and missing ones are left
/// empty. Rows opening before `earliest_ms` are removed again here.
pub(super) fn to_table(
    columns: &[&str],
    rows: &[Value],
    earliest_ms: i64,
) -> FetcherResult<Table> {
    let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());

    for row in rows {
        let Value::Array(elements) = row else {
            return Err(FetcherError::ParseError(format!(
                "expected kline array, got {row}"
            )));
        };

        let open_time = elements
            .first()
            .and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .ok_or_else(|| FetcherError::ParseError(format!("kline without open time: {row}")))?;
        if open_time < earliest_ms {
            continue;
        }

        let cells = (0..columns.len())
            .map(|i| elements.get(i).map(cell_text).unwrap_or_default())
            .collect();
        table.rows.push(cells);
    }

    Ok(table)
}
