//! Keyed object rows (statistics, funding)

use serde_json::Value;
use std::collections::HashSet;

use super::{cell_text, Table};
use crate::fetcher::pagination::TimestampKey;
use crate::fetcher::{FetcherError, FetcherResult};

/// Flatten object rows into a table.
///
/// Columns are the union of keys in first-seen order; absent keys become
/// empty cells. Rows are stably re-sorted by `timestamp_key`.
pub(super) fn to_table(rows: &[Value], timestamp_key: TimestampKey) -> FetcherResult<Table> {
    let mut columns: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut keyed: Vec<(i64, &serde_json::Map<String, Value>)> = Vec::with_capacity(rows.len());

    for row in rows {
        let Value::Object(map) = row else {
            return Err(FetcherError::ParseError(format!(
                "expected object row, got {row}"
            )));
        };
        for key in map.keys() {
            if seen.insert(key.as_str()) {
                columns.push(key.clone());
            }
        }
        keyed.push((timestamp_key.extract(row)?, map));
    }

    keyed.sort_by_key(|(ts, _)| *ts);

    let rows = keyed
        .into_iter()
        .map(|(_, map)| {
            columns
                .iter()
                .map(|column| map.get(column).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    Ok(Table { columns, rows })
}
