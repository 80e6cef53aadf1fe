//! Shared helpers for unit, integration, and property tests.
//!
//! Kept in the library (not `tests/`) so in-file `#[cfg(test)]` modules,
//! the `tests/` directory, and benches can all use the same fixtures.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::panel::Panel;
use crate::quote::QuoteRow;

/// A strictly increasing daily index of `n` timestamps.
pub fn dt_index(n: usize) -> Vec<NaiveDateTime> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(15, 0, 0)
        .unwrap();
    (0..n).map(|i| base + Duration::days(i as i64)).collect()
}

/// An intraday index: `bars_per_day` hourly bars per calendar day.
pub fn dt_index_intraday(days: usize, bars_per_day: usize) -> Vec<NaiveDateTime> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let mut out = Vec::with_capacity(days * bars_per_day);
    for d in 0..days {
        for b in 0..bars_per_day {
            out.push(base + Duration::days(d as i64) + Duration::hours(b as i64));
        }
    }
    out
}

/// Single-column panel from a value slice.
pub fn single_panel(values: &[f64]) -> Panel {
    Panel::new(dt_index(values.len()), vec!["a".into()], vec![values.to_vec()]).unwrap()
}

/// Multi-column panel from (symbol, values) pairs sharing one index.
pub fn multi_panel(columns: &[(&str, &[f64])]) -> Panel {
    let n = columns[0].1.len();
    Panel::new(
        dt_index(n),
        columns.iter().map(|(s, _)| s.to_string()).collect(),
        columns.iter().map(|(_, v)| v.to_vec()).collect(),
    )
    .unwrap()
}

/// Quote rows for symbols over a slice of the index; a NaN close skips the
/// bar (no row, so the pivot leaves the cell NaN). OHLC is derived from the
/// close with a fixed spread.
pub fn quote_rows_from_closes(
    index: &[NaiveDateTime],
    columns: &[(&str, &[f64])],
) -> Vec<QuoteRow> {
    let mut rows = Vec::new();
    for (symbol, closes) in columns {
        assert_eq!(closes.len(), index.len(), "closes must match index length");
        for (t, &close) in closes.iter().enumerate() {
            if close.is_nan() {
                continue;
            }
            rows.push(QuoteRow {
                datetime: index[t],
                symbol: symbol.to_string(),
                open_price: close * 0.995,
                high_price: close * 1.01,
                low_price: close * 0.99,
                close_price: close,
                volume: 1000.0,
                turnover: close * 1000.0,
                open_interest: 500.0,
            });
        }
    }
    rows
}

/// Deterministic pseudo-random walk via an LCG; no RNG crate needed here.
pub fn lcg_walk(n: usize, seed: u64, start: f64) -> Vec<f64> {
    let mut state = seed;
    let mut price = start;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let step = ((state >> 33) % 200) as f64 - 100.0;
            price += step * 0.05;
            price = price.max(10.0);
            price
        })
        .collect()
}
