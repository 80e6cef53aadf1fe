//! Synthetic quote generation for tests and demos.
//!
//! Geometric random walks with OHLC derived from the close, seeded so every
//! caller gets a reproducible panel without shipping fixture files.

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use factorlab_core::quote::{QuotePanel, QuoteRow};

/// Generate daily random-walk quotes for `symbols` over `rows` bars.
///
/// Each symbol walks independently from its own sub-seed, so adding a symbol
/// does not perturb the others.
pub fn synthetic_quotes(symbols: &[&str], rows: usize, seed: u64) -> QuotePanel {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(15, 0, 0)
        .unwrap();

    let mut out = Vec::with_capacity(symbols.len() * rows);
    for (s, symbol) in symbols.iter().enumerate() {
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(s as u64));
        let mut close = 100.0 * (1.0 + s as f64 * 0.5);
        for t in 0..rows {
            let drift: f64 = rng.gen_range(-0.015..0.015);
            let prev = close;
            close = (close * (1.0 + drift)).max(1.0);
            let high = prev.max(close) * (1.0 + rng.gen_range(0.0..0.005));
            let low = prev.min(close) * (1.0 - rng.gen_range(0.0..0.005));
            let volume = rng.gen_range(10_000.0..200_000.0_f64).round();
            out.push(QuoteRow {
                datetime: base + Duration::days(t as i64),
                symbol: symbol.to_string(),
                open_price: prev,
                high_price: high,
                low_price: low,
                close_price: close,
                volume,
                turnover: volume * close,
                open_interest: rng.gen_range(50_000.0..300_000.0_f64).round(),
            });
        }
    }
    // the generator always emits at least one row per symbol
    QuotePanel::from_rows(out).expect("synthetic rows are well-formed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_the_panel() {
        let a = synthetic_quotes(&["cu", "rb"], 30, 42);
        let b = synthetic_quotes(&["cu", "rb"], 30, 42);
        for t in 0..30 {
            assert_eq!(a.close.get(t, 0), b.close.get(t, 0));
            assert_eq!(a.close.get(t, 1), b.close.get(t, 1));
        }
    }

    #[test]
    fn adding_a_symbol_leaves_existing_walks_unchanged() {
        let two = synthetic_quotes(&["cu", "rb"], 20, 7);
        let three = synthetic_quotes(&["cu", "rb", "zn"], 20, 7);
        for t in 0..20 {
            assert_eq!(two.close.get(t, 0), three.close.get(t, 0));
        }
    }

    #[test]
    fn bars_are_internally_consistent() {
        let q = synthetic_quotes(&["a"], 50, 1);
        for t in 0..50 {
            let (h, l, c) = (q.high.get(t, 0), q.low.get(t, 0), q.close.get(t, 0));
            assert!(h >= c && l <= c, "bar {t}: high {h} low {l} close {c}");
            assert!(c >= 1.0);
        }
    }
}
