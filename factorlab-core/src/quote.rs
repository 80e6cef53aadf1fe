//! Quote panel — the OHLCV bundle the engine consumes from the data layer.
//!
//! Callers hand the engine long-form quote rows (one row per bar and
//! symbol); construction sorts, validates the schema, and pivots into
//! aligned time × symbol panels. The engine never goes back to the source —
//! everything downstream works on these panels.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::error::PanelError;
use crate::panel::Panel;

/// One bar of one symbol, as delivered by the data-access layer.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    pub datetime: NaiveDateTime,
    pub symbol: String,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub volume: f64,
    pub turnover: f64,
    pub open_interest: f64,
}

/// Aligned OHLCV panels for a universe of symbols.
///
/// All member panels share the same index and symbol order (symbols sorted
/// lexicographically). Cells where a symbol has no bar are NaN.
#[derive(Debug, Clone)]
pub struct QuotePanel {
    pub open: Panel,
    pub high: Panel,
    pub low: Panel,
    pub close: Panel,
    pub volume: Panel,
    pub turnover: Panel,
    pub open_interest: Panel,
}

impl QuotePanel {
    /// Pivot long-form rows into aligned panels.
    ///
    /// Rows may arrive in any order; the index is the sorted union of bar
    /// timestamps. Duplicate (datetime, symbol) pairs are rejected.
    pub fn from_rows(mut rows: Vec<QuoteRow>) -> Result<Self, PanelError> {
        if rows.is_empty() {
            return Err(PanelError::EmptyPanel);
        }
        rows.sort_by(|a, b| (a.datetime, &a.symbol).cmp(&(b.datetime, &b.symbol)));

        let mut index: Vec<NaiveDateTime> = Vec::new();
        for r in &rows {
            if index.last() != Some(&r.datetime) {
                index.push(r.datetime);
            }
        }
        // rows are sorted, so a repeated timestamp can only be adjacent
        index.dedup();

        let mut symbols: Vec<String> = rows.iter().map(|r| r.symbol.clone()).collect();
        symbols.sort();
        symbols.dedup();

        let row_of: HashMap<NaiveDateTime, usize> =
            index.iter().enumerate().map(|(i, &t)| (t, i)).collect();
        let col_of: HashMap<&str, usize> = symbols
            .iter()
            .enumerate()
            .map(|(j, s)| (s.as_str(), j))
            .collect();

        let n = index.len();
        let blank = || vec![vec![f64::NAN; n]; symbols.len()];
        let mut open = blank();
        let mut high = blank();
        let mut low = blank();
        let mut close = blank();
        let mut volume = blank();
        let mut turnover = blank();
        let mut open_interest = blank();

        let mut last_cell: Option<(NaiveDateTime, String)> = None;
        for r in rows {
            let cell = (r.datetime, r.symbol.clone());
            if last_cell.as_ref() == Some(&cell) {
                return Err(PanelError::invalid(
                    "rows",
                    format!("duplicate bar for '{}' at {}", r.symbol, r.datetime),
                ));
            }
            let t = row_of[&r.datetime];
            let s = col_of[r.symbol.as_str()];
            open[s][t] = r.open_price;
            high[s][t] = r.high_price;
            low[s][t] = r.low_price;
            close[s][t] = r.close_price;
            volume[s][t] = r.volume;
            turnover[s][t] = r.turnover;
            open_interest[s][t] = r.open_interest;
            last_cell = Some(cell);
        }

        let build = |cols: Vec<Vec<f64>>| Panel::new(index.clone(), symbols.clone(), cols);
        Ok(Self {
            open: build(open)?,
            high: build(high)?,
            low: build(low)?,
            close: build(close)?,
            volume: build(volume)?,
            turnover: build(turnover)?,
            open_interest: build(open_interest)?,
        })
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        self.close.index()
    }

    pub fn symbols(&self) -> &[String] {
        self.close.symbols()
    }

    /// Forward return per bar: the return realized by holding from bar `t`
    /// to the symbol's next traded bar.
    ///
    /// Computed on each symbol's valid subsequence, so non-trading bars in
    /// between do not break the chain. A signal computed with information
    /// available at `t` multiplies directly against `ret[t]` with no
    /// lookahead.
    pub fn forward_returns(&self) -> Panel {
        let mut ret = self.close.map(|_| f64::NAN);
        for s in 0..self.close.n_cols() {
            let col = self.close.column(s);
            let valid: Vec<usize> = (0..col.len()).filter(|&t| !col[t].is_nan()).collect();
            for w in valid.windows(2) {
                let (t0, t1) = (w[0], w[1]);
                ret.set(t0, s, col[t1] / col[t0] - 1.0);
            }
        }
        ret
    }

    /// Count of tradable symbols per bar: non-NaN forward-filled close.
    pub fn trading_contract(&self) -> Vec<f64> {
        let filled = self.close.ffill();
        (0..filled.n_rows())
            .map(|t| {
                (0..filled.n_cols())
                    .filter(|&s| !filled.get(t, s).is_nan())
                    .count() as f64
            })
            .collect()
    }

    /// Modal number of bars per symbol per calendar date.
    pub fn infer_day_count(&self) -> usize {
        let mut counts: HashMap<(usize, chrono::NaiveDate), usize> = HashMap::new();
        for s in 0..self.close.n_cols() {
            let col = self.close.column(s);
            for (t, &v) in col.iter().enumerate() {
                if !v.is_nan() {
                    *counts.entry((s, self.index()[t].date())).or_insert(0) += 1;
                }
            }
        }
        let mut freq: HashMap<usize, usize> = HashMap::new();
        for &c in counts.values() {
            *freq.entry(c).or_insert(0) += 1;
        }
        freq.into_iter()
            .max_by_key(|&(count, occurrences)| (occurrences, std::cmp::Reverse(count)))
            .map_or(1, |(count, _)| count)
    }

    /// Wilder-smoothed Average True Range per symbol.
    ///
    /// Computed on each symbol's valid subsequence (bars where high, low and
    /// close all exist) and scattered back to the full index. The first
    /// valid bar's true range is `high - low`; afterwards
    /// `max(h - l, |h - prev_c|, |l - prev_c|)`.
    pub fn atr(&self, period: usize) -> Result<Panel, PanelError> {
        if period == 0 {
            return Err(PanelError::invalid("period", "must be >= 1"));
        }
        let mut out = self.close.map(|_| f64::NAN);
        for s in 0..self.close.n_cols() {
            let h = self.high.column(s);
            let l = self.low.column(s);
            let c = self.close.column(s);
            let valid: Vec<usize> = (0..c.len())
                .filter(|&t| !h[t].is_nan() && !l[t].is_nan() && !c[t].is_nan())
                .collect();
            if valid.is_empty() {
                continue;
            }

            let mut tr = Vec::with_capacity(valid.len());
            tr.push(h[valid[0]] - l[valid[0]]);
            for w in valid.windows(2) {
                let (prev, t) = (w[0], w[1]);
                let range = (h[t] - l[t])
                    .max((h[t] - c[prev]).abs())
                    .max((l[t] - c[prev]).abs());
                tr.push(range);
            }

            let smoothed = wilder_smooth(&tr, period);
            for (k, &t) in valid.iter().enumerate() {
                out.set(t, s, smoothed[k]);
            }
        }
        Ok(out)
    }
}

/// Wilder smoothing: seed with the mean of the first `period` values, then
/// `prev + alpha * (value - prev)` with `alpha = 1 / period`.
fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if n < period {
        return out;
    }
    let seed: f64 = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for t in period..n {
        prev += alpha * (values[t] - prev);
        out[t] = prev;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{dt_index, quote_rows_from_closes};

    #[test]
    fn pivot_sorts_symbols_and_fills_gaps_with_nan() {
        let idx = dt_index(3);
        let mut rows = quote_rows_from_closes(&idx, &[("zz", &[1.0, 2.0, 3.0])]);
        rows.extend(quote_rows_from_closes(
            &idx[1..],
            &[("aa", &[10.0, 11.0])],
        ));
        let q = QuotePanel::from_rows(rows).unwrap();
        assert_eq!(q.symbols(), &["aa".to_string(), "zz".to_string()]);
        assert!(q.close.get(0, 0).is_nan());
        assert_eq!(q.close.get(1, 0), 10.0);
        assert_eq!(q.close.get(0, 1), 1.0);
    }

    #[test]
    fn duplicate_bar_rejected() {
        let idx = dt_index(1);
        let mut rows = quote_rows_from_closes(&idx, &[("a", &[1.0])]);
        rows.extend(quote_rows_from_closes(&idx, &[("a", &[1.0])]));
        assert!(QuotePanel::from_rows(rows).is_err());
    }

    #[test]
    fn forward_returns_shift_and_skip_gaps() {
        let idx = dt_index(4);
        let mut rows = quote_rows_from_closes(&idx, &[("a", &[100.0, 110.0, f64::NAN, 121.0])]);
        // a second symbol trades every bar and keeps the halted bar in the index
        rows.extend(quote_rows_from_closes(&idx, &[("b", &[50.0, 50.0, 50.0, 50.0])]));
        let q = QuotePanel::from_rows(rows).unwrap();
        let ret = q.forward_returns();
        assert!((ret.get(0, 0) - 0.10).abs() < 1e-12);
        // bar 1's next traded bar is bar 3
        assert!((ret.get(1, 0) - 0.10).abs() < 1e-12);
        assert!(ret.get(2, 0).is_nan());
        assert!(ret.get(3, 0).is_nan()); // no next bar
    }

    #[test]
    fn trading_contract_counts_ffilled_close() {
        let idx = dt_index(3);
        let mut rows = quote_rows_from_closes(&idx, &[("a", &[1.0, f64::NAN, 1.0])]);
        rows.extend(quote_rows_from_closes(&idx[1..], &[("b", &[2.0, 2.0])]));
        let q = QuotePanel::from_rows(rows).unwrap();
        assert_eq!(q.trading_contract(), vec![1.0, 2.0, 2.0]);
    }

    #[test]
    fn atr_seed_is_mean_true_range() {
        let idx = dt_index(5);
        let rows = quote_rows_from_closes(&idx, &[("a", &[10.0, 11.0, 10.5, 11.5, 12.0])]);
        let q = QuotePanel::from_rows(rows).unwrap();
        let atr = q.atr(3).unwrap();
        assert!(atr.get(0, 0).is_nan());
        assert!(atr.get(1, 0).is_nan());
        assert!(!atr.get(2, 0).is_nan());
    }
}
