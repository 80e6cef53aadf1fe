//! Position sizing — per-symbol weight panels.
//!
//! Every scheme produces a weight per bar and symbol, already divided by the
//! number of tradable contracts on that bar, then forward-filled. Scaling an
//! instruction panel by such a weight panel caps gross exposure at roughly
//! one unit across the universe.
//!
//! The volatility-based schemes measure annualized log-return volatility on
//! each symbol's traded bars and rescale it onto `[1/n, 1]`; cells where the
//! estimate is not yet available stay NaN until the forward-fill has
//! something to carry.

use crate::error::PanelError;
use crate::panel::Panel;
use crate::quote::QuotePanel;
use crate::rolling::{ewm_mean, move_max, move_min, move_std, rolling_corr_mean};

/// Equal weight: `sign(close) / trading_contract`, forward-filled.
pub fn weight_by_ew(quote: &QuotePanel) -> Panel {
    let columns = (0..quote.close.n_cols())
        .map(|s| quote.close.column(s).iter().map(|&c| sign(c)).collect())
        .collect();
    finalize(quote, columns)
}

/// Inverse-volatility weight: `target / vol`, clipped to `[1/n, 1]`.
///
/// `vol` is the annualized rolling standard deviation of log returns over
/// `window` traded bars (the full window is required before the first
/// estimate).
pub fn weight_by_std_ratio(
    quote: &QuotePanel,
    window: usize,
    target: f64,
    day_count: usize,
    n: usize,
) -> Result<Panel, PanelError> {
    validate_common(window, day_count, n)?;
    if target <= 0.0 {
        return Err(PanelError::invalid("target", "must be > 0"));
    }
    let vol = annualized_vol(quote, window, window, day_count);
    let columns = vol
        .into_iter()
        .map(|col| col.into_iter().map(|v| clip(target / v, n)).collect())
        .collect();
    Ok(finalize(quote, columns))
}

/// Linear penalty weight: volatility mapped down from `std_max` onto the
/// unit interval, then rescaled to `[1/n, 1]`.
pub fn weight_by_std_minus(
    quote: &QuotePanel,
    window: usize,
    day_count: usize,
    n: usize,
    std_min: f64,
    std_max: f64,
) -> Result<Panel, PanelError> {
    validate_common(window, day_count, n)?;
    if std_max <= std_min {
        return Err(PanelError::invalid("std_max", "must exceed std_min"));
    }
    let vol = annualized_vol(quote, window, 100.min(window), day_count);
    let columns = vol
        .into_iter()
        .map(|col| {
            col.into_iter()
                .map(|v| {
                    let w = (std_max - v) / (std_max - std_min);
                    clip(rescale(w, n), n)
                })
                .collect()
        })
        .collect();
    Ok(finalize(quote, columns))
}

/// Volatility-plus-correlation penalty weight.
///
/// The score per symbol is annualized volatility plus the mean absolute
/// rolling correlation of its log returns against the whole universe (self
/// included); a crowded, volatile symbol scores high and is weighted down.
pub fn weight_by_std_corr(
    quote: &QuotePanel,
    window: usize,
    day_count: usize,
    n: usize,
    thres_min: f64,
    thres_max: f64,
) -> Result<Panel, PanelError> {
    validate_common(window, day_count, n)?;
    if thres_max <= thres_min {
        return Err(PanelError::invalid("thres_max", "must exceed thres_min"));
    }
    let vol = annualized_vol(quote, window, 100.min(window), day_count);
    let corr = mean_abs_corr(quote, window);
    let columns = vol
        .into_iter()
        .zip(corr)
        .map(|(vcol, ccol)| {
            vcol.into_iter()
                .zip(ccol)
                .map(|(v, c)| {
                    let w = (thres_max - (v + c)) / (thres_max - thres_min);
                    clip(rescale(w, n), n)
                })
                .collect()
        })
        .collect();
    Ok(finalize(quote, columns))
}

/// Three-signal blend: the volatility-plus-correlation score blended with
/// the absolute short-term momentum oscillator, two parts to one.
pub fn weight_by_3d(
    quote: &QuotePanel,
    window: usize,
    day_count: usize,
    n: usize,
    thres_min: f64,
    thres_max: f64,
) -> Result<Panel, PanelError> {
    validate_common(window, day_count, n)?;
    if thres_max <= thres_min {
        return Err(PanelError::invalid("thres_max", "must exceed thres_min"));
    }
    let vol = annualized_vol(quote, window, 100.min(window), day_count);
    let corr = mean_abs_corr(quote, window);
    let stm = stm_oscillator(quote, window);
    let columns = vol
        .into_iter()
        .zip(corr)
        .zip(stm)
        .map(|((vcol, ccol), mcol)| {
            vcol.into_iter()
                .zip(ccol)
                .zip(mcol)
                .map(|((v, c), m)| {
                    let w = (thres_max - (v + c)) / (thres_max - thres_min);
                    let blended = w * 2.0 / 3.0 + m.abs() / 3.0;
                    clip(rescale(blended, n), n)
                })
                .collect()
        })
        .collect();
    Ok(finalize(quote, columns))
}

/// Short-term momentum oscillator, one column per symbol on the full index.
///
/// On each symbol's traded bars: `ewm5(2·close - (hh + ll)) / ewm5(hh - ll)`
/// where `hh` / `ll` are the rolling extreme of high / low over `window`
/// bars (from the first bar on). Bounded in `[-1, 1]`.
pub fn stm_oscillator(quote: &QuotePanel, window: usize) -> Vec<Vec<f64>> {
    let n = quote.close.n_rows();
    (0..quote.close.n_cols())
        .map(|s| {
            let h = quote.high.column(s);
            let l = quote.low.column(s);
            let c = quote.close.column(s);
            let valid: Vec<usize> = (0..n)
                .filter(|&t| !h[t].is_nan() && !l[t].is_nan() && !c[t].is_nan())
                .collect();
            let highs: Vec<f64> = valid.iter().map(|&t| h[t]).collect();
            let lows: Vec<f64> = valid.iter().map(|&t| l[t]).collect();
            let hh = move_max(&highs, window, 1);
            let ll = move_min(&lows, window, 1);

            let num: Vec<f64> = valid
                .iter()
                .enumerate()
                .map(|(k, &t)| c[t] * 2.0 - (hh[k] + ll[k]))
                .collect();
            let den: Vec<f64> = hh.iter().zip(&ll).map(|(&a, &b)| a - b).collect();
            let num = ewm_mean(&num, 5.0);
            let den = ewm_mean(&den, 5.0);

            let mut out = vec![f64::NAN; n];
            for (k, &t) in valid.iter().enumerate() {
                // a flat high/low envelope has no momentum to measure
                out[t] = if den[k] == 0.0 { 0.0 } else { num[k] / den[k] };
            }
            out
        })
        .collect()
}

/// Annualized rolling volatility of log returns, one column per symbol on
/// the full index. The window counts traded bars, not calendar bars.
fn annualized_vol(
    quote: &QuotePanel,
    window: usize,
    min_periods: usize,
    day_count: usize,
) -> Vec<Vec<f64>> {
    let factor = (252.0 * day_count as f64).sqrt();
    let n = quote.close.n_rows();
    (0..quote.close.n_cols())
        .map(|s| {
            let (values, rows) = log_returns(quote.close.column(s));
            let std = move_std(&values, window, min_periods, 1);
            let mut out = vec![f64::NAN; n];
            for (k, &t) in rows.iter().enumerate() {
                out[t] = std[k] * factor;
            }
            out
        })
        .collect()
}

/// Mean absolute pairwise rolling correlation of log returns; the window
/// counts calendar bars since the return columns live on the full index.
fn mean_abs_corr(quote: &QuotePanel, window: usize) -> Vec<Vec<f64>> {
    let n = quote.close.n_rows();
    let r_mat: Vec<Vec<f64>> = (0..quote.close.n_cols())
        .map(|s| {
            let (values, rows) = log_returns(quote.close.column(s));
            let mut out = vec![f64::NAN; n];
            for (k, &t) in rows.iter().enumerate() {
                out[t] = values[k];
            }
            out
        })
        .collect();
    rolling_corr_mean(&r_mat, window, 100.min(window))
}

/// Log returns on a column's traded bars: `(values, source_rows)`, with a
/// NaN in front of the first traded bar (no prior close).
fn log_returns(close: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let rows: Vec<usize> = (0..close.len()).filter(|&t| !close[t].is_nan()).collect();
    let mut values = vec![f64::NAN; rows.len()];
    for k in 1..rows.len() {
        values[k] = (close[rows[k]] / close[rows[k - 1]]).ln();
    }
    (values, rows)
}

fn rescale(w: f64, n: usize) -> f64 {
    (w * (n - 1) as f64 + 1.0) / n as f64
}

/// Clip onto `[1/n, 1]`; NaN passes through.
fn clip(w: f64, n: usize) -> f64 {
    if w > 1.0 {
        1.0
    } else if w < 1.0 / n as f64 {
        1.0 / n as f64
    } else {
        w
    }
}

fn sign(v: f64) -> f64 {
    if v.is_nan() || v == 0.0 {
        v
    } else {
        v.signum()
    }
}

fn validate_common(window: usize, day_count: usize, n: usize) -> Result<(), PanelError> {
    if window == 0 {
        return Err(PanelError::invalid("window", "must be >= 1"));
    }
    if day_count == 0 {
        return Err(PanelError::invalid("day_count", "must be >= 1"));
    }
    if n == 0 {
        return Err(PanelError::invalid("n", "must be >= 1"));
    }
    Ok(())
}

/// Divide each row by the tradable-contract count and forward-fill.
fn finalize(quote: &QuotePanel, columns: Vec<Vec<f64>>) -> Panel {
    let tc = quote.trading_contract();
    let mut out = quote.close.clone();
    for (s, col) in columns.into_iter().enumerate() {
        for (t, v) in col.into_iter().enumerate() {
            out.set(t, s, v / tc[t]);
        }
    }
    out.ffill()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::{QuotePanel, QuoteRow};
    use crate::testutil::{dt_index, lcg_walk, quote_rows_from_closes};

    #[test]
    fn ew_splits_across_trading_symbols() {
        let idx = dt_index(3);
        let mut rows = quote_rows_from_closes(&idx, &[("a", &[1.0, 1.0, 1.0])]);
        rows.extend(quote_rows_from_closes(&idx[1..], &[("b", &[2.0, 2.0])]));
        let q = QuotePanel::from_rows(rows).unwrap();
        let w = weight_by_ew(&q);
        assert_eq!(w.get(0, 0), 1.0); // only contract trading
        assert_eq!(w.get(1, 0), 0.5);
        assert_eq!(w.get(1, 1), 0.5);
        assert!(w.get(0, 1).is_nan()); // not yet listed, nothing to fill
    }

    #[test]
    fn ew_carries_weight_through_missing_bars() {
        let idx = dt_index(3);
        let rows = quote_rows_from_closes(&idx, &[("a", &[1.0, f64::NAN, 1.0])]);
        let q = QuotePanel::from_rows(rows).unwrap();
        let w = weight_by_ew(&q);
        assert_eq!(w.get(1, 0), 1.0); // forward-filled over the gap
    }

    #[test]
    fn std_ratio_clips_high_vol_to_floor() {
        let idx = dt_index(8);
        let closes: Vec<f64> = (0..8)
            .map(|t| if t % 2 == 0 { 100.0 } else { 200.0 })
            .collect();
        let rows = quote_rows_from_closes(&idx, &[("a", &closes)]);
        let q = QuotePanel::from_rows(rows).unwrap();
        let w = weight_by_std_ratio(&q, 3, 0.1, 1, 3).unwrap();
        // annualized vol of +-69% bar returns dwarfs the 10% target
        assert!((w.get(7, 0) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn std_ratio_clips_low_vol_to_one() {
        let idx = dt_index(8);
        let closes: Vec<f64> = (0..8).map(|t| 100.0 + 1e-6 * t as f64).collect();
        let rows = quote_rows_from_closes(&idx, &[("a", &closes)]);
        let q = QuotePanel::from_rows(rows).unwrap();
        let w = weight_by_std_ratio(&q, 3, 0.1, 1, 3).unwrap();
        assert!((w.get(7, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn std_minus_rewards_quiet_series() {
        let idx = dt_index(10);
        let closes: Vec<f64> = (0..10).map(|t| 100.0 + 1e-6 * t as f64).collect();
        let rows = quote_rows_from_closes(&idx, &[("a", &closes)]);
        let q = QuotePanel::from_rows(rows).unwrap();
        let w = weight_by_std_minus(&q, 4, 1, 3, 0.1, 0.45).unwrap();
        // vol ~ 0 < std_min: mapped above 1 and clipped down
        assert!((w.get(9, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn std_corr_floors_crowded_volatile_symbols() {
        let idx = dt_index(12);
        let walk = lcg_walk(12, 7, 100.0);
        let rows = quote_rows_from_closes(&idx, &[("a", &walk), ("b", &walk)]);
        let q = QuotePanel::from_rows(rows).unwrap();
        let w = weight_by_std_corr(&q, 5, 23, 3, 0.25, 0.65).unwrap();
        // identical series: correlation 1, score > thres_max, clipped to
        // 1/n and split across 2 contracts
        assert!((w.get(11, 0) - 1.0 / 6.0).abs() < 1e-9);
        assert!((w.get(11, 1) - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn three_d_weight_stays_inside_bounds() {
        let idx = dt_index(40);
        let rows = quote_rows_from_closes(&idx, &[("a", &lcg_walk(40, 3, 100.0))]);
        let q = QuotePanel::from_rows(rows).unwrap();
        let w = weight_by_3d(&q, 6, 23, 3, 0.25, 0.65).unwrap();
        for t in 10..40 {
            let v = w.get(t, 0);
            assert!(v >= 1.0 / 3.0 - 1e-12 && v <= 1.0 + 1e-12, "t={t} v={v}");
        }
    }

    #[test]
    fn stm_oscillator_is_bounded() {
        let idx = dt_index(30);
        let rows = quote_rows_from_closes(&idx, &[("a", &lcg_walk(30, 11, 50.0))]);
        let q = QuotePanel::from_rows(rows).unwrap();
        let stm = stm_oscillator(&q, 8);
        for &v in &stm[0] {
            assert!(v.is_nan() || (-1.0 - 1e-9..=1.0 + 1e-9).contains(&v));
        }
    }

    #[test]
    fn stm_flat_envelope_is_zero_not_nan() {
        let idx = dt_index(30);
        let rows: Vec<QuoteRow> = idx
            .iter()
            .map(|&datetime| QuoteRow {
                datetime,
                symbol: "a".into(),
                open_price: 100.0,
                high_price: 100.0,
                low_price: 100.0,
                close_price: 100.0,
                volume: 1000.0,
                turnover: 100_000.0,
                open_interest: 500.0,
            })
            .collect();
        let q = QuotePanel::from_rows(rows).unwrap();
        let stm = stm_oscillator(&q, 8);
        for (t, &v) in stm[0].iter().enumerate() {
            assert_eq!(v, 0.0, "row {t}");
        }
    }
}
