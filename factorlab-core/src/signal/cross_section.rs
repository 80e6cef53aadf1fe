//! Cross-sectional ranking signal.

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};
use crate::rolling::interpolated_quantile;

/// Rank symbols against each other at a fixed sampling interval.
///
/// At every `cs_interval`-th bar, symbols at or above the
/// `1 - cs_quantile` row quantile get positive weight, symbols at or below
/// the `cs_quantile` row quantile negative weight, each side normalized by
/// its membership count. This emits a *continuous* portfolio-weight signal
/// (`Some(0.0)` for the middle of the book), not an entry/exit edge signal.
/// Rows where no symbol has a value emit nothing.
pub fn trade_by_cs(
    feature: &Panel,
    cs_interval: usize,
    cs_quantile: f64,
) -> Result<SignalPanel, PanelError> {
    if cs_interval < 1 {
        return Err(PanelError::invalid("cs_interval", "must be >= 1"));
    }
    if !(0.0..=0.5).contains(&cs_quantile) || cs_quantile == 0.0 {
        return Err(PanelError::invalid(
            "cs_quantile",
            format!("must be in (0, 0.5], got {cs_quantile}"),
        ));
    }

    let mut out = SignalPanel::empty_like(feature);
    let n_cols = feature.n_cols();
    let mut row_values: Vec<f64> = Vec::with_capacity(n_cols);

    for t in (0..feature.n_rows()).step_by(cs_interval) {
        row_values.clear();
        row_values.extend(
            (0..n_cols)
                .map(|s| feature.get(t, s))
                .filter(|v| !v.is_nan()),
        );
        if row_values.is_empty() {
            continue;
        }
        row_values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let lower = interpolated_quantile(&row_values, cs_quantile);
        let upper = interpolated_quantile(&row_values, 1.0 - cs_quantile);

        let in_upper: Vec<bool> = (0..n_cols)
            .map(|s| feature.get(t, s) >= upper)
            .collect();
        let in_lower: Vec<bool> = (0..n_cols)
            .map(|s| feature.get(t, s) <= lower)
            .collect();
        let n_upper = in_upper.iter().filter(|&&b| b).count() as f64;
        let n_lower = in_lower.iter().filter(|&&b| b).count() as f64;

        for s in 0..n_cols {
            let long_leg = if in_upper[s] { 1.0 / n_upper } else { 0.0 };
            let short_leg = if in_lower[s] { 1.0 / n_lower } else { 0.0 };
            out.set(t, s, Some(long_leg - short_leg));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::multi_panel;

    #[test]
    fn top_and_bottom_quantile_offset() {
        let f = multi_panel(&[
            ("a", &[1.0, 1.0]),
            ("b", &[2.0, 2.0]),
            ("c", &[3.0, 3.0]),
            ("d", &[4.0, 4.0]),
        ]);
        let sig = trade_by_cs(&f, 1, 0.25).unwrap();
        // lower quantile = 1.75, upper = 3.25 -> only 'a' short, only 'd' long
        assert_eq!(sig.get(0, 0), Some(-1.0));
        assert_eq!(sig.get(0, 1), Some(0.0));
        assert_eq!(sig.get(0, 2), Some(0.0));
        assert_eq!(sig.get(0, 3), Some(1.0));
        // weights on each side sum to +-1
        let total: f64 = (0..4).map(|s| sig.get(0, s).unwrap()).sum();
        assert!(total.abs() < 1e-12);
    }

    #[test]
    fn sampling_interval_skips_rows() {
        let f = multi_panel(&[("a", &[1.0, 1.0, 1.0]), ("b", &[2.0, 2.0, 2.0])]);
        let sig = trade_by_cs(&f, 2, 0.5).unwrap();
        assert!(sig.get(0, 0).is_some());
        assert!(sig.get(1, 0).is_none());
        assert!(sig.get(2, 0).is_some());
    }

    #[test]
    fn nan_symbol_gets_explicit_zero() {
        let f = multi_panel(&[
            ("a", &[1.0]),
            ("b", &[f64::NAN]),
            ("c", &[3.0]),
        ]);
        let sig = trade_by_cs(&f, 1, 0.5).unwrap();
        assert_eq!(sig.get(0, 1), Some(0.0));
    }
}
