//! Zero-cross signal generators.

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};
use crate::rolling::move_mean;

use super::{compact_column, scatter_column};

/// Sign change of the raw feature.
///
/// Long when the feature crosses above zero, short when it crosses below.
/// The comparison uses the previous panel row, so a NaN bar breaks the
/// crossing (no instruction). Already sparse — no collapse.
pub fn trade_by_cross(feature: &Panel) -> SignalPanel {
    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let col = feature.column(s);
        for t in 1..col.len() {
            let f = col[t];
            let f_prev = col[t - 1];
            if f > 0.0 && f_prev <= 0.0 {
                out.set(t, s, Some(1.0));
            }
            if f < 0.0 && f_prev >= 0.0 {
                out.set(t, s, Some(-1.0));
            }
        }
    }
    out
}

/// Sign change of the feature minus its rolling mean.
///
/// Computed on each column's valid subsequence (`min_periods = 1`, so the
/// mean exists from the first observation). No collapse — crossings are
/// already edges.
pub fn trade_by_cross_ma(feature: &Panel, window: usize) -> Result<SignalPanel, PanelError> {
    if window < 1 {
        return Err(PanelError::invalid("window", "must be >= 1"));
    }
    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let (rows, ft) = compact_column(feature.column(s));
        if ft.is_empty() {
            continue;
        }
        let ma = move_mean(&ft, window, 1);
        let cross: Vec<f64> = ft.iter().zip(&ma).map(|(f, m)| f - m).collect();

        let mut raw: Vec<Option<f64>> = vec![None; ft.len()];
        for i in 1..ft.len() {
            if cross[i] > 0.0 && cross[i - 1] <= 0.0 {
                raw[i] = Some(1.0);
            }
            if cross[i] < 0.0 && cross[i - 1] >= 0.0 {
                raw[i] = Some(-1.0);
            }
        }
        scatter_column(&mut out, s, &rows, &raw);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::single_panel;

    #[test]
    fn cross_marks_sign_changes_only() {
        let f = single_panel(&[-1.0, 1.0, 2.0, -0.5, -0.5, 3.0]);
        let sig = trade_by_cross(&f);
        assert_eq!(sig.get(0, 0), None);
        assert_eq!(sig.get(1, 0), Some(1.0));
        assert_eq!(sig.get(2, 0), None);
        assert_eq!(sig.get(3, 0), Some(-1.0));
        assert_eq!(sig.get(4, 0), None);
        assert_eq!(sig.get(5, 0), Some(1.0));
    }

    #[test]
    fn nan_bar_breaks_the_crossing() {
        let f = single_panel(&[-1.0, f64::NAN, 1.0]);
        let sig = trade_by_cross(&f);
        assert_eq!(sig.get(2, 0), None);
    }

    #[test]
    fn cross_ma_fires_on_mean_crossings() {
        // flat at 10, spike to 20: feature jumps above its trailing mean
        let f = single_panel(&[10.0, 10.0, 10.0, 20.0, 5.0]);
        let sig = trade_by_cross_ma(&f, 3).unwrap();
        assert_eq!(sig.get(3, 0), Some(1.0));
        assert_eq!(sig.get(4, 0), Some(-1.0));
    }
}
