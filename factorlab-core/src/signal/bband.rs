//! Bollinger-band breakout signal.

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};
use crate::rolling::{move_mean, move_std};

use super::one_shot_collapse;

/// Band-breakout entries against a rolling mean ± k·std envelope.
///
/// Unlike the per-subsequence generators this works on the raw panel rows
/// (a NaN bar inside the window suppresses the band there), comparing the
/// previous row's feature against the current band. Population std
/// (`ddof = 0`). One-shot.
pub fn trade_by_bband(
    feature: &Panel,
    window: usize,
    std_multiplier: f64,
) -> Result<SignalPanel, PanelError> {
    if window < 2 {
        return Err(PanelError::invalid("window", "must be >= 2"));
    }
    if std_multiplier <= 0.0 {
        return Err(PanelError::invalid("std_multiplier", "must be > 0"));
    }

    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let col = feature.column(s);
        let ma = move_mean(col, window, window);
        let std = move_std(col, window, window, 0);

        let mut raw: Vec<Option<f64>> = vec![None; col.len()];
        for t in 0..col.len() {
            let f = col[t];
            let f_prev = if t > 0 { col[t - 1] } else { f64::NAN };
            let upper = ma[t] + std[t] * std_multiplier;
            let lower = ma[t] - std[t] * std_multiplier;
            if f > upper && f_prev <= upper {
                raw[t] = Some(1.0);
            }
            if f < lower && f_prev >= lower {
                raw[t] = Some(-1.0);
            }
        }

        let sparse = one_shot_collapse(&raw);
        for (t, v) in sparse.into_iter().enumerate() {
            if v.is_some() {
                out.set(t, s, v);
            }
        }
    }
    Ok(out)
}
