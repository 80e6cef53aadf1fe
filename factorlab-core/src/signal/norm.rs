//! Envelope signal generators: fixed normal envelope and rolling mean ± k·std.

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};
use crate::rolling::{move_mean, move_std};

use super::{compact_column, one_shot_collapse, scatter_column};

/// Pre-normalized feature against a fixed `0 ± k·1` envelope.
///
/// The feature is assumed already standardized; entries fire outside the
/// envelope, closes on a cross of the zero mean. One-shot.
pub fn trade_by_norm(feature: &Panel, std_multiplier: f64) -> Result<SignalPanel, PanelError> {
    if std_multiplier <= 0.0 {
        return Err(PanelError::invalid("std_multiplier", "must be > 0"));
    }
    let upper = std_multiplier;
    let lower = -std_multiplier;

    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let (rows, ft) = compact_column(feature.column(s));
        if ft.is_empty() {
            continue;
        }
        let mut raw: Vec<Option<f64>> = vec![None; ft.len()];
        for i in 0..ft.len() {
            let f = ft[i];
            let f_prev = if i > 0 { ft[i - 1] } else { f64::NAN };
            if f > upper {
                raw[i] = Some(1.0);
            }
            if f < 0.0 && f_prev > 0.0 {
                raw[i] = Some(0.0);
            }
            if f < lower {
                raw[i] = Some(-1.0);
            }
            if f > 0.0 && f_prev < 0.0 {
                raw[i] = Some(0.0);
            }
        }
        let sparse = one_shot_collapse(&raw);
        scatter_column(&mut out, s, &rows, &sparse);
    }
    Ok(out)
}

/// Rolling mean ± k·std envelope, entries only (positions flip on the
/// opposite entry, never close to flat). One-shot.
pub fn trade_by_std(
    feature: &Panel,
    window: usize,
    std_multiplier: f64,
) -> Result<SignalPanel, PanelError> {
    trade_by_std_impl(feature, window, std_multiplier, false)
}

/// Rolling mean ± k·std envelope with explicit closes on a cross of the
/// rolling mean. One-shot.
pub fn trade_by_std_w_0(
    feature: &Panel,
    window: usize,
    std_multiplier: f64,
) -> Result<SignalPanel, PanelError> {
    trade_by_std_impl(feature, window, std_multiplier, true)
}

fn trade_by_std_impl(
    feature: &Panel,
    window: usize,
    std_multiplier: f64,
    close_on_mean_cross: bool,
) -> Result<SignalPanel, PanelError> {
    if window < 2 {
        return Err(PanelError::invalid("window", "must be >= 2"));
    }
    if std_multiplier <= 0.0 {
        return Err(PanelError::invalid("std_multiplier", "must be > 0"));
    }

    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let (rows, ft) = compact_column(feature.column(s));
        if ft.is_empty() {
            continue;
        }
        let mean = move_mean(&ft, window, window);
        let std = move_std(&ft, window, window, 1);

        let mut raw: Vec<Option<f64>> = vec![None; ft.len()];
        for i in 0..ft.len() {
            let f = ft[i];
            let f_prev = if i > 0 { ft[i - 1] } else { f64::NAN };
            let m_prev = if i > 0 { mean[i - 1] } else { f64::NAN };
            if f > mean[i] + std_multiplier * std[i] {
                raw[i] = Some(1.0);
            }
            if close_on_mean_cross && f < mean[i] && f_prev > m_prev {
                raw[i] = Some(0.0);
            }
            if f < mean[i] - std_multiplier * std[i] {
                raw[i] = Some(-1.0);
            }
            if close_on_mean_cross && f > mean[i] && f_prev < m_prev {
                raw[i] = Some(0.0);
            }
        }
        let sparse = one_shot_collapse(&raw);
        scatter_column(&mut out, s, &rows, &sparse);
    }
    Ok(out)
}
