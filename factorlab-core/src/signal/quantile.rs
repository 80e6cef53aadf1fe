//! Quantile-policy signal generators.
//!
//! The symmetric variant ranks the feature against its own trailing window;
//! the imbalanced variant parameterizes the short side independently.

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};
use crate::rolling::{move_quantile, move_rank};

use super::{compact_column, one_shot_collapse, scatter_column};

/// Rolling-rank quantile signal.
///
/// Open long when the trailing percentile rank reaches
/// `quantile_upper_long`, open short at the mirrored `1 - quantile_upper_long`,
/// close on a cross of the 0.5 midline in either direction. With
/// `one_shot = false` the raw (persistent) intent series is returned
/// uncollapsed.
pub fn trade_by_quantile(
    feature: &Panel,
    window: usize,
    quantile_upper_long: f64,
    one_shot: bool,
) -> Result<SignalPanel, PanelError> {
    if window < 2 {
        return Err(PanelError::invalid("window", "must be >= 2"));
    }
    if !(0.5..1.0).contains(&quantile_upper_long) || quantile_upper_long == 0.5 {
        return Err(PanelError::invalid(
            "quantile_upper_long",
            format!("must be in (0.5, 1.0), got {quantile_upper_long}"),
        ));
    }
    let quantile_lower_short = 1.0 - quantile_upper_long;
    let min_count = window.min(100);

    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let (rows, ft) = compact_column(feature.column(s));
        if ft.is_empty() {
            continue;
        }
        let rank: Vec<f64> = move_rank(&ft, window, min_count)
            .into_iter()
            .map(|r| (r + 1.0) / 2.0)
            .collect();

        let mut raw: Vec<Option<f64>> = vec![None; ft.len()];
        for i in 0..ft.len() {
            let r = rank[i];
            let r_prev = if i > 0 { rank[i - 1] } else { f64::NAN };
            if r >= quantile_upper_long {
                raw[i] = Some(1.0);
            }
            if r <= 0.5 && r_prev > 0.5 {
                raw[i] = Some(0.0);
            }
            if r >= 0.5 && r_prev < 0.5 {
                raw[i] = Some(0.0);
            }
            if r <= quantile_lower_short {
                raw[i] = Some(-1.0);
            }
        }

        let sparse = if one_shot {
            one_shot_collapse(&raw)
        } else {
            raw
        };
        scatter_column(&mut out, s, &rows, &sparse);
    }
    Ok(out)
}

/// Parameters for [`trade_by_quantile_imba`]. Short-side fields default to
/// the mirrored long-side values.
#[derive(Debug, Clone)]
pub struct QuantileImbaParams {
    pub window: usize,
    pub quantile_upper_long: f64,
    pub quantile_lower_long: f64,
    pub window_short: Option<usize>,
    pub quantile_upper_short: Option<f64>,
    pub quantile_lower_short: Option<f64>,
}

impl QuantileImbaParams {
    pub fn new(window: usize, quantile_upper_long: f64, quantile_lower_long: f64) -> Self {
        Self {
            window,
            quantile_upper_long,
            quantile_lower_long,
            window_short: None,
            quantile_upper_short: None,
            quantile_lower_short: None,
        }
    }

    fn validate(&self) -> Result<(usize, f64, f64), PanelError> {
        if self.window < 2 {
            return Err(PanelError::invalid("window", "must be >= 2"));
        }
        for (name, q) in [
            ("quantile_upper_long", self.quantile_upper_long),
            ("quantile_lower_long", self.quantile_lower_long),
        ] {
            if !(0.0..=1.0).contains(&q) {
                return Err(PanelError::invalid(name, format!("must be in [0, 1], got {q}")));
            }
        }
        if self.quantile_upper_long <= self.quantile_lower_long {
            return Err(PanelError::invalid(
                "quantile_upper_long",
                "must exceed quantile_lower_long",
            ));
        }
        let window_short = self.window_short.unwrap_or(self.window);
        let upper_short = self
            .quantile_upper_short
            .unwrap_or(1.0 - self.quantile_lower_long);
        let lower_short = self
            .quantile_lower_short
            .unwrap_or(1.0 - self.quantile_upper_long);
        if upper_short <= lower_short {
            return Err(PanelError::invalid(
                "quantile_upper_short",
                "must exceed quantile_lower_short",
            ));
        }
        Ok((window_short, upper_short, lower_short))
    }
}

/// Rolling-quantile signal with an independently parameterized short side.
///
/// Long entries on reaching the upper-long quantile envelope, long closes on
/// a downward cross of the lower-long envelope, short closes on an upward
/// cross of the upper-short envelope, short entries on reaching the
/// lower-short envelope.
pub fn trade_by_quantile_imba(
    feature: &Panel,
    params: &QuantileImbaParams,
) -> Result<SignalPanel, PanelError> {
    let (window_short, q_upper_short, q_lower_short) = params.validate()?;
    let window = params.window;
    let min_count = window.min(100);
    let min_count_short = window_short.min(100);

    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let (rows, ft) = compact_column(feature.column(s));
        if ft.is_empty() {
            continue;
        }
        let upper_long = move_quantile(&ft, window, min_count, params.quantile_upper_long);
        let lower_long = move_quantile(&ft, window, min_count, params.quantile_lower_long);
        let upper_short = move_quantile(&ft, window_short, min_count_short, q_upper_short);
        let lower_short = move_quantile(&ft, window_short, min_count_short, q_lower_short);

        let mut raw: Vec<Option<f64>> = vec![None; ft.len()];
        for i in 0..ft.len() {
            let f = ft[i];
            let f_prev = if i > 0 { ft[i - 1] } else { f64::NAN };
            if f >= upper_long[i] {
                raw[i] = Some(1.0);
            }
            if i > 0 && f <= lower_long[i] && f_prev > lower_long[i - 1] {
                raw[i] = Some(0.0);
            }
            if i > 0 && f >= upper_short[i] && f_prev < upper_short[i - 1] {
                raw[i] = Some(0.0);
            }
            if f <= lower_short[i] {
                raw[i] = Some(-1.0);
            }
        }

        let sparse = one_shot_collapse(&raw);
        scatter_column(&mut out, s, &rows, &sparse);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::single_panel;

    /// Feature that trends up long enough to push the rank to 1, then down.
    fn trending_feature() -> Panel {
        let mut v: Vec<f64> = (0..30).map(|i| i as f64).collect();
        v.extend((0..30).map(|i| 29.0 - i as f64));
        single_panel(&v)
    }

    #[test]
    fn quantile_rejects_midline_threshold() {
        let f = trending_feature();
        assert!(trade_by_quantile(&f, 10, 0.5, true).is_err());
        assert!(trade_by_quantile(&f, 10, 1.5, true).is_err());
    }

    #[test]
    fn uptrend_then_downtrend_produces_short_edge() {
        let f = trending_feature();
        let sig = trade_by_quantile(&f, 10, 0.9, true).unwrap();
        // the rank stays pinned near 1.0 during the uptrend, so the raw
        // series is a run of longs; the collapse leaves edges only
        let instructions: Vec<(usize, f64)> = (0..f.n_rows())
            .filter_map(|t| sig.get(t, 0).map(|v| (t, v)))
            .collect();
        assert!(!instructions.is_empty());
        // eventually the downtrend drives the rank to the bottom quantile
        assert!(instructions.iter().any(|&(_, v)| v == -1.0));
        // no consecutive duplicate non-flat instructions (one-shot)
        for w in instructions.windows(2) {
            if w[0].1 != 0.0 {
                assert_ne!(w[0].1, w[1].1, "repeated instruction not collapsed");
            }
        }
    }

    #[test]
    fn non_one_shot_keeps_persistent_signal() {
        let f = trending_feature();
        let sig = trade_by_quantile(&f, 10, 0.9, false).unwrap();
        let longs = (0..f.n_rows())
            .filter(|&t| sig.get(t, 0) == Some(1.0))
            .count();
        assert!(longs > 1, "persistent variant should repeat the long intent");
    }

    #[test]
    fn imba_defaults_mirror_long_side() {
        let p = QuantileImbaParams::new(10, 0.9, 0.4);
        let (w, up_s, lo_s) = p.validate().unwrap();
        assert_eq!(w, 10);
        assert!((up_s - 0.6).abs() < 1e-12);
        assert!((lo_s - 0.1).abs() < 1e-12);
    }

    #[test]
    fn imba_contradictory_bounds_rejected() {
        let p = QuantileImbaParams::new(10, 0.3, 0.4);
        let f = trending_feature();
        assert!(trade_by_quantile_imba(&f, &p).is_err());
    }
}
