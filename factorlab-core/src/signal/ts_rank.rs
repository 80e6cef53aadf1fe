//! Time-series rank-band signal.

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};
use crate::rolling::move_rank;

/// Rolling percentile-rank band crossings against fixed bounds.
///
/// Long when the rank crosses above `quantile_upper`, short when it crosses
/// below `quantile_lower`. Not one-shot: the signal persists until the
/// opposite crossing (positions flip, they are never explicitly flattened).
pub fn trade_by_ts_rank(
    feature: &Panel,
    window: usize,
    quantile_lower: f64,
    quantile_upper: f64,
) -> Result<SignalPanel, PanelError> {
    if window < 2 {
        return Err(PanelError::invalid("window", "must be >= 2"));
    }
    if quantile_lower >= quantile_upper {
        return Err(PanelError::invalid(
            "quantile_lower",
            "must be below quantile_upper",
        ));
    }
    let min_count = window.min(100);

    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let col = feature.column(s);
        let rank: Vec<f64> = move_rank(col, window, min_count)
            .into_iter()
            .map(|r| (r + 1.0) / 2.0)
            .collect();
        for t in 1..col.len() {
            let r = rank[t];
            let r_prev = rank[t - 1];
            if r > quantile_upper && r_prev <= quantile_upper {
                out.set(t, s, Some(1.0));
            }
            if r < quantile_lower && r_prev >= quantile_lower {
                out.set(t, s, Some(-1.0));
            }
        }
    }
    Ok(out)
}
