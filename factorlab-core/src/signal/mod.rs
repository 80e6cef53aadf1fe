//! Signal generators — feature panel in, sparse instruction panel out.
//!
//! Every generator shares the same skeleton: each symbol column is reduced
//! to its valid subsequence, a raw intent series is built by applying the
//! policy's rules **in a fixed write order** (open-long, close-long,
//! close-on-opposite-open, open-short — later writes overwrite earlier ones
//! at the same bar), and most variants then collapse the raw series to
//! "edges only" so that `None` truly means "no new instruction".
//!
//! The collapse takes the sign of the first difference of the forward-filled
//! raw series; zero differences are dropped, and an explicit raw flat is
//! preserved as `Some(0.0)`. Note that the very first instruction of a
//! column has no predecessor to difference against and is therefore dropped
//! unless it is an explicit flat.

mod bband;
mod cross;
mod cross_section;
mod norm;
mod quantile;
mod threshold;
mod ts_rank;

pub use bband::trade_by_bband;
pub use cross::{trade_by_cross, trade_by_cross_ma};
pub use cross_section::trade_by_cs;
pub use norm::{trade_by_norm, trade_by_std, trade_by_std_w_0};
pub use quantile::{trade_by_quantile, trade_by_quantile_imba, QuantileImbaParams};
pub use threshold::trade_by_thres_imba;
pub use ts_rank::trade_by_ts_rank;

use crate::panel::{Panel, SignalPanel};

/// Split a feature column into its usable subsequence: original row indices
/// plus values. NaN cells are skipped; infinite cells are normalized to 0
/// (degenerate ratios from upstream features must not poison ranks or
/// quantiles).
pub(crate) fn compact_column(col: &[f64]) -> (Vec<usize>, Vec<f64>) {
    let mut rows = Vec::new();
    let mut values = Vec::new();
    for (t, &v) in col.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        rows.push(t);
        values.push(if v.is_finite() { v } else { 0.0 });
    }
    (rows, values)
}

/// Collapse a raw intent series to edges only.
///
/// `sign(diff(ffill(raw)))` with zero differences dropped to `None` and
/// explicit raw flats preserved as `Some(0.0)`.
pub(crate) fn one_shot_collapse(raw: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = vec![None; raw.len()];
    let mut prev_filled: Option<f64> = None;
    let mut filled: Option<f64> = None;
    for (i, &r) in raw.iter().enumerate() {
        if r.is_some() {
            filled = r;
        }
        let edge = match (prev_filled, filled) {
            (Some(p), Some(c)) => {
                let d = c - p;
                if d > 0.0 {
                    Some(1.0)
                } else if d < 0.0 {
                    Some(-1.0)
                } else {
                    None
                }
            }
            _ => None,
        };
        out[i] = edge;
        if r == Some(0.0) {
            out[i] = Some(0.0);
        }
        prev_filled = filled;
    }
    out
}

/// Scatter a per-subsequence sparse series back onto the full panel rows.
pub(crate) fn scatter_column(
    out: &mut SignalPanel,
    col: usize,
    rows: &[usize],
    sparse: &[Option<f64>],
) {
    for (k, &t) in rows.iter().enumerate() {
        if let Some(v) = sparse[k] {
            out.set(t, col, Some(v));
        }
    }
}

/// Edges of a dense position panel: the inverse of forward-filling.
///
/// A nonzero change in position becomes an instruction carrying the change;
/// flat bars always carry an explicit `Some(0.0)`.
pub fn signal_to_open_signal(position: &Panel) -> SignalPanel {
    let mut out = SignalPanel::empty_like(position);
    for s in 0..position.n_cols() {
        let col = position.column(s);
        for t in 0..col.len() {
            let diff = if t == 0 {
                f64::NAN
            } else {
                col[t] - col[t - 1]
            };
            if !diff.is_nan() && diff != 0.0 {
                out.set(t, s, Some(diff));
            }
            if col[t] == 0.0 {
                out.set(t, s, Some(0.0));
            }
        }
    }
    out
}
