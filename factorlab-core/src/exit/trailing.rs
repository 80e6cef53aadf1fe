//! Trailing exits with a linearly decaying distance threshold.

use rayon::prelude::*;

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};

use super::{first_breach, instruction_rows, masked_running_extreme};

/// Trailing stop whose distance decays linearly to zero over `max_hp` bars.
///
/// The threshold at `k` bars after entry is
/// `max(1 - k/max_hp, 0) × stoploss × entry_price`, so the stop tightens as
/// the trade ages and becomes a touch-stop at `max_hp`.
pub fn exit_w_trace_exit(
    open_signal: &SignalPanel,
    close: &Panel,
    stoploss: f64,
    max_hp: usize,
) -> Result<SignalPanel, PanelError> {
    open_signal.check_aligned(close)?;
    if stoploss <= 0.0 {
        return Err(PanelError::invalid("stoploss", "must be > 0"));
    }
    if max_hp == 0 {
        return Err(PanelError::invalid("max_hp", "must be >= 1"));
    }

    let columns: Vec<Vec<Option<f64>>> = (0..open_signal.n_cols())
        .into_par_iter()
        .map(|s| {
            let close_col = close.column(s);
            scan_trailing(open_signal.column(s), close_col, |i, k| {
                decay(k, max_hp) * stoploss * close_col[i]
            })
        })
        .collect();

    SignalPanel::new(
        open_signal.index().to_vec(),
        open_signal.symbols().to_vec(),
        columns,
    )
}

/// Trailing stop in ATR units with the same linear decay as
/// [`exit_w_trace_exit`].
pub fn exit_w_trace_atr_exit(
    open_signal: &SignalPanel,
    close: &Panel,
    atr: &Panel,
    atr_multiplier: f64,
    max_hp: usize,
) -> Result<SignalPanel, PanelError> {
    open_signal.check_aligned(close)?;
    open_signal.check_aligned(atr)?;
    if atr_multiplier <= 0.0 {
        return Err(PanelError::invalid("atr_multiplier", "must be > 0"));
    }
    if max_hp == 0 {
        return Err(PanelError::invalid("max_hp", "must be >= 1"));
    }

    let columns: Vec<Vec<Option<f64>>> = (0..open_signal.n_cols())
        .into_par_iter()
        .map(|s| {
            let atr_col = atr.column(s);
            scan_trailing(open_signal.column(s), close.column(s), |i, k| {
                decay(k, max_hp) * atr_multiplier * atr_col[i + k]
            })
        })
        .collect();

    SignalPanel::new(
        open_signal.index().to_vec(),
        open_signal.symbols().to_vec(),
        columns,
    )
}

fn decay(k: usize, max_hp: usize) -> f64 {
    (1.0 - k as f64 / max_hp as f64).max(0.0)
}

/// Shared scan: `threshold(entry_row, bars_since_entry)` gives the allowed
/// adverse distance at each bar.
fn scan_trailing(
    sig: &[Option<f64>],
    close: &[f64],
    threshold: impl Fn(usize, usize) -> f64,
) -> Vec<Option<f64>> {
    let n = sig.len();
    let mut out = vec![None; n];
    let mut next_idx = 0usize;

    for &i in &instruction_rows(sig) {
        if i < next_idx {
            continue;
        }
        let dir = sig[i].unwrap_or(0.0);
        if dir == 0.0 {
            continue;
        }

        let tail = &close[i..];
        let extreme = masked_running_extreme(tail, dir > 0.0);

        let mut cond = vec![false; tail.len()];
        for k in 0..tail.len() {
            let adverse = if dir > 0.0 {
                extreme[k] - tail[k]
            } else {
                tail[k] - extreme[k]
            };
            cond[k] = adverse > threshold(i, k);
        }

        out[i] = Some(dir);
        if let Some(k) = first_breach(&cond) {
            out[i + k] = Some(0.0);
            next_idx = i + k + 1;
        }
    }
    out
}
