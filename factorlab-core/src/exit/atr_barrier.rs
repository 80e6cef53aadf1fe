//! ATR-scaled barrier exit.

use rayon::prelude::*;

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};
use crate::rolling::push;

use super::loss_barrier::validate_barrier_params;
use super::{first_breach, instruction_rows, masked_running_extreme};

/// Barrier exit with thresholds of `multiplier × ATR[t]` instead of a fixed
/// percentage.
///
/// The take-profit leg measures price distance from the entry price, the
/// stop-loss leg distance from the running extreme, each against the ATR of
/// the bar being examined. `max_hp` is counted in bars with a non-NaN price,
/// not calendar bars; if the column does not contain that many priced bars
/// after the entry, the remainder of the column is abandoned with the entry
/// left open.
pub fn exit_w_atr_barrier(
    open_signal: &SignalPanel,
    close: &Panel,
    atr: &Panel,
    takeprofit_multiplier: Option<f64>,
    stoploss_multiplier: Option<f64>,
    max_hp: Option<usize>,
) -> Result<SignalPanel, PanelError> {
    open_signal.check_aligned(close)?;
    open_signal.check_aligned(atr)?;
    validate_barrier_params(takeprofit_multiplier, stoploss_multiplier, max_hp)?;

    let columns: Vec<Vec<Option<f64>>> = (0..open_signal.n_cols())
        .into_par_iter()
        .map(|s| {
            scan_column(
                open_signal.column(s),
                close.column(s),
                atr.column(s),
                takeprofit_multiplier,
                stoploss_multiplier,
                max_hp,
            )
        })
        .collect();

    SignalPanel::new(
        open_signal.index().to_vec(),
        open_signal.symbols().to_vec(),
        columns,
    )
}

/// Stop-loss-only convenience wrapper.
pub fn exit_w_atr_exit(
    open_signal: &SignalPanel,
    close: &Panel,
    atr: &Panel,
    atr_multiplier: f64,
    max_hp: Option<usize>,
) -> Result<SignalPanel, PanelError> {
    exit_w_atr_barrier(open_signal, close, atr, None, Some(atr_multiplier), max_hp)
}

fn scan_column(
    sig: &[Option<f64>],
    close: &[f64],
    atr: &[f64],
    tp_mult: Option<f64>,
    sl_mult: Option<f64>,
    max_hp: Option<usize>,
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
        out[i] = Some(dir);

        let tail = &close[i..];
        let atr_tail = &atr[i..];
        let entry_price = push(tail)[0];
        let extreme = masked_running_extreme(tail, dir > 0.0);

        let mut cond = vec![false; tail.len()];
        for k in 0..tail.len() {
            let p = tail[k];
            if let Some(tp) = tp_mult {
                let gain = if dir > 0.0 { p - entry_price } else { entry_price - p };
                cond[k] |= gain > tp * atr_tail[k];
            }
            if let Some(sl) = sl_mult {
                let adverse = if dir > 0.0 { extreme[k] - p } else { p - extreme[k] };
                cond[k] |= adverse > sl * atr_tail[k];
            }
        }
        if let Some(hp) = max_hp {
            // max_hp counts priced bars only
            match tail
                .iter()
                .enumerate()
                .filter(|(_, p)| !p.is_nan())
                .nth(hp)
            {
                Some((k, _)) => cond[k] = true,
                None => break, // not enough priced bars left: abandon column
            }
        }

        if let Some(k) = first_breach(&cond) {
            out[i + k] = Some(0.0);
            next_idx = i + k + 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{dt_index, single_panel};

    fn sig_with_entry(n: usize, at: usize, dir: f64) -> SignalPanel {
        let mut cells = vec![None; n];
        cells[at] = Some(dir);
        SignalPanel::new(dt_index(n), vec!["a".into()], vec![cells]).unwrap()
    }

    #[test]
    fn stoploss_scales_with_atr() {
        let close = single_panel(&[100.0, 104.0, 101.0, 100.4, 100.0]);
        // wide ATR early, tight later: the same 3.6-point drawdown from the
        // peak only breaches once ATR tightens to 1.0
        let atr = single_panel(&[2.0, 2.0, 2.0, 1.0, 1.0]);
        let sig = sig_with_entry(5, 0, 1.0);
        let out = exit_w_atr_barrier(&sig, &close, &atr, None, Some(2.0), None).unwrap();
        // bar 2: 104 - 101 = 3 <= 2*2; bar 3: 104 - 100.4 = 3.6 > 2*1
        assert_eq!(out.get(2, 0), None);
        assert_eq!(out.get(3, 0), Some(0.0));
    }

    #[test]
    fn takeprofit_measured_from_entry_in_atr_units() {
        let close = single_panel(&[100.0, 101.0, 103.5, 104.0]);
        let atr = single_panel(&[1.0; 4]);
        let sig = sig_with_entry(4, 0, 1.0);
        let out = exit_w_atr_barrier(&sig, &close, &atr, Some(3.0), None, None).unwrap();
        assert_eq!(out.get(2, 0), Some(0.0)); // 103.5 - 100 > 3 * 1
    }

    #[test]
    fn max_hp_counts_priced_bars_only() {
        let close = single_panel(&[100.0, f64::NAN, 100.0, 100.0, 100.0]);
        let atr = single_panel(&[1.0; 5]);
        let sig = sig_with_entry(5, 0, 1.0);
        let out = exit_w_atr_exit(&sig, &close, &atr, 50.0, Some(2)).unwrap();
        // priced bars after entry: 0, 2, 3 -> the 2nd priced bar is row 3
        assert_eq!(out.get(2, 0), None);
        assert_eq!(out.get(3, 0), Some(0.0));
    }

    #[test]
    fn insufficient_priced_bars_abandons_column() {
        let close = single_panel(&[100.0, 100.0, f64::NAN]);
        let atr = single_panel(&[1.0; 3]);
        let sig = sig_with_entry(3, 0, 1.0);
        let out = exit_w_atr_exit(&sig, &close, &atr, 1.0, Some(4)).unwrap();
        assert_eq!(out.get(0, 0), Some(1.0));
        assert_eq!(out.get(1, 0), None);
        assert_eq!(out.get(2, 0), None);
    }
}
