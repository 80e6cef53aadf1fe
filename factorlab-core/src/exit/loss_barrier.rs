//! Percent stop-loss / take-profit barrier exit.

use rayon::prelude::*;

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};
use crate::rolling::push;

use super::{first_breach, instruction_rows, masked_running_extreme};

/// Close when price moves against the running extreme by `stoploss`, or in
/// favor of the entry price by `takeprofit`, both as fractions; `max_hp`
/// (calendar bars) forces a close as an additional OR-condition.
///
/// At least one of `takeprofit` / `stoploss` must be supplied. An entry
/// whose `max_hp` lookup would run past the end of the column abandons the
/// remainder of that column (the entry stays written and open).
pub fn exit_w_loss_barrier(
    open_signal: &SignalPanel,
    close: &Panel,
    takeprofit: Option<f64>,
    stoploss: Option<f64>,
    max_hp: Option<usize>,
) -> Result<SignalPanel, PanelError> {
    open_signal.check_aligned(close)?;
    validate_barrier_params(takeprofit, stoploss, max_hp)?;

    let columns: Vec<Vec<Option<f64>>> = (0..open_signal.n_cols())
        .into_par_iter()
        .map(|s| scan_column(open_signal.column(s), close.column(s), takeprofit, stoploss, max_hp))
        .collect();

    SignalPanel::new(
        open_signal.index().to_vec(),
        open_signal.symbols().to_vec(),
        columns,
    )
}

/// Stop-loss-only convenience wrapper.
pub fn exit_w_loss_exit(
    open_signal: &SignalPanel,
    close: &Panel,
    stoploss: f64,
    max_hp: Option<usize>,
) -> Result<SignalPanel, PanelError> {
    exit_w_loss_barrier(open_signal, close, None, Some(stoploss), max_hp)
}

pub(crate) fn validate_barrier_params(
    takeprofit: Option<f64>,
    stoploss: Option<f64>,
    max_hp: Option<usize>,
) -> Result<(), PanelError> {
    if takeprofit.is_none() && stoploss.is_none() {
        return Err(PanelError::invalid(
            "stoploss",
            "barrier exit needs a takeprofit or a stoploss",
        ));
    }
    if let Some(tp) = takeprofit {
        if tp <= 0.0 {
            return Err(PanelError::invalid("takeprofit", "must be > 0"));
        }
    }
    if let Some(sl) = stoploss {
        if sl <= 0.0 {
            return Err(PanelError::invalid("stoploss", "must be > 0"));
        }
    }
    if max_hp == Some(0) {
        return Err(PanelError::invalid("max_hp", "must be >= 1"));
    }
    Ok(())
}

fn scan_column(
    sig: &[Option<f64>],
    close: &[f64],
    takeprofit: Option<f64>,
    stoploss: Option<f64>,
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
        let entry_price = push(tail)[0];
        let extreme = masked_running_extreme(tail, dir > 0.0);

        let mut cond = vec![false; tail.len()];
        for k in 0..tail.len() {
            let p = tail[k];
            if let Some(tp) = takeprofit {
                let gain = if dir > 0.0 {
                    p / entry_price - 1.0
                } else {
                    1.0 - p / entry_price
                };
                cond[k] |= gain > tp;
            }
            if let Some(sl) = stoploss {
                let adverse = if dir > 0.0 {
                    p / extreme[k] - 1.0 < -sl
                } else {
                    p / extreme[k] - 1.0 > sl
                };
                cond[k] |= adverse;
            }
        }
        if let Some(hp) = max_hp {
            if hp >= tail.len() {
                break; // would scan past panel end: abandon this column
            }
            cond[hp] = true;
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
    fn long_stoploss_triggers_on_drawdown_from_peak() {
        let close = single_panel(&[100.0, 110.0, 108.0, 98.0, 99.0]);
        let sig = sig_with_entry(5, 0, 1.0);
        let out = exit_w_loss_barrier(&sig, &close, None, Some(0.05), None).unwrap();
        assert_eq!(out.get(0, 0), Some(1.0));
        // peak 110 at bar 1; 98/110 - 1 = -10.9% < -5%
        assert_eq!(out.get(3, 0), Some(0.0));
    }

    #[test]
    fn takeprofit_measured_from_entry() {
        let close = single_panel(&[100.0, 104.0, 106.0, 107.0]);
        let sig = sig_with_entry(4, 0, 1.0);
        let out = exit_w_loss_barrier(&sig, &close, Some(0.05), None, None).unwrap();
        assert_eq!(out.get(2, 0), Some(0.0)); // 106/100 - 1 > 5%
    }

    #[test]
    fn short_side_mirrors_the_barriers() {
        let close = single_panel(&[100.0, 95.0, 96.0, 103.0, 104.0]);
        let sig = sig_with_entry(5, 0, -1.0);
        let out = exit_w_loss_barrier(&sig, &close, None, Some(0.05), None).unwrap();
        // trough 95 at bar 1; 103/95 - 1 = +8.4% adverse > 5%
        assert_eq!(out.get(3, 0), Some(0.0));
    }

    #[test]
    fn nan_bar_cannot_breach() {
        let close = single_panel(&[100.0, f64::NAN, 80.0, 101.0]);
        let sig = sig_with_entry(4, 0, 1.0);
        let out = exit_w_loss_barrier(&sig, &close, None, Some(0.05), None).unwrap();
        assert_eq!(out.get(1, 0), None); // masked bar
        assert_eq!(out.get(2, 0), Some(0.0)); // real bar breaches
    }

    #[test]
    fn max_hp_forces_time_close() {
        let close = single_panel(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        let sig = sig_with_entry(5, 0, 1.0);
        let out = exit_w_loss_barrier(&sig, &close, None, Some(0.5), Some(2)).unwrap();
        assert_eq!(out.get(2, 0), Some(0.0));
    }

    #[test]
    fn max_hp_overrun_abandons_column_with_entry_open() {
        let close = single_panel(&[100.0, 100.0, 100.0]);
        let sig = sig_with_entry(3, 1, 1.0);
        let out = exit_w_loss_barrier(&sig, &close, None, Some(0.5), Some(5)).unwrap();
        assert_eq!(out.get(1, 0), Some(1.0)); // entry written before abandonment
        assert_eq!(out.get(2, 0), None);
    }

    #[test]
    fn in_flight_entry_suppressed_until_close() {
        let close = single_panel(&[100.0, 99.0, 90.0, 91.0, 92.0]);
        let mut cells = vec![None; 5];
        cells[0] = Some(1.0);
        cells[1] = Some(-1.0); // arrives while the long is still open
        cells[3] = Some(-1.0); // arrives after the stop fired at bar 2
        let sig = SignalPanel::new(dt_index(5), vec!["a".into()], vec![cells]).unwrap();
        let out = exit_w_loss_barrier(&sig, &close, None, Some(0.05), None).unwrap();
        assert_eq!(out.get(0, 0), Some(1.0));
        assert_eq!(out.get(1, 0), None);
        assert_eq!(out.get(2, 0), Some(0.0));
        assert_eq!(out.get(3, 0), Some(-1.0));
    }

    #[test]
    fn missing_both_barriers_rejected() {
        let close = single_panel(&[100.0]);
        let sig = sig_with_entry(1, 0, 1.0);
        assert!(exit_w_loss_barrier(&sig, &close, None, None, None).is_err());
    }
}
