//! Exit overlays — re-derive an instruction panel under a path-dependent
//! exit rule.
//!
//! Every variant shares one skeleton: per symbol column, scan instruction
//! indices in time order and track `next_idx`, the earliest bar at which a
//! new instruction may be honored. An entry that falls strictly inside an
//! open holding window is dropped — a position must close before the next
//! signal is honored. Barrier variants compute the close bar from a monotone
//! running extreme of the forward-filled price, with non-trading (NaN price)
//! bars masked out so they never constitute a crossing. If no breach occurs
//! before the end of data the position simply stays open; no synthetic close
//! is invented.
//!
//! A scan that would need price data past the end of the column (the
//! `max_hp` lookups) abandons the remainder of that column instead of
//! failing the batch; entries already written stay written.
//!
//! Columns are independent, so the barrier variants fan the per-column scans
//! out over rayon.

mod atr_barrier;
mod fixed_hp;
mod limit_hp;
mod loss_barrier;
mod max_hp;
mod trailing;

pub use atr_barrier::{exit_w_atr_barrier, exit_w_atr_exit};
pub use fixed_hp::exit_w_fix_hp;
pub use limit_hp::limit_trade_hp;
pub use loss_barrier::{exit_w_loss_barrier, exit_w_loss_exit};
pub use max_hp::exit_w_max_hp;
pub use trailing::{exit_w_trace_atr_exit, exit_w_trace_exit};

use crate::rolling::{push, running_max, running_min};

/// Row indices carrying an instruction.
pub(crate) fn instruction_rows(col: &[Option<f64>]) -> Vec<usize> {
    col.iter()
        .enumerate()
        .filter_map(|(t, v)| v.map(|_| t))
        .collect()
}

/// Running extreme of the forward-filled price from an entry onward, with
/// NaN price bars masked back to NaN so they can never breach a barrier.
pub(crate) fn masked_running_extreme(price_tail: &[f64], long: bool) -> Vec<f64> {
    let filled = push(price_tail);
    let mut extreme = if long {
        running_max(&filled)
    } else {
        running_min(&filled)
    };
    for (k, &p) in price_tail.iter().enumerate() {
        if p.is_nan() {
            extreme[k] = f64::NAN;
        }
    }
    extreme
}

/// First index where the barrier condition holds; `None` when it never does.
///
/// Index 0 (the entry bar itself) does not count as a breach, mirroring the
/// argmax-of-all-false convention of the scan.
pub(crate) fn first_breach(cond: &[bool]) -> Option<usize> {
    cond.iter().position(|&c| c).filter(|&k| k > 0)
}
