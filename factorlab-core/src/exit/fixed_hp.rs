//! Fixed holding period exit.

use crate::error::PanelError;
use crate::panel::SignalPanel;

use super::instruction_rows;

/// Close every entry exactly `fix_hp` bars after it opens, unconditionally.
///
/// Entries inside an open holding window are dropped; an entry whose close
/// would fall past the end of data stays open through panel end (and ends
/// that column's scan — nothing later could be honored anyway).
pub fn exit_w_fix_hp(open_signal: &SignalPanel, fix_hp: usize) -> Result<SignalPanel, PanelError> {
    if fix_hp == 0 {
        return Err(PanelError::invalid("fix_hp", "must be >= 1"));
    }
    let n = open_signal.n_rows();
    let mut out = open_signal.clone();
    for s in 0..open_signal.n_cols() {
        let col = open_signal.column(s);
        let rows = instruction_rows(col);
        let mut result: Vec<Option<f64>> = vec![None; n];
        let mut next_idx = 0usize;
        for &i in &rows {
            if i < next_idx {
                continue;
            }
            let sig = col[i].unwrap_or(0.0);
            if sig == 0.0 {
                continue;
            }
            result[i] = Some(sig);
            if i + fix_hp >= n {
                break;
            }
            result[i + fix_hp] = Some(0.0);
            next_idx = i + fix_hp + 1;
        }
        out.replace_column(s, result);
    }
    Ok(out)
}
