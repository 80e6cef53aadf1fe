//! Gap-capping maximum holding period exit.

use crate::error::PanelError;
use crate::panel::SignalPanel;

use super::instruction_rows;

/// Force a close `max_hp` bars after an instruction when the gap to the
/// column's next instruction exceeds `max_hp`.
///
/// This caps gaps between a signal and the next instruction rather than
/// capping every trade: instructions that are followed within `max_hp` bars
/// are left untouched. The column's final instruction is always treated as
/// exceeding the cap, so it receives a close if one still fits inside the
/// panel. All original instructions are preserved.
pub fn exit_w_max_hp(open_signal: &SignalPanel, max_hp: usize) -> Result<SignalPanel, PanelError> {
    if max_hp == 0 {
        return Err(PanelError::invalid("max_hp", "must be >= 1"));
    }
    let n = open_signal.n_rows();
    let mut out = open_signal.clone();
    for s in 0..open_signal.n_cols() {
        let rows = instruction_rows(open_signal.column(s));
        if rows.is_empty() {
            continue;
        }
        for (k, &i) in rows.iter().enumerate() {
            let gap_exceeds = match rows.get(k + 1) {
                Some(&next) => next - i > max_hp,
                None => true, // final instruction is always capped
            };
            if gap_exceeds && i + max_hp < n {
                out.set(i + max_hp, s, Some(0.0));
            }
        }
    }
    Ok(out)
}
