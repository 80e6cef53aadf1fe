//! Sequential holding-period clamp.

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};

/// Re-simulate an instruction panel under a minimum and maximum holding
/// period, producing the dense position panel directly.
///
/// While flat, any entry is taken immediately. While holding:
/// - before `min_hp` bars, every instruction (including reversals) is
///   ignored and the position is carried;
/// - past `max_hp` bars, the position is force-flattened, or reversed if an
///   opposing instruction arrives on that bar;
/// - in between, an opposing or flat instruction is honored and resets the
///   holding clock, while a same-direction instruction just carries.
pub fn limit_trade_hp(
    open_signal: &SignalPanel,
    min_hp: usize,
    max_hp: usize,
) -> Result<Panel, PanelError> {
    if max_hp == 0 {
        return Err(PanelError::invalid("max_hp", "must be >= 1"));
    }
    if min_hp > max_hp {
        return Err(PanelError::invalid("min_hp", "must not exceed max_hp"));
    }

    let n = open_signal.n_rows();
    let mut columns = Vec::with_capacity(open_signal.n_cols());
    for s in 0..open_signal.n_cols() {
        let sig = open_signal.column(s);
        let mut out = vec![0.0_f64; n];
        let mut held = 0.0_f64;
        let mut hp_now = 0usize;

        for i in 0..n {
            let instruction = sig[i];
            if held == 0.0 {
                hp_now = 0;
                if let Some(v) = instruction {
                    if v != 0.0 {
                        held = v;
                        out[i] = v;
                    }
                }
            } else {
                hp_now += 1;
                if hp_now < min_hp {
                    out[i] = held;
                } else if hp_now > max_hp {
                    match instruction {
                        Some(v) if held * v < 0.0 => held = v,
                        _ => held = 0.0,
                    }
                    out[i] = held;
                    hp_now = 0;
                } else {
                    match instruction {
                        Some(v) if held * v <= 0.0 => {
                            held = v;
                            out[i] = held;
                            hp_now = 0;
                        }
                        _ => out[i] = held,
                    }
                }
            }
        }
        columns.push(out);
    }

    Panel::new(
        open_signal.index().to_vec(),
        open_signal.symbols().to_vec(),
        columns,
    )
}
