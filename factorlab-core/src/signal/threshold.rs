//! Fixed-threshold signal generator.

use crate::error::PanelError;
use crate::panel::{Panel, SignalPanel};

use super::{compact_column, one_shot_collapse, scatter_column};

/// Fixed absolute levels instead of rolling quantiles.
///
/// Open long at `thres_open_long` and above, close long on a downward cross
/// of `thres_close_long`, close short on an upward cross of
/// `thres_close_short`, open short at `thres_open_short` and below. Write
/// order follows the common skeleton; overlapping open levels are allowed,
/// and when the open-long and open-short rules both fire on the same bar
/// the short write wins the cell.
pub fn trade_by_thres_imba(
    feature: &Panel,
    thres_open_long: f64,
    thres_open_short: f64,
    thres_close_long: f64,
    thres_close_short: f64,
) -> Result<SignalPanel, PanelError> {
    let mut out = SignalPanel::empty_like(feature);
    for s in 0..feature.n_cols() {
        let (rows, ft) = compact_column(feature.column(s));
        if ft.is_empty() {
            continue;
        }

        let mut raw: Vec<Option<f64>> = vec![None; ft.len()];
        for i in 0..ft.len() {
            let f = ft[i];
            let f_prev = if i > 0 { ft[i - 1] } else { f64::NAN };
            if f >= thres_open_long {
                raw[i] = Some(1.0);
            }
            if f <= thres_close_long && f_prev > thres_close_long {
                raw[i] = Some(0.0);
            }
            if f >= thres_close_short && f_prev < thres_close_short {
                raw[i] = Some(0.0);
            }
            if f <= thres_open_short {
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

    #[test]
    fn long_open_then_close_on_lower_cross() {
        // crosses above 1.0 twice; the second long entry survives the
        // collapse because a flat instruction sits between them
        let f = single_panel(&[0.0, 2.0, 2.0, -0.1, 0.0, 2.0, 0.5]);
        let sig = trade_by_thres_imba(&f, 1.0, -1.0, 0.1, -0.1).unwrap();
        assert_eq!(sig.get(0, 0), None);
        assert_eq!(sig.get(1, 0), None); // first instruction dropped by collapse
        assert_eq!(sig.get(2, 0), None);
        assert_eq!(sig.get(3, 0), Some(0.0)); // downward cross of close-long level
        assert_eq!(sig.get(5, 0), Some(1.0)); // re-entry
    }

    #[test]
    fn short_write_wins_when_both_opens_fire() {
        // a single bar at 0.0 with open_long at -0.5 and open_short at 0.5:
        // both entry rules fire; the short write comes last
        let f = single_panel(&[-1.0, 0.0, 0.0]);
        let sig = trade_by_thres_imba(&f, -0.5, 0.5, -0.7, 0.7).unwrap();
        // raw: [-1 (open short), both fire -> -1, both fire -> -1]
        // collapse drops the first and the repeats
        assert_eq!(sig.get(0, 0), None);
        assert_eq!(sig.get(1, 0), None);
        assert_eq!(sig.get(2, 0), None);
    }

    #[test]
    fn short_wins_after_a_clear_long_entry() {
        // bar 0 fires only open-long; bar 1 sits inside both envelopes, so
        // the short write overwrites the long and the collapse sees a flip
        let f = single_panel(&[2.0, 0.0]);
        let sig = trade_by_thres_imba(&f, -0.5, 0.5, -0.7, 0.7).unwrap();
        assert_eq!(sig.get(0, 0), None); // first instruction dropped by collapse
        assert_eq!(sig.get(1, 0), Some(-1.0));
    }
}
