//! NaN-aware rolling-window primitives shared by signals and weighting.
//!
//! All functions operate on plain slices and return a freshly allocated
//! vector of the same length. A window with fewer than `min_periods` valid
//! (non-NaN) observations yields NaN at that position.

/// Forward-fill: carry the last non-NaN value. Leading NaN stay NaN.
pub fn push(values: &[f64]) -> Vec<f64> {
    crate::panel::ffill_slice(values)
}

/// Rolling mean over the trailing `window` observations.
pub fn move_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    assert!(window >= 1, "window must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    let mut sum = 0.0;
    let mut count = 0usize;
    for t in 0..n {
        let v = values[t];
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
        if t >= window {
            let old = values[t - window];
            if !old.is_nan() {
                sum -= old;
                count -= 1;
            }
        }
        if count >= min_periods.max(1) {
            out[t] = sum / count as f64;
        }
    }
    out
}

/// Rolling standard deviation over the trailing `window` observations.
///
/// `ddof` follows the usual convention: 1 for sample std (pandas default),
/// 0 for population std. Negative rounding noise in the variance is clamped
/// to zero.
pub fn move_std(values: &[f64], window: usize, min_periods: usize, ddof: usize) -> Vec<f64> {
    assert!(window >= 1, "window must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0usize;
    for t in 0..n {
        let v = values[t];
        if !v.is_nan() {
            sum += v;
            sum_sq += v * v;
            count += 1;
        }
        if t >= window {
            let old = values[t - window];
            if !old.is_nan() {
                sum -= old;
                sum_sq -= old * old;
                count -= 1;
            }
        }
        if count >= min_periods.max(1) && count > ddof {
            let var = (sum_sq - sum * sum / count as f64) / (count - ddof) as f64;
            out[t] = var.max(0.0).sqrt();
        }
    }
    out
}

/// Rolling maximum over the trailing `window` observations.
pub fn move_max(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    move_extreme(values, window, min_periods, f64::max)
}

/// Rolling minimum over the trailing `window` observations.
pub fn move_min(values: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    move_extreme(values, window, min_periods, f64::min)
}

fn move_extreme(
    values: &[f64],
    window: usize,
    min_periods: usize,
    pick: fn(f64, f64) -> f64,
) -> Vec<f64> {
    assert!(window >= 1, "window must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for t in 0..n {
        let start = (t + 1).saturating_sub(window);
        let mut acc = f64::NAN;
        let mut count = 0usize;
        for &v in &values[start..=t] {
            if v.is_nan() {
                continue;
            }
            count += 1;
            acc = if acc.is_nan() { v } else { pick(acc, v) };
        }
        if count >= min_periods.max(1) {
            out[t] = acc;
        }
    }
    out
}

/// Rolling percentile rank of the last value against its trailing window,
/// normalized to `[-1, 1]`.
///
/// For the value at `t`, rank = strictly-smaller count plus half the tie
/// count (excluding itself), divided by `count - 1`, then mapped onto
/// `[-1, 1]`. A window of a single valid value ranks 0. NaN at `t` or fewer
/// than `min_count` valid values yields NaN.
pub fn move_rank(values: &[f64], window: usize, min_count: usize) -> Vec<f64> {
    assert!(window >= 1, "window must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    for t in 0..n {
        let last = values[t];
        if last.is_nan() {
            continue;
        }
        let start = (t + 1).saturating_sub(window);
        let mut count = 0usize;
        let mut smaller = 0usize;
        let mut ties = 0usize;
        for &v in &values[start..=t] {
            if v.is_nan() {
                continue;
            }
            count += 1;
            if v < last {
                smaller += 1;
            } else if v == last {
                ties += 1;
            }
        }
        if count < min_count.max(1) {
            continue;
        }
        if count == 1 {
            out[t] = 0.0;
        } else {
            let r = smaller as f64 + 0.5 * (ties - 1) as f64;
            out[t] = 2.0 * r / (count - 1) as f64 - 1.0;
        }
    }
    out
}

/// Rolling quantile (linear interpolation) over the trailing `window`
/// observations, `q` in `[0, 1]`.
pub fn move_quantile(values: &[f64], window: usize, min_periods: usize, q: f64) -> Vec<f64> {
    assert!(window >= 1, "window must be >= 1");
    assert!((0.0..=1.0).contains(&q), "q must be in [0, 1]");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    let mut buf: Vec<f64> = Vec::with_capacity(window);
    for t in 0..n {
        let start = (t + 1).saturating_sub(window);
        buf.clear();
        buf.extend(values[start..=t].iter().copied().filter(|v| !v.is_nan()));
        if buf.len() < min_periods.max(1) {
            continue;
        }
        buf.sort_by(|a, b| a.partial_cmp(b).unwrap());
        out[t] = interpolated_quantile(&buf, q);
    }
    out
}

/// Linear-interpolation quantile of an already sorted, NaN-free slice.
pub fn interpolated_quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Exponentially weighted mean with `alpha = 2 / (span + 1)`.
///
/// Weights decay with absolute position (gaps from NaN observations still
/// decay the accumulated weight), and NaN observations produce the previous
/// smoothed value.
pub fn ewm_mean(values: &[f64], span: f64) -> Vec<f64> {
    assert!(span >= 1.0, "span must be >= 1");
    let alpha = 2.0 / (span + 1.0);
    let decay = 1.0 - alpha;
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    let mut num = 0.0;
    let mut den = 0.0;
    for t in 0..n {
        let v = values[t];
        num *= decay;
        den *= decay;
        if !v.is_nan() {
            num += v;
            den += 1.0;
        }
        if den > 0.0 {
            out[t] = num / den;
        }
    }
    out
}

/// Running maximum from the start of the slice.
///
/// NaN propagates: once a NaN is seen the remainder is NaN. Callers
/// forward-fill first so that only leading NaN (no observation yet) remain.
pub fn running_max(values: &[f64]) -> Vec<f64> {
    running_extreme(values, f64::max)
}

/// Running minimum from the start of the slice. Same NaN policy as
/// [`running_max`].
pub fn running_min(values: &[f64]) -> Vec<f64> {
    running_extreme(values, f64::min)
}

fn running_extreme(values: &[f64], pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut acc = f64::NAN;
    let mut first = true;
    values
        .iter()
        .map(|&v| {
            if first {
                acc = v;
                first = false;
            } else if acc.is_nan() || v.is_nan() {
                acc = f64::NAN;
            } else {
                acc = pick(acc, v);
            }
            acc
        })
        .collect()
}

/// Per-symbol mean of absolute pairwise rolling correlations.
///
/// `columns[s]` is symbol `s`'s return series. For each bar and symbol, the
/// output is the mean over all symbols (self included) of
/// `|corr(s, s')|` computed over the trailing `window` bars where both
/// series are valid; pairs with fewer than `min_periods` joint observations
/// or zero variance contribute nothing. A row where every pair is undefined
/// yields NaN.
pub fn rolling_corr_mean(columns: &[Vec<f64>], window: usize, min_periods: usize) -> Vec<Vec<f64>> {
    let n_sym = columns.len();
    let n = columns.first().map_or(0, |c| c.len());
    let mut abs_sum = vec![vec![0.0_f64; n]; n_sym];
    let mut abs_count = vec![vec![0usize; n]; n_sym];

    for a in 0..n_sym {
        for b in a..n_sym {
            let corr = rolling_corr_pair(&columns[a], &columns[b], window, min_periods);
            for t in 0..n {
                let c = corr[t];
                if c.is_nan() {
                    continue;
                }
                abs_sum[a][t] += c.abs();
                abs_count[a][t] += 1;
                if b != a {
                    abs_sum[b][t] += c.abs();
                    abs_count[b][t] += 1;
                }
            }
        }
    }

    (0..n_sym)
        .map(|s| {
            (0..n)
                .map(|t| {
                    if abs_count[s][t] == 0 {
                        f64::NAN
                    } else {
                        abs_sum[s][t] / abs_count[s][t] as f64
                    }
                })
                .collect()
        })
        .collect()
}

/// Rolling Pearson correlation of two series over joint-valid observations.
fn rolling_corr_pair(x: &[f64], y: &[f64], window: usize, min_periods: usize) -> Vec<f64> {
    let n = x.len();
    let mut out = vec![f64::NAN; n];
    let mut count = 0usize;
    let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);

    let valid = |t: usize| !x[t].is_nan() && !y[t].is_nan();

    for t in 0..n {
        if valid(t) {
            count += 1;
            sx += x[t];
            sy += y[t];
            sxx += x[t] * x[t];
            syy += y[t] * y[t];
            sxy += x[t] * y[t];
        }
        if t >= window && valid(t - window) {
            let (ox, oy) = (x[t - window], y[t - window]);
            count -= 1;
            sx -= ox;
            sy -= oy;
            sxx -= ox * ox;
            syy -= oy * oy;
            sxy -= ox * oy;
        }
        if count < min_periods.max(2) {
            continue;
        }
        let nf = count as f64;
        let cov = sxy - sx * sy / nf;
        let vx = sxx - sx * sx / nf;
        let vy = syy - sy * sy / nf;
        if vx > 1e-15 && vy > 1e-15 {
            out[t] = cov / (vx * vy).sqrt();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_mean_skips_nan() {
        let v = [1.0, f64::NAN, 3.0, 5.0];
        let m = move_mean(&v, 2, 1);
        assert_eq!(m[0], 1.0);
        assert_eq!(m[1], 1.0); // window {1, NaN}
        assert_eq!(m[2], 3.0); // window {NaN, 3}
        assert_eq!(m[3], 4.0);
    }

    #[test]
    fn move_std_sample_matches_hand_computation() {
        let v = [1.0, 2.0, 3.0, 4.0];
        let s = move_std(&v, 3, 3, 1);
        assert!(s[0].is_nan());
        assert!(s[1].is_nan());
        assert!((s[2] - 1.0).abs() < 1e-12);
        assert!((s[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn move_std_constant_series_is_zero_not_nan() {
        let v = [5.0; 10];
        let s = move_std(&v, 4, 4, 1);
        assert_eq!(s[9], 0.0);
    }

    #[test]
    fn move_rank_extremes() {
        let v = [1.0, 2.0, 3.0, 4.0, 0.5];
        let r = move_rank(&v, 4, 1);
        assert_eq!(r[3], 1.0); // 4 is the max of its window
        assert_eq!(r[4], -1.0); // 0.5 is the min of its window
    }

    #[test]
    fn move_quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        let q = move_quantile(&v, 4, 4, 0.5);
        assert!((q[3] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn running_max_propagates_leading_nan_only_after_push() {
        let v = [f64::NAN, 2.0, 1.0, 3.0];
        let pushed = push(&v);
        let m = running_max(&pushed);
        assert!(m[0].is_nan());
        assert!(m[1].is_nan()); // NaN already absorbed into the accumulator
    }

    #[test]
    fn running_max_monotone_on_clean_input() {
        let m = running_max(&[2.0, 1.0, 3.0, 2.5]);
        assert_eq!(m, vec![2.0, 2.0, 3.0, 3.0]);
    }

    #[test]
    fn corr_of_identical_series_is_one() {
        let a = vec![1.0, 2.0, 1.5, 3.0, 2.5, 4.0];
        let cols = vec![a.clone(), a];
        let mean_corr = rolling_corr_mean(&cols, 4, 2);
        assert!((mean_corr[0][5] - 1.0).abs() < 1e-12);
        assert!((mean_corr[1][5] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn corr_needs_min_periods() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![3.0, 2.0, 1.0];
        let out = rolling_corr_mean(&[a, b], 3, 100);
        assert!(out[0][2].is_nan());
    }
}
