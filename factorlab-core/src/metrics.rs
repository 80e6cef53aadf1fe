//! Performance metrics over daily return series.
//!
//! All metrics annualize with 252 trading days regardless of the bar
//! frequency the daily series was aggregated from.

/// Annualized Sharpe ratio: `sqrt(252) * mean / std` (sample std).
///
/// A series with no dispersion (or fewer than two observations) scores 0
/// rather than dividing by zero.
pub fn calc_sharpe(returns: &[f64]) -> f64 {
    let sd = std_dev(returns);
    if !(sd > 1e-15) {
        return 0.0;
    }
    (252.0_f64).sqrt() * mean(returns) / sd
}

/// Calmar ratio: annualized return over maximum drawdown of the additive
/// equity curve. The drawdown carries a small floor so a drawdown-free
/// series stays finite.
pub fn calc_calmar(returns: &[f64]) -> f64 {
    252.0 * mean(returns) / (calc_maxdd(returns) + 1e-8)
}

/// Maximum drawdown of the additive equity curve `1 + cumsum(returns)`.
pub fn calc_maxdd(returns: &[f64]) -> f64 {
    let mut nav = 1.0_f64;
    let mut peak = f64::NEG_INFINITY;
    let mut maxdd = f64::NEG_INFINITY;
    for &r in returns {
        nav += r;
        peak = peak.max(nav);
        maxdd = maxdd.max(peak - nav);
    }
    if maxdd.is_finite() {
        maxdd
    } else {
        f64::NAN
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1); NaN below two observations.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Median (mean of the middle pair for even counts); NaN for an empty
/// slice or one containing NaN-only noise.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
