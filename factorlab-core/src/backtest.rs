//! Vectorized backtest: realized exposure × forward returns, minus
//! turnover commission, aggregated to daily P&L, plus trade-level
//! accounting.
//!
//! Exposure is the forward-filled instruction panel. Commission is charged
//! on every change of (NaN-as-flat) exposure at `comm` per unit of
//! turnover. Trade accounting groups contiguous stretches of constant
//! exposure; a column whose exposure history begins mid-panel shares its
//! first stretch with the flat bucket and that stretch is discarded, so
//! per-trade statistics only see trades opened after the first exposure
//! change.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::error::PanelError;
use crate::metrics::{calc_calmar, calc_sharpe, mean, median};
use crate::panel::{Panel, SignalPanel};

/// Default per-unit turnover commission.
pub const COMMISSION: f64 = 2e-4;

/// Per-side commission used by trade-level accounting.
const TRADE_COMMISSION: f64 = 3e-4;

/// Portfolio P&L aggregated to calendar dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DailySeries {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Headline numbers of a single backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub sharpe: f64,
    pub sharpe_0_comm: f64,
    pub calmar: f64,
    pub avg_hp: f64,
    pub mid_hp: f64,
    /// Total P&L per symbol (trade count × average trade P&L).
    pub contracts: Vec<(String, f64)>,
    pub counts: usize,
    pub avg_pnl: f64,
}

/// One closed (or still-open-at-end) stretch of constant exposure.
#[derive(Debug, Clone, Serialize)]
pub struct TradeDetail {
    pub symbol: String,
    /// +1 long, -1 short.
    pub direction: f64,
    /// Mean exposure over the stretch.
    pub weight: f64,
    /// Sum of per-unit returns minus two commission sides.
    pub pnl: f64,
    /// Bars held divided by `day_count`.
    pub holding_period: f64,
    pub enter_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
}

/// Aggregate statistics over a set of trades.
#[derive(Debug, Clone, Serialize)]
pub struct TradeStats {
    pub trade_count: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub mid_pnl: f64,
    pub avg_hp: f64,
    pub mid_hp: f64,
}

/// Trade statistics overall and split by direction.
#[derive(Debug, Clone, Serialize)]
pub struct TradeBreakdown {
    pub overall: TradeStats,
    pub long: TradeStats,
    pub short: TradeStats,
}

/// Full trade accounting of a run.
#[derive(Debug, Clone, Serialize)]
pub struct TradeReport {
    pub overall: TradeBreakdown,
    /// Per symbol, in panel column order.
    pub per_symbol: Vec<(String, TradeBreakdown)>,
    pub details: Vec<TradeDetail>,
}

/// Per-bar portfolio return split into long and short sleeves.
#[derive(Debug, Clone, Serialize)]
pub struct LongShortReturn {
    pub long: Vec<f64>,
    pub short: Vec<f64>,
}

/// Instruction-frequency statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ShootInfo {
    pub overall_shoot: usize,
    pub long_shoot: usize,
    pub short_shoot: usize,
    pub overall_daily_rate: f64,
    /// Share of entries that are long / short.
    pub long_shoot_rate: f64,
    pub short_shoot_rate: f64,
    pub long_daily_rate: f64,
    pub short_daily_rate: f64,
}

/// Backtest a weighted instruction panel against forward returns.
///
/// Cells where either leg is NaN (no return, or exposure not yet
/// established) contribute nothing, commission included.
pub fn backtest_factor(
    open_signal: &SignalPanel,
    weight: &Panel,
    ret: &Panel,
    comm: f64,
) -> Result<DailySeries, PanelError> {
    open_signal.check_aligned(ret)?;
    if comm < 0.0 {
        return Err(PanelError::invalid("comm", "must be >= 0"));
    }
    let signal = open_signal.scale_by(weight)?.positions();
    let n = ret.n_rows();
    let mut per_row = vec![0.0_f64; n];
    for s in 0..ret.n_cols() {
        let sig = signal.column(s);
        let r = ret.column(s);
        let mut prev = 0.0;
        for t in 0..n {
            let filled = if sig[t].is_nan() { 0.0 } else { sig[t] };
            let commission = (filled - prev).abs() * comm;
            prev = filled;
            let term = r[t] * sig[t] - commission;
            if !term.is_nan() {
                per_row[t] += term;
            }
        }
    }
    Ok(group_daily(ret.index(), &per_row))
}

/// Backtest an unweighted instruction panel and summarize it.
///
/// Returns the daily P&L (commission included), the headline summary, and
/// the dense per-cell return panel the trade accounting was computed from.
pub fn backtest_and_summary(
    open_signal: &SignalPanel,
    ret: &Panel,
    day_count: usize,
) -> Result<(DailySeries, Summary, Panel), PanelError> {
    open_signal.check_aligned(ret)?;
    if day_count == 0 {
        return Err(PanelError::invalid("day_count", "must be >= 1"));
    }

    let signal = open_signal.positions();
    let n = ret.n_rows();
    let mut returns = ret.clone();
    for s in 0..ret.n_cols() {
        for t in 0..n {
            let v = ret.get(t, s) * signal.get(t, s);
            returns.set(t, s, if v.is_nan() { 0.0 } else { v });
        }
    }

    let mut base_row = vec![0.0_f64; n];
    let mut zero_comm_row = vec![0.0_f64; n];
    for s in 0..ret.n_cols() {
        let sig = signal.column(s);
        let mut prev = 0.0;
        for t in 0..n {
            let filled = if sig[t].is_nan() { 0.0 } else { sig[t] };
            let commission = (filled - prev).abs() * COMMISSION;
            prev = filled;
            base_row[t] += returns.get(t, s) - commission;
            zero_comm_row[t] += returns.get(t, s);
        }
    }
    let daily = group_daily(ret.index(), &base_row);
    let daily_0_comm = group_daily(ret.index(), &zero_comm_row);

    let report = get_trade_info(&returns, &signal, day_count, TRADE_COMMISSION)?;
    let contracts = report
        .per_symbol
        .iter()
        .map(|(sym, b)| (sym.clone(), b.overall.trade_count as f64 * b.overall.avg_pnl))
        .collect();

    let summary = Summary {
        sharpe: calc_sharpe(daily.values()),
        sharpe_0_comm: calc_sharpe(daily_0_comm.values()),
        calmar: calc_calmar(daily.values()),
        avg_hp: report.overall.overall.avg_hp,
        mid_hp: report.overall.overall.mid_hp,
        contracts,
        counts: report.overall.overall.trade_count,
        avg_pnl: report.overall.overall.avg_pnl,
    };
    Ok((daily, summary, returns))
}

/// Trade-level accounting of a dense exposure panel.
///
/// `returns` is the per-cell portfolio return (exposure already applied);
/// dividing by the absolute exposure recovers per-unit trade P&L. Each
/// trade is a stretch of constant exposure: any change of exposure, a
/// reversal included, closes the running trade and opens the next.
pub fn get_trade_info(
    returns: &Panel,
    signal: &Panel,
    day_count: usize,
    comm: f64,
) -> Result<TradeReport, PanelError> {
    returns.check_aligned(signal)?;
    if day_count == 0 {
        return Err(PanelError::invalid("day_count", "must be >= 1"));
    }
    if comm < 0.0 {
        return Err(PanelError::invalid("comm", "must be >= 0"));
    }

    let index = returns.index();
    let mut details: Vec<TradeDetail> = Vec::new();
    let mut per_symbol: Vec<(String, TradeBreakdown)> = Vec::new();

    for s in 0..signal.n_cols() {
        let symbol = &signal.symbols()[s];
        let sig = signal.column(s);
        let ret = returns.column(s);
        let col_details = column_trades(symbol, sig, ret, index, day_count, comm);
        per_symbol.push((symbol.clone(), breakdown(&col_details)));
        details.extend(col_details);
    }

    Ok(TradeReport {
        overall: breakdown(&details),
        per_symbol,
        details,
    })
}

fn column_trades(
    symbol: &str,
    sig: &[f64],
    ret: &[f64],
    index: &[NaiveDateTime],
    day_count: usize,
    comm: f64,
) -> Vec<TradeDetail> {
    struct Open {
        id: f64,
        rows: Vec<usize>,
    }

    let mut trades = Vec::new();
    let mut current: Option<Open> = None;
    let mut cum = 0.0_f64;

    let finalize = |open: Open, trades: &mut Vec<TradeDetail>| {
        let pnl: f64 = open
            .rows
            .iter()
            .map(|&t| ret[t] / sig[t].abs())
            .filter(|v| !v.is_nan())
            .sum::<f64>()
            - 2.0 * comm;
        let weights: Vec<f64> = open.rows.iter().map(|&t| sig[t]).collect();
        trades.push(TradeDetail {
            symbol: symbol.to_string(),
            direction: open.id.signum(),
            weight: mean(&weights),
            pnl,
            holding_period: open.rows.len() as f64 / day_count as f64,
            enter_time: index[open.rows[0]],
            exit_time: index[open.rows[open.rows.len() - 1]],
        });
    };

    for t in 0..sig.len() {
        let v = sig[t];
        if t > 0 {
            let d = v - sig[t - 1];
            if !d.is_nan() {
                cum += d.abs();
            }
        }
        if v.is_nan() {
            // no exposure information: the surrounding stretch continues
            continue;
        }
        // the stretch before the first exposure change carries id 0 and is
        // indistinguishable from flat, so it never becomes a trade
        let id = if v == 0.0 { 0.0 } else { cum * v.signum() };
        match current.take() {
            Some(open) if open.id == id => {
                let mut open = open;
                open.rows.push(t);
                current = Some(open);
            }
            Some(open) => {
                finalize(open, &mut trades);
                if id != 0.0 {
                    current = Some(Open { id, rows: vec![t] });
                }
            }
            None => {
                if id != 0.0 {
                    current = Some(Open { id, rows: vec![t] });
                }
            }
        }
    }
    if let Some(open) = current {
        finalize(open, &mut trades);
    }
    trades
}

fn breakdown(details: &[TradeDetail]) -> TradeBreakdown {
    let longs: Vec<&TradeDetail> = details.iter().filter(|d| d.direction == 1.0).collect();
    let shorts: Vec<&TradeDetail> = details.iter().filter(|d| d.direction == -1.0).collect();
    TradeBreakdown {
        overall: stats(details.iter()),
        long: stats(longs.into_iter()),
        short: stats(shorts.into_iter()),
    }
}

fn stats<'a>(details: impl Iterator<Item = &'a TradeDetail>) -> TradeStats {
    let details: Vec<&TradeDetail> = details.collect();
    let pnls: Vec<f64> = details.iter().map(|d| d.pnl).collect();
    let hps: Vec<f64> = details.iter().map(|d| d.holding_period).collect();
    let win_rate = if details.is_empty() {
        f64::NAN
    } else {
        pnls.iter().filter(|&&p| p > 0.0).count() as f64 / details.len() as f64
    };
    TradeStats {
        trade_count: details.len(),
        win_rate,
        avg_pnl: mean(&pnls),
        mid_pnl: median(&pnls),
        avg_hp: mean(&hps),
        mid_hp: median(&hps),
    }
}

/// Per-bar portfolio return of the long sleeve and the short sleeve.
pub fn get_long_short_return(
    returns: &Panel,
    signal: &Panel,
) -> Result<LongShortReturn, PanelError> {
    returns.check_aligned(signal)?;
    let n = returns.n_rows();
    let mut long = vec![0.0_f64; n];
    let mut short = vec![0.0_f64; n];
    for s in 0..returns.n_cols() {
        let sig = signal.column(s);
        let ret = returns.column(s);
        for t in 0..n {
            if ret[t].is_nan() {
                continue;
            }
            if sig[t] > 0.0 {
                long[t] += ret[t];
            } else if sig[t] < 0.0 {
                short[t] += ret[t];
            }
        }
    }
    Ok(LongShortReturn { long, short })
}

/// Count entries across an instruction panel and normalize to per-day
/// rates. Explicit flats and carries are not entries.
pub fn get_shoot_info(open_signal: &SignalPanel, day_count: usize) -> Result<ShootInfo, PanelError> {
    if day_count == 0 {
        return Err(PanelError::invalid("day_count", "must be >= 1"));
    }
    let mut long_shoot = 0usize;
    let mut short_shoot = 0usize;
    for s in 0..open_signal.n_cols() {
        for v in open_signal.column(s).iter().flatten() {
            if *v > 0.0 {
                long_shoot += 1;
            } else if *v < 0.0 {
                short_shoot += 1;
            }
        }
    }
    let overall_shoot = long_shoot + short_shoot;
    let days = open_signal.n_rows() as f64 / day_count as f64;
    Ok(ShootInfo {
        overall_shoot,
        long_shoot,
        short_shoot,
        overall_daily_rate: overall_shoot as f64 / days,
        long_shoot_rate: long_shoot as f64 / overall_shoot as f64,
        short_shoot_rate: short_shoot as f64 / overall_shoot as f64,
        long_daily_rate: long_shoot as f64 / days,
        short_daily_rate: short_shoot as f64 / days,
    })
}

/// Sum a per-bar series into calendar-date buckets.
fn group_daily(index: &[NaiveDateTime], per_row: &[f64]) -> DailySeries {
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut values: Vec<f64> = Vec::new();
    for (t, &v) in per_row.iter().enumerate() {
        let d = index[t].date();
        match values.last_mut() {
            Some(last) if dates.last() == Some(&d) => *last += v,
            _ => {
                dates.push(d);
                values.push(v);
            }
        }
    }
    DailySeries { dates, values }
}
