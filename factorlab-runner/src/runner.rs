//! Run orchestration — wires a [`RunConfig`] into the engine.
//!
//! Config enums are resolved exactly once, here, into concrete engine
//! calls: signal generation on the close panel, an optional exit overlay,
//! a weight panel, then the weighted backtest and the unweighted summary.

use thiserror::Error;

use factorlab_core::backtest::{backtest_and_summary, backtest_factor, get_shoot_info};
use factorlab_core::error::PanelError;
use factorlab_core::exit::{
    exit_w_atr_barrier, exit_w_fix_hp, exit_w_loss_barrier, exit_w_max_hp, exit_w_trace_atr_exit,
    exit_w_trace_exit, limit_trade_hp,
};
use factorlab_core::panel::{Panel, SignalPanel};
use factorlab_core::quote::QuotePanel;
use factorlab_core::signal::{
    signal_to_open_signal, trade_by_bband, trade_by_cross, trade_by_cross_ma, trade_by_cs,
    trade_by_norm, trade_by_quantile, trade_by_quantile_imba, trade_by_std, trade_by_std_w_0,
    trade_by_thres_imba, trade_by_ts_rank, QuantileImbaParams,
};
use factorlab_core::weight::{
    weight_by_3d, weight_by_ew, weight_by_std_corr, weight_by_std_minus, weight_by_std_ratio,
};

use crate::config::{ConfigError, ExitConfig, RunConfig, SignalConfig, WeightConfig};
use crate::data_loader::{load_quotes_csv, LoadError};
use crate::result::BacktestResult;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] PanelError),
}

/// Load a TOML config and a CSV quote file, then run the backtest.
pub fn run_from_files(
    config_path: &std::path::Path,
    quotes_path: &std::path::Path,
) -> Result<BacktestResult, RunError> {
    let config = RunConfig::load(config_path)?;
    let quote = load_quotes_csv(quotes_path)?;
    run_backtest(&config, &quote)
}

/// Run a single backtest of `config` against a quote panel.
pub fn run_backtest(config: &RunConfig, quote: &QuotePanel) -> Result<BacktestResult, RunError> {
    let day_count = match config.day_count {
        Some(d) => d,
        None => quote.infer_day_count(),
    };
    let ret = quote.forward_returns();

    let mut open_signal = build_signal(&config.signal, &quote.close)?;
    if let Some(exit) = &config.exit {
        open_signal = apply_exit(exit, &open_signal, quote)?;
    }
    let weight = build_weight(&config.weight, quote, day_count)?;

    let daily = backtest_factor(&open_signal, &weight, &ret, config.commission)?;
    let (_, summary, _) = backtest_and_summary(&open_signal, &ret, day_count)?;
    let shoot = get_shoot_info(&open_signal, day_count)?;

    Ok(BacktestResult::new(config, daily, summary, shoot))
}

fn build_signal(config: &SignalConfig, feature: &Panel) -> Result<SignalPanel, PanelError> {
    match *config {
        SignalConfig::Quantile {
            window,
            quantile_upper_long,
            one_shot,
        } => trade_by_quantile(feature, window, quantile_upper_long, one_shot),
        SignalConfig::QuantileImba {
            window,
            quantile_upper_long,
            quantile_lower_long,
            window_short,
            quantile_upper_short,
            quantile_lower_short,
        } => {
            let mut params = QuantileImbaParams::new(window, quantile_upper_long, quantile_lower_long);
            params.window_short = window_short;
            params.quantile_upper_short = quantile_upper_short;
            params.quantile_lower_short = quantile_lower_short;
            trade_by_quantile_imba(feature, &params)
        }
        SignalConfig::ThresImba {
            thres_open_long,
            thres_open_short,
            thres_close_long,
            thres_close_short,
        } => trade_by_thres_imba(
            feature,
            thres_open_long,
            thres_open_short,
            thres_close_long,
            thres_close_short,
        ),
        SignalConfig::Cross => Ok(trade_by_cross(feature)),
        SignalConfig::CrossMa { window } => trade_by_cross_ma(feature, window),
        SignalConfig::Norm { std_multiplier } => trade_by_norm(feature, std_multiplier),
        SignalConfig::Std {
            window,
            std_multiplier,
        } => trade_by_std(feature, window, std_multiplier),
        SignalConfig::StdW0 {
            window,
            std_multiplier,
        } => trade_by_std_w_0(feature, window, std_multiplier),
        SignalConfig::Bband {
            window,
            std_multiplier,
        } => trade_by_bband(feature, window, std_multiplier),
        SignalConfig::TsRank {
            window,
            quantile_lower,
            quantile_upper,
        } => trade_by_ts_rank(feature, window, quantile_lower, quantile_upper),
        SignalConfig::Cs {
            cs_interval,
            cs_quantile,
        } => trade_by_cs(feature, cs_interval, cs_quantile),
    }
}

fn apply_exit(
    config: &ExitConfig,
    open_signal: &SignalPanel,
    quote: &QuotePanel,
) -> Result<SignalPanel, PanelError> {
    match *config {
        ExitConfig::FixHp { fix_hp } => exit_w_fix_hp(open_signal, fix_hp),
        ExitConfig::MaxHp { max_hp } => exit_w_max_hp(open_signal, max_hp),
        ExitConfig::LossBarrier {
            takeprofit,
            stoploss,
            max_hp,
        } => exit_w_loss_barrier(open_signal, &quote.close, takeprofit, stoploss, max_hp),
        ExitConfig::AtrBarrier {
            atr_period,
            takeprofit_multiplier,
            stoploss_multiplier,
            max_hp,
        } => {
            let atr = quote.atr(atr_period)?;
            exit_w_atr_barrier(
                open_signal,
                &quote.close,
                &atr,
                takeprofit_multiplier,
                stoploss_multiplier,
                max_hp,
            )
        }
        ExitConfig::TraceExit { stoploss, max_hp } => {
            exit_w_trace_exit(open_signal, &quote.close, stoploss, max_hp)
        }
        ExitConfig::TraceAtrExit {
            atr_period,
            atr_multiplier,
            max_hp,
        } => {
            let atr = quote.atr(atr_period)?;
            exit_w_trace_atr_exit(open_signal, &quote.close, &atr, atr_multiplier, max_hp)
        }
        ExitConfig::LimitHp { min_hp, max_hp } => {
            // the clamp re-simulates into dense positions; convert back to
            // the sparse instruction form the backtest consumes
            let positions = limit_trade_hp(open_signal, min_hp, max_hp)?;
            Ok(signal_to_open_signal(&positions))
        }
    }
}

fn build_weight(
    config: &WeightConfig,
    quote: &QuotePanel,
    day_count: usize,
) -> Result<Panel, PanelError> {
    match *config {
        WeightConfig::Ew => Ok(weight_by_ew(quote)),
        WeightConfig::StdRatio { window, target, n } => {
            weight_by_std_ratio(quote, window, target, day_count, n)
        }
        WeightConfig::StdMinus {
            window,
            n,
            std_min,
            std_max,
        } => weight_by_std_minus(quote, window, day_count, n, std_min, std_max),
        WeightConfig::StdCorr {
            window,
            n,
            thres_min,
            thres_max,
        } => weight_by_std_corr(quote, window, day_count, n, thres_min, thres_max),
        WeightConfig::ThreeD {
            window,
            n,
            thres_min,
            thres_max,
        } => weight_by_3d(quote, window, day_count, n, thres_min, thres_max),
    }
}
