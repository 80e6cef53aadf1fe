//! FactorLab Core — panel model, signal generation, exit overlays, position
//! sizing, vectorized backtest.
//!
//! This crate contains the heart of the research engine:
//! - Dense `Panel` / sparse `SignalPanel` data model (time × symbol)
//! - Quote pivoting, forward returns, ATR, day-count inference
//! - NaN-aware rolling primitives (mean, std, rank, quantile, ewm, corr)
//! - Signal generators (quantile, threshold, cross, band and rank variants)
//! - Exit overlays (fixed / max holding period, barrier, trailing)
//! - Weight schemes (equal, volatility, correlation, blended)
//! - Vectorized backtest with commission, daily aggregation, trade
//!   accounting, and performance metrics

pub mod backtest;
pub mod error;
pub mod exit;
pub mod metrics;
pub mod panel;
pub mod quote;
pub mod rolling;
pub mod signal;
pub mod testutil;
pub mod weight;
