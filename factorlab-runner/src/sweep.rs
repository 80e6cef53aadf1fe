//! Parameter sweeps over a base configuration.
//!
//! A [`ParamGrid`] varies the dimensions that dominate factor research in
//! practice (lookback window, envelope width, fixed holding period) around a
//! base [`RunConfig`]. Dimensions that do not apply to the base config's
//! signal variant collapse instead of multiplying the grid, and duplicate
//! configs are removed by run ID before execution. Runs fan out over rayon.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use rayon::prelude::*;

use factorlab_core::quote::QuotePanel;

use crate::config::{ExitConfig, RunConfig, SignalConfig};
use crate::result::BacktestResult;
use crate::runner::run_backtest;

/// Parameter grid specification.
///
/// An empty dimension means "keep the base config's value".
#[derive(Debug, Clone, Default)]
pub struct ParamGrid {
    /// Signal lookback windows to test.
    pub windows: Vec<usize>,
    /// Envelope std multipliers to test.
    pub std_multipliers: Vec<f64>,
    /// Fixed holding periods to test; each replaces the base exit with a
    /// `FIX_HP` overlay.
    pub fix_hps: Vec<usize>,
}

impl ParamGrid {
    /// Upper bound on the number of configurations before deduplication.
    pub fn size(&self) -> usize {
        self.windows.len().max(1) * self.std_multipliers.len().max(1) * self.fix_hps.len().max(1)
    }

    /// Generate all distinct configurations in the grid.
    pub fn generate_configs(&self, base: &RunConfig) -> Vec<RunConfig> {
        let windows: Vec<Option<usize>> = dimension(&self.windows);
        let multipliers: Vec<Option<f64>> = dimension(&self.std_multipliers);
        let fix_hps: Vec<Option<usize>> = dimension(&self.fix_hps);

        let mut configs = Vec::new();
        let mut seen = HashSet::new();
        for &w in &windows {
            for &m in &multipliers {
                for &h in &fix_hps {
                    let mut config = base.clone();
                    if let Some(w) = w {
                        // inapplicable dimensions leave the config unchanged;
                        // the run-id dedup below collapses the duplicates
                        set_window(&mut config.signal, w);
                    }
                    if let Some(m) = m {
                        set_std_multiplier(&mut config.signal, m);
                    }
                    if let Some(h) = h {
                        config.exit = Some(ExitConfig::FixHp { fix_hp: h });
                    }
                    if seen.insert(config.run_id()) {
                        configs.push(config);
                    }
                }
            }
        }
        configs
    }
}

fn dimension<T: Copy>(values: &[T]) -> Vec<Option<T>> {
    if values.is_empty() {
        vec![None]
    } else {
        values.iter().copied().map(Some).collect()
    }
}

fn set_window(signal: &mut SignalConfig, w: usize) -> bool {
    match signal {
        SignalConfig::Quantile { window, .. }
        | SignalConfig::QuantileImba { window, .. }
        | SignalConfig::CrossMa { window }
        | SignalConfig::Std { window, .. }
        | SignalConfig::StdW0 { window, .. }
        | SignalConfig::Bband { window, .. }
        | SignalConfig::TsRank { window, .. } => {
            *window = w;
            true
        }
        SignalConfig::ThresImba { .. } | SignalConfig::Cross | SignalConfig::Norm { .. } => false,
        SignalConfig::Cs { cs_interval, .. } => {
            *cs_interval = w;
            true
        }
    }
}

fn set_std_multiplier(signal: &mut SignalConfig, m: f64) -> bool {
    match signal {
        SignalConfig::Norm { std_multiplier }
        | SignalConfig::Std { std_multiplier, .. }
        | SignalConfig::StdW0 { std_multiplier, .. }
        | SignalConfig::Bband { std_multiplier, .. } => {
            *std_multiplier = m;
            true
        }
        _ => false,
    }
}

/// Run every config against the same quote panel, in parallel.
///
/// The first failing config aborts the sweep; a config that fails engine
/// validation is a grid bug, not a data condition to paper over.
pub fn run_sweep(configs: &[RunConfig], quote: &QuotePanel) -> Result<SweepResults> {
    let results: Vec<BacktestResult> = configs
        .par_iter()
        .map(|config| {
            run_backtest(config, quote).with_context(|| format!("run {} failed", config.run_id()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(SweepResults::new(results))
}

/// Results from a parameter sweep, addressable by run ID.
#[derive(Debug)]
pub struct SweepResults {
    results: Vec<BacktestResult>,
    by_run_id: HashMap<String, usize>,
}

impl SweepResults {
    fn new(results: Vec<BacktestResult>) -> Self {
        let by_run_id = results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.run_id.clone(), i))
            .collect();
        Self { results, by_run_id }
    }

    pub fn all(&self) -> &[BacktestResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, run_id: &str) -> Option<&BacktestResult> {
        self.by_run_id.get(run_id).map(|&i| &self.results[i])
    }

    /// Results sorted by after-commission sharpe, best first.
    pub fn sorted_by_sharpe(&self) -> Vec<&BacktestResult> {
        let mut sorted: Vec<_> = self.results.iter().collect();
        sorted.sort_by(|a, b| {
            b.summary
                .sharpe
                .partial_cmp(&a.summary.sharpe)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&BacktestResult> {
        self.sorted_by_sharpe().into_iter().next()
    }
}
