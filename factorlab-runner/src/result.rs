//! Backtest result envelope.
//!
//! Bundles the daily pnl curve with the trade summary and shoot statistics
//! under the config's content hash, so results written to disk can be matched
//! back to the exact configuration that produced them.

use serde::Serialize;

use factorlab_core::backtest::{DailySeries, ShootInfo, Summary};

use crate::config::{RunConfig, RunId};

/// Bumped whenever the serialized result layout changes shape.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    pub schema_version: u32,
    /// Content hash of the producing [`RunConfig`].
    pub run_id: RunId,
    /// Daily portfolio pnl after commission.
    pub daily_pnl: DailySeries,
    /// Trade-level summary (unweighted, per-unit accounting).
    pub summary: Summary,
    /// Instruction-rate statistics.
    pub shoot: ShootInfo,
}

impl BacktestResult {
    pub fn new(
        config: &RunConfig,
        daily_pnl: DailySeries,
        summary: Summary,
        shoot: ShootInfo,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            run_id: config.run_id(),
            daily_pnl,
            summary,
            shoot,
        }
    }

    /// Serialize to pretty JSON for export.
    pub fn to_json(&self) -> String {
        // plain data struct, serialization cannot fail
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
