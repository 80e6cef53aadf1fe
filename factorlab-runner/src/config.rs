//! Serializable run configuration.
//!
//! A [`RunConfig`] captures everything needed to reproduce a run: the signal
//! generator, an optional exit overlay, the weight scheme, the commission
//! rate, and the bar-per-day count. Component choices are closed enums —
//! resolving one to a concrete engine call happens exactly once, in the
//! runner — and the whole config hashes to a content-addressed run ID.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use factorlab_core::backtest::COMMISSION;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Complete configuration of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    pub signal: SignalConfig,
    /// Exit overlay applied to the raw instruction panel; `None` keeps the
    /// generator's own closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<ExitConfig>,
    pub weight: WeightConfig,
    /// Per-unit turnover commission.
    #[serde(default = "default_commission")]
    pub commission: f64,
    /// Bars per symbol per calendar day; `None` infers the modal count from
    /// the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_count: Option<usize>,
}

fn default_commission() -> f64 {
    COMMISSION
}

impl RunConfig {
    /// Deterministic content hash of this configuration.
    ///
    /// Two identical configs share a run ID, which makes results
    /// content-addressable across sweeps and caches.
    pub fn run_id(&self) -> RunId {
        // serialization of a plain config struct cannot fail
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config from a TOML file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

/// Signal generator choice. The feature series is the close panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalConfig {
    /// Rolling-rank quantile entries with midline closes.
    Quantile {
        window: usize,
        quantile_upper_long: f64,
        one_shot: bool,
    },
    /// Asymmetric rolling-quantile envelopes per side.
    QuantileImba {
        window: usize,
        quantile_upper_long: f64,
        quantile_lower_long: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_short: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantile_upper_short: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantile_lower_short: Option<f64>,
    },
    /// Fixed threshold envelope with separate open/close levels.
    ThresImba {
        thres_open_long: f64,
        thres_open_short: f64,
        thres_close_long: f64,
        thres_close_short: f64,
    },
    /// Sign of the feature itself.
    Cross,
    /// Feature against its own rolling mean.
    CrossMa { window: usize },
    /// Pre-normalized feature against a fixed envelope.
    Norm { std_multiplier: f64 },
    /// Rolling mean ± k·std envelope, flip-only.
    Std { window: usize, std_multiplier: f64 },
    /// Rolling mean ± k·std envelope with mean-cross closes.
    StdW0 { window: usize, std_multiplier: f64 },
    /// Bollinger-band breakout against the previous bar's band.
    Bband { window: usize, std_multiplier: f64 },
    /// Rolling-rank band crossings, persistent.
    TsRank {
        window: usize,
        quantile_lower: f64,
        quantile_upper: f64,
    },
    /// Cross-sectional top/bottom-quantile portfolio, rebalanced every
    /// `cs_interval` bars.
    Cs { cs_interval: usize, cs_quantile: f64 },
}

/// Exit overlay choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitConfig {
    /// Unconditional close `fix_hp` bars after entry.
    FixHp { fix_hp: usize },
    /// Cap the gap between an instruction and the next one.
    MaxHp { max_hp: usize },
    /// Percent take-profit / trailing stop-loss barriers.
    LossBarrier {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        takeprofit: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stoploss: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_hp: Option<usize>,
    },
    /// ATR-scaled barriers.
    AtrBarrier {
        atr_period: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        takeprofit_multiplier: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stoploss_multiplier: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_hp: Option<usize>,
    },
    /// Trailing stop with linear decay to a touch-stop.
    TraceExit { stoploss: f64, max_hp: usize },
    /// ATR-unit trailing stop with linear decay.
    TraceAtrExit {
        atr_period: usize,
        atr_multiplier: f64,
        max_hp: usize,
    },
    /// Sequential min/max holding-period clamp.
    LimitHp { min_hp: usize, max_hp: usize },
}

/// Weight scheme choice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightConfig {
    /// Equal split across tradable contracts.
    Ew,
    /// Inverse volatility targeting.
    StdRatio { window: usize, target: f64, n: usize },
    /// Linear volatility penalty.
    StdMinus {
        window: usize,
        n: usize,
        std_min: f64,
        std_max: f64,
    },
    /// Volatility-plus-correlation penalty.
    StdCorr {
        window: usize,
        n: usize,
        thres_min: f64,
        thres_max: f64,
    },
    /// Volatility, correlation, and short-term momentum blend.
    ThreeD {
        window: usize,
        n: usize,
        thres_min: f64,
        thres_max: f64,
    },
}
