//! FactorLab Runner — backtest orchestration over `factorlab-core`.
//!
//! This crate builds on the engine to provide:
//! - Serializable TOML run configurations with content-addressed run IDs
//! - CSV quote ingestion into aligned panels
//! - Single-backtest runner (signal, exit overlay, weights, backtest)
//! - Parameter sweeps fanned out over rayon
//! - Seeded synthetic quote generation for tests and demos

pub mod config;
pub mod data_loader;
pub mod result;
pub mod runner;
pub mod sweep;
pub mod synthetic;

pub use config::{ConfigError, ExitConfig, RunConfig, RunId, SignalConfig, WeightConfig};
pub use data_loader::{load_quotes_csv, load_quotes_reader, LoadError};
pub use result::{BacktestResult, SCHEMA_VERSION};
pub use runner::{run_backtest, run_from_files, RunError};
pub use sweep::{run_sweep, ParamGrid, SweepResults};
pub use synthetic::synthetic_quotes;
