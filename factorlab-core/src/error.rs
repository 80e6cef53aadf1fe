//! Typed errors for panel construction and engine parameters.

use thiserror::Error;

/// Errors raised by panel validation and engine entry points.
///
/// The engine validates its preconditions up front (monotone time index,
/// matching shapes, usable parameters) and returns one of these instead of
/// silently producing wrong output.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("time index is not strictly increasing at row {row}")]
    NonMonotonicIndex { row: usize },

    #[error("panel shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("missing required column '{0}'")]
    MissingColumn(String),

    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),

    #[error("panel has no rows")]
    EmptyPanel,

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl PanelError {
    /// Shorthand for parameter validation failures.
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
