//! Panel model — the shared data representation of the engine.
//!
//! A [`Panel`] is a dense time × symbol matrix of `f64` with a strictly
//! increasing datetime index. Missing cells (instrument not yet listed,
//! already delisted, non-trading bar) are NaN.
//!
//! A [`SignalPanel`] is the sparse instruction panel: each cell is an
//! `Option<f64>` where `None` means "no instruction — carry the last
//! instruction forward", `Some(0.0)` is an explicit flat, and any other
//! `Some(x)` is a new entry / target exposure. Keeping the tri-state in the
//! type system avoids conflating "no data" with "no instruction", which a
//! bare floating-point NaN convention would.
//!
//! Every transform allocates a new panel; inputs are never mutated in place.

use chrono::NaiveDateTime;

use crate::error::PanelError;

/// Dense time × symbol matrix of `f64`, column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    index: Vec<NaiveDateTime>,
    symbols: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl Panel {
    /// Build a panel from an index, symbol names, and column-major values.
    ///
    /// Validates that the index is strictly increasing and that every column
    /// has one value per row.
    pub fn new(
        index: Vec<NaiveDateTime>,
        symbols: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, PanelError> {
        validate_index(&index)?;
        if symbols.len() != columns.len() {
            return Err(PanelError::ShapeMismatch {
                expected_rows: index.len(),
                expected_cols: symbols.len(),
                rows: index.len(),
                cols: columns.len(),
            });
        }
        for col in &columns {
            if col.len() != index.len() {
                return Err(PanelError::ShapeMismatch {
                    expected_rows: index.len(),
                    expected_cols: symbols.len(),
                    rows: col.len(),
                    cols: columns.len(),
                });
            }
        }
        Ok(Self {
            index,
            symbols,
            columns,
        })
    }

    /// Panel of a constant value.
    pub fn filled(
        index: Vec<NaiveDateTime>,
        symbols: Vec<String>,
        value: f64,
    ) -> Result<Self, PanelError> {
        let n = index.len();
        let cols = vec![vec![value; n]; symbols.len()];
        Self::new(index, symbols, cols)
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.symbols.len()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn column(&self, col: usize) -> &[f64] {
        &self.columns[col]
    }

    /// Position of a symbol column by name.
    pub fn column_index(&self, symbol: &str) -> Result<usize, PanelError> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .ok_or_else(|| PanelError::UnknownSymbol(symbol.to_string()))
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.columns[col][row]
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: f64) {
        self.columns[col][row] = value;
    }

    /// New panel with `f` applied to every cell.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Panel {
        let columns = self
            .columns
            .iter()
            .map(|c| c.iter().map(|&v| f(v)).collect())
            .collect();
        Panel {
            index: self.index.clone(),
            symbols: self.symbols.clone(),
            columns,
        }
    }

    /// Forward-fill NaN cells per column. Leading NaN stay NaN.
    pub fn ffill(&self) -> Panel {
        let columns = self.columns.iter().map(|c| ffill_slice(c)).collect();
        Panel {
            index: self.index.clone(),
            symbols: self.symbols.clone(),
            columns,
        }
    }

    /// First difference per column; row 0 is NaN.
    pub fn diff(&self) -> Panel {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut out = vec![f64::NAN; c.len()];
                for t in 1..c.len() {
                    out[t] = c[t] - c[t - 1];
                }
                out
            })
            .collect();
        Panel {
            index: self.index.clone(),
            symbols: self.symbols.clone(),
            columns,
        }
    }

    /// Shift every column down by one row (row 0 becomes NaN).
    pub fn shift(&self) -> Panel {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut out = vec![f64::NAN; c.len()];
                for t in 1..c.len() {
                    out[t] = c[t - 1];
                }
                out
            })
            .collect();
        Panel {
            index: self.index.clone(),
            symbols: self.symbols.clone(),
            columns,
        }
    }

    /// Replace NaN cells with `value`.
    pub fn fill_nan(&self, value: f64) -> Panel {
        self.map(|v| if v.is_nan() { value } else { v })
    }

    /// Check that `other` has the same index and symbols.
    pub fn check_aligned(&self, other: &Panel) -> Result<(), PanelError> {
        if self.index != other.index || self.symbols != other.symbols {
            return Err(PanelError::ShapeMismatch {
                expected_rows: self.n_rows(),
                expected_cols: self.n_cols(),
                rows: other.n_rows(),
                cols: other.n_cols(),
            });
        }
        Ok(())
    }
}

/// Sparse instruction panel: `None` = carry forward, `Some(0.0)` = explicit
/// flat, other `Some(x)` = entry / target exposure.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalPanel {
    index: Vec<NaiveDateTime>,
    symbols: Vec<String>,
    columns: Vec<Vec<Option<f64>>>,
}

impl SignalPanel {
    /// Panel of "no instruction" with the same shape as `like`.
    pub fn empty_like(like: &Panel) -> SignalPanel {
        SignalPanel {
            index: like.index.clone(),
            symbols: like.symbols.clone(),
            columns: vec![vec![None; like.n_rows()]; like.n_cols()],
        }
    }

    pub fn new(
        index: Vec<NaiveDateTime>,
        symbols: Vec<String>,
        columns: Vec<Vec<Option<f64>>>,
    ) -> Result<Self, PanelError> {
        validate_index(&index)?;
        if symbols.len() != columns.len() || columns.iter().any(|c| c.len() != index.len()) {
            return Err(PanelError::ShapeMismatch {
                expected_rows: index.len(),
                expected_cols: symbols.len(),
                rows: columns.first().map_or(0, |c| c.len()),
                cols: columns.len(),
            });
        }
        Ok(Self {
            index,
            symbols,
            columns,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.symbols.len()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn column(&self, col: usize) -> &[Option<f64>] {
        &self.columns[col]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.columns[col][row]
    }

    pub fn set(&mut self, row: usize, col: usize, value: Option<f64>) {
        self.columns[col][row] = value;
    }

    pub(crate) fn replace_column(&mut self, col: usize, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.n_rows());
        self.columns[col] = values;
    }

    /// Forward-fill instructions into the realized exposure panel.
    ///
    /// Bars before the first instruction of a column are NaN ("never
    /// instructed"), not flat.
    pub fn positions(&self) -> Panel {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let mut last = f64::NAN;
                c.iter()
                    .map(|v| {
                        if let Some(x) = v {
                            last = *x;
                        }
                        last
                    })
                    .collect()
            })
            .collect();
        Panel {
            index: self.index.clone(),
            symbols: self.symbols.clone(),
            columns,
        }
    }

    pub fn check_aligned(&self, other: &Panel) -> Result<(), PanelError> {
        if self.index != *other.index() || self.symbols != *other.symbols() {
            return Err(PanelError::ShapeMismatch {
                expected_rows: self.n_rows(),
                expected_cols: self.n_cols(),
                rows: other.n_rows(),
                cols: other.n_cols(),
            });
        }
        Ok(())
    }

    /// Multiply instructions by an aligned weight panel.
    ///
    /// A NaN weight at an instruction cell voids the instruction (there is no
    /// sizing for it), matching "no instruction" semantics downstream.
    pub fn scale_by(&self, weight: &Panel) -> Result<SignalPanel, PanelError> {
        self.check_aligned(weight)?;
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| {
                c.iter()
                    .enumerate()
                    .map(|(t, v)| match v {
                        Some(x) => {
                            let w = weight.get(t, j);
                            if w.is_nan() {
                                None
                            } else {
                                Some(x * w)
                            }
                        }
                        None => None,
                    })
                    .collect()
            })
            .collect();
        Ok(SignalPanel {
            index: self.index.clone(),
            symbols: self.symbols.clone(),
            columns,
        })
    }
}

/// Strictly increasing index check shared by both panel types.
pub(crate) fn validate_index(index: &[NaiveDateTime]) -> Result<(), PanelError> {
    if index.is_empty() {
        return Err(PanelError::EmptyPanel);
    }
    for t in 1..index.len() {
        if index[t] <= index[t - 1] {
            return Err(PanelError::NonMonotonicIndex { row: t });
        }
    }
    Ok(())
}

/// Forward-fill a slice; leading NaN stay NaN.
pub(crate) fn ffill_slice(values: &[f64]) -> Vec<f64> {
    let mut last = f64::NAN;
    values
        .iter()
        .map(|&v| {
            if !v.is_nan() {
                last = v;
            }
            last
        })
        .collect()
}
