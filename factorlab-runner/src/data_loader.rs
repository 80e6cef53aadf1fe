//! CSV quote ingestion.
//!
//! Expects long-form bars, one row per (datetime, symbol):
//!
//! ```text
//! datetime,symbol,open_price,high_price,low_price,close_price,volume,turnover,open_interest
//! 2024-01-02 15:00:00,rb,3900.0,3921.0,3888.0,3910.0,120000,4.69e8,210000
//! ```
//!
//! Rows may arrive in any order; the quote panel construction sorts and
//! pivots them.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

use factorlab_core::error::PanelError;
use factorlab_core::quote::{QuotePanel, QuoteRow};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read quote file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unparseable datetime '{value}'")]
    Timestamp { row: usize, value: String },
    #[error("quote panel construction failed: {0}")]
    Panel(#[from] PanelError),
}

#[derive(Debug, Deserialize)]
struct RawQuoteRecord {
    datetime: String,
    symbol: String,
    open_price: f64,
    high_price: f64,
    low_price: f64,
    close_price: f64,
    volume: f64,
    turnover: f64,
    open_interest: f64,
}

/// Load a quote panel from a CSV file.
pub fn load_quotes_csv(path: &Path) -> Result<QuotePanel, LoadError> {
    let file = std::fs::File::open(path)?;
    load_quotes_reader(file)
}

/// Load a quote panel from any CSV reader (used by tests with in-memory
/// buffers).
pub fn load_quotes_reader<R: Read>(reader: R) -> Result<QuotePanel, LoadError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (i, record) in csv_reader.deserialize::<RawQuoteRecord>().enumerate() {
        let raw = record?;
        let datetime = NaiveDateTime::parse_from_str(&raw.datetime, DATETIME_FORMAT)
            .map_err(|_| LoadError::Timestamp {
                row: i + 2, // header is line 1
                value: raw.datetime.clone(),
            })?;
        rows.push(QuoteRow {
            datetime,
            symbol: raw.symbol,
            open_price: raw.open_price,
            high_price: raw.high_price,
            low_price: raw.low_price,
            close_price: raw.close_price,
            volume: raw.volume,
            turnover: raw.turnover,
            open_interest: raw.open_interest,
        });
    }
    Ok(QuotePanel::from_rows(rows)?)
}
