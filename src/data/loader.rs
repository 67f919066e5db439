use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{ColumnNames, InputConfig};
use crate::data::types::BidRecord;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to open bid file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Row {row}: column {column} is not an integer: {value:?}")]
    InvalidNumber {
        row: u64,
        column: String,
        value: String,
    },

    #[error("Row {row}: column {column} must not be negative: {value}")]
    NegativeValue { row: u64, column: String, value: i64 },

    #[error("Row {row}: column {column} is empty")]
    EmptyField { row: u64, column: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<BidRecord>,
    pub skipped: usize,
}

/// Header positions of the required columns.
struct ColumnIndex {
    bidder: usize,
    round: usize,
    market: usize,
    category: usize,
    quantity: usize,
    price: usize,
    rivals_quantity: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, names: &ColumnNames) -> Result<Self, IngestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            bidder: find(names.bidder.as_str())?,
            round: find(names.round.as_str())?,
            market: find(names.market.as_str())?,
            category: find(names.category.as_str())?,
            quantity: find(names.quantity.as_str())?,
            price: find(names.price.as_str())?,
            rivals_quantity: find(names.rivals_quantity.as_str())?,
        })
    }
}

/// Load and validate the bid panel at `path`.
pub fn load_bids(path: impl AsRef<Path>, config: &InputConfig) -> Result<LoadReport, IngestError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IngestError::Open {
        path: path.display().to_string(),
        source,
    })?;

    let report = load_bids_from_reader(file, config)?;
    info!(
        "Loaded {} bid records from {} ({} skipped)",
        report.records.len(),
        path.display(),
        report.skipped
    );
    Ok(report)
}

pub fn load_bids_from_reader<R: Read>(
    reader: R,
    config: &InputConfig,
) -> Result<LoadReport, IngestError> {
    if !config.delimiter.is_ascii() {
        return Err(IngestError::InvalidDelimiter(config.delimiter));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(config.delimiter as u8)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::resolve(&headers, &config.columns)?;

    let mut report = LoadReport::default();

    for (index, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) if config.skip_invalid_rows && is_row_error(&e) => {
                warn!("Skipping unreadable row: {}", e);
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        // Header is line 1.
        let line = row
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);

        match parse_row(&row, line, &columns, config) {
            Ok(record) => report.records.push(record),
            Err(e) if config.skip_invalid_rows => {
                warn!("Skipping invalid row: {}", e);
                report.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    debug!("Parsed {} rows", report.records.len() + report.skipped);
    Ok(report)
}

/// Errors confined to a single record. I/O errors are not, and stay fatal.
fn is_row_error(error: &csv::Error) -> bool {
    matches!(
        error.kind(),
        csv::ErrorKind::UnequalLengths { .. } | csv::ErrorKind::Utf8 { .. }
    )
}

fn parse_row(
    row: &StringRecord,
    line: u64,
    columns: &ColumnIndex,
    config: &InputConfig,
) -> Result<BidRecord, IngestError> {
    let names = &config.columns;
    let field = |i: usize| row.get(i).unwrap_or("");

    let bidder = field(columns.bidder);
    if bidder.is_empty() {
        return Err(IngestError::EmptyField {
            row: line,
            column: names.bidder.clone(),
        });
    }

    let quantity = parse_int(field(columns.quantity), line, &names.quantity)?;
    ensure_non_negative(quantity, line, &names.quantity)?;

    let raw_rivals = field(columns.rivals_quantity);
    let rivals_quantity = if is_missing(raw_rivals, &config.missing_values) {
        None
    } else {
        let value = parse_int(raw_rivals, line, &names.rivals_quantity)?;
        ensure_non_negative(value, line, &names.rivals_quantity)?;
        Some(value)
    };

    Ok(BidRecord {
        bidder: bidder.to_string(),
        round: parse_int(field(columns.round), line, &names.round)?,
        market: parse_int(field(columns.market), line, &names.market)?,
        category: field(columns.category).to_string(),
        quantity,
        price: parse_int(field(columns.price), line, &names.price)?,
        rivals_quantity,
    })
}

fn is_missing(value: &str, sentinels: &[String]) -> bool {
    let trimmed = value.trim();
    sentinels.iter().any(|s| s == trimmed)
}

/// Integer fields accept plain integers or finite decimals, which are
/// truncated toward zero.
fn parse_int(value: &str, row: u64, column: &str) -> Result<i64, IngestError> {
    let trimmed = value.trim();
    let invalid = || IngestError::InvalidNumber {
        row,
        column: column.to_string(),
        value: value.to_string(),
    };

    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }

    let float = trimmed.parse::<f64>().map_err(|_| invalid())?;
    if !float.is_finite() || float.trunc() < i64::MIN as f64 || float.trunc() >= i64::MAX as f64 {
        return Err(invalid());
    }

    Ok(float.trunc() as i64)
}

fn ensure_non_negative(value: i64, row: u64, column: &str) -> Result<(), IngestError> {
    if value < 0 {
        return Err(IngestError::NegativeValue {
            row,
            column: column.to_string(),
            value,
        });
    }
    Ok(())
}
