use std::io::Read;

use serde::Serialize;
use thiserror::Error;

/// Field spellings treated as a missing value, matched case-insensitively.
const MISSING_MARKERS: &[&str] = &["", "na", "n/a", "nan", "-nan", "null", "none", "#n/a", "<na>"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataFormatError {
    #[error("dataset is empty")]
    Empty,
    #[error("dataset header row is missing or blank")]
    MissingHeader,
    #[error("row on line {line} has {found} fields, expected {expected}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("dataset is not valid csv: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Missing,
    Value(String),
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let is_marker = MISSING_MARKERS
            .iter()
            .any(|marker| marker.eq_ignore_ascii_case(trimmed));
        // `inf` and friends would poison every statistic over the column.
        let is_non_finite = trimmed
            .parse::<f64>()
            .is_ok_and(|value| !value.is_finite());
        if is_marker || is_non_finite {
            Self::Missing
        } else {
            Self::Value(trimmed.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Missing => None,
            Self::Value(value) => Some(value.as_str()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_str().and_then(|value| value.parse::<f64>().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
}

/// An in-memory dataset with a header row and rectangular rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, DataFormatError> {
        if columns.is_empty() || columns.iter().all(|column| column.trim().is_empty()) {
            return Err(DataFormatError::MissingHeader);
        }

        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DataFormatError::RaggedRow {
                    // header is line 1
                    line: index as u64 + 2,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn from_csv_str(raw: &str) -> Result<Self, DataFormatError> {
        Self::from_csv_reader(raw.as_bytes())
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DataFormatError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(reader);

        let headers = csv_reader.headers().map_err(map_csv_error)?.clone();
        if headers.is_empty() {
            return Err(DataFormatError::Empty);
        }
        let columns = headers
            .iter()
            .map(|column| column.trim().to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(map_csv_error)?;
            rows.push(record.iter().map(Cell::parse).collect::<Vec<_>>());
        }

        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// A column is numeric when it has at least one value and every value parses as a number.
    pub fn column_kind(&self, column_index: usize) -> ColumnKind {
        let mut values = self
            .rows
            .iter()
            .filter_map(|row| row.get(column_index))
            .filter_map(Cell::as_str)
            .peekable();

        if values.peek().is_none() {
            return ColumnKind::Text;
        }

        if values.all(|value| value.parse::<f64>().is_ok()) {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }

    pub(crate) fn with_rows(&self, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }
}

fn map_csv_error(err: csv::Error) -> DataFormatError {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => DataFormatError::RaggedRow {
            line: pos.as_ref().map(|pos| pos.line()).unwrap_or_default(),
            expected: *expected_len as usize,
            found: *len as usize,
        },
        _ => DataFormatError::Malformed(err.to_string()),
    }
}
