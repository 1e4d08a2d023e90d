use std::fmt::Write as _;

use serde::Serialize;

use super::table::{Cell, ColumnKind, DataFormatError, Table};

/// Upper bound on rows that may leave the process in a prompt.
pub const MAX_CLEAN_ROWS: usize = 100;
pub const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct CleanedTable {
    pub table: Table,
    pub raw_row_count: usize,
    pub complete_row_count: usize,
    pub truncated: bool,
}

/// Drops every row with a missing cell, then keeps the first [`MAX_CLEAN_ROWS`].
pub fn clean_table(table: &Table) -> CleanedTable {
    let complete_rows = table
        .rows()
        .iter()
        .filter(|row| !row.iter().any(Cell::is_missing))
        .cloned()
        .collect::<Vec<_>>();
    let complete_row_count = complete_rows.len();
    let truncated = complete_row_count > MAX_CLEAN_ROWS;
    let rows = complete_rows
        .into_iter()
        .take(MAX_CLEAN_ROWS)
        .collect::<Vec<_>>();

    CleanedTable {
        table: table.with_rows(rows),
        raw_row_count: table.row_count(),
        complete_row_count,
        truncated,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; undefined for a single value.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub raw_row_count: usize,
    pub complete_row_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub truncated: bool,
    pub columns: Vec<String>,
    pub missing_counts: Vec<MissingCount>,
    pub numeric_stats: Vec<ColumnStats>,
    pub preview: Vec<Vec<String>>,
    /// CSV rendering of the cleaned rows; the only form sent to the model.
    pub excerpt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SummaryOutcome {
    Ready(DatasetSummary),
    InsufficientData {
        raw_row_count: usize,
        column_count: usize,
    },
}

impl SummaryOutcome {
    pub fn summary(&self) -> Option<&DatasetSummary> {
        match self {
            Self::Ready(summary) => Some(summary),
            Self::InsufficientData { .. } => None,
        }
    }

    pub fn into_summary(self) -> Option<DatasetSummary> {
        match self {
            Self::Ready(summary) => Some(summary),
            Self::InsufficientData { .. } => None,
        }
    }
}

pub fn summarize(table: &Table) -> Result<SummaryOutcome, DataFormatError> {
    let cleaned = clean_table(table);
    if cleaned.table.row_count() == 0 {
        return Ok(SummaryOutcome::InsufficientData {
            raw_row_count: cleaned.raw_row_count,
            column_count: table.column_count(),
        });
    }

    let missing_counts = table
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| MissingCount {
            column: column.clone(),
            missing: table
                .rows()
                .iter()
                .filter(|row| row.get(index).is_none_or(Cell::is_missing))
                .count(),
        })
        .collect::<Vec<_>>();

    let numeric_stats = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(index, _)| table.column_kind(*index) == ColumnKind::Numeric)
        .filter_map(|(index, column)| {
            let values = cleaned
                .table
                .rows()
                .iter()
                .filter_map(|row| row.get(index).and_then(Cell::as_f64))
                .collect::<Vec<_>>();
            describe(column, values)
        })
        .collect::<Vec<_>>();

    let preview = cleaned
        .table
        .rows()
        .iter()
        .take(PREVIEW_ROWS)
        .map(|row| row_strings(row))
        .collect::<Vec<_>>();

    let excerpt = render_csv(&cleaned.table)?;

    Ok(SummaryOutcome::Ready(DatasetSummary {
        raw_row_count: cleaned.raw_row_count,
        complete_row_count: cleaned.complete_row_count,
        row_count: cleaned.table.row_count(),
        column_count: table.column_count(),
        truncated: cleaned.truncated,
        columns: table.columns().to_vec(),
        missing_counts,
        numeric_stats,
        preview,
        excerpt,
    }))
}

impl DatasetSummary {
    /// Human-readable block for the display layer: shape, nulls, statistics and preview.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Rows: {} used of {} ({} complete{})",
            self.row_count,
            self.raw_row_count,
            self.complete_row_count,
            if self.truncated {
                format!(", truncated to {MAX_CLEAN_ROWS}")
            } else {
                String::new()
            }
        );
        let _ = writeln!(out, "Columns: {}", self.column_count);

        out.push_str("Missing values per column:\n");
        for entry in &self.missing_counts {
            let _ = writeln!(out, "  {}: {}", entry.column, entry.missing);
        }

        if !self.numeric_stats.is_empty() {
            out.push_str("Descriptive statistics:\n");
            out.push_str("  column | count | mean | std | min | 25% | 50% | 75% | max\n");
            for stats in &self.numeric_stats {
                let std = stats
                    .std
                    .map(|value| format!("{value:.2}"))
                    .unwrap_or_else(|| "-".to_string());
                let _ = writeln!(
                    out,
                    "  {} | {} | {:.2} | {} | {:.2} | {:.2} | {:.2} | {:.2} | {:.2}",
                    stats.column,
                    stats.count,
                    stats.mean,
                    std,
                    stats.min,
                    stats.q25,
                    stats.median,
                    stats.q75,
                    stats.max
                );
            }
        }

        let _ = writeln!(out, "Preview (first {} rows):", self.preview.len());
        let _ = writeln!(out, "  {}", self.columns.join(", "));
        for row in &self.preview {
            let _ = writeln!(out, "  {}", row.join(", "));
        }

        out
    }
}

fn describe(column: &str, mut values: Vec<f64>) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let variance = values
            .iter()
            .map(|value| (value - mean).powi(2))
            .sum::<f64>()
            / (count - 1) as f64;
        variance.sqrt()
    });

    Some(ColumnStats {
        column: column.to_string(),
        count,
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[count - 1],
    })
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn row_strings(row: &[Cell]) -> Vec<String> {
    row.iter()
        .map(|cell| cell.as_str().unwrap_or_default().to_string())
        .collect()
}

fn render_csv(table: &Table) -> Result<String, DataFormatError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(table.columns())
        .map_err(|err| DataFormatError::Malformed(err.to_string()))?;
    for row in table.rows() {
        writer
            .write_record(row_strings(row))
            .map_err(|err| DataFormatError::Malformed(err.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| DataFormatError::Malformed(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| DataFormatError::Malformed(err.to_string()))
}
