pub mod summary;
pub mod table;

pub use summary::{
    CleanedTable, ColumnStats, DatasetSummary, MAX_CLEAN_ROWS, MissingCount, PREVIEW_ROWS,
    SummaryOutcome, clean_table, summarize,
};
pub use table::{Cell, ColumnKind, DataFormatError, Table};
