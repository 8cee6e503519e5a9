use std::cmp::Ordering;
use std::fmt;
use std::io::Error;

use polars::error::PolarsError;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::record::display_value;

/// Label of the synthetic partition that matches every record.
pub const ALL_PARTITION_LABEL: &str = "All";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Loading data failed: {0}")]
    DataLoad(String),

    #[error("No records to display")]
    EmptyData,

    #[error("Partition key \"{0}\" is not part of the record schema")]
    MissingKey(String),

    #[error("Record {row} does not match the schema (missing: {missing:?}, unexpected: {unexpected:?})")]
    SchemaMismatch {
        row: usize,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Unknown or hidden column \"{0}\"")]
    UnknownColumn(String),

    #[error("Unknown partition \"{0}\"")]
    UnknownPartition(String),

    #[error("Table is still loading")]
    NotReady,

    #[error("Data was already loaded")]
    AlreadyLoaded,

    #[error("File not found")]
    FileNotFound,

    #[error("Permission denied")]
    PermissionDenied,

    #[error("Unknown file type")]
    UnknownFileType,

    #[error("IO error: {0}")]
    IoError(#[from] Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

impl TableError {
    /// True for errors raised while fetching or decoding the source data.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            TableError::DataLoad(_)
                | TableError::FileNotFound
                | TableError::PermissionDenied
                | TableError::UnknownFileType
                | TableError::IoError(_)
                | TableError::JsonError(_)
                | TableError::PolarsError(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDirection {
    Ascending,
    // The sort icon starts out pointing down, so a fresh column sorts descending.
    #[default]
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    /// Applies the direction to an ascending comparison result.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SortDirection::Ascending => "⏶",
            SortDirection::Descending => "🞃",
        }
    }
}

/// A tab: either the synthetic "All" tab or one distinct value of the tab field.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub enum Partition {
    #[default]
    All,
    Value(Value),
}

impl Partition {
    pub fn is_all(&self) -> bool {
        matches!(self, Partition::All)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::All => f.write_str(ALL_PARTITION_LABEL),
            Partition::Value(value) => f.write_str(&display_value(value)),
        }
    }
}

/// User intents the table reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    TabSelected(Partition),
    SortRequested(String),
    SearchTermChanged(String),
    SearchColumnChanged(String),
}
