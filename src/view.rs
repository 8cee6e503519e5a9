//! View state and the pure transition function driving it.
//!
//! `ViewState::reduce` validates a `Message` against the current columns and
//! tabs and returns the next state. Side effects, like reordering the record
//! set, are left to the caller comparing old and new state.

use serde::Serialize;

use crate::columns::ColumnModel;
use crate::domain::{Message, Partition, SortDirection, TableError};
use crate::filter::VisibleRow;
use crate::partition::PartitionIndex;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub active_partition: Partition,
    pub sort_column: Option<String>,
    pub sort_direction: SortDirection,
    /// Always a visible column, `None` only if no column is visible.
    pub search_column: Option<String>,
    pub search_term: String,
}

impl ViewState {
    /// No sort, no tab filter, searching the first visible column.
    pub fn initial(columns: &ColumnModel) -> Self {
        Self {
            active_partition: Partition::All,
            sort_column: None,
            sort_direction: SortDirection::default(),
            search_column: columns.first().cloned(),
            search_term: String::new(),
        }
    }

    pub fn reduce(
        &self,
        message: &Message,
        columns: &ColumnModel,
        partitions: Option<&PartitionIndex>,
    ) -> Result<ViewState, TableError> {
        let mut next = self.clone();
        match message {
            Message::TabSelected(partition) => {
                let known = match partitions {
                    Some(index) => index.contains(partition),
                    None => partition.is_all(),
                };
                if !known {
                    return Err(TableError::UnknownPartition(partition.to_string()));
                }
                next.active_partition = partition.clone();
            }
            Message::SortRequested(column) => {
                if !columns.contains(column) {
                    return Err(TableError::UnknownColumn(column.clone()));
                }
                if self.sort_column.as_ref() == Some(column) {
                    next.sort_direction = self.sort_direction.toggle();
                } else {
                    next.sort_column = Some(column.clone());
                    next.sort_direction = SortDirection::Descending;
                }
            }
            Message::SearchTermChanged(term) => {
                next.search_term = term.clone();
            }
            Message::SearchColumnChanged(column) => {
                if !columns.contains(column) {
                    return Err(TableError::UnknownColumn(column.clone()));
                }
                next.search_column = Some(column.clone());
            }
        }
        Ok(next)
    }

    /// True if going from `self` to `next` requires reordering the records.
    pub fn needs_sort(&self, next: &ViewState) -> bool {
        next.sort_column.is_some()
            && (self.sort_column != next.sort_column || self.sort_direction != next.sort_direction)
    }
}

/// Everything a renderer needs to draw the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub columns: Vec<String>,
    pub rows: Vec<VisibleRow>,
    /// `None` when tabs are not configured or disabled.
    pub partitions: Option<Vec<Partition>>,
    pub active_partition: Partition,
    pub sort_column: Option<String>,
    pub sort_direction: SortDirection,
    pub search_column: Option<String>,
    pub search_term: String,
    /// Number of records before any filtering.
    pub total_rows: usize,
}

impl ViewModel {
    pub fn active_partition_index(&self) -> Option<usize> {
        self.partitions
            .as_ref()?
            .iter()
            .position(|p| *p == self.active_partition)
    }
}
