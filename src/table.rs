use tracing::{debug, trace, warn};

use crate::columns::ColumnModel;
use crate::config::TableConfig;
use crate::domain::{Message, TableError};
use crate::filter::{collect_rows, partition_rows, search_rows};
use crate::partition::PartitionIndex;
use crate::record::Record;
use crate::recordset::RecordSet;
use crate::view::{ViewModel, ViewState};

/// A loaded table: records, derived columns and tabs, and the current view.
#[derive(Debug)]
pub struct Table {
    records: RecordSet,
    columns: ColumnModel,
    partitions: Option<PartitionIndex>,
    state: ViewState,
    partitioned: Vec<usize>, // Row ids after the partition step
    visible: Vec<usize>,     // Row ids after the search step
}

impl Table {
    /// Builds the table from freshly loaded records.
    ///
    /// A partition key missing from the schema is not fatal: tabs are disabled
    /// and the error is handed back next to the table.
    pub fn build(
        records: Vec<Record>,
        config: &TableConfig,
    ) -> Result<(Self, Option<TableError>), TableError> {
        let mut record_set = RecordSet::new();
        record_set.load(records, config.schema_policy, config.schema_sample)?;

        let columns = ColumnModel::new(record_set.schema(), &config.resolved_hidden_columns());
        debug!("Visible columns: {:?}", columns.columns());

        let (partitions, notice) = match config.partition_key.as_deref() {
            Some(key) => match PartitionIndex::compute(&record_set, key) {
                Ok(index) => (Some(index), None),
                Err(e @ TableError::MissingKey(_)) => {
                    warn!("{e}, tabs are disabled");
                    (None, Some(e))
                }
                Err(e) => return Err(e),
            },
            None => (None, None),
        };

        let state = ViewState::initial(&columns);
        let mut table = Self {
            records: record_set,
            columns,
            partitions,
            state,
            partitioned: Vec::new(),
            visible: Vec::new(),
        };
        table.repartition();
        Ok((table, notice))
    }

    /// Applies one message. A rejected message leaves the table untouched.
    pub fn apply(&mut self, message: &Message) -> Result<(), TableError> {
        let next = self
            .state
            .reduce(message, &self.columns, self.partitions.as_ref())?;

        match message {
            Message::SortRequested(_) => {
                if self.state.needs_sort(&next)
                    && let Some(column) = next.sort_column.as_deref()
                {
                    self.records.sort_by(column, next.sort_direction)?;
                }
                self.state = next;
                self.repartition();
            }
            Message::TabSelected(_) => {
                self.state = next;
                self.repartition();
            }
            Message::SearchTermChanged(_) | Message::SearchColumnChanged(_) => {
                self.state = next;
                self.research();
            }
        }
        trace!(
            "Applied {message:?}: {}/{} rows visible",
            self.visible.len(),
            self.records.len()
        );
        Ok(())
    }

    fn repartition(&mut self) {
        self.partitioned = partition_rows(
            &self.records,
            self.partitions.as_ref(),
            &self.state.active_partition,
        );
        self.research();
    }

    fn research(&mut self) {
        self.visible = search_rows(
            &self.records,
            &self.partitioned,
            self.state.search_column.as_deref(),
            &self.state.search_term,
        );
    }

    pub fn view_model(&self) -> ViewModel {
        ViewModel {
            columns: self.columns.columns().to_vec(),
            rows: collect_rows(&self.records, &self.visible, self.columns.columns()),
            partitions: self
                .partitions
                .as_ref()
                .filter(|index| index.enabled())
                .map(|index| index.partitions().to_vec()),
            active_partition: self.state.active_partition.clone(),
            sort_column: self.state.sort_column.clone(),
            sort_direction: self.state.sort_direction,
            search_column: self.state.search_column.clone(),
            search_term: self.state.search_term.clone(),
            total_rows: self.records.len(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn columns(&self) -> &ColumnModel {
        &self.columns
    }

    pub fn partitions(&self) -> Option<&PartitionIndex> {
        self.partitions.as_ref()
    }
}
