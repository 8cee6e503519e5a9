use serde::Serialize;
use tracing::trace;

use crate::domain::Partition;
use crate::partition::PartitionIndex;
use crate::record::{Record, display_value};
use crate::recordset::{RecordSet, RowHandle};
use crate::view::ViewState;

/// A record restricted to the visible columns, plus the handle of its source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleRow {
    pub handle: RowHandle,
    pub record: Record,
}

/// Partition step: arena ids in current order that belong to `active`.
pub fn partition_rows(
    records: &RecordSet,
    partitions: Option<&PartitionIndex>,
    active: &Partition,
) -> Vec<usize> {
    match partitions {
        Some(index) if index.enabled() && !active.is_all() => records
            .order()
            .iter()
            .copied()
            .filter(|&id| {
                records
                    .record(id)
                    .is_some_and(|record| index.matches(record, active))
            })
            .collect(),
        _ => records.order().to_vec(),
    }
}

/// Projection step: drops every key that is not a visible column.
pub fn project(record: &Record, columns: &[String]) -> Record {
    columns
        .iter()
        .filter_map(|column| record.get(column).map(|v| (column.clone(), v.clone())))
        .collect()
}

/// Search step: keeps the rows whose display text in `column` contains `term`,
/// ignoring case. Both sides are uppercased, so `ß` matches `SS`. An empty
/// term keeps everything.
pub fn search_rows(
    records: &RecordSet,
    rows: &[usize],
    column: Option<&str>,
    term: &str,
) -> Vec<usize> {
    let Some(column) = column.filter(|_| !term.is_empty()) else {
        return rows.to_vec();
    };
    let needle = term.to_uppercase();
    let matches: Vec<usize> = rows
        .iter()
        .copied()
        .filter(|&id| {
            records
                .record(id)
                .and_then(|record| record.get(column))
                .is_some_and(|value| display_value(value).to_uppercase().contains(&needle))
        })
        .collect();
    trace!(
        "Search for \"{term}\" in {column} kept {}/{} rows",
        matches.len(),
        rows.len()
    );
    matches
}

/// Projects already filtered rows for display.
pub fn collect_rows(records: &RecordSet, rows: &[usize], columns: &[String]) -> Vec<VisibleRow> {
    rows.iter()
        .filter_map(|&id| {
            records.record(id).map(|record| VisibleRow {
                handle: records.handle(id),
                record: project(record, columns),
            })
        })
        .collect()
}

/// All three steps in one go.
pub fn visible_rows(
    records: &RecordSet,
    partitions: Option<&PartitionIndex>,
    state: &ViewState,
    columns: &[String],
) -> Vec<VisibleRow> {
    let kept = partition_rows(records, partitions, &state.active_partition);
    let found = search_rows(
        records,
        &kept,
        state.search_column.as_deref(),
        &state.search_term,
    );
    collect_rows(records, &found, columns)
}
