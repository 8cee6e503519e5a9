use std::collections::HashSet;

use tracing::debug;

use crate::domain::{Partition, TableError};
use crate::record::Record;
use crate::recordset::RecordSet;

/// Distinct values of the tab field in first seen order.
#[derive(Debug, Clone, Default)]
pub struct PartitionIndex {
    key: String,
    partitions: Vec<Partition>,
}

impl PartitionIndex {
    /// Collects the tabs for `key`. "All" is prepended only when there is more
    /// than one distinct value, otherwise tabs are disabled.
    pub fn compute(records: &RecordSet, key: &str) -> Result<Self, TableError> {
        if !records.schema().iter().any(|k| k == key) {
            return Err(TableError::MissingKey(key.to_string()));
        }

        let mut seen = HashSet::new();
        let mut partitions = Vec::new();
        for value in records.iter().filter_map(|r| r.get(key)) {
            if seen.insert(serde_json::to_string(value)?) {
                partitions.push(Partition::Value(value.clone()));
            }
        }
        if partitions.len() > 1 {
            partitions.insert(0, Partition::All);
        }
        debug!("Partitions on {key}: {}", partitions.len());

        Ok(Self {
            key: key.to_string(),
            partitions,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn enabled(&self) -> bool {
        self.partitions.len() > 1
    }

    /// "All" is always a valid selection, even with tabs disabled.
    pub fn contains(&self, partition: &Partition) -> bool {
        partition.is_all() || self.partitions.contains(partition)
    }

    pub fn matches(&self, record: &Record, partition: &Partition) -> bool {
        match partition {
            Partition::All => true,
            Partition::Value(value) => record.get(&self.key) == Some(value),
        }
    }
}
