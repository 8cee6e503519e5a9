use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::config::SchemaPolicy;
use crate::domain::{SortDirection, TableError};
use crate::record::{Record, SortKey, SortMode};

static NULL: Value = Value::Null;

/// Reference to a record that stays valid across sorts but not across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RowHandle {
    pub id: usize,
    pub generation: u64,
}

/// Owns the loaded records.
///
/// Records live in an arena that is never reordered. Sorting only rewrites
/// `order`, the mapping of display position to arena index.
#[derive(Debug, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    order: Vec<usize>,
    schema: Vec<String>,
    generation: u64, // Bumped on every load
    version: u64,    // Bumped on every change of `order`
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the content. On error the previous content is kept untouched.
    pub fn load(
        &mut self,
        records: Vec<Record>,
        policy: SchemaPolicy,
        sample: Option<usize>,
    ) -> Result<(), TableError> {
        let Some(first) = records.first() else {
            return Err(TableError::EmptyData);
        };
        let schema: Vec<String> = first.keys().cloned().collect();
        let records = Self::validate(records, &schema, policy, sample)?;

        info!(
            "Loaded {} records with {} columns",
            records.len(),
            schema.len()
        );
        debug!("Schema: {:?}", schema);

        self.order = (0..records.len()).collect();
        self.records = records;
        self.schema = schema;
        self.generation += 1;
        self.version += 1;
        Ok(())
    }

    fn validate(
        mut records: Vec<Record>,
        schema: &[String],
        policy: SchemaPolicy,
        sample: Option<usize>,
    ) -> Result<Vec<Record>, TableError> {
        let limit = sample.unwrap_or(records.len()).min(records.len());
        for (row, record) in records.iter_mut().enumerate().take(limit).skip(1) {
            let missing: Vec<String> = schema
                .iter()
                .filter(|key| !record.contains_key(key.as_str()))
                .cloned()
                .collect();
            let unexpected: Vec<String> = record
                .keys()
                .filter(|key| !schema.contains(key))
                .cloned()
                .collect();
            if missing.is_empty() && unexpected.is_empty() {
                continue;
            }
            match policy {
                SchemaPolicy::Strict => {
                    return Err(TableError::SchemaMismatch {
                        row,
                        missing,
                        unexpected,
                    });
                }
                SchemaPolicy::Pad => {
                    warn!(
                        "Record {row} does not match the schema, padding {missing:?} and dropping {unexpected:?}"
                    );
                    let mut padded = Record::with_capacity(schema.len());
                    for key in schema {
                        let value = record.remove(key.as_str()).unwrap_or(Value::Null);
                        padded.insert(key.clone(), value);
                    }
                    *record = padded;
                }
            }
        }
        Ok(records)
    }

    /// Stable sort of the row order by one field.
    ///
    /// Columns holding a single value type compare natively, anything mixed
    /// compares by display text.
    pub fn sort_by(&mut self, field: &str, direction: SortDirection) -> Result<(), TableError> {
        if !self.schema.iter().any(|key| key == field) {
            return Err(TableError::UnknownColumn(field.to_string()));
        }
        let start_time = Instant::now();

        let values = || self.records.iter().map(|r| r.get(field).unwrap_or(&NULL));
        let mode = SortMode::for_values(values());
        let keys: Vec<SortKey> = values().map(|v| SortKey::new(v, mode)).collect();

        self.order
            .sort_by(|&a, &b| direction.apply(keys[a].compare(&keys[b])));
        self.version += 1;

        trace!(
            "Sorted {} rows by {field} {direction:?} ({mode:?}) in {}ms",
            self.order.len(),
            start_time.elapsed().as_millis()
        );
        Ok(())
    }

    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Arena indices in current display order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn record(&self, id: usize) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn handle(&self, id: usize) -> RowHandle {
        RowHandle {
            id,
            generation: self.generation,
        }
    }

    /// Resolves a handle, `None` if it stems from an earlier load.
    pub fn get(&self, handle: RowHandle) -> Option<&Record> {
        if handle.generation != self.generation {
            return None;
        }
        self.records.get(handle.id)
    }

    /// Records in current display order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.order.iter().map(|&id| &self.records[id])
    }
}
