use derive_setters::Setters;

/// What to do with records whose keys differ from the first record's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaPolicy {
    /// Reject the whole load with `TableError::SchemaMismatch`.
    #[default]
    Strict,
    /// Fill missing keys with null and drop unexpected ones.
    Pad,
}

/// Construction time settings of a table. Immutable once handed to the controller.
#[derive(Debug, Clone, Default, Setters)]
#[setters(prefix = "with_")]
pub struct TableConfig {
    /// Field whose distinct values become tabs.
    #[setters(strip_option)]
    pub partition_key: Option<String>,
    /// Columns never shown. Defaults to the partition key when unset.
    #[setters(strip_option)]
    pub hidden_columns: Option<Vec<String>>,
    pub schema_policy: SchemaPolicy,
    /// Number of records checked against the schema, all of them when unset.
    #[setters(strip_option)]
    pub schema_sample: Option<usize>,
}

impl TableConfig {
    /// Hidden columns after applying the partition key default.
    pub fn resolved_hidden_columns(&self) -> Vec<String> {
        match (&self.hidden_columns, &self.partition_key) {
            (Some(hidden), _) => hidden.clone(),
            (None, Some(key)) => vec![key.clone()],
            (None, None) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_is_hidden_by_default() {
        let cfg = TableConfig::default().with_partition_key("type".to_string());
        assert_eq!(cfg.resolved_hidden_columns(), vec!["type".to_string()]);
    }

    #[test]
    fn explicit_hidden_columns_replace_the_default() {
        let cfg = TableConfig::default()
            .with_partition_key("type".to_string())
            .with_hidden_columns(vec!["id".to_string()]);
        assert_eq!(cfg.resolved_hidden_columns(), vec!["id".to_string()]);

        let cfg = TableConfig::default()
            .with_partition_key("type".to_string())
            .with_hidden_columns(Vec::new());
        assert!(cfg.resolved_hidden_columns().is_empty());
    }

    #[test]
    fn nothing_hidden_without_configuration() {
        let cfg = TableConfig::default();
        assert!(cfg.resolved_hidden_columns().is_empty());
        assert_eq!(cfg.schema_policy, SchemaPolicy::Strict);
        assert_eq!(cfg.schema_sample, None);
    }
}
