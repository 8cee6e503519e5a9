/// Ordered visible columns: the schema minus hidden keys.
#[derive(Debug, Clone, Default)]
pub struct ColumnModel {
    columns: Vec<String>,
}

impl ColumnModel {
    pub fn new(schema: &[String], hidden: &[String]) -> Self {
        Self {
            columns: visible_columns(schema, hidden),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn first(&self) -> Option<&String> {
        self.columns.first()
    }
}

pub fn visible_columns(schema: &[String], hidden: &[String]) -> Vec<String> {
    schema
        .iter()
        .filter(|key| !hidden.contains(key))
        .cloned()
        .collect()
}
