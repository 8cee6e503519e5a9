use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

/// One flat data item. Key order is preserved and the first record's keys form the schema.
pub type Record = Map<String, Value>;

/// Text shown for a value in a cell, and matched against by search.
///
/// Nested values are flattened one level: every member becomes `" {member}"`
/// and the pieces are joined with `,`. Members that are nested themselves are
/// written as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => join_members(items.iter()),
        Value::Object(map) => join_members(map.values()),
    }
}

/// Whole floats drop their fraction, so `1.0` reads and searches as `1`.
fn display_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => format!("{f:.0}"),
        _ => n.to_string(),
    }
}

fn join_members<'a>(members: impl Iterator<Item = &'a Value>) -> String {
    members
        .map(|member| match member {
            Value::Array(_) | Value::Object(_) | Value::Null => {
                format!(" {}", serde_json::to_string(member).unwrap_or_default())
            }
            scalar => format!(" {}", display_value(scalar)),
        })
        .collect::<Vec<String>>()
        .join(",")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Bool,
    Number,
    String,
    Nested,
}

fn value_kind(value: &Value) -> Option<ValueKind> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(ValueKind::Bool),
        Value::Number(_) => Some(ValueKind::Number),
        Value::String(_) => Some(ValueKind::String),
        Value::Array(_) | Value::Object(_) => Some(ValueKind::Nested),
    }
}

/// How the values of one column are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// All non-null values share one scalar type and compare natively.
    /// Numbers compare as floats as soon as one of them is a float.
    Native { float: bool },
    /// Mixed or nested values, compared by their display text.
    Text,
}

impl SortMode {
    pub fn for_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut seen: Option<ValueKind> = None;
        let mut float = false;
        for value in values {
            let Some(kind) = value_kind(value) else {
                continue;
            };
            float |= value.is_f64();
            match seen {
                None => seen = Some(kind),
                Some(previous) if previous != kind => return SortMode::Text,
                Some(_) => {}
            }
        }
        match seen {
            Some(ValueKind::Nested) => SortMode::Text,
            _ => SortMode::Native { float },
        }
    }
}

/// Precomputed comparison key of a single cell.
#[derive(Debug)]
pub enum SortKey<'a> {
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    Str(&'a str),
    Text(String),
}

impl<'a> SortKey<'a> {
    pub fn new(value: &'a Value, mode: SortMode) -> Self {
        let SortMode::Native { float } = mode else {
            return SortKey::Text(display_value(value));
        };
        match value {
            Value::Null => SortKey::Null,
            Value::Bool(b) => SortKey::Bool(*b),
            Value::String(s) => SortKey::Str(s),
            Value::Number(n) if !float => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from))
                .map_or(SortKey::Float(n.as_f64().unwrap_or(f64::NAN)), SortKey::Integer),
            Value::Number(n) => SortKey::Float(n.as_f64().unwrap_or(f64::NAN)),
            nested => SortKey::Text(display_value(nested)),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Null => 0,
            SortKey::Bool(_) => 1,
            SortKey::Integer(_) => 2,
            SortKey::Float(_) => 3,
            SortKey::Str(_) => 4,
            SortKey::Text(_) => 5,
        }
    }

    /// Ascending three way comparison. Nulls come first in native mode.
    pub fn compare(&self, other: &SortKey<'_>) -> Ordering {
        match (self, other) {
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Integer(a), SortKey::Integer(b)) => a.cmp(b),
            (SortKey::Float(a), SortKey::Float(b)) => a.total_cmp(b),
            (SortKey::Str(a), SortKey::Str(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            // Keys of one column differ in kind only against nulls.
            _ => self.rank().cmp(&other.rank()),
        }
    }
}
