//! Flat rows and completeness scoring

use serde_json::Value;

/// One output record, column name to value, in schema column order
pub type FlatRow = serde_json::Map<String, Value>;

/// Whether a value counts as populated: not null, not an empty string,
/// not an empty array or object
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Populated fields of a row against an expected field count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completeness {
    pub present: usize,
    pub expected: usize,
}

impl Completeness {
    pub fn missing(&self) -> usize {
        self.expected.saturating_sub(self.present)
    }

    pub fn is_complete(&self) -> bool {
        self.missing() == 0
    }

    /// Present over expected, in `0.0..=1.0` (1.0 when nothing is expected)
    pub fn ratio(&self) -> f64 {
        if self.expected == 0 {
            return 1.0;
        }
        (self.present as f64 / self.expected as f64).min(1.0)
    }

    /// Share of expected fields that are missing, as a percentage
    pub fn missing_pct(&self) -> f64 {
        (1.0 - self.ratio()) * 100.0
    }
}

/// Score a row against the expected field count
pub fn completeness(row: &FlatRow, expected: usize) -> Completeness {
    Completeness {
        present: row.values().filter(|v| is_present(v)).count(),
        expected,
    }
}
