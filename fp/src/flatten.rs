//! Record flattening
//!
//! Applies a [`FieldSchema`] to one raw document. Absence of data is never an
//! error here: a document without an identifier, or a multi-row schema whose
//! sub-entity list is missing or empty, simply produces no rows.

use serde_json::Value;
use tracing::debug;

use crate::path::FieldPath;
use crate::resolve::resolve_or_null;
use crate::row::{FlatRow, is_present};
use crate::schema::{ColumnSource, FieldSchema};

/// Whether an identifier value counts as present
///
/// Null, `false`, zero and the empty string all count as missing.
pub fn has_identifier(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Flatten one document into rows
pub fn flatten(document: &Value, schema: &FieldSchema) -> Vec<FlatRow> {
    let id = resolve_or_null(document, schema.id_path());
    if !has_identifier(id) {
        debug!(id_path = %schema.id_path(), "flatten: no identifier, skipping document");
        return Vec::new();
    }

    let Some(list_path) = schema.expansion() else {
        return vec![build_row(document, None, schema)];
    };

    match resolve_or_null(document, list_path) {
        Value::Array(items) if !items.is_empty() => {
            debug!(%id, count = items.len(), "flatten: expanding sub-entities");
            items.iter().map(|item| build_row(document, Some(item), schema)).collect()
        }
        _ => {
            debug!(%id, list = %list_path, "flatten: no sub-entities");
            Vec::new()
        }
    }
}

fn build_row(document: &Value, element: Option<&Value>, schema: &FieldSchema) -> FlatRow {
    let mut row = FlatRow::new();
    for column in schema.columns() {
        let value = match &column.source {
            ColumnSource::Document(path) => resolve_or_null(document, path).clone(),
            ColumnSource::Element { element: path } => element
                .map(|item| resolve_or_null(item, path).clone())
                .unwrap_or(Value::Null),
            ColumnSource::Join { join, separator } => join_parts(document, join, separator),
        };
        row.insert(column.name.clone(), value);
    }
    row
}

/// `"{a}{sep}{b}"` when every part is a populated scalar, otherwise null
fn join_parts(document: &Value, parts: &[FieldPath], separator: &str) -> Value {
    let mut rendered = Vec::with_capacity(parts.len());
    for path in parts {
        let value = resolve_or_null(document, path);
        if !is_present(value) {
            return Value::Null;
        }
        match value {
            Value::String(s) => rendered.push(s.clone()),
            Value::Number(n) => rendered.push(n.to_string()),
            Value::Bool(b) => rendered.push(b.to_string()),
            _ => return Value::Null,
        }
    }
    Value::String(rendered.join(separator))
}
