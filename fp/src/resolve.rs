//! Safe nested lookup

use serde_json::Value;

use crate::path::{FieldPath, Segment};

static NULL: Value = Value::Null;

/// Walk `path` through `document`, returning `default` wherever data is absent
///
/// - index into a sequence: out of range returns `default` immediately
/// - key into a mapping: a missing key substitutes `default` and the walk
///   continues against it
/// - anything else (key into a sequence, any step into a scalar) returns
///   `default` immediately
///
/// Never panics and never allocates.
pub fn resolve<'a>(document: &'a Value, path: &FieldPath, default: &'a Value) -> &'a Value {
    let mut node = document;
    for segment in path.segments() {
        node = match (segment, node) {
            (Segment::Index(index), Value::Array(items)) => match items.get(*index) {
                Some(item) => item,
                None => return default,
            },
            (Segment::Key(key), Value::Object(map)) => map.get(key).unwrap_or(default),
            // JSON object keys are strings, so an index never names one
            (Segment::Index(_), Value::Object(_)) => default,
            _ => return default,
        };
    }
    node
}

/// [`resolve`] with `null` as the default
pub fn resolve_or_null<'a>(document: &'a Value, path: &FieldPath) -> &'a Value {
    resolve(document, path, &NULL)
}
