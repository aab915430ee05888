//! CSV output

use std::fs;
use std::path::Path;

use fieldpath::FlatRow;
use serde_json::Value;
use tracing::{debug, info};

/// Writes flat rows to one CSV file
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSink;

impl CsvSink {
    /// Write `rows` to `path`, header from the first row's keys
    ///
    /// An empty row set creates no file and returns `Ok(false)`. An existing
    /// file at `path` is overwritten.
    pub fn write(&self, rows: &[FlatRow], path: &Path) -> Result<bool, csv::Error> {
        let Some(first) = rows.first() else {
            info!(path = %path.display(), "No rows to write, skipping output");
            return Ok(false);
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let header: Vec<&str> = first.keys().map(String::as_str).collect();
        debug!(path = %path.display(), columns = header.len(), rows = rows.len(), "CsvSink::write: called");

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&header)?;
        for row in rows {
            writer.write_record(header.iter().map(|column| render(row.get(*column))))?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = rows.len(), "Wrote CSV");
        Ok(true)
    }
}

/// Cell text: null is empty, strings raw, containers as JSON
fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn row(value: Value) -> FlatRow {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    #[test]
    fn test_empty_rows_create_no_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out").join("empty.csv");
        assert!(!CsvSink.write(&[], &path).unwrap());
        assert!(!path.exists());
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_header_order_and_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("ops.csv");
        let rows = vec![
            row(json!({"nid": 1, "name": "Home, Inc", "rating": 3.5, "open": true, "note": null})),
            row(json!({"nid": 2, "name": "Other", "rating": null, "open": false, "note": [1, 2]})),
        ];

        assert!(CsvSink.write(&rows, &path).unwrap());
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "nid,name,rating,open,note");
        assert_eq!(lines[1], "1,\"Home, Inc\",3.5,true,");
        assert_eq!(lines[2], "2,Other,,false,\"[1,2]\"");
    }

    #[test]
    fn test_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");
        fs::write(&path, "stale\n").unwrap();

        CsvSink.write(&[row(json!({"nid": 9}))], &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "nid\n9\n");
    }

    #[test]
    fn test_missing_keys_render_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");
        let rows = vec![row(json!({"a": 1, "b": 2})), row(json!({"a": 3}))];
        CsvSink.write(&rows, &path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a,b\n1,2\n3,\n");
    }
}
