//! Declarative field schemas

use std::collections::HashSet;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::path::FieldPath;

/// Errors raised while building or loading a schema
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("column '{0}' reads from a sub-entity but the schema has no `expand` path")]
    ElementWithoutExpansion(String),

    #[error("schema declares no columns")]
    NoColumns,

    #[error("invalid schema document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn default_separator() -> String {
    crate::DEFAULT_JOIN_SEPARATOR.to_string()
}

/// Where a column takes its value from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSource {
    /// Path from the document root
    Document(FieldPath),

    /// Path from the current sub-entity element (multi-row schemas only)
    Element { element: FieldPath },

    /// Document-level parts joined as text; null unless every part is populated
    Join {
        join: Vec<FieldPath>,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

impl ColumnSource {
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }
}

/// A named output column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub source: ColumnSource,
}

/// Column-name to source mapping for one pipeline
///
/// Column order is declaration order and becomes the output column order.
/// `id` is the identifier gate: documents without it flatten to no rows.
/// `expand`, when set, yields one row per element of the sequence it names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "SchemaDocument")]
pub struct FieldSchema {
    id: FieldPath,
    expand: Option<FieldPath>,
    columns: Vec<Column>,
}

impl FieldSchema {
    /// Empty single-row schema gated on `id`
    pub fn new(id: FieldPath) -> Self {
        Self {
            id,
            expand: None,
            columns: Vec::new(),
        }
    }

    /// Turn this into a multi-row schema over the sequence at `path`
    pub fn with_expansion(mut self, path: FieldPath) -> Self {
        self.expand = Some(path);
        self
    }

    /// Append a column, rejecting duplicates and misplaced element sources
    pub fn push(&mut self, name: impl Into<String>, source: ColumnSource) -> Result<(), SchemaError> {
        let name = name.into();
        if self.columns.iter().any(|c| c.name == name) {
            return Err(SchemaError::DuplicateColumn(name));
        }
        if source.is_element() && self.expand.is_none() {
            return Err(SchemaError::ElementWithoutExpansion(name));
        }
        self.columns.push(Column { name, source });
        Ok(())
    }

    /// Chaining form of [`FieldSchema::push`]
    pub fn column(mut self, name: impl Into<String>, source: ColumnSource) -> Result<Self, SchemaError> {
        self.push(name, source)?;
        Ok(self)
    }

    /// Parse a YAML schema document
    pub fn from_yaml(text: &str) -> Result<Self, SchemaError> {
        let doc: SchemaDocument = serde_yaml::from_str(text)?;
        Self::try_from(doc)
    }

    pub fn id_path(&self) -> &FieldPath {
        &self.id
    }

    pub fn expansion(&self) -> Option<&FieldPath> {
        self.expand.as_ref()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// On-disk shape of a schema
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDocument {
    id: FieldPath,
    #[serde(default)]
    expand: Option<FieldPath>,
    columns: ColumnList,
}

impl TryFrom<SchemaDocument> for FieldSchema {
    type Error = SchemaError;

    fn try_from(doc: SchemaDocument) -> Result<Self, Self::Error> {
        if doc.columns.0.is_empty() {
            return Err(SchemaError::NoColumns);
        }
        let mut schema = FieldSchema::new(doc.id);
        schema.expand = doc.expand;
        for (name, source) in doc.columns.0 {
            schema.push(name, source)?;
        }
        Ok(schema)
    }
}

/// Columns in document order; duplicates are a parse error
#[derive(Debug)]
struct ColumnList(Vec<(String, ColumnSource)>);

impl<'de> Deserialize<'de> for ColumnList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnListVisitor;

        impl<'de> Visitor<'de> for ColumnListVisitor {
            type Value = ColumnList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of column name to path")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut seen = HashSet::new();
                let mut columns = Vec::new();
                while let Some((name, source)) = map.next_entry::<String, ColumnSource>()? {
                    if !seen.insert(name.clone()) {
                        return Err(de::Error::custom(format!("duplicate column '{}'", name)));
                    }
                    columns.push((name, source));
                }
                Ok(ColumnList(columns))
            }
        }

        deserializer.deserialize_map(ColumnListVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADS_LIKE: &str = r#"
id: nid
expand: ach_room_costs.subtypes
columns:
  nid: nid
  provider_name: name
  room_type: { element: productName }
  maximumRAD: { element: maximumRAD }
  suburb_postcode: { join: [serviceProvider.city, serviceProvider.postcode] }
  state: serviceProvider.state
"#;

    #[test]
    fn test_yaml_schema_keeps_declaration_order() {
        let schema = FieldSchema::from_yaml(RADS_LIKE).unwrap();
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(
            names,
            ["nid", "provider_name", "room_type", "maximumRAD", "suburb_postcode", "state"]
        );
        assert_eq!(schema.expansion().unwrap().to_string(), "ach_room_costs.subtypes");
        assert_eq!(schema.id_path().to_string(), "nid");
    }

    #[test]
    fn test_yaml_column_sources() {
        let schema = FieldSchema::from_yaml(RADS_LIKE).unwrap();
        let cols = schema.columns();
        assert!(matches!(cols[0].source, ColumnSource::Document(_)));
        assert!(cols[2].source.is_element());
        match &cols[4].source {
            ColumnSource::Join { join, separator } => {
                assert_eq!(join.len(), 2);
                assert_eq!(separator, " ");
            }
            other => panic!("expected join column, got {:?}", other),
        }
    }

    #[test]
    fn test_yaml_custom_separator() {
        let yaml = "id: nid\ncolumns:\n  place: { join: [a, b], separator: \", \" }\n";
        let schema = FieldSchema::from_yaml(yaml).unwrap();
        assert!(matches!(
            &schema.columns()[0].source,
            ColumnSource::Join { separator, .. } if separator == ", "
        ));
    }

    #[test]
    fn test_yaml_rejects_duplicate_columns() {
        let yaml = "id: nid\ncolumns:\n  nid: nid\n  nid: other\n";
        assert!(FieldSchema::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_yaml_rejects_element_without_expand() {
        let yaml = "id: nid\ncolumns:\n  room: { element: productName }\n";
        assert!(matches!(
            FieldSchema::from_yaml(yaml),
            Err(SchemaError::ElementWithoutExpansion(name)) if name == "room"
        ));
    }

    #[test]
    fn test_yaml_rejects_bad_path_and_empty_columns() {
        assert!(FieldSchema::from_yaml("id: nid\ncolumns:\n  a: \"x..y\"\n").is_err());
        assert!(matches!(
            FieldSchema::from_yaml("id: nid\ncolumns: {}\n"),
            Err(SchemaError::NoColumns)
        ));
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let mut schema = FieldSchema::new("nid".parse().unwrap());
        schema
            .push("nid", ColumnSource::Document("nid".parse().unwrap()))
            .unwrap();
        let err = schema
            .push("nid", ColumnSource::Document("other".parse().unwrap()))
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateColumn(name) if name == "nid"));
        assert_eq!(schema.len(), 1);
    }
}
