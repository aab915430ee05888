//! FieldPath - declarative JSON-to-row flattening
//!
//! Turns nested JSON documents into flat, column-ordered rows by resolving a
//! static list of paths against each document.
//!
//! # Pieces
//!
//! - [`FieldPath`] - an ordered route of keys and indices (`ratings.compliance[0].rating`)
//! - [`resolve`] - walks a path, falling back to a default instead of failing
//! - [`FieldSchema`] - column name to source mapping, loadable from YAML
//! - [`flatten`] - applies a schema to one document, producing zero or more rows
//!
//! # Example
//!
//! ```ignore
//! use fieldpath::{FieldSchema, flatten};
//!
//! let schema = FieldSchema::from_yaml("id: nid\ncolumns:\n  nid: nid\n  rating: ratings.compliance[0].rating\n")?;
//! let rows = flatten(&serde_json::json!({"nid": 1, "ratings": {"compliance": [{"rating": 3}]}}), &schema);
//! assert_eq!(rows[0]["rating"], 3);
//! ```

mod flatten;
mod path;
mod resolve;
mod row;
mod schema;

pub use flatten::{flatten, has_identifier};
pub use path::{FieldPath, PathParseError, Segment};
pub use resolve::{resolve, resolve_or_null};
pub use row::{Completeness, FlatRow, completeness, is_present};
pub use schema::{Column, ColumnSource, FieldSchema, SchemaError};

/// Separator used by `join` columns when none is declared
pub const DEFAULT_JOIN_SEPARATOR: &str = " ";
