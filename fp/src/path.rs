//! Field paths and their textual form

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One step of a path: a mapping key or a sequence index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Errors from parsing the textual path syntax
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("path is empty")]
    Empty,

    #[error("empty key at offset {offset} in '{path}'")]
    EmptyKey { offset: usize, path: String },

    #[error("unterminated index at offset {offset} in '{path}'")]
    UnterminatedIndex { offset: usize, path: String },

    #[error("invalid index '{index}' in '{path}'")]
    InvalidIndex { index: String, path: String },
}

/// An ordered route into a JSON document
///
/// Textual form: keys separated by `.`, indices in brackets, e.g.
/// `operationsData.financialReport.annual.income.total.value.value` or
/// `ratings.compliance[0].rating`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Build a path from explicit segments
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Append a key segment
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    /// Append an index segment
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathParseError::Empty);
        }

        let empty_key = |offset: usize| PathParseError::EmptyKey {
            offset,
            path: s.to_string(),
        };

        let mut segments = Vec::new();
        let mut key = String::new();
        // Set after a '.', cleared once the key has at least one character
        let mut expect_key = false;
        let mut chars = s.char_indices();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '.' => {
                    if key.is_empty() {
                        // "a[0].b" is fine, ".a" and "a..b" are not
                        if expect_key || segments.is_empty() || !matches!(segments.last(), Some(Segment::Index(_))) {
                            return Err(empty_key(offset));
                        }
                    } else {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    expect_key = true;
                }
                '[' => {
                    if expect_key && key.is_empty() {
                        return Err(empty_key(offset));
                    }
                    if !key.is_empty() {
                        segments.push(Segment::Key(std::mem::take(&mut key)));
                    }
                    expect_key = false;

                    let mut digits = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        digits.push(c);
                    }
                    if !closed {
                        return Err(PathParseError::UnterminatedIndex {
                            offset,
                            path: s.to_string(),
                        });
                    }
                    let index = digits.trim().parse::<usize>().map_err(|_| PathParseError::InvalidIndex {
                        index: digits.clone(),
                        path: s.to_string(),
                    })?;
                    segments.push(Segment::Index(index));
                }
                _ => {
                    key.push(ch);
                    expect_key = false;
                }
            }
        }

        if !key.is_empty() {
            segments.push(Segment::Key(key));
        } else if expect_key {
            return Err(empty_key(s.len()));
        }

        Ok(Self { segments })
    }
}

impl TryFrom<String> for FieldPath {
    type Error = PathParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{}", key)?,
                Segment::Key(key) => write!(f, ".{}", key)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys_and_index() {
        let path: FieldPath = "ratings.compliance[0].rating".parse().unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Key("ratings".to_string()),
                Segment::Key("compliance".to_string()),
                Segment::Index(0),
                Segment::Key("rating".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_single_key() {
        let path: FieldPath = "nid".parse().unwrap();
        assert_eq!(path, FieldPath::default().key("nid"));
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_parse_root_index_and_consecutive_indices() {
        let path: FieldPath = "[2][10]".parse().unwrap();
        assert_eq!(path.segments(), &[Segment::Index(2), Segment::Index(10)]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<FieldPath>(), Err(PathParseError::Empty));
        assert!(matches!(
            ".a".parse::<FieldPath>(),
            Err(PathParseError::EmptyKey { offset: 0, .. })
        ));
        assert!(matches!("a..b".parse::<FieldPath>(), Err(PathParseError::EmptyKey { .. })));
        assert!(matches!("a.".parse::<FieldPath>(), Err(PathParseError::EmptyKey { .. })));
        assert!(matches!("a.[0]".parse::<FieldPath>(), Err(PathParseError::EmptyKey { .. })));
        assert!(matches!(
            "a[0".parse::<FieldPath>(),
            Err(PathParseError::UnterminatedIndex { .. })
        ));
        assert!(matches!(
            "a[x]".parse::<FieldPath>(),
            Err(PathParseError::InvalidIndex { .. })
        ));
        assert!(matches!(
            "a[-1]".parse::<FieldPath>(),
            Err(PathParseError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn test_display_matches_input() {
        for text in ["nid", "a.b.c", "ratings.compliance[0].rating", "[1].name", "a[0][1]"] {
            let path: FieldPath = text.parse().unwrap();
            assert_eq!(path.to_string(), text);
        }
    }

    #[test]
    fn test_builder() {
        let path = FieldPath::default().key("ach_room_costs").key("subtypes").index(1);
        assert_eq!(path.to_string(), "ach_room_costs.subtypes[1]");
        assert!(!path.is_empty());
    }

    #[test]
    fn test_serde_string_form() {
        let path: FieldPath = serde_json::from_str("\"serviceProvider.city\"").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"serviceProvider.city\"");
        assert!(serde_json::from_str::<FieldPath>("\"a..b\"").is_err());
    }
}
