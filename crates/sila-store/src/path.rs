//! Dot-notation field paths.
//!
//! A [`FieldPath`] locates a value inside a document: `parentId`,
//! `dimensions.width`, or `revisions.0.author`. Segments are separated by
//! `.`; a segment that parses as an unsigned integer addresses an array
//! element when the value being traversed is an array, and is an ordinary
//! object key otherwise.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Name of the immutable identifier field.
pub const ID_FIELD: &str = "id";

/// A validated path into a JSON document. Never empty, no empty segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dot-notation path.
    pub fn parse(path: &str) -> StoreResult<Self> {
        if path.is_empty() {
            return Err(invalid(path, "path is empty"));
        }
        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(invalid(path, "path has an empty segment"));
        }
        Ok(Self { segments })
    }

    /// Join an optional prefix with a property name.
    ///
    /// `None` addresses the property on the document root; `Some("a.b")`
    /// addresses it inside the object (or array element) at `a.b`.
    pub fn join(prefix: Option<&str>, property: &str) -> StoreResult<Self> {
        match prefix {
            Some(prefix) => Self::parse(&format!("{prefix}.{property}")),
            None => Self::parse(property),
        }
    }

    /// The top-level `id` field.
    pub fn id() -> Self {
        Self {
            segments: vec![ID_FIELD.to_string()],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if this path equals `other` or is a prefix of it.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }

    /// Returns `true` if either path is a prefix of the other.
    pub fn overlaps(&self, other: &FieldPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Returns `true` if this path addresses the document id or something
    /// beneath it.
    pub fn touches_id(&self) -> bool {
        self.segments[0] == ID_FIELD
    }

    /// Look up the value at this path.
    pub fn get<'a>(&self, document: &'a Value) -> Option<&'a Value> {
        let mut current = document;
        for segment in &self.segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn parent_mut<'a>(&self, document: &'a mut Value) -> Option<&'a mut Value> {
        let mut current = document;
        for segment in &self.segments[..self.segments.len() - 1] {
            current = match current {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set the value at this path, creating missing intermediate objects.
    ///
    /// Array elements are never created implicitly except by setting the
    /// index one past the end, which appends.
    pub fn set(&self, document: &mut Value, value: Value) -> StoreResult<()> {
        let (last, parents) = self
            .segments
            .split_last()
            .ok_or_else(|| invalid("", "path is empty"))?;

        let mut current = document;
        for segment in parents {
            current = match current {
                Value::Object(map) => map
                    .entry(segment.clone())
                    .or_insert_with(|| Value::Object(Map::new())),
                Value::Array(items) => {
                    let len = items.len();
                    let index = self.index(segment)?;
                    items.get_mut(index).ok_or_else(|| StoreError::IndexOutOfBounds {
                        path: self.to_string(),
                        index,
                        len,
                    })?
                }
                other => return Err(self.mismatch("object or array", other)),
            };
        }

        match current {
            Value::Object(map) => {
                map.insert(last.clone(), value);
                Ok(())
            }
            Value::Array(items) => {
                let index = self.index(last)?;
                if index < items.len() {
                    items[index] = value;
                    Ok(())
                } else if index == items.len() {
                    items.push(value);
                    Ok(())
                } else {
                    Err(StoreError::IndexOutOfBounds {
                        path: self.to_string(),
                        index,
                        len: items.len(),
                    })
                }
            }
            other => Err(self.mismatch("object or array", other)),
        }
    }

    /// Remove the value at this path and return it.
    ///
    /// Removing an absent path is a no-op. Removing an array element sets it
    /// to `null` so the positions of later elements do not shift.
    pub fn remove(&self, document: &mut Value) -> Option<Value> {
        let last = self.segments.last()?;
        match self.parent_mut(document)? {
            Value::Object(map) => map.remove(last),
            Value::Array(items) => {
                let slot = items.get_mut(last.parse::<usize>().ok()?)?;
                Some(std::mem::take(slot))
            }
            _ => None,
        }
    }

    fn index(&self, segment: &str) -> StoreResult<usize> {
        segment.parse::<usize>().map_err(|_| StoreError::PathType {
            path: self.to_string(),
            expected: "array index",
            found: "key",
        })
    }

    fn mismatch(&self, expected: &'static str, found: &Value) -> StoreError {
        StoreError::PathType {
            path: self.to_string(),
            expected,
            found: type_name(found),
        }
    }
}

fn invalid(path: &str, reason: &'static str) -> StoreError {
    StoreError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

/// JSON type name for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl FromStr for FieldPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn parse_rejects_empty_segments() {
        for bad in ["", ".", "a..b", ".a", "a."] {
            let err = FieldPath::parse(bad).unwrap_err();
            assert!(matches!(err, StoreError::InvalidPath { .. }), "{bad}");
        }
    }

    #[test]
    fn join_with_and_without_prefix() {
        assert_eq!(FieldPath::join(None, "parentId").unwrap(), path("parentId"));
        assert_eq!(
            FieldPath::join(Some("specs.0"), "width").unwrap().to_string(),
            "specs.0.width"
        );
        assert!(FieldPath::join(Some(""), "width").is_err());
        assert!(FieldPath::join(None, "").is_err());
    }

    #[test]
    fn prefix_relationships() {
        let a = path("specs");
        let ab = path("specs.width");
        assert!(a.is_prefix_of(&ab));
        assert!(!ab.is_prefix_of(&a));
        assert!(a.overlaps(&ab) && ab.overlaps(&a));
        assert!(!path("specs.width").overlaps(&path("specs.height")));
        assert!(!path("spec").overlaps(&path("specs")));
    }

    #[test]
    fn id_detection() {
        assert!(FieldPath::id().touches_id());
        assert!(path("id.nested").touches_id());
        assert!(!path("parentId").touches_id());
    }

    #[test]
    fn get_through_objects_and_arrays() {
        let doc = json!({ "a": { "list": [ { "b": 1 }, { "b": 2 } ] } });
        assert_eq!(path("a.list.1.b").get(&doc), Some(&json!(2)));
        assert_eq!(path("a.list.5.b").get(&doc), None);
        assert_eq!(path("a.missing").get(&doc), None);
        assert_eq!(path("a.list.x").get(&doc), None);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut doc = json!({ "name": "Bolt" });
        path("specs.thread.pitch").set(&mut doc, json!(1.25)).unwrap();
        assert_eq!(doc["specs"]["thread"]["pitch"], json!(1.25));
        assert_eq!(doc["name"], "Bolt");
    }

    #[test]
    fn set_array_element_and_append() {
        let mut doc = json!({ "tags": ["a", "b"] });
        path("tags.1").set(&mut doc, json!("B")).unwrap();
        path("tags.2").set(&mut doc, json!("c")).unwrap();
        assert_eq!(doc["tags"], json!(["a", "B", "c"]));

        let err = path("tags.9").set(&mut doc, json!("z")).unwrap_err();
        assert!(matches!(err, StoreError::IndexOutOfBounds { index: 9, len: 3, .. }));
    }

    #[test]
    fn set_through_scalar_is_type_error() {
        let mut doc = json!({ "name": "Bolt" });
        let err = path("name.first").set(&mut doc, json!("x")).unwrap_err();
        assert!(matches!(err, StoreError::PathType { found: "string", .. }));
    }

    #[test]
    fn remove_object_key_and_array_slot() {
        let mut doc = json!({ "parentId": "A1", "tags": ["a", "b", "c"] });
        assert_eq!(path("parentId").remove(&mut doc), Some(json!("A1")));
        assert!(doc.get("parentId").is_none());

        assert_eq!(path("tags.1").remove(&mut doc), Some(json!("b")));
        assert_eq!(doc["tags"], json!(["a", null, "c"]));

        assert_eq!(path("missing.deep").remove(&mut doc), None);
    }

    proptest! {
        #[test]
        fn display_round_trips(segments in prop::collection::vec("[a-zA-Z0-9_]{1,8}", 1..6)) {
            let text = segments.join(".");
            let parsed = FieldPath::parse(&text).unwrap();
            prop_assert_eq!(parsed.to_string(), text);
            prop_assert_eq!(parsed.len(), segments.len());
        }
    }
}
