//! Path-addressed partial updates.
//!
//! An [`Update`] is an ordered batch of [`UpdateOp`]s that a backend applies
//! to each matched document in one call. Ops are keyed by path: pushing an
//! op for a path already present replaces the earlier op in place, so the
//! last write within a batch wins. Paths that overlap without being equal
//! (`specs` and `specs.width`) cannot share a batch.
//!
//! [`StackedField`] and [`Update::stacked`] build a multi-field update from
//! `(prefix, property, value)` triples, which is how callers set several
//! properties of the same document atomically.

use std::fmt;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::path::{type_name, FieldPath};

/// A single mutation at a path.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateOp {
    /// Write `value` at `path`, creating intermediate objects.
    Set { path: FieldPath, value: Value },
    /// Remove the field at `path`. Absent fields are left alone.
    Unset { path: FieldPath },
    /// Append `value` to the array at `path` unless an equal element exists.
    AddToSet { path: FieldPath, value: Value },
}

impl UpdateOp {
    pub fn set(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::Set {
            path,
            value: value.into(),
        }
    }

    pub fn unset(path: FieldPath) -> Self {
        Self::Unset { path }
    }

    pub fn add_to_set(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::AddToSet {
            path,
            value: value.into(),
        }
    }

    /// The path this op writes.
    pub fn path(&self) -> &FieldPath {
        match self {
            Self::Set { path, .. } | Self::Unset { path } | Self::AddToSet { path, .. } => path,
        }
    }

    fn apply(&self, document: &mut Value) -> StoreResult<()> {
        match self {
            Self::Set { path, value } => path.set(document, value.clone()),
            Self::Unset { path } => {
                path.remove(document);
                Ok(())
            }
            Self::AddToSet { path, value } => {
                let mut items = match path.get(document) {
                    None => Vec::new(),
                    Some(Value::Array(items)) if items.contains(value) => return Ok(()),
                    Some(Value::Array(items)) => items.clone(),
                    Some(other) => {
                        return Err(StoreError::PathType {
                            path: path.to_string(),
                            expected: "array",
                            found: type_name(other),
                        })
                    }
                };
                items.push(value.clone());
                path.set(document, Value::Array(items))
            }
        }
    }
}

impl fmt::Display for UpdateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set { path, value } => write!(f, "SET {path} = {value}"),
            Self::Unset { path } => write!(f, "UNSET {path}"),
            Self::AddToSet { path, value } => write!(f, "ADD_TO_SET {path} += {value}"),
        }
    }
}

/// One `(prefix, property, value)` triple of a stacked update.
///
/// `prefix: None` targets a top-level property; `Some("specs.0")` targets a
/// property of the object at that path.
#[derive(Clone, Debug, PartialEq)]
pub struct StackedField {
    pub prefix: Option<String>,
    pub property: String,
    pub value: Value,
}

impl StackedField {
    pub fn new(prefix: Option<&str>, property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            property: property.into(),
            value: value.into(),
        }
    }

    /// A top-level property.
    pub fn root(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(None, property, value)
    }

    pub fn path(&self) -> StoreResult<FieldPath> {
        FieldPath::join(self.prefix.as_deref(), &self.property)
    }
}

/// An ordered batch of ops with unique, non-overlapping paths.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch holding one op.
    pub fn single(op: UpdateOp) -> StoreResult<Self> {
        Self::new().with(op)
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, op: UpdateOp) -> StoreResult<Self> {
        self.push(op)?;
        Ok(self)
    }

    /// Add an op to the batch.
    ///
    /// An op for a path already in the batch replaces the earlier one and
    /// keeps its position. The document `id` cannot be written.
    pub fn push(&mut self, op: UpdateOp) -> StoreResult<()> {
        let path = op.path();
        if path.touches_id() {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                reason: "the document id is immutable",
            });
        }

        if let Some(existing) = self.ops.iter_mut().find(|o| o.path() == path) {
            *existing = op;
            return Ok(());
        }
        if let Some(existing) = self.ops.iter().find(|o| o.path().overlaps(path)) {
            return Err(StoreError::ConflictingPaths {
                first: existing.path().to_string(),
                second: path.to_string(),
            });
        }
        self.ops.push(op);
        Ok(())
    }

    /// Merge another batch into this one, op by op.
    pub fn and(mut self, other: Update) -> StoreResult<Self> {
        for op in other.ops {
            self.push(op)?;
        }
        Ok(self)
    }

    /// One `Set` per field, in order, as a single batch.
    pub fn stacked(fields: impl IntoIterator<Item = StackedField>) -> StoreResult<Self> {
        let mut update = Self::new();
        for field in fields {
            let path = field.path()?;
            update.push(UpdateOp::Set {
                path,
                value: field.value,
            })?;
        }
        Ok(update)
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every op to `document`. Returns whether the document changed.
    ///
    /// Either all ops apply or the document is left untouched.
    pub fn apply(&self, document: &mut Value) -> StoreResult<bool> {
        let mut working = document.clone();
        for op in &self.ops {
            op.apply(&mut working)?;
        }
        if working == *document {
            return Ok(false);
        }
        *document = working;
        Ok(true)
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{op}")?;
        }
        Ok(())
    }
}
