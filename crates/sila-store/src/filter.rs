use std::fmt;

use serde_json::Value;

use crate::path::FieldPath;

/// Declarative predicate over documents, evaluated by the store.
///
/// Equality follows document-store conventions: `Eq(path, null)` matches a
/// missing field as well as an explicit null, and `Eq` against an array
/// field matches when the array contains the value. `Ne` is the exact
/// negation of `Eq`.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    Eq(FieldPath, Value),
    Ne(FieldPath, Value),
    /// Matches when every clause matches. An empty list matches everything.
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::Eq(path, value.into())
    }

    pub fn ne(path: FieldPath, value: impl Into<Value>) -> Self {
        Self::Ne(path, value.into())
    }

    /// Match the document whose `id` equals `id`.
    pub fn by_id(id: &str) -> Self {
        Self::Eq(FieldPath::id(), Value::String(id.to_string()))
    }

    /// Match documents where `path` is missing or null.
    pub fn is_null(path: FieldPath) -> Self {
        Self::Eq(path, Value::Null)
    }

    /// Match documents where `path` holds a non-null value.
    pub fn not_null(path: FieldPath) -> Self {
        Self::Ne(path, Value::Null)
    }

    /// Conjunction with another filter. `All` is absorbed and nested `And`
    /// clauses are flattened.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Self::All, f) | (f, Self::All) => f,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), f) => {
                a.push(f);
                Self::And(a)
            }
            (f, Self::And(mut b)) => {
                b.insert(0, f);
                Self::And(b)
            }
            (a, b) => Self::And(vec![a, b]),
        }
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::All => true,
            Self::Eq(path, expected) => field_equals(path.get(document), expected),
            Self::Ne(path, expected) => !field_equals(path.get(document), expected),
            Self::And(clauses) => clauses.iter().all(|c| c.matches(document)),
        }
    }
}

fn field_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(actual), expected) if actual == expected => true,
        (Some(Value::Array(items)), expected) if !expected.is_array() => {
            items.iter().any(|item| item == expected)
        }
        _ => false,
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Eq(path, value) => write!(f, "{path} == {value}"),
            Self::Ne(path, value) => write!(f, "{path} != {value}"),
            Self::And(clauses) => {
                write!(f, "(")?;
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " && ")?;
                    }
                    write!(f, "{clause}")?;
                }
                write!(f, ")")
            }
        }
    }
}
