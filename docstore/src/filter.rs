use serde_json::Value;

use crate::{Document, FieldPath, FieldPathBuf};

/// The name of the field carrying the identity of a document.
pub const ID_FIELD: &str = "_id";

/// A single condition of a [Filter].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Some value reachable at the path equals the given value.
    Eq(FieldPathBuf, Value),
    /// A value is (or is not) reachable at the path.
    Exists(FieldPathBuf, bool),
}

impl Condition {
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Condition::Eq(path, expected) => resolve(document, path).into_iter().any(|v| {
                v == expected
                    || match v {
                        // Comparing against an array also matches its elements.
                        Value::Array(elements) => elements.contains(expected),
                        _ => false,
                    }
            }),
            Condition::Exists(path, should_exist) => {
                resolve(document, path).is_empty() != *should_exist
            }
        }
    }
}

/// A conjunction of [Condition]s a document needs to fulfill.
/// The empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches the document with the given identity.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq(
            FieldPath::ROOT
                .try_join(ID_FIELD)
                .expect("_id is a valid field name"),
            Value::String(id.into()),
        )
    }

    pub fn eq(mut self, path: FieldPathBuf, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(path, value.into()));
        self
    }

    pub fn exists(mut self, path: FieldPathBuf, should_exist: bool) -> Self {
        self.conditions.push(Condition::Exists(path, should_exist));
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }

    /// Returns the document identity this filter is pinned to, if there's a
    /// top-level `_id` equality condition with a string value.
    /// Backends use this to avoid scanning.
    pub fn pinned_id(&self) -> Option<&str> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Eq(path, Value::String(id)) if path.as_str() == ID_FIELD => {
                Some(id.as_str())
            }
            _ => None,
        })
    }
}

/// Returns all values reachable at `path` inside `document`.
///
/// A numeric component applied to an array addresses the element at that
/// position. Any other component applied to an array is applied to each of
/// its elements instead, so `children.children._id` reaches the `_id` of
/// every element of every nested `children` array.
pub fn resolve<'a>(document: &'a Value, path: &FieldPath) -> Vec<&'a Value> {
    let mut current = vec![document];

    for segment in path.components() {
        let mut next = Vec::with_capacity(current.len());
        for value in current {
            descend(value, segment.as_key(), segment.as_index(), &mut next);
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }

    current
}

fn descend<'a>(value: &'a Value, key: &str, index: Option<usize>, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(key) {
                out.push(v);
            }
        }
        Value::Array(elements) => match index {
            Some(i) => {
                if let Some(v) = elements.get(i) {
                    out.push(v);
                }
            }
            None => {
                for element in elements {
                    descend(element, key, None, out);
                }
            }
        },
        _ => {}
    }
}
