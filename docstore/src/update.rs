use serde_json::{Map, Value};

use crate::{filter::ID_FIELD, Document, Error, FieldPath, FieldPathBuf};

/// A single field operation of an [Update].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Sets the field to the value, creating intermediate objects.
    Set(FieldPathBuf, Value),
    /// Removes the field, if present.
    Unset(FieldPathBuf),
    /// Appends the value to the array at the field, creating it if absent.
    Push(FieldPathBuf, Value),
}

impl UpdateOp {
    fn path(&self) -> &FieldPath {
        match self {
            UpdateOp::Set(p, _) | UpdateOp::Unset(p) | UpdateOp::Push(p, _) => p,
        }
    }
}

/// An ordered list of [UpdateOp]s, applied to a single document as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

/// The outcome of an update, in the shape document stores usually report it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateResult {
    pub const NOT_MATCHED: UpdateResult = UpdateResult {
        matched_count: 0,
        modified_count: 0,
    };

    pub(crate) fn matched(modified: bool) -> Self {
        UpdateResult {
            matched_count: 1,
            modified_count: modified as u64,
        }
    }
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: FieldPathBuf, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(path, value.into()));
        self
    }

    pub fn unset(mut self, path: FieldPathBuf) -> Self {
        self.ops.push(UpdateOp::Unset(path));
        self
    }

    pub fn push(mut self, path: FieldPathBuf, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push(path, value.into()));
        self
    }

    /// Applies all operations to a copy of the document.
    ///
    /// Returns the updated document if anything changed, `None` if the update
    /// was a no-op. In case any of the operations can't be applied, an error
    /// is returned and nothing is changed at all.
    pub fn apply(&self, document: &Document) -> Result<Option<Document>, Error> {
        let mut updated = document.clone();

        let mut modified = false;
        for op in &self.ops {
            modified |= apply_op(&mut updated, op)?;
        }

        Ok(modified.then_some(updated))
    }
}

fn apply_op(document: &mut Value, op: &UpdateOp) -> Result<bool, Error> {
    let path = op.path();

    // The identity of a document is immutable.
    if path.components().next().map(|s| s.as_key()) == Some(ID_FIELD) {
        return Err(Error::InvalidRequest(format!(
            "refusing to modify {} via {}",
            ID_FIELD, path
        )));
    }

    let (parent_path, field) = match (path.parent(), path.last()) {
        (Some(parent), Some(field)) => (parent, field),
        _ => {
            return Err(Error::InvalidRequest(
                "can't update the document root".to_string(),
            ))
        }
    };

    let create = !matches!(op, UpdateOp::Unset(_));
    let parent = match container_mut(document, parent_path, create)? {
        Some(parent) => parent,
        // Unsetting below a missing field is a no-op.
        None => return Ok(false),
    };

    match (op, parent) {
        (UpdateOp::Set(_, value), Value::Object(map)) => {
            Ok(map.insert(field.as_key().to_owned(), value.clone()).as_ref() != Some(value))
        }
        (UpdateOp::Set(_, value), Value::Array(elements)) => {
            let slot = field
                .as_index()
                .and_then(|i| elements.get_mut(i))
                .ok_or_else(|| missing_element(path))?;
            let changed = slot != value;
            *slot = value.clone();
            Ok(changed)
        }
        (UpdateOp::Unset(_), Value::Object(map)) => Ok(map.remove(field.as_key()).is_some()),
        (UpdateOp::Unset(_), Value::Array(_)) => Err(Error::InvalidRequest(format!(
            "can't unset array element {}",
            path
        ))),
        (UpdateOp::Push(_, value), Value::Object(map)) => {
            match map
                .entry(field.as_key().to_owned())
                .or_insert_with(|| Value::Array(vec![]))
            {
                Value::Array(elements) => {
                    elements.push(value.clone());
                    Ok(true)
                }
                _ => Err(Error::InvalidRequest(format!("{} is not an array", path))),
            }
        }
        (UpdateOp::Push(_, value), Value::Array(elements)) => {
            match field.as_index().and_then(|i| elements.get_mut(i)) {
                Some(Value::Array(inner)) => {
                    inner.push(value.clone());
                    Ok(true)
                }
                Some(_) => Err(Error::InvalidRequest(format!("{} is not an array", path))),
                None => Err(missing_element(path)),
            }
        }
        (_, _) => Err(Error::InvalidRequest(format!(
            "{} is not an object or array",
            parent_path
        ))),
    }
}

/// Navigates to the value at `path`, which is going to contain the field
/// being updated.
///
/// Missing object keys are created as empty objects if `create` is set,
/// otherwise `None` is returned. Array positions need to exist.
fn container_mut<'a>(
    document: &'a mut Value,
    path: &FieldPath,
    create: bool,
) -> Result<Option<&'a mut Value>, Error> {
    let mut current = document;

    for segment in path.components() {
        current = match current {
            Value::Object(map) => {
                if !map.contains_key(segment.as_key()) {
                    if !create {
                        return Ok(None);
                    }
                    map.insert(segment.as_key().to_owned(), Value::Object(Map::new()));
                }
                map.get_mut(segment.as_key())
                    .expect("key was ensured to be present")
            }
            Value::Array(elements) => segment
                .as_index()
                .and_then(|i| elements.get_mut(i))
                .ok_or_else(|| missing_element(path))?,
            _ if !create => return Ok(None),
            _ => {
                return Err(Error::InvalidRequest(format!(
                    "{} traverses a scalar value",
                    path
                )))
            }
        };
    }

    Ok(Some(current))
}

fn missing_element(path: &FieldPath) -> Error {
    Error::InvalidRequest(format!("{} addresses a missing array element", path))
}
