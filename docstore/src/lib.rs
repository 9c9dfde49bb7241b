//! A small embeddable document store.
//!
//! Documents are JSON objects identified by a string `_id`. Stores can be
//! queried with [Filter]s over dotted [FieldPath]s and modified with
//! [Update]s, each of which is applied to a single document atomically.
mod errors;
mod filter;
mod path;
mod update;

pub mod documentstore;

#[cfg(test)]
use rstest_reuse;

pub use errors::Error;
pub use filter::{resolve, Condition, Filter, ID_FIELD};
pub use path::{FieldPath, FieldPathBuf, Segment};
pub use update::{Update, UpdateOp, UpdateResult};

/// A single document, always a JSON object when stored.
pub type Document = serde_json::Value;
