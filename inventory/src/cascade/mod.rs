//! Cascading soft-delete and restore.
//!
//! A cascade is a sequence of single-node writes, each guarded by the state
//! it expects to find, so every step can be retried safely. Steps below the
//! root that fail are logged and skipped together with their subtree, the
//! rest of the cascade carries on. Every write also sets `updatedAt` of
//! the node and of the branch holding it.
use chrono::{DateTime, Utc};
use netinv_docstore::{documentstore::DocumentStore, FieldPathBuf, Filter, Update, ID_FIELD};
use serde_json::Value;

use crate::model::Branch;
use crate::position::{device_path, field, UPDATED_AT};
use crate::{Error, Indices, NodeKind};

mod delete;
mod restore;

pub use delete::{soft_delete, soft_delete_subtree};
pub use restore::{restore, restore_subtree};

/// A single node a cascade visits.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    kind: NodeKind,
    indices: Indices,
    id: String,
}

impl Step {
    fn path(&self) -> Result<FieldPathBuf, Error> {
        device_path(self.kind, &self.indices)
    }

    /// Matches the branch only while the node is still at its position.
    fn guard(&self, branch_id: &str, path: &FieldPathBuf) -> Result<Filter, Error> {
        Ok(Filter::by_id(branch_id).eq(field(path, ID_FIELD)?, self.id.clone()))
    }

    /// Sets `updatedAt` of the node, and of its branch.
    fn touch(&self, path: &FieldPathBuf, update: Update, ts: Value) -> Result<Update, Error> {
        let update = update.set(field(path, UPDATED_AT)?, ts.clone());
        if self.kind == NodeKind::Branch {
            return Ok(update);
        }
        Ok(update.set(field(&FieldPathBuf::new(), UPDATED_AT)?, ts))
    }
}

/// Encodes a timestamp exactly the way it's stored in documents.
fn timestamp_value(ts: &DateTime<Utc>) -> Result<Value, Error> {
    serde_json::to_value(ts).map_err(|e| {
        Error::Storage(netinv_docstore::Error::StorageError(format!(
            "unable to encode timestamp: {}",
            e
        )))
    })
}

async fn load_branch(store: &dyn DocumentStore, branch_id: &str) -> Result<Branch, Error> {
    let document = store
        .get(branch_id)
        .await?
        .ok_or_else(|| Error::not_found(NodeKind::Branch, branch_id))?;

    Branch::from_document(document)
}
