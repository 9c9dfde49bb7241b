use chrono::{DateTime, Utc};
use netinv_docstore::{documentstore::DocumentStore, Update};
use tracing::{debug, instrument, trace, warn};

use super::{load_branch, timestamp_value, Step};
use crate::clock::CascadeClock;
use crate::position::{field, DELETED_AT};
use crate::{Error, Indices, NodeKind};

/// Sets the deletion marker of a single node, unless it already carries one.
/// Returns whether the node was marked.
async fn mark_deleted(
    store: &dyn DocumentStore,
    branch_id: &str,
    step: &Step,
    at: &DateTime<Utc>,
) -> Result<bool, Error> {
    let path = step.path()?;
    let ts = timestamp_value(at)?;

    let filter = step
        .guard(branch_id, &path)?
        .exists(field(&path, DELETED_AT)?, false);
    let update = step.touch(
        &path,
        Update::new().set(field(&path, DELETED_AT)?, ts.clone()),
        ts,
    )?;

    let result = store.update_one(&filter, &update).await?;
    trace!(kind = %step.kind, id = %step.id, %path, matched = result.matched_count, "mark deleted");

    Ok(result.matched_count == 1)
}

/// Soft-deletes a node and everything below it, with a fresh timestamp
/// from the clock.
pub async fn soft_delete(
    store: &dyn DocumentStore,
    clock: &CascadeClock,
    branch_id: &str,
    kind: NodeKind,
    indices: Indices,
    id: &str,
) -> Result<bool, Error> {
    soft_delete_subtree(store, branch_id, kind, indices, id, clock.now()).await
}

/// Marks the node at `indices` and every descendant that is still live with
/// the deletion timestamp `at`. Descendants deleted earlier keep their own
/// timestamp, and aren't descended into.
///
/// If the node itself is already deleted, a previously interrupted cascade
/// is resumed with the node's existing timestamp, which makes running this
/// again a no-op once a cascade completed.
///
/// Returns false if the node isn't at `indices` anymore.
#[instrument(skip(store, indices), fields(indices = ?indices), err)]
pub async fn soft_delete_subtree(
    store: &dyn DocumentStore,
    branch_id: &str,
    kind: NodeKind,
    indices: Indices,
    id: &str,
    at: DateTime<Utc>,
) -> Result<bool, Error> {
    let root = Step {
        kind,
        indices,
        id: id.to_owned(),
    };

    let at = if mark_deleted(store, branch_id, &root, &at).await? {
        at
    } else {
        let branch = match load_branch(store, branch_id).await {
            Ok(branch) => branch,
            Err(Error::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        };

        match branch.node_at(kind, &indices) {
            Some(node) if node.id() == id => match node.deleted_at() {
                Some(existing) => {
                    debug!(deleted_at = %existing, "already deleted, resuming");
                    *existing
                }
                None => return Ok(false),
            },
            _ => return Ok(false),
        }
    };

    let mut pending = vec![root];
    while let Some(step) = pending.pop() {
        let branch = match load_branch(store, branch_id).await {
            Ok(branch) => branch,
            Err(e) => {
                warn!(err = %e, kind = %step.kind, id = %step.id, "unable to re-read branch, skipping subtree");
                continue;
            }
        };

        let node = match branch.node_at(step.kind, &step.indices) {
            Some(node) if node.id() == step.id => node,
            _ => {
                warn!(kind = %step.kind, id = %step.id, "node moved away, skipping subtree");
                continue;
            }
        };

        for (child_at, child) in node.children(step.indices).into_iter().rev() {
            if child.deleted_at().is_some() {
                continue;
            }

            let child_step = Step {
                kind: child.kind(),
                indices: child_at,
                id: child.id().to_owned(),
            };

            match mark_deleted(store, branch_id, &child_step, &at).await {
                Ok(true) => pending.push(child_step),
                Ok(false) => {
                    warn!(kind = %child_step.kind, id = %child_step.id, "node changed concurrently, skipping subtree")
                }
                Err(e) => {
                    warn!(err = %e, kind = %child_step.kind, id = %child_step.id, "unable to mark deleted, skipping subtree")
                }
            }
        }
    }

    debug!(deleted_at = %at, "cascade complete");
    Ok(true)
}
