use chrono::{DateTime, Utc};
use netinv_docstore::{documentstore::DocumentStore, Update};
use tracing::{debug, instrument, trace, warn};

use super::{load_branch, timestamp_value, Step};
use crate::locator::locate;
use crate::position::{field, DELETED_AT};
use crate::tree::Node;
use crate::{DeletionFilter, Error, Indices, NodeKind};

/// Clears the deletion marker of a single node, only if it's still exactly
/// `deleted_at`. Returns whether the node was restored.
async fn unmark_deleted(
    store: &dyn DocumentStore,
    branch_id: &str,
    step: &Step,
    deleted_at: &DateTime<Utc>,
    now: &DateTime<Utc>,
) -> Result<bool, Error> {
    let path = step.path()?;

    let filter = step
        .guard(branch_id, &path)?
        .eq(field(&path, DELETED_AT)?, timestamp_value(deleted_at)?);
    let update = step.touch(
        &path,
        Update::new().unset(field(&path, DELETED_AT)?),
        timestamp_value(now)?,
    )?;

    let result = store.update_one(&filter, &update).await?;
    trace!(kind = %step.kind, id = %step.id, %path, matched = result.matched_count, "unmark deleted");

    Ok(result.matched_count == 1)
}

fn stale(root: &Step, branch_id: &str) -> Error {
    match root.path() {
        Ok(path) => Error::StaleUpdate {
            path: path.to_string(),
            branch_id: branch_id.to_owned(),
        },
        Err(e) => e,
    }
}

/// Restores a deleted node, and every descendant that was deleted by the
/// same cascade, recognized by carrying the node's exact deletion timestamp.
/// Descendants deleted independently, before or after, stay deleted.
///
/// Returns `None` if there's no deleted node with that id. If the node's
/// marker changed between reading and restoring it, [Error::StaleUpdate] is
/// returned.
#[instrument(skip(store, now), err)]
pub async fn restore(
    store: &dyn DocumentStore,
    kind: NodeKind,
    id: &str,
    now: DateTime<Utc>,
) -> Result<Option<Node>, Error> {
    let located = match locate(store, kind, id, DeletionFilter::Only).await {
        Ok(located) => located,
        Err(Error::NotFound { .. }) => return Ok(None),
        Err(e) => return Err(e),
    };
    let Some(deleted_at) = located.node.deleted_at().copied() else {
        return Ok(None);
    };

    restore_subtree(
        store,
        &located.branch_id,
        kind,
        located.indices,
        id,
        deleted_at,
        now,
    )
    .await?;

    match locate(store, kind, id, DeletionFilter::With).await {
        Ok(located) => Ok(Some(located.node)),
        Err(Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Clears the marker of the node at `indices` and of every descendant
/// carrying exactly `deleted_at`, reachable through such descendants.
///
/// Descendants are restored bottom-up and the node itself last, so the node
/// stays deleted until its whole subtree is restored. An interrupted restore
/// is finished by running it again.
///
/// Returns [Error::StaleUpdate] if the node isn't at `indices` anymore, or
/// doesn't carry `deleted_at`.
#[instrument(skip(store, indices, now), fields(indices = ?indices), err)]
pub async fn restore_subtree(
    store: &dyn DocumentStore,
    branch_id: &str,
    kind: NodeKind,
    indices: Indices,
    id: &str,
    deleted_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(), Error> {
    let root = Step {
        kind,
        indices,
        id: id.to_owned(),
    };

    let branch = load_branch(store, branch_id).await?;
    let node = match branch.node_at(kind, &indices) {
        Some(node) if node.id() == id && node.deleted_at() == Some(&deleted_at) => node,
        _ => return Err(stale(&root, branch_id)),
    };

    // every step comes after all of its ancestors.
    let mut steps = Vec::new();
    let mut pending = vec![(indices, node)];
    while let Some((at, node)) = pending.pop() {
        for (child_at, child) in node.children(at) {
            if child.deleted_at() != Some(&deleted_at) {
                continue;
            }

            steps.push(Step {
                kind: child.kind(),
                indices: child_at,
                id: child.id().to_owned(),
            });
            pending.push((child_at, child));
        }
    }

    for step in steps.iter().rev() {
        match unmark_deleted(store, branch_id, step, &deleted_at, &now).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(kind = %step.kind, id = %step.id, "node changed concurrently, skipping")
            }
            Err(e) => {
                warn!(err = %e, kind = %step.kind, id = %step.id, "unable to restore, skipping")
            }
        }
    }

    if !unmark_deleted(store, branch_id, &root, &deleted_at, &now).await? {
        return Err(stale(&root, branch_id));
    }

    debug!(%deleted_at, restored = steps.len() + 1, "restore complete");
    Ok(())
}
