//! Finds a node anywhere in the inventory by its id, resolving the branch
//! owning it and the array positions leading to it.
use netinv_docstore::{documentstore::DocumentStore, FieldPathBuf, Filter, ID_FIELD};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::model::Branch;
use crate::position::{CHILDREN, PON_PORT, TRAYS};
use crate::tree::{Node, NodeRef};
use crate::{DeletionFilter, Error, Indices, NodeKind};

/// A node, together with where it lives.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Located {
    pub branch_id: String,
    pub indices: Indices,
    pub node: Node,
}

/// The path reaching the ids of all nodes of the given kind in a branch
/// document, fanning out over every array on the way.
fn id_lookup_path(kind: NodeKind) -> Result<FieldPathBuf, Error> {
    let segments: &[&str] = match kind {
        NodeKind::Branch => &[],
        NodeKind::Router => &[CHILDREN],
        NodeKind::Olt => &[CHILDREN, CHILDREN],
        NodeKind::Odc => &[CHILDREN, CHILDREN, PON_PORT, CHILDREN],
        NodeKind::Odp => &[CHILDREN, CHILDREN, PON_PORT, CHILDREN, TRAYS, CHILDREN],
        NodeKind::Ont => &[
            CHILDREN, CHILDREN, PON_PORT, CHILDREN, TRAYS, CHILDREN, CHILDREN,
        ],
    };

    let mut path = FieldPathBuf::new();
    for segment in segments {
        path.try_push(segment)?;
    }
    path.try_push(ID_FIELD)?;

    Ok(path)
}

/// Walks the branch depth-first for the node with the given kind and id.
///
/// Ids are unique, so the first node with a matching id decides: if it
/// doesn't pass the deletion filter, nothing is found.
pub fn find_in_branch<'a>(
    branch: &'a Branch,
    kind: NodeKind,
    id: &str,
    filter: DeletionFilter,
) -> Option<(Indices, NodeRef<'a>)> {
    let (at, node) = branch
        .walk()
        .find(|(_, node)| node.kind() == kind && node.id() == id)?;

    filter.matches(node.deleted_at()).then_some((at, node))
}

/// Returns the id of the branch holding a node of any kind with this id.
/// Ids are unique across the whole inventory, not just within a kind.
#[instrument(skip(store), err)]
pub async fn find_id_owner(store: &dyn DocumentStore, id: &str) -> Result<Option<String>, Error> {
    for kind in NodeKind::ALL {
        if let Some(document) = store
            .find_one(&Filter::new().eq(id_lookup_path(kind)?, id))
            .await?
        {
            let branch = Branch::from_document(document)?;
            return Ok(Some(branch.id));
        }
    }

    Ok(None)
}

/// Locates the node with the given kind and id.
///
/// Returns [Error::NotFound] if no branch contains such a node, or the node
/// is excluded by the deletion filter.
#[instrument(skip(store), err)]
pub async fn locate(
    store: &dyn DocumentStore,
    kind: NodeKind,
    id: &str,
    filter: DeletionFilter,
) -> Result<Located, Error> {
    let document = store
        .find_one(&Filter::new().eq(id_lookup_path(kind)?, id))
        .await?
        .ok_or_else(|| Error::not_found(kind, id))?;
    let branch = Branch::from_document(document)?;

    let (indices, node) =
        find_in_branch(&branch, kind, id, filter).ok_or_else(|| Error::not_found(kind, id))?;
    debug!(branch.id = %branch.id, ?indices, "located node");

    Ok(Located {
        branch_id: branch.id.clone(),
        indices,
        node: node.to_node(),
    })
}
