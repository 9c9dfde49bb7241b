//! Read-only views of a subtree, filtered by deletion state and cut at a
//! requested depth.
//!
//! Nodes failing the deletion filter are dropped together with everything
//! below them. PON ports and trays carry no deletion state and are always
//! kept. When the scope names the level of a node, the node is kept but its
//! children are cut: for OLTs and ODCs that means the ODCs of every port
//! and the ODPs of every tray. Cut arrays are empty in the typed value, and
//! absent from its serialized form.
use std::ops::Deref;

use serde::{ser::Error as _, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::model::{Branch, Odc, Odp, Olt, Ont, Router};
use crate::position::{CHILDREN, PON_PORT, TRAYS};
use crate::tree::Node;
use crate::{DeletionFilter, NodeKind, ScopeLevel};

/// Types that can be projected by deletion state and scope.
pub trait Project: Sized {
    /// The level of the node at the root of the value.
    fn root_kind(&self) -> NodeKind;

    /// Returns a copy without the nodes failing the filter, and with the
    /// children below the scope emptied.
    fn filter_tree(&self, filter: DeletionFilter, scope: Option<ScopeLevel>) -> Option<Self>;

    fn project(&self, filter: DeletionFilter, scope: Option<ScopeLevel>) -> Option<Projected<Self>> {
        self.filter_tree(filter, scope).map(|value| Projected {
            value,
            cut: scope.and_then(|s| s.cut_below()),
        })
    }
}

/// The result of [Project::project]. Derefs to the typed value, and
/// serializes without the arrays cut by the scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Projected<T> {
    value: T,
    cut: Option<NodeKind>,
}

impl<T> Projected<T> {
    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for Projected<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Project + Serialize> Serialize for Projected<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = serde_json::to_value(&self.value).map_err(S::Error::custom)?;
        if let Some(cut) = self.cut {
            remove_cut(&mut value, self.value.root_kind(), cut);
        }
        value.serialize(serializer)
    }
}

/// The objects holding the `children` array of a serialized node.
fn child_holders(value: &mut Value, kind: NodeKind) -> Vec<&mut Map<String, Value>> {
    let Some(object) = value.as_object_mut() else {
        return vec![];
    };

    let slots = match kind {
        NodeKind::Olt => PON_PORT,
        NodeKind::Odc => TRAYS,
        NodeKind::Ont => return vec![],
        _ => return vec![object],
    };
    object
        .get_mut(slots)
        .and_then(Value::as_array_mut)
        .map(|slots| slots.iter_mut().filter_map(Value::as_object_mut).collect())
        .unwrap_or_default()
}

fn remove_cut(value: &mut Value, kind: NodeKind, cut: NodeKind) {
    let Some(child_kind) = kind.child() else {
        return;
    };

    for holder in child_holders(value, kind) {
        if kind == cut {
            holder.remove(CHILDREN);
        } else if let Some(children) = holder.get_mut(CHILDREN).and_then(Value::as_array_mut) {
            for child in children {
                remove_cut(child, child_kind, cut);
            }
        }
    }
}

fn cuts(scope: Option<ScopeLevel>, kind: NodeKind) -> bool {
    scope.and_then(|s| s.cut_below()) == Some(kind)
}

fn project_all<T: Project>(
    nodes: &[T],
    filter: DeletionFilter,
    scope: Option<ScopeLevel>,
) -> Vec<T> {
    nodes
        .iter()
        .filter_map(|n| n.filter_tree(filter, scope))
        .collect()
}

impl Project for Branch {
    fn root_kind(&self) -> NodeKind {
        NodeKind::Branch
    }

    fn filter_tree(&self, filter: DeletionFilter, scope: Option<ScopeLevel>) -> Option<Self> {
        if !filter.matches(self.deleted_at.as_ref()) {
            return None;
        }

        Some(Branch {
            children: if cuts(scope, NodeKind::Branch) {
                vec![]
            } else {
                project_all(&self.children, filter, scope)
            },
            ..self.clone_shallow()
        })
    }
}

impl Project for Router {
    fn root_kind(&self) -> NodeKind {
        NodeKind::Router
    }

    fn filter_tree(&self, filter: DeletionFilter, scope: Option<ScopeLevel>) -> Option<Self> {
        if !filter.matches(self.info.deleted_at.as_ref()) {
            return None;
        }

        Some(Router {
            info: self.info.clone(),
            connection_type: self.connection_type,
            ip_addr: self.ip_addr,
            children: if cuts(scope, NodeKind::Router) {
                vec![]
            } else {
                project_all(&self.children, filter, scope)
            },
        })
    }
}

impl Project for Olt {
    fn root_kind(&self) -> NodeKind {
        NodeKind::Olt
    }

    fn filter_tree(&self, filter: DeletionFilter, scope: Option<ScopeLevel>) -> Option<Self> {
        if !filter.matches(self.info.deleted_at.as_ref()) {
            return None;
        }

        let cut = cuts(scope, NodeKind::Olt);
        let mut olt = self.clone();
        for port in olt.pon_port.iter_mut() {
            port.children = if cut {
                vec![]
            } else {
                project_all(&port.children, filter, scope)
            };
        }

        Some(olt)
    }
}

impl Project for Odc {
    fn root_kind(&self) -> NodeKind {
        NodeKind::Odc
    }

    fn filter_tree(&self, filter: DeletionFilter, scope: Option<ScopeLevel>) -> Option<Self> {
        if !filter.matches(self.info.deleted_at.as_ref()) {
            return None;
        }

        let cut = cuts(scope, NodeKind::Odc);
        let mut odc = self.clone();
        for tray in odc.trays.iter_mut() {
            tray.children = if cut {
                vec![]
            } else {
                project_all(&tray.children, filter, scope)
            };
        }

        Some(odc)
    }
}

impl Project for Odp {
    fn root_kind(&self) -> NodeKind {
        NodeKind::Odp
    }

    fn filter_tree(&self, filter: DeletionFilter, scope: Option<ScopeLevel>) -> Option<Self> {
        if !filter.matches(self.info.deleted_at.as_ref()) {
            return None;
        }

        Some(Odp {
            info: self.info.clone(),
            core_on_odc_tray: self.core_on_odc_tray,
            available_port: self.available_port,
            children: if cuts(scope, NodeKind::Odp) {
                vec![]
            } else {
                project_all(&self.children, filter, scope)
            },
        })
    }
}

impl Project for Ont {
    fn root_kind(&self) -> NodeKind {
        NodeKind::Ont
    }

    fn filter_tree(&self, filter: DeletionFilter, _scope: Option<ScopeLevel>) -> Option<Self> {
        filter
            .matches(self.info.deleted_at.as_ref())
            .then(|| self.clone())
    }
}

impl Project for Node {
    fn root_kind(&self) -> NodeKind {
        self.kind()
    }

    fn filter_tree(&self, filter: DeletionFilter, scope: Option<ScopeLevel>) -> Option<Self> {
        match self {
            Node::Branch(n) => n.filter_tree(filter, scope).map(Node::Branch),
            Node::Router(n) => n.filter_tree(filter, scope).map(Node::Router),
            Node::Olt(n) => n.filter_tree(filter, scope).map(Node::Olt),
            Node::Odc(n) => n.filter_tree(filter, scope).map(Node::Odc),
            Node::Odp(n) => n.filter_tree(filter, scope).map(Node::Odp),
            Node::Ont(n) => n.filter_tree(filter, scope).map(Node::Ont),
        }
    }
}

impl Branch {
    /// Copies everything but the routers.
    fn clone_shallow(&self) -> Branch {
        Branch {
            id: self.id.clone(),
            name: self.name.clone(),
            address: self.address.clone(),
            location: self.location.clone(),
            children: vec![],
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}
