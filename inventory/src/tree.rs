//! Uniform access to the nodes of a branch, regardless of their level.
//!
//! Every level names its child arrays differently, [NodeRef::children] is
//! the one place knowing how to get from a node to the nodes it contains.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Branch, Odc, Odp, Olt, Ont, Router};
use crate::{Indices, NodeKind};

/// A borrowed node of any level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeRef<'a> {
    Branch(&'a Branch),
    Router(&'a Router),
    Olt(&'a Olt),
    Odc(&'a Odc),
    Odp(&'a Odp),
    Ont(&'a Ont),
}

impl<'a> NodeRef<'a> {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeRef::Branch(_) => NodeKind::Branch,
            NodeRef::Router(_) => NodeKind::Router,
            NodeRef::Olt(_) => NodeKind::Olt,
            NodeRef::Odc(_) => NodeKind::Odc,
            NodeRef::Odp(_) => NodeKind::Odp,
            NodeRef::Ont(_) => NodeKind::Ont,
        }
    }

    pub fn id(&self) -> &'a str {
        match *self {
            NodeRef::Branch(n) => &n.id,
            NodeRef::Router(n) => &n.info.id,
            NodeRef::Olt(n) => &n.info.id,
            NodeRef::Odc(n) => &n.info.id,
            NodeRef::Odp(n) => &n.info.id,
            NodeRef::Ont(n) => &n.info.id,
        }
    }

    pub fn deleted_at(&self) -> Option<&'a DateTime<Utc>> {
        match *self {
            NodeRef::Branch(n) => n.deleted_at.as_ref(),
            NodeRef::Router(n) => n.info.deleted_at.as_ref(),
            NodeRef::Olt(n) => n.info.deleted_at.as_ref(),
            NodeRef::Odc(n) => n.info.deleted_at.as_ref(),
            NodeRef::Odp(n) => n.info.deleted_at.as_ref(),
            NodeRef::Ont(n) => n.info.deleted_at.as_ref(),
        }
    }

    /// Returns the direct children of this node, in document order, together
    /// with their positions. `at` is the position of this node.
    ///
    /// Children of an OLT are the ODCs of all of its PON ports, children of
    /// an ODC are the ODPs of all of its trays.
    pub fn children(&self, at: Indices) -> Vec<(Indices, NodeRef<'a>)> {
        match *self {
            NodeRef::Branch(branch) => branch
                .children
                .iter()
                .enumerate()
                .map(|(i, router)| (Indices::router(i), NodeRef::Router(router)))
                .collect(),
            NodeRef::Router(router) => router
                .children
                .iter()
                .enumerate()
                .map(|(i, olt)| (at.olt(i), NodeRef::Olt(olt)))
                .collect(),
            NodeRef::Olt(olt) => olt
                .pon_port
                .iter()
                .enumerate()
                .flat_map(|(p, port)| {
                    port.children
                        .iter()
                        .enumerate()
                        .map(move |(i, odc)| (at.odc(p, i), NodeRef::Odc(odc)))
                })
                .collect(),
            NodeRef::Odc(odc) => odc
                .trays
                .iter()
                .enumerate()
                .flat_map(|(t, tray)| {
                    tray.children
                        .iter()
                        .enumerate()
                        .map(move |(i, odp)| (at.odp(t, i), NodeRef::Odp(odp)))
                })
                .collect(),
            NodeRef::Odp(odp) => odp
                .children
                .iter()
                .enumerate()
                .map(|(i, ont)| (at.ont(i), NodeRef::Ont(ont)))
                .collect(),
            NodeRef::Ont(_) => vec![],
        }
    }

    pub fn to_node(&self) -> Node {
        match self {
            NodeRef::Branch(n) => Node::Branch((*n).clone()),
            NodeRef::Router(n) => Node::Router((*n).clone()),
            NodeRef::Olt(n) => Node::Olt((*n).clone()),
            NodeRef::Odc(n) => Node::Odc((*n).clone()),
            NodeRef::Odp(n) => Node::Odp((*n).clone()),
            NodeRef::Ont(n) => Node::Ont((*n).clone()),
        }
    }
}

/// An owned node of any level, serialized in its persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Branch(Branch),
    Router(Router),
    Olt(Olt),
    Odc(Odc),
    Odp(Odp),
    Ont(Ont),
}

impl Node {
    pub fn node_ref(&self) -> NodeRef<'_> {
        match self {
            Node::Branch(n) => NodeRef::Branch(n),
            Node::Router(n) => NodeRef::Router(n),
            Node::Olt(n) => NodeRef::Olt(n),
            Node::Odc(n) => NodeRef::Odc(n),
            Node::Odp(n) => NodeRef::Odp(n),
            Node::Ont(n) => NodeRef::Ont(n),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.node_ref().kind()
    }

    pub fn id(&self) -> &str {
        self.node_ref().id()
    }

    pub fn deleted_at(&self) -> Option<&DateTime<Utc>> {
        self.node_ref().deleted_at()
    }
}

impl Branch {
    /// Navigates to the node of the given kind at the given position.
    /// Returns `None` if the position is incomplete or out of bounds.
    pub fn node_at(&self, kind: NodeKind, at: &Indices) -> Option<NodeRef<'_>> {
        if kind == NodeKind::Branch {
            return Some(NodeRef::Branch(self));
        }

        let router = self.children.get(at.router?)?;
        if kind == NodeKind::Router {
            return Some(NodeRef::Router(router));
        }

        let olt = router.children.get(at.olt?)?;
        if kind == NodeKind::Olt {
            return Some(NodeRef::Olt(olt));
        }

        let odc = olt.pon_port.get(at.pon_port?)?.children.get(at.odc?)?;
        if kind == NodeKind::Odc {
            return Some(NodeRef::Odc(odc));
        }

        let odp = odc.trays.get(at.tray?)?.children.get(at.odp?)?;
        if kind == NodeKind::Odp {
            return Some(NodeRef::Odp(odp));
        }

        odp.children.get(at.ont?).map(NodeRef::Ont)
    }

    /// Returns all nodes of the branch in depth-first pre-order, starting
    /// with the branch itself, together with their positions.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(Indices::ROOT, NodeRef::Branch(self))],
        }
    }
}

/// Iterator returned by [Branch::walk].
pub struct Walk<'a> {
    stack: Vec<(Indices, NodeRef<'a>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (Indices, NodeRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let (at, node) = self.stack.pop()?;
        // push in reverse, so children are visited in document order.
        self.stack.extend(node.children(at).into_iter().rev());
        Some((at, node))
    }
}
