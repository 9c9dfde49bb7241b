use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The levels of the containment hierarchy, from the branch down to the
/// terminal devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Branch,
    Router,
    Olt,
    Odc,
    Odp,
    Ont,
}

impl NodeKind {
    /// Every level, from the top down.
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Branch,
        NodeKind::Router,
        NodeKind::Olt,
        NodeKind::Odc,
        NodeKind::Odp,
        NodeKind::Ont,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Branch => "branch",
            NodeKind::Router => "router",
            NodeKind::Olt => "olt",
            NodeKind::Odc => "odc",
            NodeKind::Odp => "odp",
            NodeKind::Ont => "ont",
        }
    }

    /// The only kind of node this one may directly contain.
    /// OLTs hold ODCs through their PON ports, ODCs hold ODPs through their
    /// trays.
    pub fn child(&self) -> Option<NodeKind> {
        match self {
            NodeKind::Branch => Some(NodeKind::Router),
            NodeKind::Router => Some(NodeKind::Olt),
            NodeKind::Olt => Some(NodeKind::Odc),
            NodeKind::Odc => Some(NodeKind::Odp),
            NodeKind::Odp => Some(NodeKind::Ont),
            NodeKind::Ont => None,
        }
    }

    /// The kind of node directly containing this one.
    pub fn parent(&self) -> Option<NodeKind> {
        match self {
            NodeKind::Branch => None,
            NodeKind::Router => Some(NodeKind::Branch),
            NodeKind::Olt => Some(NodeKind::Router),
            NodeKind::Odc => Some(NodeKind::Olt),
            NodeKind::Odp => Some(NodeKind::Odc),
            NodeKind::Ont => Some(NodeKind::Odp),
        }
    }

    /// Checks whether a node of this kind may hold a node of kind `child`,
    /// returning [Error::InvalidContainment] otherwise.
    pub fn check_contains(&self, child: NodeKind) -> Result<(), Error> {
        if self.child() == Some(child) {
            Ok(())
        } else {
            Err(Error::InvalidContainment {
                parent: *self,
                child,
            })
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "branch" => NodeKind::Branch,
            "router" => NodeKind::Router,
            "olt" => NodeKind::Olt,
            "odc" => NodeKind::Odc,
            "odp" => NodeKind::Odp,
            "ont" => NodeKind::Ont,
            _ => return Err(Error::UnsupportedDeviceType(s.to_string())),
        })
    }
}
