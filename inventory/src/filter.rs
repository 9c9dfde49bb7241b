use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, NodeKind};

/// Read-time predicate over the logical deletion state of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeletionFilter {
    /// Only nodes carrying a deletion marker.
    Only,
    /// Any node.
    With,
    /// Only live nodes.
    #[default]
    Without,
}

impl DeletionFilter {
    pub fn matches(&self, deleted_at: Option<&DateTime<Utc>>) -> bool {
        match self {
            DeletionFilter::Only => deleted_at.is_some(),
            DeletionFilter::With => true,
            DeletionFilter::Without => deleted_at.is_none(),
        }
    }
}

impl fmt::Display for DeletionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeletionFilter::Only => "ONLY",
            DeletionFilter::With => "WITH",
            DeletionFilter::Without => "WITHOUT",
        })
    }
}

impl FromStr for DeletionFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ONLY" => Ok(DeletionFilter::Only),
            "WITH" => Ok(DeletionFilter::With),
            "WITHOUT" => Ok(DeletionFilter::Without),
            _ => Err(Error::InvalidRequest(format!(
                "unknown deletion filter: {}",
                s
            ))),
        }
    }
}

/// The last level of the hierarchy a read wants detail for. Children below
/// that level are cut from the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScopeLevel {
    Branches,
    Routers,
    Olts,
    Odcs,
    Odps,
    Onts,
}

impl ScopeLevel {
    /// The kind of node whose children are cut at this scope.
    /// ONTs are leaves, so nothing is cut for [ScopeLevel::Onts].
    pub fn cut_below(&self) -> Option<NodeKind> {
        match self {
            ScopeLevel::Branches => Some(NodeKind::Branch),
            ScopeLevel::Routers => Some(NodeKind::Router),
            ScopeLevel::Olts => Some(NodeKind::Olt),
            ScopeLevel::Odcs => Some(NodeKind::Odc),
            ScopeLevel::Odps => Some(NodeKind::Odp),
            ScopeLevel::Onts => None,
        }
    }
}

impl fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeLevel::Branches => "BRANCHES",
            ScopeLevel::Routers => "ROUTERS",
            ScopeLevel::Olts => "OLTS",
            ScopeLevel::Odcs => "ODCS",
            ScopeLevel::Odps => "ODPS",
            ScopeLevel::Onts => "ONTS",
        })
    }
}

impl FromStr for ScopeLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BRANCHES" => Ok(ScopeLevel::Branches),
            "ROUTERS" => Ok(ScopeLevel::Routers),
            "OLTS" => Ok(ScopeLevel::Olts),
            "ODCS" => Ok(ScopeLevel::Odcs),
            "ODPS" => Ok(ScopeLevel::Odps),
            "ONTS" => Ok(ScopeLevel::Onts),
            _ => Err(Error::InvalidRequest(format!("unknown scope level: {}", s))),
        }
    }
}
