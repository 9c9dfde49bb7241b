//! Maps a node kind and its resolved array positions to the positional field
//! path of that node inside its branch document.
use netinv_docstore::FieldPathBuf;
use serde::Serialize;

use crate::{Error, NodeKind};

/// Field name of the generic child arrays.
pub const CHILDREN: &str = "children";
/// Field name of the PON port array of an OLT.
pub const PON_PORT: &str = "pon_port";
/// Field name of the tray array of an ODC.
pub const TRAYS: &str = "trays";
/// Field name of the logical deletion marker.
pub const DELETED_AT: &str = "deleted_at";
/// Field name of the last modification time.
pub const UPDATED_AT: &str = "updatedAt";

/// The array positions leading from the branch root to a node.
/// Only the prefix relevant to the node's kind is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Indices {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub olt: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pon_port: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odc: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tray: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odp: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ont: Option<usize>,
}

impl Indices {
    /// The position of the branch itself.
    pub const ROOT: Indices = Indices {
        router: None,
        olt: None,
        pon_port: None,
        odc: None,
        tray: None,
        odp: None,
        ont: None,
    };

    pub fn router(router: usize) -> Self {
        Indices {
            router: Some(router),
            ..Self::ROOT
        }
    }

    pub fn olt(self, olt: usize) -> Self {
        Indices {
            olt: Some(olt),
            ..self
        }
    }

    pub fn odc(self, pon_port: usize, odc: usize) -> Self {
        Indices {
            pon_port: Some(pon_port),
            odc: Some(odc),
            ..self
        }
    }

    pub fn odp(self, tray: usize, odp: usize) -> Self {
        Indices {
            tray: Some(tray),
            odp: Some(odp),
            ..self
        }
    }

    pub fn ont(self, ont: usize) -> Self {
        Indices {
            ont: Some(ont),
            ..self
        }
    }
}

fn require(index: Option<usize>, kind: NodeKind, missing: &'static str) -> Result<usize, Error> {
    index.ok_or(Error::IncompletePosition { kind, missing })
}

/// Builds the positional path of a node of the given kind, for example
/// `children.0.children.1.pon_port.0.children.0` for an ODC.
///
/// The branch itself lives at the empty path.
pub fn device_path(kind: NodeKind, indices: &Indices) -> Result<FieldPathBuf, Error> {
    let mut path = FieldPathBuf::new();
    if kind == NodeKind::Branch {
        return Ok(path);
    }

    path.try_push(CHILDREN)?;
    path.push_index(require(indices.router, kind, "router")?);
    if kind == NodeKind::Router {
        return Ok(path);
    }

    path.try_push(CHILDREN)?;
    path.push_index(require(indices.olt, kind, "olt")?);
    if kind == NodeKind::Olt {
        return Ok(path);
    }

    path.try_push(PON_PORT)?;
    path.push_index(require(indices.pon_port, kind, "pon_port")?);
    path.try_push(CHILDREN)?;
    path.push_index(require(indices.odc, kind, "odc")?);
    if kind == NodeKind::Odc {
        return Ok(path);
    }

    path.try_push(TRAYS)?;
    path.push_index(require(indices.tray, kind, "tray")?);
    path.try_push(CHILDREN)?;
    path.push_index(require(indices.odp, kind, "odp")?);
    if kind == NodeKind::Odp {
        return Ok(path);
    }

    path.try_push(CHILDREN)?;
    path.push_index(require(indices.ont, kind, "ont")?);

    Ok(path)
}

/// Builds the positional path of a device from its textual type tag.
/// Only device tags are accepted, the branch isn't addressed by tag.
pub fn device_path_for_tag(tag: &str, indices: &Indices) -> Result<FieldPathBuf, Error> {
    match tag.parse()? {
        NodeKind::Branch => Err(Error::UnsupportedDeviceType(tag.to_string())),
        kind => device_path(kind, indices),
    }
}

/// Joins a field name to a positional path.
pub(crate) fn field(path: &FieldPathBuf, name: &str) -> Result<FieldPathBuf, Error> {
    Ok(path.try_join(name)?)
}
