//! Inputs for creating new nodes, and their conversion into fully populated
//! nodes.
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Address, Branch, ConnectionType, DeviceInfo, Location, Odc, Odp, Olt, Ont, PonPort, PonType,
    Router, SnmpConn, SshConn, TelnetConn, Tray, DEFAULT_MAX_CLIENT,
};
use crate::NodeKind;

/// Generates a new, globally unique node id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBranch {
    /// Generated if not provided.
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl NewBranch {
    pub fn into_branch(self, now: DateTime<Utc>) -> Branch {
        Branch {
            id: self.id.unwrap_or_else(new_id),
            name: self.name,
            address: self.address,
            location: self.location,
            children: vec![],
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Changes to the descriptive fields of a branch. Unset fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BranchPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl BranchPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.location.is_none()
    }
}

/// Fields every new device is created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDeviceInfo {
    /// Generated if not provided.
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl NewDeviceInfo {
    pub fn labeled(label: impl Into<String>) -> Self {
        NewDeviceInfo {
            id: None,
            label: label.into(),
            location: None,
            address: None,
        }
    }

    fn into_info(self, kind: NodeKind, now: DateTime<Utc>) -> DeviceInfo {
        DeviceInfo {
            id: self.id.unwrap_or_else(new_id),
            label: self.label,
            kind,
            location: self.location,
            address: self.address,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRouter {
    #[serde(flatten)]
    pub info: NewDeviceInfo,
    #[serde(default)]
    pub connection_type: ConnectionType,
    pub ip_addr: Ipv4Addr,
}

impl NewRouter {
    pub fn into_router(self, now: DateTime<Utc>) -> Router {
        Router {
            info: self.info.into_info(NodeKind::Router, now),
            connection_type: self.connection_type,
            ip_addr: self.ip_addr,
            children: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOlt {
    #[serde(flatten)]
    pub info: NewDeviceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telnet_conn: Option<TelnetConn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_conn: Option<SshConn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snmp_conn: Option<SnmpConn>,
    #[serde(default)]
    pub pon_type: PonType,
    /// Number of PON ports to generate, numbered from 1.
    #[serde(default)]
    pub available_pon: u32,
}

impl NewOlt {
    pub fn into_olt(self, now: DateTime<Utc>) -> Olt {
        Olt {
            info: self.info.into_info(NodeKind::Olt, now),
            vendor: self.vendor,
            model: self.model,
            sn: self.sn,
            telnet_conn: self.telnet_conn,
            ssh_conn: self.ssh_conn,
            snmp_conn: self.snmp_conn,
            pon_type: self.pon_type,
            pon_port: (1..=self.available_pon)
                .map(|port| PonPort {
                    port,
                    max_client: DEFAULT_MAX_CLIENT,
                    children: vec![],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOdc {
    #[serde(flatten)]
    pub info: NewDeviceInfo,
    /// Number of the PON port of the parent OLT to attach to.
    pub pon_port: u32,
    /// Number of trays to generate, numbered from 1.
    pub available_tray: u32,
    pub cores_per_tray: u32,
}

impl NewOdc {
    pub fn into_odc(self, now: DateTime<Utc>) -> Odc {
        let cores_per_tray = self.cores_per_tray;
        Odc {
            info: self.info.into_info(NodeKind::Odc, now),
            available_tray: self.available_tray,
            trays: (0..self.available_tray)
                .map(|i| Tray {
                    tray: i + 1,
                    start_core: cores_per_tray.saturating_mul(i).saturating_add(1),
                    end_core: cores_per_tray.saturating_mul(i + 1),
                    children: vec![],
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOdp {
    #[serde(flatten)]
    pub info: NewDeviceInfo,
    /// Number of the tray of the parent ODC to attach to.
    pub tray: u32,
    pub core_on_odc_tray: u32,
    pub available_port: u32,
}

impl NewOdp {
    pub fn into_odp(self, now: DateTime<Utc>) -> Odp {
        Odp {
            info: self.info.into_info(NodeKind::Odp, now),
            core_on_odc_tray: self.core_on_odc_tray,
            available_port: self.available_port,
            children: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOnt {
    #[serde(flatten)]
    pub info: NewDeviceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,
}

impl NewOnt {
    pub fn into_ont(self, now: DateTime<Utc>) -> Ont {
        Ont {
            info: self.info.into_info(NodeKind::Ont, now),
            vendor: self.vendor,
            model: self.model,
            sn: self.sn,
        }
    }
}

impl From<NewDeviceInfo> for NewOnt {
    fn from(info: NewDeviceInfo) -> Self {
        NewOnt {
            info,
            vendor: None,
            model: None,
            sn: None,
        }
    }
}

/// A new device of any kind, tagged by its `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NewDevice {
    Router(NewRouter),
    Olt(NewOlt),
    Odc(NewOdc),
    Odp(NewOdp),
    Ont(NewOnt),
}

impl NewDevice {
    pub fn kind(&self) -> NodeKind {
        match self {
            NewDevice::Router(_) => NodeKind::Router,
            NewDevice::Olt(_) => NodeKind::Olt,
            NewDevice::Odc(_) => NodeKind::Odc,
            NewDevice::Odp(_) => NodeKind::Odp,
            NewDevice::Ont(_) => NodeKind::Ont,
        }
    }
}
