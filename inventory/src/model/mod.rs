//! The typed shape of a branch document and everything it contains.
//!
//! Field names follow the persisted schema, including the asymmetry between
//! the generic `children` arrays and the type-named `pon_port` / `trays`
//! arrays.
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, NodeKind};
use netinv_docstore::Document;

mod new;
mod validate;

pub use new::{
    BranchPatch, NewBranch, NewDevice, NewDeviceInfo, NewOdc, NewOdp, NewOlt, NewOnt, NewRouter,
};

/// The default number of clients a PON port serves.
pub const DEFAULT_MAX_CLIENT: u32 = 64;
/// Upper bound for the number of PON ports generated for a new OLT.
pub const MAX_PON_PORTS: u32 = 128;
/// Upper bound for the number of trays generated for a new ODC.
pub const MAX_TRAYS: u32 = 64;
/// Upper bound for the number of cores of a generated tray.
pub const MAX_CORES_PER_TRAY: u32 = 1024;

/// A GeoJSON point, coordinates are `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Location {
    Point { coordinates: [f64; 2] },
}

impl Location {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Location::Point {
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        match self {
            Location::Point { coordinates } => coordinates[0],
        }
    }

    pub fn latitude(&self) -> f64 {
        match self {
            Location::Point { coordinates } => coordinates[1],
        }
    }
}

fn default_country() -> String {
    "ID".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub village: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
}

impl Default for Address {
    fn default() -> Self {
        Address {
            country: default_country(),
            province: None,
            city: None,
            district: None,
            village: None,
            detail: None,
            zip_code: None,
        }
    }
}

/// Fields shared by every device, regardless of its level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "_id")]
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(rename = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The aggregate root, persisted as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub children: Vec<Router>,
    #[serde(rename = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Branch {
    /// Decodes a branch document, as read from the store.
    pub fn from_document(document: Document) -> Result<Self, Error> {
        let branch: Branch = serde_json::from_value(document).map_err(|e| {
            netinv_docstore::Error::StorageError(format!("unable to decode branch: {}", e))
        })?;
        Ok(branch)
    }

    /// Encodes the branch into the document shape the store holds.
    pub fn to_document(&self) -> Result<Document, Error> {
        serde_json::to_value(self).map_err(|e| {
            Error::Storage(netinv_docstore::Error::StorageError(format!(
                "unable to encode branch: {}",
                e
            )))
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectionType {
    Openvpn,
    #[default]
    Public,
    Zerotier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Router {
    #[serde(flatten)]
    pub info: DeviceInfo,
    #[serde(default)]
    pub connection_type: ConnectionType,
    pub ip_addr: Ipv4Addr,
    #[serde(default)]
    pub children: Vec<Olt>,
}

fn default_telnet_port() -> u16 {
    23
}

fn default_ssh_port() -> u16 {
    22
}

fn default_snmp_port() -> u16 {
    161
}

fn default_community_read() -> String {
    "public".to_string()
}

fn default_community_write() -> String {
    "private".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelnetConn {
    pub ip: Ipv4Addr,
    #[serde(default = "default_telnet_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshConn {
    pub ip: Ipv4Addr,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnmpConn {
    pub ip: Ipv4Addr,
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    #[serde(default = "default_community_read")]
    pub community_read: String,
    #[serde(default = "default_community_write")]
    pub community_write: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PonType {
    #[default]
    Gpon,
    Epon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Olt {
    #[serde(flatten)]
    pub info: DeviceInfo,
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
    #[serde(default)]
    pub pon_port: Vec<PonPort>,
}

fn default_max_client() -> u32 {
    DEFAULT_MAX_CLIENT
}

/// A numbered port of an OLT. Ports carry no deletion marker of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PonPort {
    pub port: u32,
    #[serde(default = "default_max_client")]
    pub max_client: u32,
    #[serde(default)]
    pub children: Vec<Odc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odc {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub available_tray: u32,
    #[serde(default)]
    pub trays: Vec<Tray>,
}

/// A splice tray of an ODC, owning the cores `[start_core, end_core]`.
/// Trays carry no deletion marker of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tray {
    pub tray: u32,
    pub start_core: u32,
    pub end_core: u32,
    #[serde(default)]
    pub children: Vec<Odp>,
}

impl Tray {
    pub fn contains_core(&self, core: u32) -> bool {
        (self.start_core..=self.end_core).contains(&core)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odp {
    #[serde(flatten)]
    pub info: DeviceInfo,
    pub core_on_odc_tray: u32,
    pub available_port: u32,
    #[serde(default)]
    pub children: Vec<Ont>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ont {
    #[serde(flatten)]
    pub info: DeviceInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,
}
