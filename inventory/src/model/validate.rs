use std::collections::HashSet;

use super::{
    Branch, DeviceInfo, Location, NewOdc, NewOlt, Odc, Odp, Olt, Ont, Router, Tray,
    MAX_CORES_PER_TRAY, MAX_PON_PORTS, MAX_TRAYS,
};
use crate::{errors::ValidationError, NodeKind};

fn check_location(id: &str, location: Option<&Location>) -> Result<(), ValidationError> {
    if let Some(location) = location {
        let (lon, lat) = (location.longitude(), location.latitude());
        if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
            return Err(ValidationError::InvalidCoordinates {
                id: id.to_string(),
                lon,
                lat,
            });
        }
    }
    Ok(())
}

impl DeviceInfo {
    /// Checks the fields shared by all devices, expecting a node of kind
    /// `expected` at this level.
    fn validate(&self, expected: NodeKind) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingId { kind: expected });
        }

        if self.kind != expected {
            return Err(ValidationError::WrongKind {
                id: self.id.clone(),
                // every device kind has a parent.
                parent: expected.parent().unwrap_or(NodeKind::Branch),
                found: self.kind,
            });
        }

        if self.label.trim().is_empty() {
            return Err(ValidationError::EmptyLabel {
                id: self.id.clone(),
            });
        }

        check_location(&self.id, self.location.as_ref())
    }
}

impl Branch {
    /// Validates the branch and everything it contains.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingId {
                kind: NodeKind::Branch,
            });
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyLabel {
                id: self.id.clone(),
            });
        }
        check_location(&self.id, self.location.as_ref())?;
        self.children.iter().try_for_each(Router::validate)?;

        let mut seen = HashSet::new();
        for (_, node) in self.walk() {
            if !seen.insert(node.id()) {
                return Err(ValidationError::DuplicateId {
                    id: node.id().to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Router {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.info.validate(NodeKind::Router)?;

        self.children.iter().try_for_each(Olt::validate)
    }
}

impl Olt {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.info.validate(NodeKind::Olt)?;
        let id = &self.info.id;

        let conn_ports = [
            ("telnet_conn", self.telnet_conn.as_ref().map(|c| c.port)),
            ("ssh_conn", self.ssh_conn.as_ref().map(|c| c.port)),
            ("snmp_conn", self.snmp_conn.as_ref().map(|c| c.port)),
        ];
        for (conn, port) in conn_ports {
            if port == Some(0) {
                return Err(ValidationError::InvalidTcpPort {
                    id: id.clone(),
                    conn,
                });
            }
        }

        let mut seen = HashSet::new();
        for pon_port in &self.pon_port {
            if pon_port.port == 0 {
                return Err(ValidationError::InvalidPonPort { id: id.clone() });
            }
            if !seen.insert(pon_port.port) {
                return Err(ValidationError::DuplicatePonPort {
                    id: id.clone(),
                    port: pon_port.port,
                });
            }
            if pon_port.max_client == 0 {
                return Err(ValidationError::InvalidMaxClient {
                    id: id.clone(),
                    port: pon_port.port,
                });
            }

            let live = pon_port
                .children
                .iter()
                .filter(|odc| odc.info.deleted_at.is_none())
                .count();
            if live > 1 {
                return Err(ValidationError::PortOccupied { id: id.clone() });
            }

            pon_port.children.iter().try_for_each(Odc::validate)?;
        }

        Ok(())
    }
}

impl Odc {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.info.validate(NodeKind::Odc)?;
        let id = &self.info.id;

        let mut seen = HashSet::new();
        for tray in &self.trays {
            if tray.tray == 0 {
                return Err(ValidationError::InvalidTray { id: id.clone() });
            }
            if !seen.insert(tray.tray) {
                return Err(ValidationError::DuplicateTray {
                    id: id.clone(),
                    tray: tray.tray,
                });
            }
            if tray.start_core == 0 || tray.start_core > tray.end_core {
                return Err(ValidationError::InvalidCoreRange {
                    id: id.clone(),
                    tray: tray.tray,
                    start_core: tray.start_core,
                    end_core: tray.end_core,
                });
            }

            for odp in &tray.children {
                odp.validate(tray)?;
            }
        }

        Ok(())
    }
}

impl Odp {
    /// Validates the ODP as placed on the given tray.
    pub fn validate(&self, tray: &Tray) -> Result<(), ValidationError> {
        self.info.validate(NodeKind::Odp)?;
        let id = &self.info.id;

        if !tray.contains_core(self.core_on_odc_tray) {
            return Err(ValidationError::CoreOutOfRange {
                id: id.clone(),
                core: self.core_on_odc_tray,
                start_core: tray.start_core,
                end_core: tray.end_core,
            });
        }

        if self.children.len() > self.available_port as usize {
            return Err(ValidationError::TooManyChildren {
                id: id.clone(),
                len: self.children.len(),
                capacity: self.available_port,
            });
        }

        self.children.iter().try_for_each(Ont::validate)
    }
}

impl Ont {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.info.validate(NodeKind::Ont)
    }
}

fn check_bounds(field: &'static str, value: u32, max: u32) -> Result<(), ValidationError> {
    if (1..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfBounds { field, value, max })
    }
}

impl NewOlt {
    /// Checks the input before any PON ports are generated from it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bounds("available_pon", self.available_pon, MAX_PON_PORTS)
    }
}

impl NewOdc {
    /// Checks the input before any trays are generated from it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bounds("available_tray", self.available_tray, MAX_TRAYS)?;
        check_bounds("cores_per_tray", self.cores_per_tray, MAX_CORES_PER_TRAY)
    }
}
