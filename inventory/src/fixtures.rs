use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;

use crate::model::{
    Address, Branch, ConnectionType, DeviceInfo, Location, Odc, Odp, Olt, Ont, PonPort, PonType,
    Router, Tray,
};
use crate::NodeKind;

pub const BRANCH_B_ID: &str = "branch-b";
pub const ROUTER_R_ID: &str = "router-r";
pub const OLT_O_ID: &str = "olt-o";
pub const ODC_C_ID: &str = "odc-c";
pub const ODP_P_ID: &str = "odp-p";
pub const ONT_N1_ID: &str = "ont-n1";
pub const ONT_N2_ID: &str = "ont-n2";

lazy_static! {
    pub static ref CREATED_AT: DateTime<Utc> =
        DateTime::from_timestamp(1_704_067_200, 0).expect("valid timestamp");

    pub static ref ONT_N1: Ont = Ont {
        info: device_info(ONT_N1_ID, "N1", NodeKind::Ont),
        vendor: Some("ZTE".to_string()),
        model: Some("F660".to_string()),
        sn: Some("ZTEG00000001".to_string()),
    };

    pub static ref ONT_N2: Ont = Ont {
        info: device_info(ONT_N2_ID, "N2", NodeKind::Ont),
        vendor: Some("Huawei".to_string()),
        model: Some("HG8245H".to_string()),
        sn: Some("HWTC00000002".to_string()),
    };

    /// ODP P, occupying core 3 of tray 1 and full with N1 and N2.
    pub static ref ODP_P: Odp = Odp {
        info: device_info(ODP_P_ID, "P", NodeKind::Odp),
        core_on_odc_tray: 3,
        available_port: 2,
        children: vec![ONT_N1.clone(), ONT_N2.clone()],
    };

    /// ODC C with a single tray holding cores 1 to 8.
    pub static ref ODC_C: Odc = Odc {
        info: device_info(ODC_C_ID, "C", NodeKind::Odc),
        available_tray: 1,
        trays: vec![Tray {
            tray: 1,
            start_core: 1,
            end_core: 8,
            children: vec![ODP_P.clone()],
        }],
    };

    /// OLT O, with ODC C on port 1 and an unused port 2.
    pub static ref OLT_O: Olt = Olt {
        info: device_info(OLT_O_ID, "O", NodeKind::Olt),
        vendor: Some("ZTE".to_string()),
        model: Some("C320".to_string()),
        sn: Some("ZTE-OLT-1".to_string()),
        telnet_conn: None,
        ssh_conn: None,
        snmp_conn: None,
        pon_type: PonType::Gpon,
        pon_port: vec![
            PonPort {
                port: 1,
                max_client: 64,
                children: vec![ODC_C.clone()],
            },
            PonPort {
                port: 2,
                max_client: 64,
                children: vec![],
            },
        ],
    };

    pub static ref ROUTER_R: Router = Router {
        info: device_info(ROUTER_R_ID, "R", NodeKind::Router),
        connection_type: ConnectionType::Public,
        ip_addr: Ipv4Addr::new(10, 0, 0, 1),
        children: vec![OLT_O.clone()],
    };

    /// Branch B -> Router R -> OLT O -> Port 1 -> ODC C -> Tray 1 -> ODP P -> ONT N1, N2.
    pub static ref BRANCH_B: Branch = Branch {
        id: BRANCH_B_ID.to_string(),
        name: "Bandung".to_string(),
        address: Some(Address {
            city: Some("Bandung".to_string()),
            ..Default::default()
        }),
        location: Some(Location::new(107.6191, -6.9175)),
        children: vec![ROUTER_R.clone()],
        created_at: *CREATED_AT,
        updated_at: *CREATED_AT,
        deleted_at: None,
    };
}

fn device_info(id: &str, label: &str, kind: NodeKind) -> DeviceInfo {
    DeviceInfo {
        id: id.to_string(),
        label: label.to_string(),
        kind,
        location: None,
        address: None,
        created_at: *CREATED_AT,
        updated_at: *CREATED_AT,
        deleted_at: None,
    }
}
