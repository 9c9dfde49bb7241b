//! Scenarios the inventory operations need to pass, run against every
//! document store backend.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use netinv_docstore::documentstore::{self, DocumentStore};
use netinv_docstore::{Filter, Update};
use pretty_assertions::assert_eq;
use rstest::*;
use rstest_reuse::{self, *};

use crate::cascade::{restore_subtree, soft_delete_subtree};
use crate::fixtures::{
    BRANCH_B, BRANCH_B_ID, CREATED_AT, ODC_C_ID, ODP_P_ID, OLT_O_ID, ONT_N1_ID, ONT_N2_ID, ROUTER_R_ID,
};
use crate::locator::find_in_branch;
use crate::model::{
    Branch, BranchPatch, NewBranch, NewDevice, NewDeviceInfo, NewOdc, NewOdp, NewOlt, NewOnt,
    NewRouter,
};
use crate::position::{device_path, field, DELETED_AT};
use crate::{DeletionFilter, Error, Indices, InventoryService, Node, NodeKind, ScopeLevel};

type Service = InventoryService<Arc<dyn DocumentStore>>;

#[template]
#[rstest]
#[case::memory(documentstore::from_addr("memory://").await.unwrap())]
#[case::redb(documentstore::from_addr("redb://").await.unwrap())]
pub fn document_stores(#[case] document_store: Arc<dyn DocumentStore>) {}

/// A service holding BRANCH_B.
async fn seeded(document_store: Arc<dyn DocumentStore>) -> Service {
    let service = InventoryService::new(document_store);
    service
        .import_branch(BRANCH_B.clone())
        .await
        .expect("must import");
    service
}

fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

async fn branch_b(service: &Service) -> Branch {
    service
        .get_branch(BRANCH_B_ID, DeletionFilter::With, None)
        .await
        .expect("must exist")
        .into_inner()
}

fn deleted_at(branch: &Branch, kind: NodeKind, id: &str) -> Option<DateTime<Utc>> {
    find_in_branch(branch, kind, id, DeletionFilter::With)
        .expect("must exist")
        .1
        .deleted_at()
        .copied()
}

fn c_at() -> Indices {
    Indices::router(0).olt(0).odc(0, 0)
}

/// Reading back an imported branch yields exactly what was imported.
#[apply(document_stores)]
#[tokio::test]
async fn round_trip(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert_eq!(*BRANCH_B, branch_b(&service).await);
}

/// Importing a branch id twice fails.
#[apply(document_stores)]
#[tokio::test]
async fn import_duplicate(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert!(matches!(
        service.import_branch(BRANCH_B.clone()).await,
        Err(Error::InvalidRequest(_))
    ));
}

/// Deleting ODC C marks C and everything below it with one timestamp,
/// its ancestors stay live.
#[apply(document_stores)]
#[tokio::test]
async fn delete_cascades(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert!(service.soft_delete(NodeKind::Odc, ODC_C_ID).await.unwrap());

    let branch = branch_b(&service).await;
    let t = deleted_at(&branch, NodeKind::Odc, ODC_C_ID).expect("C must be deleted");
    for (kind, id) in [
        (NodeKind::Odp, ODP_P_ID),
        (NodeKind::Ont, ONT_N1_ID),
        (NodeKind::Ont, ONT_N2_ID),
    ] {
        assert_eq!(Some(t), deleted_at(&branch, kind, id), "{} {}", kind, id);
    }
    assert_eq!(None, deleted_at(&branch, NodeKind::Router, ROUTER_R_ID));
    assert_eq!(None, deleted_at(&branch, NodeKind::Olt, OLT_O_ID));
    assert_eq!(None, branch.deleted_at);
    assert_eq!(t, branch.updated_at);

    let Node::Odc(odc) = service
        .get_device(NodeKind::Odc, ODC_C_ID, DeletionFilter::Only, None)
        .await
        .unwrap()
        .into_inner()
    else {
        panic!("must be an odc");
    };
    assert_eq!(t, odc.info.updated_at);
}

/// Deleting twice doesn't change anything the second time.
#[apply(document_stores)]
#[tokio::test]
async fn delete_idempotent(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert!(service.soft_delete(NodeKind::Odc, ODC_C_ID).await.unwrap());
    let after_first = branch_b(&service).await;

    assert!(service.soft_delete(NodeKind::Odc, ODC_C_ID).await.unwrap());
    assert_eq!(after_first, branch_b(&service).await);
}

/// An already deleted node whose descendants are still live finishes the
/// cascade with its own timestamp.
#[apply(document_stores)]
#[tokio::test]
async fn delete_resumes(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store.clone()).await;

    let path = device_path(NodeKind::Odc, &c_at()).unwrap();
    document_store
        .update_one(
            &Filter::by_id(BRANCH_B_ID),
            &Update::new().set(
                field(&path, DELETED_AT).unwrap(),
                serde_json::to_value(ts(100)).unwrap(),
            ),
        )
        .await
        .unwrap();

    assert!(service.soft_delete(NodeKind::Odc, ODC_C_ID).await.unwrap());

    let branch = branch_b(&service).await;
    assert_eq!(Some(ts(100)), deleted_at(&branch, NodeKind::Odp, ODP_P_ID));
    assert_eq!(Some(ts(100)), deleted_at(&branch, NodeKind::Ont, ONT_N2_ID));
}

/// Descendants deleted before the cascade keep their own timestamp, and
/// stay deleted after restoring.
#[apply(document_stores)]
#[tokio::test]
async fn restore_keeps_earlier_deleted(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert!(service.soft_delete(NodeKind::Ont, ONT_N1_ID).await.unwrap());
    let t1 = deleted_at(&branch_b(&service).await, NodeKind::Ont, ONT_N1_ID).unwrap();

    assert!(service.soft_delete(NodeKind::Odc, ODC_C_ID).await.unwrap());
    let branch = branch_b(&service).await;
    let t2 = deleted_at(&branch, NodeKind::Odc, ODC_C_ID).unwrap();
    assert!(t1 < t2);
    assert_eq!(Some(t1), deleted_at(&branch, NodeKind::Ont, ONT_N1_ID));

    let restored = service
        .restore(NodeKind::Odc, ODC_C_ID)
        .await
        .unwrap()
        .expect("must be restored");
    assert_eq!(None, restored.deleted_at());

    let branch = branch_b(&service).await;
    assert_eq!(None, deleted_at(&branch, NodeKind::Odp, ODP_P_ID));
    assert_eq!(None, deleted_at(&branch, NodeKind::Ont, ONT_N2_ID));
    assert_eq!(Some(t1), deleted_at(&branch, NodeKind::Ont, ONT_N1_ID));
}

/// Only descendants carrying the exact timestamp of the restored node are
/// restored, regardless of whether theirs is earlier or later.
#[apply(document_stores)]
#[tokio::test]
async fn restore_keeps_later_deleted(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store.clone()).await;

    let n2_at = c_at().odp(0, 0).ont(1);
    assert!(soft_delete_subtree(
        document_store.as_ref(),
        BRANCH_B_ID,
        NodeKind::Ont,
        n2_at,
        ONT_N2_ID,
        ts(200)
    )
    .await
    .unwrap());
    assert!(soft_delete_subtree(
        document_store.as_ref(),
        BRANCH_B_ID,
        NodeKind::Odc,
        c_at(),
        ODC_C_ID,
        ts(100)
    )
    .await
    .unwrap());

    service
        .restore(NodeKind::Odc, ODC_C_ID)
        .await
        .unwrap()
        .expect("must be restored");

    let branch = branch_b(&service).await;
    assert_eq!(None, deleted_at(&branch, NodeKind::Odc, ODC_C_ID));
    assert_eq!(None, deleted_at(&branch, NodeKind::Ont, ONT_N1_ID));
    assert_eq!(Some(ts(200)), deleted_at(&branch, NodeKind::Ont, ONT_N2_ID));
}

/// A full delete and restore leaves every node live again.
#[apply(document_stores)]
#[tokio::test]
async fn restore_everything(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert!(service.soft_delete(NodeKind::Odc, ODC_C_ID).await.unwrap());
    service
        .restore(NodeKind::Odc, ODC_C_ID)
        .await
        .unwrap()
        .expect("must be restored");

    let branch = branch_b(&service).await;
    assert!(branch.walk().all(|(_, node)| node.deleted_at().is_none()));

    let ids = |branch: &Branch| -> Vec<String> {
        branch
            .walk()
            .map(|(at, node)| format!("{:?} {}", at, node.id()))
            .collect()
    };
    assert_eq!(ids(&BRANCH_B), ids(&branch));
}

/// Restoring nodes that aren't deleted, or don't exist, returns None.
#[apply(document_stores)]
#[tokio::test]
async fn restore_nothing(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert_eq!(None, service.restore(NodeKind::Odc, ODC_C_ID).await.unwrap());
    assert_eq!(None, service.restore(NodeKind::Ont, "missing").await.unwrap());
}

/// A restore interrupted after some descendants were restored is finished
/// by restoring again. The root is restored last, so it's still found.
#[apply(document_stores)]
#[tokio::test]
async fn restore_resumes(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store.clone()).await;

    assert!(soft_delete_subtree(
        document_store.as_ref(),
        BRANCH_B_ID,
        NodeKind::Odc,
        c_at(),
        ODC_C_ID,
        ts(100)
    )
    .await
    .unwrap());

    // the ONTs made it, P and C didn't.
    for at in [c_at().odp(0, 0).ont(0), c_at().odp(0, 0).ont(1)] {
        let path = device_path(NodeKind::Ont, &at).unwrap();
        document_store
            .update_one(
                &Filter::by_id(BRANCH_B_ID),
                &Update::new().unset(field(&path, DELETED_AT).unwrap()),
            )
            .await
            .unwrap();
    }
    let branch = branch_b(&service).await;
    assert_eq!(Some(ts(100)), deleted_at(&branch, NodeKind::Odc, ODC_C_ID));
    assert_eq!(Some(ts(100)), deleted_at(&branch, NodeKind::Odp, ODP_P_ID));

    let Node::Odc(odc) = service
        .restore(NodeKind::Odc, ODC_C_ID)
        .await
        .unwrap()
        .expect("must be restored")
    else {
        panic!("must be an odc");
    };

    let branch = branch_b(&service).await;
    assert!(branch.walk().all(|(_, node)| node.deleted_at().is_none()));
    assert!(odc.info.updated_at > *CREATED_AT);
    assert_eq!(odc.info.updated_at, branch.updated_at);
}

/// Restoring with a timestamp the node doesn't carry, or at a position it
/// isn't at, writes nothing.
#[apply(document_stores)]
#[tokio::test]
async fn restore_stale(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store.clone()).await;

    assert!(soft_delete_subtree(
        document_store.as_ref(),
        BRANCH_B_ID,
        NodeKind::Odc,
        c_at(),
        ODC_C_ID,
        ts(100)
    )
    .await
    .unwrap());
    let before = branch_b(&service).await;

    // the marker changed since it was read.
    assert!(matches!(
        restore_subtree(
            document_store.as_ref(),
            BRANCH_B_ID,
            NodeKind::Odc,
            c_at(),
            ODC_C_ID,
            ts(50),
            ts(300)
        )
        .await,
        Err(Error::StaleUpdate { .. })
    ));

    // C isn't there.
    assert!(matches!(
        restore_subtree(
            document_store.as_ref(),
            BRANCH_B_ID,
            NodeKind::Odc,
            Indices::router(0).olt(0).odc(1, 0),
            ODC_C_ID,
            ts(100),
            ts(300)
        )
        .await,
        Err(Error::StaleUpdate { .. })
    ));

    assert_eq!(before, branch_b(&service).await);
}

/// Deleting a node that isn't where it was expected marks nothing.
#[apply(document_stores)]
#[tokio::test]
async fn delete_stale(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store.clone()).await;

    for (branch_id, at, id) in [
        (BRANCH_B_ID, Indices::router(0).olt(0).odc(1, 0), ODC_C_ID),
        (BRANCH_B_ID, c_at(), "odc-other"),
        ("missing", c_at(), ODC_C_ID),
    ] {
        assert!(!soft_delete_subtree(
            document_store.as_ref(),
            branch_id,
            NodeKind::Odc,
            at,
            id,
            ts(100)
        )
        .await
        .unwrap());
    }

    assert_eq!(*BRANCH_B, branch_b(&service).await);
}

/// Locating respects the deletion filter.
#[apply(document_stores)]
#[tokio::test]
async fn locate_filters(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    let located = service
        .locate(NodeKind::Ont, ONT_N2_ID, DeletionFilter::Without)
        .await
        .unwrap();
    assert_eq!(BRANCH_B_ID, located.branch_id);
    assert_eq!(c_at().odp(0, 0).ont(1), located.indices);
    assert!(matches!(
        service
            .locate(NodeKind::Ont, ONT_N2_ID, DeletionFilter::Only)
            .await,
        Err(Error::NotFound { .. })
    ));

    assert!(service.soft_delete(NodeKind::Ont, ONT_N2_ID).await.unwrap());

    assert!(matches!(
        service
            .locate(NodeKind::Ont, ONT_N2_ID, DeletionFilter::Without)
            .await,
        Err(Error::NotFound { .. })
    ));
    for filter in [DeletionFilter::Only, DeletionFilter::With] {
        assert_eq!(
            located.indices,
            service
                .locate(NodeKind::Ont, ONT_N2_ID, filter)
                .await
                .unwrap()
                .indices
        );
    }

    // same id, wrong kind.
    assert!(matches!(
        service
            .locate(NodeKind::Odp, ONT_N1_ID, DeletionFilter::With)
            .await,
        Err(Error::NotFound { .. })
    ));
}

/// Devices are returned with their subtree, cut at the requested scope.
#[apply(document_stores)]
#[tokio::test]
async fn get_device_scoped(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    let olt = serde_json::to_value(
        service
            .get_device(
                NodeKind::Olt,
                OLT_O_ID,
                DeletionFilter::Without,
                Some(ScopeLevel::Olts),
            )
            .await
            .unwrap(),
    )
    .unwrap();
    let ports = olt["pon_port"].as_array().expect("ports are kept");
    assert_eq!(2, ports.len());
    assert!(ports.iter().all(|p| p.get("children").is_none()));

    let branch = serde_json::to_value(
        service
            .get_branch(BRANCH_B_ID, DeletionFilter::Without, Some(ScopeLevel::Branches))
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(BRANCH_B_ID, branch["_id"]);
    assert!(branch.get("children").is_none());

    assert!(service.soft_delete(NodeKind::Ont, ONT_N1_ID).await.unwrap());

    let Node::Odp(odp) = service
        .get_device(NodeKind::Odp, ODP_P_ID, DeletionFilter::Without, None)
        .await
        .unwrap()
        .into_inner()
    else {
        panic!("must be an odp");
    };
    assert_eq!(1, odp.children.len());
    assert_eq!(ONT_N2_ID, odp.children[0].info.id);
}

/// Deleting a branch cascades over the whole tree, and hides the branch
/// from live reads.
#[apply(document_stores)]
#[tokio::test]
async fn delete_branch(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert!(service
        .soft_delete(NodeKind::Branch, BRANCH_B_ID)
        .await
        .unwrap());

    let branch = branch_b(&service).await;
    let t = branch.deleted_at.expect("must be deleted");
    assert!(branch.walk().all(|(_, node)| node.deleted_at() == Some(&t)));

    assert!(matches!(
        service
            .get_branch(BRANCH_B_ID, DeletionFilter::Without, None)
            .await,
        Err(Error::NotFound { .. })
    ));
    assert!(service
        .list_branches(DeletionFilter::Without, None)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        1,
        service
            .list_branches(DeletionFilter::Only, None)
            .await
            .unwrap()
            .len()
    );

    service
        .restore(NodeKind::Branch, BRANCH_B_ID)
        .await
        .unwrap()
        .expect("must be restored");
    assert!(branch_b(&service)
        .await
        .walk()
        .all(|(_, node)| node.deleted_at().is_none()));
}

#[apply(document_stores)]
#[tokio::test]
async fn create_update_branch(document_store: Arc<dyn DocumentStore>) {
    let service = InventoryService::new(document_store);

    let created = service
        .create_branch(NewBranch {
            id: None,
            name: "Cimahi".to_string(),
            address: None,
            location: None,
        })
        .await
        .unwrap();
    assert!(!created.id.is_empty());

    let updated = service
        .update_branch(
            &created.id,
            BranchPatch {
                name: Some("Cimahi Utara".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!("Cimahi Utara", updated.name);
    assert_eq!(created.created_at, updated.created_at);

    assert!(matches!(
        service
            .update_branch(
                &created.id,
                BranchPatch {
                    name: Some(" ".to_string()),
                    ..Default::default()
                },
            )
            .await,
        Err(Error::InvalidRequest(_))
    ));
    assert!(matches!(
        service.update_branch(&created.id, BranchPatch::default()).await,
        Err(Error::InvalidRequest(_))
    ));

    assert!(service
        .soft_delete(NodeKind::Branch, &created.id)
        .await
        .unwrap());
    assert!(matches!(
        service
            .update_branch(
                &created.id,
                BranchPatch {
                    name: Some("Cimahi".to_string()),
                    ..Default::default()
                },
            )
            .await,
        Err(Error::NotFound { .. })
    ));
}

/// Building a whole tree top down.
#[apply(document_stores)]
#[tokio::test]
async fn add_devices(document_store: Arc<dyn DocumentStore>) {
    let service = InventoryService::new(document_store);
    let branch = service
        .create_branch(NewBranch {
            id: Some("b2".to_string()),
            name: "Garut".to_string(),
            address: None,
            location: None,
        })
        .await
        .unwrap();

    let with_id = |id: &str| NewDeviceInfo {
        id: Some(id.to_string()),
        ..NewDeviceInfo::labeled(id.to_uppercase())
    };

    service
        .add_child(
            NodeKind::Branch,
            &branch.id,
            NewDevice::Router(NewRouter {
                info: with_id("r2"),
                connection_type: Default::default(),
                ip_addr: "10.0.0.2".parse().unwrap(),
            }),
        )
        .await
        .unwrap();
    service
        .add_olt(
            "r2",
            NewOlt {
                info: with_id("o2"),
                vendor: None,
                model: None,
                sn: None,
                telnet_conn: None,
                ssh_conn: None,
                snmp_conn: None,
                pon_type: Default::default(),
                available_pon: 4,
            },
        )
        .await
        .unwrap();
    let odc = NewOdc {
        info: with_id("c2"),
        pon_port: 3,
        available_tray: 2,
        cores_per_tray: 12,
    };
    service.add_odc("o2", odc.clone()).await.unwrap();
    service
        .add_odp(
            "c2",
            NewOdp {
                info: with_id("p2"),
                tray: 2,
                core_on_odc_tray: 13,
                available_port: 1,
            },
        )
        .await
        .unwrap();
    let Node::Odp(odp) = service
        .add_ont("p2", NewOnt::from(with_id("n3")))
        .await
        .unwrap()
    else {
        panic!("must return the odp");
    };
    assert_eq!(1, odp.children.len());

    let located = service
        .locate(NodeKind::Ont, "n3", DeletionFilter::Without)
        .await
        .unwrap();
    assert_eq!(
        Indices::router(0).olt(0).odc(2, 0).odp(1, 0).ont(0),
        located.indices
    );

    // the port is taken by c2 now.
    assert!(matches!(
        service
            .add_odc(
                "o2",
                NewOdc {
                    info: with_id("c3"),
                    ..odc.clone()
                }
            )
            .await,
        Err(Error::CapacityExceeded(_))
    ));

    // once c2 is deleted, the port is free again.
    assert!(service.soft_delete(NodeKind::Odc, "c2").await.unwrap());
    service
        .add_odc(
            "o2",
            NewOdc {
                info: with_id("c3"),
                ..odc
            },
        )
        .await
        .unwrap();
}

/// Devices can't be added beyond the parent's capacity.
#[apply(document_stores)]
#[tokio::test]
async fn add_rejected(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    // P is full with N1 and N2.
    assert!(matches!(
        service
            .add_ont(ODP_P_ID, NewOnt::from(NewDeviceInfo::labeled("N3")))
            .await,
        Err(Error::CapacityExceeded(_))
    ));

    // tray 1 holds cores 1 to 8.
    assert!(matches!(
        service
            .add_odp(
                ODC_C_ID,
                NewOdp {
                    info: NewDeviceInfo::labeled("P2"),
                    tray: 1,
                    core_on_odc_tray: 9,
                    available_port: 8,
                }
            )
            .await,
        Err(Error::CapacityExceeded(_))
    ));

    // there's no tray 2.
    assert!(matches!(
        service
            .add_odp(
                ODC_C_ID,
                NewOdp {
                    info: NewDeviceInfo::labeled("P2"),
                    tray: 2,
                    core_on_odc_tray: 9,
                    available_port: 8,
                }
            )
            .await,
        Err(Error::NotFound { .. })
    ));

    // an ONT can't be placed under a router.
    assert!(matches!(
        service
            .add_child(
                NodeKind::Router,
                ROUTER_R_ID,
                NewDevice::Ont(NewOnt::from(NewDeviceInfo::labeled("N3")))
            )
            .await,
        Err(Error::InvalidContainment {
            parent: NodeKind::Router,
            child: NodeKind::Ont
        })
    ));

    // deleted parents don't accept children.
    assert!(service.soft_delete(NodeKind::Odp, ODP_P_ID).await.unwrap());
    assert!(matches!(
        service
            .add_ont(ODP_P_ID, NewOnt::from(NewDeviceInfo::labeled("N3")))
            .await,
        Err(Error::NotFound { .. })
    ));

    // nothing of the above changed the branch, apart from the deletion.
    let branch = branch_b(&service).await;
    assert_eq!(1, branch.children[0].children[0].pon_port[0].children.len());
    assert_eq!(
        1,
        branch.children[0].children[0].pon_port[0].children[0].trays[0]
            .children
            .len()
    );
}

/// Ids are unique across all branches and kinds.
#[apply(document_stores)]
#[tokio::test]
async fn duplicate_ids(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;
    let branch = service
        .create_branch(NewBranch {
            id: Some("b2".to_string()),
            name: "Garut".to_string(),
            address: None,
            location: None,
        })
        .await
        .unwrap();

    // R already lives in B.
    assert!(matches!(
        service
            .add_router(
                &branch.id,
                NewRouter {
                    info: NewDeviceInfo {
                        id: Some(ROUTER_R_ID.to_string()),
                        ..NewDeviceInfo::labeled("R2")
                    },
                    connection_type: Default::default(),
                    ip_addr: "10.0.0.2".parse().unwrap(),
                }
            )
            .await,
        Err(Error::InvalidRequest(_))
    ));

    // a router can't reuse the id of a branch either.
    assert!(matches!(
        service
            .add_router(
                &branch.id,
                NewRouter {
                    info: NewDeviceInfo {
                        id: Some(BRANCH_B_ID.to_string()),
                        ..NewDeviceInfo::labeled("R2")
                    },
                    connection_type: Default::default(),
                    ip_addr: "10.0.0.2".parse().unwrap(),
                }
            )
            .await,
        Err(Error::InvalidRequest(_))
    ));

    // a branch whose nodes collide with the stored ones.
    let mut other = BRANCH_B.clone();
    other.id = "b3".to_string();
    assert!(matches!(
        service.import_branch(other).await,
        Err(Error::InvalidRequest(_))
    ));

    // a branch whose two ONTs share an id.
    let mut twins = BRANCH_B.clone();
    twins.id = "b4".to_string();
    relabel_ids(&mut twins, "b4-");
    twins.children[0].children[0].pon_port[0].children[0].trays[0].children[0].children[1]
        .info
        .id = "b4-ont-n1".to_string();
    assert!(matches!(
        service.import_branch(twins).await,
        Err(Error::InvalidRequest(_))
    ));

    // nothing was written, R still resolves to B.
    assert_eq!(
        2,
        service
            .list_branches(DeletionFilter::With, None)
            .await
            .unwrap()
            .len()
    );
    assert_eq!(
        BRANCH_B_ID,
        service
            .locate(NodeKind::Router, ROUTER_R_ID, DeletionFilter::Without)
            .await
            .unwrap()
            .branch_id
    );
}

/// Prefixes every device id of the branch.
fn relabel_ids(branch: &mut Branch, prefix: &str) {
    for router in &mut branch.children {
        router.info.id = format!("{}{}", prefix, router.info.id);
        for olt in &mut router.children {
            olt.info.id = format!("{}{}", prefix, olt.info.id);
            for odc in olt.pon_port.iter_mut().flat_map(|p| &mut p.children) {
                odc.info.id = format!("{}{}", prefix, odc.info.id);
                for odp in odc.trays.iter_mut().flat_map(|t| &mut t.children) {
                    odp.info.id = format!("{}{}", prefix, odp.info.id);
                    for ont in &mut odp.children {
                        ont.info.id = format!("{}{}", prefix, ont.info.id);
                    }
                }
            }
        }
    }
}

/// Port and tray counts are bounded before anything gets generated.
#[apply(document_stores)]
#[tokio::test]
async fn add_out_of_bounds(document_store: Arc<dyn DocumentStore>) {
    let service = seeded(document_store).await;

    assert!(matches!(
        service
            .add_olt(
                ROUTER_R_ID,
                NewOlt {
                    info: NewDeviceInfo::labeled("O2"),
                    vendor: None,
                    model: None,
                    sn: None,
                    telnet_conn: None,
                    ssh_conn: None,
                    snmp_conn: None,
                    pon_type: Default::default(),
                    available_pon: u32::MAX,
                }
            )
            .await,
        Err(Error::InvalidRequest(_))
    ));

    // port 2 of O is free.
    for (available_tray, cores_per_tray) in [(0, 12), (u32::MAX, 12), (2, 0), (2, u32::MAX)] {
        assert!(matches!(
            service
                .add_odc(
                    OLT_O_ID,
                    NewOdc {
                        info: NewDeviceInfo::labeled("C2"),
                        pon_port: 2,
                        available_tray,
                        cores_per_tray,
                    }
                )
                .await,
            Err(Error::InvalidRequest(_))
        ));
    }

    let branch = branch_b(&service).await;
    assert_eq!(1, branch.children[0].children.len());
    assert!(branch.children[0].children[0].pon_port[1].children.is_empty());
}
