use chrono::{DateTime, Utc};
use netinv_docstore::{
    documentstore::DocumentStore, Document, FieldPathBuf, Filter, Update, ID_FIELD,
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::cascade;
use crate::clock::CascadeClock;
use crate::errors::ValidationError;
use crate::locator::{find_id_owner, locate, Located};
use crate::model::{
    Branch, BranchPatch, NewBranch, NewDevice, NewOdc, NewOdp, NewOlt, NewOnt, NewRouter,
};
use crate::position::{device_path, field, CHILDREN, DELETED_AT, PON_PORT, TRAYS, UPDATED_AT};
use crate::projector::{Project, Projected};
use crate::tree::Node;
use crate::{DeletionFilter, Error, NodeKind, ScopeLevel};

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|e| {
        Error::Storage(netinv_docstore::Error::StorageError(format!(
            "unable to encode: {}",
            e
        )))
    })
}

fn root_field(name: &str) -> Result<FieldPathBuf, Error> {
    field(&FieldPathBuf::new(), name)
}

/// The operations on the inventory, on top of a [DocumentStore] holding one
/// document per branch.
pub struct InventoryService<DS> {
    store: DS,
    clock: &'static CascadeClock,
}

impl<DS> InventoryService<DS>
where
    DS: DocumentStore,
{
    pub fn new(store: DS) -> Self {
        Self {
            store,
            clock: CascadeClock::global(),
        }
    }

    fn store(&self) -> &dyn DocumentStore {
        &self.store
    }

    /// Fails with [Error::InvalidRequest] if any node in the inventory
    /// already uses `id`.
    async fn ensure_id_unused(&self, id: &str) -> Result<(), Error> {
        match find_id_owner(self.store(), id).await? {
            None => Ok(()),
            Some(branch_id) => Err(Error::InvalidRequest(format!(
                "id {} is already used in branch {}",
                id, branch_id
            ))),
        }
    }

    /// Inserts a complete branch document, after validating it.
    /// None of its ids may already be in use.
    #[instrument(skip_all, fields(branch.id = %branch.id), err)]
    pub async fn import_branch(&self, branch: Branch) -> Result<Branch, Error> {
        branch.validate()?;
        for (_, node) in branch.walk() {
            self.ensure_id_unused(node.id()).await?;
        }

        self.store.insert_one(branch.to_document()?).await?;
        Ok(branch)
    }

    #[instrument(skip_all, fields(branch.name = %new.name), err)]
    pub async fn create_branch(&self, new: NewBranch) -> Result<Branch, Error> {
        let branch = new.into_branch(Utc::now());
        self.import_branch(branch).await
    }

    /// Changes the descriptive fields of a live branch.
    #[instrument(skip(self, patch), err)]
    pub async fn update_branch(&self, id: &str, patch: BranchPatch) -> Result<Branch, Error> {
        if patch.is_empty() {
            return Err(Error::InvalidRequest("nothing to update".to_string()));
        }

        // check the patched branch before writing anything.
        let mut patched = self
            .get_branch(id, DeletionFilter::Without, None)
            .await?
            .into_inner();
        let now = Utc::now();
        let mut update = Update::new().set(root_field(UPDATED_AT)?, encode(&now)?);
        if let Some(name) = patch.name {
            update = update.set(root_field("name")?, name.clone());
            patched.name = name;
        }
        if let Some(address) = patch.address {
            update = update.set(root_field("address")?, encode(&address)?);
            patched.address = Some(address);
        }
        if let Some(location) = patch.location {
            update = update.set(root_field("location")?, encode(&location)?);
            patched.location = Some(location);
        }
        patched.validate()?;

        let filter = Filter::by_id(id).exists(root_field(DELETED_AT)?, false);
        if self.store.update_one(&filter, &update).await?.matched_count == 0 {
            return Err(Error::not_found(NodeKind::Branch, id));
        }

        self.get_branch(id, DeletionFilter::Without, None)
            .await
            .map(Projected::into_inner)
    }

    #[instrument(skip(self), err)]
    pub async fn get_branch(
        &self,
        id: &str,
        filter: DeletionFilter,
        scope: Option<ScopeLevel>,
    ) -> Result<Projected<Branch>, Error> {
        let document = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found(NodeKind::Branch, id))?;

        Branch::from_document(document)?
            .project(filter, scope)
            .ok_or_else(|| Error::not_found(NodeKind::Branch, id))
    }

    /// Returns all branches passing the filter, in id order.
    #[instrument(skip(self), err)]
    pub async fn list_branches(
        &self,
        filter: DeletionFilter,
        scope: Option<ScopeLevel>,
    ) -> Result<Vec<Projected<Branch>>, Error> {
        let mut branches = Vec::new();
        for document in self.store.find(&Filter::new()).await? {
            if let Some(branch) = Branch::from_document(document)?.project(filter, scope) {
                branches.push(branch);
            }
        }

        Ok(branches)
    }

    /// Returns the device with its subtree, filtered by deletion state and
    /// cut at the given scope.
    #[instrument(skip(self), err)]
    pub async fn get_device(
        &self,
        kind: NodeKind,
        id: &str,
        filter: DeletionFilter,
        scope: Option<ScopeLevel>,
    ) -> Result<Projected<Node>, Error> {
        locate(self.store(), kind, id, filter)
            .await?
            .node
            .project(filter, scope)
            .ok_or_else(|| Error::not_found(kind, id))
    }

    /// Locates a node, exposing where it lives.
    pub async fn locate(
        &self,
        kind: NodeKind,
        id: &str,
        filter: DeletionFilter,
    ) -> Result<Located, Error> {
        locate(self.store(), kind, id, filter).await
    }

    /// Appends `child` to the array at `array`, below the live `parent`.
    ///
    /// The write only happens if the parent is still live, and the array
    /// still has `len` elements, so capacity checks done on the snapshot
    /// can't be raced past. Returns the parent, as it is after the write.
    async fn push_child(
        &self,
        parent: &Located,
        array: FieldPathBuf,
        len: usize,
        child: Document,
        now: &DateTime<Utc>,
    ) -> Result<Node, Error> {
        let parent_path = device_path(parent.node.kind(), &parent.indices)?;

        let filter = Filter::by_id(parent.branch_id.clone())
            .eq(field(&parent_path, ID_FIELD)?, parent.node.id())
            .exists(field(&parent_path, DELETED_AT)?, false)
            .exists(array.join_index(len), false);
        let update = Update::new()
            .push(array.clone(), child)
            .set(root_field(UPDATED_AT)?, encode(now)?);

        if self.store.update_one(&filter, &update).await?.matched_count == 0 {
            warn!(branch.id = %parent.branch_id, %array, "parent changed concurrently");
            return Err(Error::StaleUpdate {
                branch_id: parent.branch_id.clone(),
                path: array.to_string(),
            });
        }
        debug!(branch.id = %parent.branch_id, %array, "pushed child");

        Ok(locate(
            self.store(),
            parent.node.kind(),
            parent.node.id(),
            DeletionFilter::With,
        )
        .await?
        .node)
    }

    #[instrument(skip(self, new), err)]
    pub async fn add_router(&self, branch_id: &str, new: NewRouter) -> Result<Node, Error> {
        let parent = self
            .locate(NodeKind::Branch, branch_id, DeletionFilter::Without)
            .await?;
        let Node::Branch(branch) = &parent.node else {
            return Err(Error::not_found(NodeKind::Branch, branch_id));
        };

        let now = Utc::now();
        let router = new.into_router(now);
        router.validate()?;
        self.ensure_id_unused(&router.info.id).await?;

        let array = field(&device_path(NodeKind::Branch, &parent.indices)?, CHILDREN)?;
        self.push_child(&parent, array, branch.children.len(), encode(&router)?, &now)
            .await
    }

    #[instrument(skip(self, new), err)]
    pub async fn add_olt(&self, router_id: &str, new: NewOlt) -> Result<Node, Error> {
        let parent = self
            .locate(NodeKind::Router, router_id, DeletionFilter::Without)
            .await?;
        let Node::Router(router) = &parent.node else {
            return Err(Error::not_found(NodeKind::Router, router_id));
        };

        new.validate()?;
        let now = Utc::now();
        let olt = new.into_olt(now);
        olt.validate()?;
        self.ensure_id_unused(&olt.info.id).await?;

        let array = field(&device_path(NodeKind::Router, &parent.indices)?, CHILDREN)?;
        self.push_child(&parent, array, router.children.len(), encode(&olt)?, &now)
            .await
    }

    /// Attaches a new ODC to the PON port numbered `new.pon_port` of the OLT.
    /// A port hosts at most one live ODC.
    #[instrument(skip(self, new), err)]
    pub async fn add_odc(&self, olt_id: &str, new: NewOdc) -> Result<Node, Error> {
        let parent = self
            .locate(NodeKind::Olt, olt_id, DeletionFilter::Without)
            .await?;
        let Node::Olt(olt) = &parent.node else {
            return Err(Error::not_found(NodeKind::Olt, olt_id));
        };

        let (port_idx, port) = olt
            .pon_port
            .iter()
            .enumerate()
            .find(|(_, p)| p.port == new.pon_port)
            .ok_or_else(|| {
                Error::not_found(NodeKind::Olt, format!("{}/pon_port/{}", olt_id, new.pon_port))
            })?;
        if port.children.iter().any(|odc| odc.info.deleted_at.is_none()) {
            return Err(ValidationError::PortOccupied {
                id: olt_id.to_string(),
            }
            .into());
        }

        new.validate()?;
        let now = Utc::now();
        let odc = new.into_odc(now);
        odc.validate()?;
        self.ensure_id_unused(&odc.info.id).await?;

        let mut array = field(&device_path(NodeKind::Olt, &parent.indices)?, PON_PORT)?;
        array.push_index(port_idx);
        array.try_push(CHILDREN)?;
        self.push_child(&parent, array, port.children.len(), encode(&odc)?, &now)
            .await
    }

    /// Attaches a new ODP to the tray numbered `new.tray` of the ODC.
    /// The ODP's core needs to be within the tray's core range.
    #[instrument(skip(self, new), err)]
    pub async fn add_odp(&self, odc_id: &str, new: NewOdp) -> Result<Node, Error> {
        let parent = self
            .locate(NodeKind::Odc, odc_id, DeletionFilter::Without)
            .await?;
        let Node::Odc(odc) = &parent.node else {
            return Err(Error::not_found(NodeKind::Odc, odc_id));
        };

        let (tray_idx, tray) = odc
            .trays
            .iter()
            .enumerate()
            .find(|(_, t)| t.tray == new.tray)
            .ok_or_else(|| {
                Error::not_found(NodeKind::Odc, format!("{}/trays/{}", odc_id, new.tray))
            })?;

        let now = Utc::now();
        let odp = new.into_odp(now);
        odp.validate(tray)?;
        self.ensure_id_unused(&odp.info.id).await?;

        let mut array = field(&device_path(NodeKind::Odc, &parent.indices)?, TRAYS)?;
        array.push_index(tray_idx);
        array.try_push(CHILDREN)?;
        self.push_child(&parent, array, tray.children.len(), encode(&odp)?, &now)
            .await
    }

    /// Attaches a new ONT to the ODP, as long as the ODP has a free port.
    #[instrument(skip(self, new), err)]
    pub async fn add_ont(&self, odp_id: &str, new: NewOnt) -> Result<Node, Error> {
        let parent = self
            .locate(NodeKind::Odp, odp_id, DeletionFilter::Without)
            .await?;
        let Node::Odp(odp) = &parent.node else {
            return Err(Error::not_found(NodeKind::Odp, odp_id));
        };

        if odp.children.len() >= odp.available_port as usize {
            return Err(ValidationError::TooManyChildren {
                id: odp_id.to_string(),
                len: odp.children.len() + 1,
                capacity: odp.available_port,
            }
            .into());
        }

        let now = Utc::now();
        let ont = new.into_ont(now);
        ont.validate()?;
        self.ensure_id_unused(&ont.info.id).await?;

        let array = field(&device_path(NodeKind::Odp, &parent.indices)?, CHILDREN)?;
        self.push_child(&parent, array, odp.children.len(), encode(&ont)?, &now)
            .await
    }

    /// Adds a device of any kind below the parent, after checking the parent
    /// may contain it.
    #[instrument(skip(self, device), fields(child = %device.kind()), err)]
    pub async fn add_child(
        &self,
        parent_kind: NodeKind,
        parent_id: &str,
        device: NewDevice,
    ) -> Result<Node, Error> {
        parent_kind.check_contains(device.kind())?;

        match device {
            NewDevice::Router(new) => self.add_router(parent_id, new).await,
            NewDevice::Olt(new) => self.add_olt(parent_id, new).await,
            NewDevice::Odc(new) => self.add_odc(parent_id, new).await,
            NewDevice::Odp(new) => self.add_odp(parent_id, new).await,
            NewDevice::Ont(new) => self.add_ont(parent_id, new).await,
        }
    }

    /// Soft-deletes the node and everything live below it, all with the
    /// same timestamp. Deleting an already deleted node finishes any
    /// interrupted cascade and changes nothing otherwise.
    #[instrument(skip(self), err)]
    pub async fn soft_delete(&self, kind: NodeKind, id: &str) -> Result<bool, Error> {
        let located = self.locate(kind, id, DeletionFilter::With).await?;

        cascade::soft_delete(
            self.store(),
            self.clock,
            &located.branch_id,
            kind,
            located.indices,
            id,
        )
        .await
    }

    /// Restores the node and everything deleted together with it.
    /// Returns `None` if there's no deleted node with that id.
    #[instrument(skip(self), err)]
    pub async fn restore(&self, kind: NodeKind, id: &str) -> Result<Option<Node>, Error> {
        cascade::restore(self.store(), kind, id, self.clock.now()).await
    }
}
