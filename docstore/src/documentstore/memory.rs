use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{instrument, trace};

use super::{document_id, DocumentStore};
use crate::{Document, Error, Filter, Update, UpdateResult};

#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    db: Arc<RwLock<BTreeMap<String, Document>>>,
}

/// Returns the identity of the first document matching the filter.
fn first_match<'a>(
    db: &'a BTreeMap<String, Document>,
    filter: &Filter,
) -> Option<(&'a String, &'a Document)> {
    match filter.pinned_id() {
        Some(id) => db
            .get_key_value(id)
            .filter(|(_, document)| filter.matches(document)),
        None => db.iter().find(|(_, document)| filter.matches(document)),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<Document>, Error> {
        let db = self.db.read()?;

        Ok(db.get(id).cloned())
    }

    #[instrument(skip_all)]
    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, Error> {
        let db = self.db.read()?;

        Ok(first_match(&db, filter).map(|(_, document)| document.clone()))
    }

    #[instrument(skip_all)]
    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, Error> {
        let db = self.db.read()?;

        // Copy all matching elements into a list, they need to be returned
        // owned anyways.
        Ok(db
            .values()
            .filter(|document| filter.matches(document))
            .cloned()
            .collect())
    }

    #[instrument(skip_all, err)]
    async fn insert_one(&self, document: Document) -> Result<String, Error> {
        let id = document_id(&document)?;

        let mut db = self.db.write()?;
        if db.contains_key(&id) {
            return Err(Error::InvalidRequest(format!(
                "document {} already exists",
                id
            )));
        }
        db.insert(id.clone(), document);

        Ok(id)
    }

    #[instrument(skip_all, err)]
    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateResult, Error> {
        // Hold the write lock across matching and applying, so nobody else
        // can change the document in between.
        let mut db = self.db.write()?;

        let (id, updated) = match first_match(&db, filter) {
            None => return Ok(UpdateResult::NOT_MATCHED),
            Some((id, document)) => (id.clone(), update.apply(document)?),
        };

        trace!(document.id = %id, modified = updated.is_some(), "applied update");

        Ok(match updated {
            None => UpdateResult::matched(false),
            Some(updated) => {
                db.insert(id, updated);
                UpdateResult::matched(true)
            }
        })
    }

    #[instrument(skip_all, err)]
    async fn delete_one(&self, filter: &Filter) -> Result<bool, Error> {
        let mut db = self.db.write()?;

        let id = match first_match(&db, filter) {
            None => return Ok(false),
            Some((id, _)) => id.clone(),
        };

        Ok(db.remove(&id).is_some())
    }
}

#[derive(serde::Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct MemoryDocumentStoreConfig {}

impl TryFrom<url::Url> for MemoryDocumentStoreConfig {
    type Error = Box<dyn std::error::Error + Send + Sync>;
    fn try_from(url: url::Url) -> Result<Self, Self::Error> {
        // memory doesn't support host or path in the URL.
        if url.has_host() || !url.path().is_empty() {
            return Err(Error::StorageError("invalid url".to_string()).into());
        }
        Ok(MemoryDocumentStoreConfig {})
    }
}

impl MemoryDocumentStoreConfig {
    pub fn build(&self) -> Arc<dyn DocumentStore> {
        Arc::new(MemoryDocumentStore::default())
    }
}
