use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::{path::PathBuf, sync::Arc};
use tracing::{instrument, trace, warn};

use super::{document_id, DocumentStore};
use crate::{Document, Error, Filter, Update, UpdateResult};

const DOCUMENT_TABLE: TableDefinition<&str, Vec<u8>> = TableDefinition::new("documents");

#[derive(Clone)]
pub struct RedbDocumentStore {
    // We wrap the db in an Arc to be able to move it into spawn_blocking,
    // as discussed in https://github.com/cberner/redb/issues/789
    db: Arc<Database>,
}

impl RedbDocumentStore {
    /// Constructs a new instance using the specified filesystem path for
    /// storage.
    pub async fn new(path: PathBuf) -> Result<Self, Error> {
        if path == PathBuf::from("/") {
            return Err(Error::StorageError(
                "cowardly refusing to open / with redb".to_string(),
            ));
        }

        let db = tokio::task::spawn_blocking(|| -> Result<_, redb::Error> {
            let db = redb::Database::create(path)?;
            create_schema(&db)?;
            Ok(db)
        })
        .await??;

        Ok(Self { db: Arc::new(db) })
    }

    /// Constructs a new instance using the in-memory backend.
    pub fn new_temporary() -> Result<Self, Error> {
        let db =
            redb::Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;

        create_schema(&db)?;

        Ok(Self { db: Arc::new(db) })
    }
}

/// Ensures all tables are present.
/// Opens a write transaction and calls open_table on DOCUMENT_TABLE, which will
/// create it if not present.
fn create_schema(db: &redb::Database) -> Result<(), redb::Error> {
    let txn = db.begin_write()?;
    txn.open_table(DOCUMENT_TABLE)?;
    txn.commit()?;

    Ok(())
}

fn decode(id: &str, data: &[u8]) -> Result<Document, Error> {
    serde_json::from_slice(data).map_err(|e| {
        warn!(document.id = %id, err = %e, "failed to parse document");
        Error::StorageError(format!("failed to parse document {}", id))
    })
}

/// Returns the first document matching the filter, together with its identity.
/// Uses a point lookup if the filter is pinned to an identity, scans the
/// table otherwise.
fn first_match<T>(table: &T, filter: &Filter) -> Result<Option<(String, Document)>, Error>
where
    T: ReadableTable<&'static str, Vec<u8>>,
{
    if let Some(id) = filter.pinned_id() {
        return Ok(match table.get(id)? {
            None => None,
            Some(data) => {
                let document = decode(id, &data.value())?;
                filter
                    .matches(&document)
                    .then(|| (id.to_owned(), document))
            }
        });
    }

    for entry in table.iter()? {
        let (id, data) = entry?;
        let document = decode(id.value(), &data.value())?;
        if filter.matches(&document) {
            return Ok(Some((id.value().to_owned(), document)));
        }
    }

    Ok(None)
}

#[async_trait]
impl DocumentStore for RedbDocumentStore {
    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<Document>, Error> {
        let db = self.db.clone();
        let id = id.to_owned();

        tokio::task::spawn_blocking(move || -> Result<Option<Document>, Error> {
            let txn = db.begin_read()?;
            let table = txn.open_table(DOCUMENT_TABLE)?;
            let data = table.get(id.as_str())?;
            data.map(|data| decode(&id, &data.value())).transpose()
        })
        .await?
    }

    #[instrument(skip_all)]
    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, Error> {
        let db = self.db.clone();
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || -> Result<Option<Document>, Error> {
            let txn = db.begin_read()?;
            let table = txn.open_table(DOCUMENT_TABLE)?;
            Ok(first_match(&table, &filter)?.map(|(_, document)| document))
        })
        .await?
    }

    #[instrument(skip_all)]
    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, Error> {
        let db = self.db.clone();
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || -> Result<Vec<Document>, Error> {
            let txn = db.begin_read()?;
            let table = txn.open_table(DOCUMENT_TABLE)?;

            let mut documents = Vec::new();
            for entry in table.iter()? {
                let (id, data) = entry?;
                let document = decode(id.value(), &data.value())?;
                if filter.matches(&document) {
                    documents.push(document);
                }
            }

            Ok(documents)
        })
        .await?
    }

    #[instrument(skip_all, err)]
    async fn insert_one(&self, document: Document) -> Result<String, Error> {
        let id = document_id(&document)?;
        let data = serde_json::to_vec(&document)?;
        let db = self.db.clone();

        tokio::task::spawn_blocking(move || -> Result<String, Error> {
            let txn = db.begin_write()?;
            {
                let mut table = txn.open_table(DOCUMENT_TABLE)?;
                if table.get(id.as_str())?.is_some() {
                    return Err(Error::InvalidRequest(format!(
                        "document {} already exists",
                        id
                    )));
                }
                table.insert(id.as_str(), data)?;
            }
            txn.commit()?;

            Ok(id)
        })
        .await?
    }

    #[instrument(skip_all, err)]
    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateResult, Error> {
        let db = self.db.clone();
        let filter = filter.clone();
        let update = update.clone();

        // Matching and applying happen inside the same write transaction,
        // which redb serializes against all other writers.
        tokio::task::spawn_blocking(move || -> Result<UpdateResult, Error> {
            let txn = db.begin_write()?;
            let result = {
                let mut table = txn.open_table(DOCUMENT_TABLE)?;

                match first_match(&table, &filter)? {
                    None => UpdateResult::NOT_MATCHED,
                    Some((id, document)) => {
                        let updated = update.apply(&document)?;
                        trace!(document.id = %id, modified = updated.is_some(), "applied update");

                        match updated {
                            None => UpdateResult::matched(false),
                            Some(updated) => {
                                table.insert(id.as_str(), serde_json::to_vec(&updated)?)?;
                                UpdateResult::matched(true)
                            }
                        }
                    }
                }
            };
            txn.commit()?;

            Ok(result)
        })
        .await?
    }

    #[instrument(skip_all, err)]
    async fn delete_one(&self, filter: &Filter) -> Result<bool, Error> {
        let db = self.db.clone();
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || -> Result<bool, Error> {
            let txn = db.begin_write()?;
            let removed = {
                let mut table = txn.open_table(DOCUMENT_TABLE)?;
                match first_match(&table, &filter)? {
                    None => false,
                    Some((id, _)) => table.remove(id.as_str())?.is_some(),
                }
            };
            txn.commit()?;

            Ok(removed)
        })
        .await?
    }
}

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RedbDocumentStoreConfig {
    is_temporary: bool,
    #[serde(default)]
    /// required when is_temporary = false
    path: Option<PathBuf>,
}

impl TryFrom<url::Url> for RedbDocumentStoreConfig {
    type Error = Box<dyn std::error::Error + Send + Sync>;
    fn try_from(url: url::Url) -> Result<Self, Self::Error> {
        // redb doesn't support host, and a path can be provided (otherwise
        // it'll live in memory only).
        if url.has_host() {
            return Err(Error::StorageError("no host allowed".to_string()).into());
        }

        Ok(if url.path().is_empty() {
            RedbDocumentStoreConfig {
                is_temporary: true,
                path: None,
            }
        } else {
            RedbDocumentStoreConfig {
                is_temporary: false,
                path: Some(url.path().into()),
            }
        })
    }
}

impl RedbDocumentStoreConfig {
    pub async fn build(&self) -> Result<Arc<dyn DocumentStore>, Error> {
        match self {
            RedbDocumentStoreConfig {
                is_temporary: true,
                path: None,
            } => Ok(Arc::new(RedbDocumentStore::new_temporary()?)),
            RedbDocumentStoreConfig {
                is_temporary: true,
                path: Some(_),
            } => Err(Error::StorageError(
                "Temporary RedbDocumentStore can not have path".into(),
            )),
            RedbDocumentStoreConfig {
                is_temporary: false,
                path: None,
            } => Err(Error::StorageError("RedbDocumentStore is missing path".into())),
            RedbDocumentStoreConfig {
                is_temporary: false,
                path: Some(path),
            } => Ok(Arc::new(RedbDocumentStore::new(path.clone()).await?)),
        }
    }
}
