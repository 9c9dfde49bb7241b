use async_trait::async_trait;

use crate::{Document, Error, Filter, Update, UpdateResult};

mod from_addr;
mod memory;
mod redb;
#[cfg(test)]
pub mod tests;

pub use self::from_addr::from_addr;
pub use self::memory::{MemoryDocumentStore, MemoryDocumentStoreConfig};
pub use self::redb::{RedbDocumentStore, RedbDocumentStoreConfig};

/// The base trait all document stores need to implement.
///
/// A store holds a single collection of JSON object documents, each
/// identified by a string `_id`. Every [DocumentStore::update_one] is atomic
/// with respect to the single document it modifies, there are no transactions
/// spanning more than one call.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Looks up a single document by its identity.
    /// In case the document is not found, Ok(None) is returned.
    async fn get(&self, id: &str) -> Result<Option<Document>, Error>;

    /// Returns the first document matching the filter, in identity order.
    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, Error>;

    /// Returns all documents matching the filter, in identity order.
    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, Error>;

    /// Inserts a new document, returning its identity.
    /// An error *must* be returned if the document is not an object, has no
    /// string `_id`, or a document with the same identity already exists.
    async fn insert_one(&self, document: Document) -> Result<String, Error>;

    /// Applies the update to the first document matching the filter.
    /// The filter is evaluated and the update applied without any other
    /// write to the same store interleaving.
    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateResult, Error>;

    /// Removes the first document matching the filter.
    /// Returns whether a document was removed.
    async fn delete_one(&self, filter: &Filter) -> Result<bool, Error>;
}

#[async_trait]
impl<A> DocumentStore for A
where
    A: AsRef<dyn DocumentStore> + Send + Sync,
{
    async fn get(&self, id: &str) -> Result<Option<Document>, Error> {
        self.as_ref().get(id).await
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<Document>, Error> {
        self.as_ref().find_one(filter).await
    }

    async fn find(&self, filter: &Filter) -> Result<Vec<Document>, Error> {
        self.as_ref().find(filter).await
    }

    async fn insert_one(&self, document: Document) -> Result<String, Error> {
        self.as_ref().insert_one(document).await
    }

    async fn update_one(&self, filter: &Filter, update: &Update) -> Result<UpdateResult, Error> {
        self.as_ref().update_one(filter, update).await
    }

    async fn delete_one(&self, filter: &Filter) -> Result<bool, Error> {
        self.as_ref().delete_one(filter).await
    }
}

/// Extracts the identity of a document about to be inserted.
pub(crate) fn document_id(document: &Document) -> Result<String, Error> {
    match document {
        Document::Object(map) => match map.get(crate::filter::ID_FIELD) {
            Some(Document::String(id)) if !id.is_empty() => Ok(id.clone()),
            _ => Err(Error::InvalidRequest(
                "document is missing a string _id".to_string(),
            )),
        },
        _ => Err(Error::InvalidRequest(
            "document is not an object".to_string(),
        )),
    }
}
