use std::sync::Arc;

use url::Url;

use super::{DocumentStore, MemoryDocumentStoreConfig, RedbDocumentStoreConfig};
use crate::Error;

/// Constructs a new instance of a [DocumentStore] from an URI.
///
/// The following URIs are supported:
/// - `memory:`
///   Uses a in-memory implementation.
/// - `redb:`
///   Uses a in-memory redb implementation.
/// - `redb:///absolute/path/to/somewhere`
///   Uses redb, using a path on the disk for persistency. Can be only opened
///   from one process at the same time.
pub async fn from_addr(uri: &str) -> Result<Arc<dyn DocumentStore>, Error> {
    let url = Url::parse(uri)
        .map_err(|e| Error::StorageError(format!("unable to parse url: {}", e)))?;

    match url.scheme() {
        "memory" => Ok(MemoryDocumentStoreConfig::try_from(url)
            .map_err(|e| Error::StorageError(e.to_string()))?
            .build()),
        "redb" => {
            if url.path() == "/" {
                return Err(Error::StorageError(
                    "cowardly refusing to open / with redb".to_string(),
                ));
            }

            RedbDocumentStoreConfig::try_from(url)
                .map_err(|e| Error::StorageError(e.to_string()))?
                .build()
                .await
        }
        _ => Err(Error::StorageError(format!(
            "unknown scheme: {}",
            url.scheme()
        ))),
    }
}
