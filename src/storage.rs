//! the storage seam and a process local implementation.
//!
//! Durable persistence (a document store in production deployments) is
//! consumed through the [Storage] trait only. The namespace replace must be a
//! single atomic write so concurrent readers never observe a partially
//! updated record. Sequence rows are keyed by (namespace, load id, sequence
//! id) : rows written under a load id the namespace no longer references stay
//! orphaned in storage, unreachable until that load id is republished.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::HomError;
use crate::namespace::Namespace;
use crate::types::{LoadId, NamespaceId, SequenceMetadata};

pub trait Storage: Send + Sync {
    /// full replace with upsert semantics, the single commit point of a load
    fn create_or_replace_namespace(&self, namespace: &Namespace) -> Result<(), HomError>;

    fn get_namespace(&self, id: &NamespaceId) -> Result<Namespace, HomError>;

    /// removes the namespace and the rows of its currently referenced load.
    /// Calling this during an active load can leave that load inconsistent,
    /// sequencing is the caller's responsibility.
    fn delete_namespace(&self, id: &NamespaceId) -> Result<(), HomError>;

    /// persist one batch of metadata rows under (namespace, load), stamped
    /// with the batch capture timestamp. Rows with an already stored sequence
    /// id under the same load are overwritten.
    fn save_sequence_metadata(
        &self,
        namespace: &NamespaceId,
        load: &LoadId,
        batch: &[SequenceMetadata],
        timestamp: DateTime<Utc>,
    ) -> Result<(), HomError>;

    /// fetch metadata rows by sequence id under (namespace, load).
    /// A missing id is a no-such-sequence error naming it.
    fn get_sequence_metadata(
        &self,
        namespace: &NamespaceId,
        load: &LoadId,
        ids: &[String],
    ) -> Result<Vec<SequenceMetadata>, HomError>;
} // end of trait Storage

//==================================================================================

struct StoredRow {
    metadata: SequenceMetadata,
    created: DateTime<Utc>,
}

#[derive(Default)]
struct MemoryInner {
    namespaces: HashMap<NamespaceId, Namespace>,
    rows: HashMap<(NamespaceId, LoadId, String), StoredRow>,
}

/// in memory [Storage], for tests and single process embeddings.
/// Mirrors the document store semantics including load id orphaning.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<MemoryInner>,
} // end of MemoryStorage

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// number of rows stored under (namespace, load), orphaned ones included
    pub fn count_rows(&self, namespace: &NamespaceId, load: &LoadId) -> usize {
        let inner = self.inner.lock();
        inner
            .rows
            .keys()
            .filter(|(ns, l, _)| ns == namespace && l == load)
            .count()
    }

    /// capture timestamp of one row, if present
    pub fn row_timestamp(
        &self,
        namespace: &NamespaceId,
        load: &LoadId,
        id: &str,
    ) -> Option<DateTime<Utc>> {
        let inner = self.inner.lock();
        inner
            .rows
            .get(&(namespace.clone(), load.clone(), id.to_string()))
            .map(|row| row.created)
    }
} // end of impl MemoryStorage

impl Storage for MemoryStorage {
    fn create_or_replace_namespace(&self, namespace: &Namespace) -> Result<(), HomError> {
        let mut inner = self.inner.lock();
        inner
            .namespaces
            .insert(namespace.get_id().clone(), namespace.clone());
        log::debug!(
            "stored namespace {} pointing at load {}",
            namespace.get_id().get(),
            namespace.get_load_id().get()
        );
        Ok(())
    }

    fn get_namespace(&self, id: &NamespaceId) -> Result<Namespace, HomError> {
        let inner = self.inner.lock();
        inner
            .namespaces
            .get(id)
            .cloned()
            .ok_or_else(|| HomError::NoSuchNamespace(id.get().to_string()))
    }

    fn delete_namespace(&self, id: &NamespaceId) -> Result<(), HomError> {
        let mut inner = self.inner.lock();
        let namespace = inner
            .namespaces
            .remove(id)
            .ok_or_else(|| HomError::NoSuchNamespace(id.get().to_string()))?;
        let load = namespace.get_load_id().clone();
        inner.rows.retain(|(ns, l, _), _| !(ns == id && *l == load));
        Ok(())
    }

    fn save_sequence_metadata(
        &self,
        namespace: &NamespaceId,
        load: &LoadId,
        batch: &[SequenceMetadata],
        timestamp: DateTime<Utc>,
    ) -> Result<(), HomError> {
        let mut inner = self.inner.lock();
        for metadata in batch {
            inner.rows.insert(
                (
                    namespace.clone(),
                    load.clone(),
                    metadata.get_id().to_string(),
                ),
                StoredRow {
                    metadata: metadata.clone(),
                    created: timestamp,
                },
            );
        }
        Ok(())
    }

    fn get_sequence_metadata(
        &self,
        namespace: &NamespaceId,
        load: &LoadId,
        ids: &[String],
    ) -> Result<Vec<SequenceMetadata>, HomError> {
        let inner = self.inner.lock();
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let row = inner
                .rows
                .get(&(namespace.clone(), load.clone(), id.clone()))
                .ok_or_else(|| HomError::NoSuchSequence {
                    namespace: namespace.get().to_string(),
                    load: load.get().to_string(),
                    id: id.clone(),
                })?;
            found.push(row.metadata.clone());
        }
        Ok(found)
    }
} // end of impl Storage for MemoryStorage

//==================================================================================

// end of mod tests
