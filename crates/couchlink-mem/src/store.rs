//! In-memory implementation of the `DocumentStore` port.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use couchlink_core::{
    Cas, DocumentKey, DocumentStore, Payload, StoreDocument, StoreError, StoreQuery,
};

use crate::filter;

/// One stored document: serialized body plus its current version.
#[derive(Debug, Clone)]
struct Entry {
    body: Vec<u8>,
    cas: Cas,
}

/// In-memory document store.
///
/// Documents are kept serialized, as a remote store would keep them, in key
/// order. Every write bumps a store-wide version counter, so a version token
/// is never reused. Single-document operations are atomic under one lock.
pub struct MemoryStore {
    documents: RwLock<BTreeMap<DocumentKey, Entry>>,
    next_cas: AtomicU64,
    native_paging: bool,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store that executes `LIMIT`/`OFFSET` itself.
    pub fn new() -> Self {
        Self::with_paging(true)
    }

    /// A store that cannot page, forcing the connector to bound results.
    pub fn without_paging() -> Self {
        Self::with_paging(false)
    }

    fn with_paging(native_paging: bool) -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            next_cas: AtomicU64::new(1),
            native_paging,
            closed: AtomicBool::new(false),
        }
    }

    /// Number of stored documents across every namespace.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Every stored key, in key order.
    pub async fn keys(&self) -> Vec<DocumentKey> {
        self.documents.read().await.keys().cloned().collect()
    }

    /// Drop every document.
    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            Err(StoreError::Storage("store handle is closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn bump(&self) -> Cas {
        Cas(self.next_cas.fetch_add(1, Ordering::SeqCst))
    }

    fn serialize(key: &DocumentKey, payload: &Payload) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(payload)
            .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))
    }

    fn deserialize(key: &DocumentKey, entry: &Entry) -> Result<Payload, StoreError> {
        serde_json::from_slice(&entry.body)
            .map_err(|e| StoreError::Serialization(format!("{key}: {e}")))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &DocumentKey) -> Result<StoreDocument, StoreError> {
        self.ensure_open()?;
        let documents = self.documents.read().await;
        let entry = documents
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let value = Self::deserialize(key, entry)?;
        Ok(StoreDocument::new(key.clone(), value, Some(entry.cas)))
    }

    async fn insert(&self, key: &DocumentKey, payload: Payload) -> Result<Cas, StoreError> {
        self.ensure_open()?;
        let body = Self::serialize(key, &payload)?;
        let mut documents = self.documents.write().await;
        if documents.contains_key(key) {
            return Err(StoreError::DuplicateKey(key.to_string()));
        }
        let cas = self.bump();
        documents.insert(key.clone(), Entry { body, cas });
        Ok(cas)
    }

    async fn upsert_raw(&self, key: &DocumentKey, payload: Payload) -> Result<Cas, StoreError> {
        self.ensure_open()?;
        let body = Self::serialize(key, &payload)?;
        let mut documents = self.documents.write().await;
        let cas = self.bump();
        documents.insert(key.clone(), Entry { body, cas });
        Ok(cas)
    }

    async fn replace_if_unchanged(
        &self,
        key: &DocumentKey,
        payload: Payload,
        cas: Cas,
    ) -> Result<Cas, StoreError> {
        self.ensure_open()?;
        let body = Self::serialize(key, &payload)?;
        let mut documents = self.documents.write().await;
        let entry = documents
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        if entry.cas != cas {
            tracing::debug!(key = %key, expected = %cas, actual = %entry.cas, "Version mismatch");
            return Err(StoreError::Conflict(key.to_string()));
        }
        let next = self.bump();
        *entry = Entry { body, cas: next };
        Ok(next)
    }

    async fn remove(&self, key: &DocumentKey) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.documents
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn query(&self, query: &StoreQuery) -> Result<Vec<StoreDocument>, StoreError> {
        self.ensure_open()?;
        let documents = self.documents.read().await;

        let mut rows = Vec::new();
        for (key, entry) in &*documents {
            if !key.as_str().starts_with(&query.namespace) {
                continue;
            }
            let value = Self::deserialize(key, entry)?;
            if !filter::matches_all(&value, &query.filters) {
                continue;
            }
            rows.push(match &query.projection {
                Some(fields) => {
                    let projected: Payload = fields
                        .iter()
                        .filter_map(|f| value.get(f).map(|v| (f.clone(), v.clone())))
                        .collect();
                    StoreDocument::new(key.clone(), projected, None)
                }
                None => StoreDocument::new(key.clone(), value, Some(entry.cas)),
            });
        }
        drop(documents);

        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);
        let rows: Vec<StoreDocument> = rows.into_iter().skip(offset).take(limit).collect();

        tracing::debug!(
            namespace = %query.namespace,
            filters = query.filters.len(),
            rows = rows.len(),
            "Query executed"
        );
        Ok(rows)
    }

    fn supports_paging(&self) -> bool {
        self.native_paging
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
