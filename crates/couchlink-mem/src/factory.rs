//! Composition utilities for building a `Connector` over the in-memory store.
//!
//! Construction only; no mapping logic lives here.

use std::sync::Arc;

use couchlink_core::{Connector, ConnectorSettings, DocumentStore};

use crate::store::MemoryStore;

/// Factory for wiring a [`Connector`] to a store.
pub struct ConnectorFactory;

impl ConnectorFactory {
    /// Build a connector over any store implementation.
    pub fn build_connector(
        store: Arc<dyn DocumentStore>,
        settings: ConnectorSettings,
    ) -> anyhow::Result<Connector> {
        Ok(Connector::new(store, settings)?)
    }

    /// A connector over a fresh in-memory store, with the store handle
    /// returned for inspection.
    pub fn in_memory(
        settings: ConnectorSettings,
    ) -> anyhow::Result<(Connector, Arc<MemoryStore>)> {
        let store = Arc::new(MemoryStore::new());
        let connector =
            Self::build_connector(Arc::clone(&store) as Arc<dyn DocumentStore>, settings)?;
        Ok((connector, store))
    }

    /// A connector over a fresh in-memory store, configured from the
    /// `COUCHLINK_*` environment.
    pub fn in_memory_from_env() -> anyhow::Result<(Connector, Arc<MemoryStore>)> {
        let settings = ConnectorSettings::from_env()?;
        Self::in_memory(settings)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use test_store::TestStore;

#[cfg(any(test, feature = "test-utils"))]
mod test_store {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use couchlink_core::{
        Cas, Connector, ConnectorSettings, DocumentKey, DocumentStore, Payload, StoreDocument,
        StoreError, StoreQuery,
    };

    use crate::store::MemoryStore;

    /// Test store helper for integration tests.
    ///
    /// Wraps a [`MemoryStore`] and can inject version conflicts into
    /// conditional replaces, to drive the connector's retry path
    /// deterministically.
    pub struct TestStore {
        inner: MemoryStore,
        pending_conflicts: AtomicU32,
        replace_attempts: AtomicU32,
    }

    impl TestStore {
        /// A store that pages natively.
        pub fn new() -> Arc<Self> {
            Self::wrap(MemoryStore::new())
        }

        /// A store that cannot page.
        pub fn without_paging() -> Arc<Self> {
            Self::wrap(MemoryStore::without_paging())
        }

        fn wrap(inner: MemoryStore) -> Arc<Self> {
            Arc::new(Self {
                inner,
                pending_conflicts: AtomicU32::new(0),
                replace_attempts: AtomicU32::new(0),
            })
        }

        /// Fail the next `count` conditional replaces with a conflict.
        pub fn inject_conflicts(&self, count: u32) {
            self.pending_conflicts.store(count, Ordering::SeqCst);
        }

        /// Conditional replaces attempted so far, conflicts included.
        pub fn replace_attempts(&self) -> u32 {
            self.replace_attempts.load(Ordering::SeqCst)
        }

        /// The wrapped store.
        pub const fn memory(&self) -> &MemoryStore {
            &self.inner
        }

        /// A connector over this store.
        pub fn connector(
            self: &Arc<Self>,
            settings: ConnectorSettings,
        ) -> anyhow::Result<Connector> {
            Ok(Connector::new(
                Arc::clone(self) as Arc<dyn DocumentStore>,
                settings,
            )?)
        }
    }

    #[async_trait]
    impl DocumentStore for TestStore {
        async fn get(&self, key: &DocumentKey) -> Result<StoreDocument, StoreError> {
            self.inner.get(key).await
        }

        async fn insert(&self, key: &DocumentKey, payload: Payload) -> Result<Cas, StoreError> {
            self.inner.insert(key, payload).await
        }

        async fn upsert_raw(
            &self,
            key: &DocumentKey,
            payload: Payload,
        ) -> Result<Cas, StoreError> {
            self.inner.upsert_raw(key, payload).await
        }

        async fn replace_if_unchanged(
            &self,
            key: &DocumentKey,
            payload: Payload,
            cas: Cas,
        ) -> Result<Cas, StoreError> {
            self.replace_attempts.fetch_add(1, Ordering::SeqCst);
            let injected = self
                .pending_conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if injected {
                return Err(StoreError::Conflict(key.to_string()));
            }
            self.inner.replace_if_unchanged(key, payload, cas).await
        }

        async fn remove(&self, key: &DocumentKey) -> Result<(), StoreError> {
            self.inner.remove(key).await
        }

        async fn query(&self, query: &StoreQuery) -> Result<Vec<StoreDocument>, StoreError> {
            self.inner.query(query).await
        }

        fn supports_paging(&self) -> bool {
            self.inner.supports_paging()
        }

        async fn close(&self) -> Result<(), StoreError> {
            self.inner.close().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use couchlink_core::{FieldType, ModelDefinition, ModelInstance};

    #[tokio::test]
    async fn test_in_memory_connector_round_trip() {
        let (connector, store) =
            ConnectorFactory::in_memory(ConnectorSettings::with_defaults()).unwrap();
        let countries = connector
            .define(
                ModelDefinition::builder("Country")
                    .field("name", FieldType::String)
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let created = countries
            .create(ModelInstance::new("Country").with("name", "Japan"))
            .await
            .unwrap();

        assert_eq!(store.len().await, 1);
        let found = countries
            .find_by_id(created.id().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("name"), created.get("name"));
    }

    #[test]
    fn test_invalid_settings_surface_as_error() {
        let settings = ConnectorSettings {
            max_retries: 100,
            ..ConnectorSettings::with_defaults()
        };
        let err = ConnectorFactory::in_memory(settings).err().unwrap();
        assert!(err.to_string().contains("Max retries"));
    }

    #[tokio::test]
    async fn test_injected_conflicts_are_consumed() {
        let store = TestStore::new();
        let key = couchlink_core::build_key("Country", "a").unwrap();
        let cas = store.insert(&key, couchlink_core::Payload::new()).await.unwrap();

        store.inject_conflicts(1);
        assert!(matches!(
            store.replace_if_unchanged(&key, couchlink_core::Payload::new(), cas).await,
            Err(couchlink_core::StoreError::Conflict(_))
        ));
        assert!(
            store
                .replace_if_unchanged(&key, couchlink_core::Payload::new(), cas)
                .await
                .is_ok()
        );
        assert_eq!(store.replace_attempts(), 2);
    }
}
