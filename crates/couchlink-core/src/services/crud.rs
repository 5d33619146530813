//! CRUD orchestrator - maps model operations onto store primitives.
//!
//! Each operation is an independent sequence of store calls; there is no
//! per-key serialisation in process. Partial updates rely on the store's
//! compare-and-swap primitive and retry the whole read-merge-write on
//! conflict.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{SubsecRound, Utc};

use crate::codec;
use crate::domain::{
    Cas, DocumentKey, FieldMap, FieldValue, ModelDefinition, ModelInstance, Payload,
    QueryDescriptor, StoreDocument,
};
use crate::identity::{IdResolver, IdSource, WriteMode};
use crate::keys;
use crate::ports::{ConnectorError, DocumentStore, StoreError};
use crate::settings::ConnectorSettings;
use crate::translator::QueryTranslator;

/// Upper bound on the backoff exponent so delays stay reasonable.
const MAX_BACKOFF_SHIFT: u32 = 10;

/// Orchestrates every model operation against one store handle.
pub struct CrudOrchestrator {
    store: Arc<dyn DocumentStore>,
    ids: IdResolver,
    translator: QueryTranslator,
    timestamp_field: String,
    max_retries: u32,
    retry_backoff: Duration,
    connected: AtomicBool,
}

impl CrudOrchestrator {
    /// Create an orchestrator over `store` with already validated settings.
    pub fn new(store: Arc<dyn DocumentStore>, settings: &ConnectorSettings) -> Self {
        Self {
            store,
            ids: IdResolver::new(settings.id_exposure, settings.default_id_field.clone()),
            translator: QueryTranslator::new(settings.bucket.clone()),
            timestamp_field: settings.timestamp_field.clone(),
            max_retries: settings.max_retries,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
            connected: AtomicBool::new(true),
        }
    }

    /// Name of the field stamped on every write.
    pub fn timestamp_field(&self) -> &str {
        &self.timestamp_field
    }

    /// Stop accepting operations. Returns `true` on the first call only.
    pub(crate) fn shut_down(&self) -> bool {
        self.connected.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn ensure_connected(&self) -> Result<(), ConnectorError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ConnectorError::Disconnected)
        }
    }

    /// Strict create: fails if the key already exists.
    pub async fn create(
        &self,
        definition: &ModelDefinition,
        instance: ModelInstance,
    ) -> Result<ModelInstance, ConnectorError> {
        self.ensure_connected()?;
        let supplied = self.ids.supplied(definition, &instance)?;
        let resolved = self.ids.resolve(definition, supplied, WriteMode::Create)?;
        let key = keys::build_key(definition.name(), &resolved.value)?;

        let mut fields = instance.into_fields();
        self.stamp(&mut fields);
        self.ids.attach(definition, &mut fields, &resolved.value);
        let payload = codec::encode(definition, &fields)?;

        let cas = match self.store.insert(&key, payload.clone()).await {
            Ok(cas) => cas,
            Err(StoreError::DuplicateKey(_)) => {
                return Err(match resolved.source {
                    IdSource::Supplied => ConnectorError::IdentifierConflict(key.into_string()),
                    IdSource::Generated => ConnectorError::DuplicateKey(key.into_string()),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(key = %key, cas = %cas, "Document created");
        Ok(self.materialize(definition, &resolved.value, &payload, Some(cas)))
    }

    /// Create-or-replace: the document at the key is fully overwritten.
    pub async fn upsert(
        &self,
        definition: &ModelDefinition,
        instance: ModelInstance,
    ) -> Result<ModelInstance, ConnectorError> {
        self.ensure_connected()?;
        let supplied = self.ids.supplied(definition, &instance)?;
        let resolved = self.ids.resolve(definition, supplied, WriteMode::Upsert)?;
        let key = keys::build_key(definition.name(), &resolved.value)?;

        let mut fields = instance.into_fields();
        self.stamp(&mut fields);
        self.ids.attach(definition, &mut fields, &resolved.value);
        let payload = codec::encode(definition, &fields)?;

        let cas = self.store.upsert_raw(&key, payload.clone()).await?;

        tracing::debug!(key = %key, cas = %cas, "Document upserted");
        Ok(self.materialize(definition, &resolved.value, &payload, Some(cas)))
    }

    /// Upsert `instance` and write the result (identifier, timestamp, version)
    /// back into it.
    pub async fn save(
        &self,
        definition: &ModelDefinition,
        instance: &mut ModelInstance,
    ) -> Result<ModelInstance, ConnectorError> {
        let saved = self.upsert(definition, instance.clone()).await?;
        instance.clone_from(&saved);
        Ok(saved)
    }

    /// Merge `partial` over the stored document of `instance`.
    ///
    /// The instance must already carry an identifier. Fields absent from
    /// `partial` keep their stored values. The write is conditional on the
    /// version read; on conflict the whole merge is retried with exponential
    /// backoff up to `max_retries` times.
    pub async fn update_attributes(
        &self,
        definition: &ModelDefinition,
        instance: &ModelInstance,
        partial: FieldMap,
    ) -> Result<ModelInstance, ConnectorError> {
        self.ensure_connected()?;
        let id = self.ids.supplied(definition, instance)?.ok_or_else(|| {
            ConnectorError::Validation(format!(
                "cannot update a '{}' instance without an identifier",
                definition.name()
            ))
        })?;
        let key = keys::build_key(definition.name(), &id)?;
        self.reject_identifier_change(definition, &id, &partial)?;

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;

            let current = self
                .store
                .get(&key)
                .await
                .map_err(|e| not_found_or(e, &key))?;

            // Only the partial is re-encoded; untouched stored values are
            // written back exactly as read.
            let mut updates = partial.clone();
            self.stamp(&mut updates);
            self.ids.attach(definition, &mut updates, &id);
            let mut payload = current.value;
            codec::encode_into(definition, &mut payload, &updates)?;

            let Some(expected) = current.cas else {
                // Store without compare-and-swap: last writer wins.
                let cas = self.store.upsert_raw(&key, payload.clone()).await?;
                tracing::debug!(key = %key, "Document merged without version check");
                return Ok(self.materialize(definition, &id, &payload, Some(cas)));
            };

            match self
                .store
                .replace_if_unchanged(&key, payload.clone(), expected)
                .await
            {
                Ok(cas) => {
                    tracing::debug!(key = %key, cas = %cas, attempts, "Document merged");
                    return Ok(self.materialize(definition, &id, &payload, Some(cas)));
                }
                Err(StoreError::Conflict(_)) if attempts <= self.max_retries => {
                    let delay = self.backoff(attempts);
                    tracing::warn!(
                        key = %key,
                        attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Version conflict during merge; retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(StoreError::Conflict(_)) => {
                    return Err(ConnectorError::ConcurrentModification {
                        key: key.into_string(),
                        attempts,
                    });
                }
                Err(e) => return Err(not_found_or(e, &key)),
            }
        }
    }

    /// Run a query and decode the rows, in store order.
    pub async fn find(
        &self,
        definition: &ModelDefinition,
        descriptor: &QueryDescriptor,
    ) -> Result<Vec<ModelInstance>, ConnectorError> {
        let rows = self.fetch(definition, descriptor).await?;
        Ok(rows
            .iter()
            .filter_map(|row| self.row_to_instance(definition, row))
            .collect())
    }

    /// Point lookup by identifier. An empty identifier names no document.
    pub async fn find_by_id(
        &self,
        definition: &ModelDefinition,
        id: &str,
    ) -> Result<Option<ModelInstance>, ConnectorError> {
        self.ensure_connected()?;
        if id.is_empty() {
            return Ok(None);
        }
        let key = keys::build_key(definition.name(), id)?;
        match self.store.get(&key).await {
            Ok(document) => Ok(Some(self.materialize(
                definition,
                id,
                &document.value,
                document.cas,
            ))),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether a document with `id` exists.
    pub async fn exists(
        &self,
        definition: &ModelDefinition,
        id: &str,
    ) -> Result<bool, ConnectorError> {
        Ok(self.find_by_id(definition, id).await?.is_some())
    }

    /// Number of documents matching the predicates of `descriptor`.
    /// Paging and projection are ignored.
    pub async fn count(
        &self,
        definition: &ModelDefinition,
        descriptor: &QueryDescriptor,
    ) -> Result<usize, ConnectorError> {
        let keys_only = descriptor.unbounded().fields(Vec::<String>::new());
        Ok(self.fetch(definition, &keys_only).await?.len())
    }

    /// Delete one document.
    pub async fn destroy_by_id(
        &self,
        definition: &ModelDefinition,
        id: &str,
    ) -> Result<(), ConnectorError> {
        self.ensure_connected()?;
        if id.is_empty() {
            return Err(ConnectorError::NotFound(keys::namespace(definition.name())));
        }
        let key = keys::build_key(definition.name(), id)?;
        self.store
            .remove(&key)
            .await
            .map_err(|e| not_found_or(e, &key))?;
        tracing::debug!(key = %key, "Document removed");
        Ok(())
    }

    /// Delete every document in the model's namespace.
    ///
    /// An empty namespace is a successful no-op. Documents created while this
    /// runs may or may not survive; documents removed concurrently by someone
    /// else are not an error.
    pub async fn destroy_all(&self, definition: &ModelDefinition) -> Result<usize, ConnectorError> {
        let keys_only = QueryDescriptor::all().fields(Vec::<String>::new());
        let rows = self.fetch(definition, &keys_only).await?;

        let mut removed = 0;
        for row in rows {
            match self.store.remove(&row.key).await {
                Ok(()) => removed += 1,
                Err(StoreError::NotFound(_)) => {
                    tracing::debug!(key = %row.key, "Document already gone during destroy-all");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(model = definition.name(), removed, "Destroyed all documents");
        Ok(removed)
    }

    async fn fetch(
        &self,
        definition: &ModelDefinition,
        descriptor: &QueryDescriptor,
    ) -> Result<Vec<StoreDocument>, ConnectorError> {
        self.ensure_connected()?;
        let plan = self
            .translator
            .translate(definition, descriptor, self.store.supports_paging())?;
        let rows = self.store.query(&plan.query).await?;
        Ok(plan.bound(rows))
    }

    fn row_to_instance(
        &self,
        definition: &ModelDefinition,
        row: &StoreDocument,
    ) -> Option<ModelInstance> {
        let Some(id) = keys::identifier_of(definition.name(), &row.key) else {
            tracing::warn!(
                key = %row.key,
                model = definition.name(),
                "Query returned a document outside the model namespace; skipping"
            );
            return None;
        };
        Some(self.materialize(definition, id, &row.value, row.cas))
    }

    /// Decode `payload` into a caller-facing instance.
    fn materialize(
        &self,
        definition: &ModelDefinition,
        id: &str,
        payload: &Payload,
        cas: Option<Cas>,
    ) -> ModelInstance {
        let mut fields = codec::decode(definition, payload);
        self.ids.attach(definition, &mut fields, id);
        let mut instance = ModelInstance::from_fields(definition.name(), fields);
        instance.set_id(id);
        instance.set_cas(cas);
        instance
    }

    fn stamp(&self, fields: &mut FieldMap) {
        fields.insert(
            self.timestamp_field.clone(),
            FieldValue::Date(Utc::now().trunc_subsecs(3)),
        );
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.retry_backoff.saturating_mul(1 << shift)
    }

    fn reject_identifier_change(
        &self,
        definition: &ModelDefinition,
        id: &str,
        partial: &FieldMap,
    ) -> Result<(), ConnectorError> {
        let field = self.ids.lookup_field(definition);
        let changed = match partial.get(field) {
            None | Some(FieldValue::Null) => false,
            Some(FieldValue::String(s)) => s != id,
            Some(FieldValue::Integer(n)) => n.to_string() != id,
            Some(_) => true,
        };
        if changed {
            return Err(ConnectorError::Validation(format!(
                "identifier field '{field}' cannot be changed by a partial update"
            )));
        }
        Ok(())
    }
}

fn not_found_or(err: StoreError, key: &DocumentKey) -> ConnectorError {
    match err {
        StoreError::NotFound(_) => ConnectorError::NotFound(key.to_string()),
        other => other.into(),
    }
}
