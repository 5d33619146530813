//! `Connector` - the single entry point of the library.
//!
//! Adapters construct a `Connector` with a concrete [`DocumentStore`] and
//! register model definitions on it. Each registration yields a cloneable
//! [`ModelHandle`] carrying every caller-facing operation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::{FieldMap, FieldType, ModelDefinition, ModelInstance, QueryDescriptor};
use crate::ports::{ConnectorError, DocumentStore};
use crate::settings::{ConnectorSettings, validate_settings};

use super::CrudOrchestrator;

struct Shared {
    crud: CrudOrchestrator,
    settings: ConnectorSettings,
    models: RwLock<HashMap<String, Arc<ModelDefinition>>>,
}

/// Connector facade over one store handle.
///
/// # Example
///
/// ```ignore
/// let connector = Connector::new(store, ConnectorSettings::with_defaults())?;
/// let countries = connector.define(country_definition)?;
///
/// let japan = countries.create(countries.new_instance().with("name", "Japan")).await?;
/// let found = countries.find_by_id(japan.id().unwrap_or_default()).await?;
/// ```
#[derive(Clone)]
pub struct Connector {
    shared: Arc<Shared>,
}

impl Connector {
    /// Create a connector over `store`. Settings are validated first.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        settings: ConnectorSettings,
    ) -> Result<Self, ConnectorError> {
        validate_settings(&settings)?;
        tracing::info!(
            bucket = %settings.bucket,
            max_retries = settings.max_retries,
            paging = store.supports_paging(),
            "Connector initialized"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                crud: CrudOrchestrator::new(store, &settings),
                settings,
                models: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// Settings this connector was built with.
    pub fn settings(&self) -> &ConnectorSettings {
        &self.shared.settings
    }

    /// Register a model definition.
    ///
    /// The configured timestamp field is declared as a date field when the
    /// definition does not declare it itself; declaring it with any other
    /// type is a validation error, as is registering a name twice.
    pub fn define(&self, definition: ModelDefinition) -> Result<ModelHandle, ConnectorError> {
        let stamp = self.shared.crud.timestamp_field();
        if let Some(declared) = definition.field(stamp) {
            if declared.field_type != FieldType::Date {
                return Err(ConnectorError::Validation(format!(
                    "model '{}' declares timestamp field '{stamp}' as {}, expected {}",
                    definition.name(),
                    declared.field_type,
                    FieldType::Date
                )));
            }
        }
        let definition = Arc::new(definition.with_implicit_field(stamp, FieldType::Date));

        let mut models = self
            .shared
            .models
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if models.contains_key(definition.name()) {
            return Err(ConnectorError::Validation(format!(
                "model '{}' is already defined",
                definition.name()
            )));
        }
        models.insert(definition.name().to_string(), Arc::clone(&definition));
        drop(models);

        tracing::debug!(
            model = definition.name(),
            fields = definition.fields().len(),
            "Model defined"
        );
        Ok(ModelHandle {
            shared: Arc::clone(&self.shared),
            definition,
        })
    }

    /// Handle for an already registered model.
    pub fn model(&self, name: &str) -> Result<ModelHandle, ConnectorError> {
        let definition = self
            .shared
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ConnectorError::UnknownModel(name.to_string()))?;
        Ok(ModelHandle {
            shared: Arc::clone(&self.shared),
            definition,
        })
    }

    /// Names of all registered models, sorted.
    pub fn models(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .shared
            .models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Close the store handle.
    ///
    /// Only the first call closes the store; later calls are no-ops. Every
    /// operation issued afterwards fails with [`ConnectorError::Disconnected`].
    pub async fn disconnect(&self) -> Result<(), ConnectorError> {
        if !self.shared.crud.shut_down() {
            return Ok(());
        }
        self.shared.crud.store().close().await?;
        tracing::info!(bucket = %self.shared.settings.bucket, "Connector disconnected");
        Ok(())
    }
}

/// Caller-facing operations for one registered model.
#[derive(Clone)]
pub struct ModelHandle {
    shared: Arc<Shared>,
    definition: Arc<ModelDefinition>,
}

impl ModelHandle {
    /// The registered definition, including implicit fields.
    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// An empty, unsaved instance of this model.
    pub fn new_instance(&self) -> ModelInstance {
        ModelInstance::new(self.definition.name())
    }

    pub async fn create(&self, instance: ModelInstance) -> Result<ModelInstance, ConnectorError> {
        self.check_model(&instance)?;
        self.shared.crud.create(&self.definition, instance).await
    }

    pub async fn upsert(&self, instance: ModelInstance) -> Result<ModelInstance, ConnectorError> {
        self.check_model(&instance)?;
        self.shared.crud.upsert(&self.definition, instance).await
    }

    /// Upsert and write identifier, timestamp and version back into
    /// `instance`.
    pub async fn save(
        &self,
        instance: &mut ModelInstance,
    ) -> Result<ModelInstance, ConnectorError> {
        self.check_model(instance)?;
        self.shared.crud.save(&self.definition, instance).await
    }

    pub async fn update_attributes(
        &self,
        instance: &ModelInstance,
        partial: FieldMap,
    ) -> Result<ModelInstance, ConnectorError> {
        self.check_model(instance)?;
        self.shared
            .crud
            .update_attributes(&self.definition, instance, partial)
            .await
    }

    pub async fn find(
        &self,
        descriptor: &QueryDescriptor,
    ) -> Result<Vec<ModelInstance>, ConnectorError> {
        self.shared.crud.find(&self.definition, descriptor).await
    }

    /// Every instance of this model.
    pub async fn find_all(&self) -> Result<Vec<ModelInstance>, ConnectorError> {
        self.find(&QueryDescriptor::all()).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<ModelInstance>, ConnectorError> {
        self.shared.crud.find_by_id(&self.definition, id).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, ConnectorError> {
        self.shared.crud.exists(&self.definition, id).await
    }

    pub async fn count(&self, descriptor: &QueryDescriptor) -> Result<usize, ConnectorError> {
        self.shared.crud.count(&self.definition, descriptor).await
    }

    pub async fn destroy_by_id(&self, id: &str) -> Result<(), ConnectorError> {
        self.shared.crud.destroy_by_id(&self.definition, id).await
    }

    /// See [`CrudOrchestrator::destroy_all`] for the race semantics.
    pub async fn destroy_all(&self) -> Result<usize, ConnectorError> {
        self.shared.crud.destroy_all(&self.definition).await
    }

    fn check_model(&self, instance: &ModelInstance) -> Result<(), ConnectorError> {
        if instance.model() == self.definition.name() {
            Ok(())
        } else {
            Err(ConnectorError::Validation(format!(
                "instance of '{}' passed to model '{}'",
                instance.model(),
                self.definition.name()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cas, FieldValue};
    use crate::ports::StoreError;
    use crate::ports::document_store::MockDocumentStore;
    use crate::settings::SettingsError;

    fn definition(name: &str) -> ModelDefinition {
        ModelDefinition::builder(name)
            .field("name", FieldType::String)
            .build()
            .unwrap()
    }

    fn connector(store: MockDocumentStore) -> Connector {
        Connector::new(Arc::new(store), ConnectorSettings::with_defaults()).unwrap()
    }

    fn paging_store() -> MockDocumentStore {
        let mut store = MockDocumentStore::new();
        store.expect_supports_paging().return_const(true);
        store
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let settings = ConnectorSettings {
            bucket: String::new(),
            ..ConnectorSettings::with_defaults()
        };
        let err = Connector::new(Arc::new(paging_store()), settings)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ConnectorError::Settings(SettingsError::EmptyBucket)
        ));
    }

    #[test]
    fn test_define_registers_timestamp_field() {
        let connector = connector(paging_store());
        let handle = connector.define(definition("Country")).unwrap();

        let stamp = handle.definition().field("updatedAt").unwrap();
        assert_eq!(stamp.field_type, FieldType::Date);
        assert_eq!(connector.models(), vec!["Country".to_string()]);
    }

    #[test]
    fn test_define_rejects_non_date_timestamp_field() {
        let connector = connector(paging_store());
        let definition = ModelDefinition::builder("Event")
            .field("updatedAt", FieldType::String)
            .build()
            .unwrap();

        let err = connector.define(definition).err().unwrap();
        assert!(matches!(
            err,
            ConnectorError::Validation(ref msg) if msg.contains("updatedAt")
        ));
        assert!(connector.models().is_empty());
    }

    #[test]
    fn test_define_accepts_declared_date_timestamp_field() {
        let connector = connector(paging_store());
        let definition = ModelDefinition::builder("Event")
            .field("updatedAt", FieldType::Date)
            .build()
            .unwrap();
        assert!(connector.define(definition).is_ok());
    }

    #[test]
    fn test_define_twice_is_a_validation_error() {
        let connector = connector(paging_store());
        connector.define(definition("Country")).unwrap();
        let err = connector.define(definition("Country")).err().unwrap();
        assert!(matches!(err, ConnectorError::Validation(_)));
    }

    #[test]
    fn test_lookup_of_unknown_model() {
        let connector = connector(paging_store());
        let err = connector.model("Nope").err().unwrap();
        assert!(matches!(err, ConnectorError::UnknownModel(ref name) if name == "Nope"));
    }

    #[tokio::test]
    async fn test_instance_of_other_model_is_rejected() {
        let mut store = paging_store();
        store.expect_insert().never();
        let connector = connector(store);
        let countries = connector.define(definition("Country")).unwrap();

        let err = countries
            .create(ModelInstance::new("Student"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_through_handle_returns_identity() {
        let mut store = paging_store();
        store.expect_insert().times(1).returning(|_, _| Ok(Cas(1)));
        let connector = connector(store);
        let countries = connector.define(definition("Country")).unwrap();

        let created = countries
            .create(countries.new_instance().with("name", "Japan"))
            .await
            .unwrap();

        assert!(!created.id().unwrap().is_empty());
        assert_eq!(created.get("name"), Some(&FieldValue::from("Japan")));
        assert!(created.date("updatedAt").is_some());
        // Undeclared identifier stays out of the field map by default
        assert!(created.get("id").is_none());
    }

    #[tokio::test]
    async fn test_disconnect_closes_once() {
        let mut store = paging_store();
        store.expect_close().times(1).returning(|| Ok(()));
        let connector = connector(store);
        let countries = connector.define(definition("Country")).unwrap();

        connector.disconnect().await.unwrap();
        connector.disconnect().await.unwrap();

        let err = countries.find_all().await.unwrap_err();
        assert!(matches!(err, ConnectorError::Disconnected));
    }

    #[tokio::test]
    async fn test_close_failure_is_reported() {
        let mut store = paging_store();
        store
            .expect_close()
            .returning(|| Err(StoreError::Storage("socket gone".into())));
        let connector = connector(store);

        let err = connector.disconnect().await.unwrap_err();
        assert!(matches!(err, ConnectorError::Store(StoreError::Storage(_))));
    }
}
