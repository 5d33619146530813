//! Identifier resolution.
//!
//! Decides, per write, whether the caller supplied an identifier or one has
//! to be generated, and where the identifier shows up in the instance.

use uuid::Uuid;

use crate::domain::{FieldMap, FieldType, FieldValue, ModelDefinition, ModelInstance};
use crate::ports::ConnectorError;
use crate::settings::IdExposure;

/// How a write treats a missing identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Strict create; honours `force_id`.
    Create,
    /// Create-or-replace; always free to generate.
    Upsert,
}

/// Where the effective identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSource {
    Supplied,
    Generated,
}

/// The effective identifier of a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedId {
    pub value: String,
    pub source: IdSource,
}

/// Generate a fresh identifier.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Identifier policy for one connector.
#[derive(Debug, Clone)]
pub struct IdResolver {
    exposure: IdExposure,
    default_id_field: String,
}

impl IdResolver {
    pub fn new(exposure: IdExposure, default_id_field: impl Into<String>) -> Self {
        Self {
            exposure,
            default_id_field: default_id_field.into(),
        }
    }

    /// Field name the identifier is written under, if it is exposed at all.
    pub fn exposed_field<'a>(&'a self, definition: &'a ModelDefinition) -> Option<&'a str> {
        match (definition.id_field_name(), self.exposure) {
            (Some(declared), _) => Some(declared),
            (None, IdExposure::Always) => Some(self.default_id_field.as_str()),
            (None, IdExposure::DeclaredOnly) => None,
        }
    }

    /// Field a caller-supplied identifier is read from.
    ///
    /// The declared id field, else `default_id_field` whatever the exposure,
    /// so a model without an id field still honours an `id` value.
    pub fn lookup_field<'a>(&'a self, definition: &'a ModelDefinition) -> &'a str {
        definition
            .id_field_name()
            .unwrap_or(self.default_id_field.as_str())
    }

    /// The identifier the caller supplied, if any.
    ///
    /// Checks the instance identity first, then the lookup field. Empty
    /// strings and nulls count as "not supplied".
    pub fn supplied(
        &self,
        definition: &ModelDefinition,
        instance: &ModelInstance,
    ) -> Result<Option<String>, ConnectorError> {
        if let Some(id) = instance.id().filter(|id| !id.is_empty()) {
            return Ok(Some(id.to_string()));
        }

        let field = self.lookup_field(definition);
        match instance.get(field) {
            None | Some(FieldValue::Null) => Ok(None),
            Some(FieldValue::String(s)) if s.is_empty() => Ok(None),
            Some(FieldValue::String(s)) => Ok(Some(s.clone())),
            Some(FieldValue::Integer(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(ConnectorError::encoding(
                field,
                format!("identifier must be a string or integer, got {}", other.type_name()),
            )),
        }
    }

    /// Decide the effective identifier of a write.
    pub fn resolve(
        &self,
        definition: &ModelDefinition,
        supplied: Option<String>,
        mode: WriteMode,
    ) -> Result<ResolvedId, ConnectorError> {
        match supplied {
            Some(value) => Ok(ResolvedId {
                value,
                source: IdSource::Supplied,
            }),
            None if mode == WriteMode::Create && definition.force_id() => {
                Err(ConnectorError::Validation(format!(
                    "model '{}' requires an identifier on create",
                    definition.name()
                )))
            }
            None => Ok(ResolvedId {
                value: generate_id(),
                source: IdSource::Generated,
            }),
        }
    }

    /// Write `id` into `fields` under the exposed id field, typed after the
    /// field's declaration.
    pub fn attach(&self, definition: &ModelDefinition, fields: &mut FieldMap, id: &str) {
        let Some(field) = self.exposed_field(definition) else {
            return;
        };

        let numeric = definition
            .field(field)
            .is_some_and(|f| f.field_type == FieldType::Number);
        let value = match id.parse::<i64>() {
            Ok(n) if numeric => FieldValue::Integer(n),
            _ => FieldValue::String(id.to_string()),
        };
        fields.insert(field.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_id() -> ModelDefinition {
        ModelDefinition::builder("CountryWithId")
            .id_field("id", FieldType::String)
            .field("name", FieldType::String)
            .build()
            .unwrap()
    }

    fn without_id() -> ModelDefinition {
        ModelDefinition::builder("Country")
            .field("name", FieldType::String)
            .build()
            .unwrap()
    }

    fn resolver() -> IdResolver {
        IdResolver::new(IdExposure::DeclaredOnly, "id")
    }

    #[test]
    fn test_supplied_value_is_used_verbatim() {
        let def = with_id();
        let instance = ModelInstance::new("CountryWithId").with("id", "fixed-id");

        let supplied = resolver().supplied(&def, &instance).unwrap();
        let resolved = resolver()
            .resolve(&def, supplied, WriteMode::Create)
            .unwrap();

        assert_eq!(resolved.value, "fixed-id");
        assert_eq!(resolved.source, IdSource::Supplied);
    }

    #[test]
    fn test_empty_value_triggers_generation() {
        let def = with_id();
        let instance = ModelInstance::new("CountryWithId").with("id", "");

        let supplied = resolver().supplied(&def, &instance).unwrap();
        assert_eq!(supplied, None);

        let resolved = resolver()
            .resolve(&def, supplied, WriteMode::Create)
            .unwrap();
        assert_eq!(resolved.source, IdSource::Generated);
        assert!(!resolved.value.is_empty());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn test_force_id_requires_identifier_on_create_only() {
        let def = ModelDefinition::builder("Strict")
            .id_field("code", FieldType::String)
            .force_id(true)
            .build()
            .unwrap();

        let err = resolver()
            .resolve(&def, None, WriteMode::Create)
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Validation(_)));

        let resolved = resolver().resolve(&def, None, WriteMode::Upsert).unwrap();
        assert_eq!(resolved.source, IdSource::Generated);
    }

    #[test]
    fn test_undeclared_id_is_not_exposed_by_default() {
        let def = without_id();
        let mut fields = FieldMap::new();
        resolver().attach(&def, &mut fields, "abc");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_undeclared_id_is_exposed_when_always() {
        let def = without_id();
        let mut fields = FieldMap::new();
        IdResolver::new(IdExposure::Always, "id").attach(&def, &mut fields, "abc");
        assert_eq!(fields.get("id"), Some(&FieldValue::from("abc")));
    }

    #[test]
    fn test_instance_identity_wins_over_field() {
        let def = with_id();
        let instance = ModelInstance::new("CountryWithId")
            .with("id", "from-field")
            .with_id("from-identity");
        let supplied = resolver().supplied(&def, &instance).unwrap();
        assert_eq!(supplied.as_deref(), Some("from-identity"));
    }

    #[test]
    fn test_numeric_identifier_fields() {
        let def = ModelDefinition::builder("Invoice")
            .id_field("number", FieldType::Number)
            .build()
            .unwrap();
        let instance = ModelInstance::new("Invoice").with("number", 1042_i64);
        let supplied = resolver().supplied(&def, &instance).unwrap();
        assert_eq!(supplied.as_deref(), Some("1042"));

        let mut fields = FieldMap::new();
        resolver().attach(&def, &mut fields, "1042");
        assert_eq!(fields.get("number"), Some(&FieldValue::Integer(1042)));
    }

    #[test]
    fn test_composite_identifier_is_rejected() {
        let def = with_id();
        let instance = ModelInstance::new("CountryWithId").with("id", true);
        let err = resolver().supplied(&def, &instance).unwrap_err();
        assert!(matches!(err, ConnectorError::Encoding { .. }));
    }

    #[test]
    fn test_default_id_field_is_read_without_declaration() {
        let def = without_id();
        let instance = ModelInstance::new("Country").with("id", "us");

        assert_eq!(resolver().exposed_field(&def), None);
        assert_eq!(resolver().lookup_field(&def), "id");
        let supplied = resolver().supplied(&def, &instance).unwrap();
        assert_eq!(supplied.as_deref(), Some("us"));
    }

    #[test]
    fn test_declared_id_field_shadows_default() {
        let def = ModelDefinition::builder("Invoice")
            .id_field("number", FieldType::Number)
            .build()
            .unwrap();
        let instance = ModelInstance::new("Invoice").with("id", "ignored");

        assert_eq!(resolver().lookup_field(&def), "number");
        assert_eq!(resolver().supplied(&def, &instance).unwrap(), None);
    }
}
