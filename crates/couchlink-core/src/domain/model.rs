//! Model definitions.
//!
//! A [`ModelDefinition`] is the schema the connector encodes documents
//! against: an ordered list of typed fields, at most one identifier field,
//! and the `force_id` flag. Definitions are immutable once built and are
//! shared behind an `Arc` after registration.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::KEY_SEPARATOR;

/// Semantic type of a model field, used for coercion by the document codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    /// Nested objects and arrays, stored as-is.
    Composite,
}

impl FieldType {
    /// Lowercase name used in error messages and serialized definitions.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Composite => "composite",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name as it appears in instances and documents.
    pub name: String,
    /// Semantic type driving coercion.
    pub field_type: FieldType,
    /// Optional maximum length. Informational only; validation is the
    /// model layer's job.
    pub length: Option<usize>,
    /// Whether the model layer considers the field mandatory.
    pub required: bool,
    /// Whether this field carries the model's identifier.
    pub is_id: bool,
}

impl FieldDescriptor {
    /// Create a plain, optional field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            length: None,
            required: false,
            is_id: false,
        }
    }

    /// Attach a length constraint.
    #[must_use]
    pub const fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Mark the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as the model's identifier.
    #[must_use]
    pub const fn as_id(mut self) -> Self {
        self.is_id = true;
        self
    }
}

/// Errors raised while building a [`ModelDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Model name cannot be empty")]
    EmptyName,

    #[error("Model name '{0}' must not contain the key separator '::'")]
    ReservedSeparator(String),

    #[error("Model '{model}' declares field '{field}' more than once")]
    DuplicateField { model: String, field: String },

    #[error("Model '{model}' declares more than one identifier field ('{first}', '{second}')")]
    MultipleIdFields {
        model: String,
        first: String,
        second: String,
    },

    #[error("Model '{0}' declares a field with an empty name")]
    EmptyFieldName(String),
}

/// Immutable schema of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    name: String,
    fields: Vec<FieldDescriptor>,
    force_id: bool,
}

impl ModelDefinition {
    /// Start building a definition for the model called `name`.
    pub fn builder(name: impl Into<String>) -> ModelDefinitionBuilder {
        ModelDefinitionBuilder {
            name: name.into(),
            fields: Vec::new(),
            force_id: false,
        }
    }

    /// Model name; also the document key namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The identifier field, if the model declares one.
    pub fn id_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_id)
    }

    /// Name of the identifier field, if declared.
    pub fn id_field_name(&self) -> Option<&str> {
        self.id_field().map(|f| f.name.as_str())
    }

    /// Whether an identifier must be supplied at create time.
    pub const fn force_id(&self) -> bool {
        self.force_id
    }

    /// Return a copy with `name` declared as `field_type` unless the model
    /// already declares a field of that name.
    #[must_use]
    pub fn with_implicit_field(&self, name: &str, field_type: FieldType) -> Self {
        let mut definition = self.clone();
        if definition.field(name).is_none() {
            definition.fields.push(FieldDescriptor::new(name, field_type));
        }
        definition
    }
}

/// Builder for [`ModelDefinition`].
#[derive(Debug, Clone)]
pub struct ModelDefinitionBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    force_id: bool,
}

impl ModelDefinitionBuilder {
    /// Declare an optional field.
    #[must_use]
    pub fn field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.descriptor(FieldDescriptor::new(name, field_type))
    }

    /// Declare the identifier field.
    #[must_use]
    pub fn id_field(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.descriptor(FieldDescriptor::new(name, field_type).as_id())
    }

    /// Declare a fully specified field.
    #[must_use]
    pub fn descriptor(mut self, descriptor: FieldDescriptor) -> Self {
        self.fields.push(descriptor);
        self
    }

    /// Require callers to supply an identifier on create.
    #[must_use]
    pub const fn force_id(mut self, force_id: bool) -> Self {
        self.force_id = force_id;
        self
    }

    /// Validate and freeze the definition.
    pub fn build(self) -> Result<ModelDefinition, DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        if self.name.contains(KEY_SEPARATOR) {
            return Err(DefinitionError::ReservedSeparator(self.name));
        }

        let mut id_field: Option<&str> = None;
        for (index, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(DefinitionError::EmptyFieldName(self.name.clone()));
            }
            if self.fields[..index].iter().any(|f| f.name == field.name) {
                return Err(DefinitionError::DuplicateField {
                    model: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            if field.is_id {
                if let Some(first) = id_field {
                    return Err(DefinitionError::MultipleIdFields {
                        model: self.name.clone(),
                        first: first.to_string(),
                        second: field.name.clone(),
                    });
                }
                id_field = Some(&field.name);
            }
        }

        Ok(ModelDefinition {
            name: self.name,
            fields: self.fields,
            force_id: self.force_id,
        })
    }
}
