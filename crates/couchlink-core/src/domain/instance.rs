//! Model instances and their field values.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use super::document::Cas;

/// Insertion-ordered mapping from field name to value.
pub type FieldMap = IndexMap<String, FieldValue>;

/// A typed field value as seen by the model layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(DateTime<Utc>),
    /// Objects, arrays, or any value the model layer treats opaquely.
    Composite(Value),
}

impl FieldValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view of integer and float values.
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(d) => Some(d),
            _ => None,
        }
    }

    /// Short name of the runtime type, for error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Composite(_) => "composite",
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Structural conversion: scalars map to their typed variant, objects and
/// arrays become [`FieldValue::Composite`]. Strings are never parsed as dates
/// here; that is the codec's job once the declared type is known.
impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(int), _) => Self::Integer(int),
                (None, Some(float)) => Self::Float(float),
                (None, None) => Self::Composite(Value::Number(n)),
            },
            Value::String(s) => Self::String(s),
            other @ (Value::Array(_) | Value::Object(_)) => Self::Composite(other),
        }
    }
}

/// Build a [`FieldMap`] from a JSON object, e.g. fixture data.
///
/// Non-object values yield an empty map.
pub fn field_map_from_json(value: Value) -> FieldMap {
    match value {
        Value::Object(object) => object
            .into_iter()
            .map(|(name, value)| (name, FieldValue::from(value)))
            .collect(),
        _ => FieldMap::new(),
    }
}

/// A model instance: field values plus the identity the store addresses it by.
///
/// The identifier lives beside the field map so callers can always observe
/// it, whether or not the model exposes it as a field.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    model: String,
    id: Option<String>,
    fields: FieldMap,
    cas: Option<Cas>,
}

impl ModelInstance {
    /// An empty, unsaved instance of `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_fields(model, FieldMap::new())
    }

    /// An unsaved instance carrying `fields`.
    pub fn from_fields(model: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            model: model.into(),
            id: None,
            fields,
            cas: None,
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Builder-style identifier setter.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The identifier, once assigned.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.shift_remove(name)
    }

    pub const fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub const fn fields_mut(&mut self) -> &mut FieldMap {
        &mut self.fields
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    /// Version token of the document this instance was last written as or read from.
    pub const fn cas(&self) -> Option<Cas> {
        self.cas
    }

    pub fn set_cas(&mut self, cas: Option<Cas>) {
        self.cas = cas;
    }

    /// Date value of `field`, if present and date-typed.
    pub fn date(&self, field: &str) -> Option<&DateTime<Utc>> {
        self.fields.get(field).and_then(FieldValue::as_date)
    }
}
