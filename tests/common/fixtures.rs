//! Test fixtures: model definitions and country data.

#![allow(dead_code)]

use couchlink::{
    DefinitionError, FieldDescriptor, FieldMap, FieldType, FieldValue, ModelDefinition,
    ModelHandle, ModelInstance,
};

/// One row of example country data.
pub struct CountryData {
    pub name: &'static str,
    pub country_code: &'static str,
    pub gdp: i64,
    pub population: i64,
}

pub const COUNTRIES: [CountryData; 3] = [
    CountryData {
        name: "United States of America",
        country_code: "US",
        gdp: 21_433_226,
        population: 329_064_917,
    },
    CountryData {
        name: "Germany",
        country_code: "DE",
        gdp: 3_861_124,
        population: 83_517_045,
    },
    CountryData {
        name: "Japan",
        country_code: "JP",
        gdp: 5_081_770,
        population: 126_860_301,
    },
];

fn country_fields(
    builder: couchlink::core::ModelDefinitionBuilder,
) -> couchlink::core::ModelDefinitionBuilder {
    builder
        .field("gdp", FieldType::Number)
        .field("countryCode", FieldType::String)
        .field("name", FieldType::String)
        .field("population", FieldType::Number)
        .field("updatedAt", FieldType::Date)
}

/// Country model without an identifier field.
pub fn country_model() -> Result<ModelDefinition, DefinitionError> {
    country_fields(ModelDefinition::builder("CountryModel"))
        .force_id(false)
        .build()
}

/// Country model with a declared string identifier.
pub fn country_model_with_id() -> Result<ModelDefinition, DefinitionError> {
    country_fields(
        ModelDefinition::builder("CountryModelWithId").id_field("id", FieldType::String),
    )
    .build()
}

/// Student model sharing the bucket with the countries.
pub fn student_model() -> Result<ModelDefinition, DefinitionError> {
    ModelDefinition::builder("StudentModel")
        .descriptor(FieldDescriptor::new("name", FieldType::String).with_length(255))
        .field("age", FieldType::Number)
        .force_id(false)
        .build()
}

/// Fields of `COUNTRIES[index]`.
pub fn country_fields_at(index: usize) -> FieldMap {
    let data = &COUNTRIES[index];
    let mut fields = FieldMap::new();
    fields.insert("gdp".into(), FieldValue::from(data.gdp));
    fields.insert("countryCode".into(), FieldValue::from(data.country_code));
    fields.insert("name".into(), FieldValue::from(data.name));
    fields.insert("population".into(), FieldValue::from(data.population));
    fields
}

/// Unsaved instance of `model` carrying `COUNTRIES[index]`.
pub fn country(model: &ModelHandle, index: usize) -> ModelInstance {
    ModelInstance::from_fields(model.name(), country_fields_at(index))
}

/// Build a partial field map from pairs.
pub fn partial<const N: usize>(pairs: [(&str, FieldValue); N]) -> FieldMap {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Assert the shape every returned country must have.
pub fn verify_country_rows(instance: &ModelInstance) {
    let id = instance.id().expect("identifier is always populated");
    assert!(!id.is_empty());

    assert!(matches!(
        instance.get("gdp"),
        Some(FieldValue::Integer(_) | FieldValue::Float(_))
    ));
    assert!(matches!(instance.get("countryCode"), Some(FieldValue::String(_))));
    assert!(matches!(instance.get("name"), Some(FieldValue::String(_))));
    assert!(matches!(
        instance.get("population"),
        Some(FieldValue::Integer(_) | FieldValue::Float(_))
    ));
    assert!(instance.date("updatedAt").is_some());
}
