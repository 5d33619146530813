//! Document codec: field maps to JSON payloads and back.
//!
//! Coercion is driven by the declared [`FieldType`] of each field. Fields the
//! definition does not know are carried through structurally so documents
//! written by newer schemas survive a round trip.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

use crate::domain::{FieldDescriptor, FieldMap, FieldType, FieldValue, ModelDefinition, Payload};
use crate::ports::ConnectorError;

/// Canonical timestamp text stored for date fields.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back into a date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Encode every field of `fields` into a store payload.
pub fn encode(definition: &ModelDefinition, fields: &FieldMap) -> Result<Payload, ConnectorError> {
    let mut payload = Payload::new();
    encode_into(definition, &mut payload, fields)?;
    Ok(payload)
}

/// Encode `fields` over an existing payload.
///
/// Entries of `payload` not named in `fields` are left as stored. Nothing is
/// written unless every field encodes.
pub fn encode_into(
    definition: &ModelDefinition,
    payload: &mut Payload,
    fields: &FieldMap,
) -> Result<(), ConnectorError> {
    let encoded = fields
        .iter()
        .map(|(name, value)| {
            let json = match definition.field(name) {
                Some(descriptor) => encode_value(descriptor, value)?,
                None => encode_opaque(name, value)?,
            };
            Ok((name.clone(), json))
        })
        .collect::<Result<Vec<_>, ConnectorError>>()?;
    payload.extend(encoded);
    Ok(())
}

/// Decode a store payload into a field map.
///
/// Never fails: a stored value that no longer matches its declared type is
/// kept in its structural form.
pub fn decode(definition: &ModelDefinition, payload: &Payload) -> FieldMap {
    payload
        .iter()
        .map(|(name, value)| {
            let decoded = match definition.field(name) {
                Some(descriptor) => decode_value(descriptor, value),
                None => FieldValue::from(value.clone()),
            };
            (name.clone(), decoded)
        })
        .collect()
}

/// Encode one value according to its field declaration.
pub fn encode_value(
    descriptor: &FieldDescriptor,
    value: &FieldValue,
) -> Result<Value, ConnectorError> {
    let field = descriptor.name.as_str();
    if value.is_null() {
        return Ok(Value::Null);
    }

    match descriptor.field_type {
        FieldType::Number => encode_number(field, value),
        FieldType::Date => encode_date(field, value),
        FieldType::String => match value {
            FieldValue::String(s) => Ok(Value::String(s.clone())),
            FieldValue::Integer(n) => Ok(Value::String(n.to_string())),
            FieldValue::Float(n) => Ok(Value::String(n.to_string())),
            FieldValue::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(mismatch(field, FieldType::String, other)),
        },
        FieldType::Boolean => match value {
            FieldValue::Bool(b) => Ok(Value::Bool(*b)),
            other => Err(mismatch(field, FieldType::Boolean, other)),
        },
        FieldType::Composite => encode_opaque(field, value),
    }
}

/// Structural encoding used for undeclared fields and composites.
///
/// JSON has no representation for NaN or infinities, so those are rejected.
pub fn encode_opaque(field: &str, value: &FieldValue) -> Result<Value, ConnectorError> {
    Ok(match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Integer(n) => Value::Number((*n).into()),
        FieldValue::Float(n) => Value::Number(finite(field, *n)?),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::Date(d) => Value::String(format_timestamp(d)),
        FieldValue::Composite(v) => v.clone(),
    })
}

fn finite(field: &str, n: f64) -> Result<Number, ConnectorError> {
    Number::from_f64(n)
        .ok_or_else(|| ConnectorError::encoding(field, format!("{n} is not a finite number")))
}

/// Decode one stored value according to its field declaration.
pub fn decode_value(descriptor: &FieldDescriptor, value: &Value) -> FieldValue {
    match (descriptor.field_type, value) {
        (_, Value::Null) => FieldValue::Null,
        (FieldType::Date, Value::String(raw)) => parse_timestamp(raw).map_or_else(
            || {
                tracing::warn!(
                    field = %descriptor.name,
                    value = %raw,
                    "Stored date field is not a timestamp; keeping raw string"
                );
                FieldValue::String(raw.clone())
            },
            FieldValue::Date,
        ),
        (FieldType::Date, Value::Number(n)) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map_or_else(|| FieldValue::from(value.clone()), FieldValue::Date),
        (FieldType::Composite, other) => FieldValue::Composite(other.clone()),
        (_, other) => FieldValue::from(other.clone()),
    }
}

fn encode_number(field: &str, value: &FieldValue) -> Result<Value, ConnectorError> {
    match value {
        FieldValue::Integer(n) => Ok(Value::Number((*n).into())),
        FieldValue::Float(n) => finite(field, *n).map(Value::Number),
        FieldValue::String(raw) => {
            let trimmed = raw.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Value::Number(n.into()));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| {
                    ConnectorError::encoding(field, format!("'{raw}' is not numeric"))
                })
        }
        other => Err(mismatch(field, FieldType::Number, other)),
    }
}

fn encode_date(field: &str, value: &FieldValue) -> Result<Value, ConnectorError> {
    match value {
        FieldValue::Date(d) => Ok(Value::String(format_timestamp(d))),
        FieldValue::String(raw) => parse_timestamp(raw)
            .map(|d| Value::String(format_timestamp(&d)))
            .ok_or_else(|| {
                ConnectorError::encoding(field, format!("'{raw}' is not an RFC 3339 timestamp"))
            }),
        FieldValue::Integer(millis) => DateTime::from_timestamp_millis(*millis)
            .map(|d| Value::String(format_timestamp(&d)))
            .ok_or_else(|| {
                ConnectorError::encoding(field, format!("{millis} ms is out of range"))
            }),
        other => Err(mismatch(field, FieldType::Date, other)),
    }
}

fn mismatch(field: &str, expected: FieldType, actual: &FieldValue) -> ConnectorError {
    ConnectorError::encoding(
        field,
        format!("expected {expected}, got {}", actual.type_name()),
    )
}
