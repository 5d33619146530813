//! Query translation.
//!
//! Turns a model-level [`QueryDescriptor`] into a [`StoreQuery`]: a N1QL-style
//! statement with positional parameters plus the structured form an adapter
//! can execute directly. Every query is confined to the model's key
//! namespace, so several models can share one bucket.

use serde_json::Value;

use crate::codec;
use crate::domain::{FieldValue, ModelDefinition, Operator, QueryDescriptor, StoreDocument};
use crate::keys;
use crate::ports::ConnectorError;

/// Column alias carrying the document key in statement results.
pub const KEY_COLUMN: &str = "__key";

/// Structured condition on an encoded document field.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreFilter {
    pub field: String,
    pub op: Operator,
    /// Already encoded with the field's coercion rules.
    pub value: Value,
}

/// A translated query, ready for a [`crate::ports::DocumentStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub bucket: String,
    /// Key prefix every result must carry (`{model}::`).
    pub namespace: String,
    /// N1QL text with `$1`, `$2`, ... placeholders.
    pub statement: String,
    /// Positional parameters; `$1` is always the namespace pattern.
    pub parameters: Vec<Value>,
    pub filters: Vec<StoreFilter>,
    /// Only set when the store pages natively.
    pub limit: Option<usize>,
    /// Only set when the store pages natively.
    pub offset: Option<usize>,
    /// Projected fields; `None` selects whole documents.
    pub projection: Option<Vec<String>>,
}

/// A store query plus the paging the connector still has to apply itself.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub query: StoreQuery,
    client_limit: Option<usize>,
    client_offset: Option<usize>,
}

impl QueryPlan {
    /// Apply client-side paging, keeping result order.
    pub fn bound(&self, rows: Vec<StoreDocument>) -> Vec<StoreDocument> {
        let offset = self.client_offset.unwrap_or(0);
        let limit = self.client_limit.unwrap_or(usize::MAX);
        if offset == 0 && limit == usize::MAX {
            return rows;
        }
        rows.into_iter().skip(offset).take(limit).collect()
    }

    /// Whether paging happens in the connector rather than the store.
    pub const fn pages_client_side(&self) -> bool {
        self.client_limit.is_some() || self.client_offset.is_some()
    }
}

/// Translates descriptors for one bucket.
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    bucket: String,
}

impl QueryTranslator {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Translate `descriptor` for `definition`.
    ///
    /// `native_paging` says whether the target store executes `LIMIT` and
    /// `OFFSET`; when it does not, they are left out of the statement and
    /// applied by [`QueryPlan::bound`].
    pub fn translate(
        &self,
        definition: &ModelDefinition,
        descriptor: &QueryDescriptor,
        native_paging: bool,
    ) -> Result<QueryPlan, ConnectorError> {
        let namespace = keys::namespace(definition.name());
        let mut parameters = vec![Value::String(format!("{}%", escape_like(&namespace)))];
        let mut conditions = vec!["META(d).id LIKE $1".to_string()];
        let mut filters = Vec::with_capacity(descriptor.predicates.len());

        for predicate in &descriptor.predicates {
            let value =
                encode_operand(definition, &predicate.field, predicate.op, &predicate.value)?;
            parameters.push(value.clone());
            conditions.push(format!(
                "d.{} {} ${}",
                quote_identifier(&predicate.field),
                predicate.op.as_n1ql(),
                parameters.len()
            ));
            filters.push(StoreFilter {
                field: predicate.field.clone(),
                op: predicate.op,
                value,
            });
        }

        let columns = descriptor.fields.as_ref().map_or_else(
            || "d.*".to_string(),
            |fields| {
                fields
                    .iter()
                    .map(|f| format!("d.{}", quote_identifier(f)))
                    .collect::<Vec<_>>()
                    .join(", ")
            },
        );
        let select = if columns.is_empty() {
            format!("META(d).id AS `{KEY_COLUMN}`")
        } else {
            format!("META(d).id AS `{KEY_COLUMN}`, {columns}")
        };

        let mut statement = format!(
            "SELECT {select} FROM {} d WHERE {}",
            quote_identifier(&self.bucket),
            conditions.join(" AND ")
        );

        let (limit, offset, client_limit, client_offset) = if native_paging {
            (descriptor.limit, descriptor.offset, None, None)
        } else {
            (None, None, descriptor.limit, descriptor.offset)
        };
        if let Some(limit) = limit {
            statement.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            statement.push_str(&format!(" OFFSET {offset}"));
        }

        Ok(QueryPlan {
            query: StoreQuery {
                bucket: self.bucket.clone(),
                namespace,
                statement,
                parameters,
                filters,
                limit,
                offset,
                projection: descriptor.fields.clone(),
            },
            client_limit,
            client_offset,
        })
    }
}

/// Encode a predicate operand with the field's coercion rules. Undeclared
/// fields and `LIKE` patterns pass through structurally.
fn encode_operand(
    definition: &ModelDefinition,
    field: &str,
    op: Operator,
    value: &FieldValue,
) -> Result<Value, ConnectorError> {
    let descriptor = definition.field(field);
    match (op, descriptor) {
        (Operator::In, _) => {
            let FieldValue::Composite(Value::Array(items)) = value else {
                return Err(ConnectorError::encoding(
                    field,
                    format!("IN expects an array, got {}", value.type_name()),
                ));
            };
            items
                .iter()
                .map(|item| {
                    let item = FieldValue::from(item.clone());
                    descriptor.map_or_else(
                        || codec::encode_opaque(field, &item),
                        |d| codec::encode_value(d, &item),
                    )
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        (Operator::Like, _) | (_, None) => codec::encode_opaque(field, value),
        (_, Some(descriptor)) => codec::encode_value(descriptor, value),
    }
}

/// Backtick-quote an identifier, doubling embedded backticks.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Escape `LIKE` wildcards so a namespace matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldType, Payload};
    use crate::keys::build_key;
    use serde_json::json;

    fn country() -> ModelDefinition {
        ModelDefinition::builder("CountryModel")
            .field("gdp", FieldType::Number)
            .field("name", FieldType::String)
            .field("updatedAt", FieldType::Date)
            .build()
            .unwrap()
    }

    fn translator() -> QueryTranslator {
        QueryTranslator::new("default")
    }

    #[test]
    fn test_no_predicate_matches_namespace_only() {
        let plan = translator()
            .translate(&country(), &QueryDescriptor::all(), true)
            .unwrap();

        assert_eq!(
            plan.query.statement,
            "SELECT META(d).id AS `__key`, d.* FROM `default` d WHERE META(d).id LIKE $1"
        );
        assert_eq!(plan.query.parameters, vec![json!("CountryModel::%")]);
        assert_eq!(plan.query.namespace, "CountryModel::");
        assert!(plan.query.filters.is_empty());
    }

    #[test]
    fn test_predicates_become_parameters() {
        let descriptor = QueryDescriptor::all()
            .filter("gdp", Operator::Gt, 1000)
            .where_eq("name", "Japan");
        let plan = translator().translate(&country(), &descriptor, true).unwrap();

        assert!(plan
            .query
            .statement
            .ends_with("WHERE META(d).id LIKE $1 AND d.`gdp` > $2 AND d.`name` = $3"));
        assert_eq!(plan.query.parameters[1], json!(1000));
        assert_eq!(plan.query.parameters[2], json!("Japan"));
        assert_eq!(plan.query.filters.len(), 2);
    }

    #[test]
    fn test_declared_fields_are_coerced() {
        let descriptor = QueryDescriptor::all()
            .filter("gdp", Operator::Gte, "500")
            .filter("updatedAt", Operator::Lt, 0_i64);
        let plan = translator().translate(&country(), &descriptor, true).unwrap();

        assert_eq!(plan.query.filters[0].value, json!(500));
        assert_eq!(plan.query.filters[1].value, json!("1970-01-01T00:00:00.000Z"));
    }

    #[test]
    fn test_undeclared_fields_pass_through() {
        let descriptor = QueryDescriptor::all().where_eq("continent", "Asia");
        let plan = translator().translate(&country(), &descriptor, true).unwrap();
        assert_eq!(plan.query.filters[0].value, json!("Asia"));
    }

    #[test]
    fn test_non_finite_operand_on_undeclared_field_is_rejected() {
        let descriptor = QueryDescriptor::all().filter("ratio", Operator::Gt, f64::NAN);
        let err = translator()
            .translate(&country(), &descriptor, true)
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Encoding { ref field, .. } if field == "ratio"));
    }

    #[test]
    fn test_in_requires_array() {
        let descriptor = QueryDescriptor::all().filter("name", Operator::In, "Japan");
        let err = translator()
            .translate(&country(), &descriptor, true)
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Encoding { .. }));

        let descriptor = QueryDescriptor::all().filter(
            "gdp",
            Operator::In,
            FieldValue::Composite(json!(["1", 2])),
        );
        let plan = translator().translate(&country(), &descriptor, true).unwrap();
        assert_eq!(plan.query.filters[0].value, json!([1, 2]));
    }

    #[test]
    fn test_native_paging_is_forwarded() {
        let descriptor = QueryDescriptor::all().limit(1).offset(1);
        let plan = translator().translate(&country(), &descriptor, true).unwrap();

        assert!(plan.query.statement.ends_with(" LIMIT 1 OFFSET 1"));
        assert_eq!(plan.query.limit, Some(1));
        assert!(!plan.pages_client_side());
    }

    #[test]
    fn test_client_side_paging_when_store_cannot_page() {
        let descriptor = QueryDescriptor::all().limit(2).offset(1);
        let plan = translator().translate(&country(), &descriptor, false).unwrap();

        assert!(!plan.query.statement.contains("LIMIT"));
        assert_eq!(plan.query.limit, None);
        assert!(plan.pages_client_side());

        let rows: Vec<StoreDocument> = (0..4)
            .map(|i| {
                StoreDocument::new(
                    build_key("CountryModel", &i.to_string()).unwrap(),
                    Payload::new(),
                    None,
                )
            })
            .collect();
        let bounded = plan.bound(rows);
        let ids: Vec<&str> = bounded.iter().map(|d| d.key.as_str()).collect();
        assert_eq!(ids, vec!["CountryModel::1", "CountryModel::2"]);
    }

    #[test]
    fn test_projection_selects_columns() {
        let descriptor = QueryDescriptor::all().fields(["name", "gdp"]);
        let plan = translator().translate(&country(), &descriptor, true).unwrap();
        assert!(plan
            .query
            .statement
            .starts_with("SELECT META(d).id AS `__key`, d.`name`, d.`gdp` FROM"));
        assert_eq!(
            plan.query.projection,
            Some(vec!["name".to_string(), "gdp".to_string()])
        );
    }

    #[test]
    fn test_namespace_wildcards_are_escaped() {
        let def = ModelDefinition::builder("country_model").build().unwrap();
        let plan = translator()
            .translate(&def, &QueryDescriptor::all(), true)
            .unwrap();
        assert_eq!(plan.query.parameters[0], json!("country\\_model::%"));
    }

    #[test]
    fn test_identifiers_are_quoted() {
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }
}
