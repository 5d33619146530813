//! Model-level query descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::instance::FieldValue;

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Membership in an array value.
    In,
    /// SQL-style pattern with `%` and `_` wildcards.
    Like,
}

impl Operator {
    /// N1QL spelling of the operator.
    pub const fn as_n1ql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::In => "IN",
            Self::Like => "LIKE",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_n1ql())
    }
}

/// A single `field <op> value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: FieldValue,
}

/// What to fetch: conjunctive predicates plus paging and projection.
///
/// An empty predicate list matches every document of the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    pub predicates: Vec<Predicate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Fields to return; `None` returns whole documents.
    pub fields: Option<Vec<String>>,
}

impl QueryDescriptor {
    /// Match everything.
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(
        mut self,
        field: impl Into<String>,
        op: Operator,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.predicates.push(Predicate {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Shorthand for an equality predicate.
    #[must_use]
    pub fn where_eq(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filter(field, Operator::Eq, value)
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Same predicates, no paging and no projection.
    #[must_use]
    pub fn unbounded(&self) -> Self {
        Self {
            predicates: self.predicates.clone(),
            ..Self::default()
        }
    }
}
