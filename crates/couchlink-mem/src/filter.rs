//! Predicate evaluation over stored JSON payloads.
//!
//! Mirrors N1QL comparison rules closely enough for the connector: a field
//! that is missing or null never satisfies a predicate, and values of
//! different JSON types never compare.

use std::cmp::Ordering;

use serde_json::Value;

use couchlink_core::{Operator, Payload, StoreFilter};

/// Whether `document` satisfies every filter.
pub fn matches_all(document: &Payload, filters: &[StoreFilter]) -> bool {
    filters.iter().all(|filter| matches(document, filter))
}

/// Whether `document` satisfies `filter`.
pub fn matches(document: &Payload, filter: &StoreFilter) -> bool {
    let Some(actual) = document.get(&filter.field).filter(|v| !v.is_null()) else {
        return false;
    };

    match filter.op {
        Operator::Eq => equals(actual, &filter.value),
        Operator::Neq => compare(actual, &filter.value).is_some_and(Ordering::is_ne)
            || (is_structured(actual) && actual != &filter.value),
        Operator::Gt => compare(actual, &filter.value).is_some_and(Ordering::is_gt),
        Operator::Gte => compare(actual, &filter.value).is_some_and(Ordering::is_ge),
        Operator::Lt => compare(actual, &filter.value).is_some_and(Ordering::is_lt),
        Operator::Lte => compare(actual, &filter.value).is_some_and(Ordering::is_le),
        Operator::In => filter
            .value
            .as_array()
            .is_some_and(|items| items.iter().any(|item| equals(actual, item))),
        Operator::Like => match (actual, &filter.value) {
            (Value::String(text), Value::String(pattern)) => like(text, pattern),
            _ => false,
        },
    }
}

fn is_structured(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn equals(actual: &Value, expected: &Value) -> bool {
    match compare(actual, expected) {
        Some(ordering) => ordering.is_eq(),
        None => is_structured(actual) && actual == expected,
    }
}

/// Order two scalars of the same JSON type. Numbers compare numerically.
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        tokens.push(match ch {
            '\\' => Token::Literal(chars.next().unwrap_or('\\')),
            '%' => Token::AnyRun,
            '_' => Token::AnyOne,
            other => Token::Literal(other),
        });
    }
    tokens
}

/// SQL `LIKE`: `%` matches any run, `_` any single character, `\` escapes.
pub fn like(text: &str, pattern: &str) -> bool {
    let tokens = tokenize(pattern);
    let text: Vec<char> = text.chars().collect();

    // reachable[j]: the first i tokens can match text[..j]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;

    for token in tokens {
        let mut next = vec![false; text.len() + 1];
        match token {
            Token::AnyRun => {
                let mut seen = false;
                for (j, slot) in next.iter_mut().enumerate() {
                    seen |= reachable[j];
                    *slot = seen;
                }
            }
            Token::AnyOne => {
                next[1..].copy_from_slice(&reachable[..text.len()]);
            }
            Token::Literal(expected) => {
                for (j, ch) in text.iter().enumerate() {
                    next[j + 1] = reachable[j] && *ch == expected;
                }
            }
        }
        reachable = next;
    }

    reachable[text.len()]
}
