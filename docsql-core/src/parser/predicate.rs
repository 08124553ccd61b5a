//! Builds a predicate tree from WHERE-clause tokens.
//!
//! There is no operator precedence: the leftmost connective in a span splits
//! it, so `a = 1 AND b = 2 OR c = 3` groups as `a = 1 AND (b = 2 OR c = 3)`.
//! This differs from standard SQL, where AND binds tighter than OR.

use crate::ast::{Connective, Operator, Predicate};
use crate::error::{QueryError, QueryResult};
use crate::value::{resolve_literal, Value};

/// Build a predicate from a token span.
pub fn build(tokens: &[String]) -> QueryResult<Predicate> {
    if tokens.len() == 3 {
        return build_condition(&tokens[0], &tokens[1], &tokens[2]);
    }

    // A connective in the first or last slot would leave an empty side.
    let split = tokens
        .iter()
        .enumerate()
        .take(tokens.len().saturating_sub(1))
        .skip(1)
        .find_map(|(i, token)| Connective::from_token(token).map(|c| (i, c)));

    match split {
        Some((i, connective)) => {
            let left = build(&tokens[..i])?;
            let right = build(&tokens[i + 1..])?;
            Ok(Predicate::logical(connective, left, right))
        }
        None => Err(QueryError::MalformedPredicate(format!(
            "expected `field operator value` or a connective in '{}'",
            tokens.join(" ")
        ))),
    }
}

fn build_condition(field: &str, operator: &str, value: &str) -> QueryResult<Predicate> {
    let operator = Operator::from_token(operator).ok_or_else(|| {
        QueryError::MalformedPredicate(format!("unknown operator '{}'", operator))
    })?;

    let value = if operator.takes_list() {
        parse_list(value).ok_or_else(|| {
            QueryError::MalformedPredicate(format!(
                "{} expects a list such as ('a', 'b'), found '{}'",
                operator, value
            ))
        })?
    } else if is_list_literal(value) {
        return Err(QueryError::MalformedPredicate(format!(
            "{} does not accept a list operand",
            operator
        )));
    } else {
        resolve_literal(value)
    };

    Ok(Predicate::condition(unquote_field(field), operator, value))
}

fn is_list_literal(text: &str) -> bool {
    (text.starts_with('(') && text.ends_with(')'))
        || (text.starts_with('[') && text.ends_with(']'))
}

fn unquote_field(field: &str) -> String {
    field
        .strip_prefix('`')
        .and_then(|f| f.strip_suffix('`'))
        .unwrap_or(field)
        .to_string()
}

/// Parse `(a, b)` or `[a, b]`; each element goes through the literal
/// resolver. Commas inside quotes do not separate elements.
fn parse_list(text: &str) -> Option<Value> {
    if !is_list_literal(text) {
        return None;
    }
    let inner = &text[1..text.len() - 1];
    if inner.trim().is_empty() {
        return Some(Value::List(Vec::new()));
    }

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in inner.chars() {
        match quote {
            Some(open) => {
                current.push(ch);
                if ch == open {
                    quote = None;
                }
            }
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            None if ch == ',' => {
                items.push(resolve_literal(current.trim()));
                current.clear();
            }
            None => current.push(ch),
        }
    }
    items.push(resolve_literal(current.trim()));
    Some(Value::List(items))
}
