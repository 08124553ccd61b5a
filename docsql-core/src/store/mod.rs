//! Document store interface.
//!
//! The translator never talks to a concrete database. It builds a
//! [`StoreQuery`] out of the primitives every document store offers (scope,
//! field filters, single-field ordering, limit) and hands it to a
//! [`DocumentStore`] implementation.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::alias::IDENTITY_FIELD;
use crate::ast::Direction;
use crate::error::StoreResult;
use crate::value::Value;

/// A document returned by a store: its identifier plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, JsonValue>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, JsonValue>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Look up a field; the identity sentinel resolves to the document id.
    pub fn get(&self, field: &str) -> Option<JsonValue> {
        if field == IDENTITY_FIELD {
            return Some(JsonValue::String(self.id.clone()));
        }
        self.fields.get(field).cloned()
    }
}

/// Filter operators understood by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    In,
    NotIn,
    ArrayContains,
    ArrayContainsAny,
}

impl FilterOp {
    pub const ALL: [FilterOp; 10] = [
        FilterOp::Equal,
        FilterOp::NotEqual,
        FilterOp::LessThan,
        FilterOp::LessThanOrEqual,
        FilterOp::GreaterThan,
        FilterOp::GreaterThanOrEqual,
        FilterOp::In,
        FilterOp::NotIn,
        FilterOp::ArrayContains,
        FilterOp::ArrayContainsAny,
    ];

    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Equal => "==",
            FilterOp::NotEqual => "!=",
            FilterOp::LessThan => "<",
            FilterOp::LessThanOrEqual => "<=",
            FilterOp::GreaterThan => ">",
            FilterOp::GreaterThanOrEqual => ">=",
            FilterOp::In => "in",
            FilterOp::NotIn => "not-in",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::ArrayContainsAny => "array-contains-any",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a store can execute natively.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub operators: Vec<FilterOp>,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            operators: FilterOp::ALL.to_vec(),
        }
    }

    /// Only the comparison operators, no list or array membership.
    pub fn comparisons_only() -> Self {
        Self {
            operators: FilterOp::ALL[..6].to_vec(),
        }
    }

    pub fn supports(&self, op: FilterOp) -> bool {
        self.operators.contains(&op)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Where a query reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Normalized collection path without leading or trailing slashes.
    Collection(String),
    CollectionGroup(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Ordered sequence of store operations for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub scope: Scope,
    pub filters: Vec<FieldFilter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<u64>,
}

impl StoreQuery {
    pub fn collection(path: impl Into<String>) -> Self {
        Self::scoped(Scope::Collection(path.into()))
    }

    pub fn collection_group(name: impl Into<String>) -> Self {
        Self::scoped(Scope::CollectionGroup(name.into()))
    }

    fn scoped(scope: Scope) -> Self {
        Self {
            scope,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }
}

impl fmt::Display for StoreQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            Scope::Collection(path) => write!(f, "collection({})", path)?,
            Scope::CollectionGroup(name) => write!(f, "collection_group({})", name)?,
        }
        for filter in &self.filters {
            write!(f, " | where({} {} {})", filter.field, filter.op, filter.value)?;
        }
        if let Some((field, direction)) = &self.order_by {
            write!(f, " | order_by({} {})", field, direction)?;
        }
        if let Some(n) = self.limit {
            write!(f, " | limit({})", n)?;
        }
        Ok(())
    }
}

/// A document store the translator can drive.
///
/// Implementations perform the I/O; `fetch` returns documents in the order
/// the query asks for and `count` is a server-side aggregate that does not
/// materialize documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run the query and return the matching documents.
    async fn fetch(&self, query: &StoreQuery) -> StoreResult<Vec<Document>>;

    /// Count the documents matching the query's scope and filters.
    async fn count(&self, query: &StoreQuery) -> StoreResult<u64>;

    /// Operators this store executes natively.
    fn capabilities(&self) -> Capabilities {
        Capabilities::all()
    }
}
