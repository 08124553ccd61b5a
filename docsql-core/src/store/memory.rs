//! In-memory document store for tests and local datasets.

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{Document, DocumentStore, FieldFilter, FilterOp, Scope, StoreQuery};
use crate::ast::Direction;
use crate::error::{StoreError, StoreResult};
use crate::value::{date_like, Value};

/// Documents keyed by collection path, then by document id.
///
/// Matching follows document-store rules rather than SQL ones: a filter
/// only matches documents that have the field with a comparable value, and
/// ordering drops documents that lack the order field.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    collections: BTreeMap<String, BTreeMap<String, Map<String, JsonValue>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document. Non-object values are stored under a `value` field.
    pub fn insert(&mut self, collection: &str, id: &str, doc: JsonValue) {
        let fields = match doc {
            JsonValue::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        self.collections
            .entry(normalize_path(collection).to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Add documents to a collection, taking ids from their `id` field or
    /// numbering them `doc0`, `doc1`, ...
    pub fn add_collection(&mut self, collection: &str, docs: Vec<JsonValue>) {
        for (i, doc) in docs.into_iter().enumerate() {
            let id = doc
                .get("id")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("doc{}", i));
            let doc = match doc {
                JsonValue::Object(mut map) => {
                    map.remove("id");
                    JsonValue::Object(map)
                }
                other => other,
            };
            self.insert(collection, &id, doc);
        }
    }

    pub fn collection_paths(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scoped_documents(&self, scope: &Scope) -> StoreResult<Vec<Document>> {
        let docs = match scope {
            Scope::Collection(path) => {
                let path = normalize_path(path);
                let segments = path.split('/').count();
                if path.is_empty() || segments % 2 == 0 {
                    return Err(StoreError::InvalidPath(format!(
                        "'{}' does not name a collection",
                        path
                    )));
                }
                self.collections
                    .get(path)
                    .map(to_documents)
                    .unwrap_or_default()
            }
            Scope::CollectionGroup(name) => self
                .collections
                .iter()
                .filter(|(path, _)| path.rsplit('/').next() == Some(name.as_str()))
                .flat_map(|(_, docs)| to_documents(docs))
                .collect(),
        };
        Ok(docs)
    }

    fn run(&self, query: &StoreQuery, with_order_and_limit: bool) -> StoreResult<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .scoped_documents(&query.scope)?
            .into_iter()
            .filter(|doc| query.filters.iter().all(|f| matches_filter(doc, f)))
            .collect();

        if with_order_and_limit {
            if let Some((field, direction)) = &query.order_by {
                docs.retain(|doc| doc.get(field).is_some());
                docs.sort_by(|a, b| {
                    let ord = match (a.get(field), b.get(field)) {
                        (Some(x), Some(y)) => compare_stored(&x, &y),
                        _ => Ordering::Equal,
                    };
                    match direction {
                        Direction::Ascending => ord,
                        Direction::Descending => ord.reverse(),
                    }
                });
            }
            if let Some(n) = query.limit {
                docs.truncate(usize::try_from(n).unwrap_or(usize::MAX));
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn fetch(&self, query: &StoreQuery) -> StoreResult<Vec<Document>> {
        self.run(query, true)
    }

    async fn count(&self, query: &StoreQuery) -> StoreResult<u64> {
        Ok(self.run(query, false)?.len() as u64)
    }
}

fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

fn to_documents(docs: &BTreeMap<String, Map<String, JsonValue>>) -> Vec<Document> {
    docs.iter()
        .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
        .collect()
}

fn matches_filter(doc: &Document, filter: &FieldFilter) -> bool {
    let Some(stored) = doc.get(&filter.field) else {
        return false;
    };

    let equals = |literal: &Value| compare_literal(&stored, literal) == Some(Ordering::Equal);

    match filter.op {
        FilterOp::Equal => equals(&filter.value),
        FilterOp::NotEqual => !stored.is_null() && !equals(&filter.value),
        FilterOp::LessThan => compare_literal(&stored, &filter.value) == Some(Ordering::Less),
        FilterOp::LessThanOrEqual => matches!(
            compare_literal(&stored, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::GreaterThan => {
            compare_literal(&stored, &filter.value) == Some(Ordering::Greater)
        }
        FilterOp::GreaterThanOrEqual => matches!(
            compare_literal(&stored, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::In => list_items(&filter.value).iter().any(equals),
        FilterOp::NotIn => !stored.is_null() && !list_items(&filter.value).iter().any(equals),
        FilterOp::ArrayContains => stored.as_array().is_some_and(|items| {
            items
                .iter()
                .any(|item| compare_literal(item, &filter.value) == Some(Ordering::Equal))
        }),
        FilterOp::ArrayContainsAny => stored.as_array().is_some_and(|items| {
            items.iter().any(|item| {
                list_items(&filter.value)
                    .iter()
                    .any(|literal| compare_literal(item, literal) == Some(Ordering::Equal))
            })
        }),
    }
}

fn list_items(value: &Value) -> &[Value] {
    match value {
        Value::List(items) => items,
        other => std::slice::from_ref(other),
    }
}

/// Compare a stored value with a literal. `None` means the two are of
/// different kinds and never match.
fn compare_literal(stored: &JsonValue, literal: &Value) -> Option<Ordering> {
    match (stored, literal) {
        (JsonValue::Number(n), Value::Number(m)) => n.as_f64()?.partial_cmp(m),
        (JsonValue::String(s), Value::String(t)) => Some(s.as_str().cmp(t.as_str())),
        (JsonValue::Bool(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (JsonValue::Null, Value::Null) => Some(Ordering::Equal),
        (_, Value::Timestamp(ts)) => date_like(stored).map(|stored_ts| stored_ts.cmp(ts)),
        _ => None,
    }
}

fn type_rank(value: &JsonValue) -> u8 {
    if date_like(value).is_some() {
        return 3;
    }
    match value {
        JsonValue::Null => 0,
        JsonValue::Bool(_) => 1,
        JsonValue::Number(_) => 2,
        JsonValue::String(_) => 4,
        JsonValue::Array(_) => 5,
        JsonValue::Object(_) => 6,
    }
}

/// Total order over stored values: by type rank, then by value. Date-like
/// values, strings or timestamp objects, share one rank and order by instant.
fn compare_stored(a: &JsonValue, b: &JsonValue) -> Ordering {
    if let (Some(x), Some(y)) = (date_like(a), date_like(b)) {
        return x.cmp(&y);
    }
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => x.cmp(y),
        (JsonValue::Number(x), JsonValue::Number(y)) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        (JsonValue::Array(x), JsonValue::Array(y)) => x.len().cmp(&y.len()),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::IDENTITY_FIELD;
    use crate::value::resolve_literal;
    use serde_json::json;

    fn seeded() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.insert(
            "users",
            "u1",
            json!({"name": "Ada", "age": 36, "tags": ["math", "code"], "joined": "2020-01-05"}),
        );
        store.insert(
            "users",
            "u2",
            json!({"name": "Linus", "age": 28, "tags": ["code"], "joined": "2022-06-30"}),
        );
        store.insert("users", "u3", json!({"name": "Grace", "tags": []}));
        store.insert("users/u1/orders", "o1", json!({"total": 10}));
        store.insert("users/u2/orders", "o2", json!({"total": 25}));
        store
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_equality_and_range() {
        let store = seeded();
        let q = StoreQuery::collection("users").filter(
            "age",
            FilterOp::GreaterThan,
            Value::Number(30.0),
        );
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u1"]);

        let q = StoreQuery::collection("users")
            .filter("name", FilterOp::Equal, Value::String("Linus".into()));
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u2"]);
    }

    #[tokio::test]
    async fn test_missing_field_never_matches() {
        let store = seeded();
        let q = StoreQuery::collection("users").filter(
            "age",
            FilterOp::NotEqual,
            Value::Number(36.0),
        );
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u2"]);
    }

    #[tokio::test]
    async fn test_type_mismatch_never_matches() {
        let store = seeded();
        let q = StoreQuery::collection("users")
            .filter("age", FilterOp::GreaterThan, Value::String("1".into()));
        assert!(store.fetch(&q).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timestamp_against_date_strings() {
        let store = seeded();
        let q = StoreQuery::collection("users").filter(
            "joined",
            FilterOp::GreaterThan,
            resolve_literal("2021-01-01"),
        );
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u2"]);
    }

    #[tokio::test]
    async fn test_identity_filter() {
        let store = seeded();
        let q = StoreQuery::collection("users").filter(
            IDENTITY_FIELD,
            FilterOp::In,
            Value::List(vec![Value::String("u1".into()), Value::String("u3".into())]),
        );
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u1", "u3"]);
    }

    #[tokio::test]
    async fn test_array_membership() {
        let store = seeded();
        let q = StoreQuery::collection("users").filter(
            "tags",
            FilterOp::ArrayContains,
            Value::String("math".into()),
        );
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u1"]);

        let q = StoreQuery::collection("users").filter(
            "tags",
            FilterOp::ArrayContainsAny,
            Value::List(vec![Value::String("code".into()), Value::String("x".into())]),
        );
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u1", "u2"]);
    }

    #[tokio::test]
    async fn test_order_drops_missing_and_limit() {
        let store = seeded();
        let q = StoreQuery::collection("users").order_by("age", Direction::Ascending);
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u2", "u1"]);

        let q = StoreQuery::collection("users")
            .order_by("age", Direction::Descending)
            .limit(1);
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["u1"]);

        let q = StoreQuery::collection("users").limit(0);
        assert!(store.fetch(&q).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_count_ignores_limit() {
        let store = seeded();
        let q = StoreQuery::collection("users").limit(2);
        assert_eq!(store.count(&q).await.unwrap(), 3);
        assert_eq!(store.fetch(&q).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_order_by_instant_across_date_shapes() {
        let mut store = InMemoryStore::new();
        store.insert("events", "e1", json!({"at": "2023-03-10T00:00:00Z"}));
        store.insert("events", "e2", json!({"at": "March 5, 2023"}));
        store.insert("events", "e3", json!({"at": {"_seconds": 1672531200, "_nanoseconds": 0}}));
        store.insert("events", "e4", json!({"at": "not a date"}));

        let q = StoreQuery::collection("events").order_by("at", Direction::Ascending);
        assert_eq!(
            ids(&store.fetch(&q).await.unwrap()),
            vec!["e3", "e2", "e1", "e4"]
        );

        let q = StoreQuery::collection("events").order_by("at", Direction::Descending);
        assert_eq!(
            ids(&store.fetch(&q).await.unwrap()),
            vec!["e4", "e1", "e2", "e3"]
        );
    }

    #[tokio::test]
    async fn test_collection_group_and_subcollection() {
        let store = seeded();
        let q = StoreQuery::collection_group("orders");
        assert_eq!(store.count(&q).await.unwrap(), 2);

        let q = StoreQuery::collection("/users/u2/orders/");
        assert_eq!(ids(&store.fetch(&q).await.unwrap()), vec!["o2"]);
    }

    #[tokio::test]
    async fn test_document_path_rejected() {
        let store = seeded();
        let err = store
            .fetch(&StoreQuery::collection("users/u1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let store = seeded();
        assert_eq!(store.count(&StoreQuery::collection("nope")).await.unwrap(), 0);
    }

    #[test]
    fn test_add_collection_ids() {
        let mut store = InMemoryStore::new();
        store.add_collection("items", vec![json!({"id": "a", "x": 1}), json!({"x": 2})]);
        let paths: Vec<&str> = store.collection_paths().collect();
        assert_eq!(paths, vec!["items"]);
        assert_eq!(store.len(), 2);
    }
}
