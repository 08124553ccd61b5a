//! Common test utilities for docsql integration tests
//!
//! Provides shared helper functions for:
//! - Seeding an in-memory store
//! - Executing queries and collecting rows
//! - Expecting query errors

#![allow(dead_code)]

use docsql::{InMemoryStore, QueryError, QueryExecutor, Row, Settings};
use serde_json::json;

pub fn create_seeded_store() -> InMemoryStore {
    let mut store = InMemoryStore::new();

    store.insert(
        "users",
        "u1",
        json!({"name": "Alice", "age": 30, "city": "NY", "active": true,
               "tags": ["admin", "eng"], "createdAt": "2025-10-12T08:30:00Z"}),
    );
    store.insert(
        "users",
        "u2",
        json!({"name": "Bob", "age": 25, "city": "LA", "active": true,
               "tags": ["eng"], "createdAt": "2025-09-01T12:00:00Z"}),
    );
    store.insert(
        "users",
        "u3",
        json!({"name": "Charlie", "age": 35, "city": "NY", "active": false,
               "tags": ["sales"], "createdAt": {"_seconds": 1760486400, "_nanoseconds": 0}}),
    );
    store.insert(
        "users",
        "u4",
        json!({"name": "Diana", "city": "Boston", "nickname": null}),
    );

    store.insert("users/u1/orders", "o1", json!({"total": 79.98, "status": "completed"}));
    store.insert("users/u1/orders", "o2", json!({"total": 49.99, "status": "shipped"}));
    store.insert("users/u2/orders", "o3", json!({"total": 29.99, "status": "pending"}));
    store.insert("archive/2024/orders", "o4", json!({"total": 5, "status": "completed"}));

    store.insert("cities", "NY", json!({"name": "New York", "population": 8336817}));

    store
}

pub fn create_executor() -> QueryExecutor<InMemoryStore> {
    QueryExecutor::with_settings(
        create_seeded_store(),
        Settings {
            timezone: Some(chrono_tz::UTC),
            ..Settings::default()
        },
    )
}

pub async fn execute_query(executor: &QueryExecutor<InMemoryStore>, query: &str) -> Vec<Row> {
    executor
        .execute(query)
        .await
        .unwrap_or_else(|e| panic!("Query failed: {}: {}", query, e))
        .into_rows()
}

pub async fn execute_query_expect_err(
    executor: &QueryExecutor<InMemoryStore>,
    query: &str,
) -> QueryError {
    match executor.execute(query).await {
        Ok(output) => panic!("Expected error but query succeeded: {:?}", output),
        Err(e) => e,
    }
}

pub fn names(rows: &[Row]) -> Vec<&str> {
    rows.iter()
        .filter_map(|row| row.get("name").and_then(|v| v.as_str()))
        .collect()
}
