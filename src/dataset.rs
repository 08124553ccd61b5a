//! JSON dataset loading.
//!
//! A dataset maps collection paths to their documents, either as an object
//! keyed by document id or as an array whose elements carry an `id` field:
//!
//! ```json
//! {
//!   "users": { "u1": { "name": "Ada" } },
//!   "users/u1/orders": [ { "id": "o1", "total": 12.5 } ]
//! }
//! ```

use docsql_core::InMemoryStore;
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Read a dataset file into a new in-memory store.
pub fn load_file(path: &Path) -> AppResult<InMemoryStore> {
    let content = std::fs::read_to_string(path)?;
    let value: JsonValue = serde_json::from_str(&content)?;
    let store = load_value(value)?;
    tracing::info!(
        "Loaded {} documents in {} collections from {}",
        store.len(),
        store.collection_paths().count(),
        path.display()
    );
    Ok(store)
}

/// Build a store from an already parsed dataset.
pub fn load_value(value: JsonValue) -> AppResult<InMemoryStore> {
    let JsonValue::Object(collections) = value else {
        return Err(AppError::InvalidDataset(
            "top level must be an object of collection paths".to_string(),
        ));
    };

    let mut store = InMemoryStore::new();
    for (path, documents) in collections {
        validate_path(&path)?;
        match documents {
            JsonValue::Object(documents) => {
                for (id, fields) in documents {
                    if !fields.is_object() {
                        return Err(AppError::InvalidDataset(format!(
                            "document '{}/{}' is not an object",
                            path, id
                        )));
                    }
                    store.insert(&path, &id, fields);
                }
            }
            JsonValue::Array(documents) => store.add_collection(&path, documents),
            _ => {
                return Err(AppError::InvalidDataset(format!(
                    "collection '{}' must be an object or an array",
                    path
                )));
            }
        }
    }
    Ok(store)
}

fn validate_path(path: &str) -> AppResult<()> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(str::is_empty) {
        return Err(AppError::InvalidDataset(format!(
            "invalid collection path '{}'",
            path
        )));
    }
    if trimmed.split('/').count() % 2 == 0 {
        return Err(AppError::InvalidDataset(format!(
            "'{}' is a document path, not a collection path",
            path
        )));
    }
    Ok(())
}
