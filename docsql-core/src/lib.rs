//! docsql core - storage-independent parser and translator for a SQL-like
//! query dialect over document stores.
//!
//! The dialect is deliberately small: a single `SELECT` with a field list,
//! `toDate(field)`, `prettyJson(field)` or `COUNT(*)`, a `FROM` collection
//! path (or `GROUP name` for a collection group), and optional `WHERE`,
//! `ORDER BY field ASC|DESC` and `LIMIT n` clauses.
//!
//! # Main Components
//!
//! - **Parser**: turns query text into a validated [`QueryPlan`]
//! - **Translator**: maps a plan onto [`StoreQuery`] operations
//! - **Store**: the [`DocumentStore`] trait plus an [`InMemoryStore`]
//!
//! # Dialect restrictions
//!
//! - `AND`/`OR` have no precedence: the leftmost connective splits the
//!   clause, so `a = 1 AND b = 2 OR c = 3` means `a = 1 AND (b = 2 OR c = 3)`.
//! - `OR` parses but is rejected at translation time.
//! - `COUNT(*)` cannot be combined with `ORDER BY`.
//!
//! # Example
//!
//! ```rust
//! use docsql_core::{InMemoryStore, QueryExecutor};
//! use serde_json::json;
//!
//! let mut store = InMemoryStore::new();
//! store.insert("users", "u1", json!({"name": "Ada", "age": 36}));
//! store.insert("users", "u2", json!({"name": "Linus", "age": 28}));
//!
//! let executor = QueryExecutor::new(store);
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let output = rt
//!     .block_on(executor.execute("SELECT name FROM users WHERE age > 30"))
//!     .unwrap();
//! assert_eq!(output.into_rows()[0]["name"], json!("Ada"));
//! ```

pub mod alias;
pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod store;
pub mod translator;
pub mod value;

// Re-export main types for convenience
pub use alias::{alias_field, IDENTITY_FIELD};
pub use ast::{
    Connective, Direction, FromPath, Operator, OrderBy, Predicate, QueryPlan, SelectFunction,
    SelectItem,
};
pub use error::{QueryError, QueryResult, StoreError, StoreResult};
pub use parser::parse;
pub use store::{Capabilities, Document, DocumentStore, FilterOp, InMemoryStore, StoreQuery};
pub use translator::{translate, QueryExecutor, QueryOutput, Row, Settings};
pub use value::{resolve_literal, Value};
