//! docsql - a SQL-like query shell for hierarchical document stores.
//!
//! The query language itself lives in [`docsql_core`]; this package adds
//! configuration, JSON dataset loading and the interactive shell.

pub mod config;
pub mod dataset;
pub mod error;
pub mod shell;

pub use config::Config;
pub use error::{AppError, AppResult};

// Re-export the core for binaries and tests
pub use docsql_core::{
    InMemoryStore, QueryError, QueryExecutor, QueryOutput, Row, Settings, StoreQuery,
};
