//! Plan translation and execution.
//!
//! A validated [`QueryPlan`] is turned into a [`StoreQuery`] (scope, filters,
//! order, limit) and run against a [`DocumentStore`]. Rows coming back are
//! projected according to the select list.

mod projection;

pub use projection::{format_date, DATE_FORMAT};

use chrono_tz::Tz;
use serde_json::{Map, Value as JsonValue};

use crate::ast::{Connective, FromPath, Operator, Predicate, QueryPlan};
use crate::error::{QueryError, QueryResult};
use crate::parser;
use crate::store::{Capabilities, DocumentStore, FilterOp, StoreQuery};

/// One projected result row, keys in select-list order.
pub type Row = Map<String, JsonValue>;

/// Read-only session settings consulted during translation and projection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    /// Active document root; relative FROM paths are resolved under it.
    pub base_path: Option<String>,
    /// Zone used by `toDate`; `None` means the local time zone.
    pub timezone: Option<Tz>,
    /// Merge the document id into `SELECT *` rows as `id`.
    pub include_id: bool,
}

/// Result of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Rows(Vec<Row>),
    Count(u64),
}

impl QueryOutput {
    /// Rows for display. A count becomes the single row `{"COUNT(*)": n}`.
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryOutput::Rows(rows) => rows,
            QueryOutput::Count(n) => {
                let mut row = Row::new();
                row.insert("COUNT(*)".to_string(), JsonValue::from(n));
                vec![row]
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Rows(rows) => rows.len(),
            QueryOutput::Count(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed operator table from the query grammar to store operators.
pub fn map_operator(op: Operator) -> FilterOp {
    match op {
        Operator::Eq => FilterOp::Equal,
        Operator::NotEq => FilterOp::NotEqual,
        Operator::Lt => FilterOp::LessThan,
        Operator::LtEq => FilterOp::LessThanOrEqual,
        Operator::Gt => FilterOp::GreaterThan,
        Operator::GtEq => FilterOp::GreaterThanOrEqual,
        Operator::In => FilterOp::In,
        Operator::NotIn => FilterOp::NotIn,
        Operator::ArrayContains => FilterOp::ArrayContains,
        Operator::ArrayContainsAny => FilterOp::ArrayContainsAny,
    }
}

/// Resolve a FROM path against the active document root. A leading `/`
/// makes the path absolute.
pub fn resolve_path(path: &str, base_path: Option<&str>) -> String {
    if let Some(absolute) = path.strip_prefix('/') {
        return absolute.trim_matches('/').to_string();
    }
    let relative = path.trim_matches('/');
    match base_path.map(|b| b.trim_matches('/')).filter(|b| !b.is_empty()) {
        Some(base) => format!("{}/{}", base, relative),
        None => relative.to_string(),
    }
}

/// Translate a plan into store operations.
///
/// Fails with [`QueryError::UnsupportedOperator`] on any OR node and on
/// operators the store does not list in its capabilities. Count plans carry
/// no order or limit.
pub fn translate(
    plan: &QueryPlan,
    settings: &Settings,
    capabilities: &Capabilities,
) -> QueryResult<StoreQuery> {
    let mut query = match &plan.from {
        FromPath::Collection(path) => {
            StoreQuery::collection(resolve_path(path, settings.base_path.as_deref()))
        }
        FromPath::CollectionGroup(name) => StoreQuery::collection_group(name.clone()),
    };

    if let Some(filter) = &plan.filter {
        query = apply_predicate(query, filter, capabilities)?;
    }

    if plan.is_count() {
        return Ok(query);
    }

    if let Some(order) = &plan.order_by {
        query = query.order_by(order.field.clone(), order.direction);
    }
    if let Some(n) = plan.limit {
        query = query.limit(n);
    }
    Ok(query)
}

fn apply_predicate(
    query: StoreQuery,
    predicate: &Predicate,
    capabilities: &Capabilities,
) -> QueryResult<StoreQuery> {
    match predicate {
        Predicate::Condition {
            field,
            operator,
            value,
        } => {
            let op = map_operator(*operator);
            if !capabilities.supports(op) {
                return Err(QueryError::UnsupportedOperator(format!(
                    "{} is not supported by this store",
                    operator
                )));
            }
            Ok(query.filter(field.clone(), op, value.clone()))
        }
        Predicate::Logical {
            operator: Connective::And,
            left,
            right,
        } => {
            let query = apply_predicate(query, left, capabilities)?;
            apply_predicate(query, right, capabilities)
        }
        Predicate::Logical {
            operator: Connective::Or,
            ..
        } => Err(QueryError::UnsupportedOperator(
            "OR cannot be expressed as store filters; run one query per branch and merge the results"
                .to_string(),
        )),
    }
}

/// Executes query text against a document store.
pub struct QueryExecutor<S: DocumentStore> {
    store: S,
    settings: Settings,
}

impl<S: DocumentStore> QueryExecutor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            settings: Settings::default(),
        }
    }

    pub fn with_settings(store: S, settings: Settings) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Parse, translate and run one query line.
    pub async fn execute(&self, query: &str) -> QueryResult<QueryOutput> {
        let plan = parser::parse(query)?;
        self.execute_plan(&plan).await
    }

    /// Translate and run a parsed plan.
    pub async fn execute_plan(&self, plan: &QueryPlan) -> QueryResult<QueryOutput> {
        let store_query = self.translate(plan)?;
        tracing::debug!(%store_query, "translated query");

        if plan.is_count() {
            let n = self.store.count(&store_query).await?;
            return Ok(QueryOutput::Count(n));
        }

        if store_query.limit == Some(0) {
            return Ok(QueryOutput::Rows(Vec::new()));
        }

        let documents = self.store.fetch(&store_query).await?;
        let rows = documents
            .iter()
            .map(|doc| projection::project(doc, &plan.select, &self.settings))
            .collect();
        Ok(QueryOutput::Rows(rows))
    }

    pub fn translate(&self, plan: &QueryPlan) -> QueryResult<StoreQuery> {
        translate(plan, &self.settings, &self.store.capabilities())
    }

    /// The store operations a query would run, without running them.
    pub fn explain(&self, query: &str) -> QueryResult<StoreQuery> {
        let plan = parser::parse(query)?;
        self.translate(&plan)
    }
}
