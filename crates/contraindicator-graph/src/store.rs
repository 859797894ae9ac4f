//! The graph store adapter contract.
//!
//! Repositories talk to the graph through [`GraphStore`] only. A statement is
//! Cypher text plus named parameters (always bound, never interpolated) plus
//! the columns its projection returns. Rows come back as [`Record`]s.
//!
//! Statements are writes unless marked [`Statement::idempotent`]. A store
//! may re-send an idempotent statement after a transient failure, but never
//! re-sends a write that could already have been applied.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use contraindicator_core::NodeLabel;
use serde::de::DeserializeOwned;

use crate::error::GraphError;

/// Shared handle to a graph store, injected into every repository.
pub type SharedStore = Arc<dyn GraphStore>;

/// Execution interface over a graph database connection.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run a statement and collect its projected rows.
    async fn execute(&self, statement: &Statement) -> Result<Vec<Record>, GraphError>;

    /// Run a mutation that has no projection.
    async fn execute_void(&self, statement: &Statement) -> Result<(), GraphError>;

    /// Declare uniqueness constraints on node ids. Idempotent.
    async fn ensure_schema_constraints(&self) -> Result<(), GraphError> {
        for statement in schema_constraints() {
            self.execute_void(&statement).await?;
        }
        tracing::info!("Schema constraints ensured");
        Ok(())
    }

    /// Whether the graph holds any node at all.
    async fn has_any_data(&self) -> Result<bool, GraphError>;
}

/// A parameterized Cypher statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    cypher: String,
    params: Vec<(&'static str, String)>,
    columns: Vec<&'static str>,
    idempotent: bool,
}

impl Statement {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: Vec::new(),
            columns: Vec::new(),
            idempotent: false,
        }
    }

    /// Mark the statement as safe to run more than once: a read, or a write
    /// whose repetition changes nothing.
    pub fn idempotent(mut self) -> Self {
        self.idempotent = true;
        self
    }

    pub fn is_idempotent(&self) -> bool {
        self.idempotent
    }

    /// Bind a named parameter (`$key` in the Cypher text).
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    /// Declare the projected columns, in `RETURN` order.
    pub fn returns(mut self, columns: &[&'static str]) -> Self {
        self.columns.extend_from_slice(columns);
        self
    }

    pub fn cypher(&self) -> &str {
        &self.cypher
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub(crate) fn to_query(&self) -> neo4rs::Query {
        self.params
            .iter()
            .fold(neo4rs::query(&self.cypher), |q, (key, value)| {
                q.param(key, value.clone())
            })
    }

    /// Read this statement's projected columns out of a driver row.
    pub(crate) fn decode(&self, row: &neo4rs::Row) -> Result<Record, GraphError> {
        let mut record = Record::default();
        for column in &self.columns {
            let value = row.get::<Option<String>>(column).map_err(|e| {
                GraphError::Serialization(format!("Failed to decode column {column}: {e}"))
            })?;
            record.insert(column, value);
        }
        Ok(record)
    }
}

/// One projected row. Every column is text or null.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: BTreeMap<String, Option<String>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a non-null column.
    pub fn with(mut self, column: &str, value: impl Into<String>) -> Self {
        self.insert(column, Some(value.into()));
        self
    }

    pub fn insert(&mut self, column: &str, value: Option<String>) {
        self.values.insert(column.to_string(), value);
    }

    /// The column's value, `None` when null or not projected.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_deref())
    }

    /// A column that must be present and non-null.
    pub fn text(&self, column: &str) -> Result<&str, GraphError> {
        self.get(column).ok_or_else(|| {
            GraphError::Serialization(format!("Missing value for column {column}"))
        })
    }

    /// A column holding a stringified count.
    pub fn count(&self, column: &str) -> Result<usize, GraphError> {
        let raw = self.text(column)?;
        raw.parse().map_err(|_| {
            GraphError::Serialization(format!("Column {column} is not a count: {raw}"))
        })
    }

    /// A column holding JSON text. Null decodes as JSON `null`.
    pub fn json<T: DeserializeOwned>(&self, column: &str) -> Result<T, GraphError> {
        let raw = self.get(column).unwrap_or("null");
        serde_json::from_str(raw).map_err(|e| {
            GraphError::Serialization(format!("Column {column} holds invalid JSON: {e}"))
        })
    }
}

/// The count reported by an aggregate statement that always yields one row.
pub(crate) fn single_count(records: &[Record], column: &str) -> Result<usize, GraphError> {
    match records {
        [record] => record.count(column),
        _ => Err(GraphError::Serialization(format!(
            "Expected one aggregate row, got {}",
            records.len()
        ))),
    }
}

/// Uniqueness constraints on the id of every node label.
pub(crate) fn schema_constraints() -> Vec<Statement> {
    [NodeLabel::Product, NodeLabel::Substance]
        .iter()
        .map(|label| {
            let name = format!("{}_id", label.as_str().to_ascii_lowercase());
            Statement::new(format!(
                "CREATE CONSTRAINT {name} IF NOT EXISTS
                 FOR (n:{label}) REQUIRE n.id IS UNIQUE"
            ))
            .idempotent()
        })
        .collect()
}
