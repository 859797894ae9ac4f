//! Neo4j connection management and the production graph store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Txn};
use serde::Deserialize;

use crate::error::GraphError;
use crate::store::{GraphStore, Record, Statement};

/// Configuration for connecting to Neo4j.
///
/// Loaded from the `[neo4j]` config section; every key has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_uri")]
    pub uri: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,

    /// Upper bound on a single store call, in milliseconds.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Retries after a transient (connectivity/timeout) failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First retry delay; doubles on each further attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_uri() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "contraindicator-dev".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

fn default_query_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    200
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: default_uri(),
            user: default_user(),
            password: default_password(),
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
            query_timeout_ms: default_query_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Per-call timeout plus bounded exponential backoff.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(timeout: Duration, max_retries: u32, backoff: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            backoff,
        }
    }

    fn from_config(config: &GraphConfig) -> Self {
        Self::new(
            Duration::from_millis(config.query_timeout_ms),
            config.max_retries,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    /// Run `call` under the timeout, re-running it after transient failures.
    ///
    /// Only for calls that are safe to repeat.
    pub(crate) async fn retrying<T, F, Fut>(
        &self,
        operation: &'static str,
        mut call: F,
    ) -> Result<T, GraphError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GraphError>>,
    {
        let mut attempt = 0;
        let mut backoff = self.backoff;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(GraphError::Unavailable(format!(
                    "{operation} timed out after {}ms",
                    self.timeout.as_millis()
                ))),
            };

            match outcome {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient Neo4j failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
                other => return other,
            }
        }
    }

    /// Run `call` exactly once under the timeout.
    ///
    /// A timeout here leaves the outcome unknown: the server may still
    /// commit the work, so the caller must not send it again.
    pub(crate) async fn once<T, Fut>(&self, operation: &'static str, call: Fut) -> Result<T, GraphError>
    where
        Fut: Future<Output = Result<T, GraphError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GraphError::Unavailable(format!(
                "{operation} timed out after {}ms, outcome unknown",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc). Every call is bounded by the configured
/// timeout. Idempotent statements are retried with exponential backoff on
/// transient failures; writes are retried only while opening their
/// transaction, before the statement itself has been sent.
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
    retry: RetryPolicy,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let neo_config = ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password)
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size)
            .build()
            .map_err(|e| GraphError::Unavailable(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Unavailable(e.to_string()))?;

        tracing::info!(uri = %config.uri, "Connected to Neo4j");
        Ok(Self {
            graph,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Execute a query and collect all rows.
    async fn query_rows(&self, statement: &Statement) -> Result<Vec<Record>, GraphError> {
        let mut stream = self.graph.execute(statement.to_query()).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(statement.decode(&row)?);
        }
        Ok(rows)
    }

    /// Apply a write in its own transaction, sending it at most once.
    async fn apply(&self, statement: &Statement) -> Result<Vec<Record>, GraphError> {
        let txn = self
            .retry
            .retrying("begin", || async {
                self.graph.start_txn().await.map_err(GraphError::from)
            })
            .await?;
        self.retry.once("write", apply_in(txn, statement)).await
    }
}

async fn apply_in(mut txn: Txn, statement: &Statement) -> Result<Vec<Record>, GraphError> {
    let mut rows = Vec::new();
    let applied = async {
        let mut stream = txn.execute(statement.to_query()).await?;
        while let Some(row) = stream.next(txn.handle()).await? {
            rows.push(statement.decode(&row)?);
        }
        Ok::<(), GraphError>(())
    }
    .await;

    match applied {
        Ok(()) => {
            txn.commit().await?;
            Ok(rows)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::warn!(error = %rollback, "Rollback after failed write did not complete");
            }
            Err(e)
        }
    }
}

#[async_trait]
impl GraphStore for GraphClient {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Record>, GraphError> {
        if statement.is_idempotent() {
            self.retry
                .retrying("execute", || self.query_rows(statement))
                .await
        } else {
            self.apply(statement).await
        }
    }

    async fn execute_void(&self, statement: &Statement) -> Result<(), GraphError> {
        self.execute(statement).await.map(|_| ())
    }

    async fn has_any_data(&self) -> Result<bool, GraphError> {
        let statement = Statement::new("MATCH (n) RETURN 'present' AS present LIMIT 1")
            .returns(&["present"])
            .idempotent();
        let rows = self.execute(&statement).await?;
        Ok(!rows.is_empty())
    }
}
