//! Scripted `GraphStore` double for unit tests.
//!
//! Records every statement it receives and answers with queued responses,
//! falling back to a responder closure once the queue is empty.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::GraphError;
use crate::store::{GraphStore, Record, SharedStore, Statement};

type Responder = Box<dyn Fn(&Statement) -> Result<Vec<Record>, GraphError> + Send + Sync>;

pub(crate) struct ScriptedStore {
    queued: Mutex<VecDeque<Result<Vec<Record>, GraphError>>>,
    responder: Responder,
    statements: Mutex<Vec<Statement>>,
    has_data: bool,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            responder: Box::new(|_| Ok(Vec::new())),
            statements: Mutex::new(Vec::new()),
            has_data: false,
        }
    }

    pub(crate) fn with_data(mut self, has_data: bool) -> Self {
        self.has_data = has_data;
        self
    }

    pub(crate) fn responding_with(
        mut self,
        responder: impl Fn(&Statement) -> Result<Vec<Record>, GraphError> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    /// Queue the rows returned by the next `execute` call.
    pub(crate) fn push_rows(self, rows: Vec<Record>) -> Self {
        self.queued.lock().unwrap().push_back(Ok(rows));
        self
    }

    /// Queue a failure for the next `execute` call.
    pub(crate) fn push_error(self, error: GraphError) -> Self {
        self.queued.lock().unwrap().push_back(Err(error));
        self
    }

    pub(crate) fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    pub(crate) fn last_statement(&self) -> Statement {
        self.statements
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no statement executed")
    }

    pub(crate) fn shared(self) -> (Arc<Self>, SharedStore) {
        let store = Arc::new(self);
        let shared: SharedStore = store.clone();
        (store, shared)
    }
}

#[async_trait]
impl GraphStore for ScriptedStore {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Record>, GraphError> {
        self.statements.lock().unwrap().push(statement.clone());
        let queued = self.queued.lock().unwrap().pop_front();
        match queued {
            Some(response) => response,
            None => (self.responder)(statement),
        }
    }

    async fn execute_void(&self, statement: &Statement) -> Result<(), GraphError> {
        self.execute(statement).await.map(|_| ())
    }

    async fn has_any_data(&self) -> Result<bool, GraphError> {
        Ok(self.has_data)
    }
}

/// Whether `statement` is one of the schema constraint declarations.
pub(crate) fn is_schema(statement: &Statement) -> bool {
    statement.cypher().starts_with("CREATE CONSTRAINT")
}

/// A single aggregate row `{column: value}`.
pub(crate) fn count_row(column: &str, value: usize) -> Vec<Record> {
    vec![Record::new().with(column, value.to_string())]
}
