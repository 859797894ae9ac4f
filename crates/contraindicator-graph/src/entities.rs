//! Entity repository: CRUD for Product and Substance nodes.
//!
//! Nodes are identified by `(label, id)`. Writes that require a single
//! match collect the match set first and only touch the graph when exactly
//! one node matched, so an ambiguous match never partially applies.

use std::marker::PhantomData;

use contraindicator_core::{GraphNode, NewNode, NodeData, Product, Substance};

use crate::codec::{encode_node_properties, node_from_record, node_projection, NODE_COLUMNS};
use crate::error::{GraphError, OperationError, Result};
use crate::store::{single_count, SharedStore, Statement};

pub type ProductRepository = EntityRepository<Product>;
pub type SubstanceRepository = EntityRepository<Substance>;

/// CRUD over one node kind.
pub struct EntityRepository<N> {
    store: SharedStore,
    _kind: PhantomData<fn() -> N>,
}

impl<N> Clone for EntityRepository<N> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _kind: PhantomData,
        }
    }
}

impl<N: GraphNode> EntityRepository<N> {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    fn label() -> &'static str {
        N::LABEL.as_str()
    }

    /// Persist a new node, generating its id when the caller gave none.
    ///
    /// Fails with a conflict when a node with that id already exists.
    pub async fn create(&self, node: NewNode) -> Result<N> {
        let id = node.resolve_id();
        self.insert(&id, &node.data)
            .await
            .map_err(|e| OperationError::logged("create", Self::label(), &[&id], e))
    }

    /// Look up a node by id. Absence is `Ok(None)`.
    pub async fn get(&self, id: &str) -> Result<Option<N>> {
        self.fetch(id)
            .await
            .map_err(|e| OperationError::logged("get", Self::label(), &[id], e))
    }

    /// Replace every mutable property of the node. The id never changes.
    pub async fn update(&self, id: &str, data: NodeData) -> Result<N> {
        self.replace(id, &data)
            .await
            .map_err(|e| OperationError::logged("update", Self::label(), &[id], e))
    }

    /// Remove the node and every relationship touching it, in both
    /// directions. Returns whether a node was removed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.remove(id)
            .await
            .map_err(|e| OperationError::logged("delete", Self::label(), &[id], e))
    }

    async fn insert(&self, id: &str, data: &NodeData) -> std::result::Result<N, GraphError> {
        let label = Self::label();
        let statement = Statement::new(format!(
            "OPTIONAL MATCH (existing:{label} {{id: $id}})
             WITH count(existing) AS existing
             FOREACH (ignored IN CASE WHEN existing = 0 THEN [1] ELSE [] END |
               CREATE (:{label} {{
                 id: $id, name: $name, description: $description, properties: $properties
               }}))
             RETURN toString(existing) AS existing"
        ))
        .param("id", id)
        .param("name", data.name.as_str())
        .param("description", data.description.as_str())
        .param("properties", encode_node_properties(&data.properties)?)
        .returns(&["existing"]);

        let conflict = || GraphError::Conflict {
            label,
            id: id.to_string(),
        };

        let rows = match self.store.execute(&statement).await {
            // Lost a race with a concurrent create; the constraint caught it.
            Err(GraphError::ConstraintViolation(_)) => return Err(conflict()),
            other => other?,
        };
        if single_count(&rows, "existing")? > 0 {
            return Err(conflict());
        }

        tracing::debug!(label, id, "Created node");
        Ok(N::from_parts(id.to_string(), data.clone()))
    }

    async fn fetch(&self, id: &str) -> std::result::Result<Option<N>, GraphError> {
        let label = Self::label();
        let statement = Statement::new(format!(
            "MATCH (n:{label} {{id: $id}})
             RETURN {}",
            node_projection("n")
        ))
        .param("id", id)
        .returns(&NODE_COLUMNS)
        .idempotent();

        let mut rows = self.store.execute(&statement).await?;
        match rows.len() {
            0 => Ok(None),
            1 => node_from_record(&rows.remove(0)).map(Some),
            count => Err(GraphError::Ambiguous {
                label,
                id: id.to_string(),
                count,
            }),
        }
    }

    async fn replace(&self, id: &str, data: &NodeData) -> std::result::Result<N, GraphError> {
        let label = Self::label();
        let statement = Statement::new(format!(
            "MATCH (n:{label} {{id: $id}})
             WITH collect(n) AS matched
             FOREACH (n IN CASE WHEN size(matched) = 1 THEN matched ELSE [] END |
               SET n = {{
                 id: $id, name: $name, description: $description, properties: $properties
               }})
             RETURN toString(size(matched)) AS matched"
        ))
        .param("id", id)
        .param("name", data.name.as_str())
        .param("description", data.description.as_str())
        .param("properties", encode_node_properties(&data.properties)?)
        .returns(&["matched"]);

        let rows = self.store.execute(&statement).await?;
        match single_count(&rows, "matched")? {
            0 => Err(GraphError::NotFound {
                label,
                id: id.to_string(),
            }),
            1 => {
                tracing::debug!(label, id, "Updated node");
                Ok(N::from_parts(id.to_string(), data.clone()))
            }
            count => Err(GraphError::Ambiguous {
                label,
                id: id.to_string(),
                count,
            }),
        }
    }

    async fn remove(&self, id: &str) -> std::result::Result<bool, GraphError> {
        let label = Self::label();
        let statement = Statement::new(format!(
            "MATCH (n:{label} {{id: $id}})
             WITH collect(n) AS matched
             FOREACH (n IN CASE WHEN size(matched) = 1 THEN matched ELSE [] END |
               DETACH DELETE n)
             RETURN toString(size(matched)) AS matched"
        ))
        .param("id", id)
        .returns(&["matched"]);

        let rows = self.store.execute(&statement).await?;
        match single_count(&rows, "matched")? {
            0 => Ok(false),
            1 => {
                tracing::debug!(label, id, "Deleted node with its relationships");
                Ok(true)
            }
            count => Err(GraphError::Ambiguous {
                label,
                id: id.to_string(),
                count,
            }),
        }
    }
}
