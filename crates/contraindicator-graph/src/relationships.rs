//! Relationship repository: CRUD for Contain and Contraindicate edges.
//!
//! An edge is addressed by its ordered `(source_id, target_id)` pair. At most
//! one edge of a given type may exist per pair; creation merges on the bound
//! endpoints so concurrent creators converge on a single edge, and every
//! creator but the one that wrote it gets a conflict.

use std::marker::PhantomData;

use contraindicator_core::{generate_id, Contain, Contraindicate, GraphEdge, Relationship};

use crate::codec::{edge_from_record, edge_projection, encode_edge_properties, EDGE_COLUMNS};
use crate::error::{GraphError, OperationError, Result};
use crate::store::{single_count, Record, SharedStore, Statement};

pub type ContainRepository = RelationshipRepository<Contain>;
pub type ContraindicateRepository = RelationshipRepository<Contraindicate>;

/// CRUD over one relationship kind.
pub struct RelationshipRepository<E> {
    store: SharedStore,
    _kind: PhantomData<fn() -> E>,
}

impl<E> Clone for RelationshipRepository<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _kind: PhantomData,
        }
    }
}

impl<E: GraphEdge> RelationshipRepository<E> {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            _kind: PhantomData,
        }
    }

    fn edge_type() -> &'static str {
        E::EDGE_TYPE.as_cypher()
    }

    /// `MATCH` clause binding `a`, `r` and `b` for the addressed edge.
    fn match_edge() -> String {
        format!(
            "MATCH (a:{} {{id: $source_id}})-[r:{}]->(b:{} {{id: $target_id}})",
            E::SOURCE,
            Self::edge_type(),
            E::TARGET
        )
    }

    /// Link two existing nodes.
    ///
    /// Fails with not-found naming the missing endpoint, or with a conflict
    /// when the pair is already linked.
    pub async fn create(
        &self,
        source_id: &str,
        target_id: &str,
        data: E,
    ) -> Result<Relationship<E>> {
        self.link(source_id, target_id, data).await.map_err(|e| {
            OperationError::logged("create", Self::edge_type(), &[source_id, target_id], e)
        })
    }

    pub async fn get(&self, source_id: &str, target_id: &str) -> Result<Option<Relationship<E>>> {
        self.fetch(source_id, target_id).await.map_err(|e| {
            OperationError::logged("get", Self::edge_type(), &[source_id, target_id], e)
        })
    }

    /// Replace the edge payload as a whole.
    pub async fn update(
        &self,
        source_id: &str,
        target_id: &str,
        data: E,
    ) -> Result<Relationship<E>> {
        self.replace(source_id, target_id, data).await.map_err(|e| {
            OperationError::logged("update", Self::edge_type(), &[source_id, target_id], e)
        })
    }

    /// Remove the edge. Returns whether an edge was removed.
    pub async fn delete(&self, source_id: &str, target_id: &str) -> Result<bool> {
        self.unlink(source_id, target_id).await.map_err(|e| {
            OperationError::logged("delete", Self::edge_type(), &[source_id, target_id], e)
        })
    }

    async fn link(
        &self,
        source_id: &str,
        target_id: &str,
        data: E,
    ) -> std::result::Result<Relationship<E>, GraphError> {
        let (source, edge_type, target) = (E::SOURCE, Self::edge_type(), E::TARGET);
        // MERGE serializes concurrent creators on the bound endpoints; the
        // token tells this call whether its own ON CREATE branch ran.
        let statement = Statement::new(format!(
            "OPTIONAL MATCH (a:{source} {{id: $source_id}})
             WITH collect(a) AS sources
             OPTIONAL MATCH (b:{target} {{id: $target_id}})
             WITH sources, collect(b) AS targets
             FOREACH (a IN CASE WHEN size(sources) = 1 AND size(targets) = 1
                               THEN sources ELSE [] END |
               FOREACH (b IN targets |
                 MERGE (a)-[r:{edge_type}]->(b)
                 ON CREATE SET r.properties = $properties, r.created_by = $token))
             WITH sources, targets
             OPTIONAL MATCH (:{source} {{id: $source_id}})
                   -[mine:{edge_type} {{created_by: $token}}]->(:{target} {{id: $target_id}})
             WITH sources, targets, collect(mine) AS mine
             FOREACH (r IN mine | REMOVE r.created_by)
             RETURN toString(size(sources)) AS sources,
                    toString(size(targets)) AS targets,
                    toString(size(mine)) AS created"
        ))
        .param("source_id", source_id)
        .param("target_id", target_id)
        .param("properties", encode_edge_properties(data.properties())?)
        .param("token", generate_id())
        .returns(&["sources", "targets", "created"]);

        let rows = self.store.execute(&statement).await?;
        let [row] = rows.as_slice() else {
            return Err(GraphError::Serialization(format!(
                "Expected one aggregate row, got {}",
                rows.len()
            )));
        };

        check_endpoint(row, "sources", source.as_str(), source_id)?;
        check_endpoint(row, "targets", target.as_str(), target_id)?;
        // The MERGE matched an edge that was already there, possibly one a
        // concurrent creator wrote a moment earlier.
        if row.count("created")? == 0 {
            return Err(GraphError::Conflict {
                label: edge_type,
                id: pair_id(source_id, target_id),
            });
        }

        tracing::debug!(edge_type, source_id, target_id, "Created relationship");
        Ok(Relationship::new(source_id, target_id, data))
    }

    async fn fetch(
        &self,
        source_id: &str,
        target_id: &str,
    ) -> std::result::Result<Option<Relationship<E>>, GraphError> {
        let statement = Statement::new(format!(
            "{}
             RETURN {}",
            Self::match_edge(),
            edge_projection("a", "r", "b")
        ))
        .param("source_id", source_id)
        .param("target_id", target_id)
        .returns(&EDGE_COLUMNS)
        .idempotent();

        let mut rows = self.store.execute(&statement).await?;
        match rows.len() {
            0 => Ok(None),
            1 => edge_from_record(&rows.remove(0)).map(Some),
            count => Err(GraphError::Ambiguous {
                label: Self::edge_type(),
                id: pair_id(source_id, target_id),
                count,
            }),
        }
    }

    async fn replace(
        &self,
        source_id: &str,
        target_id: &str,
        data: E,
    ) -> std::result::Result<Relationship<E>, GraphError> {
        let statement = Statement::new(format!(
            "{}
             WITH collect(r) AS matched
             FOREACH (r IN CASE WHEN size(matched) = 1 THEN matched ELSE [] END |
               SET r.properties = $properties)
             RETURN toString(size(matched)) AS matched",
            Self::match_edge()
        ))
        .param("source_id", source_id)
        .param("target_id", target_id)
        .param("properties", encode_edge_properties(data.properties())?)
        .returns(&["matched"]);

        let rows = self.store.execute(&statement).await?;
        match single_count(&rows, "matched")? {
            0 => Err(GraphError::NotFound {
                label: Self::edge_type(),
                id: pair_id(source_id, target_id),
            }),
            1 => Ok(Relationship::new(source_id, target_id, data)),
            count => Err(GraphError::Ambiguous {
                label: Self::edge_type(),
                id: pair_id(source_id, target_id),
                count,
            }),
        }
    }

    async fn unlink(&self, source_id: &str, target_id: &str) -> std::result::Result<bool, GraphError> {
        let statement = Statement::new(format!(
            "{}
             WITH collect(r) AS matched
             FOREACH (r IN CASE WHEN size(matched) = 1 THEN matched ELSE [] END |
               DELETE r)
             RETURN toString(size(matched)) AS matched",
            Self::match_edge()
        ))
        .param("source_id", source_id)
        .param("target_id", target_id)
        .returns(&["matched"]);

        let rows = self.store.execute(&statement).await?;
        match single_count(&rows, "matched")? {
            0 => Ok(false),
            1 => {
                tracing::debug!(
                    edge_type = Self::edge_type(),
                    source_id,
                    target_id,
                    "Deleted relationship"
                );
                Ok(true)
            }
            count => Err(GraphError::Ambiguous {
                label: Self::edge_type(),
                id: pair_id(source_id, target_id),
                count,
            }),
        }
    }
}

/// Endpoint matches must be exactly one.
fn check_endpoint(
    row: &Record,
    column: &str,
    label: &'static str,
    id: &str,
) -> std::result::Result<(), GraphError> {
    match row.count(column)? {
        1 => Ok(()),
        0 => Err(GraphError::NotFound {
            label,
            id: id.to_string(),
        }),
        count => Err(GraphError::Ambiguous {
            label,
            id: id.to_string(),
            count,
        }),
    }
}

fn pair_id(source_id: &str, target_id: &str) -> String {
    format!("{source_id}->{target_id}")
}
