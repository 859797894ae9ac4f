//! Read-only traversals answering the contraindication questions.

use contraindicator_core::{
    GraphEdge, GraphNode, Ingredient, ListItem, ProductContraindication, SubstanceContraindication,
};

use crate::codec::{edge_from_record, edge_projection, node_from_record, node_projection};
use crate::codec::{EDGE_COLUMNS, NODE_COLUMNS};
use crate::error::{GraphError, OperationError, Result};
use crate::store::{SharedStore, Statement};

/// Traversals over the Contain / Contraindicate graph.
///
/// Unknown ids are not an error: every query returns an empty list when
/// nothing matches.
#[derive(Clone)]
pub struct ContraindicationResolver {
    store: SharedStore,
}

impl ContraindicationResolver {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Substances contained in the product, ordered by substance id.
    pub async fn ingredients(&self, product_id: &str) -> Result<Vec<Ingredient>> {
        let statement = Statement::new(format!(
            "MATCH (p:Product {{id: $product_id}})-[r:CONTAIN]->(s:Substance)
             RETURN {}, {}
             ORDER BY id",
            edge_projection("p", "r", "s"),
            node_projection("s")
        ))
        .param("product_id", product_id)
        .returns(&EDGE_COLUMNS)
        .returns(&NODE_COLUMNS)
        .idempotent();

        self.list(&statement)
            .await
            .map_err(|e| OperationError::logged("ingredients", "Product", &[product_id], e))
    }

    /// Products unsafe to combine with the given one.
    ///
    /// Follows `P -CONTAIN-> S1 -CONTRAINDICATE-> S2 <-CONTAIN- Q` and yields
    /// each Q with its own Contain edge to S2, once per distinct edge, ordered
    /// by Q id then by S2 id. P itself is included when the graph links it.
    pub async fn product_contraindications(
        &self,
        product_id: &str,
    ) -> Result<Vec<ProductContraindication>> {
        let statement = Statement::new(format!(
            "MATCH (p:Product {{id: $product_id}})-[:CONTAIN]->(:Substance)
                   -[:CONTRAINDICATE]->(s2:Substance)
             MATCH (q:Product)-[r:CONTAIN]->(s2)
             WITH DISTINCT r, q, s2
             RETURN {}, {}
             ORDER BY id, target_id",
            edge_projection("q", "r", "s2"),
            node_projection("q")
        ))
        .param("product_id", product_id)
        .returns(&EDGE_COLUMNS)
        .returns(&NODE_COLUMNS)
        .idempotent();

        self.list(&statement).await.map_err(|e| {
            OperationError::logged("product_contraindications", "Product", &[product_id], e)
        })
    }

    /// Substances the given one is directly contraindicated with, ordered by
    /// target id. Direction matters: `A -> B` does not list A under B.
    pub async fn substance_contraindications(
        &self,
        substance_id: &str,
    ) -> Result<Vec<SubstanceContraindication>> {
        let statement = Statement::new(format!(
            "MATCH (a:Substance {{id: $substance_id}})-[r:CONTRAINDICATE]->(b:Substance)
             RETURN {}, {}
             ORDER BY id",
            edge_projection("a", "r", "b"),
            node_projection("b")
        ))
        .param("substance_id", substance_id)
        .returns(&EDGE_COLUMNS)
        .returns(&NODE_COLUMNS)
        .idempotent();

        self.list(&statement).await.map_err(|e| {
            OperationError::logged("substance_contraindications", "Substance", &[substance_id], e)
        })
    }

    async fn list<E: GraphEdge, N: GraphNode>(
        &self,
        statement: &Statement,
    ) -> std::result::Result<Vec<ListItem<E, N>>, GraphError> {
        let rows = self.store.execute(statement).await?;
        rows.iter()
            .map(|row| {
                Ok(ListItem {
                    relationship: edge_from_record(row)?,
                    node: node_from_record(row)?,
                })
            })
            .collect()
    }
}
