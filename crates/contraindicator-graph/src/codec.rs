//! Mapping between domain types and stored properties / projected rows.
//!
//! Neo4j properties cannot hold maps, so property maps are stored as JSON
//! text. Node projections use the columns in [`NODE_COLUMNS`], edge
//! projections the ones in [`EDGE_COLUMNS`].

use contraindicator_core::{GraphEdge, GraphNode, NodeData, Properties, Relationship};

use crate::error::GraphError;
use crate::store::Record;

pub(crate) const NODE_COLUMNS: [&str; 4] = ["id", "name", "description", "properties"];

pub(crate) const EDGE_COLUMNS: [&str; 3] = ["source_id", "target_id", "edge_properties"];

/// JSON text of an optional node property map (`"null"` when absent).
pub(crate) fn encode_node_properties(properties: &Option<Properties>) -> Result<String, GraphError> {
    serde_json::to_string(properties).map_err(|e| GraphError::Serialization(e.to_string()))
}

/// JSON text of a relationship property map.
pub(crate) fn encode_edge_properties(properties: &Properties) -> Result<String, GraphError> {
    serde_json::to_string(properties).map_err(|e| GraphError::Serialization(e.to_string()))
}

/// Build a node from a row projected with [`NODE_COLUMNS`].
pub(crate) fn node_from_record<N: GraphNode>(record: &Record) -> Result<N, GraphError> {
    let data = NodeData {
        name: record.get("name").unwrap_or_default().to_string(),
        description: record.get("description").unwrap_or_default().to_string(),
        properties: record.json("properties")?,
    };
    Ok(N::from_parts(record.text("id")?.to_string(), data))
}

/// Build a relationship from a row projected with [`EDGE_COLUMNS`].
///
/// Edges written by other tools may lack the properties string entirely;
/// those decode as an empty map.
pub(crate) fn edge_from_record<E: GraphEdge>(
    record: &Record,
) -> Result<Relationship<E>, GraphError> {
    let properties: Option<Properties> = record.json("edge_properties")?;
    Ok(Relationship::new(
        record.text("source_id")?,
        record.text("target_id")?,
        E::from_properties(properties.unwrap_or_default()),
    ))
}

/// Cypher projection for a node bound to `var`, matching [`NODE_COLUMNS`].
pub(crate) fn node_projection(var: &str) -> String {
    format!(
        "{var}.id AS id, {var}.name AS name, \
         {var}.description AS description, {var}.properties AS properties"
    )
}

/// Cypher projection for an edge `rel` between `source` and `target`,
/// matching [`EDGE_COLUMNS`].
pub(crate) fn edge_projection(source: &str, rel: &str, target: &str) -> String {
    format!(
        "{source}.id AS source_id, {target}.id AS target_id, \
         {rel}.properties AS edge_properties"
    )
}
