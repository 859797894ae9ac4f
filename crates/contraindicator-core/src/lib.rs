//! contraindicator-core: Shared domain types for the Contraindicator graph.
//!
//! This crate provides the foundational types used across all Contraindicator components:
//! - Node types (Product, Substance) and their shared payload
//! - Relationship types (Contain, Contraindicate) and traversal result items
//! - Identifier generation

pub mod types;

pub use types::{
    Contain, Contraindicate, EdgeType, GraphEdge, GraphNode, Ingredient, ListItem, NewNode,
    NodeData, NodeLabel, Product, ProductContraindication, Properties, Relationship, Substance,
    SubstanceContraindication,
};
pub use types::{generate_id, well_known_id};
