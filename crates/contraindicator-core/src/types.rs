//! Core domain types for the Contraindicator graph.
//!
//! Products contain substances, and substances may be contraindicated with
//! other substances. These types are transient views of what the graph store
//! holds; the store is always the source of truth.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form string properties attached to a node or relationship.
pub type Properties = BTreeMap<String, String>;

// ── Identifiers ───────────────────────────────────────────────────

/// Generate a fresh opaque identifier (32 lowercase hex characters).
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Deterministic identifier for a well-known entity.
///
/// The same `(kind, name)` pair always yields the same id, so data keyed on
/// it can be written by several processes without creating duplicates.
pub fn well_known_id(kind: &str, name: &str) -> String {
    let key = format!("contraindicator/{kind}/{name}");
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
        .simple()
        .to_string()
}

// ── Labels ────────────────────────────────────────────────────────

/// Neo4j label of a node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    Product,
    Substance,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Substance => "Substance",
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type of relationship between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    /// Product → Substance.
    Contain,
    /// Substance → Substance. Directional: A→B says nothing about B→A.
    Contraindicate,
}

impl EdgeType {
    /// The Cypher relationship type.
    pub fn as_cypher(&self) -> &'static str {
        match self {
            Self::Contain => "CONTAIN",
            Self::Contraindicate => "CONTRAINDICATE",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cypher())
    }
}

// ── Node Types ────────────────────────────────────────────────────

/// Mutable payload shared by every node kind.
///
/// Updates replace this payload as a whole; there is no partial patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeData {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Option<Properties>,
}

impl NodeData {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }
}

/// A node about to be created. The id is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub data: NodeData,
}

impl NewNode {
    pub fn new(data: NodeData) -> Self {
        Self { id: None, data }
    }

    pub fn with_id(id: impl Into<String>, data: NodeData) -> Self {
        Self {
            id: Some(id.into()),
            data,
        }
    }

    /// The id to store: the supplied one, or a fresh one when absent or blank.
    pub fn resolve_id(&self) -> String {
        match self.id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => generate_id(),
        }
    }
}

/// Common behavior of the node kinds stored in the graph.
pub trait GraphNode: Clone + Send + Sync + 'static {
    const LABEL: NodeLabel;

    fn from_parts(id: String, data: NodeData) -> Self;
}

/// A consumer product made of one or more substances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(flatten)]
    pub data: NodeData,
}

impl GraphNode for Product {
    const LABEL: NodeLabel = NodeLabel::Product;

    fn from_parts(id: String, data: NodeData) -> Self {
        Self { id, data }
    }
}

/// A chemical or active ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substance {
    pub id: String,
    #[serde(flatten)]
    pub data: NodeData,
}

impl GraphNode for Substance {
    const LABEL: NodeLabel = NodeLabel::Substance;

    fn from_parts(id: String, data: NodeData) -> Self {
        Self { id, data }
    }
}

// ── Relationship Types ────────────────────────────────────────────

/// Common behavior of the relationship kinds stored in the graph.
pub trait GraphEdge:
    Clone + Default + Send + Sync + Serialize + DeserializeOwned + 'static
{
    const EDGE_TYPE: EdgeType;
    const SOURCE: NodeLabel;
    const TARGET: NodeLabel;

    fn from_properties(properties: Properties) -> Self;
    fn properties(&self) -> &Properties;
}

/// Payload of a Product → Substance containment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contain {
    #[serde(default)]
    pub properties: Properties,
}

impl GraphEdge for Contain {
    const EDGE_TYPE: EdgeType = EdgeType::Contain;
    const SOURCE: NodeLabel = NodeLabel::Product;
    const TARGET: NodeLabel = NodeLabel::Substance;

    fn from_properties(properties: Properties) -> Self {
        Self { properties }
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// Payload of a Substance → Substance contraindication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contraindicate {
    #[serde(default)]
    pub properties: Properties,
}

impl GraphEdge for Contraindicate {
    const EDGE_TYPE: EdgeType = EdgeType::Contraindicate;
    const SOURCE: NodeLabel = NodeLabel::Substance;
    const TARGET: NodeLabel = NodeLabel::Substance;

    fn from_properties(properties: Properties) -> Self {
        Self { properties }
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// A directed relationship between two nodes identified by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship<E> {
    pub source_id: String,
    pub target_id: String,
    pub data: E,
}

impl<E> Relationship<E> {
    pub fn new(source_id: impl Into<String>, target_id: impl Into<String>, data: E) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            data,
        }
    }
}

// ── Traversal Results ─────────────────────────────────────────────

/// A traversal hit: the reached node and the relationship that links it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem<E, N> {
    pub relationship: Relationship<E>,
    pub node: N,
}

/// A substance a product contains, with the containing edge.
pub type Ingredient = ListItem<Contain, Substance>;

/// A product that is unsafe in combination with another, linked by its own
/// Contain edge to the contraindicated substance.
pub type ProductContraindication = ListItem<Contain, Product>;

/// A substance directly contraindicated by another.
pub type SubstanceContraindication = ListItem<Contraindicate, Substance>;
