//! Contraindicator Graph: the Neo4j data-access layer.
//!
//! All reads and writes of Products, Substances and the edges between them
//! flow through the repositories in this crate, which talk to the database
//! only via the [`GraphStore`] trait.

pub mod client;
mod codec;
pub mod entities;
pub mod error;
pub mod relationships;
pub mod resolver;
pub mod seed;
pub mod store;

#[cfg(test)]
mod mock;

pub use client::{GraphClient, GraphConfig};
pub use entities::{EntityRepository, ProductRepository, SubstanceRepository};
pub use error::{ErrorKind, GraphError, OperationError, Result};
pub use relationships::{ContainRepository, ContraindicateRepository, RelationshipRepository};
pub use resolver::ContraindicationResolver;
pub use seed::{ensure_seed_data, SeedOutcome};
pub use store::{GraphStore, Record, SharedStore, Statement};
