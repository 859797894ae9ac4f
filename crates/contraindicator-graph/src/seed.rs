//! Boot-time schema setup and first-run sample data.

use contraindicator_core::{well_known_id, Contain, Contraindicate, NewNode, NodeData};

use crate::entities::{ProductRepository, SubstanceRepository};
use crate::error::{ErrorKind, OperationError, Result};
use crate::relationships::{ContainRepository, ContraindicateRepository};
use crate::store::SharedStore;

const SCHEDULE_I: &str = "Schedule I drugs, substances, or chemicals are defined as drugs with \
no currently accepted medical use and a high potential for abuse.";

const PHYSICOCHEMICAL: &str = "These are properties such as pH of an aqueous solution, melting \
point / range, and refractive index. The procedures used for the measurement of these properties \
are usually unique and do not need much elaboration, e.g., capillary melting point, Abbé \
refractometry.";

/// What boot did to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The graph was empty and the sample data was written.
    Seeded,
    /// The graph already held data; nothing was written.
    AlreadyPresent,
    /// Seeding was turned off; only constraints were ensured.
    Disabled,
}

/// Ensure uniqueness constraints, then seed an empty graph when `enabled`.
///
/// Seed entities carry well-known ids, so a process racing another one at
/// cold start hits conflicts instead of writing a second copy; those
/// conflicts are swallowed.
pub async fn ensure_seed_data(store: &SharedStore, enabled: bool) -> Result<SeedOutcome> {
    store
        .ensure_schema_constraints()
        .await
        .map_err(|e| OperationError::logged("ensure_schema_constraints", "Schema", &[], e))?;

    if !enabled {
        tracing::info!("Seeding disabled");
        return Ok(SeedOutcome::Disabled);
    }

    let has_data = store
        .has_any_data()
        .await
        .map_err(|e| OperationError::logged("has_any_data", "Graph", &[], e))?;
    if has_data {
        tracing::debug!("Graph already populated, skipping seed");
        return Ok(SeedOutcome::AlreadyPresent);
    }

    seed(store).await?;
    tracing::info!("Seeded sample data");
    Ok(SeedOutcome::Seeded)
}

async fn seed(store: &SharedStore) -> Result<()> {
    let products = ProductRepository::new(store.clone());
    let substances = SubstanceRepository::new(store.clone());
    let contains = ContainRepository::new(store.clone());
    let contraindications = ContraindicateRepository::new(store.clone());

    let lsd = substance("lysergic acid diethylamide");
    let mdma = substance("methylenedioxymethamphetamine");
    let lsd_product = product("LSD", "Halocigenic");
    let mdma_product = product("Ecstacy", "Party Drug");

    let mut created = 0;
    for node in [&lsd, &mdma] {
        created += tolerate_conflict(substances.create(node.clone()).await.map(|_| ()))?;
    }
    for node in [&lsd_product, &mdma_product] {
        created += tolerate_conflict(products.create(node.clone()).await.map(|_| ()))?;
    }

    let id = |node: &NewNode| node.id.clone().unwrap_or_default();
    for (product, substance) in [(&lsd_product, &lsd), (&mdma_product, &mdma)] {
        let linked = contains
            .create(&id(product), &id(substance), Contain::default())
            .await;
        created += tolerate_conflict(linked.map(|_| ()))?;
    }
    let linked = contraindications
        .create(&id(&lsd), &id(&mdma), Contraindicate::default())
        .await;
    created += tolerate_conflict(linked.map(|_| ()))?;

    tracing::debug!(created, "Seed writes applied");
    Ok(())
}

/// 1 when the write happened, 0 when another writer got there first.
fn tolerate_conflict(result: Result<()>) -> Result<usize> {
    match result {
        Ok(()) => Ok(1),
        Err(OperationError {
            kind: ErrorKind::Conflict,
            ..
        }) => Ok(0),
        Err(e) => Err(e),
    }
}

fn substance(name: &str) -> NewNode {
    NewNode::with_id(
        well_known_id("substance", name),
        NodeData::new(name, SCHEDULE_I).with_property("Physicochemical", PHYSICOCHEMICAL),
    )
}

fn product(name: &str, description: &str) -> NewNode {
    NewNode::with_id(well_known_id("product", name), NodeData::new(name, description))
}
