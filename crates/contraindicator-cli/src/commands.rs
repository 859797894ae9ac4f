//! Command-line surface and dispatch onto the repositories.

use std::io::Read;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use contraindicator_core::{GraphEdge, GraphNode, NewNode, NodeData};
use contraindicator_graph::{
    ensure_seed_data, ContainRepository, ContraindicateRepository, ContraindicationResolver,
    EntityRepository, ProductRepository, RelationshipRepository, SeedOutcome, SharedStore,
    SubstanceRepository,
};

#[derive(Debug, Parser)]
#[command(name = "contraindicator")]
#[command(about = "Products, substances and their contraindications in Neo4j")]
pub struct Cli {
    /// Config file prefix (default: contraindicator).
    #[arg(short, long, default_value = "contraindicator")]
    pub config: String,

    /// Skip seeding an empty graph on startup.
    #[arg(long)]
    pub no_seed: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ensure constraints and seed sample data into an empty graph.
    Seed,
    /// Manage products.
    Product {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Manage substances.
    Substance {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Manage product -> substance containment.
    Contain {
        #[command(subcommand)]
        action: EdgeAction,
    },
    /// Manage substance -> substance contraindications.
    Contraindicate {
        #[command(subcommand)]
        action: EdgeAction,
    },
    /// List the substances a product contains.
    Ingredients { product_id: String },
    /// List products unsafe to combine with a product.
    ProductContraindications { product_id: String },
    /// List substances a substance is contraindicated with.
    SubstanceContraindications { substance_id: String },
}

/// Node operations. `create` and `update` read a JSON payload from stdin.
#[derive(Debug, Subcommand)]
pub enum NodeAction {
    Create,
    Get { id: String },
    Update { id: String },
    Delete { id: String },
}

#[derive(Debug, Clone, Args)]
pub struct EdgeArgs {
    /// Source node id.
    #[arg(long)]
    pub source: String,

    /// Target node id.
    #[arg(long)]
    pub target: String,
}

/// Edge operations. `create` and `update` read an optional JSON payload
/// from stdin; an empty payload means no properties.
#[derive(Debug, Subcommand)]
pub enum EdgeAction {
    Create(EdgeArgs),
    Get(EdgeArgs),
    Update(EdgeArgs),
    Delete(EdgeArgs),
}

impl Command {
    /// Whether startup seeding should be skipped for this command.
    pub fn seeds_itself(&self) -> bool {
        matches!(self, Self::Seed)
    }
}

/// Run `command` against `store`, reading payloads from `input`.
pub async fn dispatch(
    command: Command,
    store: &SharedStore,
    input: &mut dyn Read,
) -> anyhow::Result<Value> {
    match command {
        Command::Seed => {
            let outcome = ensure_seed_data(store, true).await?;
            Ok(json!({ "outcome": outcome_name(outcome) }))
        }
        Command::Product { action } => {
            node(ProductRepository::new(store.clone()), action, input).await
        }
        Command::Substance { action } => {
            node(SubstanceRepository::new(store.clone()), action, input).await
        }
        Command::Contain { action } => {
            edge(ContainRepository::new(store.clone()), action, input).await
        }
        Command::Contraindicate { action } => {
            edge(ContraindicateRepository::new(store.clone()), action, input).await
        }
        Command::Ingredients { product_id } => {
            let resolver = ContraindicationResolver::new(store.clone());
            to_json(resolver.ingredients(&product_id).await?)
        }
        Command::ProductContraindications { product_id } => {
            let resolver = ContraindicationResolver::new(store.clone());
            to_json(resolver.product_contraindications(&product_id).await?)
        }
        Command::SubstanceContraindications { substance_id } => {
            let resolver = ContraindicationResolver::new(store.clone());
            to_json(resolver.substance_contraindications(&substance_id).await?)
        }
    }
}

pub fn outcome_name(outcome: SeedOutcome) -> &'static str {
    match outcome {
        SeedOutcome::Seeded => "seeded",
        SeedOutcome::AlreadyPresent => "already_present",
        SeedOutcome::Disabled => "disabled",
    }
}

async fn node<N: GraphNode + Serialize>(
    repo: EntityRepository<N>,
    action: NodeAction,
    input: &mut dyn Read,
) -> anyhow::Result<Value> {
    match action {
        NodeAction::Create => {
            let payload: NewNode = parse_required(&read_payload(input)?)?;
            to_json(repo.create(payload).await?)
        }
        NodeAction::Get { id } => to_json(repo.get(&id).await?),
        NodeAction::Update { id } => {
            let payload: NodeData = parse_required(&read_payload(input)?)?;
            to_json(repo.update(&id, payload).await?)
        }
        NodeAction::Delete { id } => Ok(json!({ "deleted": repo.delete(&id).await? })),
    }
}

async fn edge<E: GraphEdge>(
    repo: RelationshipRepository<E>,
    action: EdgeAction,
    input: &mut dyn Read,
) -> anyhow::Result<Value> {
    match action {
        EdgeAction::Create(args) => {
            let payload: E = parse_optional(&read_payload(input)?)?;
            to_json(repo.create(&args.source, &args.target, payload).await?)
        }
        EdgeAction::Get(args) => to_json(repo.get(&args.source, &args.target).await?),
        EdgeAction::Update(args) => {
            let payload: E = parse_optional(&read_payload(input)?)?;
            to_json(repo.update(&args.source, &args.target, payload).await?)
        }
        EdgeAction::Delete(args) => Ok(json!({
            "deleted": repo.delete(&args.source, &args.target).await?
        })),
    }
}

fn read_payload(input: &mut dyn Read) -> anyhow::Result<String> {
    let mut raw = String::new();
    input
        .read_to_string(&mut raw)
        .context("Failed to read payload from stdin")?;
    Ok(raw)
}

/// Decode a payload that must be present.
pub fn parse_required<T: DeserializeOwned>(raw: &str) -> anyhow::Result<T> {
    if raw.trim().is_empty() {
        anyhow::bail!("Expected a JSON payload on stdin");
    }
    serde_json::from_str(raw).context("Invalid JSON payload")
}

/// Decode a payload that defaults when stdin is empty.
pub fn parse_optional<T: DeserializeOwned + Default>(raw: &str) -> anyhow::Result<T> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(raw).context("Invalid JSON payload")
}

fn to_json<T: Serialize>(value: T) -> anyhow::Result<Value> {
    serde_json::to_value(value).context("Failed to encode result")
}
