//! Integration tests for contraindicator-graph against a live Neo4j instance.
//!
//! Run with: cargo test --package contraindicator-graph --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available. Every test works on
//! freshly generated ids and removes what it wrote.

use std::sync::Arc;

use contraindicator_core::{
    generate_id, Contain, Contraindicate, NewNode, NodeData, Product, Properties, Substance,
};
use contraindicator_graph::{
    ContainRepository, ContraindicateRepository, ContraindicationResolver, ErrorKind,
    GraphClient, GraphConfig, GraphStore, ProductRepository, SharedStore, Statement,
    SubstanceRepository,
};

async fn connect_or_skip() -> Option<SharedStore> {
    let config = GraphConfig {
        max_retries: 0,
        ..GraphConfig::default()
    };
    match GraphClient::connect(&config).await {
        Ok(client) => {
            if let Err(e) = client.ensure_schema_constraints().await {
                eprintln!("Skipping integration test (Neo4j not usable): {e}");
                return None;
            }
            Some(Arc::new(client))
        }
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

async fn cleanup(store: &SharedStore, ids: &[&str]) {
    for id in ids {
        let statement = Statement::new("MATCH (n {id: $id}) DETACH DELETE n").param("id", *id);
        let _ = store.execute_void(&statement).await;
    }
}

struct Fixture {
    products: ProductRepository,
    substances: SubstanceRepository,
    contains: ContainRepository,
    contraindications: ContraindicateRepository,
    resolver: ContraindicationResolver,
}

impl Fixture {
    fn new(store: &SharedStore) -> Self {
        Self {
            products: ProductRepository::new(store.clone()),
            substances: SubstanceRepository::new(store.clone()),
            contains: ContainRepository::new(store.clone()),
            contraindications: ContraindicateRepository::new(store.clone()),
            resolver: ContraindicationResolver::new(store.clone()),
        }
    }

    async fn product(&self, name: &str) -> Product {
        self.products
            .create(NewNode::new(NodeData::new(name, "test product")))
            .await
            .unwrap()
    }

    async fn substance(&self, name: &str) -> Substance {
        self.substances
            .create(NewNode::new(NodeData::new(name, "test substance")))
            .await
            .unwrap()
    }

    /// Product with a caller-chosen id, for tests that depend on id order.
    async fn product_with_id(&self, id: &str) -> Product {
        self.products
            .create(NewNode::with_id(id, NodeData::new(id, "test product")))
            .await
            .unwrap()
    }

    async fn substance_with_id(&self, id: &str) -> Substance {
        self.substances
            .create(NewNode::with_id(id, NodeData::new(id, "test substance")))
            .await
            .unwrap()
    }

    async fn contain(&self, product: &str, substance: &str) {
        self.contains
            .create(product, substance, Contain::default())
            .await
            .unwrap();
    }

    async fn contraindicate(&self, source: &str, target: &str) {
        self.contraindications
            .create(source, target, Contraindicate::default())
            .await
            .unwrap();
    }
}

fn severity(level: &str) -> Contraindicate {
    let mut properties = Properties::new();
    properties.insert("severity".to_string(), level.to_string());
    Contraindicate { properties }
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn create_then_get_round_trips() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let repo = ProductRepository::new(store.clone());
    let id = generate_id();

    let supplied = NodeData::new("Aspirin", "Pain relief").with_property("form", "tablet");
    let created = repo
        .create(NewNode::with_id(id.clone(), supplied.clone()))
        .await
        .unwrap();
    assert_eq!(created.id, id);

    let fetched = repo.get(&id).await.unwrap().unwrap();
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.data, supplied);

    cleanup(&store, &[&id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn duplicate_id_conflicts_and_generated_ids_differ() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);

    let first = fx.substance("Caffeine").await;
    let second = fx.substance("Caffeine").await;
    assert_ne!(first.id, second.id);

    let err = fx
        .substances
        .create(NewNode::with_id(first.id.clone(), NodeData::new("Other", "")))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    cleanup(&store, &[&first.id, &second.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn update_replaces_and_drops_omitted_properties() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let repo = SubstanceRepository::new(store.clone());
    let created = repo
        .create(NewNode::new(
            NodeData::new("Ibuprofen", "NSAID").with_property("class", "propionic acid"),
        ))
        .await
        .unwrap();

    let replacement = NodeData::new("Ibuprofen", "Non-steroidal anti-inflammatory");
    let updated = repo.update(&created.id, replacement.clone()).await.unwrap();
    assert_eq!(updated.id, created.id);

    let fetched = repo.get(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched.data, replacement);
    assert_eq!(fetched.data.properties, None);

    let err = repo
        .update(&generate_id(), replacement)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    cleanup(&store, &[&created.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn deleting_product_removes_its_edges() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let product = fx.product("Tylenol").await;
    let substance = fx.substance("Acetaminophen").await;
    fx.contains
        .create(&product.id, &substance.id, Contain::default())
        .await
        .unwrap();

    assert!(fx.products.delete(&product.id).await.unwrap());
    assert_eq!(fx.products.get(&product.id).await.unwrap(), None);
    assert_eq!(
        fx.contains.get(&product.id, &substance.id).await.unwrap(),
        None
    );
    assert!(!fx.products.delete(&product.id).await.unwrap());

    cleanup(&store, &[&substance.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn contain_shows_up_as_single_ingredient() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let product = fx.product("Excedrin").await;
    let substance = fx.substance("Caffeine").await;

    fx.contains
        .create(&product.id, &substance.id, Contain::default())
        .await
        .unwrap();

    let ingredients = fx.resolver.ingredients(&product.id).await.unwrap();
    assert_eq!(ingredients.len(), 1);
    assert_eq!(ingredients[0].node.id, substance.id);
    assert_eq!(ingredients[0].relationship.source_id, product.id);

    let err = fx
        .contains
        .create(&product.id, &substance.id, Contain::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);

    let err = fx
        .contains
        .create(&product.id, &generate_id(), Contain::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);

    cleanup(&store, &[&product.id, &substance.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn contraindications_end_to_end() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let a = fx.substance("Warfarin").await;
    let b = fx.substance("Aspirin").await;
    let x = fx.product("Coumadin").await;
    let y = fx.product("Bayer").await;

    fx.contains.create(&x.id, &a.id, Contain::default()).await.unwrap();
    fx.contains.create(&y.id, &b.id, Contain::default()).await.unwrap();
    fx.contraindications
        .create(&a.id, &b.id, Contraindicate::default())
        .await
        .unwrap();

    let products = fx.resolver.product_contraindications(&x.id).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].node.id, y.id);
    assert_eq!(products[0].relationship.source_id, y.id);
    assert_eq!(products[0].relationship.target_id, b.id);

    let from_a = fx.resolver.substance_contraindications(&a.id).await.unwrap();
    assert_eq!(from_a.len(), 1);
    assert_eq!(from_a[0].node.id, b.id);
    assert!(fx
        .resolver
        .substance_contraindications(&b.id)
        .await
        .unwrap()
        .is_empty());

    assert!(fx.contraindications.delete(&a.id, &b.id).await.unwrap());
    assert!(fx
        .resolver
        .product_contraindications(&x.id)
        .await
        .unwrap()
        .is_empty());

    cleanup(&store, &[&a.id, &b.id, &x.id, &y.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn unknown_ids_read_as_absent() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let id = generate_id();

    assert_eq!(fx.products.get(&id).await.unwrap(), None);
    assert_eq!(fx.substances.get(&id).await.unwrap(), None);
    assert_eq!(fx.contains.get(&id, &id).await.unwrap(), None);
    assert!(fx.resolver.ingredients(&id).await.unwrap().is_empty());
    assert!(fx
        .resolver
        .product_contraindications(&id)
        .await
        .unwrap()
        .is_empty());
    assert!(fx
        .resolver
        .substance_contraindications(&id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn product_reached_through_two_paths_is_listed_once() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let p = fx.product("Combo").await;
    let s1a = fx.substance("Warfarin").await;
    let s1b = fx.substance("Heparin").await;
    let s2 = fx.substance("Aspirin").await;
    let q = fx.product("Bayer").await;

    fx.contain(&p.id, &s1a.id).await;
    fx.contain(&p.id, &s1b.id).await;
    fx.contraindicate(&s1a.id, &s2.id).await;
    fx.contraindicate(&s1b.id, &s2.id).await;
    fx.contain(&q.id, &s2.id).await;

    let products = fx.resolver.product_contraindications(&p.id).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].node.id, q.id);
    assert_eq!(products[0].relationship.target_id, s2.id);

    cleanup(&store, &[&p.id, &s1a.id, &s1b.id, &s2.id, &q.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn product_containing_both_sides_lists_itself() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let p = fx.product("Cold and Flu").await;
    let s1 = fx.substance("Pseudoephedrine").await;
    let s2 = fx.substance("Phenelzine").await;

    fx.contain(&p.id, &s1.id).await;
    fx.contain(&p.id, &s2.id).await;
    fx.contraindicate(&s1.id, &s2.id).await;

    let products = fx.resolver.product_contraindications(&p.id).await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].node.id, p.id);
    assert_eq!(products[0].relationship.source_id, p.id);
    assert_eq!(products[0].relationship.target_id, s2.id);

    cleanup(&store, &[&p.id, &s1.id, &s2.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn product_contraindications_order_by_product_then_substance() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let prefix = generate_id();
    let id = |suffix: &str| format!("{prefix}-{suffix}");
    let p = fx.product_with_id(&id("p")).await;
    let s1 = fx.substance_with_id(&id("s1")).await;
    let s2a = fx.substance_with_id(&id("s2a")).await;
    let s2b = fx.substance_with_id(&id("s2b")).await;
    let q0 = fx.product_with_id(&id("q0")).await;
    let q1 = fx.product_with_id(&id("q1")).await;

    fx.contain(&p.id, &s1.id).await;
    fx.contraindicate(&s1.id, &s2b.id).await;
    fx.contraindicate(&s1.id, &s2a.id).await;
    fx.contain(&q1.id, &s2b.id).await;
    fx.contain(&q1.id, &s2a.id).await;
    fx.contain(&q0.id, &s2a.id).await;

    let products = fx.resolver.product_contraindications(&p.id).await.unwrap();
    let order: Vec<(&str, &str)> = products
        .iter()
        .map(|item| (item.node.id.as_str(), item.relationship.target_id.as_str()))
        .collect();
    assert_eq!(
        order,
        [
            (q0.id.as_str(), s2a.id.as_str()),
            (q1.id.as_str(), s2a.id.as_str()),
            (q1.id.as_str(), s2b.id.as_str()),
        ]
    );

    cleanup(&store, &[&p.id, &s1.id, &s2a.id, &s2b.id, &q0.id, &q1.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn deleting_substance_removes_edges_in_both_directions() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let upstream = fx.substance("Warfarin").await;
    let middle = fx.substance("Aspirin").await;
    let downstream = fx.substance("Ibuprofen").await;
    let product = fx.product("Bayer").await;

    fx.contraindicate(&upstream.id, &middle.id).await;
    fx.contraindicate(&middle.id, &downstream.id).await;
    fx.contain(&product.id, &middle.id).await;

    assert!(fx.substances.delete(&middle.id).await.unwrap());

    assert_eq!(
        fx.contraindications.get(&upstream.id, &middle.id).await.unwrap(),
        None
    );
    assert_eq!(
        fx.contraindications.get(&middle.id, &downstream.id).await.unwrap(),
        None
    );
    assert_eq!(fx.contains.get(&product.id, &middle.id).await.unwrap(), None);
    assert!(fx.resolver.ingredients(&product.id).await.unwrap().is_empty());
    assert!(fx
        .resolver
        .substance_contraindications(&upstream.id)
        .await
        .unwrap()
        .is_empty());

    cleanup(&store, &[&upstream.id, &downstream.id, &product.id]).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn concurrent_edge_creates_have_one_winner() {
    let Some(store) = connect_or_skip().await else {
        return;
    };
    let fx = Fixture::new(&store);
    let a = fx.substance("Warfarin").await;
    let b = fx.substance("Aspirin").await;

    let (high, low) = tokio::join!(
        fx.contraindications.create(&a.id, &b.id, severity("high")),
        fx.contraindications.create(&a.id, &b.id, severity("low"))
    );

    let winner = match (high, low) {
        (Ok(edge), Err(err)) | (Err(err), Ok(edge)) => {
            assert_eq!(err.kind, ErrorKind::Conflict);
            edge
        }
        (high, low) => panic!("expected one winner, got {high:?} and {low:?}"),
    };
    let stored = fx.contraindications.get(&a.id, &b.id).await.unwrap().unwrap();
    assert_eq!(stored.data, winner.data);

    let markers = Statement::new(
        "MATCH (:Substance {id: $source_id})-[r:CONTRAINDICATE]->(:Substance {id: $target_id})
         WHERE r.created_by IS NOT NULL
         RETURN toString(count(r)) AS marked",
    )
    .param("source_id", a.id.as_str())
    .param("target_id", b.id.as_str())
    .returns(&["marked"])
    .idempotent();
    let rows = store.execute(&markers).await.unwrap();
    assert_eq!(rows[0].count("marked").unwrap(), 0);

    cleanup(&store, &[&a.id, &b.id]).await;
}
