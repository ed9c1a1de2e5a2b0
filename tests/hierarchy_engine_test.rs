//! Integration tests for HierarchyService against a mocked database.
//!
//! Covers:
//! - Cost rollup across a three-level tree
//! - Pre-order package bills and their children_count aggregate
//! - Direct child counting and nested hierarchy snapshots
//! - Quantity decrement propagation across the subtree
//! - Missing roots and circular parent chains

use assert_matches::assert_matches;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
use std::sync::Arc;
use tokio::sync::mpsc;

use packhouse_api::{
    entities::packaging_type,
    errors::ServiceError,
    events::{Event, EventSender},
    services::HierarchyService,
};

fn packaging_type(id: i64, name: &str, cost: Decimal, parent_id: Option<i64>) -> packaging_type::Model {
    packaging_type::Model {
        id,
        name: name.to_string(),
        description: format!("{} packaging", name),
        weight: 1.0,
        volume: 1.0,
        length: 10.0,
        width: 10.0,
        height: 10.0,
        material_id: 1,
        cost,
        quantity: dec!(100),
        level: "unit".to_string(),
        parent_id,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

/// Query results for loading the three-level tree rooted at 1:
/// Pallet(1, cost 10) -> Case(2, cost 5) -> Box(4, cost 2), Pallet -> Sleeve(3, cost 3).
/// The loader walks breadth-first, one children query per visited node.
fn three_level_tree_queries(mock: MockDatabase) -> MockDatabase {
    mock.append_query_results([vec![packaging_type(1, "Pallet", dec!(10), None)]])
        .append_query_results([
            vec![
                packaging_type(2, "Case", dec!(5), Some(1)),
                packaging_type(3, "Sleeve", dec!(3), Some(1)),
            ],
            vec![packaging_type(4, "Box", dec!(2), Some(2))],
            Vec::<packaging_type::Model>::new(),
            Vec::<packaging_type::Model>::new(),
        ])
}

fn service(db: DatabaseConnection) -> (HierarchyService, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(16);
    let svc = HierarchyService::new(Arc::new(db), Arc::new(EventSender::new(tx)));
    (svc, rx)
}

#[tokio::test]
async fn total_cost_rolls_up_three_levels() {
    let db = three_level_tree_queries(MockDatabase::new(DatabaseBackend::Postgres))
        .into_connection();
    let (svc, _rx) = service(db);

    let total = svc.get_total_cost(1).await.unwrap();

    assert_eq!(total.parent_id, 1);
    assert_eq!(total.total_cost, dec!(20));
}

#[tokio::test]
async fn total_cost_of_leaf_is_its_own_cost() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![packaging_type(3, "Sleeve", dec!(3), Some(1))]])
        .append_query_results([Vec::<packaging_type::Model>::new()])
        .into_connection();
    let (svc, _rx) = service(db);

    let total = svc.get_total_cost(3).await.unwrap();

    assert_eq!(total.total_cost, dec!(3));
}

#[tokio::test]
async fn package_details_flatten_descendants_in_preorder() {
    let db = three_level_tree_queries(MockDatabase::new(DatabaseBackend::Postgres))
        .into_connection();
    let (svc, _rx) = service(db);

    let bill = svc.get_package_details(1).await.unwrap();

    assert_eq!(bill.parent_id, 1);
    assert_eq!(bill.parent_name, "Pallet");
    assert_eq!(bill.parent_cost, dec!(10));
    assert_eq!(bill.total_cost, dec!(20));

    let ids: Vec<i64> = bill.details.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![2, 4, 3]);
    assert!(bill.details.iter().all(|d| d.count == 1));

    let detail_sum: Decimal = bill.details.iter().map(|d| d.cost).sum();
    assert_eq!(detail_sum + bill.parent_cost, bill.total_cost);

    // Direct children of the root (2) plus the direct children of each
    // detail line (Case has 1, Box and Sleeve have none).
    assert_eq!(bill.children_count, 3);
}

#[tokio::test]
async fn count_children_counts_direct_children_only() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![packaging_type(1, "Pallet", dec!(10), None)]])
        .append_query_results([vec![
            packaging_type(2, "Case", dec!(5), Some(1)),
            packaging_type(3, "Sleeve", dec!(3), Some(1)),
        ]])
        .into_connection();
    let (svc, _rx) = service(db);

    assert_eq!(svc.count_children(1).await.unwrap(), 2);
}

#[tokio::test]
async fn hierarchy_mirrors_parent_links() {
    let db = three_level_tree_queries(MockDatabase::new(DatabaseBackend::Postgres))
        .into_connection();
    let (svc, _rx) = service(db);

    let root = svc.get_hierarchy(1).await.unwrap();

    assert_eq!(root.id, 1);
    assert_eq!(root.name, "Pallet");
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].id, 2);
    assert_eq!(root.children[0].children.len(), 1);
    assert_eq!(root.children[0].children[0].id, 4);
    assert!(root.children[0].children[0].children.is_empty());
    assert_eq!(root.children[1].id, 3);
    assert!(root.children[1].children.is_empty());
}

#[tokio::test]
async fn propagate_decrement_updates_every_node() {
    let db = three_level_tree_queries(MockDatabase::new(DatabaseBackend::Postgres))
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .into_connection();
    let (svc, mut rx) = service(db);

    let updated = svc.propagate_quantity_decrement(1, dec!(5)).await.unwrap();

    assert_eq!(updated, 4);
    match rx.recv().await {
        Some(Event::QuantityPropagated {
            root_id,
            amount,
            nodes_updated,
        }) => {
            assert_eq!(root_id, 1);
            assert_eq!(amount, dec!(5));
            assert_eq!(nodes_updated, 4);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn propagate_rejects_negative_amount() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (svc, _rx) = service(db);

    let err = svc.propagate_quantity_decrement(1, dec!(-1)).await.unwrap_err();

    assert_matches!(err, ServiceError::InvalidInput(_));
}

#[tokio::test]
async fn missing_root_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<packaging_type::Model>::new()])
        .into_connection();
    let (svc, _rx) = service(db);

    let err = svc.get_total_cost(42).await.unwrap_err();

    match err {
        ServiceError::NotFound(msg) => assert!(msg.contains("42")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn circular_parent_chain_is_rejected() {
    // 1 -> 2 and 2 -> 1: walking 2's children revisits node 1.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![packaging_type(1, "Pallet", dec!(10), Some(2))]])
        .append_query_results([
            vec![packaging_type(2, "Case", dec!(5), Some(1))],
            vec![packaging_type(1, "Pallet", dec!(10), Some(2))],
        ])
        .into_connection();
    let (svc, _rx) = service(db);

    let err = svc.get_total_cost(1).await.unwrap_err();

    assert_matches!(err, ServiceError::CycleDetected(1));
}
