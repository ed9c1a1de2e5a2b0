use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::{info, instrument};

use crate::db::DbPool;
use crate::entities::packaging_type;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Aggregate cost of a packaging type and everything nested inside it.
#[derive(Debug, Clone, Serialize)]
pub struct TotalCost {
    pub parent_id: i64,
    pub total_cost: Decimal,
}

/// One line per descendant packaging type, flattened in pre-order.
/// `count` is always 1 in the current bill layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillDetail {
    pub id: i64,
    pub name: String,
    pub cost: Decimal,
    pub count: u32,
}

/// Pre-order bill for a packaging type: the root's own attributes, the
/// rolled-up cost, and one detail line per descendant.
///
/// `children_count` is the sum of direct-child counts at the root and at
/// every descendant, not the number of nodes in the subtree. Downstream
/// consumers rely on this aggregate as-is.
#[derive(Debug, Clone, Serialize)]
pub struct PackageBill {
    pub parent_id: i64,
    pub parent_name: String,
    pub parent_cost: Decimal,
    pub total_cost: Decimal,
    pub children_count: u64,
    pub details: Vec<BillDetail>,
}

/// Nested tree snapshot of a packaging hierarchy, built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    pub id: i64,
    pub name: String,
    pub children: Vec<HierarchyNode>,
}

/// The fields of a packaging type the aggregations actually need.
#[derive(Debug, Clone)]
pub struct SubtreeNode {
    pub id: i64,
    pub name: String,
    pub cost: Decimal,
    pub quantity: Decimal,
}

impl From<&packaging_type::Model> for SubtreeNode {
    fn from(model: &packaging_type::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            cost: model.cost,
            quantity: model.quantity,
        }
    }
}

/// An owned in-memory arena holding one packaging subtree, loaded once per
/// operation. All aggregations run over the arena, so a single breadth-first
/// load replaces per-level queries during recursion and gives the loader one
/// place to reject circular parent chains.
#[derive(Debug)]
pub struct Subtree {
    root: i64,
    nodes: HashMap<i64, SubtreeNode>,
    children: HashMap<i64, Vec<i64>>,
}

impl Subtree {
    pub fn new(root: SubtreeNode) -> Self {
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            root: root_id,
            nodes,
            children: HashMap::new(),
        }
    }

    /// Attaches `node` under `parent_id`. The caller is responsible for
    /// ensuring `parent_id` is already present and `node` is not.
    pub fn attach(&mut self, parent_id: i64, node: SubtreeNode) {
        self.children.entry(parent_id).or_default().push(node.id);
        self.nodes.insert(node.id, node);
    }

    pub fn root_node(&self) -> &SubtreeNode {
        // The constructor guarantees the root is present.
        &self.nodes[&self.root]
    }

    fn children_of(&self, id: i64) -> &[i64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Node cost plus the total cost of every direct child, recursively.
    /// A childless node's total cost is its own cost.
    pub fn total_cost(&self) -> Decimal {
        self.cost_of(self.root)
    }

    fn cost_of(&self, id: i64) -> Decimal {
        let own = self.nodes[&id].cost;
        self.children_of(id)
            .iter()
            .fold(own, |acc, child| acc + self.cost_of(*child))
    }

    /// One BillDetail per strict descendant, in pre-order: each child's own
    /// line precedes its descendants' lines.
    pub fn details(&self) -> Vec<BillDetail> {
        let mut out = Vec::new();
        self.collect_details(self.root, &mut out);
        out
    }

    fn collect_details(&self, id: i64, out: &mut Vec<BillDetail>) {
        for child in self.children_of(id) {
            let node = &self.nodes[child];
            out.push(BillDetail {
                id: node.id,
                name: node.name.clone(),
                cost: node.cost,
                count: 1,
            });
            self.collect_details(*child, out);
        }
    }

    pub fn direct_child_count(&self, id: i64) -> u64 {
        self.children_of(id).len() as u64
    }

    /// The bill's children_count: direct children of the root plus, for each
    /// detail line, that line's own direct-child count.
    pub fn bill_children_count(&self, details: &[BillDetail]) -> u64 {
        details.iter().fold(self.direct_child_count(self.root), |acc, d| {
            acc + self.direct_child_count(d.id)
        })
    }

    pub fn hierarchy(&self) -> HierarchyNode {
        self.hierarchy_of(self.root)
    }

    fn hierarchy_of(&self, id: i64) -> HierarchyNode {
        let node = &self.nodes[&id];
        HierarchyNode {
            id: node.id,
            name: node.name.clone(),
            children: self
                .children_of(id)
                .iter()
                .map(|child| self.hierarchy_of(*child))
                .collect(),
        }
    }

    /// Every node id in the subtree, root first, in pre-order.
    pub fn preorder_ids(&self) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.push_preorder(self.root, &mut out);
        out
    }

    fn push_preorder(&self, id: i64, out: &mut Vec<i64>) {
        out.push(id);
        for child in self.children_of(id) {
            self.push_preorder(*child, out);
        }
    }
}

/// Recursive aggregations over the packaging type hierarchy: cost rollups,
/// pre-order bills, tree snapshots, and quantity propagation on sale.
#[derive(Clone)]
pub struct HierarchyService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl HierarchyService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Loads the subtree rooted at `root_id` breadth-first, one
    /// filter-by-parent query per node. Fails with `NotFound` when the root
    /// is absent and `CycleDetected` when a parent chain loops back onto a
    /// node already loaded.
    pub async fn load_subtree(&self, root_id: i64) -> Result<Subtree, ServiceError> {
        let db = &*self.db_pool;

        let root = packaging_type::Entity::find_by_id(root_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Packaging type {} not found", root_id))
            })?;

        let mut subtree = Subtree::new(SubtreeNode::from(&root));
        let mut visited: HashSet<i64> = HashSet::from([root_id]);
        let mut queue: VecDeque<i64> = VecDeque::from([root_id]);

        while let Some(parent_id) = queue.pop_front() {
            let children = packaging_type::Entity::find()
                .filter(packaging_type::Column::ParentId.eq(parent_id))
                .order_by_asc(packaging_type::Column::Id)
                .all(db)
                .await?;

            for child in &children {
                if !visited.insert(child.id) {
                    return Err(ServiceError::CycleDetected(child.id));
                }
                subtree.attach(parent_id, SubtreeNode::from(child));
                queue.push_back(child.id);
            }
        }

        Ok(subtree)
    }

    #[instrument(skip(self))]
    pub async fn get_total_cost(&self, packaging_type_id: i64) -> Result<TotalCost, ServiceError> {
        let subtree = self.load_subtree(packaging_type_id).await?;
        Ok(TotalCost {
            parent_id: packaging_type_id,
            total_cost: subtree.total_cost(),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_package_details(
        &self,
        packaging_type_id: i64,
    ) -> Result<PackageBill, ServiceError> {
        let subtree = self.load_subtree(packaging_type_id).await?;
        let details = subtree.details();
        let children_count = subtree.bill_children_count(&details);
        let root = subtree.root_node();

        Ok(PackageBill {
            parent_id: root.id,
            parent_name: root.name.clone(),
            parent_cost: root.cost,
            total_cost: subtree.total_cost(),
            children_count,
            details,
        })
    }

    /// Direct children only, ordered by id.
    #[instrument(skip(self))]
    pub async fn get_children(
        &self,
        parent_id: i64,
    ) -> Result<Vec<packaging_type::Model>, ServiceError> {
        let db = &*self.db_pool;

        packaging_type::Entity::find_by_id(parent_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Packaging type {} not found", parent_id))
            })?;

        let children = packaging_type::Entity::find()
            .filter(packaging_type::Column::ParentId.eq(parent_id))
            .order_by_asc(packaging_type::Column::Id)
            .all(db)
            .await?;

        Ok(children)
    }

    /// Direct-child count, the non-bill variant.
    #[instrument(skip(self))]
    pub async fn count_children(&self, parent_id: i64) -> Result<u64, ServiceError> {
        let children = self.get_children(parent_id).await?;
        Ok(children.len() as u64)
    }

    #[instrument(skip(self))]
    pub async fn get_hierarchy(&self, parent_id: i64) -> Result<HierarchyNode, ServiceError> {
        let subtree = self.load_subtree(parent_id).await?;
        Ok(subtree.hierarchy())
    }

    /// Decrements the on-hand quantity of `packaging_type_id` and of every
    /// descendant by the same absolute `amount`, one write per node in
    /// pre-order. Each decrement is atomic at the row level, but the walk is
    /// deliberately not wrapped in a transaction: a failure partway through
    /// leaves earlier nodes decremented. Returns the number of nodes updated.
    #[instrument(skip(self))]
    pub async fn propagate_quantity_decrement(
        &self,
        packaging_type_id: i64,
        amount: Decimal,
    ) -> Result<u64, ServiceError> {
        if amount < Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Decrement amount must be non-negative".to_string(),
            ));
        }

        let subtree = self.load_subtree(packaging_type_id).await?;
        let order = subtree.preorder_ids();
        let db = &*self.db_pool;

        for id in &order {
            packaging_type::Entity::update_many()
                .col_expr(
                    packaging_type::Column::Quantity,
                    Expr::col(packaging_type::Column::Quantity).sub(amount),
                )
                .col_expr(
                    packaging_type::Column::UpdatedAt,
                    Expr::value(chrono::Utc::now()),
                )
                .filter(packaging_type::Column::Id.eq(*id))
                .exec(db)
                .await?;
        }

        let nodes_updated = order.len() as u64;
        info!(
            root_id = packaging_type_id,
            %amount,
            nodes_updated,
            "Propagated quantity decrement"
        );

        self.event_sender
            .send_or_log(Event::QuantityPropagated {
                root_id: packaging_type_id,
                amount,
                nodes_updated,
            })
            .await;

        Ok(nodes_updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn node(id: i64, name: &str, cost: Decimal) -> SubtreeNode {
        SubtreeNode {
            id,
            name: name.to_string(),
            cost,
            quantity: dec!(100),
        }
    }

    /// root(10) -> a(5) -> grandchild(2), root -> b(3)
    fn three_level_tree() -> Subtree {
        let mut tree = Subtree::new(node(1, "Pallet", dec!(10)));
        tree.attach(1, node(2, "Case", dec!(5)));
        tree.attach(1, node(3, "Sleeve", dec!(3)));
        tree.attach(2, node(4, "Box", dec!(2)));
        tree
    }

    #[test]
    fn total_cost_sums_whole_subtree() {
        assert_eq!(three_level_tree().total_cost(), dec!(20));
    }

    #[test]
    fn childless_node_total_cost_is_own_cost() {
        let tree = Subtree::new(node(9, "Wrap", dec!(7)));
        assert_eq!(tree.total_cost(), dec!(7));
    }

    #[test]
    fn details_are_preorder_and_consistent_with_total() {
        let tree = three_level_tree();
        let details = tree.details();

        let ids: Vec<i64> = details.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![2, 4, 3]);
        assert!(details.iter().all(|d| d.count == 1));

        let sum: Decimal = details.iter().map(|d| d.cost).sum();
        assert_eq!(sum + tree.root_node().cost, tree.total_cost());
    }

    #[test]
    fn bill_children_count_sums_direct_counts_per_entry() {
        let tree = three_level_tree();
        let details = tree.details();
        // root has 2 direct children; Case has 1; Box and Sleeve have none.
        assert_eq!(tree.bill_children_count(&details), 3);
    }

    #[test]
    fn hierarchy_mirrors_parent_links() {
        let tree = three_level_tree();
        let root = tree.hierarchy();

        assert_eq!(root.id, 1);
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].id, 2);
        assert_eq!(root.children[0].children[0].id, 4);
        assert!(root.children[0].children[0].children.is_empty());
        assert_eq!(root.children[1].id, 3);
    }

    #[test]
    fn preorder_visits_root_first() {
        assert_eq!(three_level_tree().preorder_ids(), vec![1, 2, 4, 3]);
    }
}
