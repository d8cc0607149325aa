//! Chawathe edit script generation.
//!
//! Turns a matching into Update, Insert, Move and Delete operations that
//! transform the left tree into the right one.
//! Based on "Change Detection in Hierarchically Structured Information"
//! (Chawathe et al., 1996).
//!
//! The phases run in this order:
//! 1. Update: matched pairs whose values differ
//! 2. Insert: unmatched right nodes, breadth-first so parents come first
//! 3. Move: matched pairs whose parents are not partners, or which fall
//!    outside the longest common subsequence of their partnered siblings
//! 4. Delete: unmatched left nodes, in postorder so children go first

use crate::debug;
use core::fmt;

use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

use crate::matching::{Matching, check_roots};
use crate::tree::Tree;
use crate::TreeError;

/// A primitive tree edit.
#[derive(Clone, PartialEq, Eq)]
pub enum EditOp {
    /// A right node has no partner.
    Insert {
        /// The new node in the right tree
        node: NodeId,
        /// Its parent in the right tree
        parent: NodeId,
        /// Position among siblings (0-indexed)
        position: usize,
    },

    /// A left node has no partner.
    Delete {
        /// The node in the left tree
        node: NodeId,
        /// Its parent in the left tree
        parent: NodeId,
    },

    /// A matched node changed its parent or its place among siblings.
    Move {
        /// The node in the left tree
        node_left: NodeId,
        /// Its partner in the right tree
        node_right: NodeId,
        /// Parent in the left tree
        old_parent: NodeId,
        /// Parent in the right tree
        new_parent: NodeId,
        /// Position in the right tree
        new_position: usize,
    },

    /// A matched node changed its value.
    Update {
        /// The node in the left tree
        node_left: NodeId,
        /// Its partner in the right tree
        node_right: NodeId,
        /// Value in the left tree
        old_value: String,
        /// Value in the right tree
        new_value: String,
    },
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Insert {
                node,
                parent,
                position,
            } => write!(
                f,
                "Insert(r:{} @{} under r:{})",
                usize::from(*node),
                position,
                usize::from(*parent)
            ),
            EditOp::Delete { node, parent } => write!(
                f,
                "Delete(l:{} under l:{})",
                usize::from(*node),
                usize::from(*parent)
            ),
            EditOp::Move {
                node_left,
                node_right,
                new_parent,
                new_position,
                ..
            } => write!(
                f,
                "Move(l:{} → r:{} @{} under r:{})",
                usize::from(*node_left),
                usize::from(*node_right),
                new_position,
                usize::from(*new_parent)
            ),
            EditOp::Update {
                node_left,
                old_value,
                new_value,
                ..
            } => write!(
                f,
                "Update(l:{} {:?} → {:?})",
                usize::from(*node_left),
                old_value,
                new_value
            ),
        }
    }
}

impl fmt::Debug for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Wrapper for collecting edit operations with automatic tracing.
struct Ops {
    inner: Vec<EditOp>,
}

impl Ops {
    fn new() -> Self {
        Self { inner: Vec::new() }
    }

    fn push(&mut self, op: EditOp) {
        debug!(%op, "emit");
        self.inner.push(op);
    }

    fn into_inner(self) -> Vec<EditOp> {
        self.inner
    }
}

/// Generate an edit script from a matching between two trees.
///
/// Every unmatched node ends up in exactly one Insert or Delete. Roots are
/// never inserted, deleted or moved.
pub fn generate_edit_script(
    left: &Tree,
    right: &Tree,
    matching: &Matching,
) -> Result<Vec<EditOp>, TreeError> {
    check_roots(left, right)?;
    debug!(matched_pairs = matching.len(), "generate_edit_script start");
    let mut ops = Ops::new();

    // Phase 1: values of matched pairs
    for pair in matching.pairs() {
        let (old_value, new_value) = (left.value(pair.left), right.value(pair.right));
        if old_value != new_value {
            ops.push(EditOp::Update {
                node_left: pair.left,
                node_right: pair.right,
                old_value: old_value.to_string(),
                new_value: new_value.to_string(),
            });
        }
    }

    // Phase 2: unmatched right nodes
    for id in right.breadth_first() {
        if matching.contains_right(id) {
            continue;
        }
        if let Some(parent) = right.parent(id) {
            ops.push(EditOp::Insert {
                node: id,
                parent,
                position: right.position(id),
            });
        }
    }

    // Phase 3: moves
    let misaligned = misaligned_children(left, right, matching);
    for pair in matching.pairs() {
        let (Some(old_parent), Some(new_parent)) = (left.parent(pair.left), right.parent(pair.right))
        else {
            continue;
        };
        let parent_changed = matching.get_right(old_parent) != Some(new_parent);
        if parent_changed || misaligned.contains(&pair.left) {
            ops.push(EditOp::Move {
                node_left: pair.left,
                node_right: pair.right,
                old_parent,
                new_parent,
                new_position: right.position(pair.right),
            });
        }
    }

    // Phase 4: unmatched left nodes
    for id in left.post_order() {
        if matching.contains_left(id) {
            continue;
        }
        if let Some(parent) = left.parent(id) {
            ops.push(EditOp::Delete { node: id, parent });
        }
    }

    debug!(total_ops = ops.inner.len(), "generate_edit_script done");
    Ok(ops.into_inner())
}

/// Left nodes that kept their parent but left the longest common
/// subsequence of partnered siblings.
fn misaligned_children(left: &Tree, right: &Tree, matching: &Matching) -> HashSet<NodeId> {
    let mut misaligned = HashSet::default();
    for pair in matching.pairs() {
        let left_children: Vec<NodeId> = left
            .children(pair.left)
            .filter(|&c| {
                matching
                    .get_right(c)
                    .is_some_and(|p| right.parent(p) == Some(pair.right))
            })
            .collect();
        if left_children.len() < 2 {
            continue;
        }
        let right_children: Vec<NodeId> = right
            .children(pair.right)
            .filter(|&c| {
                matching
                    .get_left(c)
                    .is_some_and(|p| left.parent(p) == Some(pair.left))
            })
            .collect();
        let aligned = longest_common_subsequence(&left_children, &right_children, |l, r| {
            matching.get_right(l) == Some(r)
        });
        misaligned.extend(left_children.into_iter().filter(|c| !aligned.contains(c)));
    }
    misaligned
}

/// Left elements of a longest common subsequence under `partners`.
fn longest_common_subsequence(
    left: &[NodeId],
    right: &[NodeId],
    partners: impl Fn(NodeId, NodeId) -> bool,
) -> HashSet<NodeId> {
    let (n, m) = (left.len(), right.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if partners(left[i], right[j]) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut aligned = HashSet::default();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if partners(left[i], right[j]) {
            aligned.insert(left[i]);
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;
    use crate::matching::{MatchingConfig, match_trees};
    use crate::tree::NodeData;
    use facet_testhelpers::test;

    fn body(statements: &[&str]) -> Tree {
        let mut tree = Tree::new(NodeData::new(EntityType::RootNode, "foo"));
        for value in statements {
            tree.add_child(
                tree.root,
                NodeData::new(EntityType::ExpressionStatement, *value),
            );
        }
        tree
    }

    fn script(left: &mut Tree, right: &mut Tree) -> Vec<EditOp> {
        let matching = match_trees(left, right, &MatchingConfig::default()).unwrap();
        generate_edit_script(left, right, &matching).unwrap()
    }

    #[test]
    fn test_no_changes() {
        let mut left = body(&["a();", "b();"]);
        let mut right = body(&["a();", "b();"]);
        assert!(script(&mut left, &mut right).is_empty(), "identical trees have no edits");
    }

    #[test]
    fn test_insert_and_delete() {
        let mut left = body(&["alpha();", "removed_call();"]);
        let mut right = body(&["alpha();", "brand_new(x);"]);
        let ops = script(&mut left, &mut right);

        let removed = left.children(left.root).nth(1).unwrap();
        let added = right.children(right.root).nth(1).unwrap();
        assert_eq!(
            ops,
            vec![
                EditOp::Insert {
                    node: added,
                    parent: right.root,
                    position: 1,
                },
                EditOp::Delete {
                    node: removed,
                    parent: left.root,
                },
            ]
        );
    }

    #[test]
    fn test_update_of_similar_leaf() {
        let mut left = body(&["System.out.println(a);"]);
        let mut right = body(&["System.out.println(b);"]);
        let ops = script(&mut left, &mut right);

        assert_eq!(ops.len(), 1, "expected a single update, got {ops:?}");
        assert!(matches!(
            &ops[0],
            EditOp::Update { old_value, new_value, .. }
                if old_value == "System.out.println(a);" && new_value == "System.out.println(b);"
        ));
    }

    #[test]
    fn test_shift_by_insertion_is_not_a_move() {
        let mut left = body(&["first();", "second();"]);
        let mut right = body(&["inserted(x, y);", "first();", "second();"]);
        let ops = script(&mut left, &mut right);

        assert_eq!(ops.len(), 1, "only the insert, got {ops:?}");
        assert!(matches!(ops[0], EditOp::Insert { position: 0, .. }));
    }

    #[test]
    fn test_swap_is_one_move() {
        let mut left = body(&["first();", "second();"]);
        let mut right = body(&["second();", "first();"]);
        let ops = script(&mut left, &mut right);

        assert_eq!(ops.len(), 1, "one sibling leaves the common subsequence: {ops:?}");
        assert!(matches!(ops[0], EditOp::Move { .. }));
    }

    #[test]
    fn test_parent_change_is_a_move() {
        let mut left = Tree::new(NodeData::new(EntityType::RootNode, "foo"));
        let guard = left.add_child(left.root, NodeData::new(EntityType::IfStatement, "ready"));
        let then = left.add_child(guard, NodeData::new(EntityType::ThenStatement, "ready"));
        left.add_child(then, NodeData::new(EntityType::ExpressionStatement, "go();"));
        let call = left.add_child(left.root, NodeData::new(EntityType::ExpressionStatement, "log();"));

        let mut right = Tree::new(NodeData::new(EntityType::RootNode, "foo"));
        let guard_r = right.add_child(right.root, NodeData::new(EntityType::IfStatement, "ready"));
        let then_r = right.add_child(guard_r, NodeData::new(EntityType::ThenStatement, "ready"));
        right.add_child(then_r, NodeData::new(EntityType::ExpressionStatement, "go();"));
        let call_r = right.add_child(then_r, NodeData::new(EntityType::ExpressionStatement, "log();"));

        let ops = script(&mut left, &mut right);

        assert_eq!(
            ops,
            vec![EditOp::Move {
                node_left: call,
                node_right: call_r,
                old_parent: left.root,
                new_parent: then_r,
                new_position: 1,
            }]
        );
    }

    #[test]
    fn test_mismatched_roots() {
        let left = Tree::new(NodeData::new(EntityType::RootNode, "foo"));
        let right = Tree::new(NodeData::new(EntityType::Block, ""));
        assert!(generate_edit_script(&left, &right, &Matching::new()).is_err());
    }

    #[test]
    fn test_root_nodes_with_other_values_are_rejected() {
        let mut left = body(&["a;"]);
        let mut right = body(&["a;"]);
        let right_root = right.root;
        right.get_mut(right_root).value = "bar".to_string();

        let err = generate_edit_script(&left, &right, &Matching::new()).unwrap_err();
        assert_eq!(
            err,
            TreeError::RootValueMismatch {
                left: "foo".to_string(),
                right: "bar".to_string(),
            }
        );
        assert!(match_trees(&mut left, &mut right, &MatchingConfig::default()).is_err());
    }

    #[test]
    fn test_renamed_root_is_an_update_not_a_move() {
        let mut left = Tree::new(NodeData::new(EntityType::MethodDeclaration, "bar"));
        left.add_child(left.root, NodeData::new(EntityType::ExpressionStatement, "a();"));
        let mut right = Tree::new(NodeData::new(EntityType::MethodDeclaration, "baz"));
        right.add_child(right.root, NodeData::new(EntityType::ExpressionStatement, "a();"));

        let ops = script(&mut left, &mut right);

        assert_eq!(
            ops,
            vec![EditOp::Update {
                node_left: left.root,
                node_right: right.root,
                old_value: "bar".to_string(),
                new_value: "baz".to_string(),
            }]
        );
    }
}
