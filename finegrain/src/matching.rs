//! Bottom-up tree matching.
//!
//! Leaves are paired by label and string similarity of their values. Inner
//! nodes are paired by label, by a structural similarity computed from the
//! pairs found below them, and by string similarity of their values. The
//! left tree is walked in postorder, so every inner node is compared only
//! after its descendants had their chance to match.

use crate::{debug, trace};

use facet::Facet;
use indextree::NodeId;

use crate::TreeError;
use crate::entity::EntityType;
use crate::similarity::{Chawathe, Dice, NodeMetric, NodeSimilarity, StringMetric, StringSimilarity};
use crate::tree::{NodePair, Tree};

/// A bidirectional mapping between nodes of a left and a right tree.
/// Uses Vec for O(1) lookups indexed by NodeId.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matching {
    /// Left node to right node (indexed by the left NodeId)
    left_to_right: Vec<Option<NodeId>>,
    /// Right node to left node (indexed by the right NodeId)
    right_to_left: Vec<Option<NodeId>>,
    /// Pairs in the order they were found
    pairs: Vec<NodePair>,
}

impl Matching {
    /// Create an empty matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pair. Each side may take part in at most one pair; a pair
    /// touching an already matched node is ignored.
    pub fn add(&mut self, left: NodeId, right: NodeId) {
        if self.contains_left(left) || self.contains_right(right) {
            return;
        }
        let l = usize::from(left);
        let r = usize::from(right);
        if l >= self.left_to_right.len() {
            self.left_to_right.resize(l + 1, None);
        }
        if r >= self.right_to_left.len() {
            self.right_to_left.resize(r + 1, None);
        }
        self.left_to_right[l] = Some(right);
        self.right_to_left[r] = Some(left);
        self.pairs.push(NodePair::new(left, right));
    }

    /// Whether a left node is matched.
    #[inline]
    pub fn contains_left(&self, left: NodeId) -> bool {
        self.get_right(left).is_some()
    }

    /// Whether a right node is matched.
    #[inline]
    pub fn contains_right(&self, right: NodeId) -> bool {
        self.get_left(right).is_some()
    }

    /// Partner of a left node.
    #[inline]
    pub fn get_right(&self, left: NodeId) -> Option<NodeId> {
        self.left_to_right.get(usize::from(left)).copied().flatten()
    }

    /// Partner of a right node.
    #[inline]
    pub fn get_left(&self, right: NodeId) -> Option<NodeId> {
        self.right_to_left.get(usize::from(right)).copied().flatten()
    }

    /// Whether exactly this pair is part of the matching.
    pub fn contains(&self, pair: NodePair) -> bool {
        self.get_right(pair.left) == Some(pair.right)
    }

    /// All pairs, in discovery order.
    pub fn pairs(&self) -> impl Iterator<Item = NodePair> + '_ {
        self.pairs.iter().copied()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pair was found.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Lowered node threshold for small subtrees.
#[derive(Facet, Debug, Clone, Copy, PartialEq)]
pub struct DynamicThreshold {
    /// Applies when both nodes have fewer leaves than this.
    pub depth: usize,
    /// Node threshold used instead of the configured one.
    pub threshold: f64,
}

/// How leaves are paired.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LeafMatching {
    /// Every left node takes the first right node it is equal to.
    #[default]
    First,
    /// Leaf pairs are ranked by similarity and committed best first; inner
    /// nodes then use first-fit.
    Best,
}

/// Configuration for the matching algorithm.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct MatchingConfig {
    /// Measure for leaf values.
    pub leaf_string_similarity: StringSimilarity,
    /// Minimum leaf value similarity.
    pub leaf_threshold: f64,
    /// Measure for inner node values.
    pub node_string_similarity: StringSimilarity,
    /// Minimum inner node value similarity.
    pub node_string_threshold: f64,
    /// Structural measure for inner nodes.
    pub node_similarity: NodeSimilarity,
    /// Minimum structural similarity for inner nodes.
    pub node_threshold: f64,
    /// Optional lowered node threshold for small subtrees.
    pub dynamic_threshold: Option<DynamicThreshold>,
    /// Leaf pairing strategy.
    pub leaf_matching: LeafMatching,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            leaf_string_similarity: StringSimilarity::BIGRAMS,
            leaf_threshold: 0.6,
            node_string_similarity: StringSimilarity::BIGRAMS,
            node_string_threshold: 0.6,
            node_similarity: NodeSimilarity::Dice,
            node_threshold: 0.6,
            dynamic_threshold: Some(DynamicThreshold {
                depth: 4,
                threshold: 0.4,
            }),
            leaf_matching: LeafMatching::First,
        }
    }
}

impl MatchingConfig {
    /// Preset used when distilling changes: best-leaf matching with Chawathe
    /// node similarity, default thresholds otherwise.
    pub fn distilling() -> Self {
        Self {
            node_similarity: NodeSimilarity::Chawathe,
            leaf_matching: LeafMatching::Best,
            ..Self::default()
        }
    }
}

/// Fails when the two roots carry different labels, or are ROOT_NODEs with
/// different values.
pub(crate) fn check_roots(left: &Tree, right: &Tree) -> Result<(), TreeError> {
    let (l, r) = (left.label(left.root), right.label(right.root));
    if l != r {
        return Err(TreeError::RootLabelMismatch { left: l, right: r });
    }
    let (lv, rv) = (left.value(left.root), right.value(right.root));
    if l == EntityType::RootNode && lv != rv {
        return Err(TreeError::RootValueMismatch {
            left: lv.to_string(),
            right: rv.to_string(),
        });
    }
    Ok(())
}

/// Match two trees with the measures named in `config`.
///
/// Matched flags of both trees are reset first, so matching the same trees
/// twice gives the same result.
pub fn match_trees(
    left: &mut Tree,
    right: &mut Tree,
    config: &MatchingConfig,
) -> Result<Matching, TreeError> {
    let dice = Dice {
        string: &config.node_string_similarity,
        threshold: config.node_string_threshold,
    };
    let node: &dyn NodeMetric = match config.node_similarity {
        NodeSimilarity::Dice => &dice,
        NodeSimilarity::Chawathe => &Chawathe,
    };
    TreeMatcher::from_config(config, node).match_trees(left, right)
}

/// Bottom-up matcher over pluggable measures.
pub struct TreeMatcher<'a> {
    leaf_string: &'a dyn StringMetric,
    leaf_threshold: f64,
    node_string: &'a dyn StringMetric,
    node_string_threshold: f64,
    node: &'a dyn NodeMetric,
    node_threshold: f64,
    dynamic_threshold: Option<DynamicThreshold>,
    leaf_matching: LeafMatching,
}

impl<'a> TreeMatcher<'a> {
    /// Create a first-fit matcher without dynamic threshold.
    pub fn new(
        leaf_string: &'a dyn StringMetric,
        leaf_threshold: f64,
        node_string: &'a dyn StringMetric,
        node_string_threshold: f64,
        node: &'a dyn NodeMetric,
        node_threshold: f64,
    ) -> Self {
        Self {
            leaf_string,
            leaf_threshold,
            node_string,
            node_string_threshold,
            node,
            node_threshold,
            dynamic_threshold: None,
            leaf_matching: LeafMatching::First,
        }
    }

    /// Create a matcher from `config`, with `node` as structural measure.
    pub fn from_config(config: &'a MatchingConfig, node: &'a dyn NodeMetric) -> Self {
        Self {
            dynamic_threshold: config.dynamic_threshold,
            leaf_matching: config.leaf_matching,
            ..Self::new(
                &config.leaf_string_similarity,
                config.leaf_threshold,
                &config.node_string_similarity,
                config.node_string_threshold,
                node,
                config.node_threshold,
            )
        }
    }

    /// Lower the node threshold for small subtrees.
    pub fn with_dynamic_threshold(mut self, dynamic: DynamicThreshold) -> Self {
        self.dynamic_threshold = Some(dynamic);
        self
    }

    /// Choose the leaf pairing strategy.
    pub fn with_leaf_matching(mut self, leaf_matching: LeafMatching) -> Self {
        self.leaf_matching = leaf_matching;
        self
    }

    /// Reset matched flags and compute a fresh matching.
    pub fn match_trees(&self, left: &mut Tree, right: &mut Tree) -> Result<Matching, TreeError> {
        check_roots(left, right)?;
        left.reset_matched();
        right.reset_matched();
        let mut matching = Matching::new();
        self.match_into(left, right, &mut matching);
        Ok(matching)
    }

    /// Extend `matching` with pairs of nodes not flagged as matched yet.
    pub fn match_into(&self, left: &mut Tree, right: &mut Tree, matching: &mut Matching) {
        debug!(
            nodes_left = left.node_count(),
            nodes_right = right.node_count(),
            strategy = ?self.leaf_matching,
            "match_trees start"
        );

        let left_order: Vec<NodeId> = left.post_order().collect();
        let right_order: Vec<NodeId> = right.post_order().collect();

        if self.leaf_matching == LeafMatching::Best {
            self.match_best_leaves(left, right, &left_order, &right_order, matching);
            debug!(matched = matching.len(), "after best leaf pass");
        }

        for &x in &left_order {
            if left.is_matched(x) {
                continue;
            }
            if self.leaf_matching == LeafMatching::Best && left.is_leaf(x) && !left.is_root(x) {
                continue;
            }
            let partner = right_order
                .iter()
                .copied()
                .find(|&y| !right.is_matched(y) && self.equal(left, x, right, y, matching));
            if let Some(y) = partner {
                pair(left, right, x, y, matching);
            }
        }

        // roots always correspond; a value difference becomes a root update
        let (x, y) = (left.root, right.root);
        if !left.is_matched(x) && !right.is_matched(y) && left.label(x) == right.label(y) {
            pair(left, right, x, y, matching);
        }

        debug!(matched = matching.len(), "match_trees done");
    }

    fn match_best_leaves(
        &self,
        left: &mut Tree,
        right: &mut Tree,
        left_order: &[NodeId],
        right_order: &[NodeId],
        matching: &mut Matching,
    ) {
        let mut candidates: Vec<(NodeId, NodeId, f64)> = Vec::new();
        for &x in left_order {
            if left.is_matched(x) || !left.is_leaf(x) || left.is_root(x) {
                continue;
            }
            for &y in right_order {
                if right.is_matched(y) || !right.is_leaf(y) || right.is_root(y) {
                    continue;
                }
                if left.label(x) != right.label(y) {
                    continue;
                }
                let similarity = self.leaf_string.similarity(left.value(x), right.value(y));
                if similarity >= self.leaf_threshold {
                    candidates.push((x, y, similarity));
                }
            }
        }

        // stable: equal scores keep postorder encounter order
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
        for (x, y, _) in candidates {
            if !left.is_matched(x) && !right.is_matched(y) {
                pair(left, right, x, y, matching);
            }
        }
    }

    fn equal(&self, left: &Tree, x: NodeId, right: &Tree, y: NodeId, matching: &Matching) -> bool {
        let label = left.label(x);
        if label != right.label(y) {
            return false;
        }
        if label == EntityType::RootNode {
            return left.is_root(x) && right.is_root(y) && left.value(x) == right.value(y);
        }

        match (left.is_leaf(x), right.is_leaf(y)) {
            (true, true) => {
                self.leaf_string.similarity(left.value(x), right.value(y)) >= self.leaf_threshold
            }
            (false, false) => self.inner_equal(left, x, right, y, matching),
            _ => left.is_root(x) && right.is_root(y) && self.inner_equal(left, x, right, y, matching),
        }
    }

    fn inner_equal(
        &self,
        left: &Tree,
        x: NodeId,
        right: &Tree,
        y: NodeId,
        matching: &Matching,
    ) -> bool {
        let threshold = match self.dynamic_threshold {
            Some(dynamic)
                if left.leaf_count(x) < dynamic.depth && right.leaf_count(y) < dynamic.depth =>
            {
                dynamic.threshold
            }
            _ => self.node_threshold,
        };
        self.node.similarity(left, x, right, y, matching) >= threshold
            && self.node_string.similarity(left.value(x), right.value(y))
                >= self.node_string_threshold
    }
}

fn pair(left: &mut Tree, right: &mut Tree, x: NodeId, y: NodeId, matching: &mut Matching) {
    trace!(
        left = usize::from(x),
        right = usize::from(y),
        label = %left.label(x),
        "pair"
    );
    matching.add(x, y);
    left.set_matched(x, true);
    right.set_matched(y, true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeData;
    use facet_testhelpers::test;

    fn method_body(name: &str, statements: &[(EntityType, &str)]) -> Tree {
        let mut tree = Tree::new(NodeData::new(EntityType::RootNode, name));
        for &(label, value) in statements {
            tree.add_child(tree.root, NodeData::new(label, value));
        }
        tree
    }

    #[test]
    fn test_identical_trees() {
        let statements = [
            (EntityType::VariableDeclarationStatement, "int a = 1;"),
            (EntityType::ReturnStatement, "a;"),
        ];
        let mut left = method_body("foo", &statements);
        let mut right = method_body("foo", &statements);

        let matching = match_trees(&mut left, &mut right, &MatchingConfig::default()).unwrap();

        assert_eq!(matching.len(), 3, "all nodes should be matched");
        assert!(matching.contains(NodePair::new(left.root, right.root)));
        assert!(left.pre_order().all(|id| left.is_matched(id)));
        assert!(right.pre_order().all(|id| right.is_matched(id)));
    }

    #[test]
    fn test_root_label_mismatch_is_an_error() {
        let mut left = Tree::new(NodeData::new(EntityType::RootNode, "foo"));
        let mut right = Tree::new(NodeData::new(EntityType::MethodDeclaration, "foo"));

        let err = match_trees(&mut left, &mut right, &MatchingConfig::default()).unwrap_err();
        assert_eq!(
            err,
            TreeError::RootLabelMismatch {
                left: EntityType::RootNode,
                right: EntityType::MethodDeclaration,
            }
        );
    }

    #[test]
    fn test_root_values_must_be_equal() {
        let mut left = method_body("foo", &[(EntityType::ReturnStatement, "a;")]);
        let mut right = method_body("bar", &[(EntityType::ReturnStatement, "a;")]);

        let err = match_trees(&mut left, &mut right, &MatchingConfig::default()).unwrap_err();
        assert_eq!(
            err,
            TreeError::RootValueMismatch {
                left: "foo".to_string(),
                right: "bar".to_string(),
            }
        );
    }

    #[test]
    fn test_dissimilar_roots_are_still_paired() {
        let mut left = Tree::new(NodeData::new(EntityType::MethodDeclaration, "bar"));
        left.add_child(left.root, NodeData::new(EntityType::ExpressionStatement, "a();"));
        let mut right = Tree::new(NodeData::new(EntityType::MethodDeclaration, "baz"));
        right.add_child(right.root, NodeData::new(EntityType::ExpressionStatement, "a();"));

        let matching = match_trees(&mut left, &mut right, &MatchingConfig::default()).unwrap();

        assert_eq!(matching.len(), 2);
        assert!(matching.contains(NodePair::new(left.root, right.root)));
    }

    #[test]
    fn test_labels_must_agree() {
        let mut left = method_body("foo", &[(EntityType::ReturnStatement, "a;")]);
        let mut right = method_body("foo", &[(EntityType::ExpressionStatement, "a;")]);

        let matching = match_trees(&mut left, &mut right, &MatchingConfig::default()).unwrap();

        assert_eq!(matching.len(), 1, "only the roots match");
    }

    #[test]
    fn test_matching_is_idempotent() {
        let mut left = method_body(
            "foo",
            &[
                (EntityType::ExpressionStatement, "foo(a);"),
                (EntityType::ReturnStatement, "a;"),
            ],
        );
        let mut right = method_body(
            "foo",
            &[
                (EntityType::ReturnStatement, "a;"),
                (EntityType::ExpressionStatement, "foo(a, b);"),
            ],
        );
        let config = MatchingConfig::default();

        let first = match_trees(&mut left, &mut right, &config).unwrap();
        let second = match_trees(&mut left, &mut right, &config).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_best_leaf_prefers_identical_values() {
        let mut left = method_body("foo", &[(EntityType::ExpressionStatement, "foo(a);")]);
        let mut right = method_body(
            "foo",
            &[
                (EntityType::ExpressionStatement, "foo(a, b);"),
                (EntityType::ExpressionStatement, "foo(a);"),
            ],
        );
        let leaf = left.children(left.root).next().unwrap();
        let right_leaves: Vec<_> = right.children(right.root).collect();

        let first_fit = match_trees(&mut left, &mut right, &MatchingConfig::default()).unwrap();
        assert_eq!(
            first_fit.get_right(leaf),
            Some(right_leaves[0]),
            "first-fit takes the first similar enough leaf"
        );

        let config = MatchingConfig {
            leaf_matching: LeafMatching::Best,
            ..MatchingConfig::default()
        };
        let best = match_trees(&mut left, &mut right, &config).unwrap();
        assert_eq!(best.get_right(leaf), Some(right_leaves[1]));
    }

    fn guarded_return(other: (EntityType, &str)) -> Tree {
        let mut tree = Tree::new(NodeData::new(EntityType::RootNode, "foo"));
        let guard = tree.add_child(tree.root, NodeData::new(EntityType::IfStatement, "x > 0"));
        tree.add_child(guard, NodeData::new(EntityType::ReturnStatement, "a;"));
        tree.add_child(guard, NodeData::new(other.0, other.1));
        tree
    }

    #[test]
    fn test_dynamic_threshold_for_small_subtrees() {
        let mut left = guarded_return((EntityType::ReturnStatement, "b;"));
        let mut right = guarded_return((EntityType::ExpressionStatement, "log();"));
        let guard_left = left.children(left.root).next().unwrap();

        let strict = MatchingConfig {
            node_similarity: NodeSimilarity::Chawathe,
            dynamic_threshold: None,
            ..MatchingConfig::default()
        };
        let matching = match_trees(&mut left, &mut right, &strict).unwrap();
        assert!(
            !matching.contains_left(guard_left),
            "half of the leaves is below 0.6"
        );

        let lenient = MatchingConfig {
            node_similarity: NodeSimilarity::Chawathe,
            ..MatchingConfig::default()
        };
        let matching = match_trees(&mut left, &mut right, &lenient).unwrap();
        assert!(
            matching.contains_left(guard_left),
            "two leaves are below depth 4, so 0.4 applies"
        );
    }

    #[test]
    fn test_matching_add_keeps_sides_unique() {
        let tree = method_body(
            "foo",
            &[
                (EntityType::ReturnStatement, "a;"),
                (EntityType::ReturnStatement, "b;"),
            ],
        );
        let ids: Vec<_> = tree.pre_order().collect();
        let mut matching = Matching::new();
        matching.add(ids[1], ids[1]);
        matching.add(ids[1], ids[2]);
        matching.add(ids[2], ids[1]);
        assert_eq!(matching.len(), 1);
        assert_eq!(matching.get_right(ids[1]), Some(ids[1]));
        assert_eq!(matching.get_left(ids[2]), None);
    }
}
