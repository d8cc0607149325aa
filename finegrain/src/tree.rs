//! Labeled, valued, ordered trees stored in an arena.
//!
//! Nodes are addressed by [`NodeId`]. Parent links, child order and
//! associated-node cross links are all indices into the same arena, so a tree
//! can be cloned freely.

use core::fmt;
use std::collections::VecDeque;

use indextree::{Arena, NodeEdge, NodeId};

use crate::entity::{EntityType, SourceCodeEntity, SourceRange};

/// Data stored at each node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// Entity type tag.
    pub label: EntityType,
    /// Trimmed string content, possibly empty.
    pub value: String,
    /// Source entity this node was built from.
    pub entity: SourceCodeEntity,
    /// Set by the matcher once the node is part of a pair.
    pub matched: bool,
    /// Cross links, e.g. from a comment to the statement it documents.
    pub associated: Vec<NodeId>,
}

impl NodeData {
    /// Create node data whose entity mirrors the label and value.
    pub fn new(label: EntityType, value: impl Into<String>) -> Self {
        let value = value.into().trim().to_string();
        let entity = SourceCodeEntity::new(value.clone(), label, SourceRange::default());
        Self {
            label,
            value,
            entity,
            matched: false,
            associated: Vec::new(),
        }
    }

    /// Create node data with an explicit entity.
    pub fn with_entity(label: EntityType, value: impl Into<String>, entity: SourceCodeEntity) -> Self {
        Self {
            entity,
            ..Self::new(label, value)
        }
    }

    /// Set the source range of the attached entity.
    pub fn at(mut self, range: SourceRange) -> Self {
        self.entity.range = range;
        self
    }
}

/// A tree backed by an [`indextree::Arena`].
#[derive(Debug, Clone)]
pub struct Tree {
    /// Node storage.
    pub arena: Arena<NodeData>,
    /// The root node.
    pub root: NodeId,
}

impl Tree {
    /// Create a tree consisting of a single root node.
    pub fn new(root_data: NodeData) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(root_data);
        Self { arena, root }
    }

    /// Append a child as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let child = self.arena.new_node(data);
        parent.append(child, &mut self.arena);
        child
    }

    /// Data stored at a node.
    pub fn get(&self, id: NodeId) -> &NodeData {
        self.arena[id].get()
    }

    /// Mutable data stored at a node.
    pub fn get_mut(&mut self, id: NodeId) -> &mut NodeData {
        self.arena[id].get_mut()
    }

    /// Label of a node.
    pub fn label(&self, id: NodeId) -> EntityType {
        self.get(id).label
    }

    /// Value of a node.
    pub fn value(&self, id: NodeId) -> &str {
        &self.get(id).value
    }

    /// Entity attached to a node.
    pub fn entity(&self, id: NodeId) -> &SourceCodeEntity {
        &self.get(id).entity
    }

    /// Parent of a node, `None` for the root.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Children in insertion order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Number of children.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Position among siblings, 0-indexed.
    pub fn position(&self, id: NodeId) -> usize {
        id.preceding_siblings(&self.arena).count() - 1
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.arena[id].first_child().is_none()
    }

    /// Whether the node is the root of this tree.
    pub fn is_root(&self, id: NodeId) -> bool {
        id == self.root
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.arena.count()
    }

    /// Number of nodes in the subtree rooted at `id`, including `id`.
    pub fn subtree_size(&self, id: NodeId) -> usize {
        self.descendants(id).count()
    }

    /// Leaves of the subtree rooted at `id`, in preorder.
    pub fn leaves(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(id).filter(|&d| self.is_leaf(d))
    }

    /// Number of leaves under `id`; a leaf counts itself.
    pub fn leaf_count(&self, id: NodeId) -> usize {
        self.leaves(id).count()
    }

    /// Preorder iterator over the subtree rooted at `id`, including `id`.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Whether `node` lies in the subtree rooted at `ancestor` (or is it).
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        node.ancestors(&self.arena).any(|a| a == ancestor)
    }

    /// Depth-first preorder over the whole tree.
    pub fn pre_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.descendants(self.root)
    }

    /// Depth-first postorder over the whole tree.
    pub fn post_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.traverse(&self.arena).filter_map(|edge| match edge {
            NodeEdge::End(id) => Some(id),
            NodeEdge::Start(_) => None,
        })
    }

    /// Breadth-first iterator over the whole tree.
    pub fn breadth_first(&self) -> BreadthFirst<'_> {
        BreadthFirst {
            tree: self,
            queue: VecDeque::from([self.root]),
        }
    }

    /// Whether the matcher paired this node.
    pub fn is_matched(&self, id: NodeId) -> bool {
        self.get(id).matched
    }

    /// Set the matched flag of a node.
    pub fn set_matched(&mut self, id: NodeId, matched: bool) {
        self.get_mut(id).matched = matched;
    }

    /// Clear every matched flag.
    pub fn reset_matched(&mut self) {
        let ids: Vec<NodeId> = self.pre_order().collect();
        for id in ids {
            self.set_matched(id, false);
        }
    }

    /// Record `other` as associated with `node`.
    pub fn associate(&mut self, node: NodeId, other: NodeId) {
        let associated = &mut self.get_mut(node).associated;
        if !associated.contains(&other) {
            associated.push(other);
        }
    }

    /// Nodes associated with `node`.
    pub fn associated_nodes(&self, node: NodeId) -> &[NodeId] {
        &self.get(node).associated
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for edge in self.root.traverse(&self.arena) {
            if let NodeEdge::Start(id) = edge {
                let depth = id.ancestors(&self.arena).count() - 1;
                let data = self.get(id);
                writeln!(f, "{:indent$}{} {:?}", "", data.label, data.value, indent = depth * 2)?;
            }
        }
        Ok(())
    }
}

/// Breadth-first iterator returned by [`Tree::breadth_first`].
pub struct BreadthFirst<'a> {
    tree: &'a Tree,
    queue: VecDeque<NodeId>,
}

impl Iterator for BreadthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        self.queue.extend(self.tree.children(id));
        Some(id)
    }
}

/// A confirmed match between a left and a right node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodePair {
    /// Node in the left (old) tree.
    pub left: NodeId,
    /// Node in the right (new) tree.
    pub right: NodeId,
}

impl NodePair {
    /// Create a pair.
    pub fn new(left: NodeId, right: NodeId) -> Self {
        Self { left, right }
    }
}
