//! Source code changes: edit operations lifted onto source entities.

use facet::Facet;

use crate::chawathe::EditOp;
use crate::entity::{ChangeType, SourceCodeEntity, StructureEntity};
use crate::tree::Tree;

/// Kind of a change, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// See [`Operation::Insert`].
    Insert,
    /// See [`Operation::Delete`].
    Delete,
    /// See [`Operation::Move`].
    Move,
    /// See [`Operation::Update`].
    Update,
}

impl OperationKind {
    /// The order in which the classifier works through its pools.
    pub const CLASSIFICATION_ORDER: [OperationKind; 4] = [
        OperationKind::Insert,
        OperationKind::Delete,
        OperationKind::Move,
        OperationKind::Update,
    ];
}

/// What happened to the changed entity.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Operation {
    /// The entity is new.
    Insert,
    /// The entity is gone.
    Delete,
    /// The entity moved.
    Move {
        /// The entity at its new place.
        new_entity: SourceCodeEntity,
        /// Its new parent.
        new_parent: SourceCodeEntity,
    },
    /// The entity changed its value.
    Update {
        /// The entity with its new value.
        new_entity: SourceCodeEntity,
    },
}

/// A change to one source entity inside a structure entity.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceCodeChange {
    /// What happened.
    pub operation: Operation,
    /// The method, field or class the change happened in.
    pub root: StructureEntity,
    /// The changed entity; for updates it carries the old value.
    pub changed: SourceCodeEntity,
    /// Parent of the changed entity; the old parent for moves.
    pub parent: SourceCodeEntity,
    /// Semantic type, [`ChangeType::Unclassified`] until classified.
    pub change_type: ChangeType,
}

impl SourceCodeChange {
    /// An unclassified insert.
    pub fn insert(root: StructureEntity, changed: SourceCodeEntity, parent: SourceCodeEntity) -> Self {
        Self {
            operation: Operation::Insert,
            root,
            changed,
            parent,
            change_type: ChangeType::Unclassified,
        }
    }

    /// An unclassified delete.
    pub fn delete(root: StructureEntity, changed: SourceCodeEntity, parent: SourceCodeEntity) -> Self {
        Self {
            operation: Operation::Delete,
            ..Self::insert(root, changed, parent)
        }
    }

    /// An unclassified move.
    pub fn moved(
        root: StructureEntity,
        changed: SourceCodeEntity,
        new_entity: SourceCodeEntity,
        parent: SourceCodeEntity,
        new_parent: SourceCodeEntity,
    ) -> Self {
        Self {
            operation: Operation::Move {
                new_entity,
                new_parent,
            },
            ..Self::insert(root, changed, parent)
        }
    }

    /// An unclassified update from `changed` to `new_entity`.
    pub fn update(
        root: StructureEntity,
        changed: SourceCodeEntity,
        new_entity: SourceCodeEntity,
        parent: SourceCodeEntity,
    ) -> Self {
        Self {
            operation: Operation::Update { new_entity },
            ..Self::insert(root, changed, parent)
        }
    }

    /// The same change with `change_type` set.
    pub fn with_change_type(mut self, change_type: ChangeType) -> Self {
        self.change_type = change_type;
        self
    }

    /// Kind of the operation.
    pub fn kind(&self) -> OperationKind {
        match self.operation {
            Operation::Insert => OperationKind::Insert,
            Operation::Delete => OperationKind::Delete,
            Operation::Move { .. } => OperationKind::Move,
            Operation::Update { .. } => OperationKind::Update,
        }
    }

    /// New entity of a move or update.
    pub fn new_entity(&self) -> Option<&SourceCodeEntity> {
        match &self.operation {
            Operation::Move { new_entity, .. } | Operation::Update { new_entity } => Some(new_entity),
            Operation::Insert | Operation::Delete => None,
        }
    }

    /// New parent of a move.
    pub fn new_parent(&self) -> Option<&SourceCodeEntity> {
        match &self.operation {
            Operation::Move { new_parent, .. } => Some(new_parent),
            _ => None,
        }
    }

    /// Whether the classifier assigned a type.
    pub fn is_classified(&self) -> bool {
        self.change_type != ChangeType::Unclassified
    }

    /// Lift an edit operation onto the entities of the two trees.
    ///
    /// Returns `None` when the operation has no parent to attach to, which
    /// is the case for updates of a root.
    pub fn from_edit_op(op: &EditOp, left: &Tree, right: &Tree, root: &StructureEntity) -> Option<Self> {
        let change = match op {
            EditOp::Insert { node, parent, .. } => Self::insert(
                root.clone(),
                right.entity(*node).clone(),
                right.entity(*parent).clone(),
            ),
            EditOp::Delete { node, parent } => Self::delete(
                root.clone(),
                left.entity(*node).clone(),
                left.entity(*parent).clone(),
            ),
            EditOp::Move {
                node_left,
                node_right,
                old_parent,
                new_parent,
                ..
            } => Self::moved(
                root.clone(),
                left.entity(*node_left).clone(),
                right.entity(*node_right).clone(),
                left.entity(*old_parent).clone(),
                right.entity(*new_parent).clone(),
            ),
            EditOp::Update {
                node_left,
                node_right,
                old_value,
                ..
            } => {
                let parent = left.parent(*node_left)?;
                let current = left.entity(*node_left);
                let old = SourceCodeEntity {
                    unique_name: old_value.clone(),
                    ..current.clone()
                };
                Self::update(
                    root.clone(),
                    old,
                    right.entity(*node_right).clone(),
                    left.entity(parent).clone(),
                )
            }
        };
        Some(change)
    }
}

/// Lift a whole edit script, dropping operations that cannot be attached.
pub fn changes_from_edit_script(
    ops: &[EditOp],
    left: &Tree,
    right: &Tree,
    root: &StructureEntity,
) -> Vec<SourceCodeChange> {
    ops.iter()
        .filter_map(|op| SourceCodeChange::from_edit_op(op, left, right, root))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityType, Modifiers, SourceRange};
    use crate::tree::NodeData;
    use facet_testhelpers::test;

    fn method() -> StructureEntity {
        StructureEntity::new(EntityType::Method, "Foo.bar()", Modifiers::PUBLIC)
    }

    #[test]
    fn test_update_carries_old_value() {
        let mut left = Tree::new(NodeData::new(EntityType::RootNode, "bar"));
        let stmt = left.add_child(
            left.root,
            NodeData::new(EntityType::ReturnStatement, "a;").at(SourceRange::new(10, 9)),
        );
        let mut right = Tree::new(NodeData::new(EntityType::RootNode, "bar"));
        let stmt_r = right.add_child(right.root, NodeData::new(EntityType::ReturnStatement, "b;"));

        let op = EditOp::Update {
            node_left: stmt,
            node_right: stmt_r,
            old_value: "a;".into(),
            new_value: "b;".into(),
        };
        let change = SourceCodeChange::from_edit_op(&op, &left, &right, &method()).unwrap();

        assert_eq!(change.kind(), OperationKind::Update);
        assert_eq!(change.changed.unique_name, "a;");
        assert_eq!(change.changed.range, SourceRange::new(10, 9));
        assert_eq!(change.new_entity().map(|e| e.unique_name.as_str()), Some("b;"));
        assert_eq!(change.parent.entity_type, EntityType::RootNode);
        assert!(!change.is_classified());
    }

    #[test]
    fn test_root_update_is_dropped() {
        let left = Tree::new(NodeData::new(EntityType::MethodDeclaration, "bar"));
        let right = Tree::new(NodeData::new(EntityType::MethodDeclaration, "baz"));
        let op = EditOp::Update {
            node_left: left.root,
            node_right: right.root,
            old_value: "bar".into(),
            new_value: "baz".into(),
        };
        assert_eq!(
            changes_from_edit_script(&[op], &left, &right, &method()),
            Vec::new()
        );
    }

    #[test]
    fn test_move_carries_both_parents() {
        let mut left = Tree::new(NodeData::new(EntityType::RootNode, "bar"));
        let stmt = left.add_child(left.root, NodeData::new(EntityType::ReturnStatement, "a;"));
        let mut right = Tree::new(NodeData::new(EntityType::RootNode, "bar"));
        let block = right.add_child(right.root, NodeData::new(EntityType::Block, ""));
        let stmt_r = right.add_child(block, NodeData::new(EntityType::ReturnStatement, "a;"));

        let op = EditOp::Move {
            node_left: stmt,
            node_right: stmt_r,
            old_parent: left.root,
            new_parent: block,
            new_position: 0,
        };
        let change = SourceCodeChange::from_edit_op(&op, &left, &right, &method()).unwrap();

        assert_eq!(change.parent.entity_type, EntityType::RootNode);
        assert_eq!(
            change.new_parent().map(|p| p.entity_type),
            Some(EntityType::Block)
        );
    }
}
