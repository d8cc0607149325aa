//! Structural diff input and the AST collaborator.
//!
//! A [`StructureDiffNode`] tree says which classes, methods and fields were
//! added, deleted or changed between two versions of a file. The
//! [`AstHelper`] of each version turns the source ranges it names into
//! declaration and body trees for fine-grained differencing.

use facet::Facet;
use finegrain::{EntityType, Modifiers, SourceRange, Tree};

/// Kind of a node in the structural diff.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StructureKind {
    /// A class.
    Class,
    /// An interface.
    Interface,
    /// A method.
    Method,
    /// A constructor.
    Constructor,
    /// A field.
    Field,
    /// Anything else, e.g. a compilation unit or an import container.
    Other,
}

impl StructureKind {
    /// Entity type of the structure entity, `None` for [`StructureKind::Other`].
    pub fn entity_type(self) -> Option<EntityType> {
        match self {
            StructureKind::Class | StructureKind::Interface => Some(EntityType::Class),
            StructureKind::Method | StructureKind::Constructor => Some(EntityType::Method),
            StructureKind::Field => Some(EntityType::Attribute),
            StructureKind::Other => None,
        }
    }

    /// Class or interface.
    pub fn is_class_or_interface(self) -> bool {
        matches!(self, StructureKind::Class | StructureKind::Interface)
    }

    /// Method or constructor.
    pub fn is_method_or_constructor(self) -> bool {
        matches!(self, StructureKind::Method | StructureKind::Constructor)
    }

    /// Field.
    pub fn is_attribute(self) -> bool {
        self == StructureKind::Field
    }
}

/// What happened to a structure node between the two versions.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DiffKind {
    /// Only present on the right.
    Addition,
    /// Only present on the left.
    Deletion,
    /// Present on both sides with different content.
    Change,
}

/// A node of the structural diff between two versions of a file.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct StructureDiffNode {
    /// Name as shown in the structure, e.g. `Foo`, `bar(int)` or `count : int`.
    pub name: String,
    /// What the node stands for.
    pub kind: StructureKind,
    /// What happened to it.
    pub diff: DiffKind,
    /// Range in the left version.
    pub left: Option<SourceRange>,
    /// Range in the right version.
    pub right: Option<SourceRange>,
    /// Nested structure.
    #[facet(recursive_type)]
    pub children: Vec<StructureDiffNode>,
}

impl StructureDiffNode {
    /// A node present on both sides.
    pub fn changed(
        kind: StructureKind,
        name: impl Into<String>,
        left: SourceRange,
        right: SourceRange,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            diff: DiffKind::Change,
            left: Some(left),
            right: Some(right),
            children: Vec::new(),
        }
    }

    /// A node only present on the right.
    pub fn added(kind: StructureKind, name: impl Into<String>, right: SourceRange) -> Self {
        Self {
            diff: DiffKind::Addition,
            left: None,
            right: Some(right),
            ..Self::changed(kind, name, right, right)
        }
    }

    /// A node only present on the left.
    pub fn deleted(kind: StructureKind, name: impl Into<String>, left: SourceRange) -> Self {
        Self {
            diff: DiffKind::Deletion,
            left: Some(left),
            right: None,
            ..Self::changed(kind, name, left, left)
        }
    }

    /// Append a child.
    pub fn with_child(mut self, child: StructureDiffNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = StructureDiffNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// A node is usable when at least one side carries a range.
    pub fn is_usable(&self) -> bool {
        self.left.is_some() || self.right.is_some()
    }

    /// First class or interface in depth-first order, this node included.
    pub fn find_class(&self) -> Option<&StructureDiffNode> {
        if self.kind.is_class_or_interface() {
            return Some(self);
        }
        self.children.iter().find_map(StructureDiffNode::find_class)
    }
}

/// Access to one version of a source file.
///
/// Implemented by the language front end. The distiller asks it for trees of
/// the ranges named in the structural diff; returning `None` skips that
/// entity.
pub trait AstHelper: Sync {
    /// Qualifier of the top-level types, usually the package name. Empty for
    /// the default package.
    fn top_level_name(&self) -> &str;

    /// Modifier flags of the declaration at `range`.
    fn modifiers(&self, range: SourceRange) -> Modifiers;

    /// Declaration tree (modifiers, name, parameters, types, documentation)
    /// of the entity at `range`, rooted at a `RootNode` valued `name`.
    fn declaration_tree(&self, name: &str, range: SourceRange) -> Option<Tree>;

    /// Body tree (statements) of the method at `range`, rooted at a
    /// `RootNode` valued `name`.
    fn body_tree(&self, name: &str, range: SourceRange) -> Option<Tree>;

    /// Source text at `range`.
    fn source_text(&self, range: SourceRange) -> Option<String>;
}
