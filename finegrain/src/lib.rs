//! # Finegrain
//!
//! Fine-grained source code change extraction.
//!
//! Given the old and new tree of one method, field or class, finegrain
//! produces a list of changes labeled with a semantic type such as
//! "statement insert", "parameter renaming" or "increasing accessibility".
//!
//! ## Algorithm Overview
//!
//! 1. **Matching**: pair nodes of the two trees bottom-up, leaves by string
//!    similarity of their values, inner nodes by the share of their
//!    descendants already paired ([`match_trees`])
//! 2. **Edit script**: derive Update, Insert, Move and Delete operations from
//!    the pairs, following Chawathe et al. ([`generate_edit_script`])
//! 3. **Classification**: lift the operations onto source entities and map
//!    them, alone or fused with a counterpart, onto the change taxonomy
//!    ([`classify`])
//!
//! Added and deleted members of one class can additionally be paired into
//! refactorings with [`extract_refactorings`].
//!
//! ## Usage
//!
//! ```
//! use finegrain::{
//!     ChangeType, EntityType, MatchingConfig, NodeData, StructureEntity, Modifiers, Tree,
//!     changes_from_edit_script, classify, diff_trees,
//! };
//!
//! let mut left = Tree::new(NodeData::new(EntityType::RootNode, "run"));
//! left.add_child(left.root, NodeData::new(EntityType::ReturnStatement, "count;"));
//!
//! let mut right = Tree::new(NodeData::new(EntityType::RootNode, "run"));
//! right.add_child(right.root, NodeData::new(EntityType::ReturnStatement, "count;"));
//! right.add_child(right.root, NodeData::new(EntityType::MethodInvocation, "log();"));
//!
//! let method = StructureEntity::new(EntityType::Method, "Foo.run()", Modifiers::PUBLIC);
//! let ops = diff_trees(&mut left, &mut right, &MatchingConfig::default()).unwrap();
//! let changes = classify(changes_from_edit_script(&ops, &left, &right, &method));
//!
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].change_type, ChangeType::StatementInsert);
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

use facet::Facet;

pub use indextree;

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace};

mod chawathe;
/// Change records lifted from edit operations
pub mod change;
/// Change classification
pub mod classify;
/// Entity vocabulary
pub mod entity;
/// Bottom-up tree matching
pub mod matching;
/// Refactoring candidate matching
pub mod refactoring;
/// String and node similarity measures
pub mod similarity;
/// Arena-backed trees
pub mod tree;

pub use chawathe::*;
pub use change::{Operation, OperationKind, SourceCodeChange, changes_from_edit_script};
pub use classify::classify;
pub use entity::{
    ChangeType, EntityType, Modifiers, SignificanceLevel, SourceCodeEntity, SourceRange,
    StructureEntity,
};
pub use matching::{
    DynamicThreshold, LeafMatching, Matching, MatchingConfig, TreeMatcher, match_trees,
};
pub use refactoring::{
    ClassRefactoringHelper, FieldRefactoringHelper, MethodRefactoringHelper,
    RefactoringCandidate, RefactoringHelper, RefactoringPair, Refactorings, extract_refactorings,
};
pub use similarity::{NodeMetric, NodeSimilarity, StringMetric, StringSimilarity};
pub use tree::{NodeData, NodePair, Tree};

/// Caller contract violations when matching or diffing two trees.
#[derive(Facet, Debug, Clone, PartialEq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum TreeError {
    /// root labels differ: {left} vs {right}
    RootLabelMismatch {
        /// Label of the left root.
        left: EntityType,
        /// Label of the right root.
        right: EntityType,
    },

    /// ROOT_NODE values differ: {left} vs {right}
    RootValueMismatch {
        /// Value of the left root.
        left: String,
        /// Value of the right root.
        right: String,
    },
}

/// Compute the edit script between two trees.
///
/// Matches the trees with `config`, then generates the edit script from
/// the matching.
pub fn diff_trees(
    left: &mut Tree,
    right: &mut Tree,
    config: &MatchingConfig,
) -> Result<Vec<EditOp>, TreeError> {
    let (ops, _matching) = diff_trees_with_matching(left, right, config)?;
    Ok(ops)
}

/// Like [`diff_trees`], but also returns the node matching.
pub fn diff_trees_with_matching(
    left: &mut Tree,
    right: &mut Tree,
    config: &MatchingConfig,
) -> Result<(Vec<EditOp>, Matching), TreeError> {
    let matching = match_trees(left, right, config)?;
    let ops = generate_edit_script(left, right, &matching)?;
    Ok((ops, matching))
}
