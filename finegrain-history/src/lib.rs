//! # finegrain-history
//!
//! Change histories of classes, distilled with [`finegrain`].
//!
//! A language front end compares two versions of a file structurally and
//! hands the resulting [`StructureDiffNode`] tree to a [`Distiller`],
//! together with an [`AstHelper`] for each version. The distiller
//! differences every changed method, field and class declaration
//! fine-grained, detects renamed members, and records the classified
//! changes in a [`ClassHistory`].

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

use facet::Facet;
use finegrain::{EntityType, TreeError};

mod tracing_macros;
pub(crate) use tracing_macros::{debug, trace};

/// Walking a structural diff into a history
pub mod distiller;
/// Per-class change histories
pub mod history;
/// Structural diff input and the AST collaborator
pub mod structure;

pub use distiller::{Distillation, Distiller};
pub use history::{ClassHistory, EntityHistory, StructureEntityVersion};
pub use structure::{AstHelper, DiffKind, StructureDiffNode, StructureKind};

/// Errors while distilling a structural diff.
#[derive(Facet, Debug, Clone, PartialEq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum DistillError {
    /// trees of {entity} have different root labels: {left} vs {right}
    RootLabelMismatch {
        /// Entity whose trees were compared.
        entity: String,
        /// Label of the left root.
        left: EntityType,
        /// Label of the right root.
        right: EntityType,
    },

    /// trees of {entity} have different root values: {left} vs {right}
    RootValueMismatch {
        /// Entity whose trees were compared.
        entity: String,
        /// Value of the left root.
        left: String,
        /// Value of the right root.
        right: String,
    },

    /// class history could not be serialized: {message}
    Serialization {
        /// What the serializer reported.
        message: String,
    },
}

impl DistillError {
    pub(crate) fn tree(entity: &str, error: TreeError) -> Self {
        match error {
            TreeError::RootLabelMismatch { left, right } => DistillError::RootLabelMismatch {
                entity: entity.to_string(),
                left,
                right,
            },
            TreeError::RootValueMismatch { left, right } => DistillError::RootValueMismatch {
                entity: entity.to_string(),
                left,
                right,
            },
        }
    }
}
