//! Distilling classified changes out of a structural diff.
//!
//! The distiller walks the first class of a structural diff. Changed members
//! are differenced fine-grained and classified, in parallel. Added and
//! deleted members are paired into refactorings; the pairs are differenced
//! like changed members, the rest become ordinary inserts and deletes of the
//! class. Changed inner classes are walked recursively into their own
//! histories.

use finegrain::{
    ChangeType, ClassRefactoringHelper, EntityType, FieldRefactoringHelper, MatchingConfig,
    MethodRefactoringHelper, Modifiers, OperationKind, RefactoringCandidate, RefactoringHelper,
    RefactoringPair, SourceCodeChange, SourceCodeEntity, StructureEntity, Tree,
    changes_from_edit_script, classify, diff_trees, extract_refactorings,
};
use rayon::prelude::*;

use crate::history::{ClassHistory, StructureEntityVersion};
use crate::structure::{AstHelper, DiffKind, StructureDiffNode};
use crate::{DistillError, debug, trace};

/// Outcome of [`Distiller::distill`].
#[derive(Debug, Clone, PartialEq)]
pub struct Distillation {
    /// History of the distilled class.
    pub history: ClassHistory,
    /// Every classified change of the pass.
    pub changes: Vec<SourceCodeChange>,
}

/// Distills the changes between two versions of a file.
pub struct Distiller<'a> {
    left: &'a dyn AstHelper,
    right: &'a dyn AstHelper,
    config: MatchingConfig,
    methods: MethodRefactoringHelper,
    fields: FieldRefactoringHelper,
    classes: ClassRefactoringHelper,
}

/// The class currently walked.
struct ClassContext {
    name: String,
    structure: StructureEntity,
    source: SourceCodeEntity,
}

/// Added and deleted members of one class.
#[derive(Default)]
struct Candidates {
    added_methods: Vec<RefactoringCandidate>,
    deleted_methods: Vec<RefactoringCandidate>,
    added_attributes: Vec<RefactoringCandidate>,
    deleted_attributes: Vec<RefactoringCandidate>,
    added_classes: Vec<RefactoringCandidate>,
    deleted_classes: Vec<RefactoringCandidate>,
}

impl Candidates {
    fn push(&mut self, candidate: RefactoringCandidate) {
        let (added, deleted) = match candidate.kind() {
            EntityType::Method => (&mut self.added_methods, &mut self.deleted_methods),
            EntityType::Attribute => (&mut self.added_attributes, &mut self.deleted_attributes),
            _ => (&mut self.added_classes, &mut self.deleted_classes),
        };
        if candidate.change.kind() == OperationKind::Insert {
            added.push(candidate);
        } else {
            deleted.push(candidate);
        }
    }
}

#[derive(Default)]
struct ClassPass {
    /// Everything found, in processing order.
    changes: Vec<SourceCodeChange>,
    /// Changes recorded against the class itself.
    class_changes: Vec<SourceCodeChange>,
}

impl<'a> Distiller<'a> {
    /// A distiller reading the old version through `left` and the new one
    /// through `right`, matching with [`MatchingConfig::distilling`].
    pub fn new(left: &'a dyn AstHelper, right: &'a dyn AstHelper) -> Self {
        Self {
            left,
            right,
            config: MatchingConfig::distilling(),
            methods: MethodRefactoringHelper::default(),
            fields: FieldRefactoringHelper::default(),
            classes: ClassRefactoringHelper::default(),
        }
    }

    /// Match trees with `config` instead.
    pub fn with_config(mut self, config: MatchingConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the refactoring thresholds for methods, fields and inner
    /// classes.
    pub fn with_refactoring_thresholds(mut self, method: f64, field: f64, class: f64) -> Self {
        self.methods = MethodRefactoringHelper::with_threshold(method);
        self.fields = FieldRefactoringHelper::with_threshold(field);
        self.classes = ClassRefactoringHelper::with_threshold(class);
        self
    }

    /// Distill `diff` into a fresh history.
    ///
    /// Returns `None` when the diff holds no class present in both versions.
    pub fn distill(&self, diff: &StructureDiffNode) -> Result<Option<Distillation>, DistillError> {
        let Some(class) = distillable_class(diff) else {
            return Ok(None);
        };
        let context = self.class_context(class, self.left.top_level_name());
        let mut history = ClassHistory::new(context.structure.clone());
        let changes = self.distill_class(class, &context, &mut history)?;
        Ok(Some(Distillation { history, changes }))
    }

    /// Distill `diff` and append the result to an existing history.
    pub fn distill_into(
        &self,
        diff: &StructureDiffNode,
        history: &mut ClassHistory,
    ) -> Result<Vec<SourceCodeChange>, DistillError> {
        let Some(class) = distillable_class(diff) else {
            return Ok(Vec::new());
        };
        let context = self.class_context(class, self.left.top_level_name());
        self.distill_class(class, &context, history)
    }

    fn class_context(&self, node: &StructureDiffNode, enclosing: &str) -> ClassContext {
        let name = qualify(enclosing, &node.name);
        let modifiers = self.modifiers(node);
        let range = node.left.or(node.right).unwrap_or_default();
        ClassContext {
            structure: StructureEntity::new(EntityType::Class, &name, modifiers),
            source: SourceCodeEntity::new(&name, EntityType::Class, range).with_modifiers(modifiers),
            name,
        }
    }

    fn modifiers(&self, node: &StructureDiffNode) -> Modifiers {
        match (node.left, node.right) {
            (_, Some(right)) => self.right.modifiers(right),
            (Some(left), None) => self.left.modifiers(left),
            (None, None) => Modifiers::NONE,
        }
    }

    fn distill_class(
        &self,
        node: &StructureDiffNode,
        context: &ClassContext,
        history: &mut ClassHistory,
    ) -> Result<Vec<SourceCodeChange>, DistillError> {
        debug!(class = %context.name, members = node.children.len(), "distilling class");

        let mut pass = ClassPass::default();
        if let Some(version) = self.member_version(&context.name, node)? {
            pass.class_changes = version.changes;
        }

        let mut candidates = Candidates::default();
        let mut changed = Vec::new();
        for child in node.children.iter().filter(|c| c.is_usable()) {
            let Some(entity_type) = child.kind.entity_type() else {
                continue;
            };
            let name = qualify(&context.name, &child.name);
            match child.diff {
                DiffKind::Addition | DiffKind::Deletion => {
                    if let Some(candidate) = self.candidate(child, &name, entity_type, context) {
                        candidates.push(candidate);
                    }
                }
                DiffKind::Change if child.kind.is_class_or_interface() => {
                    let inner = self.class_context(child, &context.name);
                    let inner_history = history.inner_class_mut(&inner.structure);
                    let inner_changes = self.distill_class(child, &inner, inner_history)?;
                    pass.changes.extend(inner_changes);
                }
                DiffKind::Change => changed.push((name, child)),
            }
        }

        let versions = changed
            .par_iter()
            .map(|(name, member)| self.member_version(name, member))
            .collect::<Result<Vec<_>, _>>()?;
        for version in versions.into_iter().flatten() {
            pass.changes.extend(version.changes.iter().cloned());
            history.record(version);
        }

        self.check_refactorings(
            &candidates.added_methods,
            &candidates.deleted_methods,
            &self.methods,
            context,
            history,
            &mut pass,
        )?;
        self.check_refactorings(
            &candidates.added_attributes,
            &candidates.deleted_attributes,
            &self.fields,
            context,
            history,
            &mut pass,
        )?;
        self.check_refactorings(
            &candidates.added_classes,
            &candidates.deleted_classes,
            &self.classes,
            context,
            history,
            &mut pass,
        )?;

        pass.changes.extend(pass.class_changes.iter().cloned());
        history.record(StructureEntityVersion::new(
            context.structure.clone(),
            pass.class_changes,
        ));
        history.prune();

        debug!(class = %context.name, changes = pass.changes.len(), "class distilled");
        Ok(pass.changes)
    }

    /// The insert or delete of an added or deleted member.
    fn candidate(
        &self,
        node: &StructureDiffNode,
        name: &str,
        entity_type: EntityType,
        context: &ClassContext,
    ) -> Option<RefactoringCandidate> {
        let root = context.structure.clone();
        let parent = context.source.clone();
        let (change, text) = match node.diff {
            DiffKind::Addition => {
                let range = node.right?;
                let entity = SourceCodeEntity::new(name, entity_type, range)
                    .with_modifiers(self.right.modifiers(range));
                (
                    SourceCodeChange::insert(root, entity, parent),
                    self.right.source_text(range),
                )
            }
            DiffKind::Deletion => {
                let range = node.left?;
                let entity = SourceCodeEntity::new(name, entity_type, range)
                    .with_modifiers(self.left.modifiers(range));
                (
                    SourceCodeChange::delete(root, entity, parent),
                    self.left.source_text(range),
                )
            }
            DiffKind::Change => return None,
        };
        Some(RefactoringCandidate::new(
            change,
            &node.name,
            text.unwrap_or_default(),
        ))
    }

    /// Classified changes of a member (or class declaration) present on both
    /// sides, `None` when its trees did not differ.
    fn member_version(
        &self,
        name: &str,
        node: &StructureDiffNode,
    ) -> Result<Option<StructureEntityVersion>, DistillError> {
        let (Some(left_range), Some(right_range)) = (node.left, node.right) else {
            return Ok(None);
        };
        let Some(entity_type) = node.kind.entity_type() else {
            return Ok(None);
        };
        let entity = StructureEntity::new(entity_type, name, self.right.modifiers(right_range));
        trace!(entity = %name, "diffing member");

        let mut raw = Vec::new();
        if node.kind.is_method_or_constructor() {
            raw.extend(self.tree_changes(
                &entity,
                self.left.body_tree(name, left_range),
                self.right.body_tree(name, right_range),
            )?);
        }
        raw.extend(self.tree_changes(
            &entity,
            self.left.declaration_tree(name, left_range),
            self.right.declaration_tree(name, right_range),
        )?);

        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(StructureEntityVersion::new(entity, classify(raw))))
    }

    fn tree_changes(
        &self,
        root: &StructureEntity,
        left: Option<Tree>,
        right: Option<Tree>,
    ) -> Result<Vec<SourceCodeChange>, DistillError> {
        let (Some(mut left), Some(mut right)) = (left, right) else {
            return Ok(Vec::new());
        };
        let ops = diff_trees(&mut left, &mut right, &self.config)
            .map_err(|e| DistillError::tree(&root.unique_name, e))?;
        Ok(changes_from_edit_script(&ops, &left, &right, root))
    }

    fn check_refactorings(
        &self,
        added: &[RefactoringCandidate],
        deleted: &[RefactoringCandidate],
        helper: &dyn RefactoringHelper,
        context: &ClassContext,
        history: &mut ClassHistory,
        pass: &mut ClassPass,
    ) -> Result<(), DistillError> {
        if added.is_empty() && deleted.is_empty() {
            return Ok(());
        }
        let refactorings = extract_refactorings(added, deleted, helper);

        for pair in &refactorings.pairs {
            let version = self.refactoring_version(pair, helper, context, history)?;
            pass.changes.extend(version.changes.iter().cloned());
            if version.entity.entity_type == EntityType::Class {
                history.inner_class_mut(&version.entity).record(version);
            } else {
                history.record(version);
            }
        }

        let remaining = refactorings
            .unclaimed_added(added)
            .chain(refactorings.unclaimed_deleted(deleted));
        for candidate in remaining {
            pass.class_changes.extend(classify(vec![candidate.change.clone()]));
        }
        Ok(())
    }

    /// Changes of a refactored entity, filed under its new name.
    fn refactoring_version(
        &self,
        pair: &RefactoringPair<'_>,
        helper: &dyn RefactoringHelper,
        context: &ClassContext,
        history: &mut ClassHistory,
    ) -> Result<StructureEntityVersion, DistillError> {
        let left_range = pair.deleted.change.changed.range;
        let right_range = pair.inserted.change.changed.range;
        let old_name = qualify(&context.name, &pair.deleted.name);
        let new_name = qualify(&context.name, &pair.inserted.name);
        let entity = StructureEntity::new(
            helper.entity_type(),
            &new_name,
            self.right.modifiers(right_range),
        );
        history.rename(helper.entity_type(), &old_name, &new_name);

        // both sides are built under the new name so their roots agree
        let mut raw = self.tree_changes(
            &entity,
            self.left.declaration_tree(&new_name, left_range),
            self.right.declaration_tree(&new_name, right_range),
        )?;
        if helper.entity_type() == EntityType::Method {
            raw.extend(self.tree_changes(
                &entity,
                self.left.body_tree(&new_name, left_range),
                self.right.body_tree(&new_name, right_range),
            )?);
        }
        let mut changes = classify(raw);

        let old_short = helper.short_name(&pair.deleted.name);
        let new_short = helper.short_name(&pair.inserted.name);
        let renaming = renaming_type(helper.declaration_type());
        if old_short != new_short && !changes.iter().any(|c| c.change_type == renaming) {
            let declaration = helper.declaration_type();
            let rename = SourceCodeChange::update(
                entity.clone(),
                SourceCodeEntity::new(old_short, declaration, left_range),
                SourceCodeEntity::new(new_short, declaration, right_range),
                context.source.clone(),
            )
            .with_change_type(renaming);
            changes.insert(0, rename);
        }

        debug!(old = %old_name, new = %new_name, changes = changes.len(), "refactoring distilled");
        Ok(StructureEntityVersion::new(entity, changes))
    }
}

fn distillable_class(diff: &StructureDiffNode) -> Option<&StructureDiffNode> {
    diff.find_class().filter(|class| class.diff == DiffKind::Change)
}

fn qualify(enclosing: &str, name: &str) -> String {
    if enclosing.is_empty() {
        name.to_string()
    } else {
        format!("{enclosing}.{name}")
    }
}

fn renaming_type(declaration: EntityType) -> ChangeType {
    match declaration {
        EntityType::MethodDeclaration => ChangeType::MethodRenaming,
        EntityType::FieldDeclaration => ChangeType::AttributeRenaming,
        _ => ChangeType::ClassRenaming,
    }
}
