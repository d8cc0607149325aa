//! Change classification.
//!
//! Raw changes are split into four pools (inserts, deletes, moves, updates)
//! and worked through in that order. For each change the first rule of its
//! kind whose predicate applies decides the outcome: a tagged change, a
//! change fused with a counterpart taken out of another pool, or nothing.
//! Changes that end up with nothing stay in their pool, where later rules
//! may still consume them, and are never reported.
//!
//! The pools live for one [`classify`] call only.

use crate::{debug, trace};

use crate::change::{OperationKind, SourceCodeChange};
use crate::entity::{ChangeType, EntityType, SourceCodeEntity};

const PUBLIC: &str = "public";
const PRIVATE: &str = "private";
const PROTECTED: &str = "protected";
const FINAL: &str = "final";

/// Classify raw changes of one structure entity.
///
/// Returns the changes that received a change type, deduplicated, inserts
/// first, then deletes, moves and updates, each in input order.
pub fn classify(changes: Vec<SourceCodeChange>) -> Vec<SourceCodeChange> {
    debug!(input = changes.len(), "classify start");
    let mut pools = Pools::new(changes);
    let mut classified: Vec<SourceCodeChange> = Vec::new();

    for kind in OperationKind::CLASSIFICATION_ORDER {
        for index in 0..pools.len(kind) {
            let Some(change) = pools.take(kind, index) else {
                continue;
            };
            match classify_one(&mut pools, &change) {
                Some(result) if !classified.contains(&result) => classified.push(result),
                _ => pools.restore(kind, index, change),
            }
        }
    }

    debug!(classified = classified.len(), "classify done");
    classified
}

fn classify_one(pools: &mut Pools, change: &SourceCodeChange) -> Option<SourceCodeChange> {
    if change.is_classified() {
        return Some(change.clone());
    }
    if change.changed.entity_type.is_branch()
        || change.new_entity().is_some_and(|e| e.entity_type.is_branch())
    {
        trace!(changed = %change.changed.entity_type, "branch wrapper suppressed");
        return None;
    }

    let rule = rules(change.kind())
        .iter()
        .find(|rule| (rule.applies)(change))?;
    let result = (rule.classify)(pools, change).filter(SourceCodeChange::is_classified);
    trace!(
        rule = rule.name,
        kind = ?change.kind(),
        changed = %change.changed.entity_type,
        result = ?result.as_ref().map(|c| c.change_type),
        "rule fired"
    );
    result
}

/// Call-local working set of not yet classified changes, one slot per input
/// change. A slot is emptied when its change is classified or consumed.
struct Pools {
    slots: [Vec<Option<SourceCodeChange>>; 4],
}

impl Pools {
    fn new(changes: Vec<SourceCodeChange>) -> Self {
        let mut slots: [Vec<Option<SourceCodeChange>>; 4] = Default::default();
        for change in changes {
            slots[Self::index(change.kind())].push(Some(change));
        }
        Self { slots }
    }

    fn index(kind: OperationKind) -> usize {
        match kind {
            OperationKind::Insert => 0,
            OperationKind::Delete => 1,
            OperationKind::Move => 2,
            OperationKind::Update => 3,
        }
    }

    fn len(&self, kind: OperationKind) -> usize {
        self.slots[Self::index(kind)].len()
    }

    fn get(&self, kind: OperationKind, index: usize) -> Option<&SourceCodeChange> {
        self.slots[Self::index(kind)].get(index)?.as_ref()
    }

    fn take(&mut self, kind: OperationKind, index: usize) -> Option<SourceCodeChange> {
        self.slots[Self::index(kind)].get_mut(index)?.take()
    }

    fn restore(&mut self, kind: OperationKind, index: usize, change: SourceCodeChange) {
        if let Some(slot) = self.slots[Self::index(kind)].get_mut(index) {
            *slot = Some(change);
        }
    }

    fn position(
        &self,
        kind: OperationKind,
        predicate: impl Fn(&SourceCodeChange) -> bool,
    ) -> Option<usize> {
        self.slots[Self::index(kind)]
            .iter()
            .position(|slot| slot.as_ref().is_some_and(&predicate))
    }

    fn any(&self, kind: OperationKind, predicate: impl Fn(&SourceCodeChange) -> bool) -> bool {
        self.position(kind, predicate).is_some()
    }

    fn take_first(
        &mut self,
        kind: OperationKind,
        predicate: impl Fn(&SourceCodeChange) -> bool,
    ) -> Option<SourceCodeChange> {
        let index = self.position(kind, predicate)?;
        self.take(kind, index)
    }
}

/// One row of a decision table.
struct Rule {
    name: &'static str,
    applies: fn(&SourceCodeChange) -> bool,
    classify: fn(&mut Pools, &SourceCodeChange) -> Option<SourceCodeChange>,
}

fn rules(kind: OperationKind) -> &'static [Rule] {
    match kind {
        OperationKind::Insert => INSERT_RULES,
        OperationKind::Delete => DELETE_RULES,
        OperationKind::Move => MOVE_RULES,
        OperationKind::Update => UPDATE_RULES,
    }
}

const INSERT_RULES: &[Rule] = &[
    Rule {
        name: "modifier",
        applies: on_modifiers,
        classify: insert_modifier,
    },
    Rule {
        name: "member",
        applies: on_member,
        classify: insert_member,
    },
    Rule {
        name: "doc",
        applies: on_javadoc,
        classify: insert_doc,
    },
    Rule {
        name: "parameter",
        applies: on_parameter,
        classify: insert_parameter,
    },
    Rule {
        name: "parameter type",
        applies: on_parameter_type,
        classify: insert_parameter_type,
    },
    Rule {
        name: "return type",
        applies: on_return_type,
        classify: insert_return_type,
    },
    Rule {
        name: "attribute type",
        applies: on_attribute_type,
        classify: insert_attribute_type,
    },
    Rule {
        name: "inheritance",
        applies: on_inheritance,
        classify: insert_inheritance,
    },
    Rule {
        name: "comment",
        applies: on_comment,
        classify: insert_comment,
    },
    Rule {
        name: "statement",
        applies: on_statement,
        classify: insert_statement,
    },
];

const DELETE_RULES: &[Rule] = &[
    Rule {
        name: "modifier",
        applies: on_modifiers,
        classify: delete_modifier,
    },
    Rule {
        name: "member",
        applies: on_member,
        classify: delete_member,
    },
    Rule {
        name: "doc",
        applies: on_javadoc,
        classify: delete_doc,
    },
    Rule {
        name: "parameter",
        applies: on_parameter,
        classify: delete_parameter,
    },
    Rule {
        name: "return type",
        applies: on_return_type,
        classify: delete_return_type,
    },
    Rule {
        name: "inheritance",
        applies: on_inheritance,
        classify: delete_inheritance,
    },
    Rule {
        name: "comment",
        applies: on_comment,
        classify: delete_comment,
    },
    Rule {
        name: "statement",
        applies: on_statement,
        classify: delete_statement,
    },
];

const MOVE_RULES: &[Rule] = &[
    Rule {
        name: "parameter ordering",
        applies: on_parameter,
        classify: move_parameter,
    },
    Rule {
        name: "comment",
        applies: on_comment,
        classify: move_comment,
    },
    Rule {
        name: "statement",
        applies: on_statement,
        classify: move_statement,
    },
];

const UPDATE_RULES: &[Rule] = &[
    Rule {
        name: "renaming",
        applies: update_on_declaration,
        classify: update_renaming,
    },
    Rule {
        name: "modifier",
        applies: on_modifiers,
        classify: update_modifier,
    },
    Rule {
        name: "doc",
        applies: on_javadoc,
        classify: update_doc,
    },
    Rule {
        name: "parameter type",
        applies: update_on_parameter_type,
        classify: update_parameter_type,
    },
    Rule {
        name: "return type",
        applies: update_on_return_type,
        classify: update_return_type,
    },
    Rule {
        name: "parameter",
        applies: update_on_parameter,
        classify: update_parameter,
    },
    Rule {
        name: "attribute type",
        applies: update_on_attribute_type,
        classify: update_attribute_type,
    },
    Rule {
        name: "inheritance",
        applies: update_on_inheritance,
        classify: update_inheritance,
    },
    Rule {
        name: "condition",
        applies: update_on_condition,
        classify: update_condition,
    },
    Rule {
        name: "comment",
        applies: update_on_comment,
        classify: update_comment,
    },
    Rule {
        name: "statement",
        applies: update_on_statement,
        classify: update_statement,
    },
];

// Predicates

fn root_is(change: &SourceCodeChange, entity_type: EntityType) -> bool {
    change.root.entity_type == entity_type
}

fn parent_is(change: &SourceCodeChange, entity_type: EntityType) -> bool {
    change.parent.entity_type == entity_type
}

fn changed_is(change: &SourceCodeChange, entity_type: EntityType) -> bool {
    change.changed.entity_type == entity_type
}

fn new_type(change: &SourceCodeChange) -> Option<EntityType> {
    change.new_entity().map(|e| e.entity_type)
}

fn on_modifiers(change: &SourceCodeChange) -> bool {
    parent_is(change, EntityType::Modifiers)
}

fn on_member(change: &SourceCodeChange) -> bool {
    change.changed.entity_type.is_structure()
}

fn on_javadoc(change: &SourceCodeChange) -> bool {
    changed_is(change, EntityType::Javadoc)
}

fn on_parameter(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method)
        && parent_is(change, EntityType::Parameters)
        && changed_is(change, EntityType::SingleVariableDeclaration)
}

fn on_parameter_type(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method)
        && parent_is(change, EntityType::SingleVariableDeclaration)
        && change.changed.entity_type.is_type()
}

fn on_return_type(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method)
        && parent_is(change, EntityType::MethodDeclaration)
        && change.changed.entity_type.is_type()
}

fn on_attribute_type(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Attribute) && change.changed.entity_type.is_type()
}

fn on_inheritance(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Class) && change.changed.entity_type.is_type()
}

fn on_comment(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method) && change.changed.entity_type.is_comment()
}

fn on_statement(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method) && change.changed.entity_type.is_statement()
}

fn update_on_declaration(change: &SourceCodeChange) -> bool {
    matches!(
        new_type(change),
        Some(
            EntityType::MethodDeclaration
                | EntityType::FieldDeclaration
                | EntityType::TypeDeclaration
        )
    )
}

fn update_on_parameter_type(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method)
        && parent_is(change, EntityType::SingleVariableDeclaration)
        && new_type(change).is_some_and(EntityType::is_type)
}

fn update_on_return_type(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method)
        && parent_is(change, EntityType::MethodDeclaration)
        && new_type(change).is_some_and(EntityType::is_type)
}

fn update_on_parameter(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method)
        && new_type(change) == Some(EntityType::SingleVariableDeclaration)
}

fn update_on_attribute_type(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Attribute) && new_type(change).is_some_and(EntityType::is_type)
}

fn update_on_inheritance(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Class) && new_type(change).is_some_and(EntityType::is_type)
}

fn update_on_condition(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method) && new_type(change).is_some_and(EntityType::has_condition)
}

fn update_on_comment(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method) && new_type(change).is_some_and(EntityType::is_comment)
}

fn update_on_statement(change: &SourceCodeChange) -> bool {
    root_is(change, EntityType::Method) && new_type(change).is_some_and(EntityType::is_statement)
}

// Helpers

fn tag(change: &SourceCodeChange, change_type: ChangeType) -> SourceCodeChange {
    change.clone().with_change_type(change_type)
}

/// An update anchored at the root of `anchor`.
fn fused(
    anchor: &SourceCodeChange,
    old: SourceCodeEntity,
    new: SourceCodeEntity,
    parent: SourceCodeEntity,
    change_type: ChangeType,
) -> SourceCodeChange {
    SourceCodeChange::update(anchor.root.clone(), old, new, parent).with_change_type(change_type)
}

fn same_root(a: &SourceCodeChange, b: &SourceCodeChange) -> bool {
    a.root.entity_type == b.root.entity_type && a.root.unique_name == b.root.unique_name
}

fn is_modifier(change: &SourceCodeChange, anchor: &SourceCodeChange, name: &str) -> bool {
    same_root(change, anchor)
        && parent_is(change, EntityType::Modifiers)
        && changed_is(change, EntityType::Modifier)
        && change.changed.unique_name == name
}

/// Splits `x: int` into `("x", Some("int"))`.
fn split_typed(name: &str) -> (&str, Option<&str>) {
    match name.split_once(':') {
        Some((head, ty)) => (head.trim(), Some(ty.trim())),
        None => (name.trim(), None),
    }
}

fn is_void(name: &str) -> bool {
    split_typed(name).1.unwrap_or(name.trim()) == "void"
}

fn is_parameter(change: &SourceCodeChange, anchor: &SourceCodeChange) -> bool {
    same_root(change, anchor) && on_parameter(change)
}

/// A type directly under the declaration of parameter `param`.
fn is_parameter_type(change: &SourceCodeChange, anchor: &SourceCodeChange, param: &str) -> bool {
    same_root(change, anchor)
        && on_parameter_type(change)
        && split_typed(&change.parent.unique_name).0 == param
}

fn is_return_type(change: &SourceCodeChange, anchor: &SourceCodeChange) -> bool {
    same_root(change, anchor)
        && on_return_type(change)
        && change.parent.unique_name == anchor.parent.unique_name
}

/// Accessibility rank: private < package < protected < public.
fn visibility(name: &str) -> Option<u8> {
    match name {
        PRIVATE => Some(0),
        PROTECTED => Some(2),
        PUBLIC => Some(3),
        _ => None,
    }
}

// Modifiers

/// `final` appearing or disappearing on the root entity.
fn final_toggle(change: &SourceCodeChange, added: bool) -> Option<SourceCodeChange> {
    let change_type = match (change.root.entity_type, added) {
        (EntityType::Class, true) => ChangeType::RemovingClassDerivability,
        (EntityType::Class, false) => ChangeType::AddingClassDerivability,
        (EntityType::Method, true) => ChangeType::RemovingMethodOverridability,
        (EntityType::Method, false) => ChangeType::AddingMethodOverridability,
        (EntityType::Attribute, true) => ChangeType::RemovingAttributeModifiability,
        (EntityType::Attribute, false) => ChangeType::AddingAttributeModifiability,
        _ => return None,
    };
    Some(tag(change, change_type))
}

/// Fuse an inserted modifier with the first pending delete among `names`.
fn fuse_with_delete(
    pools: &mut Pools,
    ins: &SourceCodeChange,
    names: &[&str],
    change_type: ChangeType,
) -> SourceCodeChange {
    for name in names {
        if let Some(del) = pools.take_first(OperationKind::Delete, |d| is_modifier(d, ins, name)) {
            return fused(
                ins,
                del.changed,
                ins.changed.clone(),
                ins.parent.clone(),
                change_type,
            );
        }
    }
    tag(ins, change_type)
}

/// Fuse a deleted modifier with the first pending insert among `names`.
fn fuse_with_insert(
    pools: &mut Pools,
    del: &SourceCodeChange,
    names: &[&str],
    change_type: ChangeType,
) -> SourceCodeChange {
    for name in names {
        if let Some(ins) = pools.take_first(OperationKind::Insert, |i| is_modifier(i, del, name)) {
            return fused(del, del.changed.clone(), ins.changed, ins.parent, change_type);
        }
    }
    tag(del, change_type)
}

fn insert_modifier(pools: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    match ins.changed.unique_name.as_str() {
        FINAL => final_toggle(ins, true),
        PUBLIC => Some(fuse_with_delete(
            pools,
            ins,
            &[PROTECTED, PRIVATE],
            ChangeType::IncreasingAccessibilityChange,
        )),
        PRIVATE => Some(fuse_with_delete(
            pools,
            ins,
            &[PROTECTED, PUBLIC],
            ChangeType::DecreasingAccessibilityChange,
        )),
        PROTECTED => {
            // left for the delete of `public`/`private` to pair with
            let replaces = pools.any(OperationKind::Delete, |d| {
                is_modifier(d, ins, PUBLIC) || is_modifier(d, ins, PRIVATE)
            });
            (!replaces).then(|| tag(ins, ChangeType::IncreasingAccessibilityChange))
        }
        _ => None,
    }
}

fn delete_modifier(pools: &mut Pools, del: &SourceCodeChange) -> Option<SourceCodeChange> {
    match del.changed.unique_name.as_str() {
        FINAL => final_toggle(del, false),
        PRIVATE => {
            // an inserted `protected` replaces `public` first when both go away
            let public_pending = pools.any(OperationKind::Delete, |d| is_modifier(d, del, PUBLIC));
            let replacement = if public_pending {
                None
            } else {
                pools.take_first(OperationKind::Insert, |i| is_modifier(i, del, PROTECTED))
            };
            Some(match replacement {
                Some(ins) => fused(
                    del,
                    del.changed.clone(),
                    ins.changed,
                    ins.parent,
                    ChangeType::IncreasingAccessibilityChange,
                ),
                None => tag(del, ChangeType::IncreasingAccessibilityChange),
            })
        }
        PUBLIC => Some(fuse_with_insert(
            pools,
            del,
            &[PROTECTED, PRIVATE],
            ChangeType::DecreasingAccessibilityChange,
        )),
        PROTECTED => {
            let replaced = pools.any(OperationKind::Insert, |i| {
                is_modifier(i, del, PUBLIC) || is_modifier(i, del, PRIVATE)
            });
            (!replaced).then(|| tag(del, ChangeType::DecreasingAccessibilityChange))
        }
        _ => None,
    }
}

fn update_modifier(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    let new = update.new_entity()?;
    let old_rank = visibility(&update.changed.unique_name)?;
    let new_rank = visibility(&new.unique_name)?;
    match old_rank.cmp(&new_rank) {
        core::cmp::Ordering::Less => Some(tag(update, ChangeType::IncreasingAccessibilityChange)),
        core::cmp::Ordering::Greater => {
            Some(tag(update, ChangeType::DecreasingAccessibilityChange))
        }
        core::cmp::Ordering::Equal => None,
    }
}

// Members

fn insert_member(_: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    let change_type = match ins.changed.entity_type {
        EntityType::Method => ChangeType::AdditionalFunctionality,
        EntityType::Attribute => ChangeType::AdditionalObjectState,
        EntityType::Class => ChangeType::AdditionalClass,
        _ => return None,
    };
    Some(tag(ins, change_type))
}

fn delete_member(_: &mut Pools, del: &SourceCodeChange) -> Option<SourceCodeChange> {
    let change_type = match del.changed.entity_type {
        EntityType::Method => ChangeType::RemovedFunctionality,
        EntityType::Attribute => ChangeType::RemovedObjectState,
        EntityType::Class => ChangeType::RemovedClass,
        _ => return None,
    };
    Some(tag(del, change_type))
}

fn update_renaming(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    let change_type = match new_type(update)? {
        EntityType::MethodDeclaration => ChangeType::MethodRenaming,
        EntityType::FieldDeclaration => ChangeType::AttributeRenaming,
        EntityType::TypeDeclaration => ChangeType::ClassRenaming,
        _ => return None,
    };
    Some(tag(update, change_type))
}

// Documentation

fn insert_doc(pools: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    let replaced = pools.take_first(OperationKind::Delete, |d| {
        on_javadoc(d) && same_root(d, ins) && d.parent.same_as(&ins.parent)
    });
    Some(match replaced {
        Some(del) => fused(
            ins,
            del.changed,
            ins.changed.clone(),
            ins.parent.clone(),
            ChangeType::DocUpdate,
        ),
        None => tag(ins, ChangeType::DocInsert),
    })
}

fn delete_doc(_: &mut Pools, del: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(del, ChangeType::DocDelete))
}

fn update_doc(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(update, ChangeType::DocUpdate))
}

// Parameters

fn insert_parameter(pools: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    let name = ins.changed.unique_name.as_str();

    // the type node moved over from another declaration: a renamed parameter
    let moved_type = pools.position(OperationKind::Move, |m| {
        same_root(m, ins)
            && parent_is(m, EntityType::SingleVariableDeclaration)
            && m.new_parent().is_some_and(|p| {
                p.entity_type == EntityType::SingleVariableDeclaration && p.unique_name == name
            })
    });
    if let Some(index) = moved_type {
        let old_name = pools
            .get(OperationKind::Move, index)
            .map(|m| m.parent.unique_name.clone());
        let old_declaration = pools.take_first(OperationKind::Delete, |d| {
            is_parameter(d, ins) && Some(&d.changed.unique_name) == old_name.as_ref()
        });
        if let Some(del) = old_declaration {
            pools.take(OperationKind::Move, index);
            return Some(fused(
                ins,
                del.changed,
                ins.changed.clone(),
                ins.parent.clone(),
                ChangeType::ParameterRenaming,
            ));
        }
    }

    let (param, ty) = split_typed(name);
    let same_name = pools.position(OperationKind::Delete, |d| {
        is_parameter(d, ins) && split_typed(&d.changed.unique_name).0 == param
    });
    if let Some(index) = same_name {
        let old = pools.get(OperationKind::Delete, index)?.changed.clone();
        match (split_typed(&old.unique_name).1, ty) {
            (Some(old_ty), Some(new_ty)) if old_ty != new_ty => {
                pools.take(OperationKind::Delete, index);
                consume_parameter_types(pools, ins, param);
                return Some(fused(
                    ins,
                    old,
                    ins.changed.clone(),
                    ins.parent.clone(),
                    ChangeType::ParameterTypeChange,
                ));
            }
            (None, None) => {
                // values carry the name only, the types are child nodes
                let old_type = pools.position(OperationKind::Delete, |d| is_parameter_type(d, ins, param));
                let new_type = pools.position(OperationKind::Insert, |i| is_parameter_type(i, ins, param));
                if let (Some(o), Some(n)) = (old_type, new_type) {
                    let differs = match (pools.get(OperationKind::Delete, o), pools.get(OperationKind::Insert, n)) {
                        (Some(d), Some(i)) => d.changed.unique_name != i.changed.unique_name,
                        _ => false,
                    };
                    if differs {
                        pools.take(OperationKind::Delete, index);
                        let old_type = pools.take(OperationKind::Delete, o)?;
                        let new_type = pools.take(OperationKind::Insert, n)?;
                        return Some(fused(
                            ins,
                            old_type.changed,
                            new_type.changed,
                            ins.changed.clone(),
                            ChangeType::ParameterTypeChange,
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    // same type in the same list under another name
    if let Some(ty) = ty {
        let renamed = pools.take_first(OperationKind::Delete, |d| {
            let (other_param, other_ty) = split_typed(&d.changed.unique_name);
            is_parameter(d, ins) && other_ty == Some(ty) && other_param != param
        });
        if let Some(del) = renamed {
            return Some(fused(
                ins,
                del.changed,
                ins.changed.clone(),
                ins.parent.clone(),
                ChangeType::ParameterRenaming,
            ));
        }
    }

    Some(tag(ins, ChangeType::ParameterInsert))
}

/// Drop the type nodes that went with a re-created parameter declaration.
fn consume_parameter_types(pools: &mut Pools, anchor: &SourceCodeChange, param: &str) {
    while pools
        .take_first(OperationKind::Delete, |d| is_parameter_type(d, anchor, param))
        .is_some()
    {}
    while pools
        .take_first(OperationKind::Insert, |i| is_parameter_type(i, anchor, param))
        .is_some()
    {}
}

fn insert_parameter_type(pools: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    let param = split_typed(&ins.parent.unique_name).0;
    let del = pools.take_first(OperationKind::Delete, |d| {
        is_parameter_type(d, ins, param) && d.changed.unique_name != ins.changed.unique_name
    })?;
    Some(fused(
        ins,
        del.changed,
        ins.changed.clone(),
        ins.parent.clone(),
        ChangeType::ParameterTypeChange,
    ))
}

fn delete_parameter(_: &mut Pools, del: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(del, ChangeType::ParameterDelete))
}

fn move_parameter(_: &mut Pools, moved: &SourceCodeChange) -> Option<SourceCodeChange> {
    let reordered = moved
        .new_parent()
        .is_some_and(|p| p.entity_type == EntityType::Parameters);
    reordered.then(|| tag(moved, ChangeType::ParameterOrderingChange))
}

fn update_parameter_type(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    let new = update.new_entity()?;
    let old_ty = split_typed(&update.changed.unique_name).1;
    let new_ty = split_typed(&new.unique_name).1;
    (old_ty != new_ty).then(|| tag(update, ChangeType::ParameterTypeChange))
}

fn update_parameter(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    let new = update.new_entity()?;
    let (old_param, old_ty) = split_typed(&update.changed.unique_name);
    let (new_param, new_ty) = split_typed(&new.unique_name);
    if old_param != new_param {
        Some(tag(update, ChangeType::ParameterRenaming))
    } else if old_ty != new_ty {
        Some(tag(update, ChangeType::ParameterTypeChange))
    } else {
        None
    }
}

// Return types

fn insert_return_type(pools: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    let typed_delete = |d: &SourceCodeChange| is_return_type(d, ins) && !is_void(&d.changed.unique_name);

    if is_void(&ins.changed.unique_name) {
        // the method became void: report the type that went away
        let del = pools.take_first(OperationKind::Delete, typed_delete)?;
        return Some(del.with_change_type(ChangeType::ReturnTypeDelete));
    }
    if let Some(del) = pools.take_first(OperationKind::Delete, typed_delete) {
        return Some(fused(
            ins,
            del.changed,
            ins.changed.clone(),
            ins.parent.clone(),
            ChangeType::ReturnTypeChange,
        ));
    }
    pools.take_first(OperationKind::Delete, |d| {
        is_return_type(d, ins) && is_void(&d.changed.unique_name)
    });
    Some(tag(ins, ChangeType::ReturnTypeInsert))
}

fn delete_return_type(_: &mut Pools, del: &SourceCodeChange) -> Option<SourceCodeChange> {
    (!is_void(&del.changed.unique_name)).then(|| tag(del, ChangeType::ReturnTypeDelete))
}

fn update_return_type(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    let new = update.new_entity()?;
    let change = if is_void(&new.unique_name) {
        SourceCodeChange::delete(
            update.root.clone(),
            update.changed.clone(),
            update.parent.clone(),
        )
        .with_change_type(ChangeType::ReturnTypeDelete)
    } else if is_void(&update.changed.unique_name) {
        SourceCodeChange::insert(update.root.clone(), new.clone(), update.parent.clone())
            .with_change_type(ChangeType::ReturnTypeInsert)
    } else {
        tag(update, ChangeType::ReturnTypeChange)
    };
    Some(change)
}

// Attribute types

fn insert_attribute_type(pools: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    let del = pools.take_first(OperationKind::Delete, |d| {
        same_root(d, ins) && d.changed.entity_type.is_type() && d.parent.same_as(&ins.parent)
    })?;
    Some(fused(
        ins,
        del.changed,
        ins.changed.clone(),
        ins.parent.clone(),
        ChangeType::AttributeTypeChange,
    ))
}

fn update_attribute_type(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(update, ChangeType::AttributeTypeChange))
}

// Inheritance

fn insert_inheritance(pools: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    match ins.parent.entity_type {
        EntityType::SuperInterfaceTypes => Some(tag(ins, ChangeType::ParentInterfaceInsert)),
        EntityType::TypeDeclaration => {
            let replaced = pools.take_first(OperationKind::Delete, |d| {
                same_root(d, ins)
                    && parent_is(d, EntityType::TypeDeclaration)
                    && d.changed.entity_type.is_type()
            });
            Some(match replaced {
                Some(del) => fused(
                    ins,
                    del.changed,
                    ins.changed.clone(),
                    ins.parent.clone(),
                    ChangeType::ParentClassChange,
                ),
                None => tag(ins, ChangeType::ParentClassInsert),
            })
        }
        _ => None,
    }
}

fn delete_inheritance(_: &mut Pools, del: &SourceCodeChange) -> Option<SourceCodeChange> {
    match del.parent.entity_type {
        EntityType::SuperInterfaceTypes => Some(tag(del, ChangeType::ParentInterfaceDelete)),
        EntityType::TypeDeclaration => Some(tag(del, ChangeType::ParentClassDelete)),
        _ => None,
    }
}

fn update_inheritance(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    match update.parent.entity_type {
        EntityType::SuperInterfaceTypes => Some(tag(update, ChangeType::ParentInterfaceChange)),
        EntityType::TypeDeclaration => Some(tag(update, ChangeType::ParentClassChange)),
        _ => None,
    }
}

// Comments and statements

fn insert_comment(_: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(ins, ChangeType::CommentInsert))
}

fn delete_comment(_: &mut Pools, del: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(del, ChangeType::CommentDelete))
}

fn move_comment(_: &mut Pools, moved: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(moved, ChangeType::CommentMove))
}

fn update_comment(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(update, ChangeType::CommentUpdate))
}

fn insert_statement(_: &mut Pools, ins: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(ins, ChangeType::StatementInsert))
}

fn delete_statement(_: &mut Pools, del: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(del, ChangeType::StatementDelete))
}

fn move_statement(_: &mut Pools, moved: &SourceCodeChange) -> Option<SourceCodeChange> {
    let new_parent = moved.new_parent()?;
    let change_type = if moved.parent.same_as(new_parent) {
        ChangeType::StatementOrderingChange
    } else {
        ChangeType::StatementParentChange
    };
    Some(tag(moved, change_type))
}

fn update_condition(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(update, ChangeType::ConditionExpressionChange))
}

fn update_statement(_: &mut Pools, update: &SourceCodeChange) -> Option<SourceCodeChange> {
    Some(tag(update, ChangeType::StatementUpdate))
}
