//! Per-class change histories.

use std::collections::BTreeMap;

use facet::Facet;
use finegrain::{EntityType, SourceCodeChange, StructureEntity};

use crate::DistillError;

/// The classified changes one distilling pass found in one structure entity.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct StructureEntityVersion {
    /// The method, field or class as of this version.
    pub entity: StructureEntity,
    /// Classified changes, in classification order.
    pub changes: Vec<SourceCodeChange>,
}

impl StructureEntityVersion {
    /// A version of `entity` carrying `changes`.
    pub fn new(entity: StructureEntity, changes: Vec<SourceCodeChange>) -> Self {
        Self { entity, changes }
    }

    /// Fully qualified name of the entity.
    pub fn unique_name(&self) -> &str {
        &self.entity.unique_name
    }
}

/// Versions of one method or field, oldest first.
#[derive(Facet, Debug, Clone, PartialEq, Default)]
pub struct EntityHistory {
    /// Recorded versions.
    pub versions: Vec<StructureEntityVersion>,
}

impl EntityHistory {
    /// Most recent version.
    pub fn latest(&self) -> Option<&StructureEntityVersion> {
        self.versions.last()
    }

    /// All changes over all versions.
    pub fn changes(&self) -> impl Iterator<Item = &SourceCodeChange> {
        self.versions.iter().flat_map(|v| v.changes.iter())
    }
}

/// Change history of a class, its members and its inner classes.
///
/// Histories are keyed by fully qualified name. A refactoring that renames a
/// member moves its history to the new name.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct ClassHistory {
    /// The class.
    pub entity: StructureEntity,
    /// Versions of the class declaration itself.
    pub versions: Vec<StructureEntityVersion>,
    /// Method histories by qualified name.
    pub methods: BTreeMap<String, EntityHistory>,
    /// Field histories by qualified name.
    pub attributes: BTreeMap<String, EntityHistory>,
    /// Inner class histories by qualified name.
    #[facet(recursive_type)]
    pub inner_classes: BTreeMap<String, ClassHistory>,
}

impl ClassHistory {
    /// An empty history for `entity`.
    pub fn new(entity: StructureEntity) -> Self {
        Self {
            entity,
            versions: Vec::new(),
            methods: BTreeMap::new(),
            attributes: BTreeMap::new(),
            inner_classes: BTreeMap::new(),
        }
    }

    /// Append a version to the history its entity belongs to.
    ///
    /// Versions without changes are not recorded. Methods and fields go to
    /// their own histories; anything else counts as a version of this class.
    pub fn record(&mut self, version: StructureEntityVersion) {
        if version.changes.is_empty() {
            return;
        }
        let name = version.entity.unique_name.clone();
        match version.entity.entity_type {
            EntityType::Method => self.methods.entry(name).or_default().versions.push(version),
            EntityType::Attribute => self.attributes.entry(name).or_default().versions.push(version),
            _ => {
                self.entity = version.entity.clone();
                self.versions.push(version);
            }
        }
    }

    /// History of the method named `name`.
    pub fn method(&self, name: &str) -> Option<&EntityHistory> {
        self.methods.get(name)
    }

    /// History of the field named `name`.
    pub fn attribute(&self, name: &str) -> Option<&EntityHistory> {
        self.attributes.get(name)
    }

    /// History of the inner class named `name`.
    pub fn inner_class(&self, name: &str) -> Option<&ClassHistory> {
        self.inner_classes.get(name)
    }

    /// History of an inner class, created on first use.
    pub fn inner_class_mut(&mut self, entity: &StructureEntity) -> &mut ClassHistory {
        self.inner_classes
            .entry(entity.unique_name.clone())
            .or_insert_with(|| ClassHistory::new(entity.clone()))
    }

    /// Move the history of a renamed member or inner class from `old` to `new`.
    ///
    /// Versions already recorded under `new` stay after the moved ones.
    pub fn rename(&mut self, entity_type: EntityType, old: &str, new: &str) {
        if old == new {
            return;
        }
        match entity_type {
            EntityType::Method => rename_entry(&mut self.methods, old, new),
            EntityType::Attribute => rename_entry(&mut self.attributes, old, new),
            EntityType::Class => {
                let Some(mut moved) = self.inner_classes.remove(old) else {
                    return;
                };
                moved.entity.unique_name = new.to_string();
                if let Some(current) = self.inner_classes.remove(new) {
                    moved.absorb(current);
                }
                self.inner_classes.insert(new.to_string(), moved);
            }
            _ => {}
        }
    }

    fn absorb(&mut self, later: ClassHistory) {
        self.versions.extend(later.versions);
        for (name, history) in later.methods {
            self.methods.entry(name).or_default().versions.extend(history.versions);
        }
        for (name, history) in later.attributes {
            self.attributes.entry(name).or_default().versions.extend(history.versions);
        }
        for (name, inner) in later.inner_classes {
            match self.inner_classes.remove(&name) {
                Some(mut earlier) => {
                    earlier.absorb(inner);
                    self.inner_classes.insert(name, earlier);
                }
                None => {
                    self.inner_classes.insert(name, inner);
                }
            }
        }
    }

    /// Whether anything in this class or below recorded a change.
    pub fn has_changes(&self) -> bool {
        !self.versions.is_empty()
            || self.methods.values().any(|h| !h.versions.is_empty())
            || self.attributes.values().any(|h| !h.versions.is_empty())
            || self.inner_classes.values().any(ClassHistory::has_changes)
    }

    /// Drop inner class histories that recorded nothing, at every depth.
    pub fn prune(&mut self) {
        for inner in self.inner_classes.values_mut() {
            inner.prune();
        }
        self.inner_classes.retain(|_, inner| inner.has_changes());
    }

    /// All changes in this class and below: the class first, then methods,
    /// fields and inner classes, each in name order.
    pub fn changes(&self) -> Vec<&SourceCodeChange> {
        let mut all: Vec<&SourceCodeChange> =
            self.versions.iter().flat_map(|v| v.changes.iter()).collect();
        all.extend(self.methods.values().flat_map(EntityHistory::changes));
        all.extend(self.attributes.values().flat_map(EntityHistory::changes));
        for inner in self.inner_classes.values() {
            all.extend(inner.changes());
        }
        all
    }

    /// Serialize for the persistence layer.
    pub fn to_json(&self) -> Result<String, DistillError> {
        facet_json::to_string(self).map_err(|e| DistillError::Serialization {
            message: e.to_string(),
        })
    }
}

fn rename_entry(map: &mut BTreeMap<String, EntityHistory>, old: &str, new: &str) {
    let Some(mut moved) = map.remove(old) else {
        return;
    };
    if let Some(current) = map.remove(new) {
        moved.versions.extend(current.versions);
    }
    map.insert(new.to_string(), moved);
}
