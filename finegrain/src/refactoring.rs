//! Pairing added and deleted structure entities into refactorings.
//!
//! Every (added, deleted) pair of the same entity kind that the helper
//! deems a refactoring becomes a candidate pair. Candidates are ranked by
//! similarity, best first, with ties kept in encounter order, and committed
//! greedily as long as neither side is already taken.

use crate::debug;

use rapidhash::RapidHashSet as HashSet;

use crate::change::SourceCodeChange;
use crate::entity::EntityType;
use crate::similarity::{StringMetric, StringSimilarity};

/// An added or deleted structure entity that may be one side of a
/// refactoring.
#[derive(Debug, Clone, PartialEq)]
pub struct RefactoringCandidate {
    /// The insert or delete of the entity.
    pub change: SourceCodeChange,
    /// Name of the entity in the structure diff, e.g. `foo(int)`.
    pub name: String,
    /// Source text of the entity.
    pub text: String,
}

impl RefactoringCandidate {
    /// Create a candidate.
    pub fn new(change: SourceCodeChange, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            change,
            name: name.into(),
            text: text.into(),
        }
    }

    /// Entity type of the underlying change.
    pub fn kind(&self) -> EntityType {
        self.change.changed.entity_type
    }
}

/// A committed refactoring.
#[derive(Debug, Clone, Copy)]
pub struct RefactoringPair<'a> {
    /// The entity that went away.
    pub deleted: &'a RefactoringCandidate,
    /// The entity that took its place.
    pub inserted: &'a RefactoringCandidate,
    /// Index of `deleted` in the deleted list.
    pub deleted_index: usize,
    /// Index of `inserted` in the added list.
    pub inserted_index: usize,
    /// Similarity the pair was ranked by.
    pub similarity: f64,
}

/// Per entity kind similarity and threshold.
pub trait RefactoringHelper: Sync {
    /// Entity type of the candidates this helper pairs.
    fn entity_type(&self) -> EntityType;

    /// Declaration label carrying the entity name, used for renaming updates.
    fn declaration_type(&self) -> EntityType;

    /// Minimum similarity of a refactoring.
    fn threshold(&self) -> f64;

    /// Similarity of an old and a new entity.
    fn similarity(&self, old_name: &str, new_name: &str, old_text: &str, new_text: &str) -> f64;

    /// Whether the two entities are similar enough to be a refactoring.
    fn is_refactoring(&self, old_name: &str, new_name: &str, old_text: &str, new_text: &str) -> bool {
        self.similarity(old_name, new_name, old_text, new_text) >= self.threshold()
    }

    /// Name without signature or type suffix.
    fn short_name<'n>(&self, name: &'n str) -> &'n str {
        name.trim()
    }
}

/// Methods: bigram similarity of the full signatures.
#[derive(Debug, Clone, Copy)]
pub struct MethodRefactoringHelper {
    threshold: f64,
}

impl Default for MethodRefactoringHelper {
    fn default() -> Self {
        Self { threshold: 0.6 }
    }
}

impl MethodRefactoringHelper {
    /// Override the default threshold of 0.6.
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl RefactoringHelper for MethodRefactoringHelper {
    fn entity_type(&self) -> EntityType {
        EntityType::Method
    }

    fn declaration_type(&self) -> EntityType {
        EntityType::MethodDeclaration
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn similarity(&self, old_name: &str, new_name: &str, _: &str, _: &str) -> f64 {
        StringSimilarity::BIGRAMS.similarity(old_name, new_name)
    }

    fn short_name<'n>(&self, name: &'n str) -> &'n str {
        name.split_once('(').map_or(name, |(head, _)| head).trim()
    }
}

/// Fields: edit distance of the declarations, 1.0 for unchanged names.
#[derive(Debug, Clone, Copy)]
pub struct FieldRefactoringHelper {
    threshold: f64,
}

impl Default for FieldRefactoringHelper {
    fn default() -> Self {
        Self { threshold: 0.65 }
    }
}

impl FieldRefactoringHelper {
    /// Override the default threshold of 0.65.
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl RefactoringHelper for FieldRefactoringHelper {
    fn entity_type(&self) -> EntityType {
        EntityType::Attribute
    }

    fn declaration_type(&self) -> EntityType {
        EntityType::FieldDeclaration
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn similarity(&self, old_name: &str, new_name: &str, old_text: &str, new_text: &str) -> f64 {
        if old_name == new_name {
            return 1.0;
        }
        StringSimilarity::Levenshtein.similarity(old_text, new_text)
    }

    fn short_name<'n>(&self, name: &'n str) -> &'n str {
        name.split_once(':').map_or(name, |(head, _)| head).trim()
    }
}

/// Inner classes: edit distance of the names.
#[derive(Debug, Clone, Copy)]
pub struct ClassRefactoringHelper {
    threshold: f64,
}

impl Default for ClassRefactoringHelper {
    fn default() -> Self {
        Self { threshold: 0.65 }
    }
}

impl ClassRefactoringHelper {
    /// Override the default threshold of 0.65.
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl RefactoringHelper for ClassRefactoringHelper {
    fn entity_type(&self) -> EntityType {
        EntityType::Class
    }

    fn declaration_type(&self) -> EntityType {
        EntityType::TypeDeclaration
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn similarity(&self, old_name: &str, new_name: &str, _: &str, _: &str) -> f64 {
        StringSimilarity::Levenshtein.similarity(old_name, new_name)
    }
}

/// Result of [`extract_refactorings`].
#[derive(Debug, Clone, Default)]
pub struct Refactorings<'a> {
    /// Committed pairs, best first.
    pub pairs: Vec<RefactoringPair<'a>>,
    claimed_added: HashSet<usize>,
    claimed_deleted: HashSet<usize>,
}

impl<'a> Refactorings<'a> {
    /// Whether the added candidate at `index` is part of a pair.
    pub fn is_added_claimed(&self, index: usize) -> bool {
        self.claimed_added.contains(&index)
    }

    /// Whether the deleted candidate at `index` is part of a pair.
    pub fn is_deleted_claimed(&self, index: usize) -> bool {
        self.claimed_deleted.contains(&index)
    }

    /// Added candidates no pair claimed, in input order.
    pub fn unclaimed_added<'c>(
        &'c self,
        added: &'c [RefactoringCandidate],
    ) -> impl Iterator<Item = &'c RefactoringCandidate> + 'c {
        added
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_added_claimed(*i))
            .map(|(_, c)| c)
    }

    /// Deleted candidates no pair claimed, in input order.
    pub fn unclaimed_deleted<'c>(
        &'c self,
        deleted: &'c [RefactoringCandidate],
    ) -> impl Iterator<Item = &'c RefactoringCandidate> + 'c {
        deleted
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_deleted_claimed(*i))
            .map(|(_, c)| c)
    }
}

/// Pair added and deleted candidates into refactorings.
pub fn extract_refactorings<'a, H>(
    added: &'a [RefactoringCandidate],
    deleted: &'a [RefactoringCandidate],
    helper: &H,
) -> Refactorings<'a>
where
    H: RefactoringHelper + ?Sized,
{
    let mut candidates: Vec<RefactoringPair<'a>> = Vec::new();
    for (inserted_index, inserted) in added.iter().enumerate() {
        for (deleted_index, old) in deleted.iter().enumerate() {
            if inserted.kind() != old.kind() {
                continue;
            }
            if !helper.is_refactoring(&old.name, &inserted.name, &old.text, &inserted.text) {
                continue;
            }
            candidates.push(RefactoringPair {
                deleted: old,
                inserted,
                deleted_index,
                inserted_index,
                similarity: helper.similarity(&old.name, &inserted.name, &old.text, &inserted.text),
            });
        }
    }

    // stable: ties keep encounter order
    candidates.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));

    let refactorings = candidates
        .into_iter()
        .fold(Refactorings::default(), |mut acc, pair| {
            if acc.claimed_added.contains(&pair.inserted_index)
                || acc.claimed_deleted.contains(&pair.deleted_index)
            {
                return acc;
            }
            debug!(
                old = %pair.deleted.name,
                new = %pair.inserted.name,
                similarity = pair.similarity,
                "refactoring"
            );
            acc.claimed_added.insert(pair.inserted_index);
            acc.claimed_deleted.insert(pair.deleted_index);
            acc.pairs.push(pair);
            acc
        });

    debug!(
        added = added.len(),
        deleted = deleted.len(),
        committed = refactorings.pairs.len(),
        "extract_refactorings done"
    );
    refactorings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Modifiers, SourceCodeEntity, SourceRange, StructureEntity};
    use facet_testhelpers::test;

    fn candidate(entity_type: EntityType, name: &str, text: &str, inserted: bool) -> RefactoringCandidate {
        let root = StructureEntity::new(EntityType::Class, "Foo", Modifiers::PUBLIC);
        let changed = SourceCodeEntity::new(name, entity_type, SourceRange::default());
        let parent = SourceCodeEntity::new("Foo", EntityType::Class, SourceRange::default());
        let change = if inserted {
            SourceCodeChange::insert(root, changed, parent)
        } else {
            SourceCodeChange::delete(root, changed, parent)
        };
        RefactoringCandidate::new(change, name, text)
    }

    fn method(name: &str, inserted: bool) -> RefactoringCandidate {
        candidate(EntityType::Method, name, "", inserted)
    }

    #[test]
    fn test_short_names() {
        assert_eq!(MethodRefactoringHelper::default().short_name("getX(int)"), "getX");
        assert_eq!(FieldRefactoringHelper::default().short_name("count : int"), "count");
        assert_eq!(ClassRefactoringHelper::default().short_name(" Inner "), "Inner");
    }

    #[test]
    fn test_method_similarity_compares_signatures() {
        let helper = MethodRefactoringHelper::default();
        assert!(helper.is_refactoring("getValue()", "getValue(int)", "", ""));
        // {ge, et, tX, X(, ()} against {ge, et, tX, XV, Va, al, lu, ue, e(, ()}
        assert!((helper.similarity("getX()", "getXValue()", "", "") - 8.0 / 15.0).abs() < 1e-9);
        assert!(!helper.is_refactoring("open()", "close()", "", ""));
    }

    #[test]
    fn test_same_parameters_carry_a_rename() {
        let added = vec![method("read(String, Options)", true)];
        let deleted = vec![method("load(String, Options)", false)];

        let refactorings = extract_refactorings(&added, &deleted, &MethodRefactoringHelper::default());

        assert_eq!(refactorings.pairs.len(), 1);
        // 18 shared bigrams out of 20 on each side
        assert!((refactorings.pairs[0].similarity - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_field_with_unchanged_name() {
        let helper = FieldRefactoringHelper::default();
        assert_eq!(
            helper.similarity("count : int", "count : int", "int count;", "int count = 0;"),
            1.0
        );
    }

    #[test]
    fn test_field_type_change_uses_the_declaration_text() {
        let helper = FieldRefactoringHelper::default();
        let similarity = helper.similarity(
            "count : int",
            "count : long",
            "private int count;",
            "private long count;",
        );
        assert!(similarity < 1.0);
        assert!(helper.is_refactoring(
            "count : int",
            "count : long",
            "private int count;",
            "private long count;",
        ));
    }

    #[test]
    fn test_greedy_takes_best_pair_first() {
        let added = vec![method("computeTotal()", true), method("computeTotals()", true)];
        let deleted = vec![method("computeTotals(int)", false)];

        let refactorings = extract_refactorings(&added, &deleted, &MethodRefactoringHelper::default());

        assert_eq!(refactorings.pairs.len(), 1);
        assert_eq!(refactorings.pairs[0].inserted.name, "computeTotals()");
        assert!(refactorings.is_added_claimed(1));
        assert!(!refactorings.is_added_claimed(0));
        let unclaimed: Vec<_> = refactorings.unclaimed_added(&added).map(|c| c.name.as_str()).collect();
        assert_eq!(unclaimed, vec!["computeTotal()"]);
        assert_eq!(refactorings.unclaimed_deleted(&deleted).count(), 0);
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let added = vec![method("renderA(int)", true), method("renderB(int)", true)];
        let deleted = vec![method("render(int)", false)];

        let refactorings = extract_refactorings(&added, &deleted, &MethodRefactoringHelper::default());

        assert_eq!(refactorings.pairs.len(), 1);
        assert_eq!(refactorings.pairs[0].inserted_index, 0);
    }

    #[test]
    fn test_kinds_must_agree() {
        let added = vec![candidate(EntityType::Attribute, "value", "int value;", true)];
        let deleted = vec![method("value()", false)];

        let refactorings = extract_refactorings(&added, &deleted, &MethodRefactoringHelper::default());
        assert!(refactorings.pairs.is_empty());
    }

    #[test]
    fn test_each_entity_used_once() {
        let added = vec![
            method("handleA()", true),
            method("handleB()", true),
            method("handleC()", true),
        ];
        let deleted = vec![method("handle()", false), method("handleX()", false)];

        let refactorings = extract_refactorings(&added, &deleted, &MethodRefactoringHelper::with_threshold(0.1));

        let mut seen_added = HashSet::default();
        let mut seen_deleted = HashSet::default();
        for pair in &refactorings.pairs {
            assert!(seen_added.insert(pair.inserted_index), "added side reused");
            assert!(seen_deleted.insert(pair.deleted_index), "deleted side reused");
        }
        assert_eq!(refactorings.pairs.len(), 2);
    }
}
