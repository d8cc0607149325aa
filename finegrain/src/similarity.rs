//! String and node similarity measures.
//!
//! All measures return a score in `[0, 1]`; higher is more similar.

use facet::Facet;
use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

use crate::matching::Matching;
use crate::tree::Tree;

/// A similarity measure between two strings.
pub trait StringMetric: Sync {
    /// Similarity of `left` and `right` in `[0, 1]`.
    fn similarity(&self, left: &str, right: &str) -> f64;
}

/// A similarity measure between an inner node of each tree, computed from
/// the pairs matched so far.
pub trait NodeMetric: Sync {
    /// Similarity of `x` (in `left`) and `y` (in `right`) in `[0, 1]`.
    fn similarity(
        &self,
        left: &Tree,
        x: NodeId,
        right: &Tree,
        y: NodeId,
        matching: &Matching,
    ) -> f64;
}

/// Built-in string measures, selectable from configuration.
#[derive(Facet, Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
pub enum StringSimilarity {
    /// `1 - edit distance / longer length`.
    Levenshtein,
    /// Dice coefficient over character n-grams.
    NGrams {
        /// Gram length.
        n: usize,
    },
}

impl StringSimilarity {
    /// Character bigrams.
    pub const BIGRAMS: StringSimilarity = StringSimilarity::NGrams { n: 2 };
}

impl StringMetric for StringSimilarity {
    fn similarity(&self, left: &str, right: &str) -> f64 {
        match *self {
            StringSimilarity::Levenshtein => levenshtein_similarity(left, right),
            StringSimilarity::NGrams { n } => ngram_similarity(left, right, n),
        }
    }
}

/// Built-in node measures, selectable from configuration.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeSimilarity {
    /// Dice coefficient over matched descendants, see [`Dice`].
    Dice,
    /// Matched leaves over the larger leaf count, see [`Chawathe`].
    Chawathe,
}

/// Levenshtein distance between two strings, counted in chars.
pub fn levenshtein_distance(left: &str, right: &str) -> usize {
    let right: Vec<char> = right.chars().collect();
    let mut previous: Vec<usize> = (0..=right.len()).collect();
    let mut current = vec![0; right.len() + 1];

    for (i, lc) in left.chars().enumerate() {
        current[0] = i + 1;
        for (j, &rc) in right.iter().enumerate() {
            let substitution = previous[j] + usize::from(lc != rc);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        core::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()]
}

/// `1 - distance / max(len)`; two empty strings are identical.
pub fn levenshtein_similarity(left: &str, right: &str) -> f64 {
    let longest = left.chars().count().max(right.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(left, right) as f64 / longest as f64
}

/// Dice coefficient over the sets of character n-grams.
///
/// Two empty strings score 1.0, one empty string scores 0.0. A string
/// shorter than `n` is its own only gram.
pub fn ngram_similarity(left: &str, right: &str, n: usize) -> f64 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let left_grams = grams(&left, n);
    let right_grams = grams(&right, n);
    let common = left_grams.intersection(&right_grams).count();
    2.0 * common as f64 / (left_grams.len() + right_grams.len()) as f64
}

fn grams(chars: &[char], n: usize) -> HashSet<&[char]> {
    let n = n.max(1);
    if chars.len() < n {
        return HashSet::from_iter([chars]);
    }
    chars.windows(n).collect()
}

/// Dice node similarity.
///
/// `2 * common / (nodes(x) + nodes(y))` where `common` counts matched pairs
/// lying under `x` and `y`, plus one when the values of `x` and `y` are
/// themselves similar under `string` at `threshold`.
pub struct Dice<'a> {
    /// Measure used for the value bonus.
    pub string: &'a dyn StringMetric,
    /// Threshold the value similarity has to reach for the bonus.
    pub threshold: f64,
}

impl NodeMetric for Dice<'_> {
    fn similarity(
        &self,
        left: &Tree,
        x: NodeId,
        right: &Tree,
        y: NodeId,
        matching: &Matching,
    ) -> f64 {
        let mut common = matching
            .pairs()
            .filter(|p| left.is_descendant(p.left, x) && right.is_descendant(p.right, y))
            .count();
        if self.string.similarity(left.value(x), right.value(y)) >= self.threshold {
            common += 1;
        }
        let total = left.subtree_size(x) + right.subtree_size(y);
        2.0 * common as f64 / total as f64
    }
}

/// Chawathe node similarity: matched leaf pairs under `x` and `y` over the
/// larger of the two leaf counts.
pub struct Chawathe;

impl NodeMetric for Chawathe {
    fn similarity(
        &self,
        left: &Tree,
        x: NodeId,
        right: &Tree,
        y: NodeId,
        matching: &Matching,
    ) -> f64 {
        let common = matching
            .pairs()
            .filter(|p| left.is_leaf(p.left) && right.is_leaf(p.right))
            .filter(|p| left.is_descendant(p.left, x) && right.is_descendant(p.right, y))
            .count();
        let leaves = left.leaf_count(x).max(right.leaf_count(y));
        common as f64 / leaves as f64
    }
}
