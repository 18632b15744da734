use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};

/// An unordered pair of distinct items, stored as `(min, max)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pair<T>(T, T);

impl<T: Ord> Pair<T> {
    pub fn new(a: T, b: T) -> Self {
        if a <= b {
            Pair(a, b)
        } else {
            Pair(b, a)
        }
    }
}

impl<T> Pair<T> {
    pub fn first(&self) -> &T {
        &self.0
    }

    pub fn second(&self) -> &T {
        &self.1
    }

    pub fn into_inner(self) -> (T, T) {
        (self.0, self.1)
    }
}

/// A block of local item indices presented together in one trial.
pub type Block = Vec<usize>;

/// Blocks of caller item IDs produced by one planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Design<T> {
    pub blocks: Vec<Vec<T>>,
}

impl<T: Clone + Ord> Design<T> {
    /// Every pair that co-occurs in some block.
    pub fn pairs(&self) -> Vec<Pair<T>> {
        let mut pairs = Vec::new();
        for block in &self.blocks {
            for (i, a) in block.iter().enumerate() {
                for b in &block[i + 1..] {
                    pairs.push(Pair::new(a.clone(), b.clone()));
                }
            }
        }
        pairs
    }
}

impl<T> Design<T> {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Global pair-history lookup: has this pair ever shared a block?
pub trait PairOracle<T: ?Sized> {
    fn exists(&self, a: &T, b: &T) -> bool;
}

impl<T: ?Sized, O: PairOracle<T> + ?Sized> PairOracle<T> for &O {
    fn exists(&self, a: &T, b: &T) -> bool {
        (**self).exists(a, b)
    }
}

/// Source of the active item set and each item's `times_sampled`.
pub trait ItemStore<T> {
    fn active_items_with_counts(&self) -> Vec<(T, u64)>;
}

/// Snapshot sorted by id so seeded planners see the same order every run.
impl<T: Clone + Ord, S> ItemStore<T> for HashMap<T, u64, S> {
    fn active_items_with_counts(&self) -> Vec<(T, u64)> {
        let mut items: Vec<(T, u64)> = self.iter().map(|(id, &count)| (id.clone(), count)).collect();
        items.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        items
    }
}

impl<T: Clone> ItemStore<T> for BTreeMap<T, u64> {
    fn active_items_with_counts(&self) -> Vec<(T, u64)> {
        self.iter().map(|(id, &count)| (id.clone(), count)).collect()
    }
}

/// In-memory pair history.
///
/// Designs are committed with `record_design` once they are handed out. Two
/// planners sharing one history must serialize their commits.
#[derive(Debug, Clone)]
pub struct PairHistory<T> {
    pairs: FxHashSet<Pair<T>>,
}

impl<T> Default for PairHistory<T> {
    fn default() -> Self {
        PairHistory {
            pairs: FxHashSet::default(),
        }
    }
}

impl<T: Clone + Ord + Hash> PairHistory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the pair was not already present.
    pub fn insert(&mut self, a: T, b: T) -> bool {
        self.pairs.insert(Pair::new(a, b))
    }

    pub fn contains(&self, a: &T, b: &T) -> bool {
        self.pairs.contains(&Pair::new(a.clone(), b.clone()))
    }

    /// Commit every pair of a design. Returns the number of new pairs.
    pub fn record_design(&mut self, design: &Design<T>) -> usize {
        design
            .pairs()
            .into_iter()
            .filter(|pair| self.pairs.insert(pair.clone()))
            .count()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pair<T>> {
        self.pairs.iter()
    }
}

impl<T: Clone + Ord + Hash> FromIterator<(T, T)> for PairHistory<T> {
    fn from_iter<I: IntoIterator<Item = (T, T)>>(iter: I) -> Self {
        let mut history = PairHistory::new();
        for (a, b) in iter {
            history.insert(a, b);
        }
        history
    }
}

impl<T: Clone + Ord + Hash> PairOracle<T> for PairHistory<T> {
    fn exists(&self, a: &T, b: &T) -> bool {
        self.contains(a, b)
    }
}

/// Maps between caller-provided IDs and internal 0..N indices.
#[derive(Debug, Clone)]
pub struct IdMap<T> {
    ids: Vec<T>,
    id_to_idx: FxHashMap<T, usize>,
}

impl<T: Clone + Eq + Hash + Debug> IdMap<T> {
    pub fn from_ids(ids: &[T]) -> Result<Self> {
        let mut id_to_idx = FxHashMap::with_capacity_and_hasher(ids.len(), Default::default());
        for (idx, id) in ids.iter().enumerate() {
            if id_to_idx.insert(id.clone(), idx).is_some() {
                return Err(Error::DuplicateItem {
                    id: format!("{id:?}"),
                });
            }
        }
        Ok(IdMap {
            ids: ids.to_vec(),
            id_to_idx,
        })
    }

    /// Index for `id`, assigning the next free index if it is new.
    pub fn get_or_insert(&mut self, id: &T) -> usize {
        if let Some(&idx) = self.id_to_idx.get(id) {
            return idx;
        }
        let idx = self.ids.len();
        self.ids.push(id.clone());
        self.id_to_idx.insert(id.clone(), idx);
        idx
    }

    pub fn to_idx(&self, id: &T) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub fn to_id(&self, idx: usize) -> &T {
        &self.ids[idx]
    }

    pub fn ids(&self) -> &[T] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<T> {
        self.ids
    }
}

impl<T> IdMap<T> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<T> Default for IdMap<T> {
    fn default() -> Self {
        IdMap {
            ids: Vec::new(),
            id_to_idx: FxHashMap::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_canonical() {
        assert_eq!(Pair::new(3, 1), Pair::new(1, 3));
        assert_eq!(Pair::new("b", "a").into_inner(), ("a", "b"));
    }

    #[test]
    fn test_history_records_design_pairs() {
        let design = Design {
            blocks: vec![vec!["a", "b", "c"], vec!["c", "d", "e"]],
        };
        let mut history = PairHistory::new();
        assert_eq!(history.record_design(&design), 6);
        assert!(history.exists(&"b", &"a"));
        assert!(history.exists(&"e", &"c"));
        assert!(!history.exists(&"a", &"e"));

        // Re-committing adds nothing
        assert_eq!(history.record_design(&design), 0);
        assert_eq!(history.len(), 6);
    }

    #[test]
    fn test_id_map_rejects_duplicates() {
        let err = IdMap::from_ids(&["x", "y", "x"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateItem { .. }));
    }

    #[test]
    fn test_id_map_assigns_in_first_seen_order() {
        let mut map = IdMap::default();
        assert_eq!(map.get_or_insert(&"img-7"), 0);
        assert_eq!(map.get_or_insert(&"img-2"), 1);
        assert_eq!(map.get_or_insert(&"img-7"), 0);
        assert_eq!(map.to_id(1), &"img-2");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_item_store_for_maps() {
        let mut counts = BTreeMap::new();
        counts.insert("a".to_string(), 2);
        counts.insert("b".to_string(), 0);
        let items = counts.active_items_with_counts();
        assert_eq!(items, vec![("a".to_string(), 2), ("b".to_string(), 0)]);
    }

    #[test]
    fn test_hash_map_snapshot_is_sorted_by_id() {
        let ids: Vec<String> = (0..64).map(|i| format!("img-{i:02}")).collect();
        let mut entries: Vec<(String, u64)> = ids.iter().cloned().zip(0..).collect();
        let forward: HashMap<String, u64> = entries.iter().cloned().collect();
        entries.reverse();
        let backward: HashMap<String, u64> = entries.into_iter().collect();

        let snapshot = forward.active_items_with_counts();
        assert_eq!(snapshot, backward.active_items_with_counts());
        let expected: BTreeMap<String, u64> = ids.into_iter().zip(0..).collect();
        assert_eq!(snapshot, expected.active_items_with_counts());
    }
}
