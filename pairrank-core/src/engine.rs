/// Design planner orchestrator.
///
/// Pure computation: the caller owns the item store and the pair history,
/// hands out the returned design, and commits its pairs afterwards.
///
/// Items are identified by caller-provided IDs. Designs are generated over
/// local indices internally and mapped back before they are returned.
use rand::Rng;
use tracing::{debug, warn};

use crate::constants::{DEFAULT_APPEARANCES, DEFAULT_BLOCK_SIZE, DEFAULT_ITEMS_PER_DESIGN};
use crate::design::{generate_design, shuffle_design};
use crate::error::{Error, Result};
use crate::sampler::{OrderedSampler, SamplerConfig};
use crate::types::{Design, ItemStore, PairOracle};

/// Configuration for the design planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// Candidate items drawn per design.
    pub items_per_design: usize,
    /// Items per block.
    pub block_size: usize,
    /// Minimum blocks each drawn item must appear in.
    pub appearances: usize,
    pub sampling: SamplerConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            items_per_design: DEFAULT_ITEMS_PER_DESIGN,
            block_size: DEFAULT_BLOCK_SIZE,
            appearances: DEFAULT_APPEARANCES,
            sampling: SamplerConfig::default(),
        }
    }
}

/// Answers local-index queries against an ID-keyed pair history.
struct IndexedOracle<'a, T, O: ?Sized> {
    ids: &'a [T],
    history: &'a O,
}

impl<T, O: PairOracle<T> + ?Sized> PairOracle<usize> for IndexedOracle<'_, T, O> {
    fn exists(&self, a: &usize, b: &usize) -> bool {
        self.history.exists(&self.ids[*a], &self.ids[*b])
    }
}

pub struct DesignPlanner<T> {
    sampler: OrderedSampler<T>,
    config: PlannerConfig,
    designs_planned: usize,
}

impl<T: Clone> DesignPlanner<T> {
    /// Snapshot the store's active items and their sample counts.
    pub fn new<S, R>(store: &S, config: PlannerConfig, rng: &mut R) -> Result<Self>
    where
        S: ItemStore<T> + ?Sized,
        R: Rng + ?Sized,
    {
        if config.block_size < 2 {
            return Err(Error::InvalidBlockSize {
                block_size: config.block_size,
            });
        }
        let sampler = OrderedSampler::new(store.active_items_with_counts(), config.sampling, rng);
        Ok(DesignPlanner {
            sampler,
            config,
            designs_planned: 0,
        })
    }

    /// Draw candidates and build the next design.
    ///
    /// `Ok(None)` means the pair history leaves no valid design for this
    /// draw. The drawn items still count as sampled, so retrying draws a
    /// different candidate set.
    pub fn next_design<O, R>(&mut self, history: &O, rng: &mut R) -> Result<Option<Design<T>>>
    where
        O: PairOracle<T> + ?Sized,
        R: Rng + ?Sized,
    {
        let candidates = self.sampler.sample(self.config.items_per_design, rng)?;
        let oracle = IndexedOracle {
            ids: &candidates,
            history,
        };

        let blocks = match generate_design(
            candidates.len(),
            self.config.block_size,
            self.config.appearances,
            &oracle,
        )? {
            Some(blocks) => blocks,
            None => {
                warn!(
                    items = candidates.len(),
                    block_size = self.config.block_size,
                    appearances = self.config.appearances,
                    "could not generate design"
                );
                return Ok(None);
            }
        };

        let mut blocks: Vec<Vec<T>> = blocks
            .into_iter()
            .map(|block| block.into_iter().map(|idx| candidates[idx].clone()).collect())
            .collect();
        shuffle_design(&mut blocks, rng);

        self.designs_planned += 1;
        debug!(
            blocks = blocks.len(),
            items = candidates.len(),
            designs_planned = self.designs_planned,
            "design generated"
        );
        Ok(Some(Design { blocks }))
    }

    pub fn sampler(&self) -> &OrderedSampler<T> {
        &self.sampler
    }

    pub fn config(&self) -> PlannerConfig {
        self.config
    }

    pub fn designs_planned(&self) -> usize {
        self.designs_planned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PairHistory;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::{BTreeMap, HashMap, HashSet};

    fn store(n: usize) -> BTreeMap<String, u64> {
        (0..n).map(|i| (format!("img-{i:03}"), 0)).collect()
    }

    #[test]
    fn test_planner_basic_workflow() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let items = store(30);
        let config = PlannerConfig {
            items_per_design: 9,
            block_size: 3,
            appearances: 2,
            sampling: SamplerConfig::default(),
        };
        let mut planner = DesignPlanner::new(&items, config, &mut rng).unwrap();
        let mut history: PairHistory<String> = PairHistory::new();

        let design = planner.next_design(&history, &mut rng).unwrap().unwrap();
        assert!(!design.is_empty());

        // Blocks contain our IDs, each drawn item at least twice
        let mut counts: BTreeMap<&String, usize> = BTreeMap::new();
        for block in &design.blocks {
            assert_eq!(block.len(), 3);
            for id in block {
                assert!(items.contains_key(id), "ID {id} not in store");
                *counts.entry(id).or_default() += 1;
            }
        }
        assert_eq!(counts.len(), 9);
        assert!(counts.values().all(|&c| c >= 2));

        let committed = history.record_design(&design);
        assert_eq!(committed, design.pairs().len());
        assert_eq!(planner.designs_planned(), 1);
    }

    #[test]
    fn test_successive_designs_never_repeat_pairs() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let items = store(24);
        let config = PlannerConfig {
            items_per_design: 8,
            block_size: 2,
            appearances: 1,
            sampling: SamplerConfig::default(),
        };
        let mut planner = DesignPlanner::new(&items, config, &mut rng).unwrap();
        let mut history: PairHistory<String> = PairHistory::new();
        let mut seen = HashSet::new();

        for _ in 0..6 {
            if let Some(design) = planner.next_design(&history, &mut rng).unwrap() {
                for pair in design.pairs() {
                    assert!(seen.insert(pair), "pair repeated across designs");
                }
                history.record_design(&design);
            }
        }
        assert!(planner.designs_planned() > 0);
    }

    #[test]
    fn test_draws_follow_sampling_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut items = store(6);
        for (i, count) in items.values_mut().enumerate() {
            *count = if i < 4 { 0 } else { 3 };
        }
        let config = PlannerConfig {
            items_per_design: 4,
            block_size: 2,
            appearances: 1,
            sampling: SamplerConfig::default(),
        };
        let mut planner = DesignPlanner::new(&items, config, &mut rng).unwrap();
        let design = planner.next_design(&PairHistory::<String>::new(), &mut rng).unwrap().unwrap();
        for block in &design.blocks {
            for id in block {
                assert_eq!(items[id], 0, "{id} drawn before the unsampled items");
            }
        }
    }

    #[test]
    fn test_seeded_planner_over_hash_map_is_reproducible() {
        let plan = || {
            let items: HashMap<String, u64> = store(20).into_iter().collect();
            let mut rng = ChaCha8Rng::seed_from_u64(16);
            let mut planner = DesignPlanner::new(&items, PlannerConfig::default(), &mut rng).unwrap();
            planner.next_design(&PairHistory::<String>::new(), &mut rng).unwrap()
        };
        let first = plan();
        assert!(first.is_some());
        assert_eq!(first, plan());
    }

    #[test]
    fn test_too_few_items_is_an_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(14);
        let mut planner = DesignPlanner::new(&store(3), PlannerConfig::default(), &mut rng).unwrap();
        let err = planner.next_design(&PairHistory::<String>::new(), &mut rng).unwrap_err();
        assert!(matches!(err, Error::InvalidSampleSize { .. }));
    }

    #[test]
    fn test_exhausted_history_returns_none() {
        let mut rng = ChaCha8Rng::seed_from_u64(15);
        let items = store(4);
        let mut history: PairHistory<String> = PairHistory::new();
        let ids: Vec<&String> = items.keys().collect();
        for (x, a) in ids.iter().enumerate() {
            for b in &ids[x + 1..] {
                history.insert((*a).clone(), (*b).clone());
            }
        }
        let config = PlannerConfig {
            items_per_design: 4,
            block_size: 2,
            appearances: 1,
            sampling: SamplerConfig::default(),
        };
        let mut planner = DesignPlanner::new(&items, config, &mut rng).unwrap();
        assert_eq!(planner.next_design(&history, &mut rng).unwrap(), None);
    }
}
