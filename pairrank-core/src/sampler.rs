/// Ordered sampler: fairness-tiered selection of items for new designs.
///
/// Items are bucketed by how often they have been sampled (capped at
/// `limit`). A draw drains the lowest buckets first, so an item sampled `m`
/// times is not drawn again until every other item has been sampled at least
/// `m` times. Order within a bucket is random. Once every item sits in the
/// `limit` bucket the sampler is saturated and draws uniformly.
///
/// Not thread-safe: one sampler belongs to one caller at a time.
use std::collections::BTreeMap;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::debug;

use crate::constants::{DEFAULT_SAMPLING_INCREMENT, DEFAULT_SAMPLING_LIMIT};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplerConfig {
    /// Bucket cap. Counts at or above it are treated as equal.
    pub limit: u64,
    /// Bucket advance per draw.
    pub increment: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            limit: DEFAULT_SAMPLING_LIMIT,
            increment: DEFAULT_SAMPLING_INCREMENT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderedSampler<T> {
    /// Bucket -> items, kept in random order. Empty buckets are removed.
    buckets: BTreeMap<u64, Vec<T>>,
    config: SamplerConfig,
    len: usize,
    saturated: bool,
    total_sampled: usize,
}

impl<T: Clone> OrderedSampler<T> {
    /// Build from a snapshot of `(item, times_sampled)`.
    pub fn new<I, R>(items: I, config: SamplerConfig, rng: &mut R) -> Self
    where
        I: IntoIterator<Item = (T, u64)>,
        R: Rng + ?Sized,
    {
        let mut buckets: BTreeMap<u64, Vec<T>> = BTreeMap::new();
        let mut len = 0;
        for (item, count) in items {
            buckets.entry(count.min(config.limit)).or_default().push(item);
            len += 1;
        }
        for bucket in buckets.values_mut() {
            bucket.shuffle(rng);
        }

        OrderedSampler {
            buckets,
            config,
            len,
            saturated: false,
            total_sampled: 0,
        }
    }

    /// Draw `k` distinct items, least-sampled first, in random order.
    pub fn sample<R: Rng + ?Sized>(&mut self, k: usize, rng: &mut R) -> Result<Vec<T>> {
        if k > self.len {
            return Err(Error::InvalidSampleSize {
                requested: k,
                population: self.len,
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        if !self.saturated && self.min_sample().is_some_and(|b| b >= self.config.limit) {
            debug!(items = self.len, limit = self.config.limit, "sampler saturated");
            self.saturated = true;
        }

        let mut drawn: Vec<T> = if self.saturated {
            self.sample_uniform(k, rng)
        } else {
            self.sample_ordered(k, rng)
        };
        drawn.shuffle(rng);

        self.total_sampled += drawn.len();
        debug!(
            drawn = drawn.len(),
            unsampled = self.unsampled_count(),
            samples_remaining = self.samples_remaining(),
            "sampled items"
        );
        Ok(drawn)
    }

    fn sample_uniform<R: Rng + ?Sized>(&self, k: usize, rng: &mut R) -> Vec<T> {
        let all: Vec<&T> = self.buckets.values().flatten().collect();
        all.choose_multiple(rng, k).map(|&item| item.clone()).collect()
    }

    fn sample_ordered<R: Rng + ?Sized>(&mut self, k: usize, rng: &mut R) -> Vec<T> {
        let mut taken: Vec<(u64, T)> = Vec::with_capacity(k);
        while taken.len() < k {
            let Some(mut entry) = self.buckets.first_entry() else {
                break;
            };
            let key = *entry.key();
            let bucket = entry.get_mut();
            while taken.len() < k {
                match bucket.pop() {
                    Some(item) => taken.push((key, item)),
                    None => break,
                }
            }
            if bucket.is_empty() {
                entry.remove();
            }
        }

        let mut drawn = Vec::with_capacity(taken.len());
        for (key, item) in taken {
            let destination = key.saturating_add(self.config.increment).min(self.config.limit);
            let bucket = self.buckets.entry(destination).or_default();
            bucket.push(item.clone());
            // Swap the newcomer to a uniformly random slot.
            let last = bucket.len() - 1;
            let slot = rng.random_range(0..=last);
            bucket.swap(slot, last);
            drawn.push(item);
        }
        drawn
    }
}

impl<T> OrderedSampler<T> {
    /// Lowest occupied bucket.
    pub fn min_sample(&self) -> Option<u64> {
        self.buckets.keys().next().copied()
    }

    /// Highest occupied bucket.
    pub fn max_sample(&self) -> Option<u64> {
        self.buckets.keys().next_back().copied()
    }

    /// True once every item has reached `limit`; draws are uniform from then on.
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Items never sampled (the zero bucket).
    pub fn unsampled_count(&self) -> usize {
        self.buckets.get(&0).map_or(0, Vec::len)
    }

    /// Draws still needed before every item reaches `limit`.
    pub fn samples_remaining(&self) -> u64 {
        let limit = self.config.limit;
        self.buckets
            .range(..limit)
            .map(|(&bucket, items)| (limit - bucket) * items.len() as u64)
            .sum()
    }

    /// Items drawn over this sampler's lifetime.
    pub fn total_sampled(&self) -> usize {
        self.total_sampled
    }

    pub fn config(&self) -> SamplerConfig {
        self.config
    }

    /// Current bucket of every item, lowest bucket first.
    pub fn buckets(&self) -> impl Iterator<Item = (u64, &[T])> {
        self.buckets.iter().map(|(&bucket, items)| (bucket, items.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashMap;

    fn config(limit: u64) -> SamplerConfig {
        SamplerConfig {
            limit,
            increment: 1,
        }
    }

    #[test]
    fn test_least_sampled_items_first() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let items = vec![("A", 0), ("B", 0), ("C", 5)];
        let mut sampler = OrderedSampler::new(items, config(5), &mut rng);

        // A and B climb from 0 to 5 one step per draw; C waits until then.
        for _ in 0..5 {
            let mut drawn = sampler.sample(2, &mut rng).unwrap();
            drawn.sort();
            assert_eq!(drawn, vec!["A", "B"]);
        }
        assert_eq!(sampler.min_sample(), Some(5));
        assert!(!sampler.is_saturated());

        sampler.sample(1, &mut rng).unwrap();
        assert!(sampler.is_saturated());
    }

    #[test]
    fn test_draw_spans_buckets_without_duplicates() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let items = vec![("A", 0), ("B", 0), ("C", 1), ("D", 3)];
        let mut sampler = OrderedSampler::new(items, config(5), &mut rng);

        let mut drawn = sampler.sample(3, &mut rng).unwrap();
        drawn.sort();
        assert_eq!(drawn, vec!["A", "B", "C"]);

        let buckets: Vec<(u64, usize)> = sampler.buckets().map(|(b, items)| (b, items.len())).collect();
        assert_eq!(buckets, vec![(1, 2), (2, 1), (3, 1)]);
    }

    #[test]
    fn test_full_population_draw() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let items: Vec<(u32, u64)> = (0..10).map(|i| (i, i as u64 % 3)).collect();
        let mut sampler = OrderedSampler::new(items, config(5), &mut rng);

        let mut drawn = sampler.sample(10, &mut rng).unwrap();
        drawn.sort();
        assert_eq!(drawn, (0..10).collect::<Vec<_>>());
        assert_eq!(sampler.len(), 10);
    }

    #[test]
    fn test_oversized_sample_is_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut sampler = OrderedSampler::new(vec![("A", 0)], config(5), &mut rng);
        assert_eq!(
            sampler.sample(2, &mut rng).unwrap_err(),
            Error::InvalidSampleSize {
                requested: 2,
                population: 1
            }
        );
        assert_eq!(sampler.total_sampled(), 0);
    }

    #[test]
    fn test_counts_above_limit_are_capped() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let sampler = OrderedSampler::new(vec![("A", 40), ("B", 2)], config(5), &mut rng);
        assert_eq!(sampler.max_sample(), Some(5));
        assert_eq!(sampler.min_sample(), Some(2));
        assert_eq!(sampler.samples_remaining(), 3);
    }

    #[test]
    fn test_unsampled_count_tracks_zero_bucket() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let items: Vec<(u32, u64)> = (0..6).map(|i| (i, 0)).collect();
        let mut sampler = OrderedSampler::new(items, config(3), &mut rng);
        assert_eq!(sampler.unsampled_count(), 6);
        sampler.sample(4, &mut rng).unwrap();
        assert_eq!(sampler.unsampled_count(), 2);
        assert_eq!(sampler.samples_remaining(), 6 * 3 - 4);
        assert_eq!(sampler.total_sampled(), 4);
    }

    #[test]
    fn test_saturated_sampler_draws_uniformly() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let items: Vec<(u32, u64)> = (0..4).map(|i| (i, 5)).collect();
        let mut sampler = OrderedSampler::new(items, config(5), &mut rng);

        let trials = 8_000;
        let mut hits: HashMap<u32, usize> = HashMap::new();
        for _ in 0..trials {
            let drawn = sampler.sample(2, &mut rng).unwrap();
            assert_ne!(drawn[0], drawn[1]);
            for item in drawn {
                *hits.entry(item).or_default() += 1;
            }
        }
        assert!(sampler.is_saturated());

        // Each item expected in half the draws: 4,000 +/- ~45 (one sd).
        for item in 0..4 {
            let count = hits[&item];
            assert!((3_700..=4_300).contains(&count), "item {item} drawn {count} times");
        }
    }
}
