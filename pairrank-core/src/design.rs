/// Block design generation with global pair avoidance.
///
/// Produces fixed-size blocks over local indices `0..n` such that no pair of
/// items shares more than one block, now or ever (per the pair oracle), while
/// every item reaches at least `j` appearances. Greedy over lexicographic
/// combinations with a growing over-saturation allowance. This is a heuristic
/// with infeasibility detection, not an optimal Steiner-system constructor.
use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashSet;

use crate::error::{Error, Result};
use crate::types::{Block, Pair, PairOracle};

/// Lexicographic `t`-combinations of `0..n`.
#[derive(Debug, Clone)]
pub struct Combinations {
    n: usize,
    current: Vec<usize>,
    done: bool,
}

impl Combinations {
    pub fn new(n: usize, t: usize) -> Self {
        Combinations {
            n,
            current: (0..t).collect(),
            done: t > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let out = self.current.clone();

        // Advance: find the rightmost position that can still move up.
        let t = self.current.len();
        let mut pos = t;
        while pos > 0 {
            pos -= 1;
            if self.current[pos] < self.n - t + pos {
                self.current[pos] += 1;
                for k in (pos + 1)..t {
                    self.current[k] = self.current[k - 1] + 1;
                }
                return Some(out);
            }
        }
        self.done = true;
        Some(out)
    }
}

/// Generate a design of `t`-item blocks in which every item appears at least
/// `j` times. Returns `Ok(None)` when the pair history makes that impossible.
///
/// The generator is deterministic; callers wanting random designs shuffle the
/// index-to-item mapping beforehand (see [`shuffle_design`] for the output).
pub fn generate_design<O>(n: usize, t: usize, j: usize, oracle: &O) -> Result<Option<Vec<Block>>>
where
    O: PairOracle<usize> + ?Sized,
{
    if t < 2 {
        return Err(Error::InvalidBlockSize { block_size: t });
    }

    let mut occurrences = vec![0usize; n];
    let mut observed: FxHashSet<Pair<usize>> = FxHashSet::default();
    let mut blocks: Vec<Block> = Vec::new();
    // Items still short of `j` appearances.
    let mut below_target = if j == 0 { 0 } else { n };

    if below_target == 0 {
        return Ok(Some(blocks));
    }

    for budget in 0..t {
        'candidates: for candidate in Combinations::new(n, t) {
            if below_target == 0 {
                return Ok(Some(blocks));
            }

            for (x, &a) in candidate.iter().enumerate() {
                for &b in &candidate[x + 1..] {
                    if observed.contains(&Pair::new(a, b)) || oracle.exists(&a, &b) {
                        continue 'candidates;
                    }
                }
            }

            // Number of appearances past the target this block would cause.
            let violations: usize = candidate
                .iter()
                .map(|&i| (occurrences[i] + 1).saturating_sub(j))
                .sum();
            if violations > budget {
                continue;
            }

            for (x, &a) in candidate.iter().enumerate() {
                for &b in &candidate[x + 1..] {
                    observed.insert(Pair::new(a, b));
                }
            }
            for &i in &candidate {
                occurrences[i] += 1;
                if occurrences[i] == j {
                    below_target -= 1;
                }
            }
            blocks.push(candidate);
        }
    }

    if below_target == 0 {
        Ok(Some(blocks))
    } else {
        Ok(None)
    }
}

/// Shuffle block order and the order within each block.
///
/// Returns, for each output position, the index of that block in the input.
pub fn shuffle_design<T, R: Rng + ?Sized>(blocks: &mut Vec<Vec<T>>, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..blocks.len()).collect();
    order.shuffle(rng);

    let mut taken: Vec<Option<Vec<T>>> = blocks.drain(..).map(Some).collect();
    for &idx in &order {
        if let Some(mut block) = taken[idx].take() {
            block.shuffle(rng);
            blocks.push(block);
        }
    }
    order
}
