/// Win matrix: `W[i, j]` counts how often item `i` was preferred over item `j`.
///
/// The matrix is validated once at construction, so the ranking code can
/// rely on it being square with finite, non-negative entries.
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Error, Result};
use crate::sparse::CsrMatrix;
use crate::types::IdMap;

#[derive(Debug, Clone, PartialEq)]
pub struct WinMatrix {
    counts: CsrMatrix,
}

impl WinMatrix {
    /// An `n x n` matrix with no recorded outcomes.
    pub fn empty(n: usize) -> Self {
        WinMatrix {
            counts: CsrMatrix::zeros(n, n),
        }
    }

    pub fn from_csr(counts: CsrMatrix) -> Result<Self> {
        if counts.nrows() != counts.ncols() {
            return Err(Error::NonSquareMatrix {
                rows: counts.nrows(),
                cols: counts.ncols(),
            });
        }
        for (row, col, value) in counts.triplets() {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidCount { row, col, value });
            }
        }
        Ok(WinMatrix { counts })
    }

    pub fn from_triplets<I>(n: usize, triplets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut checked = Vec::new();
        for (row, col, value) in triplets {
            let index = row.max(col);
            if index >= n {
                return Err(Error::IndexOutOfRange { index, len: n });
            }
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidCount { row, col, value });
            }
            checked.push((row, col, value));
        }
        Ok(WinMatrix {
            counts: CsrMatrix::from_triplets(n, n, checked),
        })
    }

    pub fn from_dense(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        for row in rows {
            if row.len() != n {
                return Err(Error::NonSquareMatrix {
                    rows: n,
                    cols: row.len(),
                });
            }
        }
        Self::from_csr(CsrMatrix::from_dense(rows))
    }

    /// Aggregate a stream of `(winner, loser)` judgments.
    pub fn from_outcomes<I>(n: usize, outcomes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut triplets = Vec::new();
        for (winner, loser) in outcomes {
            if winner == loser {
                return Err(Error::SelfComparison { index: winner });
            }
            triplets.push((winner, loser, 1.0));
        }
        Self::from_triplets(n, triplets)
    }

    /// Number of items (rows).
    pub fn n(&self) -> usize {
        self.counts.nrows()
    }

    pub fn wins(&self, winner: usize, loser: usize) -> f64 {
        self.counts.get(winner, loser)
    }

    pub fn comparisons_between(&self, a: usize, b: usize) -> f64 {
        self.wins(a, b) + self.wins(b, a)
    }

    /// Total recorded comparisons involving each item, in one pass.
    pub fn comparisons_per_item(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n()];
        for (winner, loser, count) in self.counts.triplets() {
            totals[winner] += count;
            totals[loser] += count;
        }
        totals
    }

    pub fn total_comparisons(&self) -> f64 {
        self.counts.triplets().map(|(_, _, v)| v).sum()
    }

    pub fn as_csr(&self) -> &CsrMatrix {
        &self.counts
    }
}

/// Accumulates judgments keyed by caller IDs.
///
/// Indices are assigned in first-seen order.
#[derive(Debug, Clone)]
pub struct WinTally<T> {
    ids: IdMap<T>,
    outcomes: Vec<(usize, usize)>,
}

impl<T> Default for WinTally<T> {
    fn default() -> Self {
        WinTally {
            ids: IdMap::default(),
            outcomes: Vec::new(),
        }
    }
}

impl<T: Clone + Eq + Hash + Debug> WinTally<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known item list so items without outcomes keep an index.
    pub fn with_items(items: &[T]) -> Result<Self> {
        Ok(WinTally {
            ids: IdMap::from_ids(items)?,
            outcomes: Vec::new(),
        })
    }

    pub fn record(&mut self, winner: &T, loser: &T) -> Result<()> {
        let w = self.ids.get_or_insert(winner);
        let l = self.ids.get_or_insert(loser);
        if w == l {
            return Err(Error::SelfComparison { index: w });
        }
        self.outcomes.push((w, l));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Item IDs in index order, alongside the aggregated matrix.
    pub fn finish(self) -> Result<(Vec<T>, WinMatrix)> {
        let n = self.ids.len();
        let matrix = WinMatrix::from_outcomes(n, self.outcomes)?;
        Ok((self.ids.into_ids(), matrix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_outcomes_counts() {
        let w = WinMatrix::from_outcomes(3, vec![(0, 1), (0, 1), (1, 0), (2, 0)]).unwrap();
        assert_eq!(w.wins(0, 1), 2.0);
        assert_eq!(w.wins(1, 0), 1.0);
        assert_eq!(w.comparisons_between(0, 1), 3.0);
        assert_eq!(w.comparisons_per_item(), vec![4.0, 3.0, 1.0]);
        assert_eq!(w.total_comparisons(), 4.0);
    }

    #[test]
    fn test_rejects_non_square() {
        let err = WinMatrix::from_dense(&[vec![0.0, 1.0]]).unwrap_err();
        assert_eq!(err, Error::NonSquareMatrix { rows: 1, cols: 2 });
    }

    #[test]
    fn test_rejects_negative_counts() {
        let err = WinMatrix::from_dense(&[vec![0.0, -1.0], vec![2.0, 0.0]]).unwrap_err();
        assert!(matches!(err, Error::InvalidCount { row: 0, col: 1, .. }));
    }

    #[test]
    fn test_rejects_out_of_range_and_self_comparison() {
        assert!(matches!(
            WinMatrix::from_outcomes(2, vec![(0, 2)]),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert!(matches!(
            WinMatrix::from_outcomes(2, vec![(1, 1)]),
            Err(Error::SelfComparison { index: 1 })
        ));
    }

    #[test]
    fn test_tally_keeps_idle_items() {
        let mut tally = WinTally::with_items(&["a", "b", "c"]).unwrap();
        tally.record(&"b", &"a").unwrap();
        tally.record(&"d", &"b").unwrap();
        let (ids, w) = tally.finish().unwrap();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(w.n(), 4);
        assert_eq!(w.wins(1, 0), 1.0);
        assert_eq!(w.wins(3, 1), 1.0);
        assert_eq!(w.comparisons_per_item()[2], 0.0);
    }

    #[test]
    fn test_comparisons_per_item_on_long_chain() {
        let n = 20_000;
        let w = WinMatrix::from_outcomes(n, (1..n).map(|i| (i, i - 1))).unwrap();
        let totals = w.comparisons_per_item();
        assert_eq!(totals.len(), n);
        assert_eq!(totals[0], 1.0);
        assert_eq!(totals[n - 1], 1.0);
        assert!(totals[1..n - 1].iter().all(|&c| c == 2.0));
        assert_eq!(totals.iter().sum::<f64>(), 2.0 * w.total_comparisons());
    }
}
