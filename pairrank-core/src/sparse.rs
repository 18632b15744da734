/// Compressed sparse row matrix.
///
/// Column indices are sorted within each row and explicit zeros are never
/// stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl CsrMatrix {
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        CsrMatrix {
            nrows,
            ncols,
            indptr: vec![0; nrows + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn identity(n: usize) -> Self {
        CsrMatrix {
            nrows: n,
            ncols: n,
            indptr: (0..=n).collect(),
            indices: (0..n).collect(),
            data: vec![1.0; n],
        }
    }

    /// Build from `(row, col, value)` triplets. Duplicates are summed.
    ///
    /// Callers guarantee every index is in range.
    pub fn from_triplets<I>(nrows: usize, ncols: usize, triplets: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f64)>,
    {
        let mut entries: Vec<(usize, usize, f64)> = triplets.into_iter().collect();
        entries.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut indptr = vec![0usize; nrows + 1];
        let mut indices = Vec::with_capacity(entries.len());
        let mut data = Vec::with_capacity(entries.len());

        let mut iter = entries.into_iter().peekable();
        while let Some((row, col, mut value)) = iter.next() {
            while let Some(&(r, c, v)) = iter.peek() {
                if r != row || c != col {
                    break;
                }
                value += v;
                iter.next();
            }
            if value != 0.0 {
                indices.push(col);
                data.push(value);
                indptr[row + 1] += 1;
            }
        }
        for r in 0..nrows {
            indptr[r + 1] += indptr[r];
        }

        CsrMatrix {
            nrows,
            ncols,
            indptr,
            indices,
            data,
        }
    }

    /// Build from dense rows. All rows must have `rows[0].len()` columns.
    pub fn from_dense(rows: &[Vec<f64>]) -> Self {
        let ncols = rows.first().map_or(0, Vec::len);
        let triplets = rows.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, &v)| v != 0.0)
                .map(move |(j, &v)| (i, j, v))
        });
        Self::from_triplets(rows.len(), ncols, triplets)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Stored entries of row `i` as `(col, value)`, in column order.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.indptr[i]..self.indptr[i + 1];
        self.indices[range.clone()]
            .iter()
            .copied()
            .zip(self.data[range].iter().copied())
    }

    pub fn row_nnz(&self, i: usize) -> usize {
        self.indptr[i + 1] - self.indptr[i]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        let range = self.indptr[i]..self.indptr[i + 1];
        match self.indices[range.clone()].binary_search(&j) {
            Ok(pos) => self.data[range.start + pos],
            Err(_) => 0.0,
        }
    }

    /// All stored entries as `(row, col, value)`.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nrows).flat_map(move |i| self.row(i).map(move |(j, v)| (i, j, v)))
    }

    pub fn transpose(&self) -> CsrMatrix {
        CsrMatrix::from_triplets(
            self.ncols,
            self.nrows,
            self.triplets().map(|(i, j, v)| (j, i, v)),
        )
    }

    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.ncols);
        (0..self.nrows)
            .map(|i| self.row(i).map(|(j, v)| v * x[j]).sum())
            .collect()
    }

    /// Principal submatrix over `keep`, re-indexed to `0..keep.len()`.
    pub fn submatrix(&self, keep: &[usize]) -> CsrMatrix {
        let mut local = vec![usize::MAX; self.ncols];
        for (pos, &idx) in keep.iter().enumerate() {
            local[idx] = pos;
        }
        let triplets = keep.iter().enumerate().flat_map(|(li, &i)| {
            let local = &local;
            self.row(i)
                .filter(move |&(j, _)| local[j] != usize::MAX)
                .map(move |(j, v)| (li, local[j], v))
        });
        CsrMatrix::from_triplets(keep.len(), keep.len(), triplets)
    }

    /// Dense copy in row-major order.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.ncols]; self.nrows];
        for (i, j, v) in self.triplets() {
            dense[i][j] = v;
        }
        dense
    }

    /// Sum of each row's stored values.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.nrows).map(|i| self.row(i).map(|(_, v)| v).sum()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triplets_sum_duplicates_and_drop_zeros() {
        let m = CsrMatrix::from_triplets(
            2,
            3,
            vec![(0, 2, 1.0), (0, 2, 2.0), (1, 0, 5.0), (1, 1, 0.0)],
        );
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.get(0, 2), 3.0);
        assert_eq!(m.get(1, 0), 5.0);
        assert_eq!(m.get(1, 1), 0.0);
        assert_eq!(m.row_nnz(1), 1);
    }

    #[test]
    fn test_transpose_and_mul_vec() {
        let m = CsrMatrix::from_dense(&[vec![1.0, 2.0], vec![0.0, 3.0]]);
        let t = m.transpose();
        assert_eq!(t.to_dense(), vec![vec![1.0, 0.0], vec![2.0, 3.0]]);
        assert_eq!(m.mul_vec(&[1.0, 1.0]), vec![3.0, 3.0]);
    }

    #[test]
    fn test_submatrix_reindexes() {
        let m = CsrMatrix::from_dense(&[
            vec![0.0, 1.0, 2.0],
            vec![3.0, 0.0, 4.0],
            vec![5.0, 6.0, 0.0],
        ]);
        let sub = m.submatrix(&[2, 0]);
        assert_eq!(sub.to_dense(), vec![vec![0.0, 5.0], vec![2.0, 0.0]]);
    }
}
