//! Compressed sparse row matrix
//!
//! Backs both the TF-IDF feature matrix and the user-item rating matrix.
//! Absent entries read as zero.

use ndarray::Array2;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    /// Row `r` occupies `indices[indptr[r]..indptr[r + 1]]`
    indptr: Vec<usize>,
    /// Column of each stored value, ascending within a row
    indices: Vec<usize>,
    values: Vec<f32>,
    num_rows: usize,
    num_cols: usize,
}

impl SparseMatrix {
    pub fn empty(num_rows: usize, num_cols: usize) -> Self {
        Self {
            indptr: vec![0; num_rows + 1],
            indices: Vec::new(),
            values: Vec::new(),
            num_rows,
            num_cols,
        }
    }

    /// Build from `(row, col, value)` coordinates
    ///
    /// Duplicate coordinates keep the value that appears last in the input.
    /// Coordinates outside the shape are ignored.
    pub fn from_triplets<I>(num_rows: usize, num_cols: usize, triplets: I) -> Self
    where
        I: IntoIterator<Item = (usize, usize, f32)>,
    {
        let mut cells: BTreeMap<(usize, usize), f32> = BTreeMap::new();
        for (row, col, value) in triplets {
            if row < num_rows && col < num_cols {
                cells.insert((row, col), value);
            }
        }

        let mut matrix = Self::empty(num_rows, num_cols);
        matrix.indices.reserve(cells.len());
        matrix.values.reserve(cells.len());

        let mut counts = vec![0usize; num_rows];
        for ((row, col), value) in cells {
            counts[row] += 1;
            matrix.indices.push(col);
            matrix.values.push(value);
        }
        for (row, count) in counts.into_iter().enumerate() {
            matrix.indptr[row + 1] = matrix.indptr[row] + count;
        }

        matrix
    }

    /// Build from per-row `(col, value)` lists, which must be sorted by column
    pub fn from_rows(num_cols: usize, rows: Vec<Vec<(usize, f32)>>) -> Self {
        let num_rows = rows.len();
        let nnz = rows.iter().map(Vec::len).sum();
        let mut indptr = Vec::with_capacity(num_rows + 1);
        let mut indices = Vec::with_capacity(nnz);
        let mut values = Vec::with_capacity(nnz);

        indptr.push(0);
        for row in rows {
            for (col, value) in row {
                indices.push(col);
                values.push(value);
            }
            indptr.push(indices.len());
        }

        Self {
            indptr,
            indices,
            values,
            num_rows,
            num_cols,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows, self.num_cols)
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let (start, end) = if row < self.num_rows {
            (self.indptr[row], self.indptr[row + 1])
        } else {
            (0, 0)
        };
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        if row >= self.num_rows {
            return 0.0;
        }
        let start = self.indptr[row];
        let end = self.indptr[row + 1];
        match self.indices[start..end].binary_search(&col) {
            Ok(pos) => self.values[start + pos],
            Err(_) => 0.0,
        }
    }

    /// Dot product of row `row` with every row, in row order
    ///
    /// Uses one dense scratch vector of `num_cols` entries; no pairwise
    /// matrix is ever formed.
    pub fn row_dot_all(&self, row: usize) -> Vec<f32> {
        let mut query = vec![0.0f32; self.num_cols];
        for (col, value) in self.row(row) {
            query[col] = value;
        }

        (0..self.num_rows)
            .map(|other| self.row(other).map(|(col, value)| value * query[col]).sum())
            .collect()
    }

    /// `self * dense`, where `dense` is `num_cols x k`
    pub fn mul_dense(&self, dense: &Array2<f64>) -> Array2<f64> {
        let k = dense.ncols();
        let mut out = Array2::<f64>::zeros((self.num_rows, k));
        for row in 0..self.num_rows {
            for (col, value) in self.row(row) {
                let value = f64::from(value);
                for j in 0..k {
                    out[[row, j]] += value * dense[[col, j]];
                }
            }
        }
        out
    }

    /// `self^T * dense`, where `dense` is `num_rows x k`
    pub fn transpose_mul_dense(&self, dense: &Array2<f64>) -> Array2<f64> {
        let k = dense.ncols();
        let mut out = Array2::<f64>::zeros((self.num_cols, k));
        for row in 0..self.num_rows {
            for (col, value) in self.row(row) {
                let value = f64::from(value);
                for j in 0..k {
                    out[[col, j]] += value * dense[[row, j]];
                }
            }
        }
        out
    }
}
