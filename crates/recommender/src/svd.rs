//! Randomized truncated SVD over a sparse matrix
//!
//! Range finder with power iterations (Halko, Martinsson, Tropp), followed by an
//! exact eigendecomposition of the small projected Gram matrix. Only the
//! `n x r` projection `U * Sigma` is kept: each row is a dense embedding of the
//! corresponding sparse row.

use crate::sparse::SparseMatrix;
use marquee_core::MarqueeError;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SvdParams {
    pub rank: usize,
    pub oversamples: usize,
    pub power_iterations: usize,
    pub seed: u64,
}

/// Project `matrix` onto its leading `rank` singular directions
///
/// Returns a `num_rows x rank` array. Deterministic for a given seed; component
/// signs are fixed so the largest-magnitude entry of each column is positive.
pub fn fit_transform(matrix: &SparseMatrix, params: SvdParams) -> Result<Array2<f64>, MarqueeError> {
    let (rows, cols) = matrix.shape();
    if params.rank == 0 || params.rank > cols {
        return Err(MarqueeError::Training(format!(
            "rank {} is out of range for a {}x{} matrix",
            params.rank, rows, cols
        )));
    }

    let sketch = (params.rank + params.oversamples).min(cols);
    let mut rng = StdRng::seed_from_u64(params.seed);
    let omega = Array2::from_shape_fn((cols, sketch), |_| rng.gen_range(-1.0..1.0));

    let mut q = orthonormalize(matrix.mul_dense(&omega));
    for _ in 0..params.power_iterations {
        let z = orthonormalize(matrix.transpose_mul_dense(&q));
        q = orthonormalize(matrix.mul_dense(&z));
    }

    // B = Q^T A, stored transposed as A^T Q (cols x sketch)
    let b_t = matrix.transpose_mul_dense(&q);
    let gram = b_t.t().dot(&b_t);
    let (eigenvalues, eigenvectors) = symmetric_eigen(gram)?;

    let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]).then(a.cmp(&b)));

    let mut projection = Array2::<f64>::zeros((rows, params.rank));
    for (component, &index) in order.iter().take(params.rank).enumerate() {
        let sigma = eigenvalues[index].max(0.0).sqrt();
        let mut column = q.dot(&eigenvectors.column(index)) * sigma;

        let pivot = column
            .iter()
            .copied()
            .fold(0.0f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            column.mapv_inplace(|v| -v);
        }
        projection.column_mut(component).assign(&column);
    }

    if projection.iter().any(|v| !v.is_finite()) {
        return Err(MarqueeError::Training(
            "decomposition produced non-finite values".to_string(),
        ));
    }

    Ok(projection)
}

/// Modified Gram-Schmidt on the columns; dependent columns become zero
fn orthonormalize(mut a: Array2<f64>) -> Array2<f64> {
    let k = a.ncols();
    for j in 0..k {
        for i in 0..j {
            let projection = a.column(i).dot(&a.column(j));
            let basis = a.column(i).to_owned();
            a.column_mut(j).scaled_add(-projection, &basis);
        }
        let norm = a.column(j).dot(&a.column(j)).sqrt();
        if norm > 1e-10 {
            a.column_mut(j).mapv_inplace(|v| v / norm);
        } else {
            a.column_mut(j).fill(0.0);
        }
    }
    a
}

/// Cyclic Jacobi eigendecomposition of a small symmetric matrix
fn symmetric_eigen(mut a: Array2<f64>) -> Result<(Array1<f64>, Array2<f64>), MarqueeError> {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off_diagonal: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum();
        let scale: f64 = a.iter().map(|x| x * x).sum();
        if off_diagonal <= JACOBI_TOLERANCE * scale.max(f64::MIN_POSITIVE) {
            return Ok((a.diag().to_owned(), v));
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]].abs() < f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    Err(MarqueeError::Training(
        "eigendecomposition did not converge".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(rank: usize) -> SvdParams {
        SvdParams {
            rank,
            oversamples: 10,
            power_iterations: 5,
            seed: 42,
        }
    }

    #[test]
    fn test_projection_shape() {
        let matrix = SparseMatrix::from_triplets(
            4,
            3,
            vec![(0, 0, 5.0), (1, 1, 3.0), (2, 2, 4.0), (3, 0, 1.0)],
        );
        let projection = fit_transform(&matrix, params(2)).unwrap();
        assert_eq!(projection.dim(), (4, 2));
    }

    #[test]
    fn test_recovers_singular_values_of_diagonal() {
        let matrix = SparseMatrix::from_triplets(3, 3, vec![(0, 0, 5.0), (1, 1, 3.0), (2, 2, 1.0)]);
        let projection = fit_transform(&matrix, params(2)).unwrap();

        // U * Sigma for a diagonal matrix places each singular value on its own row
        assert!((projection[[0, 0]] - 5.0).abs() < 1e-6);
        assert!((projection[[1, 1]] - 3.0).abs() < 1e-6);
        assert!(projection[[2, 0]].abs() < 1e-6);
        assert!(projection[[2, 1]].abs() < 1e-6);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let matrix = SparseMatrix::from_triplets(
            3,
            4,
            vec![(0, 0, 5.0), (0, 1, 4.0), (1, 1, 2.0), (2, 3, 3.0), (2, 2, 1.0)],
        );
        let first = fit_transform(&matrix, params(2)).unwrap();
        let second = fit_transform(&matrix, params(2)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_rank_rejected() {
        let matrix = SparseMatrix::from_triplets(1, 1, vec![(0, 0, 1.0)]);
        assert!(matches!(
            fit_transform(&matrix, params(0)),
            Err(MarqueeError::Training(_))
        ));
    }

    #[test]
    fn test_jacobi_on_known_matrix() {
        let (values, _) = symmetric_eigen(ndarray::array![[2.0, 1.0], [1.0, 2.0]]).unwrap();
        let mut values = values.to_vec();
        values.sort_by(f64::total_cmp);
        assert!((values[0] - 1.0).abs() < 1e-9);
        assert!((values[1] - 3.0).abs() < 1e-9);
    }
}
