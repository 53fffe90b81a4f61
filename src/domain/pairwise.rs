//! Pairwise comparison matrices: validation, priority vectors and consistency.

use itertools::iproduct;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::domain::error::{DomainError, DomainResult};

/// Saaty's random consistency index for matrix sizes 1..=15.
pub const RANDOM_INDEX: [f64; 15] = [
    0.00, 0.00, 0.58, 0.90, 1.12, 1.24, 1.32, 1.41, 1.45, 1.49, 1.51, 1.48, 1.56, 1.57, 1.59,
];

/// Random index used for matrices larger than the table.
pub const DEFAULT_RANDOM_INDEX: f64 = 1.49;

/// Conventional upper bound for an acceptable consistency ratio.
pub const ACCEPTABLE_CONSISTENCY_RATIO: f64 = 0.1;

/// Lower bound of the Saaty judgment scale.
pub const MIN_MARK: f64 = 1.0;

/// Upper bound of the Saaty judgment scale.
pub const MAX_MARK: f64 = 9.0;

pub fn random_index(size: usize) -> f64 {
    match size {
        0 => 0.0,
        n => RANDOM_INDEX
            .get(n - 1)
            .copied()
            .unwrap_or(DEFAULT_RANDOM_INDEX),
    }
}

/// Closeness test used for the reciprocal property, `allclose` style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub rtol: f64,
    pub atol: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            rtol: 1e-5,
            atol: 1e-8,
        }
    }
}

impl Tolerance {
    pub fn close(&self, actual: f64, expected: f64) -> bool {
        (actual - expected).abs() <= self.atol + self.rtol * expected.abs()
    }
}

/// Reciprocal judgment matrix owned by one internal node.
///
/// Row/column `i` corresponds to the node's `i`-th child. A fresh matrix is all
/// ones: every pair judged equally important.
#[derive(Debug, Clone, PartialEq)]
pub struct PairwiseComparisonMatrix {
    matrix: DMatrix<f64>,
    tolerance: Tolerance,
}

impl PairwiseComparisonMatrix {
    pub fn new(size: usize) -> Self {
        Self::with_tolerance(size, Tolerance::default())
    }

    pub fn with_tolerance(size: usize, tolerance: Tolerance) -> Self {
        Self {
            matrix: DMatrix::from_element(size, size, 1.0),
            tolerance,
        }
    }

    pub fn size(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.matrix.get((i, j)).copied()
    }

    /// Row-major copy of the matrix.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    /// Sets `a[i][j] = value` and `a[j][i] = 1 / value`.
    pub fn set_comparison(&mut self, i: usize, j: usize, value: f64) -> DomainResult<()> {
        let size = self.size();
        if i >= size || j >= size {
            return Err(DomainError::IndexOutOfBounds { i, j, size });
        }
        if !value.is_finite() || value <= 0.0 {
            return Err(DomainError::InvalidComparison(value));
        }
        if i == j && value != 1.0 {
            return Err(DomainError::BadDiagonal { index: i, value });
        }
        self.matrix[(i, j)] = value;
        self.matrix[(j, i)] = 1.0 / value;
        Ok(())
    }

    /// Replaces the whole matrix. On error the current matrix is left untouched.
    ///
    /// The new size is taken from `rows`; it need not match the previous size.
    #[instrument(level = "trace", skip(self))]
    pub fn set_matrix(&mut self, rows: &[Vec<f64>]) -> DomainResult<()> {
        let candidate = self.validate(rows)?;
        self.matrix = candidate;
        Ok(())
    }

    fn validate(&self, rows: &[Vec<f64>]) -> DomainResult<DMatrix<f64>> {
        let n = rows.len();
        if n == 0 {
            return Err(DomainError::EmptyMatrix);
        }
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(DomainError::NotSquare {
                rows: n,
                row,
                cols: r.len(),
            });
        }
        if let Some(value) = rows
            .iter()
            .flatten()
            .find(|v| !v.is_finite() || **v <= 0.0)
        {
            return Err(DomainError::InvalidComparison(*value));
        }
        for (index, row) in rows.iter().enumerate() {
            if row[index] != 1.0 {
                return Err(DomainError::BadDiagonal {
                    index,
                    value: row[index],
                });
            }
        }
        for (i, j) in iproduct!(0..n, 0..n) {
            let (a, b) = (rows[i][j], rows[j][i]);
            if !self.tolerance.close(a, 1.0 / b) {
                return Err(DomainError::NotReciprocal { i, j, a, b });
            }
        }
        Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
    }

    /// Largest real part among the eigenvalues, with its real eigenvector.
    fn principal_eigenpair(&self) -> DomainResult<(f64, DVector<f64>)> {
        let n = self.size();
        if n == 0 {
            return Err(DomainError::EmptyMatrix);
        }
        if n == 1 {
            return Ok((self.matrix[(0, 0)], DVector::from_element(1, 1.0)));
        }

        let lambda = self
            .matrix
            .complex_eigenvalues()
            .iter()
            .map(|c| c.re)
            .filter(|re| re.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);
        if !lambda.is_finite() {
            return Err(DomainError::Decomposition(
                "no finite eigenvalue".to_string(),
            ));
        }

        // eigenvector = null space direction of (A - lambda I)
        let shifted = &self.matrix - DMatrix::<f64>::identity(n, n) * lambda;
        let svd = shifted.svd(false, true);
        let v_t = svd.v_t.ok_or_else(|| {
            DomainError::Decomposition("missing right singular vectors".to_string())
        })?;
        let (smallest, _) = svd
            .singular_values
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| DomainError::Decomposition("no singular values".to_string()))?;
        let vector = v_t.row(smallest).transpose();
        trace!(lambda, ?vector, "principal eigenpair");
        Ok((lambda, vector))
    }

    pub fn principal_eigenvalue(&self) -> DomainResult<f64> {
        self.principal_eigenpair().map(|(lambda, _)| lambda)
    }

    /// Dominant eigenvector, normalized to sum to 1.
    pub fn priority_vector(&self) -> DomainResult<Vec<f64>> {
        let (_, vector) = self.principal_eigenpair()?;
        let sum: f64 = vector.iter().sum();
        if !sum.is_finite() || sum.abs() < f64::EPSILON {
            return Err(DomainError::Decomposition(
                "principal eigenvector sums to zero".to_string(),
            ));
        }
        Ok(vector.iter().map(|x| x / sum).collect())
    }

    /// `CI = (lambda_max - n) / (n - 1)`; `None` when `n <= 1`.
    pub fn consistency_index(&self) -> DomainResult<Option<f64>> {
        let n = self.size();
        if n <= 1 {
            return Ok(None);
        }
        let lambda = self.principal_eigenvalue()?;
        Ok(Some((lambda - n as f64) / (n as f64 - 1.0)))
    }

    /// `CR = CI / RI(n)`; `None` when `n <= 1`, `0` when `RI(n) == 0`.
    pub fn consistency_ratio(&self) -> DomainResult<Option<f64>> {
        let Some(ci) = self.consistency_index()? else {
            return Ok(None);
        };
        let ri = random_index(self.size());
        if ri == 0.0 {
            return Ok(Some(0.0));
        }
        Ok(Some(ci / ri))
    }

    /// Matrices too small to have a consistency ratio count as consistent.
    pub fn is_consistent(&self, threshold: f64) -> DomainResult<bool> {
        Ok(self
            .consistency_ratio()?
            .map_or(true, |cr| cr <= threshold))
    }
}
