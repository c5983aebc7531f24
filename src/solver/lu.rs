use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CscMatrix;

use crate::solver::{check_square_non_empty, NumericalError, SolverErrorKind, SparseFactorization, StructuralError};
use crate::Real;

/// LU factorization with partial pivoting of the densified matrix.
///
/// Handles nonsymmetric and indefinite systems. Memory and time grow with the square and cube
/// of the dimension, so this backend is meant for small systems and for cross-checking the
/// sparse backends.
#[derive(Debug, Clone)]
pub struct DenseLu<T: Real> {
    pattern: Option<SparsityPattern>,
    lu: Option<LU<T, Dyn, Dyn>>,
}

impl<T: Real> Default for DenseLu<T> {
    fn default() -> Self {
        Self { pattern: None, lu: None }
    }
}

impl<T: Real> DenseLu<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: Real> SparseFactorization<T> for DenseLu<T> {
    fn name(&self) -> &'static str {
        "DenseLU"
    }

    fn analyze_pattern(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverErrorKind> {
        self.pattern = None;
        self.lu = None;
        check_square_non_empty(matrix)?;
        self.pattern = Some(matrix.pattern().clone());
        Ok(())
    }

    fn factorize(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverErrorKind> {
        let pattern = self
            .pattern
            .as_ref()
            .ok_or(SolverErrorKind::PatternNotAnalyzed)?;
        if matrix.pattern() != pattern {
            return Err(StructuralError::PatternMismatch.into());
        }

        self.lu = None;
        let lu = DMatrix::from(matrix).lu();
        if !lu.is_invertible() {
            return Err(NumericalError::Singular.into());
        }
        self.lu = Some(lu);
        Ok(())
    }

    fn solve(&self, rhs: &DVector<T>) -> Result<DVector<T>, SolverErrorKind> {
        let (lu, n) = match (&self.lu, self.dimension()) {
            (Some(lu), Some(n)) => (lu, n),
            _ => return Err(SolverErrorKind::NotFactorized),
        };
        if rhs.len() != n {
            return Err(SolverErrorKind::DimensionMismatch {
                expected: n,
                actual: rhs.len(),
            });
        }
        lu.solve(rhs)
            .ok_or(SolverErrorKind::Numerical(NumericalError::Singular))
    }

    fn dimension(&self) -> Option<usize> {
        self.pattern.as_ref().map(|pattern| pattern.major_dim())
    }
}
