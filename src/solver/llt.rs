use log::debug;
use nalgebra::DVector;
use nalgebra_sparse::factorization::{CscCholesky, CscSymbolicCholesky};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CscMatrix;
use serde::{Deserialize, Serialize};

use crate::reorder::{permute_symmetric, reverse_cuthill_mckee, Permutation};
use crate::solver::{check_square_non_empty, NumericalError, SolverErrorKind, SparseFactorization, StructuralError};
use crate::Real;

/// Symmetric ordering applied to the matrix before it is factorized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ordering {
    /// Factorize the matrix as given.
    Natural,
    /// Bandwidth-reducing reverse Cuthill-McKee ordering.
    ReverseCuthillMcKee,
}

impl Default for Ordering {
    fn default() -> Self {
        Self::ReverseCuthillMcKee
    }
}

#[derive(Debug)]
enum Factor<T> {
    Symbolic(CscSymbolicCholesky),
    Numeric(CscCholesky<T>),
}

#[derive(Debug)]
struct PatternAnalysis<T> {
    pattern: SparsityPattern,
    permutation: Permutation,
    /// Entry `k` of the permuted matrix is entry `value_map[k]` of the original matrix.
    value_map: Vec<usize>,
    // None after a failed factorization, which leaves no usable symbolic data behind
    factor: Option<Factor<T>>,
}

/// Simplicial sparse Cholesky factorization `P A P^T = L L^T` for symmetric positive definite
/// matrices.
///
/// Only the sparsity pattern has to be symmetric for the analysis to succeed. A matrix that
/// is not positive definite is rejected during factorization.
#[derive(Debug)]
pub struct SimplicialLlt<T> {
    ordering: Ordering,
    analysis: Option<PatternAnalysis<T>>,
}

impl<T> Default for SimplicialLlt<T> {
    fn default() -> Self {
        Self {
            ordering: Ordering::default(),
            analysis: None,
        }
    }
}

impl<T> SimplicialLlt<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ordering(self, ordering: Ordering) -> Self {
        Self { ordering, ..self }
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    /// The permutation computed by the last successful pattern analysis.
    pub fn permutation(&self) -> Option<&Permutation> {
        self.analysis.as_ref().map(|analysis| &analysis.permutation)
    }
}

fn check_symmetric_with_diagonal(pattern: &SparsityPattern) -> Result<(), StructuralError> {
    for i in 0..pattern.major_dim() {
        if pattern.lane(i).binary_search(&i).is_err() {
            return Err(StructuralError::MissingDiagonal(i));
        }
    }
    if pattern.transpose() != *pattern {
        return Err(StructuralError::NotSymmetric);
    }
    Ok(())
}

impl<T: Real> SparseFactorization<T> for SimplicialLlt<T> {
    fn name(&self) -> &'static str {
        "SimplicialLLT"
    }

    fn analyze_pattern(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverErrorKind> {
        self.analysis = None;
        check_square_non_empty(matrix)?;
        let pattern = matrix.pattern();
        check_symmetric_with_diagonal(pattern)?;

        let permutation = match self.ordering {
            Ordering::Natural => Permutation::identity(pattern.major_dim()),
            Ordering::ReverseCuthillMcKee => reverse_cuthill_mckee(pattern),
        };
        let (permuted_pattern, value_map) = permute_symmetric(pattern, &permutation);
        let symbolic = CscSymbolicCholesky::factor(permuted_pattern);
        debug!(
            "SimplicialLLT: analyzed {0}x{0} pattern with {1} non-zeros, factor has {2} non-zeros ({3:?} ordering)",
            pattern.major_dim(),
            pattern.nnz(),
            symbolic.l_pattern().nnz(),
            self.ordering
        );

        self.analysis = Some(PatternAnalysis {
            pattern: pattern.clone(),
            permutation,
            value_map,
            factor: Some(Factor::Symbolic(symbolic)),
        });
        Ok(())
    }

    fn factorize(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverErrorKind> {
        let analysis = self
            .analysis
            .as_mut()
            .ok_or(SolverErrorKind::PatternNotAnalyzed)?;
        if matrix.pattern() != &analysis.pattern {
            return Err(StructuralError::PatternMismatch.into());
        }

        let values = matrix.values();
        let permuted_values: Vec<T> = analysis.value_map.iter().map(|&k| values[k]).collect();

        let factor = match analysis.factor.take() {
            Some(Factor::Symbolic(symbolic)) => CscCholesky::factor_numerical(symbolic, &permuted_values).ok(),
            Some(Factor::Numeric(mut factor)) => factor.refactor(&permuted_values).ok().map(|_| factor),
            None => return Err(SolverErrorKind::PatternNotAnalyzed),
        };

        match factor {
            Some(factor) => {
                analysis.factor = Some(Factor::Numeric(factor));
                Ok(())
            }
            None => Err(NumericalError::NotPositiveDefinite.into()),
        }
    }

    fn solve(&self, rhs: &DVector<T>) -> Result<DVector<T>, SolverErrorKind> {
        let analysis = self.analysis.as_ref().ok_or(SolverErrorKind::NotFactorized)?;
        let factor = match &analysis.factor {
            Some(Factor::Numeric(factor)) => factor,
            _ => return Err(SolverErrorKind::NotFactorized),
        };

        let n = analysis.permutation.len();
        if rhs.len() != n {
            return Err(SolverErrorKind::DimensionMismatch {
                expected: n,
                actual: rhs.len(),
            });
        }

        let permuted_rhs = DVector::from_vec(analysis.permutation.apply_to_slice(rhs.as_slice()));
        let permuted_solution = factor.solve(&permuted_rhs);
        let solution = analysis
            .permutation
            .apply_inverse_to_slice(permuted_solution.as_slice());
        Ok(DVector::from_vec(solution))
    }

    fn dimension(&self) -> Option<usize> {
        self.analysis
            .as_ref()
            .map(|analysis| analysis.pattern.major_dim())
    }
}
