//! Direct sparse linear solvers.
//!
//! A [`LinearSolver`] drives a factorization backend through three stages:
//!
//! 1. [`analyze_pattern`](LinearSolver::analyze_pattern) inspects only the non-zero structure
//!    of the matrix and prepares the symbolic factorization (including a fill-reducing
//!    ordering where the backend supports one).
//! 2. [`factorize`](LinearSolver::factorize) computes the numerical factorization for a matrix
//!    with the analyzed pattern. It may be called repeatedly as the values change, e.g. once per
//!    time step, without analyzing the pattern again.
//! 3. [`solve`](LinearSolver::solve) applies the factorization to a right-hand side.
//!
//! Every failed call moves the solver to [`SolverStatus::Failed`], after which only a
//! successful `analyze_pattern` makes it usable again.
use core::fmt;
use std::error::Error;

use log::{debug, warn};
use nalgebra::DVector;
use nalgebra_sparse::ops::serial::spmm_csc_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CscMatrix;
use serde::{Deserialize, Serialize};

use crate::Real;

mod llt;
mod lu;

pub use llt::*;
pub use lu::*;

/// The stage a [`LinearSolver`] has reached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolverStatus {
    Uninitialized,
    PatternAnalyzed,
    Factorized,
    Failed,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::PatternAnalyzed => write!(f, "pattern analyzed"),
            Self::Factorized => write!(f, "factorized"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The matrix structure cannot be handled by the backend.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StructuralError {
    NotSquare { nrows: usize, ncols: usize },
    Empty,
    /// The pattern differs from its transpose.
    NotSymmetric,
    /// The diagonal entry of the given row is not part of the pattern.
    MissingDiagonal(usize),
    /// The matrix passed to `factorize` does not have the analyzed pattern.
    PatternMismatch,
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotSquare { nrows, ncols } => {
                write!(f, "Matrix is not square ({} x {})", nrows, ncols)
            }
            Self::Empty => write!(f, "Matrix is empty"),
            Self::NotSymmetric => write!(f, "Sparsity pattern is not symmetric"),
            Self::MissingDiagonal(i) => write!(f, "Diagonal entry {} is not in the sparsity pattern", i),
            Self::PatternMismatch => write!(f, "Sparsity pattern differs from the analyzed pattern"),
        }
    }
}

/// The factorization or the solve broke down numerically.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NumericalError {
    NotPositiveDefinite,
    Singular,
    NonFiniteSolution,
    /// The relative residual of the solution exceeds the configured tolerance.
    ResidualTooLarge,
}

impl fmt::Display for NumericalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositiveDefinite => write!(f, "Matrix is not positive definite"),
            Self::Singular => write!(f, "Matrix is singular"),
            Self::NonFiniteSolution => write!(f, "Solution contains non-finite values"),
            Self::ResidualTooLarge => write!(f, "Residual of the solution exceeds the tolerance"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SolverErrorKind {
    Structural(StructuralError),
    Numerical(NumericalError),
    /// `solve` was called without a valid factorization.
    NotFactorized,
    /// `factorize` was called without a valid pattern analysis.
    PatternNotAnalyzed,
    DimensionMismatch { expected: usize, actual: usize },
}

impl From<StructuralError> for SolverErrorKind {
    fn from(err: StructuralError) -> Self {
        Self::Structural(err)
    }
}

impl From<NumericalError> for SolverErrorKind {
    fn from(err: NumericalError) -> Self {
        Self::Numerical(err)
    }
}

impl fmt::Display for SolverErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural(err) => {
                write!(f, "Structural failure: ")?;
                err.fmt(f)
            }
            Self::Numerical(err) => {
                write!(f, "Numerical failure: ")?;
                err.fmt(f)
            }
            Self::NotFactorized => write!(f, "Solver has no valid factorization"),
            Self::PatternNotAnalyzed => write!(f, "Solver has no valid pattern analysis"),
            Self::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

/// A failed call to a [`LinearSolver`].
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SolverError {
    pub kind: SolverErrorKind,
    /// The status of the solver when the failing call was made.
    pub status: SolverStatus,
}

impl SolverError {
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, SolverErrorKind::Structural(_))
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self.kind, SolverErrorKind::Numerical(_))
    }
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Linear solver failed (status: {}). Error: {}", self.status, self.kind)
    }
}

impl Error for SolverError {}

/// A direct factorization backend for sparse matrices.
///
/// Backends are expected to be usable on their own, so every method validates its own
/// preconditions. A successful `analyze_pattern` discards any previous factorization.
pub trait SparseFactorization<T: Real> {
    /// Short name of the backend, for diagnostics.
    fn name(&self) -> &'static str;

    fn analyze_pattern(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverErrorKind>;

    /// Computes the numerical factorization of a matrix with the analyzed pattern.
    fn factorize(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverErrorKind>;

    fn solve(&self, rhs: &DVector<T>) -> Result<DVector<T>, SolverErrorKind>;

    /// The dimension of the analyzed matrix, if any.
    fn dimension(&self) -> Option<usize>;
}

/// Checks the structural requirements shared by all backends.
pub(crate) fn check_square_non_empty<T>(matrix: &CscMatrix<T>) -> Result<(), StructuralError> {
    let (nrows, ncols) = (matrix.nrows(), matrix.ncols());
    if nrows != ncols {
        Err(StructuralError::NotSquare { nrows, ncols })
    } else if nrows == 0 {
        Err(StructuralError::Empty)
    } else {
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings<T> {
    /// Reject solutions with NaN or infinite entries.
    pub check_finite: bool,
    /// When set, `solve` verifies `|A x - b| <= tol * |b|` against the last factorized matrix.
    pub residual_tolerance: Option<T>,
}

impl<T> Default for SolverSettings<T> {
    fn default() -> Self {
        Self {
            check_finite: true,
            residual_tolerance: None,
        }
    }
}

impl<T> SolverSettings<T> {
    pub fn with_check_finite(self, check_finite: bool) -> Self {
        Self { check_finite, ..self }
    }

    pub fn with_residual_tolerance(self, tolerance: T) -> Self {
        Self {
            residual_tolerance: Some(tolerance),
            ..self
        }
    }
}

/// Analyze/factorize/solve state machine over a factorization backend.
#[derive(Debug)]
pub struct LinearSolver<T: Real, B> {
    backend: B,
    status: SolverStatus,
    settings: SolverSettings<T>,
    // Only kept when residuals are verified
    factorized_matrix: Option<CscMatrix<T>>,
}

/// Sparse Cholesky solver for symmetric positive definite systems.
pub type LltSolver<T> = LinearSolver<T, SimplicialLlt<T>>;

/// Dense LU solver for general (small) systems.
pub type LuSolver<T> = LinearSolver<T, DenseLu<T>>;

impl<T, B> Default for LinearSolver<T, B>
where
    T: Real,
    B: SparseFactorization<T> + Default,
{
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<T, B> LinearSolver<T, B>
where
    T: Real,
    B: SparseFactorization<T>,
{
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            status: SolverStatus::Uninitialized,
            settings: SolverSettings::default(),
            factorized_matrix: None,
        }
    }

    pub fn with_settings(self, settings: SolverSettings<T>) -> Self {
        Self { settings, ..self }
    }

    pub fn settings(&self) -> &SolverSettings<T> {
        &self.settings
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn status(&self) -> SolverStatus {
        self.status
    }

    /// The dimension of the analyzed matrix, or `None` unless the solver is in a valid state.
    pub fn dimension(&self) -> Option<usize> {
        match self.status {
            SolverStatus::PatternAnalyzed | SolverStatus::Factorized => self.backend.dimension(),
            SolverStatus::Uninitialized | SolverStatus::Failed => None,
        }
    }

    fn transition(&mut self, status: SolverStatus) {
        debug!("{}: {} -> {}", self.backend.name(), self.status, status);
        self.status = status;
    }

    fn fail(&mut self, kind: impl Into<SolverErrorKind>) -> SolverError {
        let error = SolverError {
            kind: kind.into(),
            status: self.status,
        };
        warn!("{}: {}", self.backend.name(), error);
        self.status = SolverStatus::Failed;
        self.factorized_matrix = None;
        error
    }

    /// Analyzes the sparsity pattern of `matrix`. Its values are ignored.
    ///
    /// Allowed in every state. On success the solver is in [`SolverStatus::PatternAnalyzed`]
    /// and any previous factorization is discarded.
    pub fn analyze_pattern(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverError> {
        self.factorized_matrix = None;
        match self.backend.analyze_pattern(matrix) {
            Ok(()) => {
                self.transition(SolverStatus::PatternAnalyzed);
                Ok(())
            }
            Err(kind) => Err(self.fail(kind)),
        }
    }

    /// Computes the numerical factorization of `matrix`, which must have the analyzed pattern.
    ///
    /// Allowed in [`SolverStatus::PatternAnalyzed`] and [`SolverStatus::Factorized`].
    pub fn factorize(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverError> {
        match self.status {
            SolverStatus::PatternAnalyzed | SolverStatus::Factorized => {}
            SolverStatus::Uninitialized | SolverStatus::Failed => {
                return Err(self.fail(SolverErrorKind::PatternNotAnalyzed));
            }
        }

        match self.backend.factorize(matrix) {
            Ok(()) => {
                self.factorized_matrix = self.settings.residual_tolerance.map(|_| matrix.clone());
                self.transition(SolverStatus::Factorized);
                Ok(())
            }
            Err(kind) => Err(self.fail(kind)),
        }
    }

    /// Solves `A x = rhs` with the current factorization of `A`.
    ///
    /// Allowed only in [`SolverStatus::Factorized`]. A successful solve does not change the
    /// status, so several right-hand sides can be solved with one factorization.
    pub fn solve(&mut self, rhs: &DVector<T>) -> Result<DVector<T>, SolverError> {
        if self.status != SolverStatus::Factorized {
            return Err(self.fail(SolverErrorKind::NotFactorized));
        }

        if let Some(expected) = self.backend.dimension() {
            if rhs.len() != expected {
                return Err(self.fail(SolverErrorKind::DimensionMismatch {
                    expected,
                    actual: rhs.len(),
                }));
            }
        }

        let solution = match self.backend.solve(rhs) {
            Ok(solution) => solution,
            Err(kind) => return Err(self.fail(kind)),
        };

        if self.settings.check_finite && !solution.iter().all(|x_i| x_i.is_finite()) {
            return Err(self.fail(NumericalError::NonFiniteSolution));
        }

        if let (Some(tol), Some(matrix)) = (self.settings.residual_tolerance, &self.factorized_matrix) {
            let relative_residual = relative_residual(matrix, &solution, rhs);
            debug!("{}: relative residual {}", self.backend.name(), relative_residual);
            // NaN residuals must fail as well
            if !(relative_residual <= tol) {
                return Err(self.fail(NumericalError::ResidualTooLarge));
            }
        }

        Ok(solution)
    }

    /// Analyzes the pattern of `matrix` and factorizes it.
    pub fn compute(&mut self, matrix: &CscMatrix<T>) -> Result<(), SolverError> {
        self.analyze_pattern(matrix)?;
        self.factorize(matrix)
    }

    /// Runs all three stages for a single system.
    pub fn solve_system(&mut self, matrix: &CscMatrix<T>, rhs: &DVector<T>) -> Result<DVector<T>, SolverError> {
        self.compute(matrix)?;
        self.solve(rhs)
    }
}

/// `|A x - b| / |b|`, or the absolute residual if `b = 0`.
fn relative_residual<T: Real>(matrix: &CscMatrix<T>, x: &DVector<T>, b: &DVector<T>) -> T {
    let mut r = -b.clone();
    spmm_csc_dense(T::one(), &mut r, T::one(), Op::NoOp(matrix), Op::NoOp(x));
    let b_norm = b.norm();
    if b_norm > T::zero() {
        r.norm() / b_norm
    } else {
        r.norm()
    }
}
