//! Solver configuration.
//!
//! Numerical policy (pivot tolerance, scaling, ordering) is configuration
//! rather than hard-coded constants, so the same solver can be tuned for
//! different matrix classes. The defaults are the application tuning for
//! circuit MNA matrices: a very small pivot threshold keeps diagonal pivots
//! (circuit matrices are approximately diagonally significant, and sticking
//! to the diagonal preserves sparsity), and sum scaling equalizes row norms
//! that span many orders of magnitude between conductance and source rows.

/// Fill-reducing ordering strategy used during structural analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingStrategy {
    /// Minimum-degree ordering on the symmetrized pattern. Good default for
    /// circuit matrices.
    #[default]
    MinimumDegree,
    /// Natural ordering (no permutation). Useful for matrices that are
    /// already nearly triangular, and for debugging.
    Natural,
}

/// Row scaling applied before numeric factorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scaling {
    /// No scaling.
    None,
    /// Divide each row by the sum of its absolute values.
    #[default]
    Sum,
    /// Divide each row by its largest absolute value.
    Max,
}

/// Configuration for a [`SparseDirectSolver`](crate::SparseDirectSolver).
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Threshold for partial pivoting: during column factorization the
    /// diagonal is kept as pivot unless `|diag| < pivot_tol * max|column|`.
    /// Range (0, 1]. Small values favor sparsity, large values stability.
    pub pivot_tol: f64,
    /// Absolute magnitude below which a pivot is treated as singular and
    /// factorization fails.
    pub pivot_abs_tol: f64,
    /// Fill-reducing ordering strategy.
    pub ordering: OrderingStrategy,
    /// Row scaling policy.
    pub scaling: Scaling,
    /// Relative residual norm above which a successful solve raises a
    /// stability warning (never a failure).
    pub residual_tol: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            pivot_tol: 1e-12,
            pivot_abs_tol: 1e-30,
            ordering: OrderingStrategy::default(),
            scaling: Scaling::default(),
            residual_tol: 1e-10,
        }
    }
}

impl SolverConfig {
    /// Set the pivot threshold, clamped to (0, 1].
    pub fn set_pivot_tolerance(&mut self, tol: f64) {
        self.pivot_tol = tol.clamp(1e-15, 1.0);
    }
}
