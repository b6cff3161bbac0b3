//! Factorization kernel: the narrow call contract to the elimination engine.
//!
//! The solver orchestrates *when* analysis, factorization and solves happen
//! and owns their artifacts; the kernel decides *how* elimination is done
//! (ordering, pivoting, scaling). The contract is deliberately small so a
//! different engine — an FFI binding to a C library, say — can be slotted
//! in behind the same solver without touching the state machine:
//!
//! - `analyze` turns a validated pattern into a [`SymbolicFactorization`]
//!   or a definitive error, never a partial artifact;
//! - `factor` turns values aligned with that pattern into a
//!   [`NumericFactorization`], optionally reusing the pivot sequence of a
//!   previous factorization of the same pattern;
//! - `solve` overwrites a right-hand side with the solution.
//!
//! The default engine is [`NativeLu`].

mod lu;
mod ordering;

pub use lu::NativeLu;

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::pattern::SparseMatrixPattern;

/// Opaque result of structural analysis, bound to one sparsity pattern.
///
/// Holds the fill-reducing column permutation and a fill prediction.
/// The exact factor patterns are not fixed here: they depend on the pivot
/// rows chosen during the numeric phase, so they live in
/// [`NumericFactorization`]. Invalidated (dropped by the owning solver)
/// whenever a new analysis is requested.
#[derive(Debug, Clone)]
pub struct SymbolicFactorization {
    /// Matrix order.
    pub(crate) n: usize,
    /// Fill-reducing permutation: new index = `col_perm[old index]`.
    /// Applied symmetrically to rows and columns.
    pub(crate) col_perm: Vec<usize>,
    /// Inverse permutation: old index = `col_perm_inv[new index]`.
    pub(crate) col_perm_inv: Vec<usize>,
    /// Predicted nonzero count of L + U under diagonal pivoting.
    pub(crate) predicted_fill: usize,
}

impl SymbolicFactorization {
    /// Predicted nonzero count of L + U (L excludes its unit diagonal,
    /// U includes its diagonal), assuming diagonal pivoting. Off-diagonal
    /// pivots during the numeric phase can push the actual count higher.
    pub fn predicted_fill(&self) -> usize {
        self.predicted_fill
    }
}

/// Opaque result of numeric factorization, bound to one symbolic
/// factorization and one set of values.
///
/// Holds the L and U factors (patterns and values), the pivot row
/// permutation, the row scaling factors, and a copy of the input values
/// (used for the post-solve residual check). The factor patterns are
/// discovered here rather than in the symbolic phase because they depend
/// on the pivot rows actually chosen; a refactorization with unchanged
/// structure reuses them together with the pivot sequence. Invalidated
/// whenever re-factorization, re-analysis or cleanup occurs.
#[derive(Debug, Clone)]
pub struct NumericFactorization {
    /// L pattern in CSC over pivot positions, strictly below the diagonal.
    /// L is unit lower triangular; the diagonal is implicit.
    pub(crate) l_col_ptr: Vec<usize>,
    pub(crate) l_row_idx: Vec<usize>,
    pub(crate) l_values: Vec<f64>,
    /// U pattern in CSC over pivot positions; each column stores its
    /// above-diagonal rows in ascending order with the diagonal last.
    pub(crate) u_col_ptr: Vec<usize>,
    pub(crate) u_row_idx: Vec<usize>,
    pub(crate) u_values: Vec<f64>,
    /// Diagonal of U, extracted for the triangular solve and the
    /// condition estimate.
    pub(crate) u_diag: Vec<f64>,
    /// Pivot row permutation: `row_perm[k]` is the permuted-space row
    /// chosen as pivot k; `row_perm_inv` maps the other way.
    pub(crate) row_perm: Vec<usize>,
    pub(crate) row_perm_inv: Vec<usize>,
    /// Row scaling factors in the caller's (unpermuted) row space.
    pub(crate) row_scale: Vec<f64>,
    /// Copy of the factorized values, positionally aligned with the
    /// pattern. Kept so the solver can form `A * x` for the residual.
    pub(crate) values: Vec<f64>,
    /// Reciprocal condition estimate `min|diag(U)| / max|diag(U)|`.
    pub(crate) rcond: f64,
}

impl NumericFactorization {
    /// Cheap condition number estimate (reciprocal of `rcond`). A stability
    /// signal, not an exact value: it only looks at the spread of the
    /// pivot magnitudes.
    pub fn condition_estimate(&self) -> f64 {
        if self.rcond > 0.0 {
            1.0 / self.rcond
        } else {
            f64::INFINITY
        }
    }

    /// Values the factorization was computed from.
    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }

    /// Actual nonzero count of L + U.
    pub(crate) fn factor_nnz(&self) -> usize {
        self.l_row_idx.len() + self.u_row_idx.len()
    }
}

/// Call contract for the elimination engine.
pub trait LuKernel {
    /// Structural analysis: compute an elimination ordering and a fill
    /// prediction for `pattern`.
    fn analyze(
        &self,
        pattern: &SparseMatrixPattern,
        config: &SolverConfig,
    ) -> Result<SymbolicFactorization, SolverError>;

    /// Numeric factorization of `values` (positionally aligned with
    /// `pattern`) using a prior analysis. When `previous` is given and was
    /// produced for the same pattern, the engine may reuse its factor
    /// patterns and pivot sequence instead of pivoting afresh.
    fn factor(
        &self,
        pattern: &SparseMatrixPattern,
        values: &[f64],
        symbolic: &SymbolicFactorization,
        previous: Option<&NumericFactorization>,
        config: &SolverConfig,
    ) -> Result<NumericFactorization, SolverError>;

    /// Triangular solve: overwrite `rhs` (length `n`) with the solution of
    /// `A x = rhs`.
    fn solve(
        &self,
        symbolic: &SymbolicFactorization,
        numeric: &NumericFactorization,
        rhs: &mut [f64],
    ) -> Result<(), SolverError>;

    /// Engine name for diagnostics.
    fn name(&self) -> &'static str;
}
