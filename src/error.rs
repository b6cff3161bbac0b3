//! Error types for the sparse direct solver.
//!
//! The error taxonomy mirrors the stages of the pipeline: structural errors
//! come out of analysis, numeric errors out of factorization, and
//! precondition errors are raised before anything is delegated to the
//! factorization kernel. A large post-solve residual is deliberately *not*
//! an error; it is reported through [`SolveOutcome`](crate::SolveOutcome)
//! as a stability warning so an outer Newton loop can retry with damping
//! instead of aborting.

use thiserror::Error;

/// Error type for all solver operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// The sparsity pattern is invalid or degenerate (inconsistent column
    /// pointers, out-of-range row indices). Analysis fails and the solver
    /// falls back to the `Empty` state.
    #[error("invalid sparsity pattern: {reason}")]
    Structural { reason: String },

    /// Numeric factorization found no usable pivot in a column. The column
    /// index refers to the caller's (unpermuted) matrix. The symbolic
    /// analysis is still valid; the caller may retry with different values.
    #[error("singular matrix: no usable pivot in column {column}")]
    SingularPivot { column: usize },

    /// The triangular solve failed on the computed factors.
    #[error("solve failed, possibly singular matrix")]
    Solve,

    /// A stage was called out of order, or an input had the wrong length.
    /// Detected before delegating to the kernel; the solver state is left
    /// unchanged.
    #[error("precondition violated: {reason}")]
    Precondition { reason: String },
}
