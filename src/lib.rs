//! Sparse direct linear solver for circuit simulation matrices.
//!
//! Repeatedly solves `Ax = b` for the Newton-Raphson / Modified Nodal
//! Analysis matrices of a circuit simulator. Those matrices have one
//! defining property this crate is built around: across Newton iterations
//! the sparsity pattern is fixed by the circuit topology while only the
//! numeric values change. Structural analysis (ordering, factor patterns)
//! therefore runs once, and every iteration pays only for a numeric
//! refactorization and a pair of triangular solves.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`solver`] | [`SparseDirectSolver`] state machine, [`SolveOutcome`], [`SolverStatistics`] |
//! | [`pattern`] | validated CSC [`SparseMatrixPattern`] |
//! | [`kernel`] | [`LuKernel`] call contract and the [`NativeLu`] engine |
//! | [`config`] | [`SolverConfig`] numerical policy |
//! | [`error`] | [`SolverError`] taxonomy |
//!
//! # Usage
//!
//! ```
//! use sparse_direct::SparseDirectSolver;
//!
//! let mut solver = SparseDirectSolver::new();
//!
//! // 3x3 diagonal pattern in CSC form, analyzed once.
//! solver.analyze_structure(3, &[0, 1, 2, 3], &[0, 1, 2]).unwrap();
//!
//! // Factorize and solve; repeat per Newton iteration with new values.
//! solver.factorize_matrix(&[2.0, 2.0, 2.0]).unwrap();
//! let outcome = solver.solve_system(&[2.0, 4.0, 6.0]);
//! assert!(outcome.success);
//! assert!((outcome.solution[1] - 2.0).abs() < 1e-12);
//! ```
//!
//! Failures are communicated through [`Result`]s and the
//! [`SolveOutcome`] fields; nothing panics across the crate boundary. A
//! large post-solve residual is a warning on a successful outcome rather
//! than a failure, so an outer Newton loop can react with damping instead
//! of aborting.

pub mod config;
pub mod error;
pub mod kernel;
pub mod pattern;
pub mod solver;

pub use config::{OrderingStrategy, Scaling, SolverConfig};
pub use error::SolverError;
pub use kernel::{LuKernel, NativeLu, NumericFactorization, SymbolicFactorization};
pub use pattern::SparseMatrixPattern;
pub use solver::{SolveOutcome, SolverState, SolverStatistics, SparseDirectSolver};
