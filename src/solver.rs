//! Sparse direct solver with analyze / factorize / solve lifecycle.
//!
//! [`SparseDirectSolver`] is built for the inner loop of a Newton-Raphson
//! circuit simulation: the matrix pattern is fixed by the circuit topology,
//! so structural analysis runs once, and each Newton iteration only pays
//! for a numeric refactorization and a pair of triangular solves.
//!
//! The solver is a strict state machine:
//!
//! ```text
//! Empty --analyze_structure--> Analyzed --factorize_matrix--> Factorized
//!   ^                             ^   |                          |
//!   |                             |   +--(factor failure)--------+
//!   +------- cleanup -------------+------ solve_system (repeatable)
//! ```
//!
//! Calling a stage out of order is a precondition failure that leaves the
//! state untouched, so stale results are never returned. All public calls
//! are synchronous and run to completion; an instance is not meant for
//! concurrent use — callers needing parallel solves should use one
//! instance per thread.

use std::time::Instant;

use serde::Serialize;

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::kernel::{LuKernel, NativeLu, NumericFactorization, SymbolicFactorization};
use crate::pattern::SparseMatrixPattern;

/// Lifecycle state of the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverState {
    /// No valid structural analysis.
    Empty,
    /// Pattern analyzed; numeric factorization pending or invalidated.
    Analyzed,
    /// Factors ready; solves are legal.
    Factorized,
}

/// Result of one `solve_system` call. Created fresh per call.
#[derive(Debug, Clone, Serialize)]
pub struct SolveOutcome {
    /// Whether the solve produced a usable solution.
    pub success: bool,
    /// Solution vector of length `n` on success; empty on failure.
    pub solution: Vec<f64>,
    /// Failure description; `None` on success.
    pub error_message: Option<String>,
    /// Cheap condition number estimate from the factorization. A stability
    /// signal, not an exact value.
    pub condition_estimate: f64,
    /// Duration of the factorization backing this solve, in milliseconds.
    pub factor_time_ms: f64,
    /// Duration of this solve, in milliseconds.
    pub solve_time_ms: f64,
    /// Relative residual `max|Ax - b| / max(max|b|, 1)`.
    pub residual_norm: f64,
    /// Set when the residual exceeded the configured tolerance. The solve
    /// still counts as a success: in a Newton loop a noisy-but-usable
    /// solve should not abort the outer iteration.
    pub stability_warning: bool,
    /// Always 1 for a direct method; kept for interface symmetry with
    /// iterative solvers. 0 on failure.
    pub iterations: u32,
}

impl SolveOutcome {
    fn failure(message: impl Into<String>, factor_time_ms: f64) -> Self {
        Self {
            success: false,
            solution: Vec::new(),
            error_message: Some(message.into()),
            condition_estimate: 0.0,
            factor_time_ms,
            solve_time_ms: 0.0,
            residual_norm: 0.0,
            stability_warning: false,
            iterations: 0,
        }
    }
}

/// Solver statistics, recomputed on demand.
#[derive(Debug, Clone, Serialize)]
pub struct SolverStatistics {
    /// Matrix rows (equal to `cols`; the solver only handles square systems).
    pub rows: usize,
    pub cols: usize,
    /// Structural nonzeros of the analyzed pattern.
    pub nnz: usize,
    /// `nnz(L + U) / nnz(A)`: the actual factor fill once a factorization
    /// exists, the symbolic prediction after analysis alone, 0.0 before.
    pub fill_factor: f64,
    /// Structural symmetry of the analyzed pattern. This is a pattern
    /// property only; value symmetry is not tracked.
    pub is_symmetric: bool,
    /// Condition estimate from the current factorization; 0.0 when no
    /// numeric factorization exists.
    pub condition_estimate: f64,
    /// Full factorizations performed since construction or cleanup.
    pub factor_count: usize,
    /// Refactorizations that reused a previous pivot sequence.
    pub refactor_count: usize,
}

/// Sparse direct solver for repeated `Ax = b` with a fixed pattern.
///
/// Generic over the elimination engine; defaults to the built-in
/// [`NativeLu`]. The symbolic and numeric artifacts are exclusively owned
/// by the instance and every superseding transition releases the old
/// artifact before the replacement is stored.
pub struct SparseDirectSolver<K: LuKernel = NativeLu> {
    kernel: K,
    config: SolverConfig,
    state: SolverState,
    pattern: Option<SparseMatrixPattern>,
    symbolic: Option<SymbolicFactorization>,
    numeric: Option<NumericFactorization>,
    last_analyze_ms: f64,
    last_factor_ms: f64,
    last_solve_ms: f64,
    factor_count: usize,
    refactor_count: usize,
}

impl SparseDirectSolver<NativeLu> {
    /// Create a solver with the default engine and configuration.
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Create a solver with the default engine and a custom configuration.
    pub fn with_config(config: SolverConfig) -> Self {
        Self::with_kernel(NativeLu, config)
    }
}

impl Default for SparseDirectSolver<NativeLu> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: LuKernel> SparseDirectSolver<K> {
    /// Create a solver around a specific elimination engine.
    pub fn with_kernel(kernel: K, config: SolverConfig) -> Self {
        Self {
            kernel,
            config,
            state: SolverState::Empty,
            pattern: None,
            symbolic: None,
            numeric: None,
            last_analyze_ms: 0.0,
            last_factor_ms: 0.0,
            last_solve_ms: 0.0,
            factor_count: 0,
            refactor_count: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Active configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Analyze the sparsity structure of an `n`-by-`n` CSC matrix.
    ///
    /// Valid from any state. Any existing numeric and symbolic artifacts
    /// are released first — a structural change invalidates everything
    /// downstream. On success the solver is `Analyzed`; on failure it is
    /// `Empty`.
    pub fn analyze_structure(
        &mut self,
        n: usize,
        col_ptr: &[i64],
        row_idx: &[i64],
    ) -> Result<(), SolverError> {
        // Numeric first, then symbolic: release in dependency order.
        self.numeric = None;
        self.symbolic = None;
        self.pattern = None;
        self.state = SolverState::Empty;

        let pattern = SparseMatrixPattern::new(n, col_ptr, row_idx)?;

        let start = Instant::now();
        let symbolic = self.kernel.analyze(&pattern, &self.config)?;
        self.last_analyze_ms = start.elapsed().as_secs_f64() * 1e3;

        log::debug!(
            "analysis complete: n={}, nnz={}, predicted fill {} ({:.2}x), {:.3} ms",
            pattern.n(),
            pattern.nnz(),
            symbolic.predicted_fill(),
            if pattern.nnz() > 0 {
                symbolic.predicted_fill() as f64 / pattern.nnz() as f64
            } else {
                0.0
            },
            self.last_analyze_ms,
        );

        self.pattern = Some(pattern);
        self.symbolic = Some(symbolic);
        self.state = SolverState::Analyzed;
        Ok(())
    }

    /// Factorize the matrix whose values align positionally with the
    /// analyzed pattern.
    ///
    /// Valid from `Analyzed` or `Factorized`. A repeated call with the
    /// same pattern reuses the previous pivot sequence (the cheap
    /// refactorization path that makes Newton iteration affordable). On a
    /// numeric failure the solver falls back to `Analyzed`: the ordering
    /// is still valid and a retry with corrected values is legal.
    pub fn factorize_matrix(&mut self, values: &[f64]) -> Result<(), SolverError> {
        let (Some(pattern), Some(symbolic)) = (self.pattern.as_ref(), self.symbolic.as_ref())
        else {
            return Err(SolverError::Precondition {
                reason: "structure not analyzed; call analyze_structure first".to_string(),
            });
        };

        // The wrapped elimination routine does not defend against a length
        // mismatch, so it must be rejected here.
        if values.len() != pattern.nnz() {
            return Err(SolverError::Precondition {
                reason: format!(
                    "value count {} != pattern nonzero count {}",
                    values.len(),
                    pattern.nnz()
                ),
            });
        }

        // Take the superseded factorization out of the instance before the
        // replacement is built; it only survives the call as pivot input.
        let previous = self.numeric.take();
        self.state = SolverState::Analyzed;

        let start = Instant::now();
        let result = self
            .kernel
            .factor(pattern, values, symbolic, previous.as_ref(), &self.config);
        self.last_factor_ms = start.elapsed().as_secs_f64() * 1e3;

        let numeric = result?;

        if previous.is_some() {
            self.refactor_count += 1;
        } else {
            self.factor_count += 1;
        }
        log::debug!(
            "factorization complete: rcond={:.3e}, {:.3} ms",
            numeric.rcond,
            self.last_factor_ms,
        );

        self.numeric = Some(numeric);
        self.state = SolverState::Factorized;
        Ok(())
    }

    /// Solve `A x = rhs` using the current factorization.
    ///
    /// Valid only in `Factorized`; never mutates the caller's `rhs` or the
    /// solver state. A residual above the configured tolerance is reported
    /// as a stability warning on an otherwise successful outcome.
    pub fn solve_system(&mut self, rhs: &[f64]) -> SolveOutcome {
        let (Some(pattern), Some(symbolic), Some(numeric)) = (
            self.pattern.as_ref(),
            self.symbolic.as_ref(),
            self.numeric.as_ref(),
        ) else {
            return SolveOutcome::failure(
                "not factorized; call factorize_matrix first",
                self.last_factor_ms,
            );
        };
        if self.state != SolverState::Factorized {
            return SolveOutcome::failure(
                "not factorized; call factorize_matrix first",
                self.last_factor_ms,
            );
        }

        if rhs.len() != pattern.n() {
            return SolveOutcome::failure(
                format!(
                    "dimension mismatch: rhs length {} != matrix order {}",
                    rhs.len(),
                    pattern.n()
                ),
                self.last_factor_ms,
            );
        }

        let mut solution = rhs.to_vec();
        let start = Instant::now();
        if self.kernel.solve(symbolic, numeric, &mut solution).is_err() {
            return SolveOutcome::failure(
                "solve failed, possibly singular matrix",
                self.last_factor_ms,
            );
        }
        self.last_solve_ms = start.elapsed().as_secs_f64() * 1e3;

        let residual_norm = relative_residual(pattern, numeric.values(), &solution, rhs);
        let stability_warning = residual_norm > self.config.residual_tol;
        if stability_warning {
            log::warn!(
                "large solve residual {:.3e} (tolerance {:.1e}); solution may be inaccurate",
                residual_norm,
                self.config.residual_tol,
            );
        }

        SolveOutcome {
            success: true,
            solution,
            error_message: None,
            condition_estimate: numeric.condition_estimate(),
            factor_time_ms: self.last_factor_ms,
            solve_time_ms: self.last_solve_ms,
            residual_norm,
            stability_warning,
            iterations: 1,
        }
    }

    /// Current statistics, recomputed from whatever artifacts exist.
    pub fn statistics(&self) -> SolverStatistics {
        let n = self.pattern.as_ref().map_or(0, SparseMatrixPattern::n);
        let nnz = self.pattern.as_ref().map_or(0, SparseMatrixPattern::nnz);
        // Actual factor fill once a factorization exists; the symbolic
        // prediction before that.
        let fill_factor = match (&self.numeric, &self.symbolic, nnz) {
            (Some(num), _, nnz) if nnz > 0 => num.factor_nnz() as f64 / nnz as f64,
            (None, Some(sym), nnz) if nnz > 0 => sym.predicted_fill() as f64 / nnz as f64,
            _ => 0.0,
        };
        SolverStatistics {
            rows: n,
            cols: n,
            nnz,
            fill_factor,
            is_symmetric: self
                .pattern
                .as_ref()
                .is_some_and(SparseMatrixPattern::is_structurally_symmetric),
            condition_estimate: self
                .numeric
                .as_ref()
                .map_or(0.0, NumericFactorization::condition_estimate),
            factor_count: self.factor_count,
            refactor_count: self.refactor_count,
        }
    }

    /// Duration of the last successful structural analysis, in ms.
    pub fn last_analyze_ms(&self) -> f64 {
        self.last_analyze_ms
    }

    /// Duration of the last factorization attempt, in ms.
    pub fn last_factor_ms(&self) -> f64 {
        self.last_factor_ms
    }

    /// Duration of the last successful solve, in ms.
    pub fn last_solve_ms(&self) -> f64 {
        self.last_solve_ms
    }

    /// Release all artifacts and return to `Empty`. Idempotent.
    pub fn cleanup(&mut self) {
        self.numeric = None;
        self.symbolic = None;
        self.pattern = None;
        self.state = SolverState::Empty;
        self.last_analyze_ms = 0.0;
        self.last_factor_ms = 0.0;
        self.last_solve_ms = 0.0;
        self.factor_count = 0;
        self.refactor_count = 0;
    }
}

/// Relative residual `max|Ax - b| / max(max|b|, 1)` formed from the stored
/// pattern and the values held inside the numeric factorization.
fn relative_residual(
    pattern: &SparseMatrixPattern,
    values: &[f64],
    x: &[f64],
    b: &[f64],
) -> f64 {
    let n = pattern.n();
    let row_idx = pattern.row_idx();

    let mut ax = vec![0.0f64; n];
    for j in 0..n {
        let x_j = x[j];
        if x_j != 0.0 {
            for idx in pattern.column_range(j) {
                ax[row_idx[idx] as usize] += values[idx] * x_j;
            }
        }
    }

    let mut residual = 0.0f64;
    let mut b_norm = 0.0f64;
    for i in 0..n {
        residual = residual.max((ax[i] - b[i]).abs());
        b_norm = b_norm.max(b[i].abs());
    }
    residual / b_norm.max(1.0)
}
