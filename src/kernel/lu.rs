//! Native sparse LU engine.
//!
//! Left-looking (Gilbert-Peierls) LU factorization specialized for the
//! matrices this crate targets: sparse, approximately diagonally
//! significant, with a pattern that stays fixed while values change.
//!
//! Three phases:
//!
//! 1. **Symbolic** — apply the fill-reducing ordering symmetrically and
//!    predict the factor fill. Done once per pattern. The exact factor
//!    patterns are not pinned down here: they depend on the pivot rows the
//!    numeric phase picks, and fixing them in advance would drop any fill a
//!    pivot swap creates.
//! 2. **Numeric** — for each column, a depth-first search through the L
//!    columns built so far (under the current pivot assignment) yields the
//!    column's reach in topological order; the scaled column is scattered
//!    into a dense work vector, earlier columns' contributions are
//!    subtracted along that reach, and a pivot is picked by threshold
//!    partial pivoting among the rows not yet pivotal. The discovered
//!    patterns are stored with the factor values, so a later factorization
//!    of the same structure can redo only the arithmetic, reusing both the
//!    patterns and the pivot sequence.
//! 3. **Solve** — scale and permute the right-hand side, forward solve on
//!    unit-diagonal L, backward solve on U, undo the column permutation.
//!
//! With the default tolerance the diagonal is kept as pivot unless it is
//! vanishingly small relative to the column; a column with no usable pivot
//! at all fails factorization with a singular-pivot error rather than being
//! perturbed.
//!
//! # References
//!
//! - Gilbert, J.R., Peierls, T. "Sparse partial pivoting in time
//!   proportional to arithmetic operations", SIAM J. Sci. Stat. Comput., 1988.
//! - Davis, T.A. "Direct Methods for Sparse Linear Systems", SIAM, 2006,
//!   Chapter 6 (`cs_lu`).
//! - Davis, T.A., Palamadai Natarajan, E. "Algorithm 907: KLU", ACM TOMS, 2010.

use crate::config::{OrderingStrategy, Scaling, SolverConfig};
use crate::error::SolverError;
use crate::kernel::ordering::{minimum_degree, OrderingResult};
use crate::kernel::{LuKernel, NumericFactorization, SymbolicFactorization};
use crate::pattern::SparseMatrixPattern;

/// Marks a row that has not been chosen as a pivot yet.
const UNASSIGNED: usize = usize::MAX;

/// The default elimination engine: pure-Rust left-looking sparse LU.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLu;

impl LuKernel for NativeLu {
    fn analyze(
        &self,
        pattern: &SparseMatrixPattern,
        config: &SolverConfig,
    ) -> Result<SymbolicFactorization, SolverError> {
        let ordering = match config.ordering {
            OrderingStrategy::MinimumDegree => minimum_degree(pattern),
            OrderingStrategy::Natural => OrderingResult::natural(pattern.n()),
        };
        symbolic_analyze(pattern, ordering)
    }

    fn factor(
        &self,
        pattern: &SparseMatrixPattern,
        values: &[f64],
        symbolic: &SymbolicFactorization,
        previous: Option<&NumericFactorization>,
        config: &SolverConfig,
    ) -> Result<NumericFactorization, SolverError> {
        match previous {
            Some(prev) => refactorize(pattern, values, symbolic, prev, config),
            None => factorize_with_pivoting(pattern, values, symbolic, config),
        }
    }

    fn solve(
        &self,
        symbolic: &SymbolicFactorization,
        numeric: &NumericFactorization,
        rhs: &mut [f64],
    ) -> Result<(), SolverError> {
        triangular_solve(symbolic, numeric, rhs)
    }

    fn name(&self) -> &'static str {
        "NativeLU"
    }
}

// ============================================================================
// Symbolic phase
// ============================================================================

/// Bind the ordering to the pattern and predict the factor fill.
///
/// The prediction simulates the elimination column by column assuming
/// diagonal pivots: each column's U pattern is the set of rows `< k`
/// reachable from the column's entries through the simulated L columns, and
/// its L pattern is the rows `> k` encountered along the way.
fn symbolic_analyze(
    pattern: &SparseMatrixPattern,
    ordering: OrderingResult,
) -> Result<SymbolicFactorization, SolverError> {
    let n = pattern.n();
    let row_idx = pattern.row_idx();

    // CSC of the symmetrically permuted matrix, pattern only.
    let mut perm_col_ptr = vec![0usize; n + 1];
    let mut perm_row_idx = Vec::with_capacity(pattern.nnz());
    for new_col in 0..n {
        let old_col = ordering.inv_perm[new_col];
        for idx in pattern.column_range(old_col) {
            let old_row = row_idx[idx] as usize;
            perm_row_idx.push(ordering.perm[old_row]);
        }
        perm_col_ptr[new_col + 1] = perm_row_idx.len();
    }

    let mut l_col_ptr = vec![0usize; n + 1];
    let mut l_row_idx = Vec::new();
    let mut fill = 0usize;

    // visited[r] == k + 1 marks row r as seen while processing column k.
    let mut visited = vec![0usize; n];
    let mut dfs_stack: Vec<usize> = Vec::with_capacity(n);
    let mut lower: Vec<usize> = Vec::with_capacity(n);

    for k in 0..n {
        let stamp = k + 1;
        lower.clear();
        visited[k] = stamp;
        fill += 1; // U diagonal

        for idx in perm_col_ptr[k]..perm_col_ptr[k + 1] {
            let row = perm_row_idx[idx];
            if visited[row] == stamp {
                continue;
            }
            visited[row] = stamp;
            if row > k {
                lower.push(row);
                continue;
            }
            dfs_stack.push(row);
            while let Some(node) = dfs_stack.pop() {
                fill += 1; // U entry above the diagonal
                for l_idx in l_col_ptr[node]..l_col_ptr[node + 1] {
                    let reached = l_row_idx[l_idx];
                    if visited[reached] == stamp {
                        continue;
                    }
                    visited[reached] = stamp;
                    if reached < k {
                        dfs_stack.push(reached);
                    } else {
                        lower.push(reached);
                    }
                }
            }
        }

        fill += lower.len();
        l_row_idx.extend_from_slice(&lower);
        l_col_ptr[k + 1] = l_row_idx.len();
    }

    Ok(SymbolicFactorization {
        n,
        col_perm: ordering.perm,
        col_perm_inv: ordering.inv_perm,
        predicted_fill: fill,
    })
}

// ============================================================================
// Numeric phase
// ============================================================================

/// Row scaling factors in the caller's row space. A structurally empty row
/// scales by 1.0; its pivot will fail on its own.
fn compute_row_scale(
    pattern: &SparseMatrixPattern,
    values: &[f64],
    scaling: Scaling,
) -> Vec<f64> {
    let n = pattern.n();
    let row_idx = pattern.row_idx();
    let mut scale = vec![0.0f64; n];

    if scaling == Scaling::None {
        scale.fill(1.0);
        return scale;
    }

    for j in 0..n {
        for idx in pattern.column_range(j) {
            let row = row_idx[idx] as usize;
            let mag = values[idx].abs();
            match scaling {
                Scaling::Sum => scale[row] += mag,
                Scaling::Max => scale[row] = scale[row].max(mag),
                Scaling::None => unreachable!(),
            }
        }
    }
    for s in scale.iter_mut() {
        *s = if *s > 0.0 { 1.0 / *s } else { 1.0 };
    }
    scale
}

/// Full factorization: discover each column's pattern under the pivot rows
/// chosen so far, then eliminate.
fn factorize_with_pivoting(
    pattern: &SparseMatrixPattern,
    values: &[f64],
    sym: &SymbolicFactorization,
    config: &SolverConfig,
) -> Result<NumericFactorization, SolverError> {
    let n = sym.n;
    let row_idx = pattern.row_idx();
    let row_scale = compute_row_scale(pattern, values, config.scaling);

    let mut l_col_ptr = vec![0usize; n + 1];
    let mut l_row_idx: Vec<usize> = Vec::new();
    let mut l_values: Vec<f64> = Vec::new();
    let mut u_col_ptr = vec![0usize; n + 1];
    let mut u_row_idx: Vec<usize> = Vec::new();
    let mut u_values: Vec<f64> = Vec::new();
    let mut u_diag = vec![0.0f64; n];

    // pinv[r] is the pivot position assigned to permuted row r.
    let mut pinv = vec![UNASSIGNED; n];
    let mut row_perm = vec![0usize; n];

    let mut x = vec![0.0f64; n];
    let mut visited = vec![0usize; n];
    let mut reach = vec![0usize; n];
    let mut node_stack: Vec<usize> = Vec::with_capacity(n);
    let mut child_ptr: Vec<usize> = Vec::with_capacity(n);
    let mut u_col: Vec<(usize, f64)> = Vec::with_capacity(n);

    for k in 0..n {
        let old_col = sym.col_perm_inv[k];
        let stamp = k + 1;

        // Reach of this column: every row it touches directly or through
        // fill, found by DFS through the L columns built so far. The
        // postorder traversal leaves `reach[top..n]` in topological order,
        // so during the update pass each x[j] is final before it is used.
        // Pivotal rows descend into their L column; rows without a pivot
        // assignment are leaves.
        let mut top = n;
        for idx in pattern.column_range(old_col) {
            let seed = sym.col_perm[row_idx[idx] as usize];
            if visited[seed] == stamp {
                continue;
            }
            visited[seed] = stamp;
            node_stack.push(seed);
            child_ptr.push(if pinv[seed] == UNASSIGNED {
                0
            } else {
                l_col_ptr[pinv[seed]]
            });
            while let Some(&node) = node_stack.last() {
                let child_end = if pinv[node] == UNASSIGNED {
                    0
                } else {
                    l_col_ptr[pinv[node] + 1]
                };
                let depth = child_ptr.len() - 1;
                let cp = child_ptr[depth];
                if cp < child_end {
                    child_ptr[depth] = cp + 1;
                    let child = l_row_idx[cp];
                    if visited[child] != stamp {
                        visited[child] = stamp;
                        node_stack.push(child);
                        child_ptr.push(if pinv[child] == UNASSIGNED {
                            0
                        } else {
                            l_col_ptr[pinv[child]]
                        });
                    }
                } else {
                    node_stack.pop();
                    child_ptr.pop();
                    top -= 1;
                    reach[top] = node;
                }
            }
        }

        // Scatter the scaled column. Duplicate entries sum, matching how
        // MNA stamps accumulate.
        for idx in pattern.column_range(old_col) {
            let old_row = row_idx[idx] as usize;
            x[sym.col_perm[old_row]] += values[idx] * row_scale[old_row];
        }

        // Sparse triangular update x = L \ x along the reach.
        for p in top..n {
            let j = reach[p];
            if pinv[j] == UNASSIGNED {
                continue;
            }
            let x_j = x[j];
            if x_j != 0.0 {
                for l_idx in l_col_ptr[pinv[j]]..l_col_ptr[pinv[j] + 1] {
                    x[l_row_idx[l_idx]] -= l_values[l_idx] * x_j;
                }
            }
        }

        // Threshold partial pivoting among the rows not yet pivotal. The
        // diagonal row is kept whenever it clears the relative threshold,
        // which preserves sparsity on diagonally significant matrices.
        let mut ipiv = UNASSIGNED;
        let mut max_abs = 0.0f64;
        for p in top..n {
            let i = reach[p];
            if pinv[i] != UNASSIGNED {
                continue;
            }
            let mag = x[i].abs();
            if mag > max_abs {
                max_abs = mag;
                ipiv = i;
            }
        }
        if ipiv == UNASSIGNED || max_abs <= config.pivot_abs_tol {
            return Err(SolverError::SingularPivot { column: old_col });
        }
        if pinv[k] == UNASSIGNED
            && visited[k] == stamp
            && x[k].abs() >= config.pivot_tol * max_abs
        {
            ipiv = k;
        }
        let pivot = x[ipiv];
        if pivot.abs() <= config.pivot_abs_tol {
            return Err(SolverError::SingularPivot { column: old_col });
        }

        // Emit U: the already-pivotal reach rows, ascending by pivot
        // position, with the diagonal last.
        u_col.clear();
        for p in top..n {
            let i = reach[p];
            if pinv[i] != UNASSIGNED {
                u_col.push((pinv[i], x[i]));
            }
        }
        u_col.sort_unstable_by_key(|&(pos, _)| pos);
        for &(pos, val) in &u_col {
            u_row_idx.push(pos);
            u_values.push(val);
        }
        u_row_idx.push(k);
        u_values.push(pivot);
        u_diag[k] = pivot;
        u_col_ptr[k + 1] = u_row_idx.len();

        // Emit L, normalized by the pivot. Row indices stay in permuted
        // row space until every pivot is known; clear the work vector on
        // the way out.
        for p in top..n {
            let i = reach[p];
            if pinv[i] == UNASSIGNED && i != ipiv {
                l_row_idx.push(i);
                l_values.push(x[i] / pivot);
            }
            x[i] = 0.0;
        }
        l_col_ptr[k + 1] = l_row_idx.len();

        pinv[ipiv] = k;
        row_perm[k] = ipiv;
    }

    // Remap L's row indices into pivot positions; every row is pivotal by
    // now, and each L entry's row was pivoted after its column.
    for r in l_row_idx.iter_mut() {
        *r = pinv[*r];
    }

    let rcond = diag_rcond(n, &u_diag);
    Ok(NumericFactorization {
        l_col_ptr,
        l_row_idx,
        l_values,
        u_col_ptr,
        u_row_idx,
        u_values,
        u_diag,
        rcond,
        row_perm,
        row_perm_inv: pinv,
        row_scale,
        values: values.to_vec(),
    })
}

/// Refactorization: same structure, new values. Reuses the factor patterns
/// and pivot sequence of the previous factorization and redoes only the
/// arithmetic.
fn refactorize(
    pattern: &SparseMatrixPattern,
    values: &[f64],
    sym: &SymbolicFactorization,
    prev: &NumericFactorization,
    config: &SolverConfig,
) -> Result<NumericFactorization, SolverError> {
    let n = sym.n;
    let row_idx = pattern.row_idx();
    let row_scale = compute_row_scale(pattern, values, config.scaling);

    let l_col_ptr = prev.l_col_ptr.clone();
    let l_row_idx = prev.l_row_idx.clone();
    let u_col_ptr = prev.u_col_ptr.clone();
    let u_row_idx = prev.u_row_idx.clone();
    let row_perm = prev.row_perm.clone();
    let row_perm_inv = prev.row_perm_inv.clone();

    let mut l_values = vec![0.0f64; l_row_idx.len()];
    let mut u_values = vec![0.0f64; u_row_idx.len()];
    let mut u_diag = vec![0.0f64; n];

    let mut x = vec![0.0f64; n];

    for k in 0..n {
        let old_col = sym.col_perm_inv[k];

        // Every scatter position lies inside this column's stored pattern:
        // the pattern was discovered under the same pivot assignment.
        for idx in pattern.column_range(old_col) {
            let old_row = row_idx[idx] as usize;
            x[row_perm_inv[sym.col_perm[old_row]]] += values[idx] * row_scale[old_row];
        }

        // Left-looking update in ascending pattern order, extracting each
        // U entry once it is final.
        let u_start = u_col_ptr[k];
        let u_end = u_col_ptr[k + 1] - 1; // diagonal excluded
        for u_idx in u_start..u_end {
            let j = u_row_idx[u_idx];
            let x_j = x[j];
            u_values[u_idx] = x_j;
            if x_j != 0.0 {
                for l_idx in l_col_ptr[j]..l_col_ptr[j + 1] {
                    x[l_row_idx[l_idx]] -= l_values[l_idx] * x_j;
                }
            }
        }

        let diag = x[k];
        if diag.abs() <= config.pivot_abs_tol {
            return Err(SolverError::SingularPivot { column: old_col });
        }
        u_values[u_end] = diag;
        u_diag[k] = diag;

        let l_start = l_col_ptr[k];
        let l_end = l_col_ptr[k + 1];
        for l_idx in l_start..l_end {
            l_values[l_idx] = x[l_row_idx[l_idx]] / diag;
        }

        // Clear only the pattern positions this column touched.
        for u_idx in u_start..u_end {
            x[u_row_idx[u_idx]] = 0.0;
        }
        for l_idx in l_start..l_end {
            x[l_row_idx[l_idx]] = 0.0;
        }
        x[k] = 0.0;
    }

    let rcond = diag_rcond(n, &u_diag);
    Ok(NumericFactorization {
        l_col_ptr,
        l_row_idx,
        l_values,
        u_col_ptr,
        u_row_idx,
        u_values,
        u_diag,
        rcond,
        row_perm,
        row_perm_inv,
        row_scale,
        values: values.to_vec(),
    })
}

/// Reciprocal condition estimate from the pivot magnitudes.
fn diag_rcond(n: usize, u_diag: &[f64]) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let mut min_d = f64::MAX;
    let mut max_d = 0.0f64;
    for &d in u_diag {
        let mag = d.abs();
        min_d = min_d.min(mag);
        max_d = max_d.max(mag);
    }
    if max_d > 0.0 {
        min_d / max_d
    } else {
        0.0
    }
}

// ============================================================================
// Solve phase
// ============================================================================

/// Solve `A x = rhs` in place using the computed factors.
///
/// The factorization satisfies `L U = P_r P_c (R A) P_c^T`, where `R` is
/// the row scaling, `P_c` the fill-reducing permutation and `P_r` the
/// pivot permutation. The right-hand side is scaled and pushed through the
/// same permutations, the two triangular systems are solved, and the
/// column permutation is undone to land back in the caller's index space.
fn triangular_solve(
    sym: &SymbolicFactorization,
    num: &NumericFactorization,
    rhs: &mut [f64],
) -> Result<(), SolverError> {
    let n = sym.n;
    if n == 0 {
        return Ok(());
    }

    let mut temp = vec![0.0f64; n];
    for i in 0..n {
        let pos = num.row_perm_inv[sym.col_perm[i]];
        temp[pos] = rhs[i] * num.row_scale[i];
    }

    // Forward: L z = temp, unit diagonal, column-oriented scatter.
    for k in 0..n {
        let z_k = temp[k];
        if z_k != 0.0 {
            for l_idx in num.l_col_ptr[k]..num.l_col_ptr[k + 1] {
                temp[num.l_row_idx[l_idx]] -= num.l_values[l_idx] * z_k;
            }
        }
    }

    // Backward: U x = z, diagonal stored last in each column.
    for k in (0..n).rev() {
        let diag = num.u_diag[k];
        if diag == 0.0 {
            return Err(SolverError::Solve);
        }
        temp[k] /= diag;
        let x_k = temp[k];
        if x_k != 0.0 {
            let u_start = num.u_col_ptr[k];
            let u_end = num.u_col_ptr[k + 1] - 1;
            for u_idx in u_start..u_end {
                temp[num.u_row_idx[u_idx]] -= num.u_values[u_idx] * x_k;
            }
        }
    }

    for i in 0..n {
        rhs[i] = temp[sym.col_perm[i]];
    }

    Ok(())
}
