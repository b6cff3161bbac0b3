//! Compressed Sparse Column (CSC) matrix pattern.
//!
//! The pattern is the structural half of the matrix: which entries are
//! nonzero, independent of their values. It is validated and copied into
//! the solver at analysis time, because the numeric stage must reuse the
//! exact same pattern later — the value array passed to
//! `factorize_matrix` is aligned positionally with this pattern.

use crate::error::SolverError;

/// Validated, owned CSC sparsity pattern of a square matrix.
///
/// Column `j`'s entries occupy `row_idx[col_ptr[j] .. col_ptr[j + 1]]`.
/// Row indices need not be sorted within a column; duplicates are allowed
/// and are summed by the numeric stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseMatrixPattern {
    n: usize,
    col_ptr: Vec<i64>,
    row_idx: Vec<i64>,
}

impl SparseMatrixPattern {
    /// Validate and copy a CSC pattern.
    ///
    /// Invariants checked:
    /// - `col_ptr.len() == n + 1` and `col_ptr[0] == 0`
    /// - `col_ptr` is non-decreasing
    /// - `row_idx.len() == col_ptr[n]`
    /// - every row index lies in `[0, n)`
    pub fn new(n: usize, col_ptr: &[i64], row_idx: &[i64]) -> Result<Self, SolverError> {
        if col_ptr.len() != n + 1 {
            return Err(SolverError::Structural {
                reason: format!(
                    "column pointer length {} != expected {}",
                    col_ptr.len(),
                    n + 1
                ),
            });
        }
        if col_ptr[0] != 0 {
            return Err(SolverError::Structural {
                reason: format!("column pointers must start at 0, got {}", col_ptr[0]),
            });
        }
        for j in 0..n {
            if col_ptr[j + 1] < col_ptr[j] {
                return Err(SolverError::Structural {
                    reason: format!(
                        "column pointers decrease at column {}: {} -> {}",
                        j,
                        col_ptr[j],
                        col_ptr[j + 1]
                    ),
                });
            }
        }
        let nnz = col_ptr[n];
        if nnz < 0 || row_idx.len() != nnz as usize {
            return Err(SolverError::Structural {
                reason: format!(
                    "row index length {} != column pointer total {}",
                    row_idx.len(),
                    nnz
                ),
            });
        }
        for (idx, &row) in row_idx.iter().enumerate() {
            if row < 0 || row as usize >= n {
                return Err(SolverError::Structural {
                    reason: format!("row index {} at position {} out of range [0, {})", row, idx, n),
                });
            }
        }
        Ok(Self {
            n,
            col_ptr: col_ptr.to_vec(),
            row_idx: row_idx.to_vec(),
        })
    }

    /// Matrix order.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of structural nonzeros (duplicates counted).
    pub fn nnz(&self) -> usize {
        self.row_idx.len()
    }

    /// Column pointers, length `n + 1`.
    pub fn col_ptr(&self) -> &[i64] {
        &self.col_ptr
    }

    /// Row indices, length `nnz`.
    pub fn row_idx(&self) -> &[i64] {
        &self.row_idx
    }

    /// Entry range of column `j` as indices into `row_idx`.
    pub(crate) fn column_range(&self, j: usize) -> std::ops::Range<usize> {
        self.col_ptr[j] as usize..self.col_ptr[j + 1] as usize
    }

    /// Whether the pattern is structurally symmetric: an entry exists at
    /// `(i, j)` exactly when one exists at `(j, i)`. Says nothing about the
    /// values — value symmetry cannot be checked here because values are
    /// not retained outside the numeric factorization.
    pub fn is_structurally_symmetric(&self) -> bool {
        let mut entries = Vec::with_capacity(self.nnz());
        let mut transposed = Vec::with_capacity(self.nnz());
        for j in 0..self.n {
            for idx in self.column_range(j) {
                let i = self.row_idx[idx] as usize;
                entries.push((i, j));
                transposed.push((j, i));
            }
        }
        entries.sort_unstable();
        entries.dedup();
        transposed.sort_unstable();
        transposed.dedup();
        entries == transposed
    }
}
