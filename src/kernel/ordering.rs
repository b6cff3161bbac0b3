//! Minimum-degree fill-reducing ordering.
//!
//! Classic minimum degree on the symmetrized pattern: repeatedly eliminate
//! the node with the fewest remaining neighbors, turning its neighborhood
//! into a clique (the fill that elimination would create). The ordering is
//! applied symmetrically to rows and columns, which suits circuit MNA
//! matrices — their patterns are usually symmetric even when the values
//! are not.
//!
//! This is the plain algorithm, not the quotient-graph AMD refinement; for
//! the moderately sparse matrices this crate targets the difference in
//! ordering quality is small and the simple version is easy to audit.
//!
//! # References
//!
//! - George, A., Liu, J.W.H. "The Evolution of the Minimum Degree Ordering
//!   Algorithm", SIAM Review, 1989.
//! - Davis, T.A. "Direct Methods for Sparse Linear Systems", SIAM, 2006,
//!   Chapter 7.

use std::collections::HashSet;

use crate::pattern::SparseMatrixPattern;

/// Symmetric permutation produced by the ordering.
#[derive(Debug, Clone)]
pub(crate) struct OrderingResult {
    /// new index = `perm[old index]`
    pub perm: Vec<usize>,
    /// old index = `inv_perm[new index]`
    pub inv_perm: Vec<usize>,
}

impl OrderingResult {
    /// Identity ordering (natural).
    pub fn natural(n: usize) -> Self {
        Self {
            perm: (0..n).collect(),
            inv_perm: (0..n).collect(),
        }
    }
}

/// Compute a minimum-degree ordering of the symmetrized pattern.
pub(crate) fn minimum_degree(pattern: &SparseMatrixPattern) -> OrderingResult {
    let n = pattern.n();
    if n == 0 {
        return OrderingResult::natural(0);
    }

    // Symmetrized adjacency: edge {i, j} for every entry (i, j) or (j, i),
    // diagonal excluded.
    let mut adj: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    let row_idx = pattern.row_idx();
    for j in 0..n {
        for idx in pattern.column_range(j) {
            let i = row_idx[idx] as usize;
            if i != j {
                adj[i].insert(j);
                adj[j].insert(i);
            }
        }
    }

    let mut perm = vec![0usize; n];
    let mut inv_perm = vec![0usize; n];
    let mut eliminated = vec![false; n];

    for k in 0..n {
        // Select the uneliminated node with minimum degree. Ties break
        // toward the lowest index, which keeps the ordering deterministic.
        let mut best = usize::MAX;
        let mut best_degree = usize::MAX;
        for (node, neighbors) in adj.iter().enumerate() {
            if !eliminated[node] && neighbors.len() < best_degree {
                best = node;
                best_degree = neighbors.len();
            }
        }

        inv_perm[k] = best;
        perm[best] = k;
        eliminated[best] = true;

        // Eliminate: connect the remaining neighbors into a clique and
        // detach the eliminated node.
        let neighbors: Vec<usize> = adj[best].iter().copied().collect();
        for &v in &neighbors {
            adj[v].remove(&best);
            for &w in &neighbors {
                if w != v {
                    adj[v].insert(w);
                }
            }
        }
        adj[best].clear();
    }

    OrderingResult { perm, inv_perm }
}
