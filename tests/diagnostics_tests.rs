//! Tests for statistics, condition estimation, residual reporting and
//! timing instrumentation.

use sparse_direct::{Scaling, SolverConfig, SparseDirectSolver};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Statistics
// ============================================================================

#[test]
fn test_statistics_before_analysis_are_zeroed() {
    let solver = SparseDirectSolver::new();
    let stats = solver.statistics();
    assert_eq!(stats.rows, 0);
    assert_eq!(stats.cols, 0);
    assert_eq!(stats.nnz, 0);
    assert_eq!(stats.fill_factor, 0.0);
    assert!(!stats.is_symmetric);
    assert_eq!(stats.condition_estimate, 0.0);
    assert_eq!(stats.factor_count, 0);
    assert_eq!(stats.refactor_count, 0);
}

#[test]
fn test_fill_factor_is_at_least_one() {
    // The factor patterns always cover the original entries, so the
    // predicted fill can never undercut the input.
    let cases: [(usize, Vec<i64>, Vec<i64>); 3] = [
        // Diagonal: no fill at all.
        (3, vec![0, 1, 2, 3], vec![0, 1, 2]),
        // Tridiagonal: factors match the band exactly.
        (4, vec![0, 2, 5, 8, 10], vec![0, 1, 0, 1, 2, 1, 2, 3, 2, 3]),
        // Arrow: dense first row and column plus diagonal.
        (
            5,
            vec![0, 5, 7, 9, 11, 13],
            vec![0, 1, 2, 3, 4, 0, 1, 0, 2, 0, 3, 0, 4],
        ),
    ];
    for (n, col_ptr, row_idx) in &cases {
        let mut solver = SparseDirectSolver::new();
        solver.analyze_structure(*n, col_ptr, row_idx).unwrap();
        let stats = solver.statistics();
        assert!(
            stats.fill_factor >= 1.0,
            "n={}: fill factor {} below 1.0",
            n,
            stats.fill_factor
        );
        assert_eq!(stats.rows, *n);
        assert_eq!(stats.cols, *n);
        assert_eq!(stats.nnz, row_idx.len());
    }
}

#[test]
fn test_structural_symmetry_detection() {
    // Tridiagonal: symmetric.
    let mut solver = SparseDirectSolver::new();
    solver
        .analyze_structure(3, &[0, 2, 5, 7], &[0, 1, 0, 1, 2, 1, 2])
        .unwrap();
    assert!(solver.statistics().is_symmetric);

    // Lower triangular: (1,0) present, (0,1) absent.
    solver.analyze_structure(2, &[0, 2, 3], &[0, 1, 1]).unwrap();
    assert!(!solver.statistics().is_symmetric);
}

// ============================================================================
// Condition estimation
// ============================================================================

#[test]
fn test_condition_estimate_tracks_pivot_spread() {
    // Unscaled diag(1, 100): pivot magnitudes spread by 100x.
    let config = SolverConfig {
        scaling: Scaling::None,
        ..SolverConfig::default()
    };
    let mut solver = SparseDirectSolver::with_config(config);
    solver.analyze_structure(2, &[0, 1, 2], &[0, 1]).unwrap();
    assert_eq!(solver.statistics().condition_estimate, 0.0);

    solver.factorize_matrix(&[1.0, 100.0]).unwrap();
    let estimate = solver.statistics().condition_estimate;
    assert!((estimate - 100.0).abs() < 1e-9, "estimate {}", estimate);

    // The per-solve outcome carries the same figure.
    let outcome = solver.solve_system(&[1.0, 100.0]);
    assert!(outcome.success);
    assert!((outcome.condition_estimate - 100.0).abs() < 1e-9);
}

#[test]
fn test_condition_estimate_never_below_one() {
    let mut solver = SparseDirectSolver::new();
    solver
        .analyze_structure(3, &[0, 2, 5, 7], &[0, 1, 0, 1, 2, 1, 2])
        .unwrap();
    solver
        .factorize_matrix(&[4.0, -1.0, -1.0, 4.0, -1.0, -1.0, 4.0])
        .unwrap();
    assert!(solver.statistics().condition_estimate >= 1.0);
}

// ============================================================================
// Residual reporting
// ============================================================================

#[test]
fn test_well_conditioned_solve_has_tiny_residual() {
    let mut solver = SparseDirectSolver::new();
    solver
        .analyze_structure(3, &[0, 2, 5, 7], &[0, 1, 0, 1, 2, 1, 2])
        .unwrap();
    solver
        .factorize_matrix(&[4.0, -1.0, -1.0, 4.0, -1.0, -1.0, 4.0])
        .unwrap();

    let outcome = solver.solve_system(&[1.0, -2.0, 5.0]);
    assert!(outcome.success);
    assert!(
        outcome.residual_norm <= 1e-12,
        "residual {}",
        outcome.residual_norm
    );
    assert!(!outcome.stability_warning);
}

#[test]
fn test_stability_warning_respects_configured_tolerance() {
    // With an impossible tolerance every solve carries a residual above
    // it. The solve must still succeed; the warning is advisory.
    init_logs();
    let config = SolverConfig {
        residual_tol: 0.0,
        ..SolverConfig::default()
    };
    let mut solver = SparseDirectSolver::with_config(config);
    solver.analyze_structure(2, &[0, 2, 4], &[0, 1, 0, 1]).unwrap();
    solver.factorize_matrix(&[3.0, 1.0, 1.0, 7.0]).unwrap();

    // Irrational solution components make the residual nonzero in
    // floating point.
    let outcome = solver.solve_system(&[1.0, 1.0]);
    assert!(outcome.success);
    if outcome.residual_norm > 0.0 {
        assert!(outcome.stability_warning);
    }
}

#[test]
fn test_failed_solve_reports_no_residual() {
    let mut solver = SparseDirectSolver::new();
    let outcome = solver.solve_system(&[1.0]);
    assert!(!outcome.success);
    assert_eq!(outcome.residual_norm, 0.0);
    assert!(!outcome.stability_warning);
    assert_eq!(outcome.condition_estimate, 0.0);
}

// ============================================================================
// Timing instrumentation
// ============================================================================

#[test]
fn test_timings_populate_and_reset() {
    let mut solver = SparseDirectSolver::new();
    assert_eq!(solver.last_analyze_ms(), 0.0);
    assert_eq!(solver.last_factor_ms(), 0.0);
    assert_eq!(solver.last_solve_ms(), 0.0);

    solver.analyze_structure(3, &[0, 1, 2, 3], &[0, 1, 2]).unwrap();
    solver.factorize_matrix(&[2.0, 2.0, 2.0]).unwrap();
    let outcome = solver.solve_system(&[2.0, 4.0, 6.0]);
    assert!(outcome.success);

    assert!(solver.last_analyze_ms() >= 0.0);
    assert!(solver.last_factor_ms() >= 0.0);
    assert!(solver.last_solve_ms() >= 0.0);
    assert_eq!(outcome.factor_time_ms, solver.last_factor_ms());
    assert_eq!(outcome.solve_time_ms, solver.last_solve_ms());

    solver.cleanup();
    assert_eq!(solver.last_analyze_ms(), 0.0);
    assert_eq!(solver.last_factor_ms(), 0.0);
    assert_eq!(solver.last_solve_ms(), 0.0);
    assert_eq!(solver.statistics().factor_count, 0);
}
