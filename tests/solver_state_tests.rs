//! State machine and lifecycle tests for SparseDirectSolver.
//!
//! These exercise the legal ordering of analyze / factorize / solve /
//! cleanup, the precondition failures, and the fallback states after each
//! kind of failure.

use sparse_direct::{SolverError, SolverState, SparseDirectSolver};

// 3x3 diagonal pattern used throughout.
const AP: [i64; 4] = [0, 1, 2, 3];
const AI: [i64; 3] = [0, 1, 2];

// ============================================================================
// Happy path
// ============================================================================

#[test]
fn test_full_pipeline_identity_like() {
    // Concrete scenario: diag(2, 2, 2), b = [2, 4, 6] => x = [1, 2, 3].
    let mut solver = SparseDirectSolver::new();
    assert_eq!(solver.state(), SolverState::Empty);

    solver.analyze_structure(3, &AP, &AI).unwrap();
    assert_eq!(solver.state(), SolverState::Analyzed);

    solver.factorize_matrix(&[2.0, 2.0, 2.0]).unwrap();
    assert_eq!(solver.state(), SolverState::Factorized);

    let outcome = solver.solve_system(&[2.0, 4.0, 6.0]);
    assert!(outcome.success);
    assert!(outcome.error_message.is_none());
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.solution.len(), 3);
    for (got, want) in outcome.solution.iter().zip([1.0, 2.0, 3.0]) {
        assert!((got - want).abs() < 1e-12, "expected {}, got {}", want, got);
    }
}

#[test]
fn test_solve_does_not_mutate_rhs() {
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(3, &AP, &AI).unwrap();
    solver.factorize_matrix(&[2.0, 2.0, 2.0]).unwrap();

    let rhs = vec![2.0, 4.0, 6.0];
    let outcome = solver.solve_system(&rhs);
    assert!(outcome.success);
    assert_eq!(rhs, vec![2.0, 4.0, 6.0]);
}

#[test]
fn test_solve_is_repeatable_without_refactorization() {
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(3, &AP, &AI).unwrap();
    solver.factorize_matrix(&[2.0, 4.0, 8.0]).unwrap();

    let first = solver.solve_system(&[2.0, 4.0, 8.0]);
    let second = solver.solve_system(&[4.0, 8.0, 16.0]);
    assert!(first.success && second.success);
    for v in &first.solution {
        assert!((v - 1.0).abs() < 1e-12);
    }
    for v in &second.solution {
        assert!((v - 2.0).abs() < 1e-12);
    }
    assert_eq!(solver.state(), SolverState::Factorized);
}

// ============================================================================
// Out-of-order calls
// ============================================================================

#[test]
fn test_factorize_before_analyze_fails_and_stays_empty() {
    let mut solver = SparseDirectSolver::new();
    let err = solver.factorize_matrix(&[1.0, 1.0, 1.0]).unwrap_err();
    assert!(matches!(err, SolverError::Precondition { .. }));
    assert_eq!(solver.state(), SolverState::Empty);
}

#[test]
fn test_solve_before_factorize_reports_not_factorized() {
    let mut solver = SparseDirectSolver::new();

    // From Empty.
    let outcome = solver.solve_system(&[1.0, 2.0, 3.0]);
    assert!(!outcome.success);
    assert!(outcome.error_message.as_deref().unwrap().contains("not factorized"));
    assert_eq!(outcome.iterations, 0);
    assert!(outcome.solution.is_empty());

    // From Analyzed.
    solver.analyze_structure(3, &AP, &AI).unwrap();
    let outcome = solver.solve_system(&[1.0, 2.0, 3.0]);
    assert!(!outcome.success);
    assert!(outcome.error_message.as_deref().unwrap().contains("not factorized"));
    assert_eq!(solver.state(), SolverState::Analyzed);
}

#[test]
fn test_solve_dimension_mismatch() {
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(3, &AP, &AI).unwrap();
    solver.factorize_matrix(&[2.0, 2.0, 2.0]).unwrap();

    for bad_rhs in [vec![], vec![1.0], vec![1.0, 2.0, 3.0, 4.0]] {
        let outcome = solver.solve_system(&bad_rhs);
        assert!(!outcome.success);
        assert!(
            outcome.error_message.as_deref().unwrap().contains("dimension mismatch"),
            "unexpected message: {:?}",
            outcome.error_message
        );
    }
    // Precondition failures never change state.
    assert_eq!(solver.state(), SolverState::Factorized);
}

#[test]
fn test_factorize_value_length_mismatch_preserves_state() {
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(3, &AP, &AI).unwrap();

    let err = solver.factorize_matrix(&[1.0, 2.0]).unwrap_err();
    assert!(matches!(err, SolverError::Precondition { .. }));
    assert_eq!(solver.state(), SolverState::Analyzed);

    // Same check from Factorized: the existing factorization survives.
    solver.factorize_matrix(&[2.0, 2.0, 2.0]).unwrap();
    let err = solver.factorize_matrix(&[1.0]).unwrap_err();
    assert!(matches!(err, SolverError::Precondition { .. }));
    assert_eq!(solver.state(), SolverState::Factorized);
    assert!(solver.solve_system(&[2.0, 2.0, 2.0]).success);
}

// ============================================================================
// Failure fallback states
// ============================================================================

#[test]
fn test_bad_pattern_falls_back_to_empty() {
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(3, &AP, &AI).unwrap();
    solver.factorize_matrix(&[2.0, 2.0, 2.0]).unwrap();

    // Row index out of range invalidates everything already built.
    let err = solver.analyze_structure(2, &[0, 1, 2], &[0, 7]).unwrap_err();
    assert!(matches!(err, SolverError::Structural { .. }));
    assert_eq!(solver.state(), SolverState::Empty);

    let outcome = solver.solve_system(&[1.0, 2.0]);
    assert!(!outcome.success);
}

#[test]
fn test_singular_factorization_falls_back_to_analyzed() {
    // Concrete scenario: an all-zero column makes factorization fail;
    // the symbolic analysis stays valid and solves report "not factorized".
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(3, &AP, &AI).unwrap();

    let err = solver.factorize_matrix(&[2.0, 0.0, 4.0]).unwrap_err();
    assert!(matches!(err, SolverError::SingularPivot { column: 1 }));
    assert_eq!(solver.state(), SolverState::Analyzed);

    let outcome = solver.solve_system(&[1.0, 2.0, 3.0]);
    assert!(!outcome.success);
    assert!(outcome.error_message.as_deref().unwrap().contains("not factorized"));

    // Retry with corrected values is legal without re-analysis.
    solver.factorize_matrix(&[2.0, 2.0, 4.0]).unwrap();
    assert_eq!(solver.state(), SolverState::Factorized);
    assert!(solver.solve_system(&[2.0, 2.0, 4.0]).success);
}

// ============================================================================
// Refactorization
// ============================================================================

#[test]
fn test_refactorize_without_reanalysis() {
    // [3 1; 1 2] then the same matrix doubled: the second solve must
    // reflect only the new values, with no re-analysis in between.
    let ap = [0i64, 2, 4];
    let ai = [0i64, 1, 0, 1];
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(2, &ap, &ai).unwrap();

    solver.factorize_matrix(&[3.0, 1.0, 1.0, 2.0]).unwrap();
    assert_eq!(solver.state(), SolverState::Factorized);
    let first = solver.solve_system(&[9.0, 8.0]);
    assert!(first.success);
    assert!((first.solution[0] - 2.0).abs() < 1e-10);
    assert!((first.solution[1] - 3.0).abs() < 1e-10);

    solver.factorize_matrix(&[6.0, 2.0, 2.0, 4.0]).unwrap();
    assert_eq!(solver.state(), SolverState::Factorized);
    let second = solver.solve_system(&[9.0, 8.0]);
    assert!(second.success);
    assert!((second.solution[0] - 1.0).abs() < 1e-10);
    assert!((second.solution[1] - 1.5).abs() < 1e-10);

    let stats = solver.statistics();
    assert_eq!(stats.factor_count, 1);
    assert_eq!(stats.refactor_count, 1);
}

// ============================================================================
// Cleanup and re-analysis
// ============================================================================

#[test]
fn test_cleanup_is_idempotent() {
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(3, &AP, &AI).unwrap();
    solver.factorize_matrix(&[2.0, 2.0, 2.0]).unwrap();

    solver.cleanup();
    assert_eq!(solver.state(), SolverState::Empty);
    solver.cleanup();
    assert_eq!(solver.state(), SolverState::Empty);

    // Cleanup from Empty on a fresh instance is also safe.
    let mut fresh = SparseDirectSolver::new();
    fresh.cleanup();
    assert_eq!(fresh.state(), SolverState::Empty);
}

#[test]
fn test_reanalysis_with_different_dimension() {
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(2, &[0, 1, 2], &[0, 1]).unwrap();
    solver.factorize_matrix(&[5.0, 5.0]).unwrap();

    // A new analysis supersedes the old artifacts entirely.
    solver.analyze_structure(3, &AP, &AI).unwrap();
    assert_eq!(solver.state(), SolverState::Analyzed);
    assert_eq!(solver.statistics().rows, 3);

    solver.factorize_matrix(&[1.0, 2.0, 4.0]).unwrap();
    let outcome = solver.solve_system(&[1.0, 2.0, 4.0]);
    assert!(outcome.success);
    for v in &outcome.solution {
        assert!((v - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_empty_system_is_legal() {
    let mut solver = SparseDirectSolver::new();
    solver.analyze_structure(0, &[0], &[]).unwrap();
    solver.factorize_matrix(&[]).unwrap();
    let outcome = solver.solve_system(&[]);
    assert!(outcome.success);
    assert!(outcome.solution.is_empty());
    assert_eq!(outcome.iterations, 1);
}
