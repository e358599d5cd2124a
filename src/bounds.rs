//! Upper bounds on the optimal SAA coverage.
//!
//! * a-priori: the `e/(e−1)` guarantee of greedy submodular maximisation,
//! * posterior: the achieved objective plus the gains of the k best
//!   unselected nodes on the rows the selection left uncovered.
//!
//! Both are capped at 1 and are pure functions of the matrix and selection.

use std::collections::{HashMap, HashSet};
use std::f64::consts::E;

use crate::graph::NodeId;
use crate::greedy::Coverage;
use crate::matrix::DetectionMatrix;
use crate::topk::top_k_by_key;

/// `e / (e − 1)` ≈ 1.582.
pub const GREEDY_FACTOR: f64 = E / (E - 1.0);

#[inline]
pub fn a_priori_bound(objective: f64) -> f64 {
    (objective * GREEDY_FACTOR).min(1.0)
}

#[inline]
pub fn posterior_bound(objective: f64, delta: f64) -> f64 {
    (objective + delta).min(1.0)
}

/// Sum of the marginal gains of the `|honeypots|` non-selected candidates
/// that occur in the most uncovered rows.  `covered` is the number of rows the
/// honeypots cover.
pub fn posterior_delta(
    candidates: &[NodeId],
    rows: &[Vec<NodeId>],
    honeypots: &[NodeId],
    covered: usize,
) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let chosen: HashSet<NodeId> = honeypots.iter().copied().collect();
    let failed: HashSet<NodeId> = candidates.iter().copied().filter(|v| !chosen.contains(v)).collect();

    let mut freq: HashMap<NodeId, usize> = HashMap::new();
    for row in rows.iter().filter(|row| !row.iter().any(|v| chosen.contains(v))) {
        let distinct: HashSet<NodeId> = row.iter().copied().filter(|v| failed.contains(v)).collect();
        for v in distinct {
            *freq.entry(v).or_default() += 1;
        }
    }

    let r = rows.len() as f64;
    let objective = covered as f64 / r;
    top_k_by_key(freq.keys().copied(), honeypots.len(), |v| freq[v])
        .into_iter()
        .map(|v| (covered + freq[&v]) as f64 / r - objective)
        .sum()
}

/// Objective and both bounds of one selection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub objective: f64,
    pub a_priori: f64,
    pub delta: f64,
    pub posterior: f64,
}

impl Bounds {
    pub fn compute(matrix: &DetectionMatrix, coverage: &Coverage) -> Self {
        let objective = coverage.objective();
        let delta = posterior_delta(matrix.candidates(), matrix.rows(), &coverage.honeypots, coverage.covered);
        Self {
            objective,
            a_priori: a_priori_bound(objective),
            delta,
            posterior: posterior_bound(objective, delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greedy::greedy_max_coverage;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    /// 20 rows; {5, 146} cover 9.  On the 11 others node 7 occurs three
    /// times and node 8 twice, everything else at most once.
    fn regression_matrix() -> DetectionMatrix {
        let rows: Vec<Vec<NodeId>> = vec![
            vec![5, 7], vec![146, 8], vec![5, 146], vec![5], vec![146],
            vec![5, 9], vec![146, 10], vec![5, 11], vec![146],
            vec![7, 8], vec![7, 9], vec![7], vec![8, 10], vec![11], vec![12],
            vec![13], vec![14], vec![], vec![15], vec![0, 16],
        ];
        let mut candidates: Vec<NodeId> = (7..=16).collect();
        candidates.extend([5, 146]);
        DetectionMatrix::from_rows(rows, candidates)
    }

    #[test]
    fn a_priori_is_capped() {
        assert_relative_eq!(a_priori_bound(0.5), 0.5 * GREEDY_FACTOR);
        assert_relative_eq!(a_priori_bound(0.7), 1.0);
        assert_relative_eq!(GREEDY_FACTOR, 1.5819767068693265, epsilon = 1e-12);
    }

    #[test]
    fn posterior_delta_regression() {
        let m = regression_matrix();
        assert_eq!(m.covered_by(&[5, 146]), 9);
        let delta = posterior_delta(m.candidates(), m.rows(), &[5, 146], 9);
        assert_relative_eq!(delta, 0.25, epsilon = 1e-12);
        assert_relative_eq!(posterior_bound(0.45, delta), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn bounds_of_a_full_cover_are_one() {
        let m = DetectionMatrix::from_rows(vec![vec![1], vec![1, 2]], vec![1, 2]);
        let cov = greedy_max_coverage(&m, 1).unwrap();
        let b = Bounds::compute(&m, &cov);
        assert_relative_eq!(b.objective, 1.0);
        assert_relative_eq!(b.delta, 0.0);
        assert_relative_eq!(b.posterior, 1.0);
        assert_relative_eq!(b.a_priori, 1.0);
    }

    #[test]
    fn empty_rows_bound_nothing() {
        let m = DetectionMatrix::from_rows(vec![vec![], vec![]], vec![1, 2]);
        let cov = greedy_max_coverage(&m, 1).unwrap();
        let b = Bounds::compute(&m, &cov);
        assert_relative_eq!(b.objective, 0.0);
        assert_relative_eq!(b.posterior, 0.0);
    }

    proptest! {
        #[test]
        fn greedy_objective_is_below_both_bounds(
            rows in prop::collection::vec(prop::collection::vec(1u32..15, 0..7), 1..30),
            k in 1usize..8,
        ) {
            let m = DetectionMatrix::from_rows(rows, (1..15).collect());
            let cov = greedy_max_coverage(&m, k).unwrap();
            let b = Bounds::compute(&m, &cov);
            prop_assert!(b.objective <= b.a_priori + 1e-12);
            prop_assert!(b.objective <= b.posterior + 1e-12);
            prop_assert!(b.a_priori <= 1.0 && b.posterior <= 1.0);
            prop_assert!(b.delta >= 0.0);
        }
    }
}
