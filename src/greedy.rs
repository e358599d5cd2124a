//! Greedy maximum coverage over the rows of a [`DetectionMatrix`].
//!
//! Each pick takes the live candidate occurring in the most *uncovered* rows,
//! then drops every row it occurs in from the uncovered list, so later picks
//! never rescan covered rows.  Exactly `k` nodes are always selected; once
//! everything is covered the remaining picks have frequency 0 and fall to the
//! smallest live ids.

use std::collections::HashMap;

use bitvec::prelude::*;
use tracing::{debug, trace};

use crate::error::{Result, SaaError};
use crate::graph::NodeId;
use crate::matrix::DetectionMatrix;

/// A selection together with the number of rows it covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coverage {
    /// Selected ids in pick order, in matrix id space.
    pub honeypots: Vec<NodeId>,
    pub covered: usize,
    pub repetitions: usize,
}

impl Coverage {
    /// Fraction of rows covered; 0 for an empty matrix.
    pub fn objective(&self) -> f64 {
        if self.repetitions == 0 {
            return 0.0;
        }
        self.covered as f64 / self.repetitions as f64
    }

    #[inline] pub fn uncovered(&self) -> usize { self.repetitions - self.covered }
}

pub fn greedy_max_coverage(matrix: &DetectionMatrix, k: usize) -> Result<Coverage> {
    let candidates = matrix.candidates();
    if k > candidates.len() {
        return Err(SaaError::BudgetTooLarge { k, available: candidates.len() });
    }
    let rows = matrix.rows();
    let index: HashMap<NodeId, usize> = candidates.iter().enumerate().map(|(i, &v)| (v, i)).collect();

    let mut live: BitVec = bitvec![1; candidates.len()];
    let mut uncovered: Vec<usize> = (0..rows.len()).collect();
    let mut honeypots = Vec::with_capacity(k);

    let mut freq = vec![0usize; candidates.len()];
    // row that last counted each candidate, so an id counts once per row
    let mut stamp = vec![usize::MAX; candidates.len()];

    for _ in 0..k {
        freq.iter_mut().for_each(|f| *f = 0);
        for &r in &uncovered {
            for id in &rows[r] {
                if let Some(&i) = index.get(id) {
                    if live[i] && stamp[i] != r {
                        stamp[i] = r;
                        freq[i] += 1;
                    }
                }
            }
        }

        // candidates are ascending, so a strict `>` leaves ties to the smallest id
        let mut best: Option<usize> = None;
        for i in live.iter_ones() {
            if best.is_none_or(|b| freq[i] > freq[b]) {
                best = Some(i);
            }
        }
        let Some(b) = best else { break };

        let chosen = candidates[b];
        live.set(b, false);
        honeypots.push(chosen);
        uncovered.retain(|&r| !rows[r].contains(&chosen));
        stamp.iter_mut().for_each(|s| *s = usize::MAX);
        trace!(node = chosen, frequency = freq[b], uncovered = uncovered.len(), "greedy pick");
    }

    let cov = Coverage { honeypots, covered: rows.len() - uncovered.len(), repetitions: rows.len() };
    debug!(k, covered = cov.covered, rows = cov.repetitions, "greedy coverage done");
    Ok(cov)
}
