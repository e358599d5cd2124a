//! Detection matrix: per-run record of nodes that were infected *and* would
//! have been observed by a detector.
//!
//! Rows are built by multiplying spread ids with the 0/1 detection flags, so an
//! undetected entry becomes `0`.  When the network itself uses label 0, every
//! id is shifted by +1 first so that 0 stays a pure "no detection" sentinel;
//! [`DetectionMatrix::report_id`] undoes the shift.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{Result, SaaError};
use crate::graph::{Graph, NodeId};
use crate::simulate::SampleSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionMatrix {
    rows: Vec<Vec<NodeId>>,
    /// Admissible honeypot ids in matrix space, ascending.
    candidates: Vec<NodeId>,
    /// 1 when ids were shifted away from the 0 sentinel, else 0.
    offset: NodeId,
}

/// Row-wise elementwise product of spread ids and detection flags.
pub fn elementwise_multiply(spread: &[Vec<NodeId>], flags: &[Vec<u8>]) -> Result<Vec<Vec<NodeId>>> {
    if spread.len() != flags.len() {
        return Err(SaaError::DimensionMismatch { expected: spread.len(), got: flags.len() });
    }
    spread
        .iter()
        .zip(flags)
        .map(|(row, mask)| {
            if row.len() != mask.len() {
                return Err(SaaError::DimensionMismatch { expected: row.len(), got: mask.len() });
            }
            Ok(row.iter().zip(mask).map(|(&id, &f)| id * NodeId::from(f)).collect())
        })
        .collect()
}

impl DetectionMatrix {
    /*────────── constructors ──────────*/

    /// Mask `samples` by their detection flags for false-negative probability `r`.
    /// With `r == 0` the spread paths are used unchanged.
    pub fn build(graph: &Graph, samples: &SampleSet, r: f64) -> Result<Self> {
        if samples.paths.len() != samples.detections.len() {
            return Err(SaaError::DimensionMismatch {
                expected: samples.paths.len(),
                got: samples.detections.len(),
            });
        }
        let labels: Vec<NodeId> = graph.vertices().collect();

        if r <= 0.0 {
            return Ok(Self { rows: samples.paths.clone(), candidates: labels, offset: 0 });
        }

        let offset = NodeId::from(graph.min_label()? == 0);
        let shift = |v: NodeId| v.checked_add(offset).ok_or(SaaError::LabelOverflow(v));

        let rows = if offset == 0 {
            elementwise_multiply(&samples.paths, &samples.detections)?
        } else {
            let shifted = samples
                .paths
                .iter()
                .map(|row| row.iter().map(|&v| shift(v)).collect::<Result<Vec<_>>>())
                .collect::<Result<Vec<_>>>()?;
            elementwise_multiply(&shifted, &samples.detections)?
        };
        let candidates = labels.into_iter().map(shift).collect::<Result<Vec<_>>>()?;

        debug!(rows = rows.len(), offset, "built detection matrix");
        Ok(Self { rows, candidates, offset })
    }

    /// Matrix over explicit rows; ids are taken as reported (no offset).
    pub fn from_rows(rows: Vec<Vec<NodeId>>, mut candidates: Vec<NodeId>) -> Self {
        candidates.sort_unstable();
        candidates.dedup();
        Self { rows, candidates, offset: 0 }
    }

    /*────────── getters ──────────*/

    #[inline] pub fn rows(&self) -> &[Vec<NodeId>] { &self.rows }
    #[inline] pub fn candidates(&self) -> &[NodeId] { &self.candidates }
    #[inline] pub fn offset(&self) -> NodeId { self.offset }
    #[inline] pub fn repetitions(&self) -> usize { self.rows.len() }

    /// Graph label of a matrix id.
    #[inline]
    pub fn report_id(&self, id: NodeId) -> NodeId {
        id - self.offset
    }

    /// Matrix id of a graph label.
    pub fn matrix_id(&self, label: NodeId) -> Result<NodeId> {
        label.checked_add(self.offset).ok_or(SaaError::LabelOverflow(label))
    }

    /// Number of rows containing at least one of `ids`.
    pub fn covered_by(&self, ids: &[NodeId]) -> usize {
        let set: HashSet<NodeId> = ids.iter().copied().collect();
        self.rows.iter().filter(|row| row.iter().any(|v| set.contains(v))).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(paths: Vec<Vec<NodeId>>, detections: Vec<Vec<u8>>) -> SampleSet {
        let steps = vec![0; paths.len()];
        SampleSet { paths, detections, steps }
    }

    #[test]
    fn elementwise_product_masks_entries() {
        let a = vec![vec![2, 7], vec![8, 4, 3]];
        let b = vec![vec![1, 0], vec![1, 1, 0]];
        let out = elementwise_multiply(&a, &b).unwrap();
        assert_eq!(out, vec![vec![2, 0], vec![8, 4, 0]]);
    }

    #[test]
    fn mismatched_shapes_fail() {
        let a = vec![vec![1, 2]];
        assert!(matches!(
            elementwise_multiply(&a, &[vec![1, 1], vec![1]]),
            Err(SaaError::DimensionMismatch { expected: 1, got: 2 })
        ));
        assert!(matches!(
            elementwise_multiply(&a, &[vec![1]]),
            Err(SaaError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn perfect_detectors_keep_raw_paths() {
        let g = Graph::from_edge_list("g", &[(0, 1), (1, 2)]);
        let s = samples(vec![vec![0, 1], vec![2]], vec![vec![0, 0], vec![0]]);
        let m = DetectionMatrix::build(&g, &s, 0.0).unwrap();
        assert_eq!(m.rows(), s.paths.as_slice());
        assert_eq!(m.candidates(), &[0, 1, 2]);
        assert_eq!(m.offset(), 0);
    }

    #[test]
    fn zero_label_is_shifted_out_of_the_sentinel() {
        let g = Graph::from_edge_list("g", &[(0, 1), (1, 2)]);
        let s = samples(vec![vec![0, 1], vec![2, 1]], vec![vec![1, 0], vec![0, 1]]);
        let m = DetectionMatrix::build(&g, &s, 0.2).unwrap();
        assert_eq!(m.rows(), &[vec![1, 0], vec![0, 2]]);
        assert_eq!(m.candidates(), &[1, 2, 3]);
        assert_eq!(m.report_id(1), 0);
        assert_eq!(m.matrix_id(2).unwrap(), 3);
        assert_eq!(m.covered_by(&[1, 3]), 1);
    }

    #[test]
    fn one_based_labels_are_not_shifted() {
        let g = Graph::from_edge_list("g", &[(1, 2), (2, 3)]);
        let s = samples(vec![vec![1, 2], vec![3]], vec![vec![1, 1], vec![0]]);
        let m = DetectionMatrix::build(&g, &s, 0.5).unwrap();
        assert_eq!(m.rows(), &[vec![1, 2], vec![0]]);
        assert_eq!(m.candidates(), &[1, 2, 3]);
        assert_eq!(m.offset(), 0);
    }

    #[test]
    fn row_count_mismatch_fails() {
        let g = Graph::from_edge_list("g", &[(1, 2)]);
        let s = samples(vec![vec![1], vec![2]], vec![vec![1]]);
        assert!(matches!(
            DetectionMatrix::build(&g, &s, 0.5),
            Err(SaaError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }
}
