//! Structural baselines: pick honeypots from the graph alone, then score them
//! on the same detection matrix as the greedy heuristic.

use std::collections::{BTreeMap, BTreeSet};

use crate::bounds::Bounds;
use crate::error::{Result, SaaError};
use crate::graph::{Graph, NodeId};
use crate::greedy::Coverage;
use crate::matrix::DetectionMatrix;
use crate::topk::top_k_by_key;

/// The `k` highest-degree vertices; ties go to the smaller label.
pub fn degree_centrality(graph: &Graph, k: usize) -> Result<Vec<NodeId>> {
    if k > graph.n() {
        return Err(SaaError::BudgetTooLarge { k, available: graph.n() });
    }
    let top = top_k_by_key(graph.degrees(), k, |&(_, d)| d);
    Ok(top.into_iter().map(|(v, _)| v).collect())
}

/// Single-discount heuristic of Chen, Wang & Yang (KDD'09).
///
/// A vertex with degree `d` and `t` already selected neighbours scores
/// `d − 2t − q·t·(d − t)`.
pub fn degree_discount(graph: &Graph, k: usize, q: f64) -> Result<Vec<NodeId>> {
    if k > graph.n() {
        return Err(SaaError::BudgetTooLarge { k, available: graph.n() });
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(SaaError::InvalidProbability { name: "discount q", value: q, range: "[0, 1]" });
    }

    let mut score: BTreeMap<NodeId, f64> = graph.degrees().into_iter().map(|(v, d)| (v, d as f64)).collect();
    let mut t: BTreeMap<NodeId, usize> = BTreeMap::new();
    let mut selected = BTreeSet::new();
    let mut order = Vec::with_capacity(k);

    for _ in 0..k {
        // ascending scan with strict `>` keeps the smallest label on ties
        let mut best: Option<(NodeId, f64)> = None;
        for (&v, &s) in &score {
            if best.is_none_or(|(_, b)| s > b) {
                best = Some((v, s));
            }
        }
        let Some((u, _)) = best else { break };
        score.remove(&u);
        selected.insert(u);
        order.push(u);

        for &w in graph.neighbors(u) {
            if selected.contains(&w) { continue; }
            let tw = t.entry(w).or_insert(0);
            *tw += 1;
            let d = graph.degree(w) as f64;
            let tf = *tw as f64;
            score.insert(w, d - 2.0 * tf - q * tf * (d - tf));
        }
    }
    Ok(order)
}

/// Coverage of an externally chosen set of graph labels.
pub fn selection_coverage(matrix: &DetectionMatrix, labels: &[NodeId]) -> Result<Coverage> {
    let mut honeypots = Vec::with_capacity(labels.len());
    for &label in labels {
        let id = matrix.matrix_id(label)?;
        if matrix.candidates().binary_search(&id).is_err() {
            return Err(SaaError::UnknownVertex(label));
        }
        honeypots.push(id);
    }
    Ok(Coverage {
        covered: matrix.covered_by(&honeypots),
        repetitions: matrix.repetitions(),
        honeypots,
    })
}

/// Coverage and bounds of an externally chosen set of graph labels.
pub fn evaluate_selection(matrix: &DetectionMatrix, labels: &[NodeId]) -> Result<(Coverage, Bounds)> {
    let coverage = selection_coverage(matrix, labels)?;
    let bounds = Bounds::compute(matrix, &coverage);
    Ok((coverage, bounds))
}
