//! End-to-end SAA run: samples → detection matrix → selection → bounds → cache.
//!
//! Keys are independent, so [`run_saa_parallel`] fans them out with rayon;
//! inside one key everything is sequential.

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::baseline::{degree_centrality, degree_discount, selection_coverage};
use crate::bounds::Bounds;
use crate::cache::{AlgorithmOutput, ResultCache};
use crate::error::{Result, SaaError};
use crate::graph::Graph;
use crate::greedy::{greedy_max_coverage, Coverage};
use crate::matrix::DetectionMatrix;
use crate::params::{ParameterKey, Params, SpreadModel};
use crate::simulate::SimulationRuns;

/*──────────────────────── solvers ────────────────────────*/

/// Chooses `k` honeypots for one detection matrix.
pub trait Solver: Send + Sync {
    fn name(&self) -> &'static str;

    /// Selection in matrix id space together with its coverage.
    fn select(&self, graph: &Graph, matrix: &DetectionMatrix, k: usize) -> Result<Coverage>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GreedySolver;

impl Solver for GreedySolver {
    fn name(&self) -> &'static str { "greedy" }

    fn select(&self, _graph: &Graph, matrix: &DetectionMatrix, k: usize) -> Result<Coverage> {
        greedy_max_coverage(matrix, k)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DegreeCentralitySolver;

impl Solver for DegreeCentralitySolver {
    fn name(&self) -> &'static str { "degree-centrality" }

    fn select(&self, graph: &Graph, matrix: &DetectionMatrix, k: usize) -> Result<Coverage> {
        selection_coverage(matrix, &degree_centrality(graph, k)?)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DegreeDiscountSolver {
    pub q: f64,
}

impl Default for DegreeDiscountSolver {
    fn default() -> Self {
        Self { q: Params::default().discount_q }
    }
}

impl Solver for DegreeDiscountSolver {
    fn name(&self) -> &'static str { "degree-discount" }

    fn select(&self, graph: &Graph, matrix: &DetectionMatrix, k: usize) -> Result<Coverage> {
        selection_coverage(matrix, &degree_discount(graph, k, self.q)?)
    }
}

/*──────────────────────── runs ────────────────────────*/

/// Keys solved and keys skipped for lack of samples.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub solved: Vec<ParameterKey>,
    pub skipped: Vec<ParameterKey>,
}

/// Simulate whatever `keys` need that `runs` does not hold yet.
pub fn simulate_for_keys(
    graph: &Graph,
    runs: &mut SimulationRuns,
    keys: &[ParameterKey],
    params: &Params,
) -> Result<()> {
    // one simulate call per (model, r, p); BTreeMap keeps the order stable
    let mut groups: BTreeMap<(SpreadModel, u64, u64), Vec<(usize, usize)>> = BTreeMap::new();
    for key in keys {
        key.validate()?;
        let pairs = groups
            .entry((key.model, key.false_negative.to_bits(), key.transmissability.to_bits()))
            .or_default();
        if !pairs.contains(&(key.time_step, key.repetitions)) {
            pairs.push((key.time_step, key.repetitions));
        }
    }
    for ((model, r, p), pairs) in groups {
        let (r, p) = (f64::from_bits(r), f64::from_bits(p));
        runs.simulate_only_necessary(graph, model, &pairs, r, p, params.seeds_for(model))?;
    }
    Ok(())
}

/// Solve a single key.  `Ok(None)` means no samples are stored for it.
pub fn solve_key(
    graph: &Graph,
    runs: &SimulationRuns,
    key: &ParameterKey,
    solver: &dyn Solver,
) -> Result<Option<AlgorithmOutput>> {
    if key.network != graph.name() {
        return Err(SaaError::NetworkMismatch { expected: key.network.clone(), got: graph.name().to_string() });
    }
    key.validate()?;
    if key.honeypots > graph.n() {
        return Err(SaaError::BudgetTooLarge { k: key.honeypots, available: graph.n() });
    }
    let Some(samples) = runs.get(&key.simulation_key()) else {
        return Ok(None);
    };
    if samples.repetitions() != key.repetitions {
        return Err(SaaError::DimensionMismatch { expected: key.repetitions, got: samples.repetitions() });
    }

    let matrix = DetectionMatrix::build(graph, samples, key.false_negative)?;

    let start = Instant::now();
    let coverage = solver.select(graph, &matrix, key.honeypots)?;
    let wall_time = start.elapsed();
    let bounds = Bounds::compute(&matrix, &coverage);

    let honeypots = coverage.honeypots.iter().map(|&id| matrix.report_id(id)).collect();
    Ok(Some(AlgorithmOutput::new(honeypots, &bounds, wall_time)))
}

fn check_graph(graph: &Graph) -> Result<()> {
    graph.ensure_simple()?;
    graph.min_label()?;
    Ok(())
}

fn record(
    cache: &mut ResultCache,
    summary: &mut RunSummary,
    solver: &dyn Solver,
    key: &ParameterKey,
    output: Option<AlgorithmOutput>,
) {
    match output {
        Some(out) => {
            info!(solver = solver.name(), key = %key, objective = out.objective,
                  a_priori = out.a_priori_ub, posterior = out.posterior_ub, "solved");
            cache.upsert(key.clone(), out);
            summary.solved.push(key.clone());
        }
        None => {
            warn!(key = %key, "no simulation samples for key, skipping");
            summary.skipped.push(key.clone());
        }
    }
}

/// Solve every key in order and store the outputs in `cache`.
///
/// Structural problems abort the batch; keys without samples are skipped.
pub fn run_saa(
    graph: &Graph,
    runs: &SimulationRuns,
    keys: &[ParameterKey],
    solver: &dyn Solver,
    cache: &mut ResultCache,
) -> Result<RunSummary> {
    check_graph(graph)?;
    let mut summary = RunSummary::default();
    for key in keys {
        let output = solve_key(graph, runs, key, solver)?;
        record(cache, &mut summary, solver, key, output);
    }
    Ok(summary)
}

/// [`run_saa`] with keys solved on the rayon pool; the cache is still written
/// from this thread only, in key order.
pub fn run_saa_parallel(
    graph: &Graph,
    runs: &SimulationRuns,
    keys: &[ParameterKey],
    solver: &dyn Solver,
    cache: &mut ResultCache,
) -> Result<RunSummary> {
    check_graph(graph)?;
    let outputs = keys
        .par_iter()
        .map(|key| solve_key(graph, runs, key, solver))
        .collect::<Result<Vec<_>>>()?;

    let mut summary = RunSummary::default();
    for (key, output) in keys.iter().zip(outputs) {
        record(cache, &mut summary, solver, key, output);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> Graph {
        Graph::circulant("ring", 16, &[1, 3])
    }

    fn key(k: usize) -> ParameterKey {
        ParameterKey::new(SpreadModel::Raepc, "ring", 3, 40, 0.1, 0.4, k)
    }

    fn simulated(keys: &[ParameterKey]) -> SimulationRuns {
        let mut runs = SimulationRuns::new();
        simulate_for_keys(&ring(), &mut runs, keys, &Params::default()).unwrap();
        runs
    }

    #[test]
    fn missing_samples_are_skipped() {
        let g = ring();
        let present = key(2);
        let absent = ParameterKey { time_step: 9, ..key(2) };
        let runs = simulated(std::slice::from_ref(&present));

        let mut cache = ResultCache::new();
        let summary = run_saa(&g, &runs, &[present.clone(), absent.clone()], &GreedySolver, &mut cache).unwrap();
        assert_eq!(summary.solved, vec![present.clone()]);
        assert_eq!(summary.skipped, vec![absent]);
        let out = cache.get(&present).unwrap();
        assert_eq!(out.honeypots.len(), 2);
        assert!(out.objective <= out.a_priori_ub && out.objective <= out.posterior_ub);
    }

    #[test]
    fn structural_failures_are_fatal() {
        let g = ring();
        let runs = simulated(&[key(2)]);
        let mut cache = ResultCache::new();

        let wrong_net = ParameterKey { network: "other".into(), ..key(2) };
        assert!(matches!(
            run_saa(&g, &runs, &[wrong_net], &GreedySolver, &mut cache),
            Err(SaaError::NetworkMismatch { .. })
        ));
        assert!(matches!(
            run_saa(&g, &runs, &[key(17)], &GreedySolver, &mut cache),
            Err(SaaError::BudgetTooLarge { k: 17, available: 16 })
        ));
        let bad_p = ParameterKey { transmissability: 0.0, ..key(2) };
        assert!(matches!(
            run_saa(&g, &runs, &[bad_p], &GreedySolver, &mut cache),
            Err(SaaError::InvalidProbability { .. })
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn parallel_matches_sequential() {
        let g = ring();
        let keys: Vec<_> = (1..=4).map(key).collect();
        let runs = simulated(&keys);

        let mut seq = ResultCache::new();
        let mut par = ResultCache::new();
        run_saa(&g, &runs, &keys, &GreedySolver, &mut seq).unwrap();
        run_saa_parallel(&g, &runs, &keys, &GreedySolver, &mut par).unwrap();
        for k in &keys {
            let (a, b) = (seq.get(k).unwrap(), par.get(k).unwrap());
            assert_eq!(a.honeypots, b.honeypots);
            assert_eq!(a.objective, b.objective);
            assert_eq!(a.posterior_ub, b.posterior_ub);
        }
    }

    /// Greedy with a fixed delay, so the recorded wall time has a floor.
    struct SlowGreedy(std::time::Duration);

    impl Solver for SlowGreedy {
        fn name(&self) -> &'static str { "slow-greedy" }

        fn select(&self, _graph: &Graph, matrix: &DetectionMatrix, k: usize) -> Result<Coverage> {
            std::thread::sleep(self.0);
            greedy_max_coverage(matrix, k)
        }
    }

    #[test]
    fn wall_time_covers_selection() {
        let g = ring();
        let k = key(2);
        let runs = simulated(std::slice::from_ref(&k));
        let delay = std::time::Duration::from_millis(30);
        let out = solve_key(&g, &runs, &k, &SlowGreedy(delay)).unwrap().unwrap();
        assert!(out.wall_time >= delay);
        let fast = solve_key(&g, &runs, &k, &GreedySolver).unwrap().unwrap();
        assert_eq!(fast.honeypots, out.honeypots);
    }

    #[test]
    fn baselines_report_graph_labels() {
        let g = ring();
        let k = key(3);
        let runs = simulated(std::slice::from_ref(&k));
        let mut cache = ResultCache::new();
        run_saa(&g, &runs, std::slice::from_ref(&k), &DegreeCentralitySolver, &mut cache).unwrap();
        // every ring vertex has degree 4, so the three smallest labels win
        assert_eq!(cache.get(&k).unwrap().honeypots, vec![0, 1, 2]);

        run_saa(&g, &runs, std::slice::from_ref(&k), &DegreeDiscountSolver::default(), &mut cache).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&k).unwrap().honeypots.len(), 3);
    }
}
