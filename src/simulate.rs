//! Stochastic spread simulators producing SAA sample paths.
//!
//! • `TN11C` – a single carrier hands the contagion to one random neighbour per step
//! • `TN1PC` – as TN11C, but each hand-over succeeds only w.p. p
//! • `RA1PC` – every carrier contacts one random neighbour, success w.p. p
//! • `RAEPC` – every carrier contacts each neighbour, each success w.p. p
//!
//! Every run also draws a *virtual detection* flag per infected node: 1 when a
//! detector placed there would have observed the infection (probability 1−r).
//! All randomness comes from the per-role streams of [`Streams`], so a batch
//! is a pure function of (graph, key, base seeds).

use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SaaError};
use crate::graph::{Graph, NodeId};
use crate::params::{check_false_negative, check_transmissability, Params, SimulationKey, SpreadModel};
use crate::seed::Streams;

/// When a single run stops spreading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arrest {
    /// Fixed horizon: exactly t₀ spread steps.
    Steps(usize),
    /// Spread until at least this many nodes are infected.
    InfectionTarget(usize),
}

impl Arrest {
    #[inline]
    fn reached(self, steps: usize, infected: usize) -> bool {
        match self {
            Arrest::Steps(t0) => steps >= t0,
            Arrest::InfectionTarget(target) => infected >= target,
        }
    }
}

/// R sample paths with their parallel virtual-detection flags.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSet {
    /// Infected nodes of each run, in order of first infection.
    pub paths: Vec<Vec<NodeId>>,
    /// `detections[i][j] == 1` iff a detector at `paths[i][j]` would fire.
    pub detections: Vec<Vec<u8>>,
    /// Spread steps each run took.
    pub steps: Vec<usize>,
}

impl SampleSet {
    #[inline] pub fn repetitions(&self) -> usize { self.paths.len() }

    pub fn mean_steps(&self) -> f64 {
        if self.steps.is_empty() { return 0.0; }
        self.steps.iter().sum::<usize>() as f64 / self.steps.len() as f64
    }
}

/*───────────────────────────────────────────────────────────*/
/*  Batch driver                                             */
/*───────────────────────────────────────────────────────────*/

/// Preconditions shared by every simulation entry point.
pub(crate) fn check_inputs(graph: &Graph, model: SpreadModel, r: f64, p: f64, seeds: &[u64]) -> Result<()> {
    if graph.is_empty() {
        return Err(SaaError::EmptyGraph);
    }
    graph.ensure_simple()?;
    check_false_negative(r)?;
    if model.uses_transmissability() {
        check_transmissability(p)?;
    }
    if seeds.len() != model.seed_len() {
        return Err(SaaError::SeedLength { model: model.name(), expected: model.seed_len(), got: seeds.len() });
    }
    Ok(())
}

/// Run `key.repetitions` spreads under `arrest` and draw their detection flags.
/// `context` is mixed into every stream seed; fixed-horizon batches pass `&[]`.
pub(crate) fn run_batch(
    graph: &Graph,
    key: &SimulationKey,
    context: &[u8],
    arrest: Arrest,
    seeds: &[u64],
    max_steps: usize,
) -> Result<SampleSet> {
    let labels: Vec<NodeId> = graph.vertices().collect();
    let mut streams = Streams::with_context(key, context, seeds)?;

    // initial locations are drawn up front so the other streams stay aligned
    let starts: Vec<NodeId> = (0..key.repetitions)
        .map(|_| labels[streams.initial.gen_range(0..labels.len())])
        .collect();

    let mut set = SampleSet {
        paths: Vec::with_capacity(key.repetitions),
        detections: Vec::with_capacity(key.repetitions),
        steps: Vec::with_capacity(key.repetitions),
    };

    let p = key.transmissability;
    for start in starts {
        let (path, steps) = match key.model {
            SpreadModel::Tn11c => {
                let nb = required(&mut streams.neighbor, key.model)?;
                spread_tn11c(graph, start, arrest, max_steps, nb)?
            }
            SpreadModel::Tn1pc => {
                let nb = required(&mut streams.neighbor, key.model)?;
                let tx = required(&mut streams.transmission, key.model)?;
                spread_tn1pc(graph, start, arrest, max_steps, p, nb, tx)?
            }
            SpreadModel::Ra1pc => {
                let nb = required(&mut streams.neighbor, key.model)?;
                let tx = required(&mut streams.transmission, key.model)?;
                spread_ra1pc(graph, start, arrest, max_steps, p, nb, tx)?
            }
            SpreadModel::Raepc => {
                let tx = required(&mut streams.transmission, key.model)?;
                spread_raepc(graph, start, arrest, max_steps, p, tx)?
            }
        };
        set.detections.push(virtual_detections(path.len(), key.false_negative, &mut streams.detection));
        set.paths.push(path);
        set.steps.push(steps);
    }
    Ok(set)
}

fn required(stream: &mut Option<ChaCha8Rng>, model: SpreadModel) -> Result<&mut ChaCha8Rng> {
    let got = model.seed_len() - 1;
    stream
        .as_mut()
        .ok_or(SaaError::SeedLength { model: model.name(), expected: model.seed_len(), got })
}

/// One Bernoulli(1−r) trial per infected node; perfect detectors skip the draws.
fn virtual_detections(len: usize, r: f64, rng: &mut ChaCha8Rng) -> Vec<u8> {
    if r == 0.0 {
        return vec![1; len];
    }
    (0..len).map(|_| u8::from(rng.gen_bool(1.0 - r))).collect()
}

/*───────────────────────────────────────────────────────────*/
/*  Propagation rules                                        */
/*───────────────────────────────────────────────────────────*/

/// Infection-ordered node set.
struct Infected {
    order: Vec<NodeId>,
    seen: HashSet<NodeId>,
}

impl Infected {
    fn new(start: NodeId) -> Self {
        Self { order: vec![start], seen: HashSet::from([start]) }
    }

    fn infect(&mut self, v: NodeId) {
        if self.seen.insert(v) {
            self.order.push(v);
        }
    }

    #[inline] fn len(&self) -> usize { self.order.len() }
}

fn stalled(arrest: Arrest, steps: usize, max_steps: usize, infected: usize) -> Result<()> {
    match arrest {
        Arrest::InfectionTarget(target) if steps >= max_steps => {
            Err(SaaError::SpreadStalled { infected, target, steps })
        }
        _ => Ok(()),
    }
}

/// Single-carrier chain: the carrier passes the contagion to a uniformly
/// chosen neighbour each step. A carrier without neighbours keeps it.
fn spread_tn11c(
    graph: &Graph,
    start: NodeId,
    arrest: Arrest,
    max_steps: usize,
    neighbor: &mut ChaCha8Rng,
) -> Result<(Vec<NodeId>, usize)> {
    let mut infected = Infected::new(start);
    let mut current = start;
    let mut steps = 0usize;

    while !arrest.reached(steps, infected.len()) {
        stalled(arrest, steps, max_steps, infected.len())?;
        let nb = graph.neighbors(current);
        if !nb.is_empty() {
            current = nb[neighbor.gen_range(0..nb.len())];
            infected.infect(current);
        }
        steps += 1;
    }
    Ok((infected.order, steps))
}

/// Single carrier whose hand-over succeeds w.p. `p`. The transmission trial
/// comes first; a neighbour is drawn only when it succeeds, so a failed step
/// leaves the carrier in place.
fn spread_tn1pc(
    graph: &Graph,
    start: NodeId,
    arrest: Arrest,
    max_steps: usize,
    p: f64,
    neighbor: &mut ChaCha8Rng,
    transmission: &mut ChaCha8Rng,
) -> Result<(Vec<NodeId>, usize)> {
    let mut infected = Infected::new(start);
    let mut current = start;
    let mut steps = 0usize;

    while !arrest.reached(steps, infected.len()) {
        stalled(arrest, steps, max_steps, infected.len())?;
        let nb = graph.neighbors(current);
        if !nb.is_empty() && transmission.gen_bool(p) {
            current = nb[neighbor.gen_range(0..nb.len())];
            infected.infect(current);
        }
        steps += 1;
    }
    Ok((infected.order, steps))
}

/// Every carrier contacts one random neighbour; contacts succeed w.p. `p`.
/// Successes of a step are applied together once the step is over.
fn spread_ra1pc(
    graph: &Graph,
    start: NodeId,
    arrest: Arrest,
    max_steps: usize,
    p: f64,
    neighbor: &mut ChaCha8Rng,
    transmission: &mut ChaCha8Rng,
) -> Result<(Vec<NodeId>, usize)> {
    let mut infected = Infected::new(start);
    let mut steps = 0usize;
    let mut fresh = Vec::new();

    while !arrest.reached(steps, infected.len()) {
        stalled(arrest, steps, max_steps, infected.len())?;
        fresh.clear();
        for &u in &infected.order {
            let nb = graph.neighbors(u);
            if nb.is_empty() { continue; }
            let target = nb[neighbor.gen_range(0..nb.len())];
            if transmission.gen_bool(p) {
                fresh.push(target);
            }
        }
        for &v in &fresh {
            infected.infect(v);
        }
        steps += 1;
    }
    Ok((infected.order, steps))
}

/// Every carrier contacts each of its neighbours; each contact succeeds w.p. `p`.
fn spread_raepc(
    graph: &Graph,
    start: NodeId,
    arrest: Arrest,
    max_steps: usize,
    p: f64,
    transmission: &mut ChaCha8Rng,
) -> Result<(Vec<NodeId>, usize)> {
    let mut infected = Infected::new(start);
    let mut steps = 0usize;
    let mut fresh = Vec::new();

    while !arrest.reached(steps, infected.len()) {
        stalled(arrest, steps, max_steps, infected.len())?;
        fresh.clear();
        for &u in &infected.order {
            for &w in graph.neighbors(u) {
                if transmission.gen_bool(p) {
                    fresh.push(w);
                }
            }
        }
        for &v in &fresh {
            infected.infect(v);
        }
        steps += 1;
    }
    Ok((infected.order, steps))
}

/*───────────────────────────────────────────────────────────*/
/*  Simulation store                                         */
/*───────────────────────────────────────────────────────────*/

/// Sample sets keyed by [`SimulationKey`].
#[derive(Clone, Debug, Default)]
pub struct SimulationRuns {
    runs: HashMap<SimulationKey, SampleSet>,
    max_steps: Option<usize>,
}

impl SimulationRuns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stall guard used by target-arrested spreads (default: `Params::default()`).
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    #[inline] pub fn len(&self) -> usize { self.runs.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.runs.is_empty() }

    pub fn get(&self, key: &SimulationKey) -> Option<&SampleSet> {
        self.runs.get(key)
    }

    pub fn contains(&self, key: &SimulationKey) -> bool {
        self.runs.contains_key(key)
    }

    /// Store externally produced samples (e.g. loaded from disk).
    pub fn insert(&mut self, key: SimulationKey, samples: SampleSet) -> Option<SampleSet> {
        self.runs.insert(key, samples)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SimulationKey, &SampleSet)> {
        self.runs.iter()
    }

    /// Simulate `R` fixed-horizon runs for every `(t₀, R)` pair, replacing any
    /// samples already stored under the same key.
    pub fn simulate(
        &mut self,
        graph: &Graph,
        model: SpreadModel,
        horizons: &[(usize, usize)],
        r: f64,
        p: f64,
        seeds: &[u64],
    ) -> Result<()> {
        check_inputs(graph, model, r, p, seeds)?;
        let max_steps = self.max_steps.unwrap_or_else(|| Params::default().max_spread_steps);

        for &(time_step, repetitions) in horizons {
            let key = SimulationKey {
                model,
                network: graph.name().to_string(),
                time_step,
                repetitions,
                false_negative: r,
                transmissability: p,
            };
            info!(model = %model, network = graph.name(), t0 = time_step, runs = repetitions, r, p,
                  "simulating spread");
            let set = run_batch(graph, &key, &[], Arrest::Steps(time_step), seeds, max_steps)?;
            debug!(mean_infected = set.paths.iter().map(Vec::len).sum::<usize>() as f64
                       / repetitions.max(1) as f64,
                   "simulation finished");
            self.runs.insert(key, set);
        }
        Ok(())
    }

    /// Like [`simulate`](Self::simulate) but only for pairs not stored yet.
    /// Returns `true` when anything new was simulated.
    pub fn simulate_only_necessary(
        &mut self,
        graph: &Graph,
        model: SpreadModel,
        horizons: &[(usize, usize)],
        r: f64,
        p: f64,
        seeds: &[u64],
    ) -> Result<bool> {
        let missing: Vec<(usize, usize)> = horizons
            .iter()
            .copied()
            .filter(|&(time_step, repetitions)| {
                !self.runs.contains_key(&SimulationKey {
                    model,
                    network: graph.name().to_string(),
                    time_step,
                    repetitions,
                    false_negative: r,
                    transmissability: p,
                })
            })
            .collect();

        if missing.is_empty() {
            return Ok(false);
        }
        info!(pairs = ?missing, "running additional simulations");
        self.simulate(graph, model, &missing, r, p, seeds)?;
        Ok(true)
    }
}

/*──────────────────────── tests ───────────────────────────*/
