//! Time-step calibration: how many spread steps a model needs to infect a
//! given percentage of the network.  Used to pick a sensible t₀ before
//! running fixed-horizon experiments.

use tracing::info;

use crate::error::{Result, SaaError};
use crate::graph::Graph;
use crate::params::{Params, SimulationKey, SpreadModel};
use crate::simulate::{check_inputs, run_batch, Arrest, SampleSet};

/// Outcome of one calibration batch.
#[derive(Clone, Debug)]
pub struct Calibration {
    pub model: SpreadModel,
    pub percent_infection: f64,
    /// ⌊percent · n / 100⌋, the infection count each run spread until.
    pub target: usize,
    pub samples: SampleSet,
}

impl Calibration {
    /// Steps each run needed to reach the target.
    pub fn steps(&self) -> &[usize] {
        &self.samples.steps
    }

    pub fn mean_steps(&self) -> f64 {
        self.samples.mean_steps()
    }
}

/// Spread `repetitions` times until `percent_infection`% of the vertices are
/// infected and report the steps each run took.
pub fn calibrate_time_step(
    graph: &Graph,
    model: SpreadModel,
    percent_infection: f64,
    repetitions: usize,
    p: f64,
    params: &Params,
) -> Result<Calibration> {
    let seeds = params.seeds_for(model);
    check_inputs(graph, model, 0.0, p, seeds)?;

    // NaN fails the range check too
    if !(0.0..=100.0).contains(&percent_infection) {
        return Err(SaaError::InvalidProbability {
            name: "infection percentage",
            value: percent_infection,
            range: "[0, 100]",
        });
    }
    let n = graph.n();
    let target = ((percent_infection * n as f64 * 0.01).floor() as usize).min(n);

    // no t₀ yet: the percentage's full bit pattern salts the seeds instead
    let key = SimulationKey {
        model,
        network: graph.name().to_string(),
        time_step: 0,
        repetitions,
        false_negative: 0.0,
        transmissability: p,
    };
    let context = (percent_infection + 0.0).to_bits().to_le_bytes();
    let samples = run_batch(
        graph,
        &key,
        &context,
        Arrest::InfectionTarget(target),
        seeds,
        params.max_spread_steps,
    )?;

    let cal = Calibration { model, percent_infection, target, samples };
    info!(model = %model, network = graph.name(), target, mean_steps = cal.mean_steps(),
          "calibrated time step");
    Ok(cal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaching_target_on_ring() {
        let g = Graph::circulant("ring", 20, &[1]);
        let cal = calibrate_time_step(&g, SpreadModel::Raepc, 50.0, 30, 1.0, &Params::default()).unwrap();
        assert_eq!(cal.target, 10);
        // a certain-transmission ball grows by two per step: 1 + 2·5 ≥ 10
        assert!(cal.steps().iter().all(|&s| s == 5));
        approx::assert_relative_eq!(cal.mean_steps(), 5.0);
    }

    #[test]
    fn tn11c_calibration_walks_until_target() {
        let g = Graph::complete("k10", 10);
        let cal = calibrate_time_step(&g, SpreadModel::Tn11c, 40.0, 20, 1.0, &Params::default()).unwrap();
        assert!(cal.samples.paths.iter().all(|p| p.len() >= 4));
        assert!(cal.steps().iter().all(|&s| s >= 3));
    }

    #[test]
    fn tn1pc_calibration_reaches_target() {
        let g = Graph::complete("k10", 10);
        let params = Params::default();
        let cal = calibrate_time_step(&g, SpreadModel::Tn1pc, 50.0, 40, 0.5, &params).unwrap();
        assert_eq!(cal.target, 5);
        assert!(cal.samples.paths.iter().all(|p| p.len() >= 5));
        // four hand-overs at least, and failed trials only add steps
        assert!(cal.steps().iter().all(|&s| s >= 4));
        assert!(cal.mean_steps() > 4.0);

        let certain = calibrate_time_step(&g, SpreadModel::Tn1pc, 50.0, 40, 1.0, &params).unwrap();
        assert!(certain.mean_steps() <= cal.mean_steps());
    }

    #[test]
    fn percentages_outside_range_rejected() {
        let g = Graph::complete("k4", 4);
        let params = Params::default();
        for bad in [150.0, -5.0, f64::NAN] {
            let err = calibrate_time_step(&g, SpreadModel::Ra1pc, bad, 5, 0.5, &params).unwrap_err();
            assert!(matches!(err, SaaError::InvalidProbability { name: "infection percentage", .. }));
        }
        let full = calibrate_time_step(&g, SpreadModel::Raepc, 100.0, 5, 1.0, &params).unwrap();
        assert_eq!(full.target, 4);
    }

    #[test]
    fn nearby_percentages_draw_different_streams() {
        let g = Graph::circulant("ring", 40, &[1, 3]);
        let params = Params::default();
        let a = calibrate_time_step(&g, SpreadModel::Raepc, 50.0, 20, 0.4, &params).unwrap();
        let b = calibrate_time_step(&g, SpreadModel::Raepc, 50.000001, 20, 0.4, &params).unwrap();
        assert_eq!(a.target, b.target);
        assert_ne!(a.samples, b.samples);
    }
}
