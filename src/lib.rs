//! honeypot-saa – honeypot placement by sample-average approximation.
//!
//! Simulate contagion spread, mask it by imperfect detection, pick `k`
//! detector nodes greedily and certify the pick with two upper bounds.
//! Optional PyO3 bindings live behind the `python` feature.

/*───────── modules ─────────*/
pub mod error;
pub mod graph;
pub mod params;
pub mod seed;
pub mod simulate;
pub mod calibrate;
pub mod matrix;
pub mod topk;
pub mod greedy;
pub mod bounds;
pub mod baseline;
pub mod cache;
pub mod pipeline;
pub mod config;

/*───────── re-exports ─────────*/
pub use error::{Result, SaaError};
pub use graph::{Graph, NodeId};
pub use params::{ParameterKey, Params, SimulationKey, SpreadModel};
pub use simulate::{SampleSet, SimulationRuns};
pub use calibrate::{calibrate_time_step, Calibration};
pub use matrix::DetectionMatrix;
pub use greedy::{greedy_max_coverage, Coverage};
pub use bounds::Bounds;
pub use cache::{AlgorithmOutput, ReportRow, ResultCache};
pub use pipeline::{run_saa, run_saa_parallel, simulate_for_keys, RunSummary, Solver};
pub use config::ExperimentConfig;

/*======================================================================
│  Python functions
└=====================================================================*/

#[cfg(feature = "python")]
mod python {
    use std::fs::File;

    use pyo3::exceptions::{PyIOError, PyValueError};
    use pyo3::prelude::*;
    use pyo3::types::PyModule;
    use pyo3::wrap_pyfunction;

    use crate::pipeline::{simulate_for_keys, solve_key, GreedySolver};
    use crate::{calibrate_time_step, Graph, ParameterKey, Params, SaaError, SimulationRuns};

    fn to_py(e: SaaError) -> PyErr {
        match e {
            SaaError::Io(io) => PyIOError::new_err(io.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }

    fn load(graph_path: &str, delimiter: &str) -> PyResult<Graph> {
        let name = std::path::Path::new(graph_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| graph_path.to_string());
        let file = File::open(graph_path).map_err(|e| PyIOError::new_err(e.to_string()))?;
        let graph = Graph::parse_edge_list(name, file, delimiter).map_err(to_py)?;
        Ok(graph.largest_component())
    }

    /// Greedy SAA – returns (objective, honeypots, a-priori UB, posterior UB).
    #[pyfunction]
    #[pyo3(text_signature = "(graph_path, model, time_step, repetitions, false_negative, transmissability, k)")]
    fn solve_greedy_py(
        graph_path: String,
        model: String,
        time_step: usize,
        repetitions: usize,
        false_negative: f64,
        transmissability: f64,
        k: usize,
    ) -> PyResult<(f64, Vec<u32>, f64, f64)> {
        let graph = load(&graph_path, ",")?;
        let model = model.parse().map_err(to_py)?;
        let key = ParameterKey::new(model, graph.name(), time_step, repetitions, false_negative, transmissability, k);

        let mut runs = SimulationRuns::new();
        simulate_for_keys(&graph, &mut runs, std::slice::from_ref(&key), &Params::default()).map_err(to_py)?;
        let out = solve_key(&graph, &runs, &key, &GreedySolver)
            .map_err(to_py)?
            .ok_or_else(|| PyValueError::new_err("simulation produced no samples"))?;
        Ok((out.objective, out.honeypots, out.a_priori_ub, out.posterior_ub))
    }

    /// Mean number of steps to infect `percent` % of the network.
    #[pyfunction]
    #[pyo3(text_signature = "(graph_path, model, percent, repetitions, transmissability)")]
    fn calibrate_py(
        graph_path: String,
        model: String,
        percent: f64,
        repetitions: usize,
        transmissability: f64,
    ) -> PyResult<f64> {
        let graph = load(&graph_path, ",")?;
        let model = model.parse().map_err(to_py)?;
        let cal = calibrate_time_step(&graph, model, percent, repetitions, transmissability, &Params::default())
            .map_err(to_py)?;
        Ok(cal.mean_steps())
    }

    /// Helper: parse an edge list, return (n, m) of its largest component.
    #[pyfunction]
    #[pyo3(text_signature = "(graph_path, delimiter)")]
    fn parse_edge_list_py(graph_path: String, delimiter: String) -> PyResult<(usize, usize)> {
        let graph = load(&graph_path, &delimiter)?;
        Ok((graph.n(), graph.m()))
    }

    /// Module name `_native` must match `pyproject.toml -> module-name`.
    #[pymodule]
    fn _native(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(solve_greedy_py, m)?)?;
        m.add_function(wrap_pyfunction!(calibrate_py, m)?)?;
        m.add_function(wrap_pyfunction!(parse_edge_list_py, m)?)?;
        Ok(())
    }
}
