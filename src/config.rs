//! JSON experiment description consumed by the CLI.
//!
//! ```json
//! {
//!   "graph": "data/net.csv",
//!   "models": ["RAEPC"],
//!   "time_steps": [4], "repetitions": [1000],
//!   "false_negative": [0.0, 0.1], "transmissability": [0.5],
//!   "honeypots": [5, 10]
//! }
//! ```
//!
//! Every combination of the listed values becomes one [`ParameterKey`].

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::{ParameterKey, Params, SpreadModel};
use crate::pipeline::{DegreeCentralitySolver, DegreeDiscountSolver, GreedySolver, Solver};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    Greedy,
    DegreeCentrality,
    DegreeDiscount,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Edge-list file.
    pub graph: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Network name used in keys; defaults to the file stem.
    #[serde(default)]
    pub network: Option<String>,
    /// Restrict the network to its largest connected component first.
    #[serde(default = "default_true")]
    pub largest_component: bool,

    pub models: Vec<SpreadModel>,
    pub time_steps: Vec<usize>,
    pub repetitions: Vec<usize>,
    pub false_negative: Vec<f64>,
    pub transmissability: Vec<f64>,
    pub honeypots: Vec<usize>,

    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub params: Params,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_true() -> bool {
    true
}

impl ExperimentConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn network_name(&self) -> String {
        self.network.clone().unwrap_or_else(|| {
            self.graph
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "network".to_string())
        })
    }

    /// Cartesian product of the listed values, model-major.
    pub fn keys(&self, network: &str) -> Vec<ParameterKey> {
        let mut keys = Vec::new();
        for &model in &self.models {
            for &t0 in &self.time_steps {
                for &reps in &self.repetitions {
                    for &r in &self.false_negative {
                        for &p in &self.transmissability {
                            for &k in &self.honeypots {
                                keys.push(ParameterKey::new(model, network, t0, reps, r, p, k));
                            }
                        }
                    }
                }
            }
        }
        keys
    }

    pub fn solver(&self) -> Box<dyn Solver> {
        match self.algorithm {
            Algorithm::Greedy => Box::new(GreedySolver),
            Algorithm::DegreeCentrality => Box::new(DegreeCentralitySolver),
            Algorithm::DegreeDiscount => Box::new(DegreeDiscountSolver { q: self.params.discount_q }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SaaError;

    const MINIMAL: &str = r#"{
        "graph": "data/testnetwork8.csv",
        "models": ["RAEPC", "TN11C"],
        "time_steps": [3],
        "repetitions": [50, 100],
        "false_negative": [0.0],
        "transmissability": [0.5],
        "honeypots": [1, 2]
    }"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = ExperimentConfig::from_json(MINIMAL).unwrap();
        assert_eq!(cfg.delimiter, ",");
        assert!(cfg.largest_component);
        assert_eq!(cfg.algorithm, Algorithm::Greedy);
        assert_eq!(cfg.network_name(), "testnetwork8");
        assert_eq!(cfg.params.seeds_ra1pc, vec![2507, 2101, 2101, 3567]);
        assert_eq!(cfg.solver().name(), "greedy");

        let keys = cfg.keys("testnetwork8");
        assert_eq!(keys.len(), 2 * 2 * 2);
        assert_eq!(keys[0].model, SpreadModel::Raepc);
        assert_eq!((keys[0].repetitions, keys[0].honeypots), (50, 1));
    }

    #[test]
    fn overrides_and_unknown_fields() {
        let cfg = ExperimentConfig::from_json(
            r#"{"graph": "g.txt", "network": "g", "delimiter": "\t", "algorithm": "degree-discount",
                "params": {"discount_q": 0.05},
                "models": [], "time_steps": [], "repetitions": [], "false_negative": [],
                "transmissability": [], "honeypots": []}"#,
        )
        .unwrap();
        assert_eq!(cfg.network_name(), "g");
        assert_eq!(cfg.delimiter, "\t");
        assert_eq!(cfg.solver().name(), "degree-discount");
        approx::assert_relative_eq!(cfg.params.discount_q, 0.05);
        assert_eq!(cfg.params.max_spread_steps, 1_000_000);

        let err = ExperimentConfig::from_json(r#"{"graph": "g", "bogus": 1}"#).unwrap_err();
        assert!(matches!(err, SaaError::Config(_)));
    }
}
