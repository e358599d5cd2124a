// src/params.rs
//! Experiment identity and tunables.
//!
//! A [`ParameterKey`] is the seven-field tuple that names one SAA instance:
//! spread model, network, time horizon t₀, repetitions R, false-negative
//! probability r, transmissability p and honeypot budget k.  It is the only
//! key of the result cache and, minus k, of the simulation store.
//!
//! [`Params`] holds the knobs that are *not* part of an experiment's identity.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SaaError};

/// Propagation rule of a simulated contagion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpreadModel {
    /// Single carrier hands the contagion to one random neighbour per step.
    #[serde(rename = "TN11C")]
    Tn11c,
    /// Single carrier; each step the hand-over to a random neighbour succeeds w.p. p.
    #[serde(rename = "TN1PC")]
    Tn1pc,
    /// Every carrier contacts one random neighbour per step, success w.p. p.
    #[serde(rename = "RA1PC")]
    Ra1pc,
    /// Every carrier contacts every neighbour per step, each success w.p. p.
    #[serde(rename = "RAEPC")]
    Raepc,
}

impl SpreadModel {
    pub const ALL: [SpreadModel; 4] =
        [SpreadModel::Tn11c, SpreadModel::Tn1pc, SpreadModel::Ra1pc, SpreadModel::Raepc];

    pub fn name(self) -> &'static str {
        match self {
            SpreadModel::Tn11c => "TN11C",
            SpreadModel::Tn1pc => "TN1PC",
            SpreadModel::Ra1pc => "RA1PC",
            SpreadModel::Raepc => "RAEPC",
        }
    }

    /// Number of independent random streams (and therefore seeds) the model uses.
    pub fn seed_len(self) -> usize {
        match self {
            SpreadModel::Tn11c => 3,
            SpreadModel::Tn1pc => 3,
            SpreadModel::Ra1pc => 4,
            SpreadModel::Raepc => 3,
        }
    }

    /// Whether transmissability takes part in the spread rule.
    pub fn uses_transmissability(self) -> bool {
        !matches!(self, SpreadModel::Tn11c)
    }
}

impl fmt::Display for SpreadModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SpreadModel {
    type Err = SaaError;

    fn from_str(s: &str) -> Result<Self> {
        SpreadModel::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SaaError::UnknownModel(s.to_string()))
    }
}

/// `-0.0` and `0.0` are the same probability; everything else compares by bits.
#[inline]
pub(crate) fn canonical_bits(x: f64) -> u64 {
    if x == 0.0 { 0 } else { x.to_bits() }
}

pub(crate) fn check_false_negative(r: f64) -> Result<()> {
    if (0.0..1.0).contains(&r) {
        Ok(())
    } else {
        Err(SaaError::InvalidProbability { name: "false-negative probability", value: r, range: "[0, 1)" })
    }
}

pub(crate) fn check_transmissability(p: f64) -> Result<()> {
    if p > 0.0 && p <= 1.0 {
        Ok(())
    } else {
        Err(SaaError::InvalidProbability { name: "transmissability", value: p, range: "(0, 1]" })
    }
}

/*───────────────────────── simulation key ─────────────────────────*/

/// Identity of one batch of sample paths: a [`ParameterKey`] without k.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationKey {
    pub model: SpreadModel,
    pub network: String,
    pub time_step: usize,
    pub repetitions: usize,
    pub false_negative: f64,
    pub transmissability: f64,
}

impl SimulationKey {
    /// Byte encoding every derived seed is computed from.
    ///
    /// Layout: model name, `0x00`, network name, `0x00`, then t₀, R, r, p as
    /// little-endian `u64` (floats via their canonical bit pattern).
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.network.len() + 40);
        out.extend_from_slice(self.model.name().as_bytes());
        out.push(0);
        out.extend_from_slice(self.network.as_bytes());
        out.push(0);
        out.extend_from_slice(&(self.time_step as u64).to_le_bytes());
        out.extend_from_slice(&(self.repetitions as u64).to_le_bytes());
        out.extend_from_slice(&canonical_bits(self.false_negative).to_le_bytes());
        out.extend_from_slice(&canonical_bits(self.transmissability).to_le_bytes());
        out
    }
}

impl PartialEq for SimulationKey {
    fn eq(&self, other: &Self) -> bool {
        self.model == other.model
            && self.network == other.network
            && self.time_step == other.time_step
            && self.repetitions == other.repetitions
            && canonical_bits(self.false_negative) == canonical_bits(other.false_negative)
            && canonical_bits(self.transmissability) == canonical_bits(other.transmissability)
    }
}

impl Eq for SimulationKey {}

impl Hash for SimulationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.model.hash(state);
        self.network.hash(state);
        self.time_step.hash(state);
        self.repetitions.hash(state);
        canonical_bits(self.false_negative).hash(state);
        canonical_bits(self.transmissability).hash(state);
    }
}

/*───────────────────────── parameter key ─────────────────────────*/

/// The seven-field experiment identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterKey {
    pub model: SpreadModel,
    pub network: String,
    pub time_step: usize,
    pub repetitions: usize,
    pub false_negative: f64,
    pub transmissability: f64,
    pub honeypots: usize,
}

impl ParameterKey {
    pub fn new(
        model: SpreadModel,
        network: impl Into<String>,
        time_step: usize,
        repetitions: usize,
        false_negative: f64,
        transmissability: f64,
        honeypots: usize,
    ) -> Self {
        Self {
            model,
            network: network.into(),
            time_step,
            repetitions,
            false_negative,
            transmissability,
            honeypots,
        }
    }

    pub fn simulation_key(&self) -> SimulationKey {
        SimulationKey {
            model: self.model,
            network: self.network.clone(),
            time_step: self.time_step,
            repetitions: self.repetitions,
            false_negative: self.false_negative,
            transmissability: self.transmissability,
        }
    }

    /// Probability ranges: r ∈ [0,1) always, p ∈ (0,1] when the model uses it.
    pub fn validate(&self) -> Result<()> {
        check_false_negative(self.false_negative)?;
        if self.model.uses_transmissability() {
            check_transmissability(self.transmissability)?;
        } else if self.transmissability.is_nan() {
            return Err(SaaError::InvalidProbability {
                name: "transmissability",
                value: self.transmissability,
                range: "a number",
            });
        }
        Ok(())
    }
}

impl PartialEq for ParameterKey {
    fn eq(&self, other: &Self) -> bool {
        self.honeypots == other.honeypots && self.simulation_key() == other.simulation_key()
    }
}

impl Eq for ParameterKey {}

impl Hash for ParameterKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.simulation_key().hash(state);
        self.honeypots.hash(state);
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} on {}: t0={} R={} r={} p={} k={}",
            self.model,
            self.network,
            self.time_step,
            self.repetitions,
            self.false_negative,
            self.transmissability,
            self.honeypots
        )
    }
}

/*───────────────────────── tunables ─────────────────────────*/

/// Controls that do not change an experiment's identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Base seeds for TN11C: initial location, neighbour choice, detection.
    pub seeds_tn11c: Vec<u64>,
    /// Base seeds for TN1PC: initial location, neighbour choice, transmission.
    pub seeds_tn1pc: Vec<u64>,
    /// Base seeds for RA1PC: initial location, neighbour, transmission, detection.
    pub seeds_ra1pc: Vec<u64>,
    /// Base seeds for RAEPC: initial location, transmission, detection.
    pub seeds_raepc: Vec<u64>,

    /// Hard cap on spread steps when arresting on an infection target.
    pub max_spread_steps: usize,

    /// Discount factor q of the degree-discount baseline.
    pub discount_q: f64,
}

impl Params {
    pub fn seeds_for(&self, model: SpreadModel) -> &[u64] {
        match model {
            SpreadModel::Tn11c => &self.seeds_tn11c,
            SpreadModel::Tn1pc => &self.seeds_tn1pc,
            SpreadModel::Ra1pc => &self.seeds_ra1pc,
            SpreadModel::Raepc => &self.seeds_raepc,
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        Params {
            seeds_tn11c:      vec![2507, 2101, 3567],
            seeds_tn1pc:      vec![2507, 2101, 3567],
            seeds_ra1pc:      vec![2507, 2101, 2101, 3567],
            seeds_raepc:      vec![2507, 2101, 3567],
            max_spread_steps: 1_000_000,
            discount_q:       0.01,
        }
    }
}
