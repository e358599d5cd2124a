//! Error type shared by every stage of the SAA pipeline.

use thiserror::Error;

use crate::graph::NodeId;

#[derive(Debug, Error)]
pub enum SaaError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed edge on line {line}: {content:?}")]
    MalformedEdge { line: usize, content: String },

    #[error("node labels must be non-negative, got {0}")]
    NegativeLabel(i64),

    #[error("label {0} cannot be shifted past the id range")]
    LabelOverflow(NodeId),

    #[error("graph has self-loops")]
    SelfLoops,

    #[error("graph has no vertices")]
    EmptyGraph,

    #[error("vertex {0} is not in the graph")]
    UnknownVertex(NodeId),

    #[error("unknown spread model {0:?}")]
    UnknownModel(String),

    #[error("{model} expects {expected} seeds, got {got}")]
    SeedLength {
        model: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("invalid {name}: {value} (expected {range})")]
    InvalidProbability {
        name: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("budget of {k} honeypots exceeds the {available} candidate nodes")]
    BudgetTooLarge { k: usize, available: usize },

    #[error("parameters are for network {expected:?} but graph is {got:?}")]
    NetworkMismatch { expected: String, got: String },

    #[error("spread stalled at {infected} infected after {steps} steps (target {target})")]
    SpreadStalled {
        infected: usize,
        target: usize,
        steps: usize,
    },

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SaaError>;
