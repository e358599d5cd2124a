//! `honeypot-saa` command line.
//!
//! ```text
//! honeypot-saa run --config experiment.json
//! honeypot-saa calibrate --graph net.csv --model RAEPC --percent 10 --repetitions 500 -p 0.5
//! ```
//!
//! Report rows go to stdout as JSON lines; logs go to stderr (`RUST_LOG`).

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use honeypot_saa::pipeline::{run_saa, run_saa_parallel, simulate_for_keys};
use honeypot_saa::{calibrate_time_step, ExperimentConfig, Graph, Params, ResultCache, Result, SimulationRuns, SpreadModel};

#[derive(Parser, Debug)]
#[command(name = "honeypot-saa", version, about = "Honeypot placement by sample-average approximation")]
struct Cli {
    /// Log filter, overridden by RUST_LOG.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate, solve and bound every key of an experiment file.
    Run {
        #[arg(long)]
        config: PathBuf,
        /// Solve keys on the rayon pool.
        #[arg(long)]
        parallel: bool,
    },
    /// Steps a model needs to infect a percentage of the network.
    Calibrate {
        #[arg(long)]
        graph: PathBuf,
        #[arg(long, default_value = ",")]
        delimiter: String,
        #[arg(long)]
        model: SpreadModel,
        #[arg(long)]
        percent: f64,
        #[arg(long, default_value_t = 100)]
        repetitions: usize,
        #[arg(short = 'p', long, default_value_t = 1.0)]
        transmissability: f64,
    },
}

fn load_graph(path: &Path, name: String, delimiter: &str, largest_component: bool) -> Result<Graph> {
    let graph = Graph::parse_edge_list(name, File::open(path)?, delimiter)?;
    let graph = if largest_component { graph.largest_component() } else { graph };
    info!(network = graph.name(), n = graph.n(), m = graph.m(), avg_degree = graph.average_degree(),
          "graph loaded");
    Ok(graph)
}

fn run(config: &Path, parallel: bool) -> Result<()> {
    let cfg = ExperimentConfig::load(config)?;
    let graph = load_graph(&cfg.graph, cfg.network_name(), &cfg.delimiter, cfg.largest_component)?;
    let keys = cfg.keys(graph.name());

    let mut runs = SimulationRuns::new().with_max_steps(cfg.params.max_spread_steps);
    simulate_for_keys(&graph, &mut runs, &keys, &cfg.params)?;

    let solver = cfg.solver();
    let mut cache = ResultCache::new();
    let summary = if parallel || cfg.parallel {
        run_saa_parallel(&graph, &runs, &keys, solver.as_ref(), &mut cache)?
    } else {
        run_saa(&graph, &runs, &keys, solver.as_ref(), &mut cache)?
    };
    info!(solved = summary.solved.len(), skipped = summary.skipped.len(), "run finished");

    let mut out = io::stdout().lock();
    for row in cache.report_rows(Utc::now()) {
        serde_json::to_writer(&mut out, &row)?;
        writeln!(out)?;
    }
    Ok(())
}

fn calibrate(graph: &Path, delimiter: &str, model: SpreadModel, percent: f64, repetitions: usize, p: f64) -> Result<()> {
    let name = graph
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "network".to_string());
    let graph = load_graph(graph, name, delimiter, true)?;
    let cal = calibrate_time_step(&graph, model, percent, repetitions, p, &Params::default())?;

    let report = serde_json::json!({
        "model": cal.model,
        "network": graph.name(),
        "percent_infection": cal.percent_infection,
        "target": cal.target,
        "mean_steps": cal.mean_steps(),
        "steps": cal.steps(),
    });
    writeln!(io::stdout().lock(), "{report}")?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(io::stderr).compact().init();

    let outcome = match cli.command {
        Command::Run { config, parallel } => run(&config, parallel),
        Command::Calibrate { graph, delimiter, model, percent, repetitions, transmissability } => {
            calibrate(&graph, &delimiter, model, percent, repetitions, transmissability)
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "aborted");
            ExitCode::FAILURE
        }
    }
}
