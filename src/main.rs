use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use critical_graphs::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "critical-graphs")]
#[command(about = "Exact vertex/edge k-criticality checks for graph6 graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a single graph given as a graph6 string
    Check {
        /// The graph in graph6 format
        graph6: String,

        /// Target chromatic number (computed when omitted)
        #[arg(long, allow_negative_numbers = true)]
        k: Option<i64>,

        /// Test edge-criticality instead of vertex-criticality
        #[arg(long, action = ArgAction::SetTrue)]
        edge: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Classify every graph in a directory of order{n}_chi{k}.txt files
    Batch {
        /// Corpus directory
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,

        /// Output directory (critical/, not_critical/, errors.txt)
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Test edge-criticality instead of vertex-criticality
        #[arg(long, action = ArgAction::SetTrue)]
        edge: bool,

        /// Recompute chromatic numbers instead of trusting file names
        #[arg(long, action = ArgAction::SetTrue)]
        verify_chi: bool,

        /// Only classify graphs free of these induced subgraphs (e.g. P5,2P2,claw or graph6)
        #[arg(long, value_name = "PATTERNS", value_delimiter = ',')]
        free: Vec<Pattern>,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Validate the bundled known critical graphs (fast, deterministic)
    Validate,
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Engine config TOML file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Per oracle call deadline in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Run removal trials in parallel
    #[arg(long, action = ArgAction::SetTrue)]
    parallel: bool,

    /// Worker threads for parallel removal trials (0 = all cores)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,
}

impl EngineArgs {
    fn into_config(self) -> anyhow::Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if self.timeout_ms.is_some() {
            config.oracle_timeout_ms = self.timeout_ms;
        }
        if self.parallel {
            config.parallel_removals = true;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
            config.parallel_removals = true;
        }
        config.validate()?;
        Ok(config)
    }
}

fn mode_for(edge: bool, config: &EngineConfig) -> CriticalityMode {
    if edge {
        CriticalityMode::Edge
    } else {
        config.mode
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Command::Check {
            graph6,
            k,
            edge,
            engine,
        } => {
            let config = engine.into_config()?;
            let mode = mode_for(edge, &config);
            let engine = CriticalityEngine::new(config)?;
            let graph = parse_graph6(&graph6).with_context(|| format!("decoding {graph6:?}"))?;

            let verdict = match k {
                Some(k) => engine.check_against(&graph, validate_k(k)?, mode)?,
                None => engine.check(&graph, ChromaticHint::Compute, mode)?,
            };
            println!("{graph6}\tn={}\tm={}\t{mode}\t{verdict}", graph.order(), graph.edge_count());
        }
        Command::Batch {
            input,
            output,
            edge,
            verify_chi,
            free,
            engine,
        } => {
            let mut config = engine.into_config()?;
            if verify_chi {
                config.trust_corpus_chi = false;
            }
            let mode = mode_for(edge, &config);
            let engine = CriticalityEngine::new(config)?;

            let report = run_corpus(&input, &output, &engine, mode, &free)
                .with_context(|| format!("classifying {}", input.display()))?;
            println!(
                "{} graphs: {} critical, {} not critical, {} failed, {} filtered ({:.2}s)",
                report.total(),
                report.critical.len(),
                report.not_critical.len(),
                report.failed.len(),
                report.filtered,
                report.elapsed.as_secs_f64()
            );
            println!("Results written to {}", output.display());
        }
        Command::Validate => match validate_known_graphs() {
            Ok(()) => println!("Validation OK: bundled critical graphs are correct."),
            Err(e) => bail!("Validation FAILED: {e}"),
        },
    }
    Ok(())
}
