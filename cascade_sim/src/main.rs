//! Opinion cascade simulator CLI
//!
//! Loads an edge list, then takes lifecycle commands line by line on stdin.
//! Snapshots go to stdout (or `--output`), logs go to stderr.

use cascade_env::{SnapshotSink, TokioContext, WriterSink};
use cascade_sim::{ControlCommand, EdgeSource, Lifecycle, SimConfig, SimError, SimulationController};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Opinion cascade simulator
#[derive(Parser, Debug)]
#[command(name = "cascade-sim")]
#[command(about = "Simulate opinion cascades over a social graph", long_about = None)]
struct Args {
    /// Edge list file, one `src,dst` pair per line
    #[arg(short, long)]
    edges: PathBuf,

    /// Number of nodes (ids 1..=N)
    #[arg(short, long, default_value = "99")]
    nodes: u64,

    /// Master seed for reproducible runs (omit for entropy)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Probability that one edge attempt transmits activation
    #[arg(short, long, default_value = "0.6")]
    p_active: f64,

    /// Seed node ids, comma separated
    #[arg(long, value_delimiter = ',', default_value = "1,24")]
    starters: Vec<u64>,

    /// Delay after each activation in milliseconds
    #[arg(long, default_value = "500")]
    propagation_ms: u64,

    /// Opinion update period in milliseconds
    #[arg(long, default_value = "1000")]
    evolve_ms: u64,

    /// Snapshot period in milliseconds
    #[arg(long, default_value = "500")]
    publish_ms: u64,

    /// Statistics log period in milliseconds (0 = off)
    #[arg(long, default_value = "500")]
    stats_ms: u64,

    /// Write snapshots to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Start the simulation immediately
    #[arg(long)]
    autostart: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> SimConfig {
        let mut config = SimConfig::default()
            .with_edges(EdgeSource::File(self.edges.clone()))
            .with_node_count(self.nodes)
            .with_starters(self.starters.clone())
            .with_p_active(self.p_active)
            .with_timing(
                Duration::from_millis(self.propagation_ms),
                Duration::from_millis(self.evolve_ms),
                Duration::from_millis(self.publish_ms),
            )
            .with_stats_interval(Duration::from_millis(self.stats_ms));
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        config
    }

    async fn sink(&self) -> Result<Arc<dyn SnapshotSink>, SimError> {
        match &self.output {
            Some(path) => Ok(Arc::new(WriterSink::create(path).await?)),
            None => Ok(Arc::new(WriterSink::stdout())),
        }
    }
}

/// Runs one command; returns `false` when the loop should end.
async fn dispatch(controller: &mut SimulationController<TokioContext>, command: ControlCommand) -> bool {
    match command {
        ControlCommand::Start => match controller.start().await {
            Ok(Lifecycle::AlreadyRunning) => warn!("Already running"),
            Ok(_) => {}
            Err(e) => error!("Start failed: {}", e),
        },
        ControlCommand::Pause => {
            if controller.pause().await == Lifecycle::NotRunning {
                warn!("Not running");
            }
        }
        ControlCommand::Resume => {
            if controller.resume().await == Lifecycle::NotPaused {
                warn!("Not paused");
            }
        }
        ControlCommand::Status => match serde_json::to_string(&controller.status()) {
            Ok(status) => info!("Status {}", status),
            Err(e) => warn!("Failed to encode status: {}", e),
        },
        ControlCommand::Reset => {
            controller.reset().await;
        }
        ControlCommand::Quit => return false,
    }
    true
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; stdout carries snapshots
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Opinion cascade simulator v{}", env!("CARGO_PKG_VERSION"));

    let mut controller = match SimulationController::from_config(args.config()) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match args.sink().await {
        Ok(sink) => controller.bind_sink(sink),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    info!("{}", ControlCommand::usage());
    if args.autostart {
        dispatch(&mut controller, ControlCommand::Start).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match line.parse::<ControlCommand>() {
                    Ok(command) => {
                        if !dispatch(&mut controller, command).await {
                            break;
                        }
                    }
                    Err(e) => warn!("{}. {}", e, ControlCommand::usage()),
                },
                // Stdin closed: keep running until interrupted
                Ok(None) => {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Interrupted");
                    }
                    break;
                }
                Err(e) => {
                    error!("Control channel failed: {}", e);
                    break;
                }
            },
        }
    }

    controller.reset().await;
}
