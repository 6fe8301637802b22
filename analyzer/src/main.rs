use anyhow::Context;
use clap::{Parser, ValueEnum};
use generator::profile::{ExperimentProfile, SyntheticExperiment};
use motecore::powertracker::{IncompletePolicy, SyncStrategy};
use render_bridge::bridge::RenderBridge;
use render_bridge::model::RenderModel;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod render_bridge;
mod workflow;

#[derive(Clone, Copy, ValueEnum)]
enum SyncArg {
    Keyed,
    Lockstep,
}

impl From<SyncArg> for SyncStrategy {
    fn from(arg: SyncArg) -> Self {
        match arg {
            SyncArg::Keyed => SyncStrategy::Keyed,
            SyncArg::Lockstep => SyncStrategy::Lockstep,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Cooja experiment parser: power records and DODAG")]
struct Args {
    /// Experiment directory holding simulation.csc and data/
    experiment: Option<PathBuf>,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Platform tags accepted in PowerTracker lines (comma separated)
    #[arg(long, value_delimiter = ',')]
    platforms: Vec<String>,
    #[arg(long, value_enum)]
    sync: Option<SyncArg>,
    /// Fail when a PowerTracker cycle lacks a category
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Decode data/output.pcap with tshark
    #[arg(long, default_value_t = false)]
    pcap: bool,
    /// Write a synthetic experiment into this directory, then parse it
    #[arg(long)]
    synthesize: Option<PathBuf>,
    #[arg(long, default_value_t = 8)]
    motes: u32,
    #[arg(long, default_value_t = 5)]
    cycles: u32,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Keep the render bridge alive for an external renderer
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(
            args.platforms.clone(),
            args.sync.map(Into::into).unwrap_or_default(),
            args.pcap,
        )
    };
    if args.workflow.is_some() {
        if !args.platforms.is_empty() {
            config.platforms = args.platforms.clone();
        }
        if let Some(sync) = args.sync {
            config.sync = sync.into();
        }
        config.decode_capture |= args.pcap;
    }
    if args.strict {
        config.incomplete = IncompletePolicy::Fail;
    }

    let experiment = if let Some(target) = &args.synthesize {
        let profile = ExperimentProfile {
            motes: args.motes,
            cycles: args.cycles,
            seed: args.seed,
            ..Default::default()
        };
        let synthetic = SyntheticExperiment::generate(&profile)?;
        synthetic
            .write_to(target)
            .with_context(|| format!("synthesizing experiment in {}", target.display()))?;
        println!(
            "synthesized {} motes, {} links in {}",
            synthetic.positions.len(),
            synthetic.parents.len(),
            target.display()
        );
        target.clone()
    } else {
        args.experiment
            .clone()
            .context("an experiment directory (or --synthesize) is required")?
    };

    let runner = Runner::new(config.clone());
    let result = runner
        .execute(&experiment)
        .with_context(|| format!("parsing experiment {}", experiment.display()))?;

    println!(
        "{} -> power records {}, relationship events {}, motes {}, links {}, adversarial {}",
        experiment.display(),
        result.records.len(),
        result.history.len(),
        result.graph.nodes.len(),
        result.graph.edges.len(),
        result.graph.adversarial
    );
    if let Some(packets) = &result.packets {
        println!("decoded packets {}", packets.len());
    }
    if !result.report.is_clean() {
        println!(
            "warning: {} incomplete power cycles, {} mixed lockstep steps",
            result.report.incomplete.len(),
            result.report.divergences.len()
        );
    }
    for output in &result.outputs {
        println!("wrote {}", output.display());
    }

    if args.serve {
        let bridge = RenderBridge::new();
        bridge.publish(RenderModel::from(&result))?;
        let address = bridge.serve(config.bind)?;
        bridge.publish_status(&format!(
            "serving http://{}/dodag (Ctrl+C to stop)...",
            address
        ));
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
