//! `plateful-sim` command-line entry point

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use plateful_core::{PlatefulConfig, UserId};
use plateful_sim::simulator::{run_workload, SimulatedWorld, SimulatorConfig};
use plateful_sim::{logging, run_simulator};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "plateful-sim", version, about = "Plateful ledger simulator")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a randomized workload and audit invariants
    Simulate {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Stop on the first unexpected outcome
        #[arg(long)]
        stop_on_violation: bool,
    },
    /// Run a workload, then print one user's following feed
    Feed {
        #[command(flatten)]
        workload: WorkloadArgs,

        /// Index of the viewing user
        #[arg(long, default_value_t = 0)]
        user: usize,

        /// Feed entries to print
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Args)]
struct WorkloadArgs {
    /// Users to create
    #[arg(long, default_value_t = 20)]
    users: usize,

    /// Operations to run
    #[arg(long, default_value_t = 500)]
    ops: u64,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Operations in flight per batch
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl WorkloadArgs {
    fn simulator_config(&self, stop_on_first_violation: bool) -> anyhow::Result<SimulatorConfig> {
        let app = match &self.config {
            Some(path) => PlatefulConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => PlatefulConfig::default(),
        };
        Ok(SimulatorConfig {
            seed: self.seed,
            users: self.users,
            operations: self.ops,
            concurrency: self.concurrency,
            stop_on_first_violation,
            app,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Command::Simulate {
            workload,
            json,
            stop_on_violation,
        } => {
            let config = workload.simulator_config(stop_on_violation)?;
            let report = run_simulator(config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }
            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Command::Feed {
            workload,
            user,
            limit,
        } => {
            let config = workload.simulator_config(false)?;
            let mut world = SimulatedWorld::seed(&config).await?;
            let report = run_workload(&mut world, config).await;

            let viewer: UserId = world
                .users
                .get(user)
                .cloned()
                .with_context(|| format!("--user {user} out of range"))?;
            let feed = world.app.feed();
            let limit = limit.unwrap_or_else(|| feed.default_limit());
            let entries = feed.feed_for_following(&viewer, limit).await?;

            println!("Feed for {viewer} ({} entries)", entries.len());
            for entry in entries {
                let event = &entry.event;
                println!(
                    "{}  {:<16} {:<17} {}",
                    event.created_at.format("%H:%M:%S%.6f"),
                    entry.actor_name.as_deref().unwrap_or(event.actor_id.as_str()),
                    event.kind,
                    event
                        .restaurant_name
                        .as_deref()
                        .or(event.restaurant_id.as_ref().map(|r| r.as_str()))
                        .unwrap_or("-"),
                );
            }
            if !report.passed() {
                eprintln!("{} invariant violations during workload", report.violations.len());
                std::process::exit(1);
            }
        }
    }
    Ok(())
}
