//! Fleet Supervisor CLI
//!
//! A command-line tool for inspecting worker and agent status, reviewing
//! policy violations and issuing control actions against a supervisor.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{actions, agents, fleet, workers};

/// Fleet Supervisor CLI
#[derive(Parser)]
#[command(name = "fleetctl")]
#[command(author, version, about = "CLI for the Fleet Supervisor", long_about = None)]
pub struct Cli {
    /// Supervisor API URL (can also be set via FLEET_API_URL env var)
    #[arg(long, env = "FLEET_API_URL", default_value = "http://localhost:6004")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect probed workers
    #[command(subcommand)]
    Workers(WorkerCommands),

    /// Inspect supervised agents
    #[command(subcommand)]
    Agents(AgentCommands),

    /// List policy violations across all agents
    Violations {
        /// Trailing window in hours
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },

    /// Show fleet-wide aggregates
    Metrics,

    /// Queue an immediate health check of every worker
    Check,

    /// Queue an immediate supervision pass over every agent
    Monitor,

    /// Emergency-stop an agent (irreversible until restart)
    Stop {
        /// Agent name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum WorkerCommands {
    /// List all workers with their current status
    List,
    /// Show a worker with its recent probe history
    Show {
        /// Worker name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum AgentCommands {
    /// List all agents with their current status
    List,
    /// Show an agent with its recent violations
    Show {
        /// Agent name
        name: String,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Workers(cmd) => match cmd {
            WorkerCommands::List => workers::list_workers(&client, cli.format).await?,
            WorkerCommands::Show { name } => {
                workers::show_worker(&client, &name, cli.format).await?
            }
        },
        Commands::Agents(cmd) => match cmd {
            AgentCommands::List => agents::list_agents(&client, cli.format).await?,
            AgentCommands::Show { name } => agents::show_agent(&client, &name, cli.format).await?,
        },
        Commands::Violations { hours } => fleet::show_violations(&client, hours, cli.format).await?,
        Commands::Metrics => fleet::show_metrics(&client, cli.format).await?,
        Commands::Check => actions::check_workers(&client, cli.format).await?,
        Commands::Monitor => actions::monitor_agents(&client, cli.format).await?,
        Commands::Stop { name } => actions::stop_agent(&client, &name, cli.format).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
