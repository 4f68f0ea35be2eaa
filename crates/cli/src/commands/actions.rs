//! Control commands: manual cycles and emergency stop

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, StopReceipt, TriggerResponse};
use crate::output::{print_info, print_json, print_success, OutputFormat};

pub async fn check_workers(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: TriggerResponse = client.post("check/all").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&format!("Health check queued for {} workers", result.targets))
        }
    }

    Ok(())
}

pub async fn monitor_agents(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: TriggerResponse = client.post("monitor/all").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&format!("Supervision pass queued for {} agents", result.targets))
        }
    }

    Ok(())
}

pub async fn stop_agent(client: &ApiClient, name: &str, format: OutputFormat) -> Result<()> {
    let result: StopReceipt = client.post(&format!("stop/{}", name)).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                "EMERGENCY STOP".red().bold(),
                format!("executed for agent {}", result.agent).bold()
            );
            print_info("The agent stays stopped until the supervisor restarts");
        }
    }

    Ok(())
}
