//! Fleet-wide views

use anyhow::Result;
use colored::Colorize;

use crate::client::{ApiClient, FleetMetrics, ViolationList};
use crate::commands::agents::ViolationRow;
use crate::output::{
    format_latency, format_timestamp, format_uptime, print_json, print_table, OutputFormat,
};

pub async fn show_violations(client: &ApiClient, hours: u32, format: OutputFormat) -> Result<()> {
    let result: ViolationList = client.get(&format!("violations?hours={}", hours)).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!(
                "{}",
                format!("Violations in the last {}h: {}", result.hours, result.total).bold()
            );
            let rows: Vec<ViolationRow> = result.violations.iter().map(ViolationRow::from).collect();
            print_table(&rows, "No violations in this window");
        }
    }

    Ok(())
}

pub async fn show_metrics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let m: FleetMetrics = client.get("metrics").await?;

    match format {
        OutputFormat::Json => print_json(&m)?,
        OutputFormat::Table => {
            println!("{}", "Workers".bold());
            println!("{}", "-".repeat(50));
            println!("Total:                  {}", m.total_workers);
            println!("Healthy:                {}", m.healthy.to_string().green());
            println!("Degraded:               {}", m.degraded.to_string().yellow());
            println!("Down:                   {}", m.down.to_string().red());
            println!("Avg latency:            {}", format_latency(m.avg_response_time_ms));
            println!("Avg uptime:             {}", format_uptime(m.uptime_percent));
            println!();

            println!("{}", "Agents".bold());
            println!("{}", "-".repeat(50));
            println!("Total:                  {}", m.total_agents);
            println!("Healthy:                {}", m.agents_healthy.to_string().green());
            println!("Suspicious:             {}", m.suspicious.to_string().yellow());
            println!("Stopped:                {}", m.stopped.to_string().red());
            println!();

            println!("{}", "Last 24h".bold());
            println!("{}", "-".repeat(50));
            println!("Violations:             {}", m.total_violations_24h);
            println!("Critical:               {}", m.critical_alerts_24h);
            println!();
            println!("As of: {}", format_timestamp(&m.timestamp).dimmed());
        }
    }

    Ok(())
}
