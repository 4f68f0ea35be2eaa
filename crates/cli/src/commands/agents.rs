//! Agent commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{AgentDetail, AgentList, ApiClient, Violation};
use crate::output::{
    color_severity, color_status, color_threat, format_last_check, format_timestamp,
    format_uptime, print_json, print_table, OutputFormat,
};

#[derive(Tabled)]
struct AgentRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Threat")]
    threat: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Recent Violations")]
    violations: String,
}

#[derive(Tabled)]
pub(crate) struct ViolationRow {
    #[tabled(rename = "Time")]
    pub timestamp: String,
    #[tabled(rename = "Agent")]
    pub agent: String,
    #[tabled(rename = "Policy")]
    pub policy: String,
    #[tabled(rename = "Severity")]
    pub severity: String,
    #[tabled(rename = "Details")]
    pub details: String,
    #[tabled(rename = "Action")]
    pub action: String,
}

impl From<&Violation> for ViolationRow {
    fn from(v: &Violation) -> Self {
        Self {
            timestamp: format_timestamp(&v.timestamp),
            agent: v.agent.clone(),
            policy: v.policy.clone(),
            severity: color_severity(&v.severity),
            details: v.details.clone(),
            action: v.action_taken.clone(),
        }
    }
}

pub async fn list_agents(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: AgentList = client.get("agents").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let rows: Vec<AgentRow> = result
                .agents
                .iter()
                .map(|a| AgentRow {
                    name: a.record.name.clone(),
                    category: a.record.category.clone(),
                    status: color_status(&a.record.status),
                    threat: a
                        .record
                        .threat_level
                        .as_deref()
                        .map(color_threat)
                        .unwrap_or_else(|| "-".to_string()),
                    uptime: format_uptime(a.record.uptime_percent),
                    violations: if a.violations.is_empty() {
                        "-".to_string()
                    } else {
                        a.violations.join(", ")
                    },
                })
                .collect();
            print_table(&rows, "No agents configured");
        }
    }

    Ok(())
}

pub async fn show_agent(client: &ApiClient, name: &str, format: OutputFormat) -> Result<()> {
    let result: AgentDetail = client.get(&format!("agents/{}", name)).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let a = &result.record;
            println!("{}", format!("Agent: {}", a.name).bold());
            println!("{}", "=".repeat(50));
            println!("URL:          {}", a.url);
            println!("Category:     {}", a.category);
            println!("Status:       {}", color_status(&a.status));
            if let Some(threat) = &a.threat_level {
                println!("Threat level: {}", color_threat(threat));
            }
            println!("Uptime:       {}", format_uptime(a.uptime_percent));
            println!("Last check:   {}", format_last_check(a.last_check.as_deref()));
            if !a.error.is_empty() {
                println!("Error:        {}", a.error.red());
            }
            println!();

            println!("{}", "Recent Violations".bold());
            let rows: Vec<ViolationRow> = result.violations.iter().map(ViolationRow::from).collect();
            print_table(&rows, "No violations recorded");
        }
    }

    Ok(())
}
