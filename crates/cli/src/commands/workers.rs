//! Worker commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, WorkerDetail, WorkerList};
use crate::output::{
    color_status, format_last_check, format_latency, format_timestamp, format_uptime, print_json,
    print_table, OutputFormat,
};

#[derive(Tabled)]
struct WorkerRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Latency")]
    latency: String,
    #[tabled(rename = "Uptime")]
    uptime: String,
    #[tabled(rename = "Last Check")]
    last_check: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Time")]
    timestamp: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Code")]
    code: String,
    #[tabled(rename = "Latency")]
    latency: String,
}

pub async fn list_workers(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: WorkerList = client.get("workers").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let rows: Vec<WorkerRow> = result
                .workers
                .iter()
                .map(|w| WorkerRow {
                    name: w.name.clone(),
                    category: w.category.clone(),
                    status: color_status(&w.status),
                    latency: format_latency(w.response_time_ms),
                    uptime: format_uptime(w.uptime_percent),
                    last_check: format_last_check(w.last_check.as_deref()),
                })
                .collect();
            print_table(&rows, "No workers configured");
        }
    }

    Ok(())
}

pub async fn show_worker(client: &ApiClient, name: &str, format: OutputFormat) -> Result<()> {
    let result: WorkerDetail = client.get(&format!("workers/{}", name)).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let w = &result.record;
            println!("{}", format!("Worker: {}", w.name).bold());
            println!("{}", "=".repeat(50));
            println!("URL:          {}", w.url);
            println!("Category:     {}", w.category);
            println!("Status:       {}", color_status(&w.status));
            println!("Latency:      {}", format_latency(w.response_time_ms));
            println!("Uptime:       {}", format_uptime(w.uptime_percent));
            println!("Last check:   {}", format_last_check(w.last_check.as_deref()));
            if !w.error.is_empty() {
                println!("Error:        {}", w.error.red());
            }
            println!();

            println!("{}", "Recent History".bold());
            let rows: Vec<HistoryRow> = result
                .history
                .iter()
                .map(|h| HistoryRow {
                    timestamp: format_timestamp(&h.timestamp),
                    status: color_status(&h.status),
                    code: h
                        .status_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    latency: format_latency(h.response_time_ms),
                })
                .collect();
            print_table(&rows, "No history recorded yet");
        }
    }

    Ok(())
}
