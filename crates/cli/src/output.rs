//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a table
pub fn print_table<T: Tabled>(rows: &[T], empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_latency(ms: f64) -> String {
    if ms >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        format!("{:.0}ms", ms)
    }
}

pub fn format_uptime(percent: f64) -> String {
    let formatted = format!("{:.2}%", percent);
    if percent >= 99.0 {
        formatted.green().to_string()
    } else if percent >= 90.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

pub fn format_timestamp(ts: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        ts.to_string()
    }
}

pub fn format_last_check(ts: Option<&str>) -> String {
    ts.map(format_timestamp)
        .unwrap_or_else(|| "never".to_string())
}

/// Color a worker or agent status
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" => status.green().to_string(),
        "degraded" | "suspicious" => status.yellow().to_string(),
        "down" => status.red().to_string(),
        "stopped" => status.red().bold().to_string(),
        "unknown" => status.dimmed().to_string(),
        _ => status.to_string(),
    }
}

pub fn color_threat(level: &str) -> String {
    match level.to_lowercase().as_str() {
        "low" => level.green().to_string(),
        "medium" => level.yellow().to_string(),
        "high" => level.red().to_string(),
        "critical" => level.red().bold().to_string(),
        _ => level.to_string(),
    }
}

pub fn color_severity(severity: &str) -> String {
    match severity.to_lowercase().as_str() {
        "warning" => severity.yellow().to_string(),
        "critical" => severity.red().bold().to_string(),
        _ => severity.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_latency() {
        assert_eq!(format_latency(120.4), "120ms");
        assert_eq!(format_latency(1500.0), "1.50s");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-05-01T10:00:00Z"), "2024-05-01 10:00:00");
        assert_eq!(format_timestamp("garbage"), "garbage");
        assert_eq!(format_last_check(None), "never");
    }

    #[test]
    fn test_color_status_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(color_status("suspicious"), "suspicious");
        assert_eq!(color_threat("critical"), "critical");
        assert_eq!(color_severity("warning"), "warning");
    }
}
