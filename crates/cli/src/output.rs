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

/// Print a list of rows as a table or as JSON
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return Ok(());
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a forecast value, switching to scientific notation for large magnitudes
pub fn format_value(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e9).contains(&magnitude) {
        format!("{:.4e}", value)
    } else {
        format!("{:.4}", value)
    }
}

/// Color an outcome label: model output green, fallbacks yellow
pub fn color_outcome(outcome: &str) -> String {
    match outcome {
        "modeled" => outcome.green().to_string(),
        _ => outcome.yellow().to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" => status.red().to_string(),
        _ => status.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(0.5), "0.5000");
        assert_eq!(format_value(0.0), "0.0000");
        assert_eq!(format_value(1_048_576.0), "1048576.0000");
        assert_eq!(format_value(2.5e12), "2.5000e12");
    }

    #[test]
    fn test_color_outcome_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(color_outcome("modeled"), "modeled");
        assert_eq!(color_outcome("no_series"), "no_series");
    }
}
