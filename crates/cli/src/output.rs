//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use rightsize_lib::calculator::MIB;
use rightsize_lib::{CpuDecision, JvmDecision, MemoryDecision};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: i64) -> String {
    const GIB: i64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1}Gi", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.0}Mi", bytes as f64 / MIB as f64)
    } else {
        format!("{}B", bytes)
    }
}

/// Format a ratio with two decimals
pub fn format_ratio(ratio: f64) -> String {
    format!("{:.2}", ratio)
}

/// Recommended memory with a change marker relative to the request
pub fn format_mem_change(request_bytes: i64, recommended_bytes: i64, decision: MemoryDecision) -> String {
    if decision == MemoryDecision::SkipOom {
        return "⏭ SKIP".bright_red().to_string();
    }

    let delta_mib = (recommended_bytes - request_bytes) as f64 / MIB as f64;
    let rec_mib = recommended_bytes as f64 / MIB as f64;

    if delta_mib.abs() < 1.0 {
        format!("→ {:.0}Mi", rec_mib).yellow().to_string()
    } else if delta_mib < 0.0 {
        format!("↓ {:.0}Mi ({:.0})", rec_mib, delta_mib).green().to_string()
    } else {
        format!("↑ {:.0}Mi (+{:.0})", rec_mib, delta_mib).red().to_string()
    }
}

/// Recommended CPU with a change marker relative to the request
pub fn format_cpu_change(request_cores: f64, recommended_cores: f64, decision: CpuDecision) -> String {
    if decision == CpuDecision::SkipThrottling {
        return "⏭ SKIP".bright_red().to_string();
    }

    let delta = recommended_cores - request_cores;
    if delta.abs() < 0.001 {
        format!("→ {:.2}", recommended_cores).yellow().to_string()
    } else if delta < 0.0 {
        format!("↓ {:.2} ({:.2})", recommended_cores, delta).green().to_string()
    } else {
        format!("↑ {:.2} (+{:.2})", recommended_cores, delta).red().to_string()
    }
}

/// Color a decision label by its meaning
pub fn color_decision(decision: &str) -> String {
    match decision {
        "REDUCE" => decision.green().to_string(),
        "KEEP" => decision.yellow().to_string(),
        "INCREASE" => decision.red().to_string(),
        "SKIP_OOM" | "SKIP_THROTTLING" => decision.bright_red().to_string(),
        _ => decision.to_string(),
    }
}

pub fn color_cpu(decision: CpuDecision) -> String {
    color_decision(decision.as_str())
}

pub fn color_memory(decision: MemoryDecision) -> String {
    color_decision(decision.as_str())
}

pub fn color_jvm(decision: JvmDecision) -> String {
    color_decision(decision.as_str())
}
