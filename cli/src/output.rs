//! Output formatting utilities for CLI commands

use colored::Colorize;
use enginescope_shared::UsageSample;

/// Print success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Colour a utilization figure by load
pub fn percent(value: u32) -> String {
    let text = format!("{:>3}%", value);
    match value {
        0..=49 => text.green().to_string(),
        50..=84 => text.yellow().to_string(),
        _ => text.red().to_string(),
    }
}

/// One line per sampling round
pub fn usage_line(sample: &UsageSample) {
    let stamp = sample.taken_at.format("%H:%M:%S%.3f");
    if sample.is_none() {
        println!("{}  {}  {}", stamp, percent(0), "no device".dimmed());
        return;
    }

    let failed: usize = sample.devices.iter().map(|d| d.failed_reads).sum();
    let mut line = format!("{}  {}  {}", stamp, percent(sample.percent), sample.device_id.bold());
    if sample.devices.len() > 1 {
        let totals: Vec<String> = sample
            .devices
            .iter()
            .map(|d| format!("{}={:.1}", d.device_id, d.total))
            .collect();
        line.push_str(&format!("  [{}]", totals.join(" ")).dimmed().to_string());
    }
    if failed > 0 {
        line.push_str(&format!("  ({} failed reads)", failed).yellow().to_string());
    }
    println!("{}", line);
}
