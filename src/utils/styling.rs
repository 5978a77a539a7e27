//! Terminal styling utilities

use console::{style, Emoji};
use std::path::Path;
use std::time::Duration;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static CHART: Emoji<'_, '_> = Emoji("📊 ", "");
pub static FOLDER: Emoji<'_, '_> = Emoji("📂 ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static LABEL: Emoji<'_, '_> = Emoji("🏷️  ", "");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
     ___ _   _ _ ____   _____ _   _ _ __  _ __ ___ _ __
    / __| | | | '__\ \ / / _ \ | | | '_ \| '__/ _ \ '_ \
    \__ \ |_| | |   \ V /  __/ |_| | |_) | | |  __/ |_) |
    |___/\__,_|_|    \_/ \___|\__, | .__/|_|  \___| .__/
                               __/ | |            | |
                              |___/|_|            |_|
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}",
        style("Coded survey records to canonical feature tables").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Settings shown in the configuration card
pub struct FitConfigView<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub artifacts: &'a Path,
    pub targets: &'a [String],
    pub encoding: &'a str,
    pub missing_threshold: Option<f64>,
    pub registry_version: &'a str,
}

/// Print configuration card
pub fn print_config(view: &FitConfigView) {
    let box_width = 56;
    let line = "─".repeat(box_width - 2);

    let targets = if view.targets.is_empty() {
        "outcomes in input".to_string()
    } else {
        view.targets.join(", ")
    };
    let threshold = match view.missing_threshold {
        Some(t) => format!("{:.1}%", t * 100.0),
        None => "off".to_string(),
    };

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {} Input:     {:<36}│", FOLDER, truncate_path(view.input, 35));
    println!("    │  {} Output:    {:<36}│", SAVE, truncate_path(view.output, 35));
    println!("    │  {} Artifacts: {:<36}│", SAVE, truncate_path(view.artifacts, 35));
    println!("    │  {} Outcomes:  {:<36}│", TARGET, truncate_string(&targets, 35));
    println!("    ├{}┤", line);
    println!(
        "    │  {} Encoding:          {:<28}│",
        LABEL,
        style(view.encoding).yellow()
    );
    println!(
        "    │  {} Missing threshold: {:<28}│",
        CHART,
        style(threshold).yellow()
    );
    println!(
        "    │  {} Rule table:        {:<28}│",
        CHART,
        style(view.registry_version).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("    {} {}", WARN, style(message).yellow());
}

/// Print elapsed time for a step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "      {}",
        style(format!("({:.2}s)", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion(message: &str) {
    println!();
    println!("    {} {}", ROCKET, style(message).green().bold());
    println!();
}

/// Print a styled count message
pub fn print_count(description: &str, count: usize, threshold_info: Option<&str>) {
    if let Some(info) = threshold_info {
        println!(
            "      Found {} {} {}",
            style(count).yellow().bold(),
            description,
            style(info).dim()
        );
    } else {
        println!(
            "      Found {} {}",
            style(count).yellow().bold(),
            description
        );
    }
}

fn truncate_path(path: &Path, max_len: usize) -> String {
    let path_str = path.display().to_string();
    truncate_string(&path_str, max_len)
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string_keeps_tail() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("abcdefghijkl", 8), "...hijkl");
    }
}
