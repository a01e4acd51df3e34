// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! CLI output formatting with colors and styling.
//!
//! Respects NO_COLOR and FORCE_COLOR environment variables.
//! Colors are automatically disabled when output is piped.

use colored::{ColoredString, Colorize};
use strand_rt::RunSummary;

/// Initialize color support based on environment.
/// Call once at startup.
pub fn init() {
    // colored crate handles NO_COLOR automatically,
    // but we add explicit FORCE_COLOR support
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    } else if std::env::var("FORCE_COLOR").is_ok() {
        colored::control::set_override(true);
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn banner(text: &str) -> String {
    format!("{} {} {}", "----".dimmed(), text.bold(), "----".dimmed())
}

pub fn summary(s: &RunSummary) -> String {
    let failures = s.observed_failures + s.abandoned;
    let status = if failures == 0 {
        "clean".green().bold()
    } else {
        format!("{} failed", failures).red().bold()
    };
    format!(
        "{} {} invocations, {} resumptions, {} observed, {} abandoned ({})",
        "summary:".dimmed(),
        s.invocations,
        s.resumptions,
        s.observed_failures,
        s.abandoned,
        status
    )
}

// === Help Output ===

pub fn title(name: &str) -> ColoredString {
    name.bold()
}

pub fn version(v: &str) -> ColoredString {
    v.dimmed()
}

pub fn section_header(header: &str) -> ColoredString {
    header.yellow().bold()
}

pub fn command(name: &str) -> ColoredString {
    name.green()
}

pub fn arg(name: &str) -> ColoredString {
    name.cyan()
}
