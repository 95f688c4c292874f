//! Astral-style CLI output formatting.
//!
//! Human-readable output goes to stdout with colored symbols; `--json`
//! switches every helper to one JSON object per line for scripting. Step
//! output relayed from the broadcaster is printed verbatim in both modes
//! unless JSON mode is on, where it is wrapped like any other event.

use std::fmt::Display;
use std::io::{IsTerminal, Write};
use std::sync::{OnceLock, RwLock};

use owo_colors::OwoColorize;
use serde_json::json;

use super::command::ColorChoice;

/// Runtime output configuration shared by CLI handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Emit machine-readable JSON output instead of human-readable text.
    pub json: bool,
    /// Suppress non-essential output.
    pub quiet: bool,
    /// Use ANSI colors.
    pub color: bool,
}

impl OutputConfig {
    #[must_use]
    pub fn new(json: bool, quiet: bool, color: ColorChoice) -> Self {
        let color = match color {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::stdout().is_terminal(),
        };
        Self { json, quiet, color }
    }
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn config_cell() -> &'static RwLock<OutputConfig> {
    OUTPUT_CONFIG.get_or_init(|| RwLock::new(OutputConfig::default()))
}

fn read_config() -> OutputConfig {
    match config_cell().read() {
        Ok(config) => *config,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    match config_cell().write() {
        Ok(mut current) => *current = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

#[must_use]
pub fn is_json() -> bool {
    read_config().json
}

fn emit_json_line(kind: &str, payload: serde_json::Value) {
    println!("{}", json!({ "type": kind, "payload": payload }));
}

fn symbol(config: OutputConfig, plain: &'static str, paint: fn(&str) -> String) -> String {
    if config.color {
        paint(plain)
    } else {
        plain.to_owned()
    }
}

/// Print the application header with name and version.
pub fn header(version: &str) {
    let config = read_config();
    if config.json {
        emit_json_line("header", json!({ "app": "tofuhub", "version": version }));
        return;
    }
    if config.quiet {
        return;
    }
    if config.color {
        println!("{} {}", "tofuhub".bold(), version.dimmed());
    } else {
        println!("tofuhub {version}");
    }
    println!();
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let config = read_config();
    let value = value.to_string();
    if config.json {
        emit_json_line("field", json!({ "label": label, "value": value }));
        return;
    }
    if config.quiet {
        return;
    }
    if config.color {
        println!("  {:<16} {}", label.dimmed(), value);
    } else {
        println!("  {label:<16} {value}");
    }
}

/// Print a section title.
pub fn section(title: &str) {
    let config = read_config();
    if config.json {
        emit_json_line("section", json!({ "title": title }));
        return;
    }
    if config.quiet {
        return;
    }
    println!();
    if config.color {
        println!("{}", title.bold());
    } else {
        println!("{title}");
    }
}

pub fn success(message: &str) {
    let config = read_config();
    if config.json {
        emit_json_line("success", json!({ "message": message }));
        return;
    }
    if config.quiet {
        return;
    }
    println!("  {} {}", symbol(config, "✓", |s| s.green().to_string()), message);
}

pub fn warning(message: &str) {
    let config = read_config();
    if config.json {
        emit_json_line("warning", json!({ "message": message }));
        return;
    }
    println!("  {} {}", symbol(config, "⚠", |s| s.yellow().to_string()), message);
}

/// Print an error to stderr. Never suppressed.
pub fn error(message: &str) {
    let config = read_config();
    if config.json {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
        return;
    }
    eprintln!("  {} {}", symbol(config, "×", |s| s.red().to_string()), message);
}

/// Relay a chunk of step output.
pub fn stream(chunk: &str) {
    if read_config().json {
        emit_json_line("output", json!({ "chunk": chunk }));
        return;
    }
    let mut stdout = std::io::stdout().lock();
    // Broken pipes only lose output; the run itself continues.
    let _ = stdout.write_all(chunk.as_bytes());
    let _ = stdout.flush();
}

/// Emit a serializable value as a JSON line, regardless of mode.
pub fn json_value(kind: &str, value: &impl serde::Serialize) {
    match serde_json::to_value(value) {
        Ok(payload) => emit_json_line(kind, payload),
        Err(e) => error(&format!("failed to serialize {kind}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_color_choices() {
        assert!(OutputConfig::new(false, false, ColorChoice::Always).color);
        assert!(!OutputConfig::new(false, false, ColorChoice::Never).color);
    }

    #[test]
    fn plain_symbols_without_color() {
        let config = OutputConfig::new(false, false, ColorChoice::Never);
        assert_eq!(symbol(config, "✓", |s| s.green().to_string()), "✓");
    }
}
