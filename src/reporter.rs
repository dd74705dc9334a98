//! User-facing output channel.
//!
//! Maintenance operations never print directly; they are handed a
//! `Reporter` so the CLI can render to the terminal and tests can record.

use std::sync::Mutex;

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
}

pub trait Reporter: Send + Sync {
    fn report(&self, level: Level, message: &str);

    fn info(&self, message: &str) {
        self.report(Level::Info, message);
    }

    fn success(&self, message: &str) {
        self.report(Level::Success, message);
    }

    fn warn(&self, message: &str) {
        self.report(Level::Warn, message);
    }
}

/// Prints with the usual `::` / `ok` / `!!` markers.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, level: Level, message: &str) {
        match level {
            Level::Info => println!("{} {}", "::".blue().bold(), message),
            Level::Success => println!("{} {}", "ok".green().bold(), message),
            Level::Warn => eprintln!("{} {}", "!!".yellow().bold(), message),
        }
    }
}

/// Records every message in order.
#[derive(Default)]
pub struct CapturingReporter {
    entries: Mutex<Vec<(Level, String)>>,
}

impl CapturingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Level, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|(_, m)| m.contains(needle))
    }
}

impl Reporter for CapturingReporter {
    fn report(&self, level: Level, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message.to_string()));
        }
    }
}
