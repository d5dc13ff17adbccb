//! Markdown step summaries.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};

/// Step summary destination.
///
/// Disabled summaries, and enabled ones without a summary file, silently discard
/// what they are given.
#[derive(Debug, Clone, Default)]
pub struct StepSummary {
    path: Option<PathBuf>,
    enabled: bool,
}

impl StepSummary {
    pub fn new(path: Option<PathBuf>, enabled: bool) -> Self {
        Self {
            path,
            enabled,
        }
    }

    /// Append markdown to the summary file.
    pub fn write(&self, markdown: &str) -> Result<()> {
        if !self.enabled {
            debug!("Step summary disabled");
            return Ok(());
        }
        let Some(path) = &self.path else {
            debug!("No step summary file configured");
            return Ok(());
        };

        info!("Writing step summary");
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open step summary: {}", path.display()))?;
        file.write_all(markdown.as_bytes())
            .with_context(|| format!("Failed to write step summary: {}", path.display()))?;
        if !markdown.ends_with('\n') {
            file.write_all(b"\n")?;
        }
        Ok(())
    }
}

/// A markdown table.
#[derive(Debug, Clone)]
pub struct SummaryTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SummaryTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_row(cells);
        self
    }

    pub fn add_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "| {} |", self.headers.join(" | "));
        let _ = writeln!(
            out,
            "|{}|",
            self.headers.iter().map(|h| "-".repeat(h.len() + 2)).collect::<Vec<_>>().join("|")
        );
        for row in &self.rows {
            let _ = writeln!(out, "| {} |", row.join(" | "));
        }
        out
    }
}

/// Wrap a value in backticks for table cells.
pub fn code(value: &str) -> String {
    format!("`{value}`")
}
