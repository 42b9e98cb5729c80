//! Markdown report synthesis
//!
//! Turns a finished session into `documentation.md`:
//!
//! 1. load the session log (missing log aborts, nothing is written)
//! 2. header with the first event's timestamp
//! 3. one `## Step N` block per click / press_special, in stored order
//! 4. write the whole document, replacing any previous one
//!
//! The image line is rendered whenever a screenshot path was recorded, even
//! when the file has since disappeared; only the provider call checks
//! existence.

use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};

use crate::describe::{Describer, Description};
use crate::error::Result;
use crate::event_log::{Action, Event};
use crate::session::SessionStore;

pub const TITLE: &str = "# Auto-Generated Documentation";
pub const UNKNOWN_DATE: &str = "Unknown";

/// Rendered document plus the per-step outcomes behind it
#[derive(Debug, Clone)]
pub struct Report {
    pub markdown: String,
    pub descriptions: Vec<Description>,
}

impl Report {
    pub fn steps(&self) -> usize {
        self.descriptions.len()
    }
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub steps: usize,
    pub output: PathBuf,
}

pub struct ReportSynthesizer {
    store: SessionStore,
    describer: Describer,
    output: PathBuf,
    base_dir: PathBuf,
    concurrency: usize,
}

impl ReportSynthesizer {
    pub fn new(store: SessionStore, describer: Describer, output: impl Into<PathBuf>) -> Self {
        Self {
            store,
            describer,
            output: output.into(),
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            concurrency: 1,
        }
    }

    /// Directory image links are made relative to (default: cwd)
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Describe up to `n` steps at once; output order is unchanged
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Load, render and write the document
    pub async fn generate(&self) -> Result<ReportSummary> {
        let events = self.store.load()?;
        tracing::info!(
            log = %self.store.log_path().display(),
            events = events.len(),
            "Session loaded"
        );

        let report = self.render(&events).await;

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.output, report.markdown.as_bytes()).await?;

        tracing::info!(output = %self.output.display(), steps = report.steps(), "Documentation generated");
        Ok(ReportSummary {
            steps: report.steps(),
            output: self.output.clone(),
        })
    }

    /// Render `events` without touching the output file
    pub async fn render(&self, events: &[Event]) -> Report {
        let qualifying: Vec<&Event> = events
            .iter()
            .filter(|e| e.event_type().is_qualifying())
            .collect();

        let descriptions: Vec<Description> = stream::iter(qualifying.iter().enumerate())
            .map(|(index, event)| async move {
                tracing::info!(step = index + 1, "Processing step {}...", index + 1);
                self.describer
                    .describe(event.event_type(), event.screenshot.as_deref())
                    .await
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let date = events
            .first()
            .map(|e| e.timestamp.as_str())
            .unwrap_or(UNKNOWN_DATE);
        let mut markdown = format!("{}\n\n**Date:** {}\n\n", TITLE, date);

        for (index, (event, description)) in qualifying.iter().zip(&descriptions).enumerate() {
            markdown.push_str(&format!("## Step {}\n", index + 1));
            markdown.push_str(&format!("**Action:** {}\n\n", action_line(&event.action)));
            markdown.push_str(&format!("**Context:** {}\n\n", description));
            if let Some(path) = &event.screenshot {
                markdown.push_str(&format!("![Screenshot]({})\n\n", self.link_path(path)));
            }
        }

        Report {
            markdown,
            descriptions,
        }
    }

    /// Absolute paths become relative to `base_dir`, with `..` where needed
    fn link_path(&self, path: &Path) -> String {
        let relative = if path.is_absolute() {
            pathdiff::diff_paths(path, &self.base_dir).unwrap_or_else(|| path.to_path_buf())
        } else {
            path.to_path_buf()
        };
        relative.to_string_lossy().replace('\\', "/")
    }
}

/// Human-readable action text, no remote call involved
pub fn action_line(action: &Action) -> String {
    match action {
        Action::Click { x, y, button } => {
            format!("User action: click at ({}, {}) with {} button", x, y, button)
        }
        Action::Press { key } => format!("User action: press '{}'", key),
        Action::PressSpecial { key } => format!("User action: press_special {}", key),
    }
}
