//! Per-entry and per-batch run reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use wordcast_common::error::{WordcastError, WordcastResult};
use wordcast_processing_core::timing::TimingSource;

use crate::state::{EntryOutcome, EntryState, SkipReason};

/// What happened to one entry.
#[derive(Debug, Clone, Serialize)]
pub struct EntryReport {
    pub name: String,
    /// Where the output is (or would have been) written.
    pub output: PathBuf,
    pub outcome: EntryOutcome,
    /// Every state the entry passed through, ending in a terminal one.
    pub states: Vec<EntryState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_source: Option<TimingSource>,
    pub words: usize,
    pub elapsed_secs: f64,
}

impl EntryReport {
    /// Report for an entry that never ran.
    pub fn not_run(name: impl Into<String>, output: PathBuf, outcome: EntryOutcome) -> Self {
        Self {
            name: name.into(),
            output,
            states: vec![EntryState::Pending, outcome.state()],
            outcome,
            audio_duration_secs: None,
            timing_source: None,
            words: 0,
            elapsed_secs: 0.0,
        }
    }

    pub fn final_state(&self) -> EntryState {
        self.states.last().copied().unwrap_or(EntryState::Pending)
    }
}

/// A record file that could not be loaded.
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Outcome of a whole batch, in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub record_failures: Vec<RecordFailure>,
    pub entries: Vec<EntryReport>,
}

impl BatchReport {
    pub fn done(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_done()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }

    /// Entries skipped because their output already existed.
    pub fn already_done(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.outcome,
                    EntryOutcome::Skipped {
                        reason: SkipReason::AlreadyExists
                    }
                )
            })
            .count()
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// One-line summary for terminal output.
    pub fn summary_line(&self) -> String {
        format!(
            "{} entries: {} done, {} skipped, {} failed in {:.1}s",
            self.entries.len(),
            self.done(),
            self.skipped(),
            self.failed(),
            self.elapsed_secs()
        )
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> WordcastResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(WordcastError::from)
    }
}
