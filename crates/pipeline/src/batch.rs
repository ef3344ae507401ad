//! Bounded-parallel batch driver.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use wordcast_common::error::ErrorKind;
use wordcast_project_model::entry::{find_name_collisions, Entry};

use crate::entry_pipeline::EntryPipeline;
use crate::report::{BatchReport, EntryReport};
use crate::state::{EntryOutcome, SkipReason};

/// Runs a list of entries on at most `jobs` blocking workers.
///
/// Each entry is independent: one failing never stops the others, and the
/// report lists entries in input order whatever order they finish in.
pub struct BatchRunner {
    pipeline: Arc<EntryPipeline>,
    jobs: usize,
}

impl BatchRunner {
    pub fn new(pipeline: Arc<EntryPipeline>, jobs: usize) -> Self {
        Self {
            pipeline,
            jobs: jobs.max(1),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    pub fn pipeline(&self) -> &EntryPipeline {
        &self.pipeline
    }

    pub async fn run(&self, entries: Vec<Entry>) -> BatchReport {
        let started_at = Utc::now();
        tracing::info!(entries = entries.len(), jobs = self.jobs, "Starting batch");

        let mut slots: Vec<Option<EntryReport>> = vec![None; entries.len()];

        for collision in find_name_collisions(&entries) {
            let names: Vec<&str> = collision
                .indices
                .iter()
                .map(|&i| entries[i].name.as_str())
                .collect();
            tracing::warn!(
                stem = %collision.stem,
                names = ?names,
                "Entries share an output file, keeping the first"
            );
            for &idx in collision.indices.iter().skip(1) {
                let entry = &entries[idx];
                slots[idx] = Some(EntryReport::not_run(
                    entry.name.clone(),
                    self.pipeline.config().output_path(entry),
                    EntryOutcome::Skipped {
                        reason: SkipReason::NameCollision,
                    },
                ));
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut handles = Vec::new();

        for (idx, entry) in entries.iter().enumerate() {
            if slots[idx].is_some() {
                continue;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let pipeline = Arc::clone(&self.pipeline);
            let owned = entry.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let report = pipeline.run(&owned);
                drop(permit);
                report
            });
            handles.push((idx, handle));
        }

        for (idx, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(e) => {
                    let entry = &entries[idx];
                    tracing::error!(entry = %entry.name, error = %e, "Entry worker panicked");
                    EntryReport::not_run(
                        entry.name.clone(),
                        self.pipeline.config().output_path(entry),
                        EntryOutcome::Failed {
                            kind: ErrorKind::Other,
                            message: format!("worker failed: {e}"),
                        },
                    )
                }
            };
            slots[idx] = Some(report);
        }

        let entries: Vec<EntryReport> = slots
            .into_iter()
            .zip(entries.iter())
            .map(|(slot, entry)| {
                slot.unwrap_or_else(|| {
                    EntryReport::not_run(
                        entry.name.clone(),
                        self.pipeline.config().output_path(entry),
                        EntryOutcome::Failed {
                            kind: ErrorKind::Cancelled,
                            message: "Cancelled".to_string(),
                        },
                    )
                })
            })
            .collect();

        let report = BatchReport {
            started_at,
            finished_at: Utc::now(),
            record_failures: Vec::new(),
            entries,
        };
        tracing::info!(
            done = report.done(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Batch finished"
        );
        report
    }
}
