//! Entry states, outcomes and cancellation.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use wordcast_common::error::ErrorKind;

/// State of one entry's pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    /// Not started.
    Pending,
    /// Synthesizing the narration.
    ResolvingAudio,
    /// Transcribing and resolving word timings.
    Timing,
    /// Rendering one glyph raster per word.
    RenderingOverlays,
    /// Decoding the background and building the composition.
    Composing,
    /// Encoding the output file.
    Exporting,
    /// Output written.
    Done,
    /// Nothing to do.
    Skipped,
    /// The entry failed; other entries are unaffected.
    Failed,
}

impl EntryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryState::Done | EntryState::Skipped | EntryState::Failed)
    }

    /// The next state on the success path, if any.
    pub fn next(&self) -> Option<EntryState> {
        match self {
            EntryState::Pending => Some(EntryState::ResolvingAudio),
            EntryState::ResolvingAudio => Some(EntryState::Timing),
            EntryState::Timing => Some(EntryState::RenderingOverlays),
            EntryState::RenderingOverlays => Some(EntryState::Composing),
            EntryState::Composing => Some(EntryState::Exporting),
            EntryState::Exporting => Some(EntryState::Done),
            EntryState::Done | EntryState::Skipped | EntryState::Failed => None,
        }
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: EntryState) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            EntryState::Failed => true,
            EntryState::Skipped => *self == EntryState::Pending,
            other => self.next() == Some(other),
        }
    }
}

/// Why an entry was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The output file already exists.
    AlreadyExists,
    /// An earlier entry in the batch writes the same output file.
    NameCollision,
}

/// Terminal result of one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryOutcome {
    Done { output: PathBuf },
    Skipped { reason: SkipReason },
    Failed { kind: ErrorKind, message: String },
}

impl EntryOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, EntryOutcome::Done { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, EntryOutcome::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, EntryOutcome::Failed { .. })
    }

    /// Error kind of a failed outcome.
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            EntryOutcome::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The terminal state matching this outcome.
    pub fn state(&self) -> EntryState {
        match self {
            EntryOutcome::Done { .. } => EntryState::Done,
            EntryOutcome::Skipped { .. } => EntryState::Skipped,
            EntryOutcome::Failed { .. } => EntryState::Failed,
        }
    }
}

/// Cooperative cancellation shared by every entry of a batch.
///
/// Checked at each state transition; work already inside a state runs to
/// the end of that state.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
