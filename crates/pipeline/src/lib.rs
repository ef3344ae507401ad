//! Wordcast Pipeline
//!
//! Drives entries from record to finished video:
//! - **Entry pipeline:** One entry through synthesis, timing, glyph
//!   rendering, composition and export, as an explicit state machine
//! - **Batch runner:** Many entries on a bounded worker pool with
//!   failure isolation and cooperative cancellation
//! - **Report:** Per-entry outcomes of a batch, serializable to JSON

pub mod batch;
pub mod entry_pipeline;
pub mod report;
pub mod state;

pub use batch::BatchRunner;
pub use entry_pipeline::{Collaborators, EntryPipeline, PipelineConfig};
pub use report::{BatchReport, EntryReport};
pub use state::{CancelFlag, EntryOutcome, EntryState, SkipReason};
