//! Wordcast Project Model
//!
//! Defines the core data contracts shared by every stage:
//! - **Entries:** One narrated video to produce (name, narration text, image id)
//! - **Records:** JSON record files holding ordered entries, and the
//!   filesystem conventions around them (image lookup, output naming)
//! - **Timing:** Raw per-word timestamps and validated word timings
//! - **Canvas:** Output frame geometry and integer pixel rectangles

pub mod canvas;
pub mod entry;
pub mod timing;

pub use canvas::*;
pub use entry::*;
pub use timing::*;
