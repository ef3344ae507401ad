//! Wordcast Processing Core
//!
//! Turns narration data into layout decisions:
//! - **Timing:** Validate transcribed word timestamps, or spread the
//!   narration text uniformly over the audio when none are available
//! - **Framing:** Scale-and-center-crop geometry that fills the portrait
//!   canvas from a still image of any aspect ratio
//!
//! This crate is pure computation with no I/O and no platform dependencies.
//! All inputs are data; all outputs are data.

pub mod framing;
pub mod timing;

pub use framing::{cover_plan, CoverPlan};
pub use timing::{resolve_timings, uniform_timings, ResolvedTimings, TimingSource};
