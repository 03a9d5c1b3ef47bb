//! Transfer scheduler.
//!
//! Splits planned tasks into a large-file and a small-file queue around the
//! batch's mean size, then drains both with a fixed pool of lanes. Lane 0
//! prefers large files and the others prefer small ones, so one big file does
//! not leave every lane idle behind it and the small-file tail finishes early.

mod lanes;
mod tally;

pub use lanes::{partition, run_transfers};
pub use tally::{LaneTally, TransferSummary};
