//! Per-cycle decision logic: select, offset, decide.
//!
//! Everything here is pure. Nothing is carried from one frame to the next.

mod command;
mod offset;
mod select;

pub use command::{decide, Command, Deadband};
pub use offset::{compute_offset, Offset, Point};
pub use select::{select_target, TargetCriteria};
