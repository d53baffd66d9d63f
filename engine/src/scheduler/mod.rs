//! Timeline construction for a project's tasks.
//!
//! Tasks are placed in dependency order against an optional working-hours
//! calendar. [`ResourceSchedule`] tracks per-worker busy time for the passes
//! that level or compress an existing schedule.

pub mod calendar;
mod core;
mod resource_schedule;

pub use calendar::WorkingHours;
pub use core::{move_to, shift_with_dependents, Scheduler};
pub use resource_schedule::ResourceSchedule;
