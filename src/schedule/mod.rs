//! Program timeline engine
//!
//! Pure planning code for building, checking and repairing a channel's
//! timeline. Nothing in this module touches the database; the services layer
//! feeds it the current state and applies the plans it returns.

pub mod gaps;
pub mod generator;
pub mod lineup;
pub mod overlap;

pub use gaps::{FillPlan, Gap, find_gaps, plan_fills};
pub use generator::{GenerationPlan, ScheduleGenerator, StartSelection, resume_index};
pub use lineup::ContentLineupBuilder;
pub use overlap::{Overlap, Resolution, find_overlaps, plan_resolutions};
