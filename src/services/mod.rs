//! Service layer for the program timeline engine
//!
//! Services sit between the pure planners in [`crate::schedule`] and the
//! repositories in [`crate::database::repositories`]. They load the current
//! timeline, ask a planner what to change, apply the changes and log what
//! happened.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tvloop::{config::Config, database::Database, services::ProgramScheduler, utils::SystemClock};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let database = Database::new(&config.database).await?;
//! database.migrate().await?;
//!
//! let scheduler = ProgramScheduler::from_database(&database, &config, Arc::new(SystemClock))?;
//! let report = scheduler.maintain_programs().await?;
//! println!("maintained {} channels", report.maintained);
//! # Ok(())
//! # }
//! ```

pub mod channel_lock;
pub mod gap_filler;
pub mod library_lineup;
pub mod overlap_resolver;
pub mod program_housekeeper;
pub mod program_scheduler;
pub mod traits;

pub use channel_lock::{ChannelLockManager, LockOutcome, OperationKind};
pub use gap_filler::{GapFillReport, GapFiller};
pub use library_lineup::LibraryLineupProvider;
pub use overlap_resolver::OverlapResolver;
pub use program_housekeeper::{HousekeepingReport, ProgramHousekeeper};
pub use program_scheduler::{
    BatchReport, ChannelFailure, ChannelMaintenanceReport, GenerationOutcome, MaintenanceReport,
    ProgramScheduler, SchedulerOptions,
};
pub use traits::{GuideSettings, LineupProvider};
