//! SeaORM repository implementations
//!
//! This module provides repository implementations using SeaORM that work across
//! SQLite, PostgreSQL, and MySQL databases.

pub mod channel;
pub mod program;
pub mod settings;

// Re-export for convenience
pub use channel::ChannelSeaOrmRepository;
pub use program::ProgramSeaOrmRepository;
pub use settings::{GUIDE_DAYS_KEY, SettingsSeaOrmRepository};
