/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./tvloop.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 500;

// Scheduling defaults
pub const DEFAULT_GUIDE_DAYS: u32 = 3;
pub const DEFAULT_MAX_PROGRAMS_PER_RUN: usize = 10_000;
pub const DEFAULT_GAP_TOLERANCE: &str = "1s";
pub const DEFAULT_MAX_ITEM_DURATION: &str = "24h";
pub const DEFAULT_ADD_CONTENT_WINDOW_HOURS: u32 = 24;

// Maintenance defaults
pub const DEFAULT_MAINTENANCE_INTERVAL: &str = "1h";
pub const DEFAULT_RETENTION: &str = "24h";
pub const DEFAULT_RUN_ON_STARTUP: bool = true;
