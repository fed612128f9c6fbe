use anyhow::Result;
use humantime::parse_duration;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub mod defaults;

use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    /// Maximum number of programs written by a single INSERT statement
    #[serde(default = "default_insert_batch_size")]
    pub insert_batch_size: usize,
}

/// Timeline engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Guide horizon used when the settings store has no `guide_days` entry
    #[serde(default = "default_guide_days")]
    pub default_guide_days: u32,
    /// Hard cap on programs emitted by one generation pass
    #[serde(default = "default_max_programs_per_run")]
    pub max_programs_per_run: usize,
    /// Idle time between adjacent programs that is not considered a gap
    #[serde(default = "default_gap_tolerance")]
    pub gap_tolerance: String,
    /// Lineup items longer than this are dropped as nonsensical
    #[serde(default = "default_max_item_duration")]
    pub max_item_duration: String,
    /// Window used for short "add content now" generation bursts
    #[serde(default = "default_add_content_window_hours")]
    pub add_content_window_hours: u32,
}

/// Periodic maintenance and retention
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Maintenance pass interval
    #[serde(default = "default_maintenance_interval")]
    pub interval: String,
    /// Programs that ended longer ago than this are deleted
    #[serde(default = "default_retention")]
    pub retention: String,
    /// Run one pass immediately when the housekeeper starts
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
}

fn default_insert_batch_size() -> usize {
    DEFAULT_INSERT_BATCH_SIZE
}

fn default_guide_days() -> u32 {
    DEFAULT_GUIDE_DAYS
}

fn default_max_programs_per_run() -> usize {
    DEFAULT_MAX_PROGRAMS_PER_RUN
}

fn default_gap_tolerance() -> String {
    DEFAULT_GAP_TOLERANCE.to_string()
}

fn default_max_item_duration() -> String {
    DEFAULT_MAX_ITEM_DURATION.to_string()
}

fn default_add_content_window_hours() -> u32 {
    DEFAULT_ADD_CONTENT_WINDOW_HOURS
}

fn default_maintenance_interval() -> String {
    DEFAULT_MAINTENANCE_INTERVAL.to_string()
}

fn default_retention() -> String {
    DEFAULT_RETENTION.to_string()
}

fn default_run_on_startup() -> bool {
    DEFAULT_RUN_ON_STARTUP
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_guide_days: default_guide_days(),
            max_programs_per_run: default_max_programs_per_run(),
            gap_tolerance: default_gap_tolerance(),
            max_item_duration: default_max_item_duration(),
            add_content_window_hours: default_add_content_window_hours(),
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval: default_maintenance_interval(),
            retention: default_retention(),
            run_on_startup: default_run_on_startup(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: Some(DEFAULT_MAX_CONNECTIONS),
                insert_batch_size: default_insert_batch_size(),
            },
            scheduling: SchedulingConfig::default(),
            maintenance: MaintenanceConfig::default(),
        }
    }
}

impl SchedulingConfig {
    pub fn gap_tolerance(&self) -> Result<Duration> {
        Ok(parse_duration(&self.gap_tolerance)?)
    }

    pub fn max_item_duration(&self) -> Result<Duration> {
        Ok(parse_duration(&self.max_item_duration)?)
    }
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Result<Duration> {
        Ok(parse_duration(&self.interval)?)
    }

    pub fn retention(&self) -> Result<Duration> {
        Ok(parse_duration(&self.retention)?)
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let config: Self = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.database.insert_batch_size == 0 {
            anyhow::bail!("database.insert_batch_size must be greater than zero");
        }
        if self.scheduling.default_guide_days == 0 {
            anyhow::bail!("scheduling.default_guide_days must be at least 1");
        }
        if self.scheduling.max_programs_per_run == 0 {
            anyhow::bail!("scheduling.max_programs_per_run must be greater than zero");
        }
        if self.scheduling.add_content_window_hours == 0 {
            anyhow::bail!("scheduling.add_content_window_hours must be at least 1");
        }
        if self.scheduling.max_item_duration()?.is_zero() {
            anyhow::bail!("scheduling.max_item_duration must be greater than zero");
        }
        self.scheduling.gap_tolerance()?;
        if self.maintenance.interval()?.is_zero() {
            anyhow::bail!("maintenance.interval must be greater than zero");
        }
        self.maintenance.retention()?;
        Ok(())
    }
}
