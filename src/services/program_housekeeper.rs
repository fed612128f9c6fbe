use anyhow::Result;
use humantime::parse_duration;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

use crate::config::MaintenanceConfig;
use crate::errors::AppResult;
use crate::services::program_scheduler::{MaintenanceReport, ProgramScheduler};

/// Periodic program maintenance and retention
pub struct ProgramHousekeeper {
    scheduler: Arc<ProgramScheduler>,
    interval: Duration,
    run_on_startup: bool,
}

/// What one housekeeping cycle did
#[derive(Debug, Clone, Serialize)]
pub struct HousekeepingReport {
    pub maintenance: MaintenanceReport,
    pub expired_removed: u64,
}

impl ProgramHousekeeper {
    pub fn from_config(scheduler: Arc<ProgramScheduler>, config: &MaintenanceConfig) -> Result<Self> {
        Ok(Self {
            scheduler,
            interval: parse_duration(&config.interval)?,
            run_on_startup: config.run_on_startup,
        })
    }

    /// Run until `cancellation_token` fires
    pub async fn run(&self, cancellation_token: CancellationToken) {
        let first_tick = if self.run_on_startup {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };
        let mut ticker = interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Starting program housekeeper with interval: {:?}",
            self.interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        error!("Program housekeeper error: {}", e);
                    }
                }
                _ = cancellation_token.cancelled() => {
                    info!("Program housekeeper received cancellation signal, shutting down");
                    break;
                }
            }
        }
    }

    /// One maintenance pass followed by the retention sweep
    ///
    /// A failed maintenance pass is reported after the sweep has run.
    pub async fn run_cycle(&self) -> AppResult<HousekeepingReport> {
        let started = std::time::Instant::now();

        let maintenance = self.scheduler.maintain_programs().await;
        // Retention runs whether or not the maintenance pass got through
        let expired_removed = match self.scheduler.cleanup_old_programs().await {
            Ok(removed) => removed,
            Err(e) => {
                if let Err(maintenance_error) = &maintenance {
                    error!("Program maintenance pass failed: {}", maintenance_error);
                }
                return Err(e);
            }
        };
        let maintenance = maintenance?;

        let elapsed_ms = started.elapsed().as_millis();
        let total_work = maintenance.overlaps_resolved
            + maintenance.gaps_filled
            + maintenance.programs_extended
            + expired_removed;
        if total_work > 0 || !maintenance.failed.is_empty() {
            info!(
                "Program housekeeper completed in {}ms: {} channels, {} extended, {} gaps filled, {} overlaps resolved, {} expired removed, {} failed",
                elapsed_ms,
                maintenance.channels,
                maintenance.programs_extended,
                maintenance.gaps_filled,
                maintenance.overlaps_resolved,
                expired_removed,
                maintenance.failed.len()
            );
        } else {
            trace!(
                "Program housekeeper completed in {}ms: no work performed",
                elapsed_ms
            );
        }

        Ok(HousekeepingReport {
            maintenance,
            expired_removed,
        })
    }
}
