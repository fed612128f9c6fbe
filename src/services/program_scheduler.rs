//! Program scheduler service
//!
//! Orchestrates the timeline engine against the database: generation of a
//! channel's future, the periodic maintenance pass, overlap cleanup and
//! retention. Every per-channel operation runs under the channel's coalescing
//! lock, so generation and maintenance never interleave on one channel.

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::Database;
use crate::database::repositories::{
    ChannelSeaOrmRepository, ProgramSeaOrmRepository, SettingsSeaOrmRepository,
};
use crate::errors::{AppError, AppResult, SchedulerError};
use crate::models::ContentLineupItem;
use crate::schedule::{ContentLineupBuilder, ScheduleGenerator, resume_index};
use crate::services::channel_lock::{ChannelLockManager, LockOutcome, OperationKind};
use crate::services::gap_filler::GapFiller;
use crate::services::library_lineup::LibraryLineupProvider;
use crate::services::overlap_resolver::OverlapResolver;
use crate::services::traits::{GuideSettings, LineupProvider};
use crate::utils::Clock;
use crate::utils::time::{duration_ms, truncate_to_seconds};

/// Channels maintained concurrently in one pass
const MAINTENANCE_CONCURRENCY: usize = 4;

fn offset_by(instant: DateTime<Utc>, span: Option<Duration>) -> AppResult<DateTime<Utc>> {
    span.and_then(|span| instant.checked_add_signed(span))
        .ok_or_else(|| {
            SchedulerError::InvalidWindow {
                message: "generation window is out of range".to_string(),
            }
            .into()
        })
}

/// Tunables resolved from configuration
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub max_programs_per_run: usize,
    pub gap_tolerance_ms: i64,
    pub retention: Duration,
    pub add_content_window_hours: u32,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_programs_per_run: crate::config::defaults::DEFAULT_MAX_PROGRAMS_PER_RUN,
            gap_tolerance_ms: 1_000,
            retention: Duration::hours(24),
            add_content_window_hours: crate::config::defaults::DEFAULT_ADD_CONTENT_WINDOW_HOURS,
        }
    }
}

impl SchedulerOptions {
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let gap_tolerance = config
            .scheduling
            .gap_tolerance()
            .map_err(|e| AppError::configuration(format!("scheduling.gap_tolerance: {e}")))?;
        let retention = config
            .maintenance
            .retention()
            .map_err(|e| AppError::configuration(format!("maintenance.retention: {e}")))?;

        Ok(Self {
            max_programs_per_run: config.scheduling.max_programs_per_run,
            gap_tolerance_ms: duration_ms(gap_tolerance),
            retention: Duration::from_std(retention)
                .map_err(|e| AppError::configuration(format!("maintenance.retention: {e}")))?,
            add_content_window_hours: config.scheduling.add_content_window_hours,
        })
    }
}

/// Result of generating one channel's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    pub channel_id: Uuid,
    /// Where the new run begins; `None` when the lineup was empty
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// The airing program kept in place, if any
    pub preserved_program: Option<Uuid>,
    pub deleted: u64,
    pub inserted: u64,
    /// Stopped by the per-run program cap before reaching the window end
    pub truncated: bool,
    pub overlaps_resolved: u64,
    pub gaps_filled: u64,
}

impl GenerationOutcome {
    fn empty(channel_id: Uuid) -> Self {
        Self {
            channel_id,
            start_time: None,
            end_time: None,
            preserved_program: None,
            deleted: 0,
            inserted: 0,
            truncated: false,
            overlaps_resolved: 0,
            gaps_filled: 0,
        }
    }
}

/// Result of `generate_for_all_channels`
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub requested: usize,
    pub generated: usize,
    pub joined: usize,
    pub programs_inserted: u64,
    pub failed: Vec<ChannelFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelFailure {
    pub channel_id: Uuid,
    pub error: String,
}

/// Result of maintaining a single channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelMaintenanceReport {
    pub channel_id: Uuid,
    pub overlaps_resolved: u64,
    pub gaps_filled: u64,
    pub programs_extended: u64,
    pub regenerated: bool,
}

/// Result of one full maintenance pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub channels: usize,
    pub maintained: usize,
    pub joined: usize,
    pub overlaps_resolved: u64,
    pub gaps_filled: u64,
    pub programs_extended: u64,
    pub regenerated: usize,
    pub failed: Vec<ChannelFailure>,
}

impl MaintenanceReport {
    fn record(&mut self, report: &ChannelMaintenanceReport) {
        self.maintained += 1;
        self.overlaps_resolved += report.overlaps_resolved;
        self.gaps_filled += report.gaps_filled;
        self.programs_extended += report.programs_extended;
        if report.regenerated {
            self.regenerated += 1;
        }
    }
}

/// The timeline engine's public entry point
pub struct ProgramScheduler {
    programs: ProgramSeaOrmRepository,
    lineups: Arc<dyn LineupProvider>,
    settings: Arc<dyn GuideSettings>,
    clock: Arc<dyn Clock>,
    locks: ChannelLockManager,
    generator: ScheduleGenerator,
    overlaps: OverlapResolver,
    gaps: GapFiller,
    options: SchedulerOptions,
}

impl ProgramScheduler {
    pub fn new(
        programs: ProgramSeaOrmRepository,
        lineups: Arc<dyn LineupProvider>,
        settings: Arc<dyn GuideSettings>,
        clock: Arc<dyn Clock>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            overlaps: OverlapResolver::new(programs.clone()),
            gaps: GapFiller::new(programs.clone(), options.gap_tolerance_ms),
            generator: ScheduleGenerator::new(options.max_programs_per_run),
            locks: ChannelLockManager::new(),
            programs,
            lineups,
            settings,
            clock,
            options,
        }
    }

    /// Wire a scheduler over the library tables of `database`
    pub fn from_database(
        database: &Database,
        config: &Config,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let options = SchedulerOptions::from_config(config)?;
        let max_item_duration = config
            .scheduling
            .max_item_duration()
            .map_err(|e| AppError::configuration(format!("scheduling.max_item_duration: {e}")))?;

        let programs =
            ProgramSeaOrmRepository::new(database.connection(), config.database.insert_batch_size);
        let lineups = LibraryLineupProvider::new(
            ChannelSeaOrmRepository::new(database.connection()),
            ContentLineupBuilder::new(max_item_duration),
        );
        let settings = SettingsSeaOrmRepository::new(
            database.connection(),
            config.scheduling.default_guide_days,
        );

        Ok(Self::new(
            programs,
            Arc::new(lineups),
            Arc::new(settings),
            clock,
            options,
        ))
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn locks(&self) -> &ChannelLockManager {
        &self.locks
    }

    /// Rebuild the channel's future from now
    ///
    /// `hours` overrides the window; by default it is `guide_days * 24`.
    /// A caller arriving while the channel is already being generated waits
    /// for that run and gets `LockOutcome::Joined`. One arriving during
    /// maintenance waits for it to finish and then generates.
    pub async fn generate_for_channel(
        &self,
        channel_id: Uuid,
        hours: Option<u32>,
    ) -> AppResult<LockOutcome<GenerationOutcome>> {
        self.locks
            .run_exclusive(channel_id, OperationKind::Generate, || {
                self.generate_locked(channel_id, hours)
            })
            .await
    }

    /// Short generation burst after content was added to a channel
    pub async fn generate_content_burst(
        &self,
        channel_id: Uuid,
    ) -> AppResult<LockOutcome<GenerationOutcome>> {
        self.generate_for_channel(channel_id, Some(self.options.add_content_window_hours))
            .await
    }

    /// Generate every channel; a failing channel does not stop the others
    pub async fn generate_for_all_channels(&self, hours: Option<u32>) -> AppResult<BatchReport> {
        let channel_ids = self.lineups.channel_ids().await?;
        let mut report = BatchReport {
            requested: channel_ids.len(),
            ..Default::default()
        };

        for channel_id in channel_ids {
            match self.generate_for_channel(channel_id, hours).await {
                Ok(LockOutcome::Ran(outcome)) => {
                    report.generated += 1;
                    report.programs_inserted += outcome.inserted;
                }
                Ok(LockOutcome::Joined) => report.joined += 1,
                Err(e) => {
                    error!(channel_id = %channel_id, "Program generation failed: {}", e);
                    report.failed.push(ChannelFailure {
                        channel_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            requested = report.requested,
            generated = report.generated,
            joined = report.joined,
            failed = report.failed.len(),
            inserted = report.programs_inserted,
            "Generated programs for all channels"
        );
        Ok(report)
    }

    async fn generate_locked(
        &self,
        channel_id: Uuid,
        hours: Option<u32>,
    ) -> AppResult<GenerationOutcome> {
        let lineup = self.lineups.lineup(channel_id).await?;
        self.generate_with_lineup(channel_id, &lineup, hours).await
    }

    async fn generate_with_lineup(
        &self,
        channel_id: Uuid,
        lineup: &[ContentLineupItem],
        hours: Option<u32>,
    ) -> AppResult<GenerationOutcome> {
        let hours = match hours {
            Some(hours) => hours,
            None => self.settings.guide_days().await?.saturating_mul(24),
        };
        if hours == 0 {
            return Err(SchedulerError::InvalidWindow {
                message: "generation window must be at least one hour".to_string(),
            }
            .into());
        }

        if lineup.is_empty() {
            info!(channel_id = %channel_id, "Channel has no playable content, skipping generation");
            return Ok(GenerationOutcome::empty(channel_id));
        }

        let now = self.clock.now();
        let latest = match self.programs.find_airing_at(channel_id, now).await? {
            Some(airing) => Some(airing),
            None => self.programs.find_latest_started(channel_id, now).await?,
        };
        let selection = ScheduleGenerator::select_start(latest.as_ref(), now);

        let deleted = self
            .programs
            .delete_from(channel_id, selection.clear_from, selection.clear_inclusive)
            .await?;

        let window_end = offset_by(selection.start, Duration::try_hours(i64::from(hours)))?;
        let plan = self
            .generator
            .plan(channel_id, lineup, selection.start, window_end, 0);
        if plan.truncated {
            warn!(
                channel_id = %channel_id,
                max_programs = self.generator.max_programs(),
                reached = %plan.end_time,
                window_end = %window_end,
                "Program cap reached before the end of the generation window"
            );
        }

        let inserted = self.programs.insert_many(&plan.programs).await?;

        let overlaps_resolved = self.overlaps.resolve(channel_id).await?;
        let gaps_filled = self.gaps.fill(channel_id, lineup, now).await?.filled;

        info!(
            channel_id = %channel_id,
            start = %selection.start,
            end = %plan.end_time,
            preserved = selection.preserved.is_some(),
            deleted,
            inserted,
            truncated = plan.truncated,
            "Generated channel programs"
        );

        Ok(GenerationOutcome {
            channel_id,
            start_time: Some(selection.start),
            end_time: Some(plan.end_time),
            preserved_program: selection.preserved,
            deleted,
            inserted,
            truncated: plan.truncated,
            overlaps_resolved,
            gaps_filled,
        })
    }

    /// Repair and extend one channel's timeline
    pub async fn maintain_channel(
        &self,
        channel_id: Uuid,
    ) -> AppResult<LockOutcome<ChannelMaintenanceReport>> {
        self.locks
            .run_exclusive(channel_id, OperationKind::Maintain, || {
                self.maintain_locked(channel_id)
            })
            .await
    }

    async fn maintain_locked(&self, channel_id: Uuid) -> AppResult<ChannelMaintenanceReport> {
        let mut report = ChannelMaintenanceReport {
            channel_id,
            ..Default::default()
        };

        let lineup = self.lineups.lineup(channel_id).await?;
        report.overlaps_resolved = self.overlaps.resolve(channel_id).await?;

        if lineup.is_empty() {
            debug!(channel_id = %channel_id, "Channel has no playable content, nothing to extend");
            return Ok(report);
        }

        let now = self.clock.now();
        let first_fill = self.gaps.fill(channel_id, &lineup, now).await?;
        report.gaps_filled += first_fill.filled;

        let Some(last) = self.programs.find_last(channel_id).await? else {
            info!(channel_id = %channel_id, "Channel has no programs, generating from scratch");
            let outcome = self.generate_with_lineup(channel_id, &lineup, None).await?;
            report.programs_extended = outcome.inserted;
            report.regenerated = true;
            return Ok(report);
        };

        let guide_days = self.settings.guide_days().await?;
        let look_ahead = offset_by(now, Duration::try_days(i64::from(guide_days)))?;
        if last.end_time() < look_ahead {
            let start = last.end_time().max(truncate_to_seconds(now));
            let index = resume_index(&lineup, &last.content);
            let plan = self
                .generator
                .plan(channel_id, &lineup, start, look_ahead, index);
            if plan.truncated {
                warn!(channel_id = %channel_id, "Program cap reached while extending the guide");
            }
            report.programs_extended = self.programs.insert_many(&plan.programs).await?;
            debug!(
                channel_id = %channel_id,
                from = %start,
                to = %plan.end_time,
                resume_index = index,
                extended = report.programs_extended,
                "Extended channel guide"
            );
        }

        if !self.gaps.detect(channel_id, now).await?.is_empty() {
            let second_fill = self.gaps.fill(channel_id, &lineup, now).await?;
            report.gaps_filled += second_fill.filled;

            let remaining = self.gaps.detect(channel_id, now).await?;
            if !remaining.is_empty() {
                warn!(
                    channel_id = %channel_id,
                    remaining = remaining.len(),
                    "Gaps persist after two fill passes, regenerating channel"
                );
                self.generate_with_lineup(channel_id, &lineup, None).await?;
                report.regenerated = true;
            }
        }

        Ok(report)
    }

    /// Maintain every channel; failures are logged per channel and the pass
    /// continues
    pub async fn maintain_programs(&self) -> AppResult<MaintenanceReport> {
        let channel_ids = self.lineups.channel_ids().await?;
        let mut report = MaintenanceReport {
            channels: channel_ids.len(),
            ..Default::default()
        };

        let results: Vec<_> = stream::iter(channel_ids)
            .map(|channel_id| async move { (channel_id, self.maintain_channel(channel_id).await) })
            .buffer_unordered(MAINTENANCE_CONCURRENCY)
            .collect()
            .await;

        for (channel_id, result) in results {
            match result {
                Ok(LockOutcome::Ran(channel_report)) => report.record(&channel_report),
                Ok(LockOutcome::Joined) => report.joined += 1,
                Err(e) => {
                    error!(channel_id = %channel_id, "Channel maintenance failed: {}", e);
                    report.failed.push(ChannelFailure {
                        channel_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            channels = report.channels,
            maintained = report.maintained,
            joined = report.joined,
            failed = report.failed.len(),
            overlaps_resolved = report.overlaps_resolved,
            gaps_filled = report.gaps_filled,
            extended = report.programs_extended,
            regenerated = report.regenerated,
            "Program maintenance pass completed"
        );
        Ok(report)
    }

    /// Delete programs that ended longer ago than the retention period
    pub async fn cleanup_old_programs(&self) -> AppResult<u64> {
        let cutoff = self.clock.now() - self.options.retention;
        let deleted = self.programs.delete_ended_before(cutoff).await?;
        if deleted > 0 {
            info!(cutoff = %cutoff, deleted, "Removed expired programs");
        }
        Ok(deleted)
    }

    /// Resolve overlaps on every channel that has programs
    pub async fn cleanup_all_overlaps(&self) -> AppResult<u64> {
        let mut changed = 0;
        for channel_id in self.programs.channel_ids().await? {
            let outcome = self
                .locks
                .run_exclusive(channel_id, OperationKind::ResolveOverlaps, || {
                    self.overlaps.resolve(channel_id)
                })
                .await;
            match outcome {
                Ok(LockOutcome::Ran(count)) => changed += count,
                Ok(LockOutcome::Joined) => {}
                Err(e) => error!(channel_id = %channel_id, "Overlap cleanup failed: {}", e),
            }
        }

        info!(changed, "Overlap cleanup completed");
        Ok(changed)
    }
}
