//! Detects idle time on a channel's stored timeline and plugs it with lineup content

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::repositories::ProgramSeaOrmRepository;
use crate::errors::AppResult;
use crate::models::ContentLineupItem;
use crate::schedule::{Gap, find_gaps, plan_fills};

/// Result of one fill pass on a channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GapFillReport {
    pub detected: usize,
    pub filled: u64,
    pub unfillable: usize,
}

#[derive(Clone)]
pub struct GapFiller {
    programs: ProgramSeaOrmRepository,
    tolerance_ms: i64,
}

impl GapFiller {
    pub fn new(programs: ProgramSeaOrmRepository, tolerance_ms: i64) -> Self {
        Self {
            programs,
            tolerance_ms,
        }
    }

    /// Gaps on the channel that end after `now`; past gaps can no longer air
    pub async fn detect(&self, channel_id: Uuid, now: DateTime<Utc>) -> AppResult<Vec<Gap>> {
        let programs = self.programs.find_by_channel(channel_id).await?;
        Ok(find_gaps(&programs, self.tolerance_ms)
            .into_iter()
            .filter(|gap| gap.end > now)
            .collect())
    }

    /// Insert at most one fitting lineup item at the start of every future gap
    pub async fn fill(
        &self,
        channel_id: Uuid,
        lineup: &[ContentLineupItem],
        now: DateTime<Utc>,
    ) -> AppResult<GapFillReport> {
        let gaps = self.detect(channel_id, now).await?;
        if gaps.is_empty() {
            return Ok(GapFillReport::default());
        }

        let plan = plan_fills(channel_id, &gaps, lineup);
        for gap in &plan.unfillable {
            warn!(
                channel_id = %channel_id,
                gap_start = %gap.start,
                gap_end = %gap.end,
                gap_ms = gap.duration_ms(),
                "No lineup item fits gap"
            );
        }

        let filled = self.programs.insert_many(&plan.programs).await?;
        info!(
            channel_id = %channel_id,
            detected = gaps.len(),
            filled,
            unfillable = plan.unfillable.len(),
            "Filled program gaps"
        );

        Ok(GapFillReport {
            detected: gaps.len(),
            filled,
            unfillable: plan.unfillable.len(),
        })
    }
}
