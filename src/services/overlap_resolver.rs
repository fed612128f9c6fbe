//! Applies earliest-wins overlap repairs to a channel's stored timeline

use tracing::{debug, info};
use uuid::Uuid;

use crate::database::repositories::ProgramSeaOrmRepository;
use crate::errors::AppResult;
use crate::schedule::{Overlap, Resolution, find_overlaps, plan_resolutions};

#[derive(Clone)]
pub struct OverlapResolver {
    programs: ProgramSeaOrmRepository,
}

impl OverlapResolver {
    pub fn new(programs: ProgramSeaOrmRepository) -> Self {
        Self { programs }
    }

    pub async fn detect(&self, channel_id: Uuid) -> AppResult<Vec<Overlap>> {
        let programs = self.programs.find_by_channel(channel_id).await?;
        Ok(find_overlaps(&programs))
    }

    /// Make the channel overlap-free; returns how many programs were shifted
    /// or deleted
    pub async fn resolve(&self, channel_id: Uuid) -> AppResult<u64> {
        let programs = self.programs.find_by_channel(channel_id).await?;
        let resolutions = plan_resolutions(&programs);
        if resolutions.is_empty() {
            return Ok(0);
        }

        let mut deletions = Vec::new();
        let mut shifts = Vec::new();
        for resolution in &resolutions {
            match resolution {
                Resolution::Delete { program_id } => deletions.push(*program_id),
                Resolution::Shift { program_id, to, .. } => shifts.push((*program_id, *to)),
            }
        }

        let deleted = self.programs.delete_by_ids(&deletions).await?;
        for (program_id, to) in &shifts {
            debug!(channel_id = %channel_id, program_id = %program_id, to = %to, "Shifting overlapping program");
            self.programs.shift_start(*program_id, *to).await?;
        }

        let changed = deleted + shifts.len() as u64;
        info!(
            channel_id = %channel_id,
            deleted,
            shifted = shifts.len(),
            "Resolved overlapping programs"
        );
        Ok(changed)
    }
}
