//! Service layer trait definitions
//!
//! Seams between the timeline engine and the collaborators it depends on.
//! The engine never reads the media library or the settings store directly;
//! it asks these traits, which keeps it testable with in-memory doubles.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::ContentLineupItem;

/// Source of a channel's playable rotation
#[async_trait]
pub trait LineupProvider: Send + Sync {
    /// Ordered, duration-validated lineup for one channel
    ///
    /// # Returns
    ///
    /// * `Ok(vec)` - The lineup; empty when the channel has nothing playable
    /// * `Err(AppError::NotFound)` - The channel does not exist
    async fn lineup(&self, channel_id: Uuid) -> AppResult<Vec<ContentLineupItem>>;

    /// Every channel that should have a timeline
    async fn channel_ids(&self) -> AppResult<Vec<Uuid>>;
}

/// Access to the global guide horizon
#[async_trait]
pub trait GuideSettings: Send + Sync {
    /// How many days ahead programs must exist
    async fn guide_days(&self) -> AppResult<u32>;
}
