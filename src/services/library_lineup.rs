//! Library-backed implementations of the engine's collaborator traits

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::database::repositories::{ChannelSeaOrmRepository, SettingsSeaOrmRepository};
use crate::errors::{AppError, AppResult};
use crate::models::ContentLineupItem;
use crate::schedule::ContentLineupBuilder;
use crate::services::traits::{GuideSettings, LineupProvider};

/// Builds lineups from the channel/show/episode/movie tables
#[derive(Clone)]
pub struct LibraryLineupProvider {
    channels: ChannelSeaOrmRepository,
    builder: ContentLineupBuilder,
}

impl LibraryLineupProvider {
    pub fn new(channels: ChannelSeaOrmRepository, builder: ContentLineupBuilder) -> Self {
        Self { channels, builder }
    }
}

#[async_trait]
impl LineupProvider for LibraryLineupProvider {
    async fn lineup(&self, channel_id: Uuid) -> AppResult<Vec<ContentLineupItem>> {
        let library = self
            .channels
            .load_library(channel_id)
            .await?
            .ok_or_else(|| AppError::not_found("channel", channel_id))?;

        let lineup = self.builder.build(&library);
        debug!(
            channel_id = %channel_id,
            shows = library.shows.len(),
            movies = library.movies.len(),
            items = lineup.len(),
            "Loaded channel lineup"
        );
        Ok(lineup)
    }

    async fn channel_ids(&self) -> AppResult<Vec<Uuid>> {
        Ok(self.channels.list_ids().await?)
    }
}

#[async_trait]
impl GuideSettings for SettingsSeaOrmRepository {
    async fn guide_days(&self) -> AppResult<u32> {
        Ok(SettingsSeaOrmRepository::guide_days(self).await?)
    }
}
