use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ContentRef;

/// One playable unit in a channel's rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentLineupItem {
    pub content: ContentRef,
    pub duration_ms: i64,
    /// Position inherited from the channel association's `order`
    pub lineup_order: i32,
}

/// Everything the lineup builder needs to know about a channel's content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLibrary {
    pub channel_id: Uuid,
    pub shows: Vec<ShowEntry>,
    pub movies: Vec<MovieEntry>,
}

/// A show attached to a channel, with all of its episodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowEntry {
    pub show_id: Uuid,
    pub title: String,
    pub order: i32,
    pub episodes: Vec<EpisodeEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeEntry {
    pub episode_id: Uuid,
    pub season_number: i32,
    pub episode_number: i32,
    /// `None` when the library never reported a runtime
    pub duration_ms: Option<i64>,
}

/// A movie attached to a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieEntry {
    pub movie_id: Uuid,
    pub title: String,
    pub order: i32,
    pub duration_ms: Option<i64>,
}
