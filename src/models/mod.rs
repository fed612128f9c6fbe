use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod lineup;
pub mod program;

pub use lineup::{ChannelLibrary, ContentLineupItem, EpisodeEntry, MovieEntry, ShowEntry};
pub use program::{ContentKind, ContentRef, NewProgram, Program};

/// A virtual channel as stored in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub number: Option<i32>,
    pub created_at: DateTime<Utc>,
}
