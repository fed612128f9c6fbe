use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Kind of library content a program plays
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentKind {
    Episode,
    Movie,
}

/// Reference to exactly one playable item in the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ContentRef {
    Episode(Uuid),
    Movie(Uuid),
}

impl ContentRef {
    pub fn new(kind: ContentKind, id: Uuid) -> Self {
        match kind {
            ContentKind::Episode => ContentRef::Episode(id),
            ContentKind::Movie => ContentRef::Movie(id),
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            ContentRef::Episode(_) => ContentKind::Episode,
            ContentRef::Movie(_) => ContentKind::Movie,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ContentRef::Episode(id) | ContentRef::Movie(id) => *id,
        }
    }

    pub fn episode_id(&self) -> Option<Uuid> {
        match self {
            ContentRef::Episode(id) => Some(*id),
            ContentRef::Movie(_) => None,
        }
    }

    pub fn movie_id(&self) -> Option<Uuid> {
        match self {
            ContentRef::Movie(id) => Some(*id),
            ContentRef::Episode(_) => None,
        }
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// A persisted broadcast slot on a channel's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub content: ContentRef,
}

impl Program {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::milliseconds(self.duration_ms)
    }

    /// Whether the program is on air at `instant` (half-open interval)
    pub fn is_airing_at(&self, instant: DateTime<Utc>) -> bool {
        self.start_time <= instant && instant < self.end_time()
    }

    pub fn overlaps(&self, other: &Program) -> bool {
        self.start_time < other.end_time() && other.start_time < self.end_time()
    }
}

/// A planned slot that has not been written yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProgram {
    pub channel_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub duration_ms: i64,
    pub content: ContentRef,
}

impl NewProgram {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + Duration::milliseconds(self.duration_ms)
    }
}
