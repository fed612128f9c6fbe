//! Flattening of a channel's show/movie associations into a playback rotation

use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{ChannelLibrary, ContentLineupItem, ContentRef, MovieEntry, ShowEntry};

/// Builds the ordered, duration-validated rotation for one channel
#[derive(Debug, Clone)]
pub struct ContentLineupBuilder {
    max_duration_ms: i64,
}

enum Association<'a> {
    Show(&'a ShowEntry),
    Movie(&'a MovieEntry),
}

impl Association<'_> {
    fn order(&self) -> i32 {
        match self {
            Association::Show(show) => show.order,
            Association::Movie(movie) => movie.order,
        }
    }
}

impl Default for ContentLineupBuilder {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

impl ContentLineupBuilder {
    pub fn new(max_item_duration: Duration) -> Self {
        Self {
            max_duration_ms: i64::try_from(max_item_duration.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Merge shows and movies on their `order`, expanding every show into its
    /// episodes by season then episode number.
    ///
    /// Items without a usable duration are skipped. An empty result means the
    /// channel has nothing to play.
    pub fn build(&self, library: &ChannelLibrary) -> Vec<ContentLineupItem> {
        let mut associations: Vec<Association<'_>> = library
            .shows
            .iter()
            .map(Association::Show)
            .chain(library.movies.iter().map(Association::Movie))
            .collect();
        // Stable: on equal order shows stay ahead of movies, then input order
        associations.sort_by_key(Association::order);

        let mut lineup = Vec::new();
        let mut dropped = 0usize;

        for association in associations {
            match association {
                Association::Show(show) => {
                    let mut episodes: Vec<_> = show.episodes.iter().collect();
                    episodes.sort_by_key(|e| (e.season_number, e.episode_number));

                    for episode in episodes {
                        let content = ContentRef::Episode(episode.episode_id);
                        match self.validate_duration(content, episode.duration_ms) {
                            Some(duration_ms) => lineup.push(ContentLineupItem {
                                content,
                                duration_ms,
                                lineup_order: show.order,
                            }),
                            None => dropped += 1,
                        }
                    }
                }
                Association::Movie(movie) => {
                    let content = ContentRef::Movie(movie.movie_id);
                    match self.validate_duration(content, movie.duration_ms) {
                        Some(duration_ms) => lineup.push(ContentLineupItem {
                            content,
                            duration_ms,
                            lineup_order: movie.order,
                        }),
                        None => dropped += 1,
                    }
                }
            }
        }

        debug!(
            channel_id = %library.channel_id,
            items = lineup.len(),
            dropped,
            "Built content lineup"
        );

        lineup
    }

    fn validate_duration(&self, content: ContentRef, duration_ms: Option<i64>) -> Option<i64> {
        match duration_ms {
            None => {
                warn!(%content, "Skipping lineup item without a duration");
                None
            }
            Some(ms) if ms <= 0 => {
                warn!(%content, duration_ms = ms, "Skipping lineup item with non-positive duration");
                None
            }
            Some(ms) if ms > self.max_duration_ms => {
                warn!(
                    %content,
                    duration_ms = ms,
                    max_duration_ms = self.max_duration_ms,
                    "Skipping lineup item with implausible duration"
                );
                None
            }
            Some(ms) => Some(ms),
        }
    }
}
