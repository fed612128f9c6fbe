//! SeaORM-based Channel repository implementation
//!
//! Reads channels and their show/movie associations from the library tables.
//! The library itself is populated by the media sync, which lives elsewhere.

use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{
    channel_movies, channel_shows, channels, episodes, movies,
    prelude::{ChannelMovies, ChannelShows, Channels, Episodes, Movies, Shows},
    shows,
};
use crate::errors::RepositoryResult;
use crate::models::{Channel, ChannelLibrary, EpisodeEntry, MovieEntry, ShowEntry};

/// SeaORM repository for channels and their lineup associations
#[derive(Clone)]
pub struct ChannelSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ChannelSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn create(&self, name: &str, number: Option<i32>) -> RepositoryResult<Channel> {
        let model = channels::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            number: Set(number),
            created_at: Set(Utc::now()),
        };
        let model = Channels::insert(model)
            .exec_with_returning(&*self.connection)
            .await?;

        Ok(self.model_to_domain(model))
    }

    pub async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Channel>> {
        let model = Channels::find_by_id(id).one(&*self.connection).await?;
        Ok(model.map(|m| self.model_to_domain(m)))
    }

    /// All channels ordered by channel number, then name
    pub async fn list_all(&self) -> RepositoryResult<Vec<Channel>> {
        let models = Channels::find()
            .order_by_asc(channels::Column::Number)
            .order_by_asc(channels::Column::Name)
            .all(&*self.connection)
            .await?;

        Ok(models.into_iter().map(|m| self.model_to_domain(m)).collect())
    }

    pub async fn list_ids(&self) -> RepositoryResult<Vec<Uuid>> {
        Ok(self.list_all().await?.into_iter().map(|c| c.id).collect())
    }

    /// Associate a show with a channel at the given lineup position
    pub async fn attach_show(
        &self,
        channel_id: Uuid,
        show_id: Uuid,
        sort_order: i32,
    ) -> RepositoryResult<()> {
        let model = channel_shows::ActiveModel {
            id: Set(Uuid::new_v4()),
            channel_id: Set(channel_id),
            show_id: Set(show_id),
            sort_order: Set(sort_order),
        };
        ChannelShows::insert(model)
            .exec_without_returning(&*self.connection)
            .await?;
        Ok(())
    }

    /// Associate a movie with a channel at the given lineup position
    pub async fn attach_movie(
        &self,
        channel_id: Uuid,
        movie_id: Uuid,
        sort_order: i32,
    ) -> RepositoryResult<()> {
        let model = channel_movies::ActiveModel {
            id: Set(Uuid::new_v4()),
            channel_id: Set(channel_id),
            movie_id: Set(movie_id),
            sort_order: Set(sort_order),
        };
        ChannelMovies::insert(model)
            .exec_without_returning(&*self.connection)
            .await?;
        Ok(())
    }

    pub async fn detach_movie(&self, channel_id: Uuid, movie_id: Uuid) -> RepositoryResult<u64> {
        let result = ChannelMovies::delete_many()
            .filter(channel_movies::Column::ChannelId.eq(channel_id))
            .filter(channel_movies::Column::MovieId.eq(movie_id))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    /// Load everything the lineup builder needs for one channel
    ///
    /// Returns `None` when the channel does not exist.
    pub async fn load_library(&self, channel_id: Uuid) -> RepositoryResult<Option<ChannelLibrary>> {
        if Channels::find_by_id(channel_id)
            .one(&*self.connection)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let show_links = ChannelShows::find()
            .filter(channel_shows::Column::ChannelId.eq(channel_id))
            .order_by_asc(channel_shows::Column::SortOrder)
            .all(&*self.connection)
            .await?;
        let show_ids: Vec<Uuid> = show_links.iter().map(|link| link.show_id).collect();

        let mut show_titles: HashMap<Uuid, String> = HashMap::new();
        let mut episodes_by_show: HashMap<Uuid, Vec<EpisodeEntry>> = HashMap::new();
        if !show_ids.is_empty() {
            for show in Shows::find()
                .filter(shows::Column::Id.is_in(show_ids.clone()))
                .all(&*self.connection)
                .await?
            {
                show_titles.insert(show.id, show.title);
            }

            for episode in Episodes::find()
                .filter(episodes::Column::ShowId.is_in(show_ids))
                .order_by_asc(episodes::Column::SeasonNumber)
                .order_by_asc(episodes::Column::EpisodeNumber)
                .all(&*self.connection)
                .await?
            {
                episodes_by_show
                    .entry(episode.show_id)
                    .or_default()
                    .push(EpisodeEntry {
                        episode_id: episode.id,
                        season_number: episode.season_number,
                        episode_number: episode.episode_number,
                        duration_ms: episode.duration_ms,
                    });
            }
        }

        // A dangling association (show row gone) contributes nothing
        let shows = show_links
            .into_iter()
            .filter_map(|link| {
                let title = show_titles.get(&link.show_id)?.clone();
                Some(ShowEntry {
                    show_id: link.show_id,
                    title,
                    order: link.sort_order,
                    episodes: episodes_by_show.remove(&link.show_id).unwrap_or_default(),
                })
            })
            .collect();

        let movie_links = ChannelMovies::find()
            .filter(channel_movies::Column::ChannelId.eq(channel_id))
            .order_by_asc(channel_movies::Column::SortOrder)
            .all(&*self.connection)
            .await?;

        let mut movie_rows: HashMap<Uuid, movies::Model> = HashMap::new();
        if !movie_links.is_empty() {
            for movie in Movies::find()
                .filter(movies::Column::Id.is_in(movie_links.iter().map(|link| link.movie_id)))
                .all(&*self.connection)
                .await?
            {
                movie_rows.insert(movie.id, movie);
            }
        }

        let movies = movie_links
            .into_iter()
            .filter_map(|link| {
                let movie = movie_rows.get(&link.movie_id)?;
                Some(MovieEntry {
                    movie_id: movie.id,
                    title: movie.title.clone(),
                    order: link.sort_order,
                    duration_ms: movie.duration_ms,
                })
            })
            .collect();

        Ok(Some(ChannelLibrary {
            channel_id,
            shows,
            movies,
        }))
    }

    fn model_to_domain(&self, model: channels::Model) -> Channel {
        Channel {
            id: model.id,
            name: model.name,
            number: model.number,
            created_at: model.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn insert_show(db: &Database, title: &str, episodes: &[(i32, i32, Option<i64>)]) -> Uuid {
        let show_id = Uuid::new_v4();
        Shows::insert(shows::ActiveModel {
            id: Set(show_id),
            title: Set(title.to_string()),
        })
        .exec_without_returning(&*db.connection())
        .await
        .unwrap();

        for (season, episode, duration_ms) in episodes {
            Episodes::insert(episodes::ActiveModel {
                id: Set(Uuid::new_v4()),
                show_id: Set(show_id),
                season_number: Set(*season),
                episode_number: Set(*episode),
                title: Set(None),
                duration_ms: Set(*duration_ms),
            })
            .exec_without_returning(&*db.connection())
            .await
            .unwrap();
        }
        show_id
    }

    async fn insert_movie(db: &Database, title: &str, duration_ms: Option<i64>) -> Uuid {
        let movie_id = Uuid::new_v4();
        Movies::insert(movies::ActiveModel {
            id: Set(movie_id),
            title: Set(title.to_string()),
            duration_ms: Set(duration_ms),
        })
        .exec_without_returning(&*db.connection())
        .await
        .unwrap();
        movie_id
    }

    #[tokio::test]
    async fn test_load_library_for_missing_channel() {
        let db = Database::in_memory().await.unwrap();
        let repo = ChannelSeaOrmRepository::new(db.connection());

        assert!(repo.load_library(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_library_collects_associations() {
        let db = Database::in_memory().await.unwrap();
        let repo = ChannelSeaOrmRepository::new(db.connection());

        let channel = repo.create("Sitcoms", Some(5)).await.unwrap();
        let show_id = insert_show(
            &db,
            "Show",
            &[(2, 1, Some(1_000)), (1, 2, Some(1_000)), (1, 1, None)],
        )
        .await;
        let movie_id = insert_movie(&db, "Movie", Some(5_000)).await;

        repo.attach_show(channel.id, show_id, 1).await.unwrap();
        repo.attach_movie(channel.id, movie_id, 0).await.unwrap();

        let library = repo.load_library(channel.id).await.unwrap().unwrap();
        assert_eq!(library.channel_id, channel.id);
        assert_eq!(library.shows.len(), 1);
        assert_eq!(library.shows[0].order, 1);

        let numbers: Vec<_> = library.shows[0]
            .episodes
            .iter()
            .map(|e| (e.season_number, e.episode_number))
            .collect();
        assert_eq!(numbers, vec![(1, 1), (1, 2), (2, 1)]);

        assert_eq!(library.movies.len(), 1);
        assert_eq!(library.movies[0].duration_ms, Some(5_000));

        assert_eq!(repo.detach_movie(channel.id, movie_id).await.unwrap(), 1);
        let library = repo.load_library(channel.id).await.unwrap().unwrap();
        assert!(library.movies.is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_by_number() {
        let db = Database::in_memory().await.unwrap();
        let repo = ChannelSeaOrmRepository::new(db.connection());

        let second = repo.create("B", Some(2)).await.unwrap();
        let first = repo.create("A", Some(1)).await.unwrap();

        assert_eq!(repo.list_ids().await.unwrap(), vec![first.id, second.id]);
        assert_eq!(
            repo.find_by_id(first.id).await.unwrap().unwrap().name,
            "A"
        );
    }
}
