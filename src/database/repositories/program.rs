//! SeaORM-based Program repository implementation
//!
//! All timeline reads and writes go through here. Start times are stored as
//! epoch milliseconds, so interval arithmetic (`start + duration`) is done in
//! SQL with plain integer expressions on every backend.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::entities::{prelude::Programs, programs};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{ContentKind, ContentRef, NewProgram, Program};
use crate::utils::time::{from_epoch_ms, to_epoch_ms};

/// Bound on ids per `IN (...)` clause
const DELETE_CHUNK_SIZE: usize = 500;

/// SeaORM repository for scheduled programs
#[derive(Clone)]
pub struct ProgramSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
    insert_batch_size: usize,
}

impl ProgramSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>, insert_batch_size: usize) -> Self {
        Self {
            connection,
            insert_batch_size: insert_batch_size.max(1),
        }
    }

    /// All programs of a channel ordered by start time
    pub async fn find_by_channel(&self, channel_id: Uuid) -> RepositoryResult<Vec<Program>> {
        let models = Programs::find()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .order_by_asc(programs::Column::StartTimeMs)
            .order_by_asc(programs::Column::Id)
            .all(&*self.connection)
            .await?;

        self.models_to_domain(models)
    }

    /// The program whose `[start, end)` interval contains `instant`, if any
    pub async fn find_airing_at(
        &self,
        channel_id: Uuid,
        instant: DateTime<Utc>,
    ) -> RepositoryResult<Option<Program>> {
        let instant_ms = to_epoch_ms(instant);
        let model = Programs::find()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .filter(programs::Column::StartTimeMs.lte(instant_ms))
            .filter(
                Expr::expr(
                    Expr::col(programs::Column::StartTimeMs)
                        .add(Expr::col(programs::Column::DurationMs)),
                )
                .gt(instant_ms),
            )
            .order_by_desc(programs::Column::StartTimeMs)
            .one(&*self.connection)
            .await?;

        model.map(Self::model_to_domain).transpose()
    }

    /// Most recent program that started at or before `instant`, aired out or not
    pub async fn find_latest_started(
        &self,
        channel_id: Uuid,
        instant: DateTime<Utc>,
    ) -> RepositoryResult<Option<Program>> {
        let model = Programs::find()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .filter(programs::Column::StartTimeMs.lte(to_epoch_ms(instant)))
            .order_by_desc(programs::Column::StartTimeMs)
            .one(&*self.connection)
            .await?;

        model.map(Self::model_to_domain).transpose()
    }

    /// The program with the latest start time on a channel
    pub async fn find_last(&self, channel_id: Uuid) -> RepositoryResult<Option<Program>> {
        let model = Programs::find()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .order_by_desc(programs::Column::StartTimeMs)
            .order_by_desc(programs::Column::DurationMs)
            .one(&*self.connection)
            .await?;

        model.map(Self::model_to_domain).transpose()
    }

    pub async fn count_by_channel(&self, channel_id: Uuid) -> RepositoryResult<u64> {
        let count = Programs::find()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .count(&*self.connection)
            .await?;

        Ok(count)
    }

    /// Distinct channel ids that currently have at least one program
    pub async fn channel_ids(&self) -> RepositoryResult<Vec<Uuid>> {
        let ids = Programs::find()
            .select_only()
            .column(programs::Column::ChannelId)
            .distinct()
            .into_tuple::<Uuid>()
            .all(&*self.connection)
            .await?;

        Ok(ids)
    }

    /// Delete the channel's programs starting after `from`, or at/after it
    /// when `inclusive` is set
    pub async fn delete_from(
        &self,
        channel_id: Uuid,
        from: DateTime<Utc>,
        inclusive: bool,
    ) -> RepositoryResult<u64> {
        let from_ms = to_epoch_ms(from);
        let start_filter = if inclusive {
            programs::Column::StartTimeMs.gte(from_ms)
        } else {
            programs::Column::StartTimeMs.gt(from_ms)
        };

        let result = Programs::delete_many()
            .filter(programs::Column::ChannelId.eq(channel_id))
            .filter(start_filter)
            .exec(&*self.connection)
            .await?;

        debug!(
            channel_id = %channel_id,
            from = %from,
            inclusive,
            deleted = result.rows_affected,
            "Cleared future programs"
        );
        Ok(result.rows_affected)
    }

    /// Delete every program (all channels) that ended before `cutoff`
    pub async fn delete_ended_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64> {
        let result = Programs::delete_many()
            .filter(
                Expr::expr(
                    Expr::col(programs::Column::StartTimeMs)
                        .add(Expr::col(programs::Column::DurationMs)),
                )
                .lt(to_epoch_ms(cutoff)),
            )
            .exec(&*self.connection)
            .await?;

        Ok(result.rows_affected)
    }

    pub async fn delete_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<u64> {
        let mut deleted = 0;
        for chunk in ids.chunks(DELETE_CHUNK_SIZE) {
            let result = Programs::delete_many()
                .filter(programs::Column::Id.is_in(chunk.iter().copied()))
                .exec(&*self.connection)
                .await?;
            deleted += result.rows_affected;
        }
        Ok(deleted)
    }

    /// Move a program to a new start time, keeping its duration
    pub async fn shift_start(&self, id: Uuid, start_time: DateTime<Utc>) -> RepositoryResult<()> {
        let result = Programs::update_many()
            .col_expr(
                programs::Column::StartTimeMs,
                Expr::value(to_epoch_ms(start_time)),
            )
            .filter(programs::Column::Id.eq(id))
            .exec(&*self.connection)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::RecordNotFound {
                table: "programs".to_string(),
                field: "id".to_string(),
                value: id.to_string(),
            });
        }
        Ok(())
    }

    /// Insert planned programs in chunks of `insert_batch_size`
    ///
    /// A chunk that fails as a whole is retried row by row; rows that still
    /// fail are logged and skipped. Returns the number of rows written.
    pub async fn insert_many(&self, programs: &[NewProgram]) -> RepositoryResult<u64> {
        let mut inserted = 0u64;
        let now = Utc::now();

        for chunk in programs.chunks(self.insert_batch_size) {
            let models: Vec<programs::ActiveModel> =
                chunk.iter().map(|p| Self::to_active_model(p, now)).collect();

            match Programs::insert_many(models)
                .exec_without_returning(&*self.connection)
                .await
            {
                Ok(rows) => inserted += rows,
                Err(e) => {
                    warn!(
                        "Batch insert of {} programs failed, falling back to row-by-row: {}",
                        chunk.len(),
                        e
                    );
                    for program in chunk {
                        match Programs::insert(Self::to_active_model(program, now))
                            .exec_without_returning(&*self.connection)
                            .await
                        {
                            Ok(rows) => inserted += rows,
                            Err(e) => error!(
                                channel_id = %program.channel_id,
                                start_time = %program.start_time,
                                content = %program.content,
                                "Skipping program that could not be inserted: {}",
                                e
                            ),
                        }
                    }
                }
            }
        }

        Ok(inserted)
    }

    fn to_active_model(program: &NewProgram, created_at: DateTime<Utc>) -> programs::ActiveModel {
        programs::ActiveModel {
            id: Set(Uuid::new_v4()),
            channel_id: Set(program.channel_id),
            start_time_ms: Set(to_epoch_ms(program.start_time)),
            duration_ms: Set(program.duration_ms),
            content_kind: Set(program.content.kind().to_string()),
            content_id: Set(program.content.id()),
            created_at: Set(created_at),
        }
    }

    fn model_to_domain(model: programs::Model) -> RepositoryResult<Program> {
        let kind = ContentKind::from_str(&model.content_kind).map_err(|_| {
            RepositoryError::invalid_value("programs", "content_kind", &model.content_kind)
        })?;

        Ok(Program {
            id: model.id,
            channel_id: model.channel_id,
            start_time: from_epoch_ms(model.start_time_ms)?,
            duration_ms: model.duration_ms,
            content: ContentRef::new(kind, model.content_id),
        })
    }

    fn models_to_domain(&self, models: Vec<programs::Model>) -> RepositoryResult<Vec<Program>> {
        models.into_iter().map(Self::model_to_domain).collect()
    }
}
