//! SeaORM-based key/value settings repository

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, EntityTrait};
use std::sync::Arc;
use tracing::warn;

use crate::entities::{prelude::Settings, settings};
use crate::errors::RepositoryResult;

/// Key of the global guide horizon setting
pub const GUIDE_DAYS_KEY: &str = "guide_days";

#[derive(Clone)]
pub struct SettingsSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
    default_guide_days: u32,
}

impl SettingsSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>, default_guide_days: u32) -> Self {
        Self {
            connection,
            default_guide_days,
        }
    }

    pub async fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        let model = Settings::find_by_id(key.to_string())
            .one(&*self.connection)
            .await?;
        Ok(model.map(|m| m.value))
    }

    /// Insert or replace a setting
    pub async fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let model = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now()),
        };

        Settings::insert(model)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&*self.connection)
            .await?;
        Ok(())
    }

    /// Guide horizon in days; a missing, unparsable or zero value falls back
    /// to the configured default
    pub async fn guide_days(&self) -> RepositoryResult<u32> {
        let Some(raw) = self.get(GUIDE_DAYS_KEY).await? else {
            return Ok(self.default_guide_days);
        };

        match raw.trim().parse::<u32>() {
            Ok(days) if days > 0 => Ok(days),
            _ => {
                warn!(
                    "Ignoring invalid {} setting '{}', using default of {}",
                    GUIDE_DAYS_KEY, raw, self.default_guide_days
                );
                Ok(self.default_guide_days)
            }
        }
    }
}
