//! Error types shared by the repositories, the timeline engine and the CLI

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// The channel (or other resource) disappeared before or during the operation
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// A config value that only fails once the scheduler interprets it
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// A stored value could not be mapped back onto the domain model
    #[error("Invalid stored value: {table}.{field} = {value}")]
    InvalidValue {
        table: String,
        field: String,
        value: String,
    },

    /// An update addressed a row that no longer exists
    #[error("Record not found: {table} with {field} = {value}")]
    RecordNotFound {
        table: String,
        field: String,
        value: String,
    },
}

/// Errors raised by the program timeline engine itself
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// A caller joined an in-flight operation on the channel and that
    /// operation failed
    #[error("Coalesced operation on channel {channel_id} failed: {message}")]
    Coalesced { channel_id: Uuid, message: String },

    /// The in-flight operation was dropped before it reported completion
    #[error("In-flight operation on channel {channel_id} was abandoned")]
    Abandoned { channel_id: Uuid },

    /// A generation window that cannot produce any program
    #[error("Invalid generation window: {message}")]
    InvalidWindow { message: String },
}

impl AppError {
    pub fn not_found<R: Into<String>, I: ToString>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error means the addressed resource no longer exists
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::NotFound { .. }
                | AppError::Repository(RepositoryError::RecordNotFound { .. })
        )
    }
}

impl RepositoryError {
    pub fn invalid_value<T: Into<String>, F: Into<String>, V: ToString>(
        table: T,
        field: F,
        value: V,
    ) -> Self {
        Self::InvalidValue {
            table: table.into(),
            field: field.into(),
            value: value.to_string(),
        }
    }
}
