//! Centralized error handling for tvloop
//!
//! This module provides a single error hierarchy shared by the persistence
//! layer, the scheduling engine and the operator CLI.
//!
//! # Error Categories
//!
//! - **Database Errors**: SeaORM operations, migrations, connection issues
//! - **Repository Errors**: Data access layer failures and malformed rows
//! - **Scheduler Errors**: Coalesced/abandoned channel operations, bad windows
//! - **Configuration Errors**: Duration strings the scheduler cannot interpret
//! - **Not Found**: A channel (or other resource) vanished mid-operation
//!
//! # Usage
//!
//! ```rust
//! use tvloop::errors::{AppError, AppResult};
//! use uuid::Uuid;
//!
//! fn require_channel(found: bool, channel_id: Uuid) -> AppResult<()> {
//!     if !found {
//!         return Err(AppError::not_found("channel", channel_id));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_channel(false, Uuid::nil()).unwrap_err().is_not_found());
//! ```

pub mod types;

pub use types::*;

pub type AppResult<T> = Result<T, AppError>;

pub type RepositoryResult<T> = Result<T, RepositoryError>;
