//! Logging initialisation

use anyhow::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter directive for a CLI log level
pub fn default_filter(log_level: &str) -> String {
    if log_level == "trace" {
        format!("tvloop={log_level},sea_orm=debug")
    } else {
        format!("tvloop={log_level}")
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `log_level` when set.
pub fn init_logging(log_level: &str, json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_filter(log_level)))?;

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }
    Ok(())
}
