//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::SchedulerConfig;

/// Validate configuration
pub fn validate_config(config: &SchedulerConfig) -> Result<()> {
    debug!("validating configuration");
    require_positive("workers", config.workers)?;
    require_positive("build_attempts", config.build_attempts)?;
    require_positive("check_attempts", config.check_attempts)?;
    require_positive("channel_capacity", config.channel_capacity)?;
    validate_ignored_packages(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn require_positive(field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }
    Ok(())
}

fn validate_ignored_packages(config: &SchedulerConfig) -> Result<()> {
    for (i, pkg) in config.ignored_packages.iter().enumerate() {
        if pkg.name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("ignored_packages[{}].name", i),
                message: "name cannot be empty".to_string(),
            }
            .into());
        }
        if pkg.version.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: format!("ignored_packages[{}].version", i),
                message: "version cannot be empty".to_string(),
            }
            .into());
        }
    }
    Ok(())
}
