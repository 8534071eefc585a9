//! CLI error type.

use std::path::PathBuf;

use stock_allocation_core::{PackSizeChoice, SessionError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scenario file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Scenario file is not valid YAML or is missing fields.
    #[error("Invalid scenario: {0}")]
    Scenario(#[from] serde_yaml::Error),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// The requested pack size is not one of the item's offered sizes.
    #[error("Pack size {0} is not offered for this item")]
    PackSizeNotOffered(PackSizeChoice),
}
