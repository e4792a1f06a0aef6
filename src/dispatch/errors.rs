//! Error types for wiring up a dispatcher.

use thiserror::Error;

use crate::chat::errors::StoreError;
use crate::config::ConfigError;

/// Failure while assembling a [`crate::dispatch::DispatchFlow`] from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Configuration rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Local store could not be opened or read.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result alias for setup operations.
pub type SetupResult<T> = Result<T, SetupError>;
