//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use gantry_framework::RegistrationError;

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A command or trigger could not be registered.
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
