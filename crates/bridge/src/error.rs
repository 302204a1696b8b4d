//! Bridge error types

use contracts::ContractError;
use thiserror::Error;

/// Bridge specific error
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Engine construction error
    #[error("failed to create engine: {message}")]
    EngineCreate { message: String },

    /// Engine step error
    #[error("engine step failed: {message}")]
    Step { message: String },

    /// Engine reset error
    #[error("engine reset failed: {message}")]
    Reset { message: String },

    /// Named camera is not registered
    #[error("sensor not found: {name}")]
    SensorNotFound { name: String },

    /// Render or readback error
    #[error("failed to capture frame from '{sensor}': {message}")]
    Capture { sensor: String, message: String },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl BridgeError {
    /// Create capture error
    pub fn capture(sensor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Capture {
            sensor: sensor.into(),
            message: message.into(),
        }
    }

    /// Create step error
    pub fn step(message: impl Into<String>) -> Self {
        Self::Step {
            message: message.into(),
        }
    }

    /// Create reset error
    pub fn reset(message: impl Into<String>) -> Self {
        Self::Reset {
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, BridgeError>;
