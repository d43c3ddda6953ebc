//! Error types for the CADENCE runtime
//!
//! Scheduling conflicts are not errors: a request that loses arbitration is
//! reported through [`ScheduleOutcome`](crate::scheduling::ScheduleOutcome).
//! The variants here cover configuration mistakes, misuse of the binding
//! API, and faults raised from inside a command.

use crate::core::{CommandId, ResourceId};
use thiserror::Error;

/// Result alias used across the crate
pub type CadenceResult<T> = Result<T, CadenceError>;

/// Main error type for CADENCE
#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown command {0}")]
    UnknownCommand(CommandId),

    #[error("Unknown resource {0}")]
    UnknownResource(ResourceId),

    #[error("Command '{command}' does not require resource {resource}")]
    NotRequired { command: String, resource: ResourceId },

    #[error("Commands '{first}' and '{second}' in a parallel group both require {resource}")]
    OverlappingRequirements {
        first: String,
        second: String,
        resource: ResourceId,
    },

    #[error("Proxy '{proxy}' produced '{produced}' requiring {resource} outside its declared set")]
    ProxyRequirement {
        proxy: String,
        produced: String,
        resource: ResourceId,
    },

    #[error("Command execution failed: {0}")]
    Execution(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CadenceError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<toml::de::Error> for CadenceError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for CadenceError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for CadenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<anyhow::Error> for CadenceError {
    fn from(err: anyhow::Error) -> Self {
        Self::Execution(format!("{:#}", err))
    }
}
