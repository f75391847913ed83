//! Error types for world construction, spawning, actions and engine control.

use crate::agent::AgentId;
use crate::clock::{ControlCommand, RunStatus};
use thiserror::Error;

/// Why a spawn was refused. A failed spawn never mutates the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SpawnError {
    #[error("spawn position is outside the grid")]
    OutOfBounds,
    #[error("spawn cell is already occupied")]
    CellOccupied,
    #[error("spawn energy and max energy must be finite and positive")]
    InvalidEnergy,
}

/// Invalid configuration detected before the engine is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("trait bounds for `{name}` are invalid: min {min} > max {max}")]
    InvalidTraitBounds { name: &'static str, min: f32, max: f32 },

    #[error("trait `{name}` = {value} is outside [{min}, {max}]")]
    TraitOutOfBounds {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// A malformed or unsupported action payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid action `{kind}`: {reason}")]
pub struct InvalidAction {
    pub kind: String,
    pub reason: String,
}

/// Errors surfaced by [`crate::Engine`] control and command handling.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot {command} while {from}")]
    InvalidTransition {
        from: RunStatus,
        command: ControlCommand,
    },

    #[error("agent {0} does not exist")]
    AgentNotFound(AgentId),

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
