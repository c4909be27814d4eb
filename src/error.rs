//! Error types
//!
//! Tick errors abort the current resolver step without committing anything;
//! the next tick proceeds from the last committed state.

use thiserror::Error;

use crate::sim::TargetId;

/// A resolver step could not classify or orient the ball
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    /// The registry reported a layer with no surface category
    #[error("target {target} reports unknown collision layer {layer}")]
    UnknownLayer { target: TargetId, layer: u8 },

    /// A sweep returned a handle the registry does not know
    #[error("target {0} is not registered on the board")]
    UnknownTarget(TargetId),

    /// A direction could not be normalized
    #[error("direction ({x}, {y}) has no usable length")]
    DegenerateDirection { x: f32, y: f32 },
}

/// Configuration could not be loaded or failed validation
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to parse tuning: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read tuning: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid tuning `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A session could not be started or restored
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Tuning(#[from] TuningError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
