//! Arkanoid core - ball physics and collision resolution for a breakout game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (swept collisions, ball resolver, board, session)
//! - `tuning`: Data-driven game balance
//! - `error`: Error types for the tick path and configuration

pub mod error;
pub mod sim;
pub mod tuning;

pub use error::{ResolveError, SessionError, TuningError};
pub use tuning::Tuning;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for smooth physics)
    pub const SIM_DT: f32 = 1.0 / 120.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Collision layers reported by the board registry
    pub const PADDLE_LAYER: u8 = 6;
    pub const BLOCKS_LAYER: u8 = 7;
    pub const BOTTOM_LAYER: u8 = 8;
    pub const WALLS_LAYER: u8 = 9;

    /// Arena half extents (world units, viewport centered at origin)
    pub const ARENA_HALF_WIDTH: f32 = 2.8;
    pub const ARENA_HALF_HEIGHT: f32 = 5.0;
    /// Thickness of the wall and bottom sensor colliders
    pub const WALL_THICKNESS: f32 = 0.5;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 0.1;
    pub const BALL_START_SPEED: f32 = 4.0;
    /// Degrees of spread between paddle edges and straight up
    pub const PADDLE_REDIRECT_ANGLE: f32 = 80.0;
    /// Nudge along the new direction after a bounce
    pub const OFFSET_ON_HIT: f32 = 0.01;
    /// Normals whose dot product exceeds this are treated as facing the same way
    pub const PARALLEL_NORMALS_DOT: f32 = 0.1;

    /// Paddle defaults
    pub const PADDLE_WIDTH: f32 = 1.0;
    pub const PADDLE_HEIGHT: f32 = 0.2;
    pub const PADDLE_Y: f32 = -4.2;
}

/// Rotate the up axis counter-clockwise by `degrees`
#[inline]
pub fn rotated_up(degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(-sin, cos)
}

/// Signed angle (degrees) of `dir` from straight up, counter-clockwise positive
#[inline]
pub fn angle_from_up(dir: Vec2) -> f32 {
    Vec2::Y.angle_to(dir).to_degrees()
}
