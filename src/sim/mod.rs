//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by target ID)
//! - No rendering or platform dependencies

pub mod board;
pub mod collision;
pub mod effects;
pub mod geometry;
pub mod layout;
pub mod session;
pub mod state;
pub mod tick;

pub use board::{Block, BlockOutcome, Board, Collider, Paddle};
pub use collision::{
    CollisionWorld, LayerMask, SurfaceCategory, SweepContact, SweepHit, SweepHits, TargetId,
    sweep_circle_aabb,
};
pub use effects::{EffectTimer, Effects, PowerUpKind};
pub use geometry::{
    Aabb, corner_normal, directness, more_direct, paddle_redirect, paddle_relative_x, reflect,
};
pub use layout::{BlockSpec, GridIndex, Pattern, cell_bounds, generate_layout};
pub use session::{GamePhase, Session, SessionEvent, SessionSnapshot, TickInput};
pub use state::{Ball, BallEvent, BallSpawn, RecentContacts, ResolverParams, unit_direction};
pub use tick::{BallEvents, BallStep, StepKind, compute_step};
