//! Ball state and resolver outputs
//!
//! Everything the resolver owns between ticks lives here.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::TargetId;
use crate::consts::*;
use crate::error::ResolveError;

/// Semantic collision event produced by a resolver step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallEvent {
    /// A block was struck; `incoming` is the direction before the bounce
    BlockHit { target: TargetId, incoming: Vec2 },
    /// The ball touched the bottom sensor while not boosted
    BottomHit,
}

/// Colliders resolved on the last colliding tick (at most two)
///
/// A sweep that reports one of these again is ignored, so the ball does not
/// bounce twice off a surface it is still overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecentContacts([Option<TargetId>; 2]);

impl RecentContacts {
    pub fn one(target: TargetId) -> Self {
        Self([Some(target), None])
    }

    pub fn two(first: TargetId, second: TargetId) -> Self {
        Self([Some(first), Some(second)])
    }

    #[inline]
    pub fn contains(&self, target: TargetId) -> bool {
        self.0.contains(&Some(target))
    }

    pub fn clear(&mut self) {
        self.0 = [None, None];
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.0.iter().flatten().copied()
    }
}

/// Tunables the resolver reads each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolverParams {
    /// Spread between paddle edges and straight up (degrees)
    pub redirect_angle: f32,
    /// Nudge along the new direction after a bounce
    pub offset_on_hit: f32,
    /// Two normals with a dot product above this count as facing the same way
    pub parallel_dot: f32,
    /// Where an off-screen ball is steered back toward
    pub recovery_target: Vec2,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            redirect_angle: PADDLE_REDIRECT_ANGLE,
            offset_on_hit: OFFSET_ON_HIT,
            parallel_dot: PARALLEL_NORMALS_DOT,
            recovery_target: Vec2::ZERO,
        }
    }
}

/// Where a ball starts each level or life
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSpawn {
    pub position: Vec2,
    pub direction: Vec2,
    pub speed: f32,
}

/// The ball's kinematic state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub(crate) position: Vec2,
    pub(crate) direction: Vec2,
    pub(crate) speed: f32,
    pub radius: f32,
    /// Position commits are skipped while false
    pub moving: bool,
    /// Blocks stop being solid and are destroyed on contact
    pub almighty: bool,
    /// Bottom sensor contacts do not cost a life
    pub boosted: bool,
    pub(crate) recent: RecentContacts,
    pub params: ResolverParams,
    spawn: BallSpawn,
}

impl Ball {
    /// Create a ball at its spawn point; the spawn direction must have length
    pub fn new(spawn: BallSpawn, radius: f32, params: ResolverParams) -> Result<Self, ResolveError> {
        let direction = unit_direction(spawn.direction)?;
        let spawn = BallSpawn {
            direction,
            speed: spawn.speed.max(0.0),
            ..spawn
        };
        Ok(Self {
            position: spawn.position,
            direction,
            speed: spawn.speed,
            radius: radius.max(0.0),
            moving: false,
            almighty: false,
            boosted: false,
            recent: RecentContacts::default(),
            params,
            spawn,
        })
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }

    #[inline]
    pub fn recent_contacts(&self) -> &RecentContacts {
        &self.recent
    }

    pub fn spawn(&self) -> &BallSpawn {
        &self.spawn
    }

    /// Speed the ball was spawned with
    pub fn initial_speed(&self) -> f32 {
        self.spawn.speed
    }

    /// Set a new heading; rejects zero-length input
    pub fn set_direction(&mut self, direction: Vec2) -> Result<(), ResolveError> {
        self.direction = unit_direction(direction)?;
        Ok(())
    }

    /// Set speed (negative values clamp to zero)
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    /// Put the ball where a saved session left it, bypassing the tick path
    pub fn restore_state(&mut self, position: Vec2, direction: Vec2) -> Result<(), ResolveError> {
        let direction = unit_direction(direction)?;
        self.position = position;
        self.direction = direction;
        self.recent.clear();
        Ok(())
    }

    /// Return to the spawn point with effects cleared
    pub fn reset(&mut self) {
        self.position = self.spawn.position;
        self.direction = self.spawn.direction;
        self.speed = self.spawn.speed;
        self.recent.clear();
        self.almighty = false;
        self.boosted = false;
    }
}

/// Normalize a direction, treating zero-length or non-finite input as fatal
pub fn unit_direction(direction: Vec2) -> Result<Vec2, ResolveError> {
    direction
        .try_normalize()
        .ok_or(ResolveError::DegenerateDirection {
            x: direction.x,
            y: direction.y,
        })
}
