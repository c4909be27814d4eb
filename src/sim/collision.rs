//! Swept collision queries
//!
//! The tricky part of the ball core: sweeping a circle along its travel
//! segment against axis-aligned colliders and reporting where it first
//! touches, with a surface normal the resolver can reflect off.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::geometry::Aabb;
use crate::consts::{BLOCKS_LAYER, BOTTOM_LAYER, PADDLE_LAYER, WALLS_LAYER};
use crate::error::ResolveError;

/// Opaque handle of a collider registered on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId(pub u32);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a collider is, as far as the ball is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceCategory {
    Wall,
    Paddle,
    Block,
    BottomSensor,
}

impl SurfaceCategory {
    /// Map a raw collision layer to its category
    pub fn from_layer(target: TargetId, layer: u8) -> Result<Self, ResolveError> {
        match layer {
            WALLS_LAYER => Ok(SurfaceCategory::Wall),
            PADDLE_LAYER => Ok(SurfaceCategory::Paddle),
            BLOCKS_LAYER => Ok(SurfaceCategory::Block),
            BOTTOM_LAYER => Ok(SurfaceCategory::BottomSensor),
            _ => Err(ResolveError::UnknownLayer { target, layer }),
        }
    }

    pub fn layer(self) -> u8 {
        match self {
            SurfaceCategory::Wall => WALLS_LAYER,
            SurfaceCategory::Paddle => PADDLE_LAYER,
            SurfaceCategory::Block => BLOCKS_LAYER,
            SurfaceCategory::BottomSensor => BOTTOM_LAYER,
        }
    }
}

/// Bit set of collision layers a sweep may report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: Self = Self(0);

    /// Every surface the ball reacts to
    pub const BALL: Self = Self(
        (1 << WALLS_LAYER) | (1 << PADDLE_LAYER) | (1 << BLOCKS_LAYER) | (1 << BOTTOM_LAYER),
    );

    pub fn from_layer(layer: u8) -> Self {
        Self(1u32.checked_shl(layer as u32).unwrap_or(0))
    }

    #[inline]
    pub fn includes(self, layer: u8) -> bool {
        let bit = Self::from_layer(layer).0;
        bit != 0 && self.0 & bit == bit
    }
}

/// One contact reported by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepHit {
    /// Collider that was touched
    pub target: TargetId,
    /// Contact point on the collider surface
    pub point: Vec2,
    /// Surface normal at the contact, pointing toward the ball
    pub normal: Vec2,
    /// Ball center at the moment of contact
    pub centroid: Vec2,
    /// Travel distance along the sweep before contact
    pub distance: f32,
}

/// Up to two hits from a single sweep, in no guaranteed order
pub type SweepHits = SmallVec<[SweepHit; 2]>;

/// Scene queries the resolver depends on
///
/// The board registry implements this; tests substitute scripted scenes.
pub trait CollisionWorld {
    /// Sweep a circle from `origin` along unit `direction` for `max_distance`
    fn cast_circle(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> SweepHits;

    /// Raw collision layer of a target
    fn layer_of(&self, target: TargetId) -> Option<u8>;

    /// Current bounds of a target
    fn bounds_of(&self, target: TargetId) -> Option<Aabb>;

    /// Whether a point lies inside the visible play area
    fn viewport_contains(&self, point: Vec2) -> bool;
}

/// Contact between a swept circle and a single box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepContact {
    pub distance: f32,
    pub point: Vec2,
    pub normal: Vec2,
    pub centroid: Vec2,
}

/// Sweep a circle against an AABB
///
/// Works on the box grown by the radius with rounded corners. A circle that
/// already overlaps the box reports a contact at distance 0, but only while
/// it is moving into the box; leaving an overlap is not a hit.
pub fn sweep_circle_aabb(
    origin: Vec2,
    radius: f32,
    direction: Vec2,
    max_distance: f32,
    aabb: &Aabb,
) -> Option<SweepContact> {
    let min = aabb.min();
    let max = aabb.max();

    // Already touching
    let closest = aabb.closest_point(origin);
    let offset = origin - closest;
    if offset.length_squared() < radius * radius {
        let normal = overlap_normal(origin, offset, aabb);
        if direction.dot(normal) >= 0.0 {
            return None;
        }
        return Some(SweepContact {
            distance: 0.0,
            point: closest,
            normal,
            centroid: origin,
        });
    }

    // Slab test against the box grown by the radius
    let grown_min = min - Vec2::splat(radius);
    let grown_max = max + Vec2::splat(radius);
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_normal = Vec2::ZERO;

    for axis in 0..2 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-8 {
            if o < grown_min[axis] || o > grown_max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (grown_min[axis] - o) * inv;
        let mut t1 = (grown_max[axis] - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_enter {
            t_enter = t0;
            let mut n = Vec2::ZERO;
            n[axis] = -d.signum();
            enter_normal = n;
        }
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }

    // Touching and already leaving is not a hit either
    if t_exit <= 0.0 || t_enter > max_distance {
        return None;
    }

    let t = t_enter.max(0.0);
    let center = origin + direction * t;

    let outside_x = center.x < min.x || center.x > max.x;
    let outside_y = center.y < min.y || center.y > max.y;
    if outside_x && outside_y {
        // Entry lands on a rounded corner
        let corner = center.clamp(min, max);
        let t = ray_circle(origin, direction, corner, radius)?;
        if t > max_distance {
            return None;
        }
        let centroid = origin + direction * t;
        return Some(SweepContact {
            distance: t,
            point: corner,
            normal: (centroid - corner).normalize_or(enter_normal),
            centroid,
        });
    }

    if enter_normal == Vec2::ZERO {
        return None;
    }

    Some(SweepContact {
        distance: t,
        point: aabb.closest_point(center),
        normal: enter_normal,
        centroid: center,
    })
}

/// Normal for a circle already overlapping a box
fn overlap_normal(origin: Vec2, offset: Vec2, aabb: &Aabb) -> Vec2 {
    if let Some(n) = offset.try_normalize() {
        return n;
    }
    // Center is inside the box: push out along the shallowest axis
    let local = origin - aabb.center;
    let depth = aabb.half_extents - local.abs();
    if depth.x < depth.y {
        Vec2::new(if local.x < 0.0 { -1.0 } else { 1.0 }, 0.0)
    } else {
        Vec2::new(0.0, if local.y < 0.0 { -1.0 } else { 1.0 })
    }
}

/// First non-negative distance at which a ray reaches a circle
fn ray_circle(origin: Vec2, direction: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let m = origin - center;
    let b = m.dot(direction);
    let c = m.length_squared() - radius * radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    Some((-b - disc.sqrt()).max(0.0))
}
