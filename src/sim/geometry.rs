//! Geometry for the ball resolver
//!
//! Axis-aligned collider bounds plus the direction math the resolver applies
//! after a sweep: plain reflection, the corner/double-hit policies and the
//! paddle redirect.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::rotated_up;

/// Axis-aligned bounding box (center + half extents)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Aabb {
    pub fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    /// Box spanning `min` to `min + size`
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        let size = size.abs();
        Self::new(min + size / 2.0, size / 2.0)
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        self.center - self.half_extents
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.center + self.half_extents
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.half_extents * 2.0
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.half_extents.x * 2.0
    }

    /// X coordinate of the left edge
    #[inline]
    pub fn left(&self) -> f32 {
        self.center.x - self.half_extents.x
    }

    /// Inclusive point containment
    pub fn contains(&self, p: Vec2) -> bool {
        let d = (p - self.center).abs();
        d.x <= self.half_extents.x && d.y <= self.half_extents.y
    }

    /// Closest point of the box to `p` (p itself when inside)
    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min(), self.max())
    }
}

/// Reflect a direction off a surface with the given unit normal
///
/// Standard reflection: d' = d - 2(d·n)n
#[inline]
pub fn reflect(dir: Vec2, normal: Vec2) -> Vec2 {
    dir - 2.0 * dir.dot(normal) * normal
}

/// How close a normal is to either vertical or horizontal
///
/// 1.0 for normals along either axis, bottoming out at 0.5 for normals
/// 60° off vertical.
#[inline]
pub fn directness(normal: Vec2) -> f32 {
    let dot_abs = normal.dot(Vec2::Y).abs();
    1.0 - dot_abs.min(1.0 - dot_abs)
}

/// Pick the more direct of two normals (ties go to `b`)
#[inline]
pub fn more_direct(a: Vec2, b: Vec2) -> Vec2 {
    if directness(a) > directness(b) { a } else { b }
}

/// Averaged normal for a true corner hit, `None` when the normals cancel out
#[inline]
pub fn corner_normal(a: Vec2, b: Vec2) -> Option<Vec2> {
    ((a + b) / 2.0).try_normalize()
}

/// Horizontal position of a contact along the paddle, 0 = left edge, 1 = right edge
pub fn paddle_relative_x(contact_x: f32, paddle: &Aabb) -> f32 {
    let width = paddle.width();
    if width <= f32::EPSILON {
        return 0.5;
    }
    ((contact_x - paddle.left()).abs() / width).clamp(0.0, 1.0)
}

/// Direction leaving the paddle for a contact at `relative_x`
///
/// Center contacts go straight up, the left edge tilts the ball left by half
/// the redirect angle and the right edge tilts it right by the same amount.
#[inline]
pub fn paddle_redirect(relative_x: f32, redirect_angle_deg: f32) -> Vec2 {
    rotated_up(redirect_angle_deg * (0.5 - relative_x)).normalize()
}
