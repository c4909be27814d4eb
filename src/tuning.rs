//! Game tuning
//!
//! Data-driven balance values. Every field has a default, so a tuning file
//! only needs to name what it changes.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::TuningError;
use crate::sim::ResolverParams;

/// Play area and wall colliders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaTuning {
    pub half_width: f32,
    pub half_height: f32,
    pub wall_thickness: f32,
    /// Hits this much farther than the nearest still count as simultaneous
    pub contact_slop: f32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            half_width: ARENA_HALF_WIDTH,
            half_height: ARENA_HALF_HEIGHT,
            wall_thickness: WALL_THICKNESS,
            contact_slop: 0.005,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallTuning {
    pub radius: f32,
    pub speed: f32,
    pub spawn_position: Vec2,
    pub spawn_direction: Vec2,
    /// Degrees between the paddle edges' bounce directions
    pub redirect_angle: f32,
    pub offset_on_hit: f32,
    pub parallel_dot: f32,
    /// Off-screen balls are steered back toward this point
    pub recovery_target: Vec2,
}

impl Default for BallTuning {
    fn default() -> Self {
        Self {
            radius: BALL_RADIUS,
            speed: BALL_START_SPEED,
            spawn_position: Vec2::new(0.0, PADDLE_Y + PADDLE_HEIGHT / 2.0 + BALL_RADIUS + 0.05),
            spawn_direction: Vec2::new(0.5, 1.0),
            redirect_angle: PADDLE_REDIRECT_ANGLE,
            offset_on_hit: OFFSET_ON_HIT,
            parallel_dot: PARALLEL_NORMALS_DOT,
            recovery_target: Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddleTuning {
    pub width: f32,
    pub height: f32,
    pub y: f32,
    /// Units per second the steering target moves at full input
    pub speed: f32,
    /// Fraction of the gap to the target closed each tick
    pub interpolation: f32,
}

impl Default for PaddleTuning {
    fn default() -> Self {
        Self {
            width: PADDLE_WIDTH,
            height: PADDLE_HEIGHT,
            y: PADDLE_Y,
            speed: 12.0,
            interpolation: 0.35,
        }
    }
}

/// Block grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTuning {
    /// Added to the level number to seed each layout
    pub seed: u64,
    pub columns: u32,
    pub rows: u32,
    pub cell_width: f32,
    pub cell_height: f32,
    /// Gap between the viewport top and the grid
    pub top_offset: f32,
    /// Hit points of each simple block variant; the pattern picks among them
    pub hit_point_tiers: Vec<u8>,
    pub power_up_hit_points: u8,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            seed: 0,
            columns: 11,
            rows: 10,
            cell_width: 0.5,
            cell_height: 0.25,
            top_offset: 0.5,
            hit_point_tiers: vec![1, 2, 3],
            power_up_hit_points: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpTuning {
    /// Base effect duration in seconds
    pub interval_secs: f32,
    pub wider_factor: f32,
    pub boost_speed_factor: f32,
}

impl Default for PowerUpTuning {
    fn default() -> Self {
        Self {
            interval_secs: 5.0,
            wider_factor: 2.0,
            boost_speed_factor: 5.0,
        }
    }
}

/// All tunable values of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub max_lives: u32,
    pub arena: ArenaTuning,
    pub ball: BallTuning,
    pub paddle: PaddleTuning,
    pub layout: LayoutTuning,
    pub power_ups: PowerUpTuning,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            max_lives: 3,
            arena: ArenaTuning::default(),
            ball: BallTuning::default(),
            paddle: PaddleTuning::default(),
            layout: LayoutTuning::default(),
            power_ups: PowerUpTuning::default(),
        }
    }
}

impl Tuning {
    /// Parse and validate a JSON tuning document
    pub fn from_json_str(json: &str) -> Result<Self, TuningError> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load a tuning file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tuning = Self::from_json_str(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        positive("arena.half_width", self.arena.half_width)?;
        positive("arena.half_height", self.arena.half_height)?;
        positive("arena.wall_thickness", self.arena.wall_thickness)?;
        non_negative("arena.contact_slop", self.arena.contact_slop)?;

        positive("ball.radius", self.ball.radius)?;
        non_negative("ball.speed", self.ball.speed)?;
        non_negative("ball.offset_on_hit", self.ball.offset_on_hit)?;
        if !self.ball.spawn_direction.is_finite() || self.ball.spawn_direction.length_squared() == 0.0 {
            return Err(invalid("ball.spawn_direction", "must have non-zero length"));
        }
        if !(0.0..180.0).contains(&self.ball.redirect_angle) {
            return Err(invalid("ball.redirect_angle", "must be in [0, 180) degrees"));
        }
        if !(-1.0..=1.0).contains(&self.ball.parallel_dot) {
            return Err(invalid("ball.parallel_dot", "must be in [-1, 1]"));
        }

        positive("paddle.width", self.paddle.width)?;
        positive("paddle.height", self.paddle.height)?;
        non_negative("paddle.speed", self.paddle.speed)?;
        if !(self.paddle.interpolation > 0.0 && self.paddle.interpolation <= 1.0) {
            return Err(invalid("paddle.interpolation", "must be in (0, 1]"));
        }
        if self.paddle.width > self.arena.half_width * 2.0 {
            return Err(invalid("paddle.width", "wider than the arena"));
        }

        if self.layout.columns == 0 || self.layout.rows == 0 {
            return Err(invalid("layout", "grid needs at least one row and column"));
        }
        positive("layout.cell_width", self.layout.cell_width)?;
        positive("layout.cell_height", self.layout.cell_height)?;
        if self.layout.hit_point_tiers.is_empty() || self.layout.hit_point_tiers.contains(&0) {
            return Err(invalid("layout.hit_point_tiers", "needs at least one tier, all above zero"));
        }
        if self.layout.power_up_hit_points == 0 {
            return Err(invalid("layout.power_up_hit_points", "must be above zero"));
        }

        positive("power_ups.interval_secs", self.power_ups.interval_secs)?;
        positive("power_ups.wider_factor", self.power_ups.wider_factor)?;
        positive("power_ups.boost_speed_factor", self.power_ups.boost_speed_factor)?;

        if self.max_lives == 0 {
            return Err(invalid("max_lives", "must be at least one"));
        }
        Ok(())
    }

    /// Resolver parameters for the ball
    pub fn resolver_params(&self) -> ResolverParams {
        ResolverParams {
            redirect_angle: self.ball.redirect_angle,
            offset_on_hit: self.ball.offset_on_hit,
            parallel_dot: self.ball.parallel_dot,
            recovery_target: self.ball.recovery_target,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> TuningError {
    TuningError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), TuningError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be zero or positive"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tuning_is_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning = Tuning::from_json_str(r#"{ "max_lives": 5, "ball": { "speed": 6.0 } }"#).unwrap();
        assert_eq!(tuning.max_lives, 5);
        assert_eq!(tuning.ball.speed, 6.0);
        assert_eq!(tuning.ball.radius, BALL_RADIUS);
        assert_eq!(tuning.layout, LayoutTuning::default());
    }

    #[test]
    fn test_vectors_parse_as_arrays() {
        let tuning = Tuning::from_json_str(r#"{ "ball": { "spawn_direction": [0.0, 2.0] } }"#).unwrap();
        assert_eq!(tuning.ball.spawn_direction, Vec2::new(0.0, 2.0));
    }

    #[test]
    fn test_json_roundtrip() {
        let tuning = Tuning::default();
        let json = tuning.to_json().unwrap();
        assert_eq!(Tuning::from_json_str(&json).unwrap(), tuning);
    }

    #[test]
    fn test_rejects_zero_spawn_direction() {
        let err = Tuning::from_json_str(r#"{ "ball": { "spawn_direction": [0.0, 0.0] } }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid { field: "ball.spawn_direction", .. }));
    }

    #[test]
    fn test_rejects_empty_tiers() {
        let err = Tuning::from_json_str(r#"{ "layout": { "hit_point_tiers": [] } }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid { field: "layout.hit_point_tiers", .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(Tuning::from_json_str("{ nope"), Err(TuningError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(
            Tuning::load("/definitely/not/here/tuning.json"),
            Err(TuningError::Io(_))
        ));
    }

    #[test]
    fn test_resolver_params_follow_ball_tuning() {
        let mut tuning = Tuning::default();
        tuning.ball.redirect_angle = 60.0;
        let params = tuning.resolver_params();
        assert_eq!(params.redirect_angle, 60.0);
        assert_eq!(params.offset_on_hit, OFFSET_ON_HIT);
    }
}
