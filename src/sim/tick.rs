//! Per-tick ball resolver
//!
//! A tick runs in two phases. `compute_step` reads the ball and the scene and
//! produces the next pose, the contacts to ignore next time and the events
//! for this tick, without mutating anything. `Ball::commit` applies the
//! result. A failed compute leaves the ball exactly as it was.

use glam::Vec2;
use smallvec::SmallVec;

use super::collision::{CollisionWorld, LayerMask, SurfaceCategory, SweepHit};
use super::geometry::{corner_normal, more_direct, paddle_redirect, paddle_relative_x, reflect};
use super::state::{Ball, BallEvent, RecentContacts, unit_direction};
use crate::error::ResolveError;

/// Events emitted by one tick (two block hits plus a bottom hit at most)
pub type BallEvents = SmallVec<[BallEvent; 3]>;

/// What a tick ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Zero travel distance (paused, zero dt or zero speed)
    Idle,
    /// Full-distance move with no fresh contact
    Moved,
    /// Off-screen excursion, steered back toward the recovery target
    Recovered,
    /// One or two fresh contacts were resolved
    Collided { hits: usize },
}

/// Result of the compute phase
#[derive(Debug, Clone, PartialEq)]
pub struct BallStep {
    pub kind: StepKind,
    pub position: Vec2,
    pub direction: Vec2,
    pub recent: RecentContacts,
    pub events: BallEvents,
}

impl BallStep {
    /// Step with no collision; the dedup window only survives idle ticks
    fn without_contact(ball: &Ball, kind: StepKind, position: Vec2, direction: Vec2) -> Self {
        let recent = match kind {
            StepKind::Idle => ball.recent,
            _ => RecentContacts::default(),
        };
        Self {
            kind,
            position,
            direction,
            recent,
            events: BallEvents::new(),
        }
    }
}

/// Compute the ball's next state for a tick of length `dt`
pub fn compute_step<W>(ball: &Ball, world: &W, dt: f32) -> Result<BallStep, ResolveError>
where
    W: CollisionWorld + ?Sized,
{
    let params = &ball.params;
    let origin = ball.position;
    let initial_direction = ball.direction;
    let distance = ball.speed * dt;

    if !(distance > 0.0) || !distance.is_finite() {
        return Ok(BallStep::without_contact(
            ball,
            StepKind::Idle,
            origin,
            initial_direction,
        ));
    }

    if !world.viewport_contains(origin) {
        let direction = unit_direction(params.recovery_target - origin)?;
        log::warn!("Ball outside the play area at {origin}, steering back");
        return Ok(BallStep::without_contact(
            ball,
            StepKind::Recovered,
            origin + direction * distance,
            direction,
        ));
    }

    let sweep = world.cast_circle(origin, ball.radius, initial_direction, distance, LayerMask::BALL);

    // Drop contacts resolved on the last colliding tick
    let mut hits: SmallVec<[(SweepHit, SurfaceCategory); 2]> = SmallVec::new();
    for hit in sweep.iter().take(2).filter(|h| !ball.recent.contains(h.target)) {
        let layer = world
            .layer_of(hit.target)
            .ok_or(ResolveError::UnknownTarget(hit.target))?;
        let category = SurfaceCategory::from_layer(hit.target, layer)?;
        hits.push((*hit, category));
    }

    if hits.is_empty() {
        return Ok(BallStep::without_contact(
            ball,
            StepKind::Moved,
            origin + initial_direction * distance,
            initial_direction,
        ));
    }

    let (mut direction, mut position, recent) = if let [(a, _), (b, _)] = hits.as_slice() {
        let normal = if a.normal.dot(b.normal) > params.parallel_dot {
            more_direct(a.normal, b.normal)
        } else {
            // Opposing normals cancel out; send the ball back the way it came
            corner_normal(a.normal, b.normal).unwrap_or(-initial_direction)
        };
        (
            unit_direction(reflect(initial_direction, normal))?,
            (a.centroid + b.centroid) / 2.0,
            RecentContacts::two(a.target, b.target),
        )
    } else {
        let (a, _) = &hits[0];
        (
            unit_direction(reflect(initial_direction, a.normal.normalize_or_zero()))?,
            a.centroid,
            RecentContacts::one(a.target),
        )
    };

    if let Some((hit, _)) = hits.iter().find(|(_, c)| *c == SurfaceCategory::Paddle) {
        let bounds = world
            .bounds_of(hit.target)
            .ok_or(ResolveError::UnknownTarget(hit.target))?;
        let relative_x = paddle_relative_x(hit.point.x, &bounds);
        direction = paddle_redirect(relative_x, params.redirect_angle);
    }

    position += direction * params.offset_on_hit;

    let mut events = BallEvents::new();
    let mut blocks = hits
        .iter()
        .filter(|(_, c)| *c == SurfaceCategory::Block)
        .map(|(h, _)| h.target)
        .peekable();

    if blocks.peek().is_some() {
        if ball.almighty {
            for target in blocks {
                events.push(BallEvent::BlockHit {
                    target,
                    incoming: initial_direction,
                });
            }
            direction = initial_direction;
            position = origin + initial_direction * distance;
        } else if let Some(target) = blocks.next() {
            events.push(BallEvent::BlockHit {
                target,
                incoming: initial_direction,
            });
        }
    }

    if !ball.boosted && hits.iter().any(|(_, c)| *c == SurfaceCategory::BottomSensor) {
        events.push(BallEvent::BottomHit);
    }

    log::debug!(
        "Ball resolved {} contact(s): dir {} -> {}, events {:?}",
        hits.len(),
        initial_direction,
        direction,
        events
    );

    Ok(BallStep {
        kind: StepKind::Collided { hits: hits.len() },
        position,
        direction,
        recent,
        events,
    })
}

impl Ball {
    /// Apply a computed step; the position write is skipped while not moving
    pub fn commit(&mut self, step: &BallStep) {
        self.direction = step.direction;
        self.recent = step.recent;
        if self.moving {
            self.position = step.position;
        }
    }

    /// Compute and commit one tick, returning its events
    ///
    /// A paused tick travels no distance and leaves the ball untouched.
    pub fn step<W>(&mut self, world: &W, dt: f32, paused: bool) -> Result<BallEvents, ResolveError>
    where
        W: CollisionWorld + ?Sized,
    {
        let dt = if paused { 0.0 } else { dt };
        match compute_step(self, world, dt) {
            Ok(step) => {
                self.commit(&step);
                Ok(step.events)
            }
            Err(e) => {
                log::error!("Ball tick aborted: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::angle_from_up;
    use crate::consts::*;
    use crate::sim::collision::{SweepHits, TargetId};
    use crate::sim::geometry::Aabb;
    use crate::sim::state::{BallSpawn, ResolverParams};

    const WALL: TargetId = TargetId(1);
    const PADDLE: TargetId = TargetId(2);
    const BLOCK_A: TargetId = TargetId(3);
    const BLOCK_B: TargetId = TargetId(4);
    const BOTTOM: TargetId = TargetId(5);
    const BOGUS: TargetId = TargetId(6);

    /// Scene that answers every sweep with a fixed hit list
    struct ScriptedWorld {
        hits: SweepHits,
        layers: HashMap<TargetId, u8>,
        bounds: HashMap<TargetId, Aabb>,
        viewport: Aabb,
    }

    impl ScriptedWorld {
        fn new(hits: &[SweepHit]) -> Self {
            let layers = HashMap::from([
                (WALL, WALLS_LAYER),
                (PADDLE, PADDLE_LAYER),
                (BLOCK_A, BLOCKS_LAYER),
                (BLOCK_B, BLOCKS_LAYER),
                (BOTTOM, BOTTOM_LAYER),
                (BOGUS, 31),
            ]);
            let bounds = HashMap::from([(PADDLE, Aabb::new(Vec2::new(0.0, -4.0), Vec2::new(1.0, 0.1)))]);
            Self {
                hits: hits.iter().copied().collect(),
                layers,
                bounds,
                viewport: Aabb::new(Vec2::ZERO, Vec2::new(3.0, 5.0)),
            }
        }
    }

    impl CollisionWorld for ScriptedWorld {
        fn cast_circle(&self, _: Vec2, _: f32, _: Vec2, _: f32, mask: LayerMask) -> SweepHits {
            assert_eq!(mask, LayerMask::BALL);
            self.hits.clone()
        }

        fn layer_of(&self, target: TargetId) -> Option<u8> {
            self.layers.get(&target).copied()
        }

        fn bounds_of(&self, target: TargetId) -> Option<Aabb> {
            self.bounds.get(&target).copied()
        }

        fn viewport_contains(&self, point: Vec2) -> bool {
            self.viewport.contains(point)
        }
    }

    fn hit(target: TargetId, normal: Vec2, centroid: Vec2) -> SweepHit {
        SweepHit {
            target,
            point: centroid - normal * BALL_RADIUS,
            normal,
            centroid,
            distance: 0.01,
        }
    }

    fn ball_heading(direction: Vec2) -> Ball {
        let spawn = BallSpawn {
            position: Vec2::ZERO,
            direction,
            speed: 4.0,
        };
        let mut ball = Ball::new(spawn, BALL_RADIUS, ResolverParams::default()).unwrap();
        ball.moving = true;
        ball
    }

    const DT: f32 = 0.01;

    #[test]
    fn test_single_hit_rests_at_centroid() {
        let world = ScriptedWorld::new(&[hit(WALL, Vec2::NEG_Y, Vec2::new(0.0, 0.03))]);
        let mut ball = ball_heading(Vec2::Y);

        let events = ball.step(&world, DT, false).unwrap();
        assert!(events.is_empty());
        assert!(ball.direction().abs_diff_eq(Vec2::NEG_Y, 1e-6));
        let expected = Vec2::new(0.0, 0.03) + Vec2::NEG_Y * OFFSET_ON_HIT;
        assert!(ball.position().abs_diff_eq(expected, 1e-6));
        assert_eq!(ball.recent_contacts(), &RecentContacts::one(WALL));
    }

    #[test]
    fn test_straight_drop_onto_floor_reflects_up() {
        let world = ScriptedWorld::new(&[hit(WALL, Vec2::Y, Vec2::new(0.0, -0.02))]);
        let ball = ball_heading(Vec2::NEG_Y);
        let step = compute_step(&ball, &world, DT).unwrap();
        assert!(step.direction.abs_diff_eq(Vec2::Y, 1e-6));
        assert_eq!(step.kind, StepKind::Collided { hits: 1 });
    }

    #[test]
    fn test_recent_contact_is_ignored() {
        let world = ScriptedWorld::new(&[hit(WALL, Vec2::NEG_Y, Vec2::new(0.0, 0.03))]);
        let mut ball = ball_heading(Vec2::Y);
        ball.recent = RecentContacts::one(WALL);

        let step = compute_step(&ball, &world, DT).unwrap();
        assert_eq!(step.kind, StepKind::Moved);
        assert!(step.position.abs_diff_eq(Vec2::new(0.0, 0.04), 1e-6));
        assert_eq!(step.direction, Vec2::Y);
        // One-tick window: a tick without contact forgets it
        assert!(step.recent.is_empty());
    }

    #[test]
    fn test_both_recent_contacts_make_a_pure_move() {
        let pairs = [
            [
                hit(WALL, Vec2::NEG_Y, Vec2::new(0.0, 0.03)),
                hit(BLOCK_A, Vec2::NEG_X, Vec2::new(0.01, 0.03)),
            ],
            [
                hit(BLOCK_A, Vec2::NEG_X, Vec2::new(0.01, 0.03)),
                hit(WALL, Vec2::NEG_Y, Vec2::new(0.0, 0.03)),
            ],
        ];
        for hits in pairs {
            let world = ScriptedWorld::new(&hits);
            let mut ball = ball_heading(Vec2::Y);
            ball.recent = RecentContacts::two(BLOCK_A, WALL);

            let step = compute_step(&ball, &world, DT).unwrap();
            assert_eq!(step.kind, StepKind::Moved);
            assert!(step.position.abs_diff_eq(Vec2::new(0.0, 0.04), 1e-6));
            assert_eq!(step.direction, Vec2::Y);
            assert!(step.events.is_empty());
        }
    }

    #[test]
    fn test_surviving_second_slot_becomes_single_hit() {
        let world = ScriptedWorld::new(&[
            hit(WALL, Vec2::NEG_Y, Vec2::new(0.0, 0.03)),
            hit(BLOCK_A, Vec2::NEG_X, Vec2::new(0.02, 0.02)),
        ]);
        let mut ball = ball_heading(Vec2::new(1.0, 1.0));
        ball.recent = RecentContacts::one(WALL);

        let step = compute_step(&ball, &world, DT).unwrap();
        assert_eq!(step.kind, StepKind::Collided { hits: 1 });
        assert!(step.direction.abs_diff_eq(Vec2::new(-1.0, 1.0).normalize(), 1e-6));
        assert_eq!(step.recent, RecentContacts::one(BLOCK_A));
        assert_eq!(step.events.len(), 1);
    }

    #[test]
    fn test_true_corner_reflects_off_average_normal() {
        let world = ScriptedWorld::new(&[
            hit(WALL, Vec2::NEG_X, Vec2::new(0.02, 0.0)),
            hit(BLOCK_A, Vec2::NEG_Y, Vec2::new(0.0, 0.02)),
        ]);
        let incoming = Vec2::new(1.0, 0.5).normalize();
        let ball = ball_heading(incoming);

        let step = compute_step(&ball, &world, DT).unwrap();
        let avg = Vec2::new(-1.0, -1.0).normalize();
        let expected = reflect(incoming, avg).normalize();
        assert!(step.direction.abs_diff_eq(expected, 1e-5));
        assert_eq!(step.recent, RecentContacts::two(WALL, BLOCK_A));
        let midpoint = Vec2::new(0.01, 0.01) + expected * OFFSET_ON_HIT;
        assert!(step.position.abs_diff_eq(midpoint, 1e-5));
    }

    #[test]
    fn test_parallel_normals_use_more_direct_one() {
        let slanted = Vec2::new(0.6, -0.8);
        let world = ScriptedWorld::new(&[
            hit(BLOCK_A, slanted, Vec2::new(0.0, 0.02)),
            hit(BLOCK_B, Vec2::NEG_Y, Vec2::new(0.01, 0.02)),
        ]);
        let incoming = Vec2::new(0.3, 1.0).normalize();
        let ball = ball_heading(incoming);

        let step = compute_step(&ball, &world, DT).unwrap();
        let expected = reflect(incoming, Vec2::NEG_Y);
        assert!(step.direction.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_opposing_normals_send_ball_back() {
        let world = ScriptedWorld::new(&[
            hit(WALL, Vec2::NEG_X, Vec2::new(0.01, 0.0)),
            hit(BLOCK_A, Vec2::X, Vec2::new(0.01, 0.0)),
        ]);
        let ball = ball_heading(Vec2::X);
        let step = compute_step(&ball, &world, DT).unwrap();
        assert!(step.direction.abs_diff_eq(Vec2::NEG_X, 1e-6));
    }

    #[test]
    fn test_paddle_center_sends_ball_straight_up() {
        for incoming in [Vec2::NEG_Y, Vec2::new(0.7, -0.3), Vec2::new(-1.0, -0.2)] {
            let mut paddle_hit = hit(PADDLE, Vec2::Y, Vec2::new(0.0, -3.8));
            paddle_hit.point = Vec2::new(0.0, -3.9);
            let world = ScriptedWorld::new(&[paddle_hit]);
            let ball = ball_heading(incoming);
            let step = compute_step(&ball, &world, DT).unwrap();
            assert_eq!(step.direction, Vec2::Y);
        }
    }

    #[test]
    fn test_paddle_edges_tilt_symmetrically() {
        let angle_for = |contact_x: f32| {
            let mut paddle_hit = hit(PADDLE, Vec2::Y, Vec2::new(contact_x, -3.8));
            paddle_hit.point = Vec2::new(contact_x, -3.9);
            let world = ScriptedWorld::new(&[paddle_hit]);
            let step = compute_step(&ball_heading(Vec2::NEG_Y), &world, DT).unwrap();
            angle_from_up(step.direction)
        };
        let left = angle_for(-1.0);
        let right = angle_for(1.0);
        assert!((left - PADDLE_REDIRECT_ANGLE / 2.0).abs() < 1e-3);
        assert!((left + right).abs() < 1e-3);
    }

    #[test]
    fn test_paddle_redirect_wins_over_wall_reflection() {
        let mut paddle_hit = hit(PADDLE, Vec2::Y, Vec2::new(0.5, -3.8));
        paddle_hit.point = Vec2::new(0.5, -3.9);
        let world = ScriptedWorld::new(&[hit(WALL, Vec2::NEG_X, Vec2::new(0.5, -3.8)), paddle_hit]);
        let step = compute_step(&ball_heading(Vec2::new(1.0, -1.0)), &world, DT).unwrap();
        let expected = paddle_redirect(0.75, PADDLE_REDIRECT_ANGLE);
        assert!(step.direction.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_block_hit_emits_one_event_with_incoming_direction() {
        let world = ScriptedWorld::new(&[hit(BLOCK_A, Vec2::NEG_Y, Vec2::new(0.0, 0.03))]);
        let ball = ball_heading(Vec2::Y);
        let step = compute_step(&ball, &world, DT).unwrap();
        assert_eq!(
            step.events.as_slice(),
            &[BallEvent::BlockHit {
                target: BLOCK_A,
                incoming: Vec2::Y
            }]
        );
        assert!(step.direction.abs_diff_eq(Vec2::NEG_Y, 1e-6));
    }

    #[test]
    fn test_two_blocks_without_almighty_emit_primary_only() {
        let world = ScriptedWorld::new(&[
            hit(BLOCK_A, Vec2::NEG_Y, Vec2::new(0.0, 0.03)),
            hit(BLOCK_B, Vec2::NEG_Y, Vec2::new(0.05, 0.03)),
        ]);
        let step = compute_step(&ball_heading(Vec2::Y), &world, DT).unwrap();
        assert_eq!(step.events.len(), 1);
        assert!(matches!(step.events[0], BallEvent::BlockHit { target: BLOCK_A, .. }));
    }

    #[test]
    fn test_almighty_passes_through_block_and_wall() {
        let world = ScriptedWorld::new(&[
            hit(BLOCK_A, Vec2::NEG_Y, Vec2::new(0.0, 0.03)),
            hit(WALL, Vec2::NEG_X, Vec2::new(0.03, 0.03)),
        ]);
        let incoming = Vec2::new(1.0, 1.0).normalize();
        let mut ball = ball_heading(incoming);
        ball.almighty = true;

        let step = compute_step(&ball, &world, DT).unwrap();
        assert_eq!(step.events.len(), 1);
        assert!(step.direction.abs_diff_eq(incoming, 1e-6));
        assert!(step.position.abs_diff_eq(incoming * 4.0 * DT, 1e-6));
        assert_eq!(step.recent, RecentContacts::two(BLOCK_A, WALL));
    }

    #[test]
    fn test_almighty_demolishes_two_blocks_at_once() {
        let world = ScriptedWorld::new(&[
            hit(BLOCK_A, Vec2::NEG_Y, Vec2::new(0.0, 0.03)),
            hit(BLOCK_B, Vec2::NEG_Y, Vec2::new(0.05, 0.03)),
        ]);
        let mut ball = ball_heading(Vec2::Y);
        ball.almighty = true;
        let step = compute_step(&ball, &world, DT).unwrap();
        let targets: Vec<_> = step
            .events
            .iter()
            .filter_map(|e| match e {
                BallEvent::BlockHit { target, .. } => Some(*target),
                BallEvent::BottomHit => None,
            })
            .collect();
        assert_eq!(targets, vec![BLOCK_A, BLOCK_B]);
    }

    #[test]
    fn test_bottom_hit_suppressed_while_boosted() {
        let world = ScriptedWorld::new(&[hit(BOTTOM, Vec2::Y, Vec2::new(0.0, -0.03))]);
        let mut ball = ball_heading(Vec2::NEG_Y);

        let step = compute_step(&ball, &world, DT).unwrap();
        assert_eq!(step.events.as_slice(), &[BallEvent::BottomHit]);

        ball.boosted = true;
        let step = compute_step(&ball, &world, DT).unwrap();
        assert!(step.events.is_empty());
        // Still bounces
        assert!(step.direction.abs_diff_eq(Vec2::Y, 1e-6));
    }

    #[test]
    fn test_unknown_layer_aborts_without_commit() {
        let world = ScriptedWorld::new(&[hit(BOGUS, Vec2::NEG_Y, Vec2::new(0.0, 0.03))]);
        let mut ball = ball_heading(Vec2::Y);
        let err = ball.step(&world, DT, false).unwrap_err();
        assert_eq!(err, ResolveError::UnknownLayer { target: BOGUS, layer: 31 });
        assert_eq!(ball.position(), Vec2::ZERO);
        assert_eq!(ball.direction(), Vec2::Y);
    }

    #[test]
    fn test_unregistered_target_aborts() {
        let world = ScriptedWorld::new(&[hit(TargetId(99), Vec2::NEG_Y, Vec2::new(0.0, 0.03))]);
        let err = compute_step(&ball_heading(Vec2::Y), &world, DT).unwrap_err();
        assert_eq!(err, ResolveError::UnknownTarget(TargetId(99)));
    }

    #[test]
    fn test_frozen_ball_tracks_direction_but_not_position() {
        let world = ScriptedWorld::new(&[hit(WALL, Vec2::NEG_Y, Vec2::new(0.0, 0.03))]);
        let mut ball = ball_heading(Vec2::Y);
        ball.moving = false;

        ball.step(&world, DT, false).unwrap();
        assert_eq!(ball.position(), Vec2::ZERO);
        assert!(ball.direction().abs_diff_eq(Vec2::NEG_Y, 1e-6));
        assert_eq!(ball.recent_contacts(), &RecentContacts::one(WALL));
    }

    #[test]
    fn test_paused_tick_is_a_no_op() {
        let world = ScriptedWorld::new(&[hit(BLOCK_A, Vec2::NEG_Y, Vec2::new(0.0, 0.03))]);
        let mut ball = ball_heading(Vec2::Y);
        ball.recent = RecentContacts::one(WALL);

        let events = ball.step(&world, DT, true).unwrap();
        assert!(events.is_empty());
        assert_eq!(ball.position(), Vec2::ZERO);
        assert_eq!(ball.direction(), Vec2::Y);
        assert_eq!(ball.recent_contacts(), &RecentContacts::one(WALL));

        let step = compute_step(&ball, &world, 0.0).unwrap();
        assert_eq!(step.kind, StepKind::Idle);
    }

    #[test]
    fn test_off_screen_ball_steers_back_to_center() {
        let world = ScriptedWorld::new(&[hit(BLOCK_A, Vec2::NEG_Y, Vec2::new(0.0, 0.03))]);
        let mut ball = ball_heading(Vec2::X);
        ball.position = Vec2::new(6.0, 0.0);

        let step = compute_step(&ball, &world, DT).unwrap();
        assert_eq!(step.kind, StepKind::Recovered);
        assert!(step.direction.abs_diff_eq(Vec2::NEG_X, 1e-6));
        assert!(step.position.abs_diff_eq(Vec2::new(6.0 - 4.0 * DT, 0.0), 1e-6));
        assert!(step.events.is_empty());
    }
}
