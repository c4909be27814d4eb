//! Session and level controller
//!
//! Drives one game: feeds input to the paddle, runs the ball resolver each
//! fixed tick and turns its events into score, lives, power-ups and level
//! transitions.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::board::{Board, BlockOutcome};
use super::collision::TargetId;
use super::effects::{Effects, PowerUpKind};
use super::layout::{GridIndex, generate_layout};
use super::state::{Ball, BallEvent, BallSpawn};
use crate::error::{ResolveError, SessionError};
use crate::tuning::Tuning;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Ball parked at its spawn point, waiting for launch input
    AwaitingLaunch,
    /// Active gameplay
    Playing,
    /// Game is paused
    Paused,
    /// Out of lives
    GameOver,
}

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Paddle steering in [-1, 1]
    pub paddle_axis: f32,
    /// Launch the ball
    pub launch: bool,
    /// Pause toggle
    pub pause: bool,
    /// Autopilot: launch immediately and chase the ball
    pub idle_mode: bool,
}

/// Things the host may want to react to (sound, effects, UI)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    BlockDamaged { target: TargetId, remaining: u8 },
    BlockDemolished { target: TargetId, grid: GridIndex, score: u32 },
    PowerUp(PowerUpKind),
    PowerUpExpired(PowerUpKind),
    LifeLost { remaining: u32 },
    LevelCleared { level: u32 },
    GameOver { score: u64 },
}

/// Saved progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub level: u32,
    pub lives: u32,
    pub score: u64,
    /// Cells whose blocks are gone; the level's layout is regenerated without them
    pub demolished: BTreeSet<GridIndex>,
    pub ball_position: Vec2,
    pub ball_direction: Vec2,
    pub paddle_x: f32,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// A running game
#[derive(Debug, Clone)]
pub struct Session {
    tuning: Tuning,
    phase: GamePhase,
    level: u32,
    lives: u32,
    score: u64,
    high_score: u64,
    time_ticks: u64,
    board: Board,
    ball: Ball,
    effects: Effects,
    rng: Pcg32,
    events: Vec<SessionEvent>,
    /// Autopilot contact offset as a fraction of the paddle width
    autopilot_aim: f32,
    autopilot_falling: bool,
}

impl Session {
    /// Start a new game at level 1
    pub fn new(tuning: Tuning) -> Result<Self, SessionError> {
        let mut session = Self::build(tuning)?;
        session.load_level(&BTreeSet::new());
        log::info!("New session, level {}", session.level);
        Ok(session)
    }

    /// Rebuild a session from saved progress
    pub fn restore(tuning: Tuning, snapshot: &SessionSnapshot) -> Result<Self, SessionError> {
        let mut session = Self::build(tuning)?;
        session.level = snapshot.level.max(1);
        session.lives = snapshot.lives;
        session.score = snapshot.score;
        session.high_score = snapshot.score;
        session.load_level(&snapshot.demolished);
        session
            .ball
            .restore_state(snapshot.ball_position, snapshot.ball_direction)?;
        session.board.paddle.set_x(snapshot.paddle_x);
        if session.lives == 0 {
            session.phase = GamePhase::GameOver;
        }
        log::info!(
            "Restored session: level {}, {} lives, score {}, {} cells cleared",
            session.level,
            session.lives,
            session.score,
            snapshot.demolished.len()
        );
        Ok(session)
    }

    fn build(tuning: Tuning) -> Result<Self, SessionError> {
        tuning.validate()?;
        let spawn = BallSpawn {
            position: tuning.ball.spawn_position,
            direction: tuning.ball.spawn_direction,
            speed: tuning.ball.speed,
        };
        let ball = Ball::new(spawn, tuning.ball.radius, tuning.resolver_params())?;
        let board = Board::new(&tuning.arena, &tuning.paddle, &tuning.layout);
        let rng = Pcg32::seed_from_u64(tuning.layout.seed);
        Ok(Self {
            phase: GamePhase::AwaitingLaunch,
            level: 1,
            lives: tuning.max_lives,
            score: 0,
            high_score: 0,
            time_ticks: 0,
            board,
            ball,
            effects: Effects::new(),
            rng,
            events: Vec::new(),
            autopilot_aim: 0.0,
            autopilot_falling: false,
            tuning,
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            level: self.level,
            lives: self.lives,
            score: self.score,
            demolished: self.board.demolished_grid_indices(),
            ball_position: self.ball.position(),
            ball_direction: self.ball.direction(),
            paddle_x: self.board.paddle.x,
        }
    }

    /// Start over from level 1, keeping the high score
    pub fn restart(&mut self) {
        self.high_score = self.high_score.max(self.score);
        self.level = 1;
        self.lives = self.tuning.max_lives;
        self.score = 0;
        self.restore_initial_state();
        self.load_level(&BTreeSet::new());
        self.phase = GamePhase::AwaitingLaunch;
        log::info!("Session restarted (high score {})", self.high_score);
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn high_score(&self) -> u64 {
        self.high_score.max(self.score)
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn ball(&self) -> &Ball {
        &self.ball
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance the game by one fixed timestep
    ///
    /// A resolver error aborts this tick only; the ball keeps its last
    /// committed state and the next tick proceeds normally.
    pub fn tick(&mut self, input: &TickInput, dt: f32) -> Result<(), ResolveError> {
        if input.pause {
            match self.phase {
                GamePhase::Playing | GamePhase::AwaitingLaunch => {
                    self.phase = GamePhase::Paused;
                    return Ok(());
                }
                GamePhase::Paused => {
                    self.phase = if self.ball.moving {
                        GamePhase::Playing
                    } else {
                        GamePhase::AwaitingLaunch
                    };
                }
                GamePhase::GameOver => {}
            }
        }

        let mut input = input.clone();
        if input.idle_mode {
            self.autopilot(&mut input);
        }

        match self.phase {
            GamePhase::Paused | GamePhase::GameOver => return Ok(()),
            GamePhase::AwaitingLaunch => {
                if !input.launch {
                    return Ok(());
                }
                self.ball.moving = true;
                self.phase = GamePhase::Playing;
                log::info!("Ball launched on level {}", self.level);
            }
            GamePhase::Playing => {}
        }

        self.time_ticks += 1;
        for kind in self.effects.advance(dt) {
            self.deactivate_power_up(kind);
        }
        self.board.paddle.move_toward(input.paddle_axis, dt);

        if self.board.all_demolished() {
            self.advance_level();
            return Ok(());
        }

        let ball_events = self.ball.step(&self.board, dt, false)?;
        for event in ball_events {
            match event {
                BallEvent::BlockHit { target, .. } => {
                    self.handle_block_hit(target);
                    if self.board.all_demolished() {
                        self.advance_level();
                        return Ok(());
                    }
                }
                BallEvent::BottomHit => {
                    self.lose_life();
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn autopilot(&mut self, input: &mut TickInput) {
        if self.phase == GamePhase::AwaitingLaunch {
            input.launch = true;
        }

        // A dead-center contact sends the ball straight up, so pick a new
        // off-center aim every time the ball starts falling
        let falling = self.ball.direction().y < 0.0;
        if falling && !self.autopilot_falling {
            let side = if self.rng.random_bool(0.5) { 1.0 } else { -1.0 };
            self.autopilot_aim = side * self.rng.random_range(0.1f32..0.3);
        }
        self.autopilot_falling = falling;

        let paddle = &self.board.paddle;
        let target = self.ball.position().x - self.autopilot_aim * paddle.width;
        let half = (paddle.width / 2.0).max(f32::EPSILON);
        input.paddle_axis = ((target - paddle.x) / half).clamp(-1.0, 1.0);
    }

    fn handle_block_hit(&mut self, target: TargetId) {
        match self.board.apply_block_hit(target, self.ball.almighty) {
            None => log::warn!("Hit on block {} that is not live, ignoring", target.0),
            Some(BlockOutcome::Damaged { remaining }) => {
                self.events.push(SessionEvent::BlockDamaged { target, remaining });
            }
            Some(BlockOutcome::Demolished {
                score,
                power_up,
                grid,
            }) => {
                self.score += score as u64;
                self.events
                    .push(SessionEvent::BlockDemolished { target, grid, score });
                if power_up {
                    let kind = PowerUpKind::random(&mut self.rng);
                    self.activate_power_up(kind);
                }
            }
        }
    }

    fn activate_power_up(&mut self, kind: PowerUpKind) {
        let duration = kind.duration(&self.tuning.power_ups);
        self.effects.activate(kind, duration);

        let paddle = &mut self.board.paddle;
        match kind {
            PowerUpKind::Almighty => self.ball.almighty = true,
            PowerUpKind::WiderPaddle => {
                paddle.set_width(paddle.width * self.tuning.power_ups.wider_factor)
            }
            PowerUpKind::Boost => {
                self.ball.boosted = true;
                paddle.set_width(paddle.boosted_width);
                self.ball
                    .set_speed(self.ball.initial_speed() * self.tuning.power_ups.boost_speed_factor);
            }
        }
        self.events.push(SessionEvent::PowerUp(kind));
        log::info!("Power-up {:?} for {:.1}s", kind, duration);
    }

    fn deactivate_power_up(&mut self, kind: PowerUpKind) {
        let paddle = &mut self.board.paddle;
        match kind {
            PowerUpKind::Almighty => self.ball.almighty = false,
            PowerUpKind::WiderPaddle => paddle.set_width(paddle.initial_width),
            PowerUpKind::Boost => {
                self.ball.boosted = false;
                self.ball.set_speed(self.ball.initial_speed());
                paddle.set_width(paddle.initial_width);
            }
        }
        self.events.push(SessionEvent::PowerUpExpired(kind));
        log::info!("Power-up {:?} expired", kind);
    }

    fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.events.push(SessionEvent::LifeLost {
            remaining: self.lives,
        });

        if self.lives == 0 {
            self.ball.moving = false;
            self.high_score = self.high_score.max(self.score);
            self.phase = GamePhase::GameOver;
            self.events.push(SessionEvent::GameOver { score: self.score });
            log::info!("Game over on level {} with score {}", self.level, self.score);
        } else {
            self.restore_initial_state();
            self.phase = GamePhase::AwaitingLaunch;
            log::info!("Life lost, {} remaining", self.lives);
        }
    }

    fn advance_level(&mut self) {
        self.events.push(SessionEvent::LevelCleared { level: self.level });
        log::info!("Level {} cleared, score {}", self.level, self.score);

        self.level += 1;
        self.restore_initial_state();
        self.load_level(&BTreeSet::new());
        self.phase = GamePhase::AwaitingLaunch;
    }

    /// Ball, paddle and effects back to their starting values
    fn restore_initial_state(&mut self) {
        self.effects.reset();
        self.ball.reset();
        self.ball.moving = false;
        self.board.paddle.reset();
    }

    fn load_level(&mut self, exclude: &BTreeSet<GridIndex>) {
        let specs = generate_layout(&self.tuning.layout, self.level, exclude);
        self.board.load_blocks(&specs, exclude);
    }
}
