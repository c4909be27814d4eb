//! Power-up effects
//!
//! Each activation bumps a per-kind count and schedules a timer that undoes
//! it. Timers carry the epoch they were scheduled in; `reset` starts a new
//! epoch, so a timer from before a level change or restore can never fire.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::tuning::PowerUpTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Blocks no longer deflect the ball and break on contact
    Almighty,
    /// Paddle grows
    WiderPaddle,
    /// Fast ball, full-width paddle, bottom contacts are free
    Boost,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 3] = [
        PowerUpKind::Almighty,
        PowerUpKind::WiderPaddle,
        PowerUpKind::Boost,
    ];

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// How long one activation lasts
    pub fn duration(self, tuning: &PowerUpTuning) -> f32 {
        match self {
            PowerUpKind::Almighty => tuning.interval_secs,
            PowerUpKind::WiderPaddle => tuning.interval_secs * 2.0,
            PowerUpKind::Boost => tuning.interval_secs / 1.5,
        }
    }

    fn index(self) -> usize {
        match self {
            PowerUpKind::Almighty => 0,
            PowerUpKind::WiderPaddle => 1,
            PowerUpKind::Boost => 2,
        }
    }
}

/// Pending disable action
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectTimer {
    pub kind: PowerUpKind,
    pub remaining: f32,
    pub epoch: u64,
}

/// Active effect bookkeeping
#[derive(Debug, Clone, Default)]
pub struct Effects {
    counts: [u32; 3],
    timers: Vec<EffectTimer>,
    epoch: u64,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn count(&self, kind: PowerUpKind) -> u32 {
        self.counts[kind.index()]
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.count(kind) > 0
    }

    pub fn timers(&self) -> &[EffectTimer] {
        &self.timers
    }

    /// Record an activation; returns the timer that will undo it
    pub fn activate(&mut self, kind: PowerUpKind, duration: f32) -> EffectTimer {
        self.counts[kind.index()] += 1;
        let timer = EffectTimer {
            kind,
            remaining: duration.max(0.0),
            epoch: self.epoch,
        };
        self.timers.push(timer);
        timer
    }

    /// Run a timer's disable action
    ///
    /// Returns true when this was the kind's last activation and the effect
    /// should be switched off. Timers from an older epoch do nothing.
    pub fn fire(&mut self, timer: &EffectTimer) -> bool {
        if timer.epoch != self.epoch {
            log::debug!("Dropping stale {:?} timer from epoch {}", timer.kind, timer.epoch);
            return false;
        }
        let count = &mut self.counts[timer.kind.index()];
        if *count == 0 {
            return false;
        }
        *count -= 1;
        *count == 0
    }

    /// Advance all timers; returns the kinds whose last activation just ended
    pub fn advance(&mut self, dt: f32) -> Vec<PowerUpKind> {
        let mut due = Vec::new();
        self.timers.retain_mut(|timer| {
            timer.remaining -= dt;
            if timer.remaining <= 0.0 {
                due.push(*timer);
                false
            } else {
                true
            }
        });

        due.iter().filter(|timer| self.fire(timer)).map(|timer| timer.kind).collect()
    }

    /// Cancel everything and start a new epoch
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.counts = [0; 3];
        self.timers.clear();
    }
}
