//! Board registry
//!
//! Owns every collider the ball can touch: the walls around the viewport,
//! the bottom sensor, the paddle and the blocks. Maps target handles back to
//! these entities and answers the resolver's sweep queries.

use std::collections::BTreeSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionWorld, LayerMask, SweepHit, SweepHits, TargetId, sweep_circle_aabb};
use super::geometry::Aabb;
use super::layout::{BlockSpec, GridIndex, cell_bounds};
use crate::consts::*;
use crate::tuning::{ArenaTuning, LayoutTuning, PaddleTuning};

/// Static collider (wall or bottom sensor)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collider {
    pub id: TargetId,
    pub layer: u8,
    pub bounds: Aabb,
}

/// A destructible block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: TargetId,
    pub grid: GridIndex,
    pub bounds: Aabb,
    pub hp: u8,
    pub max_hp: u8,
    pub power_up: bool,
    pub alive: bool,
}

/// What a ball hit did to a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockOutcome {
    Damaged { remaining: u8 },
    Demolished { score: u32, power_up: bool, grid: GridIndex },
}

impl Block {
    /// Take one hit; almighty hits always demolish
    pub fn on_hit(&mut self, almighty: bool) -> BlockOutcome {
        self.hp = self.hp.saturating_sub(1);
        if self.hp == 0 || almighty {
            self.alive = false;
            BlockOutcome::Demolished {
                score: self.max_hp as u32,
                power_up: self.power_up,
                grid: self.grid,
            }
        } else {
            BlockOutcome::Damaged { remaining: self.hp }
        }
    }
}

/// The player's paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paddle {
    pub id: TargetId,
    /// Center x
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub initial_width: f32,
    /// Width while boosted (the whole viewport)
    pub boosted_width: f32,
    /// Horizontal speed of the steering target
    pub speed: f32,
    /// Fraction of the gap to the target closed per tick
    pub interpolation: f32,
    target_x: f32,
    left_limit: f32,
    right_limit: f32,
    viewport: Aabb,
}

impl Paddle {
    fn new(id: TargetId, tuning: &PaddleTuning, viewport: Aabb) -> Self {
        let mut paddle = Self {
            id,
            x: viewport.center.x,
            y: tuning.y,
            width: tuning.width,
            height: tuning.height,
            initial_width: tuning.width,
            boosted_width: viewport.width(),
            speed: tuning.speed,
            interpolation: tuning.interpolation,
            target_x: viewport.center.x,
            left_limit: 0.0,
            right_limit: 0.0,
            viewport,
        };
        paddle.update_limits();
        paddle
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            Vec2::new(self.x, self.y),
            Vec2::new(self.width / 2.0, self.height / 2.0),
        )
    }

    /// Steer with an input axis in [-1, 1]
    pub fn move_toward(&mut self, axis: f32, dt: f32) {
        self.target_x += axis.clamp(-1.0, 1.0) * self.speed * dt;
        let mut new_x = self.x + (self.target_x - self.x) * self.interpolation;

        if new_x <= self.left_limit {
            new_x = self.left_limit;
            self.target_x = self.left_limit;
        }
        if new_x >= self.right_limit {
            new_x = self.right_limit;
            self.target_x = self.right_limit;
        }
        self.x = new_x;
    }

    /// Place the paddle directly (session restore)
    pub fn set_x(&mut self, x: f32) {
        self.x = x.clamp(self.left_limit, self.right_limit);
        self.target_x = self.x;
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(0.0, self.viewport.width());
        self.update_limits();
        self.set_x(self.x);
    }

    pub fn reset(&mut self) {
        self.width = self.initial_width;
        self.update_limits();
        self.x = self.viewport.center.x;
        self.target_x = self.x;
    }

    fn update_limits(&mut self) {
        self.left_limit = self.viewport.min().x + self.width / 2.0;
        self.right_limit = (self.viewport.max().x - self.width / 2.0).max(self.left_limit);
    }
}

/// All colliders of the current level
#[derive(Debug, Clone)]
pub struct Board {
    viewport: Aabb,
    statics: Vec<Collider>,
    pub paddle: Paddle,
    blocks: Vec<Block>,
    /// Grid cells left out when the layout was loaded (already demolished)
    excluded: BTreeSet<GridIndex>,
    layout: LayoutTuning,
    contact_slop: f32,
    next_id: u32,
}

impl Board {
    pub fn new(arena: &ArenaTuning, paddle: &PaddleTuning, layout: &LayoutTuning) -> Self {
        let viewport = Aabb::new(Vec2::ZERO, Vec2::new(arena.half_width, arena.half_height));
        let mut board = Self {
            viewport,
            statics: Vec::new(),
            paddle: Paddle::new(TargetId(0), paddle, viewport),
            blocks: Vec::new(),
            excluded: BTreeSet::new(),
            layout: layout.clone(),
            contact_slop: arena.contact_slop,
            next_id: 1,
        };

        let t = arena.wall_thickness;
        let (hw, hh) = (arena.half_width, arena.half_height);
        let walls = [
            // Left, right, top
            (Vec2::new(-hw - t / 2.0, 0.0), Vec2::new(t / 2.0, hh + t), WALLS_LAYER),
            (Vec2::new(hw + t / 2.0, 0.0), Vec2::new(t / 2.0, hh + t), WALLS_LAYER),
            (Vec2::new(0.0, hh + t / 2.0), Vec2::new(hw + t, t / 2.0), WALLS_LAYER),
            // Bottom sensor
            (Vec2::new(0.0, -hh - t / 2.0), Vec2::new(hw + t, t / 2.0), BOTTOM_LAYER),
        ];
        for (center, half, layer) in walls {
            let id = board.next_entity_id();
            board.statics.push(Collider {
                id,
                layer,
                bounds: Aabb::new(center, half),
            });
        }
        board.paddle.id = board.next_entity_id();
        board
    }

    /// Allocate a new target handle (never reused)
    pub fn next_entity_id(&mut self) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn viewport(&self) -> Aabb {
        self.viewport
    }

    pub fn statics(&self) -> &[Collider] {
        &self.statics
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: TargetId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Replace the blocks with a freshly generated layout
    pub fn load_blocks(&mut self, specs: &[BlockSpec], excluded: &BTreeSet<GridIndex>) {
        self.blocks.clear();
        self.excluded = excluded.clone();
        for spec in specs {
            let id = self.next_entity_id();
            self.blocks.push(Block {
                id,
                grid: spec.grid,
                bounds: cell_bounds(&self.layout, &self.viewport, spec.grid),
                hp: spec.hit_points,
                max_hp: spec.hit_points,
                power_up: spec.power_up,
                alive: true,
            });
        }
        log::debug!("Board loaded {} blocks ({} excluded)", self.blocks.len(), excluded.len());
    }

    /// Register a hit from the ball; `None` when the target is not a live block
    pub fn apply_block_hit(&mut self, target: TargetId, almighty: bool) -> Option<BlockOutcome> {
        let block = self.blocks.iter_mut().find(|b| b.id == target && b.alive)?;
        Some(block.on_hit(almighty))
    }

    pub fn remaining_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.alive).count()
    }

    pub fn all_demolished(&self) -> bool {
        self.blocks.iter().all(|b| !b.alive)
    }

    /// Grid cells with no live block: demolished this level or excluded on load
    pub fn demolished_grid_indices(&self) -> BTreeSet<GridIndex> {
        let mut set = self.excluded.clone();
        set.extend(self.blocks.iter().filter(|b| !b.alive).map(|b| b.grid));
        set
    }

    fn colliders(&self) -> impl Iterator<Item = (TargetId, u8, Aabb)> + '_ {
        self.statics
            .iter()
            .map(|c| (c.id, c.layer, c.bounds))
            .chain(std::iter::once((self.paddle.id, PADDLE_LAYER, self.paddle.bounds())))
            .chain(
                self.blocks
                    .iter()
                    .filter(|b| b.alive)
                    .map(|b| (b.id, BLOCKS_LAYER, b.bounds)),
            )
    }
}

impl CollisionWorld for Board {
    fn cast_circle(
        &self,
        origin: Vec2,
        radius: f32,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> SweepHits {
        let mut hits: Vec<SweepHit> = self
            .colliders()
            .filter(|(_, layer, _)| mask.includes(*layer))
            .filter_map(|(target, _, bounds)| {
                sweep_circle_aabb(origin, radius, direction, max_distance, &bounds).map(|c| SweepHit {
                    target,
                    point: c.point,
                    normal: c.normal,
                    centroid: c.centroid,
                    distance: c.distance,
                })
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.target.cmp(&b.target)));

        // Only contacts that happen together count as a double hit
        let Some(nearest) = hits.first().map(|h| h.distance) else {
            return SweepHits::new();
        };
        hits.into_iter()
            .take_while(|h| h.distance <= nearest + self.contact_slop)
            .take(2)
            .collect()
    }

    fn layer_of(&self, target: TargetId) -> Option<u8> {
        if target == self.paddle.id {
            return Some(PADDLE_LAYER);
        }
        self.statics
            .iter()
            .find(|c| c.id == target)
            .map(|c| c.layer)
            .or_else(|| self.block(target).map(|_| BLOCKS_LAYER))
    }

    fn bounds_of(&self, target: TargetId) -> Option<Aabb> {
        if target == self.paddle.id {
            return Some(self.paddle.bounds());
        }
        self.statics
            .iter()
            .find(|c| c.id == target)
            .map(|c| c.bounds)
            .or_else(|| self.block(target).map(|b| b.bounds))
    }

    fn viewport_contains(&self, point: Vec2) -> bool {
        self.viewport.contains(point)
    }
}
