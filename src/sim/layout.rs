//! Seeded block layout generation
//!
//! A level's layout is a pure function of (seed, level, excluded cells):
//! random figures carve a block mask, a colour pattern picks each block's
//! hit-point tier and power-up blocks are sprinkled in mirrored pairs.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::geometry::Aabb;
use crate::tuning::LayoutTuning;

/// Column/row of a block in the level grid (row 0 at the top)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridIndex {
    pub x: u32,
    pub y: u32,
}

/// A block to place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub grid: GridIndex,
    pub hit_points: u8,
    pub power_up: bool,
}

/// How hit-point tiers are spread across the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    Horizontal,
    Vertical,
    DiagRight,
    DiagLeft,
    Circle,
}

impl Pattern {
    pub const ALL: [Pattern; 5] = [
        Pattern::Horizontal,
        Pattern::Vertical,
        Pattern::DiagRight,
        Pattern::DiagLeft,
        Pattern::Circle,
    ];

    /// Tier index for a cell
    fn tier(self, x: i64, y: i64, center: (i64, i64), tiers: usize) -> usize {
        let raw = match self {
            Pattern::Horizontal => y,
            Pattern::Vertical => x,
            Pattern::DiagRight => x + y,
            Pattern::DiagLeft => (x - y).abs(),
            Pattern::Circle => distance(center, (x, y)).round() as i64,
        };
        raw as usize % tiers
    }
}

/// Boolean grid
#[derive(Debug, Clone)]
struct Mask {
    columns: u32,
    rows: u32,
    cells: Vec<bool>,
}

impl Mask {
    fn new(columns: u32, rows: u32) -> Self {
        Self {
            columns,
            rows,
            cells: vec![false; (columns * rows) as usize],
        }
    }

    fn get(&self, x: u32, y: u32) -> bool {
        self.cells[(y * self.columns + x) as usize]
    }

    fn set(&mut self, x: u32, y: u32, value: bool) {
        self.cells[(y * self.columns + x) as usize] = value;
    }

    fn weight(&self) -> u32 {
        self.cells.iter().filter(|c| **c).count() as u32
    }

    /// Set every cell matching `shape`, or flip it when `inverse`
    fn apply(&mut self, inverse: bool, shape: impl Fn(i64, i64) -> bool) {
        for y in 0..self.rows {
            for x in 0..self.columns {
                if shape(x as i64, y as i64) {
                    let value = if inverse { !self.get(x, y) } else { true };
                    self.set(x, y, value);
                }
            }
        }
    }
}

fn distance(a: (i64, i64), b: (i64, i64)) -> f64 {
    let dx = (a.0 - b.0) as f64;
    let dy = (a.1 - b.1) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Generate the blocks of `level`, skipping `exclude`d cells
pub fn generate_layout(
    tuning: &LayoutTuning,
    level: u32,
    exclude: &BTreeSet<GridIndex>,
) -> Vec<BlockSpec> {
    let mut rng = Pcg32::seed_from_u64(tuning.seed.wrapping_add(level as u64));
    let (columns, rows) = (tuning.columns, tuning.rows);
    let center = ((columns / 2) as i64, (rows / 2) as i64);

    let mut simple = Mask::new(columns, rows);
    let figures = rng.random_range(5..10);
    for _ in 0..figures {
        apply_random_figure(&mut rng, &mut simple, center);
    }

    let pattern = Pattern::ALL[rng.random_range(0..Pattern::ALL.len())];
    let power_ups = power_up_mask(&mut rng, &simple);

    let tiers = &tuning.hit_point_tiers;
    let mut specs = Vec::new();
    for x in 0..columns {
        for y in 0..rows {
            let grid = GridIndex { x, y };
            if exclude.contains(&grid) {
                continue;
            }
            if power_ups.get(x, y) {
                specs.push(BlockSpec {
                    grid,
                    hit_points: tuning.power_up_hit_points,
                    power_up: true,
                });
            } else if simple.get(x, y) && !tiers.is_empty() {
                let tier = pattern.tier(x as i64, y as i64, center, tiers.len());
                specs.push(BlockSpec {
                    grid,
                    hit_points: tiers[tier],
                    power_up: false,
                });
            }
        }
    }

    log::debug!(
        "Generated level {} layout: {} blocks, pattern {:?}, {} figures",
        level,
        specs.len(),
        pattern,
        figures
    );
    specs
}

fn apply_random_figure(rng: &mut Pcg32, mask: &mut Mask, center: (i64, i64)) {
    let inverse = rng.random_bool(0.5);
    // Half the rolls add nothing
    match rng.random_range(0..4) {
        0 => {
            let upper = mask.rows.min(mask.columns) / 2;
            let radius = if upper > 1 { rng.random_range(1..upper) } else { 1 };
            mask.apply(inverse, |x, y| distance(center, (x, y)) <= radius as f64);
        }
        1 => {
            let half_width = rng.random_range(1..mask.columns.max(2)) as i64 / 2;
            let half_height = rng.random_range(1..mask.rows.max(2)) as i64 / 2;
            mask.apply(inverse, |x, y| {
                (center.0 - half_width..=center.0 + half_width).contains(&x)
                    && (center.1 - half_height..=center.1 + half_height).contains(&y)
            });
        }
        _ => {}
    }
}

/// Power-up cells: mirrored pairs in the upper half, an odd one in the center column
fn power_up_mask(rng: &mut Pcg32, simple: &Mask) -> Mask {
    let (columns, rows) = (simple.columns, simple.rows);
    let mut mask = Mask::new(columns, rows);
    if columns == 0 || rows == 0 {
        return mask;
    }
    let count = 6 * simple.weight() / (columns * rows);
    let half_rows = (rows / 2).max(1);

    if columns >= 2 {
        for _ in 0..count / 2 {
            let x = rng.random_range(0..columns / 2);
            let y = rng.random_range(0..half_rows);
            mask.set(x, y, true);
            mask.set(columns - 1 - x, y, true);
        }
    }
    if count % 2 == 1 {
        let y = rng.random_range(0..half_rows);
        mask.set(columns / 2, y, true);
    }
    mask
}

/// World bounds of a grid cell, the grid centered horizontally under the top offset
pub fn cell_bounds(tuning: &LayoutTuning, viewport: &Aabb, grid: GridIndex) -> Aabb {
    let board_width = tuning.cell_width * tuning.columns as f32;
    let left = viewport.center.x - board_width / 2.0;
    let top = viewport.max().y - tuning.top_offset;
    let min = Vec2::new(
        left + grid.x as f32 * tuning.cell_width,
        top - (grid.y + 1) as f32 * tuning.cell_height,
    );
    Aabb::from_min_size(min, Vec2::new(tuning.cell_width, tuning.cell_height))
}
