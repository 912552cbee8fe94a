//! Distances, arena bounds and overlap tests
//!
//! Positions are expressed in grid units. A point `(x, y)` marks the
//! top-left corner of a one-cell footprint, so the visual centre of anything
//! placed there sits at `(x + 0.5, y + 0.5)`. Integral points are grid cells.

use serde::{Deserialize, Serialize};

/// Fraction of a cell two centres must be within (on both axes) to overlap
pub const COLLISION_TOLERANCE: f64 = 0.6;

/// Snake-segment collision threshold multiplier under the titan modifier
pub const TITAN_COLLISION_SCALE: f64 = 2.0;

/// Fruit radius relative to cell size
pub const FRUIT_RADIUS_RATIO: f64 = 0.4;

/// Projectile radius relative to cell size
pub const PROJECTILE_RADIUS_RATIO: f64 = 0.2;

/// The live arena never shrinks below this many cells per side
pub const MIN_ARENA_SIZE: f64 = 10.0;

/// A continuous position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Centre of the one-cell footprint anchored at this point
    pub fn center(&self) -> Point {
        Point::new(self.x + 0.5, self.y + 0.5)
    }

    pub fn distance(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Nearest grid cell to this footprint's centre
    pub fn nearest_cell(&self) -> Cell {
        let c = self.center();
        Cell::new(c.x.floor() as i32, c.y.floor() as i32)
    }
}

/// An integral grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Move position by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn as_point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }

    pub fn center(&self) -> Point {
        self.as_point().center()
    }

    /// Largest per-axis distance between two cells
    pub fn chebyshev(&self, other: Cell) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Clamp into `[0, grid_size)` on both axes
    pub fn clamped_to_grid(&self, grid_size: u32) -> Cell {
        let max = grid_size.saturating_sub(1) as i32;
        Cell::new(self.x.clamp(0, max), self.y.clamp(0, max))
    }
}

/// The playable sub-rectangle, always centred within the nominal grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub grid_size: u32,
    /// Current side length in cells, may be fractional while shrinking
    pub size: f64,
}

impl Arena {
    /// An arena covering the whole grid
    pub fn full(grid_size: u32) -> Self {
        Self {
            grid_size,
            size: grid_size as f64,
        }
    }

    /// Distance from the grid edge to the arena edge on each side
    pub fn offset(&self) -> f64 {
        (self.grid_size as f64 - self.size) / 2.0
    }

    /// Half-open range `[lo, hi)` of whole cells inside the arena, same on both axes
    pub fn cell_bounds(&self) -> (i32, i32) {
        let offset = self.offset();
        (offset.ceil() as i32, (offset + self.size).floor() as i32)
    }

    pub fn contains_cell(&self, cell: Cell) -> bool {
        let (lo, hi) = self.cell_bounds();
        (lo..hi).contains(&cell.x) && (lo..hi).contains(&cell.y)
    }

    /// Whether a one-cell footprint anchored at `p` lies inside the arena
    pub fn contains_point(&self, p: Point) -> bool {
        let lo = self.offset();
        let hi = lo + self.size - 1.0;
        p.x >= lo && p.x <= hi && p.y >= lo && p.y <= hi
    }

    pub fn clamp_point(&self, p: Point) -> Point {
        let lo = self.offset();
        let hi = (lo + self.size - 1.0).max(lo);
        Point::new(p.x.max(lo).min(hi), p.y.max(lo).min(hi))
    }

    /// Shrink for the given run time at `rate` cells per minute per edge.
    ///
    /// Both edges move, so the side length loses twice the rate. Never grows
    /// back and never drops below [`MIN_ARENA_SIZE`] (or the grid itself when
    /// the grid is smaller than that).
    pub fn shrink_for(&mut self, elapsed_ms: u64, rate: f64) {
        let grid = self.grid_size as f64;
        let minutes = elapsed_ms as f64 / 60_000.0;
        let floor = MIN_ARENA_SIZE.min(grid);
        let target = (grid - minutes * rate * 2.0).max(floor);
        self.size = self.size.min(target);
    }
}

/// Box overlap between two one-cell footprints.
///
/// Collide when both the horizontal and the vertical centre distance are
/// below `cell_size * COLLISION_TOLERANCE * scale` pixels.
pub fn cells_collide(a: Point, b: Point, cell_size: f64, scale: f64) -> bool {
    let dx = (a.x - b.x).abs() * cell_size;
    let dy = (a.y - b.y).abs() * cell_size;
    let threshold = cell_size * COLLISION_TOLERANCE * scale;
    dx < threshold && dy < threshold
}

/// Circle overlap between two centres, radii given as fractions of a cell
pub fn circles_collide(a: Point, a_radius: f64, b: Point, b_radius: f64, cell_size: f64) -> bool {
    a.distance(b) * cell_size < (a_radius + b_radius) * cell_size
}
