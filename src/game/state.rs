use std::sync::Arc;

use super::config::{GameMode, LevelConfig};
use super::direction::Direction;
use super::geometry::{Arena, Cell, Point};

/// The snake in the game
#[derive(Debug, Clone, PartialEq)]
pub struct Snake {
    /// Body segments, with head at index 0
    pub body: Vec<Cell>,
}

impl Snake {
    /// Create a new snake with given head position, trailing away from `direction`
    pub fn new(head: Cell, direction: Direction, length: usize) -> Self {
        let mut body = vec![head];

        // Add initial body segments behind the head
        let (dx, dy) = direction.delta();
        for i in 1..length.max(1) {
            let prev = body[i - 1];
            body.push(prev.moved_by(-dx, -dy));
        }

        Self { body }
    }

    /// Get the head position
    pub fn head(&self) -> Cell {
        self.body[0]
    }

    /// Get the tail position (last segment)
    pub fn tail(&self) -> Cell {
        self.body[self.body.len() - 1]
    }

    /// Shift a new head in and drop the tail; length is unchanged
    pub fn advance(&mut self, new_head: Cell) {
        self.body.insert(0, new_head);
        self.body.pop();
    }

    /// Append copies of the tail, never exceeding `max_len`
    pub fn grow(&mut self, amount: usize, max_len: usize) {
        let tail = self.tail();
        let target = (self.body.len() + amount).min(max_len).max(self.body.len());
        self.body.resize(target, tail);
    }

    /// Remove tail segments, always keeping the head
    pub fn shrink(&mut self, amount: usize) {
        let target = self.body.len().saturating_sub(amount).max(1);
        self.body.truncate(target);
    }

    /// Pull every segment back into `[0, grid_size)`
    pub fn clamp_to_grid(&mut self, grid_size: u32) {
        for segment in &mut self.body {
            *segment = segment.clamped_to_grid(grid_size);
        }
    }

    pub fn occupies(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    /// Get the length of the snake
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Check if the snake is empty (should never happen in practice)
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// A transient pickup both the snake and the player can eat
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerFood {
    pub cell: Cell,
    /// Timestamp it appeared, in ms
    pub spawn_time: u64,
}

/// A shot fired from the snake head
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    /// Centre position in grid units
    pub position: Point,
    /// Displacement per tick
    pub velocity: Point,
}

impl Projectile {
    pub fn advance(&mut self) {
        self.position.x += self.velocity.x;
        self.position.y += self.velocity.y;
    }

    pub fn is_within(&self, grid_size: u32) -> bool {
        let limit = grid_size as f64;
        (0.0..limit).contains(&self.position.x) && (0.0..limit).contains(&self.position.y)
    }
}

/// What ended a lost run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossCause {
    /// Fruit touched a snake segment
    Caught,
    /// Fruit touched a projectile
    Shot,
    /// Fruit left the live arena
    OutOfArena,
}

/// Final result of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Won,
    Lost(LossCause),
}

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Playing,
    Ended(RunOutcome),
}

/// Timestamps of the last time each periodic event fired, in ms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventClock {
    pub last_move: u64,
    pub last_grow: u64,
    pub last_speed: u64,
    pub last_chaos: u64,
    /// Last time the board became free of power-food
    pub last_power_food: u64,
    pub last_shot: u64,
    /// Set while a volley is charging
    pub charge_started: Option<u64>,
}

impl EventClock {
    pub fn starting_at(now: u64) -> Self {
        Self {
            last_move: now,
            last_grow: now,
            last_speed: now,
            last_chaos: now,
            last_power_food: now,
            last_shot: now,
            charge_started: None,
        }
    }
}

/// The mutable simulation for one run
#[derive(Debug, Clone)]
pub struct RunState {
    pub level: Arc<LevelConfig>,
    pub mode: GameMode,
    pub snake: Snake,
    /// Player avatar, top-left anchored like a cell
    pub fruit: Point,
    pub power_food: Option<PowerFood>,
    pub projectiles: Vec<Projectile>,
    /// Step delay in ms; lower is faster
    pub speed: u64,
    pub arena: Arena,
    pub visible: bool,
    pub charging: bool,
    pub clock: EventClock,
    pub start_time: u64,
    /// Run time as of the latest tick, in ms
    pub elapsed: u64,
    /// Power-food eaten by the player
    pub foods_eaten: u32,
    /// Pixel size of one cell, used by collision thresholds
    pub cell_size: f64,
    pub status: RunStatus,
}

impl RunState {
    /// Fresh state for `level`, with the clock started at `now`
    pub fn new(level: Arc<LevelConfig>, mode: GameMode, now: u64) -> Self {
        let grid = level.grid_size;
        let start = Cell::new(2.min(grid as i32 - 1), (grid / 2) as i32);
        let mut snake = Snake::new(start, Direction::Right, level.initial_snake_length);
        snake.clamp_to_grid(grid);

        let middle = (grid / 2) as f64;
        Self {
            mode,
            snake,
            fruit: Point::new(middle, middle),
            power_food: None,
            projectiles: Vec::new(),
            speed: level.initial_speed,
            arena: Arena::full(grid),
            visible: true,
            charging: false,
            clock: EventClock::starting_at(now),
            start_time: now,
            elapsed: 0,
            foods_eaten: 0,
            cell_size: 1.0,
            status: RunStatus::Playing,
            level,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Playing
    }

    pub fn outcome(&self) -> Option<RunOutcome> {
        match self.status {
            RunStatus::Playing => None,
            RunStatus::Ended(outcome) => Some(outcome),
        }
    }

    /// Move the fruit, clamped to the live arena. The latest call wins.
    pub fn set_fruit(&mut self, target: Point) {
        self.fruit = self.arena.clamp_point(target);
    }

    /// Point the snake is steering toward: power-food first, else the fruit
    pub fn pursuit_target(&self) -> Point {
        match &self.power_food {
            Some(food) => food.cell.center(),
            None => self.fruit,
        }
    }

    /// Read-only view handed to the renderer
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            level: &self.level,
            mode: self.mode,
            snake: &self.snake.body,
            fruit: self.fruit,
            power_food: self.power_food,
            projectiles: &self.projectiles,
            arena: self.arena,
            visible: self.visible,
            charging: self.charging,
            speed: self.speed,
            elapsed: self.elapsed,
            foods_eaten: self.foods_eaten,
            status: self.status,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub level: &'a LevelConfig,
    pub mode: GameMode,
    pub snake: &'a [Cell],
    pub fruit: Point,
    pub power_food: Option<PowerFood>,
    pub projectiles: &'a [Projectile],
    pub arena: Arena,
    pub visible: bool,
    pub charging: bool,
    pub speed: u64,
    pub elapsed: u64,
    pub foods_eaten: u32,
    pub status: RunStatus,
}
