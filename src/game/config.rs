use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fastest the snake may ever move, in ms per step
pub const MIN_SNAKE_SPEED: u64 = 30;

/// Slowest the snake may be pushed to by player penalties, in ms per step
pub const MAX_SNAKE_SPEED: u64 = 300;

/// Lifetime of an untouched power-food, in ms
pub const POWER_FOOD_DURATION: u64 = 6_000;

/// Run time before the player is allowed to eat power-food, in ms
pub const PLAYER_FOOD_UNLOCK: u64 = 30_000;

/// Run time after which survival mode switches to the boosted food penalties
pub const SURVIVAL_BOOST_AFTER: u64 = 60_000;

/// Charge-up window preceding every volley, in ms
pub const PROJECTILE_CHARGE_TIME: u64 = 500;

/// Projectile speed in cells per tick
pub const PROJECTILE_SPEED: f64 = 0.3;

/// Angle between neighbouring shots of a spread, in degrees
pub const PROJECTILE_SPREAD_DEGREES: f64 = 15.0;

/// Invisible modifier cycle length and the hidden part at its start, in ms
pub const INVISIBLE_CYCLE: u64 = 3_000;
pub const INVISIBLE_HIDDEN: u64 = 500;

/// Chaos modifier re-roll cadence and speed range (inclusive), in ms
pub const CHAOS_INTERVAL: u64 = 5_000;
pub const CHAOS_SPEED_RANGE: (u64, u64) = (80, 200);

/// Shrinking-arena rate in cells per minute per edge
pub const SHRINK_RATE_PER_MINUTE: f64 = 0.5;

/// Which ruleset a run is played under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Fixed level sequence, won by surviving `survival_time`
    Story,
    /// Endless; scored by elapsed time
    Survival,
}

/// Special rule a level plays under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    #[default]
    None,
    /// Snake segments collide at twice the usual distance
    Titan,
    /// Snake blinks out for part of every cycle
    Invisible,
    /// Snake speed re-rolled periodically
    Chaos,
    /// Live arena closes in over time
    ShrinkingArena,
    /// Pursuit never takes a suboptimal step
    PerfectAi,
}

impl Modifier {
    pub fn label(&self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::Titan => "TITAN",
            Modifier::Invisible => "INVISIBLE",
            Modifier::Chaos => "CHAOS",
            Modifier::ShrinkingArena => "SHRINKING ARENA",
            Modifier::PerfectAi => "PERFECT AI",
        }
    }
}

/// Power-food tuning for a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerFoodConfig {
    /// Time the board stays empty before a new power-food appears, in ms
    pub spawn_interval: u64,
    /// Step delay removed when the snake eats it, in ms
    pub speed_boost: u64,
    /// Segments added when the snake eats it
    pub grow_boost: usize,
}

/// Projectile tuning for a level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileConfig {
    /// Time between the end of one volley and the start of the next charge, in ms
    pub fire_interval: u64,
    /// Shots per volley; more than one fans out into a spread
    pub count: u32,
}

/// Immutable per-level parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub id: u32,
    pub name: String,
    /// Side length of the square grid in cells
    pub grid_size: u32,
    pub initial_snake_length: usize,
    pub max_snake_length: usize,
    /// Step delay at run start, in ms
    pub initial_speed: u64,
    /// Floor for the speed ramp, in ms
    pub min_speed: u64,
    pub speed_increase_interval: u64,
    pub speed_increase_amount: u64,
    pub grow_interval: u64,
    pub grow_amount: usize,
    /// Story-mode win threshold, in ms
    pub survival_time: u64,
    #[serde(default)]
    pub modifier: Modifier,
    #[serde(default)]
    pub power_food: Option<PowerFoodConfig>,
    #[serde(default)]
    pub projectiles: Option<ProjectileConfig>,
}

impl LevelConfig {
    /// A plain level with no modifiers, power-food or projectiles
    pub fn basic(id: u32, grid_size: u32) -> Self {
        Self {
            id,
            name: format!("Level {id}"),
            grid_size,
            initial_snake_length: 3,
            max_snake_length: 30,
            initial_speed: 150,
            min_speed: 50,
            speed_increase_interval: 3_000,
            speed_increase_amount: 5,
            grow_interval: 5_000,
            grow_amount: 1,
            survival_time: 30_000,
            modifier: Modifier::None,
            power_food: None,
            projectiles: None,
        }
    }

    /// Check that the level can actually be played
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::EmptyGrid { level: self.id });
        }

        if self.initial_snake_length == 0 || self.initial_snake_length > self.max_snake_length {
            return Err(ConfigError::SnakeLength {
                level: self.id,
                initial: self.initial_snake_length,
                max: self.max_snake_length,
            });
        }

        if self.min_speed > self.initial_speed {
            return Err(ConfigError::SpeedRange {
                level: self.id,
                initial: self.initial_speed,
                min: self.min_speed,
            });
        }

        if let Some(projectiles) = &self.projectiles {
            if projectiles.count == 0 {
                return Err(ConfigError::EmptyVolley { level: self.id });
            }
        }

        Ok(())
    }

    /// Floor the speed ramp may reach on this level
    pub fn speed_floor(&self) -> u64 {
        self.min_speed.max(MIN_SNAKE_SPEED)
    }
}

/// Knobs with no per-level meaning that still deserve to be configurable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tuning {
    /// Probability the pursuit AI takes its second-best step
    pub suboptimal_move_chance: f64,
    /// Rejection-sampling budget for power-food placement
    pub power_food_attempts: u32,
    /// Cell used when sampling fails, relative to the live arena's top-left cell
    pub power_food_fallback: (i32, i32),
    /// Power-food never spawns closer than this (Chebyshev) to the fruit
    pub power_food_min_fruit_distance: i32,
}

impl Tuning {
    /// Reject knobs the engine cannot act on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chance = self.suboptimal_move_chance;
        // NaN fails the range check too
        if !(0.0..=1.0).contains(&chance) {
            return Err(ConfigError::SuboptimalChance(chance));
        }

        let (dx, dy) = self.power_food_fallback;
        if dx < 0 || dy < 0 {
            return Err(ConfigError::FallbackCell { dx, dy });
        }

        Ok(())
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            suboptimal_move_chance: 0.08,
            power_food_attempts: 50,
            power_food_fallback: (1, 1),
            power_food_min_fruit_distance: 3,
        }
    }
}

/// Reasons a level or catalog is rejected
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("level {level}: grid must have at least one cell")]
    EmptyGrid { level: u32 },

    #[error("level {level}: initial snake length {initial} must be within 1..={max}")]
    SnakeLength {
        level: u32,
        initial: usize,
        max: usize,
    },

    #[error("level {level}: min speed {min}ms is slower than initial speed {initial}ms")]
    SpeedRange { level: u32, initial: u64, min: u64 },

    #[error("level {level}: projectile volleys need at least one shot")]
    EmptyVolley { level: u32 },

    #[error("suboptimal move chance {0} is not a probability")]
    SuboptimalChance(f64),

    #[error("power-food fallback ({dx}, {dy}) lies outside the arena")]
    FallbackCell { dx: i32, dy: i32 },

    #[error("level {0} appears more than once")]
    DuplicateLevel(u32),

    #[error("level catalog is empty")]
    EmptyCatalog,

    #[error("failed to read level catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse level catalog: {0}")]
    Parse(#[from] serde_json::Error),
}
