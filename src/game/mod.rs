//! Core simulation for the reverse-snake game
//!
//! This module contains all the game logic without any I/O or rendering dependencies.
//! The host drives it through [`GameDriver`] one frame at a time.

pub mod config;
pub mod direction;
pub mod driver;
pub mod engine;
pub mod geometry;
pub mod levels;
pub mod pursuit;
pub mod state;

// Re-export commonly used types
pub use config::{
    ConfigError, GameMode, LevelConfig, Modifier, PowerFoodConfig, ProjectileConfig, Tuning,
};
pub use direction::Direction;
pub use driver::{DriverError, GameDriver, Phase, RunReport};
pub use engine::{FoodPenalty, GameEngine, TickInfo, TickResult};
pub use geometry::{Arena, Cell, Point};
pub use levels::{LevelCatalog, TOTAL_LEVELS};
pub use state::{LossCause, PowerFood, Projectile, RunOutcome, RunState, RunStatus, Snake, Snapshot};
