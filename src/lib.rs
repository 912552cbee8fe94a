//! Fruit Run - reverse snake: the player steers a fruit, an AI snake hunts it
//!
//! This library provides:
//! - Core simulation: level data, pursuit AI, per-tick update engine, run driver (game module)
//! - Progress, lives and leaderboards (persistence module)
//! - Terminal front end: rendering, input, frame loop (render, input, modes modules)
//! - Session statistics (metrics module)

pub mod game;
pub mod input;
pub mod metrics;
pub mod modes;
pub mod persistence;
pub mod render;
