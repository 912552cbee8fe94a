//! Progress, lives and leaderboards
//!
//! The simulation only talks to a [`Persistence`] implementation at run
//! boundaries. Two stores are provided: [`MemoryStore`] keeps everything in
//! process, [`JsonFileStore`] mirrors it to a JSON file after every write.

pub mod file;
pub mod memory;
pub mod worker;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::JsonFileStore;
pub use memory::{MAX_TRIES_PER_DAY, MemoryStore, StoreData};
pub use worker::{StoreReply, StoreWorker, Submission, SubmissionReply};

/// Failures surfaced by a store
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no player is signed in")]
    NotAuthenticated,

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is corrupt: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Which ranking to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    /// Best survival times on one level
    Survival(u32),
    /// Best survival time on any level, one row per player
    Global,
    /// Furthest story progress across all players
    Story,
}

/// One row of a leaderboard, highest score first when listed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    /// Survival time in ms, or story level reached
    pub score: u64,
    /// Snake length when the run ended; zero on the story board
    #[serde(default)]
    pub snake_length: usize,
    #[serde(default)]
    pub foods_eaten: u32,
    pub recorded_at: DateTime<Utc>,
}

/// What a finished survival run hands to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunScore {
    /// Elapsed time floored to 100 ms
    pub score_ms: u64,
    pub snake_length: usize,
    pub foods_eaten: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryProgress {
    pub current_level: u32,
    pub tries_remaining: u32,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayStatus {
    pub can_play: bool,
    pub tries_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TryUsage {
    pub tries_remaining: u32,
    pub success: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCompletion {
    pub new_level: u32,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurvivalSubmission {
    pub is_personal_best: bool,
    /// 1-based position on the level board, if the player is on it
    pub rank: Option<u32>,
    pub personal_best: u64,
    /// Top score on the global board
    pub global_best: u64,
    pub global_rank: Option<u32>,
}

/// Storage for one signed-in player's progress and the shared leaderboards.
///
/// Every call is safe to repeat: resubmitting a score or completing a level
/// twice leaves the store as a single call would.
pub trait Persistence {
    /// Current story level and today's remaining lives
    fn story_progress(&mut self) -> Result<StoryProgress>;

    fn can_play(&mut self) -> Result<PlayStatus>;

    /// Consume one life; `success` is false when none were left
    fn use_try(&mut self) -> Result<TryUsage>;

    /// Advance past `level` if it is the player's current level
    fn complete_level(&mut self, level: u32) -> Result<LevelCompletion>;

    /// Record a survival run on its level board and the global board
    fn submit_survival_score(&mut self, level: u32, score: RunScore) -> Result<SurvivalSubmission>;

    fn personal_best(&self, level: u32) -> Result<u64>;

    /// Best survival time on any level
    fn global_personal_best(&self) -> Result<u64>;

    /// Personal bests for levels `1..=max_level` that have one
    fn all_personal_bests(&self, max_level: u32) -> Result<BTreeMap<u32, u64>>;

    fn leaderboard(&self, board: Board, limit: usize) -> Result<Vec<LeaderboardEntry>>;

    /// The player's 1-based rank on `board`
    fn rank(&self, board: Board) -> Result<Option<u32>>;
}
