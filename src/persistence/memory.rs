use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Board, LeaderboardEntry, LevelCompletion, Persistence, PersistenceError, PlayStatus, Result,
    RunScore, StoryProgress, SurvivalSubmission, TryUsage,
};
use crate::game::TOTAL_LEVELS;

/// Lives granted each UTC day
pub const MAX_TRIES_PER_DAY: u32 = 3;

/// Per-player bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub current_level: u32,
    pub tries: u32,
    /// Day the tries were last refilled
    pub last_reset: Option<NaiveDate>,
    /// Best survival time per level, in ms
    pub survival_bests: BTreeMap<u32, u64>,
    /// Best survival time on any level, in ms
    #[serde(default)]
    pub global_best: u64,
}

impl Default for PlayerRecord {
    fn default() -> Self {
        Self {
            current_level: 1,
            tries: MAX_TRIES_PER_DAY,
            last_reset: None,
            survival_bests: BTreeMap::new(),
            global_best: 0,
        }
    }
}

/// Everything a store keeps, in a serializable shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    pub players: BTreeMap<String, PlayerRecord>,
    /// Level id to per-player best entry
    pub survival_boards: BTreeMap<u32, BTreeMap<String, LeaderboardEntry>>,
    /// Each player's best survival run on any level
    #[serde(default)]
    pub global_board: BTreeMap<String, LeaderboardEntry>,
    pub story_board: BTreeMap<String, LeaderboardEntry>,
}

/// In-process store acting on behalf of a single player
pub struct MemoryStore {
    player: String,
    data: StoreData,
    today: fn() -> NaiveDate,
}

fn utc_today() -> NaiveDate {
    Utc::now().date_naive()
}

impl MemoryStore {
    pub fn new(player: impl Into<String>) -> Self {
        Self::with_data(player, StoreData::default())
    }

    pub fn with_data(player: impl Into<String>, data: StoreData) -> Self {
        Self {
            player: player.into(),
            data,
            today: utc_today,
        }
    }

    /// Replace the clock used for the daily life reset
    pub fn with_date_source(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    fn ensure_player(&self) -> Result<()> {
        if self.player.trim().is_empty() {
            return Err(PersistenceError::NotAuthenticated);
        }
        Ok(())
    }

    /// Player record with today's lives refilled if the day rolled over
    fn refreshed_record(&mut self) -> Result<&mut PlayerRecord> {
        self.ensure_player()?;
        let today = (self.today)();
        let record = self.data.players.entry(self.player.clone()).or_default();
        if record.last_reset != Some(today) {
            record.tries = MAX_TRIES_PER_DAY;
            record.last_reset = Some(today);
        }
        Ok(record)
    }

    fn board(&self, board: Board) -> Option<&BTreeMap<String, LeaderboardEntry>> {
        match board {
            Board::Survival(level) => self.data.survival_boards.get(&level),
            Board::Global => Some(&self.data.global_board),
            Board::Story => Some(&self.data.story_board),
        }
    }
}

/// Highest score first; equal scores order by username, later names first
fn ranked(board: &BTreeMap<String, LeaderboardEntry>) -> Vec<&LeaderboardEntry> {
    let mut entries: Vec<&LeaderboardEntry> = board.values().collect();
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.username.cmp(&a.username))
    });
    entries
}

fn rank_of(board: &BTreeMap<String, LeaderboardEntry>, username: &str) -> Option<u32> {
    ranked(board)
        .iter()
        .position(|entry| entry.username == username)
        .map(|index| index as u32 + 1)
}

impl Persistence for MemoryStore {
    fn story_progress(&mut self) -> Result<StoryProgress> {
        let record = self.refreshed_record()?;
        Ok(StoryProgress {
            current_level: record.current_level,
            tries_remaining: record.tries,
            is_completed: record.current_level > TOTAL_LEVELS,
        })
    }

    fn can_play(&mut self) -> Result<PlayStatus> {
        let record = self.refreshed_record()?;
        Ok(PlayStatus {
            can_play: record.tries > 0,
            tries_remaining: record.tries,
        })
    }

    fn use_try(&mut self) -> Result<TryUsage> {
        let record = self.refreshed_record()?;
        if record.tries == 0 {
            return Ok(TryUsage {
                tries_remaining: 0,
                success: false,
            });
        }

        record.tries -= 1;
        Ok(TryUsage {
            tries_remaining: record.tries,
            success: true,
        })
    }

    fn complete_level(&mut self, level: u32) -> Result<LevelCompletion> {
        let player = self.player.clone();
        let record = self.refreshed_record()?;
        if level != record.current_level {
            return Ok(LevelCompletion {
                new_level: record.current_level,
                is_completed: record.current_level > TOTAL_LEVELS,
            });
        }

        record.current_level += 1;
        let new_level = record.current_level;
        self.data.story_board.insert(
            player.clone(),
            LeaderboardEntry {
                username: player,
                score: new_level as u64,
                snake_length: 0,
                foods_eaten: 0,
                recorded_at: Utc::now(),
            },
        );

        Ok(LevelCompletion {
            new_level,
            is_completed: new_level > TOTAL_LEVELS,
        })
    }

    fn submit_survival_score(&mut self, level: u32, score: RunScore) -> Result<SurvivalSubmission> {
        let player = self.player.clone();
        let record = self.refreshed_record()?;

        let current_best = record.survival_bests.get(&level).copied().unwrap_or(0);
        let is_personal_best = score.score_ms > current_best;
        if is_personal_best {
            record.survival_bests.insert(level, score.score_ms);
        }
        let is_global_personal_best = score.score_ms > record.global_best;
        if is_global_personal_best {
            record.global_best = score.score_ms;
        }

        let entry = LeaderboardEntry {
            username: player.clone(),
            score: score.score_ms,
            snake_length: score.snake_length,
            foods_eaten: score.foods_eaten,
            recorded_at: Utc::now(),
        };
        if is_personal_best {
            self.data
                .survival_boards
                .entry(level)
                .or_default()
                .insert(player.clone(), entry.clone());
        }
        if is_global_personal_best {
            self.data.global_board.insert(player.clone(), entry);
        }

        let rank = self
            .data
            .survival_boards
            .get(&level)
            .and_then(|board| rank_of(board, &player));
        let global_best = ranked(&self.data.global_board)
            .first()
            .map_or(0, |entry| entry.score);

        Ok(SurvivalSubmission {
            is_personal_best,
            rank,
            personal_best: current_best.max(score.score_ms),
            global_best,
            global_rank: rank_of(&self.data.global_board, &player),
        })
    }

    fn personal_best(&self, level: u32) -> Result<u64> {
        self.ensure_player()?;
        Ok(self
            .data
            .players
            .get(&self.player)
            .and_then(|record| record.survival_bests.get(&level).copied())
            .unwrap_or(0))
    }

    fn global_personal_best(&self) -> Result<u64> {
        self.ensure_player()?;
        Ok(self
            .data
            .players
            .get(&self.player)
            .map_or(0, |record| record.global_best))
    }

    fn all_personal_bests(&self, max_level: u32) -> Result<BTreeMap<u32, u64>> {
        self.ensure_player()?;
        let record = match self.data.players.get(&self.player) {
            Some(record) if max_level > 0 => record,
            _ => return Ok(BTreeMap::new()),
        };
        Ok(record
            .survival_bests
            .range(1..=max_level)
            .map(|(level, best)| (*level, *best))
            .collect())
    }

    fn leaderboard(&self, board: Board, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        Ok(self
            .board(board)
            .map(|entries| ranked(entries).into_iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn rank(&self, board: Board) -> Result<Option<u32>> {
        self.ensure_player()?;
        Ok(self
            .board(board)
            .and_then(|entries| rank_of(entries, &self.player)))
    }
}
