use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{
    Board, LeaderboardEntry, LevelCompletion, Persistence, PlayStatus, Result, RunScore,
    StoryProgress, SurvivalSubmission, TryUsage,
    memory::{MemoryStore, StoreData},
};

/// A [`MemoryStore`] mirrored to a JSON file after every write
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet
    pub fn open(path: &Path, player: impl Into<String>) -> Result<Self> {
        let data = if path.exists() {
            let json = std::fs::read_to_string(path)?;
            serde_json::from_str(&json)?
        } else {
            StoreData::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            inner: MemoryStore::with_data(player, data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        // Create parent directories if needed
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self.inner.data())?;
        std::fs::write(&self.path, json)?;
        debug!(path = ?self.path, "store saved");
        Ok(())
    }
}

impl Persistence for JsonFileStore {
    fn story_progress(&mut self) -> Result<StoryProgress> {
        let progress = self.inner.story_progress()?;
        self.save()?;
        Ok(progress)
    }

    fn can_play(&mut self) -> Result<PlayStatus> {
        let status = self.inner.can_play()?;
        self.save()?;
        Ok(status)
    }

    fn use_try(&mut self) -> Result<TryUsage> {
        let usage = self.inner.use_try()?;
        self.save()?;
        Ok(usage)
    }

    fn complete_level(&mut self, level: u32) -> Result<LevelCompletion> {
        let completion = self.inner.complete_level(level)?;
        self.save()?;
        Ok(completion)
    }

    fn submit_survival_score(&mut self, level: u32, score: RunScore) -> Result<SurvivalSubmission> {
        let submission = self.inner.submit_survival_score(level, score)?;
        self.save()?;
        Ok(submission)
    }

    fn personal_best(&self, level: u32) -> Result<u64> {
        self.inner.personal_best(level)
    }

    fn global_personal_best(&self) -> Result<u64> {
        self.inner.global_personal_best()
    }

    fn all_personal_bests(&self, max_level: u32) -> Result<BTreeMap<u32, u64>> {
        self.inner.all_personal_bests(max_level)
    }

    fn leaderboard(&self, board: Board, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        self.inner.leaderboard(board, limit)
    }

    fn rank(&self, board: Board) -> Result<Option<u32>> {
        self.inner.rank(board)
    }
}
