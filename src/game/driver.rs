//! Run lifecycle: `Idle -> Playing -> Ended`
//!
//! The host calls [`GameDriver::tick`] once per frame with its clock. The
//! driver forwards to the engine while a run is playing and, on the tick that
//! ends it, hands the result to the persistence store exactly once. That
//! write happens off the tick; [`GameDriver::poll_store`] folds the store's
//! answer into the last report when it arrives. Store failures are logged and
//! never change the local outcome.

use rand::Rng;
use rand::rngs::ThreadRng;
use thiserror::Error;
use tracing::{info, warn};

use super::config::GameMode;
use super::engine::GameEngine;
use super::geometry::Point;
use super::levels::LevelCatalog;
use super::state::{RunOutcome, RunState, Snapshot};
use crate::persistence::{
    LevelCompletion, Persistence, RunScore, StoreReply, StoreWorker, Submission, SubmissionReply,
    SurvivalSubmission,
};
use std::sync::MutexGuard;

/// Where the driver is in the run lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing,
    Ended,
}

/// Reasons a run cannot start
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriverError {
    #[error("level {0} does not exist")]
    UnknownLevel(u32),

    #[error("no lives left today")]
    NoTriesRemaining,

    #[error("level {level} is locked; story progress has reached level {unlocked}")]
    LevelLocked { level: u32, unlocked: u32 },
}

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub level: u32,
    pub mode: GameMode,
    pub outcome: RunOutcome,
    pub elapsed_ms: u64,
    /// Elapsed time floored to 100 ms, the survival leaderboard score
    pub score_ms: u64,
    pub snake_length: usize,
    pub foods_eaten: u32,
    /// Store reply for survival runs, once it has arrived
    pub survival: Option<SurvivalSubmission>,
    /// Store reply for won story runs, once it has arrived
    pub completion: Option<LevelCompletion>,
}

impl RunReport {
    /// The store write this run owes, if any
    pub fn submission(&self) -> Option<Submission> {
        match (self.mode, self.outcome) {
            (GameMode::Survival, _) => Some(Submission::Survival {
                level: self.level,
                score: RunScore {
                    score_ms: self.score_ms,
                    snake_length: self.snake_length,
                    foods_eaten: self.foods_eaten,
                },
            }),
            (GameMode::Story, RunOutcome::Won) => Some(Submission::Completion { level: self.level }),
            (GameMode::Story, RunOutcome::Lost(_)) => None,
        }
    }
}

pub struct GameDriver<P: Persistence, R: Rng = ThreadRng> {
    engine: GameEngine<R>,
    catalog: LevelCatalog,
    store: StoreWorker<P>,
    /// Bumped on every start; tags store replies with their run
    run_id: u64,
    phase: Phase,
    run: Option<RunState>,
    cell_size: f64,
    canvas_size: f64,
    last_report: Option<RunReport>,
}

impl<P: Persistence + Send + 'static> GameDriver<P, ThreadRng> {
    pub fn new(catalog: LevelCatalog, persistence: P) -> Self {
        Self::with_engine(GameEngine::new(), catalog, persistence)
    }
}

impl<P: Persistence + Send + 'static, R: Rng> GameDriver<P, R> {
    pub fn with_engine(engine: GameEngine<R>, catalog: LevelCatalog, persistence: P) -> Self {
        Self {
            engine,
            catalog,
            store: StoreWorker::new(persistence),
            run_id: 0,
            phase: Phase::Idle,
            run: None,
            cell_size: 1.0,
            canvas_size: 0.0,
            last_report: None,
        }
    }

    /// Begin a fresh run of `level_id` at host time `now`.
    ///
    /// Story runs spend one life up front, whatever the outcome. Survival runs
    /// are limited to levels the player has reached in the story.
    pub fn start(&mut self, level_id: u32, mode: GameMode, now: u64) -> Result<(), DriverError> {
        let level = self
            .catalog
            .get(level_id)
            .ok_or(DriverError::UnknownLevel(level_id))?;

        match mode {
            GameMode::Story => self.claim_life()?,
            GameMode::Survival => self.check_unlocked(level_id)?,
        }

        let mut run = self.engine.reset(level, mode, now);
        run.cell_size = self.cell_size;
        self.run = Some(run);
        self.run_id += 1;
        self.phase = Phase::Playing;
        self.last_report = None;

        info!(level = level_id, ?mode, "run started");
        Ok(())
    }

    fn claim_life(&mut self) -> Result<(), DriverError> {
        let mut store = self.store.store();
        match store.can_play() {
            Ok(status) if !status.can_play => return Err(DriverError::NoTriesRemaining),
            Ok(_) => {}
            Err(err) => warn!(error = %err, "could not check remaining lives"),
        }

        match store.use_try() {
            Ok(usage) if !usage.success => Err(DriverError::NoTriesRemaining),
            Ok(usage) => {
                info!(tries_remaining = usage.tries_remaining, "life used");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "could not record life usage");
                Ok(())
            }
        }
    }

    fn check_unlocked(&mut self, level_id: u32) -> Result<(), DriverError> {
        match self.store.store().story_progress() {
            Ok(progress) if level_id > progress.current_level => Err(DriverError::LevelLocked {
                level: level_id,
                unlocked: progress.current_level,
            }),
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(error = %err, "could not check unlocked levels");
                Ok(())
            }
        }
    }

    /// Latest pointer position in grid units; later calls replace earlier ones
    pub fn set_target(&mut self, target: Point) {
        if self.phase != Phase::Playing {
            return;
        }
        if let Some(run) = self.run.as_mut() {
            run.set_fruit(target);
        }
    }

    /// Pixel geometry from the renderer
    pub fn set_geometry(&mut self, cell_size: f64, canvas_size: f64) {
        self.cell_size = cell_size;
        self.canvas_size = canvas_size;
        if let Some(run) = self.run.as_mut() {
            run.cell_size = cell_size;
        }
    }

    pub fn canvas_size(&self) -> f64 {
        self.canvas_size
    }

    /// Advance the current run. Returns the report on the tick that ends it.
    pub fn tick(&mut self, now: u64) -> Option<RunReport> {
        if self.phase != Phase::Playing {
            return None;
        }
        let run = self.run.as_mut()?;
        let outcome = self.engine.tick(run, now).info.outcome?;
        let report = RunReport {
            level: run.level.id,
            mode: run.mode,
            outcome,
            elapsed_ms: run.elapsed,
            score_ms: run.elapsed / 100 * 100,
            snake_length: run.snake.len(),
            foods_eaten: run.foods_eaten,
            survival: None,
            completion: None,
        };

        self.phase = Phase::Ended;
        if let Some(submission) = report.submission() {
            self.store.submit(self.run_id, submission);
        }
        self.last_report = Some(report.clone());
        Some(report)
    }

    /// Fold any store replies that have arrived into the last report.
    ///
    /// Returns the updated report when something changed.
    pub fn poll_store(&mut self) -> Option<&RunReport> {
        let mut updated = false;
        while let Some(reply) = self.store.try_reply() {
            updated |= self.apply_reply(reply);
        }
        if updated { self.last_report.as_ref() } else { None }
    }

    /// Wait until every submission has been answered
    pub async fn settle(&mut self) {
        while let Some(reply) = self.store.next_reply().await {
            self.apply_reply(reply);
        }
    }

    fn apply_reply(&mut self, reply: StoreReply) -> bool {
        // Replies for an earlier run have nowhere to go
        if reply.ticket != self.run_id {
            return false;
        }
        let Some(report) = self.last_report.as_mut() else {
            return false;
        };
        match reply.reply {
            Some(SubmissionReply::Survival(submission)) => report.survival = Some(submission),
            Some(SubmissionReply::Completion(completion)) => report.completion = Some(completion),
            None => return false,
        }
        true
    }

    /// Abandon the current run; pending ticks become no-ops
    pub fn stop(&mut self) {
        if self.phase == Phase::Playing {
            info!("run stopped");
        }
        self.phase = Phase::Idle;
        self.run = None;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn snapshot(&self) -> Option<Snapshot<'_>> {
        self.run.as_ref().map(RunState::snapshot)
    }

    pub fn run_state(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    pub fn catalog(&self) -> &LevelCatalog {
        &self.catalog
    }

    /// Direct store access for calls outside the tick path
    pub fn persistence(&self) -> MutexGuard<'_, P> {
        self.store.store()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::config::{LevelConfig, Tuning};
    use crate::game::state::LossCause;
    use crate::persistence::{
        Board, LeaderboardEntry, MemoryStore, PersistenceError, PlayStatus, StoryProgress,
        TryUsage,
    };
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;
    use std::time::{Duration, Instant};

    /// Store that is always down, counting how often it was asked
    #[derive(Default)]
    struct OfflineStore {
        calls: usize,
    }

    impl OfflineStore {
        fn down<T>(&mut self) -> crate::persistence::Result<T> {
            self.calls += 1;
            Err(PersistenceError::Unavailable("offline".to_string()))
        }
    }

    impl Persistence for OfflineStore {
        fn story_progress(&mut self) -> crate::persistence::Result<StoryProgress> {
            self.down()
        }
        fn can_play(&mut self) -> crate::persistence::Result<PlayStatus> {
            self.down()
        }
        fn use_try(&mut self) -> crate::persistence::Result<TryUsage> {
            self.down()
        }
        fn complete_level(&mut self, _level: u32) -> crate::persistence::Result<LevelCompletion> {
            self.down()
        }
        fn submit_survival_score(
            &mut self,
            _level: u32,
            _score: RunScore,
        ) -> crate::persistence::Result<SurvivalSubmission> {
            self.down()
        }
        fn personal_best(&self, _level: u32) -> crate::persistence::Result<u64> {
            Ok(0)
        }
        fn global_personal_best(&self) -> crate::persistence::Result<u64> {
            Ok(0)
        }
        fn all_personal_bests(
            &self,
            _max_level: u32,
        ) -> crate::persistence::Result<BTreeMap<u32, u64>> {
            Ok(BTreeMap::new())
        }
        fn leaderboard(
            &self,
            _board: Board,
            _limit: usize,
        ) -> crate::persistence::Result<Vec<LeaderboardEntry>> {
            Ok(Vec::new())
        }
        fn rank(&self, _board: Board) -> crate::persistence::Result<Option<u32>> {
            Ok(None)
        }
    }

    fn test_catalog() -> LevelCatalog {
        let mut short = LevelConfig::basic(1, 20);
        short.survival_time = 1_000;
        short.initial_speed = 100_000;
        short.min_speed = 50;
        short.grow_interval = u64::MAX;
        short.speed_increase_interval = u64::MAX;
        LevelCatalog::from_levels(vec![short, LevelConfig::basic(2, 20)]).unwrap()
    }

    /// Memory store that takes its time over survival scores
    struct SlowStore {
        inner: MemoryStore,
        delay: Duration,
    }

    impl Persistence for SlowStore {
        fn story_progress(&mut self) -> crate::persistence::Result<StoryProgress> {
            self.inner.story_progress()
        }
        fn can_play(&mut self) -> crate::persistence::Result<PlayStatus> {
            self.inner.can_play()
        }
        fn use_try(&mut self) -> crate::persistence::Result<TryUsage> {
            self.inner.use_try()
        }
        fn complete_level(&mut self, level: u32) -> crate::persistence::Result<LevelCompletion> {
            self.inner.complete_level(level)
        }
        fn submit_survival_score(
            &mut self,
            level: u32,
            score: RunScore,
        ) -> crate::persistence::Result<SurvivalSubmission> {
            std::thread::sleep(self.delay);
            self.inner.submit_survival_score(level, score)
        }
        fn personal_best(&self, level: u32) -> crate::persistence::Result<u64> {
            self.inner.personal_best(level)
        }
        fn global_personal_best(&self) -> crate::persistence::Result<u64> {
            self.inner.global_personal_best()
        }
        fn all_personal_bests(
            &self,
            max_level: u32,
        ) -> crate::persistence::Result<BTreeMap<u32, u64>> {
            self.inner.all_personal_bests(max_level)
        }
        fn leaderboard(
            &self,
            board: Board,
            limit: usize,
        ) -> crate::persistence::Result<Vec<LeaderboardEntry>> {
            self.inner.leaderboard(board, limit)
        }
        fn rank(&self, board: Board) -> crate::persistence::Result<Option<u32>> {
            self.inner.rank(board)
        }
    }

    fn driver<P: Persistence + Send + 'static>(store: P) -> GameDriver<P, StdRng> {
        let engine = GameEngine::with_rng(Tuning::default(), StdRng::seed_from_u64(1)).unwrap();
        GameDriver::with_engine(engine, test_catalog(), store)
    }

    #[test]
    fn test_idle_until_started() {
        let mut driver = driver(MemoryStore::new("alice"));
        assert_eq!(driver.phase(), Phase::Idle);
        assert!(driver.tick(100).is_none());
        assert!(driver.snapshot().is_none());
    }

    #[test]
    fn test_unknown_level() {
        let mut driver = driver(MemoryStore::new("alice"));
        assert_eq!(
            driver.start(99, GameMode::Story, 0),
            Err(DriverError::UnknownLevel(99))
        );
        assert_eq!(driver.phase(), Phase::Idle);
    }

    #[test]
    fn test_story_start_uses_a_life() {
        let mut driver = driver(MemoryStore::new("alice"));
        driver.start(1, GameMode::Story, 0).unwrap();
        assert_eq!(driver.phase(), Phase::Playing);
        let progress = driver.persistence().story_progress().unwrap();
        assert_eq!(progress.tries_remaining, 2);
    }

    #[test]
    fn test_story_refused_without_lives() {
        let mut store = MemoryStore::new("alice");
        for _ in 0..3 {
            store.use_try().unwrap();
        }
        let mut driver = driver(store);
        assert_eq!(
            driver.start(1, GameMode::Story, 0),
            Err(DriverError::NoTriesRemaining)
        );
        assert_eq!(driver.phase(), Phase::Idle);
    }

    #[test]
    fn test_survival_locked_levels() {
        let mut driver = driver(MemoryStore::new("alice"));
        assert_eq!(
            driver.start(2, GameMode::Survival, 0),
            Err(DriverError::LevelLocked {
                level: 2,
                unlocked: 1
            })
        );
        assert!(driver.start(1, GameMode::Survival, 0).is_ok());
    }

    #[test]
    fn test_story_win_completes_level_once() {
        let mut driver = driver(MemoryStore::new("alice"));
        driver.start(1, GameMode::Story, 0).unwrap();

        assert!(driver.tick(999).is_none());
        let report = driver.tick(1_000).unwrap();
        assert_eq!(report.outcome, RunOutcome::Won);
        assert_eq!(driver.phase(), Phase::Ended);
        let report = driver.poll_store().unwrap();
        assert_eq!(report.completion.unwrap().new_level, 2);

        // Ended is terminal for this run
        assert!(driver.tick(2_000).is_none());
        assert!(driver.poll_store().is_none());
        let progress = driver.persistence().story_progress().unwrap();
        assert_eq!(progress.current_level, 2);
    }

    #[test]
    fn test_survival_loss_submits_floored_score() {
        let mut driver = driver(MemoryStore::new("alice"));
        driver.start(1, GameMode::Survival, 10_000).unwrap();
        driver.tick(10_500);

        // Drop the fruit onto the snake
        driver.set_target(Point::new(1.0, 10.0));
        let report = driver.tick(22_345).unwrap();

        assert_eq!(report.outcome, RunOutcome::Lost(LossCause::Caught));
        assert_eq!(report.elapsed_ms, 12_345);
        assert_eq!(report.score_ms, 12_300);
        let submission = driver.poll_store().unwrap().survival.unwrap();
        assert!(submission.is_personal_best);
        assert_eq!(submission.rank, Some(1));
        assert_eq!(submission.global_best, 12_300);
        assert_eq!(driver.persistence().personal_best(1).unwrap(), 12_300);

        let top = driver.persistence().leaderboard(Board::Global, 1).unwrap();
        assert_eq!(top[0].snake_length, report.snake_length);
        assert_eq!(top[0].foods_eaten, report.foods_eaten);
    }

    #[tokio::test]
    async fn test_slow_store_does_not_stall_the_tick() {
        let store = SlowStore {
            inner: MemoryStore::new("alice"),
            delay: Duration::from_millis(300),
        };
        let mut driver = driver(store);
        driver.start(1, GameMode::Survival, 0).unwrap();
        driver.set_target(Point::new(1.0, 10.0));

        let began = Instant::now();
        let report = driver.tick(250).unwrap();
        assert!(began.elapsed() < Duration::from_millis(50));
        assert_eq!(report.score_ms, 200);
        assert!(report.survival.is_none());

        driver.settle().await;
        let survival = driver.last_report().unwrap().survival.unwrap();
        assert!(survival.is_personal_best);
        assert_eq!(survival.personal_best, 200);
    }

    #[test]
    fn test_reply_for_an_earlier_run_is_dropped() {
        let mut driver = driver(MemoryStore::new("alice"));
        driver.start(1, GameMode::Survival, 0).unwrap();
        driver.set_target(Point::new(1.0, 10.0));
        driver.tick(100).unwrap();

        // Restart before reading the reply
        driver.start(1, GameMode::Survival, 5_000).unwrap();
        assert!(driver.poll_store().is_none());
        assert!(driver.last_report().is_none());
        assert_eq!(driver.persistence().personal_best(1).unwrap(), 100);
    }

    #[test]
    fn test_store_failures_do_not_block_play() {
        let mut driver = driver(OfflineStore::default());
        driver.start(1, GameMode::Story, 0).unwrap();
        assert_eq!(driver.persistence().calls, 2);

        let report = driver.tick(1_000).unwrap();
        assert_eq!(report.outcome, RunOutcome::Won);
        assert!(driver.poll_store().is_none());
        assert!(driver.last_report().unwrap().completion.is_none());
        assert_eq!(driver.persistence().calls, 3);

        driver.tick(1_500);
        assert_eq!(driver.persistence().calls, 3);
    }

    #[test]
    fn test_stop_cancels_pending_ticks() {
        let mut driver = driver(MemoryStore::new("alice"));
        driver.start(1, GameMode::Survival, 0).unwrap();
        driver.stop();
        assert_eq!(driver.phase(), Phase::Idle);
        assert!(driver.tick(5_000).is_none());
        assert!(driver.last_report().is_none());
    }

    #[test]
    fn test_restart_builds_fresh_state() {
        let mut driver = driver(MemoryStore::new("alice"));
        driver.start(1, GameMode::Survival, 0).unwrap();
        driver.set_target(Point::new(1.0, 10.0));
        assert!(driver.tick(100).is_some());

        driver.start(1, GameMode::Survival, 5_000).unwrap();
        let state = driver.run_state().unwrap();
        assert!(state.is_running());
        assert_eq!(state.start_time, 5_000);
        assert!(driver.last_report().is_none());
    }

    #[test]
    fn test_geometry_reaches_run() {
        let mut driver = driver(MemoryStore::new("alice"));
        driver.set_geometry(24.0, 480.0);
        driver.start(1, GameMode::Survival, 0).unwrap();
        assert_eq!(driver.run_state().unwrap().cell_size, 24.0);
        driver.set_geometry(12.0, 240.0);
        assert_eq!(driver.run_state().unwrap().cell_size, 12.0);
        assert_eq!(driver.canvas_size(), 240.0);
    }
}
