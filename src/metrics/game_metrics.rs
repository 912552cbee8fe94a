use std::time::{Duration, Instant};

use crate::game::{RunOutcome, RunReport};

/// Per-session statistics shown alongside the board
pub struct GameMetrics {
    pub start_time: Instant,
    pub elapsed_time: Duration,
    pub runs_played: u32,
    pub wins: u32,
    /// Longest run this session, in ms
    pub best_run_ms: u64,
}

impl GameMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            elapsed_time: Duration::ZERO,
            runs_played: 0,
            wins: 0,
            best_run_ms: 0,
        }
    }

    pub fn update(&mut self) {
        self.elapsed_time = self.start_time.elapsed();
    }

    pub fn on_run_start(&mut self) {
        self.start_time = Instant::now();
        self.elapsed_time = Duration::ZERO;
    }

    pub fn on_run_end(&mut self, report: &RunReport) {
        self.runs_played += 1;
        if report.outcome == RunOutcome::Won {
            self.wins += 1;
        }
        self.best_run_ms = self.best_run_ms.max(report.elapsed_ms);
    }

    pub fn format_time(&self) -> String {
        format_ms(self.elapsed_time.as_millis() as u64)
    }
}

impl Default for GameMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// `mm:ss.t` for a duration in ms
pub fn format_ms(ms: u64) -> String {
    let total_secs = ms / 1_000;
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    let tenths = (ms % 1_000) / 100;
    format!("{:02}:{:02}.{}", minutes, seconds, tenths)
}
