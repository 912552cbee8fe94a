use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{Stderr, stderr};
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

use crate::game::{GameDriver, GameMode, LevelCatalog, Phase, Point, RunOutcome};
use crate::input::{InputHandler, KeyAction};
use crate::metrics::GameMetrics;
use crate::persistence::Persistence;
use crate::render::{GridLayout, Renderer, Screen};

/// Interactive play in the terminal: the player steers the fruit
pub struct PlayMode<P: Persistence + Send + 'static> {
    driver: GameDriver<P>,
    metrics: GameMetrics,
    renderer: Renderer,
    input_handler: InputHandler,
    level: u32,
    mode: GameMode,
    clock: Instant,
    layout: Option<GridLayout>,
    notice: Option<String>,
    should_quit: bool,
}

impl<P: Persistence + Send + 'static> PlayMode<P> {
    pub fn new(catalog: LevelCatalog, persistence: P, level: u32, mode: GameMode) -> Self {
        let mut play = Self {
            driver: GameDriver::new(catalog, persistence),
            metrics: GameMetrics::new(),
            renderer: Renderer::new(),
            input_handler: InputHandler::new(),
            level,
            mode,
            clock: Instant::now(),
            layout: None,
            notice: None,
            should_quit: false,
        };
        play.start_run();
        play
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen, EnableMouseCapture)
            .context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        // Run game loop with cleanup
        let result = self.run_game_loop(&mut terminal).await;

        // Cleanup terminal
        self.cleanup_terminal(&mut terminal)?;

        result
    }

    async fn run_game_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();

        // One engine tick per frame at ~60 FPS; the engine paces the snake itself
        let frame_interval = Duration::from_millis(16);
        let mut frame_timer = interval(frame_interval);

        loop {
            tokio::select! {
                // Handle terminal events
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        self.handle_event(event);
                    }
                }

                // Simulate and render
                _ = frame_timer.tick() => {
                    self.update_game();
                    self.metrics.update();
                    let screen = Screen {
                        snapshot: self.driver.snapshot(),
                        report: match self.driver.phase() {
                            Phase::Ended => self.driver.last_report(),
                            _ => None,
                        },
                        notice: self.notice.as_deref(),
                    };
                    let mut layout = None;
                    terminal.draw(|frame| {
                        layout = self.renderer.render(frame, &screen, &self.metrics);
                    }).context("Failed to draw frame")?;
                    self.set_layout(layout);
                }

                // Handle Ctrl+C
                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        // Let the last run's score reach the store before leaving
        self.driver.settle().await;
        self.driver.stop();
        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) => {
                // Only process key press events, not release
                if key.kind != KeyEventKind::Press {
                    return;
                }

                match self.input_handler.handle_key_event(key) {
                    KeyAction::Nudge { dx, dy } => self.nudge(dx, dy),
                    KeyAction::Restart => self.restart(),
                    KeyAction::Quit => self.should_quit = true,
                    KeyAction::None => {}
                }
            }
            Event::Mouse(mouse) => {
                let target = self
                    .layout
                    .and_then(|layout| self.input_handler.handle_mouse_event(mouse, &layout));
                if let Some(target) = target {
                    self.driver.set_target(target);
                }
            }
            _ => {}
        }
    }

    fn nudge(&mut self, dx: f64, dy: f64) {
        let Some(run) = self.driver.run_state() else {
            return;
        };
        let target = Point::new(run.fruit.x + dx, run.fruit.y + dy);
        self.driver.set_target(target);
    }

    fn update_game(&mut self) {
        if let Some(report) = self.driver.tick(self.now()) {
            self.metrics.on_run_end(&report);
        }
        self.driver.poll_store();
    }

    fn set_layout(&mut self, layout: Option<GridLayout>) {
        let Some(layout) = layout else {
            return;
        };
        if self.layout != Some(layout) {
            self.driver
                .set_geometry(layout.cell_size(), layout.canvas_size());
            self.layout = Some(layout);
        }
    }

    /// Replay the level, or move on to the next one after a story win
    fn restart(&mut self) {
        if self.driver.phase() == Phase::Playing {
            return;
        }
        if let Some(report) = self.driver.last_report() {
            if report.mode == GameMode::Story && report.outcome == RunOutcome::Won {
                let next = report
                    .completion
                    .map_or(report.level + 1, |c| c.new_level);
                // After the final level the campaign replays it
                if self.driver.catalog().get(next).is_some() {
                    self.level = next;
                }
            }
        }
        self.start_run();
    }

    fn start_run(&mut self) {
        let now = self.now();
        match self.driver.start(self.level, self.mode, now) {
            Ok(()) => {
                self.notice = None;
                self.metrics.on_run_start();
            }
            Err(err) => {
                warn!(error = %err, level = self.level, "run not started");
                self.notice = Some(err.to_string());
            }
        }
    }

    fn now(&self) -> u64 {
        self.clock.elapsed().as_millis() as u64
    }

    fn cleanup_terminal(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )
        .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        let lives_left = self
            .driver
            .persistence()
            .story_progress()
            .map(|progress| progress.tries_remaining)
            .ok();
        info!(
            runs = self.metrics.runs_played,
            wins = self.metrics.wins,
            ?lives_left,
            "session over"
        );
        Ok(())
    }
}
