use std::collections::HashSet;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier as TextModifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::game::{
    Cell, GameMode, LossCause, Modifier, Point, RunOutcome, RunReport, Snapshot,
};
use crate::metrics::{GameMetrics, game_metrics::format_ms};

/// Terminal columns per grid cell
pub const CELL_WIDTH: u16 = 2;

/// Where the board landed on screen in the last frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    /// Terminal position of cell (0, 0)
    pub origin_x: u16,
    pub origin_y: u16,
    pub grid_size: u32,
}

impl GridLayout {
    /// Map a terminal position to grid units; `None` off the board
    pub fn to_grid(&self, column: u16, row: u16) -> Option<Point> {
        let width = self.grid_size as u16 * CELL_WIDTH;
        let height = self.grid_size as u16;
        if column < self.origin_x
            || row < self.origin_y
            || column >= self.origin_x + width
            || row >= self.origin_y + height
        {
            return None;
        }

        Some(Point::new(
            (column - self.origin_x) as f64 / CELL_WIDTH as f64,
            (row - self.origin_y) as f64,
        ))
    }

    /// Size of one cell in terminal columns
    pub fn cell_size(&self) -> f64 {
        CELL_WIDTH as f64
    }

    /// Board width in terminal columns
    pub fn canvas_size(&self) -> f64 {
        self.grid_size as f64 * self.cell_size()
    }
}

/// What to draw this frame
pub struct Screen<'a> {
    pub snapshot: Option<Snapshot<'a>>,
    /// Set once the run has ended
    pub report: Option<&'a RunReport>,
    /// Shown when there is no run, e.g. why it could not start
    pub notice: Option<&'a str>,
}

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Self
    }

    /// Draw one frame; returns the board placement when a board was drawn
    pub fn render(
        &self,
        frame: &mut Frame,
        screen: &Screen<'_>,
        metrics: &GameMetrics,
    ) -> Option<GridLayout> {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Game area
                Constraint::Length(3), // Footer
            ])
            .split(frame.area());

        if let Some(snapshot) = &screen.snapshot {
            frame.render_widget(self.render_stats(snapshot), chunks[0]);
        }

        let mut layout = None;
        match (screen.report, &screen.snapshot) {
            (Some(report), _) => {
                let area = centered(chunks[1], 50, 12);
                frame.render_widget(self.render_run_over(report), area);
            }
            (None, Some(snapshot)) => {
                let grid = snapshot.level.grid_size;
                let width = grid as u16 * CELL_WIDTH + 2;
                let height = grid as u16 + 2;
                let area = centered(chunks[1], width, height);
                frame.render_widget(self.render_grid(snapshot), area);
                layout = Some(GridLayout {
                    origin_x: area.x + 1,
                    origin_y: area.y + 1,
                    grid_size: grid,
                });
            }
            (None, None) => {
                let area = centered(chunks[1], 50, 7);
                frame.render_widget(self.render_notice(screen.notice), area);
            }
        }

        frame.render_widget(self.render_controls(metrics), chunks[2]);
        layout
    }

    fn render_grid(&self, snapshot: &Snapshot<'_>) -> Paragraph<'_> {
        let grid = snapshot.level.grid_size as i32;
        let head = snapshot.snake.first().copied();
        let body: HashSet<Cell> = snapshot.snake.iter().skip(1).copied().collect();
        let shots: HashSet<Cell> = snapshot
            .projectiles
            .iter()
            .map(|p| Cell::new(p.position.x.floor() as i32, p.position.y.floor() as i32))
            .collect();
        let fruit = snapshot.fruit.nearest_cell();
        let power_food = snapshot.power_food.map(|food| food.cell);
        let titan = snapshot.level.modifier == Modifier::Titan;

        let mut lines = Vec::with_capacity(grid as usize);
        for y in 0..grid {
            let mut spans = Vec::with_capacity(grid as usize);

            for x in 0..grid {
                let cell = Cell::new(x, y);

                let span = if cell == fruit {
                    Span::styled(
                        "● ",
                        Style::default()
                            .fg(Color::Red)
                            .add_modifier(TextModifier::BOLD),
                    )
                } else if snapshot.visible && Some(cell) == head {
                    let color = if snapshot.charging {
                        Color::LightMagenta
                    } else {
                        Color::Cyan
                    };
                    Span::styled(
                        "■ ",
                        Style::default().fg(color).add_modifier(TextModifier::BOLD),
                    )
                } else if snapshot.visible && body.contains(&cell) {
                    let glyph = if titan { "█ " } else { "□ " };
                    Span::styled(glyph, Style::default().fg(Color::Green))
                } else if shots.contains(&cell) {
                    Span::styled("• ", Style::default().fg(Color::LightRed))
                } else if Some(cell) == power_food {
                    Span::styled(
                        "✦ ",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(TextModifier::BOLD),
                    )
                } else if !snapshot.arena.contains_cell(cell) {
                    Span::styled("░░", Style::default().fg(Color::DarkGray))
                } else {
                    Span::styled(". ", Style::default().fg(Color::DarkGray))
                };

                spans.push(span);
            }

            lines.push(Line::from(spans));
        }

        let title = format!(" {}. {} ", snapshot.level.id, snapshot.level.name);
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
    }

    fn render_stats(&self, snapshot: &Snapshot<'_>) -> Paragraph<'_> {
        let label = Style::default().fg(Color::Yellow);
        let value = Style::default().fg(Color::White);

        let mode = match snapshot.mode {
            GameMode::Story => "Story",
            GameMode::Survival => "Survival",
        };
        let time = match snapshot.mode {
            GameMode::Story => format!(
                "{} / {}",
                format_ms(snapshot.elapsed),
                format_ms(snapshot.level.survival_time)
            ),
            GameMode::Survival => format_ms(snapshot.elapsed),
        };

        let mut spans = vec![
            Span::styled(
                mode,
                Style::default()
                    .fg(Color::White)
                    .add_modifier(TextModifier::BOLD),
            ),
            Span::raw("    "),
            Span::styled("Time: ", label),
            Span::styled(time, value),
            Span::raw("    "),
            Span::styled("Length: ", label),
            Span::styled(snapshot.snake.len().to_string(), value),
            Span::raw("    "),
            Span::styled("Speed: ", label),
            Span::styled(format!("{}ms", snapshot.speed), value),
            Span::raw("    "),
            Span::styled("Food: ", label),
            Span::styled(snapshot.foods_eaten.to_string(), value),
        ];

        let modifier = snapshot.level.modifier.label();
        if !modifier.is_empty() {
            spans.push(Span::raw("    "));
            spans.push(Span::styled(
                modifier,
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(TextModifier::BOLD),
            ));
        }

        Paragraph::new(vec![Line::from(spans)]).alignment(Alignment::Center)
    }

    fn render_run_over(&self, report: &RunReport) -> Paragraph<'_> {
        let (headline, color) = match report.outcome {
            RunOutcome::Won => ("LEVEL COMPLETE", Color::Green),
            RunOutcome::Lost(LossCause::Caught) => ("CAUGHT", Color::Red),
            RunOutcome::Lost(LossCause::Shot) => ("SHOT DOWN", Color::Red),
            RunOutcome::Lost(LossCause::OutOfArena) => ("OUT OF BOUNDS", Color::Red),
        };
        let label = Style::default().fg(Color::Yellow);
        let value = Style::default()
            .fg(Color::White)
            .add_modifier(TextModifier::BOLD);

        let mut text = vec![
            Line::from(""),
            Line::from(vec![Span::styled(
                headline,
                Style::default().fg(color).add_modifier(TextModifier::BOLD),
            )]),
            Line::from(""),
            Line::from(vec![
                Span::styled("Survived: ", label),
                Span::styled(format_ms(report.elapsed_ms), value),
                Span::raw("    "),
                Span::styled("Snake length: ", label),
                Span::styled(report.snake_length.to_string(), value),
            ]),
        ];

        if let Some(survival) = report.survival {
            let mut spans = vec![
                Span::styled("Best: ", label),
                Span::styled(format_ms(survival.personal_best), value),
            ];
            if let Some(rank) = survival.rank {
                spans.push(Span::raw("    "));
                spans.push(Span::styled("Rank: ", label));
                spans.push(Span::styled(format!("#{rank}"), value));
            }
            text.push(Line::from(spans));

            let mut spans = vec![
                Span::styled("All levels: ", label),
                Span::styled(format_ms(survival.global_best), value),
            ];
            if let Some(rank) = survival.global_rank {
                spans.push(Span::raw("    "));
                spans.push(Span::styled("Global rank: ", label));
                spans.push(Span::styled(format!("#{rank}"), value));
            }
            text.push(Line::from(spans));
            if survival.is_personal_best {
                text.push(Line::from(Span::styled(
                    "New personal best!",
                    Style::default().fg(Color::Green),
                )));
            }
        }

        if let Some(completion) = report.completion {
            let line = if completion.is_completed {
                "Campaign complete!".to_string()
            } else {
                format!("Next up: level {}", completion.new_level)
            };
            text.push(Line::from(Span::styled(line, Style::default().fg(Color::Green))));
        }

        text.push(Line::from(""));
        text.push(Line::from(vec![
            Span::styled("Press ", Style::default().fg(Color::Gray)),
            Span::styled(
                "R",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(TextModifier::BOLD),
            ),
            Span::styled(" to play again or ", Style::default().fg(Color::Gray)),
            Span::styled(
                "Q",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(TextModifier::BOLD),
            ),
            Span::styled(" to quit", Style::default().fg(Color::Gray)),
        ]));

        Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
    }

    fn render_notice<'a>(&self, notice: Option<&'a str>) -> Paragraph<'a> {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                notice.unwrap_or("No run in progress"),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(TextModifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "R to retry, Q to quit",
                Style::default().fg(Color::Gray),
            )),
        ];

        Paragraph::new(text).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        )
    }

    fn render_controls(&self, metrics: &GameMetrics) -> Paragraph<'_> {
        let text = vec![
            Line::from(vec![
                Span::styled("Mouse", Style::default().fg(Color::Cyan)),
                Span::raw(", "),
                Span::styled("↑↓←→", Style::default().fg(Color::Cyan)),
                Span::raw(" or "),
                Span::styled("WASD", Style::default().fg(Color::Cyan)),
                Span::raw(" to steer the fruit | "),
                Span::styled("Q", Style::default().fg(Color::Red)),
                Span::raw(" to quit"),
            ]),
            Line::from(Span::styled(
                format!(
                    "Runs: {}  Wins: {}  Longest: {}",
                    metrics.runs_played,
                    metrics.wins,
                    format_ms(metrics.best_run_ms)
                ),
                Style::default().fg(Color::DarkGray),
            )),
        ];

        Paragraph::new(text).alignment(Alignment::Center)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

/// A `width` x `height` rect centred in `area`, clipped to it
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{LevelConfig, RunState};
    use crate::persistence::SurvivalSubmission;
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_layout_bounds() {
        let layout = GridLayout {
            origin_x: 0,
            origin_y: 0,
            grid_size: 10,
        };
        assert_eq!(layout.to_grid(19, 9), Some(Point::new(9.5, 9.0)));
        assert_eq!(layout.to_grid(20, 0), None);
        assert_eq!(layout.canvas_size(), 20.0);
    }

    #[test]
    fn test_centered_clips_to_area() {
        let area = Rect::new(0, 3, 40, 10);
        assert_eq!(centered(area, 20, 4), Rect::new(10, 6, 20, 4));
        assert_eq!(centered(area, 60, 20), area);
    }

    #[test]
    fn test_board_frame_reports_layout() {
        let run = RunState::new(Arc::new(LevelConfig::basic(1, 10)), GameMode::Story, 0);
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let renderer = Renderer::new();
        let metrics = GameMetrics::new();

        let mut layout = None;
        terminal
            .draw(|frame| {
                let screen = Screen {
                    snapshot: Some(run.snapshot()),
                    report: None,
                    notice: None,
                };
                layout = renderer.render(frame, &screen, &metrics);
            })
            .unwrap();

        let layout = layout.unwrap();
        assert_eq!(layout.grid_size, 10);
        // 22 columns wide board centred in 80
        assert_eq!(layout.origin_x, 30);

        let text = buffer_text(&terminal);
        assert!(text.contains("1. Level 1"));
        assert!(text.contains("■"));
    }

    #[test]
    fn test_run_over_screen() {
        let report = RunReport {
            level: 3,
            mode: GameMode::Survival,
            outcome: RunOutcome::Lost(LossCause::Shot),
            elapsed_ms: 12_345,
            score_ms: 12_300,
            snake_length: 7,
            foods_eaten: 2,
            survival: None,
            completion: None,
        };
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let renderer = Renderer::new();
        let metrics = GameMetrics::new();

        let mut layout = None;
        terminal
            .draw(|frame| {
                let screen = Screen {
                    snapshot: None,
                    report: Some(&report),
                    notice: None,
                };
                layout = renderer.render(frame, &screen, &metrics);
            })
            .unwrap();

        assert!(layout.is_none());
        assert!(buffer_text(&terminal).contains("SHOT DOWN"));
    }

    #[test]
    fn test_run_over_screen_shows_store_reply() {
        let report = RunReport {
            level: 2,
            mode: GameMode::Survival,
            outcome: RunOutcome::Lost(LossCause::Caught),
            elapsed_ms: 8_000,
            score_ms: 8_000,
            snake_length: 6,
            foods_eaten: 1,
            survival: Some(SurvivalSubmission {
                is_personal_best: true,
                rank: Some(2),
                personal_best: 8_000,
                global_best: 15_000,
                global_rank: Some(4),
            }),
            completion: None,
        };
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        let renderer = Renderer::new();
        let metrics = GameMetrics::new();

        terminal
            .draw(|frame| {
                let screen = Screen {
                    snapshot: None,
                    report: Some(&report),
                    notice: None,
                };
                renderer.render(frame, &screen, &metrics);
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Rank: #2"));
        assert!(text.contains("Global rank: #4"));
        assert!(text.contains("New personal best!"));
    }
}
