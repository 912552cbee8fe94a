use std::f64::consts::PI;
use std::sync::Arc;

use rand::Rng;
use rand::rngs::ThreadRng;
use tracing::{debug, info};

use super::{
    config::{
        CHAOS_INTERVAL, CHAOS_SPEED_RANGE, GameMode, INVISIBLE_CYCLE, INVISIBLE_HIDDEN,
        ConfigError, LevelConfig, MAX_SNAKE_SPEED, MIN_SNAKE_SPEED, Modifier, PLAYER_FOOD_UNLOCK,
        POWER_FOOD_DURATION, PROJECTILE_CHARGE_TIME, PROJECTILE_SPEED, PROJECTILE_SPREAD_DEGREES,
        SHRINK_RATE_PER_MINUTE, SURVIVAL_BOOST_AFTER, Tuning,
    },
    geometry::{
        Cell, FRUIT_RADIUS_RATIO, PROJECTILE_RADIUS_RATIO, Point, TITAN_COLLISION_SCALE,
        cells_collide, circles_collide,
    },
    pursuit,
    state::{LossCause, PowerFood, Projectile, RunOutcome, RunState, RunStatus},
};

/// What happened during a tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickInfo {
    /// Snake head stepped this tick
    pub snake_moved: bool,
    /// Snake swallowed the power-food
    pub snake_ate_food: bool,
    /// Player swallowed the power-food
    pub player_ate_food: bool,
    pub power_food_spawned: bool,
    pub power_food_expired: bool,
    /// Number of projectiles launched this tick
    pub shots_fired: usize,
    /// Set on the tick that ends the run
    pub outcome: Option<RunOutcome>,
}

/// Result of a game tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickResult {
    /// Whether the run is over (now or already before this tick)
    pub terminated: bool,
    pub info: TickInfo,
}

/// Penalties the snake suffers when the player eats power-food
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoodPenalty {
    /// Every Nth food shrinks the snake
    pub shrink_every: u32,
    pub shrink_amount: usize,
    /// Every Mth food slows the snake
    pub slow_every: u32,
    pub slow_amount: u64,
}

impl FoodPenalty {
    pub const NORMAL: FoodPenalty = FoodPenalty {
        shrink_every: 2,
        shrink_amount: 1,
        slow_every: 4,
        slow_amount: 2,
    };

    pub const BOOSTED: FoodPenalty = FoodPenalty {
        shrink_every: 1,
        shrink_amount: 2,
        slow_every: 2,
        slow_amount: 5,
    };

    /// Survival runs past the boost threshold punish the snake harder
    pub fn for_run(mode: GameMode, elapsed: u64) -> FoodPenalty {
        if mode == GameMode::Survival && elapsed >= SURVIVAL_BOOST_AFTER {
            FoodPenalty::BOOSTED
        } else {
            FoodPenalty::NORMAL
        }
    }
}

/// Advances a [`RunState`] one tick at a time
pub struct GameEngine<R: Rng = ThreadRng> {
    tuning: Tuning,
    rng: R,
}

impl GameEngine<ThreadRng> {
    /// Engine with default tuning and an unseeded generator
    pub fn new() -> Self {
        Self {
            tuning: Tuning::default(),
            rng: rand::thread_rng(),
        }
    }
}

impl Default for GameEngine<ThreadRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> GameEngine<R> {
    /// Engine drawing from `rng`; fails when `tuning` does not validate
    pub fn with_rng(tuning: Tuning, rng: R) -> Result<Self, ConfigError> {
        tuning.validate()?;
        Ok(Self { tuning, rng })
    }

    /// Fresh run of `level` starting at `now`
    pub fn reset(&mut self, level: Arc<LevelConfig>, mode: GameMode, now: u64) -> RunState {
        RunState::new(level, mode, now)
    }

    /// Execute one tick at host time `now` (ms).
    ///
    /// Each periodic event fires when its interval has elapsed since it last
    /// fired. Ticks on an ended run change nothing.
    pub fn tick(&mut self, state: &mut RunState, now: u64) -> TickResult {
        if !state.is_running() {
            return TickResult {
                terminated: true,
                info: TickInfo::default(),
            };
        }

        let level = Arc::clone(&state.level);
        let elapsed = now.saturating_sub(state.start_time);
        state.elapsed = elapsed;
        let mut info = TickInfo::default();

        if state.mode == GameMode::Story && elapsed >= level.survival_time {
            return self.finish(state, RunOutcome::Won, info);
        }

        self.apply_modifier(state, &level, now, elapsed);
        self.ramp_speed(state, &level, now);

        if since(now, state.clock.last_grow) >= level.grow_interval {
            state.snake.grow(level.grow_amount, level.max_snake_length);
            state.clock.last_grow = now;
        }

        self.spawn_power_food(state, &level, now, &mut info);
        expire_power_food(state, now, &mut info);

        self.fire_projectiles(state, &level, now, &mut info);
        for shot in &mut state.projectiles {
            shot.advance();
        }
        let grid = level.grid_size;
        state.projectiles.retain(|shot| shot.is_within(grid));

        self.move_snake(state, &level, now, &mut info);
        player_eats_food(state, now, elapsed, &mut info);

        match detect_loss(state) {
            Some(cause) => self.finish(state, RunOutcome::Lost(cause), info),
            None => TickResult {
                terminated: false,
                info,
            },
        }
    }

    fn finish(&mut self, state: &mut RunState, outcome: RunOutcome, mut info: TickInfo) -> TickResult {
        state.status = RunStatus::Ended(outcome);
        state.charging = false;
        info.outcome = Some(outcome);

        info!(
            level = state.level.id,
            mode = ?state.mode,
            ?outcome,
            elapsed_ms = state.elapsed,
            snake_length = state.snake.len(),
            "run ended"
        );

        TickResult {
            terminated: true,
            info,
        }
    }

    fn apply_modifier(&mut self, state: &mut RunState, level: &LevelConfig, now: u64, elapsed: u64) {
        match level.modifier {
            Modifier::Invisible => {
                state.visible = elapsed % INVISIBLE_CYCLE >= INVISIBLE_HIDDEN;
            }
            Modifier::Chaos => {
                if since(now, state.clock.last_chaos) >= CHAOS_INTERVAL {
                    let (lo, hi) = CHAOS_SPEED_RANGE;
                    state.speed = self.rng.gen_range(lo..=hi);
                    state.clock.last_chaos = now;
                    debug!(speed = state.speed, "chaos speed re-rolled");
                }
            }
            Modifier::ShrinkingArena => {
                state.arena.shrink_for(elapsed, SHRINK_RATE_PER_MINUTE);
            }
            Modifier::Titan | Modifier::PerfectAi | Modifier::None => {}
        }
    }

    fn ramp_speed(&mut self, state: &mut RunState, level: &LevelConfig, now: u64) {
        if since(now, state.clock.last_speed) < level.speed_increase_interval {
            return;
        }

        let floor = level.speed_floor();
        if state.speed > floor {
            state.speed = state
                .speed
                .saturating_sub(level.speed_increase_amount)
                .max(floor);
        }
        state.clock.last_speed = now;
    }

    fn spawn_power_food(
        &mut self,
        state: &mut RunState,
        level: &LevelConfig,
        now: u64,
        info: &mut TickInfo,
    ) {
        let Some(config) = &level.power_food else {
            return;
        };
        if state.power_food.is_some()
            || since(now, state.clock.last_power_food) < config.spawn_interval
        {
            return;
        }

        let cell = self.find_power_food_cell(state);
        state.power_food = Some(PowerFood {
            cell,
            spawn_time: now,
        });
        info.power_food_spawned = true;
        debug!(x = cell.x, y = cell.y, "power-food spawned");
    }

    /// Random free cell in the live arena, away from the snake and the fruit
    fn find_power_food_cell(&mut self, state: &RunState) -> Cell {
        let (lo, hi) = state.arena.cell_bounds();
        let fruit_cell = state.fruit.nearest_cell();

        if lo < hi {
            for _ in 0..self.tuning.power_food_attempts {
                let cell = Cell::new(self.rng.gen_range(lo..hi), self.rng.gen_range(lo..hi));
                if state.snake.occupies(cell)
                    || cell.chebyshev(fruit_cell) < self.tuning.power_food_min_fruit_distance
                {
                    continue;
                }
                return cell;
            }
        }

        let (fx, fy) = self.tuning.power_food_fallback;
        let max = (hi - 1).max(lo);
        debug!("power-food placement fell back to fixed cell");
        Cell::new((lo + fx).clamp(lo, max), (lo + fy).clamp(lo, max))
    }

    fn fire_projectiles(
        &mut self,
        state: &mut RunState,
        level: &LevelConfig,
        now: u64,
        info: &mut TickInfo,
    ) {
        let Some(config) = &level.projectiles else {
            return;
        };

        match state.clock.charge_started {
            None => {
                if since(now, state.clock.last_shot) >= config.fire_interval {
                    state.clock.charge_started = Some(now);
                    state.charging = true;
                }
            }
            Some(started) => {
                if since(now, started) >= PROJECTILE_CHARGE_TIME {
                    let shots = volley(
                        state.snake.head().center(),
                        state.fruit.center(),
                        config.count,
                    );
                    info.shots_fired = shots.len();
                    state.projectiles.extend(shots);
                    state.clock.charge_started = None;
                    state.charging = false;
                    state.clock.last_shot = now;
                }
            }
        }
    }

    fn move_snake(&mut self, state: &mut RunState, level: &LevelConfig, now: u64, info: &mut TickInfo) {
        if since(now, state.clock.last_move) < state.speed {
            return;
        }

        let new_head = pursuit::next_move(
            state.snake.head(),
            state.pursuit_target(),
            &state.arena,
            level.modifier == Modifier::PerfectAi,
            self.tuning.suboptimal_move_chance,
            &mut self.rng,
        );
        state.snake.advance(new_head);
        state.clock.last_move = now;
        info.snake_moved = true;

        if !state.power_food.is_some_and(|food| food.cell == new_head) {
            return;
        }

        if let Some(config) = &level.power_food {
            state.speed = state
                .speed
                .saturating_sub(config.speed_boost)
                .max(MIN_SNAKE_SPEED);
            state
                .snake
                .grow(config.grow_boost, level.max_snake_length);
        }
        state.power_food = None;
        state.clock.last_power_food = now;
        info.snake_ate_food = true;
        debug!(speed = state.speed, length = state.snake.len(), "snake ate power-food");
    }
}

fn since(now: u64, then: u64) -> u64 {
    now.saturating_sub(then)
}

fn expire_power_food(state: &mut RunState, now: u64, info: &mut TickInfo) {
    if let Some(food) = state.power_food {
        if since(now, food.spawn_time) >= POWER_FOOD_DURATION {
            state.power_food = None;
            state.clock.last_power_food = now;
            info.power_food_expired = true;
        }
    }
}

fn player_eats_food(state: &mut RunState, now: u64, elapsed: u64, info: &mut TickInfo) {
    if elapsed < PLAYER_FOOD_UNLOCK {
        return;
    }
    let Some(food) = state.power_food else {
        return;
    };
    if !cells_collide(state.fruit, food.cell.as_point(), state.cell_size, 1.0) {
        return;
    }

    state.foods_eaten += 1;
    state.power_food = None;
    state.clock.last_power_food = now;
    info.player_ate_food = true;

    let penalty = FoodPenalty::for_run(state.mode, elapsed);
    if state.foods_eaten % penalty.shrink_every == 0 {
        state.snake.shrink(penalty.shrink_amount);
    }
    // Slowing only applies while the snake is faster than the cap
    if state.foods_eaten % penalty.slow_every == 0 && state.speed < MAX_SNAKE_SPEED {
        state.speed = (state.speed + penalty.slow_amount).min(MAX_SNAKE_SPEED);
    }
    debug!(
        foods = state.foods_eaten,
        speed = state.speed,
        length = state.snake.len(),
        "player ate power-food"
    );
}

/// First loss condition that holds, checked body, then projectiles, then arena
fn detect_loss(state: &RunState) -> Option<LossCause> {
    let scale = if state.level.modifier == Modifier::Titan {
        TITAN_COLLISION_SCALE
    } else {
        1.0
    };

    let caught = state
        .snake
        .body
        .iter()
        .any(|segment| cells_collide(state.fruit, segment.as_point(), state.cell_size, scale));
    if caught {
        return Some(LossCause::Caught);
    }

    let fruit_center = state.fruit.center();
    let shot = state.projectiles.iter().any(|shot| {
        circles_collide(
            shot.position,
            PROJECTILE_RADIUS_RATIO,
            fruit_center,
            FRUIT_RADIUS_RATIO,
            state.cell_size,
        )
    });
    if shot {
        return Some(LossCause::Shot);
    }

    if !state.arena.contains_point(state.fruit) {
        return Some(LossCause::OutOfArena);
    }

    None
}

/// Projectiles fired from `origin` toward `aim`.
///
/// One shot flies straight at the target. Larger volleys fan out
/// symmetrically around that bearing, neighbours 15 degrees apart.
pub fn volley(origin: Point, aim: Point, count: u32) -> Vec<Projectile> {
    let bearing = (aim.y - origin.y).atan2(aim.x - origin.x);
    let step = PROJECTILE_SPREAD_DEGREES * PI / 180.0;
    let middle = (count.max(1) - 1) as f64 / 2.0;

    (0..count)
        .map(|i| {
            let angle = bearing + (i as f64 - middle) * step;
            Projectile {
                position: origin,
                velocity: Point::new(angle.cos() * PROJECTILE_SPEED, angle.sin() * PROJECTILE_SPEED),
            }
        })
        .collect()
}
