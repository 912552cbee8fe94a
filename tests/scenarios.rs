//! End-to-end runs through the public API

use std::sync::Arc;

use fruit_run::game::geometry::{COLLISION_TOLERANCE, TITAN_COLLISION_SCALE, cells_collide};
use fruit_run::game::state::EventClock;
use fruit_run::game::{
    Cell, DriverError, GameDriver, GameEngine, GameMode, LevelCatalog, LevelConfig, LossCause,
    Modifier, Phase, Point, PowerFood, PowerFoodConfig, ProjectileConfig, RunOutcome, RunState,
    Tuning,
};
use fruit_run::persistence::{Board, JsonFileStore, MemoryStore, Persistence};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

fn seeded_engine(seed: u64) -> GameEngine<StdRng> {
    GameEngine::with_rng(Tuning::default(), StdRng::seed_from_u64(seed)).unwrap()
}

fn driver<P: Persistence + Send + 'static>(levels: Vec<LevelConfig>, store: P) -> GameDriver<P, StdRng> {
    let catalog = LevelCatalog::from_levels(levels).unwrap();
    GameDriver::with_engine(seeded_engine(7), catalog, store)
}

/// Level with nothing periodic firing for a long while
fn calm_level(id: u32) -> LevelConfig {
    let mut level = LevelConfig::basic(id, 20);
    level.speed_increase_interval = 1_000_000;
    level.grow_interval = 1_000_000;
    level.survival_time = 1_000_000;
    level
}

#[test]
fn perfect_snake_reaches_fixed_target_in_thirteen_steps() {
    let mut level = calm_level(1);
    level.modifier = Modifier::PerfectAi;
    let mut driver = driver(vec![level], MemoryStore::new("alice"));

    driver.start(1, GameMode::Story, 0).unwrap();
    driver.set_target(Point::new(15.0, 10.0));

    for step in 1..13 {
        assert!(driver.tick(step * 150).is_none());
        let head = driver.run_state().unwrap().snake.head();
        assert_eq!(head, Cell::new(2 + step as i32, 10));
    }

    let report = driver.tick(13 * 150).expect("snake lands on the fruit");
    assert_eq!(driver.run_state().unwrap().snake.head(), Cell::new(15, 10));
    assert_eq!(report.outcome, RunOutcome::Lost(LossCause::Caught));
    assert_eq!(report.snake_length, 3);
    assert_eq!(driver.phase(), Phase::Ended);

    // One life went at the start, losing costs nothing more
    let progress = driver.persistence().story_progress().unwrap();
    assert_eq!(progress.tries_remaining, 2);
    assert_eq!(progress.current_level, 1);
}

#[test]
fn untouched_power_food_lasts_exactly_six_seconds() {
    let mut level = calm_level(1);
    level.initial_speed = 1_000_000;
    level.power_food = Some(PowerFoodConfig {
        spawn_interval: 0,
        speed_boost: 10,
        grow_boost: 2,
    });
    let mut engine = seeded_engine(11);
    let mut state = engine.reset(Arc::new(level), GameMode::Survival, 0);

    let spawned = engine.tick(&mut state, 0);
    assert!(spawned.info.power_food_spawned);
    assert_eq!(state.power_food.unwrap().spawn_time, 0);

    let still = engine.tick(&mut state, 5_999);
    assert!(!still.info.power_food_expired);
    assert!(state.power_food.is_some());

    let gone = engine.tick(&mut state, 6_000);
    assert!(gone.info.power_food_expired);
    assert!(state.power_food.is_none());
}

#[test]
fn titan_doubles_segment_reach() {
    let gap = 0.9;
    assert!(gap > COLLISION_TOLERANCE && gap < COLLISION_TOLERANCE * TITAN_COLLISION_SCALE);
    let segment = Point::new(2.0, 10.0);
    let fruit = Point::new(2.0 + gap, 10.0);
    assert!(!cells_collide(fruit, segment, 1.0, 1.0));
    assert!(cells_collide(fruit, segment, 1.0, TITAN_COLLISION_SCALE));

    for (modifier, caught) in [(Modifier::Titan, true), (Modifier::None, false)] {
        let mut level = calm_level(1);
        level.modifier = modifier;
        let mut engine = seeded_engine(3);
        let mut state = engine.reset(Arc::new(level), GameMode::Survival, 0);
        state.set_fruit(fruit);

        let result = engine.tick(&mut state, 1);
        assert_eq!(result.terminated, caught, "{modifier:?}");
        if caught {
            assert_eq!(state.outcome(), Some(RunOutcome::Lost(LossCause::Caught)));
        }
    }
}

#[test]
fn story_win_lands_on_the_threshold_before_anything_moves() {
    let mut level = LevelConfig::basic(1, 20);
    level.survival_time = 60_000;
    let mut driver = driver(
        vec![level, LevelConfig::basic(2, 20)],
        MemoryStore::new("alice"),
    );
    driver.start(1, GameMode::Story, 0).unwrap();

    assert!(driver.tick(59_999).is_none());
    assert_eq!(driver.phase(), Phase::Playing);
    let before = driver.run_state().unwrap().clone();

    let report = driver.tick(60_000).expect("run is won");
    assert_eq!(report.outcome, RunOutcome::Won);
    assert_eq!(report.elapsed_ms, 60_000);
    assert!(report.completion.is_none());
    let answered = driver.poll_store().expect("store answered");
    assert_eq!(answered.completion.map(|c| c.new_level), Some(2));

    let after = driver.run_state().unwrap();
    assert_eq!(after.snake.body, before.snake.body);
    assert_eq!(after.speed, before.speed);
    assert_eq!(after.fruit, before.fruit);

    // Ended runs stay put and are reported once
    assert!(driver.tick(70_000).is_none());
    assert_eq!(driver.run_state().unwrap().snake.body, before.snake.body);
    assert_eq!(
        driver.persistence().story_progress().unwrap().current_level,
        2
    );
}

/// Survival state with the fruit sitting on a fresh power-food at `now`
fn feeding_state(now: u64, foods_eaten: u32) -> RunState {
    let mut level = LevelConfig::basic(1, 20);
    level.initial_snake_length = 4;
    let mut state = RunState::new(Arc::new(level), GameMode::Survival, 0);
    state.clock = EventClock::starting_at(now);
    state.foods_eaten = foods_eaten;
    state.power_food = Some(PowerFood {
        cell: Cell::new(10, 10),
        spawn_time: now,
    });
    state
}

#[test]
fn player_food_penalties_escalate_in_late_survival() {
    let mut engine = seeded_engine(5);

    // Fourth food, normal regime: slows by 2 and sheds one segment
    let mut state = feeding_state(30_000, 3);
    let result = engine.tick(&mut state, 30_000);
    assert!(result.info.player_ate_food);
    assert_eq!(state.foods_eaten, 4);
    assert_eq!(state.speed, 152);
    assert_eq!(state.snake.len(), 3);

    // Second food after the boost: slows by 5 and sheds two segments
    let mut state = feeding_state(60_000, 1);
    let result = engine.tick(&mut state, 60_000);
    assert!(result.info.player_ate_food);
    assert_eq!(state.foods_eaten, 2);
    assert_eq!(state.speed, 155);
    assert_eq!(state.snake.len(), 2);

    // Too early to eat at all
    let mut state = feeding_state(29_999, 3);
    engine.tick(&mut state, 29_999);
    assert_eq!(state.foods_eaten, 3);
    assert!(state.power_food.is_some());
}

#[test]
fn long_chaotic_run_keeps_its_invariants() {
    let mut level = LevelConfig::basic(1, 20);
    level.modifier = Modifier::ShrinkingArena;
    level.max_snake_length = 12;
    level.grow_interval = 2_000;
    level.power_food = Some(PowerFoodConfig {
        spawn_interval: 1_500,
        speed_boost: 10,
        grow_boost: 2,
    });
    level.projectiles = Some(ProjectileConfig {
        fire_interval: 2_500,
        count: 3,
    });
    let grid = level.grid_size as i32;
    let max_len = level.max_snake_length;

    let mut engine = seeded_engine(99);
    let mut pointer = StdRng::seed_from_u64(1234);
    let mut state = engine.reset(Arc::new(level), GameMode::Survival, 0);
    let mut prev_len = state.snake.len();
    let mut now = 0;

    while state.is_running() && now < 180_000 {
        now += 16;
        state.set_fruit(Point::new(
            pointer.gen_range(0.0..grid as f64),
            pointer.gen_range(0.0..grid as f64),
        ));
        let result = engine.tick(&mut state, now);

        let len = state.snake.len();
        assert!((1..=max_len).contains(&len));
        if len < prev_len {
            assert!(result.info.player_ate_food, "snake shrank without a penalty");
        }
        prev_len = len;

        for segment in &state.snake.body {
            assert!((0..grid).contains(&segment.x) && (0..grid).contains(&segment.y));
        }
        assert!(state.fruit.x >= 0.0 && state.fruit.x < grid as f64);
        assert!(state.fruit.y >= 0.0 && state.fruit.y < grid as f64);
        assert!(state.projectiles.iter().all(|shot| shot.is_within(grid as u32)));
        if let Some(food) = state.power_food {
            assert!(now - food.spawn_time < 6_000);
        }
    }

    if let Some(outcome) = state.outcome() {
        let frozen = state.clone();
        let result = engine.tick(&mut state, now + 1_000);
        assert!(result.terminated);
        assert_eq!(result.info.outcome, None);
        assert_eq!(state.outcome(), Some(outcome));
        assert_eq!(state.snake.body, frozen.snake.body);
        assert_eq!(state.projectiles.len(), frozen.projectiles.len());
        assert_eq!(state.power_food, frozen.power_food);
    }
}

#[tokio::test]
async fn survival_score_persists_across_sessions() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");

    let store = JsonFileStore::open(&path, "alice").unwrap();
    let mut driver = driver(vec![calm_level(1), calm_level(2)], store);

    assert_eq!(
        driver.start(2, GameMode::Survival, 0),
        Err(DriverError::LevelLocked {
            level: 2,
            unlocked: 1
        })
    );

    driver.start(1, GameMode::Survival, 0).unwrap();
    // Parking the fruit on the body ends the run on the next tick
    driver.set_target(Point::new(1.0, 10.0));
    let report = driver.tick(1_234).expect("fruit was caught");
    assert_eq!(report.outcome, RunOutcome::Lost(LossCause::Caught));
    assert_eq!(report.score_ms, 1_200);

    // The file write runs on the blocking pool
    driver.settle().await;
    let survival = driver.last_report().unwrap().survival.unwrap();
    assert!(survival.is_personal_best);
    assert_eq!(survival.rank, Some(1));
    assert_eq!(survival.global_best, 1_200);

    let reopened = JsonFileStore::open(&path, "alice").unwrap();
    assert_eq!(reopened.personal_best(1).unwrap(), 1_200);
    assert_eq!(reopened.global_personal_best().unwrap(), 1_200);
    let top = reopened.leaderboard(Board::Global, 5).unwrap();
    assert_eq!(top[0].snake_length, report.snake_length);
}

#[test]
fn lives_run_out_after_three_story_starts() {
    let mut driver = driver(vec![calm_level(1)], MemoryStore::new("alice"));

    for _ in 0..3 {
        driver.start(1, GameMode::Story, 0).unwrap();
        driver.stop();
    }
    assert_eq!(
        driver.start(1, GameMode::Story, 0),
        Err(DriverError::NoTriesRemaining)
    );
    assert_eq!(driver.phase(), Phase::Idle);
}
