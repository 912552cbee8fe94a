//! The story campaign and level lookup
//!
//! The built-in campaign introduces one mechanic at a time (power-food,
//! projectiles, then each modifier) and later combines them. A catalog can
//! also be loaded from a JSON array of [`LevelConfig`] records.

use std::path::Path;
use std::sync::Arc;

use super::config::{ConfigError, LevelConfig, Modifier, PowerFoodConfig, ProjectileConfig};

/// Number of levels in the story campaign
pub const TOTAL_LEVELS: u32 = 30;

struct Row {
    name: &'static str,
    grid: u32,
    speed: u64,
    min_speed: u64,
    survive_secs: u64,
    max_len: usize,
    modifier: Modifier,
    /// (spawn interval ms, speed boost ms, grow boost)
    food: Option<(u64, u64, usize)>,
    /// (fire interval ms, shots per volley)
    shots: Option<(u64, u32)>,
}

const FOOD: Option<(u64, u64, usize)> = Some((8_000, 10, 2));
const FEAST: Option<(u64, u64, usize)> = Some((6_000, 12, 3));

#[rustfmt::skip]
const CAMPAIGN: [Row; TOTAL_LEVELS as usize] = [
    Row { name: "First Bite",      grid: 20, speed: 150, min_speed: 50, survive_secs: 30, max_len: 20, modifier: Modifier::None,           food: None,  shots: None },
    Row { name: "Warm Up",         grid: 20, speed: 145, min_speed: 50, survive_secs: 35, max_len: 22, modifier: Modifier::None,           food: None,  shots: None },
    Row { name: "Getting Hungry",  grid: 20, speed: 140, min_speed: 45, survive_secs: 40, max_len: 24, modifier: Modifier::None,           food: None,  shots: None },
    Row { name: "Power Snack",     grid: 20, speed: 140, min_speed: 45, survive_secs: 45, max_len: 25, modifier: Modifier::None,           food: FOOD,  shots: None },
    Row { name: "Second Helping",  grid: 20, speed: 135, min_speed: 45, survive_secs: 50, max_len: 26, modifier: Modifier::None,           food: Some((7_000, 10, 2)), shots: None },
    Row { name: "Spitter",         grid: 20, speed: 140, min_speed: 45, survive_secs: 45, max_len: 26, modifier: Modifier::None,           food: None,  shots: Some((4_000, 1)) },
    Row { name: "Crossfire",       grid: 20, speed: 135, min_speed: 45, survive_secs: 50, max_len: 28, modifier: Modifier::None,           food: FOOD,  shots: Some((3_500, 1)) },
    Row { name: "Now You See Me",  grid: 20, speed: 140, min_speed: 45, survive_secs: 45, max_len: 28, modifier: Modifier::Invisible,      food: None,  shots: None },
    Row { name: "Ghost Snack",     grid: 20, speed: 135, min_speed: 45, survive_secs: 50, max_len: 28, modifier: Modifier::Invisible,      food: FOOD,  shots: None },
    Row { name: "Titan",           grid: 20, speed: 150, min_speed: 50, survive_secs: 45, max_len: 24, modifier: Modifier::Titan,          food: None,  shots: None },
    Row { name: "Heavyweight",     grid: 20, speed: 145, min_speed: 50, survive_secs: 50, max_len: 26, modifier: Modifier::Titan,          food: FOOD,  shots: None },
    Row { name: "Chaos Theory",    grid: 20, speed: 140, min_speed: 45, survive_secs: 45, max_len: 28, modifier: Modifier::Chaos,          food: None,  shots: None },
    Row { name: "Chaos Feast",     grid: 20, speed: 140, min_speed: 45, survive_secs: 50, max_len: 28, modifier: Modifier::Chaos,          food: FOOD,  shots: None },
    Row { name: "Closing In",      grid: 24, speed: 140, min_speed: 45, survive_secs: 60, max_len: 30, modifier: Modifier::ShrinkingArena, food: None,  shots: None },
    Row { name: "Tight Squeeze",   grid: 24, speed: 135, min_speed: 45, survive_secs: 75, max_len: 30, modifier: Modifier::ShrinkingArena, food: FOOD,  shots: None },
    Row { name: "The Hunter",      grid: 20, speed: 160, min_speed: 60, survive_secs: 40, max_len: 24, modifier: Modifier::PerfectAi,      food: None,  shots: None },
    Row { name: "Relentless",      grid: 20, speed: 155, min_speed: 60, survive_secs: 45, max_len: 26, modifier: Modifier::PerfectAi,      food: FOOD,  shots: None },
    Row { name: "Fan Fire",        grid: 22, speed: 135, min_speed: 45, survive_secs: 50, max_len: 30, modifier: Modifier::None,           food: None,  shots: Some((4_000, 3)) },
    Row { name: "Ghost Gunner",    grid: 22, speed: 135, min_speed: 45, survive_secs: 55, max_len: 30, modifier: Modifier::Invisible,      food: None,  shots: Some((3_500, 1)) },
    Row { name: "Titan Barrage",   grid: 22, speed: 145, min_speed: 50, survive_secs: 55, max_len: 28, modifier: Modifier::Titan,          food: None,  shots: Some((4_000, 3)) },
    Row { name: "Wild Shots",      grid: 22, speed: 135, min_speed: 45, survive_secs: 55, max_len: 30, modifier: Modifier::Chaos,          food: None,  shots: Some((3_500, 3)) },
    Row { name: "Shrinking Fire",  grid: 24, speed: 135, min_speed: 45, survive_secs: 75, max_len: 32, modifier: Modifier::ShrinkingArena, food: None,  shots: Some((4_000, 1)) },
    Row { name: "Perfect Storm",   grid: 22, speed: 150, min_speed: 55, survive_secs: 50, max_len: 28, modifier: Modifier::PerfectAi,      food: None,  shots: Some((4_500, 1)) },
    Row { name: "Feast or Famine", grid: 22, speed: 130, min_speed: 40, survive_secs: 60, max_len: 32, modifier: Modifier::None,           food: FEAST, shots: Some((3_000, 3)) },
    Row { name: "Phantom",         grid: 22, speed: 130, min_speed: 40, survive_secs: 60, max_len: 32, modifier: Modifier::Invisible,      food: FEAST, shots: Some((3_000, 3)) },
    Row { name: "Colossus",        grid: 22, speed: 140, min_speed: 45, survive_secs: 60, max_len: 30, modifier: Modifier::Titan,          food: FEAST, shots: Some((3_000, 3)) },
    Row { name: "Entropy",         grid: 22, speed: 130, min_speed: 40, survive_secs: 60, max_len: 32, modifier: Modifier::Chaos,          food: FEAST, shots: Some((3_000, 5)) },
    Row { name: "Last Stand",      grid: 26, speed: 130, min_speed: 40, survive_secs: 90, max_len: 34, modifier: Modifier::ShrinkingArena, food: FEAST, shots: Some((3_000, 3)) },
    Row { name: "Apex Predator",   grid: 22, speed: 140, min_speed: 45, survive_secs: 60, max_len: 32, modifier: Modifier::PerfectAi,      food: FEAST, shots: Some((3_000, 3)) },
    Row { name: "Fruit Run",       grid: 26, speed: 120, min_speed: 35, survive_secs: 75, max_len: 40, modifier: Modifier::PerfectAi,      food: FEAST, shots: Some((2_500, 5)) },
];

fn campaign_level(id: u32, row: &Row) -> LevelConfig {
    let mut level = LevelConfig::basic(id, row.grid);
    level.name = row.name.to_string();
    level.initial_speed = row.speed;
    level.min_speed = row.min_speed;
    level.survival_time = row.survive_secs * 1_000;
    level.max_snake_length = row.max_len;
    level.modifier = row.modifier;
    // Later levels grow faster
    if id >= 18 {
        level.grow_interval = 4_000;
    }
    level.power_food = row
        .food
        .map(|(spawn_interval, speed_boost, grow_boost)| PowerFoodConfig {
            spawn_interval,
            speed_boost,
            grow_boost,
        });
    level.projectiles = row
        .shots
        .map(|(fire_interval, count)| ProjectileConfig {
            fire_interval,
            count,
        });
    level
}

/// An ordered, validated set of levels
#[derive(Debug, Clone)]
pub struct LevelCatalog {
    levels: Vec<Arc<LevelConfig>>,
}

impl LevelCatalog {
    /// The built-in story campaign
    pub fn builtin() -> Self {
        let levels = CAMPAIGN
            .iter()
            .zip(1..)
            .map(|(row, id)| Arc::new(campaign_level(id, row)))
            .collect();
        Self { levels }
    }

    /// Validate and order a set of levels by id
    pub fn from_levels(mut levels: Vec<LevelConfig>) -> Result<Self, ConfigError> {
        if levels.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        for level in &levels {
            level.validate()?;
        }

        levels.sort_by_key(|level| level.id);
        if let Some(pair) = levels.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(ConfigError::DuplicateLevel(pair[0].id));
        }

        Ok(Self {
            levels: levels.into_iter().map(Arc::new).collect(),
        })
    }

    /// Load a catalog from a JSON array of levels
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let levels: Vec<LevelConfig> = serde_json::from_str(&json)?;
        Self::from_levels(levels)
    }

    /// Write the catalog as pretty JSON, e.g. to seed a custom campaign
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let levels: Vec<&LevelConfig> = self.levels.iter().map(|level| level.as_ref()).collect();
        let json = serde_json::to_string_pretty(&levels)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<Arc<LevelConfig>> {
        self.levels.iter().find(|level| level.id == id).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelConfig> {
        self.levels.iter().map(|level| level.as_ref())
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
