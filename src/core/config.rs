//=========================================================================
// Game Configuration
//=========================================================================
//
// Gameplay tunables loaded from RON. Every section falls back to its
// defaults for omitted fields, so a config file only lists overrides.
//
// Example:
//   (
//       round: (starting_lives: 5),
//       enemies: (initial_spawn_delay: 6.0),
//   )
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

//=== Sections ============================================================

/// Lives, delays and scoring rules of the round state machine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RoundConfig {
    pub starting_lives: u32,
    /// Seconds between losing a ship and the next one spawning.
    pub respawn_delay: f32,
    /// Seconds between clearing the field and the next round.
    pub next_round_delay: f32,
    /// Points between extra lives.
    pub extra_life_step: u64,
    /// Settings key the high score persists under.
    pub high_score_key: String,
}
impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            starting_lives: 3,
            respawn_delay: 2.0,
            next_round_delay: 3.0,
            extra_life_step: 10_000,
            high_score_key: "HighScore".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AsteroidConfig {
    /// Wave size of the first round; each round adds one.
    pub base_count: u32,
    pub max_count: u32,
    pub min_spawn_distance: f32,
    /// Hard capacity of each size's pool.
    pub pool_capacity: usize,
    pub large_speed: f32,
    pub medium_speed: f32,
    pub small_speed: f32,
    pub large_points: u64,
    pub medium_points: u64,
    pub small_points: u64,
}
impl Default for AsteroidConfig {
    fn default() -> Self {
        Self {
            base_count: 4,
            max_count: 10,
            min_spawn_distance: 2.0,
            pool_capacity: 64,
            large_speed: 1.0,
            medium_speed: 1.5,
            small_speed: 2.2,
            large_points: 20,
            medium_points: 50,
            small_points: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EnemyConfig {
    pub initial_spawn_delay: f32,
    pub min_spawn_delay: f32,
    /// Subtracted from the spawn delay after every spawn.
    pub spawn_delay_step: f32,
    pub base_fast_chance: f32,
    /// Added to the fast-ship chance after every spawn.
    pub fast_chance_step: f32,
    pub max_fast_chance: f32,
    pub slow_speed: f32,
    pub fast_speed: f32,
    pub initial_fire_delay: f32,
    pub subsequent_fire_delay: f32,
    pub points: u64,
}
impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            initial_spawn_delay: 10.0,
            min_spawn_delay: 5.0,
            spawn_delay_step: 0.1,
            base_fast_chance: 0.2,
            fast_chance_step: 0.05,
            max_fast_chance: 1.0,
            slow_speed: 3.0,
            fast_speed: 5.0,
            initial_fire_delay: 3.0,
            subsequent_fire_delay: 1.5,
            points: 50,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ExplosionConfig {
    pub pool_capacity: usize,
    /// Seconds an explosion stays alive.
    pub duration: f32,
}
impl Default for ExplosionConfig {
    fn default() -> Self {
        Self {
            pool_capacity: 20,
            duration: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ProjectileConfig {
    pub player_capacity: usize,
    pub enemy_capacity: usize,
    pub player_speed: f32,
    pub enemy_speed: f32,
    /// Seconds before a bullet expires on its own.
    pub lifetime: f32,
}
impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            player_capacity: 4,
            enemy_capacity: 10,
            player_speed: 10.0,
            enemy_speed: 6.0,
            lifetime: 1.2,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Degrees per second at full rotation input.
    pub turn_speed: f32,
    /// Units per second squared while thrusting.
    pub thrust: f32,
    /// Fraction of velocity shed per second.
    pub drag: f32,
    pub max_speed: f32,
    pub fire_cooldown: f32,
    pub invulnerability: f32,
    pub hyperspace_cooldown: f32,
}
impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            turn_speed: 200.0,
            thrust: 6.0,
            drag: 0.5,
            max_speed: 8.0,
            fire_cooldown: 0.15,
            invulnerability: 3.0,
            hyperspace_cooldown: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WrapConfig {
    /// Seconds an axis stays locked after a screen-wrap swap.
    pub swap_delay: f32,
    /// Soft capacity of each ghost pool.
    pub ghost_pool_capacity: usize,
}
impl Default for WrapConfig {
    fn default() -> Self {
        Self {
            swap_delay: 2.0,
            ghost_pool_capacity: 8,
        }
    }
}

/// Visible world rectangle, centred on the origin.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
}
impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 17.8,
            height: 10.0,
        }
    }
}

/// Clip names handed to the audio collaborator.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub game: String,
    pub game_over: String,
    pub extra_life: String,
    pub explosion: String,
}
impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            game: "Game".into(),
            game_over: "GameOver".into(),
            extra_life: "ExtraLife".into(),
            explosion: "Explosion".into(),
        }
    }
}

//=== GameConfig ==========================================================

/// Root of the configuration tree.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub round: RoundConfig,
    pub asteroids: AsteroidConfig,
    pub enemies: EnemyConfig,
    pub explosion: ExplosionConfig,
    pub projectiles: ProjectileConfig,
    pub player: PlayerConfig,
    pub wrap: WrapConfig,
    pub viewport: ViewportConfig,
    pub audio: AudioConfig,
    /// Soft capacity of each timer variant's pool.
    pub timer_pool_capacity: usize,
}
impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round: RoundConfig::default(),
            asteroids: AsteroidConfig::default(),
            enemies: EnemyConfig::default(),
            explosion: ExplosionConfig::default(),
            projectiles: ProjectileConfig::default(),
            player: PlayerConfig::default(),
            wrap: WrapConfig::default(),
            viewport: ViewportConfig::default(),
            audio: AudioConfig::default(),
            timer_pool_capacity: 64,
        }
    }
}

impl GameConfig {
    /// Parses a RON document.
    pub fn from_ron_str(data: &str) -> Result<Self, ConfigError> {
        ron::from_str(data).map_err(ConfigError::Parse)
    }

    /// Reads and parses a RON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&data)
    }

    /// Loads a RON file, falling back to defaults (with a warning) if it is
    /// missing or malformed.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using default game config", e);
                Self::default()
            }
        }
    }
}

//=== ConfigError =========================================================

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document is not valid RON for [`GameConfig`].
    Parse(ron::error::SpannedError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "Failed to read config {}: {}", path.display(), source)
            }
            Self::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(e) => Some(e),
        }
    }
}

//=========================================================================
// Tests
//=========================================================================
