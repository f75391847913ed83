//! Configuration for the FATHOM world.
//!
//! Plain in-memory values with sensible defaults. YAML load/save is a
//! convenience for the CLI; the engine itself only ever sees a [`Config`].

use crate::agent::{AgentSpawnConfig, Traits};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest accepted grid side
pub const MAX_GRID_DIMENSION: usize = 4096;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub world: WorldConfig,
    pub agents: AgentConfig,
    pub food: FoodConfig,
    pub mechanics: MechanicsConfig,
    pub rewards: RewardConfig,
    pub observation: ObservationConfig,
    pub simulation: SimulationConfig,
    pub logging: LoggingConfig,
}

/// Grid dimensions and the depth profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Depth of the top row
    pub surface_depth: f32,
    /// Depth of the bottom row
    pub max_depth: f32,
    /// Bottom rows classified as sea floor
    pub seafloor_rows: usize,
    /// Cells at or below this depth are sea floor as well
    pub seafloor_depth: Option<f32>,
    /// RNG seed; drawn at random when absent
    pub seed: Option<u64>,
}

/// Initial population and per-agent defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agents spawned when the engine starts
    pub initial_count: usize,
    /// Spawn parameters used for the initial population
    pub defaults: AgentSpawnConfig,
    /// Allowed range for every evolvable trait
    pub trait_bounds: TraitBounds,
}

/// Food supply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    /// Pellets spawned when the engine starts
    pub initial_count: usize,
    /// Energy granted by one pellet
    pub energy_value: f32,
    /// Ticks before an uneaten pellet decays (never when absent)
    pub lifespan: Option<u64>,
    /// Ticks between respawn waves (0 disables respawning)
    pub spawn_interval: u64,
    /// Pellets per respawn wave
    pub spawn_amount: usize,
    /// Upper bound on live pellets
    pub max_pellets: Option<usize>,
}

/// Energy and lifecycle rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MechanicsConfig {
    /// Energy spent per successful move
    pub move_cost: f32,
    /// Energy drained from every agent each tick
    pub passive_drain: f32,
    /// Age at which agents die (never when absent)
    pub max_age: Option<u64>,
}

/// Reward signal per action outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub eat: f32,
    pub move_success: f32,
    pub action_failed: f32,
    pub idle: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationConfig {
    /// Age (in ticks) that normalizes to 1.0 when no max age is set
    pub age_horizon: u64,
}

/// Engine behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Check grid/store consistency after every tick
    pub verify_invariants: bool,
    /// Panic on a consistency violation instead of repairing it
    pub strict_invariants: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Ticks between stats log lines (0 disables)
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Inclusive numeric range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Allowed range for every evolvable agent trait
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitBounds {
    pub max_energy: Bounds,
    pub vision_range: Bounds,
    pub metabolism: Bounds,
    pub movement_efficiency: Bounds,
    pub move_interval: Bounds,
    /// Applies to an agent's own max age; the global fallback is unchecked
    pub max_age: Bounds,
}

impl TraitBounds {
    fn entries(&self) -> [(&'static str, Bounds); 6] {
        [
            ("max_energy", self.max_energy),
            ("vision_range", self.vision_range),
            ("metabolism", self.metabolism),
            ("movement_efficiency", self.movement_efficiency),
            ("move_interval", self.move_interval),
            ("max_age", self.max_age),
        ]
    }

    /// Check that every bound is well formed
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, bounds) in self.entries() {
            if !bounds.is_valid() {
                return Err(ConfigError::InvalidTraitBounds {
                    name,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }

    /// Check a spawn configuration against these bounds
    pub fn check(&self, spawn: &AgentSpawnConfig) -> Result<(), ConfigError> {
        let traits = &spawn.traits;
        let mut values = vec![
            ("max_energy", spawn.max_energy, self.max_energy),
            ("vision_range", spawn.vision_range as f32, self.vision_range),
            ("metabolism", traits.metabolism, self.metabolism),
            ("movement_efficiency", traits.movement_efficiency, self.movement_efficiency),
            ("move_interval", traits.move_interval as f32, self.move_interval),
        ];
        if let Some(max_age) = traits.max_age {
            values.push(("max_age", max_age as f32, self.max_age));
        }
        for (name, value, bounds) in values {
            if !bounds.contains(value) {
                return Err(ConfigError::TraitOutOfBounds {
                    name,
                    value,
                    min: bounds.min,
                    max: bounds.max,
                });
            }
        }
        Ok(())
    }

    /// Copy of `spawn` with every trait pulled into range
    pub fn clamp(&self, spawn: &AgentSpawnConfig) -> AgentSpawnConfig {
        let max_energy = self.max_energy.clamp(spawn.max_energy);
        AgentSpawnConfig {
            // NaN passes through so the spawn itself refuses it
            energy: if spawn.energy > max_energy { max_energy } else { spawn.energy },
            max_energy,
            vision_range: self.vision_range.clamp(spawn.vision_range as f32).round() as u32,
            traits: Traits {
                metabolism: self.metabolism.clamp(spawn.traits.metabolism),
                movement_efficiency: self
                    .movement_efficiency
                    .clamp(spawn.traits.movement_efficiency),
                move_interval: self.move_interval.clamp(spawn.traits.move_interval as f32).round() as u64,
                max_age: spawn
                    .traits
                    .max_age
                    .map(|age| self.max_age.clamp(age as f32).round() as u64),
            },
            ..spawn.clone()
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 140,
            height: 80,
            surface_depth: 0.0,
            max_depth: 200.0,
            seafloor_rows: 4,
            seafloor_depth: None,
            seed: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            initial_count: 50,
            defaults: AgentSpawnConfig::default(),
            trait_bounds: TraitBounds::default(),
        }
    }
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            initial_count: 300,
            energy_value: 20.0,
            lifespan: Some(600),
            spawn_interval: 20,
            spawn_amount: 30,
            max_pellets: Some(2000),
        }
    }
}

impl Default for MechanicsConfig {
    fn default() -> Self {
        Self {
            move_cost: 1.0,
            passive_drain: 0.1,
            max_age: Some(5000),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            eat: 1.0,
            move_success: -0.01,
            action_failed: -0.02,
            idle: 0.0,
        }
    }
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self { age_horizon: 5000 }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            verify_invariants: true,
            strict_invariants: cfg!(debug_assertions),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 100,
            log_level: "info".to_string(),
        }
    }
}

impl Default for TraitBounds {
    fn default() -> Self {
        Self {
            max_energy: Bounds::new(1.0, 1000.0),
            vision_range: Bounds::new(0.0, 32.0),
            metabolism: Bounds::new(0.1, 4.0),
            movement_efficiency: Bounds::new(0.1, 4.0),
            move_interval: Bounds::new(1.0, 16.0),
            max_age: Bounds::new(1.0, 1_000_000.0),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if world.width == 0
            || world.height == 0
            || world.width > MAX_GRID_DIMENSION
            || world.height > MAX_GRID_DIMENSION
        {
            return Err(ConfigError::InvalidDimensions {
                width: world.width,
                height: world.height,
            });
        }
        if !world.surface_depth.is_finite() || world.surface_depth < 0.0 {
            return Err(ConfigError::invalid("world.surface_depth", "must be a finite, non-negative depth"));
        }
        if !world.max_depth.is_finite() || world.max_depth < world.surface_depth {
            return Err(ConfigError::invalid("world.max_depth", "must be >= surface_depth"));
        }
        if world.seafloor_rows >= world.height {
            return Err(ConfigError::invalid("world.seafloor_rows", "must leave at least one open-water row"));
        }

        let bounds = &self.agents.trait_bounds;
        bounds.validate()?;
        let defaults = &self.agents.defaults;
        bounds.check(defaults)?;
        if !defaults.energy.is_finite() || defaults.energy <= 0.0 || defaults.energy > defaults.max_energy {
            return Err(ConfigError::invalid("agents.defaults.energy", "must be in (0, max_energy]"));
        }

        if !self.food.energy_value.is_finite() || self.food.energy_value <= 0.0 {
            return Err(ConfigError::invalid("food.energy_value", "must be > 0"));
        }
        if self.food.lifespan == Some(0) {
            return Err(ConfigError::invalid("food.lifespan", "must be > 0 when set"));
        }

        let mechanics = &self.mechanics;
        if !mechanics.move_cost.is_finite() || mechanics.move_cost < 0.0 {
            return Err(ConfigError::invalid("mechanics.move_cost", "must be >= 0"));
        }
        if !mechanics.passive_drain.is_finite() || mechanics.passive_drain < 0.0 {
            return Err(ConfigError::invalid("mechanics.passive_drain", "must be >= 0"));
        }
        if mechanics.max_age == Some(0) {
            return Err(ConfigError::invalid("mechanics.max_age", "must be > 0 when set"));
        }

        if self.observation.age_horizon == 0 {
            return Err(ConfigError::invalid("observation.age_horizon", "must be > 0"));
        }
        Ok(())
    }
}
