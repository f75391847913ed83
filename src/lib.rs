//! # FATHOM
//!
//! Deterministic grid-based ocean ecosystem engine.
//!
//! ## Features
//!
//! - **Consistent**: grid occupancy and entity stores change together
//! - **Deterministic**: seeded RNG, id-ordered agent processing
//! - **Tick-atomic**: commands are buffered and applied between ticks
//! - **Configurable**: YAML configuration files
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fathom::{Config, Engine, ForagingController};
//!
//! let mut engine = Engine::new(Config::default()).unwrap();
//! engine.start().unwrap();
//!
//! let mut controller = ForagingController::new(7);
//! engine.run_with_controller(&mut controller, 1000);
//!
//! println!("{}", engine.stats());
//! ```
//!
//! ## Driving agents externally
//!
//! ```rust
//! use fathom::{Action, Config, Direction, Engine, SimEvent};
//!
//! let mut config = Config::default();
//! config.agents.initial_count = 3;
//! let mut engine = Engine::new_with_seed(config, 42).unwrap();
//! engine.start().unwrap();
//!
//! let ids: Vec<_> = engine.observations().keys().copied().collect();
//! for id in ids {
//!     engine.queue_action(id, Action::Move(Direction::East)).unwrap();
//! }
//! engine.advance_n_ticks(1);
//!
//! let rewards = engine
//!     .drain_events()
//!     .into_iter()
//!     .filter(|e| matches!(e, SimEvent::Reward { .. }))
//!     .count();
//! assert_eq!(rewards, 3);
//! ```

pub mod action;
pub mod agent;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod food;
pub mod geometry;
pub mod grid;
pub mod mechanics;
pub mod observation;
pub mod policy;
pub mod stats;
pub mod world;

// Re-export main types
pub use action::{apply_action, Action, ActionOutcome, ActionRequest};
pub use agent::{Agent, AgentId, AgentSpawnConfig, DeathCause, Traits};
pub use clock::{ControlCommand, RunStatus, SimulationClock};
pub use config::Config;
pub use engine::{Command, Engine};
pub use error::{ConfigError, EngineError, InvalidAction, SpawnError};
pub use events::{SimEvent, WorldStateSnapshot};
pub use food::{FoodId, FoodPellet};
pub use geometry::{Direction, Position};
pub use grid::{CellType, EntityKind, Grid};
pub use observation::{generate_observation, Observation};
pub use policy::{Controller, ForagingController, IdleController};
pub use stats::Stats;
pub use world::World;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark with foraging agents
pub fn benchmark(ticks: u64, population: usize) -> Result<BenchmarkResult, EngineError> {
    use std::time::Instant;

    let mut config = Config::default();
    config.agents.initial_count = population;
    config.logging.stats_interval = 0;

    let mut engine = Engine::new_with_seed(config, 0)?;
    engine.start()?;
    let initial_population = engine.world().population();
    let mut controller = ForagingController::new(0);

    let start = Instant::now();
    let ticks_run = engine.run_with_controller(&mut controller, ticks);
    let elapsed = start.elapsed();

    Ok(BenchmarkResult {
        ticks: ticks_run,
        initial_population,
        final_population: engine.world().population(),
        elapsed_secs: elapsed.as_secs_f64(),
        ticks_per_second: ticks_run as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub ticks: u64,
    pub initial_population: usize,
    pub final_population: usize,
    pub elapsed_secs: f64,
    pub ticks_per_second: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Ticks: {}", self.ticks)?;
        writeln!(f, "Population: {} -> {}", self.initial_population, self.final_population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} ticks/s", self.ticks_per_second)?;
        Ok(())
    }
}
