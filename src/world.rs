//! The owned world aggregate: grid, entity stores, config and RNG.
//!
//! Every mechanic receives a `&mut World` explicitly, so independent worlds
//! can coexist in one process.

use crate::agent::{Agent, AgentId, AgentSpawnConfig, AgentStore};
use crate::config::Config;
use crate::error::{ConfigError, SpawnError};
use crate::food::{FoodId, FoodStore};
use crate::geometry::Position;
use crate::grid::{EntityKind, Grid};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

/// A divergence between the grid and the entity stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("agent {id} is not recorded in the grid at {position}")]
    AgentNotInCell { id: AgentId, position: Position },

    #[error("pellet {id} is not recorded in the grid at {position}")]
    FoodNotInCell { id: FoodId, position: Position },

    #[error("{kind:?} slot at {position} holds {id}, which is not there")]
    StaleOccupancy {
        position: Position,
        kind: EntityKind,
        id: u64,
    },
}

/// What the environment phase changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentReport {
    pub expired: Vec<FoodId>,
    pub spawned: Vec<FoodId>,
}

/// The simulation world
#[derive(Debug, Clone)]
pub struct World {
    // Spatial state
    pub grid: Grid,

    // Entities
    pub agents: AgentStore,
    pub food: FoodStore,

    // Configuration
    pub config: Config,

    // Random number generator (seeded for reproducibility)
    rng: ChaCha8Rng,
    seed: u64,
}

impl World {
    /// Create a world, drawing a seed when the config has none
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let seed = config.world.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Self::new_with_seed(config, seed)
    }

    /// Create an empty world with a specific seed
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::new(&config.world);

        Ok(Self {
            grid,
            agents: AgentStore::new(),
            food: FoodStore::new(),
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        })
    }

    /// Seed for reproducibility
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    pub fn spawn_agent(
        &mut self,
        position: Position,
        config: &AgentSpawnConfig,
    ) -> Result<AgentId, SpawnError> {
        self.agents.spawn(&mut self.grid, position, config)
    }

    /// Spawn up to `count` agents on random free open-water cells
    pub fn spawn_random_agents(&mut self, count: usize, config: &AgentSpawnConfig) -> Vec<AgentId> {
        let candidates = self.grid.free_open_water();
        let chosen: Vec<Position> = candidates
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect();

        chosen
            .into_iter()
            .filter_map(|pos| self.agents.spawn(&mut self.grid, pos, config).ok())
            .collect()
    }

    pub fn spawn_food(&mut self, position: Position, energy_value: f32) -> Result<FoodId, SpawnError> {
        self.food.spawn(&mut self.grid, position, energy_value)
    }

    /// Spawn up to `count` default pellets, respecting `food.max_pellets`
    pub fn spawn_random_food(&mut self, count: usize) -> Vec<FoodId> {
        let room = self
            .config
            .food
            .max_pellets
            .map_or(count, |max| max.saturating_sub(self.food.len()));
        let energy_value = self.config.food.energy_value;
        self.food
            .spawn_random(&mut self.grid, &mut self.rng, count.min(room), energy_value)
    }

    /// Remove an agent and release its cell; no-op when already gone
    pub fn process_death(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.process_death(&mut self.grid, id)
    }

    pub fn consume_food_at(&mut self, position: Position) -> Option<f32> {
        self.food.consume_at(&mut self.grid, position)
    }

    /// Environment phase: food decay, then periodic respawn
    pub fn update_environment(&mut self, tick: u64) -> EnvironmentReport {
        let lifespan = self.config.food.lifespan;
        let expired: Vec<FoodId> = self
            .food
            .age_and_expire(&mut self.grid, lifespan)
            .into_iter()
            .map(|pellet| pellet.id)
            .collect();
        if !expired.is_empty() {
            log::debug!("tick {}: {} pellets decayed", tick, expired.len());
        }

        let interval = self.config.food.spawn_interval;
        let spawned = if interval > 0 && tick % interval == 0 {
            self.spawn_random_food(self.config.food.spawn_amount)
        } else {
            Vec::new()
        };

        EnvironmentReport { expired, spawned }
    }

    /// Scan the grid against both stores
    pub fn find_violations(&self) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        for agent in self.agents.iter() {
            let Position { x, y } = agent.position;
            if self.grid.occupant(x, y, EntityKind::Agent) != Some(agent.id) {
                violations.push(InvariantViolation::AgentNotInCell {
                    id: agent.id,
                    position: agent.position,
                });
            }
        }

        for pellet in self.food.iter() {
            let Position { x, y } = pellet.position;
            if self.grid.occupant(x, y, EntityKind::Food) != Some(pellet.id) {
                violations.push(InvariantViolation::FoodNotInCell {
                    id: pellet.id,
                    position: pellet.position,
                });
            }
        }

        for (position, occupant) in self.grid.occupied_slots() {
            let recorded = match occupant.kind {
                EntityKind::Agent => self.agents.get(occupant.id).map(|a| a.position),
                EntityKind::Food => self.food.get(occupant.id).map(|p| p.position),
            };
            if recorded != Some(position) {
                violations.push(InvariantViolation::StaleOccupancy {
                    position,
                    kind: occupant.kind,
                    id: occupant.id,
                });
            }
        }

        violations
    }

    /// Restore grid/store consistency.
    ///
    /// In strict mode any violation is a defect and panics. Otherwise each
    /// violation is logged and the offending entity or stale slot is
    /// removed. Returns the ids of force-removed agents.
    pub fn reconcile(&mut self) -> Vec<AgentId> {
        let violations = self.find_violations();
        if violations.is_empty() {
            return Vec::new();
        }
        if self.config.simulation.strict_invariants {
            panic!("world invariant violated: {:?}", violations);
        }

        let mut removed = Vec::new();
        for violation in violations {
            log::error!("{}; repairing", violation);
            match violation {
                InvariantViolation::AgentNotInCell { id, position } => {
                    if self.agents.remove(id).is_some() {
                        removed.push(id);
                    }
                    if self.grid.occupant(position.x, position.y, EntityKind::Agent) == Some(id) {
                        self.grid.vacate(position.x, position.y, EntityKind::Agent);
                    }
                }
                InvariantViolation::FoodNotInCell { id, position } => {
                    self.food.remove(id);
                    if self.grid.occupant(position.x, position.y, EntityKind::Food) == Some(id) {
                        self.grid.vacate(position.x, position.y, EntityKind::Food);
                    }
                }
                InvariantViolation::StaleOccupancy { position, kind, id } => {
                    if self.grid.occupant(position.x, position.y, kind) == Some(id) {
                        self.grid.vacate(position.x, position.y, kind);
                    }
                }
            }
        }
        removed
    }

    /// Live agent count
    pub fn population(&self) -> usize {
        self.agents.len()
    }

    pub fn food_count(&self) -> usize {
        self.food.len()
    }

    pub fn is_extinct(&self) -> bool {
        self.agents.is_empty()
    }
}
