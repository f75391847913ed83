//! Agents and the agent store.

use crate::error::SpawnError;
use crate::geometry::{Direction, Position};
use crate::grid::{EntityKind, Grid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique agent identifier, never reused within a run
pub type AgentId = u64;

/// Why an agent left the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    Starvation,
    OldAge,
    /// Force-removed while repairing a grid/store divergence
    Removed,
}

/// Evolvable per-agent traits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Traits {
    /// Scales the passive energy drain
    pub metabolism: f32,
    /// Scales the energy cost of moving
    pub movement_efficiency: f32,
    /// Ticks between moves; 1 moves every tick
    pub move_interval: u64,
    /// Lifespan in ticks; falls back to `mechanics.max_age` when absent
    pub max_age: Option<u64>,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            metabolism: 1.0,
            movement_efficiency: 1.0,
            move_interval: 1,
            max_age: None,
        }
    }
}

/// Parameters for a new agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSpawnConfig {
    /// Starting energy
    pub energy: f32,
    pub max_energy: f32,
    /// Food scan radius in cells
    pub vision_range: u32,
    /// Initial heading
    pub direction: Direction,
    pub species: String,
    pub traits: Traits,
}

impl Default for AgentSpawnConfig {
    fn default() -> Self {
        Self {
            energy: 50.0,
            max_energy: 100.0,
            vision_range: 5,
            direction: Direction::East,
            species: "drifter".to_string(),
            traits: Traits::default(),
        }
    }
}

/// An agent in the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub position: Position,
    pub energy: f32,
    pub max_energy: f32,
    pub age_ticks: u64,
    pub direction: Direction,
    pub vision_range: u32,
    pub species: String,
    pub traits: Traits,
    /// Ticks left before the next move is allowed
    pub move_cooldown: u64,
}

impl Agent {
    fn new(id: AgentId, position: Position, config: &AgentSpawnConfig) -> Self {
        let max_energy = config.max_energy;
        Self {
            id,
            position,
            energy: config.energy.min(max_energy),
            max_energy,
            age_ticks: 0,
            direction: config.direction,
            vision_range: config.vision_range,
            species: config.species.clone(),
            traits: config.traits,
            move_cooldown: 0,
        }
    }

    /// Effective lifespan: the agent's own, else `fallback`
    #[inline]
    pub fn max_age(&self, fallback: Option<u64>) -> Option<u64> {
        self.traits.max_age.or(fallback)
    }

    #[inline]
    pub fn can_move(&self) -> bool {
        self.move_cooldown == 0
    }

    /// Add energy, capped at `max_energy`. Returns the amount actually gained.
    pub fn gain_energy(&mut self, amount: f32) -> f32 {
        let before = self.energy;
        self.energy = (self.energy + amount.max(0.0)).min(self.max_energy);
        self.energy - before
    }

    /// Remove energy, floored at zero
    pub fn spend_energy(&mut self, amount: f32) {
        self.energy = (self.energy - amount.max(0.0)).max(0.0);
    }

    #[inline]
    pub fn is_depleted(&self) -> bool {
        self.energy <= 0.0
    }

    /// Energy as a fraction of capacity
    #[inline]
    pub fn energy_fraction(&self) -> f32 {
        if self.max_energy > 0.0 {
            (self.energy / self.max_energy).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Live agents keyed by id. Iteration is in ascending id order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentStore {
    agents: BTreeMap<AgentId, Agent>,
    next_id: AgentId,
}

impl AgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new agent at `position`.
    ///
    /// The agent is registered only once its cell has been claimed; a
    /// failed spawn leaves the grid, the store and the id counter untouched.
    /// Starting energy above `max_energy` is capped.
    pub fn spawn(
        &mut self,
        grid: &mut Grid,
        position: Position,
        config: &AgentSpawnConfig,
    ) -> Result<AgentId, SpawnError> {
        let energy_ok = config.energy.is_finite() && config.energy > 0.0;
        let max_energy_ok = config.max_energy.is_finite() && config.max_energy > 0.0;
        if !energy_ok || !max_energy_ok {
            return Err(SpawnError::InvalidEnergy);
        }

        match grid.is_occupied(position.x, position.y) {
            None => return Err(SpawnError::OutOfBounds),
            Some(true) => return Err(SpawnError::CellOccupied),
            Some(false) => {}
        }

        let id = self.next_id;
        if !grid.try_occupy(position.x, position.y, id, EntityKind::Agent) {
            return Err(SpawnError::CellOccupied);
        }
        self.next_id += 1;
        self.agents.insert(id, Agent::new(id, position, config));

        log::debug!("agent {} spawned at {}", id, position);
        Ok(id)
    }

    #[inline]
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(&id)
    }

    #[inline]
    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    /// Drop the record without touching the grid.
    ///
    /// Use [`AgentStore::process_death`] to keep occupancy in sync.
    pub fn remove(&mut self, id: AgentId) -> Option<Agent> {
        self.agents.remove(&id)
    }

    /// Remove the agent and release its cell as one unit.
    ///
    /// A no-op returning `None` when the agent is already gone.
    pub fn process_death(&mut self, grid: &mut Grid, id: AgentId) -> Option<Agent> {
        let agent = self.agents.remove(&id)?;
        let Position { x, y } = agent.position;
        if grid.occupant(x, y, EntityKind::Agent) == Some(id) {
            grid.vacate(x, y, EntityKind::Agent);
        }
        Some(agent)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Ids of all live agents, ascending
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Id the next successful spawn will receive
    #[inline]
    pub fn next_id(&self) -> AgentId {
        self.next_id
    }
}
