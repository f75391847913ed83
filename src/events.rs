//! Outbound events and world snapshots.

use crate::agent::{AgentId, DeathCause};
use crate::clock::RunStatus;
use crate::food::FoodId;
use crate::geometry::{Direction, Position};
use crate::observation::Observation;
use crate::world::World;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: AgentId,
    pub position: Position,
    pub energy: f32,
    pub max_energy: f32,
    pub age_ticks: u64,
    pub direction: Direction,
    pub species: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodView {
    pub id: FoodId,
    pub position: Position,
    pub energy_value: f32,
}

/// World state between ticks, ordered by id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldStateSnapshot {
    pub tick: u64,
    pub status: RunStatus,
    pub agents: Vec<AgentView>,
    pub food: Vec<FoodView>,
}

impl WorldStateSnapshot {
    pub fn capture(world: &World, tick: u64, status: RunStatus) -> Self {
        let agents = world
            .agents
            .iter()
            .map(|agent| AgentView {
                id: agent.id,
                position: agent.position,
                energy: agent.energy,
                max_energy: agent.max_energy,
                age_ticks: agent.age_ticks,
                direction: agent.direction,
                species: agent.species.clone(),
            })
            .collect();
        let food = world
            .food
            .iter()
            .map(|pellet| FoodView {
                id: pellet.id,
                position: pellet.position,
                energy_value: pellet.energy_value,
            })
            .collect();

        Self {
            tick,
            status,
            agents,
            food,
        }
    }
}

/// Everything the engine reports to its collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    Observation {
        agent_id: AgentId,
        tick: u64,
        observation: Observation,
    },
    AgentDied {
        agent_id: AgentId,
        cause: DeathCause,
        tick: u64,
    },
    AgentSpawned {
        agent_id: AgentId,
        tick: u64,
    },
    Reward {
        agent_id: AgentId,
        tick: u64,
        reward: f32,
    },
    Snapshot(WorldStateSnapshot),
}

impl SimEvent {
    /// Agent the event concerns, if any
    pub fn agent_id(&self) -> Option<AgentId> {
        match self {
            SimEvent::Observation { agent_id, .. }
            | SimEvent::AgentDied { agent_id, .. }
            | SimEvent::AgentSpawned { agent_id, .. }
            | SimEvent::Reward { agent_id, .. } => Some(*agent_id),
            SimEvent::Snapshot(_) => None,
        }
    }
}
