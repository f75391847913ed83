//! Per-agent perception.
//!
//! Observations are derived from world state on demand and never stored in
//! the world itself. Nearest food uses Euclidean distance over the bounded
//! grid; among equally distant pellets the first in row-major order (lowest
//! `y`, then lowest `x`) wins.

use crate::agent::{Agent, AgentId};
use crate::geometry::{Direction, Position};
use crate::grid::{CellType, EntityKind, Grid};
use crate::world::World;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of values produced by [`Observation::as_inputs`]
pub const OBSERVATION_INPUTS: usize = 9;

/// Closest visible pellet relative to the observer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NearestFood {
    /// Euclidean distance in cells
    pub distance: f32,
    /// `distance / vision_range`, in `[0, 1]`
    pub normalized_distance: f32,
    pub dx: i32,
    pub dy: i32,
    /// Dominant-axis heading toward the pellet; `None` when underfoot
    pub direction: Option<Direction>,
}

/// What one agent perceives at the start of a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub agent_id: AgentId,
    pub position: Position,
    pub heading: Direction,
    /// Energy as a fraction of capacity
    pub energy: f32,
    /// Depth of the current cell scaled into `[0, 1]`
    pub depth: f32,
    /// Age scaled by the max age (or the observation age horizon)
    pub age: f32,
    pub nearest_food: Option<NearestFood>,
    pub on_seafloor: bool,
    pub can_eat_now: bool,
}

impl Observation {
    /// Flatten into a fixed-size numeric vector for learning components
    pub fn as_inputs(&self) -> [f32; OBSERVATION_INPUTS] {
        let (present, distance, dx, dy) = match &self.nearest_food {
            Some(food) => {
                let norm = food.distance.max(1.0);
                (
                    1.0,
                    food.normalized_distance,
                    food.dx as f32 / norm,
                    food.dy as f32 / norm,
                )
            }
            None => (0.0, 1.0, 0.0, 0.0),
        };

        [
            self.energy,
            self.depth,
            self.age,
            present,
            distance,
            dx,
            dy,
            if self.on_seafloor { 1.0 } else { 0.0 },
            if self.can_eat_now { 1.0 } else { 0.0 },
        ]
    }
}

/// Scan the disc of radius `vision_range` around `origin` for the closest
/// pellet
pub fn nearest_food(grid: &Grid, origin: Position, vision_range: u32) -> Option<NearestFood> {
    let r = i32::try_from(vision_range).unwrap_or(i32::MAX);
    let r_sq = (r as i64) * (r as i64);
    let mut best: Option<(i64, Position)> = None;

    // Only the part of the vision square that lies on the grid
    let max_x = grid.width() as i32 - 1;
    let max_y = grid.height() as i32 - 1;
    let (x_min, x_max) = (origin.x.saturating_sub(r).max(0), origin.x.saturating_add(r).min(max_x));
    let (y_min, y_max) = (origin.y.saturating_sub(r).max(0), origin.y.saturating_add(r).min(max_y));

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            if grid.occupant(x, y, EntityKind::Food).is_none() {
                continue;
            }
            let candidate = Position::new(x, y);
            let d_sq = origin.distance_sq(candidate);
            if d_sq > r_sq {
                continue;
            }
            if best.map_or(true, |(best_sq, _)| d_sq < best_sq) {
                best = Some((d_sq, candidate));
            }
        }
    }

    best.map(|(d_sq, target)| {
        let distance = (d_sq as f32).sqrt();
        let dx = target.x - origin.x;
        let dy = target.y - origin.y;
        NearestFood {
            distance,
            normalized_distance: if vision_range > 0 {
                (distance / vision_range as f32).min(1.0)
            } else {
                0.0
            },
            dx,
            dy,
            direction: Direction::toward(dx, dy),
        }
    })
}

fn age_fraction(world: &World, agent: &Agent) -> f32 {
    let horizon = agent
        .max_age(world.config.mechanics.max_age)
        .unwrap_or(world.config.observation.age_horizon);
    if horizon == 0 {
        return 0.0;
    }
    (agent.age_ticks as f64 / horizon as f64).min(1.0) as f32
}

fn observe(world: &World, agent: &Agent) -> Observation {
    let Position { x, y } = agent.position;
    let (_, cell_type) = world
        .grid
        .cell_properties(x, y)
        .unwrap_or((0.0, CellType::OpenWater));

    Observation {
        agent_id: agent.id,
        position: agent.position,
        heading: agent.direction,
        energy: agent.energy_fraction(),
        depth: world.grid.normalized_depth(x, y).unwrap_or(0.0),
        age: age_fraction(world, agent),
        nearest_food: nearest_food(&world.grid, agent.position, agent.vision_range),
        on_seafloor: cell_type == CellType::SeaFloor,
        can_eat_now: world.grid.occupant(x, y, EntityKind::Food).is_some(),
    }
}

/// Observation for one agent, `None` when it is not alive
pub fn generate_observation(world: &World, agent_id: AgentId) -> Option<Observation> {
    world.agents.get(agent_id).map(|agent| observe(world, agent))
}

/// Observations for every live agent, keyed by id.
///
/// Read-only, so agents are observed in parallel.
pub fn generate_all(world: &World) -> BTreeMap<AgentId, Observation> {
    let agents: Vec<&Agent> = world.agents.iter().collect();
    agents
        .par_iter()
        .map(|agent| (agent.id, observe(world, agent)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}
