//! Statistics tracking for the simulation.

use crate::world::World;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happened during one tick, filled in by the engine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickActivity {
    pub spawned: usize,
    pub died: usize,
    pub food_eaten: usize,
    pub food_expired: usize,
    pub food_spawned: usize,
}

/// Statistics snapshot after a tick
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Stats {
    /// Current simulation tick
    pub tick: u64,
    /// Live agents
    pub population: usize,
    /// Live pellets
    pub food_count: usize,
    /// Mean energy across agents
    pub energy_mean: f32,
    /// Mean age across agents
    pub age_mean: f32,
    /// Activity during the last tick
    pub last_tick: TickActivity,
    /// Agents spawned since start
    pub total_spawned: u64,
    /// Agents died since start
    pub total_died: u64,
    /// Pellets eaten since start
    pub total_eaten: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh from the world and fold in the tick's activity
    pub fn update(&mut self, world: &World, tick: u64, activity: TickActivity) {
        self.tick = tick;
        self.population = world.population();
        self.food_count = world.food_count();

        if self.population == 0 {
            self.energy_mean = 0.0;
            self.age_mean = 0.0;
        } else {
            let n = self.population as f32;
            self.energy_mean = world.agents.iter().map(|a| a.energy).sum::<f32>() / n;
            self.age_mean = world.agents.iter().map(|a| a.age_ticks as f32).sum::<f32>() / n;
        }

        self.last_tick = activity;
        self.total_spawned += activity.spawned as u64;
        self.total_died += activity.died as u64;
        self.total_eaten += activity.food_eaten as u64;
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "T:{:6} | Pop:{:5} | Food:{:5} | Energy:{:.1} | Age:{:.0} | +{} -{} eaten {}",
            self.tick,
            self.population,
            self.food_count,
            self.energy_mean,
            self.age_mean,
            self.last_tick.spawned,
            self.last_tick.died,
            self.last_tick.food_eaten,
        )
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
