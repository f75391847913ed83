//! Built-in decision makers that turn observations into actions.
//!
//! External learners normally supply actions themselves; these controllers
//! drive headless runs, benchmarks and tests.

use crate::action::Action;
use crate::geometry::Direction;
use crate::observation::Observation;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Shared interface for per-agent decision makers
pub trait Controller {
    /// Identifier for logs
    fn kind(&self) -> &'static str;

    /// Choose the next action for the observed agent
    fn decide(&mut self, observation: &Observation) -> Action;
}

/// Never acts
#[derive(Debug, Clone, Copy, Default)]
pub struct IdleController;

impl Controller for IdleController {
    fn kind(&self) -> &'static str {
        "idle"
    }

    fn decide(&mut self, _observation: &Observation) -> Action {
        Action::DoNothing
    }
}

/// Hand-written forager.
///
/// Eats whenever food is underfoot. Below the hunger threshold it steers
/// toward the nearest visible pellet along the dominant axis; otherwise it
/// keeps its heading, turning to a random direction now and then.
#[derive(Debug, Clone)]
pub struct ForagingController {
    /// Energy fraction below which the agent seeks food
    pub hunger_threshold: f32,
    /// Chance per tick of picking a new heading while wandering
    pub turn_chance: f64,
    rng: ChaCha8Rng,
}

impl ForagingController {
    pub fn new(seed: u64) -> Self {
        Self {
            hunger_threshold: 0.6,
            turn_chance: 0.1,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn wander(&mut self, heading: Direction) -> Direction {
        if self.rng.gen_bool(self.turn_chance.clamp(0.0, 1.0)) {
            Direction::ALL.choose(&mut self.rng).copied().unwrap_or(heading)
        } else {
            heading
        }
    }
}

impl Controller for ForagingController {
    fn kind(&self) -> &'static str {
        "foraging"
    }

    fn decide(&mut self, observation: &Observation) -> Action {
        if observation.can_eat_now {
            return Action::Eat;
        }

        if observation.energy < self.hunger_threshold {
            if let Some(direction) = observation.nearest_food.and_then(|food| food.direction) {
                return Action::Move(direction);
            }
        }

        Action::Move(self.wander(observation.heading))
    }
}
