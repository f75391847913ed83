//! Actions: the closed set of per-tick commands, decoding of loosely typed
//! requests, dispatch to the mechanics and the reward signal.

use crate::agent::AgentId;
use crate::config::RewardConfig;
use crate::error::InvalidAction;
use crate::geometry::Direction;
use crate::mechanics;
use crate::world::World;
use serde::{Deserialize, Serialize};

/// Possible actions an agent can take in one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Action {
    Move(Direction),
    Eat,
    #[default]
    DoNothing,
}

/// Action as delivered by an external decision-maker, before validation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionRequest {
    pub kind: String,
    #[serde(default)]
    pub direction: Option<String>,
}

impl ActionRequest {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            direction: None,
        }
    }

    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }
}

impl TryFrom<&ActionRequest> for Action {
    type Error = InvalidAction;

    fn try_from(request: &ActionRequest) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| InvalidAction {
            kind: request.kind.clone(),
            reason: reason.to_string(),
        };

        match request.kind.trim().to_ascii_lowercase().as_str() {
            "move" => {
                let name = request
                    .direction
                    .as_deref()
                    .ok_or_else(|| invalid("move requires a direction"))?;
                Direction::parse(name)
                    .map(Action::Move)
                    .ok_or_else(|| invalid("unknown direction"))
            }
            "eat" => Ok(Action::Eat),
            "do_nothing" | "donothing" | "noop" | "wait" | "idle" => Ok(Action::DoNothing),
            _ => Err(invalid("unsupported action kind")),
        }
    }
}

impl Action {
    /// Decode a request, falling back to `DoNothing` on malformed input
    pub fn decode_or_idle(agent_id: AgentId, request: &ActionRequest) -> Action {
        Action::try_from(request).unwrap_or_else(|err| {
            log::warn!("agent {}: {}; treating as do-nothing", agent_id, err);
            Action::DoNothing
        })
    }
}

/// What applying an action actually did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionOutcome {
    Moved,
    /// Target out of bounds, impassable or taken
    Blocked,
    Ate { energy_value: f32 },
    NoFood,
    Idle,
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ActionOutcome::Moved | ActionOutcome::Ate { .. })
    }

    /// Reward under `policy`
    pub fn reward(&self, policy: &RewardConfig) -> f32 {
        match self {
            ActionOutcome::Ate { .. } => policy.eat,
            ActionOutcome::Moved => policy.move_success,
            ActionOutcome::Blocked | ActionOutcome::NoFood => policy.action_failed,
            ActionOutcome::Idle => policy.idle,
        }
    }
}

/// Run the mechanic matching `action`. `None` when the agent is gone.
pub fn resolve_action(world: &mut World, agent_id: AgentId, action: Action) -> Option<ActionOutcome> {
    if !world.agents.contains(agent_id) {
        return None;
    }
    let outcome = match action {
        Action::Move(direction) => {
            if mechanics::try_move(world, agent_id, direction) {
                ActionOutcome::Moved
            } else {
                ActionOutcome::Blocked
            }
        }
        Action::Eat => match mechanics::try_eat(world, agent_id) {
            Some(energy_value) => ActionOutcome::Ate { energy_value },
            None => ActionOutcome::NoFood,
        },
        Action::DoNothing => ActionOutcome::Idle,
    };
    Some(outcome)
}

/// Apply `action` for `agent_id` and return its reward (zero for a
/// missing agent)
pub fn apply_action(world: &mut World, agent_id: AgentId, action: Action) -> f32 {
    resolve_action(world, agent_id, action)
        .map(|outcome| outcome.reward(&world.config.rewards))
        .unwrap_or(0.0)
}
