//! World rules: movement, eating, energy drain, aging and death.
//!
//! Each function takes the owned [`World`] explicitly. Calls for an agent
//! that is no longer alive are no-ops.

use crate::action::{self, Action, ActionOutcome};
use crate::agent::{AgentId, DeathCause};
use crate::geometry::Direction;
use crate::grid::EntityKind;
use crate::world::World;

/// Result of running one agent through the per-tick pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentStep {
    pub outcome: ActionOutcome,
    pub reward: f32,
    pub death: Option<DeathCause>,
}

/// Move one cell in `direction`.
///
/// Fails without any state change when the agent's move cooldown is still
/// running, or the target is off the grid, not open water, or holds another
/// agent. A pellet in the target cell does not block. On success the agent
/// turns to face `direction`, pays the move cost scaled by its movement
/// efficiency and starts a cooldown of `move_interval` ticks.
pub fn try_move(world: &mut World, agent_id: AgentId, direction: Direction) -> bool {
    let Some(agent) = world.agents.get(agent_id) else {
        return false;
    };
    if !agent.can_move() {
        return false;
    }
    let from = agent.position;
    let to = from.offset(direction);

    if !world.grid.is_passable(to.x, to.y) {
        return false;
    }
    if !world.grid.try_occupy(to.x, to.y, agent_id, EntityKind::Agent) {
        return false;
    }
    world.grid.vacate(from.x, from.y, EntityKind::Agent);

    let cost = world.config.mechanics.move_cost;
    if let Some(agent) = world.agents.get_mut(agent_id) {
        agent.position = to;
        agent.direction = direction;
        agent.spend_energy(cost * agent.traits.movement_efficiency);
        agent.move_cooldown = agent.traits.move_interval;
    }
    true
}

/// Eat the pellet under the agent. Returns the pellet's value, which may
/// exceed what was actually gained when the agent is near capacity.
pub fn try_eat(world: &mut World, agent_id: AgentId) -> Option<f32> {
    let position = world.agents.get(agent_id)?.position;
    let value = world.consume_food_at(position)?;
    if let Some(agent) = world.agents.get_mut(agent_id) {
        agent.gain_energy(value);
    }
    Some(value)
}

/// Per-tick energy drain scaled by metabolism
pub fn apply_passive_drain(world: &mut World, agent_id: AgentId) {
    let drain = world.config.mechanics.passive_drain;
    if let Some(agent) = world.agents.get_mut(agent_id) {
        agent.spend_energy(drain * agent.traits.metabolism);
    }
}

/// Age by one tick and count down the move cooldown
pub fn increment_age(world: &mut World, agent_id: AgentId) {
    if let Some(agent) = world.agents.get_mut(agent_id) {
        agent.age_ticks += 1;
        agent.move_cooldown = agent.move_cooldown.saturating_sub(1);
    }
}

/// Kill the agent if it starved or reached its max age
pub fn check_death(world: &mut World, agent_id: AgentId) -> Option<DeathCause> {
    let agent = world.agents.get(agent_id)?;
    let cause = if agent.is_depleted() {
        DeathCause::Starvation
    } else if agent
        .max_age(world.config.mechanics.max_age)
        .is_some_and(|max_age| agent.age_ticks >= max_age)
    {
        DeathCause::OldAge
    } else {
        return None;
    };

    let agent = world.process_death(agent_id)?;
    log::debug!(
        "agent {} died of {:?} at {} (age {})",
        agent_id,
        cause,
        agent.position,
        agent.age_ticks
    );
    Some(cause)
}

/// Run one agent's tick: action, passive drain, aging, death check.
/// `None` when the agent is not alive.
pub fn step_agent(world: &mut World, agent_id: AgentId, action: Action) -> Option<AgentStep> {
    let outcome = action::resolve_action(world, agent_id, action)?;
    let reward = outcome.reward(&world.config.rewards);

    apply_passive_drain(world, agent_id);
    increment_age(world, agent_id);
    let death = check_death(world, agent_id);

    Some(AgentStep {
        outcome,
        reward,
        death,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSpawnConfig;
    use crate::config::Config;
    use crate::geometry::Position;

    fn world_with(configure: impl FnOnce(&mut Config)) -> World {
        let mut config = Config::default();
        config.world.width = 10;
        config.world.height = 10;
        config.world.seafloor_rows = 2;
        config.mechanics.move_cost = 1.0;
        config.mechanics.passive_drain = 0.0;
        config.mechanics.max_age = None;
        configure(&mut config);
        World::new_with_seed(config, 11).unwrap()
    }

    fn spawn(world: &mut World, x: i32, y: i32, energy: f32) -> AgentId {
        let config = AgentSpawnConfig {
            energy,
            max_energy: 100.0,
            ..AgentSpawnConfig::default()
        };
        world.spawn_agent(Position::new(x, y), &config).unwrap()
    }

    #[test]
    fn test_move_east() {
        let mut world = world_with(|_| {});
        let id = spawn(&mut world, 2, 2, 100.0);

        assert!(try_move(&mut world, id, Direction::East));

        let agent = world.agents.get(id).unwrap();
        assert_eq!(agent.position, Position::new(3, 2));
        assert_eq!(agent.energy, 99.0);
        assert_eq!(agent.direction, Direction::East);
        assert_eq!(world.grid.is_occupied(2, 2), Some(false));
        assert_eq!(world.grid.occupant(3, 2, EntityKind::Agent), Some(id));
    }

    #[test]
    fn test_move_blocked_without_side_effects() {
        let mut world = world_with(|_| {});
        let edge = spawn(&mut world, 0, 0, 50.0);
        let left = spawn(&mut world, 4, 4, 50.0);
        let right = spawn(&mut world, 5, 4, 50.0);
        let deep = spawn(&mut world, 6, 7, 50.0);

        assert!(!try_move(&mut world, edge, Direction::North));
        assert!(!try_move(&mut world, edge, Direction::West));
        assert!(!try_move(&mut world, left, Direction::East));
        // Row 8 is seafloor
        assert!(!try_move(&mut world, deep, Direction::South));

        for (id, x, y) in [(edge, 0, 0), (left, 4, 4), (right, 5, 4), (deep, 6, 7)] {
            let agent = world.agents.get(id).unwrap();
            assert_eq!(agent.position, Position::new(x, y));
            assert_eq!(agent.energy, 50.0);
            assert_eq!(world.grid.occupant(x, y, EntityKind::Agent), Some(id));
        }
    }

    #[test]
    fn test_move_onto_food_keeps_pellet() {
        let mut world = world_with(|_| {});
        let id = spawn(&mut world, 1, 1, 50.0);
        let pellet = world.spawn_food(Position::new(1, 2), 10.0).unwrap();

        assert!(try_move(&mut world, id, Direction::South));
        assert_eq!(world.grid.occupant(1, 2, EntityKind::Agent), Some(id));
        assert_eq!(world.grid.occupant(1, 2, EntityKind::Food), Some(pellet));
        assert!(world.find_violations().is_empty());
    }

    #[test]
    fn test_movement_efficiency_scales_cost() {
        let mut world = world_with(|c| c.mechanics.move_cost = 2.0);
        let mut config = AgentSpawnConfig::default();
        config.traits.movement_efficiency = 0.5;
        let id = world.spawn_agent(Position::new(3, 3), &config).unwrap();

        try_move(&mut world, id, Direction::West);
        assert_eq!(world.agents.get(id).unwrap().energy, 49.0);
    }

    #[test]
    fn test_eat_pellet_under_agent() {
        let mut world = world_with(|_| {});
        let id = spawn(&mut world, 4, 4, 30.0);
        try_move(&mut world, id, Direction::East);
        world.spawn_food(Position::new(6, 4), 20.0).unwrap();
        try_move(&mut world, id, Direction::East);

        let before = world.agents.get(id).unwrap().energy;
        assert_eq!(try_eat(&mut world, id), Some(20.0));

        assert_eq!(world.agents.get(id).unwrap().energy, before + 20.0);
        assert!(world.food.is_empty());
        assert_eq!(world.grid.occupant(6, 4, EntityKind::Food), None);
        assert_eq!(world.grid.occupant(6, 4, EntityKind::Agent), Some(id));
    }

    #[test]
    fn test_eat_is_capped_at_max_energy() {
        let mut world = world_with(|_| {});
        let id = spawn(&mut world, 4, 4, 95.0);
        world.spawn_food(Position::new(5, 4), 20.0).unwrap();
        try_move(&mut world, id, Direction::East);

        assert_eq!(try_eat(&mut world, id), Some(20.0));
        assert_eq!(world.agents.get(id).unwrap().energy, 100.0);
    }

    #[test]
    fn test_eat_nothing() {
        let mut world = world_with(|_| {});
        let id = spawn(&mut world, 4, 4, 50.0);
        assert_eq!(try_eat(&mut world, id), None);
        assert_eq!(world.agents.get(id).unwrap().energy, 50.0);
    }

    #[test]
    fn test_drain_kills_in_same_step() {
        let mut world = world_with(|c| c.mechanics.passive_drain = 5.0);
        let id = spawn(&mut world, 3, 3, 1.0);

        let step = step_agent(&mut world, id, Action::DoNothing).unwrap();

        assert_eq!(step.death, Some(DeathCause::Starvation));
        assert!(!world.agents.contains(id));
        assert_eq!(world.grid.is_occupied(3, 3), Some(false));
        assert_eq!(step_agent(&mut world, id, Action::DoNothing), None);
    }

    #[test]
    fn test_metabolism_scales_drain() {
        let mut world = world_with(|c| c.mechanics.passive_drain = 2.0);
        let mut config = AgentSpawnConfig::default();
        config.traits.metabolism = 1.5;
        let id = world.spawn_agent(Position::new(3, 3), &config).unwrap();

        apply_passive_drain(&mut world, id);
        assert_eq!(world.agents.get(id).unwrap().energy, 47.0);
    }

    #[test]
    fn test_old_age_death() {
        let mut world = world_with(|c| c.mechanics.max_age = Some(3));
        let id = spawn(&mut world, 3, 3, 50.0);

        for _ in 0..2 {
            assert_eq!(step_agent(&mut world, id, Action::DoNothing).unwrap().death, None);
        }
        let step = step_agent(&mut world, id, Action::DoNothing).unwrap();
        assert_eq!(step.death, Some(DeathCause::OldAge));
        assert!(world.is_extinct());
    }

    #[test]
    fn test_own_max_age_beats_global() {
        let mut world = world_with(|c| c.mechanics.max_age = Some(100));
        let mut config = AgentSpawnConfig::default();
        config.traits.max_age = Some(2);
        let short_lived = world.spawn_agent(Position::new(3, 3), &config).unwrap();
        let plain = spawn(&mut world, 5, 5, 50.0);

        assert_eq!(step_agent(&mut world, short_lived, Action::DoNothing).unwrap().death, None);
        let step = step_agent(&mut world, short_lived, Action::DoNothing).unwrap();
        assert_eq!(step.death, Some(DeathCause::OldAge));

        for _ in 0..2 {
            step_agent(&mut world, plain, Action::DoNothing).unwrap();
        }
        assert!(world.agents.contains(plain));
    }

    #[test]
    fn test_move_interval_cooldown() {
        let mut world = world_with(|_| {});
        let mut config = AgentSpawnConfig::default();
        config.traits.move_interval = 3;
        let id = world.spawn_agent(Position::new(1, 3), &config).unwrap();

        let moves: Vec<ActionOutcome> = (0..4)
            .map(|_| step_agent(&mut world, id, Action::Move(Direction::East)).unwrap().outcome)
            .collect();
        assert_eq!(
            moves,
            vec![
                ActionOutcome::Moved,
                ActionOutcome::Blocked,
                ActionOutcome::Blocked,
                ActionOutcome::Moved,
            ]
        );

        let agent = world.agents.get(id).unwrap();
        assert_eq!(agent.position, Position::new(3, 3));
        // Blocked attempts cost nothing
        assert_eq!(agent.energy, 48.0);
    }

    #[test]
    fn test_step_order_action_before_drain() {
        // The pellet is eaten before the drain is applied, so the agent
        // survives a drain larger than its starting energy.
        let mut world = world_with(|c| c.mechanics.passive_drain = 5.0);
        let id = spawn(&mut world, 3, 3, 2.0);
        world.spawn_food(Position::new(4, 3), 10.0).unwrap();
        world.config.mechanics.move_cost = 0.0;
        world.config.mechanics.passive_drain = 0.0;
        step_agent(&mut world, id, Action::Move(Direction::East)).unwrap();
        world.config.mechanics.passive_drain = 5.0;

        let step = step_agent(&mut world, id, Action::Eat).unwrap();
        assert!(step.outcome.succeeded());
        assert_eq!(step.death, None);
        let agent = world.agents.get(id).unwrap();
        assert_eq!(agent.energy, 7.0);
        assert_eq!(agent.age_ticks, 2);
    }
}
