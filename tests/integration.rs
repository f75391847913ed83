//! Integration tests for FATHOM

use fathom::grid::EntityKind;
use fathom::{
    Action, ActionRequest, AgentSpawnConfig, Command, Config, Direction, Engine, ForagingController,
    Position, RunStatus, SimEvent, SpawnError, World,
};
use std::collections::HashSet;

/// 10x10 world with nothing spawned automatically
fn small_config() -> Config {
    let mut config = Config::default();
    config.world.width = 10;
    config.world.height = 10;
    config.world.seafloor_rows = 2;
    config.agents.initial_count = 0;
    config.food.initial_count = 0;
    config.food.spawn_interval = 0;
    config.food.lifespan = None;
    config.mechanics.move_cost = 1.0;
    config.mechanics.passive_drain = 0.0;
    config.mechanics.max_age = None;
    config
}

fn started(config: Config) -> Engine {
    let mut engine = Engine::new_with_seed(config, 2024).unwrap();
    engine.start().unwrap();
    engine.drain_events();
    engine
}

fn agent_with_energy(energy: f32) -> AgentSpawnConfig {
    AgentSpawnConfig {
        energy,
        max_energy: 100.0,
        direction: Direction::East,
        ..AgentSpawnConfig::default()
    }
}

#[test]
fn test_food_cannot_spawn_on_agent() {
    let mut engine = started(small_config());
    engine
        .spawn_agent(Position::new(5, 5), &AgentSpawnConfig::default())
        .unwrap();

    let world = engine.world_mut();
    assert_eq!(
        world.spawn_food(Position::new(5, 5), 20.0),
        Err(SpawnError::CellOccupied)
    );
    assert!(world.food.is_empty());
}

#[test]
fn test_move_east_costs_energy() {
    let mut engine = started(small_config());
    let id = engine
        .spawn_agent(Position::new(2, 2), &agent_with_energy(100.0))
        .unwrap();

    engine.queue_action(id, Action::Move(Direction::East)).unwrap();
    engine.advance_n_ticks(1);

    let world = engine.world();
    let agent = world.agents.get(id).unwrap();
    assert_eq!(agent.position, Position::new(3, 2));
    assert_eq!(agent.energy, 99.0);
    assert_eq!(world.grid.is_occupied(2, 2), Some(false));
    assert_eq!(world.grid.occupant(3, 2, EntityKind::Agent), Some(id));
}

#[test]
fn test_starvation_within_one_tick() {
    let mut config = small_config();
    config.mechanics.passive_drain = 5.0;
    let mut engine = started(config);
    let id = engine
        .spawn_agent(Position::new(4, 4), &agent_with_energy(1.0))
        .unwrap();

    engine.advance_n_ticks(1);

    assert!(!engine.world().agents.contains(id));
    assert_eq!(engine.world().grid.is_occupied(4, 4), Some(false));
    assert!(engine.drain_events().iter().any(|e| matches!(
        e,
        SimEvent::AgentDied { agent_id, tick: 1, .. } if *agent_id == id
    )));
}

#[test]
fn test_eat_pellet_at_own_position() {
    let mut engine = started(small_config());
    engine.world_mut().spawn_food(Position::new(3, 2), 20.0).unwrap();
    let id = engine
        .spawn_agent(Position::new(2, 2), &agent_with_energy(50.0))
        .unwrap();

    engine.queue_action(id, Action::Move(Direction::East)).unwrap();
    engine.advance_n_ticks(1);
    assert!(engine.observation(id).unwrap().can_eat_now);

    engine.queue_action(id, Action::Eat).unwrap();
    engine.advance_n_ticks(1);

    let world = engine.world();
    assert_eq!(world.agents.get(id).unwrap().energy, 69.0);
    assert!(world.food.is_empty());
    assert_eq!(world.grid.occupant(3, 2, EntityKind::Food), None);
    assert_eq!(engine.stats().last_tick.food_eaten, 1);
}

#[test]
fn test_paused_advance_is_a_no_op() {
    let mut engine = started(small_config());
    engine.advance_n_ticks(2);
    engine.pause().unwrap();

    assert_eq!(engine.advance_n_ticks(3), 0);
    assert_eq!(engine.current_tick(), 2);
    assert_eq!(engine.status(), RunStatus::Paused);
}

#[test]
fn test_invariants_hold_over_long_run() {
    let mut config = Config::default();
    config.world.width = 40;
    config.world.height = 30;
    config.agents.initial_count = 60;
    config.food.initial_count = 150;
    config.mechanics.passive_drain = 0.5;
    config.mechanics.max_age = Some(300);
    let mut engine = Engine::new_with_seed(config, 77).unwrap();
    engine.start().unwrap();
    let mut controller = ForagingController::new(77);

    let mut ticks = 0;
    engine.run_with_callback(&mut controller, 400, |engine, _events| {
        ticks += 1;
        let world = engine.world();
        assert!(world.find_violations().is_empty());

        let mut cells = HashSet::new();
        for agent in world.agents.iter() {
            assert!(cells.insert(agent.position), "two agents at {}", agent.position);
            assert!(agent.energy > 0.0 && agent.energy <= agent.max_energy);
        }
        let mut pellets = HashSet::new();
        for pellet in world.food.iter() {
            assert!(pellets.insert(pellet.position));
        }
    });

    assert_eq!(ticks, engine.current_tick());
    assert!(engine.stats().total_eaten > 0);
}

#[test]
fn test_same_seed_same_history() {
    let run = || {
        let mut config = Config::default();
        config.world.width = 30;
        config.world.height = 20;
        config.agents.initial_count = 25;
        config.food.initial_count = 60;
        let mut engine = Engine::new_with_seed(config, 9).unwrap();
        engine.start().unwrap();
        let mut controller = ForagingController::new(3);
        engine.run_with_controller(&mut controller, 150);
        engine.snapshot()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_process_death_twice_matches_once() {
    let mut world = World::new_with_seed(small_config(), 1).unwrap();
    let id = world
        .spawn_agent(Position::new(6, 3), &AgentSpawnConfig::default())
        .unwrap();
    world
        .spawn_agent(Position::new(1, 1), &AgentSpawnConfig::default())
        .unwrap();

    let mut once = world.clone();
    once.process_death(id);
    world.process_death(id);
    world.process_death(id);

    assert_eq!(world.grid.occupied_slots(), once.grid.occupied_slots());
    assert_eq!(world.agents.ids(), once.agents.ids());
}

#[test]
fn test_try_occupy_out_of_bounds() {
    let mut world = World::new_with_seed(small_config(), 1).unwrap();
    for (x, y) in [(-1, 0), (0, -1), (10, 0), (0, 10), (i32::MAX, i32::MIN)] {
        assert!(!world.grid.try_occupy(x, y, 1, EntityKind::Agent));
        assert_eq!(world.grid.is_occupied(x, y), None);
    }
    assert!(world.grid.occupied_slots().is_empty());
}

#[test]
fn test_invalid_raw_action_is_do_nothing() {
    let mut engine = started(small_config());
    let id = engine
        .spawn_agent(Position::new(5, 5), &agent_with_energy(40.0))
        .unwrap();

    engine
        .submit(Command::ActRaw {
            agent_id: id,
            request: ActionRequest::new("teleport").with_direction("up"),
        })
        .unwrap();
    engine.advance_n_ticks(1);

    let agent = engine.world().agents.get(id).unwrap();
    assert_eq!(agent.position, Position::new(5, 5));
    assert_eq!(agent.energy, 40.0);
    let idle = engine.world().config.rewards.idle;
    assert!(engine.drain_events().contains(&SimEvent::Reward {
        agent_id: id,
        tick: 1,
        reward: idle,
    }));
}

#[test]
fn test_spawn_then_observe() {
    let mut engine = started(small_config());
    let config = AgentSpawnConfig {
        energy: 30.0,
        max_energy: 120.0,
        direction: Direction::West,
        ..AgentSpawnConfig::default()
    };
    engine
        .submit(Command::SpawnAgent {
            position: Position::new(7, 1),
            config,
        })
        .unwrap();
    let id = engine.world().agents.ids()[0];

    let obs = engine.observe(id).unwrap();
    assert_eq!(obs.position, Position::new(7, 1));
    assert_eq!(obs.energy, 0.25);
    assert_eq!(obs.age, 0.0);
    assert_eq!(obs.heading, Direction::West);
    assert_eq!(engine.observation(id), Some(&obs));
}

#[test]
fn test_agents_never_share_a_cell_when_racing() {
    let mut engine = started(small_config());
    let left = engine
        .spawn_agent(Position::new(2, 4), &AgentSpawnConfig::default())
        .unwrap();
    let right = engine
        .spawn_agent(Position::new(4, 4), &AgentSpawnConfig::default())
        .unwrap();

    engine.queue_action(left, Action::Move(Direction::East)).unwrap();
    engine.queue_action(right, Action::Move(Direction::West)).unwrap();
    engine.advance_n_ticks(1);

    // Lower id moves first and wins the cell
    let world = engine.world();
    assert_eq!(world.agents.get(left).unwrap().position, Position::new(3, 4));
    assert_eq!(world.agents.get(right).unwrap().position, Position::new(4, 4));
}

#[test]
fn test_food_respawns_and_decays() {
    let mut config = small_config();
    config.food.spawn_interval = 5;
    config.food.spawn_amount = 6;
    config.food.lifespan = Some(7);
    let mut engine = started(config);

    engine.advance_n_ticks(5);
    assert_eq!(engine.world().food_count(), 6);
    engine.advance_n_ticks(5);
    assert_eq!(engine.world().food_count(), 12);
    engine.advance_n_ticks(2);
    assert_eq!(engine.world().food_count(), 6);
    assert_eq!(engine.stats().last_tick.food_expired, 6);
}

#[test]
fn test_events_serialize_to_json() {
    let mut config = small_config();
    config.agents.initial_count = 2;
    let mut engine = Engine::new_with_seed(config, 5).unwrap();
    engine.start().unwrap();
    engine.advance_n_ticks(1);

    for event in engine.drain_events() {
        let json = serde_json::to_string(&event).unwrap();
        let back: SimEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.agent_id(), event.agent_id());
    }
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fathom.yaml");

    let mut config = small_config();
    config.world.seed = Some(31);
    config.agents.defaults.traits.metabolism = 1.5;
    config.save(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.world.width, 10);
    assert_eq!(loaded.world.seed, Some(31));
    assert_eq!(loaded.agents.defaults.traits.metabolism, 1.5);
}

#[test]
fn test_config_file_rejects_bad_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "world:\n  width: 0\n  height: 5\n").unwrap();

    assert!(matches!(
        Config::from_file(&path),
        Err(fathom::ConfigError::InvalidDimensions { width: 0, height: 5 })
    ));
}

#[test]
fn test_commands_from_another_thread() {
    let mut engine = started(small_config());
    let sender = engine.command_sender();

    std::thread::spawn(move || {
        sender
            .send(Command::SpawnAgent {
                position: Position::new(1, 1),
                config: AgentSpawnConfig::default(),
            })
            .unwrap();
        sender.send(Command::Step(4)).unwrap();
        sender.send(Command::Stop).unwrap();
    })
    .join()
    .unwrap();

    // Stop is applied at the first tick boundary after the steps are queued
    assert_eq!(engine.pump(), 0);
    assert_eq!(engine.status(), RunStatus::Stopped);
    assert_eq!(engine.world().population(), 1);
}
