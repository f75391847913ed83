//! The simulation engine: owns the world and the clock, buffers inbound
//! commands and runs the tick pipeline.
//!
//! A tick runs these phases in order, and always runs all of them:
//!
//! 1. every live agent, in ascending id order: action, drain, aging, death
//! 2. environment update (food decay and respawn)
//! 3. grid/store consistency check
//! 4. clock advance, observation regeneration
//! 5. statistics and snapshot
//!
//! Commands sent through [`Engine::command_sender`] are only applied between
//! ticks.

use crate::action::{Action, ActionOutcome, ActionRequest};
use crate::agent::{AgentId, AgentSpawnConfig, DeathCause};
use crate::clock::{ControlCommand, RunStatus, SimulationClock};
use crate::config::Config;
use crate::error::{ConfigError, EngineError};
use crate::events::{SimEvent, WorldStateSnapshot};
use crate::geometry::Position;
use crate::mechanics;
use crate::observation::{self, Observation};
use crate::policy::Controller;
use crate::stats::{Stats, TickActivity};
use crate::world::World;
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};

/// Inbound command from an orchestrator
#[derive(Debug, Clone)]
pub enum Command {
    /// Rebuild the world from `config` and start it
    Start(Box<Config>),
    Step(u64),
    Pause,
    Resume,
    Stop,
    /// Action for the agent's next tick; the last one received wins
    Act { agent_id: AgentId, action: Action },
    /// Undecoded action; malformed requests become `DoNothing`
    ActRaw {
        agent_id: AgentId,
        request: ActionRequest,
    },
    SpawnAgent {
        position: Position,
        config: AgentSpawnConfig,
    },
}

/// Simulation engine
pub struct Engine {
    world: World,
    clock: SimulationClock,

    // Buffered until the next tick
    pending_actions: BTreeMap<AgentId, Action>,
    pending_steps: u64,
    activity: TickActivity,

    inbox: Receiver<Command>,
    sender: Sender<Command>,

    events: Vec<SimEvent>,
    observations: BTreeMap<AgentId, Observation>,
    stats: Stats,
}

impl Engine {
    /// Create an engine; refuses an invalid config
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Ok(Self::with_world(World::new(config)?))
    }

    /// Create an engine with a specific seed
    pub fn new_with_seed(config: Config, seed: u64) -> Result<Self, ConfigError> {
        Ok(Self::with_world(World::new_with_seed(config, seed)?))
    }

    fn with_world(world: World) -> Self {
        let (sender, inbox) = mpsc::channel();
        log::info!(
            "engine created: {}x{} grid, seed {}",
            world.grid.width(),
            world.grid.height(),
            world.seed()
        );

        Self {
            world,
            clock: SimulationClock::new(),
            pending_actions: BTreeMap::new(),
            pending_steps: 0,
            activity: TickActivity::default(),
            inbox,
            sender,
            events: Vec::new(),
            observations: BTreeMap::new(),
            stats: Stats::new(),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct world access for setup and tooling. Mutations bypass the
    /// event stream.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    #[inline]
    pub fn status(&self) -> RunStatus {
        self.clock.status()
    }

    #[inline]
    pub fn current_tick(&self) -> u64 {
        self.clock.current_tick()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Handle for sending commands from another thread
    pub fn command_sender(&self) -> Sender<Command> {
        self.sender.clone()
    }

    /// Start the run: populate the world and publish first observations
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.clock.apply(ControlCommand::Start)?;

        let food_count = self.world.config.food.initial_count;
        let food = self.world.spawn_random_food(food_count);
        let defaults = self.world.config.agents.defaults.clone();
        let agent_count = self.world.config.agents.initial_count;
        let agents = self.world.spawn_random_agents(agent_count, &defaults);

        if agents.len() < agent_count || food.len() < food_count {
            log::warn!(
                "world too crowded: placed {}/{} agents and {}/{} pellets",
                agents.len(),
                agent_count,
                food.len(),
                food_count
            );
        }
        log::info!(
            "started with {} agents and {} pellets (seed {})",
            self.world.population(),
            self.world.food_count(),
            self.world.seed()
        );

        let tick = self.clock.current_tick();
        for &agent_id in &agents {
            self.events.push(SimEvent::AgentSpawned { agent_id, tick });
        }
        let mut activity = std::mem::take(&mut self.activity);
        activity.spawned += agents.len();
        activity.food_spawned += food.len();

        self.refresh_observations(tick);
        self.stats.update(&self.world, tick, activity);
        self.events.push(SimEvent::Snapshot(self.snapshot()));
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.clock.apply(ControlCommand::Pause).map(|_| ())
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        self.clock.apply(ControlCommand::Resume).map(|_| ())
    }

    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.clock.apply(ControlCommand::Stop)?;
        self.pending_actions.clear();
        self.pending_steps = 0;
        Ok(())
    }

    /// Apply one command immediately. Must not be called mid-tick, which
    /// `&mut self` guarantees.
    pub fn submit(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Start(config) => {
                if self.status() != RunStatus::Initializing {
                    return Err(EngineError::InvalidTransition {
                        from: self.status(),
                        command: ControlCommand::Start,
                    });
                }
                // The discarded world's ids restart at 0, so nothing it
                // reported may reach consumers
                self.world = World::new(*config)?;
                self.pending_actions.clear();
                self.observations.clear();
                self.events.clear();
                self.activity = TickActivity::default();
                self.stats = Stats::new();
                self.start()
            }
            Command::Step(n) => {
                self.advance_n_ticks(n);
                Ok(())
            }
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Stop => self.stop(),
            Command::Act { agent_id, action } => self.queue_action(agent_id, action),
            Command::ActRaw { agent_id, request } => {
                self.queue_action(agent_id, Action::decode_or_idle(agent_id, &request))
            }
            Command::SpawnAgent { position, config } => {
                self.spawn_agent(position, &config).map(|_| ())
            }
        }
    }

    /// Buffer an action for the agent's next tick
    pub fn queue_action(&mut self, agent_id: AgentId, action: Action) -> Result<(), EngineError> {
        if !self.world.agents.contains(agent_id) {
            log::warn!("action {:?} for unknown agent {}", action, agent_id);
            return Err(EngineError::AgentNotFound(agent_id));
        }
        if let Some(previous) = self.pending_actions.insert(agent_id, action) {
            log::debug!("agent {}: {:?} replaced by {:?}", agent_id, previous, action);
        }
        Ok(())
    }

    /// Spawn an agent between ticks. Traits outside the configured bounds
    /// are clamped.
    pub fn spawn_agent(
        &mut self,
        position: Position,
        config: &AgentSpawnConfig,
    ) -> Result<AgentId, EngineError> {
        let bounds = &self.world.config.agents.trait_bounds;
        let config = match bounds.check(config) {
            Ok(()) => config.clone(),
            Err(err) => {
                log::warn!("{}; clamping spawn config", err);
                bounds.clamp(config)
            }
        };

        let agent_id = self.world.spawn_agent(position, &config)?;
        self.activity.spawned += 1;
        self.events.push(SimEvent::AgentSpawned {
            agent_id,
            tick: self.current_tick(),
        });
        if let Some(obs) = observation::generate_observation(&self.world, agent_id) {
            self.observations.insert(agent_id, obs);
        }
        Ok(agent_id)
    }

    /// Run up to `n` ticks, stopping early once the engine is no longer
    /// running. Buffered commands are applied before every tick. Returns
    /// the number of ticks executed.
    pub fn advance_n_ticks(&mut self, n: u64) -> u64 {
        let mut done = 0;
        while done < n {
            self.drain_inbox();
            if !self.clock.is_running() {
                break;
            }
            self.run_tick();
            done += 1;
        }
        done
    }

    /// Apply buffered commands, then run any steps they requested
    pub fn pump(&mut self) -> u64 {
        self.drain_inbox();
        let mut total = 0;
        while self.pending_steps > 0 && self.clock.is_running() {
            let steps = std::mem::take(&mut self.pending_steps);
            total += self.advance_n_ticks(steps);
        }
        self.pending_steps = 0;
        total
    }

    fn drain_inbox(&mut self) {
        while let Ok(command) = self.inbox.try_recv() {
            let result = match command {
                Command::Step(n) => {
                    self.pending_steps += n;
                    Ok(())
                }
                other => self.submit(other),
            };
            if let Err(err) = result {
                log::warn!("command rejected: {}", err);
            }
        }
    }

    fn run_tick(&mut self) {
        let tick = self.clock.current_tick() + 1;
        let mut activity = std::mem::take(&mut self.activity);
        let mut actions = std::mem::take(&mut self.pending_actions);

        // Phase 1: agents, ascending id
        for agent_id in self.world.agents.ids() {
            let action = actions.remove(&agent_id).unwrap_or_default();
            let Some(step) = mechanics::step_agent(&mut self.world, agent_id, action) else {
                continue;
            };
            if matches!(step.outcome, ActionOutcome::Ate { .. }) {
                activity.food_eaten += 1;
            }
            self.events.push(SimEvent::Reward {
                agent_id,
                tick,
                reward: step.reward,
            });
            if let Some(cause) = step.death {
                activity.died += 1;
                self.events.push(SimEvent::AgentDied {
                    agent_id,
                    cause,
                    tick,
                });
            }
        }
        for agent_id in actions.keys() {
            log::debug!("dropping action for agent {} which is gone", agent_id);
        }

        // Phase 2: environment
        let report = self.world.update_environment(tick);
        activity.food_expired += report.expired.len();
        activity.food_spawned += report.spawned.len();

        // Phase 3: consistency
        if self.world.config.simulation.verify_invariants {
            for agent_id in self.world.reconcile() {
                activity.died += 1;
                self.events.push(SimEvent::AgentDied {
                    agent_id,
                    cause: DeathCause::Removed,
                    tick,
                });
            }
        }

        // Phase 4: clock and observations
        self.clock.advance();
        self.refresh_observations(tick);

        // Phase 5: statistics
        self.stats.update(&self.world, tick, activity);
        self.events.push(SimEvent::Snapshot(self.snapshot()));

        let interval = self.world.config.logging.stats_interval;
        if interval > 0 && tick % interval == 0 {
            log::info!("{}", self.stats);
        }
        if activity.died > 0 && self.world.is_extinct() {
            log::info!("population extinct at tick {}", tick);
        }
    }

    fn refresh_observations(&mut self, tick: u64) {
        self.observations = observation::generate_all(&self.world);
        self.events
            .extend(self.observations.iter().map(|(&agent_id, obs)| SimEvent::Observation {
                agent_id,
                tick,
                observation: obs.clone(),
            }));
    }

    /// Take every event produced since the last drain
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    /// Observation published at the last tick boundary
    pub fn observation(&self, agent_id: AgentId) -> Option<&Observation> {
        self.observations.get(&agent_id)
    }

    /// Observation computed from the current world state
    pub fn observe(&self, agent_id: AgentId) -> Option<Observation> {
        observation::generate_observation(&self.world, agent_id)
    }

    pub fn observations(&self) -> &BTreeMap<AgentId, Observation> {
        &self.observations
    }

    pub fn snapshot(&self) -> WorldStateSnapshot {
        WorldStateSnapshot::capture(&self.world, self.current_tick(), self.status())
    }

    /// Drive up to `ticks` ticks with `controller` choosing every action.
    /// Events are drained after each tick and discarded.
    pub fn run_with_controller<C>(&mut self, controller: &mut C, ticks: u64) -> u64
    where
        C: Controller + ?Sized,
    {
        self.run_with_callback(controller, ticks, |_, _| {})
    }

    /// Like [`Engine::run_with_controller`], handing each tick's events to
    /// `callback`
    pub fn run_with_callback<C, F>(&mut self, controller: &mut C, ticks: u64, mut callback: F) -> u64
    where
        C: Controller + ?Sized,
        F: FnMut(&Engine, Vec<SimEvent>),
    {
        let mut done = 0;
        while done < ticks {
            let decisions: Vec<(AgentId, Action)> = self
                .observations
                .values()
                .map(|obs| (obs.agent_id, controller.decide(obs)))
                .collect();
            for (agent_id, action) in decisions {
                if let Err(err) = self.queue_action(agent_id, action) {
                    log::debug!("{} skipped: {}", controller.kind(), err);
                }
            }

            if self.advance_n_ticks(1) == 0 {
                break;
            }
            done += 1;
            let events = self.drain_events();
            callback(self, events);
        }
        done
    }
}
