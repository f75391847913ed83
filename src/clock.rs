//! Simulation clock and run-status state machine.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunStatus {
    #[default]
    Initializing,
    Running,
    Paused,
    /// Terminal
    Stopped,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::Initializing => "initializing",
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Status-changing control commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    Start,
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlCommand::Start => "start",
            ControlCommand::Pause => "pause",
            ControlCommand::Resume => "resume",
            ControlCommand::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Monotonic tick counter plus run status. Never rolled back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationClock {
    current_tick: u64,
    status: RunStatus,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    #[inline]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Apply a control command.
    ///
    /// Initializing -> Running on start, Running <-> Paused on pause/resume,
    /// anything -> Stopped on stop. Stopping twice is accepted; every other
    /// pairing is rejected and leaves the status unchanged.
    pub fn apply(&mut self, command: ControlCommand) -> Result<RunStatus, EngineError> {
        let next = match (self.status, command) {
            (RunStatus::Initializing, ControlCommand::Start) => RunStatus::Running,
            (RunStatus::Running, ControlCommand::Pause) => RunStatus::Paused,
            (RunStatus::Paused, ControlCommand::Resume) => RunStatus::Running,
            (_, ControlCommand::Stop) => RunStatus::Stopped,
            (from, command) => return Err(EngineError::InvalidTransition { from, command }),
        };
        if next != self.status {
            log::info!("run status {} -> {} at tick {}", self.status, next, self.current_tick);
        }
        self.status = next;
        Ok(next)
    }

    /// Count one completed tick
    pub(crate) fn advance(&mut self) -> u64 {
        self.current_tick += 1;
        self.current_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.status(), RunStatus::Initializing);

        assert_eq!(clock.apply(ControlCommand::Start).unwrap(), RunStatus::Running);
        assert_eq!(clock.apply(ControlCommand::Pause).unwrap(), RunStatus::Paused);
        assert_eq!(clock.apply(ControlCommand::Resume).unwrap(), RunStatus::Running);
        assert_eq!(clock.apply(ControlCommand::Stop).unwrap(), RunStatus::Stopped);
    }

    #[test]
    fn test_stop_from_any_state() {
        for setup in [
            vec![],
            vec![ControlCommand::Start],
            vec![ControlCommand::Start, ControlCommand::Pause],
        ] {
            let mut clock = SimulationClock::new();
            for command in setup {
                clock.apply(command).unwrap();
            }
            assert_eq!(clock.apply(ControlCommand::Stop).unwrap(), RunStatus::Stopped);
        }
    }

    #[test]
    fn test_stopped_is_terminal() {
        let mut clock = SimulationClock::new();
        clock.apply(ControlCommand::Stop).unwrap();

        for command in [ControlCommand::Start, ControlCommand::Resume, ControlCommand::Pause] {
            assert!(matches!(
                clock.apply(command),
                Err(EngineError::InvalidTransition { from: RunStatus::Stopped, .. })
            ));
        }
        assert_eq!(clock.status(), RunStatus::Stopped);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut clock = SimulationClock::new();
        assert!(clock.apply(ControlCommand::Pause).is_err());
        assert!(clock.apply(ControlCommand::Resume).is_err());

        clock.apply(ControlCommand::Start).unwrap();
        assert!(clock.apply(ControlCommand::Start).is_err());
        assert!(clock.apply(ControlCommand::Resume).is_err());
        assert_eq!(clock.status(), RunStatus::Running);
    }

    #[test]
    fn test_advance_is_monotonic() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.advance(), 1);
        assert_eq!(clock.advance(), 2);
        assert_eq!(clock.current_tick(), 2);
    }
}
