//! Mission states and terminal reasons

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single mission run.
///
/// `Idle -> Running -> {Succeeded, Failed, TimedOut}`; terminal states are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionState {
    Idle,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl MissionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MissionState::Succeeded | MissionState::Failed | MissionState::TimedOut
        )
    }

    /// Whether moving to `next` is a legal transition
    pub fn can_transition_to(self, next: MissionState) -> bool {
        match self {
            MissionState::Idle => next == MissionState::Running,
            MissionState::Running => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissionState::Idle => "idle",
            MissionState::Running => "running",
            MissionState::Succeeded => "succeeded",
            MissionState::Failed => "failed",
            MissionState::TimedOut => "timed_out",
        };
        write!(f, "{}", name)
    }
}

/// Why a mission reached its terminal state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    /// Final step reached
    Arrived,
    /// Global mission timeout expired
    Timeout { elapsed_ms: u64 },
    /// Vehicle reported a hard fault or an unrecoverable read error
    Fault { description: String },
    /// Vehicle link was down when the mission started
    ConnectionFailed { description: String },
    /// External stop signal
    Aborted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_are_absorbing() {
        for terminal in [MissionState::Succeeded, MissionState::Failed, MissionState::TimedOut] {
            assert!(terminal.is_terminal());
            for next in [
                MissionState::Idle,
                MissionState::Running,
                MissionState::Succeeded,
                MissionState::Failed,
                MissionState::TimedOut,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_running_transitions() {
        assert!(MissionState::Idle.can_transition_to(MissionState::Running));
        assert!(!MissionState::Idle.can_transition_to(MissionState::Succeeded));
        assert!(MissionState::Running.can_transition_to(MissionState::TimedOut));
        assert!(!MissionState::Running.can_transition_to(MissionState::Idle));
    }
}
