//! Polling cycle states.
//!
//! ```text
//! Idle --[new payload]--> Changed --> Executing --> Publishing --> Sleeping
//!  |                                      |                          |
//!  +--[absent / undecodable / same ts]----+--[fault]---> Sleeping    |
//!                                                                    v
//!                                                                  Idle
//! ```

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot transition from {from:?} to {to:?}")]
pub struct TransitionError<S: std::fmt::Debug> {
    pub from: S,
    pub to: S,
}

/// Trait for status enums that represent state machines.
///
/// Implementors define valid state transitions and get validated
/// transition methods for free.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, TransitionError<Self>> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(TransitionError {
                from: *self,
                to: target,
            })
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

/// Where the polling loop is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CycleState {
    /// Waiting to read the input key.
    #[default]
    Idle,
    /// A new payload was detected.
    Changed,
    /// The handler is running.
    Executing,
    /// The result is being written.
    Publishing,
    /// Waiting out the poll interval.
    Sleeping,
}

impl StateMachine for CycleState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use CycleState::*;
        matches!(
            (self, target),
            (Idle, Changed)
                | (Idle, Sleeping)
                | (Changed, Executing)
                | (Changed, Sleeping)
                | (Executing, Publishing)
                | (Executing, Sleeping)
                | (Publishing, Sleeping)
                | (Sleeping, Idle)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use CycleState::*;
        match self {
            Idle => vec![Changed, Sleeping],
            Changed => vec![Executing, Sleeping],
            Executing => vec![Publishing, Sleeping],
            Publishing => vec![Sleeping],
            Sleeping => vec![Idle],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CycleState::*;

    #[test]
    fn full_cycle_is_valid() {
        let mut state = Idle;
        for next in [Changed, Executing, Publishing, Sleeping, Idle] {
            state = state.transition_to(next).unwrap();
        }
        assert_eq!(state, Idle);
    }

    #[test]
    fn cannot_skip_change_detection() {
        assert_eq!(
            Idle.transition_to(Executing),
            Err(TransitionError {
                from: Idle,
                to: Executing
            })
        );
    }

    #[test]
    fn cannot_publish_without_executing() {
        assert!(Changed.transition_to(Publishing).is_err());
    }

    #[test]
    fn every_state_can_reach_sleeping_or_idle() {
        for state in [Idle, Changed, Executing, Publishing] {
            assert!(state.can_transition_to(&Sleeping), "{:?}", state);
        }
        assert!(Sleeping.can_transition_to(&Idle));
    }

    #[test]
    fn no_state_is_terminal() {
        for state in [Idle, Changed, Executing, Publishing, Sleeping] {
            assert!(!state.is_terminal());
        }
    }
}
