//! Finite-state machines for the approval pipelines.
//!
//! Each machine is a fixed, total transition table over a `Copy` state enum.
//! The table is the single source of truth: orchestrators ask it whether a
//! move is legal before touching storage, and terminal states have no
//! successors at all.

pub mod election;
pub mod registration;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use election::{ElectionSchedule, ElectionState};
pub use registration::RegistrationState;

/// A state machine rejected a move.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {machine} transition from {from} to {to}")]
pub struct TransitionError {
    pub machine: &'static str,
    pub from: String,
    pub to: String,
}

/// A state of one of the workflow machines.
pub trait WorkflowState:
    Copy + Eq + fmt::Debug + fmt::Display + FromStr + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Machine name used in errors and logs.
    const MACHINE: &'static str;

    /// Every state, in declaration order.
    const ALL: &'static [Self];

    /// Snake-case wire name of the state.
    fn as_str(self) -> &'static str;

    /// Legal successor states.
    fn valid_next_states(self) -> &'static [Self];

    fn can_transition(self, next: Self) -> bool {
        self.valid_next_states().contains(&next)
    }

    /// Validate a move and return the new state.
    fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition(next) {
            Ok(next)
        } else {
            Err(TransitionError {
                machine: Self::MACHINE,
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    /// No further transitions are possible.
    fn is_terminal(self) -> bool {
        self.valid_next_states().is_empty()
    }
}
