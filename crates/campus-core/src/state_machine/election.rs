use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::WorkflowState;

/// Election lifecycle. Strictly linear: no skips, no way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionState {
    #[default]
    Created,
    NominationOpen,
    NominationClosed,
    VotingOpen,
    VotingClosed,
    ResultsPublished,
}

impl WorkflowState for ElectionState {
    const MACHINE: &'static str = "election";

    const ALL: &'static [Self] = &[
        Self::Created,
        Self::NominationOpen,
        Self::NominationClosed,
        Self::VotingOpen,
        Self::VotingClosed,
        Self::ResultsPublished,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::NominationOpen => "nomination_open",
            Self::NominationClosed => "nomination_closed",
            Self::VotingOpen => "voting_open",
            Self::VotingClosed => "voting_closed",
            Self::ResultsPublished => "results_published",
        }
    }

    fn valid_next_states(self) -> &'static [Self] {
        use ElectionState::*;
        match self {
            Created => &[NominationOpen],
            NominationOpen => &[NominationClosed],
            NominationClosed => &[VotingOpen],
            VotingOpen => &[VotingClosed],
            VotingClosed => &[ResultsPublished],
            ResultsPublished => &[],
        }
    }
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ElectionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("Invalid election state: {s}"))
    }
}

/// The four scheduling boundaries of an election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSchedule {
    pub nomination_start: DateTime<Utc>,
    pub nomination_end: DateTime<Utc>,
    pub voting_start: DateTime<Utc>,
    pub voting_end: DateTime<Utc>,
}

impl ElectionSchedule {
    /// Check that the windows are ordered and do not overlap.
    pub fn validate(&self) -> Result<(), String> {
        if self.nomination_start >= self.nomination_end {
            return Err("nomination must start before it ends".into());
        }
        if self.nomination_end > self.voting_start {
            return Err("voting cannot start before nomination ends".into());
        }
        if self.voting_start >= self.voting_end {
            return Err("voting must start before it ends".into());
        }
        Ok(())
    }

    /// Suggest the single step an election in `state` is due for at `now`.
    ///
    /// Never suggests more than one step and never persists anything; the
    /// caller applies the suggestion through the validated transition.
    /// `voting_closed -> results_published` is always a manual step.
    pub fn advance_from(&self, state: ElectionState, now: DateTime<Utc>) -> Option<ElectionState> {
        use ElectionState::*;
        match state {
            Created if now >= self.nomination_start => Some(NominationOpen),
            NominationOpen if now >= self.nomination_end => Some(NominationClosed),
            NominationClosed if now >= self.voting_start => Some(VotingOpen),
            VotingOpen if now >= self.voting_end => Some(VotingClosed),
            _ => None,
        }
    }
}
