use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::{ElectionSchedule, ElectionState};

/// A departmental election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Election {
    pub id: String,
    pub department_id: String,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub schedule: ElectionSchedule,
    pub state: ElectionState,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A student standing in an election.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub election_id: String,
    pub student_id: String,
    pub manifesto: String,
    pub is_approved: bool,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    /// Only ever incremented, by a cast vote.
    pub vote_count: u64,
    pub created_at: DateTime<Utc>,
}

impl Candidate {
    pub fn new(
        election_id: impl Into<String>,
        student_id: impl Into<String>,
        manifesto: impl Into<String>,
    ) -> Self {
        Self {
            id: super::new_id(),
            election_id: election_id.into(),
            student_id: student_id.into(),
            manifesto: manifesto.into(),
            is_approved: false,
            approved_by: None,
            approved_at: None,
            vote_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// One ballot. At most one per (election, voter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub election_id: String,
    pub voter_id: String,
    pub candidate_id: String,
    pub cast_at: DateTime<Utc>,
}

/// Tally line for one approved candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStanding {
    pub rank: u32,
    pub candidate_id: String,
    pub student_id: String,
    pub vote_count: u64,
    pub vote_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election: Election,
    pub total_votes: u64,
    pub standings: Vec<CandidateStanding>,
}
