//! Department elections: nomination, candidate vetting, voting and tally.

use std::sync::Arc;

use campus_state::{Collection, DocumentStore, Filter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use super::locks::EntityLocks;
use super::{publish, save_transition};
use crate::domain::{
    Candidate, CandidateStanding, Election, ElectionResults, User, UserRole, Vote, WorkflowError,
    WorkflowResult,
};
use crate::events::{Event, EventPublisher, EventType};
use crate::metrics::METRICS;
use crate::obs::WorkflowSpan;
use crate::state_machine::{ElectionSchedule, ElectionState, WorkflowState};
use crate::strategies::round2;

/// Input for [`ElectionWorkflow::create_election`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewElection {
    pub department_id: String,
    pub title: String,
    pub description: String,
    pub schedule: ElectionSchedule,
    pub created_by: String,
}

pub struct ElectionWorkflow {
    elections: Collection<Election>,
    candidates: Collection<Candidate>,
    votes: Collection<Vote>,
    users: Collection<User>,
    publisher: Arc<EventPublisher>,
    locks: EntityLocks,
}

impl ElectionWorkflow {
    pub fn new(store: Arc<dyn DocumentStore>, publisher: Arc<EventPublisher>) -> Self {
        Self {
            elections: Collection::new(store.clone()),
            candidates: Collection::new(store.clone()),
            votes: Collection::new(store.clone()),
            users: Collection::new(store),
            publisher,
            locks: EntityLocks::new(),
        }
    }

    pub async fn election(&self, election_id: &str) -> WorkflowResult<Election> {
        Ok(self.elections.fetch(election_id).await?)
    }

    #[instrument(skip(self, input), fields(department_id = %input.department_id))]
    pub async fn create_election(&self, input: NewElection) -> WorkflowResult<Election> {
        input
            .schedule
            .validate()
            .map_err(|reason| WorkflowError::precondition(format!("invalid schedule: {reason}")))?;

        let now = Utc::now();
        let election = Election {
            id: crate::domain::new_id(),
            department_id: input.department_id,
            title: input.title,
            description: input.description,
            schedule: input.schedule,
            state: ElectionState::Created,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        let election = self.elections.create(&election).await?;
        info!(election_id = %election.id, "election created");
        Ok(election)
    }

    /// Apply one validated step of the election lifecycle.
    #[instrument(skip(self))]
    pub async fn transition_state(
        &self,
        election_id: &str,
        next: ElectionState,
    ) -> WorkflowResult<Election> {
        let _span = WorkflowSpan::enter("election", election_id);
        let mut election = self.elections.fetch(election_id).await?;
        let from = election.state;
        election.state = from.transition(next)?;
        election.updated_at = Utc::now();
        save_transition(&self.elections, &election, from, next).await?;

        if next == ElectionState::VotingOpen {
            publish(
                &self.publisher,
                Event::new(
                    EventType::ElectionVotingStarted,
                    json!({
                        "election_id": election.id,
                        "department_id": election.department_id,
                        "title": election.title,
                    }),
                ),
            )
            .await;
        }
        Ok(election)
    }

    /// Apply the step the schedule says is due at `now`, if any.
    #[instrument(skip(self))]
    pub async fn auto_advance(
        &self,
        election_id: &str,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Option<Election>> {
        let election = self.elections.fetch(election_id).await?;
        match election.schedule.advance_from(election.state, now) {
            Some(next) => Ok(Some(self.transition_state(election_id, next).await?)),
            None => Ok(None),
        }
    }

    /// Advance every election that is due. A failing election is logged and
    /// skipped. Returns the elections that moved.
    #[instrument(skip(self))]
    pub async fn auto_advance_all(&self, now: DateTime<Utc>) -> WorkflowResult<Vec<Election>> {
        let schedulable = ElectionState::ALL
            .iter()
            .filter(|s| !s.is_terminal() && **s != ElectionState::VotingClosed)
            .map(|s| s.as_str());
        let elections = self
            .elections
            .find(&Filter::all().any_of("state", schedulable))
            .await?;

        let mut advanced = Vec::new();
        for election in elections {
            match self.auto_advance(&election.id, now).await {
                Ok(Some(moved)) => advanced.push(moved),
                Ok(None) => {}
                Err(e) => warn!(election_id = %election.id, error = %e, "auto-advance failed"),
            }
        }
        Ok(advanced)
    }

    /// Nominate a student while nomination is open. One candidacy per student.
    #[instrument(skip(self, manifesto))]
    pub async fn apply_as_candidate(
        &self,
        election_id: &str,
        student_id: &str,
        manifesto: &str,
    ) -> WorkflowResult<Candidate> {
        let _guard = self
            .locks
            .lock(format!("candidacy:{election_id}:{student_id}"))
            .await;
        let election = self.elections.fetch(election_id).await?;
        if election.state != ElectionState::NominationOpen {
            return Err(WorkflowError::precondition("nomination period is not open"));
        }
        let student = self.users.fetch(student_id).await?;
        if student.role != UserRole::Student {
            return Err(WorkflowError::unauthorized(student_id, "stand for election"));
        }
        let existing = self
            .candidates
            .find_one(
                &Filter::all()
                    .eq("election_id", election_id)
                    .eq("student_id", student_id),
            )
            .await?;
        if existing.is_some() {
            return Err(WorkflowError::precondition(
                "already applied for this election",
            ));
        }

        let candidate = self
            .candidates
            .create(&Candidate::new(election_id, student_id, manifesto))
            .await?;
        info!(candidate_id = %candidate.id, "candidacy submitted");
        Ok(candidate)
    }

    #[instrument(skip(self))]
    pub async fn approve_candidate(
        &self,
        candidate_id: &str,
        approver_id: &str,
    ) -> WorkflowResult<Candidate> {
        let approver = self.users.fetch(approver_id).await?;
        if approver.role == UserRole::Student {
            return Err(WorkflowError::unauthorized(approver_id, "approve candidates"));
        }
        let mut candidate = self.candidates.fetch(candidate_id).await?;
        if candidate.is_approved {
            return Err(WorkflowError::precondition("candidate already approved"));
        }

        candidate.is_approved = true;
        candidate.approved_by = Some(approver_id.to_string());
        candidate.approved_at = Some(Utc::now());
        self.candidates
            .save_if(&candidate, &Filter::all().eq("is_approved", false))
            .await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::ElectionCandidateApproved,
                json!({
                    "candidate_id": candidate.id,
                    "election_id": candidate.election_id,
                    "student_id": candidate.student_id,
                }),
            )
            .triggered_by(approver_id),
        )
        .await;
        Ok(candidate)
    }

    /// Withdraw a candidacy. Refused once the candidate has received votes.
    #[instrument(skip(self))]
    pub async fn reject_candidate(&self, candidate_id: &str) -> WorkflowResult<Candidate> {
        let candidate = self.candidates.fetch(candidate_id).await?;
        let _guard = self
            .locks
            .lock(format!("election:{}", candidate.election_id))
            .await;
        let candidate = self.candidates.fetch(candidate_id).await?;
        if candidate.vote_count > 0 {
            return Err(WorkflowError::precondition(
                "cannot reject a candidate who has received votes",
            ));
        }
        self.candidates.delete(candidate_id).await?;
        info!(candidate_id, "candidacy rejected");
        Ok(candidate)
    }

    /// Cast the voter's single ballot in an election.
    #[instrument(skip(self))]
    pub async fn cast_vote(
        &self,
        election_id: &str,
        voter_id: &str,
        candidate_id: &str,
    ) -> WorkflowResult<Vote> {
        let _span = WorkflowSpan::enter("election", election_id);
        let _guard = self.locks.lock(format!("election:{election_id}")).await;

        let election = self.elections.fetch(election_id).await?;
        if election.state != ElectionState::VotingOpen {
            return Err(WorkflowError::precondition("voting is not open"));
        }
        if self.has_voted(election_id, voter_id).await? {
            return Err(WorkflowError::precondition("already voted in this election"));
        }
        let mut candidate = self.candidates.fetch(candidate_id).await?;
        if candidate.election_id != election_id {
            return Err(WorkflowError::precondition(format!(
                "candidate {candidate_id} is not standing in election {election_id}"
            )));
        }
        if !candidate.is_approved {
            return Err(WorkflowError::precondition("candidate not approved"));
        }

        // Count first so a failed count never leaves a stored ballot behind.
        let previous = candidate.vote_count;
        candidate.vote_count += 1;
        self.candidates
            .save_if(&candidate, &Filter::all().eq("vote_count", previous))
            .await?;

        let ballot = Vote {
            id: crate::domain::new_id(),
            election_id: election_id.to_string(),
            voter_id: voter_id.to_string(),
            candidate_id: candidate_id.to_string(),
            cast_at: Utc::now(),
        };
        let vote = match self.votes.create(&ballot).await {
            Ok(vote) => vote,
            Err(err) => {
                candidate.vote_count = previous;
                if let Err(undo) = self
                    .candidates
                    .save_if(&candidate, &Filter::all().eq("vote_count", previous + 1))
                    .await
                {
                    warn!(candidate_id, error = %undo, "failed to roll back vote count");
                }
                return Err(err.into());
            }
        };
        METRICS.inc_votes();
        Ok(vote)
    }

    /// Approved candidates ranked by votes, with vote shares.
    pub async fn results(&self, election_id: &str) -> WorkflowResult<ElectionResults> {
        let election = self.elections.fetch(election_id).await?;
        let mut candidates = self.candidates(election_id, true).await?;
        candidates.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        let total_votes = self
            .votes
            .find(&Filter::all().eq("election_id", election_id))
            .await?
            .len() as u64;

        let mut standings: Vec<CandidateStanding> = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.into_iter().enumerate() {
            let rank = match standings.last() {
                Some(prev) if prev.vote_count == candidate.vote_count => prev.rank,
                _ => index as u32 + 1,
            };
            let vote_percentage = if total_votes > 0 {
                round2(candidate.vote_count as f64 / total_votes as f64 * 100.0)
            } else {
                0.0
            };
            standings.push(CandidateStanding {
                rank,
                candidate_id: candidate.id,
                student_id: candidate.student_id,
                vote_count: candidate.vote_count,
                vote_percentage,
            });
        }

        Ok(ElectionResults {
            election,
            total_votes,
            standings,
        })
    }

    /// Close the election for good and return the final tally.
    #[instrument(skip(self))]
    pub async fn publish_results(&self, election_id: &str) -> WorkflowResult<ElectionResults> {
        self.transition_state(election_id, ElectionState::ResultsPublished)
            .await?;
        self.results(election_id).await
    }

    /// Elections, newest first, optionally for one department.
    pub async fn elections(&self, department_id: Option<&str>) -> WorkflowResult<Vec<Election>> {
        let filter = match department_id {
            Some(department_id) => Filter::all().eq("department_id", department_id),
            None => Filter::all(),
        };
        let mut items = self.elections.find(&filter).await?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Candidates of an election in application order.
    pub async fn candidates(
        &self,
        election_id: &str,
        approved_only: bool,
    ) -> WorkflowResult<Vec<Candidate>> {
        let mut filter = Filter::all().eq("election_id", election_id);
        if approved_only {
            filter = filter.eq("is_approved", true);
        }
        let mut items = self.candidates.find(&filter).await?;
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    pub async fn has_voted(&self, election_id: &str, voter_id: &str) -> WorkflowResult<bool> {
        Ok(self
            .votes
            .find_one(
                &Filter::all()
                    .eq("election_id", election_id)
                    .eq("voter_id", voter_id),
            )
            .await?
            .is_some())
    }
}
