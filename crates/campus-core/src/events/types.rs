use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The fixed set of domain event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RegistrationSubmitted,
    RegistrationAdvisorApproved,
    RegistrationAdvisorRejected,
    RegistrationHeadApproved,
    RegistrationHeadRejected,
    RegistrationAdmitted,
    AttendanceWarning,
    AttendanceCritical,
    AssignmentCreated,
    AssignmentGraded,
    ResultPublished,
    ForumAnswerPosted,
    ForumAnswerAccepted,
    ElectionCandidateApproved,
    ElectionVotingStarted,
    NoticePublished,
    AnnouncementCreated,
}

impl EventType {
    pub const ALL: [EventType; 17] = [
        Self::RegistrationSubmitted,
        Self::RegistrationAdvisorApproved,
        Self::RegistrationAdvisorRejected,
        Self::RegistrationHeadApproved,
        Self::RegistrationHeadRejected,
        Self::RegistrationAdmitted,
        Self::AttendanceWarning,
        Self::AttendanceCritical,
        Self::AssignmentCreated,
        Self::AssignmentGraded,
        Self::ResultPublished,
        Self::ForumAnswerPosted,
        Self::ForumAnswerAccepted,
        Self::ElectionCandidateApproved,
        Self::ElectionVotingStarted,
        Self::NoticePublished,
        Self::AnnouncementCreated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RegistrationSubmitted => "registration_submitted",
            Self::RegistrationAdvisorApproved => "registration_advisor_approved",
            Self::RegistrationAdvisorRejected => "registration_advisor_rejected",
            Self::RegistrationHeadApproved => "registration_head_approved",
            Self::RegistrationHeadRejected => "registration_head_rejected",
            Self::RegistrationAdmitted => "registration_admitted",
            Self::AttendanceWarning => "attendance_warning",
            Self::AttendanceCritical => "attendance_critical",
            Self::AssignmentCreated => "assignment_created",
            Self::AssignmentGraded => "assignment_graded",
            Self::ResultPublished => "result_published",
            Self::ForumAnswerPosted => "forum_answer_posted",
            Self::ForumAnswerAccepted => "forum_answer_accepted",
            Self::ElectionCandidateApproved => "election_candidate_approved",
            Self::ElectionVotingStarted => "election_voting_started",
            Self::NoticePublished => "notice_published",
            Self::AnnouncementCreated => "announcement_created",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid event type: {s}"))
    }
}

/// A transient domain event. The payload carries copies of entity fields,
/// never the entity itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub data: Value,
    pub triggered_by: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(event_type: EventType, data: Value) -> Self {
        Self {
            event_type,
            data,
            triggered_by: None,
            timestamp: Utc::now(),
        }
    }

    pub fn triggered_by(mut self, actor: impl Into<String>) -> Self {
        self.triggered_by = Some(actor.into());
        self
    }

    /// String field of the payload, if present.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }
}
