use serde::{Deserialize, Serialize};
use std::fmt;

use super::WorkflowState;

/// Course registration approval pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    /// Saved by the student, not yet sent for approval
    #[default]
    Draft,
    /// Waiting for the advisor
    Submitted,
    /// Advisor signed off, waiting for the department head
    AdvisorApproved,
    /// Advisor sent it back to the student
    AdvisorRejected,
    /// Department head signed off
    HeadApproved,
    /// Department head sent it back to the student
    HeadRejected,
    /// Fees are due
    PaymentPending,
    /// Fees are paid, waiting for admission
    PaymentCompleted,
    /// Student is admitted for the semester
    Admitted,
    /// Withdrawn
    Cancelled,
}

impl RegistrationState {
    /// States still waiting on an approver.
    pub fn is_awaiting_approval(self) -> bool {
        matches!(self, Self::Submitted | Self::AdvisorApproved)
    }

    /// States the student may (re)submit from.
    pub fn is_resubmittable(self) -> bool {
        self.can_transition(Self::Submitted)
    }
}

impl WorkflowState for RegistrationState {
    const MACHINE: &'static str = "registration";

    const ALL: &'static [Self] = &[
        Self::Draft,
        Self::Submitted,
        Self::AdvisorApproved,
        Self::AdvisorRejected,
        Self::HeadApproved,
        Self::HeadRejected,
        Self::PaymentPending,
        Self::PaymentCompleted,
        Self::Admitted,
        Self::Cancelled,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::AdvisorApproved => "advisor_approved",
            Self::AdvisorRejected => "advisor_rejected",
            Self::HeadApproved => "head_approved",
            Self::HeadRejected => "head_rejected",
            Self::PaymentPending => "payment_pending",
            Self::PaymentCompleted => "payment_completed",
            Self::Admitted => "admitted",
            Self::Cancelled => "cancelled",
        }
    }

    fn valid_next_states(self) -> &'static [Self] {
        use RegistrationState::*;
        match self {
            Draft => &[Submitted, Cancelled],
            Submitted => &[AdvisorApproved, AdvisorRejected, Cancelled],
            AdvisorApproved => &[HeadApproved, HeadRejected, Cancelled],
            AdvisorRejected => &[Submitted, Cancelled],
            HeadApproved => &[PaymentPending, Cancelled],
            HeadRejected => &[Submitted, Cancelled],
            PaymentPending => &[PaymentCompleted, Cancelled],
            PaymentCompleted => &[Admitted],
            Admitted => &[],
            Cancelled => &[],
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RegistrationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("Invalid registration state: {s}"))
    }
}
