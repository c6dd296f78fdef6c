use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state_machine::RegistrationState;

/// A student's course registration for one semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub student_id: String,
    pub semester: String,
    pub department_id: String,
    /// Ordered, without duplicates.
    pub course_ids: Vec<String>,
    pub state: RegistrationState,
    pub advisor_id: Option<String>,
    pub advisor_approved_at: Option<DateTime<Utc>>,
    pub advisor_rejection_reason: Option<String>,
    pub head_approved_at: Option<DateTime<Utc>>,
    pub head_rejection_reason: Option<String>,
    pub payment_id: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub admitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn new(
        student_id: impl Into<String>,
        semester: impl Into<String>,
        department_id: impl Into<String>,
        course_ids: Vec<String>,
        state: RegistrationState,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            student_id: student_id.into(),
            semester: semester.into(),
            department_id: department_id.into(),
            course_ids: dedup_preserving_order(course_ids),
            state,
            advisor_id: None,
            advisor_approved_at: None,
            advisor_rejection_reason: None,
            head_approved_at: None,
            head_rejection_reason: None,
            payment_id: None,
            paid_at: None,
            admitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Drop repeated ids, keeping the first occurrence.
pub(crate) fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
