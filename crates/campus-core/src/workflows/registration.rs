//! Course registration approval pipeline.
//!
//! draft → submitted → advisor_approved → payment_pending → payment_completed
//! → admitted, with rejection loops back to `submitted` and cancellation from
//! any non-terminal state.

use std::sync::Arc;

use campus_state::{Collection, DocumentStore, Filter};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use super::payment::{PaymentGateway, PaymentReceipt, PaymentRequest, PaymentStatus};
use super::{publish, save_transition};
use crate::config::WorkflowConfig;
use crate::domain::{Course, Registration, User, UserRole, WorkflowError, WorkflowResult};
use crate::events::{Event, EventPublisher, EventType};
use crate::obs::WorkflowSpan;
use crate::state_machine::{RegistrationState, WorkflowState};

/// Whose approval queue to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingScope {
    /// Submitted registrations assigned to this advisor.
    Advisor(String),
    /// Advisor-approved registrations of this department, for its head.
    Department(String),
    /// Everything awaiting any approval.
    All,
}

/// Outcome of [`RegistrationWorkflow::initiate_payment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentInitiation {
    pub registration: Registration,
    pub payment: PaymentReceipt,
    pub amount: u64,
}

pub struct RegistrationWorkflow {
    registrations: Collection<Registration>,
    users: Collection<User>,
    courses: Collection<Course>,
    publisher: Arc<EventPublisher>,
    payment: Arc<dyn PaymentGateway>,
    config: WorkflowConfig,
}

impl RegistrationWorkflow {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        publisher: Arc<EventPublisher>,
        payment: Arc<dyn PaymentGateway>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            registrations: Collection::new(store.clone()),
            users: Collection::new(store.clone()),
            courses: Collection::new(store),
            publisher,
            payment,
            config,
        }
    }

    pub async fn registration(&self, registration_id: &str) -> WorkflowResult<Registration> {
        Ok(self.registrations.fetch(registration_id).await?)
    }

    /// Create a registration in `draft` for the student to edit later.
    #[instrument(skip(self, course_ids))]
    pub async fn save_draft(
        &self,
        student_id: &str,
        semester: &str,
        course_ids: Vec<String>,
    ) -> WorkflowResult<Registration> {
        let (_, department_id) = self.load_student(student_id).await?;
        let draft = Registration::new(
            student_id,
            semester,
            department_id,
            course_ids,
            RegistrationState::Draft,
        );
        let draft = self.registrations.create(&draft).await?;
        info!(registration_id = %draft.id, "draft saved");
        Ok(draft)
    }

    /// Create a registration directly in `submitted`, assigned to the
    /// department's advisor.
    #[instrument(skip(self, course_ids))]
    pub async fn submit_registration(
        &self,
        student_id: &str,
        semester: &str,
        course_ids: Vec<String>,
    ) -> WorkflowResult<Registration> {
        let (_, department_id) = self.load_student(student_id).await?;
        let advisor = self.find_advisor(&department_id).await?;

        let mut registration = Registration::new(
            student_id,
            semester,
            department_id,
            course_ids,
            RegistrationState::Submitted,
        );
        ensure_has_courses(&registration)?;
        registration.advisor_id = Some(advisor.id.clone());
        let registration = self.registrations.create(&registration).await?;

        self.publish_submitted(&registration, &advisor.id).await;
        Ok(registration)
    }

    /// Submit a draft, or resubmit after a rejection.
    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        registration_id: &str,
        student_id: &str,
    ) -> WorkflowResult<Registration> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let mut registration = self.registrations.fetch(registration_id).await?;
        ensure_owner(&registration, student_id, "submit")?;
        let from = registration.state;
        registration.state = from.transition(RegistrationState::Submitted)?;
        ensure_has_courses(&registration)?;

        let advisor = self.find_advisor(&registration.department_id).await?;
        registration.advisor_id = Some(advisor.id.clone());
        registration.updated_at = Utc::now();
        save_transition(&self.registrations, &registration, from, registration.state).await?;

        self.publish_submitted(&registration, &advisor.id).await;
        Ok(registration)
    }

    #[instrument(skip(self))]
    pub async fn approve_by_advisor(
        &self,
        registration_id: &str,
        advisor_id: &str,
    ) -> WorkflowResult<Registration> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let mut registration = self.registrations.fetch(registration_id).await?;
        ensure_assigned_advisor(&registration, advisor_id)?;
        let from = registration.state;
        registration.state = from.transition(RegistrationState::AdvisorApproved)?;

        let now = Utc::now();
        registration.advisor_approved_at = Some(now);
        registration.updated_at = now;
        save_transition(&self.registrations, &registration, from, registration.state).await?;

        let head = self.find_head(&registration.department_id).await?;
        let mut data = json!({
            "registration_id": registration.id,
            "student_id": registration.student_id,
        });
        if let Some(head) = head {
            data["head_id"] = json!(head.id);
        }
        publish(
            &self.publisher,
            Event::new(EventType::RegistrationAdvisorApproved, data).triggered_by(advisor_id),
        )
        .await;
        Ok(registration)
    }

    #[instrument(skip(self))]
    pub async fn reject_by_advisor(
        &self,
        registration_id: &str,
        advisor_id: &str,
        reason: &str,
    ) -> WorkflowResult<Registration> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let mut registration = self.registrations.fetch(registration_id).await?;
        ensure_assigned_advisor(&registration, advisor_id)?;
        let from = registration.state;
        registration.state = from.transition(RegistrationState::AdvisorRejected)?;
        registration.advisor_rejection_reason = Some(reason.to_string());
        registration.updated_at = Utc::now();
        save_transition(&self.registrations, &registration, from, registration.state).await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::RegistrationAdvisorRejected,
                json!({
                    "registration_id": registration.id,
                    "student_id": registration.student_id,
                    "reason": reason,
                }),
            )
            .triggered_by(advisor_id),
        )
        .await;
        Ok(registration)
    }

    /// Head approval. Validated against `head_approved` but persisted as
    /// `payment_pending`: approval and payment readiness are one step.
    #[instrument(skip(self))]
    pub async fn approve_by_head(
        &self,
        registration_id: &str,
        head_id: &str,
    ) -> WorkflowResult<Registration> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let mut registration = self.registrations.fetch(registration_id).await?;
        self.ensure_department_head(&registration, head_id, "approve registrations")
            .await?;
        let from = registration.state;
        let approved = from.transition(RegistrationState::HeadApproved)?;
        registration.state = approved.transition(RegistrationState::PaymentPending)?;

        let now = Utc::now();
        registration.head_approved_at = Some(now);
        registration.updated_at = now;
        save_transition(&self.registrations, &registration, from, registration.state).await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::RegistrationHeadApproved,
                json!({
                    "registration_id": registration.id,
                    "student_id": registration.student_id,
                }),
            )
            .triggered_by(head_id),
        )
        .await;
        Ok(registration)
    }

    #[instrument(skip(self))]
    pub async fn reject_by_head(
        &self,
        registration_id: &str,
        head_id: &str,
        reason: &str,
    ) -> WorkflowResult<Registration> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let mut registration = self.registrations.fetch(registration_id).await?;
        self.ensure_department_head(&registration, head_id, "reject registrations")
            .await?;
        let from = registration.state;
        registration.state = from.transition(RegistrationState::HeadRejected)?;
        registration.head_rejection_reason = Some(reason.to_string());
        registration.updated_at = Utc::now();
        save_transition(&self.registrations, &registration, from, registration.state).await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::RegistrationHeadRejected,
                json!({
                    "registration_id": registration.id,
                    "student_id": registration.student_id,
                    "reason": reason,
                }),
            )
            .triggered_by(head_id),
        )
        .await;
        Ok(registration)
    }

    /// Start a payment of Σ course credits × fee per credit. Courses missing
    /// from the catalogue count with the default credit value.
    #[instrument(skip(self))]
    pub async fn initiate_payment(
        &self,
        registration_id: &str,
        student_id: &str,
    ) -> WorkflowResult<PaymentInitiation> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let mut registration = self.registrations.fetch(registration_id).await?;
        ensure_owner(&registration, student_id, "pay for")?;
        if registration.state != RegistrationState::PaymentPending {
            return Err(WorkflowError::precondition(format!(
                "payment not ready: registration is {}",
                registration.state
            )));
        }

        let credits = self.total_credits(&registration.course_ids).await?;
        let amount = u64::from(credits) * self.config.fee_per_credit;
        let receipt = self
            .payment
            .initiate(PaymentRequest {
                amount,
                student_id: student_id.to_string(),
                registration_id: registration.id.clone(),
                description: format!("Registration for {}", registration.semester),
            })
            .await
            .map_err(|e| WorkflowError::Payment(format!("{e:#}")))?;

        registration.payment_id = Some(receipt.payment_id.clone());
        registration.updated_at = Utc::now();
        self.registrations
            .save_if(
                &registration,
                &Filter::all().eq("state", RegistrationState::PaymentPending.as_str()),
            )
            .await?;
        info!(payment_id = %receipt.payment_id, amount, credits, "payment initiated");

        Ok(PaymentInitiation {
            registration,
            payment: receipt,
            amount,
        })
    }

    /// Confirm a payment with the gateway and move to `payment_completed`.
    #[instrument(skip(self))]
    pub async fn complete_payment(
        &self,
        registration_id: &str,
        payment_id: &str,
    ) -> WorkflowResult<Registration> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let mut registration = self.registrations.fetch(registration_id).await?;
        if registration.payment_id.as_deref() != Some(payment_id) {
            return Err(WorkflowError::precondition(format!(
                "payment {payment_id} was not initiated for registration {registration_id}"
            )));
        }
        let from = registration.state;
        let next = from.transition(RegistrationState::PaymentCompleted)?;

        let status = self
            .payment
            .verify(payment_id)
            .await
            .map_err(|e| WorkflowError::Payment(format!("{e:#}")))?;
        if status != PaymentStatus::Completed {
            return Err(WorkflowError::precondition("payment not completed"));
        }

        let now = Utc::now();
        registration.state = next;
        registration.paid_at = Some(now);
        registration.updated_at = now;
        save_transition(&self.registrations, &registration, from, next).await?;
        Ok(registration)
    }

    /// Admit the student and advance their current semester.
    #[instrument(skip(self))]
    pub async fn admit(
        &self,
        registration_id: &str,
        admin_id: &str,
    ) -> WorkflowResult<Registration> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let admin = self.users.fetch(admin_id).await?;
        if !admin.is_admin() {
            return Err(WorkflowError::unauthorized(admin_id, "admit students"));
        }
        let mut registration = self.registrations.fetch(registration_id).await?;
        let from = registration.state;
        registration.state = from.transition(RegistrationState::Admitted)?;
        let mut student = self.users.fetch(&registration.student_id).await?;
        if student.role != UserRole::Student {
            return Err(WorkflowError::precondition(format!(
                "{} is not a student",
                student.id
            )));
        }

        let now = Utc::now();
        registration.admitted_at = Some(now);
        registration.updated_at = now;
        save_transition(&self.registrations, &registration, from, registration.state).await?;

        student.current_semester = Some(registration.semester.clone());
        student.updated_at = now;
        self.users.save(&student).await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::RegistrationAdmitted,
                json!({
                    "registration_id": registration.id,
                    "student_id": registration.student_id,
                    "semester": registration.semester,
                }),
            )
            .triggered_by(admin_id),
        )
        .await;
        Ok(registration)
    }

    /// Cancel a registration. Allowed for its student, its advisor or an admin.
    #[instrument(skip(self))]
    pub async fn cancel(&self, registration_id: &str, actor_id: &str) -> WorkflowResult<Registration> {
        let _span = WorkflowSpan::enter("registration", registration_id);
        let mut registration = self.registrations.fetch(registration_id).await?;
        let permitted = registration.student_id == actor_id
            || registration.advisor_id.as_deref() == Some(actor_id)
            || self
                .users
                .get(actor_id)
                .await?
                .is_some_and(|user| user.is_admin());
        if !permitted {
            return Err(WorkflowError::unauthorized(
                actor_id,
                format!("cancel registration {registration_id}"),
            ));
        }
        let from = registration.state;
        registration.state = from.transition(RegistrationState::Cancelled)?;
        registration.updated_at = Utc::now();
        save_transition(&self.registrations, &registration, from, registration.state).await?;
        Ok(registration)
    }

    /// A student's registrations, newest first.
    pub async fn registrations_for_student(
        &self,
        student_id: &str,
    ) -> WorkflowResult<Vec<Registration>> {
        let mut items = self
            .registrations
            .find(&Filter::all().eq("student_id", student_id))
            .await?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Registrations waiting on an approver, oldest first.
    pub async fn pending_approvals(&self, scope: PendingScope) -> WorkflowResult<Vec<Registration>> {
        let filter = match scope {
            PendingScope::Advisor(advisor_id) => Filter::all()
                .eq("state", RegistrationState::Submitted.as_str())
                .eq("advisor_id", advisor_id),
            PendingScope::Department(department_id) => Filter::all()
                .eq("state", RegistrationState::AdvisorApproved.as_str())
                .eq("department_id", department_id),
            PendingScope::All => Filter::all().any_of(
                "state",
                RegistrationState::ALL
                    .iter()
                    .filter(|s| s.is_awaiting_approval())
                    .map(|s| s.as_str()),
            ),
        };
        let mut items = self.registrations.find(&filter).await?;
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(items)
    }

    // -- helpers ---------------------------------------------------------------

    /// The student record and their department.
    async fn load_student(&self, student_id: &str) -> WorkflowResult<(User, String)> {
        let student = self.users.fetch(student_id).await?;
        if student.role != UserRole::Student {
            return Err(WorkflowError::precondition(format!(
                "{student_id} is not a student"
            )));
        }
        let department_id = student.department_id.clone().ok_or_else(|| {
            WorkflowError::precondition(format!("student {student_id} has no department"))
        })?;
        Ok((student, department_id))
    }

    async fn find_advisor(&self, department_id: &str) -> WorkflowResult<User> {
        self.users
            .find_one(
                &Filter::all()
                    .eq("department_id", department_id)
                    .eq("is_advisor", true),
            )
            .await?
            .ok_or_else(|| {
                WorkflowError::precondition(format!(
                    "no advisor found for department {department_id}"
                ))
            })
    }

    async fn find_head(&self, department_id: &str) -> WorkflowResult<Option<User>> {
        Ok(self
            .users
            .find_one(
                &Filter::all()
                    .eq("department_id", department_id)
                    .eq("is_department_head", true),
            )
            .await?)
    }

    async fn ensure_department_head(
        &self,
        registration: &Registration,
        head_id: &str,
        action: &str,
    ) -> WorkflowResult<()> {
        let head = self.users.fetch(head_id).await?;
        if head.heads_department(&registration.department_id) {
            Ok(())
        } else {
            Err(WorkflowError::unauthorized(
                head_id,
                format!("{action} for department {}", registration.department_id),
            ))
        }
    }

    async fn total_credits(&self, course_ids: &[String]) -> WorkflowResult<u32> {
        let mut total = 0;
        for course_id in course_ids {
            total += match self.courses.get(course_id).await? {
                Some(course) => course.credits,
                None => self.config.default_course_credits,
            };
        }
        Ok(total)
    }

    async fn publish_submitted(&self, registration: &Registration, advisor_id: &str) {
        publish(
            &self.publisher,
            Event::new(
                EventType::RegistrationSubmitted,
                json!({
                    "registration_id": registration.id,
                    "student_id": registration.student_id,
                    "semester": registration.semester,
                    "advisor_id": advisor_id,
                }),
            )
            .triggered_by(registration.student_id.as_str()),
        )
        .await;
    }
}

fn ensure_owner(registration: &Registration, student_id: &str, action: &str) -> WorkflowResult<()> {
    if registration.student_id == student_id {
        Ok(())
    } else {
        Err(WorkflowError::unauthorized(
            student_id,
            format!("{action} registration {}", registration.id),
        ))
    }
}

fn ensure_assigned_advisor(registration: &Registration, advisor_id: &str) -> WorkflowResult<()> {
    if registration.advisor_id.as_deref() == Some(advisor_id) {
        Ok(())
    } else {
        Err(WorkflowError::unauthorized(
            advisor_id,
            format!("review registration {}", registration.id),
        ))
    }
}

fn ensure_has_courses(registration: &Registration) -> WorkflowResult<()> {
    if registration.course_ids.is_empty() {
        Err(WorkflowError::precondition("registration has no courses"))
    } else {
        Ok(())
    }
}
