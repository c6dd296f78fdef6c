//! Registration pipeline tests.
//!
//! Drive the full approval chain against the in-memory store and the mock
//! payment gateway, checking stored state, notifications and authorization.

use std::sync::Arc;

use campus_core::workflows::{MockPaymentGateway, PaymentStatus, PendingScope};
use campus_core::{
    Course, EventPublisher, NotificationObserver, RegistrationState, RegistrationWorkflow, User,
    UserRole, WorkflowConfig, WorkflowError,
};
use campus_state::{Collection, DocumentStore, MemoryDocumentStore};

struct Campus {
    workflow: RegistrationWorkflow,
    notifications: Arc<NotificationObserver>,
    payment: Arc<MockPaymentGateway>,
    users: Collection<User>,
    courses: Vec<String>,
}

async fn campus() -> Campus {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let users = Collection::<User>::new(store.clone());
    for user in [
        User::new("S-1", UserRole::Student, "Ada", "Lovelace", Some("CSE".into())),
        User::new("S-2", UserRole::Student, "Alan", "Turing", Some("CSE".into())),
        User::new("T-1", UserRole::Teacher, "Grace", "Hopper", Some("CSE".into())).advisor(),
        User::new("T-2", UserRole::Teacher, "Edsger", "Dijkstra", Some("CSE".into()))
            .department_head(),
        User::new("T-3", UserRole::Teacher, "Claude", "Shannon", Some("EEE".into()))
            .department_head(),
        User::new("A-1", UserRole::Admin, "Registrar", "Office", None),
    ] {
        users.create(&user).await.unwrap();
    }

    let catalogue = Collection::<Course>::new(store.clone());
    let mut courses = Vec::new();
    for course in [
        Course::new("CSE201", "Data Structures", 3, "CSE"),
        Course::new("CSE203", "Discrete Mathematics", 4, "CSE"),
    ] {
        courses.push(catalogue.create(&course).await.unwrap().id);
    }

    let notifications = Arc::new(NotificationObserver::new(store.clone()));
    let publisher = Arc::new(EventPublisher::with_default_observers(notifications.clone()));
    let payment = Arc::new(MockPaymentGateway::new());
    let workflow = RegistrationWorkflow::new(
        store,
        publisher,
        payment.clone(),
        WorkflowConfig::default(),
    );
    Campus {
        workflow,
        notifications,
        payment,
        users,
        courses,
    }
}

/// Submit and walk a registration through both approvals.
async fn approved_registration(campus: &Campus) -> String {
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    campus.workflow.approve_by_advisor(&reg.id, "T-1").await.unwrap();
    campus.workflow.approve_by_head(&reg.id, "T-2").await.unwrap();
    reg.id
}

// ── happy path ──

#[tokio::test]
async fn full_pipeline_admits_student() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    assert_eq!(reg.state, RegistrationState::Submitted);
    assert_eq!(reg.advisor_id.as_deref(), Some("T-1"));

    let reg = campus.workflow.approve_by_advisor(&reg.id, "T-1").await.unwrap();
    assert_eq!(reg.state, RegistrationState::AdvisorApproved);
    assert!(reg.advisor_approved_at.is_some());

    let reg = campus.workflow.approve_by_head(&reg.id, "T-2").await.unwrap();
    assert_eq!(reg.state, RegistrationState::PaymentPending);

    let started = campus.workflow.initiate_payment(&reg.id, "S-1").await.unwrap();
    assert_eq!(started.amount, 7 * 5000);
    assert!(started.payment.payment_id.starts_with("PAY-"));

    let reg = campus
        .workflow
        .complete_payment(&reg.id, &started.payment.payment_id)
        .await
        .unwrap();
    assert_eq!(reg.state, RegistrationState::PaymentCompleted);
    assert!(reg.paid_at.is_some());

    let reg = campus.workflow.admit(&reg.id, "A-1").await.unwrap();
    assert_eq!(reg.state, RegistrationState::Admitted);
    assert!(reg.admitted_at.is_some());

    let student = campus.users.fetch("S-1").await.unwrap();
    assert_eq!(student.current_semester.as_deref(), Some("2-1"));

    let stored = campus.workflow.registration(&reg.id).await.unwrap();
    assert_eq!(stored.state, RegistrationState::Admitted);
}

#[tokio::test]
async fn head_approval_is_stored_as_payment_pending() {
    let campus = campus().await;
    let id = approved_registration(&campus).await;

    let stored = campus.workflow.registration(&id).await.unwrap();
    assert_eq!(stored.state, RegistrationState::PaymentPending);
    assert!(stored.head_approved_at.is_some());
}

#[tokio::test]
async fn approvals_notify_the_next_party() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();

    let advisor_inbox = campus.notifications.notifications_for("T-1").await.unwrap();
    assert_eq!(advisor_inbox.len(), 1);
    assert_eq!(advisor_inbox[0].kind, "registration_approval");

    campus.workflow.approve_by_advisor(&reg.id, "T-1").await.unwrap();
    let head_inbox = campus.notifications.notifications_for("T-2").await.unwrap();
    assert_eq!(head_inbox.len(), 1);
    let student_inbox = campus.notifications.notifications_for("S-1").await.unwrap();
    assert_eq!(student_inbox.len(), 1);
}

#[tokio::test]
async fn draft_then_submit() {
    let campus = campus().await;
    let draft = campus
        .workflow
        .save_draft("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    assert_eq!(draft.state, RegistrationState::Draft);
    assert!(draft.advisor_id.is_none());

    let submitted = campus.workflow.submit(&draft.id, "S-1").await.unwrap();
    assert_eq!(submitted.state, RegistrationState::Submitted);
    assert_eq!(submitted.advisor_id.as_deref(), Some("T-1"));
}

#[tokio::test]
async fn duplicate_course_ids_are_dropped() {
    let campus = campus().await;
    let mut courses = campus.courses.clone();
    courses.push(campus.courses[0].clone());
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", courses)
        .await
        .unwrap();
    assert_eq!(reg.course_ids, campus.courses);
}

#[tokio::test]
async fn unknown_courses_use_default_credits() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", vec![campus.courses[0].clone(), "ELECTIVE-X".into()])
        .await
        .unwrap();
    campus.workflow.approve_by_advisor(&reg.id, "T-1").await.unwrap();
    campus.workflow.approve_by_head(&reg.id, "T-2").await.unwrap();

    let started = campus.workflow.initiate_payment(&reg.id, "S-1").await.unwrap();
    assert_eq!(started.amount, (3 + 3) * 5000);
    assert_eq!(campus.payment.requests()[0].amount, started.amount);
}

// ── rejection loops ──

#[tokio::test]
async fn advisor_rejection_then_resubmission() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    let rejected = campus
        .workflow
        .reject_by_advisor(&reg.id, "T-1", "too many credits")
        .await
        .unwrap();
    assert_eq!(rejected.state, RegistrationState::AdvisorRejected);
    assert_eq!(
        rejected.advisor_rejection_reason.as_deref(),
        Some("too many credits")
    );

    let inbox = campus.notifications.notifications_for("S-1").await.unwrap();
    assert!(inbox[0].message.contains("too many credits"));

    let resubmitted = campus.workflow.submit(&reg.id, "S-1").await.unwrap();
    assert_eq!(resubmitted.state, RegistrationState::Submitted);
}

#[tokio::test]
async fn head_rejection_then_resubmission() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    campus.workflow.approve_by_advisor(&reg.id, "T-1").await.unwrap();
    let rejected = campus
        .workflow
        .reject_by_head(&reg.id, "T-2", "prerequisite missing")
        .await
        .unwrap();
    assert_eq!(rejected.state, RegistrationState::HeadRejected);

    let resubmitted = campus.workflow.submit(&reg.id, "S-1").await.unwrap();
    assert_eq!(resubmitted.state, RegistrationState::Submitted);
}

// ── invalid transitions ──

#[tokio::test]
async fn admit_from_submitted_is_rejected_and_state_unchanged() {
    let campus = campus().await;
    let draft = campus
        .workflow
        .save_draft("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    campus.workflow.submit(&draft.id, "S-1").await.unwrap();

    let err = campus.workflow.admit(&draft.id, "A-1").await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition(_)), "{err}");

    let stored = campus.workflow.registration(&draft.id).await.unwrap();
    assert_eq!(stored.state, RegistrationState::Submitted);
}

#[tokio::test]
async fn head_cannot_approve_before_advisor() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    let err = campus.workflow.approve_by_head(&reg.id, "T-2").await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition(_)), "{err}");
}

#[tokio::test]
async fn cancelled_registration_is_terminal() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    let cancelled = campus.workflow.cancel(&reg.id, "S-1").await.unwrap();
    assert_eq!(cancelled.state, RegistrationState::Cancelled);

    let err = campus.workflow.submit(&reg.id, "S-1").await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition(_)), "{err}");
}

#[tokio::test]
async fn paid_registration_cannot_be_cancelled() {
    let campus = campus().await;
    let id = approved_registration(&campus).await;
    let started = campus.workflow.initiate_payment(&id, "S-1").await.unwrap();
    campus
        .workflow
        .complete_payment(&id, &started.payment.payment_id)
        .await
        .unwrap();

    let err = campus.workflow.cancel(&id, "A-1").await.unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition(_)), "{err}");
}

// ── preconditions ──

#[tokio::test]
async fn empty_course_list_is_rejected() {
    let campus = campus().await;
    let err = campus
        .workflow
        .submit_registration("S-1", "2-1", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionViolation(_)), "{err}");
}

#[tokio::test]
async fn payment_before_head_approval_is_not_ready() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    let err = campus.workflow.initiate_payment(&reg.id, "S-1").await.unwrap_err();
    match err {
        WorkflowError::PreconditionViolation(msg) => assert!(msg.contains("payment not ready")),
        other => panic!("expected precondition violation, got {other}"),
    }
}

#[tokio::test]
async fn unverified_payment_leaves_state_unchanged() {
    let campus = campus().await;
    let id = approved_registration(&campus).await;
    let started = campus.workflow.initiate_payment(&id, "S-1").await.unwrap();
    campus.payment.set_status(PaymentStatus::Pending);

    let err = campus
        .workflow
        .complete_payment(&id, &started.payment.payment_id)
        .await
        .unwrap_err();
    match err {
        WorkflowError::PreconditionViolation(msg) => assert_eq!(msg, "payment not completed"),
        other => panic!("expected precondition violation, got {other}"),
    }
    let stored = campus.workflow.registration(&id).await.unwrap();
    assert_eq!(stored.state, RegistrationState::PaymentPending);
}

#[tokio::test]
async fn payment_id_must_match() {
    let campus = campus().await;
    let id = approved_registration(&campus).await;
    campus.workflow.initiate_payment(&id, "S-1").await.unwrap();

    let err = campus.workflow.complete_payment(&id, "PAY-other").await.unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionViolation(_)), "{err}");
}

#[tokio::test]
async fn department_without_advisor_cannot_submit() {
    let campus = campus().await;
    campus
        .users
        .create(&User::new(
            "S-9",
            UserRole::Student,
            "Nikola",
            "Tesla",
            Some("EEE".into()),
        ))
        .await
        .unwrap();
    let err = campus
        .workflow
        .submit_registration("S-9", "1-1", campus.courses.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionViolation(_)), "{err}");
}

#[tokio::test]
async fn missing_registration_is_not_found() {
    let campus = campus().await;
    let err = campus.workflow.approve_by_advisor("nope", "T-1").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }), "{err}");
}

#[tokio::test]
async fn admitting_a_deleted_student_leaves_registration_paid() {
    let campus = campus().await;
    let id = approved_registration(&campus).await;
    let started = campus.workflow.initiate_payment(&id, "S-1").await.unwrap();
    campus
        .workflow
        .complete_payment(&id, &started.payment.payment_id)
        .await
        .unwrap();
    campus.users.delete("S-1").await.unwrap();

    let err = campus.workflow.admit(&id, "A-1").await.unwrap_err();
    assert!(matches!(err, WorkflowError::NotFound { .. }), "{err}");

    let stored = campus.workflow.registration(&id).await.unwrap();
    assert_eq!(stored.state, RegistrationState::PaymentCompleted);
    assert!(stored.admitted_at.is_none());
}

// ── authorization ──

#[tokio::test]
async fn only_assigned_advisor_may_approve() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    let err = campus.workflow.approve_by_advisor(&reg.id, "T-2").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }), "{err}");

    let stored = campus.workflow.registration(&reg.id).await.unwrap();
    assert_eq!(stored.state, RegistrationState::Submitted);
}

#[tokio::test]
async fn head_of_other_department_may_not_approve() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    campus.workflow.approve_by_advisor(&reg.id, "T-1").await.unwrap();
    let err = campus.workflow.approve_by_head(&reg.id, "T-3").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }), "{err}");
}

#[tokio::test]
async fn only_admin_may_admit() {
    let campus = campus().await;
    let id = approved_registration(&campus).await;
    let started = campus.workflow.initiate_payment(&id, "S-1").await.unwrap();
    campus
        .workflow
        .complete_payment(&id, &started.payment.payment_id)
        .await
        .unwrap();

    let err = campus.workflow.admit(&id, "T-2").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }), "{err}");
}

#[tokio::test]
async fn other_student_may_not_cancel() {
    let campus = campus().await;
    let reg = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    let err = campus.workflow.cancel(&reg.id, "S-2").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }), "{err}");

    let cancelled = campus.workflow.cancel(&reg.id, "T-1").await.unwrap();
    assert_eq!(cancelled.state, RegistrationState::Cancelled);
}

// ── queries ──

#[tokio::test]
async fn pending_approvals_by_scope() {
    let campus = campus().await;
    let first = campus
        .workflow
        .submit_registration("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    let second = campus
        .workflow
        .submit_registration("S-2", "2-1", campus.courses.clone())
        .await
        .unwrap();
    campus.workflow.approve_by_advisor(&second.id, "T-1").await.unwrap();

    let advisor_queue = campus
        .workflow
        .pending_approvals(PendingScope::Advisor("T-1".into()))
        .await
        .unwrap();
    assert_eq!(advisor_queue.len(), 1);
    assert_eq!(advisor_queue[0].id, first.id);

    let head_queue = campus
        .workflow
        .pending_approvals(PendingScope::Department("CSE".into()))
        .await
        .unwrap();
    assert_eq!(head_queue.len(), 1);
    assert_eq!(head_queue[0].id, second.id);

    let all = campus.workflow.pending_approvals(PendingScope::All).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn registrations_for_student_lists_only_theirs() {
    let campus = campus().await;
    campus
        .workflow
        .save_draft("S-1", "2-1", campus.courses.clone())
        .await
        .unwrap();
    campus
        .workflow
        .save_draft("S-2", "2-1", campus.courses.clone())
        .await
        .unwrap();

    let mine = campus.workflow.registrations_for_student("S-1").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].student_id, "S-1");
}
