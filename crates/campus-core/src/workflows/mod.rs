//! Workflow orchestrators.
//!
//! Every operation follows the same shape: load the entity, check
//! preconditions and the state machine, persist, recompute derived values,
//! publish an event, return the updated entity. State-bearing writes are
//! conditional on the state that was loaded, so a concurrent move surfaces
//! as [`WorkflowError::Conflict`](crate::WorkflowError::Conflict) instead of
//! a silent lost update.

pub mod attendance;
pub mod classroom;
pub mod election;
pub mod forum;
pub mod locks;
pub mod notice;
pub mod payment;
pub mod registration;
pub mod result;

use std::sync::Arc;

use campus_state::{Collection, Document, DocumentStore, Filter};
use serde::{Deserialize, Serialize};

pub use attendance::{AttendanceWorkflow, MarkAttendance, StudentAttendance};
pub use classroom::{AssignmentMarks, ClassroomWorkflow, NewAssignment, NewClassroom};
pub use election::{ElectionWorkflow, NewElection};
pub use forum::{ForumWorkflow, QuestionQuery};
pub use locks::EntityLocks;
pub use notice::{NewNotice, NoticeQuery, NoticeWorkflow};
pub use payment::{
    MockPaymentGateway, PaymentGateway, PaymentReceipt, PaymentRequest, PaymentStatus,
};
pub use registration::{PaymentInitiation, PendingScope, RegistrationWorkflow};
pub use result::{PublishResult, ResultWorkflow};

use crate::config::WorkflowConfig;
use crate::domain::WorkflowResult;
use crate::events::{Event, EventPublisher};
use crate::metrics::METRICS;
use crate::obs;
use crate::state_machine::WorkflowState;
use crate::strategies::Strategies;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> usize {
        if self.limit == 0 {
            0
        } else {
            self.total.div_ceil(self.limit)
        }
    }
}

/// Slice `items` into the 1-based `page` of size `limit`.
/// A zero page is treated as the first page.
pub fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> Page<T> {
    let page = page.max(1);
    let total = items.len();
    let items = items
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();
    Page {
        items,
        total,
        page,
        limit,
    }
}

/// Persist `doc` only if its stored `state` is still `from`, then record the move.
pub(crate) async fn save_transition<T, S>(
    collection: &Collection<T>,
    doc: &T,
    from: S,
    to: S,
) -> WorkflowResult<()>
where
    T: Document,
    S: WorkflowState,
{
    collection
        .save_if(doc, &Filter::all().eq("state", from.as_str()))
        .await?;
    METRICS.inc_transitions();
    obs::emit_transition(S::MACHINE, doc.id(), from.as_str(), to.as_str());
    Ok(())
}

/// Publish and discard the report; failures are already logged by the publisher.
pub(crate) async fn publish(publisher: &EventPublisher, event: Event) {
    publisher.publish(event).await;
}

/// All orchestrators wired to one store, publisher and strategy set.
pub struct Workflows {
    pub registration: RegistrationWorkflow,
    pub election: ElectionWorkflow,
    pub attendance: AttendanceWorkflow,
    pub result: ResultWorkflow,
    pub forum: ForumWorkflow,
    pub classroom: ClassroomWorkflow,
    pub notice: NoticeWorkflow,
}

impl Workflows {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        publisher: Arc<EventPublisher>,
        strategies: Strategies,
        config: WorkflowConfig,
        payment: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            registration: RegistrationWorkflow::new(
                store.clone(),
                publisher.clone(),
                payment,
                config.clone(),
            ),
            election: ElectionWorkflow::new(store.clone(), publisher.clone()),
            attendance: AttendanceWorkflow::new(
                store.clone(),
                publisher.clone(),
                strategies.attendance.clone(),
            ),
            result: ResultWorkflow::new(
                store.clone(),
                publisher.clone(),
                strategies.clone(),
                config.clone(),
            ),
            forum: ForumWorkflow::new(
                store.clone(),
                publisher.clone(),
                strategies.reputation.clone(),
                config.page_size,
            ),
            classroom: ClassroomWorkflow::new(store.clone(), publisher.clone()),
            notice: NoticeWorkflow::new(store, publisher, config.page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        let page = paginate((1..=45).collect::<Vec<_>>(), 3, 20);
        assert_eq!(page.items, (41..=45).collect::<Vec<_>>());
        assert_eq!(page.total, 45);
        assert_eq!(page.total_pages(), 3);

        let first = paginate(vec![1, 2, 3], 0, 2);
        assert_eq!(first.page, 1);
        assert_eq!(first.items, vec![1, 2]);

        let beyond = paginate(vec![1, 2, 3], 9, 2);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total, 3);
    }

    #[tokio::test]
    async fn test_save_transition_conflicts_on_stale_state() {
        use crate::domain::{Registration, WorkflowError};
        use crate::state_machine::RegistrationState;
        use campus_state::MemoryDocumentStore;

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let registrations = Collection::<Registration>::new(store);
        let draft = Registration::new(
            "S-1",
            "2-1",
            "CSE",
            vec!["CSE201".into()],
            RegistrationState::Draft,
        );
        registrations.create(&draft).await.unwrap();

        // Two writers load the same draft; the first one wins.
        let mut submitted = draft.clone();
        submitted.state = RegistrationState::Submitted;
        save_transition(
            &registrations,
            &submitted,
            RegistrationState::Draft,
            RegistrationState::Submitted,
        )
        .await
        .unwrap();

        let mut cancelled = draft.clone();
        cancelled.state = RegistrationState::Cancelled;
        let err = save_transition(
            &registrations,
            &cancelled,
            RegistrationState::Draft,
            RegistrationState::Cancelled,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Conflict { .. }), "{err}");

        let stored = registrations.fetch(&draft.id).await.unwrap();
        assert_eq!(stored.state, RegistrationState::Submitted);
    }
}
