//! Event fan-out tests: observer isolation and notification delivery
//! through real workflows.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use campus_core::workflows::PublishResult;
use campus_core::{
    CourseMarks, Event, EventObserver, EventPublisher, EventType, NotificationObserver,
    ResultWorkflow, Strategies, WorkflowConfig, WorkflowError,
};
use campus_state::{DocumentStore, MemoryDocumentStore};
use serde_json::json;

struct Failing;

#[async_trait]
impl EventObserver for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
        anyhow::bail!("mail relay down")
    }
}

struct Panicking;

#[async_trait]
impl EventObserver for Panicking {
    fn name(&self) -> &str {
        "panicking"
    }

    async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
        panic!("observer bug")
    }
}

#[derive(Default)]
struct Counting {
    seen: AtomicUsize,
}

#[async_trait]
impl EventObserver for Counting {
    async fn handle(&self, _event: &Event) -> anyhow::Result<()> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn result_input() -> PublishResult {
    PublishResult {
        student_id: "S-1".into(),
        department_id: "CSE".into(),
        semester: "3-1".into(),
        academic_year: "2025-2026".into(),
        course_marks: vec![CourseMarks {
            course_id: "CSE301".into(),
            marks_obtained: 88.0,
            total_marks: 100.0,
        }],
        published_by: "T-1".into(),
    }
}

// ── publisher ──

#[tokio::test]
async fn failing_observer_does_not_starve_the_next() {
    let publisher = EventPublisher::new();
    let counting = Arc::new(Counting::default());
    publisher.subscribe(EventType::NoticePublished, Arc::new(Failing)).await;
    publisher.subscribe(EventType::NoticePublished, Arc::new(Panicking)).await;
    publisher.subscribe(EventType::NoticePublished, counting.clone()).await;

    let report = publisher
        .publish(Event::new(EventType::NoticePublished, json!({"notice_id": "n-1"})))
        .await;
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 2);
    assert_eq!(counting.seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn observers_only_see_their_event_types() {
    let publisher = EventPublisher::new();
    let counting = Arc::new(Counting::default());
    publisher.subscribe(EventType::ResultPublished, counting.clone()).await;

    publisher
        .publish(Event::new(EventType::NoticePublished, json!({})))
        .await;
    assert_eq!(counting.seen.load(Ordering::SeqCst), 0);

    publisher
        .publish(Event::new(EventType::ResultPublished, json!({})))
        .await;
    assert_eq!(counting.seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsubscribed_observer_stops_receiving() {
    let publisher = EventPublisher::new();
    let counting = Arc::new(Counting::default());
    let handle: Arc<dyn EventObserver> = counting.clone();
    publisher.subscribe(EventType::ResultPublished, handle.clone()).await;
    assert!(publisher.unsubscribe(EventType::ResultPublished, &handle).await);
    assert!(!publisher.unsubscribe(EventType::ResultPublished, &handle).await);

    publisher
        .publish(Event::new(EventType::ResultPublished, json!({})))
        .await;
    assert_eq!(counting.seen.load(Ordering::SeqCst), 0);
}

// ── through workflows ──

#[tokio::test]
async fn broken_observer_does_not_fail_the_workflow() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let notifications = Arc::new(NotificationObserver::new(store.clone()));
    let publisher = Arc::new(EventPublisher::new());
    publisher.subscribe(EventType::ResultPublished, Arc::new(Panicking)).await;
    publisher.subscribe(EventType::ResultPublished, notifications.clone()).await;

    let workflow = ResultWorkflow::new(
        store,
        publisher,
        Strategies::standard(),
        WorkflowConfig::default(),
    );
    let record = workflow.publish_result(result_input()).await.unwrap();
    assert_eq!(record.course_results[0].letter_grade, "A");

    let inbox = notifications.notifications_for("S-1").await.unwrap();
    assert_eq!(inbox.len(), 1);
}

#[tokio::test]
async fn read_receipts_belong_to_the_recipient() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let notifications = Arc::new(NotificationObserver::new(store.clone()));
    let publisher = Arc::new(EventPublisher::with_default_observers(notifications.clone()));
    let workflow = ResultWorkflow::new(
        store,
        publisher,
        Strategies::standard(),
        WorkflowConfig::default(),
    );
    workflow.publish_result(result_input()).await.unwrap();

    let inbox = notifications.notifications_for("S-1").await.unwrap();
    let err = notifications.mark_read(&inbox[0].id, "S-2").await.unwrap_err();
    assert!(matches!(err, WorkflowError::Unauthorized { .. }), "{err}");

    let read = notifications.mark_read(&inbox[0].id, "S-1").await.unwrap();
    assert!(read.is_read);
}
