//! Observer that materialises in-app notifications from domain events.

use std::sync::Arc;

use async_trait::async_trait;
use campus_state::{Collection, DocumentStore, Filter};
use serde_json::Value;
use tracing::{debug, instrument};

use super::publisher::EventObserver;
use super::types::{Event, EventType};
use crate::domain::{Notification, WorkflowError, WorkflowResult};

/// Writes one `Notification` document per recipient of an event.
///
/// Recipients come from the event payload. A recipient field missing from the
/// payload skips that notification; event types without a mapping (voting
/// started, notice published) produce none.
pub struct NotificationObserver {
    notifications: Collection<Notification>,
}

impl NotificationObserver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            notifications: Collection::new(store),
        }
    }

    /// Notifications addressed to `user_id`, newest first.
    pub async fn notifications_for(&self, user_id: &str) -> WorkflowResult<Vec<Notification>> {
        let mut items = self
            .notifications
            .find(&Filter::all().eq("recipient_id", user_id))
            .await?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Mark a notification read. Only its recipient may do so.
    pub async fn mark_read(
        &self,
        notification_id: &str,
        user_id: &str,
    ) -> WorkflowResult<Notification> {
        let mut notification = self.notifications.fetch(notification_id).await?;
        if notification.recipient_id != user_id {
            return Err(WorkflowError::unauthorized(
                user_id,
                format!("read notification {notification_id}"),
            ));
        }
        if !notification.is_read {
            notification.is_read = true;
            self.notifications.save(&notification).await?;
        }
        Ok(notification)
    }
}

#[async_trait]
impl EventObserver for NotificationObserver {
    fn name(&self) -> &str {
        "notification"
    }

    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    async fn handle(&self, event: &Event) -> anyhow::Result<()> {
        let notifications = notifications_for_event(event);
        debug!(count = notifications.len(), "creating notifications");
        for notification in &notifications {
            self.notifications.create(notification).await?;
        }
        Ok(())
    }
}

/// Map an event to the notifications it produces.
pub fn notifications_for_event(event: &Event) -> Vec<Notification> {
    let field = |name: &str| event.str_field(name);
    let registration = |recipient: Option<&str>, kind: &str, title: &str, message: String| {
        recipient.map(|to| {
            Notification::new(to, kind, title, message)
                .about("registration", field("registration_id").unwrap_or_default())
        })
    };

    let single = |n: Option<Notification>| n.into_iter().collect::<Vec<_>>();

    match event.event_type {
        EventType::RegistrationSubmitted => single(registration(
            field("advisor_id"),
            "registration_approval",
            "New Registration Request",
            format!(
                "Student {} submitted registration for {}",
                field("student_id").unwrap_or("unknown"),
                field("semester").unwrap_or("the next semester"),
            ),
        )),
        EventType::RegistrationAdvisorApproved => {
            let mut out = single(registration(
                field("student_id"),
                "registration_update",
                "Registration Approved by Advisor",
                "Your registration has been approved by your advisor. Awaiting department head approval."
                    .to_string(),
            ));
            out.extend(registration(
                field("head_id"),
                "registration_approval",
                "Registration Needs Approval",
                format!(
                    "Registration for {} requires your approval",
                    field("student_id").unwrap_or("unknown")
                ),
            ));
            out
        }
        EventType::RegistrationAdvisorRejected => single(registration(
            field("student_id"),
            "registration_update",
            "Registration Rejected by Advisor",
            rejection_message("your advisor", field("reason")),
        )),
        EventType::RegistrationHeadApproved => single(registration(
            field("student_id"),
            "registration_update",
            "Registration Approved",
            "Your registration has been approved! Please proceed with payment.".to_string(),
        )),
        EventType::RegistrationHeadRejected => single(registration(
            field("student_id"),
            "registration_update",
            "Registration Rejected",
            rejection_message("the department head", field("reason")),
        )),
        EventType::RegistrationAdmitted => single(registration(
            field("student_id"),
            "registration_update",
            "Admission Confirmed",
            format!(
                "You are admitted to semester {}",
                field("semester").unwrap_or("unknown")
            ),
        )),
        EventType::AttendanceWarning | EventType::AttendanceCritical => {
            let title = if event.event_type == EventType::AttendanceCritical {
                "Attendance Critical"
            } else {
                "Attendance Warning"
            };
            single(field("student_id").map(|to| {
                Notification::new(to, "attendance_alert", title, field("message").unwrap_or(title))
                    .about("classroom", field("classroom_id").unwrap_or_default())
            }))
        }
        EventType::AssignmentCreated => string_list(&event.data, "student_ids")
            .map(|to| {
                Notification::new(
                    to,
                    "assignment",
                    "New Assignment",
                    format!(
                        "New assignment: {}. Due: {}",
                        field("title").unwrap_or("untitled"),
                        field("due_date").unwrap_or("unspecified"),
                    ),
                )
                .about("assignment", field("assignment_id").unwrap_or_default())
            })
            .collect(),
        EventType::AssignmentGraded => single(field("student_id").map(|to| {
            Notification::new(
                to,
                "assignment",
                "Assignment Graded",
                format!(
                    "Your submission for {} has been graded",
                    field("title").unwrap_or("an assignment")
                ),
            )
            .about("assignment", field("assignment_id").unwrap_or_default())
        })),
        EventType::ResultPublished => single(field("student_id").map(|to| {
            Notification::new(
                to,
                "result",
                "Results Published",
                format!(
                    "Your {} results have been published",
                    field("semester").unwrap_or("semester")
                ),
            )
            .about("result", field("result_id").unwrap_or_default())
        })),
        EventType::ForumAnswerPosted => {
            let author = field("question_author_id");
            if author.is_some() && author == field("answer_author_id") {
                return Vec::new();
            }
            single(author.map(|to| {
                Notification::new(
                    to,
                    "forum",
                    "New Answer",
                    format!(
                        "Your question \"{}\" has a new answer",
                        field("question_title").unwrap_or("untitled")
                    ),
                )
                .about("forum_question", field("question_id").unwrap_or_default())
            }))
        }
        EventType::ForumAnswerAccepted => single(field("answer_author_id").map(|to| {
            Notification::new(to, "forum", "Answer Accepted", "Your answer was accepted")
                .about("forum_question", field("question_id").unwrap_or_default())
        })),
        EventType::ElectionCandidateApproved => single(field("student_id").map(|to| {
            Notification::new(
                to,
                "election",
                "Candidacy Approved",
                "Your candidacy has been approved",
            )
            .about("election", field("election_id").unwrap_or_default())
        })),
        EventType::AnnouncementCreated => string_list(&event.data, "student_ids")
            .map(|to| {
                Notification::new(
                    to,
                    "announcement",
                    "New Announcement",
                    field("title").unwrap_or("New announcement").to_string(),
                )
                .about("classroom", field("classroom_id").unwrap_or_default())
            })
            .collect(),
        EventType::ElectionVotingStarted | EventType::NoticePublished => Vec::new(),
    }
}

fn rejection_message(by: &str, reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("Your registration was rejected by {by}: {reason}"),
        None => format!("Your registration was rejected by {by}"),
    }
}

fn string_list<'a>(data: &'a Value, field: &str) -> impl Iterator<Item = &'a str> {
    data.get(field)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_state::MemoryDocumentStore;
    use serde_json::json;

    #[test]
    fn test_advisor_approval_notifies_student_and_head() {
        let event = Event::new(
            EventType::RegistrationAdvisorApproved,
            json!({"registration_id": "r-1", "student_id": "S-1", "head_id": "T-9"}),
        );
        let out = notifications_for_event(&event);
        let recipients: Vec<_> = out.iter().map(|n| n.recipient_id.as_str()).collect();
        assert_eq!(recipients, vec!["S-1", "T-9"]);
        assert_eq!(out[0].related_entity.as_ref().unwrap().id, "r-1");
    }

    #[test]
    fn test_missing_recipient_is_skipped() {
        let event = Event::new(
            EventType::RegistrationAdvisorApproved,
            json!({"registration_id": "r-1", "student_id": "S-1"}),
        );
        assert_eq!(notifications_for_event(&event).len(), 1);

        let event = Event::new(EventType::ResultPublished, json!({"semester": "1-1"}));
        assert!(notifications_for_event(&event).is_empty());
    }

    #[test]
    fn test_assignment_fans_out_to_students() {
        let event = Event::new(
            EventType::AssignmentCreated,
            json!({
                "assignment_id": "a-1",
                "title": "Lab 3",
                "due_date": "2026-03-01",
                "student_ids": ["S-1", "S-2", 7],
            }),
        );
        let out = notifications_for_event(&event);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].message, "New assignment: Lab 3. Due: 2026-03-01");
    }

    #[test]
    fn test_self_answer_not_notified() {
        let event = Event::new(
            EventType::ForumAnswerPosted,
            json!({"question_id": "q", "question_author_id": "U-1", "answer_author_id": "U-1"}),
        );
        assert!(notifications_for_event(&event).is_empty());
    }

    #[test]
    fn test_unmapped_events_produce_nothing() {
        for event_type in [EventType::ElectionVotingStarted, EventType::NoticePublished] {
            let event = Event::new(event_type, json!({"student_id": "S-1"}));
            assert!(notifications_for_event(&event).is_empty());
        }
    }

    #[tokio::test]
    async fn test_handle_persists_and_mark_read() {
        let store = Arc::new(MemoryDocumentStore::new());
        let observer = NotificationObserver::new(store);
        let event = Event::new(
            EventType::ResultPublished,
            json!({"result_id": "res-1", "student_id": "S-1", "semester": "2-1"}),
        );
        observer.handle(&event).await.unwrap();

        let inbox = observer.notifications_for("S-1").await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].message, "Your 2-1 results have been published");

        let err = observer.mark_read(&inbox[0].id, "S-2").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Unauthorized { .. }));

        let read = observer.mark_read(&inbox[0].id, "S-1").await.unwrap();
        assert!(read.is_read);
    }
}
