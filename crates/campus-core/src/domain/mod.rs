//! Campus domain entities and the workflow error taxonomy.
//!
//! Every entity is a serde document stored in a fixed collection, keyed by a
//! string UUID `id`. Field names are snake_case on the wire.

pub mod classroom;
pub mod election;
pub mod error;
pub mod forum;
pub mod notice;
pub mod notification;
pub mod registration;
pub mod result;
pub mod user;

pub use classroom::{Announcement, Assignment, AttendanceRecord, Classroom, Submission};
pub use election::{Candidate, CandidateStanding, Election, ElectionResults, Vote};
pub use error::{WorkflowError, WorkflowResult};
pub use forum::{ForumAnswer, ForumQuestion, ForumReputation, VoteDirection, VoteRecord};
pub use notice::{Notice, NoticeScope};
pub use notification::{Notification, RelatedEntity};
pub use registration::Registration;
pub use result::{CourseMarks, CourseResult, ResultRecord};
pub use user::{Course, User, UserRole};

/// Fresh document id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

macro_rules! impl_document {
    ($($ty:ty => $collection:literal),+ $(,)?) => {
        $(
            impl campus_state::Document for $ty {
                const COLLECTION: &'static str = $collection;

                fn id(&self) -> &str {
                    &self.id
                }
            }
        )+

        /// Every collection the workflow engine writes to.
        pub const COLLECTIONS: &[&str] = &[$($collection),+];
    };
}

impl_document! {
    User => "users",
    Course => "courses",
    Registration => "registrations",
    Election => "elections",
    Candidate => "candidates",
    Vote => "votes",
    ResultRecord => "results",
    ForumQuestion => "forum_questions",
    ForumAnswer => "forum_answers",
    ForumReputation => "forum_reputations",
    Classroom => "classrooms",
    AttendanceRecord => "attendance",
    Announcement => "announcements",
    Assignment => "assignments",
    Submission => "submissions",
    Notice => "notices",
    Notification => "notifications",
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_state::Document;

    #[test]
    fn test_collection_names_are_unique() {
        let mut names = COLLECTIONS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COLLECTIONS.len());
        assert_eq!(Registration::COLLECTION, "registrations");
    }

    #[test]
    fn test_new_id_is_uuid() {
        let id = new_id();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_ne!(id, new_id());
    }
}
