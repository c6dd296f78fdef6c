//! Campus Workflow Core
//!
//! Approval state machines, academic calculation strategies, the in-process
//! event publisher and the workflow orchestrators that sequence them over a
//! [`campus_state::DocumentStore`].

pub mod config;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod obs;
pub mod state_machine;
pub mod strategies;
pub mod telemetry;
pub mod workflows;

pub use config::{ConfigError, WorkflowConfig};

pub use domain::{
    Announcement, Assignment, AttendanceRecord, Candidate, CandidateStanding, Classroom, Course,
    CourseMarks, CourseResult, Election, ElectionResults, ForumAnswer, ForumQuestion,
    ForumReputation, Notice, NoticeScope, Notification, Registration, ResultRecord, Submission,
    User, UserRole, Vote, VoteDirection, WorkflowError, WorkflowResult, COLLECTIONS,
};

pub use events::{
    Event, EventObserver, EventPublisher, EventType, NotificationObserver, PublishReport,
};

pub use state_machine::{
    ElectionSchedule, ElectionState, RegistrationState, TransitionError, WorkflowState,
};

pub use strategies::{Strategies, StrategyError};

pub use workflows::{
    AttendanceWorkflow, ClassroomWorkflow, ElectionWorkflow, ForumWorkflow, MockPaymentGateway,
    NoticeWorkflow, Page, PaymentGateway, RegistrationWorkflow, ResultWorkflow, Workflows,
};
