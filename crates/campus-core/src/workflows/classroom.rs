//! Classrooms: enrolment, announcements, assignments and grading.

use std::sync::Arc;

use campus_state::{Collection, DocumentStore, Filter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use super::locks::EntityLocks;
use super::publish;
use crate::domain::classroom::DEFAULT_PLANNED_CLASSES;
use crate::domain::registration::dedup_preserving_order;
use crate::domain::{
    Announcement, Assignment, Classroom, Submission, WorkflowError, WorkflowResult,
};
use crate::events::{Event, EventPublisher, EventType};

/// Input for [`ClassroomWorkflow::create_classroom`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClassroom {
    pub course_id: String,
    pub semester: String,
    pub teacher_id: String,
    pub department_id: String,
    pub academic_year: String,
    /// Defaults to 40 lectures.
    pub total_planned_classes: Option<u32>,
}

/// Input for [`ClassroomWorkflow::create_assignment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub classroom_id: String,
    pub teacher_id: String,
    pub title: String,
    pub description: String,
    pub resource_links: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub max_marks: f64,
}

/// Assignment marks a student earned in one classroom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssignmentMarks {
    /// Σ max marks of every assignment in the classroom.
    pub total_marks: f64,
    /// Σ marks of the student's graded submissions.
    pub obtained_marks: f64,
}

pub struct ClassroomWorkflow {
    classrooms: Collection<Classroom>,
    announcements: Collection<Announcement>,
    assignments: Collection<Assignment>,
    submissions: Collection<Submission>,
    publisher: Arc<EventPublisher>,
    locks: EntityLocks,
}

impl ClassroomWorkflow {
    pub fn new(store: Arc<dyn DocumentStore>, publisher: Arc<EventPublisher>) -> Self {
        Self {
            classrooms: Collection::new(store.clone()),
            announcements: Collection::new(store.clone()),
            assignments: Collection::new(store.clone()),
            submissions: Collection::new(store),
            publisher,
            locks: EntityLocks::new(),
        }
    }

    pub async fn classroom(&self, classroom_id: &str) -> WorkflowResult<Classroom> {
        Ok(self.classrooms.fetch(classroom_id).await?)
    }

    #[instrument(skip(self, input), fields(course_id = %input.course_id))]
    pub async fn create_classroom(&self, input: NewClassroom) -> WorkflowResult<Classroom> {
        let total_planned_classes = input.total_planned_classes.unwrap_or(DEFAULT_PLANNED_CLASSES);
        if total_planned_classes == 0 {
            return Err(WorkflowError::precondition(
                "total planned classes must be positive",
            ));
        }
        let now = Utc::now();
        let classroom = self
            .classrooms
            .create(&Classroom {
                id: crate::domain::new_id(),
                course_id: input.course_id,
                semester: input.semester,
                teacher_id: input.teacher_id,
                department_id: input.department_id,
                academic_year: input.academic_year,
                enrolled_students: Vec::new(),
                total_planned_classes,
                created_at: now,
                updated_at: now,
            })
            .await?;
        info!(classroom_id = %classroom.id, "classroom created");
        Ok(classroom)
    }

    /// Add students, ignoring those already enrolled.
    #[instrument(skip(self, student_ids), fields(count = student_ids.len()))]
    pub async fn enroll_students(
        &self,
        classroom_id: &str,
        student_ids: &[String],
    ) -> WorkflowResult<Classroom> {
        let _guard = self.locks.lock(format!("classroom:{classroom_id}")).await;
        let mut classroom = self.classrooms.fetch(classroom_id).await?;
        let mut enrolled = std::mem::take(&mut classroom.enrolled_students);
        enrolled.extend(student_ids.iter().cloned());
        classroom.enrolled_students = dedup_preserving_order(enrolled);
        classroom.updated_at = Utc::now();
        self.classrooms.save(&classroom).await?;
        Ok(classroom)
    }

    /// Change the lecture count attendance percentages are measured against.
    #[instrument(skip(self))]
    pub async fn update_total_planned_classes(
        &self,
        classroom_id: &str,
        teacher_id: &str,
        total: u32,
    ) -> WorkflowResult<Classroom> {
        if total == 0 {
            return Err(WorkflowError::precondition(
                "total planned classes must be positive",
            ));
        }
        let _guard = self.locks.lock(format!("classroom:{classroom_id}")).await;
        let mut classroom = self
            .taught_by(classroom_id, teacher_id, "plan classes")
            .await?;
        classroom.total_planned_classes = total;
        classroom.updated_at = Utc::now();
        self.classrooms.save(&classroom).await?;
        Ok(classroom)
    }

    /// Classrooms a student is enrolled in, newest first.
    pub async fn classrooms_for_student(&self, student_id: &str) -> WorkflowResult<Vec<Classroom>> {
        let mut items = self
            .classrooms
            .find(&Filter::all().contains("enrolled_students", student_id))
            .await?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    #[instrument(skip(self, content))]
    pub async fn post_announcement(
        &self,
        classroom_id: &str,
        teacher_id: &str,
        title: &str,
        content: &str,
        is_pinned: bool,
    ) -> WorkflowResult<Announcement> {
        let classroom = self.taught_by(classroom_id, teacher_id, "post announcements").await?;
        let announcement = self
            .announcements
            .create(&Announcement {
                id: crate::domain::new_id(),
                classroom_id: classroom_id.to_string(),
                teacher_id: teacher_id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                is_pinned,
                created_at: Utc::now(),
            })
            .await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::AnnouncementCreated,
                json!({
                    "announcement_id": announcement.id,
                    "classroom_id": classroom_id,
                    "title": title,
                    "student_ids": classroom.enrolled_students,
                }),
            )
            .triggered_by(teacher_id),
        )
        .await;
        Ok(announcement)
    }

    /// Pinned first, then newest first.
    pub async fn announcements(&self, classroom_id: &str) -> WorkflowResult<Vec<Announcement>> {
        let mut items = self
            .announcements
            .find(&Filter::all().eq("classroom_id", classroom_id))
            .await?;
        items.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(items)
    }

    #[instrument(skip(self, input), fields(classroom_id = %input.classroom_id))]
    pub async fn create_assignment(&self, input: NewAssignment) -> WorkflowResult<Assignment> {
        if !input.max_marks.is_finite() || input.max_marks <= 0.0 {
            return Err(WorkflowError::precondition(format!(
                "max marks must be positive, got {}",
                input.max_marks
            )));
        }
        let classroom = self
            .taught_by(&input.classroom_id, &input.teacher_id, "create assignments")
            .await?;
        let assignment = self
            .assignments
            .create(&Assignment {
                id: crate::domain::new_id(),
                classroom_id: input.classroom_id,
                teacher_id: input.teacher_id,
                title: input.title,
                description: input.description,
                resource_links: input.resource_links,
                due_date: input.due_date,
                max_marks: input.max_marks,
                created_at: Utc::now(),
            })
            .await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::AssignmentCreated,
                json!({
                    "assignment_id": assignment.id,
                    "classroom_id": assignment.classroom_id,
                    "title": assignment.title,
                    "due_date": assignment.due_date.to_rfc3339(),
                    "student_ids": classroom.enrolled_students,
                }),
            )
            .triggered_by(assignment.teacher_id.as_str()),
        )
        .await;
        Ok(assignment)
    }

    /// Latest due date first.
    pub async fn assignments(&self, classroom_id: &str) -> WorkflowResult<Vec<Assignment>> {
        let mut items = self
            .assignments
            .find(&Filter::all().eq("classroom_id", classroom_id))
            .await?;
        items.sort_by(|a, b| b.due_date.cmp(&a.due_date));
        Ok(items)
    }

    /// Hand in an assignment. One submission per student.
    #[instrument(skip(self, submission_link))]
    pub async fn submit_assignment(
        &self,
        assignment_id: &str,
        student_id: &str,
        submission_link: &str,
    ) -> WorkflowResult<Submission> {
        let assignment = self.assignments.fetch(assignment_id).await?;
        let classroom = self.classrooms.fetch(&assignment.classroom_id).await?;
        if !classroom.is_enrolled(student_id) {
            return Err(WorkflowError::unauthorized(
                student_id,
                format!("submit to assignment {assignment_id}"),
            ));
        }

        let _guard = self
            .locks
            .lock(format!("submission:{assignment_id}:{student_id}"))
            .await;
        if self.student_submission(assignment_id, student_id).await?.is_some() {
            return Err(WorkflowError::precondition(
                "assignment already submitted",
            ));
        }
        let submission = self
            .submissions
            .create(&Submission {
                id: crate::domain::new_id(),
                assignment_id: assignment_id.to_string(),
                student_id: student_id.to_string(),
                submission_link: submission_link.to_string(),
                submitted_at: Utc::now(),
                marks_obtained: None,
                feedback: None,
                graded_at: None,
                graded_by: None,
            })
            .await?;
        Ok(submission)
    }

    /// Grade a submission. Only the classroom's teacher may.
    #[instrument(skip(self, feedback))]
    pub async fn grade_submission(
        &self,
        submission_id: &str,
        grader_id: &str,
        marks_obtained: f64,
        feedback: &str,
    ) -> WorkflowResult<Submission> {
        let mut submission = self.submissions.fetch(submission_id).await?;
        let assignment = self.assignments.fetch(&submission.assignment_id).await?;
        self.taught_by(&assignment.classroom_id, grader_id, "grade submissions")
            .await?;
        if !marks_obtained.is_finite() || marks_obtained < 0.0 || marks_obtained > assignment.max_marks
        {
            return Err(WorkflowError::precondition(format!(
                "marks {marks_obtained} outside 0..={}",
                assignment.max_marks
            )));
        }

        submission.marks_obtained = Some(marks_obtained);
        submission.feedback = Some(feedback.to_string());
        submission.graded_at = Some(Utc::now());
        submission.graded_by = Some(grader_id.to_string());
        self.submissions.save(&submission).await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::AssignmentGraded,
                json!({
                    "submission_id": submission.id,
                    "assignment_id": assignment.id,
                    "title": assignment.title,
                    "student_id": submission.student_id,
                    "marks_obtained": marks_obtained,
                    "max_marks": assignment.max_marks,
                }),
            )
            .triggered_by(grader_id),
        )
        .await;
        Ok(submission)
    }

    /// Submissions in hand-in order.
    pub async fn submissions(&self, assignment_id: &str) -> WorkflowResult<Vec<Submission>> {
        let mut items = self
            .submissions
            .find(&Filter::all().eq("assignment_id", assignment_id))
            .await?;
        items.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(items)
    }

    pub async fn student_submission(
        &self,
        assignment_id: &str,
        student_id: &str,
    ) -> WorkflowResult<Option<Submission>> {
        Ok(self
            .submissions
            .find_one(
                &Filter::all()
                    .eq("assignment_id", assignment_id)
                    .eq("student_id", student_id),
            )
            .await?)
    }

    /// Σ max marks over the classroom's assignments against Σ marks of the
    /// student's graded submissions. Ungraded work counts as zero.
    pub async fn assignment_marks(
        &self,
        classroom_id: &str,
        student_id: &str,
    ) -> WorkflowResult<AssignmentMarks> {
        let assignments = self.assignments(classroom_id).await?;
        let ids: Vec<&str> = assignments.iter().map(|a| a.id.as_str()).collect();
        let submissions = if ids.is_empty() {
            Vec::new()
        } else {
            self.submissions
                .find(
                    &Filter::all()
                        .eq("student_id", student_id)
                        .any_of("assignment_id", ids),
                )
                .await?
        };

        Ok(AssignmentMarks {
            total_marks: assignments.iter().map(|a| a.max_marks).sum(),
            obtained_marks: submissions.iter().filter_map(|s| s.marks_obtained).sum(),
        })
    }

    async fn taught_by(
        &self,
        classroom_id: &str,
        teacher_id: &str,
        action: &str,
    ) -> WorkflowResult<Classroom> {
        let classroom = self.classrooms.fetch(classroom_id).await?;
        if classroom.teacher_id == teacher_id {
            Ok(classroom)
        } else {
            Err(WorkflowError::unauthorized(
                teacher_id,
                format!("{action} in classroom {classroom_id}"),
            ))
        }
    }
}
