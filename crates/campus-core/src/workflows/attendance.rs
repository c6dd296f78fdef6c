//! Lecture roll calls and exam-eligibility tracking.

use std::collections::HashSet;
use std::sync::Arc;

use campus_state::{Collection, DocumentStore, Filter};
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, instrument};

use super::locks::EntityLocks;
use super::publish;
use crate::domain::{AttendanceRecord, Classroom, WorkflowError, WorkflowResult};
use crate::events::{Event, EventPublisher, EventType};
use crate::strategies::{AttendanceRuleStrategy, AttendanceStats, Eligibility};

/// Input for [`AttendanceWorkflow::mark_attendance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkAttendance {
    pub classroom_id: String,
    pub teacher_id: String,
    pub date: NaiveDate,
    pub lecture_number: u32,
    pub present_students: Vec<String>,
    pub absent_students: Vec<String>,
}

/// One student's standing in one classroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentAttendance {
    pub classroom_id: String,
    pub student_id: String,
    pub stats: AttendanceStats,
    pub percentage: f64,
    pub eligibility: Eligibility,
}

pub struct AttendanceWorkflow {
    classrooms: Collection<Classroom>,
    attendance: Collection<AttendanceRecord>,
    publisher: Arc<EventPublisher>,
    rule: Arc<dyn AttendanceRuleStrategy>,
    locks: EntityLocks,
}

impl AttendanceWorkflow {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        publisher: Arc<EventPublisher>,
        rule: Arc<dyn AttendanceRuleStrategy>,
    ) -> Self {
        Self {
            classrooms: Collection::new(store.clone()),
            attendance: Collection::new(store),
            publisher,
            rule,
            locks: EntityLocks::new(),
        }
    }

    /// Record a lecture's roll call, then warn absent students whose
    /// attendance fell below the warning threshold.
    #[instrument(
        skip(self, input),
        fields(classroom_id = %input.classroom_id, lecture = input.lecture_number)
    )]
    pub async fn mark_attendance(&self, input: MarkAttendance) -> WorkflowResult<AttendanceRecord> {
        let classroom = self.classrooms.fetch(&input.classroom_id).await?;
        if classroom.teacher_id != input.teacher_id {
            return Err(WorkflowError::unauthorized(
                &input.teacher_id,
                format!("mark attendance for classroom {}", classroom.id),
            ));
        }
        if input.lecture_number == 0 {
            return Err(WorkflowError::precondition("lecture numbers start at 1"));
        }
        let present: HashSet<&str> = input.present_students.iter().map(String::as_str).collect();
        if let Some(both) = input
            .absent_students
            .iter()
            .find(|s| present.contains(s.as_str()))
        {
            return Err(WorkflowError::precondition(format!(
                "student {both} marked both present and absent"
            )));
        }
        if let Some(stranger) = input
            .present_students
            .iter()
            .chain(&input.absent_students)
            .find(|s| !classroom.is_enrolled(s))
        {
            return Err(WorkflowError::precondition(format!(
                "student {stranger} is not enrolled in classroom {}",
                classroom.id
            )));
        }

        let _guard = self.locks.lock(format!("attendance:{}", classroom.id)).await;
        let existing = self
            .attendance
            .find_one(
                &Filter::all()
                    .eq("classroom_id", classroom.id.as_str())
                    .eq("lecture_number", input.lecture_number),
            )
            .await?;
        if existing.is_some() {
            return Err(WorkflowError::precondition(format!(
                "lecture {} already recorded",
                input.lecture_number
            )));
        }

        let record = self
            .attendance
            .create(&AttendanceRecord {
                id: crate::domain::new_id(),
                classroom_id: input.classroom_id,
                teacher_id: input.teacher_id,
                date: input.date,
                lecture_number: input.lecture_number,
                present_students: input.present_students,
                absent_students: input.absent_students,
                created_at: Utc::now(),
            })
            .await?;
        info!(
            present = record.present_students.len(),
            absent = record.absent_students.len(),
            "attendance recorded"
        );

        for student_id in &record.absent_students {
            let standing = self.student_stats(&record.classroom_id, student_id).await?;
            if !standing.eligibility.warning {
                continue;
            }
            let event_type = if standing.eligibility.eligible {
                EventType::AttendanceWarning
            } else {
                EventType::AttendanceCritical
            };
            debug!(
                student_id = %student_id,
                percentage = standing.percentage,
                %event_type,
                "attendance alert"
            );
            publish(
                &self.publisher,
                Event::new(
                    event_type,
                    json!({
                        "student_id": student_id,
                        "classroom_id": record.classroom_id,
                        "percentage": standing.percentage,
                        "message": standing.eligibility.message,
                    }),
                )
                .triggered_by(record.teacher_id.as_str()),
            )
            .await;
        }
        Ok(record)
    }

    /// Attendance tallies and eligibility for one student in one classroom.
    pub async fn student_stats(
        &self,
        classroom_id: &str,
        student_id: &str,
    ) -> WorkflowResult<StudentAttendance> {
        let records = self
            .attendance
            .find(&Filter::all().eq("classroom_id", classroom_id))
            .await?;
        let mut stats = AttendanceStats::default();
        for record in &records {
            if record.present_students.iter().any(|s| s == student_id) {
                stats.attended += 1;
            } else if record.absent_students.iter().any(|s| s == student_id) {
                stats.absent += 1;
            }
        }
        let percentage = stats.percentage();
        Ok(StudentAttendance {
            classroom_id: classroom_id.to_string(),
            student_id: student_id.to_string(),
            stats,
            percentage,
            eligibility: self.rule.check_eligibility(percentage),
        })
    }

    /// Standing in every classroom the student is enrolled in. Lookups run
    /// concurrently.
    #[instrument(skip(self))]
    pub async fn student_overview(&self, student_id: &str) -> WorkflowResult<Vec<StudentAttendance>> {
        let classrooms = self
            .classrooms
            .find(&Filter::all().contains("enrolled_students", student_id))
            .await?;
        join_all(
            classrooms
                .iter()
                .map(|classroom| self.student_stats(&classroom.id, student_id)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Roll calls of a classroom, latest lecture first.
    pub async fn classroom_attendance(
        &self,
        classroom_id: &str,
    ) -> WorkflowResult<Vec<AttendanceRecord>> {
        let mut items = self
            .attendance
            .find(&Filter::all().eq("classroom_id", classroom_id))
            .await?;
        items.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.lecture_number.cmp(&a.lecture_number))
        });
        Ok(items)
    }
}
