use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lectures planned when a classroom is created without an explicit count.
pub const DEFAULT_PLANNED_CLASSES: u32 = 40;

/// A course offering taught by one teacher in one semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    pub id: String,
    pub course_id: String,
    pub semester: String,
    pub teacher_id: String,
    pub department_id: String,
    pub academic_year: String,
    pub enrolled_students: Vec<String>,
    pub total_planned_classes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Classroom {
    pub fn is_enrolled(&self, student_id: &str) -> bool {
        self.enrolled_students.iter().any(|s| s == student_id)
    }
}

/// Roll call for one lecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub classroom_id: String,
    pub teacher_id: String,
    pub date: NaiveDate,
    pub lecture_number: u32,
    pub present_students: Vec<String>,
    pub absent_students: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub classroom_id: String,
    pub teacher_id: String,
    pub title: String,
    pub content: String,
    pub is_pinned: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub classroom_id: String,
    pub teacher_id: String,
    pub title: String,
    pub description: String,
    pub resource_links: Vec<String>,
    pub due_date: DateTime<Utc>,
    pub max_marks: f64,
    pub created_at: DateTime<Utc>,
}

/// A student's hand-in for an assignment. One per (assignment, student).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub submission_link: String,
    pub submitted_at: DateTime<Utc>,
    pub marks_obtained: Option<f64>,
    pub feedback: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    pub graded_by: Option<String>,
}
