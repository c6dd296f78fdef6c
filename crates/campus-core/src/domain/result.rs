use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw marks submitted for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseMarks {
    pub course_id: String,
    pub marks_obtained: f64,
    pub total_marks: f64,
}

/// A graded course line on a published result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseResult {
    pub course_id: String,
    pub credits: u32,
    pub marks_obtained: f64,
    pub total_marks: f64,
    pub grade_point: f64,
    pub letter_grade: String,
}

/// A student's published result for one semester of one academic year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: String,
    pub student_id: String,
    pub department_id: String,
    pub semester: String,
    pub academic_year: String,
    pub course_results: Vec<CourseResult>,
    pub semester_gpa: f64,
    pub cumulative_cgpa: f64,
    /// Set once the department cohort has been ranked.
    pub department_rank: Option<u32>,
    pub published_by: String,
    pub published_at: DateTime<Utc>,
}

impl ResultRecord {
    pub fn total_credits(&self) -> u32 {
        self.course_results.iter().map(|c| c.credits).sum()
    }
}
