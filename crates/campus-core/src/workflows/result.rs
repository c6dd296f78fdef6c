//! Semester result publication, GPA/CGPA and department ranking.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use campus_state::{Collection, DocumentStore, Filter};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use super::locks::EntityLocks;
use super::publish;
use crate::config::WorkflowConfig;
use crate::domain::{
    Course, CourseMarks, CourseResult, ResultRecord, WorkflowError, WorkflowResult,
};
use crate::events::{Event, EventPublisher, EventType};
use crate::obs;
use crate::strategies::{CourseCredit, SemesterGpa, Strategies, StudentGpa};

/// Input for [`ResultWorkflow::publish_result`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub student_id: String,
    pub department_id: String,
    pub semester: String,
    pub academic_year: String,
    pub course_marks: Vec<CourseMarks>,
    pub published_by: String,
}

pub struct ResultWorkflow {
    results: Collection<ResultRecord>,
    courses: Collection<Course>,
    publisher: Arc<EventPublisher>,
    strategies: Strategies,
    config: WorkflowConfig,
    locks: EntityLocks,
}

impl ResultWorkflow {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        publisher: Arc<EventPublisher>,
        strategies: Strategies,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            results: Collection::new(store.clone()),
            courses: Collection::new(store),
            publisher,
            strategies,
            config,
            locks: EntityLocks::new(),
        }
    }

    /// Grade every course, compute semester GPA and CGPA, store the record,
    /// re-rank the department cohort and announce the result.
    ///
    /// Returns the record as stored after re-ranking, so `department_rank`
    /// is populated.
    #[instrument(
        skip(self, input),
        fields(student_id = %input.student_id, semester = %input.semester)
    )]
    pub async fn publish_result(&self, input: PublishResult) -> WorkflowResult<ResultRecord> {
        let _guard = self
            .locks
            .lock(format!(
                "result:{}:{}:{}",
                input.student_id, input.semester, input.academic_year
            ))
            .await;

        if input.course_marks.is_empty() {
            return Err(WorkflowError::precondition("result has no course marks"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = input
            .course_marks
            .iter()
            .find(|m| !seen.insert(m.course_id.as_str()))
        {
            return Err(WorkflowError::precondition(format!(
                "course {} listed twice",
                dup.course_id
            )));
        }
        if self
            .student_result(&input.student_id, &input.semester, &input.academic_year)
            .await?
            .is_some()
        {
            return Err(WorkflowError::precondition(format!(
                "result already published for {} in {} {}",
                input.student_id, input.semester, input.academic_year
            )));
        }

        let mut course_results = Vec::with_capacity(input.course_marks.len());
        for marks in &input.course_marks {
            let grade = self
                .strategies
                .grading
                .grade(marks.marks_obtained, marks.total_marks)?;
            let credits = match self.courses.get(&marks.course_id).await? {
                Some(course) => course.credits,
                None => self.config.default_course_credits,
            };
            course_results.push(CourseResult {
                course_id: marks.course_id.clone(),
                credits,
                marks_obtained: marks.marks_obtained,
                total_marks: marks.total_marks,
                grade_point: grade.grade_point,
                letter_grade: grade.letter_grade,
            });
        }

        let course_credits: Vec<CourseCredit> = course_results
            .iter()
            .map(|c| CourseCredit {
                credits: c.credits,
                grade_point: c.grade_point,
            })
            .collect();
        let semester_gpa = self.strategies.gpa.semester_gpa(&course_credits);

        let mut history: Vec<SemesterGpa> = self
            .student_results(&input.student_id)
            .await?
            .iter()
            .map(|r| SemesterGpa {
                academic_year: r.academic_year.clone(),
                semester: r.semester.clone(),
                gpa: r.semester_gpa,
                total_credits: r.total_credits(),
            })
            .collect();
        history.push(SemesterGpa {
            academic_year: input.academic_year.clone(),
            semester: input.semester.clone(),
            gpa: semester_gpa,
            total_credits: course_results.iter().map(|c| c.credits).sum(),
        });
        let cumulative_cgpa = self.strategies.gpa.cgpa(&history);

        let record = self
            .results
            .create(&ResultRecord {
                id: crate::domain::new_id(),
                student_id: input.student_id,
                department_id: input.department_id,
                semester: input.semester,
                academic_year: input.academic_year,
                course_results,
                semester_gpa,
                cumulative_cgpa,
                department_rank: None,
                published_by: input.published_by,
                published_at: Utc::now(),
            })
            .await?;
        info!(result_id = %record.id, semester_gpa, cumulative_cgpa, "result stored");

        self.recalculate_department_rankings(
            &record.department_id,
            &record.semester,
            &record.academic_year,
        )
        .await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::ResultPublished,
                json!({
                    "result_id": record.id,
                    "student_id": record.student_id,
                    "semester": record.semester,
                    "academic_year": record.academic_year,
                    "semester_gpa": record.semester_gpa,
                }),
            )
            .triggered_by(record.published_by.as_str()),
        )
        .await;

        Ok(self.results.fetch(&record.id).await?)
    }

    /// Re-rank every result of a department cohort and write the ranks back.
    ///
    /// Records are updated one by one; a failed write aborts the pass and
    /// leaves earlier ranks written. Running it again converges.
    #[instrument(skip(self))]
    pub async fn recalculate_department_rankings(
        &self,
        department_id: &str,
        semester: &str,
        academic_year: &str,
    ) -> WorkflowResult<BTreeMap<String, u32>> {
        let cohort = self
            .results
            .find(&cohort_filter(department_id, semester, academic_year))
            .await?;
        let gpas: Vec<StudentGpa> = cohort
            .iter()
            .map(|r| StudentGpa {
                student_id: r.student_id.clone(),
                gpa: r.semester_gpa,
            })
            .collect();
        let ranks = self.strategies.ranking.rank(&gpas);

        for mut record in cohort {
            let rank = ranks.get(&record.student_id).copied();
            if rank.is_some() && record.department_rank != rank {
                record.department_rank = rank;
                self.results.save(&record).await?;
            }
        }

        obs::emit_rankings_recomputed(department_id, semester, academic_year, ranks.len());
        Ok(ranks)
    }

    pub async fn student_result(
        &self,
        student_id: &str,
        semester: &str,
        academic_year: &str,
    ) -> WorkflowResult<Option<ResultRecord>> {
        Ok(self
            .results
            .find_one(
                &Filter::all()
                    .eq("student_id", student_id)
                    .eq("semester", semester)
                    .eq("academic_year", academic_year),
            )
            .await?)
    }

    /// All of a student's results in academic order.
    pub async fn student_results(&self, student_id: &str) -> WorkflowResult<Vec<ResultRecord>> {
        let mut items = self
            .results
            .find(&Filter::all().eq("student_id", student_id))
            .await?;
        items.sort_by(|a, b| {
            (a.academic_year.as_str(), a.semester.as_str())
                .cmp(&(b.academic_year.as_str(), b.semester.as_str()))
        });
        Ok(items)
    }

    /// A cohort's results ordered by rank, unranked last.
    pub async fn department_rankings(
        &self,
        department_id: &str,
        semester: &str,
        academic_year: &str,
    ) -> WorkflowResult<Vec<ResultRecord>> {
        let mut items = self
            .results
            .find(&cohort_filter(department_id, semester, academic_year))
            .await?;
        items.sort_by_key(|r| (r.department_rank.unwrap_or(u32::MAX), r.student_id.clone()));
        Ok(items)
    }
}

fn cohort_filter(department_id: &str, semester: &str, academic_year: &str) -> Filter {
    Filter::all()
        .eq("department_id", department_id)
        .eq("semester", semester)
        .eq("academic_year", academic_year)
}
