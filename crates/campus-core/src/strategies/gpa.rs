use serde::{Deserialize, Serialize};

use super::round2;

/// Credits and grade point earned in one course.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseCredit {
    pub credits: u32,
    pub grade_point: f64,
}

/// A published semester GPA with the credits it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemesterGpa {
    pub academic_year: String,
    pub semester: String,
    pub gpa: f64,
    pub total_credits: u32,
}

/// Credit-weighted GPA aggregation.
pub trait GpaStrategy: Send + Sync {
    /// Σ(credits × grade point) / Σcredits, two decimals. 0 without credits.
    fn semester_gpa(&self, courses: &[CourseCredit]) -> f64;

    /// Semester GPAs weighted by their credits, two decimals. 0 without credits.
    fn cgpa(&self, semesters: &[SemesterGpa]) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGpaStrategy;

fn weighted_average(pairs: impl Iterator<Item = (u32, f64)>) -> f64 {
    let (points, credits) = pairs.fold((0.0_f64, 0_u64), |(points, credits), (c, value)| {
        (points + f64::from(c) * value, credits + u64::from(c))
    });
    if credits == 0 {
        return 0.0;
    }
    round2(points / credits as f64)
}

impl GpaStrategy for StandardGpaStrategy {
    fn semester_gpa(&self, courses: &[CourseCredit]) -> f64 {
        weighted_average(courses.iter().map(|c| (c.credits, c.grade_point)))
    }

    fn cgpa(&self, semesters: &[SemesterGpa]) -> f64 {
        // Fixed summation order so the same history always yields the same value.
        let mut ordered: Vec<&SemesterGpa> = semesters.iter().collect();
        ordered.sort_by(|a, b| {
            (a.academic_year.as_str(), a.semester.as_str())
                .cmp(&(b.academic_year.as_str(), b.semester.as_str()))
        });
        weighted_average(ordered.into_iter().map(|s| (s.total_credits, s.gpa)))
    }
}
