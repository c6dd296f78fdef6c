use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentGpa {
    pub student_id: String,
    pub gpa: f64,
}

/// Orders a cohort by GPA.
pub trait RankingStrategy: Send + Sync {
    /// Map student id to 1-based rank.
    fn rank(&self, students: &[StudentGpa]) -> BTreeMap<String, u32>;
}

/// Standard competition ranking ("1224"): equal GPAs share a rank and the
/// next distinct GPA takes its 1-based position.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRankingStrategy;

/// GPA in hundredths; ties are decided on the published two-decimal value.
fn gpa_key(gpa: f64) -> i64 {
    (gpa * 100.0).round() as i64
}

impl RankingStrategy for StandardRankingStrategy {
    fn rank(&self, students: &[StudentGpa]) -> BTreeMap<String, u32> {
        let mut sorted: Vec<(i64, &str)> = students
            .iter()
            .map(|s| (gpa_key(s.gpa), s.student_id.as_str()))
            .collect();
        sorted.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

        let mut ranks = BTreeMap::new();
        let mut current_rank = 0_u32;
        let mut previous: Option<i64> = None;
        for (position, (key, student_id)) in sorted.into_iter().enumerate() {
            if previous != Some(key) {
                current_rank = position as u32 + 1;
                previous = Some(key);
            }
            ranks.insert(student_id.to_string(), current_rank);
        }
        ranks
    }
}
