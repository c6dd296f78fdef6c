use serde::{Deserialize, Serialize};

use super::StrategyError;

/// Letter grade and grade point for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub letter_grade: String,
    pub grade_point: f64,
}

/// One band of a grading scale: percentages at or above `min` map to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeBand {
    pub min: f64,
    pub letter: &'static str,
    pub point: f64,
}

const fn band(min: f64, letter: &'static str, point: f64) -> GradeBand {
    GradeBand { min, letter, point }
}

/// Standard 4.0 scale, highest band first.
pub const STANDARD_SCALE: [GradeBand; 11] = [
    band(90.0, "A+", 4.00),
    band(85.0, "A", 3.75),
    band(80.0, "A-", 3.50),
    band(75.0, "B+", 3.25),
    band(70.0, "B", 3.00),
    band(65.0, "B-", 2.75),
    band(60.0, "C+", 2.50),
    band(55.0, "C", 2.25),
    band(50.0, "C-", 2.00),
    band(45.0, "D", 1.00),
    band(0.0, "F", 0.00),
];

/// Maps raw marks to a letter grade and grade point.
pub trait GradingStrategy: Send + Sync {
    fn grade(&self, obtained: f64, total: f64) -> Result<Grade, StrategyError>;

    /// Bands of the scale, highest first.
    fn scale(&self) -> &[GradeBand];
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardGradingStrategy;

impl GradingStrategy for StandardGradingStrategy {
    fn grade(&self, obtained: f64, total: f64) -> Result<Grade, StrategyError> {
        if !total.is_finite() || total <= 0.0 {
            return Err(StrategyError::NonPositiveTotal { total });
        }
        let percentage = obtained / total * 100.0;
        if !(0.0..=100.0).contains(&percentage) {
            return Err(StrategyError::MarksOutOfRange { obtained, total });
        }

        // Bands are matched on their lower bound, so fractional percentages
        // such as 89.5 fall into the band below the next threshold.
        let band = self
            .scale()
            .iter()
            .find(|band| percentage >= band.min)
            .unwrap_or(&STANDARD_SCALE[STANDARD_SCALE.len() - 1]);

        Ok(Grade {
            letter_grade: band.letter.to_string(),
            grade_point: band.point,
        })
    }

    fn scale(&self) -> &[GradeBand] {
        &STANDARD_SCALE
    }
}
