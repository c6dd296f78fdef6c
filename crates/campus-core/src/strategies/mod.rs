//! Pure, swappable academic calculations.
//!
//! One trait per calculation with a single standard implementation. The
//! [`Strategies`] bundle is what orchestrators hold, so an alternate scale
//! can be swapped in without touching them.

pub mod attendance;
pub mod gpa;
pub mod grading;
pub mod ranking;
pub mod reputation;

use std::sync::Arc;

pub use attendance::{
    AttendanceRuleStrategy, AttendanceStats, Eligibility, StandardAttendanceRule,
};
pub use gpa::{CourseCredit, GpaStrategy, SemesterGpa, StandardGpaStrategy};
pub use grading::{Grade, GradeBand, GradingStrategy, StandardGradingStrategy};
pub use ranking::{RankingStrategy, StandardRankingStrategy, StudentGpa};
pub use reputation::{Badge, ReputationInputs, ReputationStrategy, StandardReputationStrategy};

/// Input rejected by a strategy.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyError {
    #[error("total marks must be positive, got {total}")]
    NonPositiveTotal { total: f64 },

    #[error("marks {obtained} out of range for total {total}")]
    MarksOutOfRange { obtained: f64, total: f64 },
}

/// Round to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The strategy set used by the workflow orchestrators.
#[derive(Clone)]
pub struct Strategies {
    pub grading: Arc<dyn GradingStrategy>,
    pub gpa: Arc<dyn GpaStrategy>,
    pub ranking: Arc<dyn RankingStrategy>,
    pub attendance: Arc<dyn AttendanceRuleStrategy>,
    pub reputation: Arc<dyn ReputationStrategy>,
}

impl Strategies {
    /// The standard 4.0 scale, 65/70 attendance rule and forum reputation.
    pub fn standard() -> Self {
        Self {
            grading: Arc::new(StandardGradingStrategy),
            gpa: Arc::new(StandardGpaStrategy),
            ranking: Arc::new(StandardRankingStrategy),
            attendance: Arc::new(StandardAttendanceRule),
            reputation: Arc::new(StandardReputationStrategy),
        }
    }
}

impl Default for Strategies {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(3.456), 3.46);
        assert_eq!(round2(3.454), 3.45);
        assert_eq!(round2(0.0), 0.0);
    }
}
