use serde::{Deserialize, Serialize};

/// Below this percentage a student may not sit the exam.
pub const MINIMUM_ATTENDANCE: f64 = 65.0;
/// Below this percentage a student is warned.
pub const WARNING_ATTENDANCE: f64 = 70.0;

/// Exam eligibility derived from an attendance percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub warning: bool,
    pub message: String,
}

/// Raw present/absent tallies for one student in one classroom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub attended: u32,
    pub absent: u32,
}

impl AttendanceStats {
    pub fn total_lectures(&self) -> u32 {
        self.attended + self.absent
    }

    /// attended / (attended + absent) × 100, or 0 before any lecture.
    pub fn percentage(&self) -> f64 {
        match self.total_lectures() {
            0 => 0.0,
            total => f64::from(self.attended) / f64::from(total) * 100.0,
        }
    }
}

pub trait AttendanceRuleStrategy: Send + Sync {
    fn check_eligibility(&self, percentage: f64) -> Eligibility;

    fn minimum_threshold(&self) -> f64;

    fn warning_threshold(&self) -> f64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAttendanceRule;

impl AttendanceRuleStrategy for StandardAttendanceRule {
    fn check_eligibility(&self, percentage: f64) -> Eligibility {
        let minimum = self.minimum_threshold();
        let warning = self.warning_threshold();

        if percentage < minimum {
            Eligibility {
                eligible: false,
                warning: true,
                message: format!(
                    "Attendance is {percentage:.1}%. Minimum {minimum}% required to sit for exam."
                ),
            }
        } else if percentage < warning {
            Eligibility {
                eligible: true,
                warning: true,
                message: format!(
                    "Warning: Attendance is {percentage:.1}%. Please maintain above {warning}%."
                ),
            }
        } else {
            Eligibility {
                eligible: true,
                warning: false,
                message: format!("Attendance is {percentage:.1}%. Good standing."),
            }
        }
    }

    fn minimum_threshold(&self) -> f64 {
        MINIMUM_ATTENDANCE
    }

    fn warning_threshold(&self) -> f64 {
        WARNING_ATTENDANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(attended: u32, absent: u32) -> AttendanceStats {
        AttendanceStats { attended, absent }
    }

    #[test]
    fn test_percentage() {
        assert_eq!(stats(65, 35).percentage(), 65.0);
        assert_eq!(stats(0, 0).percentage(), 0.0);
        assert_eq!(stats(3, 1).percentage(), 75.0);
    }

    #[test]
    fn test_eligibility_bands() {
        let rule = StandardAttendanceRule;

        let at_minimum = rule.check_eligibility(stats(65, 35).percentage());
        assert!(at_minimum.eligible);
        assert!(at_minimum.warning);

        let below = rule.check_eligibility(stats(64, 36).percentage());
        assert!(!below.eligible);
        assert!(below.warning);

        let good = rule.check_eligibility(70.0);
        assert!(good.eligible);
        assert!(!good.warning);
    }

    #[test]
    fn test_message_has_one_decimal() {
        let check = StandardAttendanceRule.check_eligibility(2.0 / 3.0 * 100.0);
        assert!(check.message.contains("66.7%"), "{}", check.message);

        let check = StandardAttendanceRule.check_eligibility(64.0);
        assert!(check.message.contains("64.0%"), "{}", check.message);
    }
}
