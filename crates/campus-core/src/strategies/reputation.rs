use serde::{Deserialize, Serialize};

/// Forum activity totals a reputation is computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationInputs {
    pub questions_asked: u32,
    pub answers_given: u32,
    pub accepted_answers: u32,
    pub upvotes_received: u32,
    pub downvotes_received: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Newcomer,
    Contributor,
    Expert,
    Moderator,
}

/// Converts forum totals into a score and badge set.
///
/// Always recomputed from the full totals, never applied incrementally.
pub trait ReputationStrategy: Send + Sync {
    fn reputation(&self, inputs: &ReputationInputs) -> u64;

    /// Cumulative badge set, lowest first.
    fn badges(&self, reputation: u64, accepted_answers: u32) -> Vec<Badge>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardReputationStrategy;

impl ReputationStrategy for StandardReputationStrategy {
    fn reputation(&self, inputs: &ReputationInputs) -> u64 {
        let gained = 5 * i64::from(inputs.questions_asked)
            + 10 * i64::from(inputs.answers_given)
            + 25 * i64::from(inputs.accepted_answers)
            + 10 * i64::from(inputs.upvotes_received);
        let lost = 2 * i64::from(inputs.downvotes_received);
        (gained - lost).max(0) as u64
    }

    fn badges(&self, reputation: u64, accepted_answers: u32) -> Vec<Badge> {
        let mut badges = vec![Badge::Newcomer];
        if reputation >= 100 || accepted_answers >= 5 {
            badges.push(Badge::Contributor);
        }
        if reputation >= 500 || accepted_answers >= 20 {
            badges.push(Badge::Expert);
        }
        if reputation >= 1000 || accepted_answers >= 50 {
            badges.push(Badge::Moderator);
        }
        badges
    }
}
