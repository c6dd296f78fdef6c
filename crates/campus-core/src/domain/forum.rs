use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::strategies::Badge;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

/// One user's current vote on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub user_id: String,
    pub vote: VoteDirection,
}

/// Replace `user_id`'s vote and return the recomputed (up, down) tallies.
pub(crate) fn apply_vote(
    voted_by: &mut Vec<VoteRecord>,
    user_id: &str,
    vote: VoteDirection,
) -> (u32, u32) {
    voted_by.retain(|v| v.user_id != user_id);
    voted_by.push(VoteRecord {
        user_id: user_id.to_string(),
        vote,
    });
    let up = voted_by.iter().filter(|v| v.vote == VoteDirection::Up).count() as u32;
    (up, voted_by.len() as u32 - up)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumQuestion {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub upvotes: u32,
    pub downvotes: u32,
    pub views: u64,
    pub voted_by: Vec<VoteRecord>,
    pub accepted_answer_id: Option<String>,
    pub is_closed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumAnswer {
    pub id: String,
    pub question_id: String,
    pub author_id: String,
    pub content: String,
    pub upvotes: u32,
    pub downvotes: u32,
    pub voted_by: Vec<VoteRecord>,
    pub is_accepted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived forum standing of one user. Never edited by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForumReputation {
    pub id: String,
    pub user_id: String,
    pub reputation: u64,
    pub badges: Vec<Badge>,
    pub questions_asked: u32,
    pub answers_given: u32,
    pub accepted_answers: u32,
    pub updated_at: DateTime<Utc>,
}
