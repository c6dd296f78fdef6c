use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeScope {
    /// Campus-wide
    Central,
    /// Visible to one department
    Departmental,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub title: String,
    pub content: String,
    pub scope: NoticeScope,
    pub department_id: Option<String>,
    pub published_by: String,
    pub is_pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Notice {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires| expires >= now)
    }
}
