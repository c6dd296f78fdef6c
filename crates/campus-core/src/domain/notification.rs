use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The entity a notification points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub entity_type: String,
    pub id: String,
}

/// An in-app notification materialised from a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_entity: Option<RelatedEntity>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: impl Into<String>,
        kind: &str,
        title: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: super::new_id(),
            recipient_id: recipient_id.into(),
            kind: kind.to_string(),
            title: title.to_string(),
            message: message.into(),
            related_entity: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn about(mut self, entity_type: &str, id: impl Into<String>) -> Self {
        self.related_entity = Some(RelatedEntity {
            entity_type: entity_type.to_string(),
            id: id.into(),
        });
        self
    }
}
