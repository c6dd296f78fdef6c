//! Central and departmental notice board.

use std::sync::Arc;

use campus_state::{Collection, DocumentStore, Filter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::{paginate, publish, Page};
use crate::domain::{Notice, NoticeScope, WorkflowError, WorkflowResult};
use crate::events::{Event, EventPublisher, EventType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotice {
    pub title: String,
    pub content: String,
    pub scope: NoticeScope,
    /// Required for departmental notices.
    pub department_id: Option<String>,
    pub published_by: String,
    pub is_pinned: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoticeQuery {
    pub scope: Option<NoticeScope>,
    pub department_id: Option<String>,
    /// 1-based.
    pub page: usize,
    pub limit: Option<usize>,
}

pub struct NoticeWorkflow {
    notices: Collection<Notice>,
    publisher: Arc<EventPublisher>,
    page_size: usize,
}

impl NoticeWorkflow {
    pub fn new(store: Arc<dyn DocumentStore>, publisher: Arc<EventPublisher>, page_size: usize) -> Self {
        Self {
            notices: Collection::new(store),
            publisher,
            page_size,
        }
    }

    #[instrument(skip(self, input), fields(scope = ?input.scope))]
    pub async fn publish_notice(&self, input: NewNotice) -> WorkflowResult<Notice> {
        if input.scope == NoticeScope::Departmental && input.department_id.is_none() {
            return Err(WorkflowError::precondition(
                "department id required for departmental notices",
            ));
        }
        let notice = self
            .notices
            .create(&Notice {
                id: crate::domain::new_id(),
                title: input.title,
                content: input.content,
                scope: input.scope,
                department_id: input.department_id,
                published_by: input.published_by,
                is_pinned: input.is_pinned,
                expires_at: input.expires_at,
                attachments: input.attachments,
                created_at: Utc::now(),
            })
            .await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::NoticePublished,
                json!({
                    "notice_id": notice.id,
                    "scope": notice.scope,
                    "department_id": notice.department_id,
                    "title": notice.title,
                }),
            )
            .triggered_by(notice.published_by.as_str()),
        )
        .await;
        Ok(notice)
    }

    /// Unexpired notices at `now`, pinned first then newest first.
    pub async fn active_notices(
        &self,
        query: NoticeQuery,
        now: DateTime<Utc>,
    ) -> WorkflowResult<Page<Notice>> {
        let mut filter = Filter::all();
        if let Some(scope) = query.scope {
            filter = filter.eq("scope", serde_json::to_value(scope)?);
        }
        if let Some(department_id) = &query.department_id {
            filter = filter.eq("department_id", department_id.as_str());
        }
        let mut items: Vec<Notice> = self
            .notices
            .find(&filter)
            .await?
            .into_iter()
            .filter(|n| n.is_active(now))
            .collect();
        items.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(paginate(
            items,
            query.page,
            query.limit.unwrap_or(self.page_size),
        ))
    }
}
