//! Q&A forum with votes, accepted answers and derived reputation.

use std::sync::Arc;

use campus_state::{Collection, DocumentStore, Filter};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use super::locks::EntityLocks;
use super::{paginate, publish, Page};
use crate::domain::forum::apply_vote;
use crate::domain::{
    ForumAnswer, ForumQuestion, ForumReputation, VoteDirection, WorkflowError, WorkflowResult,
};
use crate::events::{Event, EventPublisher, EventType};
use crate::strategies::{ReputationInputs, ReputationStrategy};

/// Listing filters for [`ForumWorkflow::questions`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionQuery {
    /// Match questions carrying any of these tags.
    pub tags: Vec<String>,
    pub author_id: Option<String>,
    /// Case-insensitive substring of the title or content.
    pub search: Option<String>,
    /// 1-based.
    pub page: usize,
    pub limit: Option<usize>,
}

pub struct ForumWorkflow {
    questions: Collection<ForumQuestion>,
    answers: Collection<ForumAnswer>,
    reputations: Collection<ForumReputation>,
    publisher: Arc<EventPublisher>,
    reputation: Arc<dyn ReputationStrategy>,
    page_size: usize,
    locks: EntityLocks,
}

impl ForumWorkflow {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        publisher: Arc<EventPublisher>,
        reputation: Arc<dyn ReputationStrategy>,
        page_size: usize,
    ) -> Self {
        Self {
            questions: Collection::new(store.clone()),
            answers: Collection::new(store.clone()),
            reputations: Collection::new(store),
            publisher,
            reputation,
            page_size,
            locks: EntityLocks::new(),
        }
    }

    #[instrument(skip(self, content, tags))]
    pub async fn post_question(
        &self,
        author_id: &str,
        title: &str,
        content: &str,
        tags: Vec<String>,
    ) -> WorkflowResult<ForumQuestion> {
        if title.trim().is_empty() {
            return Err(WorkflowError::precondition("question title is empty"));
        }
        let now = Utc::now();
        let question = self
            .questions
            .create(&ForumQuestion {
                id: crate::domain::new_id(),
                author_id: author_id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                tags,
                upvotes: 0,
                downvotes: 0,
                views: 0,
                voted_by: Vec::new(),
                accepted_answer_id: None,
                is_closed: false,
                created_at: now,
                updated_at: now,
            })
            .await?;
        self.update_reputation(author_id).await?;
        Ok(question)
    }

    #[instrument(skip(self, content))]
    pub async fn post_answer(
        &self,
        question_id: &str,
        author_id: &str,
        content: &str,
    ) -> WorkflowResult<ForumAnswer> {
        let question = self.questions.fetch(question_id).await?;
        if question.is_closed {
            return Err(WorkflowError::precondition(format!(
                "question {question_id} is closed"
            )));
        }
        let now = Utc::now();
        let answer = self
            .answers
            .create(&ForumAnswer {
                id: crate::domain::new_id(),
                question_id: question_id.to_string(),
                author_id: author_id.to_string(),
                content: content.to_string(),
                upvotes: 0,
                downvotes: 0,
                voted_by: Vec::new(),
                is_accepted: false,
                created_at: now,
                updated_at: now,
            })
            .await?;
        self.update_reputation(author_id).await?;

        publish(
            &self.publisher,
            Event::new(
                EventType::ForumAnswerPosted,
                json!({
                    "answer_id": answer.id,
                    "question_id": question.id,
                    "question_title": question.title,
                    "question_author_id": question.author_id,
                    "answer_author_id": author_id,
                }),
            )
            .triggered_by(author_id),
        )
        .await;
        Ok(answer)
    }

    /// Record or change a vote. Tallies are re-derived from the voter list.
    #[instrument(skip(self))]
    pub async fn vote_question(
        &self,
        question_id: &str,
        user_id: &str,
        vote: VoteDirection,
    ) -> WorkflowResult<ForumQuestion> {
        let _guard = self.locks.lock(format!("question:{question_id}")).await;
        let mut question = self.questions.fetch(question_id).await?;
        if question.author_id == user_id {
            return Err(WorkflowError::precondition("cannot vote on your own question"));
        }
        let (up, down) = apply_vote(&mut question.voted_by, user_id, vote);
        question.upvotes = up;
        question.downvotes = down;
        question.updated_at = Utc::now();
        self.questions.save(&question).await?;

        self.update_reputation(&question.author_id).await?;
        Ok(question)
    }

    #[instrument(skip(self))]
    pub async fn vote_answer(
        &self,
        answer_id: &str,
        user_id: &str,
        vote: VoteDirection,
    ) -> WorkflowResult<ForumAnswer> {
        let _guard = self.locks.lock(format!("answer:{answer_id}")).await;
        let mut answer = self.answers.fetch(answer_id).await?;
        if answer.author_id == user_id {
            return Err(WorkflowError::precondition("cannot vote on your own answer"));
        }
        let (up, down) = apply_vote(&mut answer.voted_by, user_id, vote);
        answer.upvotes = up;
        answer.downvotes = down;
        answer.updated_at = Utc::now();
        self.answers.save(&answer).await?;

        self.update_reputation(&answer.author_id).await?;
        Ok(answer)
    }

    /// Mark an answer accepted. Only the question's author may; a previously
    /// accepted answer is un-accepted and both authors are re-scored.
    #[instrument(skip(self))]
    pub async fn accept_answer(
        &self,
        question_id: &str,
        answer_id: &str,
        actor_id: &str,
    ) -> WorkflowResult<ForumAnswer> {
        let _guard = self.locks.lock(format!("question:{question_id}")).await;
        let mut question = self.questions.fetch(question_id).await?;
        if question.author_id != actor_id {
            return Err(WorkflowError::unauthorized(
                actor_id,
                format!("accept answers on question {question_id}"),
            ));
        }

        // Answer locks nest inside the question lock, in id order.
        let mut answer_ids = vec![answer_id.to_string()];
        answer_ids.extend(
            question
                .accepted_answer_id
                .clone()
                .filter(|previous| previous != answer_id),
        );
        answer_ids.sort();
        let mut answer_guards = Vec::with_capacity(answer_ids.len());
        for id in &answer_ids {
            answer_guards.push(self.locks.lock(format!("answer:{id}")).await);
        }

        let mut answer = self.answers.fetch(answer_id).await?;
        if answer.question_id != question_id {
            return Err(WorkflowError::precondition(format!(
                "answer {answer_id} does not belong to question {question_id}"
            )));
        }
        if answer.is_accepted {
            return Ok(answer);
        }

        let mut previous_author = None;
        if let Some(previous_id) = question.accepted_answer_id.take() {
            if let Some(mut previous) = self.answers.get(&previous_id).await? {
                previous.is_accepted = false;
                previous.updated_at = Utc::now();
                self.answers.save(&previous).await?;
                previous_author = Some(previous.author_id);
            }
        }

        let now = Utc::now();
        question.accepted_answer_id = Some(answer.id.clone());
        question.updated_at = now;
        self.questions.save(&question).await?;

        answer.is_accepted = true;
        answer.updated_at = now;
        self.answers.save(&answer).await?;

        self.update_reputation(&answer.author_id).await?;
        if let Some(previous_author) = previous_author.filter(|a| *a != answer.author_id) {
            self.update_reputation(&previous_author).await?;
        }

        publish(
            &self.publisher,
            Event::new(
                EventType::ForumAnswerAccepted,
                json!({
                    "answer_id": answer.id,
                    "question_id": question_id,
                    "answer_author_id": answer.author_id,
                }),
            )
            .triggered_by(actor_id),
        )
        .await;
        Ok(answer)
    }

    /// Close a question to new answers. Author only.
    #[instrument(skip(self))]
    pub async fn close_question(
        &self,
        question_id: &str,
        actor_id: &str,
    ) -> WorkflowResult<ForumQuestion> {
        let _guard = self.locks.lock(format!("question:{question_id}")).await;
        let mut question = self.questions.fetch(question_id).await?;
        if question.author_id != actor_id {
            return Err(WorkflowError::unauthorized(
                actor_id,
                format!("close question {question_id}"),
            ));
        }
        question.is_closed = true;
        question.updated_at = Utc::now();
        self.questions.save(&question).await?;
        Ok(question)
    }

    /// Recompute a user's reputation from their questions and answers and
    /// upsert it.
    #[instrument(skip(self))]
    pub async fn update_reputation(&self, user_id: &str) -> WorkflowResult<ForumReputation> {
        let _guard = self.locks.lock(format!("reputation:{user_id}")).await;
        let questions = self
            .questions
            .find(&Filter::all().eq("author_id", user_id))
            .await?;
        let answers = self
            .answers
            .find(&Filter::all().eq("author_id", user_id))
            .await?;

        let inputs = ReputationInputs {
            questions_asked: questions.len() as u32,
            answers_given: answers.len() as u32,
            accepted_answers: answers.iter().filter(|a| a.is_accepted).count() as u32,
            upvotes_received: questions.iter().map(|q| q.upvotes).sum::<u32>()
                + answers.iter().map(|a| a.upvotes).sum::<u32>(),
            downvotes_received: questions.iter().map(|q| q.downvotes).sum::<u32>()
                + answers.iter().map(|a| a.downvotes).sum::<u32>(),
        };
        let score = self.reputation.reputation(&inputs);
        let badges = self.reputation.badges(score, inputs.accepted_answers);
        debug!(score, ?inputs, "reputation recomputed");

        let existing = self
            .reputations
            .find_one(&Filter::all().eq("user_id", user_id))
            .await?;
        let record = ForumReputation {
            id: existing
                .as_ref()
                .map_or_else(crate::domain::new_id, |r| r.id.clone()),
            user_id: user_id.to_string(),
            reputation: score,
            badges,
            questions_asked: inputs.questions_asked,
            answers_given: inputs.answers_given,
            accepted_answers: inputs.accepted_answers,
            updated_at: Utc::now(),
        };
        match existing {
            Some(_) => self.reputations.save(&record).await?,
            None => {
                self.reputations.create(&record).await?;
            }
        }
        Ok(record)
    }

    /// A user's reputation, computed on first request.
    pub async fn reputation(&self, user_id: &str) -> WorkflowResult<ForumReputation> {
        match self
            .reputations
            .find_one(&Filter::all().eq("user_id", user_id))
            .await?
        {
            Some(record) => Ok(record),
            None => self.update_reputation(user_id).await,
        }
    }

    /// Newest questions first, filtered and paginated.
    pub async fn questions(&self, query: QuestionQuery) -> WorkflowResult<Page<ForumQuestion>> {
        let filter = match &query.author_id {
            Some(author_id) => Filter::all().eq("author_id", author_id.as_str()),
            None => Filter::all(),
        };
        let search = query.search.as_deref().map(str::to_lowercase);
        let mut items: Vec<ForumQuestion> = self
            .questions
            .find(&filter)
            .await?
            .into_iter()
            .filter(|q| query.tags.is_empty() || q.tags.iter().any(|t| query.tags.contains(t)))
            .filter(|q| match &search {
                Some(needle) => {
                    q.title.to_lowercase().contains(needle)
                        || q.content.to_lowercase().contains(needle)
                }
                None => true,
            })
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(
            items,
            query.page,
            query.limit.unwrap_or(self.page_size),
        ))
    }

    /// Load a question and count the view.
    pub async fn question(&self, question_id: &str) -> WorkflowResult<ForumQuestion> {
        let _guard = self.locks.lock(format!("question:{question_id}")).await;
        let mut question = self.questions.fetch(question_id).await?;
        question.views += 1;
        self.questions.save(&question).await?;
        Ok(question)
    }

    /// Answers with the accepted one first, then by upvotes, then oldest first.
    pub async fn answers(&self, question_id: &str) -> WorkflowResult<Vec<ForumAnswer>> {
        let mut items = self
            .answers
            .find(&Filter::all().eq("question_id", question_id))
            .await?;
        items.sort_by(|a, b| {
            b.is_accepted
                .cmp(&a.is_accepted)
                .then_with(|| b.upvotes.cmp(&a.upvotes))
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(items)
    }
}
