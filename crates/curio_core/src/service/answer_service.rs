//! Answer use-case service.
//!
//! # Responsibility
//! - Provide the write paths of the answer lifecycle: add, edit,
//!   accept toggling.
//! - Apply the auto-wiki rules: the 30th answer converts the whole
//!   thread, and heavily edited answers convert individually.
//!
//! # Invariants
//! - Every content write renders markdown through the sanitizer.
//! - At most one accepted answer per question.

use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::clock::now_millis;
use crate::diff;
use crate::markdown::render_markdown;
use crate::model::answer::{Answer, AnswerId};
use crate::model::question::Question;
use crate::model::revision::AnswerRevision;
use crate::model::user::UserId;
use crate::repo::answer_repo::{AnswerEdit, AnswerRepository, NewAnswer, NewAnswerRevision};
use crate::repo::RepoError;
use crate::service::question_service::{
    AUTHOR_EDITS_WIKI_THRESHOLD, DISTINCT_EDITORS_WIKI_THRESHOLD,
};

/// Answers on a question before the whole thread converts to wiki; also
/// the answer page size on the question view.
pub const AUTO_WIKI_ANSWER_COUNT: i64 = 30;

/// Reputation gained by the author of an accepted answer.
pub const ACCEPT_REPUTATION_DELTA: i64 = 15;

/// Service error for answer use-cases.
#[derive(Debug)]
pub enum AnswerServiceError {
    AnswerNotFound(AnswerId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for AnswerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnswerNotFound(id) => write!(f, "answer not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent answer state: {details}"),
        }
    }
}

impl Error for AnswerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AnswerServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "answer", id,
            } => Self::AnswerNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Input for editing an answer.
#[derive(Debug, Clone)]
pub struct EditAnswerInput {
    pub text: String,
    pub wiki: bool,
    /// Optional edit summary; generated when blank.
    pub summary: String,
}

/// One rendered entry of the answer revision history page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRevisionPage {
    pub revision: AnswerRevision,
    pub html: String,
    pub diff: Option<String>,
}

/// Answer service facade over the repository implementation.
pub struct AnswerService<R: AnswerRepository> {
    repo: R,
}

impl<R: AnswerRepository> AnswerService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds an answer and records revision 1. Forces wiki mode past the
    /// answer-count threshold and converts the thread on the 30th answer.
    pub fn add_answer(
        &mut self,
        author: UserId,
        question: &Question,
        text: &str,
        wiki: bool,
    ) -> Result<Answer, AnswerServiceError> {
        let added_at = now_millis();
        let wiki = wiki || question.answer_count >= AUTO_WIKI_ANSWER_COUNT;

        let answer_id = self.repo.create_answer(&NewAnswer {
            question_id: question.id,
            author_id: author,
            added_at,
            html: render_markdown(text),
            text: text.to_string(),
            wiki,
        })?;
        self.repo.create_revision(&NewAnswerRevision {
            answer_id,
            author_id: author,
            revised_at: added_at,
            summary: "added answer".to_string(),
            text: text.to_string(),
        })?;

        if question.answer_count + 1 >= AUTO_WIKI_ANSWER_COUNT {
            self.repo.wikify_thread(question.id, added_at)?;
        }

        info!(
            "event=answer_add module=service status=ok question_id={} answer_id={answer_id}",
            question.id
        );
        self.read_back(answer_id)
    }

    /// Applies an edit: content update, next revision, wiki thresholds.
    /// A no-op edit returns the answer unchanged.
    pub fn edit(
        &mut self,
        editor: UserId,
        answer_id: AnswerId,
        input: &EditAnswerInput,
    ) -> Result<Answer, AnswerServiceError> {
        let answer = self.get_active(answer_id)?;
        let latest = self.repo.latest_revision(answer_id)?;

        let body_changed = input.text != latest.text;
        let wiki_turned_on = input.wiki && !answer.wiki;
        if !body_changed && !wiki_turned_on {
            return Ok(answer);
        }

        let edited_at = now_millis();
        self.repo.apply_edit(&AnswerEdit {
            answer_id,
            html: render_markdown(&input.text),
            text: input.text.clone(),
            edited_at,
            edited_by: editor,
            set_wiki: wiki_turned_on,
        })?;

        let summary = if input.summary.trim().is_empty() {
            diff::answer_revision_summary(body_changed, wiki_turned_on)
        } else {
            input.summary.trim().to_string()
        };
        let revision = self.repo.create_revision(&NewAnswerRevision {
            answer_id,
            author_id: editor,
            revised_at: edited_at,
            summary,
            text: input.text.clone(),
        })?;

        if !answer.wiki && !wiki_turned_on {
            let author_edits = self.repo.author_edit_count(answer_id, answer.author_id)?;
            let editors = self.repo.distinct_editor_count(answer_id)?;
            if author_edits >= AUTHOR_EDITS_WIKI_THRESHOLD
                || editors >= DISTINCT_EDITORS_WIKI_THRESHOLD
            {
                self.repo.wikify(answer_id, edited_at)?;
                info!("event=answer_auto_wiki module=service status=ok answer_id={answer_id}");
            }
        }

        info!("event=answer_edit module=service status=ok answer_id={answer_id} revision={revision}");
        self.read_back(answer_id)
    }

    /// Toggles acceptance; returns whether the answer is now accepted.
    /// Reputation of the involved answer authors moves with the mark.
    pub fn toggle_accept(&mut self, answer_id: AnswerId) -> Result<bool, AnswerServiceError> {
        let answer = self.get_active(answer_id)?;
        if answer.accepted {
            self.repo.unaccept(answer_id, ACCEPT_REPUTATION_DELTA)?;
            info!("event=answer_unaccept module=service status=ok answer_id={answer_id}");
            Ok(false)
        } else {
            self.repo.accept(answer_id, ACCEPT_REPUTATION_DELTA)?;
            info!("event=answer_accept module=service status=ok answer_id={answer_id}");
            Ok(true)
        }
    }

    /// Revision history, newest first, diffed like question revisions.
    pub fn revision_pages(
        &self,
        answer_id: AnswerId,
    ) -> Result<Vec<AnswerRevisionPage>, AnswerServiceError> {
        let revisions = self.repo.list_revisions(answer_id)?;
        if revisions.is_empty() {
            return Err(AnswerServiceError::AnswerNotFound(answer_id));
        }

        let mut pages: Vec<AnswerRevisionPage> = revisions
            .into_iter()
            .map(|revision| {
                let html = format!(
                    "<div class=\"text\">{}</div>",
                    render_markdown(&revision.text)
                );
                AnswerRevisionPage {
                    revision,
                    html,
                    diff: None,
                }
            })
            .collect();

        for newer in 0..pages.len().saturating_sub(1) {
            let diffed = diff::inline_html_diff(&pages[newer + 1].html, &pages[newer].html);
            pages[newer].diff = Some(diffed);
        }

        Ok(pages)
    }

    fn get_active(&self, answer_id: AnswerId) -> Result<Answer, AnswerServiceError> {
        match self.repo.get_answer(answer_id)? {
            Some(answer) if !answer.deleted => Ok(answer),
            _ => Err(AnswerServiceError::AnswerNotFound(answer_id)),
        }
    }

    fn read_back(&self, answer_id: AnswerId) -> Result<Answer, AnswerServiceError> {
        self.repo
            .get_answer(answer_id)?
            .ok_or(AnswerServiceError::InconsistentState(
                "written answer not found in read-back",
            ))
    }
}
