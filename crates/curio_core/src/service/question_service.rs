//! Question use-case service.
//!
//! # Responsibility
//! - Provide the write paths of the question lifecycle: ask, edit,
//!   retag, close/reopen, favourite toggling.
//! - Create a revision for every content-changing write and generate
//!   the default revision summary from the change set.
//! - Apply wiki auto-conversion thresholds.
//!
//! # Invariants
//! - Every content write renders markdown through the sanitizer before
//!   persistence.
//! - Edits that change nothing create no revision.
//! - Wiki mode can be turned on, never off.

use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::clock::now_millis;
use crate::diff::{self, QuestionChanges};
use crate::markdown::{render_markdown, summarize};
use crate::model::question::{Question, QuestionId};
use crate::model::revision::QuestionRevision;
use crate::model::tag::{join_tagnames, parse_tagnames};
use crate::model::user::UserId;
use crate::repo::question_repo::{
    NewQuestion, NewQuestionRevision, QuestionEdit, QuestionRepository,
};
use crate::repo::RepoError;

/// Body edits by the asker before a question auto-converts to wiki.
pub const AUTHOR_EDITS_WIKI_THRESHOLD: i64 = 5;
/// Distinct editors before a question auto-converts to wiki.
pub const DISTINCT_EDITORS_WIKI_THRESHOLD: i64 = 4;

/// Service error for question use-cases.
#[derive(Debug)]
pub enum QuestionServiceError {
    QuestionNotFound(QuestionId),
    RevisionNotFound { question_id: QuestionId, revision: i64 },
    AlreadyClosed(QuestionId),
    NotClosed(QuestionId),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for QuestionServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuestionNotFound(id) => write!(f, "question not found: {id}"),
            Self::RevisionNotFound {
                question_id,
                revision,
            } => write!(f, "revision {revision} of question {question_id} not found"),
            Self::AlreadyClosed(id) => write!(f, "question already closed: {id}"),
            Self::NotClosed(id) => write!(f, "question is not closed: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent question state: {details}"),
        }
    }
}

impl Error for QuestionServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for QuestionServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "question",
                id,
            } => Self::QuestionNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Input for asking a question.
#[derive(Debug, Clone)]
pub struct AskQuestionInput {
    pub title: String,
    /// Space-separated tag names, normalized by the service.
    pub tagnames: String,
    /// Markdown body.
    pub text: String,
    pub wiki: bool,
}

/// Input for a full question edit.
#[derive(Debug, Clone)]
pub struct EditQuestionInput {
    pub title: String,
    pub tagnames: String,
    pub text: String,
    pub wiki: bool,
    /// Optional edit summary; generated from the change set when blank.
    pub summary: String,
}

/// One rendered entry of the revision history page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRevisionPage {
    pub revision: QuestionRevision,
    /// Revision rendered through the revision template.
    pub html: String,
    /// Inline diff against the previous revision; `None` for the first.
    pub diff: Option<String>,
}

/// Question service facade over the repository implementation.
pub struct QuestionService<R: QuestionRepository> {
    repo: R,
}

impl<R: QuestionRepository> QuestionService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a question, links its tags and records revision 1.
    pub fn ask(
        &mut self,
        author: UserId,
        input: &AskQuestionInput,
    ) -> Result<Question, QuestionServiceError> {
        let added_at = now_millis();
        let html = render_markdown(&input.text);
        let summary = summarize(&html);
        let names = parse_tagnames(&input.tagnames);
        let tagnames = join_tagnames(&names);

        let question_id = self.repo.create_question(&NewQuestion {
            title: input.title.clone(),
            author_id: author,
            added_at,
            tagnames: tagnames.clone(),
            summary,
            html,
            text: input.text.clone(),
            wiki: input.wiki,
        })?;
        self.repo.relink_tags(question_id, &names, author)?;
        self.repo.create_revision(&NewQuestionRevision {
            question_id,
            title: input.title.clone(),
            author_id: author,
            revised_at: added_at,
            tagnames,
            summary: "asked question".to_string(),
            text: input.text.clone(),
        })?;

        info!("event=question_ask module=service status=ok question_id={question_id}");
        self.read_back(question_id)
    }

    /// Applies a full edit: content update, tag relinking, next revision,
    /// wiki auto-conversion. A no-op edit returns the question unchanged.
    pub fn edit(
        &mut self,
        editor: UserId,
        question_id: QuestionId,
        input: &EditQuestionInput,
    ) -> Result<Question, QuestionServiceError> {
        let question = self.get_active(question_id)?;
        let latest = self.repo.latest_revision(question_id)?;

        let names = parse_tagnames(&input.tagnames);
        let tagnames = join_tagnames(&names);
        let changes = QuestionChanges {
            title: input.title != latest.title,
            body: input.text != latest.text,
            tags: tagnames != join_tagnames(&parse_tagnames(&latest.tagnames)),
            wiki: input.wiki && !question.wiki,
        };
        if !changes.title && !changes.body && !changes.tags && !changes.wiki {
            return Ok(question);
        }

        let edited_at = now_millis();
        let html = render_markdown(&input.text);
        let summary = summarize(&html);
        self.repo.apply_edit(&QuestionEdit {
            question_id,
            title: input.title.clone(),
            tagnames: tagnames.clone(),
            summary,
            html,
            text: input.text.clone(),
            edited_at,
            edited_by: editor,
            set_wiki: changes.wiki,
        })?;
        if changes.tags {
            self.repo.relink_tags(question_id, &names, editor)?;
        }

        let revision_summary = if input.summary.trim().is_empty() {
            diff::question_revision_summary(changes)
        } else {
            input.summary.trim().to_string()
        };
        let revision = self.repo.create_revision(&NewQuestionRevision {
            question_id,
            title: input.title.clone(),
            author_id: editor,
            revised_at: edited_at,
            tagnames,
            summary: revision_summary,
            text: input.text.clone(),
        })?;

        if !question.wiki && !changes.wiki {
            self.apply_wiki_thresholds(question_id, question.author_id, edited_at)?;
        }

        info!(
            "event=question_edit module=service status=ok question_id={question_id} revision={revision}"
        );
        self.read_back(question_id)
    }

    /// Tags-only edit used by the retag flow.
    pub fn retag(
        &mut self,
        editor: UserId,
        question_id: QuestionId,
        tagnames: &str,
    ) -> Result<Question, QuestionServiceError> {
        let question = self.get_active(question_id)?;
        let latest = self.repo.latest_revision(question_id)?;

        let names = parse_tagnames(tagnames);
        let joined = join_tagnames(&names);
        if joined == join_tagnames(&parse_tagnames(&latest.tagnames)) {
            return Ok(question);
        }

        let retagged_at = now_millis();
        self.repo
            .apply_retag(question_id, &joined, retagged_at, editor)?;
        self.repo.relink_tags(question_id, &names, editor)?;
        self.repo.create_revision(&NewQuestionRevision {
            question_id,
            title: latest.title,
            author_id: editor,
            revised_at: retagged_at,
            tagnames: joined,
            summary: "modified tags".to_string(),
            text: latest.text,
        })?;

        info!("event=question_retag module=service status=ok question_id={question_id}");
        self.read_back(question_id)
    }

    pub fn close(
        &mut self,
        user: UserId,
        question_id: QuestionId,
        reason: &str,
    ) -> Result<(), QuestionServiceError> {
        let question = self.get_active(question_id)?;
        if question.closed {
            return Err(QuestionServiceError::AlreadyClosed(question_id));
        }
        self.repo
            .set_closed(question_id, user, now_millis(), reason)?;
        info!("event=question_close module=service status=ok question_id={question_id}");
        Ok(())
    }

    pub fn reopen(&mut self, question_id: QuestionId) -> Result<(), QuestionServiceError> {
        let question = self.get_active(question_id)?;
        if !question.closed {
            return Err(QuestionServiceError::NotClosed(question_id));
        }
        self.repo.reopen(question_id)?;
        info!("event=question_reopen module=service status=ok question_id={question_id}");
        Ok(())
    }

    /// Toggles the favourite mark; returns whether it now exists.
    pub fn toggle_favourite(
        &mut self,
        user: UserId,
        question_id: QuestionId,
    ) -> Result<bool, QuestionServiceError> {
        self.get_active(question_id)?;
        let favourited = self.repo.toggle_favourite(question_id, user, now_millis())?;
        Ok(favourited)
    }

    /// Revision history, newest first, each entry rendered and diffed
    /// against the revision before it.
    pub fn revision_pages(
        &self,
        question_id: QuestionId,
    ) -> Result<Vec<QuestionRevisionPage>, QuestionServiceError> {
        let revisions = self.repo.list_revisions(question_id)?;
        if revisions.is_empty() {
            return Err(QuestionServiceError::QuestionNotFound(question_id));
        }

        let mut pages: Vec<QuestionRevisionPage> = revisions
            .into_iter()
            .map(|revision| {
                let html = render_question_revision(&revision);
                QuestionRevisionPage {
                    revision,
                    html,
                    diff: None,
                }
            })
            .collect();

        // pages[i] is newer than pages[i + 1]; diff each against its elder.
        for newer in 0..pages.len().saturating_sub(1) {
            let diffed = diff::inline_html_diff(&pages[newer + 1].html, &pages[newer].html);
            pages[newer].diff = Some(diffed);
        }

        Ok(pages)
    }

    fn apply_wiki_thresholds(
        &mut self,
        question_id: QuestionId,
        question_author: UserId,
        at: i64,
    ) -> Result<(), QuestionServiceError> {
        let author_edits = self.repo.author_edit_count(question_id, question_author)?;
        let editors = self.repo.distinct_editor_count(question_id)?;
        if author_edits >= AUTHOR_EDITS_WIKI_THRESHOLD
            || editors >= DISTINCT_EDITORS_WIKI_THRESHOLD
        {
            self.repo.wikify(question_id, at)?;
            info!("event=question_auto_wiki module=service status=ok question_id={question_id}");
        }
        Ok(())
    }

    fn get_active(&self, question_id: QuestionId) -> Result<Question, QuestionServiceError> {
        match self.repo.get_question(question_id)? {
            Some(question) if !question.deleted => Ok(question),
            _ => Err(QuestionServiceError::QuestionNotFound(question_id)),
        }
    }

    fn read_back(&self, question_id: QuestionId) -> Result<Question, QuestionServiceError> {
        self.repo
            .get_question(question_id)?
            .ok_or(QuestionServiceError::InconsistentState(
                "written question not found in read-back",
            ))
    }
}

/// Renders one revision for the history page: title, body and tags in
/// the shape the revision list template expects.
fn render_question_revision(revision: &QuestionRevision) -> String {
    let tags = parse_tagnames(&revision.tagnames)
        .iter()
        .map(|tag| format!("<a class=\"tag\">{tag}</a>"))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "<h1>{}</h1>\n<div class=\"text\">{}</div>\n<div class=\"tags\">{}</div>",
        escape_html(&revision.title),
        render_markdown(&revision.text),
        tags
    )
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
