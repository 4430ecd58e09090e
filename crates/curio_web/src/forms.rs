//! Form payloads and their validation.
//!
//! Validation mirrors the Django-forms flow: each form validates into a
//! field -> message error map that the template re-renders next to the
//! fields, or that AJAX variants return as JSON.
//!
//! Checkbox fields arrive as `Some("on")` when checked and are absent
//! otherwise; submit buttons are detected by their field being present.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use curio_core::model::revision::{AnswerRevision, QuestionRevision};
use curio_core::model::tag::parse_tagnames;

pub type FormErrors = BTreeMap<String, String>;

pub const TITLE_MIN_CHARS: usize = 10;
pub const TITLE_MAX_CHARS: usize = 300;
pub const BODY_MAX_CHARS: usize = 30_000;
pub const TAG_MAX_COUNT: usize = 5;
pub const COMMENT_MIN_CHARS: usize = 10;
pub const COMMENT_MAX_CHARS: usize = 300;
pub const SUMMARY_MAX_CHARS: usize = 300;

/// Accepted close reasons, in display order.
pub const CLOSE_REASONS: &[&str] = &[
    "exact duplicate",
    "off topic",
    "subjective and argumentative",
    "not a real question",
    "too localized",
];

static TAG_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9#+.\-]{1,24}$").expect("valid tag name regex"));

/// Field values rendered back into the question form templates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuestionFormValues {
    pub title: String,
    pub tags: String,
    pub text: String,
    pub wiki: bool,
    pub summary: String,
}

impl QuestionFormValues {
    /// Populates the form from a stored revision, the edit flow's
    /// starting point.
    pub fn from_revision(revision: &QuestionRevision, wiki: bool) -> Self {
        Self {
            title: revision.title.clone(),
            tags: revision.tagnames.clone(),
            text: revision.text.clone(),
            wiki,
            summary: String::new(),
        }
    }

    pub fn from_ask_form(form: &AskQuestionForm) -> Self {
        Self {
            title: form.title.clone(),
            tags: form.tags.clone(),
            text: form.text.clone(),
            wiki: form.wiki_checked(),
            summary: String::new(),
        }
    }

    pub fn from_edit_form(form: &EditQuestionForm) -> Self {
        Self {
            title: form.title.clone(),
            tags: form.tags.clone(),
            text: form.text.clone(),
            wiki: form.wiki_checked(),
            summary: form.summary.clone(),
        }
    }
}

/// Field values rendered back into the answer form templates.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnswerFormValues {
    pub text: String,
    pub wiki: bool,
    pub summary: String,
}

impl AnswerFormValues {
    pub fn from_revision(revision: &AnswerRevision, wiki: bool) -> Self {
        Self {
            text: revision.text.clone(),
            wiki,
            summary: String::new(),
        }
    }

    pub fn from_add_form(form: &AddAnswerForm) -> Self {
        Self {
            text: form.text.clone(),
            wiki: form.wiki_checked(),
            summary: String::new(),
        }
    }

    pub fn from_edit_form(form: &EditAnswerForm) -> Self {
        Self {
            text: form.text.clone(),
            wiki: form.wiki_checked(),
            summary: form.summary.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskQuestionForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub wiki: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub submit: Option<String>,
}

impl AskQuestionForm {
    pub fn wiki_checked(&self) -> bool {
        self.wiki.is_some()
    }

    pub fn wants_preview(&self) -> bool {
        self.preview.is_some()
    }

    pub fn wants_submit(&self) -> bool {
        self.submit.is_some()
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        validate_title(&self.title, &mut errors);
        validate_body(&self.text, &mut errors);
        validate_tags(&self.tags, &mut errors);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditQuestionForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub wiki: Option<String>,
    /// "Change revision" button of the revision selector.
    #[serde(default)]
    pub select_revision: Option<String>,
    /// Revision number chosen in the selector.
    #[serde(default)]
    pub revision: Option<i64>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub submit: Option<String>,
}

impl EditQuestionForm {
    pub fn wiki_checked(&self) -> bool {
        self.wiki.is_some()
    }

    pub fn wants_revision_change(&self) -> bool {
        self.select_revision.is_some()
    }

    pub fn wants_preview(&self) -> bool {
        self.preview.is_some()
    }

    pub fn wants_submit(&self) -> bool {
        self.submit.is_some()
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        validate_title(&self.title, &mut errors);
        validate_body(&self.text, &mut errors);
        validate_tags(&self.tags, &mut errors);
        validate_summary(&self.summary, &mut errors);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetagQuestionForm {
    #[serde(default)]
    pub tags: String,
}

impl RetagQuestionForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        validate_tags(&self.tags, &mut errors);
        errors
    }
}

/// One form backs both the close and the reopen confirmation pages;
/// which submit button is present decides the action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloseQuestionForm {
    #[serde(default)]
    pub reason: String,
    /// Submit button of the close form.
    #[serde(default)]
    pub close: Option<String>,
    /// Submit button of the reopen form.
    #[serde(default)]
    pub reopen: Option<String>,
}

impl CloseQuestionForm {
    pub fn wants_close(&self) -> bool {
        self.close.is_some()
    }

    pub fn wants_reopen(&self) -> bool {
        self.reopen.is_some()
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        if !CLOSE_REASONS.contains(&self.reason.as_str()) {
            errors.insert(
                "reason".to_string(),
                "Select a valid close reason.".to_string(),
            );
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddAnswerForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub wiki: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub submit: Option<String>,
}

impl AddAnswerForm {
    pub fn wiki_checked(&self) -> bool {
        self.wiki.is_some()
    }

    pub fn wants_preview(&self) -> bool {
        self.preview.is_some()
    }

    pub fn wants_submit(&self) -> bool {
        self.submit.is_some()
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        validate_body(&self.text, &mut errors);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditAnswerForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub wiki: Option<String>,
    #[serde(default)]
    pub select_revision: Option<String>,
    #[serde(default)]
    pub revision: Option<i64>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub submit: Option<String>,
}

impl EditAnswerForm {
    pub fn wiki_checked(&self) -> bool {
        self.wiki.is_some()
    }

    pub fn wants_revision_change(&self) -> bool {
        self.select_revision.is_some()
    }

    pub fn wants_preview(&self) -> bool {
        self.preview.is_some()
    }

    pub fn wants_submit(&self) -> bool {
        self.submit.is_some()
    }

    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        validate_body(&self.text, &mut errors);
        validate_summary(&self.summary, &mut errors);
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub comment: String,
}

impl CommentForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        let length = self.comment.trim().chars().count();
        if length < COMMENT_MIN_CHARS {
            errors.insert(
                "comment".to_string(),
                format!("Comments must be at least {COMMENT_MIN_CHARS} characters."),
            );
        } else if length > COMMENT_MAX_CHARS {
            errors.insert(
                "comment".to_string(),
                format!("Comments may not exceed {COMMENT_MAX_CHARS} characters."),
            );
        }
        errors
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoteForm {
    #[serde(rename = "type", default)]
    pub vote_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::new();
        let username = self.username.trim();
        if username.is_empty() || username.chars().count() > 30 {
            errors.insert(
                "username".to_string(),
                "Usernames must be 1-30 characters.".to_string(),
            );
        }
        if self.password.chars().count() < 6 {
            errors.insert(
                "password".to_string(),
                "Passwords must be at least 6 characters.".to_string(),
            );
        }
        errors
    }
}

fn validate_title(title: &str, errors: &mut FormErrors) {
    let length = title.trim().chars().count();
    if length < TITLE_MIN_CHARS {
        errors.insert(
            "title".to_string(),
            format!("Titles must be at least {TITLE_MIN_CHARS} characters."),
        );
    } else if length > TITLE_MAX_CHARS {
        errors.insert(
            "title".to_string(),
            format!("Titles may not exceed {TITLE_MAX_CHARS} characters."),
        );
    }
}

fn validate_body(text: &str, errors: &mut FormErrors) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        errors.insert("text".to_string(), "A body is required.".to_string());
    } else if trimmed.chars().count() > BODY_MAX_CHARS {
        errors.insert(
            "text".to_string(),
            format!("Bodies may not exceed {BODY_MAX_CHARS} characters."),
        );
    }
}

fn validate_tags(tags: &str, errors: &mut FormErrors) {
    let names = parse_tagnames(tags);
    if names.is_empty() {
        errors.insert("tags".to_string(), "At least one tag is required.".to_string());
        return;
    }
    if names.len() > TAG_MAX_COUNT {
        errors.insert(
            "tags".to_string(),
            format!("At most {TAG_MAX_COUNT} tags are allowed."),
        );
        return;
    }
    if let Some(invalid) = names.iter().find(|name| !TAG_NAME_RE.is_match(name)) {
        errors.insert(
            "tags".to_string(),
            format!("`{invalid}` is not a valid tag name."),
        );
    }
}

fn validate_summary(summary: &str, errors: &mut FormErrors) {
    if summary.trim().chars().count() > SUMMARY_MAX_CHARS {
        errors.insert(
            "summary".to_string(),
            format!("Edit summaries may not exceed {SUMMARY_MAX_CHARS} characters."),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::{AskQuestionForm, CloseQuestionForm, CommentForm};

    #[test]
    fn ask_form_flags_all_invalid_fields() {
        let form = AskQuestionForm {
            title: "short".to_string(),
            tags: "one two three four five six".to_string(),
            text: String::new(),
            ..AskQuestionForm::default()
        };
        let errors = form.validate();
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("tags"));
        assert!(errors.contains_key("text"));
    }

    #[test]
    fn ask_form_accepts_reasonable_input() {
        let form = AskQuestionForm {
            title: "How do lifetimes interact with closures?".to_string(),
            tags: "rust lifetimes".to_string(),
            text: "A body that explains the problem.".to_string(),
            ..AskQuestionForm::default()
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn tag_names_are_validated_after_normalization() {
        let form = AskQuestionForm {
            title: "A perfectly reasonable title".to_string(),
            tags: "Rust C++".to_string(),
            text: "body".to_string(),
            ..AskQuestionForm::default()
        };
        assert!(form.validate().is_empty());

        let form = AskQuestionForm {
            tags: "spa ces!".to_string(),
            ..form
        };
        assert!(form.validate().contains_key("tags"));
    }

    #[test]
    fn close_form_requires_known_reason() {
        let form = CloseQuestionForm {
            reason: "because".to_string(),
            close: Some("close".to_string()),
            reopen: None,
        };
        assert!(form.validate().contains_key("reason"));

        let form = CloseQuestionForm {
            reason: "off topic".to_string(),
            close: Some("close".to_string()),
            reopen: None,
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn comment_length_bounds_are_enforced() {
        assert!(CommentForm {
            comment: "too short".to_string()
        }
        .validate()
        .contains_key("comment"));
        assert!(CommentForm {
            comment: "long enough to be a useful comment".to_string()
        }
        .validate()
        .is_empty());
    }
}
