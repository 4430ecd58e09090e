//! Revision diffing and generated revision summaries.
//!
//! # Responsibility
//! - Produce inline `<ins>`/`<del>` HTML between consecutive revision
//!   renderings for the revision history pages.
//! - Generate the default edit summary when the editor leaves it blank.

use similar::{ChangeTag, TextDiff};

/// Word-level inline diff of two HTML fragments.
///
/// Consecutive inserted or deleted runs are wrapped in a single
/// `<ins>`/`<del>` element. Inputs are expected to be already-sanitized
/// HTML; the output is only ever rendered on revision history pages.
pub fn inline_html_diff(old: &str, new: &str) -> String {
    let diff = TextDiff::from_words(old, new);
    let mut out = String::new();
    let mut open: Option<ChangeTag> = None;

    for change in diff.iter_all_changes() {
        let tag = change.tag();
        if open != Some(tag) {
            close_run(&mut out, open);
            match tag {
                ChangeTag::Delete => out.push_str("<del>"),
                ChangeTag::Insert => out.push_str("<ins>"),
                ChangeTag::Equal => {}
            }
            open = Some(tag);
        }
        out.push_str(change.value());
    }
    close_run(&mut out, open);

    out
}

fn close_run(out: &mut String, open: Option<ChangeTag>) {
    match open {
        Some(ChangeTag::Delete) => out.push_str("</del>"),
        Some(ChangeTag::Insert) => out.push_str("</ins>"),
        _ => {}
    }
}

/// Field-level changes between two question revisions.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionChanges {
    pub title: bool,
    pub body: bool,
    pub tags: bool,
    pub wiki: bool,
}

/// Default summary for a question edit, e.g. "edited title and body" or
/// "modified tags; switched to community wiki".
pub fn question_revision_summary(changes: QuestionChanges) -> String {
    let mut parts = Vec::new();

    let mut edited = Vec::new();
    if changes.title {
        edited.push("title");
    }
    if changes.body {
        edited.push("body");
    }
    if !edited.is_empty() {
        parts.push(format!("edited {}", edited.join(" and ")));
    }
    if changes.tags {
        parts.push("modified tags".to_string());
    }
    if changes.wiki {
        parts.push("switched to community wiki".to_string());
    }

    if parts.is_empty() {
        "no visible changes".to_string()
    } else {
        parts.join("; ")
    }
}

/// Default summary for an answer edit.
pub fn answer_revision_summary(body_changed: bool, wiki_turned_on: bool) -> String {
    question_revision_summary(QuestionChanges {
        body: body_changed,
        wiki: wiki_turned_on,
        ..QuestionChanges::default()
    })
}

#[cfg(test)]
mod tests {
    use super::{inline_html_diff, question_revision_summary, QuestionChanges};

    #[test]
    fn inline_diff_marks_inserted_and_deleted_runs() {
        let diffed = inline_html_diff("the quick fox", "the slow fox");
        assert!(diffed.contains("<del>quick</del>"));
        assert!(diffed.contains("<ins>slow</ins>"));
        assert!(diffed.starts_with("the "));
        assert!(diffed.ends_with(" fox"));
    }

    #[test]
    fn inline_diff_of_identical_inputs_has_no_markers() {
        let diffed = inline_html_diff("same text", "same text");
        assert_eq!(diffed, "same text");
    }

    #[test]
    fn summary_names_changed_fields() {
        let summary = question_revision_summary(QuestionChanges {
            title: true,
            body: true,
            tags: true,
            wiki: false,
        });
        assert_eq!(summary, "edited title and body; modified tags");
    }

    #[test]
    fn summary_of_no_changes_is_explicit() {
        assert_eq!(
            question_revision_summary(QuestionChanges::default()),
            "no visible changes"
        );
    }
}
