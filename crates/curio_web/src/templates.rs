//! Compiled-in Tera template set.
//!
//! Templates are embedded so the binary has no runtime directory
//! dependency; `build_templates` is called once at startup.

use std::collections::HashMap;

use tera::{Tera, Value};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

pub fn build_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", include_str!("../templates/base.html")),
        (
            "_question_rows.html",
            include_str!("../templates/_question_rows.html"),
        ),
        ("index.html", include_str!("../templates/index.html")),
        ("questions.html", include_str!("../templates/questions.html")),
        ("unanswered.html", include_str!("../templates/unanswered.html")),
        ("question.html", include_str!("../templates/question.html")),
        ("ask_question.html", include_str!("../templates/ask_question.html")),
        ("edit_question.html", include_str!("../templates/edit_question.html")),
        ("retag_question.html", include_str!("../templates/retag_question.html")),
        (
            "question_revisions.html",
            include_str!("../templates/question_revisions.html"),
        ),
        ("close_question.html", include_str!("../templates/close_question.html")),
        ("reopen_question.html", include_str!("../templates/reopen_question.html")),
        ("add_answer.html", include_str!("../templates/add_answer.html")),
        ("answer.html", include_str!("../templates/answer.html")),
        ("edit_answer.html", include_str!("../templates/edit_answer.html")),
        (
            "answer_revisions.html",
            include_str!("../templates/answer_revisions.html"),
        ),
        ("tags.html", include_str!("../templates/tags.html")),
        ("users.html", include_str!("../templates/users.html")),
        ("user.html", include_str!("../templates/user.html")),
        ("badges.html", include_str!("../templates/badges.html")),
        ("badge.html", include_str!("../templates/badge.html")),
        ("search.html", include_str!("../templates/search.html")),
        ("login.html", include_str!("../templates/login.html")),
        ("logged_out.html", include_str!("../templates/logged_out.html")),
        ("register.html", include_str!("../templates/register.html")),
    ])?;
    tera.register_filter("datetime", datetime_filter);
    Ok(tera)
}

/// Formats epoch-millisecond timestamps for display.
fn datetime_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let millis = value
        .as_i64()
        .ok_or_else(|| tera::Error::msg("datetime filter expects an integer timestamp"))?;
    let timestamp = OffsetDateTime::from_unix_timestamp(millis / 1000)
        .map_err(|err| tera::Error::msg(format!("invalid timestamp {millis}: {err}")))?;
    let formatted = timestamp
        .format(TIMESTAMP_FORMAT)
        .map_err(|err| tera::Error::msg(format!("failed to format timestamp: {err}")))?;
    Ok(Value::String(formatted))
}

#[cfg(test)]
mod tests {
    use super::build_templates;
    use tera::Context;

    #[test]
    fn all_templates_compile() {
        build_templates().expect("embedded templates must compile");
    }

    #[test]
    fn datetime_filter_formats_epoch_millis() {
        let mut tera = build_templates().unwrap();
        let mut context = Context::new();
        context.insert("ts", &1_700_000_000_000_i64);
        let rendered = tera
            .render_str("{{ ts | datetime }}", &context)
            .unwrap();
        assert_eq!(rendered, "2023-11-14 22:13");
    }
}
