use curio_core::db::open_db_in_memory;
use curio_core::model::user::User;
use curio_core::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use curio_core::repo::user_repo::SqliteUserRepository;
use curio_core::service::question_service::{
    AskQuestionInput, EditQuestionInput, QuestionService, QuestionServiceError,
};
use curio_core::service::user_service::UserService;
use curio_core::Question;
use rusqlite::Connection;

fn seed_user(conn: &mut Connection, username: &str) -> User {
    let mut service = UserService::new(SqliteUserRepository::new(conn));
    service
        .register(username, &format!("{username}@example.com"), "password")
        .unwrap()
}

fn ask(conn: &mut Connection, author: i64, title: &str, tags: &str, text: &str) -> Question {
    let mut service = QuestionService::new(SqliteQuestionRepository::new(conn));
    service
        .ask(
            author,
            &AskQuestionInput {
                title: title.to_string(),
                tagnames: tags.to_string(),
                text: text.to_string(),
                wiki: false,
            },
        )
        .unwrap()
}

fn edit_body(conn: &mut Connection, editor: i64, question: &Question, text: &str) -> Question {
    let mut service = QuestionService::new(SqliteQuestionRepository::new(conn));
    service
        .edit(
            editor,
            question.id,
            &EditQuestionInput {
                title: question.title.clone(),
                tagnames: question.tagnames.clone(),
                text: text.to_string(),
                wiki: false,
                summary: String::new(),
            },
        )
        .unwrap()
}

#[test]
fn ask_creates_initial_revision_and_links_tags() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");

    let question = ask(
        &mut conn,
        asker.id,
        "How do I borrow twice?",
        "Rust borrowing RUST",
        "Body with **markdown**.",
    );

    assert_eq!(question.tagnames, "rust borrowing");
    assert!(question.html.contains("<strong>markdown</strong>"));
    assert!(question.summary.contains("Body with markdown."));
    assert_eq!(question.last_activity_by, asker.id);

    let repo = SqliteQuestionRepository::new(&mut conn);
    let latest = repo.latest_revision(question.id).unwrap();
    assert_eq!(latest.revision, 1);
    assert_eq!(latest.summary, "asked question");

    let tags = repo.tags_for_question(question.id).unwrap();
    let names: Vec<&str> = tags.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, vec!["borrowing", "rust"]);
    assert!(tags.iter().all(|tag| tag.use_count == 1));
}

#[test]
fn edit_creates_next_revision_with_generated_summary() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let question = ask(&mut conn, asker.id, "Old title", "rust", "old body");

    let edited = {
        let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
        service
            .edit(
                asker.id,
                question.id,
                &EditQuestionInput {
                    title: "New title".to_string(),
                    tagnames: "rust".to_string(),
                    text: "new body".to_string(),
                    wiki: false,
                    summary: String::new(),
                },
            )
            .unwrap()
    };
    assert_eq!(edited.title, "New title");
    assert!(edited.last_edited_at.is_some());
    assert_eq!(edited.last_edited_by, Some(asker.id));

    let repo = SqliteQuestionRepository::new(&mut conn);
    let latest = repo.latest_revision(question.id).unwrap();
    assert_eq!(latest.revision, 2);
    assert_eq!(latest.summary, "edited title and body");
}

#[test]
fn edit_with_no_changes_creates_no_revision() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let question = ask(&mut conn, asker.id, "Title", "rust", "body");

    let unchanged = {
        let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
        service
            .edit(
                asker.id,
                question.id,
                &EditQuestionInput {
                    title: "Title".to_string(),
                    tagnames: " rust ".to_string(),
                    text: "body".to_string(),
                    wiki: false,
                    summary: String::new(),
                },
            )
            .unwrap()
    };
    assert_eq!(unchanged.last_edited_at, None);

    let repo = SqliteQuestionRepository::new(&mut conn);
    assert_eq!(repo.latest_revision(question.id).unwrap().revision, 1);
}

#[test]
fn retag_replaces_links_and_maintains_use_counts() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let question = ask(&mut conn, asker.id, "Title", "rust sqlite", "body");

    let retagged = {
        let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
        service.retag(asker.id, question.id, "rust web").unwrap()
    };
    assert_eq!(retagged.tagnames, "rust web");

    let repo = SqliteQuestionRepository::new(&mut conn);
    let latest = repo.latest_revision(question.id).unwrap();
    assert_eq!(latest.revision, 2);
    assert_eq!(latest.summary, "modified tags");
    // Body is carried over from the previous revision untouched.
    assert_eq!(latest.text, "body");

    let use_count = |conn: &Connection, name: &str| -> i64 {
        conn.query_row(
            "SELECT use_count FROM tags WHERE name = ?1;",
            [name],
            |row| row.get(0),
        )
        .unwrap()
    };
    assert_eq!(use_count(&conn, "rust"), 1);
    assert_eq!(use_count(&conn, "sqlite"), 0);
    assert_eq!(use_count(&conn, "web"), 1);
}

#[test]
fn five_author_edits_convert_question_to_wiki() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let mut question = ask(&mut conn, asker.id, "Title", "rust", "body v0");

    for edit in 1..=5 {
        question = edit_body(&mut conn, asker.id, &question, &format!("body v{edit}"));
    }

    assert!(question.wiki);
    assert!(question.wikified_at.is_some());
}

#[test]
fn four_distinct_editors_convert_question_to_wiki() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let editors = [
        seed_user(&mut conn, "editor-one"),
        seed_user(&mut conn, "editor-two"),
        seed_user(&mut conn, "editor-three"),
    ];
    let mut question = ask(&mut conn, asker.id, "Title", "rust", "body v0");

    // Asker counts as the first revision author; three more editors make
    // four distinct contributors.
    for (index, editor) in editors.iter().enumerate() {
        question = edit_body(&mut conn, editor.id, &question, &format!("body v{index}x"));
    }

    assert!(question.wiki);
}

#[test]
fn close_and_reopen_enforce_current_state() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let moderator = seed_user(&mut conn, "moderator");
    let question = ask(&mut conn, asker.id, "Title", "rust", "body");

    {
        let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
        service
            .close(moderator.id, question.id, "exact duplicate")
            .unwrap();

        let err = service
            .close(moderator.id, question.id, "exact duplicate")
            .unwrap_err();
        assert!(matches!(err, QuestionServiceError::AlreadyClosed(_)));
    }

    let closed = SqliteQuestionRepository::new(&mut conn)
        .get_question(question.id)
        .unwrap()
        .unwrap();
    assert!(closed.closed);
    assert_eq!(closed.close_reason.as_deref(), Some("exact duplicate"));
    assert_eq!(closed.closed_by, Some(moderator.id));

    {
        let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
        service.reopen(question.id).unwrap();
        let err = service.reopen(question.id).unwrap_err();
        assert!(matches!(err, QuestionServiceError::NotClosed(_)));
    }

    let reopened = SqliteQuestionRepository::new(&mut conn)
        .get_question(question.id)
        .unwrap()
        .unwrap();
    assert!(!reopened.closed);
    assert_eq!(reopened.close_reason, None);
}

#[test]
fn favourite_toggle_maintains_denormalized_count() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let fan = seed_user(&mut conn, "fan");
    let question = ask(&mut conn, asker.id, "Title", "rust", "body");

    let mut service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
    assert!(service.toggle_favourite(fan.id, question.id).unwrap());
    assert!(!service.toggle_favourite(fan.id, question.id).unwrap());
    assert!(service.toggle_favourite(fan.id, question.id).unwrap());
    drop(service);

    let question = SqliteQuestionRepository::new(&mut conn)
        .get_question(question.id)
        .unwrap()
        .unwrap();
    assert_eq!(question.favourite_count, 1);
}

#[test]
fn revision_pages_diff_against_previous_revision() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let question = ask(&mut conn, asker.id, "Title", "rust", "first body");
    edit_body(&mut conn, asker.id, &question, "second body");

    let service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
    let pages = service.revision_pages(question.id).unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].revision.revision, 2);
    assert_eq!(pages[1].revision.revision, 1);

    let diff = pages[0].diff.as_deref().unwrap();
    assert!(diff.contains("<del>"));
    assert!(diff.contains("<ins>"));
    assert!(diff.contains("second"));
    assert!(pages[1].diff.is_none());
}

#[test]
fn revision_pages_for_unknown_question_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let service = QuestionService::new(SqliteQuestionRepository::new(&mut conn));
    let err = service.revision_pages(4242).unwrap_err();
    assert!(matches!(err, QuestionServiceError::QuestionNotFound(4242)));
}
