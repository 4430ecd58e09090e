use curio_core::db::open_db_in_memory;
use curio_core::model::user::User;
use curio_core::repo::answer_repo::SqliteAnswerRepository;
use curio_core::repo::question_repo::SqliteQuestionRepository;
use curio_core::repo::user_repo::SqliteUserRepository;
use curio_core::service::answer_service::AnswerService;
use curio_core::service::question_service::{AskQuestionInput, QuestionService};
use curio_core::service::user_service::UserService;
use curio_core::{search_posts, PostKind, Question, SearchError, SearchQuery};
use rusqlite::Connection;

fn seed_user(conn: &mut Connection, username: &str) -> User {
    let mut service = UserService::new(SqliteUserRepository::new(conn));
    service
        .register(username, &format!("{username}@example.com"), "password")
        .unwrap()
}

fn ask(conn: &mut Connection, author: i64, title: &str, text: &str) -> Question {
    let mut service = QuestionService::new(SqliteQuestionRepository::new(conn));
    service
        .ask(
            author,
            &AskQuestionInput {
                title: title.to_string(),
                tagnames: "rust".to_string(),
                text: text.to_string(),
                wiki: false,
            },
        )
        .unwrap()
}

#[test]
fn search_finds_questions_and_answers_with_titles() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let answerer = seed_user(&mut conn, "answerer");
    let question = ask(
        &mut conn,
        asker.id,
        "Lifetime elision rules",
        "How do elision rules apply to closures?",
    );
    {
        let mut service = AnswerService::new(SqliteAnswerRepository::new(&mut conn));
        service
            .add_answer(answerer.id, &question, "Closures capture lifetimes implicitly", false)
            .unwrap();
    }

    let hits = search_posts(&conn, &SearchQuery::new("elision")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, PostKind::Question);
    assert_eq!(hits[0].post_id, question.id);
    assert_eq!(hits[0].title, "Lifetime elision rules");
    assert!(hits[0].snippet.contains("[elision]"));

    let hits = search_posts(&conn, &SearchQuery::new("capture")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].kind, PostKind::Answer);
    // Answer hits surface the owning question's title.
    assert_eq!(hits[0].title, "Lifetime elision rules");
}

#[test]
fn search_excludes_deleted_posts_and_honors_kind_filter() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let kept = ask(&mut conn, asker.id, "Kept question", "shared keyword body");
    let dropped = ask(&mut conn, asker.id, "Dropped question", "shared keyword body");
    conn.execute("UPDATE questions SET deleted = 1 WHERE id = ?1;", [dropped.id])
        .unwrap();

    let hits = search_posts(&conn, &SearchQuery::new("keyword")).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].post_id, kept.id);

    let mut answers_only = SearchQuery::new("keyword");
    answers_only.kind = Some(PostKind::Answer);
    assert!(search_posts(&conn, &answers_only).unwrap().is_empty());
}

#[test]
fn blank_queries_return_no_hits() {
    let conn = open_db_in_memory().unwrap();
    assert!(search_posts(&conn, &SearchQuery::new("   "))
        .unwrap()
        .is_empty());
}

#[test]
fn plain_queries_survive_fts_metacharacters() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    ask(&mut conn, asker.id, "Operators", "what does a*b mean");

    // Quoted-term escaping keeps this from being an FTS5 syntax error.
    let hits = search_posts(&conn, &SearchQuery::new("a*b")).unwrap();
    assert_eq!(hits.len(), 1);
}

#[test]
fn raw_syntax_errors_are_reported_as_invalid_query() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    ask(&mut conn, asker.id, "Anything", "anything");

    let mut query = SearchQuery::new("AND AND (");
    query.raw_fts_syntax = true;
    let err = search_posts(&conn, &query).unwrap_err();
    assert!(matches!(err, SearchError::InvalidQuery { .. }));
}
