use curio_core::db::open_db_in_memory;
use curio_core::model::post::PostKind;
use curio_core::model::user::User;
use curio_core::repo::comment_repo::{CommentRepository, SqliteCommentRepository};
use curio_core::repo::question_repo::SqliteQuestionRepository;
use curio_core::repo::user_repo::SqliteUserRepository;
use curio_core::service::comment_service::{CommentService, CommentServiceError};
use curio_core::service::question_service::{AskQuestionInput, QuestionService};
use curio_core::service::user_service::UserService;
use curio_core::Question;
use rusqlite::Connection;

fn seed_user(conn: &mut Connection, username: &str) -> User {
    let mut service = UserService::new(SqliteUserRepository::new(conn));
    service
        .register(username, &format!("{username}@example.com"), "password")
        .unwrap()
}

fn ask(conn: &mut Connection, author: i64) -> Question {
    let mut service = QuestionService::new(SqliteQuestionRepository::new(conn));
    service
        .ask(
            author,
            &AskQuestionInput {
                title: "A question".to_string(),
                tagnames: "rust".to_string(),
                text: "question body".to_string(),
                wiki: false,
            },
        )
        .unwrap()
}

#[test]
fn comments_are_listed_oldest_first_with_authors() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let commenter = seed_user(&mut conn, "commenter");
    let question = ask(&mut conn, asker.id);

    {
        let mut service = CommentService::new(SqliteCommentRepository::new(&mut conn));
        service
            .add_comment(
                commenter.id,
                PostKind::Question,
                question.id,
                "  could you add the error output?  ",
            )
            .unwrap();
        service
            .add_comment(asker.id, PostKind::Question, question.id, "added it above")
            .unwrap();
    }

    let repo = SqliteCommentRepository::new(&mut conn);
    let comments = repo
        .list_for_post(PostKind::Question, question.id)
        .unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].comment, "could you add the error output?");
    assert_eq!(comments[0].author.username, "commenter");
    assert_eq!(comments[1].author.username, "asker");
}

#[test]
fn blank_comments_are_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let question = ask(&mut conn, asker.id);

    let mut service = CommentService::new(SqliteCommentRepository::new(&mut conn));
    let err = service
        .add_comment(asker.id, PostKind::Question, question.id, "   ")
        .unwrap_err();
    assert!(matches!(err, CommentServiceError::EmptyComment));
}

#[test]
fn delete_comment_removes_it_permanently() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let question = ask(&mut conn, asker.id);

    let comment = {
        let mut service = CommentService::new(SqliteCommentRepository::new(&mut conn));
        service
            .add_comment(asker.id, PostKind::Question, question.id, "obsolete remark")
            .unwrap()
    };

    {
        let mut service = CommentService::new(SqliteCommentRepository::new(&mut conn));
        service.delete_comment(comment.id).unwrap();
        let err = service.delete_comment(comment.id).unwrap_err();
        assert!(matches!(err, CommentServiceError::CommentNotFound(_)));
    }

    let repo = SqliteCommentRepository::new(&mut conn);
    assert!(repo
        .list_for_post(PostKind::Question, question.id)
        .unwrap()
        .is_empty());
}
