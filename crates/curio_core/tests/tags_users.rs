use curio_core::db::open_db_in_memory;
use curio_core::model::user::User;
use curio_core::repo::question_repo::SqliteQuestionRepository;
use curio_core::repo::tag_repo::{SqliteTagRepository, TagListQuery, TagRepository, TagSort};
use curio_core::repo::user_repo::{
    SqliteUserRepository, UserListQuery, UserRepository, UserSort,
};
use curio_core::service::question_service::{AskQuestionInput, QuestionService};
use curio_core::service::user_service::{UserService, UserServiceError};
use rusqlite::{params, Connection};

fn seed_user(conn: &mut Connection, username: &str) -> User {
    let mut service = UserService::new(SqliteUserRepository::new(conn));
    service
        .register(username, &format!("{username}@example.com"), "password")
        .unwrap()
}

fn ask_with_tags(conn: &mut Connection, author: i64, tags: &str) {
    let mut service = QuestionService::new(SqliteQuestionRepository::new(conn));
    service
        .ask(
            author,
            &AskQuestionInput {
                title: "A question".to_string(),
                tagnames: tags.to_string(),
                text: "body".to_string(),
                wiki: false,
            },
        )
        .unwrap();
}

#[test]
fn tag_list_sorts_by_popularity_then_name() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    ask_with_tags(&mut conn, asker.id, "rust sqlite");
    ask_with_tags(&mut conn, asker.id, "rust web");
    ask_with_tags(&mut conn, asker.id, "rust");

    let repo = SqliteTagRepository::new(&conn);
    let popular = repo
        .list_tags(&TagListQuery {
            sort: TagSort::Popular,
            filter: None,
            limit: 50,
            offset: 0,
        })
        .unwrap();
    let names: Vec<&str> = popular.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, vec!["rust", "sqlite", "web"]);
    assert_eq!(popular[0].use_count, 3);

    let by_name = repo
        .list_tags(&TagListQuery {
            sort: TagSort::Name,
            filter: None,
            limit: 50,
            offset: 0,
        })
        .unwrap();
    let names: Vec<&str> = by_name.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, vec!["rust", "sqlite", "web"]);
}

#[test]
fn tag_list_filter_is_substring_match() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    ask_with_tags(&mut conn, asker.id, "rust rustlings sqlite");

    let repo = SqliteTagRepository::new(&conn);
    let filtered = repo
        .list_tags(&TagListQuery {
            sort: TagSort::Name,
            filter: Some("RUST".to_string()),
            limit: 50,
            offset: 0,
        })
        .unwrap();
    let names: Vec<&str> = filtered.iter().map(|tag| tag.name.as_str()).collect();
    assert_eq!(names, vec!["rust", "rustlings"]);
    assert_eq!(repo.count_tags(Some("rust")).unwrap(), 2);
    assert_eq!(repo.count_tags(None).unwrap(), 3);
}

#[test]
fn user_list_supports_reputation_and_name_sorts_with_filter() {
    let mut conn = open_db_in_memory().unwrap();
    seed_user(&mut conn, "alice");
    let bob = seed_user(&mut conn, "bob");
    let carol = seed_user(&mut conn, "carola");
    conn.execute(
        "UPDATE users SET reputation = 500 WHERE id = ?1;",
        params![bob.id],
    )
    .unwrap();

    let repo = SqliteUserRepository::new(&mut conn);
    let by_reputation = repo
        .list_users(&UserListQuery {
            sort: UserSort::Reputation,
            filter: None,
            limit: 28,
            offset: 0,
        })
        .unwrap();
    assert_eq!(by_reputation[0].id, bob.id);

    let by_name = repo
        .list_users(&UserListQuery {
            sort: UserSort::Name,
            filter: None,
            limit: 28,
            offset: 0,
        })
        .unwrap();
    let names: Vec<&str> = by_name.iter().map(|user| user.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "bob", "carola"]);

    let filtered = repo
        .list_users(&UserListQuery {
            sort: UserSort::Name,
            filter: Some("rol".to_string()),
            limit: 28,
            offset: 0,
        })
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].id, carol.id);
    assert_eq!(repo.count_users(Some("rol")).unwrap(), 1);
}

#[test]
fn registration_rejects_duplicate_usernames() {
    let mut conn = open_db_in_memory().unwrap();
    seed_user(&mut conn, "alice");

    let mut service = UserService::new(SqliteUserRepository::new(&mut conn));
    let err = service
        .register("alice", "alice@elsewhere.example", "password")
        .unwrap_err();
    assert!(matches!(err, UserServiceError::UsernameTaken(_)));
}

#[test]
fn login_round_trip_creates_and_revokes_sessions() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = seed_user(&mut conn, "alice");

    let mut service = UserService::new(SqliteUserRepository::new(&mut conn));

    let err = service.login("alice", "wrong-password").unwrap_err();
    assert!(matches!(err, UserServiceError::InvalidCredentials));
    let err = service.login("nobody", "password").unwrap_err();
    assert!(matches!(err, UserServiceError::InvalidCredentials));

    let (user, token) = service.login("alice", "password").unwrap();
    assert_eq!(user.id, alice.id);

    let resolved = service.session_user(token).unwrap().unwrap();
    assert_eq!(resolved.id, alice.id);

    service.logout(token).unwrap();
    assert!(service.session_user(token).unwrap().is_none());
}

#[test]
fn new_accounts_start_with_reputation_one() {
    let mut conn = open_db_in_memory().unwrap();
    let alice = seed_user(&mut conn, "alice");
    assert_eq!(alice.reputation, 1);
    assert_eq!(alice.questions_per_page, 10);
    assert!(!alice.is_staff);
}
