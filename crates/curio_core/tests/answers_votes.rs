use curio_core::db::open_db_in_memory;
use curio_core::model::post::PostKind;
use curio_core::model::user::User;
use curio_core::model::vote::VoteKind;
use curio_core::repo::answer_repo::{AnswerRepository, SqliteAnswerRepository};
use curio_core::repo::question_repo::{QuestionRepository, SqliteQuestionRepository};
use curio_core::repo::user_repo::SqliteUserRepository;
use curio_core::repo::vote_repo::{SqliteVoteRepository, VoteAction, VoteRepository};
use curio_core::service::answer_service::{AnswerService, AUTO_WIKI_ANSWER_COUNT};
use curio_core::service::question_service::{AskQuestionInput, QuestionService};
use curio_core::service::user_service::UserService;
use curio_core::service::vote_service::{VoteService, VoteServiceError};
use curio_core::{Answer, Question};
use rusqlite::{params, Connection};

fn seed_user(conn: &mut Connection, username: &str) -> User {
    let mut service = UserService::new(SqliteUserRepository::new(conn));
    service
        .register(username, &format!("{username}@example.com"), "password")
        .unwrap()
}

fn set_reputation(conn: &Connection, user: i64, reputation: i64) {
    conn.execute(
        "UPDATE users SET reputation = ?2 WHERE id = ?1;",
        params![user, reputation],
    )
    .unwrap();
}

fn reputation(conn: &Connection, user: i64) -> i64 {
    conn.query_row("SELECT reputation FROM users WHERE id = ?1;", [user], |row| {
        row.get(0)
    })
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

fn answer(conn: &mut Connection, author: i64, question: &Question, text: &str) -> Answer {
    let mut service = AnswerService::new(SqliteAnswerRepository::new(conn));
    service.add_answer(author, question, text, false).unwrap()
}

fn reload_question(conn: &mut Connection, id: i64) -> Question {
    SqliteQuestionRepository::new(conn)
        .get_question(id)
        .unwrap()
        .unwrap()
}

#[test]
fn add_answer_increments_count_and_records_revision() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let answerer = seed_user(&mut conn, "answerer");
    let question = ask(&mut conn, asker.id);

    let answer = answer(&mut conn, answerer.id, &question, "the answer **body**");
    assert!(answer.html.contains("<strong>body</strong>"));
    assert!(!answer.wiki);

    let question = reload_question(&mut conn, question.id);
    assert_eq!(question.answer_count, 1);
    assert_eq!(question.last_activity_by, answerer.id);

    let repo = SqliteAnswerRepository::new(&mut conn);
    let latest = repo.latest_revision(answer.id).unwrap();
    assert_eq!(latest.revision, 1);
    assert_eq!(latest.summary, "added answer");
}

#[test]
fn thirtieth_answer_converts_thread_to_wiki() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let answerer = seed_user(&mut conn, "answerer");
    let mut question = ask(&mut conn, asker.id);

    let mut first_answer_id = None;
    for n in 0..AUTO_WIKI_ANSWER_COUNT {
        let created = answer(&mut conn, answerer.id, &question, &format!("answer {n}"));
        first_answer_id.get_or_insert(created.id);
        question = reload_question(&mut conn, question.id);
    }

    assert_eq!(question.answer_count, AUTO_WIKI_ANSWER_COUNT);
    assert!(question.wiki, "question should be wiki after answer 30");

    let repo = SqliteAnswerRepository::new(&mut conn);
    let first = repo.get_answer(first_answer_id.unwrap()).unwrap().unwrap();
    assert!(first.wiki, "existing answers join wiki mode");
    drop(repo);

    // Subsequent answers start in wiki mode.
    let next = answer(&mut conn, answerer.id, &question, "answer 30");
    assert!(next.wiki);
}

#[test]
fn vote_toggles_and_switches_update_score_and_reputation() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let voter = seed_user(&mut conn, "voter");
    set_reputation(&conn, voter.id, 200);
    let question = ask(&mut conn, asker.id);

    let cast = |conn: &mut Connection, direction: VoteKind| {
        let mut service = VoteService::new(SqliteVoteRepository::new(conn));
        service
            .cast(
                voter.id,
                question.author_id,
                question.is_votable(),
                PostKind::Question,
                question.id,
                direction,
            )
            .unwrap()
    };

    let up = cast(&mut conn, VoteKind::Up);
    assert_eq!(up.action, VoteAction::Created);
    assert_eq!(up.score, 1);
    assert_eq!(reputation(&conn, asker.id), 11);

    let removed = cast(&mut conn, VoteKind::Up);
    assert_eq!(removed.action, VoteAction::Removed);
    assert_eq!(removed.score, 0);
    assert_eq!(reputation(&conn, asker.id), 1);

    let down = cast(&mut conn, VoteKind::Down);
    assert_eq!(down.action, VoteAction::Created);
    assert_eq!(down.score, -1);
    // Author reputation floors at 1; the voter pays the downvote price.
    assert_eq!(reputation(&conn, asker.id), 1);
    assert_eq!(reputation(&conn, voter.id), 199);

    let switched = cast(&mut conn, VoteKind::Up);
    assert_eq!(switched.action, VoteAction::Switched);
    assert_eq!(switched.score, 1);
    assert_eq!(reputation(&conn, voter.id), 200);

    let repo = SqliteVoteRepository::new(&mut conn);
    let vote = repo
        .get_vote(PostKind::Question, question.id, voter.id)
        .unwrap();
    assert_eq!(vote, Some(VoteKind::Up));
}

#[test]
fn voting_on_own_post_is_rejected() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let question = ask(&mut conn, asker.id);

    let mut service = VoteService::new(SqliteVoteRepository::new(&mut conn));
    let err = service
        .cast(
            asker.id,
            question.author_id,
            question.is_votable(),
            PostKind::Question,
            question.id,
            VoteKind::Up,
        )
        .unwrap_err();
    assert!(matches!(err, VoteServiceError::OwnPost));
}

#[test]
fn locked_posts_do_not_accept_votes() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let voter = seed_user(&mut conn, "voter");
    let question = ask(&mut conn, asker.id);
    conn.execute("UPDATE questions SET locked = 1 WHERE id = ?1;", [question.id])
        .unwrap();
    let question = reload_question(&mut conn, question.id);

    let mut service = VoteService::new(SqliteVoteRepository::new(&mut conn));
    let err = service
        .cast(
            voter.id,
            question.author_id,
            question.is_votable(),
            PostKind::Question,
            question.id,
            VoteKind::Up,
        )
        .unwrap_err();
    assert!(matches!(err, VoteServiceError::PostNotVotable));
}

#[test]
fn votes_on_answers_lookup_returns_only_this_users_votes() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let answerer = seed_user(&mut conn, "answerer");
    let voter = seed_user(&mut conn, "voter");
    let other_voter = seed_user(&mut conn, "other-voter");
    let question = ask(&mut conn, asker.id);
    let first = answer(&mut conn, answerer.id, &question, "first answer");
    let second = answer(&mut conn, answerer.id, &question, "second answer");

    let mut cast = |conn: &mut Connection, voter_id: i64, answer_id: i64, dir: VoteKind| {
        let mut service = VoteService::new(SqliteVoteRepository::new(conn));
        service
            .cast(voter_id, answerer.id, true, PostKind::Answer, answer_id, dir)
            .unwrap();
    };
    cast(&mut conn, voter.id, first.id, VoteKind::Up);
    cast(&mut conn, other_voter.id, second.id, VoteKind::Down);

    let repo = SqliteVoteRepository::new(&mut conn);
    let votes = repo.votes_on_answers(question.id, voter.id).unwrap();
    assert_eq!(votes, vec![(first.id, VoteKind::Up)]);
}

#[test]
fn accept_toggle_moves_the_mark_and_reputation() {
    let mut conn = open_db_in_memory().unwrap();
    let asker = seed_user(&mut conn, "asker");
    let first_author = seed_user(&mut conn, "first-author");
    let second_author = seed_user(&mut conn, "second-author");
    let question = ask(&mut conn, asker.id);
    let first = answer(&mut conn, first_author.id, &question, "first answer");
    let second = answer(&mut conn, second_author.id, &question, "second answer");

    {
        let mut service = AnswerService::new(SqliteAnswerRepository::new(&mut conn));
        assert!(service.toggle_accept(first.id).unwrap());
    }
    assert_eq!(reputation(&conn, first_author.id), 16);

    // Accepting another answer moves the mark and the reputation.
    {
        let mut service = AnswerService::new(SqliteAnswerRepository::new(&mut conn));
        assert!(service.toggle_accept(second.id).unwrap());
    }
    assert_eq!(reputation(&conn, first_author.id), 1);
    assert_eq!(reputation(&conn, second_author.id), 16);

    let repo = SqliteAnswerRepository::new(&mut conn);
    assert!(!repo.get_answer(first.id).unwrap().unwrap().accepted);
    assert!(repo.get_answer(second.id).unwrap().unwrap().accepted);
    drop(repo);

    // Toggling the accepted answer clears it.
    {
        let mut service = AnswerService::new(SqliteAnswerRepository::new(&mut conn));
        assert!(!service.toggle_accept(second.id).unwrap());
    }
    assert_eq!(reputation(&conn, second_author.id), 1);
}
