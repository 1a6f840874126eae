//! Tests that need a live Postgres instance. Run them with
//! `POLLSTATS_TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::env;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use pollstats::db::dbclient::DBClient;
use pollstats::db::model;
use pollstats::db::schema::{ChoiceText, QuestionType};
use pollstats::ops::{self, OpError, Principal};

async fn test_db() -> DBClient {
    let url = env::var("POLLSTATS_TEST_DATABASE_URL")
        .expect("expected POLLSTATS_TEST_DATABASE_URL");

    let db = DBClient::new(&url).await.expect("failed to connect to database");
    model::ensure_schema(db.conn()).await.expect("failed to ensure schema");

    db
}

fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();

    format!("{}-{}-{}", prefix, process::id(), nanos)
}

fn user(id: i64) -> Principal {
    Principal {
        id,
        username: format!("user-{}", id),
        is_staff: false,
    }
}

fn staff(id: i64) -> Principal {
    Principal {
        id,
        username: format!("staff-{}", id),
        is_staff: true,
    }
}

fn answer_fields(pairs: &[(i32, i32)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(q, c)| (q.to_string(), c.to_string()))
        .collect()
}

async fn choice_id(db: &DBClient, choice_text: ChoiceText) -> i32 {
    model::list_choices(db.conn())
        .await
        .unwrap()
        .into_iter()
        .find(|c| c.choice_text == choice_text)
        .unwrap()
        .id
}

#[tokio::test]
#[ignore]
async fn resubmission_replaces_the_stored_choice() {
    let db = test_db().await;

    let q = model::add_question(db.conn(), &unique("q"), QuestionType::Type1)
        .await
        .unwrap();
    let poll = model::add_poll(db.conn(), &unique("p"), &[q.id]).await.unwrap();

    let yes = choice_id(&db, ChoiceText::Yes).await;
    let no = choice_id(&db, ChoiceText::No).await;
    let respondent = user(9001);

    ops::poll::submit_answers(
        db.conn(),
        Some(&respondent),
        poll.id,
        &answer_fields(&[(q.id, yes)]),
    )
    .await
    .unwrap();
    ops::poll::submit_answers(
        db.conn(),
        Some(&respondent),
        poll.id,
        &answer_fields(&[(q.id, no)]),
    )
    .await
    .unwrap();

    let rows = model::poll_answer_rows(db.conn(), poll.id).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id_user, respondent.id);
    assert_eq!(rows[0].choice_text, ChoiceText::No);
}

#[tokio::test]
#[ignore]
async fn unknown_question_rolls_back_the_whole_submission() {
    let db = test_db().await;

    let q = model::add_question(db.conn(), &unique("q"), QuestionType::Type1)
        .await
        .unwrap();
    let poll = model::add_poll(db.conn(), &unique("p"), &[q.id]).await.unwrap();

    let yes = choice_id(&db, ChoiceText::Yes).await;
    let respondent = user(9002);

    let r = ops::poll::submit_answers(
        db.conn(),
        Some(&respondent),
        poll.id,
        &answer_fields(&[(q.id, yes), (i32::MAX, yes)]),
    )
    .await;

    assert!(matches!(
        r,
        Err(OpError::NotFound { entity: "question", .. })
    ));

    let rows = model::poll_answer_rows(db.conn(), poll.id).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
#[ignore]
async fn stats_for_a_two_question_poll() {
    let db = test_db().await;

    let q1 = model::add_question(db.conn(), &unique("q1"), QuestionType::Type1)
        .await
        .unwrap();
    let q2 = model::add_question(db.conn(), &unique("q2"), QuestionType::Type2)
        .await
        .unwrap();
    let poll = model::add_poll(db.conn(), &unique("p"), &[q1.id, q2.id])
        .await
        .unwrap();

    let yes = choice_id(&db, ChoiceText::Yes).await;
    let no = choice_id(&db, ChoiceText::No).await;
    let u1 = user(9003);
    let u2 = user(9004);

    ops::poll::submit_answers(
        db.conn(),
        Some(&u1),
        poll.id,
        &answer_fields(&[(q1.id, yes), (q2.id, no)]),
    )
    .await
    .unwrap();
    ops::poll::submit_answers(
        db.conn(),
        Some(&u2),
        poll.id,
        &answer_fields(&[(q1.id, yes)]),
    )
    .await
    .unwrap();

    let reviewer = staff(1);
    let stats = ops::stats::get_poll_stats(db.conn(), poll.id, Some(&reviewer))
        .await
        .unwrap();

    assert_eq!(stats.total_respondents, 2);
    assert_eq!(stats.questions.len(), 2);

    let s1 = &stats.questions[0];
    assert_eq!(s1.id_question, q1.id);
    assert_eq!(s1.users_count, 2);
    assert_eq!(s1.users_part, 100.0);
    assert_eq!(s1.row_number, 1);
    assert_eq!(s1.choices.len(), 1);
    assert_eq!(s1.choices[0].choice_text, ChoiceText::Yes);
    assert_eq!(s1.choices[0].users_part, 100.0);

    let s2 = &stats.questions[1];
    assert_eq!(s2.id_question, q2.id);
    assert_eq!(s2.users_count, 1);
    assert_eq!(s2.users_part, 50.0);
    assert_eq!(s2.row_number, 2);
    assert_eq!(s2.choices[0].choice_text, ChoiceText::No);
    assert_eq!(s2.choices[0].users_part, 100.0);
}

#[tokio::test]
#[ignore]
async fn stats_require_a_staff_principal() {
    let db = test_db().await;

    let poll = model::add_poll(db.conn(), &unique("p"), &[]).await.unwrap();

    let r = ops::stats::get_poll_stats(db.conn(), poll.id, Some(&user(9005))).await;
    assert!(matches!(r, Err(OpError::Forbidden)));

    let r = ops::stats::get_poll_stats(db.conn(), poll.id, None).await;
    assert!(matches!(r, Err(OpError::Unauthorized)));
}

#[tokio::test]
#[ignore]
async fn consistently_no_types_are_hidden_from_the_poll_view() {
    let db = test_db().await;

    let q1 = model::add_question(db.conn(), &unique("q1"), QuestionType::Type1)
        .await
        .unwrap();
    let q2 = model::add_question(db.conn(), &unique("q2"), QuestionType::Type2)
        .await
        .unwrap();
    let first = model::add_poll(db.conn(), &unique("p1"), &[q1.id]).await.unwrap();
    let second = model::add_poll(db.conn(), &unique("p2"), &[q1.id, q2.id])
        .await
        .unwrap();

    let no = choice_id(&db, ChoiceText::No).await;
    let respondent = user(9006);

    // The respondent's only history with type1 is a "no" in the first poll.
    ops::poll::submit_answers(
        db.conn(),
        Some(&respondent),
        first.id,
        &answer_fields(&[(q1.id, no)]),
    )
    .await
    .unwrap();

    let view = ops::poll::get_poll_for_user(db.conn(), second.id, Some(&respondent))
        .await
        .unwrap();

    let shown: Vec<i32> = view.poll.questions.iter().map(|q| q.id).collect();
    assert_eq!(shown, vec![q2.id]);

    // Anonymous callers are not filtered at all.
    let view = ops::poll::get_poll_for_user(db.conn(), second.id, None)
        .await
        .unwrap();

    let shown: Vec<i32> = view.poll.questions.iter().map(|q| q.id).collect();
    assert_eq!(shown, vec![q1.id, q2.id]);

    // The full choice catalog always rides along.
    assert_eq!(view.choices.len(), 3);
}

#[tokio::test]
#[ignore]
async fn poll_with_no_answers_has_empty_stats() {
    let db = test_db().await;

    let q = model::add_question(db.conn(), &unique("q"), QuestionType::Type1)
        .await
        .unwrap();
    let poll = model::add_poll(db.conn(), &unique("p"), &[q.id]).await.unwrap();

    let reviewer = staff(1);
    let stats = ops::stats::get_poll_stats(db.conn(), poll.id, Some(&reviewer))
        .await
        .unwrap();

    assert_eq!(stats.total_respondents, 0);
    assert!(stats.questions.is_empty());
}
