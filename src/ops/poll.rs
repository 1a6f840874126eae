use std::collections::HashSet;

use evlog::meta;
use sqlx::PgPool;

use crate::db::model;
use crate::db::schema::{Choice, Poll, QuestionType};
use crate::filter;
use crate::ops::{require_user, OpError, Principal};
use crate::runtime::get_logger;

/// A poll prepared for one user's answering screen: the poll with hidden
/// question types already dropped, plus the full choice catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PollView {
    pub poll: Poll,
    pub choices: Vec<Choice>,
}

pub async fn list_polls(
    conn: &PgPool,
    principal: Option<&Principal>,
) -> Result<Vec<Poll>, OpError> {
    require_user(principal)?;

    Ok(model::list_polls(conn).await?)
}

/// Question types to hide from this caller, or `None` for an anonymous
/// caller, which means no filtering applies at all. `Some` of an empty set
/// filters and drops nothing.
pub async fn excluded_types(
    conn: &PgPool,
    principal: Option<&Principal>,
) -> Result<Option<HashSet<QuestionType>>, OpError> {
    let user = match principal {
        None => return Ok(None),
        Some(v) => v,
    };

    let history = model::user_answer_history(conn, user.id).await?;

    Ok(Some(filter::excluded_question_types(&history)))
}

pub async fn get_poll_for_user(
    conn: &PgPool,
    id_poll: i32,
    principal: Option<&Principal>,
) -> Result<PollView, OpError> {
    let mut poll = model::get_poll(conn, id_poll).await?.ok_or(OpError::NotFound {
        entity: "poll",
        id: id_poll,
    })?;

    if let Some(excluded) = excluded_types(conn, principal).await? {
        poll.questions.retain(|q| !excluded.contains(&q.question_type));
    }

    let choices = model::list_choices(conn).await?;

    Ok(PollView { poll, choices })
}

/// Extracts (question id, choice id) pairs from form-style fields. Keys that
/// are not question ids are carrier fields and are skipped; a non-numeric
/// value under a numeric key is a malformed submission.
fn parse_submission(fields: &[(String, String)]) -> Result<Vec<(i32, i32)>, OpError> {
    let mut pairs = Vec::new();

    for (key, value) in fields {
        let id_question = match key.parse::<i32>() {
            Ok(v) => v,
            Err(_) => continue,
        };

        let id_choice = match value.parse::<i32>() {
            Ok(v) => v,
            Err(_) => {
                return Err(OpError::InvalidRequest(format!(
                    "choice id '{}' for question {} is not numeric",
                    value, id_question
                )))
            }
        };

        pairs.push((id_question, id_choice));
    }

    Ok(pairs)
}

/// Records one submission: every answered question gets exactly one row for
/// (user, question, poll), resubmission replaces the stored choice. The pairs
/// commit together; the first unknown identifier rolls the whole batch back.
pub async fn submit_answers(
    conn: &PgPool,
    principal: Option<&Principal>,
    id_poll: i32,
    fields: &[(String, String)],
) -> Result<usize, OpError> {
    let user = require_user(principal)?;

    let pairs = parse_submission(fields)?;

    let poll = model::get_poll(conn, id_poll).await?.ok_or(OpError::NotFound {
        entity: "poll",
        id: id_poll,
    })?;

    let mut tx = conn.begin().await?;

    for (id_question, id_choice) in &pairs {
        let question =
            model::get_question(conn, *id_question)
                .await?
                .ok_or(OpError::NotFound {
                    entity: "question",
                    id: *id_question,
                })?;
        let choice = model::get_choice(conn, *id_choice)
            .await?
            .ok_or(OpError::NotFound {
                entity: "choice",
                id: *id_choice,
            })?;

        model::upsert_answer(&mut tx, user.id, question.id, poll.id, choice.id).await?;
    }

    tx.commit().await?;

    get_logger().info("Answers submitted.", meta! {
        "UserID" => user.id,
        "PollID" => poll.id,
        "Answers" => pairs.len(),
    });

    Ok(pairs.len())
}
