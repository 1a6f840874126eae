use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{query, PgPool, Postgres, Row, Transaction};
use tokio_stream::StreamExt;

use crate::db::schema::{Choice, ChoiceText, Poll, Question, QuestionType};
use crate::stats::AnswerRow;

static VALIDATE_POLL_NAME: Lazy<Regex> = Lazy::new(|| Regex::new("^[a-z0-9-]+$").unwrap());

const SCHEMA_DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS poll (
         id           SERIAL PRIMARY KEY,
         name         TEXT NOT NULL UNIQUE,
         time_created TIMESTAMPTZ NOT NULL
     );",
    "CREATE TABLE IF NOT EXISTS question (
         id            SERIAL PRIMARY KEY,
         question_text TEXT NOT NULL UNIQUE,
         type          TEXT NOT NULL
     );",
    "CREATE TABLE IF NOT EXISTS choice (
         id          SERIAL PRIMARY KEY,
         choice_text TEXT NOT NULL UNIQUE
     );",
    "CREATE TABLE IF NOT EXISTS poll_question (
         id_poll     INTEGER NOT NULL REFERENCES poll (id) ON DELETE CASCADE,
         id_question INTEGER NOT NULL REFERENCES question (id) ON DELETE CASCADE,
         PRIMARY KEY (id_poll, id_question)
     );",
    "CREATE TABLE IF NOT EXISTS answer (
         id          SERIAL PRIMARY KEY,
         id_user     BIGINT NOT NULL,
         id_question INTEGER NOT NULL REFERENCES question (id) ON DELETE RESTRICT,
         id_poll     INTEGER NOT NULL REFERENCES poll (id) ON DELETE RESTRICT,
         id_choice   INTEGER NOT NULL REFERENCES choice (id) ON DELETE RESTRICT,
         UNIQUE (id_user, id_question, id_poll)
     );",
];

pub async fn ensure_schema(conn: &PgPool) -> anyhow::Result<()> {
    for ddl in SCHEMA_DDL {
        query(ddl).execute(conn).await?;
    }

    // The choice catalog is a fixed closed set; seed it so every poll view
    // can offer the full catalog.
    query(
        "INSERT INTO choice (choice_text)
         VALUES ('yes'), ('no'), ('not_sure')
         ON CONFLICT (choice_text) DO NOTHING;",
    )
    .execute(conn)
    .await?;

    Ok(())
}

fn parse_question_type(v: &str) -> anyhow::Result<QuestionType> {
    QuestionType::parse(v)
        .ok_or_else(|| anyhow::Error::msg(format!("unknown question type '{}'", v)))
}

fn parse_choice_text(v: &str) -> anyhow::Result<ChoiceText> {
    ChoiceText::parse(v).ok_or_else(|| anyhow::Error::msg(format!("unknown choice text '{}'", v)))
}

async fn poll_questions(conn: &PgPool, id_poll: i32) -> anyhow::Result<Vec<Question>> {
    let mut stream = query(
        "SELECT q.id, q.question_text, q.type
         FROM poll_question pq
         JOIN question q ON q.id = pq.id_question
         WHERE pq.id_poll = $1
         ORDER BY q.id;",
    )
    .bind(id_poll)
    .fetch(conn);

    let mut result = Vec::new();
    while let Some(row) = stream.try_next().await? {
        let t: String = row.try_get("type")?;
        result.push(Question {
            id: row.try_get("id")?,
            question_text: row.try_get("question_text")?,
            question_type: parse_question_type(&t)?,
        });
    }

    Ok(result)
}

pub async fn list_polls(conn: &PgPool) -> anyhow::Result<Vec<Poll>> {
    let rows = query("SELECT id, name, time_created FROM poll ORDER BY time_created DESC, id DESC;")
        .fetch_all(conn)
        .await?;

    let mut result = Vec::new();
    for row in rows {
        let id: i32 = row.try_get("id")?;

        result.push(Poll {
            id,
            name: row.try_get("name")?,
            time_created: row.try_get("time_created")?,
            questions: poll_questions(conn, id).await?,
        });
    }

    Ok(result)
}

pub async fn get_poll(conn: &PgPool, id_poll: i32) -> anyhow::Result<Option<Poll>> {
    let r = query("SELECT id, name, time_created FROM poll WHERE id = $1;")
        .bind(id_poll)
        .fetch_optional(conn)
        .await?;

    let r = match r {
        None => return Ok(None),
        Some(v) => v,
    };

    Ok(Some(Poll {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        time_created: r.try_get("time_created")?,
        questions: poll_questions(conn, id_poll).await?,
    }))
}

pub async fn get_poll_by_name(conn: &PgPool, name: &str) -> anyhow::Result<Option<Poll>> {
    let r = query("SELECT id, name, time_created FROM poll WHERE name = $1;")
        .bind(name)
        .fetch_optional(conn)
        .await?;

    let r = match r {
        None => return Ok(None),
        Some(v) => v,
    };

    let id: i32 = r.try_get("id")?;

    Ok(Some(Poll {
        id,
        name: r.try_get("name")?,
        time_created: r.try_get("time_created")?,
        questions: poll_questions(conn, id).await?,
    }))
}

pub async fn add_poll(conn: &PgPool, name: &str, question_ids: &[i32]) -> anyhow::Result<Poll> {
    if !VALIDATE_POLL_NAME.is_match(name) {
        return Err(anyhow::Error::msg(format!(
            "poll name '{}' is invalid; may only contain a-z, 0-9, and -",
            name
        )));
    }

    let mut tx = conn.begin().await?;

    let r = query(
        "INSERT INTO poll (name, time_created)
         VALUES ($1, NOW())
         RETURNING id, time_created;",
    )
    .bind(name)
    .fetch_one(&mut tx)
    .await?;

    let id: i32 = r.try_get("id")?;

    for id_question in question_ids {
        query("INSERT INTO poll_question (id_poll, id_question) VALUES ($1, $2);")
            .bind(id)
            .bind(*id_question)
            .execute(&mut tx)
            .await?;
    }

    tx.commit().await?;

    let questions = poll_questions(conn, id).await?;

    Ok(Poll {
        id,
        name: name.to_owned(),
        time_created: r.try_get("time_created")?,
        questions,
    })
}

pub async fn add_question(
    conn: &PgPool,
    question_text: &str,
    question_type: QuestionType,
) -> anyhow::Result<Question> {
    let r = query(
        "INSERT INTO question (question_text, type)
         VALUES ($1, $2)
         RETURNING id;",
    )
    .bind(question_text)
    .bind(question_type.as_str())
    .fetch_one(conn)
    .await?;

    Ok(Question {
        id: r.try_get("id")?,
        question_text: question_text.to_owned(),
        question_type,
    })
}

pub async fn get_question(conn: &PgPool, id_question: i32) -> anyhow::Result<Option<Question>> {
    let r = query("SELECT id, question_text, type FROM question WHERE id = $1;")
        .bind(id_question)
        .fetch_optional(conn)
        .await?;

    let r = match r {
        None => return Ok(None),
        Some(v) => v,
    };

    let t: String = r.try_get("type")?;

    Ok(Some(Question {
        id: r.try_get("id")?,
        question_text: r.try_get("question_text")?,
        question_type: parse_question_type(&t)?,
    }))
}

pub async fn get_choice(conn: &PgPool, id_choice: i32) -> anyhow::Result<Option<Choice>> {
    let r = query("SELECT id, choice_text FROM choice WHERE id = $1;")
        .bind(id_choice)
        .fetch_optional(conn)
        .await?;

    let r = match r {
        None => return Ok(None),
        Some(v) => v,
    };

    let c: String = r.try_get("choice_text")?;

    Ok(Some(Choice {
        id: r.try_get("id")?,
        choice_text: parse_choice_text(&c)?,
    }))
}

pub async fn list_choices(conn: &PgPool) -> anyhow::Result<Vec<Choice>> {
    let mut stream = query("SELECT id, choice_text FROM choice ORDER BY id;").fetch(conn);

    let mut result = Vec::new();
    while let Some(row) = stream.try_next().await? {
        let c: String = row.try_get("choice_text")?;

        result.push(Choice {
            id: row.try_get("id")?,
            choice_text: parse_choice_text(&c)?,
        });
    }

    Ok(result)
}

/// Creates the answer row for (user, question, poll), or replaces its choice
/// if the user already answered this question in this poll.
pub async fn upsert_answer(
    tx: &mut Transaction<'_, Postgres>,
    id_user: i64,
    id_question: i32,
    id_poll: i32,
    id_choice: i32,
) -> anyhow::Result<()> {
    query(
        "INSERT INTO answer (id_user, id_question, id_poll, id_choice)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (id_user, id_question, id_poll)
         DO UPDATE SET id_choice = EXCLUDED.id_choice;",
    )
    .bind(id_user)
    .bind(id_question)
    .bind(id_poll)
    .bind(id_choice)
    .execute(tx)
    .await?;

    Ok(())
}

pub async fn poll_answer_rows(conn: &PgPool, id_poll: i32) -> anyhow::Result<Vec<AnswerRow>> {
    let mut stream = query(
        "SELECT a.id_user, a.id_question, q.question_text, a.id_choice, c.choice_text
         FROM answer a
         JOIN question q ON q.id = a.id_question
         JOIN choice c ON c.id = a.id_choice
         WHERE a.id_poll = $1;",
    )
    .bind(id_poll)
    .fetch(conn);

    let mut result = Vec::new();
    while let Some(row) = stream.try_next().await? {
        let c: String = row.try_get("choice_text")?;

        result.push(AnswerRow {
            id_user: row.try_get("id_user")?,
            id_question: row.try_get("id_question")?,
            question_text: row.try_get("question_text")?,
            id_choice: row.try_get("id_choice")?,
            choice_text: parse_choice_text(&c)?,
        });
    }

    Ok(result)
}

/// Every (question type, choice) the user has ever answered, across all polls.
pub async fn user_answer_history(
    conn: &PgPool,
    id_user: i64,
) -> anyhow::Result<Vec<(QuestionType, ChoiceText)>> {
    let mut stream = query(
        "SELECT q.type, c.choice_text
         FROM answer a
         JOIN question q ON q.id = a.id_question
         JOIN choice c ON c.id = a.id_choice
         WHERE a.id_user = $1;",
    )
    .bind(id_user)
    .fetch(conn);

    let mut result = Vec::new();
    while let Some(row) = stream.try_next().await? {
        let t: String = row.try_get("type")?;
        let c: String = row.try_get("choice_text")?;

        result.push((parse_question_type(&t)?, parse_choice_text(&c)?));
    }

    Ok(result)
}
