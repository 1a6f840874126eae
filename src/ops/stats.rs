use evlog::meta;
use sqlx::PgPool;

use crate::db::model;
use crate::db::schema::Poll;
use crate::ops::{require_staff, OpError, Principal};
use crate::runtime::get_logger;
use crate::stats::{self, PollStats};

pub async fn list_polls_for_stats(
    conn: &PgPool,
    principal: Option<&Principal>,
) -> Result<Vec<Poll>, OpError> {
    require_staff(principal)?;

    Ok(model::list_polls(conn).await?)
}

pub async fn get_poll_stats(
    conn: &PgPool,
    id_poll: i32,
    principal: Option<&Principal>,
) -> Result<PollStats, OpError> {
    let user = require_staff(principal)?;

    let poll = model::get_poll(conn, id_poll).await?.ok_or(OpError::NotFound {
        entity: "poll",
        id: id_poll,
    })?;

    let rows = model::poll_answer_rows(conn, poll.id).await?;
    let stats = stats::poll_stats(&rows);

    get_logger().info("Poll stats computed.", meta! {
        "StaffID" => user.id,
        "PollID" => poll.id,
        "Respondents" => stats.total_respondents,
    });

    Ok(stats)
}
