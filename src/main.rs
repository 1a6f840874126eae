use std::env;

use evlog::{meta, LogEventConsolePrinter, Logger};

use pollstats::db::dbclient::DBClient;
use pollstats::db::model;
use pollstats::ops::{self, Principal};
use pollstats::runtime::{get_logger, set_logger};

fn console_principal() -> Principal {
    Principal {
        id: 0,
        username: "console".to_owned(),
        is_staff: true,
    }
}

async fn print_stats_report(db: &DBClient, name: &str) {
    let poll = match model::get_poll_by_name(db.conn(), name).await {
        Ok(v) => match v {
            None => {
                println!("No poll named '{}'.", name);
                return;
            }
            Some(v) => v,
        },
        Err(e) => {
            get_logger().error("Failed to look up poll by name.", meta! {
                "PollName" => name,
                "Error" => e,
            });
            return;
        }
    };

    let console = console_principal();
    let stats = match ops::stats::get_poll_stats(db.conn(), poll.id, Some(&console)).await {
        Ok(v) => v,
        Err(e) => {
            get_logger().error("Failed to compute poll stats.", meta! {
                "PollID" => poll.id,
                "Error" => e,
            });
            return;
        }
    };

    println!("Poll '{}': {} respondents", poll.name, stats.total_respondents);

    for question in &stats.questions {
        println!(
            "  {}. {} ({} users, {:.1}%)",
            question.row_number, question.question_text, question.users_count, question.users_part
        );

        for choice in &question.choices {
            println!(
                "       {}. {} ({} users, {:.1}%)",
                choice.row_number,
                choice.choice_text.as_str(),
                choice.users_count,
                choice.users_part
            );
        }
    }
}

async fn print_poll_list(db: &DBClient) {
    let console = console_principal();

    let polls = match ops::poll::list_polls(db.conn(), Some(&console)).await {
        Ok(v) => v,
        Err(e) => {
            get_logger().error("Failed to list polls.", meta! {
                "Error" => e,
            });
            return;
        }
    };

    for poll in &polls {
        println!(
            "{}  {}  ({} questions, created {})",
            poll.id,
            poll.name,
            poll.questions.len(),
            poll.time_created
        );
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let db_url = env::var("POLLSTATS_DATABASE_URL").expect("expected POLLSTATS_DATABASE_URL");

    let mut logger = Logger::default();
    logger.register(LogEventConsolePrinter::default());
    set_logger(logger);

    let db_client = DBClient::new(&db_url).await
        .expect("failed to connect to database");

    model::ensure_schema(db_client.conn()).await
        .expect("failed to ensure database schema");

    match env::args().nth(1) {
        None => print_poll_list(&db_client).await,
        Some(name) => print_stats_report(&db_client, &name).await,
    }
}
