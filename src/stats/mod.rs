use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use itertools::Itertools;

use crate::db::schema::ChoiceText;

/// One answer under a poll, joined with its question and choice texts.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRow {
    pub id_user: i64,
    pub id_question: i32,
    pub question_text: String,
    pub id_choice: i32,
    pub choice_text: ChoiceText,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollStats {
    pub total_respondents: i64,
    pub questions: Vec<QuestionStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionStats {
    pub id_question: i32,
    pub question_text: String,
    pub users_count: i64,
    pub users_part: f64,
    pub row_number: i64,
    pub choices: Vec<ChoiceStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceStats {
    pub id_choice: i32,
    pub choice_text: ChoiceText,
    pub users_count: i64,
    pub users_part: f64,
    pub row_number: i64,
}

/// Dense rank by count, descending: tied counts share a rank, and the next
/// distinct count takes the previous rank plus one.
fn dense_ranks<I>(counts: I) -> HashMap<i64, i64>
where
    I: IntoIterator<Item = i64>,
{
    counts
        .into_iter()
        .sorted_by_key(|c| Reverse(*c))
        .dedup()
        .enumerate()
        .map(|(i, c)| (c, i as i64 + 1))
        .collect()
}

fn part_of(users_count: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }

    users_count as f64 * 100.0 / total as f64
}

/// Aggregates a poll's answers into per-question and per-question-per-choice
/// distributions. Only questions and choices with at least one answer appear;
/// a poll with no answers yields zero respondents and no question entries.
pub fn poll_stats(rows: &[AnswerRow]) -> PollStats {
    let total_respondents = rows.iter().map(|r| r.id_user).unique().count() as i64;

    let mut question_users: BTreeMap<i32, HashSet<i64>> = BTreeMap::new();
    let mut question_texts: HashMap<i32, &str> = HashMap::new();
    let mut choice_users: BTreeMap<(i32, i32), HashSet<i64>> = BTreeMap::new();
    let mut choice_texts: HashMap<(i32, i32), ChoiceText> = HashMap::new();

    for row in rows {
        question_users.entry(row.id_question).or_default().insert(row.id_user);
        question_texts.insert(row.id_question, &row.question_text);

        let key = (row.id_question, row.id_choice);
        choice_users.entry(key).or_default().insert(row.id_user);
        choice_texts.insert(key, row.choice_text);
    }

    let question_counts: BTreeMap<i32, i64> = question_users
        .iter()
        .map(|(id, users)| (*id, users.len() as i64))
        .collect();
    let question_ranks = dense_ranks(question_counts.values().copied());

    let mut questions = Vec::new();
    for (&id_question, &users_count) in &question_counts {
        let choice_counts: Vec<(i32, i64)> = choice_users
            .range((id_question, i32::MIN)..=(id_question, i32::MAX))
            .map(|((_, id_choice), users)| (*id_choice, users.len() as i64))
            .collect();
        let choice_ranks = dense_ranks(choice_counts.iter().map(|(_, c)| *c));

        let mut choices = choice_counts
            .iter()
            .map(|&(id_choice, count)| ChoiceStats {
                id_choice,
                choice_text: choice_texts[&(id_question, id_choice)],
                users_count: count,
                users_part: part_of(count, users_count),
                row_number: choice_ranks[&count],
            })
            .collect::<Vec<_>>();
        choices.sort_by_key(|c| (c.row_number, c.id_choice));

        questions.push(QuestionStats {
            id_question,
            question_text: question_texts[&id_question].to_owned(),
            users_count,
            users_part: part_of(users_count, total_respondents),
            row_number: question_ranks[&users_count],
            choices,
        });
    }

    questions.sort_by_key(|q| (q.row_number, q.id_question));

    PollStats {
        total_respondents,
        questions,
    }
}
