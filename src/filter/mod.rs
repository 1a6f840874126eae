use std::collections::{HashMap, HashSet};

use crate::db::schema::{ChoiceText, QuestionType};

/// Question types the user has answered before, every time with "no" and
/// never with anything else. The caller hides questions of these types.
pub fn excluded_question_types(history: &[(QuestionType, ChoiceText)]) -> HashSet<QuestionType> {
    let mut no_counts: HashMap<QuestionType, u32> = HashMap::new();
    let mut other_counts: HashMap<QuestionType, u32> = HashMap::new();

    for (question_type, choice) in history {
        match choice {
            ChoiceText::No => *no_counts.entry(*question_type).or_default() += 1,
            _ => *other_counts.entry(*question_type).or_default() += 1,
        }
    }

    no_counts
        .into_iter()
        .filter(|(question_type, no_count)| {
            *no_count > 0 && other_counts.get(question_type).copied().unwrap_or(0) == 0
        })
        .map(|(question_type, _)| question_type)
        .collect()
}
