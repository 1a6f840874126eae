use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionType {
    Type1,
    Type2,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Type1 => "type1",
            QuestionType::Type2 => "type2",
        }
    }

    pub fn parse(v: &str) -> Option<QuestionType> {
        match v {
            "type1" => Some(QuestionType::Type1),
            "type2" => Some(QuestionType::Type2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChoiceText {
    Yes,
    No,
    NotSure,
}

impl ChoiceText {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChoiceText::Yes => "yes",
            ChoiceText::No => "no",
            ChoiceText::NotSure => "not_sure",
        }
    }

    pub fn parse(v: &str) -> Option<ChoiceText> {
        match v {
            "yes" => Some(ChoiceText::Yes),
            "no" => Some(ChoiceText::No),
            "not_sure" => Some(ChoiceText::NotSure),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Poll {
    pub id: i32,
    pub name: String,
    pub time_created: DateTime<Utc>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: i32,
    pub question_text: String,
    pub question_type: QuestionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub id: i32,
    pub choice_text: ChoiceText,
}

