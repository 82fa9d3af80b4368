// src/models/question.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use validator::Validate;

/// The three question kinds the platform grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionKind {
    /// Multiple choice; the answer is a set of option letters, e.g. "AC".
    #[serde(rename = "choice")]
    Choice,
    /// True/false; "A" is correct, "B" is wrong.
    #[serde(rename = "judge")]
    Judge,
    /// Free text compared verbatim.
    #[serde(rename = "short answer")]
    ShortAnswer,
}

impl QuestionKind {
    pub const ALL: [QuestionKind; 3] = [
        QuestionKind::Choice,
        QuestionKind::Judge,
        QuestionKind::ShortAnswer,
    ];

    /// Literal used in storage and in the bulk import grammar.
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Choice => "choice",
            QuestionKind::Judge => "judge",
            QuestionKind::ShortAnswer => "short answer",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown question kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for QuestionKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl TryFrom<String> for QuestionKind {
    type Error = UnknownKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The question body shown to the member.
    pub text: String,

    #[sqlx(try_from = "String")]
    pub kind: QuestionKind,

    /// The standard answer the submission is judged against.
    pub answer: String,

    pub explanation: String,

    /// Organization whose bank owns the question.
    pub group_id: i64,
}

/// A question record before it is stored: the output of the bulk importer
/// and the validated form of an admin's create/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionDraft {
    pub text: String,
    pub kind: QuestionKind,
    pub answer: String,
    pub explanation: String,
}

/// DTO for creating or replacing a question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    pub kind: QuestionKind,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[validate(length(min = 1, max = 2000))]
    pub explanation: String,
}

impl From<CreateQuestionRequest> for QuestionDraft {
    fn from(req: CreateQuestionRequest) -> Self {
        Self {
            text: req.text,
            kind: req.kind,
            answer: req.answer,
            explanation: req.explanation,
        }
    }
}

/// DTO for the bulk import endpoint.
#[derive(Debug, Deserialize)]
pub struct ImportQuestionsRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionListParams {
    pub offset: Option<i64>,
}
