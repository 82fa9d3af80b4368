// src/models/answer_sheet.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, sqlite::SqliteRow};

use crate::models::question::{Question, QuestionKind};
use crate::models::quiz::Quiz;
use crate::services::lifecycle::QuizStatus;

/// Storage encoding of the guest subject.
pub const GUEST_SUBJECT_ID: i64 = -1;
/// Storage encoding of an ungraded sheet.
pub const UNGRADED_SCORE: f64 = -1.0;

/// Who an answer sheet belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Subject {
    /// A member of the organization.
    Personal(i64),
    /// The public preview sheet. Never counted in completion statistics.
    Guest,
}

impl Subject {
    /// Integer form used in storage and inside access tokens.
    pub fn id(self) -> i64 {
        match self {
            Subject::Personal(id) => id,
            Subject::Guest => GUEST_SUBJECT_ID,
        }
    }
}

impl From<i64> for Subject {
    fn from(id: i64) -> Self {
        if id == GUEST_SUBJECT_ID {
            Subject::Guest
        } else {
            Subject::Personal(id)
        }
    }
}

/// Represents the 'answer_sheets' table in the database.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSheet {
    pub id: i64,
    pub subject: Subject,
    pub quiz_id: i64,
    /// Question ids in presentation order.
    pub question_ids: Vec<i64>,
    /// One answer per question, same order. Empty until submitted.
    pub answers: Vec<String>,
    /// Stored score; `None` until graded.
    pub score: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl AnswerSheet {
    /// The score as seen by readers. Guest sheets are always re-answerable,
    /// so a stored guest score is reported as ungraded.
    pub fn grade(&self) -> Option<f64> {
        match self.subject {
            Subject::Personal(_) => self.score,
            Subject::Guest => None,
        }
    }

    pub fn is_graded(&self) -> bool {
        self.grade().is_some()
    }
}

impl<'r> FromRow<'r, SqliteRow> for AnswerSheet {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let subject_id: i64 = row.try_get("subject_id")?;
        let question_ids: String = row.try_get("question_ids")?;
        let answers: String = row.try_get("answers")?;
        let score: f64 = row.try_get("score")?;

        let question_ids = split_field(&question_ids)
            .map(|id| {
                id.parse::<i64>().map_err(|e| sqlx::Error::ColumnDecode {
                    index: "question_ids".to_string(),
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: row.try_get("id")?,
            subject: Subject::from(subject_id),
            quiz_id: row.try_get("quiz_id")?,
            answers: decode_answers(&answers, score >= 0.0, question_ids.len()),
            question_ids,
            score: (score >= 0.0).then_some(score),
            completed_at: row.try_get("completed_at")?,
        })
    }
}

/// Splits a comma-joined column; the empty string is the empty list.
fn split_field(field: &str) -> impl Iterator<Item = &str> {
    field.split(',').filter(move |_| !field.is_empty())
}

/// A graded sheet always stores one answer per question, but a single blank
/// answer joins to the same `""` as "not submitted yet".
fn decode_answers(field: &str, graded: bool, slots: usize) -> Vec<String> {
    if field.is_empty() && graded {
        return vec![String::new(); slots];
    }
    split_field(field).map(str::to_string).collect()
}

/// Joins a list into its comma-separated column form.
pub fn join_field<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// A sheet about to be written by the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnswerSheet {
    pub subject: Subject,
    pub quiz_id: i64,
    pub question_ids: Vec<i64>,
    pub completed_at: DateTime<Utc>,
}

/// DTO for submitting answers through an access token.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    pub hash: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub hash: String,
}

/// Grading output returned to the submitter.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub score: f64,
    pub questions: Vec<Question>,
}

/// One question slot of an opened sheet. Answer fields are only filled in
/// once a personal sheet has been graded.
#[derive(Debug, Serialize)]
pub struct SheetItem {
    pub index: usize,
    pub question_id: i64,
    /// `None` when the question was deleted after assignment.
    pub text: Option<String>,
    pub kind: Option<QuestionKind>,
    pub standard_answer: Option<String>,
    pub explanation: Option<String>,
    pub answer: Option<String>,
}

/// An answer sheet opened through its access token.
#[derive(Debug, Serialize)]
pub struct SheetView {
    pub sheet_id: i64,
    pub quiz_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: QuizStatus,
    pub score: Option<f64>,
    pub items: Vec<SheetItem>,
}

/// A member's sheet with its quiz and a freshly issued access token.
#[derive(Debug, Serialize)]
pub struct MemberSheet {
    pub answer_sheet: AnswerSheet,
    pub quiz: Quiz,
    pub status: QuizStatus,
    pub hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_subject_is_guest() {
        assert_eq!(Subject::from(-1), Subject::Guest);
        assert_eq!(Subject::from(7), Subject::Personal(7));
        assert_eq!(Subject::Guest.id(), GUEST_SUBJECT_ID);
    }

    #[test]
    fn empty_field_splits_to_nothing() {
        assert_eq!(split_field("").count(), 0);
        assert_eq!(split_field("A,,C").collect::<Vec<_>>(), vec!["A", "", "C"]);
        assert_eq!(join_field(&[3, 1, 2]), "3,1,2");
    }

    #[test]
    fn blank_single_answer_survives_storage() {
        let stored = join_field(&[String::new()]);
        assert_eq!(decode_answers(&stored, true, 1), vec![String::new()]);
        assert!(decode_answers(&stored, false, 1).is_empty());

        let stored = join_field(&["A".to_string(), String::new()]);
        assert_eq!(decode_answers(&stored, true, 2), vec!["A".to_string(), String::new()]);
    }

    #[test]
    fn guest_score_reads_as_ungraded() {
        let mut sheet = AnswerSheet {
            id: 1,
            subject: Subject::Guest,
            quiz_id: 1,
            question_ids: vec![1],
            answers: vec!["A".to_string()],
            score: Some(100.0),
            completed_at: Utc::now(),
        };
        assert!(!sheet.is_graded());

        sheet.subject = Subject::Personal(4);
        assert_eq!(sheet.grade(), Some(100.0));
    }
}
