// src/store.rs

//! SQL access for questions, quizzes and answer sheets.
//!
//! Functions take any `SqliteExecutor` so they run on the pool or inside a
//! transaction alike.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};

use crate::{
    config::ITEMS_PER_PAGE,
    error::AppError,
    models::{
        answer_sheet::{AnswerSheet, NewAnswerSheet, Subject, UNGRADED_SCORE, join_field},
        question::{Question, QuestionDraft},
        quiz::{CreateQuizRequest, Quiz},
    },
    services::generator::{QuestionPool, SheetWriter},
};

const QUESTION_COLUMNS: &str = "id, text, kind, answer, explanation, group_id";
const QUIZ_COLUMNS: &str = "id, name, group_id, question_count, mode, start_time, end_time";
const SHEET_COLUMNS: &str = "id, subject_id, quiz_id, question_ids, answers, score, completed_at";

// ==== questions ====

pub async fn insert_question<'e>(
    executor: impl SqliteExecutor<'e>,
    group_id: i64,
    draft: &QuestionDraft,
) -> Result<i64, AppError> {
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO questions (text, kind, answer, explanation, group_id)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(&draft.text)
    .bind(draft.kind.as_str())
    .bind(&draft.answer)
    .bind(&draft.explanation)
    .bind(group_id)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

pub async fn get_question<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
) -> Result<Option<Question>, AppError> {
    let question = sqlx::query_as::<_, Question>(&format!(
        "SELECT {} FROM questions WHERE id = ?",
        QUESTION_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    Ok(question)
}

/// One page of a group's bank, ordered by id.
pub async fn list_questions<'e>(
    executor: impl SqliteExecutor<'e>,
    group_id: i64,
    offset: i64,
) -> Result<Vec<Question>, AppError> {
    let questions = sqlx::query_as::<_, Question>(&format!(
        "SELECT {} FROM questions WHERE group_id = ? ORDER BY id LIMIT ? OFFSET ?",
        QUESTION_COLUMNS
    ))
    .bind(group_id)
    .bind(ITEMS_PER_PAGE)
    .bind(offset)
    .fetch_all(executor)
    .await?;

    Ok(questions)
}

pub async fn count_questions<'e>(
    executor: impl SqliteExecutor<'e>,
    group_id: i64,
) -> Result<i64, AppError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE group_id = ?")
        .bind(group_id)
        .fetch_one(executor)
        .await?;

    Ok(count)
}

pub async fn update_question<'e>(
    executor: impl SqliteExecutor<'e>,
    id: i64,
    draft: &QuestionDraft,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE questions SET text = ?, kind = ?, answer = ?, explanation = ? WHERE id = ?",
    )
    .bind(&draft.text)
    .bind(draft.kind.as_str())
    .bind(&draft.answer)
    .bind(&draft.explanation)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn delete_question<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Fetches the questions still present among `ids`, keyed by id.
pub async fn questions_by_ids<'e>(
    executor: impl SqliteExecutor<'e>,
    ids: &[i64],
) -> Result<HashMap<i64, Question>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM questions WHERE id IN (",
        QUESTION_COLUMNS
    ));
    let mut separated = query_builder.separated(",");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let questions: Vec<Question> = query_builder.build_query_as().fetch_all(executor).await?;

    Ok(questions.into_iter().map(|q| (q.id, q)).collect())
}

// ==== quizzes ====

pub async fn insert_quiz<'e>(
    executor: impl SqliteExecutor<'e>,
    group_id: i64,
    req: &CreateQuizRequest,
) -> Result<Quiz, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(&format!(
        r#"
        INSERT INTO quizzes (name, group_id, question_count, mode, start_time, end_time)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        QUIZ_COLUMNS
    ))
    .bind(&req.name)
    .bind(group_id)
    .bind(req.question_count)
    .bind(req.mode.as_str())
    .bind(req.start_time)
    .bind(req.end_time)
    .fetch_one(executor)
    .await?;

    Ok(quiz)
}

pub async fn get_quiz<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> Result<Option<Quiz>, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>(&format!("SELECT {} FROM quizzes WHERE id = ?", QUIZ_COLUMNS))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(quiz)
}

/// All quizzes of a group, latest start first. Status filtering happens in
/// the caller because status depends on the read time.
pub async fn quizzes_by_group<'e>(
    executor: impl SqliteExecutor<'e>,
    group_id: i64,
) -> Result<Vec<Quiz>, AppError> {
    let quizzes = sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {} FROM quizzes WHERE group_id = ? ORDER BY start_time DESC, id DESC",
        QUIZ_COLUMNS
    ))
    .bind(group_id)
    .fetch_all(executor)
    .await?;

    Ok(quizzes)
}

/// Deletes a quiz together with its answer sheets.
pub async fn delete_quiz(conn: &mut SqliteConnection, id: i64) -> Result<(), AppError> {
    sqlx::query("DELETE FROM answer_sheets WHERE quiz_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

// ==== answer sheets ====

pub async fn sheets_by_quiz<'e>(
    executor: impl SqliteExecutor<'e>,
    quiz_id: i64,
) -> Result<Vec<AnswerSheet>, AppError> {
    let sheets = sqlx::query_as::<_, AnswerSheet>(&format!(
        "SELECT {} FROM answer_sheets WHERE quiz_id = ? ORDER BY id",
        SHEET_COLUMNS
    ))
    .bind(quiz_id)
    .fetch_all(executor)
    .await?;

    Ok(sheets)
}

pub async fn sheets_by_subject<'e>(
    executor: impl SqliteExecutor<'e>,
    subject: Subject,
) -> Result<Vec<AnswerSheet>, AppError> {
    let sheets = sqlx::query_as::<_, AnswerSheet>(&format!(
        "SELECT {} FROM answer_sheets WHERE subject_id = ? ORDER BY completed_at DESC, id DESC",
        SHEET_COLUMNS
    ))
    .bind(subject.id())
    .fetch_all(executor)
    .await?;

    Ok(sheets)
}

pub async fn find_sheet<'e>(
    executor: impl SqliteExecutor<'e>,
    subject: Subject,
    quiz_id: i64,
) -> Result<Option<AnswerSheet>, AppError> {
    let sheet = sqlx::query_as::<_, AnswerSheet>(&format!(
        "SELECT {} FROM answer_sheets WHERE subject_id = ? AND quiz_id = ? LIMIT 1",
        SHEET_COLUMNS
    ))
    .bind(subject.id())
    .bind(quiz_id)
    .fetch_optional(executor)
    .await?;

    Ok(sheet)
}

/// Stores a graded submission. Last writer wins.
pub async fn record_submission<'e>(
    executor: impl SqliteExecutor<'e>,
    sheet_id: i64,
    answers: &[String],
    score: f64,
    completed_at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query("UPDATE answer_sheets SET answers = ?, score = ?, completed_at = ? WHERE id = ?")
        .bind(join_field(answers))
        .bind(score)
        .bind(completed_at)
        .bind(sheet_id)
        .execute(executor)
        .await?;

    Ok(())
}

#[async_trait]
impl QuestionPool for SqliteConnection {
    async fn random_questions(&mut self, group_id: i64, count: i64) -> Result<Vec<Question>, AppError> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {} FROM questions WHERE group_id = ? ORDER BY RANDOM() LIMIT ?",
            QUESTION_COLUMNS
        ))
        .bind(group_id)
        .bind(count)
        .fetch_all(&mut *self)
        .await?;

        Ok(questions)
    }
}

#[async_trait]
impl SheetWriter for SqliteConnection {
    async fn insert_sheet(&mut self, sheet: &NewAnswerSheet) -> Result<i64, AppError> {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO answer_sheets (subject_id, quiz_id, question_ids, answers, score, completed_at)
            VALUES (?, ?, ?, '', ?, ?)
            RETURNING id
            "#,
        )
        .bind(sheet.subject.id())
        .bind(sheet.quiz_id)
        .bind(join_field(&sheet.question_ids))
        .bind(UNGRADED_SCORE)
        .bind(sheet.completed_at)
        .fetch_one(&mut *self)
        .await?;

        Ok(id)
    }
}
