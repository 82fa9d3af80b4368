// src/handlers/answer_sheet.rs

use axum::{
    Json,
    extract::{Extension, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{
        answer_sheet::{
            AnswerSheet, MemberSheet, SheetItem, SheetView, Subject, SubmitAnswersRequest,
            SubmitResponse, TokenQuery,
        },
        question::Question,
        quiz::Quiz,
    },
    services::{grading, lifecycle},
    store,
    utils::{jwt::Claims, token::TokenCodec},
};

/// Resolves an access token to its sheet and quiz.
async fn resolve(pool: &SqlitePool, codec: &TokenCodec, hash: &str) -> Result<(AnswerSheet, Quiz), AppError> {
    let (subject, quiz_id) = codec.decode(hash).map_err(|e| {
        tracing::warn!("Rejected access token: {}", e);
        e
    })?;

    let sheet = store::find_sheet(pool, subject, quiz_id)
        .await?
        .ok_or(AppError::NotFound("Answer sheet not found".to_string()))?;
    let quiz = store::get_quiz(pool, quiz_id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    Ok((sheet, quiz))
}

/// Opens an answer sheet through its link.
///
/// Standard answers, explanations and the stored answers are only revealed
/// for a graded personal sheet; everyone else sees the bare questions.
pub async fn open_sheet(
    State(pool): State<SqlitePool>,
    State(codec): State<TokenCodec>,
    Query(query): Query<TokenQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (sheet, quiz) = resolve(&pool, &codec, &query.hash).await?;

    let status = quiz.status_at(Utc::now());
    lifecycle::ensure_viewable(status, &sheet)?;

    let bank = store::questions_by_ids(&pool, &sheet.question_ids).await?;
    let reveal = sheet.is_graded();

    let items = sheet
        .question_ids
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let question = bank.get(id);
            SheetItem {
                index: index + 1,
                question_id: *id,
                text: question.map(|q| q.text.clone()),
                kind: question.map(|q| q.kind),
                standard_answer: question.filter(|_| reveal).map(|q| q.answer.clone()),
                explanation: question.filter(|_| reveal).map(|q| q.explanation.clone()),
                answer: sheet.answers.get(index).filter(|_| reveal).cloned(),
            }
        })
        .collect();

    Ok(Json(SheetView {
        sheet_id: sheet.id,
        quiz_name: quiz.name,
        start_time: quiz.start_time,
        end_time: quiz.end_time,
        status,
        score: sheet.grade(),
        items,
    }))
}

/// Submits answers for the sheet behind a link and grades them.
///
/// * The quiz must be active, or closed with an ungraded guest sheet.
/// * `answers` must hold one entry per question, in sheet order.
/// * Questions deleted since assignment are dropped together with their answer.
pub async fn submit_answers(
    State(pool): State<SqlitePool>,
    State(codec): State<TokenCodec>,
    Json(req): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (sheet, quiz) = resolve(&pool, &codec, &req.hash).await?;

    let now = Utc::now();
    let status = quiz.status_at(now);
    lifecycle::ensure_submittable(status, sheet.subject, sheet.is_graded()).map_err(|e| {
        tracing::warn!("Submission for sheet {} refused: {}", sheet.id, e);
        e
    })?;

    if req.answers.len() != sheet.question_ids.len() {
        return Err(AppError::BadRequest(format!(
            "Expected {} answers, got {}",
            sheet.question_ids.len(),
            req.answers.len()
        )));
    }
    if req.answers.iter().any(|a| a.contains(',')) {
        return Err(AppError::BadRequest("Answers may not contain ','".to_string()));
    }

    let mut bank = store::questions_by_ids(&pool, &sheet.question_ids).await?;
    let (questions, answers): (Vec<Question>, Vec<&str>) = sheet
        .question_ids
        .iter()
        .zip(&req.answers)
        .filter_map(|(id, answer)| bank.remove(id).map(|q| (q, answer.as_str())))
        .unzip();

    let score = grading::score(&questions, &answers)
        .ok_or(AppError::BadRequest("No questions left to grade".to_string()))?;

    store::record_submission(&pool, sheet.id, &req.answers, score, now).await?;

    if let Subject::Personal(member) = sheet.subject {
        tracing::info!("Member {} scored {} on quiz {}", member, score, quiz.id);
    } else {
        tracing::info!("Guest scored {} on quiz {}", score, quiz.id);
    }

    Ok(Json(SubmitResponse { score, questions }))
}

/// Lists the caller's own answer sheets with a fresh link token each.
///
/// Every token costs one PBKDF2 derivation, so the batch is encoded on the
/// blocking pool.
pub async fn list_my_sheets(
    State(pool): State<SqlitePool>,
    State(codec): State<TokenCodec>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let subject = Subject::Personal(claims.user_id()?);
    let now = Utc::now();

    let mut owned = Vec::new();
    for sheet in store::sheets_by_subject(&pool, subject).await? {
        let Some(quiz) = store::get_quiz(&pool, sheet.quiz_id).await? else {
            tracing::warn!("Answer sheet {} points at missing quiz {}", sheet.id, sheet.quiz_id);
            continue;
        };
        owned.push((sheet, quiz));
    }

    let results = tokio::task::spawn_blocking(move || {
        owned
            .into_iter()
            .map(|(sheet, quiz)| MemberSheet {
                hash: codec.encode(subject, quiz.id),
                status: quiz.status_at(now),
                answer_sheet: sheet,
                quiz,
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("Token encoding task failed: {}", e)))?;

    Ok(Json(results))
}
