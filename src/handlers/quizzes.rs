// src/handlers/quizzes.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::{Config, ITEMS_PER_PAGE},
    error::{AppError, QuizError},
    models::{
        answer_sheet::Subject,
        quiz::{CreateQuizRequest, LinkParams, Page, Quiz, QuizListParams, QuizResponse},
    },
    services::{generator, stats::QuizStats},
    store,
    utils::{
        jwt::Claims,
        token::{TokenCodec, quiz_link},
    },
};

/// Loads a quiz and checks it belongs to the caller's organization.
async fn owned_quiz(pool: &SqlitePool, claims: &Claims, id: i64) -> Result<Quiz, AppError> {
    let quiz = store::get_quiz(pool, id)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
    claims.ensure_group(quiz.group_id)?;
    Ok(quiz)
}

/// Creates a quiz and assigns it.
///
/// * Validates the window and the requested question count against the bank.
/// * Generates one blank answer sheet per member, plus the guest sheet if asked.
/// * The quiz and all of its sheets are written in one transaction.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(mut payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if payload.start_time >= payload.end_time {
        return Err(AppError::BadRequest(
            "Start time must be before end time".to_string(),
        ));
    }
    if payload.members.iter().any(|id| *id <= 0) {
        return Err(AppError::BadRequest("Member ids must be positive".to_string()));
    }

    let available = store::count_questions(&pool, claims.group).await?;
    if payload.question_count > available {
        return Err(QuizError::InsufficientQuestions {
            requested: payload.question_count,
            available,
        }
        .into());
    }

    payload.members.sort_unstable();
    payload.members.dedup();
    let mut subjects: Vec<Subject> = payload.members.iter().copied().map(Subject::Personal).collect();
    if payload.include_guest {
        subjects.push(Subject::Guest);
    }

    let mut tx = pool.begin().await?;
    let quiz = store::insert_quiz(&mut *tx, claims.group, &payload).await?;
    let sheet_ids = generator::generate(&quiz, &subjects, &mut *tx, Utc::now())
        .await
        .map_err(|e| {
            tracing::error!("Failed to generate answer sheets for quiz '{}': {}", quiz.name, e);
            e
        })?;
    tx.commit().await?;

    tracing::info!(
        "Created quiz {} '{}' with {} answer sheets",
        quiz.id,
        quiz.name,
        sheet_ids.len()
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": quiz.id, "answer_sheets": sheet_ids.len() })),
    ))
}

/// Lists the caller's quizzes, optionally filtered by lifecycle status.
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuizListParams>,
) -> Result<impl IntoResponse, AppError> {
    let offset = params.offset.unwrap_or(0).max(0);
    let now = Utc::now();

    let matching: Vec<QuizResponse> = store::quizzes_by_group(&pool, claims.group)
        .await?
        .into_iter()
        .map(|quiz| QuizResponse {
            status: quiz.status_at(now),
            quiz,
        })
        .filter(|q| params.status.matches(q.status))
        .collect();

    let total = matching.len() as i64;
    let items: Vec<QuizResponse> = matching
        .into_iter()
        .skip(offset as usize)
        .take(ITEMS_PER_PAGE as usize)
        .collect();
    let new_offset = (items.len() as i64 >= ITEMS_PER_PAGE).then_some(offset + ITEMS_PER_PAGE);

    Ok(Json(Page {
        items,
        new_offset,
        total,
    }))
}

pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&pool, &claims, id).await?;

    Ok(Json(QuizResponse {
        status: quiz.status_at(Utc::now()),
        quiz,
    }))
}

/// Deletes a quiz and all of its answer sheets.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_quiz(&pool, &claims, id).await?;

    let mut tx = pool.begin().await?;
    store::delete_quiz(&mut tx, id).await?;
    tx.commit().await?;

    tracing::info!("Deleted quiz {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Lists every answer sheet of a quiz, guest sheet included.
pub async fn list_answer_sheets(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_quiz(&pool, &claims, id).await?;

    let sheets = store::sheets_by_quiz(&pool, id).await?;

    Ok(Json(sheets))
}

/// Completion and score distribution over the members' sheets.
pub async fn quiz_stats(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_quiz(&pool, &claims, id).await?;

    let sheets = store::sheets_by_quiz(&pool, id).await?;

    Ok(Json(QuizStats::from_sheets(&sheets)))
}

/// Issues a fresh access link for one sheet of the quiz.
/// Without `subject` the guest sheet's link is returned.
pub async fn issue_link(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    State(codec): State<TokenCodec>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Query(params): Query<LinkParams>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = owned_quiz(&pool, &claims, id).await?;
    let subject = params.subject.map_or(Subject::Guest, Subject::from);

    store::find_sheet(&pool, subject, quiz.id)
        .await?
        .ok_or(AppError::NotFound("Answer sheet not found".to_string()))?;

    let hash = codec.encode(subject, quiz.id);
    let link = quiz_link(&config.base_url, &hash)?;

    Ok(Json(json!({ "hash": hash, "link": link })))
}
