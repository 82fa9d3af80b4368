// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::ITEMS_PER_PAGE,
    error::AppError,
    models::{
        question::{CreateQuestionRequest, ImportQuestionsRequest, Question, QuestionDraft, QuestionListParams},
        quiz::Page,
    },
    services::import::{check_answer, parse},
    store,
    utils::{html::sanitize_draft, jwt::Claims},
};

/// Validates a single-question payload with the same rules as the importer.
fn validated_draft(payload: CreateQuestionRequest) -> Result<QuestionDraft, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    check_answer(payload.kind, &payload.answer).map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    Ok(sanitize_draft(payload.into()))
}

/// Loads a question and checks it belongs to the caller's organization.
async fn owned_question(pool: &SqlitePool, claims: &Claims, id: i64) -> Result<Question, AppError> {
    let question = store::get_question(pool, id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;
    claims.ensure_group(question.group_id)?;
    Ok(question)
}

/// Lists the caller's question bank, one page at a time.
/// Admin only.
pub async fn list_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let offset = params.offset.unwrap_or(0).max(0);

    let items = store::list_questions(&pool, claims.group, offset).await?;
    let total = store::count_questions(&pool, claims.group).await?;
    let new_offset = (items.len() as i64 >= ITEMS_PER_PAGE).then_some(offset + ITEMS_PER_PAGE);

    Ok(Json(Page {
        items,
        new_offset,
        total,
    }))
}

/// Returns the size of the caller's question bank.
/// Admin only.
pub async fn count_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let total = store::count_questions(&pool, claims.group).await?;
    Ok(Json(json!({ "total_questions": total })))
}

/// Adds one question to the caller's bank.
/// Admin only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let draft = validated_draft(payload)?;

    let id = store::insert_question(&pool, claims.group, &draft)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            e
        })?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/// Replaces a question's content.
/// Sheets that were already graded keep their score.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    owned_question(&pool, &claims, id).await?;
    let draft = validated_draft(payload)?;

    store::update_question(&pool, id, &draft).await?;

    Ok(StatusCode::OK)
}

/// Deletes a question. Sheets referencing it show it as deleted.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_question(&pool, &claims, id).await?;

    store::delete_question(&pool, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk-imports questions from the line grammar.
///
/// Either every record is inserted or none: parsing happens before any
/// write and the inserts share one transaction.
pub async fn import_questions(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ImportQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let drafts = parse(&payload.text).map_err(|e| {
        tracing::warn!("Rejected question import for group {}: {}", claims.group, e);
        e
    })?;

    let mut tx = pool.begin().await?;
    for draft in drafts.iter().cloned().map(sanitize_draft) {
        store::insert_question(&mut *tx, claims.group, &draft).await?;
    }
    tx.commit().await?;

    tracing::info!("Imported {} questions into group {}", drafts.len(), claims.group);

    Ok((StatusCode::CREATED, Json(json!({ "imported": drafts.len() }))))
}
