use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::interview_dto::{CreateQuestionRequest, QuestionListQuery, UpdateQuestionRequest};
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::services::visibility::Requester;
use crate::AppState;

#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Query(query): Query<QuestionListQuery>,
) -> Result<Json<Vec<Question>>> {
    let questions = state
        .question_service
        .list(&requester, query.department_id)
        .await?;
    Ok(Json(questions))
}

#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Json(mut payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse> {
    payload.text = payload.text.trim().to_string();
    payload.validate()?;
    let department_id = payload
        .department_id
        .or(requester.department_id)
        .ok_or_else(|| Error::BadRequest("department_id is required".to_string()))?;

    let question = state
        .question_service
        .create(&requester, &payload.text, department_id)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateQuestionRequest>,
) -> Result<Json<Question>> {
    payload.text = payload.text.map(|t| t.trim().to_string());
    payload.validate()?;

    let question = state
        .question_service
        .update(&requester, id, payload.text.as_deref(), payload.department_id)
        .await?;
    Ok(Json(question))
}

#[axum::debug_handler]
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.question_service.delete(&requester, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
