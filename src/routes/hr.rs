use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::dto::interview_dto::{CandidateSummary, DepartmentOverview, SessionView};
use crate::error::Result;
use crate::services::visibility::Requester;
use crate::AppState;

#[axum::debug_handler]
pub async fn overview(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<DepartmentOverview>> {
    Ok(Json(state.interview_service.department_overview(&requester).await?))
}

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<Vec<CandidateSummary>>> {
    let candidates = state
        .interview_service
        .list_department_candidates(&requester)
        .await?;
    Ok(Json(candidates))
}

#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<Vec<SessionView>>> {
    let sessions = state
        .interview_service
        .list_department_sessions(&requester)
        .await?;
    Ok(Json(sessions))
}

#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    Path(candidate_id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    let session = state
        .interview_service
        .get_session_for_candidate(&requester, candidate_id)
        .await?;
    Ok(Json(session))
}
