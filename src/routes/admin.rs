use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::dto::interview_dto::SessionView;
use crate::error::Result;
use crate::services::visibility::Requester;
use crate::AppState;

pub async fn list_interviews(State(state): State<AppState>) -> Result<Json<Vec<SessionView>>> {
    Ok(Json(state.interview_service.list_completed_sessions().await?))
}

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
