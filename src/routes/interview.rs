use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};

use crate::dto::interview_dto::{
    QuestionsResponse, SessionView, StatusResponse, SubmitInterviewResponse,
};
use crate::error::{Error, Result};
use crate::models::interview::ChatMessage;
use crate::services::audio_ingest::StagedAudio;
use crate::services::visibility::Requester;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_questions(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<QuestionsResponse>> {
    let response = state
        .interview_service
        .assemble_questions(requester.id)
        .await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn get_status(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<StatusResponse>> {
    Ok(Json(state.interview_service.check_status(requester.id).await?))
}

pub async fn start_interview(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<StatusResponse>> {
    Ok(Json(state.interview_service.start_interview(requester.id).await?))
}

/// Multipart body: an `audio` file part streamed straight to staging, and a
/// `messages` text part holding the JSON message log.
#[axum::debug_handler]
pub async fn submit_interview(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let ingest = state.interview_service.ingest();
    let limit = ingest.config().max_audio_bytes;

    let mut audio: Option<StagedAudio> = None;
    let mut messages: Vec<ChatMessage> = Vec::new();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let mime_type = field.content_type().map(str::to_string);
                let mut staged = ingest.stage(mime_type.as_deref()).await?;
                while let Some(chunk) = field.chunk().await? {
                    staged.write_chunk(&chunk, limit).await?;
                }
                audio = Some(staged);
            }
            "messages" => {
                let raw = field.text().await?;
                if !raw.trim().is_empty() {
                    messages = serde_json::from_str(&raw)?;
                }
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    // the pipeline runs to completion even if the client goes away
    let service = state.interview_service.clone();
    let candidate_id = requester.id;
    let session = tokio::spawn(async move {
        service
            .submit_interview(candidate_id, audio, messages)
            .await
    })
    .await
    .map_err(|e| Error::Internal(format!("submission task failed: {}", e)))??;

    Ok((
        StatusCode::CREATED,
        Json(SubmitInterviewResponse {
            message: "Interview submitted successfully".to_string(),
            session,
        }),
    ))
}

pub async fn get_own_result(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> Result<Json<SessionView>> {
    Ok(Json(state.interview_service.get_own_result(requester.id).await?))
}
