pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::config::{AnalysisConfig, AssemblerConfig, IngestConfig};
use crate::database::Store;
use crate::middleware::auth;
use crate::services::{
    ai_service::GenerativeClient,
    analysis_service::AnalysisClient,
    audio_ingest::AudioIngest,
    interview_service::InterviewService,
    question_service::{QuestionAssembler, QuestionService},
    storage_service::ObjectStorage,
};

/// External collaborators and tunables the HTTP layer is built from.
pub struct AppParts {
    pub store: Arc<dyn Store>,
    pub ai_client: Arc<dyn GenerativeClient>,
    pub storage: Arc<dyn ObjectStorage>,
    pub jwt_secret: String,
    pub assembler: AssemblerConfig,
    pub analysis: AnalysisConfig,
    pub ingest: IngestConfig,
}

#[derive(Clone)]
pub struct AppState {
    pub interview_service: InterviewService,
    pub question_service: QuestionService,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(parts: AppParts) -> Self {
        let question_service = QuestionService::new(parts.store.clone());
        let assembler = QuestionAssembler::new(parts.ai_client.clone(), parts.assembler);
        let ingest = AudioIngest::new(parts.storage, parts.ingest);
        let analysis = AnalysisClient::new(parts.ai_client, parts.analysis);
        let interview_service = InterviewService::new(
            parts.store,
            question_service.clone(),
            assembler,
            ingest,
            analysis,
        );

        Self {
            interview_service,
            question_service,
            jwt_secret: Arc::from(parts.jwt_secret),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let candidate_api = Router::new()
        .route("/api/interview/questions", get(routes::interview::get_questions))
        .route("/api/interview/status", get(routes::interview::get_status))
        .route("/api/interview/start", post(routes::interview::start_interview))
        .route("/api/interview/submit", post(routes::interview::submit_interview))
        .route("/api/interview/me", get(routes::interview::get_own_result))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_candidate,
        ));

    let hr_api = Router::new()
        .route("/api/hr/overview", get(routes::hr::overview))
        .route("/api/hr/candidates", get(routes::hr::list_candidates))
        .route("/api/hr/interviews", get(routes::hr::list_interviews))
        .route(
            "/api/hr/interviews/:candidate_id",
            get(routes::hr::get_interview),
        )
        .route(
            "/api/questions",
            get(routes::questions::list_questions).post(routes::questions::create_question),
        )
        .route(
            "/api/questions/:id",
            put(routes::questions::update_question).delete(routes::questions::delete_question),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_hr_or_admin,
        ));

    let admin_api = Router::new()
        .route("/api/admin/interviews", get(routes::admin::list_interviews))
        .route(
            "/api/admin/interviews/:candidate_id",
            get(routes::admin::get_interview),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(candidate_api)
        .merge(hr_api)
        .merge(admin_api)
        .with_state(state)
}
