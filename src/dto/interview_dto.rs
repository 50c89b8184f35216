use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::interview::{
    AnalysisPayload, ChatMessage, InterviewSession, SessionStatus, TranscriptPair,
};
use crate::models::user::{InterviewStatus, User};
use crate::services::transcript::pair_transcript;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub department: String,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub completed: bool,
    pub interview_status: InterviewStatus,
}

/// A stored session as returned to readers, with the transcript rebuilt from
/// the message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: Option<String>,
    pub department_id: Uuid,
    pub status: SessionStatus,
    pub ai_score: i32,
    pub feedback: Option<String>,
    pub ai_analysis: Option<AnalysisPayload>,
    pub audio_url: Option<String>,
    pub transcript: Vec<TranscriptPair>,
    pub messages: Vec<ChatMessage>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl SessionView {
    pub fn new(session: InterviewSession, candidate_name: Option<String>) -> Self {
        let transcript = pair_transcript(&session.messages);
        Self {
            id: session.id,
            candidate_id: session.candidate_id,
            candidate_name,
            department_id: session.department_id,
            status: session.status,
            ai_score: session.ai_score,
            feedback: session.feedback,
            ai_analysis: session.ai_analysis,
            audio_url: session.audio_url,
            transcript,
            messages: session.messages,
            completed_at: session.completed_at,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitInterviewResponse {
    pub message: String,
    pub session: SessionView,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DepartmentOverview {
    pub department_id: Option<Uuid>,
    pub total_candidates: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
}

/// A candidate row as HR sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub department_id: Option<Uuid>,
    pub interview_status: InterviewStatus,
}

impl From<User> for CandidateSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            department_id: user.department_id,
            interview_status: user.interview_status,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionListQuery {
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 6, max = 1000))]
    pub text: String,
    /// Optional for HR callers, who default to their own department.
    pub department_id: Option<Uuid>,
}

/// Absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 6, max = 1000))]
    pub text: Option<String>,
    pub department_id: Option<Uuid>,
}
