use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::user::InterviewStatus;

/// Session-level lifecycle. Narrower than [`InterviewStatus`]: a session only
/// exists once a submission has been attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN_PROGRESS" => Ok(SessionStatus::InProgress),
            "COMPLETED" => Ok(SessionStatus::Completed),
            other => Err(format!("unknown session status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Assistant,
    #[serde(alias = "user")]
    Candidate,
}

/// One entry of the client-side message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ChatMessage {
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            text: text.into(),
        }
    }

    pub fn candidate(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Candidate,
            text: text.into(),
        }
    }
}

/// Structured part of the AI evaluation kept alongside the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub department_id: Uuid,
    pub status: SessionStatus,
    pub messages: Vec<ChatMessage>,
    pub audio_url: Option<String>,
    pub ai_score: i32,
    pub ai_analysis: Option<AnalysisPayload>,
    pub feedback: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn completed(
        candidate_id: Uuid,
        department_id: Uuid,
        messages: Vec<ChatMessage>,
        audio_url: String,
        ai_score: i32,
        ai_analysis: Option<AnalysisPayload>,
        feedback: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            candidate_id,
            department_id,
            status: SessionStatus::Completed,
            messages,
            audio_url: Some(audio_url),
            ai_score: ai_score.clamp(0, 100),
            ai_analysis,
            feedback: Some(feedback),
            completed_at: Some(now),
            created_at: now,
        }
    }
}

/// Derived on read; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptPair {
    pub question_text: String,
    pub answer_text: String,
}

/// A candidate flagged `COMPLETED` must always have a completed session behind
/// it. The opposite direction may briefly be false while a submission is
/// between its record write and its flag write.
pub fn statuses_consistent(candidate: InterviewStatus, session: Option<&InterviewSession>) -> bool {
    match (candidate, session) {
        (InterviewStatus::Completed, Some(s)) => s.status == SessionStatus::Completed,
        (InterviewStatus::Completed, None) => false,
        _ => true,
    }
}
