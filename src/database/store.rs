use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::department::Department;
use crate::models::interview::{InterviewSession, SessionStatus};
use crate::models::question::Question;
use crate::models::user::{InterviewStatus, User};

/// Outcome of the one-shot session insert.
#[derive(Debug)]
pub enum SessionInsert {
    Created(InterviewSession),
    /// The candidate already owns a session; nothing was written.
    AlreadyExists,
}

/// Keyed record store with atomic single-record writes.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Moves a user's interview status. `COMPLETED` is terminal: a user already
    /// completed is left untouched and `false` is returned.
    async fn set_interview_status(&self, id: Uuid, status: InterviewStatus) -> Result<bool>;

    async fn list_candidates(&self, department_id: Option<Uuid>) -> Result<Vec<User>>;

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>>;

    async fn find_questions(&self, department_id: Option<Uuid>) -> Result<Vec<Question>>;

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>>;

    async fn insert_question(&self, question: &Question) -> Result<()>;

    /// Writes text and department of an existing question; `false` when the
    /// id is unknown.
    async fn update_question(&self, question: &Question) -> Result<bool>;

    async fn delete_question(&self, id: Uuid) -> Result<bool>;

    async fn find_session(&self, candidate_id: Uuid) -> Result<Option<InterviewSession>>;

    /// Inserts unless the candidate already has a session. Must be atomic with
    /// respect to concurrent inserts for the same candidate.
    async fn insert_session(&self, session: &InterviewSession) -> Result<SessionInsert>;

    async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<InterviewSession>>;
}
