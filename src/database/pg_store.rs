use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::store::{SessionInsert, Store};
use crate::error::{Error, Result};
use crate::models::department::Department;
use crate::models::interview::{AnalysisPayload, ChatMessage, InterviewSession, SessionStatus};
use crate::models::question::Question;
use crate::models::user::{InterviewStatus, User};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    department_id: Option<Uuid>,
    interview_status: String,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role.parse().map_err(Error::Internal)?,
            department_id: row.department_id,
            interview_status: row.interview_status.parse().map_err(Error::Internal)?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    candidate_id: Uuid,
    department_id: Uuid,
    status: String,
    messages: Json<Vec<ChatMessage>>,
    audio_url: Option<String>,
    ai_score: i32,
    ai_analysis: Option<Json<AnalysisPayload>>,
    feedback: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for InterviewSession {
    type Error = Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(InterviewSession {
            id: row.id,
            candidate_id: row.candidate_id,
            department_id: row.department_id,
            status: row.status.parse().map_err(Error::Internal)?,
            messages: row.messages.0,
            audio_url: row.audio_url,
            ai_score: row.ai_score,
            ai_analysis: row.ai_analysis.map(|j| j.0),
            feedback: row.feedback,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, name, email, role, department_id, interview_status, created_at";
const SESSION_COLUMNS: &str = "id, candidate_id, department_id, status, messages, audio_url, \
     ai_score, ai_analysis, feedback, completed_at, created_at";

#[async_trait]
impl Store for PgStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn set_interview_status(&self, id: Uuid, status: InterviewStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"UPDATE users SET interview_status = $1
               WHERE id = $2 AND interview_status <> 'COMPLETED'"#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_candidates(&self, department_id: Option<Uuid>) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users
             WHERE role = 'candidate' AND ($1::uuid IS NULL OR department_id = $1)
             ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>> {
        let dept = sqlx::query_as::<_, Department>("SELECT id, name FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(dept)
    }

    async fn find_questions(&self, department_id: Option<Uuid>) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"SELECT id, text, department_id, created_by, created_at FROM questions
               WHERE ($1::uuid IS NULL OR department_id = $1)
               ORDER BY created_at DESC"#,
        )
        .bind(department_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(
            "SELECT id, text, department_id, created_by, created_at FROM questions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO questions (id, text, department_id, created_by, created_at)
               VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))"#,
        )
        .bind(question.id)
        .bind(&question.text)
        .bind(question.department_id)
        .bind(question.created_by)
        .bind(question.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_question(&self, question: &Question) -> Result<bool> {
        let result = sqlx::query("UPDATE questions SET text = $1, department_id = $2 WHERE id = $3")
            .bind(&question.text)
            .bind(question.department_id)
            .bind(question.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_session(&self, candidate_id: Uuid) -> Result<Option<InterviewSession>> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM interview_sessions WHERE candidate_id = $1",
            SESSION_COLUMNS
        ))
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(InterviewSession::try_from).transpose()
    }

    async fn insert_session(&self, session: &InterviewSession) -> Result<SessionInsert> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "INSERT INTO interview_sessions (
                id, candidate_id, department_id, status, messages, audio_url,
                ai_score, ai_analysis, feedback, completed_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (candidate_id) DO NOTHING
            RETURNING {}",
            SESSION_COLUMNS
        ))
        .bind(session.id)
        .bind(session.candidate_id)
        .bind(session.department_id)
        .bind(session.status.as_str())
        .bind(Json(&session.messages))
        .bind(&session.audio_url)
        .bind(session.ai_score)
        .bind(session.ai_analysis.as_ref().map(Json))
        .bind(&session.feedback)
        .bind(session.completed_at)
        .bind(session.created_at)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(SessionInsert::Created(row.try_into()?)),
            None => Ok(SessionInsert::AlreadyExists),
        }
    }

    async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<InterviewSession>> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {} FROM interview_sessions
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY completed_at DESC NULLS LAST",
            SESSION_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(InterviewSession::try_from).collect()
    }
}
