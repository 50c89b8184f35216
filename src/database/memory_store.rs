use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::store::{SessionInsert, Store};
use crate::error::Result;
use crate::models::department::Department;
use crate::models::interview::{InterviewSession, SessionStatus};
use crate::models::question::Question;
use crate::models::user::{InterviewStatus, Role, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    departments: HashMap<Uuid, Department>,
    questions: Vec<Question>,
    // keyed by candidate id, which gives the one-session-per-candidate rule
    sessions: HashMap<Uuid, InterviewSession>,
}

/// In-process store with the same uniqueness semantics as [`PgStore`].
///
/// [`PgStore`]: crate::database::pg_store::PgStore
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn add_department(&self, department: Department) {
        self.tables
            .write()
            .await
            .departments
            .insert(department.id, department);
    }

    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn set_interview_status(&self, id: Uuid, status: InterviewStatus) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&id) {
            Some(user) if !user.interview_status.is_completed() => {
                user.interview_status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_candidates(&self, department_id: Option<Uuid>) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter(|u| u.role == Role::Candidate)
            .filter(|u| department_id.is_none() || u.department_id == department_id)
            .cloned()
            .collect())
    }

    async fn get_department(&self, id: Uuid) -> Result<Option<Department>> {
        Ok(self.tables.read().await.departments.get(&id).cloned())
    }

    async fn find_questions(&self, department_id: Option<Uuid>) -> Result<Vec<Question>> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| department_id.map_or(true, |d| q.department_id == d))
            .cloned()
            .collect())
    }

    async fn get_question(&self, id: Uuid) -> Result<Option<Question>> {
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn insert_question(&self, question: &Question) -> Result<()> {
        self.tables.write().await.questions.push(question.clone());
        Ok(())
    }

    async fn update_question(&self, question: &Question) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.questions.iter_mut().find(|q| q.id == question.id) {
            Some(stored) => {
                stored.text = question.text.clone();
                stored.department_id = question.department_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_question(&self, id: Uuid) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != id);
        Ok(tables.questions.len() < before)
    }

    async fn find_session(&self, candidate_id: Uuid) -> Result<Option<InterviewSession>> {
        Ok(self.tables.read().await.sessions.get(&candidate_id).cloned())
    }

    async fn insert_session(&self, session: &InterviewSession) -> Result<SessionInsert> {
        let mut tables = self.tables.write().await;
        if tables.sessions.contains_key(&session.candidate_id) {
            return Ok(SessionInsert::AlreadyExists);
        }
        tables
            .sessions
            .insert(session.candidate_id, session.clone());
        Ok(SessionInsert::Created(session.clone()))
    }

    async fn list_sessions(&self, status: Option<SessionStatus>) -> Result<Vec<InterviewSession>> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<InterviewSession> = tables
            .sessions
            .values()
            .filter(|s| status.map_or(true, |st| s.status == st))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(sessions)
    }
}
