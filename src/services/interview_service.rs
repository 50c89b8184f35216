use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{SessionInsert, Store};
use crate::dto::interview_dto::{
    CandidateSummary, DepartmentOverview, QuestionsResponse, SessionView, StatusResponse,
};
use crate::error::{Error, Result};
use crate::models::interview::{statuses_consistent, ChatMessage, InterviewSession, SessionStatus};
use crate::models::user::{InterviewStatus, Role, User};
use crate::services::analysis_service::AnalysisClient;
use crate::services::audio_ingest::{AudioIngest, StagedAudio};
use crate::services::question_service::{QuestionAssembler, QuestionService};
use crate::services::visibility::{can_view, gate, Requester};

/// Caller-facing interview operations.
#[derive(Clone)]
pub struct InterviewService {
    store: Arc<dyn Store>,
    questions: QuestionService,
    assembler: QuestionAssembler,
    ingest: AudioIngest,
    analysis: AnalysisClient,
}

impl InterviewService {
    pub fn new(
        store: Arc<dyn Store>,
        questions: QuestionService,
        assembler: QuestionAssembler,
        ingest: AudioIngest,
        analysis: AnalysisClient,
    ) -> Self {
        Self {
            store,
            questions,
            assembler,
            ingest,
            analysis,
        }
    }

    pub fn ingest(&self) -> &AudioIngest {
        &self.ingest
    }

    async fn candidate(&self, candidate_id: Uuid) -> Result<User> {
        self.store
            .get_user(candidate_id)
            .await?
            .filter(|u| u.role == Role::Candidate)
            .ok_or_else(|| Error::NotFound("Candidate not found".to_string()))
    }

    pub async fn assemble_questions(&self, candidate_id: Uuid) -> Result<QuestionsResponse> {
        let candidate = self.candidate(candidate_id).await?;
        if candidate.interview_status.is_completed() {
            return Err(Error::Conflict("Interview already completed".to_string()));
        }
        let department_id = candidate
            .department_id
            .ok_or_else(|| Error::BadRequest("Candidate is not assigned to a department".to_string()))?;
        let department = self
            .store
            .get_department(department_id)
            .await?
            .ok_or_else(|| Error::BadRequest("Candidate department does not exist".to_string()))?;

        let curated = self.questions.curated_texts(department_id).await?;
        let questions = self.assembler.assemble(&department.name, &curated).await;

        Ok(QuestionsResponse {
            department: department.name,
            questions,
        })
    }

    pub async fn check_status(&self, candidate_id: Uuid) -> Result<StatusResponse> {
        let candidate = self.candidate(candidate_id).await?;
        Ok(StatusResponse {
            completed: candidate.interview_status.is_completed(),
            interview_status: candidate.interview_status,
        })
    }

    /// Moves `NOT_STARTED` to `IN_PROGRESS`. Repeating the call is harmless; a
    /// completed candidate cannot start again.
    pub async fn start_interview(&self, candidate_id: Uuid) -> Result<StatusResponse> {
        let candidate = self.candidate(candidate_id).await?;
        match candidate.interview_status {
            InterviewStatus::Completed => {
                Err(Error::Conflict("Interview already completed".to_string()))
            }
            InterviewStatus::InProgress => Ok(StatusResponse {
                completed: false,
                interview_status: InterviewStatus::InProgress,
            }),
            InterviewStatus::NotStarted => {
                self.store
                    .set_interview_status(candidate_id, InterviewStatus::InProgress)
                    .await?;
                tracing::info!(%candidate_id, "Interview started");
                Ok(StatusResponse {
                    completed: false,
                    interview_status: InterviewStatus::InProgress,
                })
            }
        }
    }

    /// Uploads the recording, analyses it and writes the one session this
    /// candidate will ever have. The session is written before the candidate is
    /// flagged `COMPLETED`.
    pub async fn submit_interview(
        &self,
        candidate_id: Uuid,
        audio: Option<StagedAudio>,
        messages: Vec<ChatMessage>,
    ) -> Result<SessionView> {
        let candidate = self.candidate(candidate_id).await?;
        self.ensure_not_submitted(&candidate).await?;

        let audio = audio.ok_or_else(|| Error::BadRequest("Audio file is required".to_string()))?;
        let department_id = candidate
            .department_id
            .ok_or_else(|| Error::BadRequest("Candidate is not assigned to a department".to_string()))?;

        let audio_ref = self.ingest.ingest(candidate_id, audio).await?;

        tracing::info!(%candidate_id, turns = messages.len(), "Analysing interview");
        let outcome = self.analysis.analyze(&audio_ref, &messages).await;
        if outcome.degraded {
            tracing::warn!(%candidate_id, feedback = %outcome.feedback, "Storing degraded interview analysis");
        }

        let session = InterviewSession::completed(
            candidate_id,
            department_id,
            outcome.transcript,
            audio_ref.url,
            outcome.score,
            outcome.payload,
            outcome.feedback,
        );

        let session = match self.store.insert_session(&session).await? {
            SessionInsert::Created(session) => session,
            SessionInsert::AlreadyExists => {
                tracing::warn!(%candidate_id, "Concurrent submission lost the race");
                self.mark_completed(candidate_id).await;
                return Err(Error::Conflict("Interview already submitted".to_string()));
            }
        };

        self.store
            .set_interview_status(candidate_id, InterviewStatus::Completed)
            .await?;
        debug_assert!(statuses_consistent(InterviewStatus::Completed, Some(&session)));
        tracing::info!(%candidate_id, session_id = %session.id, score = session.ai_score, "Interview completed");

        Ok(SessionView::new(session, Some(candidate.name)))
    }

    async fn ensure_not_submitted(&self, candidate: &User) -> Result<()> {
        if candidate.interview_status.is_completed() {
            return Err(Error::Conflict("Interview already completed".to_string()));
        }
        if self.store.find_session(candidate.id).await?.is_some() {
            // a previous submission wrote its record but never set the flag
            self.mark_completed(candidate.id).await;
            return Err(Error::Conflict("Interview already submitted".to_string()));
        }
        Ok(())
    }

    async fn mark_completed(&self, candidate_id: Uuid) {
        if let Err(e) = self
            .store
            .set_interview_status(candidate_id, InterviewStatus::Completed)
            .await
        {
            tracing::error!(%candidate_id, error = %e, "Failed to mark candidate completed");
        }
    }

    pub async fn get_own_result(&self, candidate_id: Uuid) -> Result<SessionView> {
        let candidate = self.candidate(candidate_id).await?;
        let session = self
            .store
            .find_session(candidate_id)
            .await?
            .ok_or_else(|| Error::NotFound("No interview result found".to_string()))?;
        Ok(SessionView::new(session, Some(candidate.name)))
    }

    pub async fn get_session_for_candidate(
        &self,
        requester: &Requester,
        candidate_id: Uuid,
    ) -> Result<SessionView> {
        let candidate = self.store.get_user(candidate_id).await?;
        let session = self.store.find_session(candidate_id).await?;
        let session = gate(requester, candidate.as_ref(), session)?;
        Ok(SessionView::new(session, candidate.map(|c| c.name)))
    }

    /// Every completed session, newest first.
    pub async fn list_completed_sessions(&self) -> Result<Vec<SessionView>> {
        let names: HashMap<Uuid, String> = self
            .store
            .list_candidates(None)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let sessions = self.store.list_sessions(Some(SessionStatus::Completed)).await?;
        Ok(sessions
            .into_iter()
            .map(|s| {
                let name = names.get(&s.candidate_id).cloned();
                SessionView::new(s, name)
            })
            .collect())
    }

    /// Completed sessions the requester may see: the HR caller's department,
    /// or everything for an admin.
    pub async fn list_department_sessions(&self, requester: &Requester) -> Result<Vec<SessionView>> {
        let scope = requester.department_scope()?;
        let candidates: HashMap<Uuid, User> = self
            .store
            .list_candidates(scope)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let sessions = self.store.list_sessions(Some(SessionStatus::Completed)).await?;
        Ok(sessions
            .into_iter()
            .filter_map(|s| {
                let candidate = candidates.get(&s.candidate_id)?;
                can_view(requester, candidate).then(|| SessionView::new(s, Some(candidate.name.clone())))
            })
            .collect())
    }

    pub async fn department_overview(&self, requester: &Requester) -> Result<DepartmentOverview> {
        let scope = requester.department_scope()?;
        let candidates = self.store.list_candidates(scope).await?;

        let mut overview = DepartmentOverview {
            department_id: scope,
            total_candidates: candidates.len(),
            ..DepartmentOverview::default()
        };
        for candidate in &candidates {
            match candidate.interview_status {
                InterviewStatus::NotStarted => overview.not_started += 1,
                InterviewStatus::InProgress => overview.in_progress += 1,
                InterviewStatus::Completed => overview.completed += 1,
            }
        }
        Ok(overview)
    }

    /// Candidates in the requester's department scope, without credentials.
    pub async fn list_department_candidates(&self, requester: &Requester) -> Result<Vec<CandidateSummary>> {
        let scope = requester.department_scope()?;
        let candidates = self.store.list_candidates(scope).await?;
        Ok(candidates.into_iter().map(CandidateSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, AssemblerConfig, IngestConfig};
    use crate::database::MemoryStore;
    use crate::models::department::Department;
    use crate::services::ai_service::{GenerativeClient, MockGenerativeClient};
    use crate::services::storage_service::{MockObjectStorage, StoredObject};
    use tempfile::TempDir;

    struct Harness {
        store: MemoryStore,
        service: InterviewService,
        _staging: TempDir,
    }

    fn harness(ai: MockGenerativeClient, storage: MockObjectStorage) -> Harness {
        let staging = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let shared: Arc<dyn Store> = Arc::new(store.clone());
        let client: Arc<dyn GenerativeClient> = Arc::new(ai);

        let service = InterviewService::new(
            shared.clone(),
            QuestionService::new(shared),
            QuestionAssembler::new(client.clone(), AssemblerConfig::default()),
            AudioIngest::new(
                Arc::new(storage),
                IngestConfig {
                    staging_dir: staging.path().to_path_buf(),
                    folder: "interviews".to_string(),
                    max_audio_bytes: 1024,
                },
            ),
            AnalysisClient::new(client, AnalysisConfig::default()),
        );
        Harness {
            store,
            service,
            _staging: staging,
        }
    }

    fn working_storage() -> MockObjectStorage {
        let mut storage = MockObjectStorage::new();
        storage.expect_upload().returning(|_, folder, key| {
            Ok(StoredObject {
                url: format!("https://cdn.example/{}/{}", folder, key),
            })
        });
        storage
    }

    async fn staged(service: &InterviewService) -> StagedAudio {
        let mut audio = service.ingest().stage(Some("audio/webm")).await.unwrap();
        audio.write_chunk(b"\x1a\x45\xdf\xa3webm", 1024).await.unwrap();
        audio
    }

    async fn seed_candidate(store: &MemoryStore, department: &str) -> (User, Department) {
        let dept = Department::new(department);
        let candidate = User::candidate("Dana", "dana@example.com", Some(dept.id));
        store.add_department(dept.clone()).await;
        store.add_user(candidate.clone()).await;
        (candidate, dept)
    }

    fn placeholder_log(questions: &[String]) -> Vec<ChatMessage> {
        let mut log = vec![ChatMessage::assistant(
            "Hello! I will be asking you a few questions today.",
        )];
        for q in questions {
            log.push(ChatMessage::assistant(q.clone()));
            log.push(ChatMessage::candidate("Response Recorded"));
        }
        log.push(ChatMessage::assistant("Thank you for your time. Goodbye!"));
        log
    }

    #[tokio::test]
    async fn full_interview_from_questions_to_result() {
        let mut ai = MockGenerativeClient::new();
        ai.expect_generate().returning(|prompt, audio| match audio {
            None => Err(anyhow::anyhow!("question generator offline")),
            Some(_) => {
                let questions = AssemblerConfig::default().generic_questions;
                let mut transcript = Vec::new();
                for (i, q) in questions.iter().enumerate() {
                    assert!(prompt.contains(q.as_str()));
                    transcript.push(serde_json::json!({"role": "assistant", "text": q}));
                    transcript.push(serde_json::json!({"role": "candidate", "text": format!("um, answer {}", i + 1)}));
                }
                Ok(format!(
                    "```json\n{}\n```",
                    serde_json::json!({
                        "score": 72,
                        "feedback": "Clear communicator.",
                        "strengths": ["structure"],
                        "improvements": ["depth"],
                        "fullTranscript": transcript,
                    })
                ))
            }
        });
        let h = harness(ai, working_storage());
        let (candidate, _) = seed_candidate(&h.store, "Engineering").await;

        let assembled = h.service.assemble_questions(candidate.id).await.unwrap();
        assert_eq!(assembled.department, "Engineering");
        assert_eq!(assembled.questions.len(), 5);

        h.service.start_interview(candidate.id).await.unwrap();
        let audio = staged(&h.service).await;
        let submitted = h
            .service
            .submit_interview(candidate.id, Some(audio), placeholder_log(&assembled.questions))
            .await
            .unwrap();
        assert_eq!(submitted.status, SessionStatus::Completed);
        assert_eq!(submitted.ai_score, 72);

        let user = h.store.get_user(candidate.id).await.unwrap().unwrap();
        assert_eq!(user.interview_status, InterviewStatus::Completed);
        let session = h.store.find_session(candidate.id).await.unwrap();
        assert!(statuses_consistent(user.interview_status, session.as_ref()));

        let result = h.service.get_own_result(candidate.id).await.unwrap();
        assert_eq!(result.transcript.len(), 5);
        assert_eq!(result.transcript[0].answer_text, "um, answer 1");
        assert_eq!(result.candidate_name.as_deref(), Some("Dana"));
    }

    #[tokio::test]
    async fn unreachable_ai_still_completes_with_zero_score() {
        let mut ai = MockGenerativeClient::new();
        ai.expect_generate()
            .returning(|_, _| Err(anyhow::anyhow!("dns error")));
        let h = harness(ai, working_storage());
        let (candidate, _) = seed_candidate(&h.store, "Support").await;

        let audio = staged(&h.service).await;
        let log = placeholder_log(&["How do you calm an angry customer?".to_string()]);
        let view = h
            .service
            .submit_interview(candidate.id, Some(audio), log)
            .await
            .unwrap();

        assert_eq!(view.ai_score, 0);
        assert!(view.feedback.unwrap().starts_with("Analysis Failed"));
        assert_eq!(view.transcript[0].answer_text, "[Transcription Failed]");
        let user = h.store.get_user(candidate.id).await.unwrap().unwrap();
        assert!(user.interview_status.is_completed());
    }

    #[tokio::test]
    async fn second_submission_is_rejected_without_new_session() {
        let mut ai = MockGenerativeClient::new();
        ai.expect_generate()
            .returning(|_, _| Ok(r#"{"score": 50, "feedback": "ok"}"#.to_string()));
        let mut storage = MockObjectStorage::new();
        storage.expect_upload().times(1).returning(|_, _, key| {
            Ok(StoredObject {
                url: format!("https://cdn.example/{}", key),
            })
        });
        let h = harness(ai, storage);
        let (candidate, _) = seed_candidate(&h.store, "Design").await;

        let first = staged(&h.service).await;
        h.service
            .submit_interview(candidate.id, Some(first), vec![])
            .await
            .unwrap();

        let second = staged(&h.service).await;
        let err = h
            .service
            .submit_interview(candidate.id, Some(second), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(h.store.session_count().await, 1);
        assert!(matches!(
            h.service.start_interview(candidate.id).await.unwrap_err(),
            Error::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_submissions_leave_one_session() {
        let mut ai = MockGenerativeClient::new();
        ai.expect_generate()
            .returning(|_, _| Ok(r#"{"score": 61}"#.to_string()));
        let h = harness(ai, working_storage());
        let (candidate, _) = seed_candidate(&h.store, "Design").await;

        let (a, b) = (staged(&h.service).await, staged(&h.service).await);
        let (first, second) = tokio::join!(
            h.service.submit_interview(candidate.id, Some(a), vec![]),
            h.service.submit_interview(candidate.id, Some(b), vec![]),
        );

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(h.store.session_count().await, 1);
        let user = h.store.get_user(candidate.id).await.unwrap().unwrap();
        assert!(user.interview_status.is_completed());
    }

    #[tokio::test]
    async fn existing_session_heals_candidate_flag() {
        let mut storage = MockObjectStorage::new();
        storage.expect_upload().times(0);
        let h = harness(MockGenerativeClient::new(), storage);
        let (candidate, dept) = seed_candidate(&h.store, "Ops").await;
        h.store
            .insert_session(&InterviewSession::completed(
                candidate.id,
                dept.id,
                vec![],
                "https://cdn.example/old.webm".into(),
                40,
                None,
                "earlier run".into(),
            ))
            .await
            .unwrap();

        let audio = staged(&h.service).await;
        let err = h
            .service
            .submit_interview(candidate.id, Some(audio), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        let user = h.store.get_user(candidate.id).await.unwrap().unwrap();
        assert!(user.interview_status.is_completed());
    }

    #[tokio::test]
    async fn missing_audio_is_rejected_before_side_effects() {
        let mut storage = MockObjectStorage::new();
        storage.expect_upload().times(0);
        let mut ai = MockGenerativeClient::new();
        ai.expect_generate().times(0);
        let h = harness(ai, storage);
        let (candidate, _) = seed_candidate(&h.store, "Ops").await;

        let err = h
            .service
            .submit_interview(candidate.id, None, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(h.store.session_count().await, 0);
    }

    #[tokio::test]
    async fn storage_failure_aborts_and_leaves_candidate_open() {
        let mut storage = MockObjectStorage::new();
        storage
            .expect_upload()
            .returning(|_, _, _| Err(Error::Storage("503 from bucket".into())));
        let mut ai = MockGenerativeClient::new();
        ai.expect_generate().times(0);
        let h = harness(ai, storage);
        let (candidate, _) = seed_candidate(&h.store, "Ops").await;

        let audio = staged(&h.service).await;
        let err = h
            .service
            .submit_interview(candidate.id, Some(audio), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        let user = h.store.get_user(candidate.id).await.unwrap().unwrap();
        assert!(!user.interview_status.is_completed());
    }

    #[tokio::test]
    async fn candidate_without_department_cannot_get_questions() {
        let h = harness(MockGenerativeClient::new(), MockObjectStorage::new());
        let candidate = User::candidate("Lee", "lee@example.com", None);
        h.store.add_user(candidate.clone()).await;

        let err = h.service.assemble_questions(candidate.id).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn hr_reads_are_scoped_to_department() {
        let h = harness(MockGenerativeClient::new(), MockObjectStorage::new());
        let (in_a, dept_a) = seed_candidate(&h.store, "Engineering").await;
        let (in_b, dept_b) = seed_candidate(&h.store, "Finance").await;
        for (candidate, dept) in [(&in_a, &dept_a), (&in_b, &dept_b)] {
            h.store
                .insert_session(&InterviewSession::completed(
                    candidate.id,
                    dept.id,
                    vec![],
                    "https://cdn.example/a.webm".into(),
                    70,
                    None,
                    "fine".into(),
                ))
                .await
                .unwrap();
        }

        let hr = Requester::new(Uuid::new_v4(), Role::Hr, Some(dept_a.id));
        assert!(h.service.get_session_for_candidate(&hr, in_a.id).await.is_ok());
        let hidden = h
            .service
            .get_session_for_candidate(&hr, in_b.id)
            .await
            .unwrap_err();
        assert!(matches!(hidden, Error::NotFound(_)));

        let listed = h.service.list_department_sessions(&hr).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].candidate_id, in_a.id);

        let admin = Requester::new(Uuid::new_v4(), Role::Admin, None);
        assert_eq!(h.service.list_department_sessions(&admin).await.unwrap().len(), 2);
        assert_eq!(h.service.list_completed_sessions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn overview_counts_candidates_by_status() {
        let h = harness(MockGenerativeClient::new(), MockObjectStorage::new());
        let (first, dept) = seed_candidate(&h.store, "Engineering").await;
        h.store
            .add_user(User::candidate("Sam", "sam@example.com", Some(dept.id)))
            .await;
        h.service.start_interview(first.id).await.unwrap();

        let hr = Requester::new(Uuid::new_v4(), Role::Hr, Some(dept.id));
        let overview = h.service.department_overview(&hr).await.unwrap();
        assert_eq!(overview.total_candidates, 2);
        assert_eq!(overview.in_progress, 1);
        assert_eq!(overview.not_started, 1);

        let unassigned = Requester::new(Uuid::new_v4(), Role::Hr, None);
        assert!(matches!(
            h.service.department_overview(&unassigned).await.unwrap_err(),
            Error::BadRequest(_)
        ));
    }
}
