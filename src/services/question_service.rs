use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AssemblerConfig;
use crate::database::Store;
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::services::ai_service::GenerativeClient;
use crate::services::visibility::Requester;
use crate::utils::json_extract::decode_embedded;

/// Curated question bank, scoped by department.
#[derive(Clone)]
pub struct QuestionService {
    store: Arc<dyn Store>,
}

impl QuestionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Question texts curated for a department, as input to assembly.
    pub async fn curated_texts(&self, department_id: Uuid) -> Result<Vec<String>> {
        let questions = self.store.find_questions(Some(department_id)).await?;
        Ok(questions.into_iter().map(|q| q.text).collect())
    }

    pub async fn list(&self, requester: &Requester, department_id: Option<Uuid>) -> Result<Vec<Question>> {
        let filter = match requester.department_scope()? {
            Some(own) => Some(own),
            None => department_id,
        };
        self.store.find_questions(filter).await
    }

    pub async fn create(&self, requester: &Requester, text: &str, department_id: Uuid) -> Result<Question> {
        if let Some(own) = requester.department_scope()? {
            if own != department_id {
                return Err(Error::Forbidden(
                    "HR can only add questions to their own department".to_string(),
                ));
            }
        }
        if self.store.get_department(department_id).await?.is_none() {
            return Err(Error::BadRequest("Unknown department".to_string()));
        }

        let question = Question::new(text, department_id, Some(requester.id));
        self.store.insert_question(&question).await?;
        tracing::info!(question_id = %question.id, department_id = %department_id, "Curated question created");
        Ok(question)
    }

    /// HR may only edit questions of its own department and may not move them
    /// elsewhere; an admin may move a question to any existing department.
    pub async fn update(
        &self,
        requester: &Requester,
        id: Uuid,
        text: Option<&str>,
        department_id: Option<Uuid>,
    ) -> Result<Question> {
        let scope = requester.department_scope()?;
        let mut question = self
            .store
            .get_question(id)
            .await?
            .filter(|q| scope.map_or(true, |own| q.department_id == own))
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;

        if let Some(target) = department_id.filter(|d| *d != question.department_id) {
            if scope.is_some() {
                return Err(Error::Forbidden(
                    "HR cannot change the department of a question".to_string(),
                ));
            }
            if self.store.get_department(target).await?.is_none() {
                return Err(Error::BadRequest("Unknown department".to_string()));
            }
            question.department_id = target;
        }
        if let Some(text) = text {
            question.text = text.to_string();
        }

        if !self.store.update_question(&question).await? {
            return Err(Error::NotFound("Question not found".to_string()));
        }
        tracing::info!(question_id = %question.id, department_id = %question.department_id, "Curated question updated");
        Ok(question)
    }

    pub async fn delete(&self, requester: &Requester, id: Uuid) -> Result<()> {
        let scope = requester.department_scope()?;
        let question = self
            .store
            .get_question(id)
            .await?
            .filter(|q| scope.map_or(true, |own| q.department_id == own))
            .ok_or_else(|| Error::NotFound("Question not found".to_string()))?;

        self.store.delete_question(question.id).await?;
        Ok(())
    }
}

/// Combines curated questions with AI-generated ones.
#[derive(Clone)]
pub struct QuestionAssembler {
    client: Arc<dyn GenerativeClient>,
    config: AssemblerConfig,
}

impl QuestionAssembler {
    pub fn new(client: Arc<dyn GenerativeClient>, config: AssemblerConfig) -> Self {
        Self { client, config }
    }

    /// Always yields between `min_questions` and `max_questions` entries.
    pub async fn assemble(&self, department_name: &str, curated: &[String]) -> Vec<String> {
        let prompt = self.build_prompt(department_name, curated);

        match self.client.generate(&prompt, None).await {
            Ok(raw) => match self.parse_questions(&raw) {
                Some(questions) => {
                    tracing::info!(
                        department = department_name,
                        count = questions.len(),
                        curated = curated.len(),
                        "Assembled interview questions"
                    );
                    return questions;
                }
                None => tracing::warn!(
                    department = department_name,
                    "AI question list unusable, falling back"
                ),
            },
            Err(e) => tracing::error!(
                department = department_name,
                error = ?e,
                "Question generation failed, falling back"
            ),
        }

        self.fallback(curated)
    }

    fn build_prompt(&self, department_name: &str, curated: &[String]) -> String {
        let min = self.config.min_questions;
        let max = self.config.max_questions;
        let existing = serde_json::to_string(curated).unwrap_or_else(|_| "[]".to_string());

        let task = if curated.len() >= min {
            format!(
                "Select the 3 to 5 strongest EXISTING QUESTIONS (you may lightly rephrase them) and \
                 add 2 to 5 new ones so the whole set forms one cohesive flow of {} to {} questions.",
                min, max
            )
        } else if !curated.is_empty() {
            format!(
                "There are not enough existing questions. Generate fresh, role-relevant questions for \
                 this department to reach {} to {} in total. Use the EXISTING QUESTIONS only as \
                 thematic guidance.",
                min, max
            )
        } else {
            format!(
                "No curated questions exist. Generate {} to {} questions covering the candidate's \
                 background, professional experience, problem-solving and motivation, adapted to \
                 this department.",
                min, max
            )
        };

        format!(
            r#"You are an expert interviewer for the {dept} department.

DEPARTMENT: {dept}
EXISTING QUESTIONS: {existing}

TASK:
{task}

RULES:
1. Every item must be an actual QUESTION.
2. Mix technical and behavioral questions.
3. Do NOT include any intro text, thoughts, numbering or formatting.

Return ONLY a JSON array of strings: ["Q1", "Q2", ...]"#,
            dept = department_name,
            existing = existing,
            task = task,
        )
    }

    /// `None` when the response cannot supply at least `min_questions` usable
    /// entries.
    pub fn parse_questions(&self, raw: &str) -> Option<Vec<String>> {
        let value: JsonValue = decode_embedded(raw)?;
        let items = match value {
            JsonValue::Array(items) => items,
            JsonValue::Object(mut obj) => match obj.remove("questions") {
                Some(JsonValue::Array(items)) => items,
                _ => return None,
            },
            _ => return None,
        };

        let mut questions: Vec<String> = Vec::new();
        for item in items {
            let Some(text) = item.as_str().map(str::trim) else {
                continue;
            };
            if text.chars().count() < self.config.min_question_chars {
                continue;
            }
            if !questions.iter().any(|q| q == text) {
                questions.push(text.to_string());
            }
        }

        if questions.len() < self.config.min_questions {
            return None;
        }
        questions.truncate(self.config.max_questions);
        Some(questions)
    }

    /// Curated questions first, topped up from the generic set.
    pub fn fallback(&self, curated: &[String]) -> Vec<String> {
        let min = self.config.min_questions;
        let mut questions: Vec<String> = curated
            .iter()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .take(min)
            .map(str::to_string)
            .collect();

        for generic in &self.config.generic_questions {
            if questions.len() >= min {
                break;
            }
            if !questions.contains(generic) {
                questions.push(generic.clone());
            }
        }
        questions
    }
}
