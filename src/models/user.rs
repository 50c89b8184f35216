use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Hr,
    #[serde(alias = "student")]
    Candidate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hr => "hr",
            Role::Candidate => "candidate",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "hr" => Ok(Role::Hr),
            "candidate" | "student" => Ok(Role::Candidate),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate-level interview progress. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterviewStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::NotStarted => "NOT_STARTED",
            InterviewStatus::InProgress => "IN_PROGRESS",
            InterviewStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, InterviewStatus::Completed)
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_STARTED" => Ok(InterviewStatus::NotStarted),
            "IN_PROGRESS" => Ok(InterviewStatus::InProgress),
            "COMPLETED" => Ok(InterviewStatus::Completed),
            other => Err(format!("unknown interview status: {}", other)),
        }
    }
}

/// An account. Candidates, HR staff and admins share the same record; only
/// candidates carry a meaningful `interview_status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department_id: Option<Uuid>,
    pub interview_status: InterviewStatus,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn candidate(name: &str, email: &str, department_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            role: Role::Candidate,
            department_id,
            interview_status: InterviewStatus::NotStarted,
            created_at: Some(Utc::now()),
        }
    }

    pub fn staff(name: &str, email: &str, role: Role, department_id: Option<Uuid>) -> Self {
        Self {
            role,
            ..Self::candidate(name, email, department_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_student_role_is_a_candidate() {
        assert_eq!("student".parse::<Role>().unwrap(), Role::Candidate);
        let role: Role = serde_json::from_str("\"student\"").unwrap();
        assert_eq!(role, Role::Candidate);
    }

    #[test]
    fn status_uses_screaming_snake_case_on_the_wire() {
        let json = serde_json::to_string(&InterviewStatus::NotStarted).unwrap();
        assert_eq!(json, "\"NOT_STARTED\"");
        assert_eq!(
            "IN_PROGRESS".parse::<InterviewStatus>().unwrap(),
            InterviewStatus::InProgress
        );
    }
}
