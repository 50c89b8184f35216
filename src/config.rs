use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_PLACEHOLDER: &str = "Response Recorded";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub ai_timeout_secs: u64,
    pub max_audio_bytes: usize,
    pub audio_staging_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub public_base_url: String,
    pub storage_upload_url: Option<String>,
    pub storage_api_key: Option<String>,
    pub storage_api_secret: Option<String>,
    pub storage_folder: String,
    pub placeholder_text: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            gemini_api_key: get_env("GEMINI_API_KEY")?,
            gemini_model: get_env_or("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_base_url: get_env_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            ai_timeout_secs: get_env_parse_or("AI_TIMEOUT_SECS", 120)?,
            max_audio_bytes: get_env_parse_or("MAX_AUDIO_BYTES", 10 * 1024 * 1024)?,
            audio_staging_dir: env::var("AUDIO_STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("interview-audio")),
            uploads_dir: PathBuf::from(get_env_or("UPLOADS_DIR", "./uploads")),
            public_base_url: get_env_or("PUBLIC_BASE_URL", "http://localhost:3045"),
            storage_upload_url: env::var("STORAGE_UPLOAD_URL").ok(),
            storage_api_key: env::var("STORAGE_API_KEY").ok(),
            storage_api_secret: env::var("STORAGE_API_SECRET").ok(),
            storage_folder: get_env_or("STORAGE_FOLDER", "interviews"),
            placeholder_text: get_env_or("PLACEHOLDER_TEXT", DEFAULT_PLACEHOLDER),
        })
    }

    pub fn assembler(&self) -> AssemblerConfig {
        AssemblerConfig::default()
    }

    pub fn analysis(&self) -> AnalysisConfig {
        AnalysisConfig {
            placeholder_text: self.placeholder_text.clone(),
            // audio download and generation each get the per-request timeout
            timeout: Duration::from_secs(self.ai_timeout_secs * 2),
            ..AnalysisConfig::default()
        }
    }

    pub fn ingest(&self) -> IngestConfig {
        IngestConfig {
            staging_dir: self.audio_staging_dir.clone(),
            folder: self.storage_folder.clone(),
            max_audio_bytes: self.max_audio_bytes,
        }
    }
}

/// Tunables for question assembly.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub min_questions: usize,
    pub max_questions: usize,
    pub min_question_chars: usize,
    pub generic_questions: Vec<String>,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            min_questions: 5,
            max_questions: 10,
            min_question_chars: 6,
            generic_questions: vec![
                "Tell me about your background.".to_string(),
                "What are your greatest professional strengths?".to_string(),
                "Describe a difficult challenge you fixed.".to_string(),
                "Where do you see yourself in 5 years?".to_string(),
                "Why should we hire you?".to_string(),
            ],
        }
    }
}

/// Sentinels used when reconciling the client-side message log with the audio.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub placeholder_text: String,
    pub no_response_marker: String,
    pub transcription_failed_marker: String,
    pub timeout: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            placeholder_text: DEFAULT_PLACEHOLDER.to_string(),
            no_response_marker: "[No response captured]".to_string(),
            transcription_failed_marker: "[Transcription Failed]".to_string(),
            timeout: Duration::from_secs(240),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub staging_dir: PathBuf,
    pub folder: String,
    pub max_audio_bytes: usize,
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_fallback_set_has_five_entries() {
        let cfg = AssemblerConfig::default();
        assert_eq!(cfg.generic_questions.len(), cfg.min_questions);
        assert!(cfg
            .generic_questions
            .iter()
            .all(|q| q.len() >= cfg.min_question_chars));
    }

    #[test]
    fn unparsable_numeric_env_is_a_config_error() {
        env::set_var("INTERVIEW_TEST_BAD_NUMBER", "many");
        let res: Result<u64> = get_env_parse_or("INTERVIEW_TEST_BAD_NUMBER", 3);
        assert!(matches!(res, Err(Error::Config(_))));
        env::remove_var("INTERVIEW_TEST_BAD_NUMBER");
    }
}
