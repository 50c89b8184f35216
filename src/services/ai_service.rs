use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::BytesMut;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

/// Audio the model should listen to, referenced by its durable URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRef {
    pub url: String,
    pub mime_type: String,
}

impl AudioRef {
    pub fn webm(url: &str) -> Self {
        Self {
            url: url.to_string(),
            mime_type: "audio/webm".to_string(),
        }
    }
}

/// Opaque text generation capability: a prompt (plus optional audio) in,
/// free-form text out. Callers own prompt construction and response parsing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    async fn generate(&self, prompt: &str, audio: Option<AudioRef>) -> anyhow::Result<String>;
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    max_audio_bytes: usize,
}

impl GeminiClient {
    pub fn new(
        client: Client,
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
        max_audio_bytes: usize,
    ) -> Self {
        Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_audio_bytes,
        }
    }

    /// Downloads the recording for inline upload, refusing bodies larger than
    /// the ingest limit whether or not the server declares a length.
    async fn fetch_audio(&self, audio: &AudioRef) -> anyhow::Result<JsonValue> {
        let mut res = self
            .client
            .get(&audio.url)
            .timeout(self.timeout)
            .send()
            .await?;
        if !res.status().is_success() {
            anyhow::bail!("Audio fetch failed with status {}", res.status());
        }
        if let Some(declared) = res.content_length() {
            ensure_within_limit(declared, self.max_audio_bytes)?;
        }

        let mut bytes = BytesMut::new();
        while let Some(chunk) = res.chunk().await? {
            ensure_within_limit((bytes.len() + chunk.len()) as u64, self.max_audio_bytes)?;
            bytes.extend_from_slice(&chunk);
        }
        tracing::info!(bytes = bytes.len(), "Fetched interview audio for analysis");

        Ok(serde_json::json!({
            "inline_data": {
                "mime_type": audio.mime_type,
                "data": BASE64.encode(&bytes),
            }
        }))
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    async fn generate(&self, prompt: &str, audio: Option<AudioRef>) -> anyhow::Result<String> {
        let mut parts = vec![serde_json::json!({ "text": prompt })];
        if let Some(audio) = audio.as_ref() {
            parts.push(self.fetch_audio(audio).await?);
        }

        let payload = serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "temperature": 0.4 }
        });

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let res = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API Error {}: {}", status, text);
        }

        let body: JsonValue = res.json().await?;
        extract_candidate_text(&body)
            .ok_or_else(|| anyhow::anyhow!("Gemini response contained no text"))
    }
}

fn ensure_within_limit(len: u64, limit: usize) -> anyhow::Result<()> {
    if len > limit as u64 {
        anyhow::bail!("Audio is {} bytes, over the {} byte limit", len, limit);
    }
    Ok(())
}

fn extract_candidate_text(body: &JsonValue) -> Option<String> {
    let parts = body
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
