use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::models::interview::{AnalysisPayload, ChatMessage};
use crate::services::ai_service::{AudioRef, GenerativeClient};
use crate::services::transcript::reconcile_log;
use crate::utils::json_extract::decode_embedded;

/// Decoded evaluation returned by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub score: i32,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub full_transcript: Vec<ChatMessage>,
}

/// Model output either decodes into a result or it does not; there is no
/// partial state in between.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAnalysis {
    Parsed(AnalysisResult),
    Unparseable,
}

/// What the submission pipeline persists: the evaluation plus the message log
/// with every placeholder resolved.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub score: i32,
    pub feedback: String,
    pub payload: Option<AnalysisPayload>,
    pub transcript: Vec<ChatMessage>,
    pub degraded: bool,
}

#[derive(Clone)]
pub struct AnalysisClient {
    client: Arc<dyn GenerativeClient>,
    config: AnalysisConfig,
}

impl AnalysisClient {
    pub fn new(client: Arc<dyn GenerativeClient>, config: AnalysisConfig) -> Self {
        Self { client, config }
    }

    /// Never fails: any error turns into a zero-score outcome whose feedback
    /// records the reason.
    pub async fn analyze(&self, audio: &AudioRef, history: &[ChatMessage]) -> AnalysisOutcome {
        let prompt = self.build_prompt(history);

        let call = self.client.generate(&prompt, Some(audio.clone()));
        let raw = match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::error!(error = ?e, audio_url = %audio.url, "Interview analysis call failed");
                return self.degraded(history, &e.to_string());
            }
            Err(_) => {
                tracing::error!(audio_url = %audio.url, "Interview analysis timed out");
                return self.degraded(history, "analysis timed out");
            }
        };

        match parse_analysis(&raw) {
            ParsedAnalysis::Parsed(result) => {
                tracing::info!(score = result.score, "Interview analysis parsed");
                let transcript = reconcile_log(history, Some(&result.full_transcript), &self.config);
                AnalysisOutcome {
                    score: result.score,
                    feedback: result.feedback,
                    payload: Some(AnalysisPayload {
                        strengths: result.strengths,
                        improvements: result.improvements,
                    }),
                    transcript,
                    degraded: false,
                }
            }
            ParsedAnalysis::Unparseable => {
                tracing::warn!(raw_len = raw.len(), "Interview analysis response was not valid JSON");
                self.degraded(history, "Invalid response format from AI")
            }
        }
    }

    pub fn degraded(&self, history: &[ChatMessage], reason: &str) -> AnalysisOutcome {
        AnalysisOutcome {
            score: 0,
            feedback: format!("Analysis Failed: {}", reason),
            payload: Some(AnalysisPayload::default()),
            transcript: reconcile_log(history, None, &self.config),
            degraded: true,
        }
    }

    pub fn build_prompt(&self, history: &[ChatMessage]) -> String {
        let history_json = serde_json::to_string(history).unwrap_or_else(|_| "[]".to_string());
        format!(
            r#"You are a professional, strict verbatim stenographer and HR analyst. Your primary goal is to transcribe the attached audio exactly as spoken, without any embellishment or correction.

Analyze this interview recording based on the provided history.

HISTORY CONTEXT: {history}

OBJECTIVES:
1. FULL TRANSCRIPT: For every candidate message whose text is "{placeholder}", replace it with the REAL, VERBATIM transcription of what the candidate actually said in the audio.
2. ANALYSIS: Provide a score from 0 to 100 and professional feedback.

STRICT TRANSCRIPTION RULES:
- Provide a STENOGRAPHIC transcription.
- DO NOT correct vocabulary or grammar.
- DO NOT assume what the candidate meant; transcribe exactly what they said.
- Keep filler words (um, uh, like), repetitions and false starts.
- If the candidate stops mid-sentence, transcribe it that way.
- If a question was skipped or no answer can be heard for it, use "{no_response}".
- Never invent a professional answer. A poor or short answer must stay poor or short.

JSON RESPONSE FORMAT:
{{
    "score": 85,
    "feedback": "...",
    "strengths": ["...", "..."],
    "improvements": ["...", "..."],
    "fullTranscript": [{{"role": "assistant", "text": "..."}}, {{"role": "candidate", "text": "..."}}]
}}

Return ONLY the raw JSON object."#,
            history = history_json,
            placeholder = self.config.placeholder_text,
            no_response = self.config.no_response_marker,
        )
    }
}

/// Decodes the first JSON object found in `raw`; bracketed asides such as
/// `[0-100]` are skipped. A missing or non-numeric score makes the whole
/// response unparseable; the list fields are lenient.
pub fn parse_analysis(raw: &str) -> ParsedAnalysis {
    let Some(obj) = decode_embedded::<Map<String, JsonValue>>(raw) else {
        return ParsedAnalysis::Unparseable;
    };

    let Some(score) = obj.get("score").and_then(coerce_score) else {
        return ParsedAnalysis::Unparseable;
    };

    let feedback = obj
        .get("feedback")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();

    let full_transcript = obj
        .get("fullTranscript")
        .or_else(|| obj.get("full_transcript"))
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|m| serde_json::from_value::<ChatMessage>(m.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    ParsedAnalysis::Parsed(AnalysisResult {
        score,
        feedback,
        strengths: string_list(obj.get("strengths")),
        improvements: string_list(obj.get("improvements")),
        full_transcript,
    })
}

fn coerce_score(v: &JsonValue) -> Option<i32> {
    let n = match v {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(0.0, 100.0) as i32)
}

fn string_list(v: Option<&JsonValue>) -> Vec<String> {
    v.and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ai_service::MockGenerativeClient;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Answers only after ten minutes.
    struct StalledClient;

    #[async_trait]
    impl GenerativeClient for StalledClient {
        async fn generate(&self, _prompt: &str, _audio: Option<AudioRef>) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(r#"{"score": 90, "feedback": "too late"}"#.to_string())
        }
    }

    fn history() -> Vec<ChatMessage> {
        vec![
            ChatMessage::assistant("Tell me about your background."),
            ChatMessage::candidate("Response Recorded"),
        ]
    }

    fn client(mock: MockGenerativeClient) -> AnalysisClient {
        AnalysisClient::new(Arc::new(mock), AnalysisConfig::default())
    }

    #[test]
    fn parses_json_wrapped_in_prose_and_fences() {
        let raw = r#"Here is my evaluation:
```json
{"score": 72, "feedback": "Solid", "strengths": ["clear"], "improvements": ["depth", 3],
 "fullTranscript": [{"role": "assistant", "text": "Q"}, {"role": "user", "text": "uh, I did physics"}]}
```
Hope that helps!"#;
        let ParsedAnalysis::Parsed(result) = parse_analysis(raw) else {
            panic!("expected a parsed result");
        };
        assert_eq!(result.score, 72);
        assert_eq!(result.improvements, vec!["depth".to_string()]);
        assert_eq!(result.full_transcript[1].text, "uh, I did physics");
    }

    #[test]
    fn text_without_json_is_unparseable() {
        assert_eq!(
            parse_analysis("The audio was silent, I cannot score this."),
            ParsedAnalysis::Unparseable
        );
        assert_eq!(parse_analysis("[1, 2, 3]"), ParsedAnalysis::Unparseable);
        assert!(matches!(
            parse_analysis(r#"Scale [1] applied: {"score": 40}"#),
            ParsedAnalysis::Parsed(AnalysisResult { score: 40, .. })
        ));
        assert_eq!(
            parse_analysis(r#"{"feedback": "no score here"}"#),
            ParsedAnalysis::Unparseable
        );
    }

    #[test]
    fn scores_are_coerced_into_range() {
        assert_eq!(coerce_score(&serde_json::json!(87.6)), Some(88));
        assert_eq!(coerce_score(&serde_json::json!("64%")), Some(64));
        assert_eq!(coerce_score(&serde_json::json!(-5)), Some(0));
        assert_eq!(coerce_score(&serde_json::json!(250)), Some(100));
        assert_eq!(coerce_score(&serde_json::json!(null)), None);
    }

    #[tokio::test]
    async fn sends_audio_and_history_in_one_request() {
        let mut mock = MockGenerativeClient::new();
        mock.expect_generate()
            .withf(|prompt, audio| {
                prompt.contains("Tell me about your background.")
                    && prompt.contains("[No response captured]")
                    && audio.as_ref().map(|a| a.url.as_str()) == Some("https://cdn/a.webm")
            })
            .times(1)
            .returning(|_, _| {
                Ok(r#"{"score": 64, "feedback": "ok", "strengths": [], "improvements": [],
                       "fullTranscript": [{"role": "assistant", "text": "Tell me about your background."},
                                          {"role": "candidate", "text": "so, um, I started in QA"}]}"#
                    .to_string())
            });

        let outcome = client(mock)
            .analyze(&AudioRef::webm("https://cdn/a.webm"), &history())
            .await;
        assert!(!outcome.degraded);
        assert_eq!(outcome.score, 64);
        assert_eq!(outcome.transcript[1].text, "so, um, I started in QA");
    }

    #[tokio::test]
    async fn network_failure_degrades_to_zero_score() {
        let mut mock = MockGenerativeClient::new();
        mock.expect_generate()
            .returning(|_, _| Err(anyhow::anyhow!("connection refused")));

        let outcome = client(mock)
            .analyze(&AudioRef::webm("https://cdn/a.webm"), &history())
            .await;
        assert!(outcome.degraded);
        assert_eq!(outcome.score, 0);
        assert!(outcome.feedback.contains("connection refused"));
        assert_eq!(outcome.transcript[1].text, "[Transcription Failed]");
        let payload = outcome.payload.unwrap();
        assert!(payload.strengths.is_empty() && payload.improvements.is_empty());
    }

    #[tokio::test]
    async fn unparseable_response_degrades() {
        let mut mock = MockGenerativeClient::new();
        mock.expect_generate()
            .returning(|_, _| Ok("Sorry, something went wrong.".to_string()));

        let outcome = client(mock)
            .analyze(&AudioRef::webm("https://cdn/a.webm"), &history())
            .await;
        assert!(outcome.degraded);
        assert_eq!(outcome.feedback, "Analysis Failed: Invalid response format from AI");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_model_times_out_and_degrades() {
        let config = AnalysisConfig {
            timeout: Duration::from_secs(5),
            ..AnalysisConfig::default()
        };
        let analysis = AnalysisClient::new(Arc::new(StalledClient), config);

        let outcome = analysis
            .analyze(&AudioRef::webm("https://cdn/a.webm"), &history())
            .await;
        assert!(outcome.degraded);
        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.feedback, "Analysis Failed: analysis timed out");
        assert_eq!(outcome.transcript[1].text, "[Transcription Failed]");
    }
}
