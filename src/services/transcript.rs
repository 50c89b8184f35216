use std::collections::HashSet;

use crate::config::AnalysisConfig;
use crate::models::interview::{ChatMessage, MessageRole, TranscriptPair};

/// Answer text shown for a question the candidate never replied to.
pub const NO_RESPONSE_RECORDED: &str = "No response recorded.";

/// Opening and closing lines the interviewer speaks that are not questions.
const BOILERPLATE_PREFIXES: &[&str] = &[
    "hello!",
    "welcome",
    "thank you for your time",
    "goodbye",
    "all the best",
    "i will be asking you questions",
];

pub fn is_boilerplate(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    BOILERPLATE_PREFIXES.iter().any(|p| lowered.starts_with(p))
}

fn is_placeholder(text: &str, placeholder: &str) -> bool {
    text.trim().eq_ignore_ascii_case(placeholder.trim())
}

/// Pairs each interviewer question with the candidate turn(s) that follow it.
///
/// Greetings and closings never open a pair, so a reply to them is dropped. A
/// question followed directly by another assistant turn still yields a pair,
/// answered with [`NO_RESPONSE_RECORDED`].
pub fn pair_transcript(messages: &[ChatMessage]) -> Vec<TranscriptPair> {
    let mut pairs = Vec::new();
    let mut open: Option<TranscriptPair> = None;

    for msg in messages {
        match msg.role {
            MessageRole::Assistant => {
                if let Some(pair) = open.take() {
                    pairs.push(close(pair));
                }
                if !is_boilerplate(&msg.text) {
                    open = Some(TranscriptPair {
                        question_text: msg.text.trim().to_string(),
                        answer_text: String::new(),
                    });
                }
            }
            MessageRole::Candidate => {
                if let Some(pair) = open.as_mut() {
                    let text = msg.text.trim();
                    if !text.is_empty() {
                        if !pair.answer_text.is_empty() {
                            pair.answer_text.push(' ');
                        }
                        pair.answer_text.push_str(text);
                    }
                }
            }
        }
    }
    if let Some(pair) = open.take() {
        pairs.push(close(pair));
    }
    pairs
}

fn close(mut pair: TranscriptPair) -> TranscriptPair {
    if pair.answer_text.is_empty() {
        pair.answer_text = NO_RESPONSE_RECORDED.to_string();
    }
    pair
}

/// Lowercased question text with punctuation dropped and whitespace collapsed,
/// so "Why should we hire you?" and "why should we hire you" compare equal.
fn normalize_question(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct CorrectedTurn<'a> {
    /// Normalised interviewer line before this turn; `None` for boilerplate or
    /// a turn that opens the log.
    question: Option<String>,
    text: &'a str,
}

fn corrected_turns(messages: &[ChatMessage]) -> Vec<CorrectedTurn<'_>> {
    let mut last_question = None;
    let mut turns = Vec::new();
    for msg in messages {
        match msg.role {
            MessageRole::Assistant => {
                last_question = (!is_boilerplate(&msg.text)).then(|| normalize_question(&msg.text));
            }
            MessageRole::Candidate => turns.push(CorrectedTurn {
                question: last_question.clone(),
                text: msg.text.as_str(),
            }),
        }
    }
    turns
}

/// Rewrites placeholder candidate turns in `original` with the verbatim text
/// from `corrected`.
///
/// The client log stays authoritative for everything except placeholders. A
/// corrected answer is matched by its normalised question first. Failing that,
/// the next unused corrected turn after the last one taken is accepted, as long
/// as it follows a real question that appears nowhere in `original`; replies to
/// greetings and answers that belong to another question are never borrowed.
/// With no corrected log, or no match, the turn becomes the
/// transcription-failed marker; it is never left as the placeholder.
pub fn reconcile_log(
    original: &[ChatMessage],
    corrected: Option<&[ChatMessage]>,
    config: &AnalysisConfig,
) -> Vec<ChatMessage> {
    let turns = corrected.map(corrected_turns).unwrap_or_default();
    let known: HashSet<String> = original
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .map(|m| normalize_question(&m.text))
        .collect();
    let mut used = vec![false; turns.len()];
    let mut cursor = 0;
    let mut last_question = String::new();

    original
        .iter()
        .map(|msg| match msg.role {
            MessageRole::Assistant => {
                last_question = normalize_question(&msg.text);
                msg.clone()
            }
            MessageRole::Candidate => {
                if !is_placeholder(&msg.text, &config.placeholder_text) {
                    return msg.clone();
                }

                let by_question = (0..turns.len()).find(|&i| {
                    !used[i] && turns[i].question.as_deref() == Some(last_question.as_str())
                });
                let pick = by_question.or_else(|| {
                    (cursor..turns.len()).find(|&i| {
                        !used[i]
                            && turns[i]
                                .question
                                .as_ref()
                                .is_some_and(|q| !known.contains(q))
                    })
                });

                let text = match pick {
                    Some(i) => {
                        used[i] = true;
                        cursor = cursor.max(i + 1);
                        let answer = turns[i].text.trim();
                        if answer.is_empty() {
                            config.no_response_marker.clone()
                        } else if is_placeholder(answer, &config.placeholder_text) {
                            config.transcription_failed_marker.clone()
                        } else {
                            answer.to_string()
                        }
                    }
                    None => config.transcription_failed_marker.clone(),
                };
                ChatMessage::candidate(text)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> Vec<ChatMessage> {
        vec![
            ChatMessage::assistant("Hello! I will guide you through this interview."),
            ChatMessage::candidate("Hi"),
            ChatMessage::assistant("Tell me about your background."),
            ChatMessage::candidate("Response Recorded"),
            ChatMessage::assistant("Why should we hire you?"),
            ChatMessage::candidate("Response Recorded"),
            ChatMessage::assistant("Thank you for your time. Goodbye!"),
        ]
    }

    #[test]
    fn greetings_and_closings_never_become_questions() {
        let pairs = pair_transcript(&log());
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question_text, "Tell me about your background.");
        assert_eq!(pairs[1].answer_text, "Response Recorded");
    }

    #[test]
    fn back_to_back_questions_keep_the_unanswered_one() {
        let msgs = vec![
            ChatMessage::assistant("What is a mutex?"),
            ChatMessage::assistant("What is a semaphore?"),
            ChatMessage::candidate("A counter guarding access."),
        ];
        let pairs = pair_transcript(&msgs);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].answer_text, NO_RESPONSE_RECORDED);
        assert_eq!(pairs[1].answer_text, "A counter guarding access.");
    }

    #[test]
    fn trailing_question_without_answer_is_kept() {
        let msgs = vec![ChatMessage::assistant("Any questions for us?")];
        assert_eq!(pair_transcript(&msgs)[0].answer_text, NO_RESPONSE_RECORDED);
    }

    #[test]
    fn placeholders_take_verbatim_text_matched_by_question() {
        let corrected = vec![
            ChatMessage::assistant("Why should we hire you?"),
            ChatMessage::candidate("um, because I, uh, ship things"),
            ChatMessage::assistant("Tell me about your background."),
            ChatMessage::candidate("I studied physics"),
        ];
        let merged = reconcile_log(&log(), Some(&corrected), &AnalysisConfig::default());

        assert_eq!(merged.len(), log().len());
        assert_eq!(merged[1].text, "Hi");
        assert_eq!(merged[3].text, "I studied physics");
        assert_eq!(merged[5].text, "um, because I, uh, ship things");
    }

    #[test]
    fn missing_or_blank_corrections_are_marked_not_left_as_placeholder() {
        let cfg = AnalysisConfig::default();
        let corrected = vec![
            ChatMessage::assistant("Tell me about your background."),
            ChatMessage::candidate("  "),
        ];
        let merged = reconcile_log(&log(), Some(&corrected), &cfg);
        assert_eq!(merged[3].text, cfg.no_response_marker);
        assert_eq!(merged[5].text, cfg.transcription_failed_marker);
    }

    #[test]
    fn without_corrections_every_placeholder_fails_explicitly() {
        let cfg = AnalysisConfig::default();
        let merged = reconcile_log(&log(), None, &cfg);
        assert!(merged.iter().all(|m| m.text != cfg.placeholder_text));
        assert_eq!(merged[3].text, cfg.transcription_failed_marker);
        assert_eq!(merged[1].text, "Hi");
    }

    #[test]
    fn falls_back_to_position_when_questions_were_reworded() {
        let original = vec![
            ChatMessage::assistant("Describe a challenge."),
            ChatMessage::candidate("Response Recorded"),
        ];
        let corrected = vec![
            ChatMessage::assistant("Describe a difficult challenge."),
            ChatMessage::candidate("the migration, it broke"),
        ];
        let merged = reconcile_log(&original, Some(&corrected), &AnalysisConfig::default());
        assert_eq!(merged[1].text, "the migration, it broke");
    }

    #[test]
    fn dropped_greeting_and_punctuation_do_not_shift_answers() {
        let original = vec![
            ChatMessage::assistant("Hello! Let's begin."),
            ChatMessage::candidate("Hi"),
            ChatMessage::assistant("Tell me about your background."),
            ChatMessage::candidate("Response Recorded"),
            ChatMessage::assistant("Why should we hire you?"),
            ChatMessage::candidate("Response Recorded"),
        ];
        let corrected = vec![
            ChatMessage::assistant("Tell me about your background"),
            ChatMessage::candidate("I studied physics"),
            ChatMessage::assistant("Why should we hire you"),
            ChatMessage::candidate("because I ship"),
        ];
        let merged = reconcile_log(&original, Some(&corrected), &AnalysisConfig::default());
        assert_eq!(merged[1].text, "Hi");
        assert_eq!(merged[3].text, "I studied physics");
        assert_eq!(merged[5].text, "because I ship");
    }

    #[test]
    fn greeting_replies_and_other_answers_are_never_borrowed() {
        let cfg = AnalysisConfig::default();
        let original = vec![
            ChatMessage::assistant("Hello! Let's begin."),
            ChatMessage::candidate("Hi"),
            ChatMessage::assistant("Describe a challenge."),
            ChatMessage::candidate("Response Recorded"),
            ChatMessage::assistant("Why should we hire you?"),
            ChatMessage::candidate("Response Recorded"),
        ];
        let corrected = vec![
            ChatMessage::assistant("Hello! Let's begin."),
            ChatMessage::candidate("Hi there"),
            ChatMessage::assistant("WHY should we hire you"),
            ChatMessage::candidate("because I ship"),
        ];
        let merged = reconcile_log(&original, Some(&corrected), &cfg);
        assert_eq!(merged[3].text, cfg.transcription_failed_marker);
        assert_eq!(merged[5].text, "because I ship");
    }

    #[test]
    fn question_text_is_normalised_before_matching() {
        assert_eq!(
            normalize_question("  Why   should we hire YOU? "),
            normalize_question("why should we hire you")
        );
        assert_ne!(
            normalize_question("Describe a challenge."),
            normalize_question("Describe a difficult challenge.")
        );
    }
}
