//! JSON bodies exchanged with the `streamGenerateContent` endpoint.

use serde::{Deserialize, Serialize};
use world_core::{Chunk, GenerationError};

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// A single user turn holding `prompt`.
    pub fn user_text(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: prompt.into(),
                }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
pub struct Part {
    pub text: String,
}

/// One server-sent event's payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<ContentResponse>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentResponse {
    #[serde(default)]
    pub parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
pub struct PartResponse {
    pub text: Option<String>,
    /// Set on reasoning summaries, which are not part of the answer.
    #[serde(default)]
    pub thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorWrapper {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl ErrorBody {
    pub fn describe(&self) -> String {
        let message = self.message.clone().unwrap_or_default();
        match self.status.as_deref() {
            Some(status) if !status.is_empty() => format!("{status}: {message}"),
            _ => message,
        }
    }
}

impl GenerateContentResponse {
    /// The text delta carried by this event, if any.
    pub fn into_chunk(self) -> Result<Option<Chunk>, GenerationError> {
        if let Some(error) = self.error {
            return Err(GenerationError::Api {
                status: error.code.unwrap_or(0),
                message: error.describe(),
            });
        }

        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::Blocked(reason));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Chunk { text }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Option<Chunk>, GenerationError> {
        serde_json::from_str::<GenerateContentResponse>(json)
            .unwrap()
            .into_chunk()
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(GenerateContentRequest::user_text("hi")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]})
        );
    }

    #[test]
    fn test_joins_text_parts_of_first_candidate() {
        let chunk = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello"},{"text":" there"}]}},
                {"content":{"parts":[{"text":"ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk, Some(Chunk::new("Hello there")));
    }

    #[test]
    fn test_skips_thought_parts() {
        let chunk = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"pondering","thought":true},{"text":"Hi"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(chunk, Some(Chunk::new("Hi")));
    }

    #[test]
    fn test_finish_only_event_has_no_chunk() {
        let chunk = parse(r#"{"candidates":[{"finishReason":"STOP"}],"usageMetadata":{"totalTokenCount":12}}"#)
            .unwrap();
        assert_eq!(chunk, None);
    }

    #[test]
    fn test_error_event() {
        let err = parse(r#"{"error":{"code":503,"message":"overloaded","status":"UNAVAILABLE"}}"#)
            .unwrap_err();
        assert_eq!(
            err,
            GenerationError::Api {
                status: 503,
                message: "UNAVAILABLE: overloaded".to_string()
            }
        );
    }

    #[test]
    fn test_blocked_prompt() {
        let err = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap_err();
        assert_eq!(err, GenerationError::Blocked("SAFETY".to_string()));
    }
}
