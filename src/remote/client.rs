//! Core `LectureProcessor` trait and `ApiProcessor` implementation.
//!
//! `ApiProcessor` talks to the remote lecture-processing service: one
//! multipart upload per lecture (`/process_lecture`) and one JSON call per
//! chat question (`/chat`).  All connection details come from
//! [`RemoteConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::audio::AudioArtifact;
use crate::config::RemoteConfig;
use crate::workflow::LectureResult;

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status code.  No structured
    /// error body is parsed.
    #[error("service returned status {0}")]
    Status(u16),

    /// The response body could not be decoded as the expected JSON shape.
    /// Decoding is all-or-nothing: a partially valid result is an error.
    #[error("failed to parse service response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_decode() {
            RemoteError::Parse(e.to_string())
        } else {
            RemoteError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// LectureProcessor trait
// ---------------------------------------------------------------------------

/// Async interface to the remote lecture-processing service.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (wrapped in `Arc<dyn LectureProcessor>`).  Both operations map to exactly
/// one success or one failure; no retries are performed here or anywhere
/// above.
#[async_trait]
pub trait LectureProcessor: Send + Sync {
    /// Submit a finalized audio artifact and return the derived study
    /// material.
    async fn submit_lecture(&self, artifact: &AudioArtifact)
        -> Result<LectureResult, RemoteError>;

    /// Ask a question about `transcript` and return the assistant's answer.
    async fn query(&self, transcript: &str, question: &str) -> Result<String, RemoteError>;
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Response body of `/chat`.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    response: String,
}

// ---------------------------------------------------------------------------
// ApiProcessor
// ---------------------------------------------------------------------------

/// HTTP implementation of [`LectureProcessor`] backed by `reqwest`.
///
/// # Timeouts
///
/// The client carries no global timeout: lecture processing legitimately
/// takes as long as the service needs, and the submission resolves only on a
/// response or a transport error.  Chat queries get a per-request timeout
/// from `config.query_timeout_secs`.
pub struct ApiProcessor {
    client: reqwest::Client,
    config: RemoteConfig,
}

impl ApiProcessor {
    /// Build an `ApiProcessor` from application config.
    ///
    /// A default client is used as a last-resort fallback if the builder
    /// fails (should never happen in practice).
    pub fn from_config(config: &RemoteConfig) -> Self {
        let client = reqwest::Client::builder()
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Attach the `Authorization: Bearer …` header only when `api_key` is a
    /// non-empty string — services without authentication need none.
    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let key = self.config.api_key.as_deref().unwrap_or("");
        if key.is_empty() {
            req
        } else {
            req.bearer_auth(key)
        }
    }
}

#[async_trait]
impl LectureProcessor for ApiProcessor {
    /// POST the artifact as a multipart form with a single `file` field.
    async fn submit_lecture(
        &self,
        artifact: &AudioArtifact,
    ) -> Result<LectureResult, RemoteError> {
        let url = format!("{}/process_lecture", self.config.base_url);

        let part = reqwest::multipart::Part::bytes(artifact.bytes.clone())
            .file_name(artifact.file_name.clone())
            .mime_str(&artifact.media_type)
            .map_err(|e| RemoteError::Request(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        log::info!(
            "submitting {} ({} bytes) to {url}",
            artifact.file_name,
            artifact.bytes.len()
        );

        let response = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let result: LectureResult = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;
        Ok(result)
    }

    /// POST `{transcript, question}` and return the assistant's response
    /// string.
    async fn query(&self, transcript: &str, question: &str) -> Result<String, RemoteError> {
        let url = format!("{}/chat", self.config.base_url);

        let body = serde_json::json!({
            "transcript": transcript,
            "question": question,
        });

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .timeout(std::time::Duration::from_secs(self.config.query_timeout_secs))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;
        Ok(parsed.response)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{Flashcard, QuizQuestion};

    fn make_config(api_key: Option<&str>) -> RemoteConfig {
        RemoteConfig {
            base_url: "http://localhost:8000".into(),
            api_key: api_key.map(|s| s.to_string()),
            query_timeout_secs: 30,
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _processor = ApiProcessor::from_config(&make_config(None));
    }

    #[test]
    fn from_config_accepts_empty_api_key() {
        let _processor = ApiProcessor::from_config(&make_config(Some("")));
    }

    #[test]
    fn from_config_accepts_real_api_key() {
        let _processor = ApiProcessor::from_config(&make_config(Some("sk-test-1234")));
    }

    /// Verify that `ApiProcessor` is object-safe (usable as
    /// `dyn LectureProcessor`).
    #[test]
    fn processor_is_object_safe() {
        let processor: Box<dyn LectureProcessor> =
            Box::new(ApiProcessor::from_config(&make_config(None)));
        drop(processor);
    }

    // ---- Wire shapes -------------------------------------------------------

    #[test]
    fn lecture_result_decodes_from_service_json() {
        let json = r#"{
            "transcript": "t",
            "summary": ["a", "b"],
            "flashcards": [{"q": "Q1", "a": "A1"}],
            "quiz": [{"question": "Q", "options": ["1", "2", "3", "4"], "answer": 0}]
        }"#;

        let result: LectureResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.transcript, "t");
        assert_eq!(result.summary, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            result.flashcards,
            vec![Flashcard {
                q: "Q1".into(),
                a: "A1".into()
            }]
        );
        assert_eq!(
            result.quiz,
            vec![QuizQuestion {
                question: "Q".into(),
                options: ["1".into(), "2".into(), "3".into(), "4".into()],
                answer: 0,
            }]
        );
    }

    /// A quiz question with the wrong number of options must fail the whole
    /// decode — partial results are never accepted.
    #[test]
    fn short_options_array_rejects_the_whole_response() {
        let json = r#"{
            "transcript": "t",
            "summary": [],
            "flashcards": [],
            "quiz": [{"question": "Q", "options": ["1", "2"], "answer": 0}]
        }"#;

        assert!(serde_json::from_str::<LectureResult>(json).is_err());
    }

    #[test]
    fn missing_field_rejects_the_whole_response() {
        let json = r#"{
            "transcript": "t",
            "summary": [],
            "flashcards": []
        }"#;

        assert!(serde_json::from_str::<LectureResult>(json).is_err());
    }

    #[test]
    fn query_response_decodes() {
        let parsed: QueryResponse =
            serde_json::from_str(r#"{"response": "an answer"}"#).unwrap();
        assert_eq!(parsed.response, "an answer");
    }
}
