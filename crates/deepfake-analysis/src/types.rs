//! Core data types for analysis sessions, results, and errors.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where the image to analyze comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    /// Raw image bytes supplied by the caller.
    Bytes { data: Vec<u8>, filename: String },
    /// An image reachable over HTTP(S); downloaded before upload.
    Url { url: String },
}

impl AnalysisRequest {
    pub fn from_bytes(data: Vec<u8>, filename: impl Into<String>) -> Self {
        AnalysisRequest::Bytes {
            data,
            filename: filename.into(),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        AnalysisRequest::Url { url: url.into() }
    }
}

/// A resolved image ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// One remote analysis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Status reported by the remote service for a session.
///
/// The set is open: anything unrecognized is kept verbatim in `Other` and
/// treated as still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SessionStatus {
    Pending,
    Processing,
    InProgress,
    Queued,
    NoFacesFound,
    Done,
    Completed,
    Error,
    Failed,
    Other(String),
}

impl SessionStatus {
    pub fn parse(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match key.as_str() {
            "pending" => SessionStatus::Pending,
            "processing" => SessionStatus::Processing,
            "in_progress" | "inprogress" => SessionStatus::InProgress,
            "queued" => SessionStatus::Queued,
            "no_faces_found" | "no_faces" | "no_face_found" | "no_faces_detected" => {
                SessionStatus::NoFacesFound
            }
            "done" => SessionStatus::Done,
            "completed" => SessionStatus::Completed,
            "error" => SessionStatus::Error,
            "failed" => SessionStatus::Failed,
            _ => SessionStatus::Other(raw.trim().to_string()),
        }
    }

    /// Wire spelling of the status.
    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Processing => "processing",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Queued => "queued",
            SessionStatus::NoFacesFound => "no_faces_found",
            SessionStatus::Done => "done",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
            SessionStatus::Failed => "failed",
            SessionStatus::Other(raw) => raw.as_str(),
        }
    }

    /// Whether polling must stop once this status is observed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::NoFacesFound
                | SessionStatus::Done
                | SessionStatus::Completed
                | SessionStatus::Error
                | SessionStatus::Failed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SessionStatus::Done | SessionStatus::Completed)
    }
}

impl From<String> for SessionStatus {
    fn from(raw: String) -> Self {
        SessionStatus::parse(&raw)
    }
}

impl From<SessionStatus> for String {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected face with its scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Ensemble probability that the face is real, in [0, 1].
    pub real_probability: Option<f64>,
    /// Individual sub-model scores keyed by model name.
    pub model_scores: BTreeMap<String, f64>,
    /// Path of the cropped face image, relative to the service base URL.
    pub face_path: Option<String>,
}

impl Face {
    /// Absolute URL of the cropped face image, if the service returned one.
    ///
    /// The service sometimes emits `ai./` inside the path; it is rewritten to
    /// `ai/` before joining.
    pub fn image_url(&self, base_url: &str) -> Option<String> {
        let path = self.face_path.as_deref()?.trim();
        if path.is_empty() {
            return None;
        }
        let path = path.replace("ai./", "ai/");
        Some(format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

/// The final outcome of one analysis session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub faces: Vec<Face>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_faces: Option<u32>,
}

impl AnalysisResult {
    /// Number of faces, preferring the service's own count.
    pub fn face_count(&self) -> usize {
        self.total_faces
            .map(|n| n as usize)
            .unwrap_or(self.faces.len())
    }
}

/// A single observation of a session's status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
}

// ─── wire payloads ───

/// Body returned by `POST /api/upload`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub uuid: Option<String>,
}

/// Body returned by `GET /api/{uuid}/status`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StatusResponse {
    pub status: String,
    #[serde(default)]
    pub result: Option<ResultPayload>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body returned by `GET /api/{uuid}`, also embedded in status responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResultPayload {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub faces: Option<Vec<FacePayload>>,
    #[serde(default)]
    pub total_faces: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FacePayload {
    #[serde(default)]
    pub ansamble: Option<f64>,
    #[serde(default)]
    pub face_path: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl FacePayload {
    pub(crate) fn into_face(self) -> Face {
        let model_scores = self
            .extra
            .into_iter()
            .filter(|(key, _)| key.starts_with("is_real_model"))
            .filter_map(|(key, value)| value.as_f64().map(|score| (key, score)))
            .collect();

        Face {
            real_probability: self.ansamble,
            model_scores,
            face_path: self.face_path,
        }
    }
}

impl ResultPayload {
    /// Convert into an [`AnalysisResult`], falling back to the given session
    /// id and status when the payload omits them.
    pub(crate) fn into_result(self, session_id: &str, fallback: &SessionStatus) -> AnalysisResult {
        AnalysisResult {
            session_id: self.uuid.unwrap_or_else(|| session_id.to_string()),
            sha256: self.sha256,
            status: self
                .status
                .map(SessionStatus::from)
                .unwrap_or_else(|| fallback.clone()),
            message: self.message,
            faces: self
                .faces
                .unwrap_or_default()
                .into_iter()
                .map(FacePayload::into_face)
                .collect(),
            total_faces: self.total_faces,
        }
    }
}

/// Errors that can occur while driving an analysis session.
#[derive(thiserror::Error, Debug)]
pub enum DeepfakeError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Analysis of session {session_id} did not finish after {attempts} poll attempts")]
    PollTimeout { session_id: String, attempts: u32 },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Face {index} not found in session {session_id} ({available} faces available)")]
    FaceNotFound {
        session_id: String,
        index: usize,
        available: usize,
    },

    #[error("Analysis of session {session_id} ended with status '{status}'{}", detail_suffix(.message))]
    AnalysisIncomplete {
        session_id: String,
        status: String,
        message: Option<String>,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request cancelled")]
    Cancelled,
}

fn detail_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl DeepfakeError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DeepfakeError::SessionNotFound(_) | DeepfakeError::FaceNotFound { .. }
        )
    }
}

impl From<reqwest::Error> for DeepfakeError {
    fn from(e: reqwest::Error) -> Self {
        DeepfakeError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for DeepfakeError {
    fn from(e: serde_json::Error) -> Self {
        DeepfakeError::Transport(format!("Invalid response body: {e}"))
    }
}

/// Convenience result type.
pub type DeepfakeResult<T> = Result<T, DeepfakeError>;
