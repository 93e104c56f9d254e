//! Remote analysis service client: upload, poll, and result retrieval.

use std::future::Future;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::normalizer::{normalize, PollOutcome, Resolution};
use crate::source::{filename_from_url, parse_image_url, payload_from_bytes, resolve_content_type};
use crate::types::{
    AnalysisRequest, AnalysisResult, DeepfakeError, DeepfakeResult, Face, ImagePayload,
    ResultPayload, Session, SessionStatus, StatusResponse, StatusSnapshot, UploadResponse,
};

/// Run a future unless the token fires first.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, fut: F) -> DeepfakeResult<T>
where
    F: Future<Output = DeepfakeResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeepfakeError::Cancelled),
        result = fut => result,
    }
}

/// Client for the remote deepfake analysis service.
///
/// Holds no per-session state; one instance can drive any number of
/// concurrent sessions.
pub struct SessionClient {
    http: Client,
    config: Arc<ClientConfig>,
}

impl SessionClient {
    pub fn new(config: Arc<ClientConfig>) -> DeepfakeResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("deepfake-analysis/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeepfakeError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Drive one upload → poll → fetch lifecycle to completion.
    pub async fn submit(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> DeepfakeResult<AnalysisResult> {
        let payload = self.resolve(request, cancel).await?;
        let session = self.upload(payload, cancel).await?;
        let outcome = self.poll(&session.id, cancel).await?;

        match normalize(outcome)? {
            Resolution::Ready(result) => Ok(result),
            Resolution::FetchRequired => {
                tracing::debug!("Session {} finished without embedded result, fetching", session.id);
                with_cancel(cancel, self.fetch_result(&session.id)).await
            }
        }
    }

    /// Turn a request into bytes plus filename and content type.
    pub async fn resolve(
        &self,
        request: AnalysisRequest,
        cancel: &CancellationToken,
    ) -> DeepfakeResult<ImagePayload> {
        match request {
            AnalysisRequest::Bytes { data, filename } => payload_from_bytes(data, &filename),
            AnalysisRequest::Url { url } => with_cancel(cancel, self.download(&url)).await,
        }
    }

    async fn download(&self, raw_url: &str) -> DeepfakeResult<ImagePayload> {
        let url = parse_image_url(raw_url)?;
        tracing::debug!("Downloading image from {url}");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = remote_message(response).await;
            return Err(DeepfakeError::Transport(format!(
                "Image download from {url} returned {status}: {message}"
            )));
        }

        let header = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(DeepfakeError::Validation(format!(
                "Image at {url} is empty"
            )));
        }

        let filename = filename_from_url(&url, header.as_deref());
        let content_type = resolve_content_type(header.as_deref(), &filename);
        Ok(ImagePayload {
            bytes,
            filename,
            content_type,
        })
    }

    /// Upload an image and open a session.
    pub async fn upload(
        &self,
        payload: ImagePayload,
        cancel: &CancellationToken,
    ) -> DeepfakeResult<Session> {
        with_cancel(cancel, self.upload_inner(payload)).await
    }

    async fn upload_inner(&self, payload: ImagePayload) -> DeepfakeResult<Session> {
        let url = self.config.endpoint("/api/upload");
        let size = payload.bytes.len();

        let part = Part::bytes(payload.bytes)
            .file_name(payload.filename.clone())
            .mime_str(&payload.content_type)
            .map_err(|e| {
                DeepfakeError::Validation(format!(
                    "Invalid content type '{}': {e}",
                    payload.content_type
                ))
            })?;
        let form = Form::new().part("file", part);

        tracing::info!("Uploading {} ({size} bytes) to {url}", payload.filename);

        let response = self
            .authorized(self.http.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| DeepfakeError::Upload(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = remote_message(response).await;
            return Err(DeepfakeError::Upload(format!(
                "Service returned {status}: {message}"
            )));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| DeepfakeError::Upload(format!("Invalid upload response: {e}")))?;

        let id = body
            .uuid
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                DeepfakeError::Upload("Response did not include a session id".to_string())
            })?;

        tracing::info!("Upload accepted, session {id}");
        Ok(Session::new(id))
    }

    /// Query status until it turns terminal or attempts run out.
    pub async fn poll(
        &self,
        session_id: &str,
        cancel: &CancellationToken,
    ) -> DeepfakeResult<PollOutcome> {
        let max_attempts = self.config.max_poll_attempts;
        let mut captured = None;
        let mut attempts = 0u32;
        let mut snapshot = with_cancel(cancel, self.fetch_status(session_id)).await?;

        loop {
            let latest = snapshot.result.take();

            if snapshot.status.is_terminal() {
                tracing::info!(
                    "Session {session_id} reached status '{}' after {attempts} poll attempts",
                    snapshot.status
                );
                let embedded_is_final = latest.is_some();
                return Ok(PollOutcome {
                    session_id: session_id.to_string(),
                    status: snapshot.status,
                    message: snapshot.message,
                    embedded: latest.or(captured),
                    embedded_is_final,
                    attempts,
                });
            }

            if latest.is_some() {
                captured = latest;
            }

            if attempts >= max_attempts {
                tracing::warn!(
                    "Session {session_id} still '{}' after {attempts} poll attempts, giving up",
                    snapshot.status
                );
                return Err(DeepfakeError::PollTimeout {
                    session_id: session_id.to_string(),
                    attempts,
                });
            }

            tracing::debug!(
                "Session {session_id} is '{}', waiting {:?} (attempt {}/{max_attempts})",
                snapshot.status,
                self.config.poll_interval,
                attempts + 1
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!("Polling of session {session_id} cancelled");
                    return Err(DeepfakeError::Cancelled);
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            attempts += 1;
            snapshot = with_cancel(cancel, self.fetch_status(session_id)).await?;
        }
    }

    /// One status query, no polling.
    pub async fn fetch_status(&self, session_id: &str) -> DeepfakeResult<StatusSnapshot> {
        let session_id = check_session_id(session_id)?;
        let url = self.config.endpoint(&format!("/api/{session_id}/status"));

        let response = self.authorized(self.http.get(&url)).send().await?;
        let body: StatusResponse = read_json(response, session_id).await?;

        let status = SessionStatus::from(body.status);
        let result = body
            .result
            .map(|payload| payload.into_result(session_id, &status));

        Ok(StatusSnapshot {
            session_id: session_id.to_string(),
            status,
            message: body.message,
            result,
        })
    }

    /// Fetch the full result of a session.
    pub async fn fetch_result(&self, session_id: &str) -> DeepfakeResult<AnalysisResult> {
        let session_id = check_session_id(session_id)?;
        let url = self.config.endpoint(&format!("/api/{session_id}"));

        let response = self.authorized(self.http.get(&url)).send().await?;
        let payload: ResultPayload = read_json(response, session_id).await?;
        Ok(payload.into_result(session_id, &SessionStatus::Done))
    }

    /// Fetch a fresh result and return one face from it.
    pub async fn fetch_face_detail(&self, session_id: &str, face_index: usize) -> DeepfakeResult<Face> {
        let result = self.fetch_result(session_id).await?;
        let available = result.faces.len();

        result
            .faces
            .into_iter()
            .nth(face_index)
            .ok_or_else(|| DeepfakeError::FaceNotFound {
                session_id: session_id.trim().to_string(),
                index: face_index,
                available,
            })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

fn check_session_id(session_id: &str) -> DeepfakeResult<&str> {
    let trimmed = session_id.trim();
    if trimmed.is_empty() {
        return Err(DeepfakeError::Validation("Session id is required".to_string()));
    }
    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '%'))
    {
        return Err(DeepfakeError::Validation(format!(
            "Invalid session id: {trimmed}"
        )));
    }
    Ok(trimmed)
}

/// Decode a success body, mapping 404 to a missing session.
async fn read_json<T: serde::de::DeserializeOwned>(
    response: Response,
    session_id: &str,
) -> DeepfakeResult<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(DeepfakeError::SessionNotFound(session_id.to_string()));
    }
    if !status.is_success() {
        let message = remote_message(response).await;
        return Err(DeepfakeError::Transport(format!(
            "Service returned {status}: {message}"
        )));
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// Best-effort error message from a failed response body.
async fn remote_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    let from_json = serde_json::from_str::<Value>(&body).ok().and_then(|value| {
        ["detail", "message", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).map(str::to_string))
    });

    from_json
        .or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("no details").to_string())
}
