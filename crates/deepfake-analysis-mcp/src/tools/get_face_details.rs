//! Tool: get_face_details. Scores for one face of a finished session.

use serde::Deserialize;
use serde_json::{json, Value};

use deepfake_analysis::{with_cancel, CancellationToken, SessionClient};

use crate::render::{render_face, OutputFormat};
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct FaceParams {
    session_id: String,
    face_index: usize,
    #[serde(default)]
    format: OutputFormat,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "get_face_details".to_string(),
        description: Some(
            "Fetch the result of a session and return the scores of one detected face".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string", "description": "Session id returned by the service" },
                "face_index": { "type": "integer", "minimum": 0, "description": "Zero-based face index" },
                "format": { "type": "string", "enum": ["text", "json"], "default": "text" }
            },
            "required": ["session_id", "face_index"]
        }),
    }
}

pub async fn execute(
    args: Value,
    client: &SessionClient,
    cancel: &CancellationToken,
) -> McpResult<ToolCallResult> {
    let params: FaceParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let face = with_cancel(
        cancel,
        client.fetch_face_detail(&params.session_id, params.face_index),
    )
    .await?;

    Ok(render_face(
        params.session_id.trim(),
        params.face_index,
        &face,
        &client.config().base_url,
        params.format,
    ))
}
