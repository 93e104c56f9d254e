//! Tool: check_status. One status query for an existing session.

use serde::Deserialize;
use serde_json::{json, Value};

use deepfake_analysis::{with_cancel, CancellationToken, SessionClient};

use crate::render::{render_status, OutputFormat};
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct StatusParams {
    session_id: String,
    #[serde(default)]
    format: OutputFormat,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "check_status".to_string(),
        description: Some("Check the current status of an analysis session without waiting".to_string()),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string", "description": "Session id returned by the service" },
                "format": { "type": "string", "enum": ["text", "json"], "default": "text" }
            },
            "required": ["session_id"]
        }),
    }
}

pub async fn execute(
    args: Value,
    client: &SessionClient,
    cancel: &CancellationToken,
) -> McpResult<ToolCallResult> {
    let params: StatusParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let snapshot = with_cancel(cancel, client.fetch_status(&params.session_id)).await?;

    Ok(render_status(&snapshot, &client.config().base_url, params.format))
}
