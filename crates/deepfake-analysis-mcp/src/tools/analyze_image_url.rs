//! Tool: analyze_image_url. Analyze an image fetched from a URL.

use serde::Deserialize;
use serde_json::{json, Value};

use deepfake_analysis::{AnalysisRequest, CancellationToken, SessionClient};

use crate::render::{render_analysis, OutputFormat};
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct AnalyzeUrlParams {
    image_url: String,
    #[serde(default)]
    format: OutputFormat,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "analyze_image_url".to_string(),
        description: Some(
            "Download an image from an http(s) URL, submit it for deepfake analysis and wait for the result"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "image_url": { "type": "string", "description": "http or https URL of the image" },
                "format": { "type": "string", "enum": ["text", "json"], "default": "text" }
            },
            "required": ["image_url"]
        }),
    }
}

pub async fn execute(
    args: Value,
    client: &SessionClient,
    cancel: &CancellationToken,
) -> McpResult<ToolCallResult> {
    let params: AnalyzeUrlParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let result = client
        .submit(AnalysisRequest::from_url(params.image_url), cancel)
        .await?;

    Ok(render_analysis(&result, &client.config().base_url, params.format))
}
