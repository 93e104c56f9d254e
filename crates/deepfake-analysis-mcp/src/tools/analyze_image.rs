//! Tool: analyze_image. Analyze a base64-encoded image.

use serde::Deserialize;
use serde_json::{json, Value};

use deepfake_analysis::{decode_base64_image, AnalysisRequest, CancellationToken, SessionClient};

use crate::render::{render_analysis, OutputFormat};
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct AnalyzeImageParams {
    image_data: String,
    filename: String,
    #[serde(default)]
    format: OutputFormat,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "analyze_image".to_string(),
        description: Some(
            "Upload a base64-encoded image for deepfake analysis and wait for per-face verdicts"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "image_data": {
                    "type": "string",
                    "description": "Base64 image data; a data:image/...;base64, prefix is allowed"
                },
                "filename": {
                    "type": "string",
                    "description": "Original filename, used to derive the content type"
                },
                "format": { "type": "string", "enum": ["text", "json"], "default": "text" }
            },
            "required": ["image_data", "filename"]
        }),
    }
}

pub async fn execute(
    args: Value,
    client: &SessionClient,
    cancel: &CancellationToken,
) -> McpResult<ToolCallResult> {
    let params: AnalyzeImageParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let bytes = decode_base64_image(&params.image_data)?;
    let request = AnalysisRequest::from_bytes(bytes, params.filename);
    let result = client.submit(request, cancel).await?;

    Ok(render_analysis(&result, &client.config().base_url, params.format))
}
