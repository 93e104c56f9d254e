//! Tool registration and dispatch.

use serde_json::Value;

use deepfake_analysis::{CancellationToken, SessionClient};

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{analyze_image, analyze_image_url, check_status, get_face_details};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            analyze_image::definition(),
            analyze_image_url::definition(),
            check_status::definition(),
            get_face_details::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        client: &SessionClient,
        cancel: &CancellationToken,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        match name {
            "analyze_image" => analyze_image::execute(args, client, cancel).await,
            "analyze_image_url" => analyze_image_url::execute(args, client, cancel).await,
            "check_status" => check_status::execute(args, client, cancel).await,
            "get_face_details" => get_face_details::execute(args, client, cancel).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}
