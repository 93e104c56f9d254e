//! Error types and JSON-RPC error codes for the MCP server.

use deepfake_analysis::DeepfakeError;

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP and analysis-specific error codes.
pub mod mcp_error_codes {
    pub const REQUEST_CANCELLED: i32 = -32800;
    pub const TOOL_NOT_FOUND: i32 = -32803;
    pub const FACE_NOT_FOUND: i32 = -32850;
    pub const SESSION_NOT_FOUND: i32 = -32851;
    pub const UPLOAD_FAILED: i32 = -32860;
    pub const POLL_TIMEOUT: i32 = -32861;
    pub const ANALYSIS_INCOMPLETE: i32 = -32862;
    pub const REMOTE_ERROR: i32 = -32863;
}

/// All errors that can occur in the MCP server.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error(transparent)]
    Analysis(DeepfakeError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) => INTERNAL_ERROR,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::Analysis(e) => match e {
                DeepfakeError::Validation(_) => INVALID_PARAMS,
                DeepfakeError::Cancelled => REQUEST_CANCELLED,
                DeepfakeError::SessionNotFound(_) => SESSION_NOT_FOUND,
                DeepfakeError::FaceNotFound { .. } => FACE_NOT_FOUND,
                DeepfakeError::Upload(_) => UPLOAD_FAILED,
                DeepfakeError::PollTimeout { .. } => POLL_TIMEOUT,
                DeepfakeError::AnalysisIncomplete { .. } => ANALYSIS_INCOMPLETE,
                DeepfakeError::Transport(_) => REMOTE_ERROR,
            },
            McpError::Transport(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string())
    }
}

impl From<DeepfakeError> for McpError {
    fn from(e: DeepfakeError) -> Self {
        McpError::Analysis(e)
    }
}

pub type McpResult<T> = Result<T, McpError>;
