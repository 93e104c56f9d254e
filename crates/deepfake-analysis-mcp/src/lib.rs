//! Deepfake analysis MCP server: remote deepfake detection exposed as tools.

pub mod config;
pub mod protocol;
pub mod render;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::{resolve_client_config, ConfigOverrides};
pub use protocol::ProtocolHandler;
pub use transport::StdioTransport;
