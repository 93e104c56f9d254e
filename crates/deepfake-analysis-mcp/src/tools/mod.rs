//! MCP tool implementations.

pub mod analyze_image;
pub mod analyze_image_url;
pub mod check_status;
pub mod get_face_details;
pub mod registry;

pub use registry::ToolRegistry;
