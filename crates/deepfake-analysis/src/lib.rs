//! Deepfake analysis session client: upload an image to a remote detection
//! service, poll the asynchronous job, and normalize its result.

pub mod client;
pub mod config;
pub mod normalizer;
pub mod source;
pub mod types;

pub use client::{with_cancel, SessionClient};
pub use config::ClientConfig;
pub use normalizer::{normalize, verdict, PollOutcome, Resolution, Verdict, NO_FACES_MESSAGE};
pub use source::{decode_base64_image, payload_from_bytes};
pub use tokio_util::sync::CancellationToken;
pub use types::*;
