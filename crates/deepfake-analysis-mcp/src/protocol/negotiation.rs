//! `initialize` handshake bookkeeping.

use crate::types::{Implementation, InitializeParams, InitializeResult, MCP_VERSION};

/// What the client told us during the handshake.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub client_info: Option<Implementation>,
    pub initialized: bool,
}

impl Handshake {
    /// Record the client and answer with the server's fixed capabilities.
    /// A differing protocol version is logged, never refused.
    pub fn negotiate(&mut self, params: InitializeParams) -> InitializeResult {
        if params.protocol_version != MCP_VERSION {
            tracing::warn!(
                "Client asked for protocol {}, answering with {MCP_VERSION}",
                params.protocol_version
            );
        }

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );
        self.client_info = Some(params.client_info);

        InitializeResult::default_result()
    }

    pub fn mark_initialized(&mut self) {
        if self.client_info.is_none() {
            tracing::warn!("Received initialized notification before initialize");
        }
        self.initialized = true;
        tracing::info!("MCP handshake complete");
    }
}
