//! Deepfake analysis MCP server: entry point.

use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use deepfake_analysis::{CancellationToken, SessionClient};
use deepfake_analysis_mcp::config::{resolve_client_config, ConfigOverrides};
use deepfake_analysis_mcp::protocol::ProtocolHandler;
use deepfake_analysis_mcp::tools::ToolRegistry;
use deepfake_analysis_mcp::transport::StdioTransport;

#[derive(Parser)]
#[command(
    name = "deepfake-analysis-mcp",
    about = "MCP server exposing remote deepfake image analysis as tools",
    version
)]
struct Cli {
    #[command(flatten)]
    service: ServiceArgs,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct ServiceArgs {
    /// Base URL of the analysis service.
    /// Also reads from DEEPFAKE_API_URL env var.
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// API key sent as a bearer token.
    /// Also reads from DEEPFAKE_API_KEY env var.
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Milliseconds between status queries.
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// Status queries allowed before an analysis times out.
    #[arg(long, global = true)]
    max_poll_attempts: Option<u32>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
}

impl From<ServiceArgs> for ConfigOverrides {
    fn from(args: ServiceArgs) -> Self {
        ConfigOverrides {
            api_url: args.api_url,
            api_key: args.api_key,
            poll_interval_ms: args.poll_interval_ms,
            max_poll_attempts: args.max_poll_attempts,
            timeout_secs: args.timeout_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server over stdio (default).
    Serve,

    /// Print server capabilities as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   deepfake-analysis-mcp completions bash > ~/.local/share/bash-completion/completions/deepfake-analysis-mcp
    ///   deepfake-analysis-mcp completions zsh > ~/.zfunc/_deepfake-analysis-mcp
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let config = resolve_client_config(cli.service.into());
            tracing::info!("Deepfake analysis MCP server");
            tracing::info!(
                "Service: {} (poll every {:?}, up to {} attempts)",
                config.base_url,
                config.poll_interval,
                config.max_poll_attempts
            );

            let client = Arc::new(SessionClient::new(Arc::new(config))?);
            let shutdown = CancellationToken::new();

            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, cancelling in-flight analyses");
                    signal_token.cancel();
                }
            });

            let handler = ProtocolHandler::new(client, shutdown);
            let transport = StdioTransport::new(handler);
            transport.run().await?;
        }

        Commands::Info => {
            let capabilities = deepfake_analysis_mcp::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(
                shell,
                &mut cmd,
                "deepfake-analysis-mcp",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}
