use anyhow::{Context, Result};
use clap::Parser;

mod config;
mod mcp;
mod oracle;
mod render;
mod repl;
mod utils;

use config::AppConfig;
use mcp::{Channel, TargetSpec};
use oracle::OracleClient;
use render::format::{Role, StyleOptions, box_header, color, emoji};

/// Azure MCP Copilot - interactive terminal assistant for the Azure MCP server.
///
/// Accepts natural-language or raw Azure CLI input, translates it into an
/// Azure CLI command via a local Ollama model (best-effort), dispatches it
/// through the server's `azmcp-extension-az` tool and renders the result
/// as JSON or as a table.
///
/// Configuration (flag > env, `.env` files honored):
///   -s/--server     SERVER_URL     MCP target: SSE URL or local command (required)
///   --api-key       API_KEY        bearer token for the channel handshake
///   --ollama-host   OLLAMA_HOST    Ollama endpoint (default http://localhost:11434)
///   --ollama-model  OLLAMA_MODEL   translation model (default llama3)
///
/// Examples:
///   azmcp-copilot -s https://myserver.example/sse
///   azmcp-copilot -s "azmcp server start --transport stdio" --ollama-model phi3
#[derive(Parser, Debug)]
#[command(
    name = "azmcp-copilot",
    version,
    about = "Azure MCP Copilot - natural language terminal for the Azure MCP server",
    disable_help_subcommand = true
)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all non-error diagnostics
    #[arg(short, long)]
    quiet: bool,

    /// MCP server target (SSE URL or local command). Falls back to SERVER_URL.
    #[arg(short = 's', long = "server", value_name = "TARGET")]
    server: Option<String>,

    /// Bearer token for the server handshake. Falls back to API_KEY.
    #[arg(long = "api-key", value_name = "TOKEN")]
    api_key: Option<String>,

    /// Ollama endpoint base URL. Falls back to OLLAMA_HOST.
    #[arg(long = "ollama-host", value_name = "URL")]
    ollama_host: Option<String>,

    /// Ollama model used for translation. Falls back to OLLAMA_MODEL.
    #[arg(long = "ollama-model", value_name = "MODEL")]
    ollama_model: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::init_logging(utils::derive_level(cli.verbose, cli.quiet));

    // .env before env resolution; absence is fine.
    dotenvy::dotenv().ok();

    let config = match AppConfig::resolve(
        cli.server,
        cli.api_key,
        cli.ollama_host,
        cli.ollama_model,
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            std::process::exit(2);
        }
    };

    let spec = match mcp::parse_target(&config.server) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Invalid target '{}': {e}", config.server);
            std::process::exit(2);
        }
    };

    let rt = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(run(config, spec))
}

async fn run(config: AppConfig, spec: TargetSpec) -> Result<()> {
    let style = StyleOptions::detect();

    let oracle = OracleClient::new(&config.ollama_host, &config.ollama_model);
    let oracle_available = oracle.probe().await;

    // One connect per process; handshake failure is fatal.
    let channel = Channel::connect(&spec, config.api_key.as_deref())
        .await
        .with_context(|| format!("Failed to connect to MCP server: '{spec}'"))?;

    println!(
        "{}",
        box_header(
            format!("{} Azure MCP Copilot", emoji("cloud", &style)),
            Some(format!("{spec} • {} tools", channel.tool_count())),
            &style
        )
    );
    if !channel.extension_tool_available() {
        println!(
            "{} {}",
            emoji("warn", &style),
            color(
                Role::Warning,
                "'azmcp-extension-az' tool not found. Azure CLI commands may not work.",
                &style
            )
        );
    }
    if oracle_available {
        println!(
            "{} {}",
            emoji("success", &style),
            color(
                Role::Success,
                "Ollama is available for natural language processing",
                &style
            )
        );
        println!("   Using model: {}", oracle.model());
    } else {
        println!(
            "{} {}",
            emoji("warn", &style),
            color(
                Role::Warning,
                "Ollama is not available. Input will be sent to Azure untranslated.",
                &style
            )
        );
    }

    // Teardown is unconditional once connected, whatever the loop did.
    let session = repl::run(&channel, oracle_available.then_some(&oracle), &style).await;
    channel.close().await;
    session
}
