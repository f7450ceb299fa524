//! Channel to the Azure MCP server.
//!
//! parse_target -> TargetSpec { LocalCommand | RemoteUrl }
//! Channel: connect once per process (SSE for remote URLs, child process
//! for local commands), build the command catalog from the tool listing,
//! dispatch commands through the fixed extension tool, tear down on exit.

pub mod outcome;

use anyhow::{Context, Result, bail};
use rmcp::ServiceExt;
use rmcp::model::CallToolRequestParam;
use rmcp::service::{RoleClient, RunningService};
use rmcp::transport::sse_client::{SseClientConfig, SseClientTransport};
use rmcp::transport::{ConfigureCommandExt, TokioChildProcess};
use serde_json::Value;
use shell_words::split as shell_split;
use std::collections::HashSet;
use std::fmt;
use tokio::process::Command;
use url::Url;

use crate::{log_debug, log_error, log_info};
use outcome::{CommandOutcome, classify_reply};

/// The single remote operation every command is dispatched through.
pub const EXTENSION_TOOL: &str = "azmcp-extension-az";

/// Prefix the Azure MCP server puts on every advertised tool name.
const TOOL_NAME_PREFIX: &str = "azmcp-";

/// A parsed representation of a user-supplied target string:
/// either a remote SSE URL or a local command invocation.
#[derive(Debug, Clone)]
pub enum TargetSpec {
    /// A local MCP server process to be spawned. Command + arguments.
    LocalCommand { program: String, args: Vec<String> },
    /// Remote SSE endpoint (http/https).
    RemoteUrl { url: Url },
}

impl TargetSpec {
    pub fn is_remote(&self) -> bool {
        matches!(self, TargetSpec::RemoteUrl { .. })
    }

    pub fn is_local(&self) -> bool {
        matches!(self, TargetSpec::LocalCommand { .. })
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::LocalCommand { program, args, .. } => {
                if args.is_empty() {
                    write!(f, "local: {}", program)
                } else {
                    write!(f, "local: {} {}", program, args.join(" "))
                }
            }
            TargetSpec::RemoteUrl { url, .. } => write!(f, "remote: {}", url),
        }
    }
}

/// Attempt to parse a server target into a structured `TargetSpec`.
///
/// Parsing strategy:
/// 1. Try as URL. http/https -> remote SSE endpoint; ws/wss rejected
///    (no websocket transport here).
/// 2. Otherwise treat as a local command line, split with shell rules.
/// 3. Reject empty input and empty command tokens.
pub fn parse_target(raw: &str) -> Result<TargetSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Target string is empty");
    }

    if let Ok(url) = Url::parse(trimmed) {
        match url.scheme() {
            "http" | "https" => {
                return Ok(TargetSpec::RemoteUrl { url });
            }
            "ws" | "wss" => bail!("websocket targets are not supported (use http/https SSE)"),
            _ => {
                // Non-MCP scheme; fall through to command parsing.
            }
        }
    }

    let parts =
        shell_split(trimmed).context("Failed to parse local command line (shell splitting)")?;
    if parts.is_empty() {
        bail!("No tokens produced when parsing local command target");
    }
    let program = parts[0].clone();
    if program.is_empty() {
        bail!("Empty program name in local command target");
    }
    let args = parts[1..].to_vec();
    Ok(TargetSpec::LocalCommand { program, args })
}

/// Normalize one advertised tool name into a catalog entry:
/// strip the server prefix, separators become spaces.
/// "azmcp-group-list" -> "group list".
pub fn normalize_tool_name(name: &str) -> String {
    name.strip_prefix(TOOL_NAME_PREFIX)
        .unwrap_or(name)
        .replace(['-', '_'], " ")
        .trim()
        .to_string()
}

/// Build the translation catalog from raw tool names: normalize,
/// deduplicate, sort for a stable prompt.
pub fn build_catalog<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut catalog: Vec<String> = names
        .into_iter()
        .map(normalize_tool_name)
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect();
    catalog.sort();
    catalog
}

/// An established connection to the Azure MCP server.
///
/// Opened exactly once at startup; the single shared resource of the
/// session loop. Access is strictly single-threaded, one turn at a time.
pub struct Channel {
    service: RunningService<RoleClient, ()>,
    catalog: Vec<String>,
    tool_count: usize,
    extension_tool_available: bool,
}

impl Channel {
    /// Establish the channel and enumerate tools once.
    ///
    /// A handshake failure is fatal to the caller; a failed tool listing
    /// is not (the session continues with an empty catalog).
    pub async fn connect(spec: &TargetSpec, api_key: Option<&str>) -> Result<Self> {
        let service = match spec {
            TargetSpec::RemoteUrl { url, .. } => {
                log_info!("Connecting to Azure MCP server: {url}");
                let mut headers = reqwest::header::HeaderMap::new();
                if let Some(token) = api_key {
                    let mut value =
                        reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                            .context("API key is not a valid header value")?;
                    value.set_sensitive(true);
                    headers.insert(reqwest::header::AUTHORIZATION, value);
                }
                let http = reqwest::Client::builder()
                    .default_headers(headers)
                    .build()
                    .context("Failed to build HTTP client for SSE transport")?;
                let transport = SseClientTransport::start_with_client(
                    http,
                    SseClientConfig {
                        sse_endpoint: url.as_str().to_string().into(),
                        ..Default::default()
                    },
                )
                .await
                .with_context(|| format!("Failed to open SSE stream to '{url}'"))?;
                ()
                    .serve(transport)
                    .await
                    .with_context(|| format!("MCP handshake failed for '{spec}'"))?
            }
            TargetSpec::LocalCommand { program, args, .. } => {
                log_info!("Spawning local Azure MCP server: {program}");
                ()
                    .serve(TokioChildProcess::new(Command::new(program).configure(
                        |c| {
                            for a in args {
                                c.arg(a);
                            }
                            // Silence child stderr (banners/log noise),
                            // stdout carries the protocol.
                            c.stderr(std::process::Stdio::null());
                        },
                    ))?)
                    .await
                    .with_context(|| {
                        format!("Failed to spawn & initialize local MCP service: '{spec}'")
                    })?
            }
        };

        let (catalog, tool_count, extension_tool_available) =
            match service.list_tools(Default::default()).await {
                Ok(listing) => {
                    let names: Vec<String> =
                        listing.tools.iter().map(|t| t.name.to_string()).collect();
                    let available = names.iter().any(|n| n == EXTENSION_TOOL);
                    let catalog = build_catalog(names.iter().map(|s| s.as_str()));
                    log_info!("Connected with {} tools", names.len());
                    (catalog, names.len(), available)
                }
                Err(e) => {
                    // Non-fatal: the session runs with no translation hints.
                    log_error!("Failed to list tools: {e}");
                    (Vec::new(), 0, false)
                }
            };

        Ok(Channel {
            service,
            catalog,
            tool_count,
            extension_tool_available,
        })
    }

    /// Normalized operation names advertised by the server. Used only as
    /// translation context, never validated against.
    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    pub fn tool_count(&self) -> usize {
        self.tool_count
    }

    pub fn extension_tool_available(&self) -> bool {
        self.extension_tool_available
    }

    /// Dispatch one command through the extension tool and classify the
    /// reply. Invocation failures are folded into `CommandOutcome::Error`
    /// rather than propagated; the session loop must keep running.
    pub async fn execute(&self, command: &str) -> CommandOutcome {
        let mut arguments = serde_json::Map::new();
        arguments.insert("command".to_string(), Value::String(command.to_string()));

        match self
            .service
            .call_tool(CallToolRequestParam {
                name: EXTENSION_TOOL.into(),
                arguments: Some(arguments),
            })
            .await
        {
            Ok(result) => {
                let reply = serde_json::to_value(&result).unwrap_or(Value::Null);
                log_debug!("Raw tool reply: {reply}");
                classify_reply(&reply)
            }
            Err(e) => CommandOutcome::Error(format!("Command execution failed: {e}")),
        }
    }

    /// Tear down the channel. Invoked on every exit path once connected.
    pub async fn close(self) {
        let _ = self.service.cancel().await;
        log_info!("Channel closed");
    }
}
