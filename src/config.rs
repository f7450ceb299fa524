//! Environment-sourced configuration.
//!
//! Precedence per item: CLI flag > env var > default. The MCP server
//! target is the only required item; everything else has a usable
//! default. `.env` files are honored via dotenvy before resolution.

use anyhow::{Result, bail};

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// MCP target: remote SSE URL or local command line.
    pub server: String,
    /// Optional bearer token forwarded on the channel handshake.
    pub api_key: Option<String>,
    /// Ollama endpoint base URL (no trailing slash expected).
    pub ollama_host: String,
    /// Ollama model identifier used for translation.
    pub ollama_model: String,
}

impl AppConfig {
    /// Resolve config from CLI-provided values, falling back to the
    /// process environment (`SERVER_URL`, `API_KEY`, `OLLAMA_HOST`,
    /// `OLLAMA_MODEL`).
    pub fn resolve(
        server: Option<String>,
        api_key: Option<String>,
        ollama_host: Option<String>,
        ollama_model: Option<String>,
    ) -> Result<Self> {
        Self::from_parts(
            server.or_else(|| env_nonblank("SERVER_URL")),
            api_key.or_else(|| env_nonblank("API_KEY")),
            ollama_host.or_else(|| env_nonblank("OLLAMA_HOST")),
            ollama_model.or_else(|| env_nonblank("OLLAMA_MODEL")),
        )
    }

    /// Pure assembly step: applies defaults and rejects a missing server
    /// target. Split out from `resolve` so it can be tested without
    /// touching process env.
    pub fn from_parts(
        server: Option<String>,
        api_key: Option<String>,
        ollama_host: Option<String>,
        ollama_model: Option<String>,
    ) -> Result<Self> {
        let Some(server) = server.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
            bail!("no MCP server target configured (use --server or SERVER_URL)");
        };
        Ok(AppConfig {
            server,
            api_key: api_key.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            ollama_host: ollama_host
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string()),
            ollama_model: ollama_model
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        })
    }
}

fn env_nonblank(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_server_is_fatal() {
        let err = AppConfig::from_parts(None, None, None, None).unwrap_err();
        assert!(err.to_string().contains("SERVER_URL"));
    }

    #[test]
    fn blank_server_is_fatal() {
        assert!(AppConfig::from_parts(Some("   ".into()), None, None, None).is_err());
    }

    #[test]
    fn defaults_applied() {
        let cfg =
            AppConfig::from_parts(Some("https://mcp.example/sse".into()), None, None, None)
                .unwrap();
        assert_eq!(cfg.ollama_host, DEFAULT_OLLAMA_HOST);
        assert_eq!(cfg.ollama_model, DEFAULT_OLLAMA_MODEL);
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn explicit_values_win_and_host_is_normalized() {
        let cfg = AppConfig::from_parts(
            Some("https://mcp.example/sse".into()),
            Some("tok".into()),
            Some("http://127.0.0.1:11434/".into()),
            Some("phi3".into()),
        )
        .unwrap();
        assert_eq!(cfg.api_key.as_deref(), Some("tok"));
        assert_eq!(cfg.ollama_host, "http://127.0.0.1:11434");
        assert_eq!(cfg.ollama_model, "phi3");
    }
}
