//! Ollama-backed natural-language translation.
//!
//! One chat round trip per turn: the catalog rides along as system
//! context, the user query as the sole user message. Translation is
//! best-effort and fails open. Whatever goes wrong (endpoint down,
//! non-200, malformed body), the caller gets the original query back,
//! byte for byte. Never fatal, never retried.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{log_debug, log_error};

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Client for the local Ollama endpoint.
pub struct OracleClient {
    host: String,
    model: String,
    http: reqwest::Client,
}

impl OracleClient {
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> Self {
        OracleClient {
            host: host.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Availability check: GET /api/version with a short timeout.
    /// Decides at startup whether translation is attempted at all.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/api/version", self.host);
        match self.http.get(&url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log_debug!("Ollama probe failed: {e}");
                false
            }
        }
    }

    /// Translate a free-form query into an Azure CLI command.
    ///
    /// Guarantee: returns a non-empty string for non-empty input (the
    /// input itself whenever translation cannot improve on it).
    pub async fn translate(&self, query: &str, catalog: &[String]) -> String {
        // Defined empty-catalog case: no hints means no translation,
        // the raw query is dispatched as-is.
        if catalog.is_empty() {
            return query.to_string();
        }

        let system_prompt = build_system_prompt(catalog);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
            stream: false,
        };

        let url = format!("{}/api/chat", self.host);
        let response = match self
            .http
            .post(&url)
            .json(&request)
            .timeout(CHAT_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                log_error!("Failed to reach Ollama at {url}: {e}");
                return query.to_string();
            }
        };

        if !response.status().is_success() {
            log_error!("Ollama API error: {}", response.status());
            return query.to_string();
        }

        match response.json::<ChatResponse>().await {
            Ok(body) => {
                let command = body.message.content.trim().to_string();
                if command.is_empty() {
                    // An empty completion would break the non-empty
                    // output guarantee; treat it as a failed translation.
                    log_error!("Ollama returned an empty completion");
                    return query.to_string();
                }
                log_debug!("Translated '{query}' to '{command}'");
                command
            }
            Err(e) => {
                log_error!("Failed to decode Ollama response: {e}");
                query.to_string()
            }
        }
    }
}

/// Instruction context for one translation round trip. Lists every
/// catalog entry, one per line.
fn build_system_prompt(catalog: &[String]) -> String {
    let command_list = catalog
        .iter()
        .map(|cmd| format!("- {cmd}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an Azure CLI expert. Translate the user's natural language query into the \
         appropriate Azure CLI command based on the available commands.\n\
         \n\
         Available commands:\n\
         {command_list}\n\
         \n\
         Instructions:\n\
         1. Select the most appropriate command from the list above\n\
         2. If the command needs parameters, add them based on the user's query\n\
         3. Respond with ONLY the command, no explanations or additional text\n\
         \n\
         If you're not sure, respond with the closest matching command from the available list."
    )
}
