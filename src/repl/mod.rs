//! Interactive session loop.
//!
//! One turn at a time: read input, translate (best-effort), dispatch,
//! render, prompt again. Per-turn failures are rendered and the loop
//! keeps going; only startup errors terminate the process. The caller
//! owns the channel lifecycle (connect before, teardown after).

use anyhow::Result;
use std::io::{self, BufRead, Write};

use crate::mcp::Channel;
use crate::oracle::OracleClient;
use crate::render;
use crate::render::format::{Role, StyleOptions, color, emoji};

/// Per-turn pipeline state, immutable once built.
///
/// `table_requested` is computed from the original query before
/// translation and never recomputed; the translated command must not
/// influence presentation intent.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub original_query: String,
    pub azure_command: String,
    pub table_requested: bool,
}

impl CommandRequest {
    pub fn new(original_query: &str, azure_command: String) -> Self {
        CommandRequest {
            table_requested: render::wants_table(original_query),
            original_query: original_query.to_string(),
            azure_command,
        }
    }
}

/// Case-insensitive loop terminators.
fn is_exit_token(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "exit" | "quit" | "q"
    )
}

fn print_turn_hint(oracle_available: bool, style: &StyleOptions) {
    println!();
    println!("{}", color(Role::Dim, "=".repeat(50), style));
    if oracle_available {
        println!("Enter your Azure request in natural language (or 'exit' to quit)");
        println!(
            "{}",
            color(
                Role::Dim,
                "Example: 'list my resource groups' or 'show my storage accounts as table'",
                style
            )
        );
    } else {
        println!("Enter Azure CLI command (or 'exit' to quit)");
        println!(
            "{}",
            color(
                Role::Dim,
                "Example: 'group list' or 'storage account list'",
                style
            )
        );
    }
}

/// Run the loop until exit or EOF. The oracle is `None` when the version
/// probe failed at startup; input then goes to the server untranslated.
pub async fn run(
    channel: &Channel,
    oracle: Option<&OracleClient>,
    style: &StyleOptions,
) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print_turn_hint(oracle.is_some(), style);
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break; // EOF
        };
        let line = line?;
        let input = line.trim();

        if input.is_empty() {
            continue;
        }
        if is_exit_token(input) {
            break;
        }

        let outcome = run_turn(channel, oracle, input, style).await;
        println!();
        println!("{} Response:", emoji("spark", style));
        println!("{outcome}");
    }

    Ok(())
}

/// One full pipeline pass: classify intent, translate, dispatch, render.
/// Always returns something printable; nothing per-turn escapes as Err.
async fn run_turn(
    channel: &Channel,
    oracle: Option<&OracleClient>,
    input: &str,
    style: &StyleOptions,
) -> String {
    println!("Processing: {input}");

    let azure_command = match oracle {
        Some(oracle) => oracle.translate(input, channel.catalog()).await,
        None => input.to_string(),
    };
    if azure_command != input {
        println!(
            "Translated to: {}",
            color(Role::Accent, &azure_command, style)
        );
    }

    let request = CommandRequest::new(input, azure_command);
    let outcome = channel.execute(&request.azure_command).await;
    render::render_outcome(&outcome, &request, style)
}
