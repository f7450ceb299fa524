//! Tagged classification of raw tool replies.
//!
//! The Azure extension tool answers with whatever the underlying CLI
//! produced: a structured value, a JSON string wrapped in a text content
//! item, plain text, or the literal token "null" for empty result sets.
//! All shape probing happens exactly once, here, at the channel boundary;
//! everything downstream matches on `CommandOutcome` exhaustively.

use serde_json::Value;

/// Notice used when a call succeeds but carries no usable payload.
pub const COMPLETION_NOTICE: &str = "Azure command completed but didn't return usable content.";

/// Normalized result of one command dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// JSON-decoded tree (object, array or scalar).
    Structured(Value),
    /// Text payload that failed JSON decoding.
    PlainText(String),
    /// The server's explicit empty-result sentinel (literal "null" text).
    /// Distinct from a decoded empty list, which stays `Structured([])`.
    Empty,
    /// Invocation failure, already reduced to a human-readable message.
    Error(String),
}

/// Classify a serialized `CallToolResult` value.
///
/// Precedence:
/// 1. A direct structured value (`structuredContent`) wins outright.
/// 2. Otherwise the first content item carrying non-empty text decides:
///    the literal "null" is the empty sentinel, valid JSON decodes to
///    `Structured`, anything else stays `PlainText`. Later items are
///    ignored.
/// 3. With no qualifying item, a default completion notice is returned
///    so the caller always has something to show.
pub fn classify_reply(reply: &Value) -> CommandOutcome {
    // Tolerate both key spellings, mirroring how tool schemas show up as
    // either `inputSchema` or `input_schema` depending on the peer.
    if let Some(direct) = reply
        .get("structuredContent")
        .or_else(|| reply.get("structured_content"))
        && !direct.is_null()
    {
        return CommandOutcome::Structured(direct.clone());
    }

    if let Some(items) = reply.get("content").and_then(|v| v.as_array()) {
        for item in items {
            let Some(text) = item.get("text").and_then(|v| v.as_str()) else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            if text == "null" {
                return CommandOutcome::Empty;
            }
            return match serde_json::from_str::<Value>(text) {
                Ok(decoded) => CommandOutcome::Structured(decoded),
                Err(_) => CommandOutcome::PlainText(text.to_string()),
            };
        }
    }

    CommandOutcome::Structured(serde_json::json!({ "message": COMPLETION_NOTICE }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_content_wins() {
        let reply = json!({
            "structuredContent": {"value": [1, 2]},
            "content": [{"type": "text", "text": "null"}]
        });
        assert_eq!(
            classify_reply(&reply),
            CommandOutcome::Structured(json!({"value": [1, 2]}))
        );
    }

    #[test]
    fn null_structured_content_is_skipped() {
        let reply = json!({
            "structuredContent": null,
            "content": [{"type": "text", "text": "hello"}]
        });
        assert_eq!(
            classify_reply(&reply),
            CommandOutcome::PlainText("hello".into())
        );
    }

    #[test]
    fn null_token_is_empty_sentinel() {
        let reply = json!({"content": [{"type": "text", "text": "null"}]});
        assert_eq!(classify_reply(&reply), CommandOutcome::Empty);
    }

    #[test]
    fn null_token_wins_even_with_later_items() {
        let reply = json!({"content": [
            {"type": "text", "text": "null"},
            {"type": "text", "text": "{\"a\":1}"}
        ]});
        assert_eq!(classify_reply(&reply), CommandOutcome::Empty);
    }

    #[test]
    fn first_qualifying_item_decides() {
        let reply = json!({"content": [
            {"type": "image", "data": "zzz"},
            {"type": "text", "text": ""},
            {"type": "text", "text": "[{\"name\":\"rg1\"}]"},
            {"type": "text", "text": "ignored"}
        ]});
        assert_eq!(
            classify_reply(&reply),
            CommandOutcome::Structured(json!([{"name": "rg1"}]))
        );
    }

    #[test]
    fn undecodable_text_stays_plain() {
        let reply = json!({"content": [{"type": "text", "text": "WARNING: not json"}]});
        assert_eq!(
            classify_reply(&reply),
            CommandOutcome::PlainText("WARNING: not json".into())
        );
    }

    #[test]
    fn decoded_empty_list_is_not_the_sentinel() {
        let reply = json!({"content": [{"type": "text", "text": "[]"}]});
        assert_eq!(classify_reply(&reply), CommandOutcome::Structured(json!([])));
    }

    #[test]
    fn no_usable_content_yields_notice() {
        let reply = json!({"content": []});
        match classify_reply(&reply) {
            CommandOutcome::Structured(v) => {
                assert_eq!(v.get("message").and_then(|m| m.as_str()), Some(COMPLETION_NOTICE));
            }
            other => panic!("expected completion notice, got {other:?}"),
        }
    }
}
