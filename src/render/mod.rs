//! Result presentation: raw JSON vs derived tabular view.
//!
//! Whether a turn renders as a table is decided by a phrase heuristic on
//! the user's *original* query, computed once before translation and
//! carried in the `CommandRequest`. The table path first unwraps the
//! envelope shapes Azure responses commonly arrive in (`value` arrays,
//! `output` fields), then tabulates list-of-object payloads with a fixed
//! column priority.

pub mod format;

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::mcp::outcome::CommandOutcome;
use crate::repl::CommandRequest;
use format::{Role, StyleOptions, TableOpts, color, emoji, table, truncate_marked};

/// Columns shown first, in this order, when present (case-insensitive).
const PRIORITY_COLUMNS: [&str; 7] = [
    "name",
    "id",
    "location",
    "resourceGroup",
    "type",
    "status",
    "provisioningState",
];

/// Keys with this prefix are internal bookkeeping, never displayed.
const INTERNAL_KEY_MARKER: char = '_';

/// Hard cap on displayed columns; anything past it is silently dropped.
const MAX_TABLE_COLUMNS: usize = 10;

/// Composite cell budget in list tables (chars kept before the marker).
const LIST_CELL_LIMIT: usize = 50;

/// Composite cell budget in single-resource property tables.
const DETAIL_CELL_LIMIT: usize = 80;

/// Notice for the server's explicit empty sentinel.
const EMPTY_SENTINEL_NOTICE: &str = "No resources found.";

/// Notice for a decoded empty list. Deliberately distinct from the
/// sentinel notice above.
const EMPTY_LIST_NOTICE: &str = "No resources found matching your criteria.";

const TABLE_PHRASES: [&str; 8] = [
    "as table",
    "as a table",
    "in a table",
    "in table",
    "table format",
    "table view",
    "show table",
    "tabular",
];

/// Pure intent classifier: does the original query ask for a table?
pub fn wants_table(query: &str) -> bool {
    let q = query.to_ascii_lowercase();
    TABLE_PHRASES.iter().any(|p| q.contains(p))
}

/// Render one normalized result for display.
pub fn render_outcome(
    outcome: &CommandOutcome,
    request: &CommandRequest,
    style: &StyleOptions,
) -> String {
    match outcome {
        CommandOutcome::Error(msg) => {
            format!("{} {}", emoji("error", style), color(Role::Error, msg, style))
        }
        CommandOutcome::Empty => {
            format!(
                "{} {}",
                emoji("info", style),
                color(Role::Dim, EMPTY_SENTINEL_NOTICE, style)
            )
        }
        CommandOutcome::PlainText(text) => text.clone(),
        CommandOutcome::Structured(value) => {
            if request.table_requested {
                render_table_view(value.clone(), style)
            } else {
                pretty(value)
            }
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Envelope unwrapping result: either a value to tabulate or a raw
/// string to print verbatim (an `output` field that failed decoding).
enum Envelope {
    Value(Value),
    Raw(String),
}

/// Peel the common Azure response envelopes before tabulating:
/// a `value` array replaces its wrapper, an `output` string is decoded
/// (verbatim on failure), a structured `output` is used directly.
fn unwrap_envelope(value: Value) -> Envelope {
    if let Value::Object(ref obj) = value {
        if let Some(arr) = obj.get("value").and_then(|v| v.as_array())
            && !arr.is_empty()
        {
            return Envelope::Value(Value::Array(arr.clone()));
        }
        if let Some(output) = obj.get("output") {
            return match output {
                Value::String(s) => match serde_json::from_str::<Value>(s) {
                    Ok(decoded) => Envelope::Value(decoded),
                    Err(_) => Envelope::Raw(s.clone()),
                },
                other => Envelope::Value(other.clone()),
            };
        }
    }
    Envelope::Value(value)
}

fn render_table_view(value: Value, style: &StyleOptions) -> String {
    let value = match unwrap_envelope(value) {
        Envelope::Raw(raw) => return raw,
        Envelope::Value(v) => v,
    };

    match value {
        Value::String(s) => s,
        Value::Array(items) if items.is_empty() => format!(
            "{} {}",
            emoji("info", style),
            color(Role::Dim, EMPTY_LIST_NOTICE, style)
        ),
        Value::Array(items) => {
            if items.iter().all(|i| i.is_object()) {
                list_table(&items, style)
            } else {
                // No tabular form for scalar/mixed lists.
                pretty(&Value::Array(items))
            }
        }
        Value::Object(map) => property_table(&map, style),
        other => pretty(&other),
    }
}

/// Column set for a list of objects: union of keys in encounter order,
/// internal keys skipped, priority members pulled to the front, capped.
fn ordered_columns(items: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keys: Vec<String> = Vec::new();
    for item in items {
        if let Some(obj) = item.as_object() {
            for key in obj.keys() {
                if key.starts_with(INTERNAL_KEY_MARKER) {
                    continue;
                }
                if seen.insert(key.clone()) {
                    keys.push(key.clone());
                }
            }
        }
    }

    let mut ordered = Vec::with_capacity(keys.len());
    for priority in PRIORITY_COLUMNS {
        if let Some(pos) = keys.iter().position(|k| k.eq_ignore_ascii_case(priority)) {
            ordered.push(keys.remove(pos));
        }
    }
    ordered.extend(keys);
    ordered.truncate(MAX_TABLE_COLUMNS);
    ordered
}

/// Header text for a key: separators to spaces, each word capitalized.
/// "resourceGroup" -> "ResourceGroup", "provisioning_state" -> "Provisioning State".
fn humanize_key(key: &str) -> String {
    key.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One cell: scalars verbatim, nulls blank, composites as their string
/// form cut at `limit` chars with the ellipsis marker.
fn format_cell(value: &Value, limit: usize) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => truncate_marked(&value.to_string(), limit),
    }
}

fn list_table(items: &[Value], style: &StyleOptions) -> String {
    let columns = ordered_columns(items);
    if columns.is_empty() {
        return format!(
            "{} {}",
            emoji("info", style),
            color(Role::Dim, EMPTY_LIST_NOTICE, style)
        );
    }

    let headers: Vec<String> = columns.iter().map(|c| humanize_key(c)).collect();
    let header_refs: Vec<&str> = headers.iter().map(|h| h.as_str()).collect();

    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            let obj = item.as_object();
            columns
                .iter()
                .map(|col| {
                    obj.and_then(|o| o.get(col))
                        .map(|v| format_cell(v, LIST_CELL_LIMIT))
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect();

    let body = table(&header_refs, &rows, TableOpts::default(), style);
    let summary = color(Role::Dim, format!("Total: {} item(s)", items.len()), style);
    format!("{body}\n\n{summary}")
}

/// A single resource renders as a two-column property/value table.
fn property_table(map: &Map<String, Value>, style: &StyleOptions) -> String {
    let rows: Vec<Vec<String>> = map
        .iter()
        .filter(|(key, _)| !key.starts_with(INTERNAL_KEY_MARKER))
        .map(|(key, value)| {
            vec![humanize_key(key), format_cell(value, DETAIL_CELL_LIMIT)]
        })
        .collect();

    if rows.is_empty() {
        return format!(
            "{} {}",
            emoji("info", style),
            color(Role::Dim, EMPTY_LIST_NOTICE, style)
        );
    }

    table(&["Property", "Value"], &rows, TableOpts::default(), style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plain_style() -> StyleOptions {
        StyleOptions {
            use_color: false,
            use_emoji: false,
            term_width: 200,
            padding: 1,
        }
    }

    fn request(query: &str) -> CommandRequest {
        CommandRequest {
            original_query: query.to_string(),
            azure_command: query.to_string(),
            table_requested: wants_table(query),
        }
    }

    #[test]
    fn table_phrases_detected() {
        assert!(wants_table("list my resource groups show as table"));
        assert!(wants_table("storage accounts IN TABLE FORMAT"));
        assert!(wants_table("give me a tabular view of vms"));
        assert!(!wants_table("list my resource groups"));
        assert!(!wants_table("show the timetable resource"));
    }

    #[test]
    fn priority_columns_come_first() {
        let items = vec![json!({"foo": 1, "name": "a", "location": "eastus"})];
        assert_eq!(ordered_columns(&items), vec!["name", "location", "foo"]);
    }

    #[test]
    fn column_cap_is_ten() {
        let mut obj = Map::new();
        for i in 0..14 {
            obj.insert(format!("col{i:02}"), json!(i));
        }
        obj.insert("name".to_string(), json!("x"));
        let items = vec![Value::Object(obj)];
        let cols = ordered_columns(&items);
        assert_eq!(cols.len(), MAX_TABLE_COLUMNS);
        assert_eq!(cols[0], "name");
    }

    #[test]
    fn internal_keys_are_skipped() {
        let items = vec![json!({"name": "a", "_etag": "xyz", "id": "1"})];
        assert_eq!(ordered_columns(&items), vec!["name", "id"]);
    }

    #[test]
    fn header_humanization() {
        assert_eq!(humanize_key("resourceGroup"), "ResourceGroup");
        assert_eq!(humanize_key("provisioning_state"), "Provisioning State");
        assert_eq!(humanize_key("sku-tier"), "Sku Tier");
    }

    #[test]
    fn composite_cell_truncated_at_fifty_plus_marker() {
        let long = json!({"k": "v".repeat(80)});
        let cell = format_cell(&long, LIST_CELL_LIMIT);
        assert_eq!(cell.chars().count(), LIST_CELL_LIMIT + 1);
        assert!(cell.ends_with('…'));
    }

    #[test]
    fn scalar_cells_pass_through() {
        assert_eq!(format_cell(&json!("eastus"), 50), "eastus");
        assert_eq!(format_cell(&json!(42), 50), "42");
        assert_eq!(format_cell(&Value::Null, 50), "");
    }

    #[test]
    fn value_envelope_unwraps_to_array() {
        let v = json!({"value": [{"name": "rg1"}], "nextLink": null});
        match unwrap_envelope(v) {
            Envelope::Value(Value::Array(items)) => assert_eq!(items.len(), 1),
            _ => panic!("expected unwrapped array"),
        }
    }

    #[test]
    fn empty_value_envelope_is_left_alone() {
        let v = json!({"value": []});
        match unwrap_envelope(v.clone()) {
            Envelope::Value(out) => assert_eq!(out, v),
            _ => panic!("expected original value"),
        }
    }

    #[test]
    fn output_string_is_decoded() {
        let v = json!({"output": "[{\"name\":\"rg1\"}]"});
        match unwrap_envelope(v) {
            Envelope::Value(Value::Array(items)) => assert_eq!(items.len(), 1),
            _ => panic!("expected decoded array"),
        }
    }

    #[test]
    fn undecodable_output_string_prints_verbatim() {
        let v = json!({"output": "plain command output"});
        match unwrap_envelope(v) {
            Envelope::Raw(s) => assert_eq!(s, "plain command output"),
            _ => panic!("expected raw passthrough"),
        }
    }

    #[test]
    fn structured_output_used_directly() {
        let v = json!({"output": {"name": "rg1"}});
        match unwrap_envelope(v) {
            Envelope::Value(Value::Object(obj)) => {
                assert_eq!(obj.get("name"), Some(&json!("rg1")));
            }
            _ => panic!("expected structured output"),
        }
    }

    #[test]
    fn raw_json_without_table_request() {
        let outcome = CommandOutcome::Structured(json!({"value": [{"name": "rg1"}]}));
        let out = render_outcome(&outcome, &request("list my resource groups"), &plain_style());
        assert!(out.contains("\"name\": \"rg1\""));
        assert!(!out.contains("Name  "), "no table headers expected");
    }

    #[test]
    fn table_scenario_resource_groups() {
        let outcome = CommandOutcome::Structured(
            json!({"value": [{"name": "rg1", "location": "eastus"}]}),
        );
        let out = render_outcome(
            &outcome,
            &request("list my resource groups show as table"),
            &plain_style(),
        );
        assert!(out.contains("Name"));
        assert!(out.contains("Location"));
        assert!(out.contains("rg1"));
        assert!(out.contains("eastus"));
        assert!(out.contains("Total: 1 item(s)"));
    }

    #[test]
    fn empty_list_renders_its_own_notice() {
        let outcome = CommandOutcome::Structured(json!([]));
        let out = render_outcome(&outcome, &request("list vms as table"), &plain_style());
        assert!(out.contains(EMPTY_LIST_NOTICE));
    }

    #[test]
    fn empty_sentinel_notice_is_distinct() {
        let style = plain_style();
        let sentinel = render_outcome(&CommandOutcome::Empty, &request("list vms"), &style);
        let list = render_outcome(
            &CommandOutcome::Structured(json!([])),
            &request("list vms as table"),
            &style,
        );
        assert!(sentinel.contains(EMPTY_SENTINEL_NOTICE));
        assert_ne!(sentinel, list);
    }

    #[test]
    fn scalar_list_renders_as_json() {
        let outcome = CommandOutcome::Structured(json!([1, 2, 3]));
        let out = render_outcome(&outcome, &request("show ids as table"), &plain_style());
        assert!(out.contains('['));
        assert!(out.contains('3'));
    }

    #[test]
    fn single_object_renders_property_table() {
        let outcome = CommandOutcome::Structured(
            json!({"name": "rg1", "location": "eastus", "_internal": "hidden"}),
        );
        let out = render_outcome(&outcome, &request("show rg1 as table"), &plain_style());
        assert!(out.contains("Property"));
        assert!(out.contains("Value"));
        assert!(out.contains("Location"));
        assert!(!out.contains("hidden"));
    }

    #[test]
    fn error_renders_single_line_with_message() {
        let outcome = CommandOutcome::Error("Command execution failed: boom".into());
        let out = render_outcome(&outcome, &request("list vms"), &plain_style());
        assert!(out.contains("Command execution failed: boom"));
        assert_eq!(out.lines().count(), 1);
    }
}
