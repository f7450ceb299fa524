/*!
format.rs

Terminal formatting primitives for the human output paths.

Goals:
  - Consistent colorful / boxed / tabular formatting across the REPL.
  - Centralize style decisions (NO_COLOR / NO_EMOJI env, COLUMNS width).
  - Zero non-std dependencies; degrade gracefully when ANSI is disabled.

Public API:
  - StyleOptions::detect() -> StyleOptions
  - color(role, text, &StyleOptions) -> String
  - emoji(tag, &StyleOptions) -> &'static str
  - box_header(title, subtitle_opt, &StyleOptions) -> String
  - table(headers, rows, TableOpts, &StyleOptions) -> String
  - truncate_marked(s, keep) -> String

JSON output paths must not use these helpers so machine output stays
clean.
*/

use std::borrow::Cow;

/* -------------------------------------------------------------------------- */
/* Style Options                                                              */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
    pub term_width: usize,
    pub padding: usize,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        let use_color = std::env::var_os("NO_COLOR").is_none();
        let use_emoji = std::env::var_os("NO_EMOJI").is_none();

        let width = std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|w| w.clamp(40, 220))
            .unwrap_or(100);

        StyleOptions {
            use_color,
            use_emoji,
            term_width: width,
            padding: 1,
        }
    }
}

/* -------------------------------------------------------------------------- */
/* Color / Emoji                                                              */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Warning,
    Error,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",    // cyan-ish
        Role::Secondary => "38;5;250", // gray
        Role::Accent => "38;5;213",    // magenta/pink
        Role::Success => "38;5;82",    // green
        Role::Warning => "38;5;214",   // orange
        Role::Error => "38;5;196",     // red
        Role::Dim => "2",              // faint
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "warn" => "⚠",
        "info" => "ℹ",
        "cloud" => "☁",
        "spark" => "✨",
        _ => "",
    }
}

/* -------------------------------------------------------------------------- */
/* Box Header                                                                 */
/* -------------------------------------------------------------------------- */

pub fn box_header(
    title: impl AsRef<str>,
    subtitle: Option<impl AsRef<str>>,
    style: &StyleOptions,
) -> String {
    let title_styled = color(Role::Primary, title.as_ref(), style);
    let inner = match subtitle {
        Some(sub) => format!(
            "{title_styled}  {}",
            color(Role::Secondary, sub.as_ref(), style)
        ),
        None => title_styled,
    };

    let max_inner = style.term_width.clamp(20, 200) - 2 - style.padding * 2;
    let rows = wrap_text(&inner, max_inner);
    // Widest wrapped row sets the frame; a single long token (URL) may
    // exceed max_inner and the frame follows it.
    let content_width = rows.iter().map(|r| display_width(r)).max().unwrap_or(0);
    let pad = " ".repeat(style.padding);

    let mut lines = Vec::new();
    lines.push(format!(
        "┌{}┐",
        "─".repeat(content_width + style.padding * 2)
    ));
    for row in rows {
        let fill = content_width.saturating_sub(display_width(&row));
        lines.push(format!("│{pad}{row}{}{pad}│", " ".repeat(fill)));
    }
    lines.push(format!(
        "└{}┘",
        "─".repeat(content_width + style.padding * 2)
    ));
    lines.join("\n")
}

/* -------------------------------------------------------------------------- */
/* Table Rendering                                                             */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone)]
pub struct TableOpts {
    pub max_width: usize,
    pub truncate: bool,
    pub header_sep: bool,
    pub min_col_width: usize,
}

impl Default for TableOpts {
    fn default() -> Self {
        Self {
            max_width: 0, // 0 -> style.term_width
            truncate: true,
            header_sep: true,
            min_col_width: 2,
        }
    }
}

pub fn table(
    headers: &[&str],
    rows: &[Vec<String>],
    opts: TableOpts,
    style: &StyleOptions,
) -> String {
    if headers.is_empty() {
        return String::new();
    }
    let col_count = headers.len();
    let width_limit = if opts.max_width == 0 {
        style.term_width
    } else {
        opts.max_width.min(style.term_width)
    };

    // Max content width per column.
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(col_count) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }

    // Greedy shrink from the widest columns when the total overflows.
    let total_raw: usize = widths.iter().sum::<usize>() + (col_count - 1) * 2;
    if total_raw > width_limit {
        let mut overflow = total_raw - width_limit;
        let mut ordered: Vec<(usize, usize)> = widths.iter().copied().enumerate().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));
        for (idx, _) in ordered {
            if overflow == 0 {
                break;
            }
            if widths[idx] > opts.min_col_width {
                let shrink = (widths[idx] - opts.min_col_width).min(overflow);
                widths[idx] -= shrink;
                overflow -= shrink;
            }
        }
    }

    let mut out = String::new();

    for (i, h) in headers.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        let cell = pad_or_truncate(h, widths[i], opts.truncate);
        out.push_str(&color(Role::Accent, cell, style));
    }
    out.push('\n');

    if opts.header_sep {
        let mut sep = String::new();
        for (i, _) in headers.iter().enumerate() {
            if i > 0 {
                sep.push_str("  ");
            }
            sep.push_str(&"-".repeat(widths[i]));
        }
        out.push_str(&color(Role::Dim, sep, style));
        out.push('\n');
    }

    for (r_idx, row) in rows.iter().enumerate() {
        for c in 0..col_count {
            if c > 0 {
                out.push_str("  ");
            }
            let raw = row.get(c).map(|s| s.as_str()).unwrap_or("");
            out.push_str(&pad_or_truncate(raw, widths[c], opts.truncate));
        }
        if r_idx + 1 < rows.len() {
            out.push('\n');
        }
    }

    out
}

fn pad_or_truncate(s: &str, width: usize, truncate: bool) -> String {
    let len = display_width(s);
    if len == width {
        return s.to_string();
    }
    if len < width {
        return format!("{s}{}", " ".repeat(width - len));
    }
    if !truncate {
        return s.to_string();
    }
    if width <= 1 {
        return "…".to_string();
    }
    let mut out: String = s.chars().take(width - 1).collect();
    out.push('…');
    let final_len = display_width(&out);
    if final_len < width {
        out.push_str(&" ".repeat(width - final_len));
    }
    out
}

/* -------------------------------------------------------------------------- */
/* Text Helpers                                                                */
/* -------------------------------------------------------------------------- */

pub fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in s.split_whitespace() {
        if display_width(&current) + word.len() + 1 > max_width && !current.is_empty() {
            lines.push(current);
            current = String::new();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Keep the first `keep` characters and append an ellipsis marker when
/// anything was dropped. The visible segment is exactly `keep` chars
/// plus the marker (unlike column padding, which budgets the marker
/// inside the width).
pub fn truncate_marked(s: &str, keep: usize) -> String {
    if s.chars().count() <= keep {
        return s.to_string();
    }
    let mut out: String = s.chars().take(keep).collect();
    out.push('…');
    out
}

/* -------------------------------------------------------------------------- */
/* ANSI / Width Utilities                                                      */
/* -------------------------------------------------------------------------- */

fn strip_ansi(s: &str) -> Cow<'_, str> {
    // Minimal scan for CSI sequences (ESC '[' ... final byte).
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0x1B && i + 1 < bytes.len() && bytes[i + 1] == b'[' {
            i += 2;
            while i < bytes.len() && !bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            if i < bytes.len() {
                i += 1;
            }
            continue;
        }
        buf.push(bytes[i] as char);
        i += 1;
    }
    Cow::Owned(buf)
}

fn display_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/* -------------------------------------------------------------------------- */
/* Tests                                                                       */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_style() -> StyleOptions {
        StyleOptions {
            use_color: false,
            use_emoji: false,
            term_width: 100,
            padding: 1,
        }
    }

    #[test]
    fn box_header_contains_title_and_borders() {
        let b = box_header("Azure MCP Copilot", Some("connected"), &plain_style());
        assert!(b.contains("Azure MCP Copilot"));
        assert!(b.starts_with('┌'));
        assert!(b.ends_with('┘'));
    }

    #[test]
    fn table_basic() {
        let t = table(
            &["Name", "Location"],
            &[
                vec!["rg1".into(), "eastus".into()],
                vec!["rg2".into(), "westeurope".into()],
            ],
            TableOpts::default(),
            &plain_style(),
        );
        assert!(t.contains("Name"));
        assert!(t.contains("westeurope"));
        assert!(t.contains("---"));
    }

    #[test]
    fn table_pads_short_rows() {
        let t = table(
            &["A", "B"],
            &[vec!["only-a".into()]],
            TableOpts::default(),
            &plain_style(),
        );
        assert!(t.contains("only-a"));
    }

    #[test]
    fn wrap_text_splits_long_lines() {
        let lines = wrap_text("hello world from formatting", 10);
        assert!(lines.len() >= 2);
    }

    #[test]
    fn truncate_marked_exact_boundary() {
        assert_eq!(truncate_marked("abcdef", 6), "abcdef");
        let cut = truncate_marked("abcdefg", 6);
        assert_eq!(cut, "abcdef…");
        assert_eq!(cut.chars().count(), 7, "kept segment plus one marker char");
    }

    #[test]
    fn strip_ansi_removes_codes() {
        assert_eq!(strip_ansi("\x1b[31mRED\x1b[0m"), "RED");
    }
}
