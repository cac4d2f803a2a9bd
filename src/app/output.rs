//! Rendering of results and parse errors.

use crate::primitives::line_math::char_width;
use crate::primitives::parser::Diagnostic;

/// Width of the dotted lead-in under a prompt.
const PROMPT_LEAD: &str = "....";

/// Display flags that change how a value is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFlags {
    /// Print string results unescaped
    pub expand: bool,
    /// Re-indent JSON results
    pub pretty: bool,
}

/// How a rendered value should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Source-like text, eligible for highlighting
    Code(String),
    /// Raw text, printed as is
    Text(String),
}

/// Apply the output flags to a result.
pub fn render_value(value: &str, flags: OutputFlags) -> Rendered {
    if flags.expand {
        if let Some(text) = unescape_string_literal(value) {
            return Rendered::Text(text);
        }
    }
    if flags.pretty {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(value) {
            if json.is_array() || json.is_object() {
                if let Ok(pretty) = serde_json::to_string_pretty(&json) {
                    return Rendered::Code(pretty);
                }
            }
        }
    }
    Rendered::Code(value.to_string())
}

/// Body of a `"…"`, `'…'` or `@"…"` literal with escapes resolved.
/// Unknown escapes are kept verbatim.
pub fn unescape_string_literal(value: &str) -> Option<String> {
    let value = value.strip_prefix('@').unwrap_or(value);
    let quote = value.chars().next().filter(|&c| c == '"' || c == '\'')?;
    let body = value.strip_prefix(quote)?.strip_suffix(quote)?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Some(out)
}

/// Caret diagnostic for an error in `source`:
///
/// ```text
/// .......^^^
///   | message
/// ```
///
/// Errors past the first line echo their line first, since the carets
/// would otherwise point into the first line of the input.
pub fn caret_report(source: &str, diagnostic: &Diagnostic) -> String {
    let line_text = source.lines().nth(diagnostic.line.saturating_sub(1)).unwrap_or("");
    let start = diagnostic.columns.start.min(line_text.len());
    let end = diagnostic.columns.end.clamp(start, line_text.len());

    let lead: usize = line_text
        .get(..start)
        .map_or(start, |prefix| prefix.chars().map(char_width).sum());
    let carets = if diagnostic.spans_lines() || start == end {
        1
    } else {
        line_text
            .get(start..end)
            .map_or(end - start, |span| span.chars().map(char_width).sum::<usize>())
            .max(1)
    };

    let mut report = String::new();
    if diagnostic.line > 1 && !line_text.is_empty() {
        report.push_str("    ");
        report.push_str(line_text);
        report.push('\n');
    }
    report.push_str(PROMPT_LEAD);
    report.push_str(&".".repeat(lead));
    report.push_str(&"^".repeat(carets));
    report.push('\n');
    report.push_str("  | ");
    report.push_str(&diagnostic.message);
    report.push('\n');
    report
}

/// `line:column: message` for batch mode (both 1-based).
pub fn batch_report(diagnostic: &Diagnostic) -> String {
    format!(
        "{}:{}: {}",
        diagnostic.line,
        diagnostic.columns.start + 1,
        diagnostic.message
    )
}
