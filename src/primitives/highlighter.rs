//! Syntax highlighting with tree-sitter
//!
//! The highlighter turns source text into the same text interleaved with
//! ANSI color escapes. For the prompt, every escape is wrapped between
//! [`INVISIBLE_START`] and [`INVISIBLE_END`] so the display engine can paint
//! it without advancing its virtual cursor. Highlighting never changes the
//! visible characters.

use crossterm::style::{Color, ResetColor, SetForegroundColor};
use crossterm::Command;
use tree_sitter_highlight::{HighlightConfiguration, HighlightEvent, Highlighter as TSHighlighter};

/// Opens a zero-width run in a highlighted stream.
pub const INVISIBLE_START: char = '\x01';
/// Closes a zero-width run in a highlighted stream.
pub const INVISIBLE_END: char = '\x02';

/// Capture names recognised in the JavaScript highlight query, in
/// [`HighlightCategory`] index order.
const HIGHLIGHT_CAPTURES: &[&str] = &[
    "comment",
    "constant",
    "constructor",
    "function",
    "keyword",
    "number",
    "operator",
    "property",
    "string",
    "variable",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightCategory {
    Comment,
    Constant,
    Type,
    Function,
    Keyword,
    Number,
    Operator,
    Property,
    String,
    Variable,
}

impl HighlightCategory {
    fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Comment),
            1 => Some(Self::Constant),
            2 => Some(Self::Type),
            3 => Some(Self::Function),
            4 => Some(Self::Keyword),
            5 => Some(Self::Number),
            6 => Some(Self::Operator),
            7 => Some(Self::Property),
            8 => Some(Self::String),
            9 => Some(Self::Variable),
            _ => None,
        }
    }

    /// Terminal color for the category; `None` leaves the text as is.
    pub fn color(self) -> Option<Color> {
        match self {
            Self::Comment => Some(Color::DarkGrey),
            Self::Constant | Self::Number => Some(Color::Magenta),
            Self::Type => Some(Color::Yellow),
            Self::Function => Some(Color::DarkYellow),
            Self::Keyword => Some(Color::Blue),
            Self::Property => Some(Color::Cyan),
            Self::String => Some(Color::Green),
            Self::Operator | Self::Variable => None,
        }
    }
}

/// Anything that can colorize source text for the terminal.
pub trait Highlighter {
    /// Return `source` with color escapes inserted. With `markers`, every
    /// escape is wrapped in invisible-start/invisible-end.
    fn highlight(&mut self, source: &str, markers: bool) -> String;
}

/// Highlighter that leaves text untouched (highlighting disabled, or output
/// is not a terminal).
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHighlighter;

impl Highlighter for PlainHighlighter {
    fn highlight(&mut self, source: &str, _markers: bool) -> String {
        source.to_string()
    }
}

/// JavaScript highlighter backed by tree-sitter-highlight.
pub struct JsHighlighter {
    ts_highlighter: TSHighlighter,
    config: HighlightConfiguration,
}

impl JsHighlighter {
    pub fn new() -> Result<Self, tree_sitter::QueryError> {
        let mut config = HighlightConfiguration::new(
            tree_sitter_javascript::LANGUAGE.into(),
            "javascript",
            tree_sitter_javascript::HIGHLIGHT_QUERY,
            "",
            "",
        )?;
        config.configure(HIGHLIGHT_CAPTURES);

        Ok(Self {
            ts_highlighter: TSHighlighter::new(),
            config,
        })
    }
}

impl Highlighter for JsHighlighter {
    fn highlight(&mut self, source: &str, markers: bool) -> String {
        let events = match self
            .ts_highlighter
            .highlight(&self.config, source.as_bytes(), None, |_| None)
        {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("Failed to highlight: {}", e);
                return source.to_string();
            }
        };

        let mut out = String::with_capacity(source.len() * 2);
        // Colors of the enclosing highlights, innermost last
        let mut stack: Vec<Option<Color>> = Vec::new();

        for event in events {
            match event {
                Ok(HighlightEvent::Source { start, end }) => out.push_str(&source[start..end]),
                Ok(HighlightEvent::HighlightStart(h)) => {
                    let color = HighlightCategory::from_index(h.0).and_then(HighlightCategory::color);
                    if let Some(color) = color {
                        push_escape(&mut out, &SetForegroundColor(color), markers);
                    }
                    stack.push(color);
                }
                Ok(HighlightEvent::HighlightEnd) => {
                    if let Some(Some(_)) = stack.pop() {
                        push_escape(&mut out, &ResetColor, markers);
                        if let Some(outer) = stack.iter().rev().find_map(|c| *c) {
                            push_escape(&mut out, &SetForegroundColor(outer), markers);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Highlight error: {}", e);
                    return source.to_string();
                }
            }
        }

        if stack.iter().any(Option::is_some) {
            push_escape(&mut out, &ResetColor, markers);
        }
        out
    }
}

fn push_escape(out: &mut String, command: &impl Command, markers: bool) {
    if markers {
        out.push(INVISIBLE_START);
    }
    // Writing into a String cannot fail
    let _ = command.write_ansi(out);
    if markers {
        out.push(INVISIBLE_END);
    }
}

/// Remove invisible runs from a highlighted stream, keeping the visible text.
pub fn strip_invisible(highlighted: &str) -> String {
    let mut out = String::with_capacity(highlighted.len());
    let mut hidden = false;
    for ch in highlighted.chars() {
        match ch {
            INVISIBLE_START => hidden = true,
            INVISIBLE_END => hidden = false,
            _ if !hidden => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Remove ANSI CSI escapes from text highlighted without markers.
pub fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // Parameters end at the first byte in @..~
            for c in chars.by_ref() {
                if ('@'..='~').contains(&c) {
                    break;
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}
