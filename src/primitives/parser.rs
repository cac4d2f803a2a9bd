//! JavaScript parse oracle and code generator on top of tree-sitter.
//!
//! `try_parse` reports ERROR and MISSING nodes as diagnostics. A diagnostic
//! that sits at or past the end of the meaningful text (only whitespace
//! follows it) is reported on the line after the last one: the input ran
//! out before the construct was closed, which the input controller reads as
//! "keep typing". The same happens when the text stops inside an unclosed
//! construct that tree-sitter recovered from on the last line (see
//! [`super::continuation`]).

use super::continuation::ends_inside_construct;
use std::ops::Range;
use tree_sitter::{Language, LanguageError, Node, Parser, Tree};

/// One parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line of the error start
    pub line: usize,
    /// 1-based line of the error end
    pub end_line: usize,
    /// Byte columns on `line`; empty when the error is zero-width
    pub columns: Range<usize>,
    pub message: String,
}

impl Diagnostic {
    /// True when the error covers more than one line.
    pub fn spans_lines(&self) -> bool {
        self.end_line != self.line
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Drop comments and collapse whitespace
    pub minify: bool,
    /// Prefix the unit with a "use strict" directive
    pub strict: bool,
}

/// Something that can tell whether source text is a valid program and turn
/// it into the code that is actually evaluated.
pub trait ParseOracle {
    fn try_parse(&mut self, source: &str) -> Result<(), Vec<Diagnostic>>;

    fn compile(&mut self, source: &str, options: CompileOptions) -> Result<String, Vec<Diagnostic>>;
}

pub struct JsParser {
    parser: Parser,
}

impl JsParser {
    pub fn new() -> Result<Self, LanguageError> {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();
        let mut parser = Parser::new();
        parser.set_language(&language)?;
        Ok(Self { parser })
    }

    fn parse_tree(&mut self, source: &str) -> Option<Tree> {
        let tree = self.parser.parse(source, None);
        if let Some(tree) = &tree {
            tracing::trace!("parse tree: {}", tree.root_node().to_sexp());
        }
        tree
    }
}

impl ParseOracle for JsParser {
    fn try_parse(&mut self, source: &str) -> Result<(), Vec<Diagnostic>> {
        let Some(tree) = self.parse_tree(source) else {
            // Only happens on cancellation or a missing language
            return Err(vec![Diagnostic {
                line: 1,
                end_line: 1,
                columns: 0..0,
                message: "parser unavailable".to_string(),
            }]);
        };

        let root = tree.root_node();
        if !root.has_error() {
            return Ok(());
        }

        let mut diagnostics = Vec::new();
        collect_errors(root, source, &mut diagnostics);
        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic {
                line: 1,
                end_line: 1,
                columns: 0..0,
                message: "syntax error".to_string(),
            });
        }
        let past_end = line_after_content(source);
        if ends_inside_construct(source) && diagnostics.iter().all(|d| d.line != past_end) {
            diagnostics.push(end_of_input(source, "unexpected end of input".to_string()));
        }
        diagnostics.sort_by_key(|d| (d.line, d.columns.start));
        Err(diagnostics)
    }

    fn compile(&mut self, source: &str, options: CompileOptions) -> Result<String, Vec<Diagnostic>> {
        self.try_parse(source)?;

        let mut code = String::new();
        if options.strict {
            code.push_str("\"use strict\";");
            code.push(if options.minify { ' ' } else { '\n' });
        }

        if options.minify {
            match self.parse_tree(source) {
                Some(tree) => code.push_str(&minify(tree.root_node(), source)),
                None => code.push_str(source),
            }
        } else {
            code.push_str(source);
        }
        Ok(code)
    }
}

fn collect_errors(node: Node<'_>, source: &str, out: &mut Vec<Diagnostic>) {
    if node.is_missing() {
        out.push(diagnostic_for(node, source, format!("expected `{}`", node.kind())));
        return;
    }
    if node.is_error() {
        let snippet = first_token(node, source);
        let message = if snippet.is_empty() {
            "syntax error".to_string()
        } else {
            format!("unexpected `{snippet}`")
        };
        out.push(diagnostic_for(node, source, message));
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, source, out);
    }
}

/// 1-based line just past the last line with content.
fn line_after_content(source: &str) -> usize {
    source.trim_end().matches('\n').count() + 2
}

/// Diagnostic for input that ran out before a construct was closed.
fn end_of_input(source: &str, message: String) -> Diagnostic {
    let line = line_after_content(source);
    Diagnostic {
        line,
        end_line: line,
        columns: 0..0,
        message,
    }
}

fn diagnostic_for(node: Node<'_>, source: &str, message: String) -> Diagnostic {
    if node.start_byte() >= source.trim_end().len() {
        return end_of_input(source, message);
    }

    let start = node.start_position();
    let end = node.end_position();
    let columns = if start.row == end.row {
        start.column..end.column
    } else {
        start.column..start.column
    };
    Diagnostic {
        line: start.row + 1,
        end_line: end.row + 1,
        columns,
        message,
    }
}

/// Text of the first leaf inside `node`, shortened for messages.
fn first_token<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    let mut leaf = node;
    while let Some(child) = leaf.child(0) {
        leaf = child;
    }
    let text = source.get(leaf.start_byte()..leaf.end_byte()).unwrap_or("");
    match text.char_indices().nth(20) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Nodes emitted verbatim even though they have children.
fn is_atomic(kind: &str) -> bool {
    matches!(kind, "string" | "template_string" | "regex" | "comment")
}

fn collect_tokens(node: Node<'_>, out: &mut Vec<Range<usize>>) {
    if node.kind() == "comment" {
        return;
    }
    if node.child_count() == 0 || is_atomic(node.kind()) {
        if node.end_byte() > node.start_byte() {
            out.push(node.start_byte()..node.end_byte());
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_tokens(child, out);
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Tokens whose concatenation would read as a different token.
fn needs_space(left: &str, right: &str) -> bool {
    let (Some(&l), Some(&r)) = (left.as_bytes().last(), right.as_bytes().first()) else {
        return false;
    };
    (is_word_byte(l) && is_word_byte(r))
        || (l == b'+' && r == b'+')
        || (l == b'-' && r == b'-')
        || (l == b'/' && r == b'/')
        || (l.is_ascii_digit() && r == b'.')
}

/// Drop comments and collapse whitespace. Line breaks between tokens are
/// kept as a single `\n` so automatic semicolon insertion still applies.
fn minify(root: Node<'_>, source: &str) -> String {
    let mut tokens = Vec::new();
    collect_tokens(root, &mut tokens);

    let mut out = String::with_capacity(source.len());
    let mut prev: Option<Range<usize>> = None;
    for token in tokens {
        let text = &source[token.clone()];
        if let Some(prev) = prev {
            let gap = &source[prev.end..token.start];
            if gap.contains('\n') {
                out.push('\n');
            } else if !gap.is_empty() && needs_space(&source[prev], text) {
                out.push(' ');
            }
        }
        out.push_str(text);
        prev = Some(token);
    }
    out
}
