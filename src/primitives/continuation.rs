//! Lexical check for input that stops in the middle of a construct.
//!
//! tree-sitter recovers from an unclosed `(` or `[` with an ERROR node on
//! the last line, which looks the same as a real mistake there. This scan
//! looks at the token stream instead: open brackets, an unfinished string,
//! template or block comment, or a trailing binary operator all mean the
//! user has more to type.

/// Construct still waiting for its closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Brace,
    Paren,
    Bracket,
    Template,
    /// `${ ... }` inside a template
    Substitution,
}

/// Kind of the last significant token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tail {
    Start,
    Operand,
    Operator,
    /// Keyword after which an expression starts (`return /re/`)
    Keyword,
}

impl Tail {
    fn allows_regex(self) -> bool {
        self != Tail::Operand
    }
}

enum Scan {
    /// Literal closed; scanning resumes at this index
    Closed(usize),
    /// Input ended inside the literal
    Eof,
    /// The literal cannot continue (newline in a quoted string)
    Broken,
}

const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// True when `source` ends inside an unclosed bracket, string, template or
/// block comment, or right after a binary operator.
///
/// A closer with no matching opener makes the text wrong rather than
/// unfinished, so it yields false.
pub fn ends_inside_construct(source: &str) -> bool {
    let chars: Vec<char> = source.trim_end().chars().collect();
    let mut stack: Vec<Open> = Vec::new();
    let mut tail = Tail::Start;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if stack.last() == Some(&Open::Template) {
            match c {
                '\\' => i += 2,
                '`' => {
                    stack.pop();
                    tail = Tail::Operand;
                    i += 1;
                }
                '$' if next == Some('{') => {
                    stack.push(Open::Substitution);
                    tail = Tail::Start;
                    i += 2;
                }
                _ => i += 1,
            }
            continue;
        }

        match c {
            c if c.is_whitespace() => i += 1,
            '/' if next == Some('/') => {
                i = chars[i..]
                    .iter()
                    .position(|&c| c == '\n')
                    .map_or(chars.len(), |offset| i + offset);
            }
            '/' if next == Some('*') => {
                match find_pair(&chars, i + 2, '*', '/') {
                    Some(end) => i = end + 2,
                    None => return true,
                }
            }
            '\'' | '"' => match scan_string(&chars, i) {
                Scan::Closed(end) => {
                    i = end;
                    tail = Tail::Operand;
                }
                Scan::Eof => return true,
                Scan::Broken => return false,
            },
            '`' => {
                stack.push(Open::Template);
                i += 1;
            }
            '/' if tail.allows_regex() => match scan_regex(&chars, i) {
                Scan::Closed(end) => {
                    i = end;
                    while i < chars.len() && is_word_char(chars[i]) {
                        i += 1;
                    }
                    tail = Tail::Operand;
                }
                Scan::Eof | Scan::Broken => return false,
            },
            '{' | '(' | '[' => {
                stack.push(match c {
                    '{' => Open::Brace,
                    '(' => Open::Paren,
                    _ => Open::Bracket,
                });
                tail = Tail::Start;
                i += 1;
            }
            '}' | ')' | ']' => {
                let expected = match c {
                    '}' => matches!(stack.last(), Some(Open::Brace | Open::Substitution)),
                    ')' => matches!(stack.last(), Some(Open::Paren)),
                    _ => matches!(stack.last(), Some(Open::Bracket)),
                };
                if !expected {
                    return false;
                }
                stack.pop();
                tail = Tail::Operand;
                i += 1;
            }
            '+' | '-' if next == Some(c) => {
                // Postfix `x++` completes an expression; prefix `++x` does not
                tail = if tail == Tail::Operand {
                    Tail::Operand
                } else {
                    Tail::Operator
                };
                i += 2;
            }
            ';' => {
                tail = Tail::Start;
                i += 1;
            }
            c if is_word_char(c) => {
                let start = i;
                let numeric = c.is_ascii_digit();
                while i < chars.len() && (is_word_char(chars[i]) || (numeric && chars[i] == '.')) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tail = if EXPRESSION_KEYWORDS.contains(&word.as_str()) {
                    Tail::Keyword
                } else {
                    Tail::Operand
                };
            }
            _ => {
                tail = Tail::Operator;
                i += 1;
            }
        }
    }

    !stack.is_empty() || tail == Tail::Operator
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Index of the first `a` immediately followed by `b`, at or after `from`.
fn find_pair(chars: &[char], from: usize, a: char, b: char) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&j| chars[j] == a && chars[j + 1] == b)
}

fn scan_string(chars: &[char], open: usize) -> Scan {
    let quote = chars[open];
    let mut j = open + 1;
    loop {
        match chars.get(j) {
            None => return Scan::Eof,
            Some('\\') => j += 2,
            Some('\n') => return Scan::Broken,
            Some(&c) if c == quote => return Scan::Closed(j + 1),
            Some(_) => j += 1,
        }
    }
}

fn scan_regex(chars: &[char], open: usize) -> Scan {
    let mut in_class = false;
    let mut j = open + 1;
    loop {
        match chars.get(j) {
            None => return Scan::Eof,
            Some('\\') => j += 2,
            Some('\n') => return Scan::Broken,
            Some('[') => {
                in_class = true;
                j += 1;
            }
            Some(']') => {
                in_class = false;
                j += 1;
            }
            Some('/') if !in_class => return Scan::Closed(j + 1),
            Some(_) => j += 1,
        }
    }
}
