//! Word completion for the Tab key.

/// Characters that end a completable word.
pub const WORD_BREAK_CHARS: &str = " \t\n\"\\'`@><=;|&{()}.:[]";

/// Source of completion candidates.
pub trait Completer {
    /// Candidates for `word`, given the buffer text that precedes it.
    /// Every candidate should start with `word`.
    fn complete(&mut self, context: &str, word: &str) -> Vec<String>;
}

/// Byte offset where the word ending at `point` starts.
pub fn word_start(text: &str, point: usize) -> usize {
    text[..point]
        .char_indices()
        .rev()
        .find(|&(_, c)| WORD_BREAK_CHARS.contains(c))
        .map_or(0, |(idx, c)| idx + c.len_utf8())
}

/// Longest prefix shared by every candidate.
pub fn common_prefix(candidates: &[String]) -> &str {
    let Some(first) = candidates.first() else {
        return "";
    };
    let mut len = first.len();
    for candidate in &candidates[1..] {
        len = first
            .char_indices()
            .zip(candidate.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((idx, a), _)| idx + a.len_utf8())
            .min(len);
    }
    &first[..len]
}

/// What Tab should do with a set of candidates for `word`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Nothing matched
    None,
    /// Insert this text at the point
    Insert(String),
    /// Ambiguous: show these to the user
    List(Vec<String>),
}

pub fn resolve(word: &str, mut candidates: Vec<String>) -> Completion {
    candidates.retain(|c| c.starts_with(word));
    candidates.sort();
    candidates.dedup();

    match candidates.as_slice() {
        [] => Completion::None,
        [only] => Completion::Insert(only[word.len()..].to_string()),
        _ => {
            let prefix = common_prefix(&candidates);
            if prefix.len() > word.len() {
                Completion::Insert(prefix[word.len()..].to_string())
            } else {
                Completion::List(candidates)
            }
        }
    }
}

/// Completer that never offers anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCompletion;

impl Completer for NoCompletion {
    fn complete(&mut self, _context: &str, _word: &str) -> Vec<String> {
        Vec::new()
    }
}
