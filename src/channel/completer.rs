//! Tab completion answered by the target itself: the property names of the
//! object before the dot are enumerated by a snippet sent through the
//! channel.

use super::{ExecutionChannel, Reply};
use crate::input::completion::Completer;

/// Trailing property-access chain of `context` when it ends in a dot,
/// e.g. `"x = Math."` gives `Some("Math")`.
pub fn object_expression(context: &str) -> Option<&str> {
    let before_dot = context.strip_suffix('.')?;
    let start = before_dot
        .char_indices()
        .rev()
        .find(|&(_, c)| !(c.is_alphanumeric() || c == '_' || c == '$' || c == '.'))
        .map_or(0, |(idx, c)| idx + c.len_utf8());
    let expression = before_dot[start..].trim_matches('.');
    (!expression.is_empty()).then_some(expression)
}

/// Code that evaluates to the property names visible on `expression`,
/// including inherited ones.
pub fn enumeration_snippet(expression: &str) -> String {
    format!(
        "(function(){{try{{var o=({expression}),s={{}};\
         for(;o!=null;o=Object.getPrototypeOf(o))\
         Object.getOwnPropertyNames(o).forEach(function(k){{s[k]=1}});\
         return Object.keys(s)}}catch(e){{return []}}}})()"
    )
}

impl Completer for ExecutionChannel {
    fn complete(&mut self, context: &str, word: &str) -> Vec<String> {
        let expression = object_expression(context).unwrap_or("globalThis");
        let reply = match self.send(&enumeration_snippet(expression)) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("completion request failed: {}", e);
                return Vec::new();
            }
        };

        let Reply::Value(json) = reply else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<String>>(&json) {
            Ok(names) => names.into_iter().filter(|n| n.starts_with(word)).collect(),
            Err(e) => {
                tracing::debug!("completion reply is not a name list: {}", e);
                Vec::new()
            }
        }
    }
}
