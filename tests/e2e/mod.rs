mod meta_commands;
mod multiline;
#[cfg(feature = "local-eval")]
mod quickjs;
