//! `?` commands understood by the console itself.

/// A console command entered as `?name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Bypass,
    Debug,
    Destroy,
    Gc,
    Expand,
    Pretty,
    Exit,
    Unknown(String),
}

impl MetaCommand {
    /// Parse a line that starts with `?`.
    pub fn parse(line: &str) -> Self {
        let name = line.trim().trim_start_matches('?').trim();
        match name {
            "bypass" => Self::Bypass,
            "debug" => Self::Debug,
            "destroy" => Self::Destroy,
            "gc" => Self::Gc,
            "expand" => Self::Expand,
            "pretty" => Self::Pretty,
            "exit" => Self::Exit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Session toggles flipped by meta commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetaFlags {
    /// Send input verbatim, skipping the parser
    pub bypass: bool,
    /// Echo generated code before running it
    pub debug: bool,
    pub expand: bool,
    pub pretty: bool,
}

impl MetaFlags {
    /// Flip the flag behind `command` and return its name and new value,
    /// or `None` when the command is not a toggle.
    pub fn toggle(&mut self, command: &MetaCommand) -> Option<(&'static str, bool)> {
        let (name, flag) = match command {
            MetaCommand::Bypass => ("bypass", &mut self.bypass),
            MetaCommand::Debug => ("debug", &mut self.debug),
            MetaCommand::Expand => ("expand", &mut self.expand),
            MetaCommand::Pretty => ("pretty", &mut self.pretty),
            _ => return None,
        };
        *flag = !*flag;
        Some((name, *flag))
    }
}
