//! Operator commands read from the control channel (stdin in the CLI).

/// One lifecycle command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Pause,
    Resume,
    Status,
    Reset,
    Quit,
}

impl ControlCommand {
    /// Returns a list of all commands.
    pub fn all() -> Vec<ControlCommand> {
        vec![
            ControlCommand::Start,
            ControlCommand::Pause,
            ControlCommand::Resume,
            ControlCommand::Status,
            ControlCommand::Reset,
            ControlCommand::Quit,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::Start => "start",
            ControlCommand::Pause => "pause",
            ControlCommand::Resume => "resume",
            ControlCommand::Status => "status",
            ControlCommand::Reset => "reset",
            ControlCommand::Quit => "quit",
        }
    }

    /// Usage line listing every command.
    pub fn usage() -> String {
        let names: Vec<&str> = Self::all().iter().map(|c| c.name()).collect();
        format!("Commands: {}", names.join(", "))
    }
}

impl std::fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ControlCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" | "s" | "run" => Ok(ControlCommand::Start),
            "pause" | "p" | "stop" => Ok(ControlCommand::Pause),
            "resume" | "r" | "continue" => Ok(ControlCommand::Resume),
            "status" | "?" | "stats" => Ok(ControlCommand::Status),
            "reset" => Ok(ControlCommand::Reset),
            "quit" | "q" | "exit" => Ok(ControlCommand::Quit),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}
