// Outbound command tokens understood by the tracker controller
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Auto,
    Manual,
    Start,
    Stop,
    Center,
    /// Horizontal servo target in degrees. Not range checked.
    Horizontal(i32),
    /// Vertical servo target in degrees. Not range checked.
    Vertical(i32),
}

impl Command {
    /// Wire form of the command, newline terminated.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Auto => f.write_str("AUTO"),
            Command::Manual => f.write_str("MANUAL"),
            Command::Start => f.write_str("START"),
            Command::Stop => f.write_str("STOP"),
            Command::Center => f.write_str("CENTER"),
            Command::Horizontal(angle) => write!(f, "H{}", angle),
            Command::Vertical(angle) => write!(f, "V{}", angle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command token: {0:?}")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        match token {
            "AUTO" => return Ok(Command::Auto),
            "MANUAL" => return Ok(Command::Manual),
            "START" => return Ok(Command::Start),
            "STOP" => return Ok(Command::Stop),
            "CENTER" => return Ok(Command::Center),
            _ => {}
        }

        let parse_angle = |payload: &str| {
            payload
                .parse::<i32>()
                .map_err(|_| UnknownCommand(token.to_string()))
        };
        if let Some(rest) = token.strip_prefix('H') {
            return parse_angle(rest).map(Command::Horizontal);
        }
        if let Some(rest) = token.strip_prefix('V') {
            return parse_angle(rest).map(Command::Vertical);
        }
        Err(UnknownCommand(token.to_string()))
    }
}
