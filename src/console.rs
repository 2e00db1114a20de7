// src/console.rs - Line commands for the host binary
use thiserror::Error;

use crate::error::CoverError;
use crate::registry::CoverRegistry;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("'{0}' needs a cover name")]
    MissingName(&'static str),
    #[error("invalid position '{0}'")]
    InvalidPosition(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Open(String),
    Close(String),
    Stop(String),
    Set(String, f64),
    Status(Option<String>),
    List,
    Help,
    Quit,
}

impl ConsoleCommand {
    /// Parse one input line. Cover names may contain spaces; for `set` the
    /// position is the last word.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let name = |verb: &'static str| {
            if rest.is_empty() {
                Err(ParseError::MissingName(verb))
            } else {
                Ok(rest.to_string())
            }
        };
        match verb.to_ascii_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "open" => Ok(ConsoleCommand::Open(name("open")?)),
            "close" => Ok(ConsoleCommand::Close(name("close")?)),
            "stop" | "pause" => Ok(ConsoleCommand::Stop(name("stop")?)),
            "set" => {
                let (cover, position) = rest
                    .rsplit_once(char::is_whitespace)
                    .ok_or(ParseError::MissingName("set"))?;
                let position: f64 = position
                    .parse()
                    .map_err(|_| ParseError::InvalidPosition(position.to_string()))?;
                Ok(ConsoleCommand::Set(cover.trim().to_string(), position))
            }
            "status" => Ok(ConsoleCommand::Status((!rest.is_empty()).then(|| rest.to_string()))),
            "list" => Ok(ConsoleCommand::List),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => Err(ParseError::UnknownCommand(other.to_string())),
        }
    }
}

pub const HELP: &str = "commands: open <name> | close <name> | stop <name> | set <name> <0-100> | status [name] | list | quit";

/// What the console loop should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

pub async fn execute(registry: &CoverRegistry, command: ConsoleCommand) -> Result<Outcome, CoverError> {
    let cover = |name: &str| {
        registry
            .get(name)
            .ok_or_else(|| CoverError::UnknownCover(name.to_string()))
    };
    let reply = match command {
        ConsoleCommand::Open(name) => {
            cover(&name)?.open().await?;
            format!("opening {}", name)
        }
        ConsoleCommand::Close(name) => {
            cover(&name)?.close().await?;
            format!("closing {}", name)
        }
        ConsoleCommand::Stop(name) => {
            cover(&name)?.stop().await?;
            format!("stopped {}", name)
        }
        ConsoleCommand::Set(name, position) => {
            cover(&name)?.set_position(position).await?;
            format!("moving {} to {}%", name, position)
        }
        ConsoleCommand::Status(Some(name)) => {
            let snapshot = cover(&name)?.snapshot().await?;
            render(&snapshot)
        }
        ConsoleCommand::Status(None) => {
            let mut lines = Vec::new();
            for name in registry.names() {
                lines.push(render(&cover(&name)?.snapshot().await?));
            }
            lines.join("\n")
        }
        ConsoleCommand::List => registry.names().join("\n"),
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => return Ok(Outcome::Quit),
    };
    Ok(Outcome::Reply(reply))
}

fn render(snapshot: &crate::cover::CoverSnapshot) -> String {
    serde_json::to_string(snapshot).unwrap_or_else(|e| format!("<unrenderable snapshot: {}>", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(ConsoleCommand::parse("open Living room"), Ok(ConsoleCommand::Open("Living room".to_string())));
        assert_eq!(ConsoleCommand::parse("  CLOSE study "), Ok(ConsoleCommand::Close("study".to_string())));
        assert_eq!(ConsoleCommand::parse("pause study"), Ok(ConsoleCommand::Stop("study".to_string())));
        assert_eq!(ConsoleCommand::parse("list"), Ok(ConsoleCommand::List));
        assert_eq!(ConsoleCommand::parse("quit"), Ok(ConsoleCommand::Quit));
        assert_eq!(ConsoleCommand::parse("status"), Ok(ConsoleCommand::Status(None)));
        assert_eq!(ConsoleCommand::parse("status Hall"), Ok(ConsoleCommand::Status(Some("Hall".to_string()))));
    }

    #[test]
    fn test_parse_set_takes_last_word_as_position() {
        assert_eq!(
            ConsoleCommand::parse("set Living room 42.5"),
            Ok(ConsoleCommand::Set("Living room".to_string(), 42.5))
        );
        assert_eq!(ConsoleCommand::parse("set Hall abc"), Err(ParseError::InvalidPosition("abc".to_string())));
        assert_eq!(ConsoleCommand::parse("set 40"), Err(ParseError::MissingName("set")));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ConsoleCommand::parse("   "), Err(ParseError::Empty));
        assert_eq!(ConsoleCommand::parse("open"), Err(ParseError::MissingName("open")));
        assert_eq!(ConsoleCommand::parse("spin Hall"), Err(ParseError::UnknownCommand("spin".to_string())));
    }
}
