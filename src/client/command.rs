use std::str::FromStr;

use crate::model::TaskId;

pub const HELP: &str = "commands: add <text> | rm <id> | reload | help | quit";

/// A line typed into the terminal front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add(String),
    Remove(TaskId),
    Reload,
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim_end_matches(['\r', '\n']);
        let (verb, rest) = match line.trim_start().split_once(' ') {
            Some((verb, rest)) => (verb, rest),
            None => (line.trim(), ""),
        };

        match verb {
            // the text after the verb is sent as typed
            "add" | "+" => Command::Add(rest.to_string()),
            "rm" | "x" => match TaskId::from_str(rest.trim()) {
                Ok(id) => Command::Remove(id),
                Err(err) => Command::Invalid(err.to_string()),
            },
            "reload" | "r" => Command::Reload,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            "" => Command::Help,
            other => Command::Invalid(format!("unknown command {:?}, {}", other, HELP)),
        }
    }
}
