//! # Replay commands
//!
//! A replay script drives an editing session one line at a time. Each line
//! is a command of the form `kind|arg`, for example `type|Hello @`,
//! `key|enter` or `attach|photo.png|image/png|2097152`. Blank lines and lines
//! starting with `#` are skipped.

use crate::editor::{InputEvent, Key, UnknownKey};
use crate::upload::PendingFile;
use displaydoc::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Error when parsing a command
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum ParseCommandError {
    /// The command expected an argument (e.g. `{0}|foo`)
    MissingArg(CommandKind),
    /// The command `{0}` is not known
    UnknownCommand(String),
    /// {0}
    UnknownKey(#[from] UnknownKey),
    /// `{0}` is not a number
    InvalidNumber(String),
}

/// line {line}: {source}
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub struct ScriptError {
    pub line: usize,
    pub source: ParseCommandError,
}

/// A kind of script command
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// type
    Type,
    /// key
    Key,
    /// paste
    Paste,
    /// attach
    Attach,
    /// pick
    Pick,
    /// blur
    Blur,
    /// click-outside
    ClickOutside,
    /// wait
    Wait,
}

/// A script command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Input for the editor
    Input(InputEvent),
    /// Let time pass, so debounced lookups and uploads can finish
    Wait(Duration),
}

impl FromStr for CommandKind {
    type Err = ParseCommandError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(Self::Type),
            "key" => Ok(Self::Key),
            "paste" => Ok(Self::Paste),
            "attach" => Ok(Self::Attach),
            "pick" => Ok(Self::Pick),
            "blur" => Ok(Self::Blur),
            "click-outside" => Ok(Self::ClickOutside),
            "wait" => Ok(Self::Wait),
            _ => Err(ParseCommandError::UnknownCommand(s.to_owned())),
        }
    }
}

fn split_arg(input: &str) -> (&str, Option<&str>) {
    if let Some(cmd_len) = input.find('|') {
        let (cmd, r) = input.split_at(cmd_len);
        let (_, arg) = r.split_at(1);
        (cmd, Some(arg))
    } else {
        (input, None)
    }
}

fn parse_number(s: &str) -> Result<u64, ParseCommandError> {
    s.trim()
        .parse()
        .map_err(|_| ParseCommandError::InvalidNumber(s.to_owned()))
}

/// `name|mime|size` describes a file filled with `size` zero bytes
fn parse_file(kind: CommandKind, arg: Option<&str>) -> Result<PendingFile, ParseCommandError> {
    let text = arg.ok_or(ParseCommandError::MissingArg(kind))?;
    let (name, rest) = split_arg(text);
    let (mime_type, size) = split_arg(rest.ok_or(ParseCommandError::MissingArg(kind))?);
    let size = parse_number(size.ok_or(ParseCommandError::MissingArg(kind))?)?;
    let size =
        usize::try_from(size).map_err(|_| ParseCommandError::InvalidNumber(size.to_string()))?;
    Ok(PendingFile::new(name, mime_type, vec![0; size]))
}

impl FromStr for Command {
    type Err = ParseCommandError;
    fn from_str(input: &str) -> Result<Command, ParseCommandError> {
        let (cmd, arg) = split_arg(input);

        let event = match cmd.parse()? {
            CommandKind::Type => {
                let text = arg.ok_or(ParseCommandError::MissingArg(CommandKind::Type))?;
                InputEvent::Text(text.to_owned())
            }
            CommandKind::Key => {
                let key = arg.ok_or(ParseCommandError::MissingArg(CommandKind::Key))?;
                InputEvent::Key(key.trim().parse::<Key>()?)
            }
            CommandKind::Paste => {
                let text = arg.ok_or(ParseCommandError::MissingArg(CommandKind::Paste))?;
                InputEvent::Paste(text.to_owned())
            }
            CommandKind::Attach => InputEvent::Drop(vec![parse_file(CommandKind::Attach, arg)?]),
            CommandKind::Pick => {
                InputEvent::PickedFiles(vec![parse_file(CommandKind::Pick, arg)?])
            }
            CommandKind::Blur => InputEvent::Blur,
            CommandKind::ClickOutside => InputEvent::ClickOutside,
            CommandKind::Wait => {
                let ms = arg.ok_or(ParseCommandError::MissingArg(CommandKind::Wait))?;
                return Ok(Command::Wait(Duration::from_millis(parse_number(ms)?)));
            }
        };
        Ok(Command::Input(event))
    }
}

/// Parses a whole script
pub fn parse_script(script: &str) -> Result<Vec<Command>, ScriptError> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|(index, line)| {
            line.parse().map_err(|source| ScriptError {
                line: index + 1,
                source,
            })
        })
        .collect()
}
