//! Input events delivered by the host
use crate::tree::Cursor;
use crate::upload::PendingFile;
use displaydoc::Display;
use std::str::FromStr;
use thiserror::Error;

/// A key with editing meaning
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// enter
    Enter,
    /// tab
    Tab,
    /// escape
    Escape,
    /// backspace
    Backspace,
    /// delete
    Delete,
    /// left
    Left,
    /// right
    Right,
    /// up
    Up,
    /// down
    Down,
}

/// The key `{0}` is not known
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enter" => Ok(Self::Enter),
            "tab" => Ok(Self::Tab),
            "escape" | "esc" => Ok(Self::Escape),
            "backspace" => Ok(Self::Backspace),
            "delete" | "del" => Ok(Self::Delete),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            _ => Err(UnknownKey(s.to_owned())),
        }
    }
}

/// Something the user did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Typed characters
    Text(String),
    Key(Key),
    /// Pasted plain text or a link
    Paste(String),
    /// Files dropped or pasted onto the editor
    Drop(Vec<PendingFile>),
    /// Files chosen in the file picker
    PickedFiles(Vec<PendingFile>),
    /// The caret was placed somewhere else
    MoveCursor(Cursor),
    /// Focus left the editor
    Blur,
    /// A click outside the suggestion menu
    ClickOutside,
}
