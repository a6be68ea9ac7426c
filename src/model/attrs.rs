//! Payload attributes carried by the leaf and block nodes

use super::de;
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::ops::BitOr;
use thiserror::Error;

/// Inline formatting flags of a text node, stored as a bitmask
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextFormat(u8);

impl TextFormat {
    pub const PLAIN: Self = Self(0);
    pub const BOLD: Self = Self(1);
    pub const ITALIC: Self = Self(1 << 1);
    pub const STRIKETHROUGH: Self = Self(1 << 2);
    pub const UNDERLINE: Self = Self(1 << 3);
    pub const CODE: Self = Self(1 << 4);

    const ALL: u8 = 0b1_1111;

    /// Drops any bits that don't name a known flag
    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_plain(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for TextFormat {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
/// Heading level {0} is not in 1..=6
pub struct InvalidHeadingLevel(pub u8);

/// The level of a heading block
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const H1: Self = Self(1);
    pub const H2: Self = Self(2);
    pub const H3: Self = Self(3);

    pub fn new(level: u8) -> Result<Self, InvalidHeadingLevel> {
        match level {
            1..=6 => Ok(Self(level)),
            _ => Err(InvalidHeadingLevel(level)),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for HeadingLevel {
    type Error = InvalidHeadingLevel;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<HeadingLevel> for u8 {
    fn from(level: HeadingLevel) -> u8 {
        level.0
    }
}

/// Whether a list is numbered
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    Ordered,
    Unordered,
}

/// What a mention points at
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionKind {
    User,
    Project,
}

/// A reference to a user or project, rendered as `@displayName`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mention {
    #[serde(rename = "mentionKind")]
    pub kind: MentionKind,
    pub target_id: String,
    pub display_name: String,
}

impl Mention {
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: MentionKind::User,
            target_id: id.into(),
            display_name: name.into(),
        }
    }

    pub fn project(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: MentionKind::Project,
            target_id: id.into(),
            display_name: name.into(),
        }
    }
}

/// An inline image block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttrs {
    pub src: String,
    #[serde(default, deserialize_with = "de::deserialize_or_default")]
    pub alt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// How an attachment is presented
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
    File,
    Figma,
    Loom,
}

impl AttachmentKind {
    /// Kinds that can stand in as a preview thumbnail
    pub fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }
}

/// An uploaded file or embedded link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentAttrs {
    pub kind: AttachmentKind,
    pub url: String,
    #[serde(default, deserialize_with = "de::deserialize_or_default")]
    pub filename: String,
    #[serde(default, deserialize_with = "de::deserialize_or_default")]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_flags_combine() {
        let format = TextFormat::BOLD | TextFormat::CODE;
        assert!(format.contains(TextFormat::BOLD));
        assert!(!format.contains(TextFormat::ITALIC));
        assert_eq!(format.bits(), 17);
        assert_eq!(TextFormat::from_bits_truncate(0xff).bits(), 31);
    }

    #[test]
    fn test_heading_level_range() {
        assert!(HeadingLevel::new(0).is_err());
        assert_eq!(HeadingLevel::new(6).map(HeadingLevel::get), Ok(6));
        assert!(serde_json::from_str::<HeadingLevel>("7").is_err());
    }

    #[test]
    fn test_null_string() {
        assert_eq!(
            serde_json::from_str::<ImageAttrs>(r#"{"src": "", "altText": null}"#).unwrap(),
            ImageAttrs {
                src: String::new(),
                alt_text: String::new(),
                width: None,
                height: None,
            }
        );
    }
}
