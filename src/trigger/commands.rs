//! The fixed `/` command list
use crate::model::{HeadingLevel, ListStyle, NodeKind};

/// Which files a picker opened by a command offers
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileFilter {
    Images,
    Any,
}

/// What selecting a command does
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlashAction {
    /// Turn the current block into another kind
    Block(BlockTarget),
    /// Open the file picker and attach what is chosen
    PickFile(FileFilter),
}

/// Target shape of a block transform
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockTarget {
    Paragraph,
    Heading(HeadingLevel),
    List(ListStyle),
    Quote,
}

impl BlockTarget {
    pub fn kind(self) -> NodeKind {
        match self {
            Self::Paragraph => NodeKind::Paragraph,
            Self::Heading(level) => NodeKind::Heading { level },
            Self::List(style) => NodeKind::List { style },
            Self::Quote => NodeKind::Quote,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SlashCommand {
    pub label: &'static str,
    pub keywords: &'static [&'static str],
    pub action: SlashAction,
}

pub static SLASH_COMMANDS: &[SlashCommand] = &[
    SlashCommand {
        label: "Text",
        keywords: &["paragraph", "plain"],
        action: SlashAction::Block(BlockTarget::Paragraph),
    },
    SlashCommand {
        label: "Heading 1",
        keywords: &["h1", "title"],
        action: SlashAction::Block(BlockTarget::Heading(HeadingLevel::H1)),
    },
    SlashCommand {
        label: "Heading 2",
        keywords: &["h2", "subtitle"],
        action: SlashAction::Block(BlockTarget::Heading(HeadingLevel::H2)),
    },
    SlashCommand {
        label: "Heading 3",
        keywords: &["h3"],
        action: SlashAction::Block(BlockTarget::Heading(HeadingLevel::H3)),
    },
    SlashCommand {
        label: "Bulleted list",
        keywords: &["unordered", "bullet", "ul"],
        action: SlashAction::Block(BlockTarget::List(ListStyle::Unordered)),
    },
    SlashCommand {
        label: "Numbered list",
        keywords: &["ordered", "ol"],
        action: SlashAction::Block(BlockTarget::List(ListStyle::Ordered)),
    },
    SlashCommand {
        label: "Quote",
        keywords: &["blockquote", "citation"],
        action: SlashAction::Block(BlockTarget::Quote),
    },
    SlashCommand {
        label: "Image",
        keywords: &["picture", "photo", "upload"],
        action: SlashAction::PickFile(FileFilter::Images),
    },
    SlashCommand {
        label: "File",
        keywords: &["attachment", "document", "upload"],
        action: SlashAction::PickFile(FileFilter::Any),
    },
];

impl SlashCommand {
    pub(crate) fn search_keys(&self) -> Vec<&str> {
        let mut keys = vec![self.label];
        keys.extend_from_slice(self.keywords);
        keys
    }
}
