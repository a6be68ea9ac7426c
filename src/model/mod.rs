//! # The document model
//!
//! Node shapes for post bodies, comments and project descriptions. A node is a
//! [`NodeKind`] payload plus an ordered [`Fragment`] of children. Which kinds may
//! hold which is decided by [`NodeKind::accepts`] and checked on every
//! construction, so an owned [`Node`] is always well-formed.
pub mod attrs;
pub mod de;

pub use attrs::{
    AttachmentAttrs, AttachmentKind, HeadingLevel, ImageAttrs, InvalidHeadingLevel, ListStyle,
    Mention, MentionKind, TextFormat,
};

use displaydoc::Display;
use thiserror::Error;

/// Where a node may appear in the tree
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Category {
    /// The document root
    Root,
    /// Children of the root, quotes and list items
    Block,
    /// Children of paragraphs and headings
    Inline,
    /// Preserved raw JSON, allowed in any container
    Opaque,
}

/// The payload of a node, without its children
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Paragraph,
    Heading { level: HeadingLevel },
    Quote,
    List { style: ListStyle },
    ListItem,
    Text { text: String, format: TextFormat },
    Link { url: String },
    Mention(Mention),
    Emoji { name: String },
    Image(ImageAttrs),
    Attachment(AttachmentAttrs),
    /// A snapshot node this version can't interpret, kept verbatim
    Opaque(serde_json::Value),
}

impl NodeKind {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            format: TextFormat::PLAIN,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Self::Root => Category::Root,
            Self::Paragraph
            | Self::Heading { .. }
            | Self::Quote
            | Self::List { .. }
            | Self::ListItem
            | Self::Image(_)
            | Self::Attachment(_) => Category::Block,
            Self::Text { .. } | Self::Link { .. } | Self::Mention(_) | Self::Emoji { .. } => {
                Category::Inline
            }
            Self::Opaque(_) => Category::Opaque,
        }
    }

    /// The `type` discriminator used in snapshots
    pub fn type_name(&self) -> &str {
        match self {
            Self::Root => "root",
            Self::Paragraph => "paragraph",
            Self::Heading { .. } => "heading",
            Self::Quote => "quote",
            Self::List { .. } => "list",
            Self::ListItem => "list-item",
            Self::Text { .. } => "text",
            Self::Link { .. } => "link",
            Self::Mention(_) => "mention",
            Self::Emoji { .. } => "emoji",
            Self::Image(_) => "image",
            Self::Attachment(_) => "attachment",
            Self::Opaque(raw) => raw
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("unknown"),
        }
    }

    /// Atomic tokens are selected and deleted only as a whole
    pub fn is_atomic(&self) -> bool {
        matches!(self, Self::Mention(_) | Self::Emoji { .. })
    }

    /// Blocks whose children are inline content
    pub fn is_text_block(&self) -> bool {
        matches!(self, Self::Paragraph | Self::Heading { .. })
    }

    /// Whether this kind can ever hold children
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Root
                | Self::Paragraph
                | Self::Heading { .. }
                | Self::Quote
                | Self::List { .. }
                | Self::ListItem
                | Self::Link { .. }
        )
    }

    /// Whether `child` may be a direct child of a node of this kind
    pub fn accepts(&self, child: &NodeKind) -> bool {
        let category = child.category();
        if category == Category::Root {
            return false;
        }
        if category == Category::Opaque {
            return self.is_container();
        }
        match self {
            Self::Root | Self::Quote | Self::ListItem => category == Category::Block,
            Self::Paragraph | Self::Heading { .. } => category == Category::Inline,
            Self::List { .. } => matches!(child, Self::ListItem),
            Self::Link { .. } => matches!(child, Self::Text { .. }),
            _ => false,
        }
    }

    /// The textual stand-in of an atomic token
    pub fn token_text(&self) -> Option<String> {
        match self {
            Self::Mention(m) => Some(format!("@{}", m.display_name)),
            Self::Emoji { name } => Some(format!(":{}:", name)),
            _ => None,
        }
    }
}

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
/// A `{child}` node may not be placed inside a `{parent}` node
pub struct ShapeError {
    pub parent: String,
    pub child: String,
}

impl ShapeError {
    pub(crate) fn new(parent: &NodeKind, child: &NodeKind) -> Self {
        Self {
            parent: parent.type_name().to_owned(),
            child: child.type_name().to_owned(),
        }
    }
}

pub type Fragment = Vec<Node>;

/// An owned, well-formed subtree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    content: Fragment,
}

impl Node {
    /// Builds a node, checking that every child may sit under `kind`
    pub fn new(kind: NodeKind, content: Fragment) -> Result<Self, ShapeError> {
        if let Some(bad) = content.iter().find(|child| !kind.accepts(&child.kind)) {
            return Err(ShapeError::new(&kind, &bad.kind));
        }
        if kind.category() == Category::Root {
            return Err(ShapeError::new(&NodeKind::Root, &kind));
        }
        Ok(Self { kind, content })
    }

    fn leaf(kind: NodeKind) -> Self {
        Self {
            kind,
            content: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::leaf(NodeKind::text(text))
    }

    pub fn formatted(text: impl Into<String>, format: TextFormat) -> Self {
        Self::leaf(NodeKind::Text {
            text: text.into(),
            format,
        })
    }

    pub fn mention(mention: Mention) -> Self {
        Self::leaf(NodeKind::Mention(mention))
    }

    pub fn emoji(name: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Emoji { name: name.into() })
    }

    pub fn image(attrs: ImageAttrs) -> Self {
        Self::leaf(NodeKind::Image(attrs))
    }

    pub fn attachment(attrs: AttachmentAttrs) -> Self {
        Self::leaf(NodeKind::Attachment(attrs))
    }

    pub fn opaque(raw: serde_json::Value) -> Self {
        Self::leaf(NodeKind::Opaque(raw))
    }

    pub fn paragraph(content: Fragment) -> Result<Self, ShapeError> {
        Self::new(NodeKind::Paragraph, content)
    }

    pub fn heading(level: HeadingLevel, content: Fragment) -> Result<Self, ShapeError> {
        Self::new(NodeKind::Heading { level }, content)
    }

    pub fn quote(content: Fragment) -> Result<Self, ShapeError> {
        Self::new(NodeKind::Quote, content)
    }

    pub fn list(style: ListStyle, items: Fragment) -> Result<Self, ShapeError> {
        Self::new(NodeKind::List { style }, items)
    }

    pub fn list_item(content: Fragment) -> Result<Self, ShapeError> {
        Self::new(NodeKind::ListItem, content)
    }

    pub fn link(url: impl Into<String>, content: Fragment) -> Result<Self, ShapeError> {
        Self::new(NodeKind::Link { url: url.into() }, content)
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn content(&self) -> &[Node] {
        &self.content
    }

    pub fn into_parts(self) -> (NodeKind, Fragment) {
        (self.kind, self.content)
    }

    /// Preorder walk over this node and all of its descendants
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Depth-first preorder iterator, see [`Node::descendants`]
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Descendants<'a> {
    pub(crate) fn over(fragment: &'a [Node]) -> Self {
        Self {
            stack: fragment.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.stack.pop()?;
        self.stack.extend(node.content.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_only_in_text_blocks() {
        assert!(Node::paragraph(vec![Node::text("hi"), Node::emoji("tada")]).is_ok());
        let err = Node::paragraph(vec![Node::paragraph(vec![]).unwrap()]).unwrap_err();
        assert_eq!(err.to_string(), "A `paragraph` node may not be placed inside a `paragraph` node");
    }

    #[test]
    fn test_list_holds_items_only() {
        let item = Node::list_item(vec![Node::paragraph(vec![]).unwrap()]).unwrap();
        assert!(Node::list(ListStyle::Ordered, vec![item]).is_ok());
        assert!(Node::list(ListStyle::Ordered, vec![Node::text("x")]).is_err());
        assert!(Node::link("https://a.b", vec![Node::emoji("x")]).is_err());
    }

    #[test]
    fn test_opaque_fits_any_container() {
        let raw = serde_json::json!({"type": "poll", "version": 3});
        assert!(Node::paragraph(vec![Node::opaque(raw.clone())]).is_ok());
        assert!(Node::quote(vec![Node::opaque(raw)]).is_ok());
        assert!(!NodeKind::Emoji { name: "x".into() }.accepts(&NodeKind::text("y")));
    }

    #[test]
    fn test_descendants_preorder() {
        let doc = Node::quote(vec![
            Node::paragraph(vec![Node::text("a"), Node::text("b")]).unwrap(),
            Node::paragraph(vec![Node::text("c")]).unwrap(),
        ])
        .unwrap();
        let names: Vec<_> = doc
            .descendants()
            .filter_map(|n| match n.kind() {
                NodeKind::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
