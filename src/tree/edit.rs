//! Cursor-based editing primitives
//!
//! A [`Cursor`] either sits inside a text node (offset counted in chars) or at a
//! child boundary of a container (offset is a child index). Atomic tokens are
//! never entered: a cursor next to a mention is always a boundary cursor or a
//! position in a neighbouring text node.
use super::{Document, NodeKey, TreeError};
use crate::model::NodeKind;
use std::ops::Range;

/// A caret position in a [`Document`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub node: NodeKey,
    pub offset: usize,
}

impl Cursor {
    pub fn new(node: NodeKey, offset: usize) -> Self {
        Self { node, offset }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_offset(s: &str, chars: usize) -> Option<usize> {
    if chars == char_len(s) {
        return Some(s.len());
    }
    s.char_indices().nth(chars).map(|(i, _)| i)
}

fn split_chars(s: &str, at: usize) -> (String, String) {
    let idx = byte_offset(s, at).unwrap_or(s.len());
    (s[..idx].to_owned(), s[idx..].to_owned())
}

impl Document {
    fn text_parts(&self, key: NodeKey) -> Result<(String, crate::model::TextFormat), TreeError> {
        match self.kind(key)? {
            NodeKind::Text { text, format } => Ok((text.clone(), *format)),
            _ => Err(TreeError::NotText(key)),
        }
    }

    /// Checks that `cursor` points at a live node and a valid offset
    pub fn check_cursor(&self, cursor: Cursor) -> Result<(), TreeError> {
        let limit = match self.kind(cursor.node)? {
            NodeKind::Text { text, .. } => char_len(text),
            kind if kind.is_container() => self.children(cursor.node).len(),
            _ => 0,
        };
        if cursor.offset > limit {
            return Err(TreeError::OffsetOutOfRange {
                node: cursor.node,
                offset: cursor.offset,
            });
        }
        Ok(())
    }

    /// The container and child index a cursor sits at
    ///
    /// Positions inside a text node report the text node's own index, or the
    /// index after it when the cursor is at its end.
    pub fn boundary(&self, cursor: Cursor) -> Option<(NodeKey, usize)> {
        match self.get(cursor.node)? {
            NodeKind::Text { text, .. } => {
                let (parent, index) = self.position(cursor.node)?;
                if cursor.offset >= char_len(text) && cursor.offset > 0 {
                    Some((parent, index + 1))
                } else {
                    Some((parent, index))
                }
            }
            _ => Some((cursor.node, cursor.offset)),
        }
    }

    /// Prefers a position inside an adjacent text node over a bare boundary
    pub fn normalize(&self, cursor: Cursor) -> Cursor {
        if let Some(NodeKind::Text { .. }) = self.get(cursor.node) {
            return cursor;
        }
        let children = self.children(cursor.node);
        if let Some(&prev) = cursor.offset.checked_sub(1).and_then(|i| children.get(i)) {
            if let Some(text) = self.text(prev) {
                return Cursor::new(prev, char_len(text));
            }
        }
        if let Some(&next) = children.get(cursor.offset) {
            if self.text(next).is_some() {
                return Cursor::new(next, 0);
            }
        }
        cursor
    }

    /// Caret at the start of a block's inline content
    pub fn start_of(&self, block: NodeKey) -> Cursor {
        self.normalize(Cursor::new(block, 0))
    }

    /// Caret at the end of a block's inline content
    pub fn end_of(&self, block: NodeKey) -> Cursor {
        self.normalize(Cursor::new(block, self.children(block).len()))
    }

    /// Whether nothing follows the cursor in its text block
    pub fn is_at_block_end(&self, at: Cursor) -> bool {
        let block = match self.enclosing_text_block(at.node) {
            Some(block) => block,
            None => return false,
        };
        let (mut container, mut index) = match self.boundary(at) {
            Some(boundary) => boundary,
            None => return false,
        };
        loop {
            if index < self.children(container).len() {
                return false;
            }
            if container == block {
                return true;
            }
            match self.position(container) {
                Some((parent, i)) => {
                    container = parent;
                    index = i + 1;
                }
                None => return false,
            }
        }
    }

    /// The part of the cursor's text node before the caret
    pub fn text_before(&self, cursor: Cursor) -> Option<&str> {
        let text = self.text(cursor.node)?;
        byte_offset(text, cursor.offset).map(|idx| &text[..idx])
    }

    /// Inserts plain text at the cursor, returning the caret after it
    pub fn insert_text(&mut self, at: Cursor, value: &str) -> Result<Cursor, TreeError> {
        self.check_cursor(at)?;
        if value.is_empty() {
            return Ok(at);
        }
        let at = self.normalize(at);
        match self.kind(at.node)? {
            NodeKind::Text { text, .. } => {
                let mut text = text.clone();
                let idx = byte_offset(&text, at.offset).unwrap_or(text.len());
                text.insert_str(idx, value);
                self.set_text(at.node, text)?;
                Ok(Cursor::new(at.node, at.offset + char_len(value)))
            }
            kind if kind.is_text_block() || matches!(kind, NodeKind::Link { .. }) => {
                let key = self.insert(at.node, at.offset, NodeKind::text(value))?;
                Ok(Cursor::new(key, char_len(value)))
            }
            _ => Err(TreeError::NotText(at.node)),
        }
    }

    /// Removes a char range of a text node; an emptied node is removed
    pub fn remove_text_range(
        &mut self,
        key: NodeKey,
        range: Range<usize>,
    ) -> Result<Cursor, TreeError> {
        self.replace_text_range(key, range, "")
    }

    /// Replaces a char range of a text node with plain text
    ///
    /// A text node left empty is removed and the caret falls back to the
    /// boundary where it was.
    pub fn replace_text_range(
        &mut self,
        key: NodeKey,
        range: Range<usize>,
        replacement: &str,
    ) -> Result<Cursor, TreeError> {
        let (text, _) = self.text_parts(key)?;
        let (start, end) = match (byte_offset(&text, range.start), byte_offset(&text, range.end)) {
            (Some(start), Some(end)) if start <= end => (start, end),
            _ => {
                return Err(TreeError::OffsetOutOfRange {
                    node: key,
                    offset: range.end,
                })
            }
        };
        let mut rest = text[..start].to_owned();
        rest.push_str(replacement);
        rest.push_str(&text[end..]);
        if rest.is_empty() {
            let (parent, index) = self.position(key).ok_or(TreeError::UnknownKey(key))?;
            self.remove(key)?;
            return Ok(self.normalize(Cursor::new(parent, index)));
        }
        self.set_text(key, rest)?;
        Ok(Cursor::new(key, range.start + char_len(replacement)))
    }

    /// Turns a text block into another block kind, keeping its inline content
    ///
    /// Paragraph and heading kinds retag the block in place. A quote or list
    /// kind wraps the block (retagged as a paragraph) in a new quote or in a
    /// new single-item list; a block already inside a list item only has the
    /// list's style changed. Returns the key of the block holding the text.
    pub fn set_block_kind(&mut self, block: NodeKey, kind: NodeKind) -> Result<NodeKey, TreeError> {
        if !self.kind(block)?.is_text_block() {
            return Err(TreeError::NotText(block));
        }
        match kind {
            NodeKind::Paragraph | NodeKind::Heading { .. } => {
                self.set_kind(block, kind)?;
            }
            NodeKind::Quote => {
                self.set_kind(block, NodeKind::Paragraph)?;
                let quote = self.insert_before(block, NodeKind::Quote)?;
                self.move_node(block, quote, 0)?;
            }
            NodeKind::List { .. } => {
                self.set_kind(block, NodeKind::Paragraph)?;
                let item = self.parent(block).filter(|&item| {
                    matches!(self.get(item), Some(NodeKind::ListItem))
                });
                match item.and_then(|item| self.parent(item)) {
                    Some(list) => {
                        self.set_kind(list, kind)?;
                    }
                    None => {
                        let list = self.insert_before(block, kind)?;
                        let item = self.append(list, NodeKind::ListItem)?;
                        self.move_node(block, item, 0)?;
                    }
                }
            }
            other => {
                let parent = self.parent(block).ok_or(TreeError::RootImmutable)?;
                return Err(crate::model::ShapeError::new(self.kind(parent)?, &other).into());
            }
        }
        Ok(block)
    }

    /// Replaces a char range of a text node with an atomic token
    ///
    /// The token is followed by a single space and the caret lands after it.
    pub fn replace_with_token(
        &mut self,
        key: NodeKey,
        range: Range<usize>,
        token: NodeKind,
    ) -> Result<Cursor, TreeError> {
        let (text, format) = self.text_parts(key)?;
        let (parent, index) = self.position(key).ok_or(TreeError::UnknownKey(key))?;
        let parent_kind = self.kind(parent)?;
        if !parent_kind.accepts(&token) {
            return Err(crate::model::ShapeError::new(parent_kind, &token).into());
        }
        if range.start > range.end || range.end > char_len(&text) {
            return Err(TreeError::OffsetOutOfRange {
                node: key,
                offset: range.end,
            });
        }
        let (before, rest) = split_chars(&text, range.start);
        let (_, after) = split_chars(&rest, range.end - range.start);

        let token_index = if before.is_empty() {
            self.remove(key)?;
            index
        } else {
            self.set_text(key, before)?;
            index + 1
        };
        self.insert(parent, token_index, token)?;
        let trailing = self.insert(
            parent,
            token_index + 1,
            NodeKind::Text {
                text: format!(" {}", after),
                format,
            },
        )?;
        Ok(Cursor::new(trailing, 1))
    }

    /// Backspace
    pub fn delete_backward(&mut self, at: Cursor) -> Result<Cursor, TreeError> {
        self.check_cursor(at)?;
        if self.text(at.node).is_some() && at.offset > 0 {
            return self.remove_text_range(at.node, at.offset - 1..at.offset);
        }
        let (container, index) = self.boundary(at).ok_or(TreeError::UnknownKey(at.node))?;
        if index > 0 {
            let prev = self.children(container)[index - 1];
            return match self.kind(prev)? {
                NodeKind::Text { text, .. } => {
                    let len = char_len(text);
                    self.remove_text_range(prev, len.saturating_sub(1)..len)
                }
                NodeKind::Link { .. } => {
                    let inner = self.children(prev).len();
                    let cursor = self.delete_backward(Cursor::new(prev, inner))?;
                    self.prune_empty_link(prev, cursor)
                }
                _ => {
                    self.remove(prev)?;
                    Ok(self.normalize(Cursor::new(container, index - 1)))
                }
            };
        }
        match self.kind(container)? {
            NodeKind::Link { .. } => {
                let (parent, link_index) = self
                    .position(container)
                    .ok_or(TreeError::UnknownKey(container))?;
                self.delete_backward(Cursor::new(parent, link_index))
            }
            kind if kind.is_text_block() => self.join_with_previous(container, at),
            _ => Ok(at),
        }
    }

    fn prune_empty_link(&mut self, link: NodeKey, cursor: Cursor) -> Result<Cursor, TreeError> {
        if !self.children(link).is_empty() {
            return Ok(cursor);
        }
        let (parent, index) = self.position(link).ok_or(TreeError::UnknownKey(link))?;
        self.remove(link)?;
        Ok(self.normalize(Cursor::new(parent, index)))
    }

    fn join_with_previous(&mut self, block: NodeKey, at: Cursor) -> Result<Cursor, TreeError> {
        let prev = match self.prev_sibling(block) {
            Some(prev) => prev,
            None => return Ok(at),
        };
        match self.kind(prev)? {
            kind if kind.is_text_block() => {
                let join_at = self.children(prev).len();
                for child in self.children(block).to_vec() {
                    let end = self.children(prev).len();
                    self.move_node(child, prev, end)?;
                }
                self.remove(block)?;
                Ok(self.normalize(Cursor::new(prev, join_at)))
            }
            NodeKind::Image(_) | NodeKind::Attachment(_) | NodeKind::Opaque(_) => {
                self.remove(prev)?;
                Ok(at)
            }
            _ => Ok(at),
        }
    }

    /// Delete
    pub fn delete_forward(&mut self, at: Cursor) -> Result<Cursor, TreeError> {
        self.check_cursor(at)?;
        if let Some(text) = self.text(at.node) {
            if at.offset < char_len(text) {
                return self.remove_text_range(at.node, at.offset..at.offset + 1);
            }
        }
        let (container, index) = match self.get(at.node) {
            Some(NodeKind::Text { .. }) => {
                let (parent, index) = self.position(at.node).ok_or(TreeError::UnknownKey(at.node))?;
                (parent, index + 1)
            }
            Some(_) => (at.node, at.offset),
            None => return Err(TreeError::UnknownKey(at.node)),
        };
        if let Some(&next) = self.children(container).get(index) {
            return match self.kind(next)? {
                NodeKind::Text { .. } => {
                    self.remove_text_range(next, 0..1)?;
                    Ok(self.normalize(Cursor::new(container, index)))
                }
                NodeKind::Link { .. } => {
                    let cursor = self.delete_forward(Cursor::new(next, 0))?;
                    self.prune_empty_link(next, cursor)
                }
                _ => {
                    self.remove(next)?;
                    Ok(self.normalize(Cursor::new(container, index)))
                }
            };
        }
        if !self.kind(container)?.is_text_block() {
            return Ok(at);
        }
        let next = match self.next_sibling(container) {
            Some(next) => next,
            None => return Ok(at),
        };
        match self.kind(next)? {
            kind if kind.is_text_block() => {
                for child in self.children(next).to_vec() {
                    let end = self.children(container).len();
                    self.move_node(child, container, end)?;
                }
                self.remove(next)?;
                Ok(self.normalize(Cursor::new(container, index)))
            }
            NodeKind::Image(_) | NodeKind::Attachment(_) | NodeKind::Opaque(_) => {
                self.remove(next)?;
                Ok(at)
            }
            _ => Ok(at),
        }
    }

    /// Enter: splits the text block at the cursor
    ///
    /// The tail becomes a new paragraph; inside a list item it becomes a new
    /// list item. Returns the caret at the start of the new block.
    pub fn split_block(&mut self, at: Cursor) -> Result<Cursor, TreeError> {
        self.check_cursor(at)?;
        let block = self
            .enclosing_text_block(at.node)
            .ok_or(TreeError::NotText(at.node))?;

        // child index of `block` where the tail starts
        let mut child = at.node;
        let mut split = if child == block {
            at.offset
        } else {
            loop {
                let (parent, index) = self.position(child).ok_or(TreeError::UnknownKey(child))?;
                if parent == block {
                    break index;
                }
                child = parent;
            }
        };
        if child != block {
            if let NodeKind::Text { text, format } = self.kind(child)?.clone() {
                if at.node == child && at.offset > 0 {
                    if at.offset < char_len(&text) {
                        let (head, tail) = split_chars(&text, at.offset);
                        self.set_text(child, head)?;
                        self.insert(block, split + 1, NodeKind::Text { text: tail, format })?;
                    }
                    split += 1;
                }
            } else if at.offset > 0 {
                split += 1;
            }
        }

        let new_block = match self.parent(block) {
            Some(item) if matches!(self.get(item), Some(NodeKind::ListItem)) => {
                let new_item = self.insert_after(item, NodeKind::ListItem)?;
                self.append(new_item, NodeKind::Paragraph)?
            }
            _ => self.insert_after(block, NodeKind::Paragraph)?,
        };
        for tail in self.children(block)[split..].to_vec() {
            let end = self.children(new_block).len();
            self.move_node(tail, new_block, end)?;
        }
        Ok(self.start_of(new_block))
    }

    /// Left arrow
    pub fn move_left(&self, at: Cursor) -> Cursor {
        if self.text(at.node).is_some() && at.offset > 0 {
            return Cursor::new(at.node, at.offset - 1);
        }
        match self.boundary(at) {
            Some((container, index)) if index > 0 => {
                let prev = self.children(container)[index - 1];
                match self.text(prev) {
                    Some(text) => Cursor::new(prev, char_len(text).saturating_sub(1)),
                    None => Cursor::new(container, index - 1),
                }
            }
            _ => at,
        }
    }

    /// Right arrow
    pub fn move_right(&self, at: Cursor) -> Cursor {
        if let Some(text) = self.text(at.node) {
            if at.offset < char_len(text) {
                return Cursor::new(at.node, at.offset + 1);
            }
        }
        let (container, index) = match self.get(at.node) {
            Some(NodeKind::Text { .. }) => match self.position(at.node) {
                Some((parent, index)) => (parent, index + 1),
                None => return at,
            },
            Some(_) => (at.node, at.offset),
            None => return at,
        };
        match self.children(container).get(index) {
            Some(&next) => match self.text(next) {
                Some(text) if !text.is_empty() => Cursor::new(next, 1),
                _ => Cursor::new(container, index + 1),
            },
            None => at,
        }
    }
}
