//! # The live document tree
//!
//! An arena of nodes addressed by stable [`NodeKey`]s. Every slot knows its
//! parent and the ordered keys of its children, so asynchronous code can hold a
//! key across edits and later ask whether it still exists and where it is.
//! All structural changes go through [`NodeKind::accepts`].
mod edit;

pub use edit::Cursor;

use crate::model::{Category, Fragment, Node, NodeKind, ShapeError};
use crate::util::{make_id, Counter};
use displaydoc::Display;
use std::collections::HashMap;
use thiserror::Error;

make_id!(
    /// Stable identity of a node in a [`Document`]
    NodeKey,
    "node#{0}"
);

/// Error when editing the tree
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No node {0} in this document
    UnknownKey(NodeKey),
    /// {0}
    Shape(#[from] ShapeError),
    /// The root node can't be removed or moved
    RootImmutable,
    /// Index {index} is out of range for {parent}
    IndexOutOfRange { parent: NodeKey, index: usize },
    /// Offset {offset} is out of range for {node}
    OffsetOutOfRange { node: NodeKey, offset: usize },
    /// {0} is not a text node
    NotText(NodeKey),
    /// Can't move {0} into its own subtree
    Cycle(NodeKey),
}

#[derive(Debug, Clone)]
struct Slot {
    kind: NodeKind,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

/// The document being edited
#[derive(Debug)]
pub struct Document {
    root: NodeKey,
    slots: HashMap<NodeKey, Slot>,
    keys: Counter<NodeKey>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    fn bare() -> Self {
        let mut keys = Counter::default();
        let root = keys.next();
        let mut slots = HashMap::new();
        slots.insert(
            root,
            Slot {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            },
        );
        Self { root, slots, keys }
    }

    /// A document holding a single empty paragraph
    pub fn new() -> Self {
        let mut doc = Self::bare();
        let root = doc.root;
        let _ = doc.append(root, NodeKind::Paragraph);
        doc
    }

    /// Builds a document whose root holds exactly `blocks`
    pub fn from_fragment(blocks: &[Node]) -> Result<Self, TreeError> {
        let mut doc = Self::bare();
        let root = doc.root;
        for block in blocks {
            doc.append_node(root, block)?;
        }
        Ok(doc)
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.slots.contains_key(&key)
    }

    /// Number of live nodes, the root included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.len() == 1
    }

    fn slot(&self, key: NodeKey) -> Result<&Slot, TreeError> {
        self.slots.get(&key).ok_or(TreeError::UnknownKey(key))
    }

    fn slot_mut(&mut self, key: NodeKey) -> Result<&mut Slot, TreeError> {
        self.slots.get_mut(&key).ok_or(TreeError::UnknownKey(key))
    }

    pub fn get(&self, key: NodeKey) -> Option<&NodeKind> {
        self.slots.get(&key).map(|slot| &slot.kind)
    }

    pub fn kind(&self, key: NodeKey) -> Result<&NodeKind, TreeError> {
        self.slot(key).map(|slot| &slot.kind)
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.slots.get(&key).and_then(|slot| slot.parent)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.slots
            .get(&key)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    /// The parent of `key` and the index of `key` among its siblings
    pub fn position(&self, key: NodeKey) -> Option<(NodeKey, usize)> {
        let parent = self.parent(key)?;
        let index = self.children(parent).iter().position(|&c| c == key)?;
        Some((parent, index))
    }

    pub fn next_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let (parent, index) = self.position(key)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn prev_sibling(&self, key: NodeKey) -> Option<NodeKey> {
        let (parent, index) = self.position(key)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// The text of a text node
    pub fn text(&self, key: NodeKey) -> Option<&str> {
        match self.get(key)? {
            NodeKind::Text { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The closest ancestor-or-self that is a block
    pub fn enclosing_block(&self, key: NodeKey) -> Option<NodeKey> {
        let mut current = key;
        loop {
            match self.get(current)?.category() {
                Category::Block => return Some(current),
                Category::Root => return None,
                _ => current = self.parent(current)?,
            }
        }
    }

    /// The closest ancestor-or-self that is a paragraph or heading
    pub fn enclosing_text_block(&self, key: NodeKey) -> Option<NodeKey> {
        let mut current = key;
        loop {
            if self.get(current)?.is_text_block() {
                return Some(current);
            }
            current = self.parent(current)?;
        }
    }

    pub fn is_ancestor(&self, ancestor: NodeKey, mut key: NodeKey) -> bool {
        loop {
            if key == ancestor {
                return true;
            }
            match self.parent(key) {
                Some(parent) => key = parent,
                None => return false,
            }
        }
    }

    /// Inserts a fresh node of `kind` as the `index`th child of `parent`
    pub fn insert(
        &mut self,
        parent: NodeKey,
        index: usize,
        kind: NodeKind,
    ) -> Result<NodeKey, TreeError> {
        let parent_slot = self.slot(parent)?;
        if !parent_slot.kind.accepts(&kind) {
            return Err(ShapeError::new(&parent_slot.kind, &kind).into());
        }
        if index > parent_slot.children.len() {
            return Err(TreeError::IndexOutOfRange { parent, index });
        }
        let key = self.keys.next();
        self.slots.insert(
            key,
            Slot {
                kind,
                parent: Some(parent),
                children: Vec::new(),
            },
        );
        self.slot_mut(parent)?.children.insert(index, key);
        Ok(key)
    }

    pub fn append(&mut self, parent: NodeKey, kind: NodeKind) -> Result<NodeKey, TreeError> {
        let index = self.slot(parent)?.children.len();
        self.insert(parent, index, kind)
    }

    pub fn insert_after(&mut self, sibling: NodeKey, kind: NodeKind) -> Result<NodeKey, TreeError> {
        let (parent, index) = self.sibling_position(sibling)?;
        self.insert(parent, index + 1, kind)
    }

    pub fn insert_before(&mut self, sibling: NodeKey, kind: NodeKind) -> Result<NodeKey, TreeError> {
        let (parent, index) = self.sibling_position(sibling)?;
        self.insert(parent, index, kind)
    }

    fn sibling_position(&self, sibling: NodeKey) -> Result<(NodeKey, usize), TreeError> {
        match self.position(sibling) {
            Some(found) => Ok(found),
            None if self.contains(sibling) => Err(TreeError::RootImmutable),
            None => Err(TreeError::UnknownKey(sibling)),
        }
    }

    /// Inserts a whole owned subtree, returning the key of its top node
    pub fn insert_node(
        &mut self,
        parent: NodeKey,
        index: usize,
        node: &Node,
    ) -> Result<NodeKey, TreeError> {
        let key = self.insert(parent, index, node.kind().clone())?;
        for child in node.content() {
            self.append_node(key, child)?;
        }
        Ok(key)
    }

    pub fn append_node(&mut self, parent: NodeKey, node: &Node) -> Result<NodeKey, TreeError> {
        let index = self.slot(parent)?.children.len();
        self.insert_node(parent, index, node)
    }

    /// Detaches `key` and its subtree, returning it as an owned node
    ///
    /// The former parent stays valid: containers may be empty.
    pub fn remove(&mut self, key: NodeKey) -> Result<Node, TreeError> {
        if key == self.root {
            return Err(TreeError::RootImmutable);
        }
        let (parent, index) = self.position(key).ok_or(TreeError::UnknownKey(key))?;
        self.slot_mut(parent)?.children.remove(index);
        self.take_subtree(key)
    }

    fn take_subtree(&mut self, key: NodeKey) -> Result<Node, TreeError> {
        let slot = self.slots.remove(&key).ok_or(TreeError::UnknownKey(key))?;
        let content = slot
            .children
            .into_iter()
            .map(|child| self.take_subtree(child))
            .collect::<Result<Fragment, _>>()?;
        Ok(Node::new(slot.kind, content)?)
    }

    /// Moves `key` (with its subtree) to be the `index`th child of `parent`
    pub fn move_node(
        &mut self,
        key: NodeKey,
        parent: NodeKey,
        index: usize,
    ) -> Result<(), TreeError> {
        if key == self.root {
            return Err(TreeError::RootImmutable);
        }
        if self.is_ancestor(key, parent) {
            return Err(TreeError::Cycle(key));
        }
        let kind = &self.slot(key)?.kind;
        let parent_kind = &self.slot(parent)?.kind;
        if !parent_kind.accepts(kind) {
            return Err(ShapeError::new(parent_kind, kind).into());
        }
        let (old_parent, old_index) = self.position(key).ok_or(TreeError::UnknownKey(key))?;
        let mut index = index;
        if old_parent == parent && old_index < index {
            index -= 1;
        }
        if index > self.children(parent).len() - usize::from(old_parent == parent) {
            return Err(TreeError::IndexOutOfRange { parent, index });
        }
        self.slot_mut(old_parent)?.children.remove(old_index);
        self.slot_mut(parent)?.children.insert(index, key);
        self.slot_mut(key)?.parent = Some(parent);
        Ok(())
    }

    /// Replaces the payload of `key`, keeping its identity and children
    pub fn set_kind(&mut self, key: NodeKey, kind: NodeKind) -> Result<NodeKind, TreeError> {
        if key == self.root {
            return Err(TreeError::RootImmutable);
        }
        let slot = self.slot(key)?;
        if let Some(parent) = slot.parent {
            let parent_kind = &self.slot(parent)?.kind;
            if !parent_kind.accepts(&kind) {
                return Err(ShapeError::new(parent_kind, &kind).into());
            }
        }
        for child in &slot.children {
            let child_kind = &self.slot(*child)?.kind;
            if !kind.accepts(child_kind) {
                return Err(ShapeError::new(&kind, child_kind).into());
            }
        }
        Ok(std::mem::replace(&mut self.slot_mut(key)?.kind, kind))
    }

    /// Replaces the content of a text node
    pub fn set_text(&mut self, key: NodeKey, value: String) -> Result<(), TreeError> {
        match &mut self.slot_mut(key)?.kind {
            NodeKind::Text { text, .. } => {
                *text = value;
                Ok(())
            }
            _ => Err(TreeError::NotText(key)),
        }
    }

    /// Keys of `key` and all its descendants, in preorder
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(next) = stack.pop() {
            if !self.contains(next) {
                continue;
            }
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// An owned copy of the subtree at `key`
    pub fn to_node(&self, key: NodeKey) -> Result<Node, TreeError> {
        let slot = self.slot(key)?;
        let content = slot
            .children
            .iter()
            .map(|&child| self.to_node(child))
            .collect::<Result<Fragment, _>>()?;
        Ok(Node::new(slot.kind.clone(), content)?)
    }

    /// Owned copies of the root's blocks
    pub fn to_fragment(&self) -> Fragment {
        self.children(self.root)
            .iter()
            .filter_map(|&key| self.to_node(key).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ListStyle, Mention};
    use pretty_assertions::assert_eq;

    fn para(doc: &mut Document, text: &str) -> (NodeKey, NodeKey) {
        let root = doc.root();
        let p = doc.append(root, NodeKind::Paragraph).unwrap();
        let t = doc.append(p, NodeKind::text(text)).unwrap();
        (p, t)
    }

    #[test]
    fn test_new_has_one_empty_paragraph() {
        let doc = Document::new();
        let blocks = doc.children(doc.root());
        assert_eq!(blocks.len(), 1);
        assert_eq!(doc.get(blocks[0]), Some(&NodeKind::Paragraph));
        assert!(doc.children(blocks[0]).is_empty());
    }

    #[test]
    fn test_insert_rejects_inline_at_root() {
        let mut doc = Document::from_fragment(&[]).unwrap();
        let root = doc.root();
        let err = doc.append(root, NodeKind::text("x")).unwrap_err();
        assert!(matches!(err, TreeError::Shape(_)));
        assert!(doc.is_empty());
    }

    #[test]
    fn test_keys_are_stable_across_edits() {
        let mut doc = Document::from_fragment(&[]).unwrap();
        let (p1, _) = para(&mut doc, "one");
        let (p2, t2) = para(&mut doc, "two");
        let root = doc.root();
        doc.insert(root, 0, NodeKind::Quote).unwrap();
        assert_eq!(doc.position(p2), Some((root, 2)));
        assert_eq!(doc.text(t2), Some("two"));
        doc.remove(p1).unwrap();
        assert_eq!(doc.position(p2), Some((root, 1)));
        assert!(!doc.contains(p1));
    }

    #[test]
    fn test_remove_last_inline_leaves_empty_paragraph() {
        let mut doc = Document::from_fragment(&[]).unwrap();
        let (p, t) = para(&mut doc, "only");
        let removed = doc.remove(t).unwrap();
        assert_eq!(removed, Node::text("only"));
        assert_eq!(doc.get(p), Some(&NodeKind::Paragraph));
        assert!(doc.children(p).is_empty());
        assert_eq!(doc.to_fragment(), vec![Node::paragraph(vec![]).unwrap()]);
    }

    #[test]
    fn test_remove_root_is_rejected() {
        let mut doc = Document::new();
        let root = doc.root();
        assert_eq!(doc.remove(root), Err(TreeError::RootImmutable));
    }

    #[test]
    fn test_remove_drops_whole_subtree() {
        let mut doc = Document::from_fragment(&[]).unwrap();
        let root = doc.root();
        let list = doc
            .append(root, NodeKind::List { style: ListStyle::Unordered })
            .unwrap();
        let item = doc.append(list, NodeKind::ListItem).unwrap();
        let p = doc.append(item, NodeKind::Paragraph).unwrap();
        let m = doc
            .append(p, NodeKind::Mention(Mention::user("u1", "Jane")))
            .unwrap();
        doc.remove(list).unwrap();
        assert!(!doc.contains(item) && !doc.contains(p) && !doc.contains(m));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_set_kind_checks_children() {
        let mut doc = Document::from_fragment(&[]).unwrap();
        let (p, _) = para(&mut doc, "title");
        let level = crate::model::HeadingLevel::H2;
        doc.set_kind(p, NodeKind::Heading { level }).unwrap();
        assert_eq!(doc.get(p), Some(&NodeKind::Heading { level }));
        assert!(doc.set_kind(p, NodeKind::Quote).is_err());
    }

    #[test]
    fn test_move_node_into_wrapper() {
        let mut doc = Document::from_fragment(&[]).unwrap();
        let (p, _) = para(&mut doc, "quoted");
        let root = doc.root();
        let quote = doc.insert(root, 0, NodeKind::Quote).unwrap();
        doc.move_node(p, quote, 0).unwrap();
        assert_eq!(doc.position(p), Some((quote, 0)));
        assert_eq!(doc.children(root), &[quote]);
        assert_eq!(doc.move_node(quote, p, 0), Err(TreeError::Cycle(quote)));
    }
}
