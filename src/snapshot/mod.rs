//! # Snapshots
//!
//! The portable JSON form of a document, and the only form that is ever
//! stored or sent anywhere:
//!
//! ```json
//! { "root": { "type": "root", "version": 1, "children": [
//!     { "type": "paragraph", "version": 1, "children": [
//!         { "type": "text", "version": 1, "text": "Hello", "format": 0 }
//!     ] }
//! ] } }
//! ```
//!
//! Decoding never gives up on a document because of one bad node. A node whose
//! `type` is unknown, whose payload doesn't parse, or which sits under a parent
//! that may not hold it is kept as [`NodeKind::Opaque`] and written back out
//! unchanged, so older clients don't destroy content written by newer ones.
mod registry;

pub(crate) use registry::plain_text;

use crate::model::{Descendants, Fragment, Node, NodeKind};
use crate::tree::{Document, TreeError};
use displaydoc::Display;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

/// Version written for the root object
pub const ROOT_VERSION: u32 = 1;

/// Error when a document can't be decoded at all
#[derive(Debug, Display, Error)]
pub enum SnapshotError {
    /// Snapshot is not valid JSON: {0}
    Json(#[from] serde_json::Error),
    /// Snapshot has no root object
    MissingRoot,
    /// Root node has type {0:?} instead of "root"
    RootType(String),
    /// Snapshot could not be loaded into a document: {0}
    Tree(#[from] TreeError),
}

/// A decoded, well-formed snapshot
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    blocks: Fragment,
}

impl Snapshot {
    /// A snapshot of the given top-level blocks
    pub fn new(blocks: Fragment) -> Result<Self, TreeError> {
        let root = NodeKind::Root;
        if let Some(bad) = blocks.iter().find(|b| !root.accepts(b.kind())) {
            return Err(crate::model::ShapeError::new(&root, bad.kind()).into());
        }
        Ok(Self { blocks })
    }

    /// Encodes the live tree
    pub fn from_document(doc: &Document) -> Self {
        Self {
            blocks: doc.to_fragment(),
        }
    }

    /// Rebuilds a live tree with fresh node keys
    pub fn to_document(&self) -> Result<Document, TreeError> {
        Document::from_fragment(&self.blocks)
    }

    pub fn blocks(&self) -> &[Node] {
        &self.blocks
    }

    /// Preorder walk over every node below the root
    pub fn walk(&self) -> Descendants<'_> {
        Descendants::over(&self.blocks)
    }

    pub fn to_value(&self) -> Value {
        let children = self.blocks.iter().map(encode_node).collect();
        let mut root = Map::new();
        root.insert("type".into(), Value::from("root"));
        root.insert("version".into(), Value::from(ROOT_VERSION));
        root.insert("children".into(), Value::Array(children));
        let mut doc = Map::new();
        doc.insert("root".into(), Value::Object(root));
        Value::Object(doc)
    }

    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        let mut doc = match value {
            Value::Object(doc) => doc,
            _ => return Err(SnapshotError::MissingRoot),
        };
        let mut root = match doc.remove("root") {
            Some(Value::Object(root)) => root,
            _ => return Err(SnapshotError::MissingRoot),
        };
        match root.get("type").and_then(Value::as_str) {
            Some("root") => {}
            other => return Err(SnapshotError::RootType(other.unwrap_or_default().to_owned())),
        }
        let children = match root.remove("children") {
            Some(Value::Array(children)) => children,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => {
                warn!("Root children are not an array, keeping nothing: {}", other);
                Vec::new()
            }
        };
        let blocks = children
            .into_iter()
            .map(|child| decode_node(child, &NodeKind::Root))
            .collect();
        Ok(Self { blocks })
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Snapshot::from_value(value).map_err(de::Error::custom)
    }
}

impl Document {
    /// The snapshot of this document as it is right now
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot::from_document(self)
    }
}

/// Encodes the live tree as snapshot JSON
pub fn encode(doc: &Document) -> Value {
    Snapshot::from_document(doc).to_value()
}

/// Decodes snapshot JSON into a fresh live tree
pub fn decode(value: Value) -> Result<Document, SnapshotError> {
    Ok(Snapshot::from_value(value)?.to_document()?)
}

fn encode_node(node: &Node) -> Value {
    let kind = node.kind();
    if let NodeKind::Opaque(raw) = kind {
        return raw.clone();
    }
    let spec = match registry::spec_of(kind) {
        Some(spec) => spec,
        None => return Value::Null,
    };
    let mut object = match (spec.encode)(kind) {
        Ok(payload) => payload,
        Err(err) => {
            warn!("Could not encode {} node: {}", spec.type_name, err);
            Map::new()
        }
    };
    object.insert("type".into(), Value::from(spec.type_name));
    object.insert("version".into(), Value::from(spec.version));
    if kind.is_container() {
        let children = node.content().iter().map(encode_node).collect();
        object.insert("children".into(), Value::Array(children));
    }
    Value::Object(object)
}

fn decode_node(value: Value, parent: &NodeKind) -> Node {
    match try_decode(&value, parent) {
        Ok(node) => node,
        Err(reason) => {
            warn!("Keeping {} node opaque: {}", describe(&value), reason);
            Node::opaque(value)
        }
    }
}

fn describe(value: &Value) -> String {
    match value.get("type").and_then(Value::as_str) {
        Some(name) => format!("{:?}", name),
        None => String::from("untyped"),
    }
}

fn try_decode(value: &Value, parent: &NodeKind) -> Result<Node, String> {
    let object = value.as_object().ok_or("not an object")?;
    let type_name = object
        .get("type")
        .and_then(Value::as_str)
        .ok_or("missing type")?;
    let spec = registry::lookup(type_name).ok_or("unknown type")?;
    let kind = (spec.decode)(object).map_err(|err| err.to_string())?;
    if !parent.accepts(&kind) {
        return Err(format!("not allowed inside {}", parent.type_name()));
    }
    let content = if kind.is_container() {
        match object.get("children") {
            Some(Value::Array(children)) => children
                .iter()
                .map(|child| decode_node(child.clone(), &kind))
                .collect(),
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(String::from("children is not an array")),
        }
    } else {
        Vec::new()
    };
    Node::new(kind, content).map_err(|err| err.to_string())
}
