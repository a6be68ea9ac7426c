//! Type-keyed table of node codecs
//!
//! Every node type the model knows has one [`NodeSpec`]: how to read its
//! payload out of a snapshot object, how to write it back, and what it
//! contributes to a plain-text rendering.
use crate::model::{
    AttachmentAttrs, HeadingLevel, ImageAttrs, ListStyle, Mention, NodeKind, TextFormat,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(crate) type Payload = Map<String, Value>;

/// Codec functions for one node type
pub(crate) struct NodeSpec {
    pub type_name: &'static str,
    pub version: u32,
    pub decode: fn(&Payload) -> serde_json::Result<NodeKind>,
    pub encode: fn(&NodeKind) -> serde_json::Result<Payload>,
    pub plain_text: fn(&NodeKind) -> Option<&str>,
}

fn from_payload<T: for<'de> Deserialize<'de>>(payload: &Payload) -> serde_json::Result<T> {
    T::deserialize(Value::Object(payload.clone()))
}

fn to_payload<T: Serialize>(value: &T) -> serde_json::Result<Payload> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Payload::new()),
    }
}

fn no_text(_: &NodeKind) -> Option<&str> {
    None
}

fn empty(_: &NodeKind) -> serde_json::Result<Payload> {
    Ok(Payload::new())
}

#[derive(Deserialize, Serialize)]
struct HeadingPayload {
    level: HeadingLevel,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListPayload {
    list_type: ListStyle,
}

#[derive(Deserialize, Serialize)]
struct TextPayload {
    text: String,
    #[serde(default)]
    format: TextFormat,
}

#[derive(Deserialize, Serialize)]
struct LinkPayload {
    url: String,
}

#[derive(Deserialize, Serialize)]
struct EmojiPayload {
    name: String,
}

fn decode_paragraph(_: &Payload) -> serde_json::Result<NodeKind> {
    Ok(NodeKind::Paragraph)
}

fn decode_heading(payload: &Payload) -> serde_json::Result<NodeKind> {
    let HeadingPayload { level } = from_payload(payload)?;
    Ok(NodeKind::Heading { level })
}

fn encode_heading(kind: &NodeKind) -> serde_json::Result<Payload> {
    match kind {
        NodeKind::Heading { level } => to_payload(&HeadingPayload { level: *level }),
        _ => Ok(Payload::new()),
    }
}

fn decode_quote(_: &Payload) -> serde_json::Result<NodeKind> {
    Ok(NodeKind::Quote)
}

fn decode_list(payload: &Payload) -> serde_json::Result<NodeKind> {
    let ListPayload { list_type } = from_payload(payload)?;
    Ok(NodeKind::List { style: list_type })
}

fn encode_list(kind: &NodeKind) -> serde_json::Result<Payload> {
    match kind {
        NodeKind::List { style } => to_payload(&ListPayload { list_type: *style }),
        _ => Ok(Payload::new()),
    }
}

fn decode_list_item(_: &Payload) -> serde_json::Result<NodeKind> {
    Ok(NodeKind::ListItem)
}

fn decode_text(payload: &Payload) -> serde_json::Result<NodeKind> {
    let TextPayload { text, format } = from_payload(payload)?;
    Ok(NodeKind::Text {
        text,
        format: TextFormat::from_bits_truncate(format.bits()),
    })
}

fn encode_text(kind: &NodeKind) -> serde_json::Result<Payload> {
    match kind {
        NodeKind::Text { text, format } => to_payload(&TextPayload {
            text: text.clone(),
            format: *format,
        }),
        _ => Ok(Payload::new()),
    }
}

fn text_of_text(kind: &NodeKind) -> Option<&str> {
    match kind {
        NodeKind::Text { text, .. } => Some(text),
        _ => None,
    }
}

fn decode_link(payload: &Payload) -> serde_json::Result<NodeKind> {
    let LinkPayload { url } = from_payload(payload)?;
    Ok(NodeKind::Link { url })
}

fn encode_link(kind: &NodeKind) -> serde_json::Result<Payload> {
    match kind {
        NodeKind::Link { url } => to_payload(&LinkPayload { url: url.clone() }),
        _ => Ok(Payload::new()),
    }
}

fn decode_mention(payload: &Payload) -> serde_json::Result<NodeKind> {
    from_payload(payload).map(NodeKind::Mention)
}

fn encode_mention(kind: &NodeKind) -> serde_json::Result<Payload> {
    match kind {
        NodeKind::Mention(mention) => to_payload::<Mention>(mention),
        _ => Ok(Payload::new()),
    }
}

fn text_of_mention(kind: &NodeKind) -> Option<&str> {
    match kind {
        NodeKind::Mention(mention) => Some(&mention.display_name),
        _ => None,
    }
}

fn decode_emoji(payload: &Payload) -> serde_json::Result<NodeKind> {
    let EmojiPayload { name } = from_payload(payload)?;
    Ok(NodeKind::Emoji { name })
}

fn encode_emoji(kind: &NodeKind) -> serde_json::Result<Payload> {
    match kind {
        NodeKind::Emoji { name } => to_payload(&EmojiPayload { name: name.clone() }),
        _ => Ok(Payload::new()),
    }
}

fn decode_image(payload: &Payload) -> serde_json::Result<NodeKind> {
    from_payload(payload).map(NodeKind::Image)
}

fn encode_image(kind: &NodeKind) -> serde_json::Result<Payload> {
    match kind {
        NodeKind::Image(attrs) => to_payload::<ImageAttrs>(attrs),
        _ => Ok(Payload::new()),
    }
}

fn decode_attachment(payload: &Payload) -> serde_json::Result<NodeKind> {
    from_payload(payload).map(NodeKind::Attachment)
}

fn encode_attachment(kind: &NodeKind) -> serde_json::Result<Payload> {
    match kind {
        NodeKind::Attachment(attrs) => to_payload::<AttachmentAttrs>(attrs),
        _ => Ok(Payload::new()),
    }
}

static REGISTRY: &[NodeSpec] = &[
    NodeSpec {
        type_name: "paragraph",
        version: 1,
        decode: decode_paragraph,
        encode: empty,
        plain_text: no_text,
    },
    NodeSpec {
        type_name: "heading",
        version: 1,
        decode: decode_heading,
        encode: encode_heading,
        plain_text: no_text,
    },
    NodeSpec {
        type_name: "quote",
        version: 1,
        decode: decode_quote,
        encode: empty,
        plain_text: no_text,
    },
    NodeSpec {
        type_name: "list",
        version: 1,
        decode: decode_list,
        encode: encode_list,
        plain_text: no_text,
    },
    NodeSpec {
        type_name: "list-item",
        version: 1,
        decode: decode_list_item,
        encode: empty,
        plain_text: no_text,
    },
    NodeSpec {
        type_name: "text",
        version: 1,
        decode: decode_text,
        encode: encode_text,
        plain_text: text_of_text,
    },
    NodeSpec {
        type_name: "link",
        version: 1,
        decode: decode_link,
        encode: encode_link,
        plain_text: no_text,
    },
    NodeSpec {
        type_name: "mention",
        version: 1,
        decode: decode_mention,
        encode: encode_mention,
        plain_text: text_of_mention,
    },
    NodeSpec {
        type_name: "emoji",
        version: 1,
        decode: decode_emoji,
        encode: encode_emoji,
        plain_text: no_text,
    },
    NodeSpec {
        type_name: "image",
        version: 1,
        decode: decode_image,
        encode: encode_image,
        plain_text: no_text,
    },
    NodeSpec {
        type_name: "attachment",
        version: 1,
        decode: decode_attachment,
        encode: encode_attachment,
        plain_text: no_text,
    },
];

/// The codec for a `type` discriminator, if this version knows it
pub(crate) fn lookup(type_name: &str) -> Option<&'static NodeSpec> {
    REGISTRY.iter().find(|spec| spec.type_name == type_name)
}

/// The codec for a live node kind; `None` for the root and opaque nodes
pub(crate) fn spec_of(kind: &NodeKind) -> Option<&'static NodeSpec> {
    match kind {
        NodeKind::Root | NodeKind::Opaque(_) => None,
        kind => lookup(kind.type_name()),
    }
}

/// What a node contributes to a plain-text rendering
pub(crate) fn plain_text(kind: &NodeKind) -> Option<&str> {
    spec_of(kind).and_then(|spec| (spec.plain_text)(kind))
}
