//! # Content extraction
//!
//! Read-only views over a [`Snapshot`] that create and update handlers use to
//! derive stored attachment rows, notification targets and feed previews. All
//! of these are pure: the same snapshot always gives the same result.
use crate::model::{AttachmentAttrs, MentionKind, NodeKind};
use crate::snapshot::{plain_text, Snapshot};
use serde::Serialize;
use std::collections::HashSet;

/// An attachment together with its position in the document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    /// Zero-based position in preorder
    pub order: usize,
    #[serde(flatten)]
    pub attrs: AttachmentAttrs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionedUser {
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MentionedProject {
    pub project_id: String,
    pub project_name: String,
}

/// Every attachment, numbered in document order
pub fn extract_attachments(snapshot: &Snapshot) -> Vec<AttachmentRecord> {
    snapshot
        .walk()
        .filter_map(|node| match node.kind() {
            NodeKind::Attachment(attrs) => Some(attrs.clone()),
            _ => None,
        })
        .enumerate()
        .map(|(order, attrs)| AttachmentRecord { order, attrs })
        .collect()
}

fn mentions_of(snapshot: &Snapshot, kind: MentionKind) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    snapshot
        .walk()
        .filter_map(|node| match node.kind() {
            NodeKind::Mention(m) if m.kind == kind => Some(m),
            _ => None,
        })
        .filter(|m| seen.insert(m.target_id.as_str()))
        .map(|m| (m.target_id.clone(), m.display_name.clone()))
        .collect()
}

/// Mentioned users, first occurrence of each id wins
pub fn extract_mentions(snapshot: &Snapshot) -> Vec<MentionedUser> {
    mentions_of(snapshot, MentionKind::User)
        .into_iter()
        .map(|(user_id, user_name)| MentionedUser { user_id, user_name })
        .collect()
}

/// Mentioned projects, first occurrence of each id wins
pub fn extract_project_mentions(snapshot: &Snapshot) -> Vec<MentionedProject> {
    mentions_of(snapshot, MentionKind::Project)
        .into_iter()
        .map(|(project_id, project_name)| MentionedProject {
            project_id,
            project_name,
        })
        .collect()
}

/// Whether the document holds anything worth publishing
///
/// Empty and whitespace-only text blocks don't count. Any mention or emoji,
/// any list (even with empty items), and any image or attachment do.
pub fn has_content(snapshot: &Snapshot) -> bool {
    snapshot.walk().any(|node| match node.kind() {
        NodeKind::Text { text, .. } => !text.trim().is_empty(),
        NodeKind::Mention(_) | NodeKind::Emoji { .. } => true,
        NodeKind::List { .. } => true,
        NodeKind::Image(_) | NodeKind::Attachment(_) => true,
        _ => false,
    })
}

/// Text and mention names in document order, joined by single spaces
pub fn render_plain_text(snapshot: &Snapshot) -> String {
    let parts: Vec<&str> = snapshot
        .walk()
        .filter_map(|node| plain_text(node.kind()))
        .collect();
    parts.join(" ")
}

/// The first image or video attachment, used as a feed thumbnail
pub fn preview_media(snapshot: &Snapshot) -> Option<AttachmentAttrs> {
    snapshot.walk().find_map(|node| match node.kind() {
        NodeKind::Attachment(attrs) if attrs.kind.is_media() => Some(attrs.clone()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttachmentKind, ImageAttrs, ListStyle, Mention, Node};
    use pretty_assertions::assert_eq;

    fn snapshot(blocks: Vec<Node>) -> Snapshot {
        Snapshot::new(blocks).unwrap()
    }

    fn para(inlines: Vec<Node>) -> Node {
        Node::paragraph(inlines).unwrap()
    }

    fn attachment(kind: AttachmentKind, name: &str) -> Node {
        Node::attachment(AttachmentAttrs {
            kind,
            url: format!("https://cdn/{}", name),
            filename: name.into(),
            mime_type: "application/octet-stream".into(),
            size_bytes: 1,
            thumbnail_url: None,
            width: None,
            height: None,
            metadata: None,
        })
    }

    #[test]
    fn test_attachment_order_follows_preorder() {
        let s = snapshot(vec![
            attachment(AttachmentKind::File, "a"),
            Node::quote(vec![attachment(AttachmentKind::Video, "b")]).unwrap(),
            para(vec![Node::text("between")]),
            attachment(AttachmentKind::Image, "c"),
        ]);
        let records = extract_attachments(&s);
        let names: Vec<_> = records.iter().map(|r| r.attrs.filename.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.order, i);
        }
        assert_eq!(preview_media(&s).map(|a| a.filename), Some("b".into()));
    }

    #[test]
    fn test_mentions_dedup_first_wins() {
        let s = snapshot(vec![
            para(vec![
                Node::mention(Mention::user("u1", "Jane")),
                Node::mention(Mention::project("p1", "Roadmap")),
            ]),
            para(vec![
                Node::mention(Mention::user("u2", "Ali")),
                Node::mention(Mention::user("u1", "Jane Renamed")),
            ]),
        ]);
        assert_eq!(
            extract_mentions(&s),
            vec![
                MentionedUser {
                    user_id: "u1".into(),
                    user_name: "Jane".into()
                },
                MentionedUser {
                    user_id: "u2".into(),
                    user_name: "Ali".into()
                },
            ]
        );
        assert_eq!(
            extract_project_mentions(&s),
            vec![MentionedProject {
                project_id: "p1".into(),
                project_name: "Roadmap".into()
            }]
        );
    }

    #[test]
    fn test_has_content_truth_table() {
        assert!(!has_content(&snapshot(vec![para(vec![])])));
        assert!(!has_content(&snapshot(vec![para(vec![Node::text("  \n\t")])])));
        assert!(has_content(&snapshot(vec![para(vec![Node::emoji("tada")])])));
        let empty_item = Node::list_item(vec![para(vec![])]).unwrap();
        assert!(has_content(&snapshot(vec![
            Node::list(ListStyle::Unordered, vec![empty_item]).unwrap()
        ])));
        assert!(has_content(&snapshot(vec![attachment(AttachmentKind::File, "a")])));
        assert!(has_content(&snapshot(vec![Node::image(ImageAttrs {
            src: "https://cdn/i.png".into(),
            alt_text: String::new(),
            width: None,
            height: None,
        })])));
        assert!(has_content(&snapshot(vec![Node::heading(
            crate::model::HeadingLevel::H1,
            vec![Node::text("Title")]
        )
        .unwrap()])));
    }

    #[test]
    fn test_plain_text_joins_with_spaces() {
        let s = snapshot(vec![
            para(vec![
                Node::text("Hello"),
                Node::mention(Mention::user("u1", "Jane Doe")),
                Node::emoji("wave"),
            ]),
            para(vec![Node::link("https://x.y", vec![Node::text("see this")]).unwrap()]),
        ]);
        assert_eq!(render_plain_text(&s), "Hello Jane Doe see this");
    }

    #[test]
    fn test_opaque_nodes_contribute_nothing() {
        let s = snapshot(vec![Node::opaque(serde_json::json!({
            "type": "poll", "text": "hidden"
        }))]);
        assert!(!has_content(&s));
        assert_eq!(render_plain_text(&s), "");
        assert!(extract_attachments(&s).is_empty());
    }
}
