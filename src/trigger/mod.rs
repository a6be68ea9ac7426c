//! # Triggers
//!
//! Recognizes `@mention`, `:emoji` and `/command` spans while text is typed and
//! runs the suggestion menu that belongs to them.
//!
//! The [`TriggerEngine`] only tracks state. It hands out a [`LookupRequest`]
//! whenever the query changes; whoever runs the lookup reports back with
//! [`TriggerEngine::receive`], and results for anything but the latest request
//! are dropped.
mod commands;
mod lookup;
mod rank;

pub use commands::{BlockTarget, FileFilter, SlashAction, SlashCommand, SLASH_COMMANDS};
pub use lookup::Suggester;

use crate::collab::{EmojiEntry, ProjectSummary, UserSummary};
use crate::editor::Key;
use crate::tree::{Cursor, Document, NodeKey};
use crate::util::{make_id, Counter};
use serde::Serialize;
use tracing::{debug, trace};

make_id!(
    /// Sequence number of a typeahead lookup
    LookupSeq,
    "lookup#{0}"
);

/// The three trigger characters
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// `@`
    Mention,
    /// `:`
    Emoji,
    /// `/`
    Command,
}

impl TriggerKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '@' => Some(Self::Mention),
            ':' => Some(Self::Emoji),
            '/' => Some(Self::Command),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Mention => '@',
            Self::Emoji => ':',
            Self::Command => '/',
        }
    }
}

/// Where a trigger character sits in the document
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TriggerAnchor {
    /// The text node holding the trigger
    pub text: NodeKey,
    /// Char offset of the trigger character
    pub start: usize,
    pub kind: TriggerKind,
}

/// A trigger span that is currently being typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveQuery {
    pub anchor: TriggerAnchor,
    /// Text between the trigger character and the caret
    pub query: String,
    /// Char offset of the caret, the end of the span
    pub end: usize,
}

impl ActiveQuery {
    /// The char range to replace on commit, trigger character included
    pub fn span(&self) -> std::ops::Range<usize> {
        self.anchor.start..self.end
    }
}

fn ends_with_whitespace(text: &str) -> bool {
    text.chars().last().map_or(false, char::is_whitespace)
}

/// Finds the trigger span the caret is in, if any
///
/// Scanning backwards from the caret, whitespace ends the search. A trigger
/// character only counts at the start of the line or right after whitespace,
/// so `a@b` is not a mention.
pub fn detect(doc: &Document, cursor: Cursor) -> Option<ActiveQuery> {
    let parent = doc.parent(cursor.node)?;
    if !doc.get(parent)?.is_text_block() {
        return None;
    }
    let before = doc.text_before(cursor)?;
    for (idx, c) in before.char_indices().rev() {
        if c.is_whitespace() {
            return None;
        }
        let kind = match TriggerKind::from_char(c) {
            Some(kind) => kind,
            None => continue,
        };
        let head = &before[..idx];
        let at_boundary = if head.is_empty() {
            match doc.prev_sibling(cursor.node) {
                None => true,
                Some(prev) => doc.text(prev).map_or(false, ends_with_whitespace),
            }
        } else {
            ends_with_whitespace(head)
        };
        if !at_boundary {
            continue;
        }
        return Some(ActiveQuery {
            anchor: TriggerAnchor {
                text: cursor.node,
                start: head.chars().count(),
                kind,
            },
            query: before[idx + c.len_utf8()..].to_owned(),
            end: cursor.offset,
        });
    }
    None
}

/// One entry of the suggestion menu
#[derive(Debug, Clone, PartialEq)]
pub enum Suggestion {
    User(UserSummary),
    Project(ProjectSummary),
    Emoji(EmojiEntry),
    Command(&'static SlashCommand),
}

impl Suggestion {
    pub fn label(&self) -> &str {
        match self {
            Self::User(user) => &user.display_name,
            Self::Project(project) => &project.name,
            Self::Emoji(emoji) => &emoji.name,
            Self::Command(command) => command.label,
        }
    }
}

/// A lookup the engine wants to have run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub seq: LookupSeq,
    pub kind: TriggerKind,
    pub query: String,
}

/// What the menu currently shows, for the host to render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuView {
    pub kind: TriggerKind,
    pub query: String,
    pub items: Vec<String>,
    pub highlighted: usize,
}

/// Outcome of a key press offered to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// The engine didn't use the key
    Ignored,
    /// The key moved the highlight
    Moved,
    /// The menu was closed without a commit
    Closed,
    /// The highlighted suggestion was chosen for this span
    Commit(Suggestion, ActiveQuery),
}

#[derive(Debug, Clone)]
enum MenuState {
    Idle,
    Composing {
        active: ActiveQuery,
        seq: LookupSeq,
    },
    Suggesting {
        active: ActiveQuery,
        seq: LookupSeq,
        items: Vec<Suggestion>,
        highlighted: usize,
    },
}

/// State machine for the suggestion menu
#[derive(Debug)]
pub struct TriggerEngine {
    state: MenuState,
    seqs: Counter<LookupSeq>,
    dismissed: Option<TriggerAnchor>,
    limit: usize,
}

impl TriggerEngine {
    pub fn new(limit: usize) -> Self {
        Self {
            state: MenuState::Idle,
            seqs: Counter::default(),
            dismissed: None,
            limit,
        }
    }

    /// Re-reads the trigger span after an edit or caret move
    ///
    /// Returns a lookup to run when the query changed.
    pub fn update(&mut self, doc: &Document, cursor: Cursor) -> Option<LookupRequest> {
        let active = match detect(doc, cursor) {
            Some(active) => active,
            None => {
                self.dismissed = None;
                self.close();
                return None;
            }
        };
        if self.dismissed == Some(active.anchor) {
            return None;
        }
        self.dismissed = None;
        if self.active() == Some(&active) {
            return None;
        }

        let seq = self.seqs.next();
        let request = LookupRequest {
            seq,
            kind: active.anchor.kind,
            query: active.query.clone(),
        };
        trace!("{} for {:?}", seq, request.query);
        // results of the previous query are never shown for this one
        self.state = MenuState::Composing { active, seq };
        Some(request)
    }

    /// Applies lookup results; returns `false` if they were stale
    pub fn receive(&mut self, seq: LookupSeq, mut results: Vec<Suggestion>) -> bool {
        if self.current_seq() != Some(seq) {
            debug!("Discarding stale results of {}", seq);
            return false;
        }
        results.truncate(self.limit);
        let state = std::mem::replace(&mut self.state, MenuState::Idle);
        self.state = match state {
            MenuState::Composing { active, seq } => MenuState::Suggesting {
                active,
                seq,
                items: results,
                highlighted: 0,
            },
            MenuState::Suggesting {
                active,
                seq,
                highlighted,
                ..
            } => {
                let highlighted = highlighted.min(results.len().saturating_sub(1));
                MenuState::Suggesting {
                    active,
                    seq,
                    items: results,
                    highlighted,
                }
            }
            MenuState::Idle => MenuState::Idle,
        };
        true
    }

    /// Closes the menu after a failed lookup; returns `false` if it was stale
    pub fn fail(&mut self, seq: LookupSeq) -> bool {
        if self.current_seq() != Some(seq) {
            return false;
        }
        self.dismiss();
        true
    }

    /// Offers a key press to the open menu
    pub fn on_key(&mut self, key: &Key) -> KeyOutcome {
        let (len, active) = match &self.state {
            MenuState::Idle => return KeyOutcome::Ignored,
            MenuState::Composing { active, .. } => (0, active.clone()),
            MenuState::Suggesting { items, active, .. } => (items.len(), active.clone()),
        };
        match key {
            Key::Escape => {
                self.dismiss();
                KeyOutcome::Closed
            }
            Key::Down | Key::Up if len > 0 => {
                if let MenuState::Suggesting { highlighted, .. } = &mut self.state {
                    *highlighted = match key {
                        Key::Down => (*highlighted + 1) % len,
                        _ => (*highlighted + len - 1) % len,
                    };
                }
                KeyOutcome::Moved
            }
            Key::Enter | Key::Tab if len > 0 => {
                let state = std::mem::replace(&mut self.state, MenuState::Idle);
                match state {
                    MenuState::Suggesting {
                        mut items,
                        highlighted,
                        ..
                    } => KeyOutcome::Commit(items.swap_remove(highlighted), active),
                    other => {
                        self.state = other;
                        KeyOutcome::Ignored
                    }
                }
            }
            _ => KeyOutcome::Ignored,
        }
    }

    /// Closes the menu; later results for the current query are dropped
    pub fn close(&mut self) {
        self.state = MenuState::Idle;
    }

    /// Closes the menu and keeps it closed until the caret leaves this span
    pub fn dismiss(&mut self) {
        let anchor = self.active().map(|active| active.anchor);
        if anchor.is_some() {
            self.dismissed = anchor;
        }
        self.close();
    }

    /// Whether a trigger span is being composed, with or without results
    pub fn is_open(&self) -> bool {
        !matches!(self.state, MenuState::Idle)
    }

    /// Whether a non-empty menu is showing
    pub fn has_items(&self) -> bool {
        matches!(&self.state, MenuState::Suggesting { items, .. } if !items.is_empty())
    }

    pub fn active(&self) -> Option<&ActiveQuery> {
        match &self.state {
            MenuState::Idle => None,
            MenuState::Composing { active, .. } | MenuState::Suggesting { active, .. } => {
                Some(active)
            }
        }
    }

    pub fn current_seq(&self) -> Option<LookupSeq> {
        match &self.state {
            MenuState::Idle => None,
            MenuState::Composing { seq, .. } | MenuState::Suggesting { seq, .. } => Some(*seq),
        }
    }

    pub fn highlighted(&self) -> Option<&Suggestion> {
        match &self.state {
            MenuState::Suggesting {
                items, highlighted, ..
            } => items.get(*highlighted),
            _ => None,
        }
    }

    /// The menu as it should be drawn; `None` when nothing is shown
    pub fn view(&self) -> Option<MenuView> {
        match &self.state {
            MenuState::Suggesting {
                active,
                items,
                highlighted,
                ..
            } if !items.is_empty() => Some(MenuView {
                kind: active.anchor.kind,
                query: active.query.clone(),
                items: items.iter().map(|s| s.label().to_owned()).collect(),
                highlighted: *highlighted,
            }),
            _ => None,
        }
    }
}
