//! # The editor
//!
//! One [`Editor`] owns the document, the caret, the trigger engine and the
//! bookkeeping of running uploads. Input goes through a single ranked
//! [`Pipeline`] of handlers. Work that has to happen elsewhere (lookups,
//! uploads, telling the host about changes) is queued as [`Effect`]s for the
//! session to pick up with [`Editor::take_effects`].
mod input;
mod pipeline;

pub use input::{InputEvent, Key, UnknownKey};
pub use pipeline::{CommandHandler, Pipeline, Priority, Propagation};

use crate::collab::LookupError;
use crate::model::{AttachmentAttrs, AttachmentKind, Mention, NodeKind};
use crate::snapshot::Snapshot;
use crate::tree::{Cursor, Document, NodeKey, TreeError};
use crate::trigger::{
    ActiveQuery, FileFilter, LookupRequest, LookupSeq, MenuView, SlashAction, Suggestion,
    TriggerEngine,
};
use crate::upload::{
    embed_attrs, BatchAnchor, BatchId, PendingFile, UploadId, UploadJob, UploadOutcome,
    UploadPolicy,
};
use crate::util::Counter;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Editor settings
#[derive(Debug, Clone)]
pub struct EditorConfig {
    pub max_suggestions: usize,
    /// Whether Enter submits instead of starting a new paragraph
    pub submit_on_enter: bool,
    pub upload: UploadPolicy,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 10,
            submit_on_enter: false,
            upload: UploadPolicy::default(),
        }
    }
}

/// Something the host should know about
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// The document changed; this is its new snapshot
    Changed(Snapshot),
    /// The suggestion menu changed; `None` hides it
    Menu(Option<MenuView>),
    /// A message for the user
    Notice(String),
    /// Enter was pressed with submit-on-enter enabled
    Submitted(Snapshot),
    /// A `/image` or `/file` command wants the file picker
    FilePickerRequested(FileFilter),
}

/// Work queued by the editor
#[derive(Debug, Clone)]
pub enum Effect {
    Lookup(LookupRequest),
    Upload(UploadJob),
    Event(EditorEvent),
}

/// Everything the input handlers work on
#[derive(Debug)]
pub struct EditorState {
    doc: Document,
    cursor: Cursor,
    triggers: TriggerEngine,
    config: EditorConfig,
    batches: HashMap<BatchId, BatchAnchor>,
    pending: HashMap<UploadId, BatchId>,
    upload_ids: Counter<UploadId>,
    batch_ids: Counter<BatchId>,
    picker_anchor: Option<NodeKey>,
    effects: Vec<Effect>,
    changed: bool,
    menu: Option<MenuView>,
}

fn initial_cursor(doc: &mut Document) -> Cursor {
    let root = doc.root();
    let last_text_block = doc
        .descendants(root)
        .into_iter()
        .rev()
        .find(|&key| doc.get(key).map_or(false, NodeKind::is_text_block));
    match last_text_block {
        Some(block) => doc.end_of(block),
        None => match doc.append(root, NodeKind::Paragraph) {
            Ok(block) => Cursor::new(block, 0),
            Err(_) => Cursor::new(root, 0),
        },
    }
}

impl EditorState {
    pub fn new(mut doc: Document, config: EditorConfig) -> Self {
        let cursor = initial_cursor(&mut doc);
        Self {
            doc,
            cursor,
            triggers: TriggerEngine::new(config.max_suggestions),
            config,
            batches: HashMap::new(),
            pending: HashMap::new(),
            upload_ids: Counter::default(),
            batch_ids: Counter::default(),
            picker_anchor: None,
            effects: Vec::new(),
            changed: false,
            menu: None,
        }
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn triggers(&self) -> &TriggerEngine {
        &self.triggers
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Number of uploads that haven't finished yet
    pub fn pending_uploads(&self) -> usize {
        self.pending.len()
    }

    pub fn emit(&mut self, event: EditorEvent) {
        self.effects.push(Effect::Event(event));
    }

    pub fn notice(&mut self, message: impl Into<String>) {
        self.emit(EditorEvent::Notice(message.into()));
    }

    /// Runs a document edit that yields the new caret
    pub fn edit<F>(&mut self, f: F) -> Result<(), TreeError>
    where
        F: FnOnce(&mut Document, Cursor) -> Result<Cursor, TreeError>,
    {
        self.cursor = f(&mut self.doc, self.cursor)?;
        self.changed = true;
        Ok(())
    }

    pub fn set_cursor(&mut self, cursor: Cursor) -> Result<(), TreeError> {
        self.doc.check_cursor(cursor)?;
        self.cursor = self.doc.normalize(cursor);
        Ok(())
    }

    /// The block holding the caret
    fn current_block(&self) -> Option<NodeKey> {
        self.doc.enclosing_block(self.cursor.node)
    }

    /// Applies a chosen suggestion to its trigger span
    ///
    /// Does nothing if the span was edited away in the meantime.
    pub fn commit(&mut self, item: Suggestion, active: ActiveQuery) -> Result<(), TreeError> {
        let text = active.anchor.text;
        let still_there = self.doc.text(text).map_or(false, |t| {
            t.chars().count() >= active.end
                && t.chars().nth(active.anchor.start) == Some(active.anchor.kind.symbol())
        });
        if !still_there {
            debug!("Trigger span in {} is gone, not committing", text);
            return Ok(());
        }
        let span = active.span();
        match item {
            Suggestion::User(user) => {
                let token = NodeKind::Mention(Mention::user(user.id, user.display_name));
                self.edit(|doc, _| doc.replace_with_token(text, span, token))
            }
            Suggestion::Project(project) => {
                let token = NodeKind::Mention(Mention::project(project.id, project.name));
                self.edit(|doc, _| doc.replace_with_token(text, span, token))
            }
            Suggestion::Emoji(emoji) => {
                let token = NodeKind::Emoji { name: emoji.name };
                self.edit(|doc, _| doc.replace_with_token(text, span, token))
            }
            Suggestion::Command(command) => {
                let block = self
                    .doc
                    .enclosing_text_block(text)
                    .ok_or(TreeError::NotText(text))?;
                self.edit(|doc, _| doc.remove_text_range(text, span))?;
                match command.action {
                    SlashAction::Block(target) => {
                        info!("Turning {} into {}", block, command.label);
                        self.doc.set_block_kind(block, target.kind())?;
                    }
                    SlashAction::PickFile(filter) => {
                        self.picker_anchor = Some(block);
                        self.emit(EditorEvent::FilePickerRequested(filter));
                    }
                }
                Ok(())
            }
        }
    }

    /// Splits the text block at the caret and returns the head
    ///
    /// Blocks inserted after the head land exactly where the caret was. No
    /// split happens when the caret is already at the end of its block.
    fn split_at_caret(&mut self) -> Result<Option<NodeKey>, TreeError> {
        let block = match self.doc.enclosing_text_block(self.cursor.node) {
            Some(block) => block,
            None => return Ok(self.current_block()),
        };
        if self.doc.is_at_block_end(self.cursor) {
            return Ok(Some(block));
        }
        self.doc.split_block(self.cursor)?;
        self.changed = true;
        debug!("Split {} at the caret", block);
        self.cursor = self.doc.end_of(block);
        Ok(Some(block))
    }

    /// Starts uploads for a batch of files
    ///
    /// Files the policy rejects are reported right away and never leave the
    /// editor. The rest are inserted after `anchor`, or at the caret, as they
    /// complete.
    pub fn attach_files(
        &mut self,
        files: Vec<PendingFile>,
        anchor: Option<NodeKey>,
    ) -> Result<(), TreeError> {
        let mut accepted = Vec::with_capacity(files.len());
        for file in files {
            match self.config.upload.check(&file) {
                Ok(()) => accepted.push(file),
                Err(err) => {
                    info!("Rejected {:?}: {}", file.name, err);
                    self.notice(err.to_string());
                }
            }
        }
        if accepted.is_empty() {
            return Ok(());
        }
        let after = match anchor {
            Some(anchor) => anchor,
            None => self.split_at_caret()?.unwrap_or_else(|| self.doc.root()),
        };
        let batch = self.batch_ids.next();
        self.batches.insert(batch, BatchAnchor { after });
        for file in accepted {
            let id = self.upload_ids.next();
            self.pending.insert(id, batch);
            self.effects.push(Effect::Upload(UploadJob { id, batch, file }));
        }
        Ok(())
    }

    /// Files chosen in the picker go where the `/image` or `/file` command was
    pub fn attach_picked(&mut self, files: Vec<PendingFile>) -> Result<(), TreeError> {
        let anchor = self.picker_anchor.take();
        self.attach_files(files, anchor)
    }

    /// Inserts an embed for a pasted Figma or Loom link at the caret
    pub fn insert_embed(&mut self, kind: AttachmentKind, url: &str) -> Result<(), TreeError> {
        let after = self.split_at_caret()?;
        let key = self.insert_block(after, embed_attrs(kind, url))?;
        let paragraph = self.trailing_paragraph(key)?;
        self.cursor = self.doc.start_of(paragraph);
        Ok(())
    }

    fn insert_block(
        &mut self,
        after: Option<NodeKey>,
        attrs: AttachmentAttrs,
    ) -> Result<NodeKey, TreeError> {
        let kind = NodeKind::Attachment(attrs);
        let placed = match after {
            Some(after) if self.doc.position(after).is_some() => {
                self.doc.insert_after(after, kind.clone()).ok()
            }
            _ => None,
        };
        let key = match placed {
            Some(key) => key,
            None => {
                let root = self.doc.root();
                self.doc.append(root, kind)?
            }
        };
        self.changed = true;
        Ok(key)
    }

    /// A text block right after `key` to keep typing in, added if there is none
    fn trailing_paragraph(&mut self, key: NodeKey) -> Result<NodeKey, TreeError> {
        if let Some(next) = self.doc.next_sibling(key) {
            if self.doc.get(next).map_or(false, NodeKind::is_text_block) {
                return Ok(next);
            }
        }
        let paragraph = self.doc.insert_after(key, NodeKind::Paragraph)?;
        self.changed = true;
        Ok(paragraph)
    }

    /// Places a finished upload, or reports why it failed
    pub fn upload_finished(&mut self, outcome: UploadOutcome) -> Result<(), TreeError> {
        self.pending.remove(&outcome.id);
        let anchor = self.batches.get(&outcome.batch).copied();
        if !self.pending.values().any(|b| *b == outcome.batch) {
            self.batches.remove(&outcome.batch);
        }
        let attrs = match outcome.result {
            Ok(attrs) => attrs,
            Err(err) => {
                self.notice(err.to_string());
                return Ok(());
            }
        };
        let after = anchor.map(|a| a.after).filter(|&key| key != self.doc.root());
        if after.map_or(false, |key| !self.doc.contains(key)) {
            warn!("Anchor of {} was deleted, appending at the end", outcome.batch);
        }
        let key = self.insert_block(after, attrs)?;
        self.trailing_paragraph(key)?;
        if let Some(batch) = self.batches.get_mut(&outcome.batch) {
            batch.after = key;
        }
        Ok(())
    }

    /// Applies typeahead results
    pub fn lookup_finished(
        &mut self,
        seq: LookupSeq,
        result: Result<Vec<Suggestion>, LookupError>,
    ) {
        match result {
            Ok(items) => {
                self.triggers.receive(seq, items);
            }
            Err(err) => {
                if self.triggers.fail(seq) {
                    self.notice(format!("Suggestions are unavailable: {}", err));
                }
            }
        }
    }

    /// Queues the events and lookups that follow from the last input
    fn refresh(&mut self) {
        if self.changed {
            self.changed = false;
            let snapshot = self.doc.to_snapshot();
            self.emit(EditorEvent::Changed(snapshot));
        }
        if let Some(request) = self.triggers.update(&self.doc, self.cursor) {
            self.effects.push(Effect::Lookup(request));
        }
        let menu = self.triggers.view();
        if menu != self.menu {
            self.menu = menu.clone();
            self.emit(EditorEvent::Menu(menu));
        }
    }
}

/// The editing session's single writer
#[derive(Debug)]
pub struct Editor {
    state: EditorState,
    pipeline: Pipeline,
}

impl Editor {
    pub fn new(doc: Document, config: EditorConfig) -> Self {
        Self {
            state: EditorState::new(doc, config),
            pipeline: Pipeline::standard(),
        }
    }

    /// Loads a snapshot; a missing snapshot starts an empty document
    pub fn from_snapshot(
        snapshot: Option<&Snapshot>,
        config: EditorConfig,
    ) -> Result<Self, TreeError> {
        let doc = match snapshot {
            Some(snapshot) => snapshot.to_document()?,
            None => Document::new(),
        };
        Ok(Self::new(doc, config))
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.doc.to_snapshot()
    }

    /// Runs an input through the pipeline
    pub fn handle(&mut self, event: InputEvent) -> Result<(), TreeError> {
        let result = self.pipeline.dispatch(&mut self.state, &event);
        self.state.refresh();
        result
    }

    pub fn upload_finished(&mut self, outcome: UploadOutcome) -> Result<(), TreeError> {
        let result = self.state.upload_finished(outcome);
        self.state.refresh();
        result
    }

    pub fn lookup_finished(
        &mut self,
        seq: LookupSeq,
        result: Result<Vec<Suggestion>, LookupError>,
    ) {
        self.state.lookup_finished(seq, result);
        self.state.refresh();
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.state.effects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{ProjectSummary, UserSummary};
    use crate::model::{HeadingLevel, Node};
    use crate::trigger::SLASH_COMMANDS;
    use crate::upload::UploadError;
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::new(Document::new(), EditorConfig::default())
    }

    fn type_text(editor: &mut Editor, text: &str) {
        editor.handle(InputEvent::Text(text.into())).unwrap();
    }

    fn lookups(editor: &mut Editor) -> Vec<LookupRequest> {
        editor
            .take_effects()
            .into_iter()
            .filter_map(|e| match e {
                Effect::Lookup(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    fn uploads(effects: &[Effect]) -> Vec<UploadJob> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Upload(job) => Some(job.clone()),
                _ => None,
            })
            .collect()
    }

    fn notices(effects: &[Effect]) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Event(EditorEvent::Notice(msg)) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    fn jane() -> Suggestion {
        Suggestion::User(UserSummary {
            id: "u1".into(),
            display_name: "Jane Doe".into(),
            username: "jane".into(),
        })
    }

    fn stored(name: &str) -> AttachmentAttrs {
        AttachmentAttrs {
            kind: AttachmentKind::Image,
            url: format!("https://cdn.test/{}", name),
            filename: name.into(),
            mime_type: "image/png".into(),
            size_bytes: 10,
            thumbnail_url: None,
            width: None,
            height: None,
            metadata: None,
        }
    }

    #[test]
    fn test_mention_commit() {
        let mut editor = editor();
        type_text(&mut editor, "Hello @");
        let req = lookups(&mut editor).pop().unwrap();
        assert_eq!(req.query, "");
        editor.lookup_finished(req.seq, Ok(vec![jane()]));
        editor.handle(InputEvent::Key(Key::Enter)).unwrap();
        assert_eq!(
            editor.snapshot().blocks(),
            &[Node::paragraph(vec![
                Node::text("Hello "),
                Node::mention(Mention::user("u1", "Jane Doe")),
                Node::text(" "),
            ])
            .unwrap()]
        );
        assert!(!editor.state().triggers().is_open());
    }

    #[test]
    fn test_project_and_emoji_commit() {
        let mut editor = editor();
        type_text(&mut editor, "@ro");
        let req = lookups(&mut editor).pop().unwrap();
        editor.lookup_finished(
            req.seq,
            Ok(vec![Suggestion::Project(ProjectSummary {
                id: "p1".into(),
                name: "Roadmap".into(),
            })]),
        );
        editor.handle(InputEvent::Key(Key::Tab)).unwrap();
        type_text(&mut editor, ":ta");
        let req = lookups(&mut editor).pop().unwrap();
        editor.lookup_finished(
            req.seq,
            Ok(vec![Suggestion::Emoji(crate::collab::EmojiEntry {
                name: "tada".into(),
                aliases: vec![],
                url: String::new(),
            })]),
        );
        editor.handle(InputEvent::Key(Key::Enter)).unwrap();
        assert_eq!(
            editor.snapshot().blocks(),
            &[Node::paragraph(vec![
                Node::mention(Mention::project("p1", "Roadmap")),
                Node::text(" "),
                Node::emoji("tada"),
                Node::text(" "),
            ])
            .unwrap()]
        );
    }

    #[test]
    fn test_slash_heading() {
        let mut editor = editor();
        type_text(&mut editor, "/head");
        let req = lookups(&mut editor).pop().unwrap();
        let headings = SLASH_COMMANDS
            .iter()
            .filter(|c| c.label.starts_with("Heading"))
            .map(Suggestion::Command)
            .collect();
        editor.lookup_finished(req.seq, Ok(headings));
        editor.handle(InputEvent::Key(Key::Down)).unwrap();
        editor.handle(InputEvent::Key(Key::Enter)).unwrap();
        assert_eq!(
            editor.snapshot().blocks(),
            &[Node::heading(HeadingLevel::H2, vec![]).unwrap()]
        );
    }

    #[test]
    fn test_commit_on_deleted_span_is_noop() {
        let mut editor = editor();
        type_text(&mut editor, "@ja");
        let req = lookups(&mut editor).pop().unwrap();
        let active = editor.state().triggers().active().cloned().unwrap();
        editor.lookup_finished(req.seq, Ok(vec![jane()]));
        for _ in 0..3 {
            editor.handle(InputEvent::Key(Key::Backspace)).unwrap();
        }
        let before = editor.snapshot();
        editor.state.commit(jane(), active).unwrap();
        assert_eq!(editor.snapshot(), before);
    }

    #[test]
    fn test_refined_query_does_not_commit_old_results() {
        let mut editor = editor();
        type_text(&mut editor, "@al");
        let req = lookups(&mut editor).pop().unwrap();
        let alan = Suggestion::User(UserSummary {
            id: "u9".into(),
            display_name: "Alan".into(),
            username: "alan".into(),
        });
        editor.lookup_finished(req.seq, Ok(vec![alan]));
        assert!(editor.state().triggers().view().is_some());

        type_text(&mut editor, "i");
        assert_eq!(lookups(&mut editor).pop().unwrap().query, "ali");
        assert_eq!(editor.state().triggers().view(), None);
        editor.handle(InputEvent::Key(Key::Enter)).unwrap();
        assert!(crate::extract::extract_mentions(&editor.snapshot()).is_empty());
    }

    #[test]
    fn test_embed_paste_splits_at_caret() {
        let mut editor = Editor::new(
            Document::from_fragment(&[Node::paragraph(vec![Node::text("Hello world")]).unwrap()])
                .unwrap(),
            EditorConfig::default(),
        );
        let p = editor.state().doc().children(editor.state().doc().root())[0];
        let text = editor.state().doc().children(p)[0];
        editor.handle(InputEvent::MoveCursor(Cursor::new(text, 5))).unwrap();
        editor
            .handle(InputEvent::Paste("https://www.loom.com/share/abc".into()))
            .unwrap();
        let blocks = editor.snapshot().blocks().to_vec();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], Node::paragraph(vec![Node::text("Hello")]).unwrap());
        assert!(matches!(blocks[1].kind(), NodeKind::Attachment(_)));
        assert_eq!(blocks[2], Node::paragraph(vec![Node::text(" world")]).unwrap());
        assert_eq!(editor.state().doc().text(editor.state().cursor().node), Some(" world"));
    }

    #[test]
    fn test_lookup_error_closes_menu() {
        let mut editor = editor();
        type_text(&mut editor, "@a");
        let req = lookups(&mut editor).pop().unwrap();
        editor.lookup_finished(req.seq, Err(LookupError::Timeout));
        let effects = editor.take_effects();
        assert_eq!(notices(&effects), ["Suggestions are unavailable: Search timed out"]);
        assert!(!editor.state().triggers().is_open());
    }

    #[test]
    fn test_uploads_land_at_drop_caret_in_completion_order() {
        let mut editor = Editor::new(
            Document::from_fragment(&[
                Node::paragraph(vec![Node::text("first")]).unwrap(),
                Node::paragraph(vec![Node::text("second")]).unwrap(),
            ])
            .unwrap(),
            EditorConfig::default(),
        );
        let first = editor.state().doc().children(editor.state().doc().root())[0];
        let text = editor.state().doc().children(first)[0];
        editor.handle(InputEvent::MoveCursor(Cursor::new(text, 2))).unwrap();
        editor
            .handle(InputEvent::Drop(vec![
                PendingFile::new("a.png", "image/png", vec![1]),
                PendingFile::new("b.png", "image/png", vec![2]),
            ]))
            .unwrap();
        let jobs = uploads(&editor.take_effects());
        assert_eq!(jobs.len(), 2);
        assert_eq!(editor.state().pending_uploads(), 2);

        // the second file finishes first
        for (job, name) in jobs.iter().rev().zip(["b.png", "a.png"]) {
            editor
                .upload_finished(UploadOutcome {
                    id: job.id,
                    batch: job.batch,
                    result: Ok(stored(name)),
                })
                .unwrap();
        }
        assert_eq!(
            editor.snapshot().blocks(),
            &[
                Node::paragraph(vec![Node::text("fi")]).unwrap(),
                Node::attachment(stored("b.png")),
                Node::attachment(stored("a.png")),
                Node::paragraph(vec![Node::text("rst")]).unwrap(),
                Node::paragraph(vec![Node::text("second")]).unwrap(),
            ]
        );
        assert_eq!(editor.state().pending_uploads(), 0);
    }

    #[test]
    fn test_failed_upload_inserts_nothing() {
        let mut editor = editor();
        editor
            .handle(InputEvent::Drop(vec![PendingFile::new("a.png", "image/png", vec![1])]))
            .unwrap();
        let job = uploads(&editor.take_effects()).pop().unwrap();
        let before = editor.snapshot();
        editor
            .upload_finished(UploadOutcome {
                id: job.id,
                batch: job.batch,
                result: Err(UploadError::Slot {
                    name: "a.png".into(),
                    reason: "quota exceeded".into(),
                }),
            })
            .unwrap();
        assert_eq!(editor.snapshot(), before);
        assert_eq!(
            notices(&editor.take_effects()),
            ["a.png: could not get an upload slot: quota exceeded"]
        );
    }

    #[test]
    fn test_rejected_files_never_become_jobs() {
        let mut editor = editor();
        editor
            .handle(InputEvent::Drop(vec![
                PendingFile::new("run.exe", "application/x-msdownload", vec![1]),
                PendingFile::new("ok.pdf", "application/pdf", vec![1]),
            ]))
            .unwrap();
        let effects = editor.take_effects();
        assert_eq!(uploads(&effects).len(), 1);
        assert_eq!(notices(&effects).len(), 1);
    }

    #[test]
    fn test_deleted_anchor_appends_at_end() {
        let mut editor = Editor::new(
            Document::from_fragment(&[
                Node::paragraph(vec![Node::text("keep")]).unwrap(),
                Node::paragraph(vec![]).unwrap(),
            ])
            .unwrap(),
            EditorConfig::default(),
        );
        editor
            .handle(InputEvent::Drop(vec![PendingFile::new("a.png", "image/png", vec![1])]))
            .unwrap();
        let job = uploads(&editor.take_effects()).pop().unwrap();
        // backspace in the empty last paragraph joins it into the first one
        editor.handle(InputEvent::Key(Key::Backspace)).unwrap();
        assert_eq!(editor.snapshot().blocks().len(), 1);
        editor
            .upload_finished(UploadOutcome {
                id: job.id,
                batch: job.batch,
                result: Ok(stored("a.png")),
            })
            .unwrap();
        assert_eq!(
            editor.snapshot().blocks(),
            &[
                Node::paragraph(vec![Node::text("keep")]).unwrap(),
                Node::attachment(stored("a.png")),
                Node::paragraph(vec![]).unwrap(),
            ]
        );
    }

    #[test]
    fn test_pasted_figma_link_becomes_embed() {
        let mut editor = editor();
        editor
            .handle(InputEvent::Paste("https://www.figma.com/file/abc/Design".into()))
            .unwrap();
        let blocks = editor.snapshot().blocks().to_vec();
        assert_eq!(blocks.len(), 3);
        match blocks[1].kind() {
            NodeKind::Attachment(attrs) => assert_eq!(attrs.kind, AttachmentKind::Figma),
            other => panic!("expected attachment, got {:?}", other),
        }
        assert!(uploads(&editor.take_effects()).is_empty());
    }
}
