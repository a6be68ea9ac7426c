//! Ranked input handlers
//!
//! Every [`InputEvent`] is offered to the handlers in priority order until
//! one of them stops it. The suggestion menu sits in front so that arrow
//! keys, Enter and Escape reach it before they reach the document.
use super::{EditorEvent, EditorState, InputEvent, Key};
use crate::tree::TreeError;
use crate::trigger::KeyOutcome;
use crate::upload::classify_embed;
use std::fmt;
use tracing::trace;

/// Whether later handlers get to see an event
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Propagation {
    Stop,
    Continue,
}

/// Handlers run from `Critical` down to `Low`
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Critical,
    High,
    Normal,
    Low,
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> Priority;
    fn handle(&self, state: &mut EditorState, event: &InputEvent)
        -> Result<Propagation, TreeError>;
}

/// The handlers of one editor, sorted by priority
#[derive(Default)]
pub struct Pipeline {
    handlers: Vec<Box<dyn CommandHandler>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}

impl Pipeline {
    /// Menu, deletion, files, embeds, submit and plain text input
    pub fn standard() -> Self {
        let mut pipeline = Self::default();
        pipeline.register(Box::new(SuggestionMenu));
        pipeline.register(Box::new(Delete));
        pipeline.register(Box::new(FileDrop));
        pipeline.register(Box::new(EmbedPaste));
        pipeline.register(Box::new(Submit));
        pipeline.register(Box::new(TextInput));
        pipeline
    }

    /// Adds a handler behind all handlers of the same or higher priority
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) {
        self.handlers.push(handler);
        self.handlers.sort_by_key(|h| h.priority());
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn dispatch(&self, state: &mut EditorState, event: &InputEvent) -> Result<(), TreeError> {
        for handler in &self.handlers {
            if handler.handle(state, event)? == Propagation::Stop {
                trace!("{:?} handled by {}", event, handler.name());
                break;
            }
        }
        Ok(())
    }
}

struct SuggestionMenu;

impl CommandHandler for SuggestionMenu {
    fn name(&self) -> &'static str {
        "suggestion-menu"
    }

    fn priority(&self) -> Priority {
        Priority::Critical
    }

    fn handle(
        &self,
        state: &mut EditorState,
        event: &InputEvent,
    ) -> Result<Propagation, TreeError> {
        if !state.triggers.is_open() {
            return Ok(Propagation::Continue);
        }
        match event {
            InputEvent::Key(key) => match state.triggers.on_key(key) {
                KeyOutcome::Ignored => Ok(Propagation::Continue),
                KeyOutcome::Moved | KeyOutcome::Closed => Ok(Propagation::Stop),
                KeyOutcome::Commit(item, active) => {
                    state.commit(item, active)?;
                    Ok(Propagation::Stop)
                }
            },
            InputEvent::Blur | InputEvent::ClickOutside => {
                state.triggers.dismiss();
                Ok(Propagation::Continue)
            }
            _ => Ok(Propagation::Continue),
        }
    }
}

struct Delete;

impl CommandHandler for Delete {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn handle(
        &self,
        state: &mut EditorState,
        event: &InputEvent,
    ) -> Result<Propagation, TreeError> {
        match event {
            InputEvent::Key(Key::Backspace) => {
                state.edit(|doc, cursor| doc.delete_backward(cursor))?;
            }
            InputEvent::Key(Key::Delete) => {
                state.edit(|doc, cursor| doc.delete_forward(cursor))?;
            }
            _ => return Ok(Propagation::Continue),
        }
        Ok(Propagation::Stop)
    }
}

struct FileDrop;

impl CommandHandler for FileDrop {
    fn name(&self) -> &'static str {
        "file-drop"
    }

    fn priority(&self) -> Priority {
        Priority::High
    }

    fn handle(
        &self,
        state: &mut EditorState,
        event: &InputEvent,
    ) -> Result<Propagation, TreeError> {
        match event {
            InputEvent::Drop(files) => state.attach_files(files.clone(), None)?,
            InputEvent::PickedFiles(files) => state.attach_picked(files.clone())?,
            _ => return Ok(Propagation::Continue),
        }
        Ok(Propagation::Stop)
    }
}

struct EmbedPaste;

impl CommandHandler for EmbedPaste {
    fn name(&self) -> &'static str {
        "embed-paste"
    }

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn handle(
        &self,
        state: &mut EditorState,
        event: &InputEvent,
    ) -> Result<Propagation, TreeError> {
        if let InputEvent::Paste(text) = event {
            let url = text.trim();
            if let Some(kind) = classify_embed(url) {
                state.insert_embed(kind, url)?;
                return Ok(Propagation::Stop);
            }
        }
        Ok(Propagation::Continue)
    }
}

struct Submit;

impl CommandHandler for Submit {
    fn name(&self) -> &'static str {
        "submit"
    }

    fn priority(&self) -> Priority {
        Priority::Normal
    }

    fn handle(
        &self,
        state: &mut EditorState,
        event: &InputEvent,
    ) -> Result<Propagation, TreeError> {
        let submits = matches!(event, InputEvent::Key(Key::Enter))
            && state.config.submit_on_enter
            && !state.triggers.is_open();
        if !submits {
            return Ok(Propagation::Continue);
        }
        let snapshot = state.doc.to_snapshot();
        state.emit(EditorEvent::Submitted(snapshot));
        Ok(Propagation::Stop)
    }
}

struct TextInput;

impl CommandHandler for TextInput {
    fn name(&self) -> &'static str {
        "text-input"
    }

    fn priority(&self) -> Priority {
        Priority::Low
    }

    fn handle(
        &self,
        state: &mut EditorState,
        event: &InputEvent,
    ) -> Result<Propagation, TreeError> {
        match event {
            InputEvent::Text(text) | InputEvent::Paste(text) => {
                state.edit(|doc, cursor| doc.insert_text(cursor, text))?;
            }
            InputEvent::Key(Key::Enter) => {
                state.edit(|doc, cursor| doc.split_block(cursor))?;
            }
            InputEvent::Key(Key::Left) => {
                state.cursor = state.doc.move_left(state.cursor);
            }
            InputEvent::Key(Key::Right) => {
                state.cursor = state.doc.move_right(state.cursor);
            }
            InputEvent::MoveCursor(cursor) => state.set_cursor(*cursor)?,
            _ => return Ok(Propagation::Continue),
        }
        Ok(Propagation::Stop)
    }
}
