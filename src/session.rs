//! # Editing sessions
//!
//! A session is a tokio task that owns one [`Editor`]. Input arrives over an
//! mpsc channel, lookups and uploads run as their own tasks and report back
//! over a second channel, and [`EditorEvent`]s fan out to every subscriber.
use crate::collab::LookupError;
use crate::editor::{Editor, EditorEvent, Effect, InputEvent};
use crate::snapshot::Snapshot;
use crate::trigger::{LookupRequest, LookupSeq, Suggester, Suggestion};
use crate::upload::{UploadJob, UploadOutcome, Uploader};
use crate::util::LoopState;
use displaydoc::Display;
use futures_util::future::{select, Either};
use futures_util::pin_mut;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, debug_span, error, info, instrument, trace, warn};
use tracing_futures::Instrument;

/// Timing of a session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Quiet time after the last keystroke before a lookup runs
    pub debounce: Duration,
    /// Lookups taking longer than this fail with [`LookupError::Timeout`]
    pub lookup_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// The session task is gone
#[derive(Debug, Display, Error, Copy, Clone, PartialEq, Eq)]
pub struct SessionClosed;

#[derive(Debug)]
enum Request {
    Input(InputEvent),
    Snapshot(oneshot::Sender<Snapshot>),
    /// Stop taking input and finish once all uploads are done
    Close,
}

#[derive(Debug)]
enum Completion {
    Lookup(LookupSeq, Result<Vec<Suggestion>, LookupError>),
    Upload(UploadOutcome),
}

/// The handle to a running session
#[derive(Debug)]
pub struct SessionHandle {
    req_tx: mpsc::Sender<Request>,
    bct_tx: broadcast::Sender<EditorEvent>,
    task: JoinHandle<Snapshot>,
}

impl SessionHandle {
    /// Events emitted from now on
    pub fn events(&self) -> BroadcastStream<EditorEvent> {
        BroadcastStream::new(self.bct_tx.subscribe())
    }

    pub async fn send(&self, event: InputEvent) -> Result<(), SessionClosed> {
        self.req_tx
            .send(Request::Input(event))
            .await
            .map_err(|_| SessionClosed)
    }

    /// The document after all input sent so far
    pub async fn snapshot(&self) -> Result<Snapshot, SessionClosed> {
        let (tx, rx) = oneshot::channel();
        self.req_tx
            .send(Request::Snapshot(tx))
            .await
            .map_err(|_| SessionClosed)?;
        rx.await.map_err(|_| SessionClosed)
    }

    /// Waits for running uploads and returns the final document
    pub async fn finish(self) -> Result<Snapshot, SessionClosed> {
        // a closed channel already means the task is shutting down
        let _ = self.req_tx.send(Request::Close).await;
        self.task.await.map_err(|_| SessionClosed)
    }
}

pub struct Session {
    editor: Editor,
    suggester: Suggester,
    uploader: Uploader,
    config: SessionConfig,
    req_rx: mpsc::Receiver<Request>,
    done_tx: mpsc::UnboundedSender<Completion>,
    done_rx: mpsc::UnboundedReceiver<Completion>,
    latest_tx: watch::Sender<Option<LookupSeq>>,
    latest_rx: watch::Receiver<Option<LookupSeq>>,
    bct_tx: broadcast::Sender<EditorEvent>,
    closing: bool,
    input_closed: bool,
}

impl Session {
    /// Starts the session task
    pub fn spawn(
        editor: Editor,
        suggester: Suggester,
        uploader: Uploader,
        config: SessionConfig,
    ) -> SessionHandle {
        let (req_tx, req_rx) = mpsc::channel(100);
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let (latest_tx, latest_rx) = watch::channel(None);
        let (bct_tx, _) = broadcast::channel(100);
        let session = Session {
            editor,
            suggester,
            uploader,
            config,
            req_rx,
            done_tx,
            done_rx,
            latest_tx,
            latest_rx,
            bct_tx: bct_tx.clone(),
            closing: false,
            input_closed: false,
        };
        let task = tokio::spawn(session.run());
        SessionHandle {
            req_tx,
            bct_tx,
            task,
        }
    }

    #[instrument(name = "session", skip(self))]
    async fn run(mut self) -> Snapshot {
        info!("Session started");
        loop {
            let next = if self.input_closed {
                Either::Right(self.done_rx.recv().await)
            } else {
                let req = self.req_rx.recv();
                let done = self.done_rx.recv();
                pin_mut!(req);
                pin_mut!(done);
                match select(req, done).await {
                    Either::Left((req, _)) => Either::Left(req),
                    Either::Right((done, _)) => Either::Right(done),
                }
            };
            let state = match next {
                Either::Left(Some(req)) => self.handle_request(req),
                Either::Left(None) => {
                    debug!("Input channel closed");
                    self.input_closed = true;
                    self.handle_request(Request::Close)
                }
                Either::Right(Some(done)) => self.handle_completion(done),
                Either::Right(None) => {
                    error!("Completion channel closed");
                    LoopState::Break(())
                }
            };
            self.flush();
            if let LoopState::Break(()) = state {
                break;
            }
        }
        info!("Session finished");
        self.editor.snapshot()
    }

    fn finished(&self) -> LoopState<()> {
        if self.closing && self.editor.state().pending_uploads() == 0 {
            LoopState::Break(())
        } else {
            LoopState::Continue
        }
    }

    fn handle_request(&mut self, req: Request) -> LoopState<()> {
        match req {
            Request::Input(_) if self.closing => {
                warn!("Input after close is dropped");
            }
            Request::Input(event) => {
                if let Err(err) = self.editor.handle(event) {
                    warn!("Input could not be applied: {}", err);
                }
            }
            Request::Snapshot(reply) => {
                if reply.send(self.editor.snapshot()).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
            Request::Close => {
                self.closing = true;
                self.req_rx.close();
            }
        }
        self.finished()
    }

    fn handle_completion(&mut self, done: Completion) -> LoopState<()> {
        match done {
            Completion::Lookup(seq, result) => self.editor.lookup_finished(seq, result),
            Completion::Upload(outcome) => {
                if let Err(err) = self.editor.upload_finished(outcome) {
                    error!("Could not place upload: {}", err);
                }
            }
        }
        self.finished()
    }

    /// Starts the work the editor queued and publishes its events
    fn flush(&mut self) {
        for effect in self.editor.take_effects() {
            match effect {
                Effect::Lookup(request) => self.spawn_lookup(request),
                Effect::Upload(job) => self.spawn_upload(job),
                Effect::Event(event) => {
                    if self.bct_tx.send(event).is_err() {
                        trace!("No subscribers");
                    }
                }
            }
        }
    }

    fn spawn_lookup(&self, request: LookupRequest) {
        if self.latest_tx.send(Some(request.seq)).is_err() {
            error!("Lookup sequence watch closed");
            return;
        }
        let suggester = self.suggester.clone();
        let latest = self.latest_rx.clone();
        let done = self.done_tx.clone();
        let SessionConfig {
            debounce,
            lookup_timeout,
        } = self.config;
        let span = debug_span!("lookup", seq = %request.seq, query = %request.query);
        tokio::spawn(
            async move {
                tokio::time::sleep(debounce).await;
                if *latest.borrow() != Some(request.seq) {
                    trace!("Superseded");
                    return;
                }
                let lookup = suggester.lookup(request.kind, &request.query);
                let result = match tokio::time::timeout(lookup_timeout, lookup).await {
                    Ok(result) => result,
                    Err(_) => Err(LookupError::Timeout),
                };
                if done.send(Completion::Lookup(request.seq, result)).is_err() {
                    debug!("Session ended before lookup returned");
                }
            }
            .instrument(span),
        );
    }

    fn spawn_upload(&self, job: UploadJob) {
        let uploader = self.uploader.clone();
        let done = self.done_tx.clone();
        let span = debug_span!("upload", id = %job.id, batch = %job.batch);
        tokio::spawn(
            async move {
                let outcome = uploader.run(job).await;
                if done.send(Completion::Upload(outcome)).is_err() {
                    debug!("Session ended before upload finished");
                }
            }
            .instrument(span),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{
        Directory, EmojiCatalog, ProjectSummary, StaticDirectory, StaticEmojiCatalog, UserSummary,
    };
    use crate::editor::EditorConfig;
    use crate::tree::Document;
    use crate::trigger::MenuView;
    use crate::upload::testing::{uploader, Recorder};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_stream::StreamExt;

    #[derive(Debug, Default)]
    struct CountingDirectory {
        inner: StaticDirectory,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Directory for CountingDirectory {
        async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.search_users(query).await
        }

        async fn search_projects(&self, query: &str) -> Result<Vec<ProjectSummary>, LookupError> {
            self.inner.search_projects(query).await
        }
    }

    fn alice() -> UserSummary {
        UserSummary {
            id: "u7".into(),
            display_name: "Alice".into(),
            username: "alice".into(),
        }
    }

    fn spawn(directory: Arc<CountingDirectory>) -> SessionHandle {
        let emoji: Arc<dyn EmojiCatalog> = Arc::new(StaticEmojiCatalog::default());
        let suggester = Suggester::new(directory, emoji, 10);
        let editor = Editor::new(Document::new(), EditorConfig::default());
        let recorder = Arc::new(Recorder::default());
        Session::spawn(editor, suggester, uploader(&recorder), SessionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_skips_superseded_lookups() {
        let directory = Arc::new(CountingDirectory {
            inner: StaticDirectory::new(vec![alice()], vec![]),
            calls: AtomicUsize::new(0),
        });
        let handle = spawn(directory.clone());
        let mut events = handle.events();

        handle.send(InputEvent::Text("@a".into())).await.unwrap();
        handle.send(InputEvent::Text("l".into())).await.unwrap();
        handle.send(InputEvent::Text("i".into())).await.unwrap();

        let menu = loop {
            match events.next().await {
                Some(Ok(EditorEvent::Menu(Some(view)))) => break view,
                Some(_) => continue,
                None => panic!("session ended"),
            }
        };
        assert_eq!(
            menu,
            MenuView {
                kind: crate::trigger::TriggerKind::Mention,
                query: "ali".into(),
                items: vec!["Alice".into()],
                highlighted: 0,
            }
        );
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        handle.finish().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_finish_waits_for_uploads() {
        let handle = spawn(Arc::new(CountingDirectory::default()));
        handle
            .send(InputEvent::Drop(vec![crate::upload::PendingFile::new(
                "a.png",
                "image/png",
                vec![0; 16],
            )]))
            .await
            .unwrap();
        let snapshot = handle.finish().await.unwrap();
        assert_eq!(snapshot.blocks().len(), 3);
    }
}
