//! Background persistence for an editable draft.
//!
//! An [`Autosaver`] owns one tokio task. Edits are sent to it over a channel,
//! a debounce timer decides when to save, and at most one save is in flight at
//! a time. Requests that arrive while busy collapse into a single pending slot
//! which is served with the newest draft once the running save returns.

pub mod draft;
pub mod guard;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::AutosaveConfig;

pub use draft::{LinkDraft, ProfileDraft, Reconcile};
pub use guard::{NavigationGuard, NavigationGuards};

/// A failed save. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SaveError(pub String);

impl SaveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Persists a draft and answers with the canonical stored version.
#[async_trait]
pub trait DraftSaver<D>: Send + Sync + 'static {
    async fn save(&self, draft: D) -> Result<D, SaveError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutosaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutosaveState {
    pub status: AutosaveStatus,
    pub is_dirty: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

type Edit<D> = Box<dyn FnOnce(&mut D) + Send>;
type SaveFuture<D> = Pin<Box<dyn Future<Output = Result<D, SaveError>> + Send>>;

enum Command<D> {
    Update(Edit<D>),
    Flush,
    Retry,
}

/// Handle to a running autosave task. Dropping it lets an in-flight save
/// finish and then stops the task.
pub struct Autosaver<D> {
    commands: mpsc::UnboundedSender<Command<D>>,
    state: watch::Receiver<AutosaveState>,
    draft: watch::Receiver<D>,
}

impl<D> Autosaver<D>
where
    D: Reconcile + Serialize + Clone + Send + Sync + 'static,
{
    /// Must be called inside a tokio runtime.
    pub fn spawn<S>(initial: D, saver: S, debounce: Duration) -> Self
    where
        S: DraftSaver<D>,
    {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(AutosaveState::default());
        let (draft_tx, draft) = watch::channel(initial.clone());

        let worker = Worker {
            saver: Arc::new(saver),
            debounce,
            snapshot: initial.clone(),
            draft: initial,
            revision: 0,
            sent_revision: 0,
            sent: None,
            pending: false,
            state: AutosaveState::default(),
            state_tx,
            draft_tx,
        };
        tokio::spawn(worker.run(rx));

        Self { commands, state, draft }
    }

    pub fn with_config<S>(initial: D, saver: S, config: &AutosaveConfig) -> Self
    where
        S: DraftSaver<D>,
    {
        Self::spawn(initial, saver, Duration::from_millis(config.debounce_ms))
    }

    /// Swap the whole draft.
    pub fn replace(&self, draft: D) {
        self.update(move |current| *current = draft);
    }

    /// Mutate the current draft in place.
    pub fn update(&self, edit: impl FnOnce(&mut D) + Send + 'static) {
        self.send(Command::Update(Box::new(edit)));
    }

    /// Save now if there is anything unsaved.
    pub fn flush(&self) {
        self.send(Command::Flush);
    }

    /// Save the current draft now, dirty or not.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    pub fn state(&self) -> AutosaveState {
        self.state.borrow().clone()
    }

    pub fn draft(&self) -> D {
        self.draft.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveState> {
        self.state.clone()
    }

    /// Resolves with the first published state matching `done`.
    pub async fn wait_until(&self, done: impl FnMut(&AutosaveState) -> bool) -> AutosaveState {
        let mut rx = self.state.clone();
        if let Ok(state) = rx.wait_for(done).await {
            return state.clone();
        }
        let state = rx.borrow().clone();
        state
    }

    fn send(&self, command: Command<D>) {
        if self.commands.send(command).is_err() {
            warn!("Autosave task is gone; dropping command");
        }
    }
}

enum Next {
    Rest,
    SaveNow,
    Debounce,
}

struct Worker<D, S> {
    saver: Arc<S>,
    debounce: Duration,
    draft: D,
    snapshot: D,
    /// Bumped on every edit.
    revision: u64,
    sent_revision: u64,
    sent: Option<D>,
    pending: bool,
    state: AutosaveState,
    state_tx: watch::Sender<AutosaveState>,
    draft_tx: watch::Sender<D>,
}

impl<D, S> Worker<D, S>
where
    D: Reconcile + Serialize + Clone + Send + Sync + 'static,
    S: DraftSaver<D>,
{
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command<D>>) {
        let timer = sleep(self.debounce);
        tokio::pin!(timer);
        let mut armed = false;
        let mut in_flight: Option<SaveFuture<D>> = None;
        let mut open = true;

        while open || in_flight.is_some() {
            tokio::select! {
                command = commands.recv(), if open => match command {
                    None => open = false,
                    Some(Command::Update(apply)) => {
                        self.edit(apply);
                        if in_flight.is_some() {
                            self.pending = true;
                        } else {
                            armed = true;
                            timer.as_mut().reset(Instant::now() + self.debounce);
                        }
                    }
                    Some(Command::Flush) => {
                        armed = false;
                        if self.is_dirty() {
                            self.request(&mut in_flight);
                        }
                    }
                    Some(Command::Retry) => {
                        armed = false;
                        self.request(&mut in_flight);
                    }
                },
                () = &mut timer, if armed => {
                    armed = false;
                    if self.is_dirty() {
                        self.request(&mut in_flight);
                    }
                }
                result = poll_save(&mut in_flight) => {
                    in_flight = None;
                    match self.finish(result) {
                        Next::Rest => {}
                        Next::SaveNow => {
                            armed = false;
                            in_flight = Some(self.start());
                        }
                        Next::Debounce => {
                            armed = true;
                            timer.as_mut().reset(Instant::now() + self.debounce);
                        }
                    }
                }
            }
        }
        debug!("Autosave task stopped");
    }

    fn edit(&mut self, apply: impl FnOnce(&mut D)) {
        apply(&mut self.draft);
        self.revision += 1;
        self.draft_tx.send_replace(self.draft.clone());
        self.publish();
    }

    fn request(&mut self, in_flight: &mut Option<SaveFuture<D>>) {
        if in_flight.is_some() {
            debug!("Save requested while busy");
            self.pending = true;
        } else {
            *in_flight = Some(self.start());
        }
    }

    fn start(&mut self) -> SaveFuture<D> {
        self.pending = false;
        self.sent_revision = self.revision;
        self.sent = Some(self.draft.clone());
        self.state.status = AutosaveStatus::Saving;
        self.publish();
        debug!("Autosave started at revision {}", self.revision);

        let saver = self.saver.clone();
        let draft = self.draft.clone();
        Box::pin(async move { saver.save(draft).await })
    }

    fn finish(&mut self, result: Result<D, SaveError>) -> Next {
        let sent = self.sent.take();
        let edited = self.revision != self.sent_revision;

        match result {
            Ok(canonical) => {
                let canonical = match &sent {
                    Some(sent) => canonical.merge_local(sent),
                    None => canonical,
                };
                if edited {
                    self.draft.adopt_ids(sent.as_ref().unwrap_or(&canonical), &canonical);
                } else {
                    self.draft = canonical.clone();
                }
                self.draft_tx.send_replace(self.draft.clone());
                self.snapshot = canonical;
                self.state.status = AutosaveStatus::Saved;
                self.state.last_saved_at = Some(Utc::now());
                self.state.last_error = None;
                debug!("Autosave finished at revision {}", self.sent_revision);
            }
            Err(err) => {
                warn!("Autosave failed: {}", err);
                self.state.status = AutosaveStatus::Error;
                self.state.last_error = Some(err.to_string());
            }
        }
        self.publish();

        match (self.state.status, self.pending) {
            (_, false) => Next::Rest,
            (AutosaveStatus::Error, true) => {
                self.pending = false;
                Next::Debounce
            }
            (_, true) => Next::SaveNow,
        }
    }

    fn is_dirty(&self) -> bool {
        match (serde_json::to_value(&self.draft), serde_json::to_value(&self.snapshot)) {
            (Ok(draft), Ok(snapshot)) => draft != snapshot,
            _ => true,
        }
    }

    fn publish(&mut self) {
        self.state.is_dirty = self.is_dirty();
        self.state_tx.send_replace(self.state.clone());
    }
}

async fn poll_save<D>(in_flight: &mut Option<SaveFuture<D>>) -> Result<D, SaveError> {
    match in_flight {
        Some(save) => save.await,
        None => std::future::pending().await,
    }
}
