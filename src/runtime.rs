//! Async driver for the feed engine.
//!
//! [`FeedRuntime`] owns the [`FeedController`] on a single tokio task. It feeds
//! it events from three sources:
//!
//! - commands from [`FeedHandle`]s (user intents)
//! - responses of remote calls spawned on the [`FeedWorker`]
//! - the debounce deadline, as [`Event::Tick`]
//!
//! After each event that asks for a render, the runtime publishes a fresh
//! [`FeedViewModel`] on a `watch` channel. Notices go out on an unbounded
//! `mpsc` channel.

use crate::app::{handle_event, Action, Event, FeedController, Notice};
use crate::domain::{FeedError, FeedQuery, PostId, Result};
use crate::ui::FeedViewModel;
use crate::worker::{FeedWorker, RemoteResponse};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const COMMAND_BUFFER: usize = 64;

struct Command {
    event: Event,
    reply: oneshot::Sender<Result<()>>,
}

/// Client side of a running [`FeedRuntime`].
///
/// Dropping every handle stops the runtime.
#[derive(Debug)]
pub struct FeedHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<FeedViewModel>,
    notices: mpsc::UnboundedReceiver<Notice>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command").field("event", &self.event).finish_non_exhaustive()
    }
}

impl FeedHandle {
    /// Sends an event and waits until the engine has applied it.
    ///
    /// # Errors
    ///
    /// The engine's rejection of the intent, or [`FeedError::Io`] if the
    /// runtime has stopped.
    pub async fn send(&self, event: Event) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { event, reply })
            .await
            .map_err(|_| FeedError::Io("feed runtime stopped".to_string()))?;
        response
            .await
            .map_err(|_| FeedError::Io("feed runtime stopped".to_string()))?
    }

    /// Debounced search/sort change.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn search(&self, query: FeedQuery) -> Result<()> {
        self.send(Event::SearchSortChanged(query)).await
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn refresh(&self) -> Result<()> {
        self.send(Event::Refresh).await
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn create_post(&self, text: impl Into<String>) -> Result<()> {
        self.send(Event::CreatePost { text: text.into() }).await
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn edit_post(&self, id: PostId, text: impl Into<String>) -> Result<()> {
        self.send(Event::EditPost { id, text: text.into() }).await
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn delete_post(&self, id: PostId) -> Result<()> {
        self.send(Event::DeletePost { id }).await
    }

    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn toggle_vote(&self, id: PostId) -> Result<()> {
        self.send(Event::ToggleVote { id }).await
    }

    /// Latest published view model.
    #[must_use]
    pub fn view(&self) -> FeedViewModel {
        self.view.borrow().clone()
    }

    /// A receiver that is notified on every publish.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FeedViewModel> {
        self.view.clone()
    }

    /// Waits for the next notice. `None` once the runtime has stopped.
    pub async fn next_notice(&mut self) -> Option<Notice> {
        self.notices.recv().await
    }

    /// Returns a notice if one is already queued.
    pub fn try_notice(&mut self) -> Option<Notice> {
        self.notices.try_recv().ok()
    }
}

/// Owns the controller and executes its actions.
pub struct FeedRuntime {
    controller: FeedController,
    worker: FeedWorker,
    commands: mpsc::Receiver<Command>,
    responses_tx: mpsc::UnboundedSender<RemoteResponse>,
    responses: mpsc::UnboundedReceiver<RemoteResponse>,
    view: watch::Sender<FeedViewModel>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl FeedRuntime {
    /// Spawns the runtime on the current tokio runtime.
    #[must_use]
    pub fn spawn(controller: FeedController, worker: FeedWorker) -> (FeedHandle, JoinHandle<()>) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (responses_tx, responses) = mpsc::unbounded_channel();
        let (notices_tx, notices) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(FeedViewModel::compute(&controller, chrono::Utc::now()));

        let runtime = Self {
            controller,
            worker,
            commands,
            responses_tx,
            responses,
            view: view_tx,
            notices: notices_tx,
        };
        let task = tokio::spawn(runtime.run());

        (
            FeedHandle {
                commands: commands_tx,
                view,
                notices,
            },
            task,
        )
    }

    async fn run(mut self) {
        tracing::debug!("feed runtime started");
        loop {
            let deadline = self.controller.next_deadline().map(Instant::from_std);

            tokio::select! {
                command = self.commands.recv() => {
                    let Some(Command { event, reply }) = command else {
                        break;
                    };
                    let result = self.process(event);
                    let _ = reply.send(result);
                }
                Some(response) = self.responses.recv() => {
                    if let Err(e) = self.process(Event::Response(response)) {
                        tracing::warn!(error = %e, "response handling failed");
                    }
                }
                () = sleep_until(deadline) => {
                    if let Err(e) = self.process(Event::Tick) {
                        tracing::warn!(error = %e, "tick handling failed");
                    }
                }
            }
        }
        tracing::debug!("feed runtime stopped");
    }

    fn process(&mut self, event: Event) -> Result<()> {
        let now = Instant::now().into_std();
        let (should_render, actions) = handle_event(&mut self.controller, event, now)?;

        if should_render {
            self.publish();
        }
        for action in actions {
            self.execute(action);
        }
        Ok(())
    }

    fn execute(&self, action: Action) {
        match action {
            Action::Dispatch(request) => {
                let worker = self.worker.clone();
                let responses = self.responses_tx.clone();
                tokio::spawn(async move {
                    let response = worker.execute(request).await;
                    // Runtime gone; nothing left to reconcile.
                    let _ = responses.send(response);
                });
            }
            Action::Notify(notice) => {
                tracing::warn!(notice = %notice, "user notice");
                let _ = self.notices.send(notice);
            }
        }
    }

    fn publish(&self) {
        let vm = FeedViewModel::compute(&self.controller, chrono::Utc::now());
        tracing::debug!(version = vm.version, cards = vm.cards.len(), loading = vm.loading, "publishing view");
        self.view.send_replace(vm);
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
