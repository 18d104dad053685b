//! Actor service around the [`Coordinator`].
//!
//! The coordinator runs inside one tokio task that owns it exclusively.
//! Commands, resource events and timer fires all arrive over channels and are
//! handled one at a time, so no handler ever observes another half-way
//! through. Callers talk to the task through a cloneable
//! [`CoordinatorHandle`].

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use focus_core::{FocusError, Result};

use crate::coordinator::{Coordinator, CoordinatorOptions};
use crate::dispatcher::{Command, Response};
use crate::host::Host;
use crate::lifecycle::ResourceEvent;
use crate::scheduler::{Scheduler, TimerKind};
use crate::store::StateStore;

/// Inbound messages are buffered; senders wait when the loop falls behind.
const INBOX_CAPACITY: usize = 64;

enum Message {
    Request {
        command: Command,
        reply: oneshot::Sender<Response>,
    },
    Resource(ResourceEvent),
    Shutdown,
}

// ── CoordinatorService ────────────────────────────────────────────────────────

pub struct CoordinatorService;

impl CoordinatorService {
    /// Restore persisted state, re-arm the periodic timers and spawn the
    /// event loop.
    ///
    /// Returns a [`CoordinatorHandle`] for talking to the loop and a
    /// [`ServiceTask`] for waiting on or aborting it.
    pub async fn start(
        host: Host,
        store: StateStore,
        options: CoordinatorOptions,
    ) -> Result<(CoordinatorHandle, ServiceTask)> {
        let (scheduler, timer_rx) = Scheduler::channel();
        let mut coordinator = Coordinator::load(host, store, scheduler, options).await?;
        coordinator.start_timers();

        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let handle = tokio::spawn(event_loop(coordinator, rx, timer_rx));
        tracing::info!("coordinator service started");

        Ok((CoordinatorHandle { tx }, ServiceTask { handle }))
    }
}

/// Runs until a shutdown message arrives or every handle is dropped.
async fn event_loop(
    mut coordinator: Coordinator,
    mut inbox: mpsc::Receiver<Message>,
    mut timers: mpsc::UnboundedReceiver<TimerKind>,
) {
    loop {
        tokio::select! {
            message = inbox.recv() => match message {
                Some(Message::Request { command, reply }) => {
                    let response = coordinator.handle(command).await;
                    if reply.send(response).is_err() {
                        tracing::debug!("requester went away before the response");
                    }
                }
                Some(Message::Resource(event)) => {
                    if let Err(e) = coordinator.on_resource_event(event).await {
                        tracing::error!(error = %e, "resource event handling failed");
                    }
                }
                Some(Message::Shutdown) | None => break,
            },
            Some(kind) = timers.recv() => {
                if let Err(e) = coordinator.on_timer(kind.clone()).await {
                    tracing::error!(timer = ?kind, error = %e, "timer handling failed");
                }
            }
        }
    }

    coordinator.shutdown();
    tracing::info!("coordinator service stopped");
}

// ── CoordinatorHandle ─────────────────────────────────────────────────────────

/// Cloneable sender side of the coordinator loop.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Message>,
}

impl CoordinatorHandle {
    /// Send a command and wait for its response.
    pub async fn request(&self, command: Command) -> Result<Response> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(Message::Request { command, reply })
            .await
            .map_err(|_| FocusError::Stopped)?;
        response.await.map_err(|_| FocusError::Stopped)
    }

    /// Decode a raw JSON request and send it. A malformed payload is answered
    /// locally without reaching the loop.
    pub async fn request_value(&self, value: Value) -> Result<Response> {
        match Command::from_value(value) {
            Ok(command) => self.request(command).await,
            Err(e) => Ok(Response::error(e.to_string())),
        }
    }

    /// Queue a resource lifecycle event. Events and requests are handled in
    /// the order they were sent.
    pub async fn resource_event(&self, event: ResourceEvent) -> Result<()> {
        self.tx
            .send(Message::Resource(event))
            .await
            .map_err(|_| FocusError::Stopped)
    }

    /// Ask the loop to stop after the messages already queued.
    pub async fn shutdown(&self) -> Result<()> {
        self.tx
            .send(Message::Shutdown)
            .await
            .map_err(|_| FocusError::Stopped)
    }
}

// ── ServiceTask ───────────────────────────────────────────────────────────────

/// Join handle of the coordinator loop.
pub struct ServiceTask {
    handle: JoinHandle<()>,
}

impl ServiceTask {
    /// Wait for the loop to finish.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            if !e.is_cancelled() {
                tracing::error!(error = %e, "coordinator task panicked");
            }
        }
    }

    /// Immediately abort the loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
