//! Async event loop driving a [`SessionFlowController`].
//!
//! The runner owns the controller on a single Tokio task and multiplexes
//! three sources:
//!
//! - UI commands ([`FlowCommand`]) from a [`FlowHandle`]
//! - reader events from the shared [`ReaderEvent`] channel
//! - the deadline of the scheduled restart
//!
//! After each step the current [`FlowStatus`] is published on a watch
//! channel. Handler errors are logged; they never stop the loop.

use std::future;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info};

use tagpair_core::{Error, Result};
use tagpair_hardware::{BarcodeReader, NfcReader, PlatformRedirect, ReaderEvent};
use tagpair_storage::KeyValueStore;

use crate::controller::{Disposition, FlowStatus, SessionFlowController};
use crate::redirect::RedirectCallback;

/// Capacity of the command channel.
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// Command sent from the UI layer to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowCommand {
    /// Start (or restart) the flow.
    Start,

    /// Cancel in-flight scans and the pending restart.
    Cancel,

    /// Deliver the result of the external scan app.
    RedirectCallback(RedirectCallback),

    /// Stop the runner.
    Shutdown,
}

/// Handle to a running flow.
#[derive(Debug)]
pub struct FlowHandle {
    commands: mpsc::Sender<FlowCommand>,
    status: watch::Receiver<FlowStatus>,
    task: JoinHandle<()>,
}

impl FlowHandle {
    /// Send a command to the runner.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunnerStopped`] if the runner has exited.
    pub async fn send(&self, command: FlowCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::RunnerStopped)
    }

    /// Start (or restart) the flow.
    pub async fn start(&self) -> Result<()> {
        self.send(FlowCommand::Start).await
    }

    /// Cancel in-flight scans and the pending restart.
    pub async fn cancel(&self) -> Result<()> {
        self.send(FlowCommand::Cancel).await
    }

    /// Deliver a redirect callback.
    pub async fn redirect_callback(&self, callback: RedirectCallback) -> Result<()> {
        self.send(FlowCommand::RedirectCallback(callback)).await
    }

    /// Latest published status.
    pub fn status(&self) -> FlowStatus {
        self.status.borrow().clone()
    }

    /// Subscribe to status updates.
    pub fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.status.clone()
    }

    /// Stop the runner and wait for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RunnerStopped`] if the runner task panicked.
    pub async fn shutdown(self) -> Result<()> {
        // The runner may already be gone; joining below reports how it ended.
        let _ = self.commands.send(FlowCommand::Shutdown).await;
        self.task.await.map_err(|e| {
            error!("Flow runner task failed: {}", e);
            Error::RunnerStopped
        })
    }
}

/// Single-task event loop owning a controller.
pub struct FlowRunner<B, N, R, S> {
    controller: SessionFlowController<B, N, R, S>,
    commands: mpsc::Receiver<FlowCommand>,
    events: mpsc::Receiver<ReaderEvent>,
    status: watch::Sender<FlowStatus>,
}

impl<B, N, R, S> FlowRunner<B, N, R, S>
where
    B: BarcodeReader + 'static,
    N: NfcReader + 'static,
    R: PlatformRedirect + 'static,
    S: KeyValueStore + 'static,
{
    /// Spawn the runner on the current Tokio runtime.
    ///
    /// The flow is not started; send [`FlowCommand::Start`] (or a redirect
    /// callback first, when resuming after a redirect).
    pub fn spawn(
        controller: SessionFlowController<B, N, R, S>,
        events: mpsc::Receiver<ReaderEvent>,
    ) -> FlowHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(controller.status());

        let runner = Self {
            controller,
            commands: command_rx,
            events,
            status: status_tx,
        };
        let task = tokio::spawn(runner.run());

        FlowHandle {
            commands: command_tx,
            status: status_rx,
            task,
        }
    }

    async fn run(mut self) {
        info!("Flow runner started");

        loop {
            let deadline = self.controller.restart_deadline();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(FlowCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.events.recv() => {
                    let result = self.controller.handle_reader_event(event).await;
                    log_outcome("reader event", result);
                }
                () = restart_due(deadline) => {
                    if let Err(e) = self.controller.poll_restart().await {
                        error!("Automatic restart failed: {}", e);
                    }
                }
            }

            self.status.send_replace(self.controller.status());
        }

        self.controller.cancel();
        self.status.send_replace(self.controller.status());
        info!("Flow runner stopped");
    }

    async fn handle_command(&mut self, command: FlowCommand) {
        debug!("Flow command: {:?}", command);
        match command {
            FlowCommand::Start => {
                if let Err(e) = self.controller.start().await {
                    error!("Failed to start flow: {}", e);
                }
            }
            FlowCommand::Cancel => self.controller.cancel(),
            FlowCommand::RedirectCallback(callback) => {
                let result = self.controller.on_redirect_callback(&callback).await;
                log_outcome("redirect callback", result);
            }
            FlowCommand::Shutdown => {}
        }
    }
}

async fn restart_due(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

fn log_outcome(source: &str, result: Result<Disposition>) {
    match result {
        Ok(Disposition::Applied) => {}
        Ok(Disposition::Dropped(reason)) => debug!("Dropped {}: {:?}", source, reason),
        Err(e) => error!("Failed to handle {}: {}", source, e),
    }
}
