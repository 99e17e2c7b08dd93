//! Background autosave
//!
//! A tokio task that wakes once per interval and saves the store if it is
//! dirty. It runs until told to shut down; the owner then performs a final
//! `Store::save()` itself.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::store::Store;

/// Commands sent to the autosave task
#[derive(Debug)]
pub enum AutosaveCommand {
    /// Save immediately if dirty, then acknowledge
    SaveNow(oneshot::Sender<()>),
    /// Stop the task
    Shutdown,
}

/// Handle for controlling the autosave task
pub struct AutosaveHandle {
    command_tx: mpsc::Sender<AutosaveCommand>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    /// Save now instead of waiting for the next tick
    pub async fn save_now(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self
            .command_tx
            .send(AutosaveCommand::SaveNow(ack_tx))
            .await
            .is_ok()
        {
            let _ = ack_rx.await;
        }
    }

    /// Stop the task and wait for it to finish
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(AutosaveCommand::Shutdown).await;
        if let Err(e) = self.task.await {
            error!("Autosave task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawn the autosave task on the current tokio runtime
pub fn spawn_autosave(store: Store, interval: Duration) -> AutosaveHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let task = tokio::spawn(autosave_task(store, interval, command_rx));

    AutosaveHandle { command_tx, task }
}

async fn autosave_task(
    store: Store,
    interval: Duration,
    mut command_rx: mpsc::Receiver<AutosaveCommand>,
) {
    debug!("Autosave every {:?}", interval);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                save_if_dirty(&store).await;
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(AutosaveCommand::SaveNow(ack)) => {
                        save_if_dirty(&store).await;
                        let _ = ack.send(());
                    }
                    Some(AutosaveCommand::Shutdown) | None => break,
                }
            }
        }
    }

    debug!("Autosave stopped");
}

/// Save on a blocking thread; failures are logged and retried next tick
async fn save_if_dirty(store: &Store) {
    if !store.is_dirty() {
        return;
    }

    let saver = store.clone();
    match tokio::task::spawn_blocking(move || saver.save()).await {
        Ok(Ok(())) => debug!("Autosaved"),
        Ok(Err(e)) if e.is_recoverable() => warn!("Autosave failed, will retry: {}", e),
        Ok(Err(e)) => error!("Autosave failed: {}", e),
        Err(e) => error!("Autosave task panicked: {}", e),
    }
}

impl Store {
    /// Spawn autosave with the configured interval
    pub fn spawn_autosave(&self) -> AutosaveHandle {
        spawn_autosave(self.clone(), self.config().autosave_interval())
    }
}
