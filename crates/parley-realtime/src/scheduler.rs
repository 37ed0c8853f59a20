//! Cancellable one-shot timers that report back to the coordinator.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::coordinator::Command;

/// Spawns timers that post a [`Command`] when they fire.
///
/// Holds only a weak sender so pending timers never keep the coordinator
/// alive after every engine handle is gone.
#[derive(Debug, Clone)]
pub(crate) struct Scheduler {
    commands: mpsc::WeakSender<Command>,
}

impl Scheduler {
    pub(crate) fn new(commands: mpsc::WeakSender<Command>) -> Self {
        Self { commands }
    }

    /// Deliver `command` after `delay` unless the returned token is cancelled
    /// first. Cancelling an already fired or cancelled timer is a no-op.
    pub(crate) fn schedule(&self, delay: Duration, command: Command) -> CancellationToken {
        let token = CancellationToken::new();
        let guard = token.clone();
        let commands = self.commands.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = guard.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Some(tx) = commands.upgrade() {
                        if tx.send(command).await.is_err() {
                            tracing::debug!("Coordinator gone, dropping timer command");
                        }
                    }
                }
            }
        });

        token
    }
}
