//! Reconnect supervisor: grace timers between connection loss and `Offline`.

use std::collections::HashMap;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use parley_core::types::Identity;

#[derive(Debug)]
struct GraceTimer {
    epoch: u64,
    started_at: Instant,
    token: CancellationToken,
}

/// Tracks which users are inside their reconnection grace period.
///
/// Each timer carries an epoch. A timer that fires after being replaced or
/// cancelled presents a stale epoch and is ignored, so a cancel racing with
/// the timer's own expiry is harmless.
#[derive(Debug, Default)]
pub struct ReconnectSupervisor {
    pending: HashMap<Identity, GraceTimer>,
    next_epoch: u64,
}

impl ReconnectSupervisor {
    /// Create an empty supervisor
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the grace timer for `identity`.
    ///
    /// `schedule` receives the new epoch and returns the running timer.
    pub fn start(
        &mut self,
        identity: &Identity,
        schedule: impl FnOnce(u64) -> CancellationToken,
    ) -> u64 {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let timer = GraceTimer {
            epoch,
            started_at: Instant::now(),
            token: schedule(epoch),
        };
        if let Some(previous) = self.pending.insert(identity.clone(), timer) {
            previous.token.cancel();
        }
        tracing::info!(identity = %identity, epoch, "Grace period started");
        epoch
    }

    /// Stop the grace timer, returning whether one was running.
    pub fn cancel(&mut self, identity: &Identity) -> bool {
        match self.pending.remove(identity) {
            Some(timer) => {
                timer.token.cancel();
                tracing::info!(
                    identity = %identity,
                    away_for = ?timer.started_at.elapsed(),
                    "Grace period cancelled"
                );
                true
            }
            None => false,
        }
    }

    /// Consume the timer if `epoch` is still the current one.
    pub fn take_if_current(&mut self, identity: &Identity, epoch: u64) -> bool {
        match self.pending.get(identity) {
            Some(timer) if timer.epoch == epoch => {
                self.pending.remove(identity);
                true
            }
            _ => false,
        }
    }

    /// Whether `identity` is inside its grace period.
    pub fn is_pending(&self, identity: &Identity) -> bool {
        self.pending.contains_key(identity)
    }

    /// Number of running grace timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no grace timers are running.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Cancel every timer.
    pub fn clear(&mut self) {
        for (_, timer) in self.pending.drain() {
            timer.token.cancel();
        }
    }
}
