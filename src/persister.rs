//! # Debounced persistence
//!
//! Collapses a burst of rating changes into a single save.
//!
//! ## Guarantees
//! - Each [`notify`](DebouncedPersister::notify) aborts the pending timer and
//!   arms a new one; timers never stack.
//! - The persist callback runs exactly once per quiet period, when the timer
//!   fires. It receives no payload: whatever it saves must be read no earlier
//!   than that point so edits made after the triggering click are included.
//! - The callback is synchronous and runs after the timer's last await, so
//!   a later `notify` cannot abort it half-way. Slow work (the network save)
//!   belongs elsewhere; the session hands it to a
//!   [`SaveQueue`](crate::saver::SaveQueue).
//!
//! ## NOT Responsible For
//! - Retrying or queueing failed saves
//! - Building or sending the payload

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Quiet period used when none is configured.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1_000);

type PersistFn = Arc<dyn Fn() + Send + Sync>;

/// Owns the debounce timer and the callback it fires.
pub struct DebouncedPersister {
    quiet_period: Duration,
    persist: PersistFn,
    pending: Option<JoinHandle<()>>,
}

impl DebouncedPersister {
    /// `persist` runs once after `quiet_period` passes with no further `notify`.
    pub fn new<F>(quiet_period: Duration, persist: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            quiet_period,
            persist: Arc::new(persist),
            pending: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Restart the quiet period. Must be called from within a tokio runtime.
    pub fn notify(&mut self) {
        let restarted = self.cancel();
        let persist = Arc::clone(&self.persist);
        let quiet_period = self.quiet_period;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            persist();
        }));
        debug!(restarted, quiet_ms = quiet_period.as_millis() as u64, "debounce timer armed");
    }

    /// Whether a timer is armed and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Disarm the pending timer. Returns `true` if one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Fire now instead of waiting, if a timer is pending. Returns whether it fired.
    pub fn flush(&mut self) -> bool {
        if self.cancel() {
            (self.persist)();
            true
        } else {
            false
        }
    }
}

impl Drop for DebouncedPersister {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for DebouncedPersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedPersister")
            .field("quiet_period", &self.quiet_period)
            .field("pending", &self.is_pending())
            .finish()
    }
}
