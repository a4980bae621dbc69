//! Phase deadlines for Augur rooms.
//!
//! Every timed phase of a round (word selection, drawing, disclosure) ends
//! when its deadline passes unless something ends it first. A room owns one
//! [`PhaseTimer`]; arming it replaces whatever was pending, so a room never
//! has two live deadlines.
//!
//! # Stale callbacks
//!
//! Cancelling aborts the sleeping task, but a callback that already fired
//! may still be queued in the room's inbox. Each arming therefore hands out
//! a fresh [`TimerToken`]; the room calls [`PhaseTimer::settle`] with the
//! token it received and drops the callback when the token is no longer
//! current.
//!
//! # Integration
//!
//! The timer sits inside a room actor and feeds back into its inbox:
//!
//! ```ignore
//! let mailbox = inbox_tx.downgrade();
//! timer.arm(Duration::from_secs(15), move |token| async move {
//!     if let Some(tx) = mailbox.upgrade() {
//!         let _ = tx.send(Command::TimerFired { token }).await;
//!     }
//! });
//!
//! // later, in the actor loop
//! Command::TimerFired { token } => {
//!     if !timer.settle(token) {
//!         return; // superseded
//!     }
//!     // advance the phase
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::trace;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// Identifies one arming of a [`PhaseTimer`].
///
/// Tokens increase monotonically per timer and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Returns the underlying generation number.
    pub fn generation(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Counters describing what a timer has done over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerStats {
    /// Times [`PhaseTimer::arm`] was called.
    pub armed: u64,
    /// Pending deadlines dropped before they fired (explicitly or by re-arming).
    pub cancelled: u64,
    /// Fired callbacks accepted by [`PhaseTimer::settle`].
    pub settled: u64,
    /// Fired callbacks rejected by [`PhaseTimer::settle`].
    pub stale: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

struct Pending {
    token: TimerToken,
    deadline: Instant,
    task: JoinHandle<()>,
}

/// A single cancellable deadline, re-armable any number of times.
///
/// Dropping the timer aborts the pending task.
#[derive(Default)]
pub struct PhaseTimer {
    generation: u64,
    pending: Option<Pending>,
    stats: TimerStats,
}

impl PhaseTimer {
    /// Creates an unarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `on_fire` to run once `after` has elapsed, replacing any
    /// pending deadline.
    ///
    /// The callback receives the token returned here. Must be called from
    /// within a Tokio runtime.
    pub fn arm<F, Fut>(&mut self, after: Duration, on_fire: F) -> TimerToken
    where
        F: FnOnce(TimerToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        self.generation += 1;
        let token = TimerToken(self.generation);
        let deadline = Instant::now() + after;
        let task = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            on_fire(token).await;
        });

        self.stats.armed += 1;
        self.pending = Some(Pending {
            token,
            deadline,
            task,
        });
        trace!(%token, after_ms = after.as_millis() as u64, "phase timer armed");
        token
    }

    /// Drops the pending deadline, if any. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.task.abort();
                self.stats.cancelled += 1;
                trace!(token = %pending.token, "phase timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Accepts a fired callback if `token` is the pending one.
    ///
    /// On success the timer becomes unarmed. A `false` return means the
    /// callback belongs to a deadline that was cancelled or replaced and
    /// must be ignored.
    pub fn settle(&mut self, token: TimerToken) -> bool {
        if self.is_current(token) {
            self.pending = None;
            self.stats.settled += 1;
            true
        } else {
            self.stats.stale += 1;
            trace!(%token, "stale phase timer callback");
            false
        }
    }

    /// `true` if `token` identifies the pending deadline.
    pub fn is_current(&self, token: TimerToken) -> bool {
        self.pending.as_ref().is_some_and(|p| p.token == token)
    }

    /// `true` while a deadline is pending.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// The pending deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Time left until the pending deadline, zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline()
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Lifetime counters.
    pub fn stats(&self) -> TimerStats {
        self.stats
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }
}

impl fmt::Debug for PhaseTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseTimer")
            .field("pending", &self.pending.as_ref().map(|p| p.token))
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_display() {
        assert_eq!(TimerToken(3).to_string(), "T-3");
        assert_eq!(TimerToken(3).generation(), 3);
    }

    #[test]
    fn test_new_timer_is_unarmed() {
        let mut timer = PhaseTimer::new();
        assert!(!timer.is_armed());
        assert!(timer.deadline().is_none());
        assert!(!timer.cancel());
        assert_eq!(timer.stats(), TimerStats::default());
    }

    #[test]
    fn test_settle_on_unarmed_timer_counts_stale() {
        let mut timer = PhaseTimer::new();
        assert!(!timer.settle(TimerToken(1)));
        assert_eq!(timer.stats().stale, 1);
    }
}
