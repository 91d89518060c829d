//! Request-bound deadlines and cancellation for storage calls.
//!
//! Every repository call made on behalf of an inbound request is raced against
//! that request's [`RequestScope`]. A scope fires when its deadline passes or
//! when its [`CancelHandle`] is triggered; the call is then abandoned and the
//! caller sees [`Canceled`] instead of blocking.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// The scope fired before the bounded operation completed.
#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
#[error("request canceled or deadline exceeded")]
pub struct Canceled;

/// Deadline and cancellation signal carried by a single request.
///
/// Cheap to clone; clones observe the same cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    deadline: Option<Instant>,
    signal: Option<watch::Receiver<bool>>,
}

/// Triggers cancellation of every clone of the scope it was created with.
///
/// Dropping the handle without calling [`CancelHandle::cancel`] leaves the
/// scope running until its deadline (if any).
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl RequestScope {
    /// A scope that never fires. Intended for background jobs and tests.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A scope that fires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::unbounded().deadline(Instant::now() + timeout)
    }

    /// Tighten the deadline. An earlier existing deadline is kept.
    pub fn deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < at => existing,
            _ => at,
        });
        self
    }

    /// Attach an explicit cancellation signal.
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.signal = Some(rx);
        (self, CancelHandle { tx })
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_canceled(&self) -> bool {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        self.signal.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Drive `fut` to completion unless the scope fires first.
    ///
    /// An already-fired scope returns [`Canceled`] without polling `fut`.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Canceled>
    where
        F: Future,
    {
        if self.is_canceled() {
            return Err(Canceled);
        }

        tokio::select! {
            out = fut => Ok(out),
            _ = wait_for_signal(self.signal.clone()) => Err(Canceled),
            _ = wait_for_deadline(self.deadline) => Err(Canceled),
        }
    }
}

async fn wait_for_signal(signal: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = signal else {
        return std::future::pending().await;
    };
    // A dropped handle can no longer cancel.
    if rx.wait_for(|canceled| *canceled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_scope_runs_to_completion() {
        let scope = RequestScope::unbounded();
        assert_eq!(scope.run(async { 7 }).await, Ok(7));
        assert!(!scope.is_canceled());
        assert_eq!(scope.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_abandons_slow_future() {
        let scope = RequestScope::with_timeout(Duration::from_millis(50));
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            1
        };
        assert_eq!(scope.run(slow).await, Err(Canceled));
        assert!(scope.is_canceled());
    }

    #[tokio::test]
    async fn cancel_handle_fires_all_clones() {
        let (scope, handle) = RequestScope::unbounded().cancellable();
        let clone = scope.clone();

        let waiter = tokio::spawn(async move { clone.run(std::future::pending::<()>()).await });
        handle.cancel();

        assert_eq!(waiter.await.unwrap(), Err(Canceled));
        assert!(scope.is_canceled());
    }

    #[tokio::test]
    async fn already_canceled_scope_does_not_poll() {
        let (scope, handle) = RequestScope::unbounded().cancellable();
        handle.cancel();

        let polled = std::sync::atomic::AtomicBool::new(false);
        let out = scope
            .run(async {
                polled.store(true, std::sync::atomic::Ordering::SeqCst);
            })
            .await;

        assert_eq!(out, Err(Canceled));
        assert!(!polled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropped_handle_does_not_cancel() {
        let (scope, handle) = RequestScope::unbounded().cancellable();
        drop(handle);
        assert_eq!(scope.run(async { "done" }).await, Ok("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_keeps_the_earlier_instant() {
        let now = Instant::now();
        let scope = RequestScope::unbounded()
            .deadline(now + Duration::from_secs(1))
            .deadline(now + Duration::from_secs(5));
        assert_eq!(scope.remaining(), Some(Duration::from_secs(1)));
    }
}
