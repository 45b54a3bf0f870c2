//! # Cancellable Status Poller
//!
//! Both payment workflows learn the outcome of a charge only by asking the
//! provider again and again. This module owns that loop.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt 1..=max_attempts                                               │
//! │    ├── wait `interval` ────────────── cancelled? ──► Cancelled          │
//! │    ├── probe(attempt)                                                   │
//! │    │     Ok(Done(v))   ──────────────────────────► Resolved(v)          │
//! │    │     Ok(Continue)  ── next attempt                                  │
//! │    │     Err(e)        ── counts as an attempt, remembered, next        │
//! │    └──                                                                  │
//! │  budget spent ────────────────────────────────────► Exhausted           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancellation is a `watch` channel: [`CancelHandle`] flips it,
//! every [`CancelToken`] observes it. No probe is issued after a
//! `Done` or after cancellation.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

// =============================================================================
// Cancellation
// =============================================================================

/// Owner side of a cancellation pair. Cloning shares the same signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Observer side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// Creates a linked handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx: Arc::new(tx) }, CancelToken { rx })
}

impl CancelHandle {
    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once cancellation is signalled.
    ///
    /// If every handle is dropped without cancelling, this never completes.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

// =============================================================================
// Polling
// =============================================================================

/// Retry budget for one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        PollPolicy {
            interval,
            max_attempts,
        }
    }
}

/// What a single probe learned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Final answer; stop polling.
    Done(T),
    /// Not final yet.
    Continue,
}

/// How a polling loop ended.
#[derive(Debug, PartialEq, Eq)]
pub enum PollOutcome<T, E> {
    Resolved { value: T, attempts: u32 },
    Exhausted { attempts: u32, last_error: Option<E> },
    Cancelled { attempts: u32 },
}

/// Runs `probe` until it reports [`Probe::Done`], the budget is spent, or
/// `cancel` fires.
///
/// Each attempt waits `policy.interval` first. Probe errors are logged and
/// count against the budget.
pub async fn poll_until<T, E, F, Fut>(
    policy: PollPolicy,
    cancel: &mut CancelToken,
    mut probe: F,
) -> PollOutcome<T, E>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Probe<T>, E>>,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PollOutcome::Cancelled { attempts: attempt - 1 };
            }
            _ = tokio::time::sleep(policy.interval) => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PollOutcome::Cancelled { attempts: attempt };
            }
            result = probe(attempt) => result,
        };

        match result {
            Ok(Probe::Done(value)) => {
                return PollOutcome::Resolved {
                    value,
                    attempts: attempt,
                };
            }
            Ok(Probe::Continue) => {
                debug!(attempt, max = policy.max_attempts, "Status not final yet");
            }
            Err(e) => {
                warn!(attempt, error = %e, "Status check failed, will retry");
                last_error = Some(e);
            }
        }
    }

    PollOutcome::Exhausted {
        attempts: policy.max_attempts,
        last_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const POLICY: PollPolicy = PollPolicy::new(Duration::from_secs(2), 5);

    #[tokio::test(start_paused = true)]
    async fn test_resolves_and_stops_probing() {
        let calls = AtomicU32::new(0);
        let (_handle, mut token) = cancel_pair();
        let started = tokio::time::Instant::now();

        let outcome: PollOutcome<&str, String> = poll_until(POLICY, &mut token, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 3 {
                    Ok(Probe::Done("approved"))
                } else {
                    Ok(Probe::Continue)
                }
            }
        })
        .await;

        assert_eq!(
            outcome,
            PollOutcome::Resolved {
                value: "approved",
                attempts: 3
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_count_as_attempts() {
        let calls = AtomicU32::new(0);
        let (_handle, mut token) = cancel_pair();

        let outcome: PollOutcome<(), String> = poll_until(POLICY, &mut token, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("connection reset #{attempt}")) }
        })
        .await;

        assert_eq!(
            outcome,
            PollOutcome::Exhausted {
                attempts: 5,
                last_error: Some("connection reset #5".to_string())
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_loop() {
        let calls = Arc::new(AtomicU32::new(0));
        let (handle, mut token) = cancel_pair();

        let counter = calls.clone();
        let task = tokio::spawn(async move {
            poll_until::<(), String, _, _>(POLICY, &mut token, |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Probe::Continue) }
            })
            .await
        });

        tokio::time::sleep(Duration::from_millis(4500)).await;
        handle.cancel();
        let outcome = task.await.unwrap();

        assert_eq!(outcome, PollOutcome::Cancelled { attempts: 2 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(handle.token().is_cancelled());
    }
}
