//! Retry-until-ready synchronization on anchor geometry.
//!
//! A poll waits `initial_delay`, then measures every requested anchor
//! concurrently. When all of them resolve to a rectangle the `on_ready`
//! callback runs exactly once. Otherwise the poll retries every `interval`
//! until `max_attempts` rounds have run, and then gives up silently: a
//! tutorial that cannot find its UI simply does not start.

use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::registry::AnchorRegistry;

/// Timing of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Delay between attempts.
    pub interval: Duration,
    /// Number of measurement rounds before giving up. Zero is treated as one.
    pub max_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            interval: Duration::from_millis(250),
            max_attempts: 12,
        }
    }
}

/// How a poll finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Every anchor was measurable on round `attempts`.
    Ready {
        /// Rounds run, including the successful one.
        attempts: u32,
    },
    /// `max_attempts` rounds ran without every anchor being measurable.
    Exhausted {
        /// Rounds run.
        attempts: u32,
    },
    /// The poll was cancelled before it resolved.
    Cancelled {
        /// Rounds completed before cancellation.
        attempts: u32,
    },
}

/// Polls an [`AnchorRegistry`] until a set of anchors is measurable.
#[derive(Debug, Clone)]
pub struct AnchorPoller {
    registry: AnchorRegistry,
}

impl AnchorPoller {
    /// Creates a poller over `registry`.
    #[must_use]
    pub fn new(registry: AnchorRegistry) -> Self {
        Self { registry }
    }

    /// Runs the retry loop in place and reports how it ended. Never calls
    /// back; see [`poll`](Self::poll) for the callback form.
    pub async fn wait_until_ready(
        &self,
        anchor_ids: &[String],
        options: PollOptions,
        token: &CancelToken,
    ) -> PollOutcome {
        if anchor_ids.is_empty() {
            return PollOutcome::Ready { attempts: 0 };
        }
        let max_attempts = options.max_attempts.max(1);

        if !sleep_unless_cancelled(options.initial_delay, token).await {
            return PollOutcome::Cancelled { attempts: 0 };
        }

        let mut attempts = 0;
        loop {
            if token.is_cancelled() {
                return PollOutcome::Cancelled { attempts };
            }
            attempts += 1;
            let ready = self.all_measurable(anchor_ids).await;
            debug!(attempt = attempts, ready, anchors = ?anchor_ids, "anchor poll round");

            if token.is_cancelled() {
                return PollOutcome::Cancelled { attempts };
            }
            if ready {
                return PollOutcome::Ready { attempts };
            }
            if attempts >= max_attempts {
                debug!(attempts, anchors = ?anchor_ids, "anchor poll exhausted");
                return PollOutcome::Exhausted { attempts };
            }
            if !sleep_unless_cancelled(options.interval, token).await {
                return PollOutcome::Cancelled { attempts };
            }
        }
    }

    /// Starts a poll on the current tokio runtime and calls `on_ready` once
    /// when every anchor is measurable.
    ///
    /// An empty `anchor_ids` is vacuously ready: `on_ready` runs before this
    /// method returns. Cancelling or dropping the returned handle guarantees
    /// no further attempts and no late callback.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime with a non-empty
    /// `anchor_ids`.
    pub fn poll<F>(&self, anchor_ids: Vec<String>, on_ready: F, options: PollOptions) -> PollHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let token = CancelToken::new();
        if anchor_ids.is_empty() {
            on_ready();
            return PollHandle {
                token,
                task: None,
                resolved: Some(PollOutcome::Ready { attempts: 0 }),
            };
        }

        let poller = self.clone();
        let task_token = token.clone();
        let task = tokio::spawn(async move {
            let outcome = poller
                .wait_until_ready(&anchor_ids, options, &task_token)
                .await;
            match outcome {
                PollOutcome::Ready { attempts } if task_token.is_cancelled() => {
                    PollOutcome::Cancelled { attempts }
                }
                PollOutcome::Ready { .. } => {
                    on_ready();
                    outcome
                }
                other => other,
            }
        });

        PollHandle {
            token,
            task: Some(task),
            resolved: None,
        }
    }

    async fn all_measurable(&self, anchor_ids: &[String]) -> bool {
        let mut rounds = JoinSet::new();
        for anchor_id in anchor_ids {
            let registry = self.registry.clone();
            let anchor_id = anchor_id.clone();
            rounds.spawn(async move { registry.get_rect(&anchor_id).await.is_some() });
        }

        let mut ready = true;
        while let Some(joined) = rounds.join_next().await {
            match joined {
                Ok(measured) => ready &= measured,
                Err(err) => {
                    warn!(error = %err, "anchor measurement failed");
                    ready = false;
                }
            }
        }
        ready
    }
}

/// Sleeps for `duration`; returns `false` if the token was cancelled first.
async fn sleep_unless_cancelled(duration: Duration, token: &CancelToken) -> bool {
    if token.is_cancelled() {
        return false;
    }
    tokio::select! {
        () = tokio::time::sleep(duration) => !token.is_cancelled(),
        () = token.cancelled() => false,
    }
}

/// Handle to a running poll. Dropping it cancels the poll.
#[must_use = "dropping a PollHandle cancels the poll"]
#[derive(Debug)]
pub struct PollHandle {
    token: CancelToken,
    task: Option<JoinHandle<PollOutcome>>,
    resolved: Option<PollOutcome>,
}

impl PollHandle {
    /// Cancels the poll. No attempt starts and no callback runs afterwards.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns whether the poll has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the poll to finish and returns its outcome.
    pub async fn join(mut self) -> PollOutcome {
        if let Some(outcome) = self.resolved {
            return outcome;
        }
        match self.task.take() {
            Some(task) => task
                .await
                .unwrap_or(PollOutcome::Cancelled { attempts: 0 }),
            None => PollOutcome::Cancelled { attempts: 0 },
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
