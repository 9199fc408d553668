//! Best-effort side effects
//!
//! Mail and event dispatch run on their own task. The caller waits a short,
//! bounded time on a single-slot channel for the first error, logs it, and
//! moves on. A side effect never fails the operation that triggered it, and
//! nothing is retried.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;

/// Default time the caller waits for a side effect to report.
pub const DEFAULT_SIDE_EFFECT_WAIT: Duration = Duration::from_millis(50);

/// What the caller observed while it waited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Finished without error
    Completed,
    /// Reported an error, which was logged
    Failed(String),
    /// Still running when the wait elapsed
    Pending,
}

/// Spawns side effects and waits briefly for their first error.
#[derive(Debug, Clone, Copy)]
pub struct SideEffects {
    wait: Duration,
}

impl Default for SideEffects {
    fn default() -> Self {
        Self::new(DEFAULT_SIDE_EFFECT_WAIT)
    }
}

impl SideEffects {
    pub fn new(wait: Duration) -> Self {
        Self { wait }
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Spawn `effect` and wait at most the configured time for its result.
    pub async fn dispatch<F, E>(&self, label: &'static str, effect: F) -> Outcome
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<String>(1);

        tokio::spawn(async move {
            if let Err(e) = effect.await {
                let message = e.to_string();
                // Receiver is gone once the caller stopped waiting.
                if tx.try_send(message.clone()).is_err() {
                    tracing::warn!(effect = label, error = %message, "side effect failed after response");
                }
            }
        });

        match tokio::time::timeout(self.wait, rx.recv()).await {
            Ok(Some(message)) => {
                tracing::warn!(effect = label, error = %message, "side effect failed");
                Outcome::Failed(message)
            }
            Ok(None) => Outcome::Completed,
            Err(_) => {
                tracing::debug!(effect = label, "side effect still running");
                Outcome::Pending
            }
        }
    }
}
