//! Per-operation cancellation and deadlines.
//!
//! Every ledger call takes an [`OpContext`]. Work that happens before a
//! commit races against the context; when the context wins, the in-flight
//! future is dropped and any open SQLite transaction rolls back with it.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::storage::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct OpContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for OpContext {
    fn default() -> Self {
        Self::background()
    }
}

impl OpContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// A fresh context that times out after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().timeout_after(timeout)
    }

    /// A context cancelled whenever `parent` is, with an optional deadline.
    pub fn child_of(parent: &CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            token: parent.child_token(),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Tighten the deadline to at most `timeout` from now.
    pub fn timeout_after(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Run `fut` unless the context is cancelled or its deadline passes first.
    pub async fn guard<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        if self.token.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        if matches!(self.deadline, Some(d) if d <= Instant::now()) {
            return Err(StoreError::TimedOut);
        }

        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(StoreError::Cancelled),
            _ = expiry => Err(StoreError::TimedOut),
            result = fut => result,
        }
    }
}
