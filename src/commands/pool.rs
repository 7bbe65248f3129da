use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::config::EconomyConfig;
use crate::context::OpContext;

use super::{Dispatcher, Player, Reply};

const SHUTTING_DOWN: &str = "Server is shutting down";

/// Runs player commands off the caller's task with a cap on how many run at
/// once. Every task is tracked, so shutdown can cancel and await all of them.
pub struct CommandPool {
    dispatcher: Arc<Dispatcher>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    timeout: Duration,
}

impl CommandPool {
    pub fn new(dispatcher: Arc<Dispatcher>, max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            dispatcher,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tracker: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            timeout,
        }
    }

    pub fn from_config(dispatcher: Arc<Dispatcher>, config: &EconomyConfig) -> Self {
        Self::new(
            dispatcher,
            config.max_concurrent_commands,
            config.command_timeout(),
        )
    }

    /// Queue a command. The handle resolves to the replies for the player.
    ///
    /// The command's deadline starts once it holds a permit, so time spent
    /// queued behind other commands does not count against it.
    pub fn submit(&self, player: Player, line: impl Into<String>) -> JoinHandle<Vec<Reply>> {
        let line = line.into();
        let closing = self.tracker.is_closed() || self.shutdown.is_cancelled();
        let dispatcher = Arc::clone(&self.dispatcher);
        let permits = Arc::clone(&self.permits);
        let shutdown = self.shutdown.clone();
        let timeout = self.timeout;

        self.tracker.spawn(async move {
            if closing {
                return vec![Reply::Error(SHUTTING_DOWN.to_string())];
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                permit = permits.acquire_owned() => permit.ok(),
            };
            let Some(_permit) = permit else {
                debug!(player = %player.name, "command dropped during shutdown");
                return vec![Reply::Error(SHUTTING_DOWN.to_string())];
            };

            let ctx = OpContext::child_of(&shutdown, Some(timeout));
            dispatcher.dispatch(&ctx, &player, &line).await
        })
    }

    /// Commands submitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting commands and wait for the queued ones to finish.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    /// Cancel everything outstanding and wait for it to unwind. Commands
    /// already committing finish; the rest report cancellation.
    pub async fn shutdown(&self) {
        info!(in_flight = self.in_flight(), "shutting down command pool");
        self.shutdown.cancel();
        self.permits.close();
        self.drain().await;
    }
}
