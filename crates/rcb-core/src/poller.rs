//! Long-polling update loop.
//!
//! One consumer, one update at a time: each update is dispatched to completion
//! before the next one, and the next batch is fetched only after the current
//! batch is done. A batch is committed upstream before any of it is dispatched,
//! so neither a poison update nor a confirmed power action is ever redelivered,
//! not even after the host restarts.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::UpdateId,
    messaging::{
        port::{next_offset, UpdateSource},
        types::InboundUpdate,
    },
    Result,
};

#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(&self, update: &InboundUpdate) -> Result<()>;
}

#[derive(Clone, Copy, Debug)]
pub struct PollerConfig {
    /// Server-side long-poll window.
    pub timeout_secs: u32,
    /// Pause after a transport failure before polling again.
    pub retry_cooldown: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retry_cooldown: Duration::from_secs(15),
        }
    }
}

pub struct Poller {
    source: Arc<dyn UpdateSource>,
    handler: Arc<dyn UpdateHandler>,
    cfg: PollerConfig,
    last_seen: Option<UpdateId>,
}

impl Poller {
    pub fn new(
        source: Arc<dyn UpdateSource>,
        handler: Arc<dyn UpdateHandler>,
        cfg: PollerConfig,
    ) -> Self {
        Self {
            source,
            handler,
            cfg,
            last_seen: None,
        }
    }

    /// Highest update id consumed so far.
    pub fn last_seen(&self) -> Option<UpdateId> {
        self.last_seen
    }

    async fn fetch(&self) -> Result<Vec<InboundUpdate>> {
        self.source
            .fetch(next_offset(self.last_seen), self.cfg.timeout_secs)
            .await
    }

    /// Commit the whole batch, then dispatch it. A failed commit dispatches
    /// nothing; the batch comes back on the next fetch.
    async fn process(&mut self, batch: Vec<InboundUpdate>) -> Result<()> {
        let Some(newest) = batch.iter().map(|u| u.id).max() else {
            return Ok(());
        };
        let high = self.last_seen.map_or(newest, |seen| seen.max(newest));
        self.source.commit(high.next()).await?;

        for update in batch {
            self.advance(update.id);
            if let Err(e) = self.handler.handle(&update).await {
                tracing::error!(update_id = update.id.0, "update handling failed: {e}");
            }
        }
        Ok(())
    }

    fn advance(&mut self, id: UpdateId) {
        self.last_seen = Some(match self.last_seen {
            Some(seen) => seen.max(id),
            None => id,
        });
    }

    /// Fetch and process one batch. Returns the number of updates in it.
    pub async fn poll_once(&mut self) -> Result<usize> {
        let batch = self.fetch().await?;
        let n = batch.len();
        self.process(batch).await?;
        Ok(n)
    }

    /// Poll until `shutdown` is cancelled. Transport errors are logged and retried
    /// after the cooldown; they never end the loop.
    ///
    /// Cancellation interrupts a pending long-poll or cooldown, never a dispatch.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        tracing::info!(
            timeout_secs = self.cfg.timeout_secs,
            cooldown_secs = self.cfg.retry_cooldown.as_secs(),
            "update loop started"
        );

        loop {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                r = self.fetch() => r,
            };

            let processed = match fetched {
                Ok(batch) => {
                    if !batch.is_empty() {
                        tracing::debug!(count = batch.len(), "received updates");
                    }
                    self.process(batch).await
                }
                Err(e) => Err(e),
            };

            if let Err(e) = processed {
                tracing::warn!(
                    "polling failed: {e}; retrying in {}s",
                    self.cfg.retry_cooldown.as_secs()
                );
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.cfg.retry_cooldown) => {}
                }
            }
        }

        tracing::info!(last_seen = self.last_seen.map(|u| u.0), "update loop stopped");
    }
}
