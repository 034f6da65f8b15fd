//! Post-commit side effects
//!
//! Reputation recomputes and cache invalidations run here, after the vote or
//! content transaction that caused them has committed. Callers hand effects to
//! a bounded queue and never wait on them; a background worker executes each
//! effect with its own timeout and retries, and logs what it cannot finish.
//!
//! ```text
//! VoteService ──dispatch()──▶ [bounded mpsc] ──▶ worker ──spawn──▶ handler.handle()
//!                (try_send)                        │                 (timeout, retry)
//!                                                   └── shutdown: close + drain
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Notify, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::app::reputation_service::ReputationService;
use crate::domain::entities::{AgentId, TargetRef};
use crate::domain::ports::cache::{author_keys, target_key};
use crate::domain::ports::{AgentRepository, Cache, StatsRepository};
use crate::error::SideEffectError;

/// Work deferred until after a commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    RecomputeReputation(AgentId),
    /// Keys or `prefix*` patterns to drop from the cache
    InvalidateCache(Vec<String>),
}

/// Executes one side effect
#[async_trait]
pub trait SideEffectHandler: Send + Sync + 'static {
    async fn handle(&self, effect: &SideEffect) -> Result<(), SideEffectError>;
}

/// Tuning for the background executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub queue_capacity: usize,
    pub concurrency: usize,
    pub max_attempts: u32,
    pub effect_timeout: Duration,
    pub retry_backoff: Duration,
    pub drain_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            concurrency: 8,
            max_attempts: 3,
            effect_timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(200),
            drain_timeout: Duration::from_secs(10),
        }
    }
}

/// Cloneable, non-blocking handle for dispatching side effects
#[derive(Debug, Clone)]
pub struct SideEffectQueue {
    tx: mpsc::Sender<SideEffect>,
}

impl SideEffectQueue {
    /// Create a queue and the receiver a worker drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SideEffect>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue an effect without waiting.
    ///
    /// Returns false if the effect was dropped because the queue is full or
    /// shutting down. Dropping is logged; it never fails the caller.
    pub fn dispatch(&self, effect: SideEffect) -> bool {
        match self.tx.try_send(effect) {
            Ok(()) => true,
            Err(TrySendError::Full(effect)) => {
                tracing::warn!(effect = ?effect, "Side effect queue full, dropping effect");
                false
            }
            Err(TrySendError::Closed(effect)) => {
                tracing::warn!(effect = ?effect, "Side effect queue closed, dropping effect");
                false
            }
        }
    }

    /// Invalidate caches touched by a change to `author_id`'s content and
    /// queue a reputation recompute for them.
    pub fn content_changed(&self, target: Option<&TargetRef>, author_id: &AgentId) {
        let mut keys = author_keys(author_id);
        if let Some(target) = target {
            keys.insert(0, target_key(target));
        }
        self.dispatch(SideEffect::InvalidateCache(keys));
        self.dispatch(SideEffect::RecomputeReputation(*author_id));
    }
}

/// Background executor owning the worker task
pub struct SideEffectExecutor {
    queue: SideEffectQueue,
    shutdown: Arc<Notify>,
    worker: JoinHandle<()>,
    drain_timeout: Duration,
}

impl SideEffectExecutor {
    /// Spawn the worker. Must be called from within a tokio runtime.
    pub fn start<H: SideEffectHandler>(handler: Arc<H>, config: ExecutorConfig) -> Self {
        let (queue, rx) = SideEffectQueue::channel(config.queue_capacity);
        let shutdown = Arc::new(Notify::new());
        let drain_timeout = config.drain_timeout;

        let worker = tokio::spawn(run_worker(handler, rx, shutdown.clone(), config));

        Self {
            queue,
            shutdown,
            worker,
            drain_timeout,
        }
    }

    pub fn queue(&self) -> SideEffectQueue {
        self.queue.clone()
    }

    /// Stop accepting effects, finish the queued ones, and wait for the worker.
    pub async fn shutdown(self) {
        let Self {
            queue,
            shutdown,
            worker,
            drain_timeout,
        } = self;
        drop(queue);
        shutdown.notify_one();

        match tokio::time::timeout(drain_timeout, worker).await {
            Ok(Ok(())) => tracing::info!("Side effect executor drained"),
            Ok(Err(e)) => tracing::error!(error = %e, "Side effect worker failed"),
            Err(_) => tracing::warn!(
                timeout_ms = drain_timeout.as_millis() as u64,
                "Side effect executor did not drain in time"
            ),
        }
    }
}

async fn run_worker<H: SideEffectHandler>(
    handler: Arc<H>,
    mut rx: mpsc::Receiver<SideEffect>,
    shutdown: Arc<Notify>,
    config: ExecutorConfig,
) {
    let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut in_flight = JoinSet::new();
    let mut closing = false;

    loop {
        tokio::select! {
            _ = shutdown.notified(), if !closing => {
                // Buffered effects are still delivered after close
                closing = true;
                rx.close();
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Side effect task panicked");
                }
            }
            next = rx.recv() => {
                let Some(effect) = next else { break };
                let Ok(permit) = permits.clone().acquire_owned().await else { break };
                let handler = handler.clone();
                let config = config.clone();
                in_flight.spawn(async move {
                    let _permit = permit;
                    run_effect(handler.as_ref(), effect, &config).await;
                });
            }
        }
    }

    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Side effect task panicked");
        }
    }
}

/// Run one effect with timeout and retries. Returns true if it succeeded.
async fn run_effect<H: SideEffectHandler + ?Sized>(
    handler: &H,
    effect: SideEffect,
    config: &ExecutorConfig,
) -> bool {
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match tokio::time::timeout(config.effect_timeout, handler.handle(&effect)).await {
            Ok(Ok(())) => {
                tracing::debug!(effect = ?effect, attempt, "Side effect applied");
                return true;
            }
            Ok(Err(e)) if e.is_permanent() => {
                tracing::warn!(effect = ?effect, error = %e, "Side effect failed permanently");
                return false;
            }
            Ok(Err(e)) => {
                tracing::warn!(effect = ?effect, attempt, error = %e, "Side effect failed");
            }
            Err(_) => {
                tracing::warn!(effect = ?effect, attempt, "Side effect timed out");
            }
        }

        if attempt < max_attempts {
            tokio::time::sleep(config.retry_backoff * attempt).await;
        }
    }

    tracing::error!(effect = ?effect, attempts = max_attempts, "Side effect abandoned");
    false
}

/// Production handler: recomputes reputation and invalidates cache entries
pub struct PostCommitHandler<AR, SR, C>
where
    AR: AgentRepository,
    SR: StatsRepository,
    C: Cache,
{
    reputation: Arc<ReputationService<AR, SR>>,
    cache: Arc<C>,
}

impl<AR, SR, C> PostCommitHandler<AR, SR, C>
where
    AR: AgentRepository,
    SR: StatsRepository,
    C: Cache,
{
    pub fn new(reputation: Arc<ReputationService<AR, SR>>, cache: Arc<C>) -> Self {
        Self { reputation, cache }
    }
}

#[async_trait]
impl<AR, SR, C> SideEffectHandler for PostCommitHandler<AR, SR, C>
where
    AR: AgentRepository + 'static,
    SR: StatsRepository + 'static,
    C: Cache + 'static,
{
    async fn handle(&self, effect: &SideEffect) -> Result<(), SideEffectError> {
        match effect {
            SideEffect::RecomputeReputation(agent_id) => {
                let change = self.reputation.recompute(agent_id).await?;
                // A reader may have re-cached the profile between the
                // invalidation and this recompute.
                if change.changed() {
                    for key in author_keys(agent_id) {
                        self.cache.invalidate(&key).await?;
                    }
                }
            }
            SideEffect::InvalidateCache(keys) => {
                for key in keys {
                    self.cache.invalidate(key).await?;
                }
            }
        }
        Ok(())
    }
}
