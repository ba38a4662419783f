//! # Batch Containment Coordinator
//!
//! Fan-out/fan-in over a fixed set of workers:
//!
//! ```text
//!   validate ──> task queue (pre-filled, closed) ──> W workers ──> results ──> collector
//!                                                    │ one connection each
//!                                                    └ select! { cancelled, next task }
//! ```
//!
//! `W = min(len(batch), max_workers, pool capacity - reserved)`. Workers of
//! every batch draw from one budget of `pool capacity - reserved` permits, so
//! concurrent batches queue behind each other instead of exhausting the pool,
//! and the reserved connections stay free for single-zone requests and health
//! probes. Every worker shares one
//! child of the caller's cancellation token (the scope). The collector
//! cancels the scope on the first error and keeps draining until every
//! worker has dropped its result sender, then joins the workers to surface
//! panics. Results are returned in input order.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use zones_core::{validate_batch, BatchQuery, BatchQueryRequest, BatchResult};
use zones_store::{ConnectionPool, ContainmentEvaluator};

use crate::error::BatchError;

/// Upper bound on concurrent workers per batch.
pub const MAX_WORKERS: usize = 50;

/// Pool connections batch workers leave untouched by default.
pub const DEFAULT_RESERVED_CONNECTIONS: usize = 2;

/// Coordinator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    max_workers: usize,
    reserved_connections: usize,
}

impl CoordinatorConfig {
    /// Clamp `max_workers` into `1..=MAX_WORKERS`.
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.clamp(1, MAX_WORKERS),
            reserved_connections: DEFAULT_RESERVED_CONNECTIONS,
        }
    }

    /// Leave `reserved` pool connections to everything that is not a batch.
    pub fn with_reserved_connections(mut self, reserved: usize) -> Self {
        self.reserved_connections = reserved;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn reserved_connections(&self) -> usize {
        self.reserved_connections
    }

    /// Connections batch workers may hold at once across all batches.
    /// Never below one, so a tiny pool still makes progress.
    fn worker_budget(&self, capacity: usize) -> usize {
        capacity.saturating_sub(self.reserved_connections).max(1)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::new(MAX_WORKERS)
    }
}

/// Object-safe entry point used by the HTTP layer.
#[async_trait]
pub trait BatchContainment: Send + Sync {
    /// Validate and evaluate a batch. Firing `cancel` (client disconnect,
    /// deadline) stops the batch with [`BatchError::Cancelled`].
    async fn contains_batch(
        &self,
        requests: Vec<BatchQueryRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchResult>, BatchError>;
}

struct Task {
    index: usize,
    query: BatchQuery,
}

type Outcome = Result<(usize, BatchResult), BatchError>;

type TaskQueue = Arc<Mutex<mpsc::Receiver<Task>>>;

/// Bounds the connections held by workers of all in-flight batches.
type WorkerBudget = Option<Arc<Semaphore>>;

/// Bounded worker pool evaluating keyed containment queries.
pub struct BatchContainmentCoordinator<P, E> {
    pool: Arc<P>,
    evaluator: Arc<E>,
    config: CoordinatorConfig,
    budget: WorkerBudget,
}

impl<P, E> BatchContainmentCoordinator<P, E>
where
    P: ConnectionPool,
    E: ContainmentEvaluator<Connection = P::Connection>,
{
    pub fn new(pool: Arc<P>, evaluator: Arc<E>, config: CoordinatorConfig) -> Self {
        let budget = pool
            .capacity()
            .map(|capacity| Arc::new(Semaphore::new(config.worker_budget(capacity))));
        Self {
            pool,
            evaluator,
            config,
            budget,
        }
    }

    /// Number of workers a batch of `queries` entries gets.
    ///
    /// Never more than the pool can hand out once the reserved connections
    /// are set aside, so workers do not time out waiting on each other.
    pub fn worker_count(&self, queries: usize) -> usize {
        let bound = match self.pool.capacity() {
            Some(capacity) => self.config.max_workers.min(self.config.worker_budget(capacity)),
            None => self.config.max_workers,
        };
        queries.min(bound)
    }

    /// Validate `requests`, evaluate every entry, and return one result per
    /// key in input order.
    pub async fn execute(
        &self,
        requests: Vec<BatchQueryRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchResult>, BatchError> {
        let queries = validate_batch(requests)?;
        let total = queries.len();
        let workers = self.worker_count(total);
        let started = Instant::now();
        metrics::counter!("zones_batch_queries_total").increment(total as u64);
        tracing::debug!(queries = total, workers, "batch started");

        let outcome = self.run(queries, workers, cancel).await;

        metrics::histogram!("zones_batch_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &outcome {
            Ok(_) => tracing::debug!(
                queries = total,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "batch completed"
            ),
            Err(err) => {
                metrics::counter!("zones_batch_failures_total", "reason" => err.reason())
                    .increment(1);
                tracing::debug!(error = %err, "batch failed");
            }
        }
        outcome
    }

    async fn run(
        &self,
        queries: Vec<BatchQuery>,
        workers: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchResult>, BatchError> {
        let total = queries.len();
        let scope = cancel.child_token();

        let (task_tx, task_rx) = mpsc::channel(total);
        for (index, query) in queries.into_iter().enumerate() {
            task_tx
                .send(Task { index, query })
                .await
                .map_err(|_| BatchError::Worker("task queue closed".into()))?;
        }
        drop(task_tx);
        let queue: TaskQueue = Arc::new(Mutex::new(task_rx));

        // Sized so no worker ever waits on the collector.
        let (result_tx, mut result_rx) = mpsc::channel::<Outcome>(total + workers);

        let mut set = JoinSet::new();
        for worker in 0..workers {
            set.spawn(run_worker(
                worker,
                Arc::clone(&self.pool),
                Arc::clone(&self.evaluator),
                self.budget.clone(),
                Arc::clone(&queue),
                result_tx.clone(),
                scope.clone(),
            ));
        }
        drop(result_tx);

        let mut slots: Vec<Option<BatchResult>> = (0..total).map(|_| None).collect();
        let mut failure: Option<BatchError> = None;

        // Closes once every worker has exited and dropped its sender.
        while let Some(outcome) = result_rx.recv().await {
            match outcome {
                Ok((index, result)) if failure.is_none() => slots[index] = Some(result),
                Ok(_) => {}
                Err(err) => {
                    if failure.is_none() {
                        scope.cancel();
                        failure = Some(err);
                    }
                }
            }
        }

        while let Some(joined) = set.join_next().await {
            if let Err(join_err) = joined {
                tracing::error!(error = %join_err, "batch worker did not finish cleanly");
                if failure.is_none() {
                    scope.cancel();
                    failure = Some(BatchError::Worker(join_err.to_string()));
                }
            }
        }

        if let Some(err) = failure {
            return Err(err);
        }
        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(BatchError::Cancelled)
    }
}

async fn run_worker<P, E>(
    worker: usize,
    pool: Arc<P>,
    evaluator: Arc<E>,
    budget: WorkerBudget,
    queue: TaskQueue,
    results: mpsc::Sender<Outcome>,
    scope: CancellationToken,
) where
    P: ConnectionPool,
    E: ContainmentEvaluator<Connection = P::Connection>,
{
    // Held until the worker exits, after the connection is returned.
    let _permit: Option<OwnedSemaphorePermit> = match budget {
        Some(budget) => tokio::select! {
            biased;

            _ = scope.cancelled() => return,

            permit = budget.acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(_) => {
                    scope.cancel();
                    let _ = results
                        .send(Err(BatchError::Worker("worker budget closed".into())))
                        .await;
                    return;
                }
            },
        },
        None => None,
    };

    let mut conn = tokio::select! {
        biased;

        _ = scope.cancelled() => return,

        acquired = pool.acquire() => match acquired {
            Ok(conn) => conn,
            Err(err) => {
                tracing::warn!(worker, error = %err, "batch worker could not acquire a connection");
                scope.cancel();
                let _ = results.send(Err(BatchError::Acquire(err))).await;
                return;
            }
        },
    };

    loop {
        let task = tokio::select! {
            biased;

            _ = scope.cancelled() => break,

            next = next_task(&queue) => match next {
                Some(task) => task,
                None => break,
            },
        };

        let evaluated = evaluator
            .evaluate(&mut conn, &task.query.zone_ids, task.query.point)
            .await;

        // In-flight results are discarded once the scope has fired.
        if scope.is_cancelled() {
            break;
        }

        let Task { index, query } = task;
        let failed = evaluated.is_err();
        let outcome = match evaluated {
            Ok(contains) => Ok((
                index,
                BatchResult {
                    key: query.key,
                    contains,
                },
            )),
            Err(source) => {
                tracing::warn!(worker, key = %query.key, error = %source, "containment evaluation failed");
                Err(BatchError::Evaluate {
                    key: query.key,
                    source,
                })
            }
        };

        if results.send(outcome).await.is_err() || failed {
            break;
        }
    }
}

async fn next_task(queue: &TaskQueue) -> Option<Task> {
    queue.lock().await.recv().await
}

#[async_trait]
impl<P, E> BatchContainment for BatchContainmentCoordinator<P, E>
where
    P: ConnectionPool,
    E: ContainmentEvaluator<Connection = P::Connection>,
{
    async fn contains_batch(
        &self,
        requests: Vec<BatchQueryRequest>,
        cancel: &CancellationToken,
    ) -> Result<Vec<BatchResult>, BatchError> {
        self.execute(requests, cancel).await
    }
}
