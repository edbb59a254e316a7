//! The reconciliation worker.
//!
//! The worker repeatedly fetches every order still awaiting a verdict (`NEW` or `PROCESSING`), asks the accrual service
//! about each one in turn, and records the answer. Terminal verdicts are settled through
//! [`LedgerManagement::settle_order`], which updates the order and credits its owner in one transaction.
//!
//! The status column is the only record of progress. Orders that could not be resolved in one pass (the service had no
//! answer, or something went wrong) are simply picked up again by a later batch. Settlement is guarded in the store, so
//! an order is never credited twice, even if it is examined again after a restart.
use std::{collections::VecDeque, fmt::Display, future::Future, time::Duration};

use accrual_client::{AccrualApi, AccrualOutcome, AccrualResponse, AccrualService, AccrualStatus};
use log::*;
use loyalty_engine::{
    db_types::{Order, OrderStatusType},
    LedgerManagement,
    OrderManagement,
    OrderStoreError,
    SettlementResult,
    SqliteDatabase,
};
use lp_common::Points;
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};

pub const DEFAULT_IDLE_POLL_DELAY: Duration = Duration::from_secs(7);
pub const DEFAULT_DRAIN_STEP_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    /// How long to wait before polling again when there are no unsettled orders.
    pub idle_poll_delay: Duration,
    /// How long to wait between two orders of the same batch.
    pub drain_step_delay: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { idle_poll_delay: DEFAULT_IDLE_POLL_DELAY, drain_step_delay: DEFAULT_DRAIN_STEP_DELAY }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No unsettled orders. Waiting for the next poll.
    Idle,
    /// Working through a batch of unsettled orders.
    Draining,
    /// Stopped, or about to.
    ShuttingDown,
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Could not fetch the batch of unsettled orders. {0}")]
    BatchFetch(#[from] OrderStoreError),
    #[error("The accrual worker task did not complete. {0}")]
    TaskFailed(String),
}

/// Running totals for one run of the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Batches fetched from the store.
    pub batches: u64,
    /// Orders moved to `PROCESSED` or `INVALID`.
    pub settled: u64,
    /// Points credited to users by those settlements.
    pub credited: Points,
    /// Orders moved to `PROCESSING`.
    pub marked_processing: u64,
    /// Orders left for a later batch because the accrual service had no usable answer.
    pub deferred: u64,
    /// Times the accrual service rate-limited us.
    pub retries: u64,
    /// Store errors while recording a verdict.
    pub store_failures: u64,
}

impl Display for WorkerSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} batches, {} orders settled, {} points credited, {} marked processing, {} deferred, {} rate-limited \
             retries, {} store failures",
            self.batches,
            self.settled,
            self.credited,
            self.marked_processing,
            self.deferred,
            self.retries,
            self.store_failures
        )
    }
}

pub struct AccrualWorker<S, C> {
    store: S,
    client: C,
    config: WorkerConfig,
    shutdown: watch::Receiver<bool>,
    queue: VecDeque<Order>,
    state: WorkerState,
    summary: WorkerSummary,
}

impl<S, C> AccrualWorker<S, C>
where
    S: OrderManagement + LedgerManagement,
    C: AccrualService,
{
    pub fn new(store: S, client: C, config: WorkerConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            store,
            client,
            config,
            shutdown,
            queue: VecDeque::new(),
            state: WorkerState::Idle,
            summary: WorkerSummary::default(),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Runs until the shutdown signal is raised (or its sender is dropped), or the batch of unsettled orders cannot be
    /// fetched.
    ///
    /// The signal interrupts sleeps and outstanding accrual requests, but never a settlement that has started.
    pub async fn run(&mut self) -> Result<WorkerSummary, WorkerError> {
        info!("🕰️ Accrual worker started");
        while !self.stop_requested() {
            if self.queue.is_empty() {
                let batch = match self.store.fetch_unsettled_orders().await {
                    Ok(batch) => batch,
                    Err(e) => {
                        error!("🕰️ Could not fetch unsettled orders. The accrual worker is stopping. {e}");
                        self.state = WorkerState::ShuttingDown;
                        return Err(WorkerError::BatchFetch(e));
                    },
                };
                if batch.is_empty() {
                    if self.state != WorkerState::Idle {
                        debug!("🕰️ No unsettled orders. Accrual worker is idle");
                    }
                    self.state = WorkerState::Idle;
                    let delay = self.config.idle_poll_delay;
                    self.pause(delay).await;
                    continue;
                }
                debug!("🕰️ Fetched a batch of {} unsettled orders", batch.len());
                self.summary.batches += 1;
                self.queue.extend(batch);
                self.state = WorkerState::Draining;
            }
            self.process_next_order().await;
            let delay = self.config.drain_step_delay;
            self.pause(delay).await;
        }
        self.state = WorkerState::ShuttingDown;
        info!("🕰️ Accrual worker stopped. {}", self.summary);
        Ok(self.summary.clone())
    }

    /// Asks about the order at the head of the queue and records the answer. The order stays at the head only if we
    /// were rate-limited.
    async fn process_next_order(&mut self) {
        let Some(order) = self.queue.front().cloned() else {
            return;
        };
        let outcome = tokio::select! {
            outcome = self.client.query_order(order.number.as_str()) => outcome,
            _ = stop_signal(&mut self.shutdown) => {
                debug!("🕰️ Shutdown requested while waiting on the accrual service for order {}", order.number);
                return;
            },
        };
        match outcome {
            AccrualOutcome::Settled(response) if response.status.is_final() => self.settle(&order, &response).await,
            AccrualOutcome::Settled(response) => self.mark_processing(&order, response.status).await,
            AccrualOutcome::RetryAfter(delay) => {
                debug!("🕰️ Rate limited for {delay:?}. Order {} will be asked about again", order.number);
                self.summary.retries += 1;
                return;
            },
            AccrualOutcome::Transient => {
                trace!("🕰️ No answer for order {} yet. It will be retried in a later batch", order.number);
                self.summary.deferred += 1;
            },
            AccrualOutcome::Fatal(e) => {
                warn!("🕰️ Skipping order {} for this batch. {e}", order.number);
                self.summary.deferred += 1;
            },
        }
        self.queue.pop_front();
    }

    async fn settle(&mut self, order: &Order, response: &AccrualResponse) {
        let status = match response.status {
            AccrualStatus::Processed => OrderStatusType::Processed,
            _ => OrderStatusType::Invalid,
        };
        if !order.status.can_transition_to(status) {
            debug!("🕰️ Order {} is already {}. It cannot become {status}", order.number, order.status);
            return;
        }
        let accrual = response.accrual_or_zero();
        match self.store.settle_order(order.id, status, accrual).await {
            Ok(SettlementResult::Settled { order, balance }) => {
                self.summary.settled += 1;
                if balance.is_some() {
                    self.summary.credited += order.accrual;
                }
                info!("🕰️ Order {} for user {} settled as {status} ({accrual} points)", order.number, order.user_id);
            },
            Ok(SettlementResult::AlreadySettled) => {
                debug!("🕰️ Order {} had already been settled. Nothing was credited", order.number);
            },
            Err(e) => {
                error!("🕰️ Could not settle order {}. It will be retried in a later batch. {e}", order.number);
                self.summary.store_failures += 1;
            },
        }
    }

    async fn mark_processing(&mut self, order: &Order, reported: AccrualStatus) {
        if !order.status.can_transition_to(OrderStatusType::Processing) {
            trace!("🕰️ Order {} is {}, the accrual service says {reported}", order.number, order.status);
            return;
        }
        match self.store.update_order_status(order.id, OrderStatusType::Processing).await {
            Ok(Some(_)) => {
                debug!("🕰️ Order {} is {reported} at the accrual service. Marked as PROCESSING", order.number);
                self.summary.marked_processing += 1;
            },
            Ok(None) => debug!("🕰️ Order {} was settled in the meantime. Status left alone", order.number),
            Err(e) => {
                error!("🕰️ Could not mark order {} as processing. {e}", order.number);
                self.summary.store_failures += 1;
            },
        }
    }

    async fn pause(&mut self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {},
            _ = stop_signal(&mut self.shutdown) => {},
        }
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow() || self.shutdown.has_changed().is_err()
    }
}

/// Resolves once the shutdown flag is set, or the sending half is gone.
async fn stop_signal(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

/// Handle to a running accrual worker. Dropping the handle stops the worker.
pub struct AccrualWorkerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<Result<WorkerSummary, WorkerError>>,
}

impl AccrualWorkerHandle {
    /// Asks the worker to stop once it has finished with the current order.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Waits for the worker to finish.
    pub async fn join(self) -> Result<WorkerSummary, WorkerError> {
        let Self { stop, task } = self;
        let result = task.await;
        drop(stop);
        result.map_err(|e| WorkerError::TaskFailed(e.to_string()))?
    }

    /// Waits until either the worker finishes on its own, or `signal` resolves, in which case the worker is stopped
    /// and then awaited.
    pub async fn stop_on<F: Future>(mut self, signal: F) -> Result<WorkerSummary, WorkerError> {
        let finished = tokio::select! {
            result = &mut self.task => Some(result),
            _ = signal => None,
        };
        match finished {
            Some(result) => result.map_err(|e| WorkerError::TaskFailed(e.to_string()))?,
            None => {
                info!("🕰️ Stopping the accrual worker");
                self.stop();
                self.join().await
            },
        }
    }
}

/// Starts the accrual worker on the tokio runtime.
pub fn start_accrual_worker(db: SqliteDatabase, client: AccrualApi, config: WorkerConfig) -> AccrualWorkerHandle {
    let (stop, shutdown) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut worker = AccrualWorker::new(db, client, config, shutdown);
        worker.run().await
    });
    AccrualWorkerHandle { stop, task }
}
