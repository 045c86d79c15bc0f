//! The quoting engine.
//!
//! A [`Quoter`] owns the order cache and the ingestion tasks that keep it fed:
//!
//! 1. On start the order log is replayed into the cache.
//! 2. A pull task awaits `OrderFeed::next_market_order` forever; if the feed
//!    offers push delivery a second task drains the subscription.
//! 3. Every observed order is validated, appended to the order log and then
//!    merged into its instrument's list. Feed tasks run the append on Tokio's
//!    blocking pool. Malformed orders from a feed or the log are skipped with
//!    a warning; the same order handed to [`Quoter::ingest`] is an error.
//!
//! Merges and query snapshots go through one mutex, so a query sees an
//! instrument's list either before or after any append, never halfway.
//! The lock is only held around cache calls: persistence I/O and the price
//! arithmetic both run outside it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::Cache;
use crate::engine::pricing;
use crate::engine::types::{
    IngestionState, MarketOrder, OrderBook, OrderSource, QuoterError, QuoterResult,
};
use crate::engine::validation::{
    validate_instrument_id, validate_order, validate_quote_params, ValidationError,
};
use crate::market_data::adapters::{FeedError, OrderFeed};
use crate::persist::{CsvOrderLog, OrderLog, DEFAULT_ORDERS_DB_PATH};

struct Shared {
    cache: Arc<dyn Cache<OrderBook>>,
    order_log: Arc<dyn OrderLog>,
    // Serializes every multi-call sequence on the cache's instrument entries
    book_lock: Mutex<()>,
    state: RwLock<IngestionState>,
    live_tasks: AtomicUsize,
    fault: Mutex<Option<QuoterError>>,
}

impl Shared {
    fn merge(&self, order: MarketOrder) {
        let _guard = self.book_lock.lock();
        let key = order.instrument_id.clone();
        let mut book = self.cache.get(&key).unwrap_or_default();
        book.push(order);
        self.cache.add(&key, book);
    }

    fn ingest(&self, order: MarketOrder, source: OrderSource) -> QuoterResult<()> {
        validate_order(&order)?;
        self.order_log.append(std::slice::from_ref(&order))?;
        self.accept(order, source);
        Ok(())
    }

    // Same as `ingest`, with the log write moved off the async worker
    async fn ingest_async(&self, order: MarketOrder, source: OrderSource) -> QuoterResult<()> {
        validate_order(&order)?;
        let log = Arc::clone(&self.order_log);
        let order = tokio::task::spawn_blocking(move || {
            log.append(std::slice::from_ref(&order)).map(|()| order)
        })
        .await??;
        self.accept(order, source);
        Ok(())
    }

    fn accept(&self, order: MarketOrder, source: OrderSource) {
        debug!(
            source = source.as_str(),
            instrument = %order.instrument_id,
            price = order.price,
            qty = order.quantity,
            "Ingested order"
        );
        self.merge(order);
        metrics::counter!("quoter_orders_ingested_total", "source" => source.as_str()).increment(1);
    }

    fn reject(&self, err: &ValidationError, source: OrderSource) {
        warn!(source = source.as_str(), error = %err, "Skipped malformed order");
        metrics::counter!("quoter_orders_rejected_total", "source" => source.as_str()).increment(1);
    }

    /// Returns false when the failure must halt the task.
    fn settle(&self, result: QuoterResult<()>, source: OrderSource) -> bool {
        match result {
            Ok(()) => true,
            Err(QuoterError::Validation(err)) => {
                self.reject(&err, source);
                true
            }
            Err(err) => {
                self.record_fault(err);
                false
            }
        }
    }

    fn snapshot(&self, instrument_id: &str) -> OrderBook {
        let _guard = self.book_lock.lock();
        self.cache.get(instrument_id).unwrap_or_default()
    }

    fn record_fault(&self, err: QuoterError) {
        error!(error = %err, "Ingestion halted");
        let mut fault = self.fault.lock();
        if fault.is_none() {
            *fault = Some(err);
        }
    }

    fn task_finished(&self) {
        if self.live_tasks.fetch_sub(1, Ordering::AcqRel) == 1 {
            *self.state.write() = IngestionState::Stopped;
            info!("All ingestion tasks finished");
        }
    }
}

async fn run_pull_loop(
    shared: Arc<Shared>,
    feed: Arc<dyn OrderFeed>,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!("Pull ingestion started");
    loop {
        let next = tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            next = feed.next_market_order() => next,
        };

        let order = match next {
            Ok(order) => order,
            Err(FeedError::Closed) => {
                info!("Order feed closed");
                break;
            }
            Err(err) => {
                shared.record_fault(err.into());
                break;
            }
        };

        let result = shared.ingest_async(order, OrderSource::Pull).await;
        if !shared.settle(result, OrderSource::Pull) {
            break;
        }
    }
    shared.task_finished();
}

async fn run_push_loop(
    shared: Arc<Shared>,
    mut orders: mpsc::Receiver<MarketOrder>,
    mut stop_rx: watch::Receiver<bool>,
) {
    info!("Push ingestion started");
    loop {
        let next = tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            next = orders.recv() => next,
        };

        let Some(order) = next else {
            info!("Push subscription closed");
            break;
        };

        let result = shared.ingest_async(order, OrderSource::Push).await;
        if !shared.settle(result, OrderSource::Push) {
            break;
        }
    }
    shared.task_finished();
}

/// Collects the quoter's collaborators; `start` fails if the feed or cache is missing.
#[derive(Default)]
pub struct QuoterBuilder {
    feed: Option<Arc<dyn OrderFeed>>,
    cache: Option<Arc<dyn Cache<OrderBook>>>,
    order_log: Option<Arc<dyn OrderLog>>,
}

impl QuoterBuilder {
    pub fn feed(mut self, feed: Arc<dyn OrderFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn cache(mut self, cache: Arc<dyn Cache<OrderBook>>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn order_log(mut self, order_log: Arc<dyn OrderLog>) -> Self {
        self.order_log = Some(order_log);
        self
    }

    /// Shorthand for a CSV order log at `path`.
    pub fn orders_db_path(self, path: impl Into<PathBuf>) -> Self {
        self.order_log(Arc::new(CsvOrderLog::new(path)))
    }

    /// Replays the order log, subscribes to the feed and spawns ingestion.
    /// Must run inside a Tokio runtime.
    pub async fn start(self) -> QuoterResult<Quoter> {
        let feed = self.feed.ok_or(QuoterError::MissingDependency("feed"))?;
        let cache = self.cache.ok_or(QuoterError::MissingDependency("cache"))?;
        let order_log = self
            .order_log
            .unwrap_or_else(|| Arc::new(CsvOrderLog::new(DEFAULT_ORDERS_DB_PATH)) as Arc<dyn OrderLog>);

        let shared = Arc::new(Shared {
            cache,
            order_log,
            book_lock: Mutex::new(()),
            state: RwLock::new(IngestionState::Running),
            live_tasks: AtomicUsize::new(0),
            fault: Mutex::new(None),
        });

        let replayed = shared.order_log.replay(&mut |order| {
            if let Err(err) = validate_order(&order) {
                shared.reject(&err, OrderSource::Replay);
                return;
            }
            shared.merge(order);
            metrics::counter!("quoter_orders_ingested_total", "source" => OrderSource::Replay.as_str())
                .increment(1);
        })?;
        info!(replayed, "Cache warmed from order log");

        let push_rx = feed.subscribe();
        let (stop_tx, stop_rx) = watch::channel(false);

        let task_count = 1 + usize::from(push_rx.is_some());
        shared.live_tasks.store(task_count, Ordering::Release);

        let mut tasks = Vec::with_capacity(task_count);
        if let Some(rx) = push_rx {
            tasks.push(tokio::spawn(run_push_loop(
                Arc::clone(&shared),
                rx,
                stop_rx.clone(),
            )));
        }
        tasks.push(tokio::spawn(run_pull_loop(Arc::clone(&shared), feed, stop_rx)));

        info!(tasks = task_count, "Quoter started");
        Ok(Quoter {
            shared,
            stop_tx,
            tasks: AsyncMutex::new(tasks),
        })
    }
}

pub struct Quoter {
    shared: Arc<Shared>,
    stop_tx: watch::Sender<bool>,
    tasks: AsyncMutex<Vec<JoinHandle<()>>>,
}

impl Quoter {
    pub fn builder() -> QuoterBuilder {
        QuoterBuilder::default()
    }

    /// Lowest price among orders that can each fill `quantity` alone; `0.0`
    /// when the instrument is unknown or no single order is large enough.
    #[instrument(skip(self))]
    pub fn get_quote(&self, instrument_id: &str, quantity: u64) -> QuoterResult<f64> {
        if let Err(err) = validate_quote_params(instrument_id, quantity) {
            warn!(error = %err, "Rejected quote request");
            return Err(err.into());
        }
        metrics::counter!("quoter_queries_total", "kind" => "quote").increment(1);

        let book = self.shared.snapshot(instrument_id);
        let price = pricing::best_price(&book, quantity);
        debug!(price, orders = book.len(), "Quote computed");
        Ok(price)
    }

    /// VWAP over every known order for the instrument; `0.0` when there are none.
    #[instrument(skip(self))]
    pub fn get_volume_weighted_average_price(&self, instrument_id: &str) -> QuoterResult<f64> {
        if let Err(err) = validate_instrument_id(instrument_id) {
            warn!(error = %err, "Rejected VWAP request");
            return Err(err.into());
        }
        metrics::counter!("quoter_queries_total", "kind" => "vwap").increment(1);

        let book = self.shared.snapshot(instrument_id);
        let vwap = pricing::volume_weighted_average_price(&book);
        debug!(vwap, orders = book.len(), "VWAP computed");
        Ok(vwap)
    }

    /// Validates, persists and merges one order on the caller's thread.
    /// Fails with [`QuoterError::Stopped`] once ingestion is no longer running.
    pub fn ingest(&self, order: MarketOrder) -> QuoterResult<()> {
        // Held across the write so shutdown cannot move past Running mid-ingest
        let state = self.shared.state.read();
        if *state != IngestionState::Running {
            return Err(QuoterError::Stopped);
        }
        self.shared.ingest(order, OrderSource::Direct)
    }

    /// Copy of the instrument's current order list.
    pub fn order_book(&self, instrument_id: &str) -> OrderBook {
        self.shared.snapshot(instrument_id)
    }

    pub fn state(&self) -> IngestionState {
        *self.shared.state.read()
    }

    /// The failure that halted ingestion, if any. Cleared by this call.
    pub fn take_ingestion_error(&self) -> Option<QuoterError> {
        self.shared.fault.lock().take()
    }

    /// Stops ingestion and waits for every ingestion task to exit.
    /// Safe to call repeatedly; later calls return once the first has finished.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        if tasks.is_empty() {
            debug!("Quoter already shut down");
            return;
        }

        {
            let mut state = self.shared.state.write();
            if *state == IngestionState::Running {
                *state = IngestionState::Stopping;
            }
        }
        info!("Stopping ingestion");
        self.stop_tx.send_replace(true);

        // A handle leaves the list only once joined, so a cancelled shutdown resumes
        while let Some(task) = tasks.last_mut() {
            let joined = task.await;
            tasks.pop();
            if let Err(err) = joined {
                error!(error = %err, "Ingestion task did not exit cleanly");
            }
        }

        *self.shared.state.write() = IngestionState::Stopped;
        info!("Quoter shut down");
    }
}

impl Drop for Quoter {
    fn drop(&mut self) {
        // Tasks observe this and exit on their own
        self.stop_tx.send_replace(true);
    }
}
