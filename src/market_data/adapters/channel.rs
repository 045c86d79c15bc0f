// In-process feed backed by Tokio channels.
// The handle side sends pull-mode orders and publishes push-mode orders.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, trace};

use super::{FeedError, FeedResult, OrderFeed};
use crate::engine::types::MarketOrder;

type Subscribers = Arc<Mutex<Vec<mpsc::Sender<MarketOrder>>>>;

pub struct ChannelFeed {
    pull_rx: AsyncMutex<mpsc::Receiver<MarketOrder>>,
    subscribers: Subscribers,
    push_capacity: usize,
}

#[derive(Clone)]
pub struct ChannelFeedHandle {
    pull_tx: mpsc::Sender<MarketOrder>,
    subscribers: Subscribers,
}

impl ChannelFeed {
    /// `capacity` bounds both the pull queue and every push subscription.
    pub fn new(capacity: usize) -> (Self, ChannelFeedHandle) {
        let (pull_tx, pull_rx) = mpsc::channel(capacity);
        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));

        let feed = Self {
            pull_rx: AsyncMutex::new(pull_rx),
            subscribers: Arc::clone(&subscribers),
            push_capacity: capacity,
        };
        let handle = ChannelFeedHandle { pull_tx, subscribers };
        (feed, handle)
    }
}

#[async_trait::async_trait]
impl OrderFeed for ChannelFeed {
    async fn next_market_order(&self) -> FeedResult<MarketOrder> {
        let mut rx = self.pull_rx.lock().await;
        rx.recv().await.ok_or(FeedError::Closed)
    }

    fn subscribe(&self) -> Option<mpsc::Receiver<MarketOrder>> {
        let (tx, rx) = mpsc::channel(self.push_capacity);
        self.subscribers.lock().push(tx);
        debug!("New push subscriber registered");
        Some(rx)
    }
}

impl ChannelFeedHandle {
    /// Queues an order for pull delivery.
    pub async fn send(&self, order: MarketOrder) -> FeedResult<()> {
        self.pull_tx.send(order).await.map_err(|_| FeedError::Closed)
    }

    /// Pushes an order to every live subscriber and returns how many received it.
    pub async fn publish(&self, order: MarketOrder) -> usize {
        // Clone out so the lock is not held across the sends
        let subscribers = self.subscribers.lock().clone();

        let sends = subscribers.iter().map(|subscriber| subscriber.send(order.clone()));
        let delivered = join_all(sends).await.into_iter().filter(Result::is_ok).count();

        self.subscribers.lock().retain(|s| !s.is_closed());
        trace!(delivered, instrument = %order.instrument_id, "Published order");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
