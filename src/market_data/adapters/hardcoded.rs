// Simulated feed: replays a fixed list of orders with a random delay between ticks,
// then reports the stream as closed.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, instrument};

use super::{FeedError, FeedResult, OrderFeed};
use crate::engine::types::MarketOrder;

pub struct HardcodedFeed {
    orders: Mutex<VecDeque<MarketOrder>>,
    min_delay: Duration,
    max_delay: Duration,
}

impl HardcodedFeed {
    pub fn new(orders: Vec<MarketOrder>, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            orders: Mutex::new(orders.into()),
            min_delay,
            max_delay,
        }
    }

    pub fn with_sample_orders(min_delay: Duration, max_delay: Duration) -> Self {
        Self::new(Self::sample_orders(), min_delay, max_delay)
    }

    pub fn sample_orders() -> Vec<MarketOrder> {
        vec![
            MarketOrder::new("BA79603015", 102.997, 12),
            MarketOrder::new("BA79603015", 103.2, 60),
            MarketOrder::new("AB73567490", 103.25, 79),
            MarketOrder::new("AB73567490", 95.5, 14),
            MarketOrder::new("BA79603015", 98.0, 1),
            MarketOrder::new("AB73567490", 100.7, 17),
            MarketOrder::new("DK50782120", 100.001, 900),
            MarketOrder::new("DK50782120", 99.81, 421),
        ]
    }

    pub fn remaining(&self) -> usize {
        self.orders.lock().len()
    }

    fn next_delay(&self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[async_trait::async_trait]
impl OrderFeed for HardcodedFeed {
    #[instrument(level = "trace", skip(self))]
    async fn next_market_order(&self) -> FeedResult<MarketOrder> {
        let delay = self.next_delay();
        tokio::time::sleep(delay).await;

        let next = self.orders.lock().pop_front();
        match next {
            Some(order) => {
                debug!(instrument = %order.instrument_id, price = order.price, qty = order.quantity, "Hardcoded feed tick");
                Ok(order)
            }
            None => Err(FeedError::Closed),
        }
    }
}
