// Shared trait + errors for order feeds

use thiserror::Error;
use tokio::sync::mpsc;

use crate::engine::types::MarketOrder;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    // Clean end of stream; no more orders will arrive
    #[error("order feed closed")]
    Closed,
    #[error("order feed unavailable: {0}")]
    Unavailable(String),
}

pub type FeedResult<T> = Result<T, FeedError>;

/// Source of market orders for the quoter.
///
/// A feed may deliver through pull (`next_market_order`), push (`subscribe`),
/// or both, but any single order goes out through exactly one of them.
#[async_trait::async_trait]
pub trait OrderFeed: Send + Sync {
    /// Waits for the next order. The returned future must be safe to drop
    /// mid-wait: the quoter drops it when shutting down.
    async fn next_market_order(&self) -> FeedResult<MarketOrder>;

    /// Opens a push subscription. Feeds without push delivery return `None`.
    fn subscribe(&self) -> Option<mpsc::Receiver<MarketOrder>> {
        None
    }
}

pub mod channel;
pub mod hardcoded;

pub use channel::{ChannelFeed, ChannelFeedHandle};
pub use hardcoded::HardcodedFeed;
