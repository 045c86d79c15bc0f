use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::validation::ValidationError;
use crate::market_data::adapters::FeedError;
use crate::persist::types::PersistError;

pub type InstrumentId = String;

// One observed tick: instrument, price, quantity.
// Field names are PascalCase on the wire to match the order log header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MarketOrder {
    pub instrument_id: InstrumentId,
    pub price: f64,
    pub quantity: u64,
}

impl MarketOrder {
    pub fn new(instrument_id: impl Into<InstrumentId>, price: f64, quantity: u64) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            price,
            quantity,
        }
    }

    pub fn notional(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

// Every order seen for one instrument, in arrival order
pub type OrderBook = Vec<MarketOrder>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionState {
    Running,
    Stopping,
    Stopped,
}

// Where an ingested order came from; used as a metrics label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSource {
    Replay,
    Pull,
    Push,
    Direct,
}

impl OrderSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::Replay => "replay",
            OrderSource::Pull => "pull",
            OrderSource::Push => "push",
            OrderSource::Direct => "direct",
        }
    }
}

#[derive(Debug, Error)]
pub enum QuoterError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("feed failure: {0}")]
    Feed(#[from] FeedError),
    #[error("persistence failure: {0}")]
    Persist(#[from] PersistError),
    #[error("quoter cannot start without a {0}")]
    MissingDependency(&'static str),
    #[error("ingestion has stopped")]
    Stopped,
    #[error("order log worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl QuoterError {
    /// True for errors caused by the caller's arguments rather than a data source.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, QuoterError::Validation(_))
    }
}

pub type QuoterResult<T> = Result<T, QuoterError>;
