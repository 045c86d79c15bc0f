pub mod types;
pub use types::*;
pub mod csv_log;
pub use csv_log::CsvOrderLog;

use crate::engine::types::MarketOrder;

/// Append-only durable record of every order the quoter has observed.
pub trait OrderLog: Send + Sync {
    /// Feeds every recorded order to `on_order` in recording order and returns
    /// how many were replayed. A log that does not exist yet replays nothing.
    fn replay(&self, on_order: &mut dyn FnMut(MarketOrder)) -> PersistResult<usize>;

    /// Appends `orders` to the log, creating it (and its header) when needed.
    fn append(&self, orders: &[MarketOrder]) -> PersistResult<()>;
}
