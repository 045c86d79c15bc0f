use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV record failure: {0}")]
    Csv(#[from] csv::Error),
}

pub type PersistResult<T> = Result<T, PersistError>;

pub const DEFAULT_ORDERS_DB_PATH: &str = "MarketOrders.csv";
