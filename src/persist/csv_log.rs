//! Flat CSV order log: an `InstrumentId,Price,Quantity` header followed by
//! one row per order. The header is written only when the file is new or empty.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::engine::types::MarketOrder;
use crate::persist::types::PersistResult;
use crate::persist::OrderLog;

#[derive(Debug)]
pub struct CsvOrderLog {
    path: PathBuf,
    // Serializes appends from the pull and push ingestion tasks
    write_lock: Mutex<()>,
}

impl CsvOrderLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OrderLog for CsvOrderLog {
    #[instrument(skip(self, on_order), fields(path = %self.path.display()))]
    fn replay(&self, on_order: &mut dyn FnMut(MarketOrder)) -> PersistResult<usize> {
        if !self.path.exists() {
            info!("No order log found, nothing to replay");
            return Ok(0);
        }

        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut replayed = 0;
        for record in reader.deserialize::<MarketOrder>() {
            on_order(record?);
            replayed += 1;
        }

        info!(replayed, "Replayed order log");
        Ok(replayed)
    }

    fn append(&self, orders: &[MarketOrder]) -> PersistResult<()> {
        let _guard = self.write_lock.lock();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        for order in orders {
            writer.serialize(order)?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), count = orders.len(), header = needs_header, "Appended orders to log");
        Ok(())
    }
}
