use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use market_quoter::cache::MemoryCache;
use market_quoter::config::QuoterConfig;
use market_quoter::engine::{OrderBook, Quoter};
use market_quoter::market_data::adapters::HardcodedFeed;
use market_quoter::persist::CsvOrderLog;
use market_quoter::telemetry;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "market-quoter", about = "Quote best price and VWAP from a live order feed")]
struct Cli {
    /// TOML config file (defaults to ./quoter.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Instrument to quote
    #[arg(long)]
    instrument: Option<String>,
    /// Quantity the quote must cover
    #[arg(long)]
    quantity: Option<u64>,
    /// How long to ingest before quoting
    #[arg(long)]
    run_for_secs: Option<u64>,
    /// Order log location
    #[arg(long)]
    db_path: Option<PathBuf>,
}

impl Cli {
    fn apply(self, mut config: QuoterConfig) -> QuoterConfig {
        if let Some(instrument) = self.instrument {
            config.instrument_id = instrument;
        }
        if let Some(quantity) = self.quantity {
            config.quantity = quantity;
        }
        if let Some(secs) = self.run_for_secs {
            config.run_for_secs = secs;
        }
        if let Some(path) = self.db_path {
            config.orders_db_path = path;
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // load .env

    let cli = Cli::parse();
    let config = QuoterConfig::load(cli.config.as_deref())?;
    let config = cli.apply(config);

    telemetry::init_tracing(&config.log_filter);
    telemetry::init_metrics(config.metrics_port)?;
    info!(?config, "Starting market quoter");

    let (min_delay, max_delay) = config.feed_delay_range();
    let feed = Arc::new(HardcodedFeed::with_sample_orders(min_delay, max_delay));
    let cache = Arc::new(MemoryCache::<OrderBook>::with_expiration(config.cache_expiration()));
    let order_log = Arc::new(CsvOrderLog::new(&config.orders_db_path));

    let quoter = Quoter::builder()
        .feed(feed)
        .cache(cache)
        .order_log(order_log)
        .start()
        .await?;

    tokio::time::sleep(config.run_for()).await;

    let instrument = config.instrument_id.as_str();
    let qty = config.quantity;
    let quote = quoter.get_quote(instrument, qty)?;
    let vwap = quoter.get_volume_weighted_average_price(instrument)?;

    println!("Quote: {}, {}", quote, quote / qty as f64);
    println!("Average Price: {}", vwap);
    println!();
    println!("Done");

    quoter.shutdown().await;
    if let Some(err) = quoter.take_ingestion_error() {
        warn!(error = %err, "Ingestion halted before shutdown");
    }
    Ok(())
}
