//! Concurrent quoting engine over a live stream of market orders.
//!
//! Orders arrive from an [`OrderFeed`](market_data::adapters::OrderFeed), are
//! appended to a durable [`OrderLog`](persist::OrderLog) and merged into a
//! per-instrument [`Cache`](cache::Cache). A [`Quoter`](engine::Quoter) answers
//! best-price and VWAP queries against that cache while ingestion keeps running.

pub mod cache;
pub mod config;
pub mod engine;
pub mod market_data;
pub mod persist;
pub mod telemetry;
