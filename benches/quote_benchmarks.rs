use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use market_quoter::cache::MemoryCache;
use market_quoter::engine::{MarketOrder, OrderBook, Quoter};
use market_quoter::market_data::adapters::{ChannelFeed, ChannelFeedHandle};
use market_quoter::persist::{OrderLog, PersistResult};

/// Keeps disk I/O out of the measurements.
struct NullLog;

impl OrderLog for NullLog {
    fn replay(&self, _on_order: &mut dyn FnMut(MarketOrder)) -> PersistResult<usize> {
        Ok(0)
    }

    fn append(&self, _orders: &[MarketOrder]) -> PersistResult<()> {
        Ok(())
    }
}

fn quoter_with_book(rt: &tokio::runtime::Runtime, book_size: usize) -> (Quoter, ChannelFeedHandle) {
    let (feed, handle) = ChannelFeed::new(16);
    let quoter = rt
        .block_on(
            Quoter::builder()
                .feed(Arc::new(feed))
                .cache(Arc::new(MemoryCache::<OrderBook>::new()))
                .order_log(Arc::new(NullLog))
                .start(),
        )
        .expect("quoter starts");

    for i in 0..book_size {
        let price = 100.0 + (i % 97) as f64 * 0.01;
        let qty = (i % 1_000 + 1) as u64;
        quoter
            .ingest(MarketOrder::new("DK50782120", price, qty))
            .expect("ingest");
    }
    (quoter, handle)
}

fn bench_queries(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("queries");

    for book_size in [10usize, 100, 1_000] {
        let (quoter, _handle) = quoter_with_book(&rt, book_size);

        group.bench_with_input(BenchmarkId::new("get_quote", book_size), &book_size, |b, _| {
            b.iter(|| quoter.get_quote(black_box("DK50782120"), black_box(500)))
        });
        group.bench_with_input(BenchmarkId::new("vwap", book_size), &book_size, |b, _| {
            b.iter(|| quoter.get_volume_weighted_average_price(black_box("DK50782120")))
        });

        rt.block_on(quoter.shutdown());
    }
    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let (quoter, _handle) = quoter_with_book(&rt, 0);

    let mut i = 0u64;
    c.bench_function("ingest_new_instrument_each_time", |b| {
        b.iter(|| {
            i += 1;
            quoter.ingest(MarketOrder::new(format!("INST{}", i), 100.0, 10))
        })
    });

    rt.block_on(quoter.shutdown());
}

criterion_group!(benches, bench_queries, bench_ingest);
criterion_main!(benches);
