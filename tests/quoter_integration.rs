use std::sync::Arc;
use std::thread;
use std::time::Duration;

use market_quoter::cache::{Cache, MemoryCache};
use market_quoter::engine::{IngestionState, MarketOrder, OrderBook, Quoter, QuoterError};
use market_quoter::market_data::adapters::{ChannelFeed, HardcodedFeed};
use market_quoter::persist::{CsvOrderLog, OrderLog};

async fn wait_until<F: Fn() -> bool>(condition: F, what: &str) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

/// Two known orders loaded straight into the cache give the documented quotes.
#[tokio::test]
async fn test_end_to_end_example() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(MemoryCache::<OrderBook>::new());
    cache.add(
        "DK50782120",
        vec![
            MarketOrder::new("DK50782120", 99.81, 421),
            MarketOrder::new("DK50782120", 100.001, 900),
        ],
    );

    let (feed, _handle) = ChannelFeed::new(16);
    let quoter = Quoter::builder()
        .feed(Arc::new(feed))
        .cache(cache)
        .orders_db_path(dir.path().join("orders.csv"))
        .start()
        .await
        .unwrap();

    assert_eq!(quoter.get_quote("DK50782120", 10).unwrap(), 99.81);
    assert_eq!(
        quoter.get_volume_weighted_average_price("DK50782120").unwrap(),
        (99.81 * 421.0 + 100.001 * 900.0) / (421.0 + 900.0)
    );
    assert_eq!(quoter.get_quote("ABC123", 10).unwrap(), 0.0);
    assert_eq!(quoter.get_quote("DK50782120", 1000).unwrap(), 0.0);
    assert_eq!(quoter.get_volume_weighted_average_price("ABC123").unwrap(), 0.0);

    let err = quoter.get_quote("", 10).unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(matches!(quoter.get_quote("DK50782120", 0), Err(QuoterError::Validation(_))));

    quoter.shutdown().await;
    quoter.shutdown().await;
    assert_eq!(quoter.state(), IngestionState::Stopped);
}

/// Orders ingested in one run are replayed into the next.
#[tokio::test]
async fn test_order_log_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("MarketOrders.csv");

    let first = Quoter::builder()
        .feed(Arc::new(HardcodedFeed::with_sample_orders(Duration::ZERO, Duration::from_millis(2))))
        .cache(Arc::new(MemoryCache::<OrderBook>::new()))
        .orders_db_path(&db_path)
        .start()
        .await
        .unwrap();
    wait_until(|| first.state() == IngestionState::Stopped, "sample feed to drain").await;
    let vwap_before = first.get_volume_weighted_average_price("AB73567490").unwrap();
    first.shutdown().await;

    let mut logged = 0;
    CsvOrderLog::new(&db_path).replay(&mut |_| logged += 1).unwrap();
    assert_eq!(logged, HardcodedFeed::sample_orders().len());

    let (feed, _handle) = ChannelFeed::new(16);
    let second = Quoter::builder()
        .feed(Arc::new(feed))
        .cache(Arc::new(MemoryCache::<OrderBook>::new()))
        .orders_db_path(&db_path)
        .start()
        .await
        .unwrap();

    assert_eq!(second.order_book("AB73567490").len(), 3);
    assert_eq!(second.get_volume_weighted_average_price("AB73567490").unwrap(), vwap_before);
    assert_eq!(second.get_quote("BA79603015", 50).unwrap(), 103.2);
    assert_eq!(second.get_quote("DK50782120", 120).unwrap(), 99.81);
    second.shutdown().await;
}

/// Readers on plain threads never observe a list that shrinks or a torn VWAP
/// while the feed keeps appending.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_queries_during_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let (feed, handle) = ChannelFeed::new(256);
    let quoter = Arc::new(
        Quoter::builder()
            .feed(Arc::new(feed))
            .cache(Arc::new(MemoryCache::<OrderBook>::new()))
            .orders_db_path(dir.path().join("orders.csv"))
            .start()
            .await
            .unwrap(),
    );

    const ORDERS: usize = 300;
    let producer = tokio::spawn(async move {
        for i in 0..ORDERS {
            // Every order trades at 100.0 so any consistent snapshot has VWAP 100.0
            let order = MarketOrder::new("DK50782120", 100.0, (i % 7 + 1) as u64);
            if i % 2 == 0 {
                handle.send(order).await.unwrap();
            } else {
                handle.publish(order).await;
            }
        }
        handle
    });

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let quoter = Arc::clone(&quoter);
            thread::spawn(move || {
                let mut last_len = 0;
                while last_len < ORDERS {
                    let len = quoter.order_book("DK50782120").len();
                    assert!(len >= last_len);
                    last_len = len;

                    let vwap = quoter.get_volume_weighted_average_price("DK50782120").unwrap();
                    assert!(vwap == 0.0 || vwap == 100.0);
                    let quote = quoter.get_quote("DK50782120", 1).unwrap();
                    assert!(quote == 0.0 || quote == 100.0);
                    thread::yield_now();
                }
            })
        })
        .collect();

    let _handle = producer.await.unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(quoter.order_book("DK50782120").len(), ORDERS);
    quoter.shutdown().await;
    assert_eq!(quoter.state(), IngestionState::Stopped);
}

/// Volumes whose sum exceeds `u64::MAX` still average to the right price.
#[tokio::test]
async fn test_vwap_over_huge_volume() {
    let dir = tempfile::tempdir().unwrap();
    let (feed, _handle) = ChannelFeed::new(16);
    let quoter = Quoter::builder()
        .feed(Arc::new(feed))
        .cache(Arc::new(MemoryCache::<OrderBook>::new()))
        .orders_db_path(dir.path().join("orders.csv"))
        .start()
        .await
        .unwrap();

    let qty = u64::MAX / 2 + 1;
    quoter.ingest(MarketOrder::new("X", 10.0, qty)).unwrap();
    quoter.ingest(MarketOrder::new("X", 10.0, qty)).unwrap();

    assert_eq!(quoter.get_volume_weighted_average_price("X").unwrap(), 10.0);
    assert_eq!(quoter.get_quote("X", u64::MAX).unwrap(), 0.0);
    assert_eq!(quoter.get_quote("X", qty).unwrap(), 10.0);
    quoter.shutdown().await;
}

/// Rows with a negative price or an empty id never reach the cache on restart.
#[tokio::test]
async fn test_restart_ignores_malformed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("MarketOrders.csv");
    std::fs::write(
        &db_path,
        "InstrumentId,Price,Quantity\nDK50782120,99.81,421\nDK50782120,-5.0,900\n,1.0,0\n",
    )
    .unwrap();

    let (feed, _handle) = ChannelFeed::new(16);
    let quoter = Quoter::builder()
        .feed(Arc::new(feed))
        .cache(Arc::new(MemoryCache::<OrderBook>::new()))
        .orders_db_path(&db_path)
        .start()
        .await
        .unwrap();

    assert_eq!(quoter.get_quote("DK50782120", 10).unwrap(), 99.81);
    assert_eq!(quoter.get_volume_weighted_average_price("DK50782120").unwrap(), 99.81);
    assert!(matches!(
        quoter.ingest(MarketOrder::new("", f64::NAN, 0)),
        Err(QuoterError::Validation(_))
    ));
    assert_eq!(quoter.order_book("DK50782120").len(), 1);
    quoter.shutdown().await;
}
