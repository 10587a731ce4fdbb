//! Fan-out behavior driven through the engine: broadcasts after submits,
//! cancels and heartbeats.

use matchbook_rs::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

fn limit(symbol: &str, side: Side, price: rust_decimal::Decimal) -> OrderRequest {
    OrderRequest {
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Limit,
        quantity: dec!(1),
        price: Some(price),
        stop_price: None,
        take_profit_price: None,
        client_order_id: None,
    }
}

fn market(symbol: &str, side: Side) -> OrderRequest {
    OrderRequest {
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Market,
        quantity: dec!(1),
        price: None,
        stop_price: None,
        take_profit_price: None,
        client_order_id: None,
    }
}

async fn recv_frame(rx: &mut tokio::sync::mpsc::Receiver<String>) -> String {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("stream closed")
}

#[tokio::test]
async fn test_submit_broadcasts_marketdata() {
    let engine = MatchingEngine::default();
    let (_, mut rx) = engine.fanout().subscribe_marketdata();

    engine
        .submit_order(limit("BTC-USD", Side::Buy, dec!(99)))
        .await
        .unwrap();

    let frame = recv_frame(&mut rx).await;
    assert!(frame.contains("\"symbol\":\"BTC-USD\""));
    assert!(frame.contains("\"price\":\"99\""));
    assert!(frame.contains("\"quantity\":\"1.00000000\""));
}

#[tokio::test]
async fn test_fill_broadcasts_trades_frame() {
    let engine = MatchingEngine::default();
    let (_, mut rx) = engine.fanout().subscribe_trades();

    engine
        .submit_order(limit("BTC-USD", Side::Sell, dec!(100)))
        .await
        .unwrap();
    engine
        .submit_order(market("BTC-USD", Side::Buy))
        .await
        .unwrap();

    let frame = recv_frame(&mut rx).await;
    assert!(frame.starts_with("{\"symbol\":\"BTC-USD\""));
    assert!(frame.contains("\"aggressor_side\":\"buy\""));
    assert!(frame.contains("\"price\":\"100.00000000\""));
}

#[tokio::test]
async fn test_submit_without_fills_sends_no_trades_frame() {
    let engine = MatchingEngine::default();
    let (_, mut rx) = engine.fanout().subscribe_trades();

    engine
        .submit_order(limit("BTC-USD", Side::Buy, dec!(99)))
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;

    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_cancel_broadcasts_marketdata() {
    let engine = MatchingEngine::default();
    let (order, _) = engine
        .submit_order(limit("BTC-USD", Side::Buy, dec!(99)))
        .await
        .unwrap();

    let (_, mut rx) = engine.fanout().subscribe_marketdata();
    engine.cancel_order(&order.order_id).await.unwrap();

    let frame = recv_frame(&mut rx).await;
    assert!(frame.contains("\"bids\":[]"));
}

#[tokio::test]
async fn test_heartbeat_task_reaches_subscribers() {
    let dir = tempfile::tempdir().unwrap();
    let engine = Arc::new(MatchingEngine::new(EngineConfig {
        heartbeat_interval: Duration::from_millis(30),
        persist_dir: dir.path().to_path_buf(),
        ..EngineConfig::default()
    }));
    let tasks = Arc::clone(&engine).start_background_tasks();

    let (_, mut md) = engine.fanout().subscribe_marketdata();
    let (_, mut tr) = engine.fanout().subscribe_trades();

    let md_frame = recv_frame(&mut md).await;
    let tr_frame = recv_frame(&mut tr).await;
    assert!(md_frame.contains("\"type\":\"heartbeat\""));
    assert!(tr_frame.contains("\"type\":\"heartbeat\""));

    tasks.shutdown(&engine).await;
}

#[tokio::test]
async fn test_unsubscribed_consumer_stops_receiving() {
    let engine = MatchingEngine::default();
    let (id, mut rx) = engine.fanout().subscribe_marketdata();
    engine.fanout().unsubscribe_marketdata(id);

    engine
        .submit_order(limit("BTC-USD", Side::Buy, dec!(99)))
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;

    // channel closed: sender side was dropped at unsubscribe
    assert!(rx.recv().await.is_none());
}
