//! Save/load round trips through a fresh engine.

use matchbook_rs::engine::{PersistedState, save_state};
use matchbook_rs::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::Path;

fn engine_at(dir: &Path) -> MatchingEngine {
    MatchingEngine::new(EngineConfig {
        persist_dir: dir.to_path_buf(),
        ..EngineConfig::default()
    })
}

fn limit(symbol: &str, side: Side, quantity: Decimal, price: Decimal) -> OrderRequest {
    OrderRequest {
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Limit,
        quantity,
        price: Some(price),
        stop_price: None,
        take_profit_price: None,
        client_order_id: None,
    }
}

fn market(symbol: &str, side: Side, quantity: Decimal) -> OrderRequest {
    OrderRequest {
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Market,
        quantity,
        price: None,
        stop_price: None,
        take_profit_price: None,
        client_order_id: None,
    }
}

#[tokio::test]
async fn test_save_then_load_restores_books_and_trades() {
    let dir = tempfile::tempdir().unwrap();

    let engine = engine_at(dir.path());
    // ETH-USD: residual ask of 3 at 2000
    engine
        .submit_order(limit("ETH-USD", Side::Sell, dec!(5), dec!(2000)))
        .await
        .unwrap();
    engine
        .submit_order(market("ETH-USD", Side::Buy, dec!(2)))
        .await
        .unwrap();
    // BTC-USD: two fills, residual ask of 2.5 at 101
    engine
        .submit_order(limit("BTC-USD", Side::Sell, dec!(2), dec!(100)))
        .await
        .unwrap();
    engine
        .submit_order(limit("BTC-USD", Side::Sell, dec!(3), dec!(101)))
        .await
        .unwrap();
    engine
        .submit_order(market("BTC-USD", Side::Buy, dec!(2.5)))
        .await
        .unwrap();

    let before = engine.recent_trades("BTC-USD").await;
    engine.save_state().await.unwrap();

    let restored = engine_at(dir.path());
    restored.load_state().await.unwrap();

    let btc = restored.book_snapshot("BTC-USD", 10).await;
    assert_eq!(btc.asks.len(), 1);
    assert_eq!(btc.asks[0].price, dec!(101));
    assert_eq!(btc.asks[0].quantity.to_string(), "2.50000000");

    let eth = restored.book_snapshot("ETH-USD", 10).await;
    assert_eq!(eth.asks[0].price, dec!(2000));
    assert_eq!(eth.asks[0].quantity.to_string(), "3.00000000");

    // trades come back in print order with bit-identical decimals
    let after = restored.recent_trades("BTC-USD").await;
    assert_eq!(after.len(), before.len());
    for (a, b) in after.iter().zip(before.iter()) {
        assert_eq!(a.trade_id, b.trade_id);
        assert_eq!(a.price.to_string(), b.price.to_string());
        assert_eq!(a.quantity.to_string(), b.quantity.to_string());
        assert_eq!(a.maker_fee.to_string(), b.maker_fee.to_string());
        assert_eq!(a.taker_fee.to_string(), b.taker_fee.to_string());
    }
}

#[tokio::test]
async fn test_pending_triggers_survive_restart() {
    let dir = tempfile::tempdir().unwrap();

    let engine = engine_at(dir.path());
    let (order, _) = engine
        .submit_order(OrderRequest {
            symbol: "BTC-USD".to_string(),
            side: Side::Buy,
            order_type: OrderType::Stop,
            quantity: dec!(1),
            price: None,
            stop_price: Some(dec!(120)),
            take_profit_price: None,
            client_order_id: None,
        })
        .await
        .unwrap();
    engine.save_state().await.unwrap();

    let restored = engine_at(dir.path());
    restored.load_state().await.unwrap();

    // the stop is pending again: cancellable, and still armable
    let removed = restored.cancel_order(&order.order_id).await.unwrap();
    assert_eq!(removed.order_id, order.order_id);
    assert_eq!(removed.stop_price, Some(dec!(120)));
}

#[tokio::test]
async fn test_restored_resting_order_keeps_its_id() {
    let dir = tempfile::tempdir().unwrap();

    let engine = engine_at(dir.path());
    let (order, _) = engine
        .submit_order(limit("BTC-USD", Side::Buy, dec!(1), dec!(99)))
        .await
        .unwrap();
    engine.save_state().await.unwrap();

    let restored = engine_at(dir.path());
    restored.load_state().await.unwrap();
    let removed = restored.cancel_order(&order.order_id).await.unwrap();
    assert_eq!(removed.order_id, order.order_id);
    assert_eq!(removed.timestamp, order.timestamp);
}

#[tokio::test]
async fn test_loader_drops_orders_that_cannot_rest() {
    let dir = tempfile::tempdir().unwrap();

    // a snapshot containing a market order and a fully-filled limit
    let mut state = PersistedState::default();
    state.open_orders.insert(
        "BTC-USD".to_string(),
        vec![
            Order {
                order_id: "ord_market".to_string(),
                symbol: "BTC-USD".to_string(),
                side: Side::Buy,
                order_type: OrderType::Market,
                quantity: dec!(1),
                remaining: dec!(1),
                price: None,
                stop_price: None,
                take_profit_price: None,
                timestamp: now_ts(),
                client_order_id: None,
                user_id: None,
            },
            Order {
                order_id: "ord_done".to_string(),
                symbol: "BTC-USD".to_string(),
                side: Side::Sell,
                order_type: OrderType::Limit,
                quantity: dec!(1),
                remaining: dec!(0),
                price: Some(dec!(100)),
                stop_price: None,
                take_profit_price: None,
                timestamp: now_ts(),
                client_order_id: None,
                user_id: None,
            },
        ],
    );
    save_state(dir.path(), &state).await.unwrap();

    let engine = engine_at(dir.path());
    engine.load_state().await.unwrap();
    let bbo = engine.bbo("BTC-USD").await;
    assert!(bbo.bid.is_none() && bbo.ask.is_none());
}

#[tokio::test]
async fn test_corrupt_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("state.json"), b"certainly not json").unwrap();

    let engine = engine_at(dir.path());
    engine.load_state().await.unwrap();
    assert!(engine.symbols().is_empty());
}

#[tokio::test]
async fn test_missing_snapshot_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_at(dir.path());
    engine.load_state().await.unwrap();
    assert!(engine.symbols().is_empty());
}

#[tokio::test]
async fn test_trade_ring_rehydrates_up_to_cap() {
    let dir = tempfile::tempdir().unwrap();

    let engine = engine_at(dir.path());
    engine
        .submit_order(limit("BTC-USD", Side::Sell, dec!(5), dec!(100)))
        .await
        .unwrap();
    for _ in 0..5 {
        engine
            .submit_order(market("BTC-USD", Side::Buy, dec!(1)))
            .await
            .unwrap();
    }
    engine.save_state().await.unwrap();

    // a smaller cap on reload truncates from the oldest end
    let restored = MatchingEngine::new(EngineConfig {
        persist_dir: dir.path().to_path_buf(),
        recent_trades_limit: 3,
        ..EngineConfig::default()
    });
    restored.load_state().await.unwrap();
    let trades = restored.recent_trades("BTC-USD").await;
    assert_eq!(trades.len(), 3);
}
