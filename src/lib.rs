//! # Matchbook: a multi-symbol continuous-auction matching engine
//!
//! A matching engine core written in Rust: per-symbol limit order books with
//! strict price-time priority, a taker/maker matcher, conditional-order
//! triggers, exact decimal fee computation, crash-consistent persistence and
//! a streaming market-data fan-out layer.
//!
//! ## Key Features
//!
//! - **Price-Time Priority Books**: Each symbol owns an ordered map of
//!   price levels keyed by exact decimal prices, with a strict FIFO per
//!   level. All fills execute at the maker's resting price.
//!
//! - **Full Order-Type Policy**: Market, limit, immediate-or-cancel and
//!   fill-or-kill on the taker path, plus stop, stop-limit and take-profit
//!   conditional orders evaluated by a trigger state machine.
//!
//! - **Exact Decimal Arithmetic**: Prices, quantities and fees are
//!   `rust_decimal` values end to end; no float drift, half-up rounding,
//!   8-decimal quantization only at trade-record and display boundaries.
//!
//! - **Per-Symbol Serialization**: One async mutex per symbol serializes
//!   submits and cancels on that symbol while other symbols proceed
//!   concurrently. The matching critical section never suspends.
//!
//! - **Maker/Taker Fees**: Configurable basis-point schedule with maker
//!   rebates, applied per fill on the exact notional.
//!
//! - **Crash-Consistent Persistence**: Periodic atomic whole-file snapshots
//!   (`state.json.tmp` then renamed to `state.json`) of open orders and
//!   recent trades, reloaded on startup.
//!
//! - **Lossy Fan-Out**: Market-data and trade channels serving push
//!   (socket-like) and pull (bounded queue) consumers; slow or broken
//!   subscribers are evicted, never buffered.
//!
//! ## Quick Tour
//!
//! ```rust
//! use matchbook_rs::prelude::*;
//! use rust_decimal_macros::dec;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), EngineError> {
//! let engine = MatchingEngine::default();
//!
//! let (maker, _) = engine
//!     .submit_order(OrderRequest {
//!         symbol: "BTC-USD".to_string(),
//!         side: Side::Sell,
//!         order_type: OrderType::Limit,
//!         quantity: dec!(1),
//!         price: Some(dec!(30000)),
//!         stop_price: None,
//!         take_profit_price: None,
//!         client_order_id: None,
//!     })
//!     .await?;
//!
//! let (taker, trades) = engine
//!     .submit_order(OrderRequest {
//!         symbol: "BTC-USD".to_string(),
//!         side: Side::Buy,
//!         order_type: OrderType::Market,
//!         quantity: dec!(0.4),
//!         price: None,
//!         stop_price: None,
//!         take_profit_price: None,
//!         client_order_id: None,
//!     })
//!     .await?;
//!
//! assert_eq!(trades.len(), 1);
//! assert_eq!(trades[0].maker_order_id, maker.order_id);
//! assert_eq!(taker.remaining, dec!(0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope
//!
//! The crate is the engine core only. Transport framing (HTTP, WebSocket),
//! process launch, configuration files and authentication belong to the
//! binary embedding it; the contracts it exposes are the request/response
//! shapes in [`engine::OrderRequest`] and friends, and the streaming
//! subscriptions on [`engine::FanoutHub`].

pub mod engine;

pub mod prelude;
mod utils;

pub use engine::{
    Bbo, BookDepth, BookView, CancelResponse, EngineConfig, EngineError, EngineTasks, FanoutHub,
    FeeSchedule, Fill, Level, MatchResult, MatchingEngine, Order, OrderBook, OrderRequest,
    OrderResponse, OrderType, PersistedState, PollUpdates, PriceLevel, PushConsumer,
    RecentTradesView, STREAM_QUEUE_CAPACITY, Side, SubscriberGone, SubscriberId, Trade,
};
pub use utils::{next_id, now_ts, quantize_8};
