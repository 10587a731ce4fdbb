//! Transport-free request and response contracts.
//!
//! These are the shapes a transport layer (HTTP, WebSocket, whatever)
//! serializes at its edge; the engine itself neither frames nor routes.
//! Decimals serialize as exact decimal strings, enumerations as lowercase
//! literal names, timestamps as RFC 3339 UTC with `Z` suffix.

use crate::engine::types::{Level, Order, OrderType, Side, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A submit request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// The trading symbol, e.g. `BTC-USD`.
    pub symbol: String,
    /// Buy or sell.
    pub side: Side,
    /// Execution policy.
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Order quantity; must be strictly positive.
    pub quantity: Decimal,
    /// Limit price; required for `limit` and `stop_limit`.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Arming price; required for `stop` and `stop_limit`.
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    /// Arming price; required for `take_profit`.
    #[serde(default)]
    pub take_profit_price: Option<Decimal>,
    /// Opaque caller-supplied id echoed back on the order.
    #[serde(default)]
    pub client_order_id: Option<String>,
}

/// The submit response.
///
/// `status` is always `"accepted"` for well-formed input — including
/// fill-or-kill rejects, which callers detect via `filled_quantity == 0`
/// with an empty trade list.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    /// The engine-minted order id.
    pub order_id: String,
    /// Always `"accepted"`.
    pub status: String,
    /// Quantity executed during this submit.
    pub filled_quantity: Decimal,
    /// Quantity left open (resting, pending, or discarded).
    pub remaining_quantity: Decimal,
    /// Trades printed by this submit, in execution order.
    pub trades: Vec<Trade>,
}

impl OrderResponse {
    /// Build the response for a processed order.
    #[must_use]
    pub fn new(order: &Order, trades: Vec<Trade>) -> Self {
        Self {
            order_id: order.order_id.clone(),
            status: "accepted".to_string(),
            filled_quantity: order.filled(),
            remaining_quantity: order.remaining,
            trades,
        }
    }
}

/// The cancel response.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    /// The cancelled order id.
    pub order_id: String,
    /// Always `"cancelled"`.
    pub status: String,
}

impl CancelResponse {
    /// Build the response for a successful cancellation.
    #[must_use]
    pub fn cancelled(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            status: "cancelled".to_string(),
        }
    }
}

/// A depth-bounded L2 book view: bids descending, asks ascending,
/// quantities at 8 decimal places.
#[derive(Debug, Clone, Serialize)]
pub struct BookView {
    /// The trading symbol.
    pub symbol: String,
    /// Bid levels, best first.
    pub bids: Vec<Level>,
    /// Ask levels, best first.
    pub asks: Vec<Level>,
    /// UTC RFC 3339 timestamp of the view.
    pub timestamp: String,
}

/// The recent-trades view: most recent prints up to the ring capacity.
#[derive(Debug, Clone, Serialize)]
pub struct RecentTradesView {
    /// The trading symbol.
    pub symbol: String,
    /// Trades in print order, oldest first.
    pub trades: Vec<Trade>,
}

impl RecentTradesView {
    /// Build the view from a ring copy.
    #[must_use]
    pub fn new(symbol: impl Into<String>, trades: Vec<Trade>) -> Self {
        Self {
            symbol: symbol.into(),
            trades,
        }
    }
}

/// The polled-updates view: a book snapshot plus the trades printed
/// strictly after the caller's cursor.
#[derive(Debug, Clone, Serialize)]
pub struct PollUpdates {
    /// Current depth-bounded book view.
    pub orderbook: BookView,
    /// Trades after the caller's `since` cursor; the whole ring when the
    /// cursor is absent or unknown.
    pub trades: Vec<Trade>,
    /// Id of the newest trade in the ring, to use as the next cursor.
    pub latest_trade_id: Option<String>,
}
