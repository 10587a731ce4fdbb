//! Core domain types: sides, order types, orders, trades and book views.
//!
//! All quantities and prices are exact [`Decimal`] values; they serialize as
//! decimal string literals so no precision is lost over the wire or on disk.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The side of an order or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Bid side; matches against resting asks.
    Buy,
    /// Ask side; matches against resting bids.
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    #[inline]
    pub fn opposite(&self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// The execution policy of an order.
///
/// The three conditional kinds (`Stop`, `StopLimit`, `TakeProfit`) never
/// reach the matcher directly: they wait in the per-symbol trigger list and
/// are translated to `Market` or `Limit` on activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Match immediately at any price; residual is discarded.
    Market,
    /// Match while crossable under the limit price; residual rests.
    Limit,
    /// Immediate-or-cancel: like limit, but residual is discarded.
    Ioc,
    /// Fill-or-kill: full fill at or better than the limit price, or
    /// nothing.
    Fok,
    /// Conditional market (or limit, when a price is attached) order armed
    /// by a stop price.
    Stop,
    /// Conditional limit order armed by a stop price.
    StopLimit,
    /// Conditional order armed by a take-profit price.
    TakeProfit,
}

impl OrderType {
    /// Returns true for the conditional kinds held in the trigger list.
    #[must_use]
    #[inline]
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            OrderType::Stop | OrderType::StopLimit | OrderType::TakeProfit
        )
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Ioc => "ioc",
            OrderType::Fok => "fok",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop_limit",
            OrderType::TakeProfit => "take_profit",
        };
        write!(f, "{name}")
    }
}

/// A single order.
///
/// An order is owned by exactly one container at a time: the book level it
/// rests on, the trigger list it pends in, or (transiently) the matcher
/// processing it as the taker. Lookup indices store ids, never orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Engine-minted id, unique across the process lifetime.
    pub order_id: String,
    /// The trading symbol this order belongs to.
    pub symbol: String,
    /// Buy or sell.
    pub side: Side,
    /// Execution policy. Mutates during trigger activation (e.g. a priceless
    /// stop becomes a market order).
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Original quantity, strictly positive.
    pub quantity: Decimal,
    /// Unfilled quantity; non-increasing until it reaches zero.
    pub remaining: Decimal,
    /// Limit price. Required for `Limit` and `StopLimit`.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Arming price for `Stop` and `StopLimit`.
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    /// Arming price for `TakeProfit`.
    #[serde(default)]
    pub take_profit_price: Option<Decimal>,
    /// UTC RFC 3339 acceptance timestamp with `Z` suffix. Preserved across
    /// trigger activation.
    pub timestamp: String,
    /// Opaque caller-supplied id.
    #[serde(default)]
    pub client_order_id: Option<String>,
    /// Owner identity; carried through persistence.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Order {
    /// Quantity executed so far.
    #[must_use]
    #[inline]
    pub fn filled(&self) -> Decimal {
        self.quantity - self.remaining
    }

    /// True while any quantity is left to fill.
    #[must_use]
    #[inline]
    pub fn is_active(&self) -> bool {
        self.remaining > Decimal::ZERO
    }
}

/// A recorded fill between one maker and one taker.
///
/// `price` is the maker's resting price at the instant of the fill; the
/// aggressor side is the side of the incoming (taker) order. Fees are
/// computed once at recording time and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Engine-minted trade id, monotonically increasing per symbol.
    pub trade_id: String,
    /// The trading symbol.
    pub symbol: String,
    /// Execution price, quantized to 8 decimal places.
    pub price: Decimal,
    /// Executed quantity, quantized to 8 decimal places.
    pub quantity: Decimal,
    /// Side of the incoming order.
    pub aggressor_side: Side,
    /// Id of the resting order.
    pub maker_order_id: String,
    /// Id of the incoming order.
    pub taker_order_id: String,
    /// UTC RFC 3339 timestamp of the fill.
    pub timestamp: String,
    /// Maker fee, quantized to 8 decimal places. Negative values are
    /// rebates paid to the maker.
    pub maker_fee: Decimal,
    /// Taker fee, quantized to 8 decimal places.
    pub taker_fee: Decimal,
}

/// One aggregated price level of an L2 view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    /// The level price.
    pub price: Decimal,
    /// Aggregate resting quantity at this price.
    pub quantity: Decimal,
}

/// Best bid and offer with aggregate quantities.
#[derive(Debug, Clone, Serialize)]
pub struct Bbo {
    /// The trading symbol.
    pub symbol: String,
    /// Best bid, or `None` when the bid side is empty.
    pub bid: Option<Level>,
    /// Best ask, or `None` when the ask side is empty.
    pub ask: Option<Level>,
    /// UTC RFC 3339 timestamp of the observation.
    pub timestamp: String,
}

/// A depth-bounded aggregated view of one book: bids best-first
/// (descending price), asks best-first (ascending price).
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookDepth {
    /// Bid levels, best first.
    pub bids: Vec<Level>,
    /// Ask levels, best first.
    pub asks: Vec<Level>,
}

/// One raw fill emitted by the matcher, before fees and ids are attached.
#[derive(Debug, Clone)]
pub struct Fill {
    /// Id of the resting order that was hit.
    pub maker_order_id: String,
    /// The maker's resting price.
    pub price: Decimal,
    /// Quantity executed against this maker.
    pub quantity: Decimal,
}

/// The outcome of matching one incoming order against a book.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Raw fills in execution order.
    pub fills: Vec<Fill>,
    /// Ids of makers fully consumed by this match, so callers can drop
    /// their lookup entries.
    pub filled_order_ids: Vec<String>,
}

impl MatchResult {
    /// Total quantity executed across all fills.
    #[must_use]
    pub fn executed_quantity(&self) -> Decimal {
        self.fills.iter().map(|fill| fill.quantity).sum()
    }

    /// True when no fill occurred.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }
}
