//! Core order book: price-indexed levels with FIFO queues per price.
//!
//! Each side is an ordered map keyed by decimal price (value-ordered, not
//! lexicographic): best bid is the maximum key, best ask the minimum. Every
//! level holds a strict FIFO of resting orders, so price-time priority falls
//! out of the container shape. The book is owned by the engine and mutated
//! only under that symbol's lock; nothing in here suspends.

use crate::engine::error::EngineError;
use crate::engine::types::{Bbo, BookDepth, Level, Order, OrderType, Side};
use crate::utils::{now_ts, quantize_8};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::trace;

/// One price level: the price and the FIFO of orders resting at it.
///
/// Invariant: every queued order carries this level's price and the side of
/// the book the level lives on. Empty levels are removed eagerly.
#[derive(Debug)]
pub struct PriceLevel {
    /// The level price.
    pub price: Decimal,
    /// Resting orders in strict arrival order.
    pub queue: VecDeque<Order>,
}

impl PriceLevel {
    /// Sum of the remaining quantities of all queued orders.
    #[must_use]
    pub fn total_quantity(&self) -> Decimal {
        self.queue.iter().map(|order| order.remaining).sum()
    }
}

/// Order book with price-time priority for a single symbol.
pub struct OrderBook {
    /// The symbol this book belongs to.
    pub(super) symbol: String,

    /// Bid side, keyed by price ascending; best bid is the last key.
    pub(super) bids: BTreeMap<Decimal, PriceLevel>,

    /// Ask side, keyed by price ascending; best ask is the first key.
    pub(super) asks: BTreeMap<Decimal, PriceLevel>,

    /// Order id → (side, price) for O(log N) cancellation. Stores the
    /// location, never the order itself.
    pub(super) order_index: HashMap<String, (Side, Decimal)>,

    /// Price of the most recent fill on this book, if any.
    pub(super) last_trade_price: Option<Decimal>,
}

impl OrderBook {
    /// Create an empty book for the given symbol.
    #[must_use]
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            order_index: HashMap::new(),
            last_trade_price: None,
        }
    }

    /// The symbol this book belongs to.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Price of the most recent fill, if any trade has printed.
    #[must_use]
    #[inline]
    pub fn last_trade_price(&self) -> Option<Decimal> {
        self.last_trade_price
    }

    /// Number of orders currently resting on the book.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    /// True when neither side holds any order.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    pub(super) fn side_book(&self, side: Side) -> &BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub(super) fn side_book_mut(&mut self, side: Side) -> &mut BTreeMap<Decimal, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Rest a limit order at the tail of its price level, creating the
    /// level when absent.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidOrder`] when the order is not a limit
    /// order or carries no price. The caller must not add an id that is
    /// already resting.
    pub fn add_limit(&mut self, order: Order) -> Result<(), EngineError> {
        if order.order_type != OrderType::Limit {
            return Err(EngineError::invalid(format!(
                "only limit orders can rest on the book, got {}",
                order.order_type
            )));
        }
        let Some(price) = order.price else {
            return Err(EngineError::invalid("limit order must have a price"));
        };
        debug_assert!(
            !self.order_index.contains_key(&order.order_id),
            "order id already on the book"
        );
        trace!(
            order_id = %order.order_id,
            symbol = %self.symbol,
            side = %order.side,
            %price,
            "resting limit order"
        );
        self.order_index
            .insert(order.order_id.clone(), (order.side, price));
        let level = self
            .side_book_mut(order.side)
            .entry(price)
            .or_insert_with(|| PriceLevel {
                price,
                queue: VecDeque::new(),
            });
        level.queue.push_back(order);
        Ok(())
    }

    /// Remove a resting order by id, returning it.
    ///
    /// Locates the level through the order index, walks its FIFO, and
    /// deletes the level when it becomes empty. Returns `None` when the id
    /// is not resting. O(M) in the level depth, which is typically shallow.
    pub fn remove_order(&mut self, order_id: &str) -> Option<Order> {
        let (side, price) = self.order_index.remove(order_id)?;
        let book = self.side_book_mut(side);
        let level = book.get_mut(&price)?;
        let position = level
            .queue
            .iter()
            .position(|order| order.order_id == order_id);
        let removed = position.and_then(|index| level.queue.remove(index));
        if level.queue.is_empty() {
            book.remove(&price);
        }
        removed
    }

    /// Best bid and ask prices, either of which may be absent.
    #[must_use]
    pub fn best_prices(&self) -> (Option<Decimal>, Option<Decimal>) {
        (
            self.bids.keys().next_back().copied(),
            self.asks.keys().next().copied(),
        )
    }

    /// Best bid and offer with aggregate level quantities.
    #[must_use]
    pub fn bbo(&self) -> Bbo {
        let bid = self.bids.values().next_back().map(|level| Level {
            price: level.price,
            quantity: level.total_quantity(),
        });
        let ask = self.asks.values().next().map(|level| Level {
            price: level.price,
            quantity: level.total_quantity(),
        });
        Bbo {
            symbol: self.symbol.clone(),
            bid,
            ask,
            timestamp: now_ts(),
        }
    }

    /// Aggregated L2 view up to `depth` levels per side.
    ///
    /// Bids are emitted best-first (descending price), asks best-first
    /// (ascending price). Quantities are quantized to 8 decimal places;
    /// levels whose aggregate is zero are skipped.
    #[must_use]
    pub fn snapshot_l2(&self, depth: usize) -> BookDepth {
        let mut bids = Vec::new();
        for level in self.bids.values().rev() {
            if bids.len() >= depth {
                break;
            }
            let quantity = level.total_quantity();
            if quantity > Decimal::ZERO {
                bids.push(Level {
                    price: level.price,
                    quantity: quantize_8(quantity),
                });
            }
        }
        let mut asks = Vec::new();
        for level in self.asks.values() {
            if asks.len() >= depth {
                break;
            }
            let quantity = level.total_quantity();
            if quantity > Decimal::ZERO {
                asks.push(Level {
                    price: level.price,
                    quantity: quantize_8(quantity),
                });
            }
        }
        BookDepth { bids, asks }
    }

    /// All resting orders, bids first, each side in key order with FIFO
    /// order inside a level. Used by the persistence snapshot.
    pub fn iter_orders(&self) -> impl Iterator<Item = &Order> {
        self.bids
            .values()
            .chain(self.asks.values())
            .flat_map(|level| level.queue.iter())
    }
}
