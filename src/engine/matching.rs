//! Price-time priority matching against a single book.
//!
//! All fills execute at the maker's resting price: the aggressor gets price
//! improvement, the maker gets its quoted price. Matching never suspends and
//! never fails; structural invariants hold even on caller misuse.

use crate::engine::book::OrderBook;
use crate::engine::types::{Fill, MatchResult, Order, OrderType, Side};
use rust_decimal::Decimal;

impl OrderBook {
    /// Whether the incoming order can execute right now.
    ///
    /// Market orders cross whenever the opposite side is non-empty.
    /// Limit-like orders (limit / ioc / fok) cross when the best opposite
    /// price satisfies their limit. Conditional kinds are translated before
    /// they reach the matcher and therefore never cross here.
    fn crossable(&self, incoming: &Order) -> bool {
        let (bid, ask) = self.best_prices();
        if incoming.order_type == OrderType::Market {
            return match incoming.side {
                Side::Buy => ask.is_some(),
                Side::Sell => bid.is_some(),
            };
        }
        let Some(price) = incoming.price else {
            return false;
        };
        match incoming.side {
            Side::Buy => ask.is_some_and(|best| price >= best),
            Side::Sell => bid.is_some_and(|best| price <= best),
        }
    }

    /// Match the incoming order against the book.
    ///
    /// Walks the opposite side best-price-first, filling FIFO within each
    /// level. Decrements `incoming.remaining` and each maker's `remaining`,
    /// pops fully consumed makers, removes emptied levels eagerly and
    /// records the execution price as the book's last trade price. The
    /// caller decides what to do with any residual.
    pub fn match_order(&mut self, incoming: &mut Order) -> MatchResult {
        let mut result = MatchResult::default();

        while incoming.remaining > Decimal::ZERO && self.crossable(incoming) {
            let best_price = match incoming.side {
                Side::Buy => self.asks.keys().next().copied(),
                Side::Sell => self.bids.keys().next_back().copied(),
            };
            let Some(price) = best_price else {
                break;
            };

            let book = match incoming.side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let Some(level) = book.get_mut(&price) else {
                break;
            };
            let Some(maker) = level.queue.front_mut() else {
                // Empty levels are removed eagerly; clean up and move on.
                book.remove(&price);
                continue;
            };

            let quantity = incoming.remaining.min(maker.remaining);
            incoming.remaining -= quantity;
            maker.remaining -= quantity;
            let maker_exhausted = maker.remaining <= Decimal::ZERO;

            result.fills.push(Fill {
                maker_order_id: maker.order_id.clone(),
                price,
                quantity,
            });

            if maker_exhausted {
                if let Some(filled) = level.queue.pop_front() {
                    self.order_index.remove(&filled.order_id);
                    result.filled_order_ids.push(filled.order_id);
                }
                if level.queue.is_empty() {
                    book.remove(&price);
                }
            }
            self.last_trade_price = Some(price);
        }

        result
    }

    /// Quantity executable right now on the opposite side within the price
    /// cap, without mutating the book. Capped at `quantity`.
    ///
    /// This is the fill-or-kill precheck: an FOK fills iff
    /// `peek_match(...) == quantity`. A peek with no cap reports zero,
    /// because a priceless limit-like order is never crossable — the
    /// precheck must agree with [`Self::match_order`]. Precheck and match
    /// run within one critical section, so no interleaving submit can
    /// invalidate the answer.
    #[must_use]
    pub fn peek_match(
        &self,
        side: Side,
        quantity: Decimal,
        limit_price: Option<Decimal>,
    ) -> Decimal {
        if limit_price.is_none() {
            return Decimal::ZERO;
        }
        let mut matched = Decimal::ZERO;
        let levels: Box<dyn Iterator<Item = &crate::engine::book::PriceLevel>> = match side {
            Side::Buy => Box::new(self.asks.values()),
            Side::Sell => Box::new(self.bids.values().rev()),
        };
        for level in levels {
            if matched >= quantity {
                break;
            }
            if let Some(limit) = limit_price {
                match side {
                    Side::Buy if level.price > limit => break,
                    Side::Sell if level.price < limit => break,
                    _ => {}
                }
            }
            matched += level.total_quantity();
        }
        matched.min(quantity)
    }
}
