//! Conditional order evaluation and activation.
//!
//! Pending stop / stop-limit / take-profit orders live in their symbol's
//! trigger list and are re-evaluated whenever a trade prints on that symbol
//! and on the periodic background rescan. A scan observes the market state
//! `(last, bid, ask)` once, drains every order whose condition holds into a
//! local activation queue (never mutating the list mid-iteration), then
//! activates them in insertion order. Each activation re-enters the taker
//! path with the original order id and acceptance timestamp; later
//! activations observe the fills of earlier ones.

use crate::engine::core::{MatchingEngine, SymbolState};
use crate::engine::types::{Order, OrderType, Side};
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Whether a pending conditional order's arming condition holds for the
/// observed market state.
///
/// Stops arm when the market moves through the stop price (last print or
/// best opposite quote); take-profits arm when it moves through the target
/// in the favorable direction.
pub(super) fn should_activate(
    order: &Order,
    last: Option<Decimal>,
    bid: Option<Decimal>,
    ask: Option<Decimal>,
) -> bool {
    match order.order_type {
        OrderType::Stop | OrderType::StopLimit => {
            let Some(stop) = order.stop_price else {
                return false;
            };
            match order.side {
                Side::Buy => {
                    last.is_some_and(|price| price >= stop)
                        || ask.is_some_and(|price| price >= stop)
                }
                Side::Sell => {
                    last.is_some_and(|price| price <= stop)
                        || bid.is_some_and(|price| price <= stop)
                }
            }
        }
        OrderType::TakeProfit => {
            let Some(target) = order.take_profit_price else {
                return false;
            };
            match order.side {
                Side::Sell => {
                    last.is_some_and(|price| price >= target)
                        || ask.is_some_and(|price| price >= target)
                }
                Side::Buy => {
                    last.is_some_and(|price| price <= target)
                        || bid.is_some_and(|price| price <= target)
                }
            }
        }
        _ => false,
    }
}

/// The executable type a conditional order becomes on activation: limit when
/// it carries a price, market otherwise. Stop-limits always carry one.
fn activated_type(order: &Order) -> OrderType {
    match (order.order_type, order.price) {
        (OrderType::StopLimit, _) | (_, Some(_)) => OrderType::Limit,
        (_, None) => OrderType::Market,
    }
}

impl MatchingEngine {
    /// Evaluate and activate pending conditional orders for one symbol.
    ///
    /// Runs entirely under the symbol lock; activation never raises. Trades
    /// printed by activations schedule the usual broadcasts and a follow-up
    /// rescan, so cascades settle across successive scans.
    pub async fn process_triggers(&self, symbol: &str) {
        let state = self.state_for(symbol);
        let mut state = state.lock().await;
        if state.triggers.is_empty() {
            return;
        }

        let last = state.book.last_trade_price();
        let (bid, ask) = state.book.best_prices();

        // Evaluate against the scan-start state into a local queue first;
        // the list must not be mutated while iterating.
        let mut pending: Vec<Order> = Vec::new();
        state.triggers.retain(|order| {
            if should_activate(order, last, bid, ask) {
                pending.push(order.clone());
                false
            } else {
                true
            }
        });

        for mut order in pending {
            order.order_type = activated_type(&order);
            self.activate(&mut state, symbol, order);
        }
    }

    /// Re-enter the taker path for an activated order, reusing its original
    /// id and timestamp.
    fn activate(&self, state: &mut SymbolState, symbol: &str, mut order: Order) {
        let result = state.book.match_order(&mut order);
        let trades = self.record_trades(state, symbol, &result, &order);

        if order.remaining > Decimal::ZERO
            && order.order_type == OrderType::Limit
            && order.price.is_some()
        {
            // Index entry persists from acceptance time.
            if let Err(error) = state.book.add_limit(order.clone()) {
                warn!(order_id = %order.order_id, %error, "failed to rest activated order");
                self.order_symbol_index.remove(&order.order_id);
            }
        } else {
            self.order_symbol_index.remove(&order.order_id);
        }

        self.schedule_broadcasts(state, symbol, &trades);
        info!(
            order_id = %order.order_id,
            symbol = %symbol,
            order_type = %order.order_type,
            filled = %order.filled(),
            remaining = %order.remaining,
            "trigger order activated"
        );
    }
}
