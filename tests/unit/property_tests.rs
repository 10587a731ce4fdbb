//! Property tests: structural book invariants under random order flow.

use matchbook_rs::prelude::*;
use proptest::prelude::*;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
enum Op {
    /// Submit a limit order: match first, rest any residual.
    Limit { buy: bool, price: u32, qty: u32 },
    /// Submit a market order: match, discard any residual.
    Market { buy: bool, qty: u32 },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), 90u32..=110, 1u32..=50).prop_map(|(buy, price, qty)| Op::Limit {
            buy,
            price,
            qty
        }),
        (any::<bool>(), 1u32..=50).prop_map(|(buy, qty)| Op::Market { buy, qty }),
    ]
}

fn side(buy: bool) -> Side {
    if buy { Side::Buy } else { Side::Sell }
}

/// Quantities step in tenths so partial fills cross decimal boundaries.
fn tenths(value: u32) -> Decimal {
    Decimal::new(i64::from(value), 1)
}

fn order(id: u64, buy: bool, order_type: OrderType, qty: u32, price: Option<u32>) -> Order {
    Order {
        order_id: format!("prop_{id}"),
        symbol: "PROP".to_string(),
        side: side(buy),
        order_type,
        quantity: tenths(qty),
        remaining: tenths(qty),
        price: price.map(Decimal::from),
        stop_price: None,
        take_profit_price: None,
        timestamp: now_ts(),
        client_order_id: None,
        user_id: None,
    }
}

/// The submit semantics for a book in isolation: match, then rest a limit
/// residual.
fn apply(book: &mut OrderBook, id: u64, op: &Op) {
    match *op {
        Op::Limit { buy, price, qty } => {
            let mut incoming = order(id, buy, OrderType::Limit, qty, Some(price));
            let result = book.match_order(&mut incoming);
            assert!(result.executed_quantity() + incoming.remaining == incoming.quantity);
            if incoming.remaining > Decimal::ZERO {
                book.add_limit(incoming).unwrap();
            }
        }
        Op::Market { buy, qty } => {
            let mut incoming = order(id, buy, OrderType::Market, qty, None);
            book.match_order(&mut incoming);
            assert!(incoming.remaining >= Decimal::ZERO);
            assert!(incoming.remaining <= incoming.quantity);
        }
    }
}

fn assert_invariants(book: &OrderBook) {
    // the book is never crossed
    if let (Some(bid), Some(ask)) = book.best_prices() {
        assert!(bid < ask, "book crossed: bid {bid} >= ask {ask}");
    }

    // every resting order is live and within bounds
    for resting in book.iter_orders() {
        assert!(resting.remaining > Decimal::ZERO);
        assert!(resting.remaining <= resting.quantity);
        assert!(resting.price.is_some());
    }

    // the id index agrees with actual residency
    assert_eq!(book.order_count(), book.iter_orders().count());

    // depth views only report positive aggregate quantities
    let depth = book.snapshot_l2(usize::MAX);
    for level in depth.bids.iter().chain(depth.asks.iter()) {
        assert!(level.quantity > Decimal::ZERO);
    }
}

proptest! {
    #[test]
    fn random_flow_preserves_book_invariants(ops in proptest::collection::vec(arb_op(), 1..80)) {
        let mut book = OrderBook::new("PROP");
        for (id, op) in ops.iter().enumerate() {
            apply(&mut book, id as u64, op);
            assert_invariants(&book);
        }
    }

    #[test]
    fn quantity_is_conserved_across_random_flow(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let mut book = OrderBook::new("PROP");
        // Every fill consumes equal quantity from one maker and one taker.
        // Makers are always limits, so over the whole history:
        //   total limit quantity submitted
        //     == limit-taker fills + maker-side consumption + still resting
        let mut limit_submitted = Decimal::ZERO;
        let mut limit_taker_fills = Decimal::ZERO;
        let mut total_executed = Decimal::ZERO;

        for (id, op) in ops.iter().enumerate() {
            match *op {
                Op::Limit { buy, price, qty } => {
                    let mut incoming = order(id as u64, buy, OrderType::Limit, qty, Some(price));
                    limit_submitted += incoming.quantity;
                    let result = book.match_order(&mut incoming);
                    limit_taker_fills += result.executed_quantity();
                    total_executed += result.executed_quantity();
                    if incoming.remaining > Decimal::ZERO {
                        book.add_limit(incoming).unwrap();
                    }
                }
                Op::Market { buy, qty } => {
                    let mut incoming = order(id as u64, buy, OrderType::Market, qty, None);
                    let result = book.match_order(&mut incoming);
                    total_executed += result.executed_quantity();
                }
            }
        }

        let resting: Decimal = book.iter_orders().map(|o| o.remaining).sum();
        prop_assert_eq!(limit_submitted, limit_taker_fills + total_executed + resting);
    }
}
