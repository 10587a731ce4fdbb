/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/3/25
******************************************************************************/

//! The multi-symbol matching engine.
//!
//! One [`MatchingEngine`] owns every symbol's book, trigger list and
//! recent-trade ring. All three live behind a single per-symbol async mutex,
//! which serializes submits and cancels on one symbol while leaving other
//! symbols free to proceed concurrently. The matching critical section never
//! suspends; persistence I/O and fan-out delivery happen outside it on
//! spawned tasks.

use crate::engine::api::{BookView, OrderRequest, PollUpdates};
use crate::engine::book::OrderBook;
use crate::engine::error::EngineError;
use crate::engine::fanout::FanoutHub;
use crate::engine::fees::FeeSchedule;
use crate::engine::persistence::{self, PersistedState};
use crate::engine::types::{Bbo, MatchResult, Order, OrderType, Trade};
use crate::utils::{next_id, now_ts, quantize_8};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

/// Default maker rate: 1 bps rebate.
const DEFAULT_MAKER_FEE_BPS: Decimal = Decimal::from_parts(10, 0, 0, true, 1);

/// Default taker rate: 2.5 bps fee.
const DEFAULT_TAKER_FEE_BPS: Decimal = Decimal::from_parts(25, 0, 0, false, 1);

/// Engine tunables. [`EngineConfig::default`] carries production defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maker/taker fee rates applied to every fill.
    pub fee_schedule: FeeSchedule,
    /// Capacity of each symbol's recent-trade ring.
    pub recent_trades_limit: usize,
    /// Directory holding the `state.json` snapshot.
    pub persist_dir: PathBuf,
    /// Cadence of the periodic snapshot writer.
    pub save_interval: Duration,
    /// Cadence of the periodic trigger rescan.
    pub trigger_interval: Duration,
    /// Cadence of the subscriber keepalive.
    pub heartbeat_interval: Duration,
    /// Depth of broadcast market-data views.
    pub marketdata_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_schedule: FeeSchedule::new(DEFAULT_MAKER_FEE_BPS, DEFAULT_TAKER_FEE_BPS),
            recent_trades_limit: 1000,
            persist_dir: PathBuf::from("state"),
            save_interval: Duration::from_secs(5),
            trigger_interval: Duration::from_millis(500),
            heartbeat_interval: Duration::from_secs(10),
            marketdata_depth: 10,
        }
    }
}

/// Everything one symbol's lock protects: the book, the pending conditional
/// orders and the recent-trade ring.
pub(super) struct SymbolState {
    pub(super) book: OrderBook,
    pub(super) triggers: Vec<Order>,
    pub(super) recent_trades: VecDeque<Trade>,
}

/// Core matching engine managing multiple symbol order books.
pub struct MatchingEngine {
    /// Per-symbol state, created on first use.
    pub(super) symbols: DashMap<String, Arc<Mutex<SymbolState>>>,

    /// Order id → symbol for resting and pending-trigger orders. A
    /// borrowing lookup only; the book or trigger list owns the order.
    pub(super) order_symbol_index: DashMap<String, String>,

    /// Streaming consumer registry.
    pub(super) fanout: Arc<FanoutHub>,

    /// Symbols whose triggers should be rescanned after a print. Drained by
    /// the background trigger task.
    pub(super) rescan_tx: mpsc::UnboundedSender<String>,

    /// Receiver side of the rescan queue, taken when the background tasks
    /// start.
    pub(super) rescan_rx: parking_lot::Mutex<Option<mpsc::UnboundedReceiver<String>>>,

    pub(super) config: EngineConfig,
}

impl MatchingEngine {
    /// Create an engine with the given configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        let (rescan_tx, rescan_rx) = mpsc::unbounded_channel();
        Self {
            symbols: DashMap::new(),
            order_symbol_index: DashMap::new(),
            fanout: Arc::new(FanoutHub::new()),
            rescan_tx,
            rescan_rx: parking_lot::Mutex::new(Some(rescan_rx)),
            config,
        }
    }

    /// The streaming fan-out hub, for registering subscribers.
    #[must_use]
    pub fn fanout(&self) -> &Arc<FanoutHub> {
        &self.fanout
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Symbols with engine state (a book, triggers or trades).
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.symbols.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Fetch (or lazily create) the state handle for a symbol.
    pub(super) fn state_for(&self, symbol: &str) -> Arc<Mutex<SymbolState>> {
        let entry = self
            .symbols
            .entry(symbol.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(SymbolState {
                    book: OrderBook::new(symbol),
                    triggers: Vec::new(),
                    recent_trades: VecDeque::new(),
                }))
            });
        Arc::clone(entry.value())
    }

    fn validate(request: &OrderRequest) -> Result<(), EngineError> {
        if request.quantity <= Decimal::ZERO {
            return Err(EngineError::invalid("quantity must be positive"));
        }
        if matches!(request.order_type, OrderType::Limit | OrderType::StopLimit)
            && request.price.is_none()
        {
            return Err(EngineError::invalid(format!(
                "{} orders require a price",
                request.order_type
            )));
        }
        if matches!(request.order_type, OrderType::Stop | OrderType::StopLimit)
            && request.stop_price.is_none()
        {
            return Err(EngineError::invalid(format!(
                "{} orders require a stop_price",
                request.order_type
            )));
        }
        if request.order_type == OrderType::TakeProfit && request.take_profit_price.is_none() {
            return Err(EngineError::invalid(
                "take_profit orders require a take_profit_price",
            ));
        }
        Ok(())
    }

    /// Submit an order.
    ///
    /// Under the symbol lock the order is validated, converted, and
    /// dispatched on its type tag: conditional kinds pend in the trigger
    /// list, fill-or-kill is prechecked with a simulated walk, everything
    /// else matches immediately and a residual limit rests. Returns the
    /// order as of submit completion plus the trades it printed; a
    /// fill-or-kill liquidity reject is an accepted order with zero fills,
    /// not an error.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidOrder`] when a precondition fails; no state is
    /// changed.
    pub async fn submit_order(
        &self,
        request: OrderRequest,
    ) -> Result<(Order, Vec<Trade>), EngineError> {
        Self::validate(&request)?;
        let symbol = request.symbol.clone();
        let state = self.state_for(&symbol);
        let mut state = state.lock().await;

        let mut order = Order {
            order_id: next_id("ord"),
            symbol: symbol.clone(),
            side: request.side,
            order_type: request.order_type,
            quantity: request.quantity,
            remaining: request.quantity,
            price: request.price,
            stop_price: request.stop_price,
            take_profit_price: request.take_profit_price,
            timestamp: now_ts(),
            client_order_id: request.client_order_id,
            user_id: None,
        };

        // Conditional orders pend until their arming condition is met.
        if order.order_type.is_trigger() {
            self.order_symbol_index
                .insert(order.order_id.clone(), symbol.clone());
            state.triggers.push(order.clone());
            info!(
                order_id = %order.order_id,
                symbol = %symbol,
                order_type = %order.order_type,
                "order accepted, pending trigger"
            );
            return Ok((order, Vec::new()));
        }

        // Fill-or-kill: simulate the walk first; reject with zero fills when
        // the full quantity is not reachable within the price cap.
        if order.order_type == OrderType::Fok {
            let available = state.book.peek_match(order.side, order.quantity, order.price);
            if available < order.quantity {
                info!(
                    order_id = %order.order_id,
                    symbol = %symbol,
                    "fill-or-kill rejected, insufficient liquidity"
                );
                return Ok((order, Vec::new()));
            }
        }

        let result = state.book.match_order(&mut order);
        let trades = self.record_trades(&mut state, &symbol, &result, &order);

        if order.remaining > Decimal::ZERO && order.order_type == OrderType::Limit {
            self.order_symbol_index
                .insert(order.order_id.clone(), symbol.clone());
            state.book.add_limit(order.clone())?;
        }

        self.schedule_broadcasts(&state, &symbol, &trades);
        info!(
            order_id = %order.order_id,
            symbol = %symbol,
            order_type = %order.order_type,
            side = %order.side,
            filled = %order.filled(),
            remaining = %order.remaining,
            "order processed"
        );
        Ok((order, trades))
    }

    /// Cancel an order by id, wherever it currently lives.
    ///
    /// Resolution order: the order→symbol index pointing at a resting order,
    /// then that symbol's trigger list, then a scan of all trigger lists.
    /// Cancellation is idempotent only in the sense that a second cancel of
    /// the same id reports not-found and changes nothing.
    ///
    /// # Errors
    ///
    /// [`EngineError::OrderNotFound`] when the id is neither resting nor
    /// pending.
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order, EngineError> {
        let indexed_symbol = self
            .order_symbol_index
            .get(order_id)
            .map(|entry| entry.value().clone());

        if let Some(symbol) = indexed_symbol {
            let state = self.state_for(&symbol);
            let mut state = state.lock().await;
            if let Some(removed) = state.book.remove_order(order_id) {
                self.order_symbol_index.remove(order_id);
                self.schedule_marketdata(&state, &symbol);
                info!(order_id, symbol = %symbol, "order cancelled");
                return Ok(removed);
            }
            if let Some(position) = state
                .triggers
                .iter()
                .position(|order| order.order_id == order_id)
            {
                let removed = state.triggers.remove(position);
                self.order_symbol_index.remove(order_id);
                info!(order_id, symbol = %symbol, "trigger order cancelled");
                return Ok(removed);
            }
            // Stale index entry; drop it and report not-found.
            self.order_symbol_index.remove(order_id);
            return Err(EngineError::OrderNotFound(order_id.to_string()));
        }

        // No index entry: scan the trigger lists.
        let states: Vec<(String, Arc<Mutex<SymbolState>>)> = self
            .symbols
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        for (symbol, state) in states {
            let mut state = state.lock().await;
            if let Some(position) = state
                .triggers
                .iter()
                .position(|order| order.order_id == order_id)
            {
                let removed = state.triggers.remove(position);
                self.order_symbol_index.remove(order_id);
                info!(order_id, symbol = %symbol, "trigger order cancelled");
                return Ok(removed);
            }
        }
        Err(EngineError::OrderNotFound(order_id.to_string()))
    }

    /// Best bid and offer for a symbol.
    pub async fn bbo(&self, symbol: &str) -> Bbo {
        let state = self.state_for(symbol);
        let state = state.lock().await;
        state.book.bbo()
    }

    /// Depth-bounded L2 book view for a symbol.
    pub async fn book_snapshot(&self, symbol: &str, depth: usize) -> BookView {
        let state = self.state_for(symbol);
        let state = state.lock().await;
        self.book_view_locked(&state, symbol, depth)
    }

    /// Copy of the recent-trade ring, oldest first.
    pub async fn recent_trades(&self, symbol: &str) -> Vec<Trade> {
        let state = self.state_for(symbol);
        let state = state.lock().await;
        state.recent_trades.iter().cloned().collect()
    }

    /// Trades printed strictly after `since`, plus the latest trade id.
    ///
    /// When `since` is absent or no longer in the ring, the whole ring is
    /// returned.
    pub async fn trades_since(
        &self,
        symbol: &str,
        since: Option<&str>,
    ) -> (Vec<Trade>, Option<String>) {
        let trades = self.recent_trades(symbol).await;
        filter_trades_since(trades, since)
    }

    /// One-shot polling view: book snapshot plus trades after the cursor,
    /// observed under a single acquisition of the symbol lock.
    pub async fn poll_updates(
        &self,
        symbol: &str,
        depth: usize,
        since: Option<&str>,
    ) -> PollUpdates {
        let state = self.state_for(symbol);
        let state = state.lock().await;
        let orderbook = self.book_view_locked(&state, symbol, depth);
        let trades: Vec<Trade> = state.recent_trades.iter().cloned().collect();
        let (trades, latest_trade_id) = filter_trades_since(trades, since);
        PollUpdates {
            orderbook,
            trades,
            latest_trade_id,
        }
    }

    /// Record trades for a batch of raw fills: compute fees once, mint
    /// trade ids and timestamps, stamp the aggressor side, and push onto the
    /// bounded recent-trade ring (oldest dropped on overflow). Also drops
    /// index entries for makers the match fully consumed.
    pub(super) fn record_trades(
        &self,
        state: &mut SymbolState,
        symbol: &str,
        result: &MatchResult,
        taker: &Order,
    ) -> Vec<Trade> {
        let mut trades = Vec::with_capacity(result.fills.len());
        for fill in &result.fills {
            let (maker_fee, taker_fee) = self
                .config
                .fee_schedule
                .fees_for(fill.price, fill.quantity);
            let trade = Trade {
                trade_id: next_id("tr"),
                symbol: symbol.to_string(),
                price: quantize_8(fill.price),
                quantity: quantize_8(fill.quantity),
                aggressor_side: taker.side,
                maker_order_id: fill.maker_order_id.clone(),
                taker_order_id: taker.order_id.clone(),
                timestamp: now_ts(),
                maker_fee,
                taker_fee,
            };
            if state.recent_trades.len() >= self.config.recent_trades_limit {
                state.recent_trades.pop_front();
            }
            state.recent_trades.push_back(trade.clone());
            trades.push(trade);
        }
        for order_id in &result.filled_order_ids {
            self.order_symbol_index.remove(order_id);
        }
        trades
    }

    /// Schedule the post-submit broadcasts: a market-data frame always and,
    /// when trades printed, a trades frame plus a trigger rescan. Delivery
    /// runs on spawned tasks after the critical section ends.
    pub(super) fn schedule_broadcasts(
        &self,
        state: &SymbolState,
        symbol: &str,
        trades: &[Trade],
    ) {
        self.schedule_marketdata(state, symbol);
        if !trades.is_empty() {
            let fanout = Arc::clone(&self.fanout);
            let symbol_owned = symbol.to_string();
            let batch = trades.to_vec();
            tokio::spawn(async move {
                fanout.broadcast_trades(&symbol_owned, &batch);
            });
            // Prints may arm pending stops; the background task rescans.
            let _ = self.rescan_tx.send(symbol.to_string());
        }
    }

    /// Schedule a market-data broadcast carrying the current book view.
    pub(super) fn schedule_marketdata(&self, state: &SymbolState, symbol: &str) {
        let view = self.book_view_locked(state, symbol, self.config.marketdata_depth);
        let fanout = Arc::clone(&self.fanout);
        tokio::spawn(async move {
            fanout.broadcast_marketdata(&view);
        });
    }

    pub(super) fn book_view_locked(
        &self,
        state: &SymbolState,
        symbol: &str,
        depth: usize,
    ) -> BookView {
        let depth_view = state.book.snapshot_l2(depth);
        BookView {
            symbol: symbol.to_string(),
            bids: depth_view.bids,
            asks: depth_view.asks,
            timestamp: now_ts(),
        }
    }

    /// Rebuild engine state from the committed snapshot.
    ///
    /// Only limit orders with remaining quantity and a price are re-seated
    /// on their book; conditional orders re-enter their symbol's trigger
    /// list; anything else is dropped. The trade ring is rehydrated up to
    /// its cap. A missing snapshot starts empty; a corrupt one is logged
    /// and likewise treated as empty initial state.
    ///
    /// # Errors
    ///
    /// [`EngineError::Persistence`] when the snapshot exists but cannot be
    /// read at the I/O level.
    pub async fn load_state(&self) -> Result<(), EngineError> {
        let data = match persistence::load_state(&self.config.persist_dir).await {
            Ok(data) => data,
            Err(EngineError::Serialization { message }) => {
                warn!(error = %message, "corrupt state snapshot, starting empty");
                PersistedState::default()
            }
            Err(error) => return Err(error),
        };

        for (symbol, orders) in data.open_orders {
            let state = self.state_for(&symbol);
            let mut state = state.lock().await;
            for order in orders {
                if order.order_type == OrderType::Limit
                    && order.remaining > Decimal::ZERO
                    && order.price.is_some()
                {
                    self.order_symbol_index
                        .insert(order.order_id.clone(), symbol.clone());
                    state.book.add_limit(order)?;
                } else if order.order_type.is_trigger() {
                    self.order_symbol_index
                        .insert(order.order_id.clone(), symbol.clone());
                    state.triggers.push(order);
                }
            }
        }

        for (symbol, trades) in data.recent_trades {
            let state = self.state_for(&symbol);
            let mut state = state.lock().await;
            for trade in trades {
                if state.recent_trades.len() >= self.config.recent_trades_limit {
                    state.recent_trades.pop_front();
                }
                state.recent_trades.push_back(trade);
            }
        }
        Ok(())
    }

    /// Write the current snapshot: every resting order and pending trigger
    /// per symbol, plus the trade rings. Symbols are visited one lock at a
    /// time; the file write is atomic.
    ///
    /// # Errors
    ///
    /// [`EngineError::Persistence`] or [`EngineError::Serialization`] when
    /// the snapshot cannot be written.
    pub async fn save_state(&self) -> Result<(), EngineError> {
        let mut snapshot = PersistedState::default();
        let states: Vec<(String, Arc<Mutex<SymbolState>>)> = self
            .symbols
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        for (symbol, state) in states {
            let state = state.lock().await;
            let mut orders: Vec<Order> = state.book.iter_orders().cloned().collect();
            orders.extend(state.triggers.iter().cloned());
            snapshot.open_orders.insert(symbol.clone(), orders);
            snapshot
                .recent_trades
                .insert(symbol, state.recent_trades.iter().cloned().collect());
        }
        persistence::save_state(&self.config.persist_dir, &snapshot).await
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Keep the trades strictly after `since`; fall back to the full list when
/// the cursor is absent or unknown. Also returns the newest trade id.
fn filter_trades_since(
    trades: Vec<Trade>,
    since: Option<&str>,
) -> (Vec<Trade>, Option<String>) {
    let latest = trades.last().map(|trade| trade.trade_id.clone());
    let Some(since) = since else {
        return (trades, latest);
    };
    match trades.iter().position(|trade| trade.trade_id == since) {
        Some(position) => (trades[position + 1..].to_vec(), latest),
        None => (trades, latest),
    }
}
