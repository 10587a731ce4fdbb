/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/3/25
******************************************************************************/

//! Streaming fan-out for market-data and trade consumers.
//!
//! Two independent channels (market data and trades), each serving two
//! consumer kinds:
//!
//! - **push** — a socket-like sink implementing [`PushConsumer`]; delivery
//!   errors evict the consumer.
//! - **pull** — a bounded per-consumer queue handed out at subscription
//!   time; a full or closed queue evicts the consumer.
//!
//! Back-pressure is intentionally lossy by eviction: a slow consumer is
//! dropped, the message is never withheld from the others, and there is no
//! buffering tier. Registration state lives behind a single leaf-level
//! mutex that is never held while frames are delivered.

use crate::engine::api::BookView;
use crate::engine::types::Trade;
use crate::utils::now_ts;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Capacity of each pull subscriber's frame queue.
pub const STREAM_QUEUE_CAPACITY: usize = 256;

/// Identifier handed out at registration time; pass it back to unregister.
pub type SubscriberId = Uuid;

/// Marker error returned by a push consumer whose transport is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberGone;

/// A push-style (socket-like) frame consumer.
///
/// Implementations must not block: a consumer bridging to an async
/// transport should hand the frame to its writer task and report
/// [`SubscriberGone`] once that task is unreachable.
pub trait PushConsumer: Send + Sync {
    /// Deliver one JSON frame. Returning an error evicts this consumer.
    fn deliver(&self, frame: &str) -> Result<(), SubscriberGone>;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Channel {
    MarketData,
    Trades,
}

#[derive(Default)]
struct Registry {
    marketdata_push: Vec<(SubscriberId, Arc<dyn PushConsumer>)>,
    trades_push: Vec<(SubscriberId, Arc<dyn PushConsumer>)>,
    marketdata_queues: Vec<(SubscriberId, mpsc::Sender<String>)>,
    trades_queues: Vec<(SubscriberId, mpsc::Sender<String>)>,
}

#[derive(Serialize)]
struct TradesFrame<'a> {
    symbol: &'a str,
    trades: &'a [Trade],
}

#[derive(Serialize)]
struct HeartbeatFrame<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    ts: String,
}

/// Registry of streaming consumers and the broadcast entry points.
///
/// Within one channel and one symbol, frames preserve the order in which
/// the engine scheduled the broadcasts; across channels there is no
/// ordering guarantee.
pub struct FanoutHub {
    registry: Mutex<Registry>,
}

impl FanoutHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Register a push consumer on the market-data channel.
    pub fn register_marketdata_push(&self, consumer: Arc<dyn PushConsumer>) -> SubscriberId {
        let id = Uuid::new_v4();
        self.registry.lock().marketdata_push.push((id, consumer));
        id
    }

    /// Register a push consumer on the trades channel.
    pub fn register_trades_push(&self, consumer: Arc<dyn PushConsumer>) -> SubscriberId {
        let id = Uuid::new_v4();
        self.registry.lock().trades_push.push((id, consumer));
        id
    }

    /// Remove a market-data push consumer. Unknown ids are ignored.
    pub fn unregister_marketdata_push(&self, id: SubscriberId) {
        self.registry
            .lock()
            .marketdata_push
            .retain(|(existing, _)| *existing != id);
    }

    /// Remove a trades push consumer. Unknown ids are ignored.
    pub fn unregister_trades_push(&self, id: SubscriberId) {
        self.registry
            .lock()
            .trades_push
            .retain(|(existing, _)| *existing != id);
    }

    /// Open a bounded pull subscription on the market-data channel.
    ///
    /// The receiver yields one JSON frame per broadcast. Falling more than
    /// [`STREAM_QUEUE_CAPACITY`] frames behind evicts the subscription.
    pub fn subscribe_marketdata(&self) -> (SubscriberId, mpsc::Receiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(STREAM_QUEUE_CAPACITY);
        self.registry.lock().marketdata_queues.push((id, tx));
        (id, rx)
    }

    /// Open a bounded pull subscription on the trades channel.
    pub fn subscribe_trades(&self) -> (SubscriberId, mpsc::Receiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(STREAM_QUEUE_CAPACITY);
        self.registry.lock().trades_queues.push((id, tx));
        (id, rx)
    }

    /// Close a market-data pull subscription. Unknown ids are ignored.
    pub fn unsubscribe_marketdata(&self, id: SubscriberId) {
        self.registry
            .lock()
            .marketdata_queues
            .retain(|(existing, _)| *existing != id);
    }

    /// Close a trades pull subscription. Unknown ids are ignored.
    pub fn unsubscribe_trades(&self, id: SubscriberId) {
        self.registry
            .lock()
            .trades_queues
            .retain(|(existing, _)| *existing != id);
    }

    /// Number of consumers (push and pull) on the market-data channel.
    #[must_use]
    pub fn marketdata_subscriber_count(&self) -> usize {
        let registry = self.registry.lock();
        registry.marketdata_push.len() + registry.marketdata_queues.len()
    }

    /// Number of consumers (push and pull) on the trades channel.
    #[must_use]
    pub fn trades_subscriber_count(&self) -> usize {
        let registry = self.registry.lock();
        registry.trades_push.len() + registry.trades_queues.len()
    }

    /// Broadcast a depth-bounded book view on the market-data channel.
    pub fn broadcast_marketdata(&self, view: &BookView) {
        match serde_json::to_string(view) {
            Ok(frame) => self.fanout(Channel::MarketData, &frame),
            Err(error) => warn!(%error, "failed to encode market data frame"),
        }
    }

    /// Broadcast a batch of trade prints on the trades channel.
    ///
    /// Empty batches are dropped without touching any consumer.
    pub fn broadcast_trades(&self, symbol: &str, trades: &[Trade]) {
        if trades.is_empty() {
            return;
        }
        let frame = TradesFrame { symbol, trades };
        match serde_json::to_string(&frame) {
            Ok(frame) => self.fanout(Channel::Trades, &frame),
            Err(error) => warn!(%error, "failed to encode trades frame"),
        }
    }

    /// Send a keepalive frame to every consumer on both channels.
    pub fn broadcast_heartbeat(&self) {
        let frame = HeartbeatFrame {
            kind: "heartbeat",
            ts: now_ts(),
        };
        match serde_json::to_string(&frame) {
            Ok(frame) => {
                self.fanout(Channel::MarketData, &frame);
                self.fanout(Channel::Trades, &frame);
            }
            Err(error) => warn!(%error, "failed to encode heartbeat frame"),
        }
    }

    /// Deliver one frame to every consumer of a channel, evicting the ones
    /// that fail.
    ///
    /// The registry lock is held only to snapshot the consumer lists and,
    /// afterwards, to drop the dead entries; delivery happens outside it.
    fn fanout(&self, channel: Channel, frame: &str) {
        let (push, queues) = {
            let registry = self.registry.lock();
            match channel {
                Channel::MarketData => (
                    registry.marketdata_push.clone(),
                    registry.marketdata_queues.clone(),
                ),
                Channel::Trades => {
                    (registry.trades_push.clone(), registry.trades_queues.clone())
                }
            }
        };

        let mut dead: Vec<SubscriberId> = Vec::new();
        for (id, consumer) in &push {
            if consumer.deliver(frame).is_err() {
                dead.push(*id);
            }
        }
        for (id, queue) in &queues {
            if queue.try_send(frame.to_string()).is_err() {
                dead.push(*id);
            }
        }

        if !dead.is_empty() {
            debug!(channel = ?channel, evicted = dead.len(), "evicting slow or broken subscribers");
            let mut registry_guard = self.registry.lock();
            let registry = &mut *registry_guard;
            let (push, queues) = match channel {
                Channel::MarketData => (
                    &mut registry.marketdata_push,
                    &mut registry.marketdata_queues,
                ),
                Channel::Trades => (&mut registry.trades_push, &mut registry.trades_queues),
            };
            push.retain(|(id, _)| !dead.contains(id));
            queues.retain(|(id, _)| !dead.contains(id));
        }
    }
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new()
    }
}
