/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/3/25
******************************************************************************/

//! Prelude module that re-exports commonly used types and traits.
//!
//! This module provides a convenient way to import the most commonly used
//! types, traits, and functions from the matchbook-rs crate. Instead of
//! importing each type individually, you can use:
//!
//! ```rust
//! use matchbook_rs::prelude::*;
//! ```

// Engine and configuration
pub use crate::engine::{EngineConfig, EngineError, EngineTasks, MatchingEngine};

// Order book types
pub use crate::engine::{Bbo, BookDepth, Level, OrderBook, PriceLevel};

// Domain types and enums
pub use crate::engine::{Fill, MatchResult, Order, OrderType, Side, Trade};

// Fee schedule
pub use crate::engine::FeeSchedule;

// Request/response contracts
pub use crate::engine::{
    BookView, CancelResponse, OrderRequest, OrderResponse, PollUpdates, RecentTradesView,
};

// Streaming fan-out
pub use crate::engine::{
    FanoutHub, PushConsumer, STREAM_QUEUE_CAPACITY, SubscriberGone, SubscriberId,
};

// Persistence types
pub use crate::engine::PersistedState;

// Utility functions
pub use crate::utils::{next_id, now_ts, quantize_8};
