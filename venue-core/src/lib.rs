//! Single-user simulated trading venue
//!
//! Generates synthetic instrument prices with a per-tick geometric Brownian
//! motion step, accepts market and limit orders against them, and tracks the
//! resulting positions and profit/loss. A periodic driver advances every
//! price and re-evaluates pending limit orders; request handlers place,
//! cancel and query orders concurrently. All executions converge on one fill
//! routine so order state, positions and the trade log stay consistent.

pub mod config;
pub mod errors;
pub mod market;
pub mod trading;

// Re-export main types for easy access
pub use config::{InstrumentConfig, VenueConfig};
pub use errors::{ErrorKind, VenueError};
pub use market::{OrderStyle, PriceEngine, PriceSnapshot, Side, Symbol};
pub use trading::{
    Order, OrderRequest, OrderStatus, PositionSnapshot, Trade, VenueEngine, VenueStats,
};
