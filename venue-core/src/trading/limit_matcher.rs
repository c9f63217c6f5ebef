//! Pending limit order evaluation
//!
//! Runs once per price tick, after the price engine has advanced. Pending
//! ids are kept in an explicit creation-ordered list, so simultaneously
//! triggered orders always execute FIFO and a given price path produces the
//! same outcome on every run.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use super::execution::FillEngine;
use super::order_manager::{OrderManager, OrderStatus};
use crate::errors::VenueError;
use crate::market::PriceEngine;

/// Scans pending limit orders against the moving price
pub struct LimitMatcher {
    prices: Arc<PriceEngine>,
    orders: Arc<OrderManager>,
    /// Pending order ids, FIFO by creation time
    pending: Mutex<Vec<String>>,
}

impl LimitMatcher {
    pub fn new(prices: Arc<PriceEngine>, orders: Arc<OrderManager>) -> Self {
        Self {
            prices,
            orders,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Register a PLACED limit order for evaluation on future ticks.
    pub(crate) fn register(&self, order_id: String) {
        self.pending.lock().push(order_id);
    }

    /// Drop an order from the pending set, e.g. after cancellation.
    pub(crate) fn remove(&self, order_id: &str) {
        self.pending.lock().retain(|id| id != order_id);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// One evaluation pass over the pending set.
    ///
    /// Triggered orders fill at the current price, not the limit price. A
    /// SELL that still exceeds holdings stays pending and is retried next
    /// tick; there is no caller to surface that to, so it is logged only.
    pub fn on_tick(&self, fills: &FillEngine) {
        // Snapshot the FIFO; fills run outside the pending lock
        let candidates = self.pending.lock().clone();

        for order_id in candidates {
            let order = match self.orders.get(&order_id) {
                Ok(order) => order,
                Err(_) => {
                    self.remove(&order_id);
                    continue;
                }
            };
            if order.status != OrderStatus::Placed {
                self.remove(&order_id);
                continue;
            }

            let price = match self.prices.price(&order.symbol) {
                Some(price) => price,
                None => continue,
            };
            if !order.should_trigger(price) {
                continue;
            }

            match fills.execute(&order_id, price) {
                Ok(_) => {
                    self.remove(&order_id);
                }
                Err(VenueError::InsufficientPosition {
                    symbol,
                    requested,
                    held,
                }) => {
                    warn!(
                        %order_id,
                        %symbol,
                        requested,
                        held,
                        "limit sell deferred: insufficient position"
                    );
                }
                Err(VenueError::InvalidState { .. }) => {
                    // Lost the race to a cancel between the status check and
                    // the fill
                    debug!(%order_id, "pending order no longer live, dropping");
                    self.remove(&order_id);
                }
                Err(err) => {
                    warn!(%order_id, %err, "limit order fill failed");
                }
            }
        }
    }
}
