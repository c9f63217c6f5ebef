//! Order lifecycle management
//!
//! Orders move NEW -> PLACED -> {EXECUTED | CANCELLED} and never leave a
//! terminal state. Transitions happen under the order's map entry guard, so
//! a cancellation and a fill racing on the same order resolve to exactly one
//! winner; the loser observes a terminal status.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::VenueError;
use crate::market::{OrderStyle, Side, Symbol};

/// Order status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Placed,
    Executed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Executed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::New => write!(f, "NEW"),
            OrderStatus::Placed => write!(f, "PLACED"),
            OrderStatus::Executed => write!(f, "EXECUTED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Order record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub style: OrderStyle,
    pub quantity: u64,
    /// Present iff style is LIMIT; enforced at validation
    pub limit_price: Option<f64>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub executed_price: Option<f64>,
    pub executed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn market(symbol: Symbol, side: Side, quantity: u64) -> Self {
        Self::new(symbol, side, OrderStyle::Market, quantity, None)
    }

    pub fn limit(symbol: Symbol, side: Side, quantity: u64, limit_price: f64) -> Self {
        Self::new(symbol, side, OrderStyle::Limit, quantity, Some(limit_price))
    }

    fn new(
        symbol: Symbol,
        side: Side,
        style: OrderStyle,
        quantity: u64,
        limit_price: Option<f64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: format!("ORD_{}_{}", now.timestamp_millis(), nanoid::nanoid!(8)),
            symbol,
            side,
            style,
            quantity,
            limit_price,
            status: OrderStatus::New,
            created_at: now,
            executed_price: None,
            executed_at: None,
        }
    }

    /// Limit trigger: BUY fills once the market trades at or below the
    /// limit, SELL at or above. Market orders always trigger.
    pub fn should_trigger(&self, current_price: f64) -> bool {
        match self.style {
            OrderStyle::Market => true,
            OrderStyle::Limit => match (self.side, self.limit_price) {
                (Side::Buy, Some(limit)) => current_price <= limit,
                (Side::Sell, Some(limit)) => current_price >= limit,
                (_, None) => false,
            },
        }
    }
}

/// Owns every order the venue has seen. Orders are retained after they reach
/// a terminal state for status queries and history.
pub struct OrderManager {
    orders: DashMap<String, Order>,
}

impl OrderManager {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }

    /// Make a freshly created order live: NEW -> PLACED, visible to callers.
    pub fn place(&self, mut order: Order) -> Order {
        order.status = OrderStatus::Placed;
        self.orders.insert(order.id.clone(), order.clone());
        order
    }

    pub fn get(&self, order_id: &str) -> Result<Order, VenueError> {
        self.orders
            .get(order_id)
            .map(|order| order.clone())
            .ok_or_else(|| VenueError::OrderNotFound(order_id.to_string()))
    }

    /// PLACED -> CANCELLED under the entry guard; terminal orders are refused.
    pub fn cancel(&self, order_id: &str) -> Result<Order, VenueError> {
        let mut entry = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| VenueError::OrderNotFound(order_id.to_string()))?;

        if entry.status != OrderStatus::Placed {
            return Err(VenueError::InvalidState {
                order_id: order_id.to_string(),
                status: entry.status,
            });
        }

        entry.status = OrderStatus::Cancelled;
        Ok(entry.clone())
    }

    /// PLACED -> EXECUTED under the entry guard. Only the fill routine calls
    /// this; a lost race against a cancel surfaces as `InvalidState`.
    pub(crate) fn mark_executed(
        &self,
        order_id: &str,
        price: f64,
        at: DateTime<Utc>,
    ) -> Result<Order, VenueError> {
        let mut entry = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| VenueError::OrderNotFound(order_id.to_string()))?;

        if entry.status != OrderStatus::Placed {
            return Err(VenueError::InvalidState {
                order_id: order_id.to_string(),
                status: entry.status,
            });
        }

        entry.status = OrderStatus::Executed;
        entry.executed_price = Some(price);
        entry.executed_at = Some(at);
        Ok(entry.clone())
    }

    pub fn open_order_count(&self) -> usize {
        self.orders
            .iter()
            .filter(|entry| entry.status == OrderStatus::Placed)
            .count()
    }
}

impl Default for OrderManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_triggers() {
        let buy = Order::limit(Symbol::new("AAPL"), Side::Buy, 10, 100.0);
        assert!(buy.should_trigger(99.0));
        assert!(buy.should_trigger(100.0));
        assert!(!buy.should_trigger(101.0));

        let sell = Order::limit(Symbol::new("AAPL"), Side::Sell, 10, 100.0);
        assert!(!sell.should_trigger(99.0));
        assert!(sell.should_trigger(100.0));
        assert!(sell.should_trigger(101.0));

        let market = Order::market(Symbol::new("AAPL"), Side::Buy, 10);
        assert!(market.should_trigger(1.0));
    }

    #[test]
    fn cancel_is_refused_on_terminal_orders() {
        let manager = OrderManager::new();
        let order = manager.place(Order::market(Symbol::new("AAPL"), Side::Buy, 5));

        manager
            .mark_executed(&order.id, 100.0, Utc::now())
            .unwrap();

        let err = manager.cancel(&order.id).unwrap_err();
        assert!(matches!(
            err,
            VenueError::InvalidState {
                status: OrderStatus::Executed,
                ..
            }
        ));
    }

    #[test]
    fn cancel_beats_execution_exactly_once() {
        let manager = OrderManager::new();
        let order = manager.place(Order::limit(Symbol::new("AAPL"), Side::Buy, 5, 90.0));

        let cancelled = manager.cancel(&order.id).unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        // The fill path now loses the race
        let err = manager
            .mark_executed(&order.id, 89.0, Utc::now())
            .unwrap_err();
        assert!(matches!(err, VenueError::InvalidState { .. }));
    }

    #[test]
    fn unknown_order_is_not_found() {
        let manager = OrderManager::new();
        assert!(matches!(
            manager.get("ORD_missing"),
            Err(VenueError::OrderNotFound(_))
        ));
        assert!(matches!(
            manager.cancel("ORD_missing"),
            Err(VenueError::OrderNotFound(_))
        ));
    }
}
