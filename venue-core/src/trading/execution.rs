//! The shared fill routine
//!
//! Every execution in the venue, market or matched limit, passes through
//! `FillEngine::execute`. The order transition, the position mutation and
//! the trade append happen as one unit while the symbol's position guard is
//! held, so fills against one symbol cannot interleave and a concurrent
//! cancel of the same order resolves to a single winner.
//!
//! Lock order is fixed: position entry first, then order entry. The cancel
//! path takes only the order entry, so the two paths cannot deadlock.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::order_manager::{OrderManager, OrderStatus};
use super::portfolio::PortfolioLedger;
use super::trade_log::{Trade, TradeLog};
use crate::errors::VenueError;
use crate::market::Side;

/// Executes orders against a price
pub struct FillEngine {
    orders: Arc<OrderManager>,
    portfolio: Arc<PortfolioLedger>,
    trade_log: Arc<TradeLog>,
}

impl FillEngine {
    pub fn new(
        orders: Arc<OrderManager>,
        portfolio: Arc<PortfolioLedger>,
        trade_log: Arc<TradeLog>,
    ) -> Self {
        Self {
            orders,
            portfolio,
            trade_log,
        }
    }

    /// Fill one order at the given price.
    ///
    /// A SELL that exceeds the live held quantity aborts before any mutation
    /// and the order stays PLACED; the caller decides whether that is an
    /// error (market order) or a deferral (limit order).
    pub fn execute(&self, order_id: &str, price: f64) -> Result<Trade, VenueError> {
        let exec_price = round_cents(price);
        let symbol = self.orders.get(order_id)?.symbol;

        self.portfolio.with_position_mut(&symbol, |position| {
            let order = self.orders.get(order_id)?;
            if order.status != OrderStatus::Placed {
                return Err(VenueError::InvalidState {
                    order_id: order.id,
                    status: order.status,
                });
            }
            if order.side == Side::Sell && position.quantity < order.quantity {
                return Err(VenueError::InsufficientPosition {
                    symbol: symbol.clone(),
                    requested: order.quantity,
                    held: position.quantity,
                });
            }

            let now = Utc::now();
            let order = self.orders.mark_executed(order_id, exec_price, now)?;

            let realized_pnl = match order.side {
                Side::Buy => {
                    position.apply_buy(order.quantity, exec_price);
                    0.0
                }
                Side::Sell => position.apply_sell(order.quantity, exec_price),
            };

            let trade = Trade {
                id: Uuid::new_v4(),
                order_id: order.id.clone(),
                symbol: order.symbol.clone(),
                side: order.side,
                quantity: order.quantity,
                price: exec_price,
                realized_pnl,
                executed_at: now,
            };
            self.trade_log.append(trade.clone());

            info!(
                order_id = %order.id,
                symbol = %order.symbol,
                side = %order.side,
                quantity = order.quantity,
                price = exec_price,
                "order executed"
            );
            Ok(trade)
        })
    }
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Symbol;
    use crate::trading::order_manager::Order;

    fn fill_engine() -> (FillEngine, Arc<OrderManager>, Arc<PortfolioLedger>, Arc<TradeLog>) {
        let orders = Arc::new(OrderManager::new());
        let portfolio = Arc::new(PortfolioLedger::new());
        let trade_log = Arc::new(TradeLog::new());
        let fills = FillEngine::new(orders.clone(), portfolio.clone(), trade_log.clone());
        (fills, orders, portfolio, trade_log)
    }

    #[test]
    fn buy_fill_updates_order_position_and_log() {
        let (fills, orders, portfolio, trade_log) = fill_engine();
        let symbol = Symbol::new("AAPL");
        let order = orders.place(Order::market(symbol.clone(), Side::Buy, 10));

        let trade = fills.execute(&order.id, 100.0).unwrap();
        assert_eq!(trade.quantity, 10);
        assert_eq!(trade.realized_pnl, 0.0);

        let order = orders.get(&order.id).unwrap();
        assert_eq!(order.status, OrderStatus::Executed);
        assert_eq!(order.executed_price, Some(100.0));
        assert!(order.executed_at.is_some());

        let position = portfolio.get(&symbol).unwrap();
        assert_eq!(position.quantity, 10);
        assert!((position.avg_cost - 100.0).abs() < 1e-9);
        assert_eq!(trade_log.len(), 1);
    }

    #[test]
    fn oversized_sell_aborts_without_mutation() {
        let (fills, orders, portfolio, trade_log) = fill_engine();
        let symbol = Symbol::new("AAPL");
        let order = orders.place(Order::market(symbol.clone(), Side::Sell, 5));

        let err = fills.execute(&order.id, 100.0).unwrap_err();
        assert!(matches!(
            err,
            VenueError::InsufficientPosition {
                requested: 5,
                held: 0,
                ..
            }
        ));

        // Order stays PLACED, nothing was booked
        assert_eq!(orders.get(&order.id).unwrap().status, OrderStatus::Placed);
        assert_eq!(portfolio.get(&symbol).unwrap().quantity, 0);
        assert!(trade_log.is_empty());
    }

    #[test]
    fn fill_refuses_non_placed_orders() {
        let (fills, orders, _, trade_log) = fill_engine();
        let order = orders.place(Order::market(Symbol::new("AAPL"), Side::Buy, 1));
        orders.cancel(&order.id).unwrap();

        let err = fills.execute(&order.id, 100.0).unwrap_err();
        assert!(matches!(err, VenueError::InvalidState { .. }));
        assert!(trade_log.is_empty());
    }

    #[test]
    fn sell_fill_books_realized_pnl() {
        let (fills, orders, portfolio, trade_log) = fill_engine();
        let symbol = Symbol::new("AAPL");

        let buy = orders.place(Order::market(symbol.clone(), Side::Buy, 10));
        fills.execute(&buy.id, 100.0).unwrap();

        let sell = orders.place(Order::market(symbol.clone(), Side::Sell, 10));
        let trade = fills.execute(&sell.id, 106.0).unwrap();

        assert!((trade.realized_pnl - 60.0).abs() < 1e-9);
        assert_eq!(portfolio.get(&symbol).unwrap().quantity, 0);
        assert!((trade_log.total_realized_pnl() - 60.0).abs() < 1e-9);
    }
}
