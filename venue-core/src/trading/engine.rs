//! Venue engine
//!
//! Wires the price engine, order manager, fill routine, limit matcher,
//! portfolio ledger and trade log together, exposes the request surface and
//! drives the periodic tick.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::execution::FillEngine;
use super::limit_matcher::LimitMatcher;
use super::order_manager::{Order, OrderManager};
use super::portfolio::{PortfolioLedger, PositionSnapshot};
use super::trade_log::{Trade, TradeLog};
use crate::config::VenueConfig;
use crate::errors::VenueError;
use crate::market::{OrderStyle, PriceEngine, PriceSnapshot, Side, Symbol};

/// Order placement request as it arrives from the boundary
#[derive(Clone, Debug, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub quantity: u64,
    pub side: Side,
    pub style: OrderStyle,
    /// Required for LIMIT orders, ignored for MARKET
    pub limit_price: Option<f64>,
}

/// Aggregate venue statistics
#[derive(Clone, Debug, Default, Serialize)]
pub struct VenueStats {
    pub total_realized_pnl: f64,
    pub trade_count: usize,
    pub open_orders: usize,
}

/// The venue core: single-user order execution against simulated prices
pub struct VenueEngine {
    config: VenueConfig,
    prices: Arc<PriceEngine>,
    orders: Arc<OrderManager>,
    portfolio: Arc<PortfolioLedger>,
    trade_log: Arc<TradeLog>,
    fills: Arc<FillEngine>,
    matcher: Arc<LimitMatcher>,
    running: Arc<tokio::sync::RwLock<bool>>,
}

impl VenueEngine {
    pub fn new(config: VenueConfig) -> Result<Self, VenueError> {
        let prices = Arc::new(PriceEngine::new(&config.instruments, config.drift)?);
        let orders = Arc::new(OrderManager::new());
        let portfolio = Arc::new(PortfolioLedger::new());
        let trade_log = Arc::new(TradeLog::new());
        let fills = Arc::new(FillEngine::new(
            orders.clone(),
            portfolio.clone(),
            trade_log.clone(),
        ));
        let matcher = Arc::new(LimitMatcher::new(prices.clone(), orders.clone()));

        Ok(Self {
            config,
            prices,
            orders,
            portfolio,
            trade_log,
            fills,
            matcher,
            running: Arc::new(tokio::sync::RwLock::new(false)),
        })
    }

    /// Start the periodic driver: advance prices, then evaluate pending
    /// limit orders. Both run sequentially in one task, so tick N+1 never
    /// overlaps tick N's effects.
    pub async fn start(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                return;
            }
            *running = true;
        }

        let prices = self.prices.clone();
        let matcher = self.matcher.clone();
        let fills = self.fills.clone();
        let running = self.running.clone();
        let tick_interval = self.config.tick_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            // The first interval tick completes immediately; skip it so the
            // opening prices survive for a full interval
            interval.tick().await;

            loop {
                interval.tick().await;
                if !*running.read().await {
                    break;
                }
                prices.tick();
                matcher.on_tick(&fills);
            }
        });

        info!(interval = ?self.config.tick_interval, "tick driver started");
    }

    /// Stop the periodic driver after its current pass.
    pub async fn stop(&self) {
        *self.running.write().await = false;
    }

    /// Advance one tick synchronously: the driver's body, callable directly
    /// when the cadence is driven externally.
    pub fn tick_once(&self) {
        self.prices.tick();
        self.matcher.on_tick(&self.fills);
    }

    /// Place an order.
    ///
    /// Market orders execute immediately at the current price and come back
    /// EXECUTED. Limit orders come back PLACED and are evaluated against
    /// each future tick. A market SELL beyond current holdings fails with
    /// `InsufficientPosition` and the order stays PLACED.
    pub fn place_order(&self, request: OrderRequest) -> Result<Order, VenueError> {
        let order = self.validate(request)?;
        let order = self.orders.place(order);
        info!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            style = %order.style,
            quantity = order.quantity,
            "order placed"
        );

        match order.style {
            OrderStyle::Market => {
                let price = self
                    .prices
                    .price(&order.symbol)
                    .ok_or_else(|| VenueError::UnknownSymbol(order.symbol.clone()))?;
                match self.fills.execute(&order.id, price) {
                    Ok(_) => self.orders.get(&order.id),
                    // A cancel slipped in between placement and fill; hand
                    // back the terminal order
                    Err(VenueError::InvalidState { .. }) => self.orders.get(&order.id),
                    Err(err) => Err(err),
                }
            }
            OrderStyle::Limit => {
                self.matcher.register(order.id.clone());
                Ok(order)
            }
        }
    }

    fn validate(&self, request: OrderRequest) -> Result<Order, VenueError> {
        if request.quantity == 0 {
            return Err(VenueError::Validation(
                "quantity must be positive".to_string(),
            ));
        }

        let symbol = Symbol::new(request.symbol.trim().to_uppercase());
        if !self.prices.contains(&symbol) {
            return Err(VenueError::UnknownSymbol(symbol));
        }

        match request.style {
            OrderStyle::Market => Ok(Order::market(symbol, request.side, request.quantity)),
            OrderStyle::Limit => match request.limit_price {
                Some(limit) if limit > 0.0 => {
                    Ok(Order::limit(symbol, request.side, request.quantity, limit))
                }
                Some(_) => Err(VenueError::Validation(
                    "limit price must be positive".to_string(),
                )),
                None => Err(VenueError::Validation(
                    "limit price is required for LIMIT orders".to_string(),
                )),
            },
        }
    }

    pub fn get_order(&self, order_id: &str) -> Result<Order, VenueError> {
        self.orders.get(order_id)
    }

    /// Cancel a PLACED order. Cancellation and execution are mutually
    /// exclusive: whichever transitions the order first wins.
    pub fn cancel_order(&self, order_id: &str) -> Result<Order, VenueError> {
        let order = self.orders.cancel(order_id)?;
        self.matcher.remove(order_id);
        info!(order_id = %order.id, "order cancelled");
        Ok(order)
    }

    /// Price snapshots for every instrument, in catalog order.
    pub fn instruments(&self) -> Vec<PriceSnapshot> {
        self.prices.snapshot_all()
    }

    /// Non-empty positions marked to the live price. Unrealized P&L is
    /// derived on every read, never stored.
    pub fn portfolio(&self) -> Vec<PositionSnapshot> {
        self.portfolio
            .positions()
            .into_iter()
            .filter(|position| position.quantity > 0)
            .filter_map(|position| {
                let price = self.prices.price(&position.symbol)?;
                Some(PositionSnapshot {
                    symbol: position.symbol.clone(),
                    quantity: position.quantity,
                    avg_cost: position.avg_cost,
                    current_price: price,
                    market_value: position.market_value(price),
                    unrealized_pnl: position.unrealized_pnl(price),
                    realized_pnl: position.realized_pnl,
                })
            })
            .collect()
    }

    /// All trades, in execution order.
    pub fn trades(&self) -> Vec<Trade> {
        self.trade_log.all()
    }

    pub fn stats(&self) -> VenueStats {
        VenueStats {
            total_realized_pnl: self.trade_log.total_realized_pnl(),
            trade_count: self.trade_log.len(),
            open_orders: self.orders.open_order_count(),
        }
    }
}
