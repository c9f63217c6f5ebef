//! Append-only record of fills

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::market::{Side, Symbol};

/// One executed fill, immutable once appended
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub order_id: String,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: u64,
    pub price: f64,
    /// P&L booked by this fill; 0 for BUY
    pub realized_pnl: f64,
    pub executed_at: DateTime<Utc>,
}

/// Owns the trade history; read-only to everything but the fill routine
pub struct TradeLog {
    trades: RwLock<Vec<Trade>>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self {
            trades: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn append(&self, trade: Trade) {
        self.trades.write().push(trade);
    }

    /// All trades, in execution order.
    pub fn all(&self) -> Vec<Trade> {
        self.trades.read().clone()
    }

    pub fn len(&self) -> usize {
        self.trades.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.read().is_empty()
    }

    /// Sum of the realized P&L booked by every recorded fill.
    pub fn total_realized_pnl(&self) -> f64 {
        self.trades.read().iter().map(|t| t.realized_pnl).sum()
    }
}

impl Default for TradeLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(symbol: &str, side: Side, pnl: f64) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            order_id: "ORD_test".to_string(),
            symbol: Symbol::new(symbol),
            side,
            quantity: 1,
            price: 100.0,
            realized_pnl: pnl,
            executed_at: Utc::now(),
        }
    }

    #[test]
    fn trades_are_kept_in_execution_order() {
        let log = TradeLog::new();
        log.append(trade("AAPL", Side::Buy, 0.0));
        log.append(trade("TSLA", Side::Sell, 25.0));
        log.append(trade("AAPL", Side::Sell, -10.0));

        let all = log.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].symbol.as_str(), "AAPL");
        assert_eq!(all[1].symbol.as_str(), "TSLA");
        assert!((log.total_realized_pnl() - 15.0).abs() < 1e-9);
    }
}
