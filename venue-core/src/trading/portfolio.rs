//! Position accounting
//!
//! One long-only position per symbol: quantity, volume-weighted average
//! cost and realized P&L. Positions are mutated exclusively by the fill
//! routine, through `with_position_mut`, which holds the symbol's entry
//! guard for the whole closure so fills against one symbol serialize.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::market::Symbol;

/// Holdings in one symbol
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub symbol: Symbol,
    pub quantity: u64,
    pub avg_cost: f64,
    pub realized_pnl: f64,
}

impl Position {
    fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            quantity: 0,
            avg_cost: 0.0,
            realized_pnl: 0.0,
        }
    }

    /// Volume-weighted average cost blend.
    pub(crate) fn apply_buy(&mut self, quantity: u64, price: f64) {
        let old_qty = self.quantity as f64;
        let fill_qty = quantity as f64;
        self.avg_cost = (old_qty * self.avg_cost + fill_qty * price) / (old_qty + fill_qty);
        self.quantity += quantity;
    }

    /// Books realized P&L against average cost and returns it. Average cost
    /// is untouched, except a position sold down to zero resets it.
    pub(crate) fn apply_sell(&mut self, quantity: u64, price: f64) -> f64 {
        debug_assert!(quantity <= self.quantity);
        let pnl = (price - self.avg_cost) * quantity as f64;
        self.quantity -= quantity;
        self.realized_pnl += pnl;
        if self.quantity == 0 {
            self.avg_cost = 0.0;
        }
        pnl
    }

    pub fn market_value(&self, current_price: f64) -> f64 {
        current_price * self.quantity as f64
    }

    /// Mark-to-market P&L; derived from the live price, never stored.
    pub fn unrealized_pnl(&self, current_price: f64) -> f64 {
        (current_price - self.avg_cost) * self.quantity as f64
    }
}

/// Position augmented with live market data at read time
#[derive(Clone, Debug, Serialize)]
pub struct PositionSnapshot {
    pub symbol: Symbol,
    pub quantity: u64,
    pub avg_cost: f64,
    pub current_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

/// Owns all per-symbol position state
pub struct PortfolioLedger {
    positions: DashMap<Symbol, Position>,
}

impl PortfolioLedger {
    pub fn new() -> Self {
        Self {
            positions: DashMap::new(),
        }
    }

    /// Run `f` with exclusive access to the symbol's position slot, creating
    /// an empty position on first touch. The entry guard is held for the
    /// whole closure.
    pub(crate) fn with_position_mut<R>(
        &self,
        symbol: &Symbol,
        f: impl FnOnce(&mut Position) -> R,
    ) -> R {
        let mut entry = self
            .positions
            .entry(symbol.clone())
            .or_insert_with(|| Position::new(symbol.clone()));
        f(entry.value_mut())
    }

    pub fn get(&self, symbol: &Symbol) -> Option<Position> {
        self.positions.get(symbol).map(|position| position.clone())
    }

    /// All positions, symbol-sorted for stable output.
    pub fn positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .positions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        positions.sort_by(|a, b| a.symbol.as_str().cmp(b.symbol.as_str()));
        positions
    }
}

impl Default for PortfolioLedger {
    fn default() -> Self {
        Self::new()
    }
}
