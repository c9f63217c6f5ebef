//! Synthetic price generation
//!
//! Each instrument's price follows a discrete geometric Brownian motion step
//! per tick, with session high/low tracking and a simulated cumulative
//! volume counter. Instrument state lives behind per-symbol map entries so a
//! tick's multi-field update is atomic with respect to snapshot readers.

use dashmap::DashMap;
use rand::Rng;
use rand_distr::StandardNormal;
use std::collections::HashSet;
use std::collections::VecDeque;

use super::types::{PriceSnapshot, Symbol};
use crate::config::InstrumentConfig;
use crate::errors::VenueError;

/// Points of price history retained per instrument
const HISTORY_CAPACITY: usize = 100;
/// Points of history exposed in a snapshot
const HISTORY_TAIL: usize = 20;

/// Per-instrument mutable market state
struct InstrumentState {
    symbol: Symbol,
    name: String,
    exchange: String,
    volatility: f64,
    open: f64,
    price: f64,
    high: f64,
    low: f64,
    volume: u64,
    history: VecDeque<f64>,
}

impl InstrumentState {
    fn from_config(config: &InstrumentConfig) -> Self {
        let mut history = VecDeque::with_capacity(HISTORY_CAPACITY);
        history.push_back(config.start_price);
        Self {
            symbol: Symbol::new(config.symbol.clone()),
            name: config.name.clone(),
            exchange: config.exchange.clone(),
            volatility: config.volatility,
            open: config.start_price,
            price: config.start_price,
            high: config.start_price,
            low: config.start_price,
            volume: 0,
            history,
        }
    }
}

/// Owns all instrument price state and advances it on demand.
///
/// The tick cadence is externally driven; `tick()` itself never fails.
pub struct PriceEngine {
    instruments: DashMap<Symbol, InstrumentState>,
    /// Startup catalog order, used for deterministic iteration
    catalog: Vec<Symbol>,
    drift: f64,
}

impl PriceEngine {
    /// Build the engine from the instrument catalog.
    ///
    /// Malformed configurations (empty or duplicate symbol, non-positive
    /// start price or volatility) are rejected here rather than at tick time.
    pub fn new(configs: &[InstrumentConfig], drift: f64) -> Result<Self, VenueError> {
        if configs.is_empty() {
            return Err(VenueError::InvalidConfig(
                "instrument catalog is empty".to_string(),
            ));
        }

        let instruments = DashMap::new();
        let mut catalog = Vec::with_capacity(configs.len());
        let mut seen = HashSet::new();

        for config in configs {
            let symbol = Symbol::new(config.symbol.clone());
            if !symbol.validate() {
                return Err(VenueError::InvalidConfig(format!(
                    "invalid symbol: {:?}",
                    config.symbol
                )));
            }
            if !seen.insert(symbol.clone()) {
                return Err(VenueError::InvalidConfig(format!(
                    "duplicate symbol: {symbol}"
                )));
            }
            if !(config.start_price > 0.0) {
                return Err(VenueError::InvalidConfig(format!(
                    "{symbol}: start price must be positive, got {}",
                    config.start_price
                )));
            }
            if !(config.volatility > 0.0) {
                return Err(VenueError::InvalidConfig(format!(
                    "{symbol}: volatility must be positive, got {}",
                    config.volatility
                )));
            }

            instruments.insert(symbol.clone(), InstrumentState::from_config(config));
            catalog.push(symbol);
        }

        Ok(Self {
            instruments,
            catalog,
            drift,
        })
    }

    /// Advance every instrument by one stochastic step.
    ///
    /// `price' = price * exp((drift - vol^2/2) * dt + vol * sqrt(dt) * Z)`
    /// with dt fixed at one tick-unit. Single-tick moves are clamped to
    /// +/-50% of the prior price, which also keeps prices strictly positive.
    pub fn tick(&self) {
        let mut rng = rand::thread_rng();

        for symbol in &self.catalog {
            if let Some(mut entry) = self.instruments.get_mut(symbol) {
                let inst = entry.value_mut();
                let z: f64 = rng.sample(StandardNormal);
                let step = (self.drift - 0.5 * inst.volatility * inst.volatility)
                    + inst.volatility * z;
                let next = (inst.price * step.exp())
                    .clamp(inst.price * 0.5, inst.price * 1.5);

                let change_pct = (next - inst.price) / inst.price;
                inst.price = next;
                inst.high = inst.high.max(next);
                inst.low = inst.low.min(next);

                // Heavier tape on bigger moves
                let surge = 1.0 + change_pct.abs() * 10.0;
                inst.volume += (rng.gen_range(500..=5_000) as f64 * surge) as u64;

                inst.history.push_back(next);
                if inst.history.len() > HISTORY_CAPACITY {
                    inst.history.pop_front();
                }
            }
        }
    }

    /// Current price for one symbol, the cheap read used by the fill path.
    pub fn price(&self, symbol: &Symbol) -> Option<f64> {
        self.instruments.get(symbol).map(|inst| inst.price)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.instruments.contains_key(symbol)
    }

    /// Immutable copy of one instrument's current market state.
    pub fn snapshot(&self, symbol: &Symbol) -> Option<PriceSnapshot> {
        self.instruments.get(symbol).map(|inst| Self::build_snapshot(&inst))
    }

    /// Snapshots for every instrument, in catalog order.
    pub fn snapshot_all(&self) -> Vec<PriceSnapshot> {
        self.catalog
            .iter()
            .filter_map(|symbol| self.snapshot(symbol))
            .collect()
    }

    fn build_snapshot(inst: &InstrumentState) -> PriceSnapshot {
        // Synthetic bid/ask, 0.1-0.5% of price
        let spread = rand::thread_rng().gen_range(0.001..0.005);
        let history: Vec<f64> = inst
            .history
            .iter()
            .rev()
            .take(HISTORY_TAIL)
            .rev()
            .copied()
            .collect();

        PriceSnapshot {
            symbol: inst.symbol.clone(),
            name: inst.name.clone(),
            exchange: inst.exchange.clone(),
            price: inst.price,
            open: inst.open,
            change: inst.price - inst.open,
            change_percent: (inst.price - inst.open) / inst.open * 100.0,
            high: inst.high,
            low: inst.low,
            volume: inst.volume,
            bid: inst.price * (1.0 - spread / 2.0),
            ask: inst.price * (1.0 + spread / 2.0),
            history,
        }
    }

    /// Pin a symbol's price for deterministic scenarios.
    #[cfg(test)]
    pub(crate) fn set_price(&self, symbol: &Symbol, price: f64) {
        if let Some(mut entry) = self.instruments.get_mut(symbol) {
            let inst = entry.value_mut();
            inst.price = price;
            inst.high = inst.high.max(price);
            inst.low = inst.low.min(price);
            inst.history.push_back(price);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_catalog() -> Vec<InstrumentConfig> {
        vec![
            InstrumentConfig::new("AAPL", "Apple Inc.", "NASDAQ", 260.0, 0.02),
            InstrumentConfig::new("TSLA", "Tesla Inc.", "NASDAQ", 430.0, 0.04),
        ]
    }

    #[test]
    fn rejects_non_positive_volatility() {
        let configs = vec![InstrumentConfig::new("AAPL", "Apple", "NASDAQ", 260.0, 0.0)];
        assert!(matches!(
            PriceEngine::new(&configs, 0.0),
            Err(VenueError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_duplicate_symbols() {
        let configs = vec![
            InstrumentConfig::new("AAPL", "Apple", "NASDAQ", 260.0, 0.02),
            InstrumentConfig::new("AAPL", "Apple again", "NASDAQ", 100.0, 0.02),
        ];
        assert!(PriceEngine::new(&configs, 0.0).is_err());
    }

    #[test]
    fn prices_stay_positive_under_extreme_volatility() {
        let configs = vec![InstrumentConfig::new("WILD", "Wild", "TEST", 0.05, 3.0)];
        let engine = PriceEngine::new(&configs, 0.0).unwrap();
        let symbol = Symbol::new("WILD");

        for _ in 0..500 {
            engine.tick();
            assert!(engine.price(&symbol).unwrap() > 0.0);
        }
    }

    #[test]
    fn tick_updates_extremes_and_volume() {
        let engine = PriceEngine::new(&test_catalog(), 0.0001).unwrap();
        let symbol = Symbol::new("AAPL");

        for _ in 0..50 {
            engine.tick();
        }

        let snap = engine.snapshot(&symbol).unwrap();
        assert!(snap.low <= snap.price && snap.price <= snap.high);
        assert!(snap.low <= snap.open && snap.open <= snap.high);
        assert!(snap.volume > 0);
        assert!(snap.bid < snap.price && snap.price < snap.ask);
    }

    #[test]
    fn snapshots_follow_catalog_order() {
        let engine = PriceEngine::new(&test_catalog(), 0.0).unwrap();
        let symbols: Vec<String> = engine
            .snapshot_all()
            .iter()
            .map(|s| s.symbol.to_string())
            .collect();
        assert_eq!(symbols, vec!["AAPL", "TSLA"]);
    }

    #[test]
    fn history_is_bounded() {
        let engine = PriceEngine::new(&test_catalog(), 0.0).unwrap();
        let symbol = Symbol::new("TSLA");

        for _ in 0..300 {
            engine.tick();
        }

        let snap = engine.snapshot(&symbol).unwrap();
        assert_eq!(snap.history.len(), HISTORY_TAIL);
        assert_eq!(*snap.history.last().unwrap(), snap.price);
    }
}
