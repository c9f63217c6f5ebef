//! Venue configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One tradable instrument in the venue's catalog
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub start_price: f64,
    /// Per-tick volatility; higher for more speculative names
    pub volatility: f64,
}

impl InstrumentConfig {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        exchange: impl Into<String>,
        start_price: f64,
        volatility: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            exchange: exchange.into(),
            start_price,
            volatility,
        }
    }
}

/// Venue-wide configuration
#[derive(Clone, Debug)]
pub struct VenueConfig {
    /// Cadence of the periodic price tick driver
    pub tick_interval: Duration,
    /// Per-tick drift shared by all instruments
    pub drift: f64,
    pub instruments: Vec<InstrumentConfig>,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(2),
            drift: 0.0001,
            instruments: vec![
                InstrumentConfig::new("AAPL", "Apple Inc.", "NASDAQ", 260.0, 0.02),
                InstrumentConfig::new("TSLA", "Tesla Inc.", "NASDAQ", 430.0, 0.04),
                InstrumentConfig::new(
                    "IBM",
                    "International Business Machines",
                    "NYSE",
                    295.0,
                    0.015,
                ),
            ],
        }
    }
}
