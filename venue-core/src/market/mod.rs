//! Market data simulation

pub mod price_engine;
pub mod types;

pub use price_engine::PriceEngine;
pub use types::{OrderStyle, PriceSnapshot, Side, Symbol};
