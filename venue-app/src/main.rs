//! Paper Venue Application
//!
//! Standalone simulated trading venue: starts the price tick driver, runs a
//! small scripted trading session against the moving tape and reports the
//! final portfolio and statistics.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use venue_core::{OrderRequest, OrderStatus, OrderStyle, Side, VenueConfig, VenueEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    info!("🚀 Starting paper trading venue");

    // Default catalog, fast tape for the demo
    let config = VenueConfig {
        tick_interval: Duration::from_millis(500),
        ..Default::default()
    };

    let venue = Arc::new(VenueEngine::new(config)?);
    venue.start().await;
    info!("✅ Venue engine started");

    for snapshot in venue.instruments() {
        info!(
            "📈 {} ({}) listed on {} at ${:.2}",
            snapshot.symbol, snapshot.name, snapshot.exchange, snapshot.price
        );
    }

    // Scripted trading session
    let session_venue = venue.clone();
    let session = tokio::spawn(async move {
        if let Err(e) = run_demo_session(&session_venue).await {
            warn!("demo session error: {}", e);
        }
    });

    info!("📊 Venue is running. Press Ctrl+C to stop.");

    let shutdown = signal::ctrl_c();
    tokio::select! {
        _ = shutdown => {
            info!("🛑 Shutdown signal received...");
        }
        _ = session => {
            info!("📉 Demo session completed");
        }
        _ = tokio::time::sleep(Duration::from_secs(120)) => {
            info!("⏰ Max runtime reached...");
        }
    }

    venue.stop().await;

    // Final report
    let stats = venue.stats();
    info!("📊 Final Statistics:");
    info!("  Trades executed: {}", stats.trade_count);
    info!("  Open orders: {}", stats.open_orders);
    info!("  Total realized P&L: ${:.2}", stats.total_realized_pnl);
    for position in venue.portfolio() {
        info!(
            "  {} x{} @ ${:.2} (unrealized ${:.2})",
            position.symbol, position.quantity, position.avg_cost, position.unrealized_pnl
        );
    }
    println!("{}", serde_json::to_string_pretty(&stats)?);

    info!("✅ Venue shutdown complete");
    Ok(())
}

/// Work both order styles against the moving tape.
async fn run_demo_session(venue: &VenueEngine) -> Result<()> {
    // Seed a position with market buys
    for (symbol, quantity) in [("AAPL", 10), ("TSLA", 5)] {
        let order = venue.place_order(OrderRequest {
            symbol: symbol.to_string(),
            quantity,
            side: Side::Buy,
            style: OrderStyle::Market,
            limit_price: None,
        })?;
        info!(
            "bought {} {} at ${:.2}",
            quantity,
            symbol,
            order.executed_price.unwrap_or_default()
        );
    }

    // Take-profit style limit sells a little above the tape
    let mut pending = Vec::new();
    for (symbol, quantity, markup) in [("AAPL", 10, 1.01), ("TSLA", 5, 1.02)] {
        let price = venue
            .instruments()
            .into_iter()
            .find(|s| s.symbol.as_str() == symbol)
            .map(|s| s.price)
            .unwrap_or_default();

        let order = venue.place_order(OrderRequest {
            symbol: symbol.to_string(),
            quantity,
            side: Side::Sell,
            style: OrderStyle::Limit,
            limit_price: Some(price * markup),
        })?;
        info!(
            "limit sell {} {} at ${:.2} pending as {}",
            quantity,
            symbol,
            price * markup,
            order.id
        );
        pending.push(order.id);
    }

    // Watch the tape until the limits fill or patience runs out
    for _ in 0..60 {
        tokio::time::sleep(Duration::from_secs(1)).await;

        pending.retain(|order_id| match venue.get_order(order_id) {
            Ok(order) if order.status == OrderStatus::Executed => {
                info!(
                    "limit order {} filled at ${:.2}",
                    order.id,
                    order.executed_price.unwrap_or_default()
                );
                false
            }
            Ok(_) => true,
            Err(_) => false,
        });

        if pending.is_empty() {
            break;
        }
    }

    // Cancel whatever never triggered
    for order_id in pending {
        match venue.cancel_order(&order_id) {
            Ok(order) => info!("cancelled unfilled limit order {}", order.id),
            Err(e) => warn!("could not cancel {}: {}", order_id, e),
        }
    }

    let stats = venue.stats();
    info!(
        "session done: {} trades, realized P&L ${:.2}",
        stats.trade_count, stats.total_realized_pnl
    );
    Ok(())
}
