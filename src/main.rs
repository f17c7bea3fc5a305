//! Terminal-preview ticker binary.
//!
//! Wires the publisher and display loop together over a shared snapshot
//! channel and renders onto a crossterm surface sized like a common
//! 64x32 matrix panel. Ctrl-C stops the display loop, then the publisher
//! is shut down gracefully.

use std::sync::Arc;

use tracing::info;

use tickergrid::calendar::{MarketCalendar, MarketProbe, WeekdayProbe};
use tickergrid::channel::SnapshotChannel;
use tickergrid::config::fetch_config;
use tickergrid::consumer::ConsumerLoop;
use tickergrid::fetch::{DataFetcher, Yahoo};
use tickergrid::publisher::UpdatePublisher;
use tickergrid::surface::{TerminalSurface, TerminalText};
use tickergrid::TickerError;

const MATRIX_WIDTH: u32 = 64;
const MATRIX_HEIGHT: u32 = 32;

#[tokio::main]
async fn main() -> Result<(), TickerError> {
    tracing_subscriber::fmt::init();

    let config = fetch_config()?;
    let channel = Arc::new(SnapshotChannel::new());

    let probe: Arc<dyn MarketProbe> = if config.demo_mode {
        Arc::new(WeekdayProbe::nyse())
    } else {
        Arc::new(Yahoo::new())
    };
    let publisher = UpdatePublisher::spawn(
        DataFetcher::from_config(&config),
        MarketCalendar::nyse(probe),
        Arc::clone(&channel),
        &config,
    );

    let surface = TerminalSurface::new(MATRIX_WIDTH, MATRIX_HEIGHT)?;
    let text = TerminalText::new(MATRIX_WIDTH);
    let consumer = ConsumerLoop::new(
        channel,
        surface,
        text,
        config.symbols.clone(),
        config.display_interval(),
    );

    tokio::select! {
        () = consumer.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
    }

    publisher.shutdown().await;
    Ok(())
}
