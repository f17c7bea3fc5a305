//! Display loop: drains snapshots, rotates symbols, throttles redraws.
//!
//! Runs on a fast tick but repaints sparingly. A redraw happens when the
//! shown symbol changes, when fresh data arrived and the last data-driven
//! repaint is old enough, or unconditionally after a long quiet period.
//! Data from earlier snapshots is carried forward per symbol, so a symbol
//! whose fetch failed this cycle keeps showing its last known values.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::channel::SnapshotChannel;
use crate::chart::{ChartPalette, Region, render_area, render_placeholder};
use crate::models::Snapshot;
use crate::surface::{PixelSurface, Rgb};

/// Minimum spacing between data-driven repaints of the same symbol.
const MIN_DATA_REDRAW_INTERVAL: Duration = Duration::from_secs(5);
/// A repaint is forced after this long regardless of data changes.
const FORCE_REDRAW_INTERVAL: Duration = Duration::from_secs(30);
/// Loop cadence. Cheap ticks keep rotation and drain latency low.
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Horizontal anchoring for [`TextSink::draw_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// Text output companion to [`PixelSurface`].
///
/// Kept separate from the pixel trait because matrix text goes through a
/// font renderer while the terminal preview prints characters directly.
pub trait TextSink {
    /// Draws `text` anchored at `(x, y)`. `Right` means `x` is the right
    /// edge of the rendered string.
    fn draw_text(&mut self, x: u32, y: u32, align: Align, color: Rgb, text: &str);
}

/// Per-symbol display readiness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SymbolState {
    /// No data shown yet for this symbol.
    Loading,
    /// Real data has been shown at least once; never reverts.
    Displayed,
}

pub struct ConsumerLoop<S: PixelSurface, T: TextSink> {
    channel: std::sync::Arc<SnapshotChannel>,
    surface: S,
    text: T,
    symbols: Vec<String>,
    states: Vec<SymbolState>,
    current_index: usize,
    snapshot: Option<Snapshot>,
    display_interval: Duration,
    palette: ChartPalette,
    last_rotation: Option<Instant>,
    last_redraw: Option<Instant>,
    last_data_redraw: Option<Instant>,
    dirty: bool,
}

impl<S: PixelSurface, T: TextSink> ConsumerLoop<S, T> {
    #[must_use]
    pub fn new(
        channel: std::sync::Arc<SnapshotChannel>,
        surface: S,
        text: T,
        symbols: Vec<String>,
        display_interval: Duration,
    ) -> Self {
        let states = vec![SymbolState::Loading; symbols.len()];
        Self {
            channel,
            surface,
            text,
            symbols,
            states,
            current_index: 0,
            snapshot: None,
            display_interval,
            palette: ChartPalette::default(),
            last_rotation: None,
            last_redraw: None,
            last_data_redraw: None,
            dirty: false,
        }
    }

    /// Runs until cancelled by the caller dropping the future.
    pub async fn run(mut self) {
        info!(symbols = ?self.symbols, "display loop started");
        loop {
            self.tick(Instant::now());
            tokio::time::sleep(TICK_INTERVAL).await;
        }
    }

    /// One iteration of the loop. Returns whether a repaint happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Some(incoming) = self.channel.drain() {
            self.adopt(incoming);
        }

        let mut symbol_changed = false;
        if self.symbols.len() > 1 {
            let due = self
                .last_rotation
                .is_none_or(|at| now.duration_since(at) >= self.display_interval);
            if due {
                if self.last_rotation.is_some() {
                    self.current_index = (self.current_index + 1) % self.symbols.len();
                    symbol_changed = true;
                }
                self.last_rotation = Some(now);
            }
        }

        let data_due = self.dirty
            && self
                .last_data_redraw
                .is_none_or(|at| now.duration_since(at) >= MIN_DATA_REDRAW_INTERVAL);
        let force_due = self
            .last_redraw
            .is_none_or(|at| now.duration_since(at) >= FORCE_REDRAW_INTERVAL);

        if symbol_changed || data_due || force_due {
            self.redraw();
            self.last_redraw = Some(now);
            if data_due {
                self.last_data_redraw = Some(now);
                self.dirty = false;
            }
            return true;
        }
        false
    }

    /// Merges an incoming snapshot, carrying last-known-good data forward
    /// for symbols the new cycle has nothing for.
    fn adopt(&mut self, mut incoming: Snapshot) {
        if let Some(previous) = &self.snapshot {
            for symbol in &incoming.symbols {
                if !incoming.quotes.contains_key(symbol) {
                    if let Some(quote) = previous.quotes.get(symbol) {
                        incoming.quotes.insert(symbol.clone(), quote.clone());
                    }
                }
                if !incoming.series.contains_key(symbol) {
                    if let Some(series) = previous.series.get(symbol) {
                        incoming.series.insert(symbol.clone(), series.clone());
                    }
                }
            }
        }

        if incoming.symbols != self.symbols {
            debug!(symbols = ?incoming.symbols, "symbol set changed, restarting rotation");
            self.symbols = incoming.symbols.clone();
            self.states = vec![SymbolState::Loading; self.symbols.len()];
            self.current_index = 0;
            self.last_rotation = None;
        }

        for (index, symbol) in self.symbols.iter().enumerate() {
            if incoming.quotes.contains_key(symbol) && self.states[index] == SymbolState::Loading {
                self.states[index] = SymbolState::Displayed;
                if index == self.current_index {
                    // First real data for the visible symbol paints
                    // immediately instead of waiting out the throttle.
                    self.last_data_redraw = None;
                }
            }
        }

        self.snapshot = Some(incoming);
        self.dirty = true;
    }

    fn redraw(&mut self) {
        self.surface.clear();
        let width = self.surface.width();
        let height = self.surface.height();
        let chart_region = Region {
            x: 0,
            y: height / 2,
            width,
            height: height - height / 2,
        };

        let symbol = match self.symbols.get(self.current_index) {
            Some(symbol) => symbol.clone(),
            None => {
                render_placeholder(&mut self.surface, chart_region, &self.palette);
                self.surface.flush();
                return;
            }
        };

        let quote = self
            .snapshot
            .as_ref()
            .and_then(|s| s.quote(&symbol))
            .cloned();

        self.text.draw_text(2, 8, Align::Left, Rgb::WHITE, &symbol);
        match &quote {
            Some(quote) => {
                let direction = if quote.is_gain() { Rgb::GAIN } else { Rgb::LOSS };
                self.text.draw_text(
                    2,
                    15,
                    Align::Left,
                    Rgb::WHITE,
                    &format!("{:.2}", quote.price),
                );
                self.text.draw_text(
                    width.saturating_sub(2),
                    8,
                    Align::Right,
                    direction,
                    &format!("{:+.2}", quote.change),
                );
                self.text.draw_text(
                    width.saturating_sub(2),
                    15,
                    Align::Right,
                    direction,
                    &format!("{:+.1}%", quote.change_percent),
                );
            }
            None => {
                self.text.draw_text(2, 15, Align::Left, Rgb::WHITE, "...");
            }
        }

        let series = self.snapshot.as_ref().and_then(|s| s.series_for(&symbol));
        match (series, &quote) {
            (Some(series), Some(quote)) => {
                render_area(
                    &mut self.surface,
                    chart_region,
                    series,
                    quote.prior_close(),
                    &self.palette,
                );
            }
            (Some(series), None) => {
                // No inflection available; color against the latest value.
                let inflection = series.latest().unwrap_or(0.0);
                render_area(&mut self.surface, chart_region, series, inflection, &self.palette);
            }
            (None, _) => {
                render_placeholder(&mut self.surface, chart_region, &self.palette);
            }
        }

        self.surface.flush();
    }

    /// Symbol currently on display.
    #[must_use]
    pub fn current_symbol(&self) -> Option<&str> {
        self.symbols.get(self.current_index).map(String::as_str)
    }

    /// Borrow of the underlying surface, for inspection.
    #[must_use]
    pub fn surface_ref(&self) -> &S {
        &self.surface
    }

    /// Borrow of the text sink, for inspection.
    #[must_use]
    pub fn text_ref(&self) -> &T {
        &self.text
    }
}
