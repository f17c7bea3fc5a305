//! Live stock ticker engine for small pixel-matrix displays.
//!
//! A background publisher fetches quotes and price history through a
//! provider fallback chain and hands immutable snapshots to the display
//! loop over a single-slot channel. The display loop rotates through
//! symbols, throttles repaints, and renders an inflection-colored area
//! chart per symbol through the [`surface::PixelSurface`] abstraction.

pub mod calendar;
pub mod channel;
pub mod chart;
pub mod config;
pub mod consumer;
pub mod error;
pub mod fetch;
pub mod models;
pub mod publisher;
pub mod surface;

pub use error::{Result, TickerError};
