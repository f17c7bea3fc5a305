//! Core data model: quotes, price series, trading windows, snapshots.
//!
//! All values are immutable once produced; a fetch cycle replaces them
//! wholesale rather than mutating in place.

pub mod quote;
pub mod series;
pub mod snapshot;
pub mod window;

pub use quote::Quote;
pub use series::PriceSeries;
pub use snapshot::Snapshot;
pub use window::MarketWindow;
