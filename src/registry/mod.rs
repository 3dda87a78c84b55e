//! Ordered, append-only set of zones known to the panel.

mod core;

pub use core::{Upserted, Zone, ZoneId, ZoneRegistry};
