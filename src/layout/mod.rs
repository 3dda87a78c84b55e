//! Layout engine: derives card rectangles from zone count and surface size.

pub mod grid;

pub use grid::{GRID_COLUMNS, GridSpec, compute_layout};
