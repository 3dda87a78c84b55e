//! Drawing: the [`Surface`] capability, the card renderer and the terminal
//! surface used by the CLI driver.

mod ansi;
mod core;
mod view;

pub use ansi::AnsiSurface;
pub use core::{CardMetrics, Color, Font, LabelFit, PanelRenderer, Surface, fit_label};
pub use view::SurfaceView;
