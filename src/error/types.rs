use thiserror::Error;

use crate::bus::BusError;
use crate::config::ConfigError;
use crate::logging::LoggingError;

/// Unified result type for the zone panel crate.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors surfaced by the panel's setup paths and collaborators.
///
/// The synchronizer itself never returns these; render and publish failures
/// are logged and counted there instead.
#[derive(Debug, Error)]
pub enum PanelError {
    #[error("layout has {rects} rectangles for {zones} zones")]
    LayoutMismatch { rects: usize, zones: usize },
    #[error("surface error: {0}")]
    Surface(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("message bus error: {0}")]
    Bus(#[from] BusError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
