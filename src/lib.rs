//! Touch-panel controller for a set of irrigation zones.
//!
//! Zones are discovered from `{base}/zone{N}/state` and `{base}/zone{N}/name`
//! messages on a publish/subscribe bus, laid out as a two-column card grid,
//! and toggled by touch. A toggle is applied locally at once and published as
//! `{base}/zone{N}/set` with `ON` or `OFF`; the controller's echo is
//! authoritative and the last write wins.

pub mod bus;
pub mod climate;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod sync;
pub mod topics;
pub mod touch;
pub mod width;

pub use bus::{BusError, BusMessage, BusResult, MemoryBus, MessageBus, TcpLineBus};
pub use climate::{ClimateReading, ClimateSensor, NoClimateSensor, ScriptedClimate};
pub use config::{ConfigError, PanelConfig, ZoneSeed};
pub use error::{PanelError, Result};
pub use geometry::{Point, Rect, Size};
pub use layout::{GridSpec, compute_layout};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{MetricSnapshot, PanelMetrics};
pub use registry::{Zone, ZoneId, ZoneRegistry};
pub use render::{AnsiSurface, CardMetrics, PanelRenderer, Surface, SurfaceView};
pub use runtime::driver::cli::{
    CliDriver, DriverError, DriverResult, TerminalGeometry, TerminalTouch,
};
pub use runtime::{BusLink, PanelRuntime, RuntimeConfig, TickReport};
pub use sync::{PanelView, RecordingView, Redraw, StateSynchronizer, Toggle};
pub use topics::{TopicRouter, ZoneUpdate};
pub use touch::{Orientation, ScriptedTouch, TouchSample, TouchSensor, TouchTransform, resolve};
pub use width::display_width;
