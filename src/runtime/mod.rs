use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::bus::MessageBus;
use crate::climate::{ClimateReading, ClimateSensor};
use crate::config::{PanelConfig, ZoneSeed};
use crate::geometry::Size;
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::metrics::PanelMetrics;
use crate::sync::{PanelView, Redraw, StateSynchronizer, Toggle};
use crate::touch::{TouchSensor, TouchTransform};

pub mod driver;

const TARGET: &str = "zone_panel::runtime";
const BUS_TARGET: &str = "zone_panel::bus";

/// Configuration knobs for the control loop.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Pacing between ticks when a driver owns the loop.
    pub loop_interval: Duration,
    /// Interval between climate sensor polls.
    pub climate_interval: Duration,
    /// Wait after a failed connection attempt before the next one.
    pub reconnect_delay: Duration,
    /// Subscriptions cover zones `1..=zone_count`.
    pub zone_count: u32,
    /// Zones registered at bootstrap.
    pub seeds: Vec<ZoneSeed>,
    pub logger: Option<Logger>,
    pub metrics: Option<Arc<Mutex<PanelMetrics>>>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
    pub metrics_target: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            loop_interval: Duration::from_millis(20),
            climate_interval: Duration::from_millis(2000),
            reconnect_delay: Duration::from_millis(5000),
            zone_count: 16,
            seeds: Vec::new(),
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(60),
            metrics_target: "zone_panel::runtime.metrics".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_panel_config(config: &PanelConfig) -> Self {
        Self {
            loop_interval: config.loop_interval(),
            climate_interval: config.climate_interval(),
            reconnect_delay: config.reconnect_delay(),
            zone_count: config.zone_count,
            seeds: config.zones.clone(),
            metrics_interval: config.metrics_interval(),
            ..Self::default()
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(PanelMetrics::new())));
        }
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<PanelMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// Connection state of the bus link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusLink {
    /// Not connected; the next tick attempts a connection.
    Down,
    Connected,
    /// A connection attempt failed; nothing is retried before `until`.
    Backoff { until: Instant },
}

/// What a single [`PanelRuntime::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub connected: bool,
    pub messages: usize,
    pub toggle: Option<Toggle>,
    pub climate_polled: bool,
}

/// Cooperative control loop tying the synchronizer to its collaborators.
///
/// Each tick services the bus link, drains inbound messages, polls the touch
/// sensor once, then runs the timed climate poll and metrics snapshot. While
/// the link is down, messages and touches wait; the header keeps updating.
pub struct PanelRuntime<V: PanelView> {
    sync: StateSynchronizer,
    view: V,
    bus: Box<dyn MessageBus>,
    touch: Box<dyn TouchSensor>,
    climate: Box<dyn ClimateSensor>,
    config: RuntimeConfig,
    link: BusLink,
    should_exit: bool,
    shown_climate: Option<ClimateReading>,
    start_instant: Option<Instant>,
    last_climate_poll: Option<Instant>,
    last_metrics_emit: Option<Instant>,
}

impl<V: PanelView> PanelRuntime<V> {
    pub fn new(
        config: RuntimeConfig,
        sync: StateSynchronizer,
        view: V,
        bus: Box<dyn MessageBus>,
        touch: Box<dyn TouchSensor>,
        climate: Box<dyn ClimateSensor>,
    ) -> Self {
        let mut config = config;
        if config.metrics.is_none() && !config.metrics_interval.is_zero() {
            config.enable_metrics();
        }
        let mut sync = sync;
        if let Some(logger) = config.logger.clone() {
            sync = sync.with_logger(logger);
        }
        if let Some(metrics) = config.metrics_handle() {
            sync = sync.with_metrics(metrics);
        }

        Self {
            sync,
            view,
            bus,
            touch,
            climate,
            config,
            link: BusLink::Down,
            should_exit: false,
            shown_climate: None,
            start_instant: None,
            last_climate_poll: None,
            last_metrics_emit: None,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &StateSynchronizer {
        &self.sync
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn link(&self) -> BusLink {
        self.link
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub fn request_exit(&mut self) {
        if !self.should_exit {
            self.should_exit = true;
            self.log(LogLevel::Info, "exit_requested", []);
        }
    }

    /// Seed configured zones and paint the first frame before any connection
    /// is attempted, so the panel shows something while the bus comes up.
    pub fn bootstrap(&mut self, now: Instant) {
        self.should_exit = false;
        self.start_instant = Some(now);
        self.last_metrics_emit = Some(now);
        self.log(
            LogLevel::Info,
            "runtime_started",
            [
                json_kv("zone_count", json!(self.config.zone_count)),
                json_kv("seeds", json!(self.config.seeds.len())),
            ],
        );
        if !self.sync.seed(&self.config.seeds, &mut self.view) {
            self.sync.refresh(&mut self.view);
        }
    }

    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        if let Some(messages) = self.service_bus(now) {
            report.connected = true;
            report.messages = messages;
            let sample = self.touch.read();
            report.toggle = self.sync.handle_touch(sample, self.bus.as_mut(), &mut self.view);
        }

        report.climate_polled = self.poll_climate(now);
        self.maybe_emit_metrics(now);
        report
    }

    pub fn resize(&mut self, size: Size) {
        self.view.resize(size);
        self.sync.resize(size, &mut self.view);
    }

    pub fn set_touch_transform(&mut self, transform: TouchTransform) {
        self.sync.set_transform(transform);
    }

    /// Bootstrap at `start`, then tick once at each offset from it.
    pub fn run_scripted<I>(&mut self, start: Instant, offsets: I) -> Vec<TickReport>
    where
        I: IntoIterator<Item = Duration>,
    {
        self.bootstrap(start);
        let mut reports = Vec::new();
        let mut last = start;
        for offset in offsets {
            last = start + offset;
            reports.push(self.tick(last));
            if self.should_exit {
                break;
            }
        }
        self.finalize(last);
        reports
    }

    pub fn finalize(&mut self, now: Instant) {
        let uptime_ms = self
            .start_instant
            .map(|start| now.saturating_duration_since(start).as_millis())
            .unwrap_or(0);
        self.log(
            LogLevel::Info,
            "runtime_stopped",
            [json_kv("uptime_ms", json!(uptime_ms as u64))],
        );
    }

    /// Drive the link state machine and drain inbound messages.
    ///
    /// Returns the number of messages handled, or `None` while the link is
    /// down or backing off.
    fn service_bus(&mut self, now: Instant) -> Option<usize> {
        match self.link {
            BusLink::Connected if self.bus.is_connected() => {}
            BusLink::Connected => {
                emit(self.config.logger.as_ref(), LogLevel::Warn, BUS_TARGET, "bus_lost", []);
                self.connect(now);
            }
            BusLink::Down => self.connect(now),
            BusLink::Backoff { until } if now >= until => self.connect(now),
            BusLink::Backoff { .. } => return None,
        }
        if self.link != BusLink::Connected {
            return None;
        }

        let messages = match self.bus.drain() {
            Ok(messages) => messages,
            Err(err) => {
                emit(
                    self.config.logger.as_ref(),
                    LogLevel::Warn,
                    BUS_TARGET,
                    "bus_drain_failed",
                    [json_kv("error", json!(err.to_string()))],
                );
                self.link = BusLink::Down;
                return None;
            }
        };
        let count = messages.len();
        for message in messages {
            self.sync
                .handle_message(&message.topic, &message.payload, &mut self.view);
        }
        Some(count)
    }

    /// One connection attempt. Success subscribes to every zone topic; failure
    /// enters the backoff wait state.
    fn connect(&mut self, now: Instant) {
        self.record(PanelMetrics::record_reconnect_attempt);
        if let Err(err) = self.bus.connect() {
            let retry_ms = self.config.reconnect_delay.as_millis() as u64;
            emit(
                self.config.logger.as_ref(),
                LogLevel::Warn,
                BUS_TARGET,
                "bus_connect_failed",
                [
                    json_kv("error", json!(err.to_string())),
                    json_kv("retry_ms", json!(retry_ms)),
                ],
            );
            self.link = BusLink::Backoff {
                until: now + self.config.reconnect_delay,
            };
            return;
        }

        let topics = self.sync.router().subscriptions(self.config.zone_count);
        let mut subscribed = 0usize;
        for topic in &topics {
            match self.bus.subscribe(topic) {
                Ok(()) => subscribed += 1,
                Err(err) => emit(
                    self.config.logger.as_ref(),
                    LogLevel::Warn,
                    BUS_TARGET,
                    "subscribe_failed",
                    [
                        json_kv("topic", json!(topic)),
                        json_kv("error", json!(err.to_string())),
                    ],
                ),
            }
        }
        emit(
            self.config.logger.as_ref(),
            LogLevel::Info,
            BUS_TARGET,
            "bus_connected",
            [json_kv("subscriptions", json!(subscribed))],
        );
        self.link = BusLink::Connected;
    }

    /// Sample the climate sensor when its interval has elapsed. A failed
    /// sample leaves the last reading on screen.
    fn poll_climate(&mut self, now: Instant) -> bool {
        let due = match self.last_climate_poll {
            Some(last) => now.saturating_duration_since(last) >= self.config.climate_interval,
            None => true,
        };
        if !due {
            return false;
        }
        self.last_climate_poll = Some(now);

        let Some(reading) = self.climate.sample() else {
            return true;
        };
        if self.shown_climate == Some(reading) {
            return true;
        }
        self.shown_climate = Some(reading);
        self.view.update_climate(Some(reading));
        if let Err(err) = self.view.redraw(self.sync.registry(), Redraw::Header) {
            self.log(
                LogLevel::Warn,
                "header_redraw_failed",
                [json_kv("error", json!(err.to_string()))],
            );
        }
        true
    }

    fn maybe_emit_metrics(&mut self, now: Instant) {
        if self.config.metrics.is_none() || self.config.metrics_interval.is_zero() {
            return;
        }

        match self.last_metrics_emit {
            Some(last) if now.saturating_duration_since(last) < self.config.metrics_interval => {
                return;
            }
            _ => self.last_metrics_emit = Some(now),
        }

        let uptime = self
            .start_instant
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();

        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let event = guard
                    .snapshot(uptime)
                    .to_log_event(&self.config.metrics_target);
                let _ = logger.log_event(event);
            }
        }
    }

    fn record(&self, update: impl FnOnce(&mut PanelMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut *guard);
            }
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        emit(self.config.logger.as_ref(), level, TARGET, message, fields);
    }
}
