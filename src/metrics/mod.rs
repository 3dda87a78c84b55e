use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Counters accumulated by the control loop and the synchronizer.
#[derive(Debug, Default, Clone)]
pub struct PanelMetrics {
    inbound_messages: u64,
    rejected_messages: u64,
    touches: u64,
    toggles: u64,
    publish_failures: u64,
    layout_passes: u64,
    card_redraws: u64,
    full_redraws: u64,
    reconnect_attempts: u64,
}

impl PanelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inbound(&mut self, accepted: bool) {
        self.inbound_messages = self.inbound_messages.saturating_add(1);
        if !accepted {
            self.rejected_messages = self.rejected_messages.saturating_add(1);
        }
    }

    pub fn record_touch(&mut self) {
        self.touches = self.touches.saturating_add(1);
    }

    pub fn record_toggle(&mut self) {
        self.toggles = self.toggles.saturating_add(1);
    }

    pub fn record_publish_failure(&mut self) {
        self.publish_failures = self.publish_failures.saturating_add(1);
    }

    pub fn record_layout_pass(&mut self) {
        self.layout_passes = self.layout_passes.saturating_add(1);
    }

    pub fn record_card_redraw(&mut self) {
        self.card_redraws = self.card_redraws.saturating_add(1);
    }

    pub fn record_full_redraw(&mut self) {
        self.full_redraws = self.full_redraws.saturating_add(1);
    }

    pub fn record_reconnect_attempt(&mut self) {
        self.reconnect_attempts = self.reconnect_attempts.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            inbound_messages: self.inbound_messages,
            rejected_messages: self.rejected_messages,
            touches: self.touches,
            toggles: self.toggles,
            publish_failures: self.publish_failures,
            layout_passes: self.layout_passes,
            card_redraws: self.card_redraws,
            full_redraws: self.full_redraws,
            reconnect_attempts: self.reconnect_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub inbound_messages: u64,
    pub rejected_messages: u64,
    pub touches: u64,
    pub toggles: u64,
    pub publish_failures: u64,
    pub layout_passes: u64,
    pub card_redraws: u64,
    pub full_redraws: u64,
    pub reconnect_attempts: u64,
}

impl MetricSnapshot {
    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("inbound_messages".to_string(), json!(self.inbound_messages));
        map.insert("rejected_messages".to_string(), json!(self.rejected_messages));
        map.insert("touches".to_string(), json!(self.touches));
        map.insert("toggles".to_string(), json!(self.toggles));
        map.insert("publish_failures".to_string(), json!(self.publish_failures));
        map.insert("layout_passes".to_string(), json!(self.layout_passes));
        map.insert("card_redraws".to_string(), json!(self.card_redraws));
        map.insert("full_redraws".to_string(), json!(self.full_redraws));
        map.insert("reconnect_attempts".to_string(), json!(self.reconnect_attempts));
        map
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "panel_metrics", self.as_fields())
    }
}
