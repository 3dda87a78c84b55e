use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::bus::MessageBus;
use crate::config::ZoneSeed;
use crate::geometry::Size;
use crate::layout::GridSpec;
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::metrics::PanelMetrics;
use crate::registry::{Upserted, ZoneId, ZoneRegistry};
use crate::topics::{TopicRouter, ZoneChange, ZoneUpdate, command_payload};
use crate::touch::{TouchGate, TouchSample, TouchTransform, resolve};

use super::view::{PanelView, Redraw};

const TARGET: &str = "zone_panel::sync";

/// A touch-driven toggle that was applied locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggle {
    pub index: usize,
    pub zone_id: ZoneId,
    pub open: bool,
    /// False when the outbound command could not be handed to the bus.
    pub published: bool,
}

/// Owns the zone registry and applies both remote updates and local touches.
///
/// Remote state and local toggles share one mutation path and the last write
/// wins: an echo that arrives after an optimistic toggle overrides it, and a
/// failed publish is not rolled back.
pub struct StateSynchronizer {
    registry: ZoneRegistry,
    router: TopicRouter,
    grid: GridSpec,
    surface: Size,
    transform: TouchTransform,
    gate: TouchGate,
    logger: Option<Logger>,
    metrics: Option<Arc<Mutex<PanelMetrics>>>,
}

impl StateSynchronizer {
    pub fn new(router: TopicRouter, grid: GridSpec, surface: Size, transform: TouchTransform) -> Self {
        Self {
            registry: ZoneRegistry::new(),
            router,
            grid,
            surface,
            transform,
            gate: TouchGate::default(),
            logger: None,
            metrics: None,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Mutex<PanelMetrics>>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn router(&self) -> &TopicRouter {
        &self.router
    }

    pub fn gate(&self) -> TouchGate {
        self.gate
    }

    pub fn surface(&self) -> Size {
        self.surface
    }

    pub fn transform(&self) -> TouchTransform {
        self.transform
    }

    /// Replace the touch orientation, e.g. when the sensor extent changes.
    pub fn set_transform(&mut self, transform: TouchTransform) {
        self.transform = transform;
    }

    /// Register zones known from configuration before any message arrives.
    /// Returns whether any zone was created.
    pub fn seed(&mut self, seeds: &[ZoneSeed], view: &mut dyn PanelView) -> bool {
        let mut created = false;
        for seed in seeds {
            created |= self.registry.upsert(seed.id, seed.name.as_deref()).created;
        }
        if created {
            self.log(
                LogLevel::Info,
                "zones_seeded",
                [json_kv("count", json!(self.registry.count()))],
            );
            self.relayout();
            self.dispatch(view, Redraw::Full);
        }
        created
    }

    /// Lay out and repaint everything, e.g. at boot.
    pub fn refresh(&mut self, view: &mut dyn PanelView) {
        self.relayout();
        self.dispatch(view, Redraw::Full);
    }

    pub fn resize(&mut self, surface: Size, view: &mut dyn PanelView) {
        self.surface = surface;
        self.log(
            LogLevel::Info,
            "surface_resized",
            [
                json_kv("width", json!(surface.width)),
                json_kv("height", json!(surface.height)),
            ],
        );
        self.refresh(view);
    }

    /// Parse an inbound bus message and apply it. Malformed topics are
    /// logged and dropped without touching the registry.
    pub fn handle_message(
        &mut self,
        topic: &str,
        payload: &[u8],
        view: &mut dyn PanelView,
    ) -> Option<ZoneUpdate> {
        match self.router.classify(topic, payload) {
            Ok(update) => {
                self.record(|m| m.record_inbound(true));
                self.apply_remote(update.clone(), view);
                Some(update)
            }
            Err(reason) => {
                self.record(|m| m.record_inbound(false));
                self.log(
                    LogLevel::Debug,
                    "message_ignored",
                    [
                        json_kv("topic", json!(topic)),
                        json_kv("reason", json!(reason.to_string())),
                    ],
                );
                None
            }
        }
    }

    /// Apply an authoritative update from the bus.
    ///
    /// The zone is upserted first so it always exists before the field is
    /// applied. A first sighting changes the zone count and forces a full
    /// layout pass; otherwise only the zone's card is repainted.
    pub fn apply_remote(&mut self, update: ZoneUpdate, view: &mut dyn PanelView) {
        let id = update.zone_id;
        let Upserted { index, created } = self.registry.upsert(id, update.name_hint());

        match &update.change {
            ZoneChange::State(open) => {
                self.registry.set_open(id, *open);
            }
            ZoneChange::Name(Some(name)) => {
                self.registry.set_name(id, name);
            }
            ZoneChange::Name(None) => {}
        }

        self.log(
            LogLevel::Debug,
            "zone_updated",
            [
                json_kv("zone", json!(id.get())),
                json_kv("field", json!(update.field().to_string())),
                json_kv("created", json!(created)),
            ],
        );

        if created {
            self.log(
                LogLevel::Info,
                "zone_added",
                [
                    json_kv("zone", json!(id.get())),
                    json_kv("zones", json!(self.registry.count())),
                ],
            );
            self.relayout();
            self.dispatch(view, Redraw::Full);
        } else {
            self.dispatch(view, Redraw::Card(index));
        }
    }

    /// Handle one touch sample.
    ///
    /// A press that lands on a card flips the zone locally, repaints the card
    /// and then publishes the command. The gate then swallows samples until
    /// the sensor reports a release, so holding a finger down toggles once.
    pub fn handle_touch(
        &mut self,
        sample: TouchSample,
        bus: &mut dyn MessageBus,
        view: &mut dyn PanelView,
    ) -> Option<Toggle> {
        let point = self.gate.admit(sample)?;
        self.record(PanelMetrics::record_touch);

        if !self.registry.layout_is_valid() {
            self.refresh(view);
        }
        let rects = self.registry.layout_rects()?;
        let Some(index) = resolve(point, &self.transform, &rects) else {
            self.log(
                LogLevel::Debug,
                "touch_missed",
                [json_kv("x", json!(point.x)), json_kv("y", json!(point.y))],
            );
            return None;
        };

        let zone = self.registry.get(index)?;
        let zone_id = zone.id();
        let open = !zone.is_open();
        self.registry.set_open(zone_id, open);
        self.dispatch(view, Redraw::Card(index));

        let topic = self.router.command_topic(zone_id);
        let published = match bus.publish(&topic, command_payload(open).as_bytes()) {
            Ok(()) => true,
            Err(err) => {
                self.record(PanelMetrics::record_publish_failure);
                self.log(
                    LogLevel::Warn,
                    "publish_failed",
                    [
                        json_kv("topic", json!(topic)),
                        json_kv("error", json!(err.to_string())),
                    ],
                );
                false
            }
        };

        self.gate.hold();
        self.record(PanelMetrics::record_toggle);
        self.log(
            LogLevel::Info,
            "zone_toggled",
            [
                json_kv("zone", json!(zone_id.get())),
                json_kv("open", json!(open)),
                json_kv("published", json!(published)),
            ],
        );

        Some(Toggle {
            index,
            zone_id,
            open,
            published,
        })
    }

    fn relayout(&mut self) {
        let rects = self.grid.layout(self.registry.count(), self.surface);
        match self.registry.apply_layout(&rects) {
            Ok(()) => self.record(PanelMetrics::record_layout_pass),
            Err(err) => self.log(
                LogLevel::Error,
                "layout_failed",
                [json_kv("error", json!(err.to_string()))],
            ),
        }
    }

    fn dispatch(&mut self, view: &mut dyn PanelView, request: Redraw) {
        if let Redraw::Card(index) = request {
            if !self.registry.needs_redraw(index) {
                return;
            }
        }

        if let Err(err) = view.redraw(&self.registry, request) {
            self.log(
                LogLevel::Warn,
                "redraw_failed",
                [json_kv("error", json!(err.to_string()))],
            );
            return;
        }

        match request {
            Redraw::Full => {
                self.registry.mark_all_drawn();
                self.record(PanelMetrics::record_full_redraw);
            }
            Redraw::Card(index) => {
                self.registry.mark_drawn(index);
                self.record(PanelMetrics::record_card_redraw);
            }
            Redraw::Header => {}
        }
    }

    fn record(&self, update: impl FnOnce(&mut PanelMetrics)) {
        if let Some(metrics) = self.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                update(&mut *guard);
            }
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        emit(self.logger.as_ref(), level, TARGET, message, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusMessage, MemoryBus};
    use crate::geometry::{Point, Rect};
    use crate::logging::MemorySink;
    use crate::sync::RecordingView;
    use crate::touch::Orientation;

    const PANEL: Size = Size::new(320, 480);

    fn id(raw: u32) -> ZoneId {
        ZoneId::new(raw).unwrap()
    }

    fn synchronizer() -> StateSynchronizer {
        StateSynchronizer::new(
            TopicRouter::new("zone-controller"),
            GridSpec::default(),
            PANEL,
            TouchTransform::identity(PANEL),
        )
    }

    fn connected_bus() -> MemoryBus {
        let mut bus = MemoryBus::new();
        bus.connect().unwrap();
        bus
    }

    #[test]
    fn first_sighting_triggers_full_layout() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        sync.handle_message("zone-controller/zone5/state", b"ON", &mut view);

        assert_eq!(view.take(), vec![Redraw::Full]);
        let zone = sync.registry().get_by_id(id(5)).unwrap();
        assert!(zone.is_open());
        assert_eq!(zone.display_name(), "Zone 5");
        assert_eq!(zone.rect(), Some(Rect::new(6, 54, 151, 420)));
    }

    #[test]
    fn known_zone_update_repaints_only_its_card() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        sync.handle_message("zone-controller/zone1/state", b"OFF", &mut view);
        sync.handle_message("zone-controller/zone2/state", b"OFF", &mut view);
        view.take();

        sync.handle_message("zone-controller/zone2/state", b"ON", &mut view);
        assert_eq!(view.take(), vec![Redraw::Card(1)]);

        // Same state again: nothing changed on screen.
        sync.handle_message("zone-controller/zone2/state", b"ON", &mut view);
        assert!(view.take().is_empty());
    }

    #[test]
    fn name_message_creates_named_zone() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        sync.handle_message("zone-controller/zone3/name", b"Kitchen", &mut view);
        let zone = sync.registry().get_by_id(id(3)).unwrap();
        assert_eq!(zone.display_name(), "Kitchen");
        assert!(!zone.is_open());

        sync.handle_message("zone-controller/zone3/name", b"", &mut view);
        assert_eq!(
            sync.registry().get_by_id(id(3)).unwrap().display_name(),
            "Kitchen"
        );
    }

    #[test]
    fn malformed_message_is_logged_and_ignored() {
        let sink = MemorySink::new();
        let metrics = Arc::new(Mutex::new(PanelMetrics::new()));
        let mut sync = synchronizer()
            .with_logger(Logger::new(sink.clone()))
            .with_metrics(metrics.clone());
        let mut view = RecordingView::new();

        assert!(sync.handle_message("zone-controller/zoneX/state", b"ON", &mut view).is_none());
        assert!(sync.registry().is_empty());
        assert!(view.requests.is_empty());
        assert_eq!(sink.messages(), vec!["message_ignored".to_string()]);
        let snapshot = metrics.lock().unwrap().snapshot(std::time::Duration::ZERO);
        assert_eq!(snapshot.rejected_messages, 1);
    }

    #[test]
    fn touch_toggles_publishes_and_waits_for_release() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        let mut bus = connected_bus();
        sync.handle_message("zone-controller/zone1/state", b"OFF", &mut view);
        sync.handle_message("zone-controller/zone7/state", b"ON", &mut view);
        view.take();

        // Right column, first row: zone 7.
        let toggle = sync
            .handle_touch(TouchSample::pressed(200, 100), &mut bus, &mut view)
            .unwrap();
        assert_eq!(
            toggle,
            Toggle {
                index: 1,
                zone_id: id(7),
                open: false,
                published: true
            }
        );
        assert!(!sync.registry().get(1).unwrap().is_open());
        assert_eq!(view.take(), vec![Redraw::Card(1)]);
        assert_eq!(
            bus.take_published(),
            vec![BusMessage::new("zone-controller/zone7/set", "OFF")]
        );

        // Still held: no further toggles.
        assert!(sync.handle_touch(TouchSample::pressed(200, 100), &mut bus, &mut view).is_none());
        assert!(sync.handle_touch(TouchSample::pressed(20, 100), &mut bus, &mut view).is_none());
        assert!(bus.published().is_empty());

        sync.handle_touch(TouchSample::released(), &mut bus, &mut view);
        let again = sync
            .handle_touch(TouchSample::pressed(200, 100), &mut bus, &mut view)
            .unwrap();
        assert!(again.open);
        assert_eq!(
            bus.take_published(),
            vec![BusMessage::new("zone-controller/zone7/set", "ON")]
        );
    }

    #[test]
    fn touch_outside_cards_does_nothing_and_does_not_hold() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        let mut bus = connected_bus();
        sync.handle_message("zone-controller/zone1/state", b"OFF", &mut view);
        view.take();

        assert!(sync.handle_touch(TouchSample::pressed(160, 10), &mut bus, &mut view).is_none());
        assert!(!sync.gate().is_holding());
        assert!(bus.published().is_empty());
        assert!(view.requests.is_empty());
    }

    #[test]
    fn touch_on_empty_registry_is_noop() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        let mut bus = connected_bus();
        assert!(sync.handle_touch(TouchSample::pressed(50, 100), &mut bus, &mut view).is_none());
        assert!(bus.published().is_empty());
    }

    #[test]
    fn failed_publish_keeps_optimistic_state() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        let mut bus = connected_bus();
        bus.fail_publishes(true);
        sync.handle_message("zone-controller/zone1/state", b"OFF", &mut view);

        let toggle = sync
            .handle_touch(TouchSample::pressed(20, 100), &mut bus, &mut view)
            .unwrap();
        assert!(!toggle.published);
        assert!(sync.registry().get(0).unwrap().is_open());
    }

    #[test]
    fn late_echo_overrides_local_toggle() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        let mut bus = connected_bus();
        sync.handle_message("zone-controller/zone1/state", b"ON", &mut view);

        sync.handle_touch(TouchSample::pressed(20, 100), &mut bus, &mut view);
        assert!(!sync.registry().get(0).unwrap().is_open());

        sync.handle_message("zone-controller/zone1/state", b"ON", &mut view);
        assert!(sync.registry().get(0).unwrap().is_open());
    }

    #[test]
    fn command_uses_zone_id_not_grid_position() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        let mut bus = connected_bus();
        sync.handle_message("zone-controller/zone12/name", b"Hedge", &mut view);

        sync.handle_touch(TouchSample::pressed(20, 100), &mut bus, &mut view);
        assert_eq!(bus.published()[0].topic, "zone-controller/zone12/set");
    }

    #[test]
    fn orientation_is_applied_before_hit_test() {
        let mut sync = StateSynchronizer::new(
            TopicRouter::new("zone-controller"),
            GridSpec::default(),
            PANEL,
            TouchTransform::new(Orientation::Rotate180, PANEL),
        );
        let mut view = RecordingView::new();
        let mut bus = connected_bus();
        sync.handle_message("zone-controller/zone1/state", b"OFF", &mut view);
        sync.handle_message("zone-controller/zone2/state", b"OFF", &mut view);

        // Raw (300, 400) becomes (20, 80): zone 1 in the left column.
        let toggle = sync
            .handle_touch(TouchSample::pressed(300, 400), &mut bus, &mut view)
            .unwrap();
        assert_eq!(toggle.zone_id, id(1));
    }

    #[test]
    fn seeding_and_resize_relayout() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        let seeds = vec![
            ZoneSeed {
                id: id(2),
                name: Some("Roses".into()),
            },
            ZoneSeed { id: id(4), name: None },
        ];
        assert!(sync.seed(&seeds, &mut view));
        assert_eq!(view.take(), vec![Redraw::Full]);
        assert_eq!(sync.registry().count(), 2);
        assert!(!sync.seed(&seeds, &mut view));
        assert!(view.take().is_empty());
        assert_eq!(sync.registry().all()[0].display_name(), "Roses");

        sync.resize(Size::new(400, 300), &mut view);
        assert_eq!(view.take(), vec![Redraw::Full]);
        let rect = sync.registry().all()[1].rect().unwrap();
        assert_eq!(rect, Rect::new(203, 54, 191, 240));
        assert!(rect.right() <= 400 && rect.bottom() <= 300);
        assert!(rect.contains(Point::new(rect.x, rect.y)));
    }

    #[test]
    fn failed_redraw_is_retried_on_next_change() {
        let mut sync = synchronizer();
        let mut view = RecordingView::new();
        sync.handle_message("zone-controller/zone1/state", b"OFF", &mut view);
        view.take();

        view.fail = true;
        sync.handle_message("zone-controller/zone1/name", b"Beds", &mut view);
        assert_eq!(view.take(), vec![Redraw::Card(0)]);

        view.fail = false;
        sync.handle_message("zone-controller/zone1/name", b"Beds", &mut view);
        assert_eq!(view.take(), vec![Redraw::Card(0)]);
    }
}
