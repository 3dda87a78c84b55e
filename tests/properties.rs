use std::collections::HashSet;

use proptest::prelude::*;
use zone_panel::topics::ZoneChange;
use zone_panel::{
    Orientation, Point, Rect, Size, TopicRouter, TouchTransform, ZoneId, ZoneRegistry,
    compute_layout, resolve,
};

fn zone_ids() -> impl Strategy<Value = Vec<u32>> {
    proptest::collection::vec(1u32..40, 0..60)
}

proptest! {
    #[test]
    fn upsert_keeps_one_zone_per_id_in_first_seen_order(ids in zone_ids()) {
        let mut registry = ZoneRegistry::new();
        for raw in &ids {
            registry.upsert(ZoneId::new(*raw).unwrap(), None);
        }

        let mut seen = HashSet::new();
        let expected: Vec<u32> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        let actual: Vec<u32> = registry.all().iter().map(|zone| zone.id().get()).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn repeated_upsert_is_idempotent(
        seeded in zone_ids(),
        raw in 1u32..1000,
        name in "[A-Za-z ]{1,12}",
    ) {
        let mut registry = ZoneRegistry::new();
        for other in &seeded {
            registry.upsert(ZoneId::new(*other).unwrap(), Some(&format!("Bed {other}")));
        }
        let id = ZoneId::new(raw).unwrap();
        let first = registry.upsert(id, Some(&name));
        let snapshot: Vec<(u32, String)> = registry
            .all()
            .iter()
            .map(|zone| (zone.id().get(), zone.display_name().to_string()))
            .collect();

        let again = registry.upsert(id, Some(&name));
        prop_assert!(!again.created);
        prop_assert_eq!(first.index, again.index);
        let after: Vec<(u32, String)> = registry
            .all()
            .iter()
            .map(|zone| (zone.id().get(), zone.display_name().to_string()))
            .collect();
        prop_assert_eq!(after, snapshot);
        prop_assert_eq!(registry.all()[again.index].display_name(), name.as_str());
    }

    #[test]
    fn layout_rects_never_overlap(
        count in 0usize..120,
        width in 0u16..2000,
        height in 0u16..2000,
        header in 0u16..100,
        padding in 0u16..20,
    ) {
        let rects = compute_layout(count, Size::new(width, height), header, padding);
        prop_assert_eq!(rects.len(), count);
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                prop_assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn interior_points_resolve_to_their_card(
        count in 1usize..24,
        width in 100u16..1200,
        height in 200u16..1200,
    ) {
        let surface = Size::new(width, height);
        let rects = compute_layout(count, surface, 48, 6);
        let identity = TouchTransform::identity(surface);
        for (index, rect) in rects.iter().enumerate().filter(|(_, r)| !r.is_empty()) {
            let corner = Point::new(rect.x, rect.y);
            let far = Point::new(rect.right() - 1, rect.bottom() - 1);
            prop_assert_eq!(resolve(corner, &identity, &rects), Some(index));
            prop_assert_eq!(resolve(far, &identity, &rects), Some(index));
        }
    }

    #[test]
    fn header_and_gutter_points_resolve_to_nothing(
        count in 1usize..24,
        x in 0u16..320,
        y in 0u16..48,
    ) {
        let surface = Size::new(320, 480);
        let rects = compute_layout(count, surface, 48, 6);
        let identity = TouchTransform::identity(surface);
        prop_assert_eq!(resolve(Point::new(x, y), &identity, &rects), None);
        // Left gutter and the gap between the two columns.
        prop_assert_eq!(resolve(Point::new(3, 100), &identity, &rects), None);
        prop_assert_eq!(resolve(Point::new(160, 100), &identity, &rects), None);
    }

    #[test]
    fn rotated_touch_matches_mirrored_point(
        count in 1usize..16,
        x in 0u16..=320,
        y in 0u16..=480,
    ) {
        let surface = Size::new(320, 480);
        let rects = compute_layout(count, surface, 48, 6);
        let rotated = TouchTransform::new(Orientation::Rotate180, surface);
        let identity = TouchTransform::identity(surface);
        prop_assert_eq!(
            resolve(Point::new(x, y), &rotated, &rects),
            resolve(Point::new(320 - x, 480 - y), &identity, &rects)
        );
    }

    #[test]
    fn non_numeric_zone_segments_are_rejected(segment in "[a-zA-Z]{1,6}") {
        let router = TopicRouter::new("zone-controller");
        let topic = format!("zone-controller/zone{segment}/state");
        prop_assert!(router.parse(&topic, b"ON").is_none());
    }

    #[test]
    fn state_topics_round_trip_through_the_router(raw in 1u32..10_000, open in any::<bool>()) {
        let router = TopicRouter::new("zone-controller");
        let id = ZoneId::new(raw).unwrap();
        let payload: &[u8] = if open { b"ON" } else { b"OFF" };
        let update = router.parse(&router.state_topic(id), payload).unwrap();
        prop_assert_eq!(update.zone_id, id);
        prop_assert_eq!(update.change, ZoneChange::State(open));
    }
}

#[test]
fn zero_zones_lay_out_nothing() {
    assert!(compute_layout(0, Size::new(320, 480), 48, 6).is_empty());
    assert_eq!(
        compute_layout(1, Size::new(320, 480), 48, 6),
        vec![Rect::new(6, 54, 151, 420)]
    );
}
