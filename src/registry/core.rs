use std::collections::HashMap;
use std::fmt;

use blake3::Hash;

use crate::error::{PanelError, Result};
use crate::geometry::Rect;

/// Identifier assigned to a zone by the remote system. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneId(u32);

impl ZoneId {
    pub const fn new(raw: u32) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ZoneId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u32::deserialize(deserializer)?;
        ZoneId::new(raw).ok_or_else(|| serde::de::Error::custom("zone id must be positive"))
    }
}

#[derive(Debug, Clone)]
pub struct Zone {
    id: ZoneId,
    display_name: String,
    is_open: bool,
    rect: Option<Rect>,
    drawn: Option<Hash>,
}

impl Zone {
    fn new(id: ZoneId, name: Option<&str>) -> Self {
        let display_name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => default_name(id),
        };
        Self {
            id,
            display_name,
            is_open: false,
            rect: None,
            drawn: None,
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Screen rectangle from the most recent layout pass, if still valid.
    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    fn fingerprint(&self) -> Hash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.display_name.as_bytes());
        hasher.update(&[self.is_open as u8]);
        if let Some(rect) = self.rect {
            for part in [rect.x, rect.y, rect.width, rect.height] {
                hasher.update(&part.to_le_bytes());
            }
        }
        hasher.finalize()
    }
}

pub fn default_name(id: ZoneId) -> String {
    format!("Zone {id}")
}

/// Result of [`ZoneRegistry::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upserted {
    pub index: usize,
    pub created: bool,
}

/// Zones in first-seen order, indexed by id.
///
/// Insertion order drives grid position, so a zone's card never moves once
/// placed. There is no removal path.
#[derive(Debug)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
    index: HashMap<ZoneId, usize>,
    layout_valid: bool,
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            index: HashMap::new(),
            layout_valid: true,
        }
    }
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an unknown zone or update the name of a known one.
    ///
    /// Empty names are treated as "not provided". Creating a zone invalidates
    /// every rectangle until the next [`apply_layout`](Self::apply_layout).
    pub fn upsert(&mut self, id: ZoneId, name: Option<&str>) -> Upserted {
        if let Some(&index) = self.index.get(&id) {
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                let zone = &mut self.zones[index];
                if zone.display_name != name {
                    zone.display_name = name.to_string();
                }
            }
            return Upserted {
                index,
                created: false,
            };
        }

        let index = self.zones.len();
        self.zones.push(Zone::new(id, name));
        self.index.insert(id, index);
        self.invalidate_layout();
        Upserted {
            index,
            created: true,
        }
    }

    /// Returns the zone index, or `None` (no-op) when the id is unknown.
    pub fn set_open(&mut self, id: ZoneId, value: bool) -> Option<usize> {
        let index = *self.index.get(&id)?;
        self.zones[index].is_open = value;
        Some(index)
    }

    /// Returns the zone index, or `None` for an unknown id or empty name.
    pub fn set_name(&mut self, id: ZoneId, name: &str) -> Option<usize> {
        if name.is_empty() {
            return None;
        }
        let index = *self.index.get(&id)?;
        self.zones[index].display_name = name.to_string();
        Some(index)
    }

    pub fn all(&self) -> &[Zone] {
        &self.zones
    }

    pub fn count(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }

    pub fn get_by_id(&self, id: ZoneId) -> Option<&Zone> {
        self.index_of(id).map(|index| &self.zones[index])
    }

    pub fn index_of(&self, id: ZoneId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Store the rectangles of a layout pass, one per zone in registry order.
    pub fn apply_layout(&mut self, rects: &[Rect]) -> Result<()> {
        if rects.len() != self.zones.len() {
            return Err(PanelError::LayoutMismatch {
                rects: rects.len(),
                zones: self.zones.len(),
            });
        }
        for (zone, rect) in self.zones.iter_mut().zip(rects) {
            zone.rect = Some(*rect);
        }
        self.layout_valid = true;
        Ok(())
    }

    pub fn layout_is_valid(&self) -> bool {
        self.layout_valid
    }

    /// Rectangles in registry order, or `None` while a layout pass is pending.
    pub fn layout_rects(&self) -> Option<Vec<Rect>> {
        if !self.layout_valid {
            return None;
        }
        self.zones.iter().map(|zone| zone.rect).collect()
    }

    pub fn invalidate_layout(&mut self) {
        self.layout_valid = false;
        for zone in &mut self.zones {
            zone.rect = None;
            zone.drawn = None;
        }
    }

    /// True when the card differs from what was last drawn.
    pub fn needs_redraw(&self, index: usize) -> bool {
        self.zones
            .get(index)
            .map(|zone| zone.drawn != Some(zone.fingerprint()))
            .unwrap_or(false)
    }

    pub fn mark_drawn(&mut self, index: usize) {
        if let Some(zone) = self.zones.get_mut(index) {
            zone.drawn = Some(zone.fingerprint());
        }
    }

    pub fn mark_all_drawn(&mut self) {
        for zone in &mut self.zones {
            zone.drawn = Some(zone.fingerprint());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ZoneId {
        ZoneId::new(raw).unwrap()
    }

    #[test]
    fn zone_id_rejects_zero() {
        assert!(ZoneId::new(0).is_none());
        assert_eq!(id(12).to_string(), "12");
    }

    #[test]
    fn upsert_appends_with_default_name() {
        let mut registry = ZoneRegistry::new();
        let first = registry.upsert(id(4), None);
        let second = registry.upsert(id(2), Some(""));
        assert_eq!(first, Upserted { index: 0, created: true });
        assert_eq!(second, Upserted { index: 1, created: true });
        assert_eq!(registry.all()[0].display_name(), "Zone 4");
        assert_eq!(registry.all()[1].display_name(), "Zone 2");
        assert!(!registry.all()[0].is_open());
    }

    #[test]
    fn upsert_existing_updates_name_in_place() {
        let mut registry = ZoneRegistry::new();
        registry.upsert(id(1), None);
        registry.upsert(id(2), None);
        let again = registry.upsert(id(1), Some("Lawn"));
        assert_eq!(again, Upserted { index: 0, created: false });
        assert_eq!(registry.count(), 2);
        assert_eq!(registry.get(0).unwrap().display_name(), "Lawn");

        registry.upsert(id(1), Some(""));
        assert_eq!(registry.get(0).unwrap().display_name(), "Lawn");
    }

    #[test]
    fn set_open_on_unknown_zone_is_noop() {
        let mut registry = ZoneRegistry::new();
        assert_eq!(registry.set_open(id(9), true), None);
        assert_eq!(registry.set_name(id(9), "Ghost"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn new_zone_invalidates_layout() {
        let mut registry = ZoneRegistry::new();
        registry.upsert(id(1), None);
        assert!(registry.layout_rects().is_none());
        registry.apply_layout(&[Rect::new(0, 0, 5, 5)]).unwrap();
        assert_eq!(registry.layout_rects(), Some(vec![Rect::new(0, 0, 5, 5)]));

        registry.upsert(id(1), Some("Same zone"));
        assert!(registry.layout_is_valid());

        registry.upsert(id(3), None);
        assert!(registry.layout_rects().is_none());
        assert!(registry.get(0).unwrap().rect().is_none());
    }

    #[test]
    fn apply_layout_rejects_wrong_length() {
        let mut registry = ZoneRegistry::new();
        registry.upsert(id(1), None);
        let err = registry.apply_layout(&[]).unwrap_err();
        assert!(matches!(err, PanelError::LayoutMismatch { rects: 0, zones: 1 }));
    }

    #[test]
    fn fingerprint_tracks_drawn_state() {
        let mut registry = ZoneRegistry::new();
        registry.upsert(id(1), None);
        registry.apply_layout(&[Rect::new(0, 0, 5, 5)]).unwrap();
        assert!(registry.needs_redraw(0));
        registry.mark_drawn(0);
        assert!(!registry.needs_redraw(0));

        registry.set_open(id(1), true);
        assert!(registry.needs_redraw(0));
        registry.mark_drawn(0);

        registry.set_open(id(1), true);
        assert!(!registry.needs_redraw(0));
    }
}
