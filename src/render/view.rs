use crate::climate::ClimateReading;
use crate::error::Result;
use crate::geometry::Size;
use crate::registry::ZoneRegistry;
use crate::sync::{PanelView, Redraw};

use super::core::{PanelRenderer, Surface};

/// Binds a [`PanelRenderer`] to a concrete [`Surface`] and keeps the last
/// climate reading for header repaints.
pub struct SurfaceView<S: Surface> {
    surface: S,
    renderer: PanelRenderer,
    climate: Option<ClimateReading>,
}

impl<S: Surface> SurfaceView<S> {
    pub fn new(surface: S, renderer: PanelRenderer) -> Self {
        Self {
            surface,
            renderer,
            climate: None,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn climate(&self) -> Option<ClimateReading> {
        self.climate
    }

    pub fn into_surface(self) -> S {
        self.surface
    }
}

impl<S: Surface> PanelView for SurfaceView<S> {
    fn redraw(&mut self, registry: &ZoneRegistry, request: Redraw) -> Result<()> {
        match request {
            Redraw::Full => self.renderer.draw_all(&mut self.surface, registry, self.climate)?,
            Redraw::Card(index) => {
                if let Some(zone) = registry.get(index) {
                    self.renderer.draw_card(&mut self.surface, zone)?;
                }
            }
            Redraw::Header => self.renderer.draw_header(&mut self.surface, self.climate)?,
        }
        self.surface.flush()
    }

    fn update_climate(&mut self, reading: Option<ClimateReading>) {
        self.climate = reading;
    }

    fn resize(&mut self, size: Size) {
        self.surface.resize(size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::layout::GridSpec;
    use crate::registry::ZoneId;
    use crate::render::{AnsiSurface, CardMetrics};

    fn terminal_view() -> SurfaceView<AnsiSurface<Vec<u8>>> {
        let grid = GridSpec {
            header_height: 3,
            padding: 1,
        };
        let renderer = PanelRenderer::new("Zones", grid, CardMetrics::cells());
        SurfaceView::new(AnsiSurface::new(Vec::new(), Size::new(60, 20)), renderer)
    }

    fn drain(view: &mut SurfaceView<AnsiSurface<Vec<u8>>>) -> String {
        let bytes = std::mem::take(view.surface_mut().writer_mut());
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn full_redraw_paints_header_and_cards() {
        let mut registry = ZoneRegistry::new();
        registry.upsert(ZoneId::new(3).unwrap(), Some("Herbs"));
        registry.apply_layout(&[Rect::new(1, 4, 28, 15)]).unwrap();

        let mut view = terminal_view();
        view.redraw(&registry, Redraw::Full).unwrap();
        let out = drain(&mut view);
        assert!(out.contains("Zones"));
        assert!(out.contains("Herbs"));
    }

    #[test]
    fn header_redraw_uses_latest_climate() {
        let registry = ZoneRegistry::new();
        let mut view = terminal_view();
        view.update_climate(ClimateReading::new(18.3, 55.0));
        view.redraw(&registry, Redraw::Header).unwrap();
        assert!(drain(&mut view).contains("18.3°C  55%"));

        view.update_climate(None);
        view.redraw(&registry, Redraw::Header).unwrap();
        assert!(!drain(&mut view).contains("°C"));
    }

    #[test]
    fn card_redraw_for_unknown_index_is_a_no_op() {
        let registry = ZoneRegistry::new();
        let mut view = terminal_view();
        view.redraw(&registry, Redraw::Card(4)).unwrap();
        assert!(drain(&mut view).is_empty());
    }

    #[test]
    fn resize_reaches_the_surface() {
        let mut view = terminal_view();
        view.resize(Size::new(100, 30));
        assert_eq!(view.surface().size(), Size::new(100, 30));
    }
}
