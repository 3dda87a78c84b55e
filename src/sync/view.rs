use crate::climate::ClimateReading;
use crate::error::{PanelError, Result};
use crate::geometry::Size;
use crate::registry::ZoneRegistry;

/// What part of the panel needs repainting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redraw {
    /// Background, header and every card; required after a layout pass.
    Full,
    /// One card by registry index.
    Card(usize),
    Header,
}

/// Redraw seam between the synchronizer and the display collaborator.
pub trait PanelView {
    fn redraw(&mut self, registry: &ZoneRegistry, request: Redraw) -> Result<()>;

    fn update_climate(&mut self, _reading: Option<ClimateReading>) {}

    fn resize(&mut self, _size: Size) {}
}

/// Records redraw requests instead of drawing. Test support.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub requests: Vec<Redraw>,
    pub climate: Option<ClimateReading>,
    pub fail: bool,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Vec<Redraw> {
        std::mem::take(&mut self.requests)
    }
}

impl PanelView for RecordingView {
    fn redraw(&mut self, _registry: &ZoneRegistry, request: Redraw) -> Result<()> {
        self.requests.push(request);
        if self.fail {
            return Err(PanelError::Surface("display offline".to_string()));
        }
        Ok(())
    }

    fn update_climate(&mut self, reading: Option<ClimateReading>) {
        self.climate = reading;
    }
}
