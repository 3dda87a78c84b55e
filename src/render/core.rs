use crate::climate::ClimateReading;
use crate::error::Result;
use crate::geometry::{Point, Rect, Size};
use crate::layout::GridSpec;
use crate::registry::{Zone, ZoneRegistry};
use crate::width::sanitize_label;

pub const EMPTY_MESSAGE: &str = "No zones configured";

/// Logical palette; each surface maps it onto its own colour space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Background,
    Header,
    HeaderRule,
    Shadow,
    CardOpen,
    CardClosed,
    BorderOpen,
    BorderClosed,
    DotOpen,
    DotClosed,
    Text,
    TextDim,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Large,
    Small,
}

const FONTS: [Font; 2] = [Font::Large, Font::Small];

/// Drawing capability provided by the display collaborator.
pub trait Surface {
    fn size(&self) -> Size;
    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<()>;
    fn stroke_rect(&mut self, rect: Rect, color: Color) -> Result<()>;
    fn fill_circle(&mut self, center: Point, radius: u16, color: Color) -> Result<()>;
    /// Draw `text` with its top-left corner at `origin`.
    fn draw_text(&mut self, origin: Point, text: &str, font: Font, fg: Color, bg: Color)
    -> Result<()>;
    fn text_width(&self, text: &str, font: Font) -> u16;
    fn line_height(&self, font: Font) -> u16;
    fn flush(&mut self) -> Result<()>;
    /// Called when the backing display changes size. Fixed panels ignore it.
    fn resize(&mut self, _size: Size) {}
}

/// Card decoration sizes, in surface units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardMetrics {
    pub dot_size: u16,
    pub dot_padding: u16,
    pub text_padding: u16,
    pub line_spacing: u16,
    pub shadow: u16,
    pub header_inset: u16,
}

impl CardMetrics {
    /// The 320x480 TFT panel.
    pub const fn pixels() -> Self {
        Self {
            dot_size: 10,
            dot_padding: 8,
            text_padding: 12,
            line_spacing: 8,
            shadow: 2,
            header_inset: 16,
        }
    }

    /// Terminal cells.
    pub const fn cells() -> Self {
        Self {
            dot_size: 1,
            dot_padding: 1,
            text_padding: 1,
            line_spacing: 0,
            shadow: 0,
            header_inset: 1,
        }
    }

    fn label_margin(&self) -> u16 {
        self.dot_padding
            .saturating_mul(2)
            .saturating_add(self.dot_size)
    }
}

/// How a zone name is laid out inside its card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelFit {
    TwoLines(Font, String, String),
    OneLine(Font, String),
    /// Nothing fits; smallest font, cut to the available width.
    Clipped(String),
}

/// Split at the first space onto two lines if both fit, otherwise one line,
/// trying the large font before the small one.
pub fn fit_label(surface: &dyn Surface, name: &str, max_width: u16, max_height: u16, spacing: u16)
-> LabelFit {
    if let Some((first, second)) = name.split_once(' ') {
        for font in FONTS {
            let line_h = surface.line_height(font);
            let widest = surface
                .text_width(first, font)
                .max(surface.text_width(second, font));
            let needed = line_h.saturating_mul(2).saturating_add(spacing);
            if widest <= max_width && needed <= max_height {
                return LabelFit::TwoLines(font, first.to_string(), second.to_string());
            }
        }
    }
    for font in FONTS {
        if surface.text_width(name, font) <= max_width {
            return LabelFit::OneLine(font, name.to_string());
        }
    }
    LabelFit::Clipped(clip_to_width(surface, name, max_width))
}

fn clip_to_width(surface: &dyn Surface, text: &str, max_width: u16) -> String {
    let mut clipped = String::new();
    for ch in text.chars() {
        clipped.push(ch);
        if surface.text_width(&clipped, Font::Small) > max_width {
            clipped.pop();
            break;
        }
    }
    clipped
}

/// Draws the header, the zone cards and the empty-state message.
#[derive(Debug, Clone)]
pub struct PanelRenderer {
    title: String,
    grid: GridSpec,
    metrics: CardMetrics,
}

impl PanelRenderer {
    pub fn new(title: impl Into<String>, grid: GridSpec, metrics: CardMetrics) -> Self {
        Self {
            title: title.into(),
            grid,
            metrics,
        }
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn draw_all(
        &self,
        surface: &mut dyn Surface,
        registry: &ZoneRegistry,
        climate: Option<ClimateReading>,
    ) -> Result<()> {
        let size = surface.size();
        surface.fill_rect(Rect::new(0, 0, size.width, size.height), Color::Background)?;
        self.draw_header(surface, climate)?;

        if registry.is_empty() {
            return self.draw_empty(surface);
        }
        for zone in registry.all() {
            self.draw_card(surface, zone)?;
        }
        Ok(())
    }

    pub fn draw_header(&self, surface: &mut dyn Surface, climate: Option<ClimateReading>) -> Result<()> {
        let size = surface.size();
        let height = self.grid.header_height.min(size.height);
        if height == 0 {
            return Ok(());
        }
        surface.fill_rect(Rect::new(0, 0, size.width, height), Color::Header)?;
        surface.fill_rect(Rect::new(0, height - 1, size.width, 1), Color::HeaderRule)?;

        let inset = self.metrics.header_inset;
        let text_y = inset.min(height - 1);
        surface.draw_text(
            Point::new(inset, text_y),
            &self.title,
            Font::Large,
            Color::Text,
            Color::Header,
        )?;

        if let Some(reading) = climate {
            let label = reading.label();
            let width = surface.text_width(&label, Font::Large);
            let x = size.width.saturating_sub(inset).saturating_sub(width);
            surface.draw_text(Point::new(x, text_y), &label, Font::Large, Color::Text, Color::Header)?;
        }
        Ok(())
    }

    pub fn draw_empty(&self, surface: &mut dyn Surface) -> Result<()> {
        let size = surface.size();
        let width = surface.text_width(EMPTY_MESSAGE, Font::Large);
        let line_h = surface.line_height(Font::Large);
        let origin = Point::new(
            size.width.saturating_sub(width) / 2,
            size.height.saturating_sub(line_h) / 2,
        );
        surface.draw_text(origin, EMPTY_MESSAGE, Font::Large, Color::TextDim, Color::Background)
    }

    /// Draw one card. Zones without a current rectangle are skipped.
    pub fn draw_card(&self, surface: &mut dyn Surface, zone: &Zone) -> Result<()> {
        let Some(rect) = zone.rect() else {
            return Ok(());
        };
        if rect.is_empty() {
            return Ok(());
        }
        let m = self.metrics;
        let open = zone.is_open();
        let (card, border, dot, text) = if open {
            (Color::CardOpen, Color::BorderOpen, Color::DotOpen, Color::Text)
        } else {
            (Color::CardClosed, Color::BorderClosed, Color::DotClosed, Color::TextDim)
        };

        if m.shadow > 0 {
            let shadow = Rect::new(
                rect.x.saturating_add(m.shadow),
                rect.y.saturating_add(m.shadow),
                rect.width,
                rect.height,
            );
            surface.fill_rect(shadow, Color::Shadow)?;
        }
        surface.fill_rect(rect, card)?;
        surface.stroke_rect(rect, border)?;

        let center_y = rect.y + rect.height / 2;
        let dot_center = Point::new(rect.x + m.dot_padding + m.dot_size / 2, center_y);
        surface.fill_circle(dot_center, m.dot_size / 2, dot)?;

        let margin = m.label_margin();
        let text_x = rect.x.saturating_add(margin);
        let max_width = rect.width.saturating_sub(margin).saturating_sub(m.text_padding);
        let max_height = rect.height.saturating_sub(m.text_padding.saturating_mul(2));
        let name = sanitize_label(zone.display_name());

        match fit_label(surface, &name, max_width, max_height, m.line_spacing) {
            LabelFit::TwoLines(font, first, second) => {
                let line_h = surface.line_height(font);
                let half_gap = m.line_spacing / 2;
                let top = center_y.saturating_sub(line_h + half_gap);
                surface.draw_text(Point::new(text_x, top), &first, font, text, card)?;
                surface.draw_text(
                    Point::new(text_x, center_y + half_gap),
                    &second,
                    font,
                    text,
                    card,
                )?;
            }
            LabelFit::OneLine(font, line) => {
                let top = center_y.saturating_sub(surface.line_height(font) / 2);
                surface.draw_text(Point::new(text_x, top), &line, font, text, card)?;
            }
            LabelFit::Clipped(line) => {
                let top = center_y.saturating_sub(surface.line_height(Font::Small) / 2);
                surface.draw_text(Point::new(text_x, top), &line, Font::Small, text, card)?;
            }
        }
        Ok(())
    }
}
