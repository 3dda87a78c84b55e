use std::io::Write;

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{self, Print, ResetColor, SetBackgroundColor, SetForegroundColor};

use crate::error::Result;
use crate::geometry::{Point, Rect, Size};
use crate::width::{display_width, truncate_to_width};

use super::core::{Color, Font, Surface};

/// Terminal surface: one unit is one character cell.
pub struct AnsiSurface<W: Write> {
    writer: W,
    size: Size,
}

impl<W: Write> AnsiSurface<W> {
    pub fn new(writer: W, size: Size) -> Self {
        Self { writer, size }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Clip a rectangle to the visible area.
    fn visible(&self, rect: Rect) -> Rect {
        let x = rect.x.min(self.size.width);
        let y = rect.y.min(self.size.height);
        let width = rect.right().min(self.size.width) - x;
        let height = rect.bottom().min(self.size.height) - y;
        Rect::new(x, y, width, height)
    }

    fn put(&mut self, x: u16, y: u16, text: &str, fg: Color, bg: Color) -> Result<()> {
        queue!(
            self.writer,
            MoveTo(x, y),
            SetForegroundColor(rgb(fg)),
            SetBackgroundColor(rgb(bg)),
            Print(text),
            ResetColor
        )?;
        Ok(())
    }
}

fn rgb(color: Color) -> style::Color {
    let (r, g, b) = match color {
        Color::Background => (0, 0, 0),
        Color::Header => (16, 40, 48),
        Color::HeaderRule | Color::BorderClosed => (0, 124, 124),
        Color::Shadow => (0, 0, 0),
        Color::CardOpen => (24, 48, 64),
        Color::CardClosed => (16, 16, 16),
        Color::BorderOpen => (0, 255, 255),
        Color::DotOpen => (0, 252, 0),
        Color::DotClosed => (248, 0, 0),
        Color::Text => (255, 255, 255),
        Color::TextDim => (128, 128, 128),
    };
    style::Color::Rgb { r, g, b }
}

impl<W: Write> Surface for AnsiSurface<W> {
    fn size(&self) -> Size {
        self.size
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<()> {
        let rect = self.visible(rect);
        if rect.is_empty() {
            return Ok(());
        }
        let blank = " ".repeat(usize::from(rect.width));
        for row in rect.y..rect.bottom() {
            self.put(rect.x, row, &blank, color, color)?;
        }
        Ok(())
    }

    /// Box-drawing border, only when the card is tall enough to keep a
    /// label row free of it.
    fn stroke_rect(&mut self, rect: Rect, color: Color) -> Result<()> {
        let rect = self.visible(rect);
        if rect.width < 2 || rect.height < 3 {
            return Ok(());
        }
        let inner = usize::from(rect.width - 2);
        let top = format!("┌{}┐", "─".repeat(inner));
        let bottom = format!("└{}┘", "─".repeat(inner));
        self.put(rect.x, rect.y, &top, color, Color::Background)?;
        for row in rect.y + 1..rect.bottom() - 1 {
            self.put(rect.x, row, "│", color, Color::Background)?;
            self.put(rect.right() - 1, row, "│", color, Color::Background)?;
        }
        self.put(rect.x, rect.bottom() - 1, &bottom, color, Color::Background)
    }

    fn fill_circle(&mut self, center: Point, _radius: u16, color: Color) -> Result<()> {
        if center.x >= self.size.width || center.y >= self.size.height {
            return Ok(());
        }
        self.put(center.x, center.y, "●", color, Color::Background)
    }

    fn draw_text(&mut self, origin: Point, text: &str, _font: Font, fg: Color, bg: Color)
    -> Result<()> {
        if origin.x >= self.size.width || origin.y >= self.size.height {
            return Ok(());
        }
        let room = usize::from(self.size.width - origin.x);
        let text = truncate_to_width(text, room);
        self.put(origin.x, origin.y, &text, fg, bg)
    }

    fn text_width(&self, text: &str, _font: Font) -> u16 {
        u16::try_from(display_width(text)).unwrap_or(u16::MAX)
    }

    fn line_height(&self, _font: Font) -> u16 {
        1
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(surface: AnsiSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.into_inner()).unwrap()
    }

    #[test]
    fn draw_text_positions_cursor_one_based() {
        let mut surface = AnsiSurface::new(Vec::new(), Size::new(40, 10));
        surface
            .draw_text(Point::new(2, 3), "Lawn", Font::Large, Color::Text, Color::CardOpen)
            .unwrap();
        let rendered = output(surface);
        assert!(rendered.contains("\u{1b}[4;3H"));
        assert!(rendered.contains("Lawn"));
    }

    #[test]
    fn text_is_clipped_at_right_edge() {
        let mut surface = AnsiSurface::new(Vec::new(), Size::new(6, 2));
        surface
            .draw_text(Point::new(3, 0), "Orchard", Font::Small, Color::Text, Color::Background)
            .unwrap();
        let rendered = output(surface);
        assert!(rendered.contains("Orc"));
        assert!(!rendered.contains("Orch"));
    }

    #[test]
    fn fill_outside_surface_writes_nothing() {
        let mut surface = AnsiSurface::new(Vec::new(), Size::new(10, 5));
        surface.fill_rect(Rect::new(20, 20, 5, 5), Color::CardOpen).unwrap();
        assert!(output(surface).is_empty());
    }

    #[test]
    fn width_counts_cells() {
        let surface = AnsiSurface::new(Vec::new(), Size::new(10, 5));
        assert_eq!(surface.text_width("Zone 12", Font::Large), 7);
        assert_eq!(surface.line_height(Font::Small), 1);
    }
}
