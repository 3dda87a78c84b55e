//! Fixed two-column card grid.
//!
//! Cards fill the area below the header. Every pass is a pure function of
//! `(zone count, surface size, header height, padding)`, so the rectangles
//! for index `i` only change when the zone count or the surface changes.
//!
//! ```
//! use zone_panel::layout::compute_layout;
//! use zone_panel::{Rect, Size};
//!
//! let rects = compute_layout(3, Size::new(320, 480), 48, 6);
//! assert_eq!(rects[0], Rect::new(6, 54, 151, 207));
//! assert_eq!(rects[1], Rect::new(163, 54, 151, 207));
//! assert_eq!(rects[2], Rect::new(6, 267, 151, 207));
//! ```

use crate::geometry::{Rect, Size};

/// Number of card columns.
pub const GRID_COLUMNS: usize = 2;

/// Header and spacing constants shared by the layout and the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub header_height: u16,
    pub padding: u16,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            header_height: 48,
            padding: 6,
        }
    }
}

impl GridSpec {
    pub fn layout(&self, zone_count: usize, surface: Size) -> Vec<Rect> {
        compute_layout(zone_count, surface, self.header_height, self.padding)
    }

    /// Area below the header, used for the empty-state message.
    pub fn body(&self, surface: Size) -> Rect {
        let top = self.header_height.min(surface.height);
        Rect::new(0, top, surface.width, surface.height - top)
    }
}

/// Compute one rectangle per zone index.
///
/// Produces nothing for zero zones. A surface too small for the requested
/// grid yields zero-sized cards rather than wrapping arithmetic.
pub fn compute_layout(
    zone_count: usize,
    surface: Size,
    header_height: u16,
    padding: u16,
) -> Vec<Rect> {
    if zone_count == 0 {
        return Vec::new();
    }

    let columns = GRID_COLUMNS as u64;
    let count = zone_count as u64;
    let rows = count.div_ceil(columns);
    let pad = u64::from(padding);

    let card_w = u64::from(surface.width).saturating_sub((columns + 1) * pad) / columns;
    let card_h = u64::from(surface.height)
        .saturating_sub(u64::from(header_height))
        .saturating_sub((rows + 1) * pad)
        / rows;

    (0..count)
        .map(|i| {
            let row = i / columns;
            let col = i % columns;
            let x = pad + col * (card_w + pad);
            let y = u64::from(header_height) + pad + row * (card_h + pad);
            Rect::new(clamp(x), clamp(y), clamp(card_w), clamp(card_h))
        })
        .collect()
}

fn clamp(value: u64) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_zones_produce_no_rects() {
        assert!(compute_layout(0, Size::new(320, 480), 48, 6).is_empty());
    }

    #[test]
    fn single_zone_occupies_left_column_full_height() {
        let rects = compute_layout(1, Size::new(320, 480), 48, 6);
        assert_eq!(rects, vec![Rect::new(6, 54, 151, 420)]);
    }

    #[test]
    fn sixteen_zones_fill_eight_rows() {
        let rects = compute_layout(16, Size::new(320, 480), 48, 6);
        assert_eq!(rects.len(), 16);
        // (480 - 48 - 9 * 6) / 8 = 47
        assert!(rects.iter().all(|r| r.width == 151 && r.height == 47));
        assert_eq!(rects[15], Rect::new(163, 48 + 6 + 7 * 53, 151, 47));
        assert!(rects.iter().all(|r| r.bottom() <= 480 && r.right() <= 320));
    }

    #[test]
    fn odd_count_leaves_right_cell_of_last_row_empty() {
        let rects = compute_layout(5, Size::new(320, 480), 48, 6);
        assert_eq!(rects[4].x, 6);
        assert_eq!(rects[4].y, rects[2].y + rects[2].height + 6);
    }

    #[test]
    fn tiny_surface_saturates_to_empty_cards() {
        let rects = compute_layout(4, Size::new(10, 20), 48, 6);
        assert_eq!(rects.len(), 4);
        assert!(rects.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn spec_body_sits_below_header() {
        let spec = GridSpec::default();
        assert_eq!(spec.body(Size::new(320, 480)), Rect::new(0, 48, 320, 432));
        assert_eq!(spec.body(Size::new(40, 20)), Rect::new(0, 20, 40, 0));
    }
}
