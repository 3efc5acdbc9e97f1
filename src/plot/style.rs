//! Figure styling.
//!
//! Styling is an explicit value handed to every renderer; there is no global
//! plotting state.

use plotters::style::RGBColor;

#[derive(Debug, Clone, PartialEq)]
pub struct FigureStyle {
    /// Canvas size in pixels (SVG user units).
    pub width: u32,
    pub height: u32,
    pub font_family: String,
    pub caption_size: u32,
    pub label_size: u32,
    pub tick_size: u32,
    pub annotation_size: u32,
    pub margin: u32,
    /// Mesh line opacity.
    pub grid_alpha: f64,
    /// One color per system size, smallest first.
    pub palette: [(u8, u8, u8); 4],
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 600,
            font_family: "serif".to_string(),
            caption_size: 22,
            label_size: 16,
            tick_size: 13,
            annotation_size: 14,
            margin: 12,
            grid_alpha: 0.3,
            palette: [
                (0x1f, 0x77, 0xb4),
                (0xff, 0x7f, 0x0e),
                (0x2c, 0xa0, 0x2c),
                (0xd6, 0x27, 0x28),
            ],
        }
    }
}

impl FigureStyle {
    /// Palette entry `i`, wrapping around.
    pub fn color(&self, i: usize) -> RGBColor {
        let (r, g, b) = self.palette[i % self.palette.len()];
        RGBColor(r, g, b)
    }

    pub fn font(&self, size: u32) -> (&str, u32) {
        (self.font_family.as_str(), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_wraps() {
        let style = FigureStyle::default();
        let RGBColor(r0, g0, b0) = style.color(0);
        let RGBColor(r4, g4, b4) = style.color(4);
        assert_eq!((r0, g0, b0), (r4, g4, b4));
        let RGBColor(r, g, b) = style.color(3);
        assert_eq!((r, g, b), (0xd6, 0x27, 0x28));
    }
}
