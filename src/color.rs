use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

/// Colour of single-series charts (bar, line, histogram, scatter).
pub const SERIES_COLOR: Color32 = Color32::from_rgb(66, 135, 245);

// ---------------------------------------------------------------------------
// Slice palette for pie charts
// ---------------------------------------------------------------------------

/// `n` visually distinct colours with evenly spaced hues.
pub fn slice_palette(n: usize) -> Vec<Color32> {
    (0..n).map(|i| hue_color(i as f32 / n as f32 * 360.0)).collect()
}

fn hue_color(hue: f32) -> Color32 {
    let rgb: Srgb = Hsl::new(hue, 0.65, 0.55).into_color();
    let channel = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgb(channel(rgb.red), channel(rgb.green), channel(rgb.blue))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_colours_are_distinct() {
        let colors = slice_palette(6);
        assert_eq!(colors.len(), 6);
        for (i, a) in colors.iter().enumerate() {
            assert!(colors[i + 1..].iter().all(|b| a != b));
        }
        assert!(slice_palette(0).is_empty());
    }
}
