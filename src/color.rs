use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            to_color32(Hsl::new(hue, 0.75, 0.55).into_color())
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

// ---------------------------------------------------------------------------
// Ink colours
// ---------------------------------------------------------------------------

/// Display colours for the usual QuadToneRIP channel names.  The blacks are
/// lifted so they stay visible on a dark plot background.
const INK_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("K", (72, 72, 72)),
    ("MK", (96, 96, 96)),
    ("LK", (140, 140, 140)),
    ("LLK", (196, 196, 196)),
    ("C", (0, 174, 239)),
    ("LC", (128, 212, 245)),
    ("M", (236, 0, 140)),
    ("LM", (245, 140, 200)),
    ("Y", (255, 221, 0)),
    ("OR", (247, 148, 29)),
    ("GR", (0, 166, 81)),
    ("V", (128, 64, 196)),
];

fn ink_color(name: &str) -> Option<Color32> {
    INK_COLORS
        .iter()
        .find(|(ink, _)| ink.eq_ignore_ascii_case(name))
        .map(|&(_, (r, g, b))| to_color32(Srgb::new(r, g, b).into_format()))
}

// ---------------------------------------------------------------------------
// Color mapping: channel name → Color32
// ---------------------------------------------------------------------------

/// Maps the channels of a `.quad` file to colours: known ink names get their
/// ink colour, the rest share an evenly spaced hue wheel.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    pub fn new(channels: &[String]) -> Self {
        let unknown: Vec<&String> = channels.iter().filter(|c| ink_color(c).is_none()).collect();
        let palette = generate_palette(unknown.len());

        let mut mapping: BTreeMap<String, Color32> = channels
            .iter()
            .filter_map(|c| ink_color(c).map(|color| (c.clone(), color)))
            .collect();
        mapping.extend(unknown.into_iter().cloned().zip(palette));

        ColorMap {
            mapping,
            default_color: Color32::LIGHT_BLUE,
        }
    }

    pub fn color_for(&self, channel: &str) -> Color32 {
        self.mapping
            .get(channel)
            .copied()
            .unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_inks_use_their_own_colour() {
        let map = ColorMap::new(&["K".into(), "c".into()]);
        assert_eq!(map.color_for("K"), Color32::from_rgb(72, 72, 72));
        assert_eq!(map.color_for("c"), Color32::from_rgb(0, 174, 239));
    }

    #[test]
    fn unknown_channels_get_distinct_hues() {
        let map = ColorMap::new(&["K".into(), "X1".into(), "X2".into()]);
        assert_ne!(map.color_for("X1"), map.color_for("X2"));
        assert_eq!(map.color_for("missing"), Color32::LIGHT_BLUE);
        assert_eq!(generate_palette(3).len(), 3);
        assert!(generate_palette(0).is_empty());
    }
}
