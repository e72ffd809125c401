use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

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
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

fn linear(r: u8, g: u8, b: u8) -> LinSrgb {
    Srgb::new(r, g, b).into_format::<f32>().into_linear()
}

// ---------------------------------------------------------------------------
// Success-rate gradient
// ---------------------------------------------------------------------------

/// Red (0 %) → yellow (50 %) → green (100 %).
pub fn success_color(rate: f64) -> Color32 {
    let red = linear(0xc2, 0x2d, 0x2d);
    let yellow = linear(0xf7, 0xdb, 0x4f);
    let green = linear(0x48, 0xc1, 0x3d);

    let t = rate.clamp(0.0, 1.0) as f32;
    let mixed = if t < 0.5 {
        red.mix(yellow, t * 2.0)
    } else {
        yellow.mix(green, (t - 0.5) * 2.0)
    };
    to_color32(Srgb::from_linear(mixed))
}

/// Colour of a summit outcome in the duration charts.
pub fn outcome_color(success: bool) -> Color32 {
    if success {
        success_color(1.0)
    } else {
        success_color(0.0)
    }
}

// ---------------------------------------------------------------------------
// Color mapping: category label → Color32
// ---------------------------------------------------------------------------

/// Maps the labels of a categorical column (host country, termination
/// reason, season, ...) to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map from the labels of one column, in order.
    pub fn new<S: AsRef<str>>(labels: &[S]) -> Self {
        let palette = generate_palette(labels.len());
        let mapping = labels
            .iter()
            .zip(palette)
            .map(|(label, c)| (label.as_ref().to_string(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given label.
    pub fn color_for(&self, label: &str) -> Color32 {
        self.mapping
            .get(label)
            .copied()
            .unwrap_or(self.default_color)
    }
}
