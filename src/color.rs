use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};

/// Plain 8-bit RGB triple, converted to each backend's colour type at the
/// drawing site.
pub type Rgb = [u8; 3];

/// Fill for single-series charts (histogram, bars).
pub const SERIES_FILL: Rgb = [0, 123, 255];

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgb> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            ]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Color mapping: group label → colour
// ---------------------------------------------------------------------------

/// Maps group labels (e.g. experience levels) to distinct colours. The
/// assignment depends only on the set of labels, so both chart backends
/// colour a group the same way whatever order they draw it in.
#[derive(Debug, Clone)]
pub struct ColorMap {
    mapping: BTreeMap<String, Rgb>,
    default_color: Rgb,
}

impl ColorMap {
    pub fn new<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let unique: std::collections::BTreeSet<&str> = labels.into_iter().collect();
        let palette = generate_palette(unique.len());
        let mapping = unique
            .into_iter()
            .zip(palette)
            .map(|(label, c)| (label.to_string(), c))
            .collect();

        ColorMap {
            mapping,
            default_color: [128, 128, 128],
        }
    }

    /// Look up the colour for a given label.
    pub fn color_for(&self, label: &str) -> Rgb {
        self.mapping.get(label).copied().unwrap_or(self.default_color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size() {
        assert!(generate_palette(0).is_empty());
        let p = generate_palette(4);
        assert_eq!(p.len(), 4);
        assert_ne!(p[0], p[1]);
    }

    #[test]
    fn colours_do_not_depend_on_label_order() {
        let a = ColorMap::new(["SE", "EN", "MI"]);
        let b = ColorMap::new(["MI", "SE", "EN"]);
        assert_eq!(a.color_for("SE"), b.color_for("SE"));
        assert_eq!(a.color_for("XX"), [128, 128, 128]);
    }
}
