use std::collections::BTreeMap;

use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

use crate::data::model::{LabelFrequencies, LabelValue};

/// Bar color of the rest class (label `0`).
pub const REST_COLOR: RGBColor = RGBColor(160, 160, 160);

// ---------------------------------------------------------------------------
// Hue wheel
// ---------------------------------------------------------------------------

/// `n` colors with evenly spaced hues at fixed saturation and lightness.
pub fn hue_wheel(n: usize) -> Vec<RGBColor> {
    (0..n)
        .map(|i| {
            let hsl = Hsl::new(i as f32 * 360.0 / n as f32, 0.65, 0.5);
            let rgb: Srgb = hsl.into_color();
            let to_byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
            RGBColor(to_byte(rgb.red), to_byte(rgb.green), to_byte(rgb.blue))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Class colors
// ---------------------------------------------------------------------------

/// One color per stimulus class. Rest is gray; movements share the wheel.
#[derive(Debug, Clone)]
pub struct ClassColors {
    mapping: BTreeMap<LabelValue, RGBColor>,
}

impl ClassColors {
    pub fn new(freq: &LabelFrequencies) -> Self {
        let rest = LabelValue::new(0.0);
        let movements: Vec<LabelValue> =
            freq.iter().map(|(v, _)| v).filter(|v| *v != rest).collect();
        let mut mapping: BTreeMap<LabelValue, RGBColor> = movements
            .iter()
            .copied()
            .zip(hue_wheel(movements.len()))
            .collect();
        if freq.count(0.0) > 0 {
            mapping.insert(rest, REST_COLOR);
        }
        ClassColors { mapping }
    }

    pub fn color_for(&self, label: LabelValue) -> RGBColor {
        self.mapping.get(&label).copied().unwrap_or(REST_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_has_requested_length() {
        assert!(hue_wheel(0).is_empty());
        assert_eq!(hue_wheel(17).len(), 17);
    }

    #[test]
    fn wheel_colours_are_distinct() {
        let colours = hue_wheel(6);
        for (i, a) in colours.iter().enumerate() {
            for b in &colours[i + 1..] {
                assert_ne!((a.0, a.1, a.2), (b.0, b.1, b.2));
            }
        }
    }

    #[test]
    fn rest_class_is_gray() {
        let freq = LabelFrequencies::from_values([0.0, 0.0, 1.0, 2.0]);
        let colors = ClassColors::new(&freq);
        let rest = colors.color_for(LabelValue::new(0.0));
        assert_eq!((rest.0, rest.1, rest.2), (160, 160, 160));
        let one = colors.color_for(LabelValue::new(1.0));
        let two = colors.color_for(LabelValue::new(2.0));
        assert_ne!((one.0, one.1, one.2), (two.0, two.1, two.2));
        assert_ne!((one.0, one.1, one.2), (160, 160, 160));
    }
}
